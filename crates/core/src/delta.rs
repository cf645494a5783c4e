//! Human-readable field deltas for reconstructed transitions.
//!
//! A [`DeltaPresenter`] turns one `(before, after, fact)` triple into
//! [`FieldDelta`]s: scalar changes first, then relation replacements, first
//! additions and removals. Referenced entities are rendered through a
//! [`ResolutionContext`] built once per history request. Owned children are
//! described by a [`ChildDescriber`] through the fixed producer list in
//! [`child_deltas`].

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::fact::{EventType, HistoryEvent, HistoryFact};
use crate::log_time;
use crate::names::HistoricalNames;
use crate::snapshot::{EntityRef, MutableSnapshot, Snapshot};
use crate::timeline::{AggregatedTransition, SnapshotView, Transition};

/// One displayable change of one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDelta {
    pub field_name: String,
    pub before: Option<String>,
    pub after: Option<String>,
}

impl FieldDelta {
    pub fn new(
        field_name: impl Into<String>,
        before: Option<impl Into<String>>,
        after: Option<impl Into<String>>,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            before: before.map(Into::into),
            after: after.map(Into::into),
        }
    }
}

/// Labels used when a reference cannot be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholders {
    /// Reference under a relation the context knows nothing about.
    pub unknown: String,
    /// Known relation, but the target no longer exists.
    pub removed_entity: String,
}

impl Default for Placeholders {
    fn default() -> Self {
        Self {
            unknown: "???".to_string(),
            removed_entity: "Entity removed".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Name resolution
// ---------------------------------------------------------------------------

/// Best-effort lookup of display names for referenced entities.
///
/// Returning `None` is always valid; callers fall back to placeholders.
pub trait NameResolver {
    fn resolve(&self, entity_class: &str, id: &EntityRef) -> Option<String>;

    fn resolve_many(&self, entity_class: &str, ids: &[EntityRef]) -> HashMap<EntityRef, String> {
        ids.iter()
            .filter_map(|id| Some((id.clone(), self.resolve(entity_class, id)?)))
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
struct NameTable {
    current: HashMap<EntityRef, String>,
    historical: Option<HistoricalNames>,
    placeholder: String,
}

/// Id to display-name lookups, one table per relation key.
///
/// Built from bulk fetches at the start of one history request and dropped
/// with it.
#[derive(Debug, Clone, Default)]
pub struct ResolutionContext {
    tables: HashMap<String, NameTable>,
    placeholders: Placeholders,
}

impl ResolutionContext {
    pub fn new(placeholders: Placeholders) -> Self {
        Self {
            tables: HashMap::new(),
            placeholders,
        }
    }

    pub fn placeholders(&self) -> &Placeholders {
        &self.placeholders
    }

    /// Current names for targets of `link_key`, with the label used for
    /// targets missing from `names`.
    pub fn with_names(
        mut self,
        link_key: impl Into<String>,
        names: HashMap<EntityRef, String>,
        placeholder: impl Into<String>,
    ) -> Self {
        let table = self.table_mut(link_key.into());
        table.current.extend(names);
        table.placeholder = placeholder.into();
        self
    }

    /// As-of names for targets of `link_key`, consulted before current names.
    pub fn with_historical(mut self, link_key: impl Into<String>, names: HistoricalNames) -> Self {
        self.table_mut(link_key.into()).historical = Some(names);
        self
    }

    /// Bulk-resolve `ids` of `entity_class` and register them under `link_key`.
    pub fn resolve_from(
        self,
        resolver: &dyn NameResolver,
        link_key: &str,
        entity_class: &str,
        ids: impl IntoIterator<Item = EntityRef>,
        placeholder: impl Into<String>,
    ) -> Self {
        let ids: Vec<EntityRef> = ids.into_iter().collect();
        let names = log_time(
            format_args!("resolving {} {entity_class} names", ids.len()),
            || resolver.resolve_many(entity_class, &ids),
        );
        self.with_names(link_key, names, placeholder)
    }

    /// Name of `id` under `link_key` without any placeholder.
    pub fn name(&self, link_key: &str, id: &EntityRef, at: DateTime<Utc>) -> Option<&str> {
        let table = self.tables.get(link_key)?;
        table
            .historical
            .as_ref()
            .and_then(|h| h.name_at(id, at))
            .or_else(|| table.current.get(id).map(String::as_str))
    }

    /// Display label of `id` under `link_key` as of `at`.
    ///
    /// Falls back from the as-of name to the current name to the relation's
    /// placeholder. Unknown relations give [`Placeholders::unknown`].
    pub fn label(&self, link_key: &str, id: &EntityRef, at: DateTime<Utc>) -> String {
        let Some(table) = self.tables.get(link_key) else {
            tracing::warn!(link_key, id = %id, "no name table for relation");
            return self.placeholders.unknown.clone();
        };
        match self.name(link_key, id, at) {
            Some(name) => name.to_string(),
            None => {
                tracing::warn!(link_key, id = %id, "unresolved reference in history");
                table.placeholder.clone()
            }
        }
    }

    fn table_mut(&mut self, link_key: String) -> &mut NameTable {
        let fallback = self.placeholders.removed_entity.clone();
        self.tables.entry(link_key).or_insert_with(|| NameTable {
            placeholder: fallback,
            ..NameTable::default()
        })
    }
}

// ---------------------------------------------------------------------------
// Presenter
// ---------------------------------------------------------------------------

/// How one entity class is rendered.
#[derive(Debug, Clone, Default)]
pub struct PresenterProfile {
    labels: HashMap<String, String>,
    blank_before: HashSet<String>,
    derived_links: HashSet<String>,
    owned_links: HashSet<String>,
}

impl PresenterProfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Display name of a data or relation key.
    pub fn label(mut self, key: impl Into<String>, display: impl Into<String>) -> Self {
        self.labels.insert(key.into(), display.into());
        self
    }

    /// Render a missing previous value of `key` as `""` rather than nothing.
    pub fn blank_before(mut self, key: impl Into<String>) -> Self {
        self.blank_before.insert(key.into());
        self
    }

    /// Relation that is meaningless once the entity is deleted.
    pub fn derived_link(mut self, key: impl Into<String>) -> Self {
        self.derived_links.insert(key.into());
        self
    }

    /// One-to-many ownership presented by child producers instead.
    pub fn owned_link(mut self, key: impl Into<String>) -> Self {
        self.owned_links.insert(key.into());
        self
    }

    pub fn display_name<'a>(&'a self, key: &'a str) -> &'a str {
        self.labels.get(key).map(String::as_str).unwrap_or(key)
    }
}

/// Transition of one entity together with its deltas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub event: HistoryEvent,
    pub before: Snapshot,
    pub after: Snapshot,
    pub changes: Vec<FieldDelta>,
}

#[derive(Debug, Clone, Default)]
pub struct DeltaPresenter {
    profile: PresenterProfile,
}

impl DeltaPresenter {
    pub fn new(profile: PresenterProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &PresenterProfile {
        &self.profile
    }

    /// Deltas of one fact given the entity state around it.
    pub fn present_change(
        &self,
        before: &Snapshot,
        after: &Snapshot,
        fact: &HistoryFact,
        ctx: &ResolutionContext,
    ) -> Vec<FieldDelta> {
        let at = fact.event.timestamp;
        let deleting = fact.event.event_type.is_delete();
        let payload = &fact.payload;
        let unknown = || ctx.placeholders().unknown.clone();
        let mut deltas: Vec<(&str, FieldDelta)> = Vec::new();

        for key in payload.data.keys() {
            let previous = before.data_item(key).map(str::to_string).or_else(|| {
                (!before.is_empty() && self.profile.blank_before.contains(key)).then(String::new)
            });
            let current = if deleting {
                None
            } else {
                after.data_item(key).map(str::to_string)
            };
            deltas.push((key.as_str(), self.delta(key, previous, current)));
        }

        let split = payload.classify_links();
        let owned = |key: &String| self.profile.owned_links.contains(key);

        for key in split.changed.iter().filter(|k| !owned(*k)) {
            let previous = payload
                .removed_single_for(key)
                .map(|id| ctx.label(key, id, at))
                .unwrap_or_else(unknown);
            let current = payload
                .added_single_for(key)
                .map(|id| ctx.label(key, id, at))
                .unwrap_or_else(unknown);
            deltas.push((key.as_str(), self.delta(key, Some(previous), Some(current))));
        }

        for key in split.added.iter().filter(|k| !owned(*k)) {
            let current = payload
                .added_single_for(key)
                .map(|id| ctx.label(key, id, at))
                .unwrap_or_else(unknown);
            deltas.push((key.as_str(), self.delta(key, None, Some(current))));
        }

        for key in split.removed.iter().filter(|k| !owned(*k)) {
            let previous = before
                .first_link(key)
                .or_else(|| payload.removed_single_for(key))
                .map(|id| ctx.label(key, id, at))
                .unwrap_or_else(unknown);
            deltas.push((key.as_str(), self.delta(key, Some(previous), None)));
        }

        deltas
            .into_iter()
            .filter(|(key, _)| !(deleting && self.profile.derived_links.contains(*key)))
            .map(|(_, delta)| delta)
            .collect()
    }

    /// Deltas of an aggregated transition, including its children's.
    pub fn present_aggregated(
        &self,
        transition: &AggregatedTransition,
        children: Option<&dyn ChildDescriber>,
        ctx: &ResolutionContext,
    ) -> Vec<FieldDelta> {
        let mut deltas = self.present_change(
            &transition.before.snapshot,
            &transition.after.snapshot,
            &transition.fact,
            ctx,
        );
        if let Some(describer) = children {
            deltas.extend(child_deltas(
                &transition.child_facts,
                &transition.before,
                describer,
                ctx,
            ));
        }
        deltas
    }

    /// Present every transition, keeping their order.
    pub fn present_all(
        &self,
        transitions: &[Transition],
        ctx: &ResolutionContext,
    ) -> Vec<HistoryRecord> {
        transitions
            .par_iter()
            .map(|t| HistoryRecord {
                event: t.fact.event.clone(),
                before: t.before.clone(),
                after: t.after.clone(),
                changes: self.present_change(&t.before, &t.after, &t.fact, ctx),
            })
            .collect()
    }

    fn delta(&self, key: &str, before: Option<String>, after: Option<String>) -> FieldDelta {
        FieldDelta {
            field_name: self.profile.display_name(key).to_string(),
            before,
            after,
        }
    }
}

// ---------------------------------------------------------------------------
// Child producers
// ---------------------------------------------------------------------------

/// Renders one owned child in a delta line.
pub trait ChildDescriber: Sync {
    /// Field name of the delta, e.g. `"Property width"`.
    fn field_name(&self, child: &Snapshot) -> String;

    /// One-line description of the child in the given state.
    fn describe(&self, child: &Snapshot, ctx: &ResolutionContext, at: DateTime<Utc>) -> String;
}

type ChildProducer =
    fn(&HistoryFact, &SnapshotView, &dyn ChildDescriber, &ResolutionContext) -> Option<FieldDelta>;

const CHILD_PRODUCERS: [(EventType, ChildProducer); 4] = [
    (EventType::Update, update_child),
    (EventType::Delete, delete_child),
    (EventType::SoftDelete, delete_child),
    (EventType::Create, create_child),
];

/// Deltas for the child facts of one session.
///
/// Producers run in a fixed order (updates, deletions, creations) and each
/// sees the children as they were before the session.
pub fn child_deltas(
    child_facts: &[HistoryFact],
    before: &SnapshotView,
    describer: &dyn ChildDescriber,
    ctx: &ResolutionContext,
) -> Vec<FieldDelta> {
    CHILD_PRODUCERS
        .iter()
        .flat_map(|(event_type, produce)| {
            child_facts
                .iter()
                .filter(move |f| f.event.event_type == *event_type)
                .filter_map(move |f| produce(f, before, describer, ctx))
        })
        .collect()
}

fn create_child(
    fact: &HistoryFact,
    _before: &SnapshotView,
    describer: &dyn ChildDescriber,
    ctx: &ResolutionContext,
) -> Option<FieldDelta> {
    let mut created = MutableSnapshot::new();
    created.apply(&fact.payload);
    Some(FieldDelta {
        field_name: describer.field_name(&created),
        before: None,
        after: Some(describer.describe(&created, ctx, fact.event.timestamp)),
    })
}

fn update_child(
    fact: &HistoryFact,
    before: &SnapshotView,
    describer: &dyn ChildDescriber,
    ctx: &ResolutionContext,
) -> Option<FieldDelta> {
    if fact.payload.is_empty() {
        return None;
    }
    let previous = before.child(&fact.event.entity_id);
    let mut updated = MutableSnapshot::from(previous.clone());
    updated.apply(&fact.payload);
    let at = fact.event.timestamp;
    Some(FieldDelta {
        field_name: describer.field_name(&updated),
        before: Some(describer.describe(&previous, ctx, at)),
        after: Some(describer.describe(&updated, ctx, at)),
    })
}

fn delete_child(
    fact: &HistoryFact,
    before: &SnapshotView,
    describer: &dyn ChildDescriber,
    ctx: &ResolutionContext,
) -> Option<FieldDelta> {
    let previous = before.child(&fact.event.entity_id);
    Some(FieldDelta {
        field_name: describer.field_name(&previous),
        before: Some(describer.describe(&previous, ctx, fact.event.timestamp)),
        after: None,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fact::{diff, HistoryContext, HistoryEvent, Payload};
    use crate::timeline::{reconstruct_timeline, TimelineAggregator};
    use chrono::Duration;

    fn r(id: &str) -> EntityRef {
        EntityRef::from(id)
    }

    fn profile() -> PresenterProfile {
        PresenterProfile::new()
            .label("name", "Name")
            .label("description", "Description")
            .label("subject", "Subject")
            .blank_before("name")
            .derived_link("subject")
            .owned_link("properties")
    }

    fn subjects() -> ResolutionContext {
        ResolutionContext::default().with_names(
            "subject",
            [(r("s1"), "Physics".to_string()), (r("s2"), "Chemistry".to_string())].into(),
            "Subject removed",
        )
    }

    struct Timeline {
        ctx: HistoryContext,
        clock: DateTime<Utc>,
        state: Snapshot,
        version: u64,
        facts: Vec<HistoryFact>,
    }

    impl Timeline {
        fn new() -> Self {
            Self {
                ctx: HistoryContext::new("admin"),
                clock: "2024-05-01T09:00:00Z".parse().unwrap(),
                state: Snapshot::new(),
                version: 0,
                facts: Vec::new(),
            }
        }

        fn push(&mut self, event_type: EventType, next: Snapshot) -> &mut Self {
            self.version += 1;
            self.clock += Duration::minutes(1);
            let payload = if event_type.is_delete() {
                Payload::default()
            } else {
                diff(&self.state, &next)
            };
            let mut event =
                HistoryEvent::new("Aspect", r("e"), self.version, event_type, &self.ctx);
            event.timestamp = self.clock;
            self.facts.push(HistoryFact::new(event, payload));
            self.state = next;
            self
        }

        fn records(&self, ctx: &ResolutionContext) -> Vec<HistoryRecord> {
            let transitions = reconstruct_timeline(&self.facts, &["Aspect"]);
            DeltaPresenter::new(profile()).present_all(&transitions, ctx)
        }
    }

    #[test]
    fn create_then_update_names() {
        let mut tl = Timeline::new();
        tl.push(EventType::Create, Snapshot::new().with_data("name", "A"))
            .push(EventType::Update, Snapshot::new().with_data("name", "B"));

        let records = tl.records(&ResolutionContext::default());
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0].changes,
            vec![FieldDelta::new("Name", Some("A"), Some("B"))]
        );
        assert_eq!(
            records[1].changes,
            vec![FieldDelta::new("Name", None::<String>, Some("A"))]
        );
    }

    #[test]
    fn blank_before_applies_to_existing_entities_only() {
        let mut tl = Timeline::new();
        tl.push(EventType::Create, Snapshot::new().with_data("description", "d"))
            .push(
                EventType::Update,
                Snapshot::new().with_data("description", "d").with_data("name", "N"),
            );
        let records = tl.records(&ResolutionContext::default());
        assert_eq!(records[0].changes, vec![FieldDelta::new("Name", Some(""), Some("N"))]);
    }

    #[test]
    fn link_replace_is_a_single_delta() {
        let mut tl = Timeline::new();
        let base = Snapshot::new().with_data("name", "A");
        tl.push(EventType::Create, base.clone().with_link("subject", r("s1")))
            .push(EventType::Update, base.with_link("subject", r("s2")));

        let records = tl.records(&subjects());
        assert_eq!(
            records[0].changes,
            vec![FieldDelta::new("Subject", Some("Physics"), Some("Chemistry"))]
        );
        assert_eq!(
            records[1].changes[1],
            FieldDelta::new("Subject", None::<String>, Some("Physics"))
        );
    }

    #[test]
    fn removed_link_and_orphan_placeholder() {
        let mut tl = Timeline::new();
        let base = Snapshot::new().with_data("name", "A");
        tl.push(EventType::Create, base.clone().with_link("subject", r("gone")))
            .push(EventType::Update, base);

        let records = tl.records(&subjects());
        assert_eq!(
            records[0].changes,
            vec![FieldDelta::new("Subject", Some("Subject removed"), None::<String>)]
        );
    }

    #[test]
    fn unknown_relation_uses_unknown_placeholder() {
        let mut tl = Timeline::new();
        tl.push(EventType::Create, Snapshot::new().with_link("measure", r("m1")));
        let records = tl.records(&ResolutionContext::default());
        assert_eq!(
            records[0].changes,
            vec![FieldDelta::new("measure", None::<String>, Some("???"))]
        );
    }

    #[test]
    fn owned_links_are_left_to_child_producers() {
        let mut tl = Timeline::new();
        tl.push(
            EventType::Create,
            Snapshot::new().with_data("name", "A").with_link("properties", r("p1")),
        );
        let records = tl.records(&ResolutionContext::default());
        assert_eq!(records[0].changes.len(), 1);
        assert_eq!(records[0].changes[0].field_name, "Name");
    }

    #[test]
    fn deletion_suppresses_derived_links() {
        let ctx = HistoryContext::new("admin");
        let before = Snapshot::new()
            .with_data("name", "A")
            .with_data("description", "old")
            .with_link("subject", r("s1"));
        let payload = Payload {
            removed_links: [("subject".to_string(), vec![r("s1")])].into(),
            data: [("description".to_string(), String::new())].into(),
            ..Payload::default()
        };
        let event = HistoryEvent::new("Aspect", r("e"), 3, EventType::SoftDelete, &ctx);
        let fact = HistoryFact::new(event, payload);

        let deltas =
            DeltaPresenter::new(profile()).present_change(&before, &before, &fact, &subjects());
        assert_eq!(
            deltas,
            vec![FieldDelta::new("Description", Some("old"), None::<String>)]
        );
    }

    #[test]
    fn as_of_names_take_precedence() {
        let t0: DateTime<Utc> = "2024-05-01T09:00:00Z".parse().unwrap();
        let ctx = HistoryContext::new("admin");
        let mut renamed = HistoryFact::new(
            HistoryEvent::new("Subject", r("s1"), 1, EventType::Create, &ctx),
            diff(&Snapshot::new(), &Snapshot::new().with_data("name", "Natural philosophy")),
        );
        renamed.event.timestamp = t0 - Duration::days(1);
        let history = HistoricalNames::from_facts([&renamed], "Subject", "name");

        let resolution = subjects().with_historical("subject", history);
        assert_eq!(resolution.label("subject", &r("s1"), t0), "Natural philosophy");
        assert_eq!(resolution.label("subject", &r("s2"), t0), "Chemistry");
        assert_eq!(
            resolution.label("subject", &r("s1"), t0 - Duration::days(2)),
            "Physics"
        );
        assert_eq!(resolution.label("nope", &r("s1"), t0), "???");
    }

    struct Resolver;

    impl NameResolver for Resolver {
        fn resolve(&self, entity_class: &str, id: &EntityRef) -> Option<String> {
            (entity_class == "Subject" && id.as_str() == "s1").then(|| "Physics".to_string())
        }
    }

    #[test]
    fn resolve_from_registers_found_names() {
        let ctx = ResolutionContext::default().resolve_from(
            &Resolver,
            "subject",
            "Subject",
            [r("s1"), r("s9")],
            "Subject removed",
        );
        let now = Utc::now();
        assert_eq!(ctx.label("subject", &r("s1"), now), "Physics");
        assert_eq!(ctx.label("subject", &r("s9"), now), "Subject removed");
        assert_eq!(ctx.name("subject", &r("s9"), now), None);
    }

    // -----------------------------------------------------------------------
    // Children
    // -----------------------------------------------------------------------

    struct Describer;

    impl ChildDescriber for Describer {
        fn field_name(&self, child: &Snapshot) -> String {
            format!("Property {}", child.data_or_empty("name"))
        }

        fn describe(
            &self,
            child: &Snapshot,
            _ctx: &ResolutionContext,
            _at: DateTime<Utc>,
        ) -> String {
            format!(
                "{} : [{}]",
                child.data_or_empty("name"),
                child.data_or_empty("cardinality")
            )
        }
    }

    fn child(
        class: &str,
        id: &str,
        version: u64,
        event_type: EventType,
        payload: Payload,
        ctx: &HistoryContext,
    ) -> HistoryFact {
        HistoryFact::new(HistoryEvent::new(class, r(id), version, event_type, ctx), payload)
    }

    #[test]
    fn child_producers_cover_create_update_delete() {
        let prop = |name: &str, card: &str| {
            Snapshot::new().with_data("name", name).with_data("cardinality", card)
        };
        let owner = |ids: Vec<EntityRef>| {
            Snapshot::new()
                .with_data("name", "A")
                .with_links("properties", ids)
        };
        let empty = Snapshot::new();
        let (narrow, wide) = (prop("w", "0:1"), prop("w", "0:INF"));
        let (owning, emptied) = (owner(vec![r("p")]), owner(vec![]));

        let s1 = HistoryContext::new("admin");
        let s2 = HistoryContext::new("admin");
        let s3 = HistoryContext::new("admin");
        let mut facts = vec![
            child("Aspect", "a", 1, EventType::Create, diff(&empty, &owning), &s1),
            child("AspectProperty", "p", 1, EventType::Create, diff(&empty, &narrow), &s1),
            child("AspectProperty", "p", 2, EventType::Update, diff(&narrow, &wide), &s2),
            child("Aspect", "a", 2, EventType::Update, Payload::default(), &s2),
            child("AspectProperty", "p", 3, EventType::SoftDelete, Payload::default(), &s3),
            child("Aspect", "a", 3, EventType::Update, diff(&owning, &emptied), &s3),
        ];
        for (i, f) in facts.iter_mut().enumerate() {
            f.event.timestamp = Utc::now() + Duration::seconds(i as i64);
        }

        let transitions = TimelineAggregator::new("Aspect")
            .with_children("AspectProperty", "properties")
            .aggregate(facts);
        let presenter = DeltaPresenter::new(profile());
        let ctx = ResolutionContext::default();
        let deltas: Vec<Vec<FieldDelta>> = transitions
            .iter()
            .map(|t| presenter.present_aggregated(t, Some(&Describer), &ctx))
            .collect();

        assert_eq!(
            deltas[0],
            vec![FieldDelta::new("Property w", Some("w : [0:INF]"), None::<String>)]
        );
        assert_eq!(
            deltas[1],
            vec![FieldDelta::new("Property w", Some("w : [0:1]"), Some("w : [0:INF]"))]
        );
        assert_eq!(
            deltas[2],
            vec![
                FieldDelta::new("Name", None::<String>, Some("A")),
                FieldDelta::new("Property w", None::<String>, Some("w : [0:1]")),
            ]
        );
    }

    #[test]
    fn empty_child_update_produces_nothing() {
        let ctx = HistoryContext::new("admin");
        let facts = vec![child(
            "AspectProperty",
            "p",
            2,
            EventType::Update,
            Payload::default(),
            &ctx,
        )];
        let view = SnapshotView::default();
        let deltas = child_deltas(&facts, &view, &Describer, &ResolutionContext::default());
        assert!(deltas.is_empty());
    }
}
