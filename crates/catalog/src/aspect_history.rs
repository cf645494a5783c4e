//! History views over the catalog: what changed, by whom, and how each
//! change reads to a person.

use catalog_history::{
    canonical_order, links_of_type, log_time, reconstruct_timeline, replay, AggregatedTransition,
    ChildDescriber, DeltaPresenter, EntityRef, FieldDelta, HistoricalNames, HistoryEvent,
    HistoryFact, HistoryRecord, HistoryStore, Placeholders, PresenterProfile, ResolutionContext,
    SessionId, Snapshot, SnapshotView, TimelineAggregator, Transition,
};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

use crate::model::{aspect_keys, property_keys};
use crate::{
    Catalog, NameResolution, PropertyCardinality, Result, ASPECT_CLASS, ASPECT_PROPERTY_CLASS,
    REFERENCE_BOOK_CLASS, SUBJECT_CLASS,
};

const SUBJECT_REMOVED: &str = "Subject removed";
const ASPECT_REMOVED: &str = "'Aspect removed'";

/// One change of one aspect, ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AspectHistory {
    pub event: HistoryEvent,
    /// Aspect name after the change (the last name for deletions).
    pub name: String,
    pub deleted: bool,
    /// The aspect as it stood after the change.
    pub view: AspectView,
    pub changes: Vec<FieldDelta>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AspectView {
    pub name: String,
    pub base_type: Option<String>,
    pub description: Option<String>,
    pub measure: Option<String>,
    pub subject: Option<String>,
    pub reference_book: Option<String>,
    pub properties: Vec<PropertyView>,
    pub version: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyView {
    pub id: EntityRef,
    pub name: String,
    pub aspect_id: Option<EntityRef>,
    pub aspect_name: String,
    pub cardinality: Option<PropertyCardinality>,
    pub description: Option<String>,
}

/// Renders an aspect property as `"{name} {aspect} : [{cardinality}]"`.
pub struct PropertyDescriber;

impl ChildDescriber for PropertyDescriber {
    fn field_name(&self, child: &Snapshot) -> String {
        format!("Property {}", child.data_or_empty(property_keys::NAME))
    }

    fn describe(&self, child: &Snapshot, ctx: &ResolutionContext, at: DateTime<Utc>) -> String {
        format!(
            "{} {} : [{}]",
            child.data_or_empty(property_keys::NAME),
            typed_by_label(child, ctx, at),
            cardinality(child).map(|c| c.label()).unwrap_or_default()
        )
    }
}

fn typed_by_label(child: &Snapshot, ctx: &ResolutionContext, at: DateTime<Utc>) -> String {
    match child.data_item(property_keys::ASPECT) {
        Some(id) => ctx.label(property_keys::ASPECT, &EntityRef::from(id), at),
        None => ctx.placeholders().unknown.clone(),
    }
}

fn cardinality(child: &Snapshot) -> Option<PropertyCardinality> {
    child
        .data_item(property_keys::CARDINALITY)
        .and_then(|c| c.parse().ok())
}

fn aspect_profile() -> PresenterProfile {
    use aspect_keys::*;
    PresenterProfile::new()
        .label(NAME, "Name")
        .label(BASE_TYPE, "Base type")
        .label(DESCRIPTION, "Description")
        .label(MEASURE, "Measure")
        .label(SUBJECT, "Subject")
        .label(REFERENCE_BOOK, "Reference book")
        .blank_before(NAME)
        .derived_link(SUBJECT)
        .derived_link(REFERENCE_BOOK)
        .owned_link(PROPERTIES)
}

fn subject_profile() -> PresenterProfile {
    PresenterProfile::new()
        .label("name", "Name")
        .label("description", "Description")
        .blank_before("name")
        .owned_link("objects")
}

impl AspectHistory {
    fn from_transition(
        transition: &AggregatedTransition,
        presenter: &DeltaPresenter,
        ctx: &ResolutionContext,
    ) -> Self {
        let event = transition.fact.event.clone();
        let view = AspectView::build(&transition.after, &event, ctx);
        Self {
            name: view.name.clone(),
            deleted: event.event_type.is_delete(),
            changes: presenter.present_aggregated(transition, Some(&PropertyDescriber), ctx),
            view,
            event,
        }
    }
}

impl AspectView {
    fn build(view: &SnapshotView, event: &HistoryEvent, ctx: &ResolutionContext) -> Self {
        use aspect_keys::*;
        let s = &view.snapshot;
        let at = event.timestamp;
        let owned = |key: &str| s.data_item(key).map(str::to_string);
        Self {
            name: s.data_or_empty(NAME).to_string(),
            base_type: owned(BASE_TYPE),
            description: owned(DESCRIPTION),
            measure: owned(MEASURE),
            subject: s.resolved_link(SUBJECT, |id| ctx.label(SUBJECT, id, at)),
            reference_book: s.resolved_link(REFERENCE_BOOK, |id| ctx.label(REFERENCE_BOOK, id, at)),
            properties: s
                .links_for(PROPERTIES)
                .iter()
                .map(|id| PropertyView::build(id, &view.child(id), ctx, at))
                .collect(),
            version: event.version,
        }
    }
}

impl PropertyView {
    fn build(id: &EntityRef, child: &Snapshot, ctx: &ResolutionContext, at: DateTime<Utc>) -> Self {
        use property_keys::*;
        Self {
            id: id.clone(),
            name: child.data_or_empty(NAME).to_string(),
            aspect_id: child.data_item(ASPECT).map(EntityRef::from),
            aspect_name: typed_by_label(child, ctx, at),
            cardinality: cardinality(child),
            description: child.data_item(DESCRIPTION).map(str::to_string),
        }
    }
}

impl Catalog {
    /// Change history of every aspect, most recent first.
    ///
    /// Property changes saved together with their aspect are folded into
    /// that aspect's entry. Referenced subjects, reference books and
    /// property types are named per [`NameResolution`].
    pub fn aspect_history(&self) -> Result<Vec<AspectHistory>> {
        let facts = log_time("loading aspect facts", || {
            self.history_log()
                .query_by_classes(&[ASPECT_CLASS, ASPECT_PROPERTY_CLASS])
        })?;
        let ctx = self.aspect_resolution(&facts)?;
        let transitions = TimelineAggregator::new(ASPECT_CLASS)
            .with_children(ASPECT_PROPERTY_CLASS, aspect_keys::PROPERTIES)
            .aggregate(facts);

        let presenter = DeltaPresenter::new(aspect_profile());
        let entries: Vec<AspectHistory> = log_time(
            format_args!("presenting {} aspect changes", transitions.len()),
            || {
                transitions
                    .par_iter()
                    .map(|t| AspectHistory::from_transition(t, &presenter, &ctx))
                    .collect()
            },
        );
        Ok(entries)
    }

    /// Change history of every subject, most recent first.
    pub fn subject_history(&self) -> Result<Vec<HistoryRecord>> {
        let facts = self.history_log().query_by_classes(&[SUBJECT_CLASS])?;
        let transitions = reconstruct_timeline(&facts, &[SUBJECT_CLASS]);
        let presenter = DeltaPresenter::new(subject_profile());
        Ok(presenter.present_all(&transitions, &ResolutionContext::default()))
    }

    /// Raw transitions of one entity, most recent first.
    pub fn history_of(&self, id: &EntityRef) -> Result<Vec<Transition>> {
        let facts = self.history_log().query_by_entity_id(id)?;
        let classes: BTreeSet<&str> = facts
            .iter()
            .map(|f| f.event.entity_class.as_str())
            .collect();
        let classes: Vec<&str> = classes.into_iter().collect();
        Ok(reconstruct_timeline(&facts, &classes))
    }

    /// State of an entity replayed from its facts.
    ///
    /// Works for removed entities too: deletions do not clear the state.
    pub fn entity_state(&self, id: &EntityRef) -> Result<Snapshot> {
        let facts = self.history_log().query_by_entity_id(id)?;
        Ok(replay(&facts))
    }

    /// Every fact of one session, in replay order.
    pub fn session_facts(&self, session: &SessionId) -> Result<Vec<HistoryFact>> {
        let mut facts = self.history_log().query_by_session(session)?;
        facts.sort_by(canonical_order);
        Ok(facts)
    }

    fn aspect_resolution(&self, facts: &[HistoryFact]) -> Result<ResolutionContext> {
        let aspect_facts: Vec<&HistoryFact> = facts
            .iter()
            .filter(|f| f.event.entity_class == ASPECT_CLASS)
            .collect();
        let subjects = links_of_type(aspect_facts.iter().copied(), aspect_keys::SUBJECT);
        let books = links_of_type(aspect_facts.iter().copied(), aspect_keys::REFERENCE_BOOK);
        let property_types: BTreeSet<EntityRef> = facts
            .iter()
            .filter(|f| f.event.entity_class == ASPECT_PROPERTY_CLASS)
            .filter_map(|f| f.payload.data_item(property_keys::ASPECT))
            .map(EntityRef::from)
            .collect();
        // A soft-deleted type keeps its name; only hard-deleted ones fall back.
        let property_types: Vec<EntityRef> = property_types.into_iter().collect();
        let type_names: HashMap<EntityRef, String> = self
            .aspects_including_deleted(&property_types)?
            .into_iter()
            .map(|a| (a.id, a.name))
            .collect();

        let placeholders = Placeholders::default();
        let unknown = placeholders.unknown.clone();
        let mut ctx = ResolutionContext::new(placeholders)
            .resolve_from(self, aspect_keys::SUBJECT, SUBJECT_CLASS, subjects, SUBJECT_REMOVED)
            .resolve_from(self, aspect_keys::REFERENCE_BOOK, REFERENCE_BOOK_CLASS, books, unknown)
            .with_names(property_keys::ASPECT, type_names, ASPECT_REMOVED);

        if self.config().name_resolution == NameResolution::AsOf {
            let named = self
                .history_log()
                .query_by_classes(&[SUBJECT_CLASS, REFERENCE_BOOK_CLASS])?;
            ctx = ctx
                .with_historical(
                    aspect_keys::SUBJECT,
                    HistoricalNames::from_facts(&named, SUBJECT_CLASS, "name"),
                )
                .with_historical(
                    aspect_keys::REFERENCE_BOOK,
                    HistoricalNames::from_facts(&named, REFERENCE_BOOK_CLASS, "name"),
                )
                .with_historical(
                    property_keys::ASPECT,
                    HistoricalNames::from_facts(facts, ASPECT_CLASS, aspect_keys::NAME),
                );
        }
        Ok(ctx)
    }
}
