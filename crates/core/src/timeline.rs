//! Per-entity replay of facts into before/after snapshot pairs.
//!
//! Facts are grouped by entity, put into canonical order and applied one by
//! one to a running [`MutableSnapshot`] that starts empty. Every fact yields
//! one transition: the snapshot before it and the snapshot after it. Delete
//! facts are not applied, so their "after" is the last state the entity had.
//!
//! Owned children (aspect properties of an aspect, say) have facts of their
//! own class. They are joined to the parent's transition through the
//! session id both facts carry, and their snapshots are replayed alongside
//! the parent's.

use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::fact::{HistoryFact, SessionId};
use crate::log_time;
use crate::snapshot::{EntityRef, MutableSnapshot, Snapshot};

/// Canonical replay order: version, then timestamp, then fact id.
pub fn canonical_order(a: &HistoryFact, b: &HistoryFact) -> Ordering {
    a.event
        .version
        .cmp(&b.event.version)
        .then_with(|| a.event.timestamp.cmp(&b.event.timestamp))
        .then_with(|| a.id.cmp(&b.id))
}

/// Display order: most recent first, deterministic on ties.
pub fn display_order(a: &HistoryFact, b: &HistoryFact) -> Ordering {
    b.event
        .timestamp
        .cmp(&a.event.timestamp)
        .then_with(|| b.event.version.cmp(&a.event.version))
        .then_with(|| a.event.entity_id.cmp(&b.event.entity_id))
        .then_with(|| b.id.cmp(&a.id))
}

/// Final state of one entity after replaying `facts` in canonical order.
pub fn replay<'a>(facts: impl IntoIterator<Item = &'a HistoryFact>) -> Snapshot {
    let mut ordered: Vec<&HistoryFact> = facts.into_iter().collect();
    ordered.sort_by(|a, b| canonical_order(a, b));
    let mut snapshot = MutableSnapshot::new();
    for fact in ordered {
        if !fact.event.event_type.is_delete() {
            snapshot.apply(&fact.payload);
        }
    }
    snapshot.into_snapshot()
}

/// One fact with the entity state around it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub fact: HistoryFact,
    pub before: Snapshot,
    pub after: Snapshot,
}

/// All transitions of `entity_classes`, flattened and most recent first.
///
/// Facts of other classes are ignored.
pub fn reconstruct_timeline(facts: &[HistoryFact], entity_classes: &[&str]) -> Vec<Transition> {
    let mut transitions: Vec<Transition> = entity_classes
        .iter()
        .flat_map(|class| {
            let own: Vec<HistoryFact> = facts
                .iter()
                .filter(|f| f.event.entity_class == *class)
                .cloned()
                .collect();
            TimelineAggregator::new(*class).aggregate(own)
        })
        .map(|t| Transition {
            fact: t.fact,
            before: t.before.snapshot,
            after: t.after.snapshot,
        })
        .collect();
    transitions.sort_by(|a, b| display_order(&a.fact, &b.fact));
    transitions
}

/// An owned one-to-many relation replayed together with its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildRelation {
    /// Entity class of the children's own facts.
    pub class: String,
    /// Parent relation key listing the children.
    pub link_key: String,
}

/// Entity state plus the state of its currently linked children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotView {
    pub snapshot: Snapshot,
    pub children: BTreeMap<EntityRef, Snapshot>,
}

impl SnapshotView {
    /// Snapshot of one child, empty if it was never seen.
    pub fn child(&self, id: &EntityRef) -> Snapshot {
        self.children.get(id).cloned().unwrap_or_default()
    }
}

/// One parent fact with both views and the sibling child facts of its session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedTransition {
    pub fact: HistoryFact,
    pub before: SnapshotView,
    pub after: SnapshotView,
    /// Child facts joined through the session id, in canonical order.
    pub child_facts: Vec<HistoryFact>,
}

/// Rebuilds the timeline of one entity class, optionally with owned children.
#[derive(Debug, Clone)]
pub struct TimelineAggregator {
    entity_class: String,
    child: Option<ChildRelation>,
}

impl TimelineAggregator {
    pub fn new(entity_class: impl Into<String>) -> Self {
        Self {
            entity_class: entity_class.into(),
            child: None,
        }
    }

    /// Replay children of `class` listed under the parent's `link_key`.
    pub fn with_children(mut self, class: impl Into<String>, link_key: impl Into<String>) -> Self {
        self.child = Some(ChildRelation {
            class: class.into(),
            link_key: link_key.into(),
        });
        self
    }

    pub fn entity_class(&self) -> &str {
        &self.entity_class
    }

    /// Entity classes whose facts the aggregator consumes.
    pub fn classes(&self) -> Vec<&str> {
        let mut classes = vec![self.entity_class.as_str()];
        if let Some(child) = &self.child {
            classes.push(child.class.as_str());
        }
        classes
    }

    /// Replay `facts` into transitions, most recent first.
    ///
    /// Never fails: facts of unknown classes are skipped, child facts whose
    /// parent never shows up are skipped, and children without facts are
    /// replayed as empty snapshots.
    pub fn aggregate(&self, facts: Vec<HistoryFact>) -> Vec<AggregatedTransition> {
        let mut parents: HashMap<EntityRef, Vec<HistoryFact>> = HashMap::new();
        let mut sessions: HashMap<SessionId, Vec<HistoryFact>> = HashMap::new();
        let mut skipped = 0usize;

        for fact in facts {
            if fact.event.entity_class == self.entity_class {
                parents
                    .entry(fact.event.entity_id.clone())
                    .or_default()
                    .push(fact);
            } else if self
                .child
                .as_ref()
                .is_some_and(|c| c.class == fact.event.entity_class)
            {
                sessions.entry(fact.event.session_id).or_default().push(fact);
            } else {
                skipped += 1;
            }
        }
        if skipped > 0 {
            tracing::warn!(
                entity_class = %self.entity_class,
                skipped,
                "facts of unrelated classes ignored during aggregation"
            );
        }
        for siblings in sessions.values_mut() {
            siblings.sort_by(canonical_order);
        }

        let groups: Vec<Vec<HistoryFact>> = parents.into_values().collect();
        let mut transitions: Vec<AggregatedTransition> = log_time(
            format_args!("replaying {} {} timelines", groups.len(), self.entity_class),
            || {
                groups
                    .into_par_iter()
                    .flat_map_iter(|group| self.replay_entity(group, &sessions))
                    .collect()
            },
        );

        transitions.sort_by(|a, b| display_order(&a.fact, &b.fact));
        transitions
    }

    fn replay_entity(
        &self,
        mut facts: Vec<HistoryFact>,
        sessions: &HashMap<SessionId, Vec<HistoryFact>>,
    ) -> Vec<AggregatedTransition> {
        facts.sort_by(canonical_order);
        debug_assert!(
            facts
                .windows(2)
                .all(|w| w[0].event.entity_id == w[1].event.entity_id),
            "replayed facts must belong to one entity"
        );

        let mut snapshot = MutableSnapshot::new();
        let mut children: HashMap<EntityRef, MutableSnapshot> = HashMap::new();
        let mut joined: HashSet<SessionId> = HashSet::new();
        let mut previous = SnapshotView::default();
        let mut out = Vec::with_capacity(facts.len());

        for fact in facts {
            let before_links: Vec<EntityRef> = self.child_ids(&snapshot).to_vec();
            let deleting = fact.event.event_type.is_delete();
            if !deleting {
                snapshot.apply(&fact.payload);
            }

            let mut child_facts = Vec::new();
            if self.child.is_some() && joined.insert(fact.event.session_id) {
                let owned: HashSet<&EntityRef> = before_links
                    .iter()
                    .chain(self.child_ids(&snapshot))
                    .collect();
                for sibling in sessions.get(&fact.event.session_id).into_iter().flatten() {
                    if !owned.contains(&sibling.event.entity_id) {
                        continue;
                    }
                    if !deleting {
                        children
                            .entry(sibling.event.entity_id.clone())
                            .or_default()
                            .apply(&sibling.payload);
                    }
                    child_facts.push(sibling.clone());
                }
            }

            let after = SnapshotView {
                snapshot: snapshot.immutable(),
                children: self
                    .child_ids(&snapshot)
                    .iter()
                    .map(|id| {
                        let child = children.get(id).map(MutableSnapshot::immutable);
                        if child.is_none() {
                            tracing::warn!(
                                parent = %fact.event.entity_id,
                                child = %id,
                                "linked child has no history, using empty snapshot"
                            );
                        }
                        (id.clone(), child.unwrap_or_default())
                    })
                    .collect(),
            };

            out.push(AggregatedTransition {
                fact,
                before: previous,
                after: after.clone(),
                child_facts,
            });
            previous = after;
        }

        out
    }

    fn child_ids<'s>(&self, snapshot: &'s Snapshot) -> &'s [EntityRef] {
        match &self.child {
            Some(child) => snapshot.links_for(&child.link_key),
            None => &[],
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fact::{diff, EventType, HistoryContext, HistoryEvent, Payload};
    use chrono::{Duration, Utc};

    fn r(id: &str) -> EntityRef {
        EntityRef::from(id)
    }

    struct Builder {
        clock: chrono::DateTime<Utc>,
    }

    impl Builder {
        fn new() -> Self {
            Self {
                clock: "2024-01-01T00:00:00Z".parse().unwrap(),
            }
        }

        fn fact(
            &mut self,
            class: &str,
            id: &str,
            version: u64,
            event_type: EventType,
            payload: Payload,
            ctx: &HistoryContext,
        ) -> HistoryFact {
            self.clock += Duration::seconds(1);
            let mut event = HistoryEvent::new(class, r(id), version, event_type, ctx);
            event.timestamp = self.clock;
            HistoryFact::new(event, payload)
        }
    }

    fn name(value: &str) -> Payload {
        diff(&Snapshot::new(), &Snapshot::new().with_data("name", value))
    }

    #[test]
    fn create_then_update_yields_two_transitions() {
        let mut b = Builder::new();
        let ctx = HistoryContext::new("admin");
        let create = b.fact("Aspect", "e", 1, EventType::Create, name("A"), &ctx);
        let update = b.fact("Aspect", "e", 2, EventType::Update, name("B"), &ctx);

        // unspecified store order
        let transitions = reconstruct_timeline(&[update, create], &["Aspect"]);
        assert_eq!(transitions.len(), 2);

        let latest = &transitions[0];
        assert_eq!(latest.fact.event.version, 2);
        assert_eq!(latest.before.data_item("name"), Some("A"));
        assert_eq!(latest.after.data_item("name"), Some("B"));

        let first = &transitions[1];
        assert!(first.before.is_empty());
        assert_eq!(first.after.data_item("name"), Some("A"));
    }

    #[test]
    fn delete_keeps_last_state() {
        let mut b = Builder::new();
        let ctx = HistoryContext::new("admin");
        let subject = Payload {
            added_links: [("subject".to_string(), vec![r("s1")])].into(),
            ..name("A")
        };
        let facts = vec![
            b.fact("Aspect", "e", 1, EventType::Create, subject, &ctx),
            b.fact("Aspect", "e", 2, EventType::SoftDelete, Payload::default(), &ctx),
        ];
        let transitions = reconstruct_timeline(&facts, &["Aspect"]);
        let deletion = &transitions[0];
        assert_eq!(deletion.fact.event.event_type, EventType::SoftDelete);
        assert_eq!(deletion.before, deletion.after);
        assert_eq!(deletion.after.data_item("name"), Some("A"));
        assert_eq!(deletion.after.first_link("subject"), Some(&r("s1")));
        assert_eq!(replay(&facts), deletion.after);
    }

    #[test]
    fn version_orders_before_timestamp() {
        let mut b = Builder::new();
        let ctx = HistoryContext::new("admin");
        let late_v1 = {
            let mut f = b.fact("Aspect", "e", 1, EventType::Create, name("A"), &ctx);
            f.event.timestamp += Duration::hours(1);
            f
        };
        let v2 = b.fact("Aspect", "e", 2, EventType::Update, name("B"), &ctx);
        assert_eq!(replay([&v2, &late_v1]).data_item("name"), Some("B"));
    }

    #[test]
    fn unrelated_classes_are_ignored() {
        let mut b = Builder::new();
        let ctx = HistoryContext::new("admin");
        let facts = vec![
            b.fact("Aspect", "a", 1, EventType::Create, name("A"), &ctx),
            b.fact("Subject", "s", 1, EventType::Create, name("S"), &ctx),
        ];
        let transitions = TimelineAggregator::new("Aspect").aggregate(facts);
        assert_eq!(transitions.len(), 1);
        assert_eq!(transitions[0].fact.event.entity_class, "Aspect");
    }

    #[test]
    fn child_facts_join_through_session() {
        let mut b = Builder::new();
        let created = HistoryContext::new("admin");
        let parent_create = b.fact("Aspect", "p", 1, EventType::Create, name("P"), &created);

        let added = HistoryContext::new("admin");
        let child_create = b.fact("AspectProperty", "c", 1, EventType::Create, name("C"), &added);
        let parent_update = b.fact(
            "Aspect",
            "p",
            2,
            EventType::Update,
            Payload {
                added_links: [("properties".to_string(), vec![r("c")])].into(),
                ..Payload::default()
            },
            &added,
        );

        let renamed = HistoryContext::new("admin");
        let child_update =
            b.fact("AspectProperty", "c", 2, EventType::Update, name("C2"), &renamed);
        let parent_touch =
            b.fact("Aspect", "p", 3, EventType::Update, Payload::default(), &renamed);

        let aggregator =
            TimelineAggregator::new("Aspect").with_children("AspectProperty", "properties");
        assert_eq!(aggregator.classes(), vec!["Aspect", "AspectProperty"]);
        let transitions = aggregator.aggregate(vec![
            child_update,
            parent_create,
            child_create,
            parent_touch,
            parent_update,
        ]);
        assert_eq!(transitions.len(), 3);

        let touch = &transitions[0];
        assert_eq!(touch.child_facts.len(), 1);
        assert_eq!(touch.before.child(&r("c")).data_item("name"), Some("C"));
        assert_eq!(touch.after.child(&r("c")).data_item("name"), Some("C2"));

        let add = &transitions[1];
        assert_eq!(add.child_facts.len(), 1);
        assert_eq!(add.child_facts[0].event.event_type, EventType::Create);
        assert!(add.before.children.is_empty());
        assert_eq!(add.after.child(&r("c")).data_item("name"), Some("C"));

        assert!(transitions[2].child_facts.is_empty());
    }

    #[test]
    fn orphan_child_facts_do_not_break_aggregation() {
        let mut b = Builder::new();
        let ctx = HistoryContext::new("admin");
        let facts = vec![
            b.fact("Aspect", "p", 1, EventType::Create, name("P"), &ctx),
            b.fact("AspectProperty", "stray", 1, EventType::Create, name("X"), &ctx),
            b.fact(
                "Aspect",
                "q",
                1,
                EventType::Create,
                Payload {
                    added_links: [("properties".to_string(), vec![r("ghost")])].into(),
                    ..name("Q")
                },
                &HistoryContext::new("admin"),
            ),
        ];
        let transitions = TimelineAggregator::new("Aspect")
            .with_children("AspectProperty", "properties")
            .aggregate(facts);
        assert_eq!(transitions.len(), 2);
        assert!(transitions.iter().all(|t| t.child_facts.is_empty()));

        let q = transitions
            .iter()
            .find(|t| t.fact.event.entity_id == r("q"))
            .unwrap();
        assert!(q.after.child(&r("ghost")).is_empty());
    }

    #[test]
    fn output_is_most_recent_first_across_entities() {
        let mut b = Builder::new();
        let ctx = HistoryContext::new("admin");
        let facts = vec![
            b.fact("Aspect", "a", 1, EventType::Create, name("A"), &ctx),
            b.fact("Aspect", "b", 1, EventType::Create, name("B"), &ctx),
            b.fact("Aspect", "a", 2, EventType::Update, name("A2"), &ctx),
        ];
        let transitions = TimelineAggregator::new("Aspect").aggregate(facts);
        let order: Vec<(String, u64)> = transitions
            .iter()
            .map(|t| (t.fact.event.entity_id.0.clone(), t.fact.event.version))
            .collect();
        assert_eq!(
            order,
            vec![
                ("a".to_string(), 2u64),
                ("b".to_string(), 1),
                ("a".to_string(), 1)
            ]
        );
    }
}
