use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::fact::HistoryFact;
use crate::snapshot::EntityRef;
use crate::timeline::canonical_order;

/// Names an entity class carried over time, rebuilt from its facts.
///
/// Lets a delta render a referenced entity with the name it had when the
/// change happened rather than its current one.
#[derive(Debug, Clone, Default)]
pub struct HistoricalNames {
    /// Per entity, `(timestamp, name)` pairs in replay order.
    names: HashMap<EntityRef, Vec<(DateTime<Utc>, String)>>,
}

impl HistoricalNames {
    /// Collect the values of `name_key` from every fact of `entity_class`.
    ///
    /// Delete facts are skipped: a removed entity keeps its last name.
    pub fn from_facts<'a>(
        facts: impl IntoIterator<Item = &'a HistoryFact>,
        entity_class: &str,
        name_key: &str,
    ) -> Self {
        let mut own: Vec<&HistoryFact> = facts
            .into_iter()
            .filter(|f| f.event.entity_class == entity_class && !f.event.event_type.is_delete())
            .collect();
        own.sort_by(|a, b| canonical_order(a, b));

        let mut names: HashMap<EntityRef, Vec<(DateTime<Utc>, String)>> = HashMap::new();
        for fact in own {
            if let Some(name) = fact.payload.data.get(name_key) {
                names
                    .entry(fact.event.entity_id.clone())
                    .or_default()
                    .push((fact.event.timestamp, name.clone()));
            }
        }
        Self { names }
    }

    /// The last name `id` had at or before `at`.
    ///
    /// `None` if the entity is unknown, was created after `at`, or its name
    /// was cleared at that point.
    pub fn name_at(&self, id: &EntityRef, at: DateTime<Utc>) -> Option<&str> {
        self.names
            .get(id)?
            .iter()
            .take_while(|(ts, _)| *ts <= at)
            .last()
            .map(|(_, name)| name.as_str())
            .filter(|name| !name.is_empty())
    }

    /// Most recent recorded name, regardless of time.
    pub fn latest(&self, id: &EntityRef) -> Option<&str> {
        self.names
            .get(id)?
            .last()
            .map(|(_, name)| name.as_str())
            .filter(|name| !name.is_empty())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fact::{diff, EventType, HistoryContext, HistoryEvent, Payload};
    use crate::snapshot::Snapshot;
    use chrono::Duration;

    fn named(id: &str, version: u64, name: &str, at: DateTime<Utc>) -> HistoryFact {
        let ctx = HistoryContext::new("admin");
        let payload = diff(&Snapshot::new(), &Snapshot::new().with_data("name", name));
        let id = EntityRef::from(id);
        let mut event = HistoryEvent::new("Subject", id, version, EventType::Update, &ctx);
        event.timestamp = at;
        HistoryFact::new(event, payload)
    }

    #[test]
    fn name_at_picks_last_name_before_instant() {
        let t0: DateTime<Utc> = "2024-03-01T10:00:00Z".parse().unwrap();
        let facts = vec![
            named("s1", 2, "Beta", t0 + Duration::hours(2)),
            named("s1", 1, "Alpha", t0),
        ];
        let names = HistoricalNames::from_facts(&facts, "Subject", "name");
        let s1 = EntityRef::from("s1");

        assert_eq!(names.name_at(&s1, t0 - Duration::seconds(1)), None);
        assert_eq!(names.name_at(&s1, t0), Some("Alpha"));
        assert_eq!(names.name_at(&s1, t0 + Duration::hours(1)), Some("Alpha"));
        assert_eq!(names.name_at(&s1, t0 + Duration::hours(3)), Some("Beta"));
        assert_eq!(names.latest(&s1), Some("Beta"));
        assert_eq!(names.name_at(&EntityRef::from("nope"), t0), None);
    }

    #[test]
    fn other_classes_and_deletes_are_ignored() {
        let t0 = Utc::now();
        let mut deleted = named("s1", 2, "Gone", t0 + Duration::minutes(1));
        deleted.event.event_type = EventType::Delete;
        deleted.payload = Payload {
            data: [("name".to_string(), "Gone".to_string())].into(),
            ..Payload::default()
        };
        let mut foreign = named("a1", 1, "Aspect", t0);
        foreign.event.entity_class = "Aspect".into();

        let facts = [named("s1", 1, "Alpha", t0), deleted, foreign];
        let names = HistoricalNames::from_facts(&facts, "Subject", "name");
        assert_eq!(names.len(), 1);
        assert_eq!(names.latest(&EntityRef::from("s1")), Some("Alpha"));
    }
}
