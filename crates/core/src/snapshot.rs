use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::ops::Deref;
use ulid::Ulid;

use crate::fact::Payload;

/// Identifier of a graph vertex referenced from history.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityRef(pub String);

impl EntityRef {
    /// A fresh, time-sortable identifier.
    pub fn new() -> Self {
        Self(Ulid::new().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EntityRef {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntityRef {
    fn from(s: &str) -> Self {
        EntityRef(s.to_string())
    }
}
impl From<String> for EntityRef {
    fn from(s: String) -> Self {
        EntityRef(s)
    }
}

/// Observable state of one entity at an instant.
///
/// `data` holds scalar fields serialised as strings, `links` holds, per
/// relation name, the ordered list of referenced entities. A key lives in
/// at most one of the two maps, an empty string is never stored in `data`
/// and a relation with no targets is absent from `links`. The empty
/// snapshot stands for "entity did not exist yet".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub data: BTreeMap<String, String>,
    pub links: BTreeMap<String, Vec<EntityRef>>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty() && self.links.is_empty()
    }

    /// Set a scalar field. Empty values are treated as absent.
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        if !value.is_empty() {
            self.data.insert(key.into(), value);
        }
        self
    }

    /// Set a scalar field from an optional value; `None` leaves it absent.
    pub fn with_optional_data<V: ToString>(self, key: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(v) => self.with_data(key, v.to_string()),
            None => self,
        }
    }

    /// Append one target to a relation.
    pub fn with_link(mut self, key: impl Into<String>, target: EntityRef) -> Self {
        let targets = self.links.entry(key.into()).or_default();
        if !targets.contains(&target) {
            targets.push(target);
        }
        self
    }

    /// Set a relation to the given targets, in order. No targets means no relation.
    pub fn with_links(
        mut self,
        key: impl Into<String>,
        targets: impl IntoIterator<Item = EntityRef>,
    ) -> Self {
        let mut seen = HashSet::new();
        let targets: Vec<EntityRef> = targets
            .into_iter()
            .filter(|t| seen.insert(t.clone()))
            .collect();
        let key = key.into();
        if targets.is_empty() {
            self.links.remove(&key);
        } else {
            self.links.insert(key, targets);
        }
        self
    }

    pub fn data_item(&self, key: &str) -> Option<&str> {
        self.data
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn data_or_empty(&self, key: &str) -> &str {
        self.data_item(key).unwrap_or("")
    }

    pub fn links_for(&self, key: &str) -> &[EntityRef] {
        self.links.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn first_link(&self, key: &str) -> Option<&EntityRef> {
        self.links_for(key).first()
    }

    pub fn has_links(&self, key: &str) -> bool {
        !self.links_for(key).is_empty()
    }

    /// Map the first target of a to-one relation, if any.
    pub fn resolved_link<T>(&self, key: &str, f: impl FnOnce(&EntityRef) -> T) -> Option<T> {
        self.first_link(key).map(f)
    }

    pub(crate) fn debug_assert_disjoint(&self) {
        debug_assert!(
            self.data.keys().all(|k| !self.links.contains_key(k)),
            "snapshot key present in both data and links: {:?}",
            self.data
                .keys()
                .filter(|k| self.links.contains_key(*k))
                .collect::<Vec<_>>()
        );
    }
}

/// Running snapshot used while replaying facts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutableSnapshot {
    inner: Snapshot,
}

impl MutableSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one payload in place.
    ///
    /// Data entries overwrite by key (an empty value clears the field).
    /// Removed targets are dropped first and a relation left without
    /// targets disappears; added targets are then appended once each,
    /// keeping first-seen order.
    pub fn apply(&mut self, payload: &Payload) {
        for (key, value) in &payload.data {
            if value.is_empty() {
                self.inner.data.remove(key);
            } else {
                self.inner.data.insert(key.clone(), value.clone());
            }
        }

        for (key, removed) in &payload.removed_links {
            if let Some(targets) = self.inner.links.get_mut(key) {
                targets.retain(|t| !removed.contains(t));
                if targets.is_empty() {
                    self.inner.links.remove(key);
                }
            }
        }

        for (key, added) in &payload.added_links {
            if added.is_empty() {
                continue;
            }
            let targets = self.inner.links.entry(key.clone()).or_default();
            for target in added {
                if !targets.contains(target) {
                    targets.push(target.clone());
                }
            }
        }

        self.inner.debug_assert_disjoint();
    }

    pub fn set_data(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        let key = key.into();
        if value.is_empty() {
            self.inner.data.remove(&key);
        } else {
            self.inner.data.insert(key, value);
        }
    }

    /// Frozen copy of the current state.
    pub fn immutable(&self) -> Snapshot {
        self.inner.clone()
    }

    pub fn into_snapshot(self) -> Snapshot {
        self.inner
    }
}

impl Deref for MutableSnapshot {
    type Target = Snapshot;

    fn deref(&self) -> &Snapshot {
        &self.inner
    }
}

impl From<Snapshot> for MutableSnapshot {
    fn from(inner: Snapshot) -> Self {
        Self { inner }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fact::diff;
    use proptest::prelude::*;

    fn r(id: &str) -> EntityRef {
        EntityRef::from(id)
    }

    fn links(key: &str, ids: &[&str]) -> BTreeMap<String, Vec<EntityRef>> {
        let mut m = BTreeMap::new();
        m.insert(key.to_string(), ids.iter().map(|i| r(i)).collect());
        m
    }

    #[test]
    fn empty_snapshot_means_not_existing() {
        assert!(Snapshot::new().is_empty());
        assert!(!Snapshot::new().with_data("name", "A").is_empty());
        assert!(Snapshot::new().with_data("name", "").is_empty());
        assert!(Snapshot::new().with_links("subject", Vec::new()).is_empty());
    }

    #[test]
    fn apply_overwrites_data_last_write_wins() {
        let mut s = MutableSnapshot::new();
        let mut p = Payload::default();
        p.data.insert("name".into(), "A".into());
        s.apply(&p);
        p.data.insert("name".into(), "B".into());
        s.apply(&p);
        assert_eq!(s.data_item("name"), Some("B"));
    }

    #[test]
    fn apply_empty_value_clears_field() {
        let mut s = MutableSnapshot::from(Snapshot::new().with_data("description", "old"));
        let mut p = Payload::default();
        p.data.insert("description".into(), String::new());
        s.apply(&p);
        assert_eq!(s.data_item("description"), None);
        assert!(s.is_empty());
    }

    #[test]
    fn added_links_are_idempotent_and_ordered() {
        let mut s = MutableSnapshot::new();
        let p = Payload {
            added_links: links("x", &["a", "b"]),
            ..Payload::default()
        };
        s.apply(&p);
        s.apply(&p);
        assert_eq!(s.links_for("x"), &[r("a"), r("b")]);
    }

    #[test]
    fn removing_last_target_drops_relation() {
        let mut s = MutableSnapshot::from(Snapshot::new().with_link("subject", r("s1")));
        let p = Payload {
            removed_links: links("subject", &["s1"]),
            ..Payload::default()
        };
        s.apply(&p);
        assert!(!s.links.contains_key("subject"));
        assert!(!s.has_links("subject"));
    }

    #[test]
    fn replace_keeps_single_target() {
        let mut s = MutableSnapshot::from(Snapshot::new().with_link("subject", r("s1")));
        let p = Payload {
            added_links: links("subject", &["s2"]),
            removed_links: links("subject", &["s1"]),
            ..Payload::default()
        };
        s.apply(&p);
        assert_eq!(s.links_for("subject"), &[r("s2")]);
    }

    #[test]
    fn apply_leaves_payload_untouched() {
        let p = Payload {
            added_links: links("x", &["a"]),
            ..Payload::default()
        };
        let copy = p.clone();
        MutableSnapshot::new().apply(&p);
        assert_eq!(p, copy);
    }

    #[test]
    fn resolved_link_maps_first_target() {
        let s = Snapshot::new().with_links("refs", vec![r("a"), r("b"), r("a")]);
        assert_eq!(s.links_for("refs").len(), 2);
        assert_eq!(s.resolved_link("refs", |id| id.to_string()), Some("a".into()));
        assert_eq!(s.resolved_link("missing", |id| id.to_string()), None);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "present in both data and links")]
    fn key_used_as_data_and_link_panics() {
        let mut s = MutableSnapshot::from(Snapshot::new().with_data("subject", "Physics"));
        let p = Payload {
            added_links: links("subject", &["s1"]),
            ..Payload::default()
        };
        s.apply(&p);
    }

    // -----------------------------------------------------------------------
    // Properties
    // -----------------------------------------------------------------------

    fn value_strategy() -> impl Strategy<Value = String> {
        proptest::string::string_regex("[a-z]{1,6}").unwrap_or_else(|e| panic!("regex: {e}"))
    }

    fn ids_strategy() -> impl Strategy<Value = Vec<EntityRef>> {
        prop::collection::vec(
            prop_oneof![Just("a"), Just("b"), Just("c"), Just("d")].prop_map(r),
            0..4,
        )
    }

    /// Data keys and link keys come from disjoint domains.
    fn snapshot_strategy() -> impl Strategy<Value = Snapshot> {
        (
            prop::collection::btree_map(
                prop_oneof![Just("name"), Just("description"), Just("measure")],
                value_strategy(),
                0..3,
            ),
            prop::collection::btree_map(
                prop_oneof![Just("subject"), Just("properties")],
                ids_strategy(),
                0..2,
            ),
        )
            .prop_map(|(data, links)| {
                let mut s = Snapshot::new();
                for (k, v) in data {
                    s = s.with_data(k, v);
                }
                for (k, ids) in links {
                    s = s.with_links(k, ids);
                }
                s
            })
    }

    type Normalized = (
        BTreeMap<String, String>,
        BTreeMap<String, std::collections::BTreeSet<EntityRef>>,
    );

    /// Relations compared as sets: diffs are set differences, so replay
    /// restores membership but not a reordering of existing targets.
    fn normalized(s: &Snapshot) -> Normalized {
        let links = s
            .links
            .iter()
            .map(|(k, ids)| (k.clone(), ids.iter().cloned().collect()))
            .collect();
        (s.data.clone(), links)
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]

        #[test]
        fn diff_then_apply_reconstructs_after(
            before in snapshot_strategy(),
            after in snapshot_strategy()
        ) {
            let payload = diff(&before, &after);
            let mut running = MutableSnapshot::from(before);
            running.apply(&payload);
            prop_assert_eq!(normalized(&running), normalized(&after));
        }

        #[test]
        fn diff_of_identical_snapshots_is_empty(s in snapshot_strategy()) {
            prop_assert!(diff(&s, &s).is_empty());
        }

        #[test]
        fn replay_is_deterministic(states in prop::collection::vec(snapshot_strategy(), 1..6)) {
            let mut payloads = Vec::new();
            let mut prev = Snapshot::new();
            for s in &states {
                payloads.push(diff(&prev, s));
                prev = s.clone();
            }

            let mut first = MutableSnapshot::new();
            let mut second = MutableSnapshot::new();
            for p in &payloads {
                first.apply(p);
            }
            for p in &payloads {
                second.apply(p);
            }
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(normalized(&first), normalized(&prev));
        }
    }
}
