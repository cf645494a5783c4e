use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use ulid::Ulid;
use uuid::Uuid;

use crate::snapshot::{EntityRef, Snapshot};

/// A stable, time-sortable identifier for a [`HistoryFact`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FactId(pub String);

impl FactId {
    pub fn new() -> Self {
        Self(Ulid::new().to_string())
    }
}

impl Default for FactId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for FactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Correlation id shared by every fact of one logical transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Create,
    Update,
    Delete,
    SoftDelete,
}

impl EventType {
    pub fn is_delete(self) -> bool {
        matches!(self, EventType::Delete | EventType::SoftDelete)
    }
}

/// Who changed which entity, when, at which version, in which session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEvent {
    pub entity_class: String,
    pub entity_id: EntityRef,
    pub version: u64,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub user: String,
    pub timestamp: DateTime<Utc>,
    pub session_id: SessionId,
}

impl HistoryEvent {
    /// Event stamped with the current time and the context's user and session.
    pub fn new(
        entity_class: impl Into<String>,
        entity_id: EntityRef,
        version: u64,
        event_type: EventType,
        ctx: &HistoryContext,
    ) -> Self {
        Self {
            entity_class: entity_class.into(),
            entity_id,
            version,
            event_type,
            user: ctx.user.clone(),
            timestamp: Utc::now(),
            session_id: ctx.session,
        }
    }
}

/// Structural diff between two snapshots.
///
/// A key present in `data` never appears in `added_links` or
/// `removed_links`. An empty string in `data` records a cleared field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    #[serde(default)]
    pub data: BTreeMap<String, String>,
    #[serde(default)]
    pub added_links: BTreeMap<String, Vec<EntityRef>>,
    #[serde(default)]
    pub removed_links: BTreeMap<String, Vec<EntityRef>>,
}

/// Relation keys of a payload, classified by how their targets moved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkSplit {
    /// Targets only added: the relation was populated.
    pub added: Vec<String>,
    /// Targets both added and removed: the relation was re-pointed.
    pub changed: Vec<String>,
    /// Targets only removed.
    pub removed: Vec<String>,
}

impl Payload {
    pub fn is_empty(&self) -> bool {
        self.data.is_empty() && self.added_links.is_empty() && self.removed_links.is_empty()
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

    /// The single target added to a to-one relation.
    pub fn added_single_for(&self, key: &str) -> Option<&EntityRef> {
        self.added_links.get(key).and_then(|ids| ids.first())
    }

    /// The single target removed from a to-one relation.
    pub fn removed_single_for(&self, key: &str) -> Option<&EntityRef> {
        self.removed_links.get(key).and_then(|ids| ids.first())
    }

    pub fn classify_links(&self) -> LinkSplit {
        let mut split = LinkSplit::default();
        for key in self.added_links.keys() {
            if self.removed_links.contains_key(key) {
                split.changed.push(key.clone());
            } else {
                split.added.push(key.clone());
            }
        }
        split.removed = self
            .removed_links
            .keys()
            .filter(|k| !self.added_links.contains_key(*k))
            .cloned()
            .collect();
        split
    }
}

/// The atomic unit of history: one event plus its structural diff.
///
/// Facts are immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryFact {
    pub id: FactId,
    pub event: HistoryEvent,
    pub payload: Payload,
}

impl HistoryFact {
    pub fn new(event: HistoryEvent, payload: Payload) -> Self {
        Self {
            id: FactId::new(),
            event,
            payload,
        }
    }

    /// An update that changed nothing; callers skip writing these.
    pub fn is_noop(&self) -> bool {
        self.event.event_type == EventType::Update && self.payload.is_empty()
    }
}

/// User and session every fact of one logical transaction is tagged with.
///
/// Passed explicitly to every capture call so sibling facts (a property and
/// its owning aspect, say) share one `session` and can be joined later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryContext {
    pub user: String,
    pub session: SessionId,
}

impl HistoryContext {
    /// A context with a fresh session.
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            session: SessionId::new(),
        }
    }
}

/// Compute the structural diff from `before` to `after`.
///
/// Data keys whose value differs are reported with the `after` value; a
/// key that disappeared (or became empty) is reported as `""`. Relation
/// targets are compared as sets: additions keep the `after` order,
/// removals keep the `before` order.
pub fn diff(before: &Snapshot, after: &Snapshot) -> Payload {
    let mut payload = Payload::default();

    let keys: BTreeSet<&String> = before.data.keys().chain(after.data.keys()).collect();
    for key in keys {
        let old = before.data_item(key);
        let new = after.data_item(key);
        if old != new {
            payload
                .data
                .insert(key.clone(), new.unwrap_or_default().to_string());
        }
    }

    for (key, targets) in &after.links {
        let known: HashSet<&EntityRef> = before.links_for(key).iter().collect();
        let added = fresh_targets(targets, &known);
        if !added.is_empty() {
            payload.added_links.insert(key.clone(), added);
        }
    }

    for (key, targets) in &before.links {
        let kept: HashSet<&EntityRef> = after.links_for(key).iter().collect();
        let removed = fresh_targets(targets, &kept);
        if !removed.is_empty() {
            payload.removed_links.insert(key.clone(), removed);
        }
    }

    payload
}

// Targets not in `exclude`, deduplicated, in encounter order.
fn fresh_targets(targets: &[EntityRef], exclude: &HashSet<&EntityRef>) -> Vec<EntityRef> {
    let mut seen = HashSet::new();
    targets
        .iter()
        .filter(|t| !exclude.contains(t) && seen.insert(*t))
        .cloned()
        .collect()
}

/// Every target ever added to relation `key` across `facts`.
pub fn links_of_type<'a>(
    facts: impl IntoIterator<Item = &'a HistoryFact>,
    key: &str,
) -> BTreeSet<EntityRef> {
    facts
        .into_iter()
        .flat_map(|f| {
            f.payload
                .added_links
                .get(key)
                .into_iter()
                .flatten()
                .chain(f.payload.removed_links.get(key).into_iter().flatten())
        })
        .cloned()
        .collect()
}

/// A graph vertex whose mutations are recorded as facts.
///
/// Implementors expose their identity and live state; the fact builders
/// are provided.
pub trait HistoryAware {
    fn entity_class(&self) -> &str;

    fn entity_ref(&self) -> EntityRef;

    fn version(&self) -> u64;

    /// Live state in snapshot form.
    fn current_snapshot(&self) -> Snapshot;

    fn to_fact(
        &self,
        ctx: &HistoryContext,
        event_type: EventType,
        payload: Payload,
    ) -> HistoryFact {
        let event = HistoryEvent::new(
            self.entity_class(),
            self.entity_ref(),
            self.version(),
            event_type,
            ctx,
        );
        HistoryFact::new(event, payload)
    }

    /// Full live state against the empty snapshot.
    fn to_create_fact(&self, ctx: &HistoryContext) -> HistoryFact {
        let payload = diff(&Snapshot::new(), &self.current_snapshot());
        self.to_fact(ctx, EventType::Create, payload)
    }

    /// Live state against the baseline taken before the mutation.
    fn to_update_fact(&self, ctx: &HistoryContext, base: &Snapshot) -> HistoryFact {
        let payload = diff(base, &self.current_snapshot());
        self.to_fact(ctx, EventType::Update, payload)
    }

    /// Deletion carries no payload; relation state is kept as it was.
    fn to_delete_fact(&self, ctx: &HistoryContext) -> HistoryFact {
        self.to_fact(ctx, EventType::Delete, Payload::default())
    }

    fn to_soft_delete_fact(&self, ctx: &HistoryContext) -> HistoryFact {
        self.to_fact(ctx, EventType::SoftDelete, Payload::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
