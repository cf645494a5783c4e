//! Catalog history: entity versioning and history reconstruction.
//!
//! The core primitive is a [`HistoryFact`]: the structural diff ([`Payload`])
//! of one committed mutation of one graph vertex, tagged with a
//! [`HistoryEvent`] saying who changed what, when, at which version, and in
//! which session.
//!
//! Facts are **captured** at commit time by diffing a baseline [`Snapshot`]
//! against the entity's live state, **persisted** append-only in a
//! [`HistoryLog`] inside the caller's write transaction, and later
//! **replayed** per entity by the [`TimelineAggregator`] to rebuild
//! before/after snapshot pairs that the [`DeltaPresenter`] turns into
//! human-readable [`FieldDelta`]s.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use catalog_history::{
//!     diff, EventType, HistoryContext, HistoryEvent, HistoryFact, HistoryLog, HistoryStore,
//!     EntityRef, Snapshot, TimelineAggregator,
//! };
//!
//! let log = HistoryLog::open("catalog-history.redb").unwrap();
//! let ctx = HistoryContext::new("admin");
//!
//! let id = EntityRef::new();
//! let after = Snapshot::new().with_data("name", "Length");
//! let payload = diff(&Snapshot::new(), &after);
//! let event = HistoryEvent::new("Aspect", id, 1, EventType::Create, &ctx);
//! log.append(&HistoryFact::new(event, payload)).unwrap();
//!
//! let facts = log.query_by_classes(&["Aspect"]).unwrap();
//! let transitions = TimelineAggregator::new("Aspect").aggregate(facts);
//! assert_eq!(transitions.len(), 1);
//! ```

mod delta;
mod fact;
mod names;
mod snapshot;
mod store;
mod timeline;
mod value;

use std::fmt::Display;
use std::time::Instant;

pub use delta::{
    child_deltas, ChildDescriber, DeltaPresenter, FieldDelta, HistoryRecord, NameResolver,
    Placeholders, PresenterProfile, ResolutionContext,
};
pub use fact::{
    diff, links_of_type, EventType, FactId, HistoryAware, HistoryContext, HistoryEvent,
    HistoryFact, LinkSplit, Payload, SessionId,
};
pub use names::HistoricalNames;
pub use snapshot::{EntityRef, MutableSnapshot, Snapshot};
pub use store::{HistoryLog, HistoryStore};
pub use timeline::{
    canonical_order, display_order, reconstruct_timeline, replay, AggregatedTransition,
    ChildRelation, SnapshotView, TimelineAggregator, Transition,
};
pub use value::{LinkTarget, ScalarValue, TypeTag};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("storage error: {0}")]
    Storage(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("history invariant violated: {0}")]
    Invariant(String),
}

impl From<redb::DatabaseError> for HistoryError {
    fn from(e: redb::DatabaseError) -> Self {
        HistoryError::Storage(e.to_string())
    }
}
impl From<redb::TransactionError> for HistoryError {
    fn from(e: redb::TransactionError) -> Self {
        HistoryError::Storage(e.to_string())
    }
}
impl From<redb::TableError> for HistoryError {
    fn from(e: redb::TableError) -> Self {
        HistoryError::Storage(e.to_string())
    }
}
impl From<redb::StorageError> for HistoryError {
    fn from(e: redb::StorageError) -> Self {
        HistoryError::Storage(e.to_string())
    }
}
impl From<redb::CommitError> for HistoryError {
    fn from(e: redb::CommitError) -> Self {
        HistoryError::Storage(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HistoryError>;

/// Run `f` and emit a `debug` event with how long it took.
///
/// Used around bulk lookups and per-entity replay so slow history reads
/// show up in the logs without a metrics layer.
pub fn log_time<T>(what: impl Display, f: impl FnOnce() -> T) -> T {
    let started = Instant::now();
    let out = f();
    tracing::debug!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        "{what}"
    );
    out
}
