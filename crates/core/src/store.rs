use redb::{Database, ReadableDatabase, TableDefinition, WriteTransaction};
use std::path::Path;
use std::sync::Arc;

use crate::fact::{HistoryFact, SessionId};
use crate::snapshot::EntityRef;
use crate::{HistoryError, Result};

/// Composite string key: `"{entity_class}:{entity_id}:{fact_id}"`.
///
/// Facts of one entity sit next to each other; the ULID fact id keeps them
/// in insertion order within a millisecond-resolution clock. Ordering for
/// replay is still decided by the aggregator, never by the key.
const FACTS: TableDefinition<&str, &str> = TableDefinition::new("history_facts");

/// Append-only persistence of facts.
///
/// Query results come back in unspecified order.
pub trait HistoryStore {
    /// Append one fact in its own transaction.
    fn append(&self, fact: &HistoryFact) -> Result<()>;

    fn query_all(&self) -> Result<Vec<HistoryFact>>;

    fn query_by_classes(&self, classes: &[&str]) -> Result<Vec<HistoryFact>>;

    fn query_by_entity_id(&self, id: &EntityRef) -> Result<Vec<HistoryFact>>;

    fn query_by_session(&self, session: &SessionId) -> Result<Vec<HistoryFact>>;
}

/// redb-backed history log.
///
/// The underlying [`Database`] may be shared with the domain tables so a
/// fact is written in the same [`WriteTransaction`] as the mutation it
/// describes: see [`HistoryLog::append_in_txn`].
pub struct HistoryLog {
    db: Arc<Database>,
}

impl HistoryLog {
    /// Open or create a history database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Database::create(path)?;
        Self::from_shared(Arc::new(db))
    }

    /// Create an in-memory history database (no file I/O).
    pub fn open_in_memory() -> Result<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder().create_with_backend(backend)?;
        Self::from_shared(Arc::new(db))
    }

    /// Use an already-open database, creating the facts table if needed.
    pub fn from_shared(db: Arc<Database>) -> Result<Self> {
        {
            let write_txn = db.begin_write()?;
            write_txn.open_table(FACTS)?;
            write_txn.commit()?;
        }
        Ok(Self { db })
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    /// Write a single fact inside an already-open [`WriteTransaction`].
    ///
    /// The caller owns the transaction: committing it publishes the fact
    /// together with the domain mutation, dropping it discards both. A fact
    /// id that is already present is an invariant violation.
    pub fn append_in_txn(write_txn: &WriteTransaction, fact: &HistoryFact) -> Result<()> {
        let key = fact_key(fact);
        let value = serde_json::to_string(fact)?;
        let mut table = write_txn.open_table(FACTS)?;
        if table.insert(key.as_str(), value.as_str())?.is_some() {
            return Err(HistoryError::Invariant(format!(
                "fact {} already recorded",
                fact.id
            )));
        }
        tracing::debug!(
            fact_id = %fact.id,
            entity_class = %fact.event.entity_class,
            entity_id = %fact.event.entity_id,
            version = fact.event.version,
            event_type = ?fact.event.event_type,
            session = %fact.event.session_id,
            "history fact appended"
        );
        Ok(())
    }

    // Internal: scan facts table, filter by key prefix, apply predicate.
    fn scan_prefix(
        &self,
        prefix: &str,
        predicate: impl Fn(&HistoryFact) -> bool,
    ) -> Result<Vec<HistoryFact>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(FACTS)?;
        let mut results = Vec::new();

        for entry in table.range(prefix..)? {
            let (k, v) = entry?;
            if !k.value().starts_with(prefix) {
                break;
            }
            let fact: HistoryFact = serde_json::from_str(v.value())?;
            if predicate(&fact) {
                results.push(fact);
            }
        }

        Ok(results)
    }
}

impl HistoryStore for HistoryLog {
    fn append(&self, fact: &HistoryFact) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        Self::append_in_txn(&write_txn, fact)?;
        write_txn.commit()?;
        Ok(())
    }

    fn query_all(&self) -> Result<Vec<HistoryFact>> {
        self.scan_prefix("", |_| true)
    }

    fn query_by_classes(&self, classes: &[&str]) -> Result<Vec<HistoryFact>> {
        let mut results = Vec::new();
        for class in classes {
            let prefix = format!("{class}:");
            results.extend(self.scan_prefix(&prefix, |_| true)?);
        }
        Ok(results)
    }

    // Phase 0: linear scan. Entity ids are unique across classes.
    fn query_by_entity_id(&self, id: &EntityRef) -> Result<Vec<HistoryFact>> {
        self.scan_prefix("", |f| f.event.entity_id == *id)
    }

    fn query_by_session(&self, session: &SessionId) -> Result<Vec<HistoryFact>> {
        self.scan_prefix("", |f| f.event.session_id == *session)
    }
}

fn fact_key(fact: &HistoryFact) -> String {
    format!(
        "{}:{}:{}",
        fact.event.entity_class, fact.event.entity_id, fact.id
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
