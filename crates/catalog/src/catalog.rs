//! Aspect catalog with a full change history.
//!
//! Subjects, reference books, aspects, aspect properties and the objects
//! built from them live in redb tables next to the history log. Every mutation runs in one
//! [`redb::WriteTransaction`]: the entity rows and the facts describing
//! them are committed together or not at all.
//!
//! # Usage
//!
//! ```rust,no_run
//! use catalog_aspects::{AspectInput, Catalog};
//! use catalog_history::HistoryContext;
//!
//! let catalog = Catalog::open("./catalog.redb").unwrap();
//! let ctx = HistoryContext::new("admin");
//!
//! let physics = catalog.create_subject(&ctx, "Physics", None).unwrap();
//! let mut length = AspectInput::new("Length");
//! length.subject = Some(physics.id.clone());
//! let length = catalog.save_aspect(&ctx, length).unwrap();
//!
//! for entry in catalog.aspect_history().unwrap() {
//!     println!("{} v{}: {:?}", entry.name, entry.event.version, entry.changes);
//! }
//! # let _ = length;
//! ```

mod aspect_history;
mod config;
mod error;
mod model;
mod objects;

use catalog_history::{
    EntityRef, HistoryAware, HistoryContext, HistoryFact, HistoryLog, NameResolver,
};
use redb::{Database, ReadableDatabase, ReadableTable, Table, TableDefinition, WriteTransaction};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

pub use aspect_history::{AspectHistory, AspectView, PropertyDescriber, PropertyView};
pub use config::{CatalogConfig, NameResolution};
pub use error::{CatalogError, Result};
pub use model::{
    aspect_keys, property_keys, Aspect, AspectInput, AspectProperty, PropertyCardinality,
    PropertyInput, ReferenceBook, Subject, ASPECT_CLASS, ASPECT_PROPERTY_CLASS,
    REFERENCE_BOOK_CLASS, SUBJECT_CLASS,
};
pub use objects::{
    object_keys, object_property_keys, object_value_keys, Object, ObjectProperty, ObjectValue,
    ObjectValueInput, OBJECT_CLASS, OBJECT_PROPERTY_CLASS, OBJECT_VALUE_CLASS,
};

use error::check_version;

// Entity tables: key = entity id, value = JSON-serialised entity.
const SUBJECTS: TableDefinition<&str, &str> = TableDefinition::new("subjects");
const REFERENCE_BOOKS: TableDefinition<&str, &str> = TableDefinition::new("reference_books");
const ASPECTS: TableDefinition<&str, &str> = TableDefinition::new("aspects");
const PROPERTIES: TableDefinition<&str, &str> = TableDefinition::new("aspect_properties");
const OBJECTS: TableDefinition<&str, &str> = TableDefinition::new("objects");
const OBJECT_PROPERTIES: TableDefinition<&str, &str> = TableDefinition::new("object_properties");
const OBJECT_VALUES: TableDefinition<&str, &str> = TableDefinition::new("object_values");

/// The catalog: domain tables plus the history log, in one database.
pub struct Catalog {
    db: Arc<Database>,
    log: HistoryLog,
    config: CatalogConfig,
}

impl Catalog {
    /// Open or create a catalog at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_config(CatalogConfig::default().with_db_path(path.as_ref()))
    }

    /// Create an in-memory catalog (no file I/O).
    pub fn open_in_memory() -> Result<Self> {
        Self::with_config(CatalogConfig::default())
    }

    /// Open the catalog described by `CATALOG_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::with_config(CatalogConfig::from_env())
    }

    pub fn with_config(config: CatalogConfig) -> Result<Self> {
        let db = match &config.db_path {
            Some(path) => Database::create(path)?,
            None => {
                let backend = redb::backends::InMemoryBackend::new();
                Database::builder().create_with_backend(backend)?
            }
        };
        let db = Arc::new(db);
        {
            let write_txn = db.begin_write()?;
            write_txn.open_table(SUBJECTS)?;
            write_txn.open_table(REFERENCE_BOOKS)?;
            write_txn.open_table(ASPECTS)?;
            write_txn.open_table(PROPERTIES)?;
            write_txn.open_table(OBJECTS)?;
            write_txn.open_table(OBJECT_PROPERTIES)?;
            write_txn.open_table(OBJECT_VALUES)?;
            write_txn.commit()?;
        }
        let log = HistoryLog::from_shared(Arc::clone(&db))?;
        tracing::info!(
            path = ?config.db_path,
            name_resolution = %config.name_resolution,
            "catalog opened"
        );
        Ok(Self { db, log, config })
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn history_log(&self) -> &HistoryLog {
        &self.log
    }

    // -----------------------------------------------------------------------
    // Subjects
    // -----------------------------------------------------------------------

    pub fn create_subject(
        &self,
        ctx: &HistoryContext,
        name: &str,
        description: Option<&str>,
    ) -> Result<Subject> {
        let name = validated_name("subject", name)?;
        let write_txn = self.db.begin_write()?;
        let subject = {
            let mut table = write_txn.open_table(SUBJECTS)?;
            let existing: Vec<Subject> = read_all(&table)?;
            if existing.iter().any(|s| s.name == name) {
                return Err(CatalogError::AlreadyExists(format!("subject {name}")));
            }
            let subject = Subject {
                id: EntityRef::new(),
                name,
                description: non_empty(description.map(str::to_string)),
                objects: Vec::new(),
                version: 1,
            };
            write_json(&mut table, &subject.id, &subject)?;
            subject
        };
        record(&write_txn, &[subject.to_create_fact(ctx)])?;
        write_txn.commit()?;
        Ok(subject)
    }

    /// Rename or re-describe a subject. Unchanged input writes nothing.
    pub fn update_subject(
        &self,
        ctx: &HistoryContext,
        id: &EntityRef,
        expected_version: u64,
        name: &str,
        description: Option<&str>,
    ) -> Result<Subject> {
        let name = validated_name("subject", name)?;
        let write_txn = self.db.begin_write()?;
        let (subject, fact) = {
            let mut table = write_txn.open_table(SUBJECTS)?;
            let stored: Subject = require(read_json(&table, id)?, "subject", id)?;
            check_version(id, expected_version, stored.version)?;

            let base = stored.current_snapshot();
            let mut subject = stored.clone();
            subject.name = name;
            subject.description = non_empty(description.map(str::to_string));
            subject.version += 1;
            let fact = subject.to_update_fact(ctx, &base);
            if fact.is_noop() {
                tracing::debug!(id = %id, "subject unchanged");
                return Ok(stored);
            }
            write_json(&mut table, id, &subject)?;
            (subject, fact)
        };
        record(&write_txn, &[fact])?;
        write_txn.commit()?;
        Ok(subject)
    }

    /// Hard-delete a subject no live aspect or object refers to.
    pub fn remove_subject(
        &self,
        ctx: &HistoryContext,
        id: &EntityRef,
        expected_version: u64,
    ) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        let fact = {
            let mut table = write_txn.open_table(SUBJECTS)?;
            let aspects = write_txn.open_table(ASPECTS)?;
            let mut subject: Subject = require(read_json(&table, id)?, "subject", id)?;
            check_version(id, expected_version, subject.version)?;

            let linked = !subject.objects.is_empty()
                || read_all::<Aspect>(&aspects)?
                    .iter()
                    .any(|a| !a.deleted && a.subject.as_ref() == Some(id));
            if linked {
                return Err(CatalogError::HasLinkedEntities(id.clone()));
            }
            subject.version += 1;
            table.remove(id.as_str())?;
            subject.to_delete_fact(ctx)
        };
        record(&write_txn, &[fact])?;
        write_txn.commit()?;
        tracing::info!(id = %id, "subject removed");
        Ok(())
    }

    pub fn subject(&self, id: &EntityRef) -> Result<Subject> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SUBJECTS)?;
        require(read_json(&table, id)?, "subject", id)
    }

    pub fn subjects(&self) -> Result<Vec<Subject>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SUBJECTS)?;
        read_all(&table)
    }

    // -----------------------------------------------------------------------
    // Reference books
    // -----------------------------------------------------------------------

    /// Attach a new reference book to an aspect.
    ///
    /// Also records an update of the aspect in the same session, since the
    /// aspect gains a `referenceBook` link.
    pub fn create_reference_book(
        &self,
        ctx: &HistoryContext,
        aspect_id: &EntityRef,
        name: &str,
    ) -> Result<ReferenceBook> {
        let name = validated_name("reference book", name)?;
        let write_txn = self.db.begin_write()?;
        let (book, facts) = {
            let mut books = write_txn.open_table(REFERENCE_BOOKS)?;
            let mut aspects = write_txn.open_table(ASPECTS)?;
            let mut aspect = live_aspect(&aspects, aspect_id)?;
            if let Some(existing) = &aspect.reference_book {
                return Err(CatalogError::AlreadyExists(format!(
                    "reference book {existing} for aspect {aspect_id}"
                )));
            }

            let book = ReferenceBook {
                id: EntityRef::new(),
                aspect_id: aspect_id.clone(),
                name,
                version: 1,
            };
            write_json(&mut books, &book.id, &book)?;

            let base = aspect.current_snapshot();
            aspect.reference_book = Some(book.id.clone());
            aspect.version += 1;
            write_json(&mut aspects, aspect_id, &aspect)?;

            let facts = vec![book.to_create_fact(ctx), aspect.to_update_fact(ctx, &base)];
            (book, facts)
        };
        record(&write_txn, &facts)?;
        write_txn.commit()?;
        Ok(book)
    }

    pub fn rename_reference_book(
        &self,
        ctx: &HistoryContext,
        id: &EntityRef,
        expected_version: u64,
        name: &str,
    ) -> Result<ReferenceBook> {
        let name = validated_name("reference book", name)?;
        let write_txn = self.db.begin_write()?;
        let (book, fact) = {
            let mut books = write_txn.open_table(REFERENCE_BOOKS)?;
            let stored: ReferenceBook = require(read_json(&books, id)?, "reference book", id)?;
            check_version(id, expected_version, stored.version)?;

            let base = stored.current_snapshot();
            let mut book = stored.clone();
            book.name = name;
            book.version += 1;
            let fact = book.to_update_fact(ctx, &base);
            if fact.is_noop() {
                return Ok(stored);
            }
            write_json(&mut books, id, &book)?;
            (book, fact)
        };
        record(&write_txn, &[fact])?;
        write_txn.commit()?;
        Ok(book)
    }

    /// Hard-delete a reference book and unlink it from its aspect.
    pub fn remove_reference_book(
        &self,
        ctx: &HistoryContext,
        id: &EntityRef,
        expected_version: u64,
    ) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        let facts = {
            let mut books = write_txn.open_table(REFERENCE_BOOKS)?;
            let mut aspects = write_txn.open_table(ASPECTS)?;
            let mut book: ReferenceBook = require(read_json(&books, id)?, "reference book", id)?;
            check_version(id, expected_version, book.version)?;

            book.version += 1;
            books.remove(id.as_str())?;
            let mut facts = vec![book.to_delete_fact(ctx)];

            let owner: Option<Aspect> = read_json(&aspects, &book.aspect_id)?;
            if let Some(mut aspect) = owner.filter(|a| a.reference_book.as_ref() == Some(id)) {
                let base = aspect.current_snapshot();
                aspect.reference_book = None;
                aspect.version += 1;
                write_json(&mut aspects, &aspect.id, &aspect)?;
                facts.push(aspect.to_update_fact(ctx, &base));
            }
            facts
        };
        record(&write_txn, &facts)?;
        write_txn.commit()?;
        tracing::info!(id = %id, "reference book removed");
        Ok(())
    }

    pub fn reference_book(&self, id: &EntityRef) -> Result<ReferenceBook> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(REFERENCE_BOOKS)?;
        require(read_json(&table, id)?, "reference book", id)
    }

    // -----------------------------------------------------------------------
    // Aspects
    // -----------------------------------------------------------------------

    /// Create or update an aspect together with its listed properties.
    ///
    /// Property facts and the aspect fact share the context's session. An
    /// update that changes only properties still records an (empty) aspect
    /// update so the property changes show up in the aspect's timeline.
    pub fn save_aspect(&self, ctx: &HistoryContext, input: AspectInput) -> Result<Aspect> {
        let name = validated_name("aspect", &input.name)?;
        let write_txn = self.db.begin_write()?;
        let (aspect, facts) = {
            let mut aspects = write_txn.open_table(ASPECTS)?;
            let mut properties = write_txn.open_table(PROPERTIES)?;
            let subjects = write_txn.open_table(SUBJECTS)?;

            if let Some(subject_id) = &input.subject {
                require::<Subject>(read_json(&subjects, subject_id)?, "subject", subject_id)?;
            }

            let (mut aspect, base) = match &input.id {
                None => {
                    let aspect = Aspect {
                        id: EntityRef::new(),
                        name: name.clone(),
                        base_type: None,
                        description: None,
                        measure: None,
                        subject: None,
                        reference_book: None,
                        properties: Vec::new(),
                        version: 0,
                        deleted: false,
                    };
                    (aspect, None)
                }
                Some(id) => {
                    let stored = live_aspect(&aspects, id)?;
                    check_version(id, input.version, stored.version)?;
                    let base = stored.current_snapshot();
                    (stored, Some(base))
                }
            };
            let unchanged = aspect.clone();

            aspect.name = name;
            aspect.base_type = non_empty(input.base_type.clone());
            aspect.description = non_empty(input.description.clone());
            aspect.measure = non_empty(input.measure.clone());
            aspect.subject = input.subject.clone();

            let mut facts = Vec::new();
            for property in &input.properties {
                if property.aspect != aspect.id {
                    live_aspect(&aspects, &property.aspect)?;
                }
                if let Some(fact) = save_property(&mut properties, &mut aspect, property, ctx)? {
                    facts.push(fact);
                }
            }

            let aspect_fact = match base {
                None => {
                    aspect.version = 1;
                    aspect.to_create_fact(ctx)
                }
                Some(base) => {
                    aspect.version += 1;
                    let fact = aspect.to_update_fact(ctx, &base);
                    if fact.is_noop() && facts.is_empty() {
                        tracing::debug!(id = %aspect.id, "aspect unchanged");
                        return Ok(unchanged);
                    }
                    fact
                }
            };
            write_json(&mut aspects, &aspect.id, &aspect)?;
            facts.push(aspect_fact);
            (aspect, facts)
        };
        record(&write_txn, &facts)?;
        write_txn.commit()?;
        Ok(aspect)
    }

    /// Remove an aspect.
    ///
    /// An aspect no other aspect's property is typed by is hard-deleted
    /// along with its own properties and reference book. A referenced one
    /// is only marked deleted, and only when `force` is set.
    pub fn remove_aspect(
        &self,
        ctx: &HistoryContext,
        id: &EntityRef,
        expected_version: u64,
        force: bool,
    ) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        let (facts, soft) = {
            let mut aspects = write_txn.open_table(ASPECTS)?;
            let mut properties = write_txn.open_table(PROPERTIES)?;
            let mut books = write_txn.open_table(REFERENCE_BOOKS)?;
            let mut aspect = live_aspect(&aspects, id)?;
            check_version(id, expected_version, aspect.version)?;

            let mut linked = false;
            for property in read_all::<AspectProperty>(&properties)? {
                if property.aspect != *id || property.parent == *id {
                    continue;
                }
                let parent: Option<Aspect> = read_json(&aspects, &property.parent)?;
                if parent.is_some_and(|p| !p.deleted) {
                    linked = true;
                    break;
                }
            }

            let mut facts = Vec::new();
            if linked {
                if !force {
                    return Err(CatalogError::HasLinkedEntities(id.clone()));
                }
                aspect.deleted = true;
                aspect.version += 1;
                write_json(&mut aspects, id, &aspect)?;
                facts.push(aspect.to_soft_delete_fact(ctx));
            } else {
                for property_id in &aspect.properties {
                    let found: Option<AspectProperty> = read_json(&properties, property_id)?;
                    if let Some(mut property) = found {
                        property.version += 1;
                        properties.remove(property_id.as_str())?;
                        facts.push(property.to_delete_fact(ctx));
                    }
                }
                if let Some(book_id) = &aspect.reference_book {
                    let found: Option<ReferenceBook> = read_json(&books, book_id)?;
                    if let Some(mut book) = found {
                        book.version += 1;
                        books.remove(book_id.as_str())?;
                        facts.push(book.to_delete_fact(ctx));
                    }
                }
                aspect.version += 1;
                aspects.remove(id.as_str())?;
                facts.push(aspect.to_delete_fact(ctx));
            }
            (facts, linked)
        };
        record(&write_txn, &facts)?;
        write_txn.commit()?;
        tracing::info!(id = %id, soft, "aspect removed");
        Ok(())
    }

    /// A stored aspect, deleted or not.
    pub fn aspect(&self, id: &EntityRef) -> Result<Aspect> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ASPECTS)?;
        require(read_json(&table, id)?, "aspect", id)
    }

    /// Aspects not marked deleted.
    pub fn aspects(&self) -> Result<Vec<Aspect>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ASPECTS)?;
        let all: Vec<Aspect> = read_all(&table)?;
        Ok(all.into_iter().filter(|a| !a.deleted).collect())
    }

    /// The requested aspects including soft-deleted ones. Hard-deleted ids
    /// are skipped.
    pub fn aspects_including_deleted(&self, ids: &[EntityRef]) -> Result<Vec<Aspect>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ASPECTS)?;
        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(aspect) = read_json(&table, id)? {
                found.push(aspect);
            }
        }
        Ok(found)
    }

    pub fn property(&self, id: &EntityRef) -> Result<AspectProperty> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PROPERTIES)?;
        require(read_json(&table, id)?, "aspect property", id)
    }

    /// Current properties of an aspect, in link order.
    pub fn properties_of(&self, aspect: &Aspect) -> Result<Vec<AspectProperty>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PROPERTIES)?;
        let mut found = Vec::with_capacity(aspect.properties.len());
        for id in &aspect.properties {
            if let Some(property) = read_json(&table, id)? {
                found.push(property);
            }
        }
        Ok(found)
    }

    // Internal: bulk name lookup in one read transaction.
    fn names_of(
        &self,
        entity_class: &str,
        ids: &[EntityRef],
    ) -> Result<HashMap<EntityRef, String>> {
        let read_txn = self.db.begin_read()?;
        let names = match entity_class {
            SUBJECT_CLASS => {
                let table = read_txn.open_table(SUBJECTS)?;
                collect_names(&table, ids, |s: Subject| s.name)?
            }
            REFERENCE_BOOK_CLASS => {
                let table = read_txn.open_table(REFERENCE_BOOKS)?;
                collect_names(&table, ids, |b: ReferenceBook| b.name)?
            }
            ASPECT_CLASS => {
                let table = read_txn.open_table(ASPECTS)?;
                collect_names(&table, ids, |a: Aspect| a.name)?
            }
            ASPECT_PROPERTY_CLASS => {
                let table = read_txn.open_table(PROPERTIES)?;
                collect_names(&table, ids, |p: AspectProperty| p.name)?
            }
            OBJECT_CLASS => {
                let table = read_txn.open_table(OBJECTS)?;
                collect_names(&table, ids, |o: Object| o.name)?
            }
            OBJECT_PROPERTY_CLASS => {
                let table = read_txn.open_table(OBJECT_PROPERTIES)?;
                collect_names(&table, ids, |p: ObjectProperty| p.name)?
            }
            other => {
                tracing::warn!(entity_class = other, "no names for entity class");
                HashMap::new()
            }
        };
        Ok(names)
    }
}

impl NameResolver for Catalog {
    fn resolve(&self, entity_class: &str, id: &EntityRef) -> Option<String> {
        self.resolve_many(entity_class, std::slice::from_ref(id))
            .remove(id)
    }

    fn resolve_many(&self, entity_class: &str, ids: &[EntityRef]) -> HashMap<EntityRef, String> {
        self.names_of(entity_class, ids).unwrap_or_else(|e| {
            tracing::warn!(error = %e, entity_class, "name lookup failed");
            HashMap::new()
        })
    }
}

// ---------------------------------------------------------------------------
// Transaction helpers
// ---------------------------------------------------------------------------

fn record(write_txn: &WriteTransaction, facts: &[HistoryFact]) -> Result<()> {
    for fact in facts {
        HistoryLog::append_in_txn(write_txn, fact)?;
    }
    Ok(())
}

/// Create, update or remove one property of `aspect` inside the caller's
/// transaction. Returns the fact to record, if anything changed.
fn save_property(
    table: &mut Table<'_, &'static str, &'static str>,
    aspect: &mut Aspect,
    input: &PropertyInput,
    ctx: &HistoryContext,
) -> Result<Option<HistoryFact>> {
    let name = validated_name("aspect property", &input.name)?;
    let Some(id) = &input.id else {
        if input.deleted {
            return Ok(None);
        }
        let property = AspectProperty {
            id: EntityRef::new(),
            parent: aspect.id.clone(),
            aspect: input.aspect.clone(),
            name,
            cardinality: input.cardinality,
            description: non_empty(input.description.clone()),
            version: 1,
        };
        write_json(table, &property.id, &property)?;
        aspect.properties.push(property.id.clone());
        return Ok(Some(property.to_create_fact(ctx)));
    };

    let mut property: AspectProperty = require(read_json(&*table, id)?, "aspect property", id)?;
    if property.parent != aspect.id {
        return Err(CatalogError::InvalidInput(format!(
            "property {id} does not belong to aspect {}",
            aspect.id
        )));
    }
    check_version(id, input.version, property.version)?;

    if input.deleted {
        property.version += 1;
        table.remove(id.as_str())?;
        aspect.properties.retain(|p| p != id);
        return Ok(Some(property.to_delete_fact(ctx)));
    }

    let base = property.current_snapshot();
    property.name = name;
    property.aspect = input.aspect.clone();
    property.cardinality = input.cardinality;
    property.description = non_empty(input.description.clone());
    property.version += 1;
    let fact = property.to_update_fact(ctx, &base);
    if fact.is_noop() {
        return Ok(None);
    }
    write_json(table, id, &property)?;
    Ok(Some(fact))
}

fn live_aspect(
    table: &impl ReadableTable<&'static str, &'static str>,
    id: &EntityRef,
) -> Result<Aspect> {
    let aspect: Aspect = require(read_json(table, id)?, "aspect", id)?;
    if aspect.deleted {
        return Err(CatalogError::NotFound(format!("aspect {id} is deleted")));
    }
    Ok(aspect)
}

fn read_json<T: DeserializeOwned>(
    table: &impl ReadableTable<&'static str, &'static str>,
    id: &EntityRef,
) -> Result<Option<T>> {
    match table.get(id.as_str())? {
        Some(v) => Ok(Some(serde_json::from_str(v.value())?)),
        None => Ok(None),
    }
}

fn read_all<T: DeserializeOwned>(
    table: &impl ReadableTable<&'static str, &'static str>,
) -> Result<Vec<T>> {
    let mut results = Vec::new();
    for entry in table.iter()? {
        let (_, v) = entry?;
        results.push(serde_json::from_str(v.value())?);
    }
    Ok(results)
}

fn write_json<T: Serialize>(
    table: &mut Table<'_, &'static str, &'static str>,
    id: &EntityRef,
    value: &T,
) -> Result<()> {
    let json = serde_json::to_string(value)?;
    table.insert(id.as_str(), json.as_str())?;
    Ok(())
}

fn collect_names<T: DeserializeOwned>(
    table: &impl ReadableTable<&'static str, &'static str>,
    ids: &[EntityRef],
    name: impl Fn(T) -> String,
) -> Result<HashMap<EntityRef, String>> {
    let mut names = HashMap::new();
    for id in ids {
        if let Some(entity) = read_json(table, id)? {
            names.insert(id.clone(), name(entity));
        }
    }
    Ok(names)
}

fn require<T>(found: Option<T>, what: &str, id: &EntityRef) -> Result<T> {
    found.ok_or_else(|| CatalogError::NotFound(format!("{what} {id}")))
}

fn validated_name(what: &str, name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CatalogError::InvalidInput(format!("{what} name is empty")));
    }
    Ok(name.to_string())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
