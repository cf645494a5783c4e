//! Objects: named instances classified under a subject, whose properties
//! are typed by aspects and hold typed values.
//!
//! A value's own content is a [`ScalarValue`]. It is stored as JSON in the
//! value table and flattened into snapshot fields with
//! [`ScalarValue::write_to`], so a value's history diffs like any other
//! entity's.

use catalog_history::{EntityRef, HistoryAware, HistoryContext, ScalarValue, Snapshot};
use serde::{Deserialize, Serialize};
use redb::ReadableDatabase;

use crate::{
    live_aspect, non_empty, read_json, record, require, validated_name, write_json,
    AspectProperty, Catalog, CatalogError, PropertyCardinality, Result, Subject, ASPECTS,
    OBJECTS, OBJECT_PROPERTIES, OBJECT_VALUES, PROPERTIES, SUBJECTS,
};

pub const OBJECT_CLASS: &str = "Object";
pub const OBJECT_PROPERTY_CLASS: &str = "ObjectProperty";
pub const OBJECT_VALUE_CLASS: &str = "ObjectValue";

/// Snapshot keys of an object.
pub mod object_keys {
    pub const NAME: &str = "name";
    pub const DESCRIPTION: &str = "description";
    pub const SUBJECT: &str = "subject";
    pub const PROPERTIES: &str = "properties";
}

/// Snapshot keys of an object property.
pub mod object_property_keys {
    pub const NAME: &str = "name";
    pub const DESCRIPTION: &str = "description";
    pub const CARDINALITY: &str = "cardinality";
    pub const ASPECT: &str = "aspect";
    pub const OBJECT: &str = "object";
    pub const VALUES: &str = "values";
}

/// Relation keys of an object value. Its data keys come from [`ScalarValue`].
///
/// [`ScalarValue`]: catalog_history::ScalarValue
pub mod object_value_keys {
    pub const OBJECT_PROPERTY: &str = "objectProperty";
    pub const ASPECT_PROPERTY: &str = "aspectProperty";
    pub const PARENT_VALUE: &str = "parentValue";
    pub const CHILDREN: &str = "children";
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Object {
    pub id: EntityRef,
    pub name: String,
    pub description: Option<String>,
    pub subject: EntityRef,
    pub properties: Vec<EntityRef>,
    pub version: u64,
}

impl HistoryAware for Object {
    fn entity_class(&self) -> &str {
        OBJECT_CLASS
    }

    fn entity_ref(&self) -> EntityRef {
        self.id.clone()
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn current_snapshot(&self) -> Snapshot {
        use self::object_keys::*;
        Snapshot::new()
            .with_data(NAME, self.name.as_str())
            .with_optional_data(DESCRIPTION, self.description.as_deref())
            .with_link(SUBJECT, self.subject.clone())
            .with_links(PROPERTIES, self.properties.iter().cloned())
    }
}

/// Slot of an object typed by an aspect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectProperty {
    pub id: EntityRef,
    pub object: EntityRef,
    pub aspect: EntityRef,
    pub name: String,
    pub description: Option<String>,
    pub cardinality: PropertyCardinality,
    pub values: Vec<EntityRef>,
    pub version: u64,
}

impl HistoryAware for ObjectProperty {
    fn entity_class(&self) -> &str {
        OBJECT_PROPERTY_CLASS
    }

    fn entity_ref(&self) -> EntityRef {
        self.id.clone()
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn current_snapshot(&self) -> Snapshot {
        use self::object_property_keys::*;
        Snapshot::new()
            .with_data(NAME, self.name.as_str())
            .with_optional_data(DESCRIPTION, self.description.as_deref())
            .with_data(CARDINALITY, self.cardinality.as_str())
            .with_link(ASPECT, self.aspect.clone())
            .with_link(OBJECT, self.object.clone())
            .with_links(VALUES, self.values.iter().cloned())
    }
}

/// One value of an object property. Values nest through `parent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectValue {
    pub id: EntityRef,
    pub property: EntityRef,
    pub value: ScalarValue,
    /// Aspect property this value fills, for values below the root.
    pub aspect_property: Option<EntityRef>,
    pub parent: Option<EntityRef>,
    pub children: Vec<EntityRef>,
    pub version: u64,
}

impl HistoryAware for ObjectValue {
    fn entity_class(&self) -> &str {
        OBJECT_VALUE_CLASS
    }

    fn entity_ref(&self) -> EntityRef {
        self.id.clone()
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn current_snapshot(&self) -> Snapshot {
        use self::object_value_keys::*;
        self.value
            .write_to(Snapshot::new())
            .with_link(OBJECT_PROPERTY, self.property.clone())
            .with_links(ASPECT_PROPERTY, self.aspect_property.clone())
            .with_links(PARENT_VALUE, self.parent.clone())
            .with_links(CHILDREN, self.children.iter().cloned())
    }
}

/// A value to add to an object property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectValueInput {
    pub property: EntityRef,
    pub value: ScalarValue,
    pub aspect_property: Option<EntityRef>,
    pub parent: Option<EntityRef>,
}

impl ObjectValueInput {
    pub fn new(property: EntityRef, value: ScalarValue) -> Self {
        Self {
            property,
            value,
            aspect_property: None,
            parent: None,
        }
    }

    pub fn with_parent(mut self, parent: EntityRef) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_aspect_property(mut self, aspect_property: EntityRef) -> Self {
        self.aspect_property = Some(aspect_property);
        self
    }
}

// ---------------------------------------------------------------------------
// Catalog operations
// ---------------------------------------------------------------------------

impl Catalog {
    /// Create an object under a subject.
    ///
    /// The subject gains an `objects` link, recorded as its own update in the
    /// same session.
    pub fn create_object(
        &self,
        ctx: &HistoryContext,
        name: &str,
        description: Option<&str>,
        subject_id: &EntityRef,
    ) -> Result<Object> {
        let name = validated_name("object", name)?;
        let write_txn = self.db.begin_write()?;
        let (object, facts) = {
            let mut objects = write_txn.open_table(OBJECTS)?;
            let mut subjects = write_txn.open_table(SUBJECTS)?;
            let mut subject: Subject =
                require(read_json(&subjects, subject_id)?, "subject", subject_id)?;

            for id in &subject.objects {
                let sibling: Option<Object> = read_json(&objects, id)?;
                if sibling.is_some_and(|o| o.name == name) {
                    return Err(CatalogError::AlreadyExists(format!(
                        "object {name} in subject {subject_id}"
                    )));
                }
            }

            let object = Object {
                id: EntityRef::new(),
                name,
                description: non_empty(description.map(str::to_string)),
                subject: subject_id.clone(),
                properties: Vec::new(),
                version: 1,
            };
            write_json(&mut objects, &object.id, &object)?;

            let base = subject.current_snapshot();
            subject.objects.push(object.id.clone());
            subject.version += 1;
            write_json(&mut subjects, subject_id, &subject)?;

            let facts = vec![object.to_create_fact(ctx), subject.to_update_fact(ctx, &base)];
            (object, facts)
        };
        record(&write_txn, &facts)?;
        write_txn.commit()?;
        tracing::debug!(id = %object.id, subject = %subject_id, "object created");
        Ok(object)
    }

    /// Add a property typed by a live aspect to an object.
    pub fn create_object_property(
        &self,
        ctx: &HistoryContext,
        object_id: &EntityRef,
        name: &str,
        cardinality: PropertyCardinality,
        aspect_id: &EntityRef,
    ) -> Result<ObjectProperty> {
        let name = validated_name("object property", name)?;
        let write_txn = self.db.begin_write()?;
        let (property, facts) = {
            let mut objects = write_txn.open_table(OBJECTS)?;
            let mut properties = write_txn.open_table(OBJECT_PROPERTIES)?;
            let aspects = write_txn.open_table(ASPECTS)?;
            live_aspect(&aspects, aspect_id)?;
            let mut object: Object =
                require(read_json(&objects, object_id)?, "object", object_id)?;

            let property = ObjectProperty {
                id: EntityRef::new(),
                object: object_id.clone(),
                aspect: aspect_id.clone(),
                name,
                description: None,
                cardinality,
                values: Vec::new(),
                version: 1,
            };
            write_json(&mut properties, &property.id, &property)?;

            let base = object.current_snapshot();
            object.properties.push(property.id.clone());
            object.version += 1;
            write_json(&mut objects, object_id, &object)?;

            let facts = vec![property.to_create_fact(ctx), object.to_update_fact(ctx, &base)];
            (property, facts)
        };
        record(&write_txn, &facts)?;
        write_txn.commit()?;
        Ok(property)
    }

    /// Add a value to an object property, optionally below another value of
    /// the same property.
    ///
    /// Records the value's creation, the property's new `values` link and,
    /// for nested values, the parent's new `children` link, all in one
    /// session.
    pub fn create_object_value(
        &self,
        ctx: &HistoryContext,
        input: ObjectValueInput,
    ) -> Result<ObjectValue> {
        let write_txn = self.db.begin_write()?;
        let (value, facts) = {
            let mut properties = write_txn.open_table(OBJECT_PROPERTIES)?;
            let mut values = write_txn.open_table(OBJECT_VALUES)?;
            let property_id = &input.property;
            let mut property: ObjectProperty =
                require(read_json(&properties, property_id)?, "object property", property_id)?;

            if let Some(aspect_property) = &input.aspect_property {
                let aspect_properties = write_txn.open_table(PROPERTIES)?;
                require::<AspectProperty>(
                    read_json(&aspect_properties, aspect_property)?,
                    "aspect property",
                    aspect_property,
                )?;
            }

            let mut parent = match &input.parent {
                Some(parent_id) => {
                    let parent: ObjectValue =
                        require(read_json(&values, parent_id)?, "object value", parent_id)?;
                    if parent.property != *property_id {
                        return Err(CatalogError::InvalidInput(format!(
                            "value {parent_id} does not belong to property {property_id}"
                        )));
                    }
                    Some(parent)
                }
                None => None,
            };

            let value = ObjectValue {
                id: EntityRef::new(),
                property: property_id.clone(),
                value: input.value,
                aspect_property: input.aspect_property,
                parent: input.parent,
                children: Vec::new(),
                version: 1,
            };
            write_json(&mut values, &value.id, &value)?;
            let mut facts = vec![value.to_create_fact(ctx)];

            let base = property.current_snapshot();
            property.values.push(value.id.clone());
            property.version += 1;
            write_json(&mut properties, property_id, &property)?;
            facts.push(property.to_update_fact(ctx, &base));

            if let Some(parent) = parent.as_mut() {
                let base = parent.current_snapshot();
                parent.children.push(value.id.clone());
                parent.version += 1;
                write_json(&mut values, &parent.id, &*parent)?;
                facts.push(parent.to_update_fact(ctx, &base));
            }
            (value, facts)
        };
        record(&write_txn, &facts)?;
        write_txn.commit()?;
        Ok(value)
    }

    pub fn object(&self, id: &EntityRef) -> Result<Object> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(OBJECTS)?;
        require(read_json(&table, id)?, "object", id)
    }

    pub fn object_property(&self, id: &EntityRef) -> Result<ObjectProperty> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(OBJECT_PROPERTIES)?;
        require(read_json(&table, id)?, "object property", id)
    }

    pub fn object_value(&self, id: &EntityRef) -> Result<ObjectValue> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(OBJECT_VALUES)?;
        require(read_json(&table, id)?, "object value", id)
    }

    /// A value as its history last recorded it, removed or not.
    pub fn recorded_value(&self, id: &EntityRef) -> Result<Option<ScalarValue>> {
        Ok(ScalarValue::read_from(&self.entity_state(id)?))
    }
}
