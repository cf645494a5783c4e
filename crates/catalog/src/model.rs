//! Catalog entities and their snapshot form.

use catalog_history::{EntityRef, HistoryAware, Snapshot};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const SUBJECT_CLASS: &str = "Subject";
pub const REFERENCE_BOOK_CLASS: &str = "ReferenceBook";
pub const ASPECT_CLASS: &str = "Aspect";
pub const ASPECT_PROPERTY_CLASS: &str = "AspectProperty";

/// Snapshot keys of an aspect.
pub mod aspect_keys {
    pub const NAME: &str = "name";
    pub const BASE_TYPE: &str = "baseType";
    pub const DESCRIPTION: &str = "description";
    pub const MEASURE: &str = "measure";
    pub const SUBJECT: &str = "subject";
    pub const REFERENCE_BOOK: &str = "referenceBook";
    pub const PROPERTIES: &str = "properties";
}

/// Snapshot keys of an aspect property.
pub mod property_keys {
    pub const NAME: &str = "name";
    /// Id of the aspect the property is typed by, kept as plain data.
    pub const ASPECT: &str = "aspect";
    pub const CARDINALITY: &str = "cardinality";
    pub const DESCRIPTION: &str = "description";
}

// ---------------------------------------------------------------------------
// Subject
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: EntityRef,
    pub name: String,
    pub description: Option<String>,
    /// Objects classified under this subject.
    #[serde(default)]
    pub objects: Vec<EntityRef>,
    pub version: u64,
}

impl HistoryAware for Subject {
    fn entity_class(&self) -> &str {
        SUBJECT_CLASS
    }

    fn entity_ref(&self) -> EntityRef {
        self.id.clone()
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn current_snapshot(&self) -> Snapshot {
        Snapshot::new()
            .with_data("name", self.name.as_str())
            .with_optional_data("description", self.description.as_deref())
            .with_links("objects", self.objects.iter().cloned())
    }
}

// ---------------------------------------------------------------------------
// Reference book
// ---------------------------------------------------------------------------

/// Root of the value dictionary attached to one aspect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceBook {
    pub id: EntityRef,
    pub aspect_id: EntityRef,
    pub name: String,
    pub version: u64,
}

impl HistoryAware for ReferenceBook {
    fn entity_class(&self) -> &str {
        REFERENCE_BOOK_CLASS
    }

    fn entity_ref(&self) -> EntityRef {
        self.id.clone()
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn current_snapshot(&self) -> Snapshot {
        Snapshot::new()
            .with_data("name", self.name.as_str())
            .with_link("aspect", self.aspect_id.clone())
    }
}

// ---------------------------------------------------------------------------
// Aspect
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aspect {
    pub id: EntityRef,
    pub name: String,
    pub base_type: Option<String>,
    pub description: Option<String>,
    pub measure: Option<String>,
    pub subject: Option<EntityRef>,
    pub reference_book: Option<EntityRef>,
    pub properties: Vec<EntityRef>,
    pub version: u64,
    #[serde(default)]
    pub deleted: bool,
}

impl HistoryAware for Aspect {
    fn entity_class(&self) -> &str {
        ASPECT_CLASS
    }

    fn entity_ref(&self) -> EntityRef {
        self.id.clone()
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn current_snapshot(&self) -> Snapshot {
        use self::aspect_keys::*;
        Snapshot::new()
            .with_data(NAME, self.name.as_str())
            .with_optional_data(BASE_TYPE, self.base_type.as_deref())
            .with_optional_data(DESCRIPTION, self.description.as_deref())
            .with_optional_data(MEASURE, self.measure.as_deref())
            .with_links(SUBJECT, self.subject.clone())
            .with_links(REFERENCE_BOOK, self.reference_book.clone())
            .with_links(PROPERTIES, self.properties.iter().cloned())
    }
}

// ---------------------------------------------------------------------------
// Aspect property
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PropertyCardinality {
    Zero,
    One,
    Infinity,
}

impl PropertyCardinality {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyCardinality::Zero => "ZERO",
            PropertyCardinality::One => "ONE",
            PropertyCardinality::Infinity => "INFINITY",
        }
    }

    /// Short form used in history lines.
    pub fn label(&self) -> &'static str {
        match self {
            PropertyCardinality::Zero => "0",
            PropertyCardinality::One => "0:1",
            PropertyCardinality::Infinity => "0:INF",
        }
    }
}

impl fmt::Display for PropertyCardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyCardinality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ZERO" => Ok(PropertyCardinality::Zero),
            "ONE" => Ok(PropertyCardinality::One),
            "INFINITY" => Ok(PropertyCardinality::Infinity),
            other => Err(format!("unknown cardinality: {other}")),
        }
    }
}

/// Slot of an aspect typed by another aspect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AspectProperty {
    pub id: EntityRef,
    /// Aspect owning the property.
    pub parent: EntityRef,
    /// Aspect the property's values are typed by.
    pub aspect: EntityRef,
    pub name: String,
    pub cardinality: PropertyCardinality,
    pub description: Option<String>,
    pub version: u64,
}

impl HistoryAware for AspectProperty {
    fn entity_class(&self) -> &str {
        ASPECT_PROPERTY_CLASS
    }

    fn entity_ref(&self) -> EntityRef {
        self.id.clone()
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn current_snapshot(&self) -> Snapshot {
        use self::property_keys::*;
        Snapshot::new()
            .with_data(NAME, self.name.as_str())
            .with_data(ASPECT, self.aspect.as_str())
            .with_data(CARDINALITY, self.cardinality.as_str())
            .with_optional_data(DESCRIPTION, self.description.as_deref())
    }
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Desired state of an aspect for [`crate::Catalog::save_aspect`].
///
/// `id: None` creates a new aspect; otherwise `version` must match the
/// stored one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AspectInput {
    pub id: Option<EntityRef>,
    pub version: u64,
    pub name: String,
    pub base_type: Option<String>,
    pub description: Option<String>,
    pub measure: Option<String>,
    pub subject: Option<EntityRef>,
    /// Properties to create, change or remove. Unlisted ones stay as they are.
    pub properties: Vec<PropertyInput>,
}

impl AspectInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Input that edits `aspect` as currently stored.
    pub fn editing(aspect: &Aspect) -> Self {
        Self {
            id: Some(aspect.id.clone()),
            version: aspect.version,
            name: aspect.name.clone(),
            base_type: aspect.base_type.clone(),
            description: aspect.description.clone(),
            measure: aspect.measure.clone(),
            subject: aspect.subject.clone(),
            properties: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyInput {
    pub id: Option<EntityRef>,
    pub version: u64,
    pub name: String,
    pub aspect: EntityRef,
    pub cardinality: PropertyCardinality,
    pub description: Option<String>,
    /// Remove the property instead of saving it.
    pub deleted: bool,
}

impl PropertyInput {
    pub fn new(
        name: impl Into<String>,
        aspect: EntityRef,
        cardinality: PropertyCardinality,
    ) -> Self {
        Self {
            id: None,
            version: 0,
            name: name.into(),
            aspect,
            cardinality,
            description: None,
            deleted: false,
        }
    }

    pub fn editing(property: &AspectProperty) -> Self {
        Self {
            id: Some(property.id.clone()),
            version: property.version,
            name: property.name.clone(),
            aspect: property.aspect.clone(),
            cardinality: property.cardinality,
            description: property.description.clone(),
            deleted: false,
        }
    }

    pub fn removing(property: &AspectProperty) -> Self {
        Self {
            deleted: true,
            ..Self::editing(property)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_snapshot_uses_data_and_links() {
        let aspect = Aspect {
            id: EntityRef::from("a1"),
            name: "Length".into(),
            base_type: Some("Decimal".into()),
            description: None,
            measure: Some("Metre".into()),
            subject: Some(EntityRef::from("s1")),
            reference_book: None,
            properties: vec![EntityRef::from("p1")],
            version: 1,
            deleted: false,
        };
        let s = aspect.current_snapshot();
        assert_eq!(s.data_item("baseType"), Some("Decimal"));
        assert_eq!(s.data_item("description"), None);
        assert_eq!(s.first_link("subject"), Some(&EntityRef::from("s1")));
        assert!(!s.has_links("referenceBook"));
        assert_eq!(s.links_for("properties").len(), 1);
    }

    #[test]
    fn cardinality_names_and_labels() {
        assert_eq!("ONE".parse::<PropertyCardinality>(), Ok(PropertyCardinality::One));
        assert_eq!(PropertyCardinality::Infinity.label(), "0:INF");
        assert!("MANY".parse::<PropertyCardinality>().is_err());
        assert_eq!(
            serde_json::to_string(&PropertyCardinality::Zero).unwrap(),
            "\"ZERO\""
        );
    }
}
