//! Typed values stored in snapshots.
//!
//! Snapshots are string maps so the diff stays generic. Entities that carry
//! a polymorphic value (an object property value, say) encode it with
//! [`ScalarValue::write_to`] and decode it with [`ScalarValue::read_from`]
//! only when rendering.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::snapshot::{EntityRef, Snapshot};

const TYPE_TAG: &str = "typeTag";
const INT_VALUE: &str = "intValue";
const PRECISION: &str = "precision";
const DECIMAL_VALUE: &str = "decimalValue";
const STR_VALUE: &str = "strValue";
const RANGE: &str = "range";
const BOOLEAN_VALUE: &str = "booleanValue";

/// Discriminant written under the `typeTag` data key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TypeTag {
    Integer,
    Decimal,
    String,
    Range,
    Boolean,
    Object,
    ObjectProperty,
    ObjectValue,
    Subject,
    DomainElement,
    Aspect,
    AspectProperty,
    Null,
}

impl TypeTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeTag::Integer => "INTEGER",
            TypeTag::Decimal => "DECIMAL",
            TypeTag::String => "STRING",
            TypeTag::Range => "RANGE",
            TypeTag::Boolean => "BOOLEAN",
            TypeTag::Object => "OBJECT",
            TypeTag::ObjectProperty => "OBJECT_PROPERTY",
            TypeTag::ObjectValue => "OBJECT_VALUE",
            TypeTag::Subject => "SUBJECT",
            TypeTag::DomainElement => "DOMAIN_ELEMENT",
            TypeTag::Aspect => "ASPECT",
            TypeTag::AspectProperty => "ASPECT_PROPERTY",
            TypeTag::Null => "NULL",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TypeTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INTEGER" => Ok(TypeTag::Integer),
            "DECIMAL" => Ok(TypeTag::Decimal),
            "STRING" => Ok(TypeTag::String),
            "RANGE" => Ok(TypeTag::Range),
            "BOOLEAN" => Ok(TypeTag::Boolean),
            "OBJECT" => Ok(TypeTag::Object),
            "OBJECT_PROPERTY" => Ok(TypeTag::ObjectProperty),
            "OBJECT_VALUE" => Ok(TypeTag::ObjectValue),
            "SUBJECT" => Ok(TypeTag::Subject),
            "DOMAIN_ELEMENT" => Ok(TypeTag::DomainElement),
            "ASPECT" => Ok(TypeTag::Aspect),
            "ASPECT_PROPERTY" => Ok(TypeTag::AspectProperty),
            "NULL" => Ok(TypeTag::Null),
            other => Err(format!("unknown type tag: {other}")),
        }
    }
}

/// Reference to another catalog entity held as a value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum LinkTarget {
    Object(EntityRef),
    ObjectProperty(EntityRef),
    ObjectValue(EntityRef),
    Subject(EntityRef),
    DomainElement(EntityRef),
    Aspect(EntityRef),
    AspectProperty(EntityRef),
}

impl LinkTarget {
    pub fn id(&self) -> &EntityRef {
        match self {
            LinkTarget::Object(id)
            | LinkTarget::ObjectProperty(id)
            | LinkTarget::ObjectValue(id)
            | LinkTarget::Subject(id)
            | LinkTarget::DomainElement(id)
            | LinkTarget::Aspect(id)
            | LinkTarget::AspectProperty(id) => id,
        }
    }

    pub fn tag(&self) -> TypeTag {
        match self {
            LinkTarget::Object(_) => TypeTag::Object,
            LinkTarget::ObjectProperty(_) => TypeTag::ObjectProperty,
            LinkTarget::ObjectValue(_) => TypeTag::ObjectValue,
            LinkTarget::Subject(_) => TypeTag::Subject,
            LinkTarget::DomainElement(_) => TypeTag::DomainElement,
            LinkTarget::Aspect(_) => TypeTag::Aspect,
            LinkTarget::AspectProperty(_) => TypeTag::AspectProperty,
        }
    }

    /// Relation key the target is stored under.
    pub fn link_key(tag: TypeTag) -> Option<&'static str> {
        match tag {
            TypeTag::Object => Some("refValueObject"),
            TypeTag::ObjectProperty => Some("refValueObjectProperty"),
            TypeTag::ObjectValue => Some("refValueObjectValue"),
            TypeTag::Subject => Some("refValueSubject"),
            TypeTag::DomainElement => Some("refValueDomainElement"),
            TypeTag::Aspect => Some("refValueAspect"),
            TypeTag::AspectProperty => Some("refValueAspectProperty"),
            _ => None,
        }
    }

    fn from_tag(tag: TypeTag, id: EntityRef) -> Option<Self> {
        Some(match tag {
            TypeTag::Object => LinkTarget::Object(id),
            TypeTag::ObjectProperty => LinkTarget::ObjectProperty(id),
            TypeTag::ObjectValue => LinkTarget::ObjectValue(id),
            TypeTag::Subject => LinkTarget::Subject(id),
            TypeTag::DomainElement => LinkTarget::DomainElement(id),
            TypeTag::Aspect => LinkTarget::Aspect(id),
            TypeTag::AspectProperty => LinkTarget::AspectProperty(id),
            _ => return None,
        })
    }
}

/// A polymorphic catalog value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ScalarValue {
    Integer { value: i64, precision: Option<i32> },
    /// Kept as its decimal text so no precision is lost.
    Decimal { value: String },
    Str { value: String },
    Range { lower: i64, upper: i64 },
    Boolean { value: bool },
    Link { target: LinkTarget },
    Null,
}

impl ScalarValue {
    pub fn tag(&self) -> TypeTag {
        match self {
            ScalarValue::Integer { .. } => TypeTag::Integer,
            ScalarValue::Decimal { .. } => TypeTag::Decimal,
            ScalarValue::Str { .. } => TypeTag::String,
            ScalarValue::Range { .. } => TypeTag::Range,
            ScalarValue::Boolean { .. } => TypeTag::Boolean,
            ScalarValue::Link { target } => target.tag(),
            ScalarValue::Null => TypeTag::Null,
        }
    }

    /// Encode into snapshot fields on top of `snapshot`.
    ///
    /// Only the fields of the current variant are written, so re-encoding
    /// a value of another type clears the old type's fields in the next diff.
    pub fn write_to(&self, snapshot: Snapshot) -> Snapshot {
        let snapshot = snapshot.with_data(TYPE_TAG, self.tag().as_str());
        match self {
            ScalarValue::Integer { value, precision } => snapshot
                .with_data(INT_VALUE, value.to_string())
                .with_optional_data(PRECISION, *precision),
            ScalarValue::Decimal { value } => snapshot.with_data(DECIMAL_VALUE, value.as_str()),
            ScalarValue::Str { value } => snapshot.with_data(STR_VALUE, value.as_str()),
            ScalarValue::Range { lower, upper } => {
                snapshot.with_data(RANGE, format!("{lower}:{upper}"))
            }
            ScalarValue::Boolean { value } => snapshot.with_data(BOOLEAN_VALUE, value.to_string()),
            ScalarValue::Link { target } => match LinkTarget::link_key(target.tag()) {
                Some(key) => snapshot.with_link(key, target.id().clone()),
                None => snapshot,
            },
            ScalarValue::Null => snapshot,
        }
    }

    /// Decode from snapshot fields. `None` if the fields are missing or malformed.
    pub fn read_from(snapshot: &Snapshot) -> Option<Self> {
        let tag: TypeTag = snapshot.data_item(TYPE_TAG)?.parse().ok()?;
        let value = match tag {
            TypeTag::Integer => ScalarValue::Integer {
                value: snapshot.data_item(INT_VALUE)?.parse().ok()?,
                precision: match snapshot.data_item(PRECISION) {
                    Some(p) => Some(p.parse().ok()?),
                    None => None,
                },
            },
            TypeTag::Decimal => ScalarValue::Decimal {
                value: snapshot.data_item(DECIMAL_VALUE)?.to_string(),
            },
            TypeTag::String => ScalarValue::Str {
                value: snapshot.data_or_empty(STR_VALUE).to_string(),
            },
            TypeTag::Range => {
                let (lower, upper) = snapshot.data_item(RANGE)?.split_once(':')?;
                ScalarValue::Range {
                    lower: lower.parse().ok()?,
                    upper: upper.parse().ok()?,
                }
            }
            TypeTag::Boolean => ScalarValue::Boolean {
                value: snapshot.data_item(BOOLEAN_VALUE)?.parse().ok()?,
            },
            TypeTag::Null => ScalarValue::Null,
            link => {
                let id = snapshot.first_link(LinkTarget::link_key(link)?)?.clone();
                ScalarValue::Link {
                    target: LinkTarget::from_tag(link, id)?,
                }
            }
        };
        Some(value)
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Integer {
                value,
                precision: Some(p),
            } => write!(f, "{value} (precision {p})"),
            ScalarValue::Integer { value, .. } => write!(f, "{value}"),
            ScalarValue::Decimal { value } | ScalarValue::Str { value } => f.write_str(value),
            ScalarValue::Range { lower, upper } => write!(f, "[{lower}, {upper}]"),
            ScalarValue::Boolean { value } => write!(f, "{value}"),
            ScalarValue::Link { target } => write!(f, "{} {}", target.tag(), target.id()),
            ScalarValue::Null => f.write_str("null"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fact::diff;

    #[test]
    fn integer_with_precision_decodes() {
        let value = ScalarValue::Integer {
            value: 42,
            precision: Some(2),
        };
        let snapshot = value.write_to(Snapshot::new());
        assert_eq!(snapshot.data_item("typeTag"), Some("INTEGER"));
        assert_eq!(snapshot.data_item("intValue"), Some("42"));
        assert_eq!(ScalarValue::read_from(&snapshot), Some(value));
    }

    #[test]
    fn link_value_is_stored_as_relation() {
        let value = ScalarValue::Link {
            target: LinkTarget::Subject(EntityRef::from("s1")),
        };
        let snapshot = value.write_to(Snapshot::new().with_data("description", "d"));
        assert_eq!(snapshot.first_link("refValueSubject"), Some(&EntityRef::from("s1")));
        assert!(!snapshot.data.contains_key("refValueSubject"));
        assert_eq!(ScalarValue::read_from(&snapshot), Some(value));
    }

    #[test]
    fn changing_type_clears_previous_fields() {
        let before = ScalarValue::Integer {
            value: 1,
            precision: None,
        }
        .write_to(Snapshot::new());
        let after = ScalarValue::Boolean { value: true }.write_to(Snapshot::new());
        let payload = diff(&before, &after);
        assert_eq!(payload.data.get("intValue").map(String::as_str), Some(""));
        assert_eq!(payload.data_item("typeTag"), Some("BOOLEAN"));
        assert_eq!(payload.data_item("booleanValue"), Some("true"));
    }

    #[test]
    fn malformed_history_decodes_to_none() {
        let missing = Snapshot::new().with_data("typeTag", "INTEGER");
        assert_eq!(ScalarValue::read_from(&missing), None);

        let garbage = Snapshot::new()
            .with_data("typeTag", "RANGE")
            .with_data("range", "x:y");
        assert_eq!(ScalarValue::read_from(&garbage), None);

        let unknown = Snapshot::new().with_data("typeTag", "COLOUR");
        assert_eq!(ScalarValue::read_from(&unknown), None);

        let dangling = Snapshot::new().with_data("typeTag", "ASPECT");
        assert_eq!(ScalarValue::read_from(&dangling), None);
    }

    #[test]
    fn display_is_human_readable() {
        assert_eq!(ScalarValue::Range { lower: 1, upper: 5 }.to_string(), "[1, 5]");
        assert_eq!(ScalarValue::Null.to_string(), "null");
        assert_eq!(
            ScalarValue::Link {
                target: LinkTarget::Aspect(EntityRef::from("a1"))
            }
            .to_string(),
            "ASPECT a1"
        );
        assert_eq!("OBJECT_VALUE".parse::<TypeTag>(), Ok(TypeTag::ObjectValue));
    }
}
