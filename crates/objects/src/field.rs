//! Field specifications and type coercion
//!
//! A [`FieldSpec`] declares one field of a versioned class: its type
//! descriptor, nullability, default and read-only flag. [`FieldType`] owns
//! coercion: every assignment passes through [`FieldType::coerce`], which
//! fails with [`Error::Coercion`] on mismatch. Object-typed kinds expose
//! the nested class name for registry lookup.

use crate::value::FieldValue;
use std::fmt;
use verso_core::{Error, Result};

/// Type descriptor for a tracked field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    /// 64-bit signed integer; accepts integers and integer strings
    Integer,
    /// 64-bit float; accepts floats, integers and numeric strings
    Float,
    /// Boolean
    Boolean,
    /// UTF-8 string; accepts strings and integers
    Str,
    /// Homogeneous list of the element type
    List(Box<FieldType>),
    /// String-keyed mapping with homogeneous value type
    Dict(Box<FieldType>),
    /// Set of the element type, order-stable on the wire
    Set(Box<FieldType>),
    /// Nested versioned object of the named class
    Object(String),
    /// List of nested versioned objects of the named class
    ListOfObjects(String),
}

impl FieldType {
    /// The nested class name for object-typed fields
    pub fn nested_class(&self) -> Option<&str> {
        match self {
            FieldType::Object(name) | FieldType::ListOfObjects(name) => Some(name),
            _ => None,
        }
    }

    /// Whether this field holds nested objects
    pub fn is_object_kind(&self) -> bool {
        self.nested_class().is_some()
    }

    /// Coerce a value into this type, or fail with a coercion error
    pub fn coerce(&self, field: &str, value: FieldValue) -> Result<FieldValue> {
        let mismatch = |value: &FieldValue| Error::Coercion {
            field: field.to_string(),
            reason: format!("expected {}, got {}", self, value.type_name()),
        };
        match self {
            FieldType::Integer => match value {
                FieldValue::Int(_) => Ok(value),
                FieldValue::String(ref s) => match s.parse::<i64>() {
                    Ok(i) => Ok(FieldValue::Int(i)),
                    Err(_) => Err(mismatch(&value)),
                },
                other => Err(mismatch(&other)),
            },
            FieldType::Float => match value {
                FieldValue::Float(_) => Ok(value),
                FieldValue::Int(i) => Ok(FieldValue::Float(i as f64)),
                FieldValue::String(ref s) => match s.parse::<f64>() {
                    Ok(f) => Ok(FieldValue::Float(f)),
                    Err(_) => Err(mismatch(&value)),
                },
                other => Err(mismatch(&other)),
            },
            FieldType::Boolean => match value {
                FieldValue::Bool(_) => Ok(value),
                other => Err(mismatch(&other)),
            },
            FieldType::Str => match value {
                FieldValue::String(_) => Ok(value),
                FieldValue::Int(i) => Ok(FieldValue::String(i.to_string())),
                other => Err(mismatch(&other)),
            },
            FieldType::List(elem) => match value {
                FieldValue::List(items) => Ok(FieldValue::List(
                    items
                        .into_iter()
                        .map(|item| elem.coerce(field, item))
                        .collect::<Result<_>>()?,
                )),
                other => Err(mismatch(&other)),
            },
            FieldType::Dict(elem) => match value {
                FieldValue::Map(entries) => Ok(FieldValue::Map(
                    entries
                        .into_iter()
                        .map(|(key, item)| Ok((key, elem.coerce(field, item)?)))
                        .collect::<Result<_>>()?,
                )),
                other => Err(mismatch(&other)),
            },
            FieldType::Set(elem) => match value {
                FieldValue::Set(items) | FieldValue::List(items) => Ok(FieldValue::Set(
                    items
                        .into_iter()
                        .map(|item| elem.coerce(field, item))
                        .collect::<Result<_>>()?,
                )),
                other => Err(mismatch(&other)),
            },
            FieldType::Object(class_name) => match value {
                FieldValue::Object(ref obj) if obj.obj_name() == class_name => Ok(value),
                other => Err(mismatch(&other)),
            },
            FieldType::ListOfObjects(class_name) => {
                let objs = match value {
                    FieldValue::ObjectList(objs) => objs,
                    FieldValue::List(items) => items
                        .into_iter()
                        .map(|item| match item {
                            FieldValue::Object(obj) => Ok(*obj),
                            other => Err(mismatch(&other)),
                        })
                        .collect::<Result<Vec<_>>>()?,
                    other => return Err(mismatch(&other)),
                };
                if let Some(obj) = objs.iter().find(|o| o.obj_name() != class_name) {
                    return Err(Error::Coercion {
                        field: field.to_string(),
                        reason: format!("expected {} elements, got {}", class_name, obj.obj_name()),
                    });
                }
                Ok(FieldValue::ObjectList(objs))
            }
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Integer => write!(f, "Integer"),
            FieldType::Float => write!(f, "Float"),
            FieldType::Boolean => write!(f, "Boolean"),
            FieldType::Str => write!(f, "String"),
            FieldType::List(elem) => write!(f, "List<{}>", elem),
            FieldType::Dict(elem) => write!(f, "Dict<{}>", elem),
            FieldType::Set(elem) => write!(f, "Set<{}>", elem),
            FieldType::Object(name) => write!(f, "Object<{}>", name),
            FieldType::ListOfObjects(name) => write!(f, "ListOfObjects<{}>", name),
        }
    }
}

/// Declaration of one tracked field
///
/// ## Invariants
///
/// - A read-only field may be assigned exactly once while unset
/// - A default is materialized fresh (cloned) per instance, so mutable
///   defaults are never shared across instances
#[derive(Debug, Clone)]
pub struct FieldSpec {
    name: String,
    kind: FieldType,
    nullable: bool,
    default: Option<FieldValue>,
    read_only: bool,
}

impl FieldSpec {
    /// Declare a field with the given name and type
    pub fn new(name: impl Into<String>, kind: FieldType) -> Self {
        FieldSpec {
            name: name.into(),
            kind,
            nullable: false,
            default: None,
            read_only: false,
        }
    }

    /// Allow explicit null values
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Reject reassignment once set
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Declare a default, applied by `set_defaults`
    pub fn with_default(mut self, value: impl Into<FieldValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Field name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type descriptor
    pub fn kind(&self) -> &FieldType {
        &self.kind
    }

    /// Whether null is a valid value
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Whether the field is read-only
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// A fresh copy of the declared default, if any
    pub fn default_value(&self) -> Option<FieldValue> {
        self.default.clone()
    }

    /// Coerce a value for this field, honoring nullability
    pub fn coerce(&self, value: FieldValue) -> Result<FieldValue> {
        if value.is_null() {
            if self.nullable {
                return Ok(FieldValue::Null);
            }
            return Err(Error::Coercion {
                field: self.name.clone(),
                reason: "field is not nullable".to_string(),
            });
        }
        self.kind.coerce(&self.name, value)
    }

    /// Stable descriptor string, hashed by the fingerprint checker
    pub fn descriptor(&self) -> String {
        format!(
            "{}:nullable={},read_only={},default={}",
            self.kind, self.nullable, self.read_only, self.default.is_some()
        )
    }
}
