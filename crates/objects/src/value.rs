//! Field values
//!
//! [`FieldValue`] is the unified enum for everything a tracked field can
//! hold, including nested versioned objects and lists of them. Scalars
//! mirror JSON; `Set` keeps insertion order in memory and is rendered as
//! an order-stable sequence on the wire.

use crate::object::VersionedObject;
use std::collections::BTreeMap;

/// Value held by a tracked field
///
/// Nested objects are first-class variants so that dirty state can
/// propagate upward through owned sub-objects without the parent being
/// told about mutations.
#[derive(Debug, Clone)]
pub enum FieldValue {
    /// Explicit null (only valid for nullable fields)
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Ordered sequence of values
    List(Vec<FieldValue>),
    /// Set of values; serialized as an order-stable sequence
    Set(Vec<FieldValue>),
    /// String-keyed mapping
    Map(BTreeMap<String, FieldValue>),
    /// Nested versioned object
    Object(Box<VersionedObject>),
    /// List of nested versioned objects
    ObjectList(Vec<VersionedObject>),
}

impl FieldValue {
    /// Type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Bool(_) => "bool",
            FieldValue::Int(_) => "int",
            FieldValue::Float(_) => "float",
            FieldValue::String(_) => "string",
            FieldValue::List(_) => "list",
            FieldValue::Set(_) => "set",
            FieldValue::Map(_) => "map",
            FieldValue::Object(_) => "object",
            FieldValue::ObjectList(_) => "object list",
        }
    }

    /// Whether this value is null
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Get as i64 if this is an Int value
    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as &str if this is a String value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as bool if this is a Bool value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the nested object if this is an Object value
    pub fn as_object(&self) -> Option<&VersionedObject> {
        match self {
            FieldValue::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Get the nested object mutably if this is an Object value
    pub fn as_object_mut(&mut self) -> Option<&mut VersionedObject> {
        match self {
            FieldValue::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Get the nested objects if this is an ObjectList value
    pub fn as_object_list(&self) -> Option<&[VersionedObject]> {
        match self {
            FieldValue::ObjectList(objs) => Some(objs),
            _ => None,
        }
    }

    /// Whether this value owns sub-objects that report pending changes
    ///
    /// Used by `what_changed` to propagate dirtiness upward on read.
    pub fn has_dirty_objects(&self) -> bool {
        match self {
            FieldValue::Object(o) => !o.what_changed().is_empty(),
            FieldValue::ObjectList(objs) => objs.iter().any(|o| !o.what_changed().is_empty()),
            _ => false,
        }
    }
}

impl PartialEq for FieldValue {
    /// Structural equality, except sets compare without regard to
    /// insertion order (the wire form is canonically sorted, so a
    /// round-tripped set may come back reordered)
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FieldValue::Null, FieldValue::Null) => true,
            (FieldValue::Bool(a), FieldValue::Bool(b)) => a == b,
            (FieldValue::Int(a), FieldValue::Int(b)) => a == b,
            (FieldValue::Float(a), FieldValue::Float(b)) => a == b,
            (FieldValue::String(a), FieldValue::String(b)) => a == b,
            (FieldValue::List(a), FieldValue::List(b)) => a == b,
            (FieldValue::Set(a), FieldValue::Set(b)) => {
                a.len() == b.len() && a.iter().all(|item| b.contains(item))
            }
            (FieldValue::Map(a), FieldValue::Map(b)) => a == b,
            (FieldValue::Object(a), FieldValue::Object(b)) => a == b,
            (FieldValue::ObjectList(a), FieldValue::ObjectList(b)) => a == b,
            _ => false,
        }
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Int(i)
    }
}

impl From<i32> for FieldValue {
    fn from(i: i32) -> Self {
        FieldValue::Int(i as i64)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<VersionedObject> for FieldValue {
    fn from(o: VersionedObject) -> Self {
        FieldValue::Object(Box::new(o))
    }
}

impl From<Vec<VersionedObject>> for FieldValue {
    fn from(objs: Vec<VersionedObject>) -> Self {
        FieldValue::ObjectList(objs)
    }
}
