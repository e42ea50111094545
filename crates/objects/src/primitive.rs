//! Wire primitives
//!
//! A [`Primitive`] is the self-describing JSON envelope every versioned
//! object travels as: `verso_object.name`, `.namespace`, `.version`,
//! `.data` and an optional `.changes` list. [`VersionedObject::to_primitive`]
//! flattens a live instance; [`VersionedObject::from_primitive`] hydrates
//! one back through the registry, dropping undeclared wire fields and
//! coercing every declared one.

use crate::field::{FieldSpec, FieldType};
use crate::object::VersionedObject;
use crate::registry::Registry;
use crate::value::FieldValue;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as Json;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;
use verso_core::{Error, ObjectVersion, RequestContext, Result};

/// Namespace tag all primitives from this domain carry
pub const WIRE_NAMESPACE: &str = "verso";

const KEY_NAME: &str = "verso_object.name";
const KEY_NAMESPACE: &str = "verso_object.namespace";
const KEY_VERSION: &str = "verso_object.version";
const KEY_DATA: &str = "verso_object.data";
const KEY_CHANGES: &str = "verso_object.changes";

/// Self-describing wire form of one versioned object
#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    /// Object name
    pub name: String,
    /// Originating domain namespace
    pub namespace: String,
    /// Version label the data was emitted at
    pub version: ObjectVersion,
    /// Field name to JSON-encoded value, set fields only
    pub data: serde_json::Map<String, Json>,
    /// Changed-field names, omitted on the wire when empty
    pub changes: Option<Vec<String>>,
}

impl Primitive {
    /// An empty primitive for the given name and version
    pub fn new(name: impl Into<String>, version: ObjectVersion) -> Self {
        Primitive {
            name: name.into(),
            namespace: WIRE_NAMESPACE.to_string(),
            version,
            data: serde_json::Map::new(),
            changes: None,
        }
    }

    /// Whether a JSON map looks like a primitive envelope
    pub fn is_primitive(map: &serde_json::Map<String, Json>) -> bool {
        map.contains_key(KEY_NAME)
    }

    /// Encode to the JSON envelope
    pub fn to_value(&self) -> Json {
        let mut map = serde_json::Map::new();
        map.insert(KEY_NAME.to_string(), Json::String(self.name.clone()));
        map.insert(
            KEY_NAMESPACE.to_string(),
            Json::String(self.namespace.clone()),
        );
        map.insert(
            KEY_VERSION.to_string(),
            Json::String(self.version.to_string()),
        );
        map.insert(KEY_DATA.to_string(), Json::Object(self.data.clone()));
        if let Some(changes) = &self.changes {
            if !changes.is_empty() {
                map.insert(
                    KEY_CHANGES.to_string(),
                    Json::Array(changes.iter().cloned().map(Json::String).collect()),
                );
            }
        }
        Json::Object(map)
    }

    /// Decode from the JSON envelope
    pub fn from_value(value: &Json) -> Result<Self> {
        let map = value
            .as_object()
            .ok_or_else(|| Error::InvalidPrimitive("not a JSON object".to_string()))?;
        let text_key = |key: &str| -> Result<String> {
            map.get(key)
                .and_then(Json::as_str)
                .map(str::to_string)
                .ok_or_else(|| Error::InvalidPrimitive(format!("missing or non-string {key}")))
        };
        let name = text_key(KEY_NAME)?;
        let namespace = text_key(KEY_NAMESPACE)?;
        let version = ObjectVersion::parse(&text_key(KEY_VERSION)?)?;
        let data = map
            .get(KEY_DATA)
            .and_then(Json::as_object)
            .cloned()
            .ok_or_else(|| Error::InvalidPrimitive(format!("missing or non-object {KEY_DATA}")))?;
        let changes = match map.get(KEY_CHANGES) {
            None => None,
            Some(Json::Array(items)) => Some(
                items
                    .iter()
                    .map(|item| {
                        item.as_str().map(str::to_string).ok_or_else(|| {
                            Error::InvalidPrimitive(format!("non-string entry in {KEY_CHANGES}"))
                        })
                    })
                    .collect::<Result<Vec<_>>>()?,
            ),
            Some(_) => {
                return Err(Error::InvalidPrimitive(format!(
                    "non-array {KEY_CHANGES}"
                )))
            }
        };
        Ok(Primitive {
            name,
            namespace,
            version,
            data,
            changes,
        })
    }
}

impl Serialize for Primitive {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Primitive {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Json::deserialize(deserializer)?;
        Primitive::from_value(&value).map_err(D::Error::custom)
    }
}

/// Encode one field value as wire JSON
///
/// Sets are rendered as a canonically sorted array so the wire form is
/// order-stable regardless of in-memory insertion order.
pub(crate) fn field_value_to_json(value: &FieldValue) -> Json {
    match value {
        FieldValue::Null => Json::Null,
        FieldValue::Bool(b) => Json::Bool(*b),
        FieldValue::Int(i) => Json::Number((*i).into()),
        FieldValue::Float(f) => serde_json::Number::from_f64(*f)
            .map(Json::Number)
            .unwrap_or(Json::Null),
        FieldValue::String(s) => Json::String(s.clone()),
        FieldValue::List(items) => Json::Array(items.iter().map(field_value_to_json).collect()),
        FieldValue::Set(items) => {
            let mut encoded: Vec<Json> = items.iter().map(field_value_to_json).collect();
            encoded.sort_by_key(|item| item.to_string());
            Json::Array(encoded)
        }
        FieldValue::Map(entries) => Json::Object(
            entries
                .iter()
                .map(|(key, item)| (key.clone(), field_value_to_json(item)))
                .collect(),
        ),
        FieldValue::Object(obj) => obj.to_primitive().to_value(),
        FieldValue::ObjectList(objs) => Json::Array(
            objs.iter()
                .map(|obj| obj.to_primitive().to_value())
                .collect(),
        ),
    }
}

/// Structural JSON-to-value conversion, no object awareness
pub(crate) fn json_to_naive(json: &Json) -> FieldValue {
    match json {
        Json::Null => FieldValue::Null,
        Json::Bool(b) => FieldValue::Bool(*b),
        Json::Number(n) => match n.as_i64() {
            Some(i) => FieldValue::Int(i),
            None => FieldValue::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Json::String(s) => FieldValue::String(s.clone()),
        Json::Array(items) => FieldValue::List(items.iter().map(json_to_naive).collect()),
        Json::Object(map) => FieldValue::Map(
            map.iter()
                .map(|(key, item)| (key.clone(), json_to_naive(item)))
                .collect(),
        ),
    }
}

/// Decode one wire value for a declared field, hydrating nested objects
/// through the registry
pub(crate) fn json_to_field_value(
    registry: &Registry,
    context: Option<&RequestContext>,
    spec: &FieldSpec,
    json: &Json,
) -> Result<FieldValue> {
    if json.is_null() {
        return spec.coerce(FieldValue::Null);
    }
    match spec.kind() {
        FieldType::Object(_) => {
            let prim = Primitive::from_value(json)?;
            let obj = VersionedObject::from_primitive(registry, &prim, context)?;
            spec.coerce(FieldValue::Object(Box::new(obj)))
        }
        FieldType::ListOfObjects(_) => {
            let items = json.as_array().ok_or_else(|| Error::Coercion {
                field: spec.name().to_string(),
                reason: "expected an array of primitives".to_string(),
            })?;
            let objs = items
                .iter()
                .map(|item| {
                    let prim = Primitive::from_value(item)?;
                    VersionedObject::from_primitive(registry, &prim, context)
                })
                .collect::<Result<Vec<_>>>()?;
            spec.coerce(FieldValue::ObjectList(objs))
        }
        _ => spec.coerce(json_to_naive(json)),
    }
}

impl VersionedObject {
    /// Flatten to the wire primitive
    ///
    /// Only set fields appear in the data map; the changes list reflects
    /// [`what_changed`](Self::what_changed) and is omitted when empty.
    pub fn to_primitive(&self) -> Primitive {
        let mut data = serde_json::Map::new();
        for (name, value) in self.raw_data() {
            data.insert(name.clone(), field_value_to_json(value));
        }
        let changed = self.what_changed();
        Primitive {
            name: self.obj_name().to_string(),
            namespace: WIRE_NAMESPACE.to_string(),
            version: self.version().clone(),
            data,
            changes: if changed.is_empty() {
                None
            } else {
                Some(changed.into_iter().collect())
            },
        }
    }

    /// Hydrate a primitive into a live instance
    ///
    /// The class is resolved through the registry at the primitive's
    /// version. Wire fields the class does not declare are dropped with a
    /// debug log; declared fields coerce or fail. The changed set is the
    /// intersection of the wire changes list with declared fields.
    pub fn from_primitive(
        registry: &Registry,
        primitive: &Primitive,
        context: Option<&RequestContext>,
    ) -> Result<VersionedObject> {
        if primitive.namespace != WIRE_NAMESPACE {
            return Err(Error::UnsupportedObject {
                name: format!("{}.{}", primitive.namespace, primitive.name),
            });
        }
        let class = registry.lookup(&primitive.name, &primitive.version)?;
        let mut data = BTreeMap::new();
        for (key, json) in &primitive.data {
            let Some(spec) = class.field(key) else {
                debug!(object = %primitive.name, field = %key, "dropping undeclared wire field");
                continue;
            };
            data.insert(
                key.clone(),
                json_to_field_value(registry, context, spec, json)?,
            );
        }
        let changed: BTreeSet<String> = primitive
            .changes
            .iter()
            .flatten()
            .filter(|name| data.contains_key(name.as_str()))
            .cloned()
            .collect();
        Ok(VersionedObject::from_parts(
            class,
            primitive.version.clone(),
            data,
            changed,
            context.cloned(),
        ))
    }
}
