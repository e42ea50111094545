//! Entity serialization and version negotiation
//!
//! [`ObjectSerializer`] walks arbitrary entity values crossing a process
//! boundary, flattening embedded objects on the way out and hydrating
//! primitive envelopes on the way in. Hydration negotiates versions: a
//! primitive newer than this process understands is sent back through the
//! [`BackportChannel`] to a peer that can downgrade it, or hydrated at
//! the best local class when no such peer is configured.

use crate::object::VersionedObject;
use crate::primitive::{field_value_to_json, json_to_naive, Primitive};
use crate::registry::Registry;
use crate::value::FieldValue;
use serde_json::Value as Json;
use std::sync::Arc;
use tracing::{debug, trace, warn};
use verso_core::{ObjectVersion, RequestContext, Result};

/// Collaborator able to downgrade primitives this process cannot
///
/// Typically backed by the same transport as the indirection channel and
/// answered by a service running newer code.
pub trait BackportChannel: Send + Sync {
    /// Downgrade a too-new primitive to the target version
    fn backport(
        &self,
        context: Option<&RequestContext>,
        primitive: &Primitive,
        target: &ObjectVersion,
    ) -> Result<Primitive>;
}

/// Serializer for entities crossing a process boundary
pub struct ObjectSerializer {
    registry: Arc<Registry>,
    backport: Option<Arc<dyn BackportChannel>>,
}

impl ObjectSerializer {
    /// A serializer with no backport collaborator
    pub fn new(registry: Arc<Registry>) -> Self {
        ObjectSerializer {
            registry,
            backport: None,
        }
    }

    /// A serializer that delegates too-new primitives to a peer
    pub fn with_backport(registry: Arc<Registry>, channel: Arc<dyn BackportChannel>) -> Self {
        ObjectSerializer {
            registry,
            backport: Some(channel),
        }
    }

    /// Flatten an entity for the wire
    ///
    /// Embedded objects become primitive envelopes; containers are walked
    /// recursively; everything else encodes as plain JSON.
    pub fn serialize_entity(&self, _context: Option<&RequestContext>, value: &FieldValue) -> Json {
        field_value_to_json(value)
    }

    /// Rebuild an entity from the wire
    ///
    /// Any JSON map carrying the primitive envelope keys hydrates into a
    /// live object, at any nesting depth; other values convert
    /// structurally.
    pub fn deserialize_entity(
        &self,
        context: Option<&RequestContext>,
        json: &Json,
    ) -> Result<FieldValue> {
        match json {
            Json::Object(map) if Primitive::is_primitive(map) => {
                let prim = Primitive::from_value(json)?;
                Ok(FieldValue::Object(Box::new(self.hydrate(context, prim)?)))
            }
            Json::Object(map) => Ok(FieldValue::Map(
                map.iter()
                    .map(|(key, item)| {
                        Ok((key.clone(), self.deserialize_entity(context, item)?))
                    })
                    .collect::<Result<_>>()?,
            )),
            Json::Array(items) => Ok(FieldValue::List(
                items
                    .iter()
                    .map(|item| self.deserialize_entity(context, item))
                    .collect::<Result<_>>()?,
            )),
            other => Ok(json_to_naive(other)),
        }
    }

    /// Hydrate one primitive, negotiating its version against the local
    /// registry
    ///
    /// Same shape as the local latest hydrates directly, taking the local
    /// label so a peer's revision drift never surfaces here. A newer
    /// same-major minor is backported through the channel to the local
    /// latest label, or hydrated degraded at the best local class when no
    /// channel is configured. Anything else hydrates through ordinary
    /// registry lookup.
    pub fn hydrate(
        &self,
        context: Option<&RequestContext>,
        primitive: Primitive,
    ) -> Result<VersionedObject> {
        let local = self.registry.latest(&primitive.name)?.version().clone();
        if primitive.version.same_shape(&local) {
            trace!(object = %primitive.name, version = %local, "hydrating at local shape");
            let mut prim = primitive;
            prim.version = local;
            return VersionedObject::from_primitive(&self.registry, &prim, context);
        }
        let newer_minor =
            primitive.version.major == local.major && primitive.version.minor > local.minor;
        if newer_minor {
            return match &self.backport {
                Some(channel) => {
                    debug!(
                        object = %primitive.name,
                        received = %primitive.version,
                        target = %local,
                        "requesting backport from peer"
                    );
                    let downgraded = channel.backport(context, &primitive, &local)?;
                    VersionedObject::from_primitive(&self.registry, &downgraded, context)
                }
                None => {
                    warn!(
                        object = %primitive.name,
                        received = %primitive.version,
                        local = %local,
                        "no backport channel, hydrating degraded at local version"
                    );
                    let mut prim = primitive;
                    prim.version = local;
                    VersionedObject::from_primitive(&self.registry, &prim, context)
                }
            };
        }
        VersionedObject::from_primitive(&self.registry, &primitive, context)
    }
}
