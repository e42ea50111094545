//! Downgrading primitives for older peers
//!
//! [`CompatEngine`] rewrites a primitive's data in place so an older peer
//! can hydrate it. The owning class's shape hook runs first and adjusts
//! the object's own fields; then every nested-object field present in the
//! data is handled through the class's declared compatibility pairs. The
//! recursion works entirely on primitives, so a process can downgrade
//! wire data it never hydrated.

use crate::object::{ClassDef, VersionedObject};
use crate::primitive::Primitive;
use crate::registry::Registry;
use serde_json::Value as Json;
use std::cmp::Ordering;
use tracing::debug;
use verso_core::{Error, ObjectVersion, Result};

/// Primitive downgrade engine over a registry
pub struct CompatEngine<'a> {
    registry: &'a Registry,
}

impl<'a> CompatEngine<'a> {
    /// An engine resolving nested classes through the given registry
    pub fn new(registry: &'a Registry) -> Self {
        CompatEngine { registry }
    }

    /// Produce a copy of the primitive downgraded to the target version
    pub fn backport(&self, primitive: &Primitive, target: &ObjectVersion) -> Result<Primitive> {
        debug!(
            object = %primitive.name,
            from = %primitive.version,
            to = %target,
            "backporting primitive"
        );
        let class = self.registry.latest(&primitive.name)?;
        let mut out = primitive.clone();
        self.make_compatible(&class, &mut out.data, target)?;
        out.version = target.clone();
        Ok(out)
    }

    /// Rewrite a primitive's data map in place for the target version
    ///
    /// The class's own shape hook runs first. Every declared
    /// nested-object field present in the data must then have a
    /// relationship entry; a missing entry is a configuration defect.
    pub fn make_compatible(
        &self,
        class: &ClassDef,
        data: &mut serde_json::Map<String, Json>,
        target: &ObjectVersion,
    ) -> Result<()> {
        if let Some(hook) = class.shape_hook() {
            hook(data, target)?;
        }
        let nested: Vec<String> = class
            .fields()
            .filter(|spec| spec.kind().is_object_kind())
            .map(|spec| spec.name().to_string())
            .filter(|name| data.contains_key(name))
            .collect();
        for field in nested {
            self.apply_relationship(class, data, target, &field)?;
        }
        Ok(())
    }

    /// Downgrade or drop one nested-object field per the declared pairs
    ///
    /// The greatest pair whose owner column does not exceed the target
    /// decides: the newest pair means the nested data already has the
    /// right shape and is left untouched; an older pair recursively
    /// backports the nested primitive(s) to its child version; no pair at
    /// all means the field predates the target and is removed.
    fn apply_relationship(
        &self,
        class: &ClassDef,
        data: &mut serde_json::Map<String, Json>,
        target: &ObjectVersion,
        field: &str,
    ) -> Result<()> {
        let pairs = class
            .relationship(field)
            .ok_or_else(|| Error::MissingCompatibilityRule {
                object: class.name().to_string(),
                field: field.to_string(),
            })?;
        let applicable = pairs
            .iter()
            .rposition(|(owner, _)| owner.shape_cmp(target) != Ordering::Greater);
        match applicable {
            None => {
                data.remove(field);
            }
            Some(index) if index + 1 == pairs.len() => {}
            Some(index) => {
                let child = pairs[index].1.clone();
                let json = data
                    .get_mut(field)
                    .ok_or_else(|| Error::InvalidPrimitive(format!("field {field} vanished")))?;
                match json {
                    Json::Array(items) => {
                        for item in items.iter_mut() {
                            self.downgrade_value(item, &child)?;
                        }
                    }
                    other => self.downgrade_value(other, &child)?,
                }
            }
        }
        Ok(())
    }

    fn downgrade_value(&self, json: &mut Json, child: &ObjectVersion) -> Result<()> {
        let mut prim = Primitive::from_value(json)?;
        let class = self.registry.latest(&prim.name)?;
        self.make_compatible(&class, &mut prim.data, child)?;
        prim.version = child.clone();
        *json = prim.to_value();
        Ok(())
    }
}

impl VersionedObject {
    /// Flatten to a primitive downgraded for an older peer
    pub fn to_primitive_for(
        &self,
        registry: &Registry,
        target: &ObjectVersion,
    ) -> Result<Primitive> {
        CompatEngine::new(registry).backport(&self.to_primitive(), target)
    }

    /// Downgrade this instance in place to the target version
    ///
    /// Round-trips through the primitive form so relationship handling
    /// and the shape hook apply exactly as they do on the wire.
    pub fn downgrade_to(&mut self, registry: &Registry, target: &ObjectVersion) -> Result<()> {
        let prim = self.to_primitive_for(registry, target)?;
        let context = self.context().cloned();
        *self = VersionedObject::from_primitive(registry, &prim, context.as_ref())?;
        Ok(())
    }
}

// Convenience re-export spot for callers that only need the one-shot form
/// Downgrade a primitive to the target version through the registry
pub fn backport(
    registry: &Registry,
    primitive: &Primitive,
    target: &ObjectVersion,
) -> Result<Primitive> {
    CompatEngine::new(registry).backport(primitive, target)
}
