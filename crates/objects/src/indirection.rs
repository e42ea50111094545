//! Remote method dispatch and scoped context swaps
//!
//! A [`Dispatcher`] routes remote-capable method calls either to the
//! class's local handler or through an [`IndirectionChannel`] to a peer
//! that executes the method against authoritative state. A remote call
//! answers with the mutations it made ([`MethodUpdates`]), which are
//! applied to the caller's instance so both sides converge.
//!
//! [`ContextGuard`] gives scoped context swaps with RAII restore, so the
//! original context comes back on every exit path.

use crate::object::{ClassDef, VersionedObject};
use crate::primitive::{json_to_field_value, Primitive};
use crate::registry::Registry;
use crate::serializer::ObjectSerializer;
use crate::value::FieldValue;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde_json::Value as Json;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tracing::debug;
use verso_core::{Error, ObjectVersion, RequestContext, Result};

/// Mutations a remote method made to the instance it ran against
#[derive(Debug, Clone, Default)]
pub struct MethodUpdates {
    /// New wire values for fields the method assigned
    pub fields: BTreeMap<String, Json>,
    /// Authoritative changed set after the method ran
    pub changed: BTreeSet<String>,
}

/// Transport to a peer executing remote-capable methods
pub trait IndirectionChannel: Send + Sync {
    /// Run an instance method remotely
    ///
    /// Answers with the mutations made to the instance and the method's
    /// wire-encoded result.
    fn invoke_instance_method(
        &self,
        context: &RequestContext,
        instance: &Primitive,
        method: &str,
        args: &[Json],
        kwargs: &BTreeMap<String, Json>,
    ) -> Result<(MethodUpdates, Json)>;

    /// Run a class method remotely
    fn invoke_class_method(
        &self,
        context: &RequestContext,
        class_name: &str,
        method: &str,
        target: &ObjectVersion,
        args: &[Json],
        kwargs: &BTreeMap<String, Json>,
    ) -> Result<Json>;
}

static DEFAULT_CHANNEL: Lazy<RwLock<Option<Arc<dyn IndirectionChannel>>>> =
    Lazy::new(|| RwLock::new(None));

/// Install or clear the process-wide default channel
pub fn set_default_channel(channel: Option<Arc<dyn IndirectionChannel>>) {
    *DEFAULT_CHANNEL.write() = channel;
}

/// The process-wide default channel, if one is installed
pub fn default_channel() -> Option<Arc<dyn IndirectionChannel>> {
    DEFAULT_CHANNEL.read().clone()
}

/// Routes remote-capable calls locally or through a channel
pub struct Dispatcher {
    registry: Arc<Registry>,
    channel: Option<Arc<dyn IndirectionChannel>>,
}

impl Dispatcher {
    /// A dispatcher running every method locally
    pub fn local(registry: Arc<Registry>) -> Self {
        Dispatcher {
            registry,
            channel: None,
        }
    }

    /// A dispatcher routing every method through the channel
    pub fn remote(registry: Arc<Registry>, channel: Arc<dyn IndirectionChannel>) -> Self {
        Dispatcher {
            registry,
            channel: Some(channel),
        }
    }

    /// A dispatcher using the process-wide default channel, local when
    /// none is installed
    pub fn from_default(registry: Arc<Registry>) -> Self {
        Dispatcher {
            registry,
            channel: default_channel(),
        }
    }

    /// Whether calls go through a channel
    pub fn is_remote(&self) -> bool {
        self.channel.is_some()
    }

    /// A local-execution copy of this dispatcher
    ///
    /// Services answering indirected calls use this to run the actual
    /// handler instead of bouncing the call back out.
    pub fn local_scope(&self) -> Dispatcher {
        Dispatcher {
            registry: Arc::clone(&self.registry),
            channel: None,
        }
    }

    /// Call a remote-capable instance method
    ///
    /// Fails with `Orphaned` before any routing when the instance has no
    /// bound context. A remote call flattens the instance, ships it with
    /// the encoded arguments, then applies the answered mutations and
    /// adopts the authoritative changed set.
    pub fn call(
        &self,
        obj: &mut VersionedObject,
        method: &str,
        args: &[FieldValue],
        kwargs: &BTreeMap<String, FieldValue>,
    ) -> Result<FieldValue> {
        let context = obj.context().cloned().ok_or_else(|| Error::Orphaned {
            object: obj.obj_name().to_string(),
            method: method.to_string(),
        })?;
        match &self.channel {
            None => {
                let class = Arc::clone(obj.class());
                let handler = class
                    .method(method)
                    .ok_or_else(|| Error::UnknownMethod {
                        object: obj.obj_name().to_string(),
                        method: method.to_string(),
                    })?
                    .handler();
                handler(obj, &context, args, kwargs)
            }
            Some(channel) => {
                debug!(object = %obj.obj_name(), method, "dispatching instance method remotely");
                let serializer = ObjectSerializer::new(Arc::clone(&self.registry));
                let wire_args: Vec<Json> = args
                    .iter()
                    .map(|arg| serializer.serialize_entity(Some(&context), arg))
                    .collect();
                let wire_kwargs: BTreeMap<String, Json> = kwargs
                    .iter()
                    .map(|(key, arg)| {
                        (key.clone(), serializer.serialize_entity(Some(&context), arg))
                    })
                    .collect();
                let (updates, result) = channel.invoke_instance_method(
                    &context,
                    &obj.to_primitive(),
                    method,
                    &wire_args,
                    &wire_kwargs,
                )?;
                self.apply_updates(obj, &context, updates)?;
                serializer.deserialize_entity(Some(&context), &result)
            }
        }
    }

    /// Call a remote-capable class method
    pub fn call_class(
        &self,
        class: &Arc<ClassDef>,
        context: &RequestContext,
        method: &str,
        args: &[FieldValue],
        kwargs: &BTreeMap<String, FieldValue>,
    ) -> Result<FieldValue> {
        match &self.channel {
            None => {
                let handler = class
                    .class_method(method)
                    .ok_or_else(|| Error::UnknownMethod {
                        object: class.name().to_string(),
                        method: method.to_string(),
                    })?
                    .handler();
                handler(class, context, args, kwargs)
            }
            Some(channel) => {
                debug!(object = %class.name(), method, "dispatching class method remotely");
                let serializer = ObjectSerializer::new(Arc::clone(&self.registry));
                let wire_args: Vec<Json> = args
                    .iter()
                    .map(|arg| serializer.serialize_entity(Some(context), arg))
                    .collect();
                let wire_kwargs: BTreeMap<String, Json> = kwargs
                    .iter()
                    .map(|(key, arg)| {
                        (key.clone(), serializer.serialize_entity(Some(context), arg))
                    })
                    .collect();
                let result = channel.invoke_class_method(
                    context,
                    class.name(),
                    method,
                    class.version(),
                    &wire_args,
                    &wire_kwargs,
                )?;
                serializer.deserialize_entity(Some(context), &result)
            }
        }
    }

    /// Fold a remote method's mutations into the caller's instance
    ///
    /// Every answered field is assigned through ordinary coercion, then
    /// the changed set is replaced wholesale with the authoritative one.
    fn apply_updates(
        &self,
        obj: &mut VersionedObject,
        context: &RequestContext,
        updates: MethodUpdates,
    ) -> Result<()> {
        let class = Arc::clone(obj.class());
        for (name, json) in &updates.fields {
            let Some(spec) = class.field(name) else {
                debug!(object = %obj.obj_name(), field = %name, "dropping undeclared update field");
                continue;
            };
            let value = json_to_field_value(&self.registry, Some(context), spec, json)?;
            obj.set(name, value)?;
        }
        obj.replace_changed(updates.changed);
        Ok(())
    }
}

/// Scoped context swap on one instance, restored on drop
///
/// Derefs to the instance so the guarded scope reads naturally. The
/// original context comes back on every exit path, panic included.
#[derive(Debug)]
pub struct ContextGuard<'a> {
    obj: &'a mut VersionedObject,
    saved: Option<RequestContext>,
}

impl Deref for ContextGuard<'_> {
    type Target = VersionedObject;

    fn deref(&self) -> &VersionedObject {
        self.obj
    }
}

impl DerefMut for ContextGuard<'_> {
    fn deref_mut(&mut self) -> &mut VersionedObject {
        self.obj
    }
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        self.obj.replace_context(self.saved.take());
    }
}

/// Temporarily elevate the instance's context to administrator
///
/// Fails with `Orphaned` on a contextless instance; elevation of nothing
/// is meaningless.
pub fn obj_as_admin(obj: &mut VersionedObject) -> Result<ContextGuard<'_>> {
    let current = obj.context().cloned().ok_or_else(|| Error::Orphaned {
        object: obj.obj_name().to_string(),
        method: "obj_as_admin".to_string(),
    })?;
    let saved = obj.replace_context(Some(current.elevated()));
    Ok(ContextGuard { obj, saved })
}

/// Temporarily run the instance under a different context
///
/// Works on contextless instances too; the instance goes back to
/// contextless when the guard drops.
pub fn obj_alternate_context(
    obj: &mut VersionedObject,
    context: RequestContext,
) -> ContextGuard<'_> {
    let saved = obj.replace_context(Some(context));
    ContextGuard { obj, saved }
}
