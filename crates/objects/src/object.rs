//! Versioned objects and their class definitions
//!
//! A [`ClassDef`] is the runtime description of one object class at one
//! version: its fields, compatibility relationships, hooks and
//! remote-capable methods. Classes are built once with
//! [`ClassDefBuilder`], shared as `Arc<ClassDef>` and registered with the
//! [`Registry`](crate::registry::Registry).
//!
//! A [`VersionedObject`] is a live, tracked instance. Every field starts
//! *unset*; assignment coerces through the field type and records the
//! field in the changed set. Dirtiness of owned sub-objects propagates
//! upward on read: `what_changed` reports a field whose nested object has
//! pending changes even if the field itself was never reassigned.
//!
//! No internal locking: concurrent mutation of one instance is the
//! caller's problem to serialize.

use crate::field::FieldSpec;
use crate::value::FieldValue;
use serde_json::Value as Json;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use verso_core::{Error, ObjectVersion, RequestContext, Result};

/// Per-class hook adjusting a primitive's own fields for an older target
/// version, run before relationship-driven recursion
pub type ShapeHook =
    Arc<dyn Fn(&mut serde_json::Map<String, Json>, &ObjectVersion) -> Result<()> + Send + Sync>;

/// Hook invoked when an unset field is read; must assign the field or fail
pub type LazyLoadHook = Arc<dyn Fn(&mut VersionedObject, &str) -> Result<()> + Send + Sync>;

/// Handler for a remote-capable instance method
pub type InstanceMethodFn = Arc<
    dyn Fn(
            &mut VersionedObject,
            &RequestContext,
            &[FieldValue],
            &BTreeMap<String, FieldValue>,
        ) -> Result<FieldValue>
        + Send
        + Sync,
>;

/// Handler for a remote-capable class method
pub type ClassMethodFn = Arc<
    dyn Fn(
            &Arc<ClassDef>,
            &RequestContext,
            &[FieldValue],
            &BTreeMap<String, FieldValue>,
        ) -> Result<FieldValue>
        + Send
        + Sync,
>;

/// A remote-capable instance method declaration
#[derive(Clone)]
pub struct RemoteMethod {
    name: String,
    signature: String,
    handler: InstanceMethodFn,
}

impl RemoteMethod {
    /// Method name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameter signature, hashed by the fingerprint checker
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// The local handler
    pub fn handler(&self) -> InstanceMethodFn {
        Arc::clone(&self.handler)
    }
}

/// A remote-capable class method declaration
#[derive(Clone)]
pub struct ClassRemoteMethod {
    name: String,
    signature: String,
    handler: ClassMethodFn,
}

impl ClassRemoteMethod {
    /// Method name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameter signature, hashed by the fingerprint checker
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// The local handler
    pub fn handler(&self) -> ClassMethodFn {
        Arc::clone(&self.handler)
    }
}

/// Runtime description of one object class at one version
pub struct ClassDef {
    name: String,
    version: ObjectVersion,
    fields: BTreeMap<String, FieldSpec>,
    relationships: BTreeMap<String, Vec<(ObjectVersion, ObjectVersion)>>,
    shape_hook: Option<ShapeHook>,
    lazy_load: Option<LazyLoadHook>,
    methods: BTreeMap<String, RemoteMethod>,
    class_methods: BTreeMap<String, ClassRemoteMethod>,
    extra_fields: Vec<String>,
}

impl ClassDef {
    /// Start building a class definition
    pub fn builder(name: impl Into<String>, version: ObjectVersion) -> ClassDefBuilder {
        ClassDefBuilder {
            def: ClassDef {
                name: name.into(),
                version,
                fields: BTreeMap::new(),
                relationships: BTreeMap::new(),
                shape_hook: None,
                lazy_load: None,
                methods: BTreeMap::new(),
                class_methods: BTreeMap::new(),
                extra_fields: Vec::new(),
            },
        }
    }

    /// Object name this class implements
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Version of this implementation
    pub fn version(&self) -> &ObjectVersion {
        &self.version
    }

    /// Declared field by name
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.get(name)
    }

    /// Whether the class declares the field
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// All declared fields, in name order
    pub fn fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.values()
    }

    /// Compatibility pairs for a nested-object field, if declared
    pub fn relationship(&self, field: &str) -> Option<&[(ObjectVersion, ObjectVersion)]> {
        self.relationships.get(field).map(|pairs| pairs.as_slice())
    }

    /// The full relationship table
    pub fn relationships(&self) -> &BTreeMap<String, Vec<(ObjectVersion, ObjectVersion)>> {
        &self.relationships
    }

    /// Own-shape compatibility hook, if declared
    pub fn shape_hook(&self) -> Option<&ShapeHook> {
        self.shape_hook.as_ref()
    }

    /// Lazy-load hook, if declared
    pub fn lazy_load(&self) -> Option<&LazyLoadHook> {
        self.lazy_load.as_ref()
    }

    /// Remote-capable instance method by name
    pub fn method(&self, name: &str) -> Option<&RemoteMethod> {
        self.methods.get(name)
    }

    /// All remote-capable instance methods, in name order
    pub fn methods(&self) -> impl Iterator<Item = &RemoteMethod> {
        self.methods.values()
    }

    /// Remote-capable class method by name
    pub fn class_method(&self, name: &str) -> Option<&ClassRemoteMethod> {
        self.class_methods.get(name)
    }

    /// All remote-capable class methods, in name order
    pub fn class_methods(&self) -> impl Iterator<Item = &ClassRemoteMethod> {
        self.class_methods.values()
    }

    /// Declared extra computed fields
    pub fn extra_fields(&self) -> &[String] {
        &self.extra_fields
    }
}

impl fmt::Debug for ClassDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDef")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Builder for [`ClassDef`]
pub struct ClassDefBuilder {
    def: ClassDef,
}

impl ClassDefBuilder {
    /// Declare a field
    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.def.fields.insert(spec.name().to_string(), spec);
        self
    }

    /// Declare the compatibility pairs for a nested-object field
    ///
    /// Pairs must be ordered with both columns non-decreasing; the
    /// fingerprint tooling verifies this, the runtime does not.
    pub fn relationship(
        mut self,
        field: impl Into<String>,
        pairs: Vec<(ObjectVersion, ObjectVersion)>,
    ) -> Self {
        self.def.relationships.insert(field.into(), pairs);
        self
    }

    /// Install the own-shape compatibility hook
    pub fn shape_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut serde_json::Map<String, Json>, &ObjectVersion) -> Result<()>
            + Send
            + Sync
            + 'static,
    {
        self.def.shape_hook = Some(Arc::new(hook));
        self
    }

    /// Install the lazy-load hook
    pub fn lazy_load<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut VersionedObject, &str) -> Result<()> + Send + Sync + 'static,
    {
        self.def.lazy_load = Some(Arc::new(hook));
        self
    }

    /// Declare a remote-capable instance method
    pub fn remote_method<F>(
        mut self,
        name: impl Into<String>,
        signature: impl Into<String>,
        handler: F,
    ) -> Self
    where
        F: Fn(
                &mut VersionedObject,
                &RequestContext,
                &[FieldValue],
                &BTreeMap<String, FieldValue>,
            ) -> Result<FieldValue>
            + Send
            + Sync
            + 'static,
    {
        let name = name.into();
        self.def.methods.insert(
            name.clone(),
            RemoteMethod {
                name,
                signature: signature.into(),
                handler: Arc::new(handler),
            },
        );
        self
    }

    /// Declare a remote-capable class method
    pub fn remote_class_method<F>(
        mut self,
        name: impl Into<String>,
        signature: impl Into<String>,
        handler: F,
    ) -> Self
    where
        F: Fn(
                &Arc<ClassDef>,
                &RequestContext,
                &[FieldValue],
                &BTreeMap<String, FieldValue>,
            ) -> Result<FieldValue>
            + Send
            + Sync
            + 'static,
    {
        let name = name.into();
        self.def.class_methods.insert(
            name.clone(),
            ClassRemoteMethod {
                name,
                signature: signature.into(),
                handler: Arc::new(handler),
            },
        );
        self
    }

    /// Declare an extra computed field
    pub fn extra_field(mut self, name: impl Into<String>) -> Self {
        self.def.extra_fields.push(name.into());
        self
    }

    /// Finish, producing a shareable class definition
    pub fn build(self) -> Arc<ClassDef> {
        Arc::new(self.def)
    }
}

/// A live, change-tracked instance of a versioned class
///
/// ## Invariants
///
/// - The changed-field set is always a subset of the fields currently set
/// - The version label starts at the class version; hydration may lower it
#[derive(Debug, Clone)]
pub struct VersionedObject {
    class: Arc<ClassDef>,
    version: ObjectVersion,
    data: BTreeMap<String, FieldValue>,
    changed: BTreeSet<String>,
    context: Option<RequestContext>,
}

impl VersionedObject {
    /// Create an instance with every field unset
    pub fn new(class: Arc<ClassDef>) -> Self {
        let version = class.version().clone();
        VersionedObject {
            class,
            version,
            data: BTreeMap::new(),
            changed: BTreeSet::new(),
            context: None,
        }
    }

    /// Create an instance bound to a request context
    pub fn with_context(class: Arc<ClassDef>, context: RequestContext) -> Self {
        let mut obj = VersionedObject::new(class);
        obj.context = Some(context);
        obj
    }

    /// Used by hydration to rebuild a tracked instance from wire parts
    pub(crate) fn from_parts(
        class: Arc<ClassDef>,
        version: ObjectVersion,
        data: BTreeMap<String, FieldValue>,
        changed: BTreeSet<String>,
        context: Option<RequestContext>,
    ) -> Self {
        VersionedObject {
            class,
            version,
            data,
            changed,
            context,
        }
    }

    /// Object name
    pub fn obj_name(&self) -> &str {
        self.class.name()
    }

    /// Version label of this instance
    pub fn version(&self) -> &ObjectVersion {
        &self.version
    }

    /// The class definition backing this instance
    pub fn class(&self) -> &Arc<ClassDef> {
        &self.class
    }

    /// Bound request context, if any
    pub fn context(&self) -> Option<&RequestContext> {
        self.context.as_ref()
    }

    /// Bind a request context
    pub fn bind_context(&mut self, context: RequestContext) {
        self.context = Some(context);
    }

    /// Swap the bound context, returning the previous one
    pub(crate) fn replace_context(
        &mut self,
        context: Option<RequestContext>,
    ) -> Option<RequestContext> {
        std::mem::replace(&mut self.context, context)
    }

    /// Whether a declared field currently holds a value
    pub fn is_set(&self, field: &str) -> Result<bool> {
        if !self.class.has_field(field) {
            return Err(self.unknown_field(field));
        }
        Ok(self.data.contains_key(field))
    }

    /// Read a field, lazy-loading it if unset
    ///
    /// An unset field triggers the class lazy-load hook, which must itself
    /// assign the field (marking it changed). With no hook bound, or a
    /// hook that does not assign, this fails with `CannotLoad`.
    pub fn get(&mut self, field: &str) -> Result<&FieldValue> {
        if !self.class.has_field(field) {
            return Err(self.unknown_field(field));
        }
        if !self.data.contains_key(field) {
            let hook = match self.class.lazy_load() {
                Some(hook) => Arc::clone(hook),
                None => {
                    return Err(Error::CannotLoad {
                        field: field.to_string(),
                    })
                }
            };
            hook(self, field)?;
        }
        self.data.get(field).ok_or_else(|| Error::CannotLoad {
            field: field.to_string(),
        })
    }

    /// Read a field if set, otherwise return the supplied default
    ///
    /// Unlike [`get`](Self::get) this never lazy-loads, but it still
    /// rejects undeclared field names.
    pub fn get_or(&self, field: &str, default: FieldValue) -> Result<FieldValue> {
        if !self.class.has_field(field) {
            return Err(self.unknown_field(field));
        }
        Ok(self.data.get(field).cloned().unwrap_or(default))
    }

    /// Read a field without triggering lazy-load
    pub fn get_if_set(&self, field: &str) -> Option<&FieldValue> {
        self.data.get(field)
    }

    /// Mutable access to a set field, for in-place edits of owned
    /// sub-objects
    ///
    /// Never lazy-loads and never marks the field changed; dirt from
    /// edits to a nested object surfaces through `what_changed`.
    pub fn get_mut(&mut self, field: &str) -> Result<&mut FieldValue> {
        if !self.class.has_field(field) {
            return Err(self.unknown_field(field));
        }
        self.data.get_mut(field).ok_or_else(|| Error::NotSet {
            field: field.to_string(),
        })
    }

    /// Assign a field, coercing the value and marking it changed
    pub fn set(&mut self, field: &str, value: impl Into<FieldValue>) -> Result<()> {
        let class = Arc::clone(&self.class);
        let spec = class
            .field(field)
            .ok_or_else(|| self.unknown_field(field))?;
        if spec.is_read_only() && self.data.contains_key(field) {
            return Err(Error::ReadOnlyField {
                field: field.to_string(),
            });
        }
        let coerced = spec.coerce(value.into())?;
        self.data.insert(field.to_string(), coerced);
        self.changed.insert(field.to_string());
        Ok(())
    }

    /// Clear a field back to unset without marking it changed
    ///
    /// The field is also dropped from the changed set (changed fields are
    /// always a subset of set fields). The next access lazy-loads again.
    pub fn unset(&mut self, field: &str) -> Result<()> {
        if !self.class.has_field(field) {
            return Err(self.unknown_field(field));
        }
        if self.data.remove(field).is_none() {
            return Err(Error::NotSet {
                field: field.to_string(),
            });
        }
        self.changed.remove(field);
        Ok(())
    }

    /// Apply declared defaults
    ///
    /// For one field this fails with `NoDefault` if none is declared. For
    /// all fields it materializes a fresh default for every field that
    /// declares one and is not already set, marking them changed.
    pub fn set_defaults(&mut self, field: Option<&str>) -> Result<()> {
        let class = Arc::clone(&self.class);
        match field {
            Some(name) => {
                let spec = class.field(name).ok_or_else(|| self.unknown_field(name))?;
                let default = spec.default_value().ok_or_else(|| Error::NoDefault {
                    field: name.to_string(),
                })?;
                self.set(name, default)
            }
            None => {
                for spec in class.fields() {
                    if self.data.contains_key(spec.name()) {
                        continue;
                    }
                    if let Some(default) = spec.default_value() {
                        self.set(spec.name(), default)?;
                    }
                }
                Ok(())
            }
        }
    }

    /// Fields with pending changes, including dirty owned sub-objects
    ///
    /// A field whose current value is a nested object (or list of them)
    /// reporting its own changes is included even if the field itself was
    /// never reassigned.
    pub fn what_changed(&self) -> BTreeSet<String> {
        let mut changed = self.changed.clone();
        for (name, value) in &self.data {
            if value.has_dirty_objects() {
                changed.insert(name.clone());
            }
        }
        changed
    }

    /// Snapshot of changed field name to current value, non-recursive
    pub fn get_changes(&self) -> BTreeMap<String, FieldValue> {
        self.changed
            .iter()
            .filter_map(|name| self.data.get(name).map(|v| (name.clone(), v.clone())))
            .collect()
    }

    /// Establish a new change baseline
    ///
    /// With `fields`, only the named fields are cleared. With `recursive`,
    /// every currently-set nested object (restricted to `fields` when
    /// given) is reset as well.
    pub fn reset_changes(&mut self, fields: Option<&[&str]>, recursive: bool) {
        if recursive {
            for (name, value) in self.data.iter_mut() {
                if let Some(only) = fields {
                    if !only.contains(&name.as_str()) {
                        continue;
                    }
                }
                match value {
                    FieldValue::Object(obj) => obj.reset_changes(None, true),
                    FieldValue::ObjectList(objs) => {
                        for obj in objs.iter_mut() {
                            obj.reset_changes(None, true);
                        }
                    }
                    _ => {}
                }
            }
        }
        match fields {
            Some(only) => {
                for name in only {
                    self.changed.remove(*name);
                }
            }
            None => self.changed.clear(),
        }
    }

    /// Replace the changed set with an authoritative one (remote dispatch)
    pub(crate) fn replace_changed(&mut self, changed: BTreeSet<String>) {
        self.changed = changed
            .into_iter()
            .filter(|name| self.data.contains_key(name))
            .collect();
    }

    /// Compare two instances field-by-field, ignoring the named fields
    /// and ignoring dirty state entirely
    pub fn equal_ignoring(&self, other: &VersionedObject, ignore: &[&str]) -> bool {
        if self.obj_name() != other.obj_name() {
            return false;
        }
        self.class
            .fields()
            .map(|spec| spec.name())
            .chain(other.class.fields().map(|spec| spec.name()))
            .filter(|name| !ignore.contains(name))
            .all(|name| self.data.get(name) == other.data.get(name))
    }

    /// Declared fields plus extra computed fields
    pub fn object_fields(&self) -> Vec<String> {
        self.class
            .fields()
            .map(|spec| spec.name().to_string())
            .chain(self.class.extra_fields().iter().cloned())
            .collect()
    }

    pub(crate) fn raw_data(&self) -> &BTreeMap<String, FieldValue> {
        &self.data
    }

    fn unknown_field(&self, field: &str) -> Error {
        Error::UnknownField {
            object: self.obj_name().to_string(),
            field: field.to_string(),
        }
    }
}

impl PartialEq for VersionedObject {
    /// Same class name, version label, field values and changed set;
    /// the bound context does not participate
    fn eq(&self, other: &Self) -> bool {
        self.obj_name() == other.obj_name()
            && self.version == other.version
            && self.data == other.data
            && self.changed == other.changed
    }
}

impl fmt::Display for VersionedObject {
    /// `Name(field=value,unset=<?>,...)` in field-name order
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.obj_name())?;
        let mut first = true;
        for spec in self.class.fields() {
            if !first {
                write!(f, ",")?;
            }
            first = false;
            match self.data.get(spec.name()) {
                Some(value) => write!(f, "{}={:?}", spec.name(), value)?,
                None => write!(f, "{}=<?>", spec.name())?,
            }
        }
        write!(f, ")")
    }
}
