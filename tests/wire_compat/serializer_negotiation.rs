//! Version negotiation during entity deserialization.
//!
//! The backport channel here is backed by a registry running newer code,
//! the way a conductor service answers backport requests for older nodes.

use crate::common::{instance_class, v, volume_class};
use parking_lot::Mutex;
use std::sync::Arc;
use verso::{
    backport, BackportChannel, ClassDef, FieldSpec, FieldType, FieldValue, ObjectSerializer,
    ObjectVersion, Primitive, Registry, RequestContext, Result,
};

/// Answers backport requests with the newer side's compat engine
struct ConductorBackport {
    newer: Arc<Registry>,
    requests: Mutex<Vec<(ObjectVersion, ObjectVersion)>>,
}

impl ConductorBackport {
    fn new(newer: Arc<Registry>) -> Arc<Self> {
        Arc::new(ConductorBackport {
            newer,
            requests: Mutex::new(Vec::new()),
        })
    }
}

impl BackportChannel for ConductorBackport {
    fn backport(
        &self,
        _context: Option<&RequestContext>,
        primitive: &Primitive,
        target: &ObjectVersion,
    ) -> Result<Primitive> {
        self.requests
            .lock()
            .push((primitive.version.clone(), target.clone()));
        backport(&self.newer, primitive, target)
    }
}

/// Instance class carrying a shape hook: `vcpus` appeared at 1.3
fn hooked_instance(version: &str) -> Arc<ClassDef> {
    ClassDef::builder("Instance", v(version))
        .field(FieldSpec::new("host", FieldType::Str))
        .field(FieldSpec::new("vcpus", FieldType::Integer))
        .shape_hook(|data, target| {
            if target.shape_cmp(&v("1.3")).is_lt() {
                data.remove("vcpus");
            }
            Ok(())
        })
        .build()
}

#[test]
fn revision_drift_hydrates_at_local_label() {
    // Peer emits 1.6.1; local class is 1.6. Same shape: no backport, no
    // trace of the peer's revision on the hydrated instance.
    let local = Arc::new(Registry::new());
    local.register(hooked_instance("1.6"));
    let serializer = ObjectSerializer::new(Arc::clone(&local));
    let mut prim = Primitive::new("Instance", v("1.6.1"));
    prim.data.insert("host".to_string(), "compute-1".into());
    let obj = serializer.hydrate(None, prim).unwrap();
    assert_eq!(obj.version(), &v("1.6"));
}

#[test]
fn newer_minor_backports_to_local_full_label() {
    // Local code is pinned at 1.6.1; the peer's 1.7 comes back through
    // the channel downgraded to exactly that label, revision included.
    let newer = Arc::new(Registry::new());
    newer.register(hooked_instance("1.7"));
    let local = Arc::new(Registry::new());
    local.register(hooked_instance("1.6.1"));

    let channel = ConductorBackport::new(newer);
    let serializer = ObjectSerializer::with_backport(Arc::clone(&local), channel.clone());
    let mut prim = Primitive::new("Instance", v("1.7"));
    prim.data.insert("host".to_string(), "compute-1".into());
    prim.data.insert("vcpus".to_string(), 4.into());
    let obj = serializer.hydrate(None, prim).unwrap();
    assert_eq!(obj.version(), &v("1.6.1"));
    assert_eq!(channel.requests.lock().as_slice(), &[(v("1.7"), v("1.6.1"))]);
}

#[test]
fn newer_minor_without_channel_degrades_locally() {
    let local = Arc::new(Registry::new());
    local.register(hooked_instance("1.6"));
    let serializer = ObjectSerializer::new(Arc::clone(&local));
    let mut prim = Primitive::new("Instance", v("1.7"));
    prim.data.insert("host".to_string(), "compute-1".into());
    let obj = serializer.hydrate(None, prim).unwrap();
    // Best-effort view at the local version, fields taken as-is
    assert_eq!(obj.version(), &v("1.6"));
    assert_eq!(obj.get_if_set("host").and_then(FieldValue::as_str), Some("compute-1"));
}

#[test]
fn new_publisher_old_consumer_end_to_end() {
    // A node running 1.6 publishes; a peer still on 1.2 consumes. The
    // peer's serializer bounces the primitive to the newer side, whose
    // shape hook strips the field its old class never had.
    let newer = Arc::new(Registry::new());
    newer.register(hooked_instance("1.6"));
    let older = Arc::new(Registry::new());
    older.register(hooked_instance("1.2"));

    let mut published = Primitive::new("Instance", v("1.6"));
    published.data.insert("host".to_string(), "compute-5".into());
    published.data.insert("vcpus".to_string(), 8.into());

    let channel = ConductorBackport::new(newer);
    let serializer = ObjectSerializer::with_backport(Arc::clone(&older), channel);
    let obj = serializer.hydrate(None, published).unwrap();
    assert_eq!(obj.version(), &v("1.2"));
    assert_eq!(obj.get_if_set("host").and_then(FieldValue::as_str), Some("compute-5"));
    assert!(!obj.is_set("vcpus").unwrap());
}

#[test]
fn version_spread_triggers_backport_to_peer_version() {
    // Publisher side: Flavor 1.6 with a defaulted counter field.
    let flavor = |version: &str| {
        ClassDef::builder("Flavor", v(version))
            .field(FieldSpec::new("foo", FieldType::Integer).with_default(1i64))
            .build()
    };
    let newer = Arc::new(Registry::new());
    newer.register(flavor("1.6"));
    let mut obj = verso::VersionedObject::new(newer.latest("Flavor").unwrap());
    obj.set("foo", 5i64).unwrap();
    let published = obj.to_primitive();
    assert_eq!(published.data["foo"], serde_json::json!(5));
    assert_eq!(published.changes, Some(vec!["foo".to_string()]));

    // Consumer side tops out at 1.2; hydrating the 1.6 primitive goes
    // through the channel asking for exactly 1.2.
    let older = Arc::new(Registry::new());
    older.register(flavor("1.2"));
    let channel = ConductorBackport::new(newer);
    let serializer = ObjectSerializer::with_backport(Arc::clone(&older), channel.clone());
    let hydrated = serializer.hydrate(None, published).unwrap();
    assert_eq!(hydrated.version(), &v("1.2"));
    assert_eq!(
        hydrated.get_if_set("foo").and_then(FieldValue::as_int),
        Some(5)
    );
    assert_eq!(channel.requests.lock().as_slice(), &[(v("1.6"), v("1.2"))]);
}

#[test]
fn nested_objects_negotiate_too() {
    // A whole aggregate from the new side hydrates on the old side after
    // one top-level backport walks its relationship ladder.
    let newer = crate::common::new_side();
    let older = Arc::new(Registry::new());
    older.register(volume_class("1.1"));
    older.register(instance_class("1.5"));

    let channel = ConductorBackport::new(newer);
    let serializer = ObjectSerializer::with_backport(Arc::clone(&older), channel);
    let obj = serializer
        .hydrate(None, crate::common::instance_primitive())
        .unwrap();
    assert_eq!(obj.version(), &v("1.5"));
    let boot = obj
        .get_if_set("boot_volume")
        .and_then(FieldValue::as_object)
        .unwrap();
    assert_eq!(boot.version(), &v("1.1"));
    let volumes = obj
        .get_if_set("volumes")
        .and_then(FieldValue::as_object_list)
        .unwrap();
    assert_eq!(volumes[0].version(), &v("1.1"));
}

#[test]
fn context_flows_into_hydrated_aggregates() {
    let registry = crate::common::new_side();
    let serializer = ObjectSerializer::new(Arc::clone(&registry));
    let ctx = RequestContext::new("fake-user", "fake-project");
    let obj = serializer
        .hydrate(Some(&ctx), crate::common::instance_primitive())
        .unwrap();
    assert_eq!(obj.context(), Some(&ctx));
    let boot = obj
        .get_if_set("boot_volume")
        .and_then(FieldValue::as_object)
        .unwrap();
    assert_eq!(boot.context(), Some(&ctx));
}
