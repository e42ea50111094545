//! Property tests for wire round-trips.

use proptest::prelude::*;
use std::sync::Arc;
use verso::{
    ClassDef, FieldSpec, FieldType, FieldValue, ObjectVersion, Registry, VersionedObject,
};

fn scalar_registry() -> Arc<Registry> {
    let registry = Arc::new(Registry::new());
    registry.register(
        ClassDef::builder("Sample", ObjectVersion::new(1, 0))
            .field(FieldSpec::new("count", FieldType::Integer))
            .field(FieldSpec::new("label", FieldType::Str))
            .field(FieldSpec::new("active", FieldType::Boolean))
            .build(),
    );
    registry
}

proptest! {
    #[test]
    fn scalar_fields_survive_the_wire(
        count in any::<i64>(),
        label in "[a-zA-Z0-9 _-]{0,40}",
        active in any::<bool>(),
        clean in any::<bool>(),
    ) {
        let registry = scalar_registry();
        let mut obj = VersionedObject::new(registry.latest("Sample").unwrap());
        obj.set("count", count).unwrap();
        obj.set("label", label.as_str()).unwrap();
        obj.set("active", active).unwrap();
        if clean {
            obj.reset_changes(None, false);
        }
        let wire = serde_json::to_string(&obj.to_primitive()).unwrap();
        let prim = serde_json::from_str(&wire).unwrap();
        let back = VersionedObject::from_primitive(&registry, &prim, None).unwrap();
        prop_assert_eq!(&back, &obj);
        prop_assert_eq!(
            back.get_if_set("label"),
            Some(&FieldValue::String(label))
        );
    }

    #[test]
    fn version_labels_survive_the_wire(
        major in 1u32..50,
        minor in 0u32..50,
        revision in proptest::option::of(0u32..10),
    ) {
        let version = ObjectVersion { major, minor, revision };
        let wire = serde_json::to_string(&version).unwrap();
        let back: ObjectVersion = serde_json::from_str(&wire).unwrap();
        prop_assert_eq!(back, version);
    }
}
