//! Fingerprint pinning and relationship-order checks.

use crate::common::{instance_class, v, volume_class};
use verso::{fingerprint, fingerprints, relationships_ordered, ClassDef, FieldSpec, FieldType};

#[test]
fn fingerprint_is_stable_for_identical_declarations() {
    assert_eq!(
        fingerprint(&instance_class("1.8")),
        fingerprint(&instance_class("1.8"))
    );
}

#[test]
fn fingerprint_moves_with_any_structural_change() {
    let base = fingerprint(&instance_class("1.8"));

    let extra_field = ClassDef::builder("Instance", v("1.8"))
        .field(FieldSpec::new("host", FieldType::Str))
        .field(FieldSpec::new("vcpus", FieldType::Integer))
        .field(FieldSpec::new("numa_node", FieldType::Integer))
        .field(FieldSpec::new(
            "boot_volume",
            FieldType::Object("Volume".to_string()),
        ))
        .field(FieldSpec::new(
            "volumes",
            FieldType::ListOfObjects("Volume".to_string()),
        ))
        .relationship(
            "boot_volume",
            vec![(v("1.5"), v("1.1")), (v("1.7"), v("1.2"))],
        )
        .relationship("volumes", vec![(v("1.5"), v("1.1")), (v("1.7"), v("1.2"))])
        .build();
    assert_ne!(base, fingerprint(&extra_field));
}

#[test]
fn version_bump_is_visible_in_the_prefix() {
    let print = fingerprint(&instance_class("1.8"));
    assert!(print.starts_with("1.8-"));
    let bumped = fingerprint(&instance_class("1.9"));
    assert!(bumped.starts_with("1.9-"));
}

#[test]
fn registry_wide_fingerprints_follow_registration_order() {
    let registry = verso::Registry::new();
    registry.register(volume_class("1.1"));
    registry.register(volume_class("1.2"));
    registry.register(instance_class("1.8"));
    let prints = fingerprints(&registry);
    assert_eq!(
        prints.keys().collect::<Vec<_>>(),
        vec!["Instance", "Volume"]
    );
    assert_eq!(prints["Volume"].len(), 2);
    assert!(prints["Volume"][0].starts_with("1.1-"));
    assert!(prints["Volume"][1].starts_with("1.2-"));
}

#[test]
fn relationship_ladders_must_be_non_decreasing() {
    assert!(relationships_ordered(&instance_class("1.8")));

    let owner_regression = ClassDef::builder("Instance", v("1.8"))
        .relationship(
            "boot_volume",
            vec![(v("1.7"), v("1.2")), (v("1.5"), v("1.1"))],
        )
        .build();
    assert!(!relationships_ordered(&owner_regression));

    let child_regression = ClassDef::builder("Instance", v("1.8"))
        .relationship(
            "boot_volume",
            vec![(v("1.5"), v("1.2")), (v("1.7"), v("1.1"))],
        )
        .build();
    assert!(!relationships_ordered(&child_regression));
}
