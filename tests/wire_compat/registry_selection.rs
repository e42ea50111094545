//! Registry version selection across a ladder of registered classes.

use crate::common::{instance_class, v};
use verso::{Error, Registry};

fn ladder() -> Registry {
    let registry = Registry::new();
    registry.register(instance_class("1.0"));
    registry.register(instance_class("1.2"));
    registry.register(instance_class("1.6"));
    registry
}

#[test]
fn exact_version_served_directly() {
    let registry = ladder();
    for version in ["1.0", "1.2", "1.6"] {
        let class = registry.lookup("Instance", &v(version)).unwrap();
        assert_eq!(class.version(), &v(version), "requested {version}");
    }
}

#[test]
fn newer_minor_serves_older_requests() {
    let registry = ladder();
    // 1.1 and 1.5 have no exact class; 1.6 understands both shapes.
    for version in ["1.1", "1.5"] {
        let class = registry.lookup("Instance", &v(version)).unwrap();
        assert_eq!(class.version(), &v("1.6"), "requested {version}");
    }
}

#[test]
fn request_beyond_latest_reports_supported() {
    let registry = ladder();
    let err = registry.lookup("Instance", &v("1.25")).unwrap_err();
    match err {
        Error::IncompatibleVersion {
            name,
            requested,
            supported,
        } => {
            assert_eq!(name, "Instance");
            assert_eq!(requested, v("1.25"));
            assert_eq!(supported, v("1.6"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn revision_never_participates() {
    let registry = ladder();
    let class = registry.lookup("Instance", &v("1.6.3")).unwrap();
    assert_eq!(class.version(), &v("1.6"));
    let class = registry.lookup("Instance", &v("1.1.7")).unwrap();
    assert_eq!(class.version(), &v("1.6"));
}

#[test]
fn majors_are_separate_lineages() {
    let registry = ladder();
    registry.register(instance_class("2.3"));
    // 2.x never serves a 1.x request
    let class = registry.lookup("Instance", &v("1.4")).unwrap();
    assert_eq!(class.version(), &v("1.6"));
    let err = registry.lookup("Instance", &v("1.9")).unwrap_err();
    assert!(matches!(
        err,
        Error::IncompatibleVersion { supported, .. } if supported == v("1.6")
    ));
    // And a request for an absent major reports the overall greatest
    let err = registry.lookup("Instance", &v("3.0")).unwrap_err();
    assert!(matches!(
        err,
        Error::IncompatibleVersion { supported, .. } if supported == v("2.3")
    ));
}

#[test]
fn unknown_object_name() {
    let registry = ladder();
    assert!(matches!(
        registry.lookup("Flavor", &v("1.0")).unwrap_err(),
        Error::UnsupportedObject { .. }
    ));
}
