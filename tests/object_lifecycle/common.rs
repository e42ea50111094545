//! Shared fixtures: a miniature compute control plane with instances
//! owning volumes, exercising every field flavor the engine supports.

#![allow(dead_code)]

use std::sync::Arc;
use verso::{
    ClassDef, Error, FieldSpec, FieldType, FieldValue, ObjectVersion, Registry, VersionedObject,
};

pub fn v(label: &str) -> ObjectVersion {
    ObjectVersion::parse(label).unwrap()
}

pub fn volume_class() -> Arc<ClassDef> {
    ClassDef::builder("Volume", v("1.2"))
        .field(FieldSpec::new("id", FieldType::Integer))
        .field(FieldSpec::new("size_gb", FieldType::Integer))
        .build()
}

pub fn instance_class() -> Arc<ClassDef> {
    ClassDef::builder("Instance", v("1.6"))
        .field(FieldSpec::new("uuid", FieldType::Str).read_only())
        .field(FieldSpec::new("host", FieldType::Str))
        .field(FieldSpec::new("vcpus", FieldType::Integer).with_default(1i64))
        .field(
            FieldSpec::new("tags", FieldType::Set(Box::new(FieldType::Str)))
                .with_default(FieldValue::Set(vec![])),
        )
        .field(FieldSpec::new("display_name", FieldType::Str).nullable())
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
            vec![(v("1.5"), v("1.1")), (v("1.6"), v("1.2"))],
        )
        .relationship("volumes", vec![(v("1.5"), v("1.1")), (v("1.6"), v("1.2"))])
        .lazy_load(|obj, field| match field {
            "host" => obj.set("host", "compute-7"),
            other => Err(Error::CannotLoad {
                field: other.to_string(),
            }),
        })
        .remote_method("save", "(self)", |obj, _ctx, _args, _kwargs| {
            obj.reset_changes(None, false);
            Ok(FieldValue::Null)
        })
        .remote_method("resize", "(self, vcpus)", |obj, _ctx, args, _kwargs| {
            let vcpus = args.first().and_then(FieldValue::as_int).unwrap_or(1);
            obj.set("vcpus", vcpus)?;
            Ok(FieldValue::Int(vcpus))
        })
        .remote_class_method(
            "schema_version",
            "(cls, context)",
            |class, _ctx, _args, _kwargs| Ok(FieldValue::String(class.version().to_string())),
        )
        .build()
}

pub fn registry() -> Arc<Registry> {
    let registry = Arc::new(Registry::new());
    registry.register(volume_class());
    registry.register(instance_class());
    registry
}

/// A clean volume with no pending changes
pub fn volume(registry: &Registry, id: i64) -> VersionedObject {
    let mut vol = VersionedObject::new(registry.latest("Volume").unwrap());
    vol.set("id", id).unwrap();
    vol.set("size_gb", 10i64).unwrap();
    vol.reset_changes(None, false);
    vol
}
