//! Verso - versioned objects for rolling-upgrade control planes
//!
//! Verso lets services in a distributed control plane exchange typed,
//! versioned objects while running different code versions. Objects
//! travel as self-describing JSON primitives; hydration negotiates
//! versions against the local registry, and a compatibility engine
//! downgrades data for older peers.
//!
//! # Quick Start
//!
//! ```ignore
//! use verso::{ClassDef, FieldSpec, FieldType, ObjectVersion, Registry, VersionedObject};
//!
//! let registry = Registry::global();
//! registry.register(
//!     ClassDef::builder("Instance", ObjectVersion::new(1, 0))
//!         .field(FieldSpec::new("host", FieldType::Str))
//!         .build(),
//! );
//!
//! let mut instance = VersionedObject::new(registry.latest("Instance")?);
//! instance.set("host", "node-7")?;
//! let wire = serde_json::to_string(&instance.to_primitive())?;
//! ```
//!
//! # Architecture
//!
//! The engine lives in `verso-objects` with the foundational types in
//! `verso-core`; this crate re-exports the public API of both.

pub use verso_objects::*;
