//! Versioned-object engine
//!
//! Everything a control-plane service needs to pass typed, versioned
//! objects between processes running different code versions:
//!
//! - [`ClassDef`] / [`VersionedObject`]: class definitions and live,
//!   change-tracked instances
//! - [`Registry`]: name-to-class resolution with version negotiation
//! - [`Primitive`]: the self-describing wire envelope
//! - [`CompatEngine`]: downgrading primitives for older peers
//! - [`ObjectSerializer`]: entity traversal and hydration negotiation
//! - [`Dispatcher`]: local or indirected remote-capable method calls
//! - [`fingerprint`]: hash pinning for forgotten-version-bump detection

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod compat;
pub mod field;
pub mod fingerprint;
pub mod indirection;
pub mod object;
pub mod primitive;
pub mod registry;
pub mod serializer;
pub mod value;

pub use compat::{backport, CompatEngine};
pub use field::{FieldSpec, FieldType};
pub use fingerprint::{fingerprint, fingerprints, relationships_ordered};
pub use indirection::{
    default_channel, obj_alternate_context, obj_as_admin, set_default_channel, ContextGuard,
    Dispatcher, IndirectionChannel, MethodUpdates,
};
pub use object::{ClassDef, ClassDefBuilder, VersionedObject};
pub use primitive::{Primitive, WIRE_NAMESPACE};
pub use registry::Registry;
pub use serializer::{BackportChannel, ObjectSerializer};
pub use value::FieldValue;

pub use verso_core::{Error, ObjectVersion, RequestContext, Result};
