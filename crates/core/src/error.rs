//! Error types for the versioned-object engine
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait
//! implementations. None of these are retried internally; every one
//! propagates to the caller. Retry/backoff belongs to the transport.

use crate::version::ObjectVersion;
use thiserror::Error;

/// Result type alias for object operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for object tracking, hydration and dispatch
#[derive(Debug, Error)]
pub enum Error {
    /// Unknown object name, or namespace mismatch at hydration
    #[error("unsupported object type: {name}")]
    UnsupportedObject {
        /// Requested object name
        name: String,
    },

    /// No registered class satisfies the requested major/minor
    ///
    /// Carries the highest supported version so the caller can retry
    /// at a version this process understands.
    #[error("incompatible version for {name}: requested {requested}, supported {supported}")]
    IncompatibleVersion {
        /// Requested object name
        name: String,
        /// Version asked for
        requested: ObjectVersion,
        /// Greatest version this process can serve
        supported: ObjectVersion,
    },

    /// Context-dependent operation attempted on a contextless instance
    #[error("cannot call {method} on orphaned {object}")]
    Orphaned {
        /// Object name
        object: String,
        /// Method or operation attempted
        method: String,
    },

    /// Reassigning an already-set read-only field
    #[error("field {field} is read-only and already set")]
    ReadOnlyField {
        /// Field name
        field: String,
    },

    /// Invalid assignment: the value does not coerce to the field type
    #[error("invalid value for field {field}: {reason}")]
    Coercion {
        /// Field name
        field: String,
        /// Why coercion failed
        reason: String,
    },

    /// A nested-object field has no declared compatibility relationship
    ///
    /// Configuration defect, distinct from an ordinary version mismatch.
    #[error("no compatibility rule for field {field} of {object}")]
    MissingCompatibilityRule {
        /// Owning object name
        object: String,
        /// Ungoverned field
        field: String,
    },

    /// Field name not declared on the class
    #[error("object {object} has no field {field}")]
    UnknownField {
        /// Object name
        object: String,
        /// Undeclared field name
        field: String,
    },

    /// Clearing a field that is already unset
    #[error("field {field} is not set")]
    NotSet {
        /// Field name
        field: String,
    },

    /// Unset field accessed with no lazy-load hook bound
    #[error("cannot load field {field}: no lazy-load hook")]
    CannotLoad {
        /// Field name
        field: String,
    },

    /// `set_defaults` on a field that declares no default
    #[error("field {field} has no default")]
    NoDefault {
        /// Field name
        field: String,
    },

    /// Method name not declared remote-capable on the class
    #[error("object {object} has no remote method {method}")]
    UnknownMethod {
        /// Object name
        object: String,
        /// Method name
        method: String,
    },

    /// Wire value does not have the primitive shape
    #[error("malformed primitive: {0}")]
    InvalidPrimitive(String),

    /// Unparseable version label
    #[error("invalid version label: {label}")]
    VersionParse {
        /// The offending label
        label: String,
    },

    /// Failure inside an indirection channel or backport collaborator
    #[error("indirection channel error: {0}")]
    Channel(String),
}
