//! Core types for the verso versioned-object engine
//!
//! This crate defines the foundational types used throughout the system:
//! - ObjectVersion: `"major.minor[.revision]"` version labels
//! - RequestContext: immutable caller identity bound to instances
//! - Error: error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod context;
pub mod error;
pub mod version;

pub use context::RequestContext;
pub use error::{Error, Result};
pub use version::ObjectVersion;
