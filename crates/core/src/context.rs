//! Request contexts
//!
//! A context is an immutable value identifying who is acting. It is bound
//! to an object instance at construction or hydration time and passed
//! explicitly through every remote-capable call. Scoped context swaps
//! (admin elevation, alternate context) live in the dispatcher; this type
//! only carries the identity.

use serde::{Deserialize, Serialize};

/// Caller identity bound to an object instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Acting user
    pub user_id: String,
    /// Owning project
    pub project_id: String,
    /// Whether the caller holds administrator privileges
    pub is_admin: bool,
}

impl RequestContext {
    /// Create a non-admin context
    pub fn new(user_id: impl Into<String>, project_id: impl Into<String>) -> Self {
        RequestContext {
            user_id: user_id.into(),
            project_id: project_id.into(),
            is_admin: false,
        }
    }

    /// Create an administrator context
    pub fn admin(user_id: impl Into<String>, project_id: impl Into<String>) -> Self {
        RequestContext {
            is_admin: true,
            ..RequestContext::new(user_id, project_id)
        }
    }

    /// An administrator-equivalent copy of this context
    pub fn elevated(&self) -> Self {
        RequestContext {
            is_admin: true,
            ..self.clone()
        }
    }
}
