//! Identities attempting privileged actions.

use crate::Role;
use serde::{Deserialize, Serialize};

/// An identity as reported by the identity oracle.
///
/// Read-only to the security layer: it is resolved fresh for every request
/// and never cached.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, derive_getters::Getters)]
pub struct Principal {
    /// Unique principal ID
    id: String,
    /// Privilege level
    role: Role,
    /// Whether the account is enabled
    #[getter(rename = "is_active")]
    active: bool,
}

impl Principal {
    /// Create a principal.
    pub fn new(id: impl Into<String>, role: Role, active: bool) -> Self {
        Self {
            id: id.into(),
            role,
            active,
        }
    }

    /// Create an active principal.
    pub fn active(id: impl Into<String>, role: Role) -> Self {
        Self::new(id, role, true)
    }
}
