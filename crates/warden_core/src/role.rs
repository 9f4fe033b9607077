//! Privilege levels.

use serde::{Deserialize, Serialize};

/// Privilege level of a principal, ordered from least to most privileged.
///
/// # Examples
///
/// ```
/// use warden_core::Role;
///
/// assert!(Role::SuperAdmin.meets_or_exceeds(Role::Admin));
/// assert!(!Role::User.meets_or_exceeds(Role::Admin));
/// assert_eq!(Role::SuperAdmin.to_string(), "SUPER_ADMIN");
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum Role {
    /// Regular customer account
    User,
    /// Administrator
    Admin,
    /// Administrator with access to every resource
    SuperAdmin,
}

impl Role {
    /// Whether this role is at least as privileged as `required`.
    pub fn meets_or_exceeds(self, required: Role) -> bool {
        self >= required
    }

    /// Whether this role may act on resources it does not own.
    pub fn bypasses_ownership(self) -> bool {
        self == Role::SuperAdmin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_ordering() {
        assert!(Role::User < Role::Admin);
        assert!(Role::Admin < Role::SuperAdmin);
    }

    #[test]
    fn test_meets_or_exceeds_admin() {
        let admitted: Vec<Role> = Role::iter()
            .filter(|role| role.meets_or_exceeds(Role::Admin))
            .collect();
        assert_eq!(admitted, vec![Role::Admin, Role::SuperAdmin]);
    }

    #[test]
    fn test_parse() {
        assert_eq!(Role::from_str("SUPER_ADMIN").unwrap(), Role::SuperAdmin);
        assert_eq!(Role::from_str("admin").unwrap(), Role::Admin);
        assert!(Role::from_str("root").is_err());
    }

    #[test]
    fn test_serde_form() {
        let json = serde_json::to_string(&Role::SuperAdmin).unwrap();
        assert_eq!(json, "\"SUPER_ADMIN\"");
    }
}
