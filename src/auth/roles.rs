// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Principal privilege levels.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Ordered privilege level of a principal.
///
/// ## Hierarchy
///
/// `SuperAdmin` > `Admin` > `User`. Every authorization shortcut in the
/// crate goes through [`PrivilegeLevel::is_at_least`]; nothing compares
/// levels for equality to decide on administrative bypass.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrivilegeLevel {
    /// Regular account; access comes from ownership and group grants
    User,
    /// Administrative bypass on every resource
    Admin,
    /// Administrative bypass, and may manage admins
    SuperAdmin,
}

impl PrivilegeLevel {
    /// Check if this level has at least the privileges of `required`.
    pub fn is_at_least(self, required: PrivilegeLevel) -> bool {
        self >= required
    }

    /// Strictly more privileged than `other`.
    pub fn is_above(self, other: PrivilegeLevel) -> bool {
        self.is_at_least(other) && self != other
    }

    /// Whether this level bypasses ownership and grant checks.
    pub fn is_admin(self) -> bool {
        self.is_at_least(PrivilegeLevel::Admin)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PrivilegeLevel::User => "USER",
            PrivilegeLevel::Admin => "ADMIN",
            PrivilegeLevel::SuperAdmin => "SUPER_ADMIN",
        }
    }
}

impl Default for PrivilegeLevel {
    /// Least privilege for newly enrolled accounts.
    fn default() -> Self {
        PrivilegeLevel::User
    }
}

impl FromStr for PrivilegeLevel {
    type Err = String;

    /// Parse a level (case-insensitive, `-` and `_` interchangeable).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "USER" => Ok(PrivilegeLevel::User),
            "ADMIN" => Ok(PrivilegeLevel::Admin),
            "SUPER_ADMIN" | "SUPERADMIN" => Ok(PrivilegeLevel::SuperAdmin),
            other => Err(format!("unknown privilege level: {other}")),
        }
    }
}

impl std::fmt::Display for PrivilegeLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_ordered() {
        assert!(PrivilegeLevel::SuperAdmin > PrivilegeLevel::Admin);
        assert!(PrivilegeLevel::Admin > PrivilegeLevel::User);
    }

    #[test]
    fn super_admin_has_all_privileges() {
        assert!(PrivilegeLevel::SuperAdmin.is_at_least(PrivilegeLevel::SuperAdmin));
        assert!(PrivilegeLevel::SuperAdmin.is_at_least(PrivilegeLevel::Admin));
        assert!(PrivilegeLevel::SuperAdmin.is_at_least(PrivilegeLevel::User));
    }

    #[test]
    fn user_only_has_user_privilege() {
        assert!(PrivilegeLevel::User.is_at_least(PrivilegeLevel::User));
        assert!(!PrivilegeLevel::User.is_at_least(PrivilegeLevel::Admin));
        assert!(!PrivilegeLevel::User.is_admin());
    }

    #[test]
    fn is_above_is_strict() {
        assert!(PrivilegeLevel::SuperAdmin.is_above(PrivilegeLevel::Admin));
        assert!(PrivilegeLevel::Admin.is_above(PrivilegeLevel::User));
        assert!(!PrivilegeLevel::Admin.is_above(PrivilegeLevel::Admin));
        assert!(!PrivilegeLevel::User.is_above(PrivilegeLevel::SuperAdmin));
    }

    #[test]
    fn both_admin_levels_bypass() {
        assert!(PrivilegeLevel::Admin.is_admin());
        assert!(PrivilegeLevel::SuperAdmin.is_admin());
    }

    #[test]
    fn from_str_parses_correctly() {
        assert_eq!("admin".parse::<PrivilegeLevel>(), Ok(PrivilegeLevel::Admin));
        assert_eq!("SUPER_ADMIN".parse::<PrivilegeLevel>(), Ok(PrivilegeLevel::SuperAdmin));
        assert_eq!("super-admin".parse::<PrivilegeLevel>(), Ok(PrivilegeLevel::SuperAdmin));
        assert_eq!("User".parse::<PrivilegeLevel>(), Ok(PrivilegeLevel::User));
        assert!("root".parse::<PrivilegeLevel>().is_err());
    }

    #[test]
    fn serializes_as_screaming_snake_case() {
        let json = serde_json::to_string(&PrivilegeLevel::SuperAdmin).unwrap();
        assert_eq!(json, "\"SUPER_ADMIN\"");
    }

    #[test]
    fn default_level_is_user() {
        assert_eq!(PrivilegeLevel::default(), PrivilegeLevel::User);
    }
}
