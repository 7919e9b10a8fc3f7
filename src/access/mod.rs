// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Access Control
//!
//! Effective access is computed from three sources, in order:
//!
//! 1. Administrative bypass (`ADMIN` and above)
//! 2. Ownership of the specific resource
//! 3. Grants held by any group the principal belongs to
//!
//! Anything not matched is denied. Inactive principals are denied everything.

pub mod model;
pub mod resolver;

pub use model::{
    grant_key, Action, ActionSet, GrantScope, Group, GroupId, Principal, PrincipalId,
    ResourceGrant, ResourceId, ResourceType,
};
pub use resolver::{PermissionResolver, ResourceAccess};
