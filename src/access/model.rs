// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Principals, groups and group-scoped resource grants.

use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::PrivilegeLevel;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
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
            ToSchema,
        )]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

uuid_id!(
    /// Identifier of an account.
    PrincipalId
);
uuid_id!(
    /// Identifier of a group.
    GroupId
);
uuid_id!(
    /// Identifier of a protected resource.
    ResourceId
);

/// An action that can be granted on a resource.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Create, Action::Read, Action::Update, Action::Delete];
}

/// A set of granted actions.
pub type ActionSet = BTreeSet<Action>;

/// Kinds of resources that permissions and audit entries refer to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    /// Stored credential (password, API token, client secret)
    Credential,
    /// Managed machine (SSH access material)
    Server,
    Platform,
    Stack,
    Group,
    User,
}

impl ResourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceType::Credential => "credential",
            ResourceType::Server => "server",
            ResourceType::Platform => "platform",
            ResourceType::Stack => "stack",
            ResourceType::Group => "group",
            ResourceType::User => "user",
        }
    }

    /// Whether records of this type carry encrypted fields.
    pub fn holds_secrets(self) -> bool {
        matches!(self, ResourceType::Credential | ResourceType::Server)
    }
}

impl FromStr for ResourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "credential" | "credentials" => Ok(ResourceType::Credential),
            "server" | "servers" => Ok(ResourceType::Server),
            "platform" | "platforms" => Ok(ResourceType::Platform),
            "stack" | "stacks" => Ok(ResourceType::Stack),
            "group" | "groups" => Ok(ResourceType::Group),
            "user" | "users" => Ok(ResourceType::User),
            other => Err(format!("unknown resource type: {other}")),
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a grant covers: one resource, or every resource of the type.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum GrantScope {
    AllOfType,
    Resource(ResourceId),
}

impl GrantScope {
    pub fn covers(&self, resource_id: Option<ResourceId>) -> bool {
        match self {
            GrantScope::AllOfType => true,
            GrantScope::Resource(id) => resource_id == Some(*id),
        }
    }

    /// Storage key component (`*` for all-of-type).
    pub fn key(&self) -> String {
        match self {
            GrantScope::AllOfType => "*".to_string(),
            GrantScope::Resource(id) => id.to_string(),
        }
    }
}

/// Actions a group holds on a resource (or a whole resource type).
///
/// At most one grant exists per `(group_id, resource_type, scope)`; writing
/// a grant for an existing key replaces its action set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ResourceGrant {
    pub group_id: GroupId,
    pub resource_type: ResourceType,
    pub scope: GrantScope,
    #[schema(value_type = Vec<Action>)]
    pub actions: ActionSet,
}

impl ResourceGrant {
    pub fn new(
        group_id: GroupId,
        resource_type: ResourceType,
        scope: GrantScope,
        actions: impl IntoIterator<Item = Action>,
    ) -> Self {
        Self {
            group_id,
            resource_type,
            scope,
            actions: actions.into_iter().collect(),
        }
    }

    /// Composite key identifying the grant row.
    pub fn key(&self) -> String {
        grant_key(self.group_id, self.resource_type, &self.scope)
    }

    pub fn permits(&self, action: Action, resource_id: Option<ResourceId>) -> bool {
        self.actions.contains(&action) && self.scope.covers(resource_id)
    }
}

pub fn grant_key(group_id: GroupId, resource_type: ResourceType, scope: &GrantScope) -> String {
    format!("{group_id}|{resource_type}|{}", scope.key())
}

/// An account.
#[derive(Clone, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub username: String,
    pub level: PrivilegeLevel,
    pub active: bool,
    /// Argon2id PHC string
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl Principal {
    pub fn new(username: impl Into<String>, level: PrivilegeLevel, password_hash: String) -> Self {
        Self {
            id: PrincipalId::generate(),
            username: username.into(),
            level,
            active: true,
            password_hash,
            created_at: Utc::now(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.level.is_admin()
    }
}

impl std::fmt::Debug for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Principal")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("level", &self.level)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

/// A named set of principals; the unit of delegated access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: GroupId::generate(),
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}
