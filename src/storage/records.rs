// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Secret records: entities holding independently encrypted fields.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::OwnedResource;
use crate::access::{PrincipalId, ResourceId, ResourceType};
use crate::crypto::Envelope;

/// A protected field of a secret record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum SecretField {
    // Credential fields
    Password,
    Token,
    ClientSecret,

    // Server fields
    SshUsername,
    SshPassword,
    SshPrivateKey,
}

const CREDENTIAL_FIELDS: &[SecretField] = &[
    SecretField::Password,
    SecretField::Token,
    SecretField::ClientSecret,
];

const SERVER_FIELDS: &[SecretField] = &[
    SecretField::SshUsername,
    SecretField::SshPassword,
    SecretField::SshPrivateKey,
];

impl SecretField {
    pub fn as_str(self) -> &'static str {
        match self {
            SecretField::Password => "password",
            SecretField::Token => "token",
            SecretField::ClientSecret => "client_secret",
            SecretField::SshUsername => "ssh_username",
            SecretField::SshPassword => "ssh_password",
            SecretField::SshPrivateKey => "ssh_private_key",
        }
    }

    /// Fields a resource type may carry (empty for types without secrets).
    pub fn allowed_for(resource_type: ResourceType) -> &'static [SecretField] {
        match resource_type {
            ResourceType::Credential => CREDENTIAL_FIELDS,
            ResourceType::Server => SERVER_FIELDS,
            _ => &[],
        }
    }

    /// Parse a field name and check it belongs to `resource_type`.
    pub fn parse_for(resource_type: ResourceType, name: &str) -> Option<SecretField> {
        name.parse::<SecretField>()
            .ok()
            .filter(|field| Self::allowed_for(resource_type).contains(field))
    }
}

impl FromStr for SecretField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "password" => Ok(SecretField::Password),
            "token" => Ok(SecretField::Token),
            "client_secret" | "clientSecret" => Ok(SecretField::ClientSecret),
            "ssh_username" | "sshUsername" => Ok(SecretField::SshUsername),
            "ssh_password" | "sshPassword" => Ok(SecretField::SshPassword),
            "ssh_private_key" | "sshPrivateKey" => Ok(SecretField::SshPrivateKey),
            other => Err(format!("unknown secret field: {other}")),
        }
    }
}

impl std::fmt::Display for SecretField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored credential or server entry.
///
/// Each field is its own [`Envelope`]; replacing a field swaps in a new
/// envelope rather than touching the old ciphertext.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretRecord {
    pub id: ResourceId,
    pub resource_type: ResourceType,
    pub name: String,
    pub owner_id: PrincipalId,
    /// Soft-delete flag; audit history keeps pointing at inactive records
    pub active: bool,
    pub fields: BTreeMap<SecretField, Envelope>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SecretRecord {
    pub fn new(
        resource_type: ResourceType,
        name: impl Into<String>,
        owner_id: PrincipalId,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ResourceId::generate(),
            resource_type,
            name: name.into(),
            owner_id,
            active: true,
            fields: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn envelope(&self, field: SecretField) -> Option<&Envelope> {
        self.fields.get(&field)
    }

    /// Replace a field's envelope.
    pub fn set_field(&mut self, field: SecretField, envelope: Envelope) {
        self.fields.insert(field, envelope);
        self.updated_at = Utc::now();
    }

    pub fn deactivate(&mut self) {
        self.active = false;
        self.updated_at = Utc::now();
    }

    /// Storage key (`type|id`).
    pub fn key(&self) -> String {
        record_key(self.resource_type, self.id)
    }
}

impl OwnedResource for SecretRecord {
    fn owner_id(&self) -> PrincipalId {
        self.owner_id
    }

    fn transfer_to(&mut self, successor: PrincipalId) {
        self.owner_id = successor;
        self.updated_at = Utc::now();
    }
}

pub fn record_key(resource_type: ResourceType, id: ResourceId) -> String {
    format!("{resource_type}|{id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_are_scoped_to_resource_type() {
        assert_eq!(
            SecretField::parse_for(ResourceType::Credential, "client_secret"),
            Some(SecretField::ClientSecret)
        );
        assert_eq!(
            SecretField::parse_for(ResourceType::Server, "sshPrivateKey"),
            Some(SecretField::SshPrivateKey)
        );
        assert_eq!(SecretField::parse_for(ResourceType::Credential, "ssh_password"), None);
        assert_eq!(SecretField::parse_for(ResourceType::Platform, "password"), None);
        assert_eq!(SecretField::parse_for(ResourceType::Credential, "pin"), None);
    }

    #[test]
    fn record_serializes_fields_by_name() {
        let mut record = SecretRecord::new(ResourceType::Credential, "db", PrincipalId::generate());
        record.set_field(
            SecretField::Password,
            Envelope {
                version: 1,
                iv: vec![0; 12],
                ciphertext: vec![1, 2, 3],
                tag: vec![0; 16],
            },
        );

        let json = serde_json::to_value(&record).unwrap();
        assert!(json["fields"]["password"].is_object());

        let parsed: SecretRecord = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.envelope(SecretField::Password), record.envelope(SecretField::Password));
    }

    #[test]
    fn transfer_changes_owner() {
        let mut record = SecretRecord::new(ResourceType::Server, "web-1", PrincipalId::generate());
        let successor = PrincipalId::generate();
        record.transfer_to(successor);
        assert_eq!(record.owner_id(), successor);
    }
}
