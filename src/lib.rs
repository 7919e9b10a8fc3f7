// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credential Vault - Secret Protection & Access Control Service
//!
//! Stores machine access secrets, API tokens and client-secret pairs in
//! AES-256-GCM envelopes, decides who may view or change each one, and
//! records every sensitive action in an append-only audit trail.
//!
//! ## Modules
//!
//! - `access` - Principals, groups, grants and permission resolution
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Session tokens and request extractors
//! - `crypto` - Envelope encryption and password hashing
//! - `ratelimit` - Fixed-window limiter and its sweeper
//! - `services` - Reveal, secret lifecycle, accounts and grants
//! - `storage` - Store traits, in-memory and redb backends, audit trail

pub mod access;
pub mod api;
pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod models;
pub mod ratelimit;
pub mod services;
pub mod state;
pub mod storage;
