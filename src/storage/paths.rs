// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Path utilities for the on-disk storage layout.

use std::path::{Path, PathBuf};

/// Database file name under the data directory.
pub const DATABASE_FILE: &str = "vault.redb";

/// Storage path utilities rooted at `DATA_DIR`.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl StoragePaths {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Path to the vault database.
    pub fn database(&self) -> PathBuf {
        self.root.join(DATABASE_FILE)
    }
}
