// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::config::CONFIG_FILE_NAME;
use crate::runtime_paths::RuntimePaths;

/// Throwaway runtime root under `target/test-fixtures`, removed on drop.
#[derive(Debug)]
pub struct TestFixtureRoot {
    path: PathBuf,
}

impl TestFixtureRoot {
    pub fn new_fixed(name: &str) -> std::io::Result<Self> {
        let root = fixtures_root().join(name);
        if root.exists() {
            fs::remove_dir_all(&root)?;
        }
        fs::create_dir_all(&root)?;
        Ok(Self { path: root })
    }

    pub fn new_unique(prefix: &str) -> std::io::Result<Self> {
        let name = format!("{}-{}", prefix, Uuid::new_v4());
        Self::new_fixed(&name)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state_dir(&self) -> PathBuf {
        self.path.join("state")
    }

    pub fn store_file(&self) -> PathBuf {
        self.state_dir()
            .join("sys")
            .join(crate::management::STORE_FILE_NAME)
    }

    pub fn write_config(&self, port: u16) -> std::io::Result<()> {
        fs::write(
            self.path.join(CONFIG_FILE_NAME),
            format!(
                "server:\n  host: \"127.0.0.1\"\n  port: {}\n  workers: 1\nlogging:\n  level: \"warn\"\n",
                port
            ),
        )
    }

    pub fn runtime_paths(&self) -> std::io::Result<RuntimePaths> {
        RuntimePaths::from_root(&self.path).map_err(|err| std::io::Error::other(err.to_string()))
    }
}

impl Drop for TestFixtureRoot {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

fn fixtures_root() -> PathBuf {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let repo_root = manifest_dir.parent().unwrap_or(&manifest_dir);
    repo_root.join("target").join("test-fixtures")
}
