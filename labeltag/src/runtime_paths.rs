// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::config::{CONFIG_FILE_NAME, ConfigError};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct RuntimePaths {
    pub root: PathBuf,
    pub config_file: PathBuf,
    pub state_dir: PathBuf,
    pub state_sys_dir: PathBuf,
    pub logs_dir: PathBuf,
}

impl RuntimePaths {
    /// Resolves the runtime layout under `root`, creating directories as needed
    /// and checking that each one accepts writes.
    pub fn from_root(root: &Path) -> Result<Self, ConfigError> {
        let root_path = if root.as_os_str().is_empty() {
            PathBuf::from(".")
        } else {
            root.to_path_buf()
        };
        ensure_dir_exists(&root_path)?;
        let root_canonical = canonicalize(&root_path, "runtime root")?;

        let state_dir = root_canonical.join("state");
        let state_sys_dir = state_dir.join("sys");
        let logs_dir = root_canonical.join("logs");
        ensure_dir_exists(&state_dir)?;
        ensure_dir_exists(&state_sys_dir)?;
        ensure_dir_exists(&logs_dir)?;

        Ok(Self {
            config_file: root_canonical.join(CONFIG_FILE_NAME),
            state_dir: canonicalize(&state_dir, "state directory")?,
            state_sys_dir: canonicalize(&state_sys_dir, "state/sys directory")?,
            logs_dir: canonicalize(&logs_dir, "logs directory")?,
            root: root_canonical,
        })
    }
}

fn canonicalize(path: &Path, label: &str) -> Result<PathBuf, ConfigError> {
    path.canonicalize().map_err(|e| {
        ConfigError::ValidationError(format!(
            "Failed to canonicalize {} '{}': {}",
            label,
            path.display(),
            e
        ))
    })
}

fn ensure_dir_exists(path: &Path) -> Result<(), ConfigError> {
    if !path.exists() {
        fs::create_dir_all(path).map_err(|e| {
            ConfigError::ValidationError(format!(
                "Failed to create directory '{}': {}",
                path.display(),
                e
            ))
        })?;
    }
    ensure_dir_writable(path)
}

fn ensure_dir_writable(path: &Path) -> Result<(), ConfigError> {
    if !path.is_dir() {
        return Err(ConfigError::ValidationError(format!(
            "Directory must be writable (not a directory): {}",
            path.display()
        )));
    }

    let check_path = path.join(format!(".labeltag-write-check-{}", Uuid::new_v4()));
    fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&check_path)
        .map_err(|err| {
            ConfigError::ValidationError(format!(
                "Directory must be writable ({}): {}",
                path.display(),
                err
            ))
        })?;
    fs::remove_file(&check_path).map_err(|err| {
        ConfigError::ValidationError(format!(
            "Directory must be writable (unable to clean write-check file {}): {}",
            check_path.display(),
            err
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::test_fixtures::TestFixtureRoot;

    #[test]
    fn creates_state_and_log_directories() {
        let fixture = TestFixtureRoot::new_unique("runtime-paths").unwrap();
        let paths = RuntimePaths::from_root(fixture.path()).expect("paths");
        assert!(paths.state_sys_dir.is_dir());
        assert!(paths.logs_dir.is_dir());
        assert!(paths.state_sys_dir.starts_with(&paths.root));
        assert_eq!(paths.config_file.file_name().unwrap(), CONFIG_FILE_NAME);
    }

    #[test]
    fn rejects_file_in_place_of_state_directory() {
        let fixture = TestFixtureRoot::new_unique("runtime-paths-file").unwrap();
        fs::write(fixture.path().join("state"), "not a dir").unwrap();
        let err = RuntimePaths::from_root(fixture.path()).unwrap_err();
        assert!(err.to_string().contains("not a directory"));
    }
}
