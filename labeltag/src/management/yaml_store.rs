// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::error::Error;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug)]
pub(crate) struct YamlStoreError {
    message: String,
}

impl YamlStoreError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for YamlStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for YamlStoreError {}

/// Reads a YAML document; a missing or blank file yields `None`.
pub(crate) fn read_yaml_file<T: DeserializeOwned>(
    path: &Path,
    label: &str,
) -> Result<Option<T>, YamlStoreError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)
        .map_err(|err| YamlStoreError::new(format!("Failed to read {} file: {}", label, err)))?;
    if content.trim().is_empty() {
        return Ok(None);
    }
    serde_yaml::from_str(&content)
        .map(Some)
        .map_err(|err| YamlStoreError::new(format!("Failed to parse {} file: {}", label, err)))
}

/// Replaces `path` with the serialized value. Readers see either the old or
/// the new document, never a partial one.
pub(crate) fn write_yaml_file<T: Serialize>(
    path: &Path,
    label: &str,
    value: &T,
) -> Result<(), YamlStoreError> {
    let content = serde_yaml::to_string(value)
        .map_err(|err| YamlStoreError::new(format!("Failed to serialize {}: {}", label, err)))?;
    let parent = path
        .parent()
        .ok_or_else(|| YamlStoreError::new(format!("{} file path has no parent", label)))?;
    let temp_path = temp_path_for(path, parent, label)?;

    let result = write_and_sync(&temp_path, content.as_bytes())
        .and_then(|_| fs::rename(&temp_path, path));
    if let Err(err) = result {
        let _ = fs::remove_file(&temp_path);
        return Err(YamlStoreError::new(format!(
            "Failed to replace {} file: {}",
            label, err
        )));
    }

    #[cfg(unix)]
    {
        if let Err(err) = fs::File::open(parent).and_then(|dir| dir.sync_all()) {
            log::warn!("{} directory sync failed: {}", label, err);
        }
    }

    Ok(())
}

fn temp_path_for(path: &Path, parent: &Path, label: &str) -> Result<PathBuf, YamlStoreError> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| YamlStoreError::new(format!("{} file name is not valid UTF-8", label)))?;
    Ok(parent.join(format!(".{}.tmp.{}", file_name, Uuid::new_v4().simple())))
}

fn write_and_sync(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::test_fixtures::TestFixtureRoot;
    use std::collections::BTreeMap;

    #[test]
    fn missing_and_blank_files_read_as_none() {
        let fixture = TestFixtureRoot::new_unique("yaml-store-empty").unwrap();
        let path = fixture.path().join("state.yaml");
        let missing: Option<BTreeMap<String, String>> = read_yaml_file(&path, "state").unwrap();
        assert!(missing.is_none());

        fs::write(&path, "  \n").unwrap();
        let blank: Option<BTreeMap<String, String>> = read_yaml_file(&path, "state").unwrap();
        assert!(blank.is_none());
    }

    #[test]
    fn write_replaces_file_without_leaving_temp_files() {
        let fixture = TestFixtureRoot::new_unique("yaml-store-write").unwrap();
        let path = fixture.path().join("state.yaml");
        let mut value = BTreeMap::new();
        value.insert("first".to_string(), "one".to_string());
        write_yaml_file(&path, "state", &value).unwrap();
        value.insert("second".to_string(), "two".to_string());
        write_yaml_file(&path, "state", &value).unwrap();

        let loaded: BTreeMap<String, String> = read_yaml_file(&path, "state").unwrap().unwrap();
        assert_eq!(loaded.len(), 2);
        let leftovers = fs::read_dir(fixture.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().contains(".tmp."))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn parse_errors_name_the_label() {
        let fixture = TestFixtureRoot::new_unique("yaml-store-parse").unwrap();
        let path = fixture.path().join("state.yaml");
        fs::write(&path, "- [unclosed").unwrap();
        let err = read_yaml_file::<Vec<String>>(&path, "mapping").unwrap_err();
        assert!(err.to_string().contains("mapping"));
    }
}
