// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::{BootstrapError, log_action};
use crate::config::CONFIG_FILE_NAME;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 7090;
const DEFAULT_WORKERS: u16 = 2;

pub fn ensure_config(root: &Path) -> Result<bool, BootstrapError> {
    let root_path = normalize_root(root)?;
    let config_path = root_path.join(CONFIG_FILE_NAME);

    if config_path.exists() {
        return Ok(false);
    }

    let mut file = match OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&config_path)
    {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
        Err(err) => return Err(BootstrapError::Io(err)),
    };

    file.write_all(default_config_yaml().as_bytes())?;
    file.sync_all()?;

    log_action(format!(
        "created {} (http {}:{})",
        CONFIG_FILE_NAME, DEFAULT_HOST, DEFAULT_PORT
    ));

    Ok(true)
}

fn normalize_root(root: &Path) -> Result<PathBuf, BootstrapError> {
    let root_path = if root.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        root.to_path_buf()
    };

    if root_path.exists() {
        if !root_path.is_dir() {
            return Err(BootstrapError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Runtime root is not a directory: {}", root_path.display()),
            )));
        }
        return Ok(root_path);
    }

    fs::create_dir_all(&root_path)?;
    log_action(format!(
        "created runtime root directory {}",
        root_path.display()
    ));
    Ok(root_path)
}

fn default_config_yaml() -> String {
    format!(
        "server:\n  host: \"{host}\"\n  port: {port}\n  workers: {workers}\n\nlogging:\n  level: \"info\"\n",
        host = DEFAULT_HOST,
        port = DEFAULT_PORT,
        workers = DEFAULT_WORKERS,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::util::test_fixtures::TestFixtureRoot;

    #[test]
    fn default_config_parses_and_validates() {
        let config: Config = serde_yaml::from_str(&default_config_yaml()).expect("yaml");
        let validated = config.validate().expect("valid");
        assert_eq!(validated.bind_address(), ("127.0.0.1", 7090));
    }

    #[test]
    fn rejects_file_as_runtime_root() {
        let fixture = TestFixtureRoot::new_unique("bootstrap-root-file").unwrap();
        let file_root = fixture.path().join("root");
        fs::write(&file_root, "x").unwrap();
        assert!(ensure_config(&file_root).is_err());
    }
}
