// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::IpAddr;
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = "config.yaml";
const MAX_WORKERS: usize = 64;

#[derive(Debug)]
pub enum ConfigError {
    LoadError(String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::LoadError(msg) => write!(f, "Configuration load error: {}", msg),
            ConfigError::ValidationError(msg) => {
                write!(f, "Configuration validation error: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_workers() -> usize {
    2
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub log_level: LevelFilter,
}

impl ValidatedConfig {
    pub fn bind_address(&self) -> (&str, u16) {
        (self.server.host.as_str(), self.server.port)
    }
}

impl Config {
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let config_path = root.join(CONFIG_FILE_NAME);
        let config_content = fs::read_to_string(&config_path).map_err(|e| {
            ConfigError::LoadError(format!(
                "Failed to read config file '{}': {}",
                config_path.display(),
                e
            ))
        })?;
        serde_yaml::from_str(&config_content).map_err(|e| {
            ConfigError::LoadError(format!(
                "Failed to parse config file '{}': {}",
                config_path.display(),
                e
            ))
        })
    }

    /// Loads and validates configuration at startup. If validation fails, the application should not start.
    pub fn load_and_validate(root: &Path) -> Result<ValidatedConfig, ConfigError> {
        Self::load(root)?.validate()
    }

    pub fn validate(self) -> Result<ValidatedConfig, ConfigError> {
        Self::validate_server(&self.server)?;
        let log_level = parse_log_level(&self.logging.level)?;
        Ok(ValidatedConfig {
            server: self.server,
            logging: self.logging,
            log_level,
        })
    }

    fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
        if server.host.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "Server host must not be empty".to_string(),
            ));
        }
        if server.host != "localhost" && server.host.parse::<IpAddr>().is_err() {
            return Err(ConfigError::ValidationError(format!(
                "Server host must be an IP address or 'localhost', got: {}",
                server.host
            )));
        }
        if !(1..=MAX_WORKERS).contains(&server.workers) {
            return Err(ConfigError::ValidationError(format!(
                "Server workers must be between 1 and {}, got: {}",
                MAX_WORKERS, server.workers
            )));
        }
        Ok(())
    }
}

pub fn parse_log_level(level: &str) -> Result<LevelFilter, ConfigError> {
    match level.to_ascii_lowercase().as_str() {
        "trace" => Ok(LevelFilter::Trace),
        "debug" => Ok(LevelFilter::Debug),
        "info" => Ok(LevelFilter::Info),
        "warn" => Ok(LevelFilter::Warn),
        "error" => Ok(LevelFilter::Error),
        "off" => Ok(LevelFilter::Off),
        other => Err(ConfigError::ValidationError(format!(
            "Logging level must be one of trace, debug, info, warn, error, off; got: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::test_fixtures::TestFixtureRoot;

    #[test]
    fn load_applies_defaults() {
        let fixture = TestFixtureRoot::new_unique("config-defaults").unwrap();
        fs::write(
            fixture.path().join(CONFIG_FILE_NAME),
            "server:\n  host: \"127.0.0.1\"\n  port: 7090\n",
        )
        .unwrap();
        let config = Config::load_and_validate(fixture.path()).expect("config");
        assert_eq!(config.server.workers, 2);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.log_level, LevelFilter::Info);
    }

    #[test]
    fn rejects_unknown_log_level() {
        let fixture = TestFixtureRoot::new_unique("config-level").unwrap();
        fs::write(
            fixture.path().join(CONFIG_FILE_NAME),
            "server:\n  host: \"127.0.0.1\"\n  port: 7090\nlogging:\n  level: loud\n",
        )
        .unwrap();
        let err = Config::load_and_validate(fixture.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
        assert!(err.to_string().contains("loud"));
    }

    #[test]
    fn rejects_zero_workers_and_bad_host() {
        let mut config = Config {
            server: ServerConfig {
                host: "example.com".to_string(),
                port: 7090,
                workers: 1,
            },
            logging: LoggingConfig::default(),
        };
        assert!(config.clone().validate().is_err());
        config.server.host = "0.0.0.0".to_string();
        config.server.workers = 0;
        assert!(config.clone().validate().is_err());
        config.server.workers = 4;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let fixture = TestFixtureRoot::new_unique("config-missing").unwrap();
        let err = Config::load(fixture.path()).unwrap_err();
        assert!(matches!(err, ConfigError::LoadError(_)));
    }
}
