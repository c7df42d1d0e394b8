// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use env_logger::{Logger, Target};
use log::{LevelFilter, SetLoggerError};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// Log file that CLI invocations append to under `logs/`.
pub const DEFAULT_LOG_FILE_NAME: &str = "labeltag.log";

/// Builds the process logger: `<UTC timestamp> [LEVEL] target: message`.
/// `RUST_LOG` still refines per-module levels on top of `level`.
pub fn build_logger(level: LevelFilter, target: Target) -> Logger {
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .target(target)
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {}: {}",
                chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f UTC"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .build()
}

pub fn init_logger(level: LevelFilter, target: Target) -> Result<(), SetLoggerError> {
    let logger = build_logger(level, target);
    let max_level = logger.filter();
    log::set_boxed_logger(Box::new(logger))?;
    log::set_max_level(max_level);
    Ok(())
}


/// Opens `logs/labeltag.log` for appending, creating it when missing.
pub fn open_log_file(logs_dir: &Path) -> io::Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(logs_dir.join(DEFAULT_LOG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::test_fixtures::TestFixtureRoot;
    use log::{Log, Record};

    #[test]
    fn file_target_appends_formatted_lines() {
        let fixture = TestFixtureRoot::new_unique("logging-file").unwrap();
        let logs_dir = fixture.runtime_paths().unwrap().logs_dir;
        std::fs::write(logs_dir.join(DEFAULT_LOG_FILE_NAME), "earlier\n").unwrap();

        let file = open_log_file(&logs_dir).unwrap();
        let logger = build_logger(LevelFilter::Info, Target::Pipe(Box::new(file)));
        logger.log(
            &Record::builder()
                .args(format_args!("Added label mapping 3"))
                .level(log::Level::Info)
                .target("labeltag::management")
                .build(),
        );
        logger.flush();

        let content = std::fs::read_to_string(logs_dir.join(DEFAULT_LOG_FILE_NAME)).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("earlier"));
        let line = lines.next().expect("appended line");
        assert!(line.ends_with("[INFO] labeltag::management: Added label mapping 3"));
        assert!(line.contains(" UTC "));
    }
}
