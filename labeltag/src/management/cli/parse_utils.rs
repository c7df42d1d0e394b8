// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::CliError;
use crate::management::RecordId;

pub(crate) fn parse_required_arg<'a>(
    args: &'a [String],
    label: &str,
) -> Result<(String, &'a [String]), CliError> {
    if args.is_empty() {
        return Err(CliError::usage(format!("Missing {}", label)));
    }
    Ok((args[0].clone(), &args[1..]))
}

pub(crate) fn next_value(args: &[String], idx: &mut usize, flag: &str) -> Result<String, CliError> {
    if *idx >= args.len() {
        return Err(CliError::usage(format!("{} requires a value", flag)));
    }
    let value = args[*idx].clone();
    *idx += 1;
    Ok(value)
}

pub(crate) fn parse_record_id(raw: &str, label: &str) -> Result<RecordId, CliError> {
    raw.parse::<RecordId>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| CliError::usage(format!("Invalid {} '{}'", label, raw)))
}

pub(crate) fn reject_extra_args(args: &[String], command: &str) -> Result<(), CliError> {
    match args.first() {
        Some(arg) => Err(CliError::usage(format!(
            "Unexpected argument for {}: {}",
            command, arg
        ))),
        None => Ok(()),
    }
}
