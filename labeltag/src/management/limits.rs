// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::management::errors::{DomainError, ManagementErrorKind};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;

pub const MAX_LABEL_NAME_CHARS: usize = 317;
pub const MAX_CATEGORY_NAME_CHARS: usize = 255;
pub const MAX_CATEGORY_DESCRIPTION_CHARS: usize = 255;
pub const MAX_ENTITY_KEY_CHARS: usize = 64;
pub const MAX_ENTRY_NAME_CHARS: usize = 255;

#[derive(Debug, Clone)]
pub struct LimitError {
    message: String,
}

impl LimitError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for LimitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for LimitError {}

impl DomainError for LimitError {
    fn kind(&self) -> ManagementErrorKind {
        ManagementErrorKind::Validation
    }
}

#[derive(Debug, Clone, Copy)]
pub enum FieldLimit {
    MaxChars(usize),
}

#[derive(Debug, Clone)]
pub struct FieldLimits {
    fields: BTreeMap<&'static str, FieldLimit>,
}

impl FieldLimits {
    pub fn new(entries: Vec<(&'static str, FieldLimit)>) -> Self {
        Self {
            fields: entries.into_iter().collect(),
        }
    }
}

/// Character counts of the fields a request actually carries.
#[derive(Debug, Default, Clone)]
pub struct FieldValues {
    lens: BTreeMap<&'static str, usize>,
}

impl FieldValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &'static str, value: &str) {
        self.lens.insert(name, value.chars().count());
    }

    pub fn insert_opt(&mut self, name: &'static str, value: Option<&str>) {
        if let Some(value) = value {
            self.insert(name, value);
        }
    }
}

pub fn validate_field_limits(limits: &FieldLimits, values: &FieldValues) -> Result<(), LimitError> {
    for (name, limit) in &limits.fields {
        let Some(len) = values.lens.get(name).copied() else {
            continue;
        };
        let FieldLimit::MaxChars(max) = *limit;
        if len > max {
            return Err(LimitError::new(format!(
                "{} must be at most {} characters (got {})",
                display_field_name(name),
                max,
                len
            )));
        }
    }
    Ok(())
}

fn display_field_name(name: &str) -> String {
    let spaced = name.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => format!("{}{}", first.to_ascii_uppercase(), chars.as_str()),
        None => String::new(),
    }
}
