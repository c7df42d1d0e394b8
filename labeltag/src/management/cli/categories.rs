// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::management::categories::{
    CATEGORIES_DOMAIN_ID, CATEGORY_ACTION_ADD_OK, CATEGORY_ACTION_ENTRY_ADD_OK,
    CATEGORY_ACTION_LIST_OK, CategoryAddRequest, CategoryCommand, CategoryEntryAddRequest,
    CategoryListRequest,
};
use crate::management::cli::parse_utils::{next_value, parse_required_arg, reject_extra_args};
use crate::management::cli::{CliError, CommandSpec, DomainSpec};
use crate::management::cli_helper::CliCommand;
use crate::management::core::ManagementCommand;
use crate::management::registry::DomainActionKey;

pub fn domain() -> DomainSpec {
    DomainSpec {
        name: "category",
        aliases: &["c"],
        commands: vec![
            CommandSpec {
                name: "add",
                aliases: &[],
                usage: &[
                    "category add <name> --description <text> [--multi-value] [--read-only]",
                ],
                parser: parse_add,
            },
            CommandSpec {
                name: "entry-add",
                aliases: &["entry"],
                usage: &["category entry-add <category> <entry> [--description <text>]"],
                parser: parse_entry_add,
            },
            CommandSpec {
                name: "list",
                aliases: &["ls"],
                usage: &["category list"],
                parser: parse_list,
            },
        ],
    }
}

fn parse_add(args: &[String]) -> Result<CliCommand, CliError> {
    let (name, rest) = parse_required_arg(args, "category name")?;
    let mut description = None;
    let mut single_value = true;
    let mut read_only = false;

    let mut idx = 0;
    while idx < rest.len() {
        match rest[idx].as_str() {
            "--description" => {
                idx += 1;
                description = Some(next_value(rest, &mut idx, "--description")?);
            }
            "--multi-value" => {
                single_value = false;
                idx += 1;
            }
            "--read-only" => {
                read_only = true;
                idx += 1;
            }
            flag => {
                return Err(CliError::usage(format!(
                    "Unknown flag for category add: {}",
                    flag
                )));
            }
        }
    }

    let description =
        description.ok_or_else(|| CliError::usage("category add requires --description"))?;
    Ok(CliCommand {
        command: ManagementCommand::Categories(CategoryCommand::Add(CategoryAddRequest {
            name,
            description,
            single_value,
            read_only,
        })),
        success_actions: vec![DomainActionKey::new(
            CATEGORIES_DOMAIN_ID,
            CATEGORY_ACTION_ADD_OK,
        )],
    })
}

fn parse_entry_add(args: &[String]) -> Result<CliCommand, CliError> {
    let (category, rest) = parse_required_arg(args, "category name")?;
    let (name, rest) = parse_required_arg(rest, "entry name")?;
    let mut description = None;

    let mut idx = 0;
    while idx < rest.len() {
        match rest[idx].as_str() {
            "--description" => {
                idx += 1;
                description = Some(next_value(rest, &mut idx, "--description")?);
            }
            flag => {
                return Err(CliError::usage(format!(
                    "Unknown flag for category entry-add: {}",
                    flag
                )));
            }
        }
    }

    let description = description.unwrap_or_else(|| name.clone());
    Ok(CliCommand {
        command: ManagementCommand::Categories(CategoryCommand::AddEntry(
            CategoryEntryAddRequest {
                category,
                name,
                description,
            },
        )),
        success_actions: vec![DomainActionKey::new(
            CATEGORIES_DOMAIN_ID,
            CATEGORY_ACTION_ENTRY_ADD_OK,
        )],
    })
}

fn parse_list(args: &[String]) -> Result<CliCommand, CliError> {
    reject_extra_args(args, "category list")?;
    Ok(CliCommand {
        command: ManagementCommand::Categories(CategoryCommand::List(CategoryListRequest {})),
        success_actions: vec![DomainActionKey::new(
            CATEGORIES_DOMAIN_ID,
            CATEGORY_ACTION_LIST_OK,
        )],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn add_defaults_to_single_value() {
        let parsed = parse_add(&args(&["tier", "--description", "Tier"])).unwrap();
        match parsed.command {
            ManagementCommand::Categories(CategoryCommand::Add(request)) => {
                assert!(request.single_value);
                assert!(!request.read_only);
            }
            other => panic!("unexpected command {:?}", other),
        }
        let parsed =
            parse_add(&args(&["tier", "--multi-value", "--read-only", "--description", "T"]))
                .unwrap();
        match parsed.command {
            ManagementCommand::Categories(CategoryCommand::Add(request)) => {
                assert!(!request.single_value);
                assert!(request.read_only);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn entry_description_defaults_to_name() {
        let parsed = parse_entry_add(&args(&["tier", "frontend"])).unwrap();
        match parsed.command {
            ManagementCommand::Categories(CategoryCommand::AddEntry(request)) => {
                assert_eq!(request.category, "tier");
                assert_eq!(request.description, "frontend");
            }
            other => panic!("unexpected command {:?}", other),
        }
        let err = parse_entry_add(&args(&["tier"])).unwrap_err();
        assert_eq!(err.to_string(), "Missing entry name");
    }
}
