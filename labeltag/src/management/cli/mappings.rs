// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::management::cli::parse_utils::{
    next_value, parse_record_id, parse_required_arg, reject_extra_args,
};
use crate::management::cli::{CliError, CommandSpec, DomainSpec};
use crate::management::cli_helper::CliCommand;
use crate::management::core::ManagementCommand;
use crate::management::mappings::{
    EntityOptionsRequest, MAPPING_ACTION_ADD_OK, MAPPING_ACTION_DELETE_OK,
    MAPPING_ACTION_ENTITIES_OK, MAPPING_ACTION_LIST_OK, MAPPING_ACTION_SHOW_OK,
    MAPPING_ACTION_UPDATE_OK, MAPPINGS_DOMAIN_ID, MappingAddRequest, MappingCommand,
    MappingDeleteRequest, MappingListRequest, MappingShowRequest, MappingUpdateRequest,
};
use crate::management::registry::DomainActionKey;

pub fn domain() -> DomainSpec {
    DomainSpec {
        name: "mapping",
        aliases: &["m"],
        commands: vec![
            CommandSpec {
                name: "add",
                aliases: &[],
                usage: &["mapping add --label <name> --category <description> [--entity <key>]"],
                parser: parse_add,
            },
            CommandSpec {
                name: "update",
                aliases: &["edit"],
                usage: &["mapping update <id> --category <description>"],
                parser: parse_update,
            },
            CommandSpec {
                name: "delete",
                aliases: &["rm"],
                usage: &["mapping delete <id>"],
                parser: parse_delete,
            },
            CommandSpec {
                name: "list",
                aliases: &["ls"],
                usage: &["mapping list"],
                parser: parse_list,
            },
            CommandSpec {
                name: "show",
                aliases: &[],
                usage: &["mapping show <id>"],
                parser: parse_show,
            },
            CommandSpec {
                name: "entities",
                aliases: &[],
                usage: &["mapping entities"],
                parser: parse_entities,
            },
        ],
    }
}

fn success(action_id: u32) -> Vec<DomainActionKey> {
    vec![DomainActionKey::new(MAPPINGS_DOMAIN_ID, action_id)]
}

fn parse_add(args: &[String]) -> Result<CliCommand, CliError> {
    let mut entity = None;
    let mut label_name = None;
    let mut category = None;

    let mut idx = 0;
    while idx < args.len() {
        match args[idx].as_str() {
            "--entity" => {
                idx += 1;
                let raw = next_value(args, &mut idx, "--entity")?;
                entity = if raw.is_empty() { None } else { Some(raw) };
            }
            "--label" => {
                idx += 1;
                label_name = Some(next_value(args, &mut idx, "--label")?);
            }
            "--category" => {
                idx += 1;
                category = Some(next_value(args, &mut idx, "--category")?);
            }
            flag => {
                return Err(CliError::usage(format!(
                    "Unknown flag for mapping add: {}",
                    flag
                )));
            }
        }
    }

    let label_name = label_name.ok_or_else(|| CliError::usage("mapping add requires --label"))?;
    let category =
        category.ok_or_else(|| CliError::usage("mapping add requires --category"))?;

    Ok(CliCommand {
        command: ManagementCommand::Mappings(MappingCommand::Add(MappingAddRequest {
            entity,
            label_name,
            category,
        })),
        success_actions: success(MAPPING_ACTION_ADD_OK),
    })
}

fn parse_update(args: &[String]) -> Result<CliCommand, CliError> {
    let (raw_id, rest) = parse_required_arg(args, "mapping id")?;
    let id = parse_record_id(&raw_id, "mapping id")?;
    let mut category = None;

    let mut idx = 0;
    while idx < rest.len() {
        match rest[idx].as_str() {
            "--category" => {
                idx += 1;
                category = Some(next_value(rest, &mut idx, "--category")?);
            }
            flag => {
                return Err(CliError::usage(format!(
                    "Unknown flag for mapping update: {}",
                    flag
                )));
            }
        }
    }

    let category =
        category.ok_or_else(|| CliError::usage("mapping update requires --category"))?;
    Ok(CliCommand {
        command: ManagementCommand::Mappings(MappingCommand::Update(MappingUpdateRequest {
            id,
            category,
        })),
        success_actions: success(MAPPING_ACTION_UPDATE_OK),
    })
}

fn parse_delete(args: &[String]) -> Result<CliCommand, CliError> {
    let (raw_id, rest) = parse_required_arg(args, "mapping id")?;
    reject_extra_args(rest, "mapping delete")?;
    Ok(CliCommand {
        command: ManagementCommand::Mappings(MappingCommand::Delete(MappingDeleteRequest {
            id: parse_record_id(&raw_id, "mapping id")?,
        })),
        success_actions: success(MAPPING_ACTION_DELETE_OK),
    })
}

fn parse_list(args: &[String]) -> Result<CliCommand, CliError> {
    reject_extra_args(args, "mapping list")?;
    Ok(CliCommand {
        command: ManagementCommand::Mappings(MappingCommand::List(MappingListRequest {})),
        success_actions: success(MAPPING_ACTION_LIST_OK),
    })
}

fn parse_show(args: &[String]) -> Result<CliCommand, CliError> {
    let (raw_id, rest) = parse_required_arg(args, "mapping id")?;
    reject_extra_args(rest, "mapping show")?;
    Ok(CliCommand {
        command: ManagementCommand::Mappings(MappingCommand::Show(MappingShowRequest {
            id: parse_record_id(&raw_id, "mapping id")?,
        })),
        success_actions: success(MAPPING_ACTION_SHOW_OK),
    })
}

fn parse_entities(args: &[String]) -> Result<CliCommand, CliError> {
    reject_extra_args(args, "mapping entities")?;
    Ok(CliCommand {
        command: ManagementCommand::Mappings(MappingCommand::Entities(EntityOptionsRequest {})),
        success_actions: success(MAPPING_ACTION_ENTITIES_OK),
    })
}
