// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::management::bus::ManagementBus;
use crate::management::categories::CategoryListResponse;
use crate::management::cli::CliError;
use crate::management::core::{ManagementCommand, ManagementResponse, RequestOrigin};
use crate::management::errors::ManagementError;
use crate::management::mappings::{EntityOptionsResponse, MappingListResponse, MappingShowResponse};
use crate::management::registry::DomainActionKey;
use crate::management::{ManagementContext, ResponsePayload, build_default_registry};
use std::path::Path;

#[derive(Debug)]
pub struct CliCommand {
    pub command: ManagementCommand,
    pub success_actions: Vec<DomainActionKey>,
}

/// Runs one command in-process against the runtime root and prints the result.
pub async fn execute(runtime_root: &Path, cli_command: CliCommand) -> Result<i32, CliError> {
    let response = send_via_bypass(runtime_root, cli_command.command).await?;
    Ok(output_response(&response, &cli_command.success_actions))
}

async fn send_via_bypass(
    runtime_root: &Path,
    command: ManagementCommand,
) -> Result<ManagementResponse, CliError> {
    let registry = build_default_registry().map_err(|err| CliError::connector(err.to_string()))?;
    let context = ManagementContext::from_runtime_root(runtime_root)?;
    let bus = ManagementBus::start(registry, context);
    Ok(bus.send(RequestOrigin::Cli, command).await?)
}

fn output_response(response: &ManagementResponse, success_actions: &[DomainActionKey]) -> i32 {
    let key = DomainActionKey::new(response.domain_id, response.action_id);
    let is_success = success_actions.contains(&key);

    match &response.payload {
        ResponsePayload::Message(payload) => {
            if is_success {
                println!("{}", payload.message);
                0
            } else {
                eprintln!("{}", payload.message);
                1
            }
        }
        ResponsePayload::Failure(failure) => {
            for message in &failure.messages {
                eprintln!("{}", message);
            }
            1
        }
        ResponsePayload::MappingList(payload) => {
            if is_success {
                print_mapping_list(payload);
                0
            } else {
                eprintln!("Mapping list failed");
                1
            }
        }
        ResponsePayload::MappingShow(payload) => {
            if is_success {
                print_mapping_show(payload);
                0
            } else {
                eprintln!("Mapping lookup failed");
                1
            }
        }
        ResponsePayload::EntityOptions(payload) => {
            if is_success {
                print_entity_options(payload);
                0
            } else {
                eprintln!("Entity list failed");
                1
            }
        }
        ResponsePayload::CategoryList(payload) => {
            if is_success {
                print_category_list(payload);
                0
            } else {
                eprintln!("Category list failed");
                1
            }
        }
    }
}

fn print_mapping_list(payload: &MappingListResponse) {
    let id_header = "Id";
    let entity_header = "Entity";
    let label_header = "Label";
    let category_header = "Category";
    let mut id_width = id_header.len();
    let mut entity_width = entity_header.len();
    let mut label_width = label_header.len();
    for mapping in &payload.mappings {
        id_width = id_width.max(mapping.id.to_string().len());
        entity_width = entity_width.max(mapping.entity.chars().count());
        label_width = label_width.max(mapping.label_name.chars().count());
    }
    println!(
        "{:<id_width$}  {:<entity_width$}  {:<label_width$}  {}",
        id_header, entity_header, label_header, category_header
    );
    for mapping in &payload.mappings {
        println!(
            "{:<id_width$}  {:<entity_width$}  {:<label_width$}  {}",
            mapping.id, mapping.entity, mapping.label_name, mapping.category
        );
    }
}

fn print_mapping_show(payload: &MappingShowResponse) {
    println!("Id: {}", payload.id);
    println!("Entity: {}", payload.entity);
    println!("Label: {}", payload.label_name);
    println!("Category: {}", payload.category);
    println!("Category name: {}", payload.category_name);
}

fn print_entity_options(payload: &EntityOptionsResponse) {
    let key_header = "Key";
    let mut key_width = key_header.len();
    for option in &payload.entities {
        key_width = key_width.max(option.key.as_deref().unwrap_or("").chars().count());
    }
    println!("{:<width$}  {}", key_header, "Name", width = key_width);
    for option in &payload.entities {
        println!(
            "{:<width$}  {}",
            option.key.as_deref().unwrap_or(""),
            option.name,
            width = key_width
        );
    }
}

fn print_category_list(payload: &CategoryListResponse) {
    let name_header = "Name";
    let mut name_width = name_header.len();
    for category in &payload.categories {
        name_width = name_width.max(category.name.chars().count());
    }
    println!(
        "{:<width$}  {:<7}  {:<9}  {}",
        name_header,
        "Entries",
        "Flags",
        "Description",
        width = name_width
    );
    for category in &payload.categories {
        let mut flags = Vec::new();
        if category.single_value {
            flags.push("single");
        }
        if category.read_only {
            flags.push("ro");
        }
        println!(
            "{:<width$}  {:<7}  {:<9}  {}",
            category.name,
            category.entries,
            flags.join(","),
            category.description,
            width = name_width
        );
    }
}

impl From<ManagementError> for CliError {
    fn from(err: ManagementError) -> Self {
        CliError::connector(err.message().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::management::mappings::{
        MAPPING_ACTION_ADD_OK, MAPPING_ACTION_LIST_OK, MAPPINGS_DOMAIN_ID, MappingAddRequest,
        MappingCommand, MappingListRequest,
    };
    use crate::util::test_fixtures::TestFixtureRoot;

    fn add_command(label: &str) -> CliCommand {
        CliCommand {
            command: ManagementCommand::Mappings(MappingCommand::Add(MappingAddRequest {
                entity: Some("ContainerNode".to_string()),
                label_name: label.to_string(),
                category: format!("{} label", label),
            })),
            success_actions: vec![DomainActionKey::new(MAPPINGS_DOMAIN_ID, MAPPING_ACTION_ADD_OK)],
        }
    }

    #[tokio::test]
    async fn bypass_persists_between_invocations() {
        let fixture = TestFixtureRoot::new_unique("cli-bypass").unwrap();
        fixture.write_config(7090).unwrap();

        assert_eq!(execute(fixture.path(), add_command("app")).await.unwrap(), 0);
        assert!(fixture.store_file().exists());

        let list = CliCommand {
            command: ManagementCommand::Mappings(MappingCommand::List(MappingListRequest {})),
            success_actions: vec![DomainActionKey::new(
                MAPPINGS_DOMAIN_ID,
                MAPPING_ACTION_LIST_OK,
            )],
        };
        assert_eq!(execute(fixture.path(), list).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn domain_rejection_exits_with_one() {
        let fixture = TestFixtureRoot::new_unique("cli-reject").unwrap();
        fixture.write_config(7090).unwrap();

        assert_eq!(execute(fixture.path(), add_command("app")).await.unwrap(), 0);
        assert_eq!(execute(fixture.path(), add_command("app")).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn invalid_config_is_connector_error() {
        let fixture = TestFixtureRoot::new_unique("cli-bad-config").unwrap();
        std::fs::write(fixture.path().join("config.yaml"), "server: [").unwrap();
        let err = execute(fixture.path(), add_command("app")).await.unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }
}
