// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

//! Container label → tag category mappings.

pub mod form;
pub mod service;

use crate::management::core::{
    ManagementCommand, ManagementContext, ManagementRequest, ManagementResponse,
};
use crate::management::errors::{DomainResult, boxed_error};
use crate::management::limits::{
    FieldLimit, FieldLimits, FieldValues, LimitError, MAX_CATEGORY_DESCRIPTION_CHARS,
    MAX_ENTITY_KEY_CHARS, MAX_LABEL_NAME_CHARS, validate_field_limits,
};
use crate::management::registry::{
    ActionDescriptor, DomainDescriptor, ManagementHandler, ManagementRegistry, RegistryError,
};
use crate::management::store::{RecordId, TransactionError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use form::{EditSession, FormChanges, MappingForm};
pub use service::{MAPPING_NAME, MappingError, MappingErrorKind};

pub const MAPPINGS_DOMAIN_ID: u32 = 21;

pub const MAPPING_ACTION_ADD: u32 = 1;
pub const MAPPING_ACTION_UPDATE: u32 = 2;
pub const MAPPING_ACTION_DELETE: u32 = 3;
pub const MAPPING_ACTION_LIST: u32 = 4;
pub const MAPPING_ACTION_SHOW: u32 = 5;
pub const MAPPING_ACTION_ENTITIES: u32 = 6;

pub const MAPPING_ACTION_ADD_OK: u32 = 101;
pub const MAPPING_ACTION_ADD_ERR: u32 = 102;
pub const MAPPING_ACTION_UPDATE_OK: u32 = 201;
pub const MAPPING_ACTION_UPDATE_ERR: u32 = 202;
pub const MAPPING_ACTION_DELETE_OK: u32 = 301;
pub const MAPPING_ACTION_DELETE_ERR: u32 = 302;
pub const MAPPING_ACTION_LIST_OK: u32 = 401;
pub const MAPPING_ACTION_LIST_ERR: u32 = 402;
pub const MAPPING_ACTION_SHOW_OK: u32 = 501;
pub const MAPPING_ACTION_SHOW_ERR: u32 = 502;
pub const MAPPING_ACTION_ENTITIES_OK: u32 = 601;
pub const MAPPING_ACTION_ENTITIES_ERR: u32 = 602;

#[derive(Debug, Clone)]
pub enum MappingCommand {
    Add(MappingAddRequest),
    Update(MappingUpdateRequest),
    Delete(MappingDeleteRequest),
    List(MappingListRequest),
    Show(MappingShowRequest),
    Entities(EntityOptionsRequest),
}

impl MappingCommand {
    pub fn action_id(&self) -> u32 {
        match self {
            MappingCommand::Add(_) => MAPPING_ACTION_ADD,
            MappingCommand::Update(_) => MAPPING_ACTION_UPDATE,
            MappingCommand::Delete(_) => MAPPING_ACTION_DELETE,
            MappingCommand::List(_) => MAPPING_ACTION_LIST,
            MappingCommand::Show(_) => MAPPING_ACTION_SHOW,
            MappingCommand::Entities(_) => MAPPING_ACTION_ENTITIES,
        }
    }

    pub fn validate_limits(&self) -> Result<(), LimitError> {
        let limits = FieldLimits::new(vec![
            ("entity", FieldLimit::MaxChars(MAX_ENTITY_KEY_CHARS)),
            ("label_name", FieldLimit::MaxChars(MAX_LABEL_NAME_CHARS)),
            ("category", FieldLimit::MaxChars(MAX_CATEGORY_DESCRIPTION_CHARS)),
        ]);
        let mut values = FieldValues::new();
        match self {
            MappingCommand::Add(request) => {
                values.insert_opt("entity", request.entity.as_deref());
                values.insert("label_name", &request.label_name);
                values.insert("category", &request.category);
            }
            MappingCommand::Update(request) => values.insert("category", &request.category),
            _ => {}
        }
        validate_field_limits(&limits, &values)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MappingAddRequest {
    #[serde(default)]
    pub entity: Option<String>,
    #[serde(default)]
    pub label_name: String,
    #[serde(default)]
    pub category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MappingUpdateRequest {
    pub id: RecordId,
    #[serde(default)]
    pub category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingDeleteRequest {
    pub id: RecordId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingListRequest {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingShowRequest {
    pub id: RecordId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityOptionsRequest {}

/// One row of the mapping list. `category` is the category description.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MappingSummary {
    pub id: RecordId,
    pub entity: String,
    pub entity_key: Option<String>,
    pub label_name: String,
    pub category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingListResponse {
    pub mappings: Vec<MappingSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MappingShowResponse {
    pub id: RecordId,
    pub entity_key: Option<String>,
    pub entity: String,
    pub label_name: String,
    pub category_name: String,
    pub category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntityOption {
    pub name: String,
    pub key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityOptionsResponse {
    pub entities: Vec<EntityOption>,
}

pub fn register(registry: &mut ManagementRegistry) -> Result<(), RegistryError> {
    registry.register_domain(DomainDescriptor {
        name: "mappings",
        id: MAPPINGS_DOMAIN_ID,
        actions: vec![
            ActionDescriptor {
                name: "add",
                id: MAPPING_ACTION_ADD,
            },
            ActionDescriptor {
                name: "update",
                id: MAPPING_ACTION_UPDATE,
            },
            ActionDescriptor {
                name: "delete",
                id: MAPPING_ACTION_DELETE,
            },
            ActionDescriptor {
                name: "list",
                id: MAPPING_ACTION_LIST,
            },
            ActionDescriptor {
                name: "show",
                id: MAPPING_ACTION_SHOW,
            },
            ActionDescriptor {
                name: "entities",
                id: MAPPING_ACTION_ENTITIES,
            },
            ActionDescriptor {
                name: "add_ok",
                id: MAPPING_ACTION_ADD_OK,
            },
            ActionDescriptor {
                name: "add_err",
                id: MAPPING_ACTION_ADD_ERR,
            },
            ActionDescriptor {
                name: "update_ok",
                id: MAPPING_ACTION_UPDATE_OK,
            },
            ActionDescriptor {
                name: "update_err",
                id: MAPPING_ACTION_UPDATE_ERR,
            },
            ActionDescriptor {
                name: "delete_ok",
                id: MAPPING_ACTION_DELETE_OK,
            },
            ActionDescriptor {
                name: "delete_err",
                id: MAPPING_ACTION_DELETE_ERR,
            },
            ActionDescriptor {
                name: "list_ok",
                id: MAPPING_ACTION_LIST_OK,
            },
            ActionDescriptor {
                name: "list_err",
                id: MAPPING_ACTION_LIST_ERR,
            },
            ActionDescriptor {
                name: "show_ok",
                id: MAPPING_ACTION_SHOW_OK,
            },
            ActionDescriptor {
                name: "show_err",
                id: MAPPING_ACTION_SHOW_ERR,
            },
            ActionDescriptor {
                name: "entities_ok",
                id: MAPPING_ACTION_ENTITIES_OK,
            },
            ActionDescriptor {
                name: "entities_err",
                id: MAPPING_ACTION_ENTITIES_ERR,
            },
        ],
    })?;

    let handler: ManagementHandler = Arc::new(|request, context| {
        Box::pin(async move { handle_mappings_request(request, context).await })
    });
    registry.register_handlers(
        MAPPINGS_DOMAIN_ID,
        &[
            MAPPING_ACTION_ADD,
            MAPPING_ACTION_UPDATE,
            MAPPING_ACTION_DELETE,
            MAPPING_ACTION_LIST,
            MAPPING_ACTION_SHOW,
            MAPPING_ACTION_ENTITIES,
        ],
        handler,
    )
}

async fn handle_mappings_request(
    request: ManagementRequest,
    context: Arc<ManagementContext>,
) -> DomainResult<ManagementResponse> {
    let request_id = request.request_id;
    match request.command {
        ManagementCommand::Mappings(MappingCommand::Add(payload)) => {
            handle_add(payload, request_id, &context).await
        }
        ManagementCommand::Mappings(MappingCommand::Update(payload)) => {
            handle_update(payload, request_id, &context).await
        }
        ManagementCommand::Mappings(MappingCommand::Delete(payload)) => {
            handle_delete(payload, request_id, &context).await
        }
        ManagementCommand::Mappings(MappingCommand::List(_)) => {
            handle_list(request_id, &context).await
        }
        ManagementCommand::Mappings(MappingCommand::Show(payload)) => {
            handle_show(payload, request_id, &context).await
        }
        ManagementCommand::Mappings(MappingCommand::Entities(_)) => {
            Ok(response_entities(request_id, &context))
        }
        _ => Ok(response_failure(
            MAPPING_ACTION_LIST_ERR,
            request_id,
            MappingError::single(MappingErrorKind::NotFound, "Invalid mapping command")
                .to_failure(),
        )),
    }
}

fn settle(err: TransactionError<MappingError>, operation: &str) -> MappingError {
    match err {
        TransactionError::Aborted(err) => err,
        TransactionError::Store(err) => MappingError::persistence(operation, err),
    }
}

fn rejected(action_id: u32, request_id: u32, operation: &str, err: MappingError) -> ManagementResponse {
    log::warn!(
        "Mapping {} rejected ({}): {}",
        operation,
        err.kind().code(),
        err
    );
    response_failure(action_id, request_id, err.to_failure())
}

async fn handle_add(
    payload: MappingAddRequest,
    request_id: u32,
    context: &ManagementContext,
) -> DomainResult<ManagementResponse> {
    let store = context.mapping_store.clone();
    let names = context.display_names.clone();
    let label_name = payload.label_name.clone();
    let result = context
        .blocking_pool
        .run_blocking("mapping add", move || {
            store.transaction(|state| service::add(state, &payload, names.as_ref()))
        })
        .await
        .map_err(boxed_error)?;
    match result {
        Ok(id) => {
            log::info!("Added label mapping {} for label '{}'", id, label_name);
            Ok(response_ok(
                MAPPING_ACTION_ADD_OK,
                request_id,
                &format!("{} \"{}\" was added", MAPPING_NAME, label_name),
            ))
        }
        Err(err) => Ok(rejected(
            MAPPING_ACTION_ADD_ERR,
            request_id,
            "add",
            settle(err, "add"),
        )),
    }
}

async fn handle_update(
    payload: MappingUpdateRequest,
    request_id: u32,
    context: &ManagementContext,
) -> DomainResult<ManagementResponse> {
    let store = context.mapping_store.clone();
    let names = context.display_names.clone();
    let id = payload.id;
    let result = context
        .blocking_pool
        .run_blocking("mapping update", move || {
            store.transaction(|state| service::update(state, &payload, names.as_ref()))
        })
        .await
        .map_err(boxed_error)?;
    match result {
        Ok(label_name) => {
            log::info!("Updated label mapping {} for label '{}'", id, label_name);
            Ok(response_ok(
                MAPPING_ACTION_UPDATE_OK,
                request_id,
                &format!("{} \"{}\" was saved", MAPPING_NAME, label_name),
            ))
        }
        Err(err) => Ok(rejected(
            MAPPING_ACTION_UPDATE_ERR,
            request_id,
            "update",
            settle(err, "save"),
        )),
    }
}

async fn handle_delete(
    payload: MappingDeleteRequest,
    request_id: u32,
    context: &ManagementContext,
) -> DomainResult<ManagementResponse> {
    let store = context.mapping_store.clone();
    let id = payload.id;
    let result = context
        .blocking_pool
        .run_blocking("mapping delete", move || {
            store.transaction(|state| service::delete(state, id))
        })
        .await
        .map_err(boxed_error)?;
    match result {
        Ok(deleted) => {
            log::info!(
                "Deleted label mapping {} for label '{}'",
                id,
                deleted.label_name
            );
            if !deleted.detached.is_empty() {
                log::info!(
                    "Deleted all-entities mappings bound to its category: {}",
                    deleted.detached.join(", ")
                );
            }
            Ok(response_ok(
                MAPPING_ACTION_DELETE_OK,
                request_id,
                &format!(
                    "{} \"{}\": Delete successful",
                    MAPPING_NAME, deleted.label_name
                ),
            ))
        }
        Err(err) => Ok(rejected(
            MAPPING_ACTION_DELETE_ERR,
            request_id,
            "delete",
            settle(err, "delete"),
        )),
    }
}

async fn handle_list(
    request_id: u32,
    context: &ManagementContext,
) -> DomainResult<ManagementResponse> {
    let state = match context.mapping_store.snapshot() {
        Ok(state) => state,
        Err(err) => {
            return Ok(rejected(
                MAPPING_ACTION_LIST_ERR,
                request_id,
                "list",
                MappingError::persistence("list", err),
            ));
        }
    };
    let mappings = service::list(&state, context.display_names.as_ref());
    Ok(ManagementResponse {
        domain_id: MAPPINGS_DOMAIN_ID,
        action_id: MAPPING_ACTION_LIST_OK,
        request_id,
        payload: crate::management::ResponsePayload::MappingList(MappingListResponse {
            mappings,
        }),
    })
}

async fn handle_show(
    payload: MappingShowRequest,
    request_id: u32,
    context: &ManagementContext,
) -> DomainResult<ManagementResponse> {
    let shown = context
        .mapping_store
        .snapshot()
        .map_err(|err| MappingError::persistence("show", err))
        .and_then(|state| service::show(&state, payload.id, context.display_names.as_ref()));
    match shown {
        Ok(shown) => Ok(ManagementResponse {
            domain_id: MAPPINGS_DOMAIN_ID,
            action_id: MAPPING_ACTION_SHOW_OK,
            request_id,
            payload: crate::management::ResponsePayload::MappingShow(shown),
        }),
        Err(err) => Ok(rejected(MAPPING_ACTION_SHOW_ERR, request_id, "show", err)),
    }
}

fn response_entities(request_id: u32, context: &ManagementContext) -> ManagementResponse {
    ManagementResponse {
        domain_id: MAPPINGS_DOMAIN_ID,
        action_id: MAPPING_ACTION_ENTITIES_OK,
        request_id,
        payload: crate::management::ResponsePayload::EntityOptions(EntityOptionsResponse {
            entities: service::entity_options(context.display_names.as_ref()),
        }),
    }
}

define_domain_responses!(MAPPINGS_DOMAIN_ID);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::ALL_ENTITIES;
    use crate::management::ResponsePayload;
    use crate::management::core::RequestOrigin;
    use crate::management::errors::ManagementErrorKind;
    use crate::util::test_fixtures::TestFixtureRoot;

    fn context_in(fixture: &TestFixtureRoot) -> Arc<ManagementContext> {
        let runtime_paths = fixture.runtime_paths().unwrap();
        Arc::new(ManagementContext::new(&runtime_paths).expect("context"))
    }

    async fn run(context: &Arc<ManagementContext>, command: MappingCommand) -> ManagementResponse {
        handle_mappings_request(
            ManagementRequest {
                request_id: 1,
                origin: RequestOrigin::Cli,
                command: ManagementCommand::Mappings(command),
            },
            context.clone(),
        )
        .await
        .unwrap_or_else(|err| panic!("handler error: {}", err))
    }

    fn message_of(response: &ManagementResponse) -> &str {
        match &response.payload {
            ResponsePayload::Message(message) => &message.message,
            other => panic!("expected message, got {:?}", other),
        }
    }

    fn add(entity: Option<&str>, label: &str, category: &str) -> MappingCommand {
        MappingCommand::Add(MappingAddRequest {
            entity: entity.map(str::to_string),
            label_name: label.to_string(),
            category: category.to_string(),
        })
    }

    #[tokio::test]
    async fn add_update_delete_report_user_messages() {
        let fixture = TestFixtureRoot::new_unique("mappings-lifecycle").unwrap();
        let context = context_in(&fixture);

        let added = run(&context, add(Some("ContainerNode"), "app", "App Label")).await;
        assert_eq!(added.action_id, MAPPING_ACTION_ADD_OK);
        assert_eq!(
            message_of(&added),
            "Container Label Tag Mapping \"app\" was added"
        );

        let id = *context
            .mapping_store
            .snapshot()
            .unwrap()
            .mappings
            .keys()
            .next()
            .unwrap();
        let updated = run(
            &context,
            MappingCommand::Update(MappingUpdateRequest {
                id,
                category: "Application".to_string(),
            }),
        )
        .await;
        assert_eq!(updated.action_id, MAPPING_ACTION_UPDATE_OK);
        assert_eq!(
            message_of(&updated),
            "Container Label Tag Mapping \"app\" was saved"
        );

        let deleted = run(&context, MappingCommand::Delete(MappingDeleteRequest { id })).await;
        assert_eq!(deleted.action_id, MAPPING_ACTION_DELETE_OK);
        assert_eq!(
            message_of(&deleted),
            "Container Label Tag Mapping \"app\": Delete successful"
        );
        assert!(context.mapping_store.snapshot().unwrap().categories.is_empty());
    }

    #[tokio::test]
    async fn rejection_carries_code_and_messages() {
        let fixture = TestFixtureRoot::new_unique("mappings-reject").unwrap();
        let context = context_in(&fixture);

        let response = run(&context, add(Some(ALL_ENTITIES), "tier", "Tier")).await;
        assert_eq!(response.action_id, MAPPING_ACTION_ADD_ERR);
        let failure = response.failure().expect("failure payload");
        assert_eq!(failure.code, "tag_not_found");
        assert_eq!(failure.kind, ManagementErrorKind::Validation);
        assert!(context.mapping_store.snapshot().unwrap().mappings.is_empty());
    }

    #[tokio::test]
    async fn show_unknown_id_is_not_found() {
        let fixture = TestFixtureRoot::new_unique("mappings-show").unwrap();
        let context = context_in(&fixture);
        let response = run(&context, MappingCommand::Show(MappingShowRequest { id: 99 })).await;
        assert_eq!(response.action_id, MAPPING_ACTION_SHOW_ERR);
        assert_eq!(
            response.failure().map(|failure| failure.kind),
            Some(ManagementErrorKind::NotFound)
        );
    }

    #[tokio::test]
    async fn entities_lists_catalog() {
        let fixture = TestFixtureRoot::new_unique("mappings-entities").unwrap();
        let context = context_in(&fixture);
        let response = run(&context, MappingCommand::Entities(EntityOptionsRequest {})).await;
        match response.payload {
            ResponsePayload::EntityOptions(options) => {
                assert_eq!(options.entities[0].name, "<All>");
                assert_eq!(options.entities[0].key, None);
                assert!(
                    options
                        .entities
                        .iter()
                        .any(|option| option.key.as_deref() == Some("ContainerNode"))
                );
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[tokio::test]
    async fn added_mapping_survives_reload() {
        let fixture = TestFixtureRoot::new_unique("mappings-reload").unwrap();
        {
            let context = context_in(&fixture);
            run(&context, add(None, "tier", "Tier")).await;
        }
        let reloaded = context_in(&fixture);
        let response = run(&reloaded, MappingCommand::List(MappingListRequest {})).await;
        match response.payload {
            ResponsePayload::MappingList(list) => {
                assert_eq!(list.mappings.len(), 1);
                assert_eq!(list.mappings[0].label_name, "tier");
                assert_eq!(list.mappings[0].category, "Tier");
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }
}
