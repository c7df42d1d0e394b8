// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::entities::sanitize_category_name;
use crate::management::core::{
    FailureResponse, ManagementCommand, ManagementContext, ManagementRequest, ManagementResponse,
};
use crate::management::errors::{DomainResult, ManagementErrorKind, boxed_error};
use crate::management::limits::{
    FieldLimit, FieldLimits, FieldValues, LimitError, MAX_CATEGORY_DESCRIPTION_CHARS,
    MAX_CATEGORY_NAME_CHARS, MAX_ENTRY_NAME_CHARS, validate_field_limits,
};
use crate::management::registry::{
    ActionDescriptor, DomainDescriptor, ManagementHandler, ManagementRegistry, RegistryError,
};
use crate::management::store::{RecordId, StoreState, TransactionError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const CATEGORIES_DOMAIN_ID: u32 = 22;

pub const CATEGORY_ACTION_ADD: u32 = 1;
pub const CATEGORY_ACTION_LIST: u32 = 4;
pub const CATEGORY_ACTION_ENTRY_ADD: u32 = 6;

pub const CATEGORY_ACTION_ADD_OK: u32 = 101;
pub const CATEGORY_ACTION_ADD_ERR: u32 = 102;
pub const CATEGORY_ACTION_LIST_OK: u32 = 401;
pub const CATEGORY_ACTION_LIST_ERR: u32 = 402;
pub const CATEGORY_ACTION_ENTRY_ADD_OK: u32 = 601;
pub const CATEGORY_ACTION_ENTRY_ADD_ERR: u32 = 602;

#[derive(Debug, Clone)]
pub enum CategoryCommand {
    Add(CategoryAddRequest),
    AddEntry(CategoryEntryAddRequest),
    List(CategoryListRequest),
}

impl CategoryCommand {
    pub fn action_id(&self) -> u32 {
        match self {
            CategoryCommand::Add(_) => CATEGORY_ACTION_ADD,
            CategoryCommand::AddEntry(_) => CATEGORY_ACTION_ENTRY_ADD,
            CategoryCommand::List(_) => CATEGORY_ACTION_LIST,
        }
    }

    pub fn validate_limits(&self) -> Result<(), LimitError> {
        let limits = FieldLimits::new(vec![
            ("name", FieldLimit::MaxChars(MAX_CATEGORY_NAME_CHARS)),
            ("category", FieldLimit::MaxChars(MAX_CATEGORY_NAME_CHARS)),
            ("entry_name", FieldLimit::MaxChars(MAX_ENTRY_NAME_CHARS)),
            (
                "description",
                FieldLimit::MaxChars(MAX_CATEGORY_DESCRIPTION_CHARS),
            ),
        ]);
        let mut values = FieldValues::new();
        match self {
            CategoryCommand::Add(request) => {
                values.insert("name", &request.name);
                values.insert("description", &request.description);
            }
            CategoryCommand::AddEntry(request) => {
                values.insert("category", &request.category);
                values.insert("entry_name", &request.name);
                values.insert("description", &request.description);
            }
            CategoryCommand::List(_) => {}
        }
        validate_field_limits(&limits, &values)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryAddRequest {
    pub name: String,
    pub description: String,
    #[serde(default = "default_true")]
    pub single_value: bool,
    #[serde(default)]
    pub read_only: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryEntryAddRequest {
    pub category: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryListRequest {}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategorySummary {
    pub id: RecordId,
    pub name: String,
    pub description: String,
    pub read_only: bool,
    pub single_value: bool,
    pub entries: usize,
    pub tag: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryListResponse {
    pub categories: Vec<CategorySummary>,
}

fn failure(code: &'static str, kind: ManagementErrorKind, messages: Vec<String>) -> FailureResponse {
    FailureResponse {
        code,
        kind,
        messages,
    }
}

fn missing(messages: Vec<String>) -> FailureResponse {
    failure("missing_field", ManagementErrorKind::Validation, messages)
}

fn settle(err: TransactionError<FailureResponse>, operation: &str) -> FailureResponse {
    match err {
        TransactionError::Aborted(failure) => failure,
        TransactionError::Store(err) => failure(
            "persistence_error",
            ManagementErrorKind::Internal,
            vec![format!("Error during '{}': {}", operation, err)],
        ),
    }
}

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

pub(crate) fn add_category(
    state: &mut StoreState,
    request: &CategoryAddRequest,
) -> Result<String, FailureResponse> {
    let mut messages = Vec::new();
    if blank(&request.name) {
        messages.push("Name is required".to_string());
    }
    if blank(&request.description) {
        messages.push("Description is required".to_string());
    }
    if !messages.is_empty() {
        return Err(missing(messages));
    }
    let name = sanitize_category_name(request.name.trim());
    if state.category_by_name(&name).is_some() {
        return Err(failure(
            "unique_category",
            ManagementErrorKind::Conflict,
            vec![format!("Category \"{}\" already exists", name)],
        ));
    }
    state
        .create_category(
            &name,
            &request.description,
            request.single_value,
            request.read_only,
        )
        .map_err(|err| {
            failure(
                "persistence_error",
                ManagementErrorKind::Internal,
                vec![format!("Error during 'add': {}", err)],
            )
        })?;
    Ok(name)
}

pub(crate) fn add_entry(
    state: &mut StoreState,
    request: &CategoryEntryAddRequest,
) -> Result<(), FailureResponse> {
    let mut messages = Vec::new();
    if blank(&request.category) {
        messages.push("Category is required".to_string());
    }
    if blank(&request.name) {
        messages.push("Name is required".to_string());
    }
    if !messages.is_empty() {
        return Err(missing(messages));
    }
    let category_id = state
        .category_by_name(&request.category)
        .map(|(id, _)| id)
        .ok_or_else(|| {
            failure(
                "not_found",
                ManagementErrorKind::NotFound,
                vec![format!("Category \"{}\" not found", request.category)],
            )
        })?;
    state
        .create_entry(category_id, &request.name, &request.description)
        .map_err(|err| {
            failure(
                "unique_entry",
                ManagementErrorKind::Conflict,
                vec![err.to_string()],
            )
        })?;
    Ok(())
}

pub(crate) fn summaries(state: &StoreState) -> Vec<CategorySummary> {
    state
        .categories
        .iter()
        .map(|(id, category)| CategorySummary {
            id: *id,
            name: category.name.clone(),
            description: category.description.clone(),
            read_only: category.read_only,
            single_value: category.single_value,
            entries: category.entries.len(),
            tag: state
                .tags
                .get(&category.tag_id)
                .map(|tag| tag.name.clone())
                .unwrap_or_default(),
        })
        .collect()
}

pub fn register(registry: &mut ManagementRegistry) -> Result<(), RegistryError> {
    registry.register_domain(DomainDescriptor {
        name: "categories",
        id: CATEGORIES_DOMAIN_ID,
        actions: vec![
            ActionDescriptor {
                name: "add",
                id: CATEGORY_ACTION_ADD,
            },
            ActionDescriptor {
                name: "list",
                id: CATEGORY_ACTION_LIST,
            },
            ActionDescriptor {
                name: "entry_add",
                id: CATEGORY_ACTION_ENTRY_ADD,
            },
            ActionDescriptor {
                name: "add_ok",
                id: CATEGORY_ACTION_ADD_OK,
            },
            ActionDescriptor {
                name: "add_err",
                id: CATEGORY_ACTION_ADD_ERR,
            },
            ActionDescriptor {
                name: "list_ok",
                id: CATEGORY_ACTION_LIST_OK,
            },
            ActionDescriptor {
                name: "list_err",
                id: CATEGORY_ACTION_LIST_ERR,
            },
            ActionDescriptor {
                name: "entry_add_ok",
                id: CATEGORY_ACTION_ENTRY_ADD_OK,
            },
            ActionDescriptor {
                name: "entry_add_err",
                id: CATEGORY_ACTION_ENTRY_ADD_ERR,
            },
        ],
    })?;

    let handler: ManagementHandler = Arc::new(|request, context| {
        Box::pin(async move { handle_categories_request(request, context).await })
    });
    registry.register_handlers(
        CATEGORIES_DOMAIN_ID,
        &[
            CATEGORY_ACTION_ADD,
            CATEGORY_ACTION_LIST,
            CATEGORY_ACTION_ENTRY_ADD,
        ],
        handler,
    )
}

async fn handle_categories_request(
    request: ManagementRequest,
    context: Arc<ManagementContext>,
) -> DomainResult<ManagementResponse> {
    let request_id = request.request_id;
    match request.command {
        ManagementCommand::Categories(CategoryCommand::Add(payload)) => {
            handle_add(payload, request_id, &context).await
        }
        ManagementCommand::Categories(CategoryCommand::AddEntry(payload)) => {
            handle_add_entry(payload, request_id, &context).await
        }
        ManagementCommand::Categories(CategoryCommand::List(_)) => {
            Ok(handle_list(request_id, &context))
        }
        _ => Ok(response_failure(
            CATEGORY_ACTION_LIST_ERR,
            request_id,
            failure(
                "not_found",
                ManagementErrorKind::NotFound,
                vec!["Invalid category command".to_string()],
            ),
        )),
    }
}

fn rejected(action_id: u32, request_id: u32, operation: &str, failure: FailureResponse) -> ManagementResponse {
    log::warn!(
        "Category {} rejected ({}): {}",
        operation,
        failure.code,
        failure.messages.join("; ")
    );
    response_failure(action_id, request_id, failure)
}

async fn handle_add(
    payload: CategoryAddRequest,
    request_id: u32,
    context: &ManagementContext,
) -> DomainResult<ManagementResponse> {
    let store = context.mapping_store.clone();
    let result = context
        .blocking_pool
        .run_blocking("category add", move || {
            store.transaction(|state| add_category(state, &payload))
        })
        .await
        .map_err(boxed_error)?;
    match result {
        Ok(name) => {
            log::info!("Added tag category '{}'", name);
            Ok(response_ok(
                CATEGORY_ACTION_ADD_OK,
                request_id,
                &format!("Category \"{}\" was added", name),
            ))
        }
        Err(err) => Ok(rejected(
            CATEGORY_ACTION_ADD_ERR,
            request_id,
            "add",
            settle(err, "add"),
        )),
    }
}

async fn handle_add_entry(
    payload: CategoryEntryAddRequest,
    request_id: u32,
    context: &ManagementContext,
) -> DomainResult<ManagementResponse> {
    let store = context.mapping_store.clone();
    let message = format!(
        "Entry \"{}\" was added to category \"{}\"",
        payload.name, payload.category
    );
    let result = context
        .blocking_pool
        .run_blocking("category entry add", move || {
            store.transaction(|state| add_entry(state, &payload))
        })
        .await
        .map_err(boxed_error)?;
    match result {
        Ok(()) => {
            log::info!("{}", message);
            Ok(response_ok(CATEGORY_ACTION_ENTRY_ADD_OK, request_id, &message))
        }
        Err(err) => Ok(rejected(
            CATEGORY_ACTION_ENTRY_ADD_ERR,
            request_id,
            "entry add",
            settle(err, "add"),
        )),
    }
}

fn handle_list(request_id: u32, context: &ManagementContext) -> ManagementResponse {
    match context.mapping_store.snapshot() {
        Ok(state) => ManagementResponse {
            domain_id: CATEGORIES_DOMAIN_ID,
            action_id: CATEGORY_ACTION_LIST_OK,
            request_id,
            payload: crate::management::ResponsePayload::CategoryList(CategoryListResponse {
                categories: summaries(&state),
            }),
        },
        Err(err) => rejected(
            CATEGORY_ACTION_LIST_ERR,
            request_id,
            "list",
            failure(
                "persistence_error",
                ManagementErrorKind::Internal,
                vec![format!("Error during 'list': {}", err)],
            ),
        ),
    }
}

define_domain_responses!(CATEGORIES_DOMAIN_ID);

#[cfg(test)]
mod tests {
    use super::*;

    fn add_request(name: &str, description: &str) -> CategoryAddRequest {
        CategoryAddRequest {
            name: name.to_string(),
            description: description.to_string(),
            single_value: true,
            read_only: false,
        }
    }

    #[test]
    fn add_sanitizes_name_and_lists_tag() {
        let mut state = StoreState::default();
        let name = add_category(&mut state, &add_request("Cost Center", "Cost Center")).unwrap();
        assert_eq!(name, "cost_center");

        let listed = summaries(&state);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].tag, "/managed/cost_center");
        assert_eq!(listed[0].entries, 0);
    }

    #[test]
    fn add_requires_name_and_description() {
        let mut state = StoreState::default();
        let err = add_category(&mut state, &add_request(" ", "")).unwrap_err();
        assert_eq!(err.code, "missing_field");
        assert_eq!(err.messages.len(), 2);
    }

    #[test]
    fn duplicate_name_conflicts_after_sanitizing() {
        let mut state = StoreState::default();
        add_category(&mut state, &add_request("tier", "Tier")).unwrap();
        let err = add_category(&mut state, &add_request("TIER", "Tier again")).unwrap_err();
        assert_eq!(err.kind, ManagementErrorKind::Conflict);
    }

    #[test]
    fn entries_are_unique_within_category() {
        let mut state = StoreState::default();
        add_category(&mut state, &add_request("tier", "Tier")).unwrap();
        let entry = CategoryEntryAddRequest {
            category: "tier".to_string(),
            name: "frontend".to_string(),
            description: "Frontend".to_string(),
        };
        add_entry(&mut state, &entry).unwrap();
        assert_eq!(summaries(&state)[0].entries, 1);
        assert!(
            state
                .tags
                .values()
                .any(|tag| tag.name == "/managed/tier/frontend")
        );

        let err = add_entry(&mut state, &entry).unwrap_err();
        assert_eq!(err.code, "unique_entry");
    }

    #[test]
    fn entry_for_missing_category_is_not_found() {
        let mut state = StoreState::default();
        let err = add_entry(
            &mut state,
            &CategoryEntryAddRequest {
                category: "nope".to_string(),
                name: "x".to_string(),
                description: String::new(),
            },
        )
        .unwrap_err();
        assert_eq!(err.kind, ManagementErrorKind::NotFound);
    }
}
