// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

//! Mapping rules over a [`StoreState`].
//!
//! Every function here runs inside one store transaction: checks read the
//! same working copy the writes go to, and any `Err` discards the copy.

use crate::entities::{self, DisplayNames};
use crate::management::core::FailureResponse;
use crate::management::errors::{DomainError, ManagementErrorKind};
use crate::management::mappings::{
    EntityOption, MappingAddRequest, MappingShowResponse, MappingSummary, MappingUpdateRequest,
};
use crate::management::store::{RecordId, StoreError, StoreState};
use std::fmt;

pub const MAPPING_NAME: &str = "Container Label Tag Mapping";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingErrorKind {
    MissingField,
    InvalidEntity,
    UniqueMapping,
    TagNotFound,
    NotFound,
    Persistence,
}

impl MappingErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            MappingErrorKind::MissingField => "missing_field",
            MappingErrorKind::InvalidEntity => "invalid_entity",
            MappingErrorKind::UniqueMapping => "unique_mapping",
            MappingErrorKind::TagNotFound => "tag_not_found",
            MappingErrorKind::NotFound => "not_found",
            MappingErrorKind::Persistence => "persistence_error",
        }
    }

    fn management_kind(self) -> ManagementErrorKind {
        match self {
            MappingErrorKind::MissingField
            | MappingErrorKind::InvalidEntity
            | MappingErrorKind::TagNotFound => ManagementErrorKind::Validation,
            MappingErrorKind::UniqueMapping => ManagementErrorKind::Conflict,
            MappingErrorKind::NotFound => ManagementErrorKind::NotFound,
            MappingErrorKind::Persistence => ManagementErrorKind::Internal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingError {
    kind: MappingErrorKind,
    messages: Vec<String>,
}

impl MappingError {
    pub fn new(kind: MappingErrorKind, messages: Vec<String>) -> Self {
        Self { kind, messages }
    }

    pub fn single(kind: MappingErrorKind, message: impl Into<String>) -> Self {
        Self::new(kind, vec![message.into()])
    }

    /// `Error during '<operation>': <cause>`.
    pub fn persistence(operation: &str, cause: impl fmt::Display) -> Self {
        Self::single(
            MappingErrorKind::Persistence,
            format!("Error during '{}': {}", operation, cause),
        )
    }

    pub fn not_found(id: RecordId) -> Self {
        Self::single(
            MappingErrorKind::NotFound,
            format!("{} {} not found", MAPPING_NAME, id),
        )
    }

    pub fn kind(&self) -> MappingErrorKind {
        self.kind
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn to_failure(&self) -> FailureResponse {
        FailureResponse {
            code: self.kind.code(),
            kind: self.kind.management_kind(),
            messages: self.messages.clone(),
        }
    }
}

impl fmt::Display for MappingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.messages.join("; "))
    }
}

impl std::error::Error for MappingError {}

impl DomainError for MappingError {
    fn kind(&self) -> ManagementErrorKind {
        self.kind.management_kind()
    }
}

fn unique_mapping(entity_name: &str, label: &str, description: &str) -> MappingError {
    MappingError::single(
        MappingErrorKind::UniqueMapping,
        format!(
            "Mapping for \"{}\", Label \"{}\" and Tag Category \"{}\" already exists",
            entity_name, label, description
        ),
    )
}

fn tag_not_found(entity_name: &str, label: &str, description: &str) -> MappingError {
    MappingError::single(
        MappingErrorKind::TagNotFound,
        format!(
            "Mapping for \"{}\", Label \"{}\": Tag Category \"{}\" must exist",
            entity_name, label, description
        ),
    )
}

pub(crate) fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Reports every blank required field at once.
pub(crate) fn require_fields(label_name: &str, category: &str) -> Result<(), MappingError> {
    let mut missing = Vec::new();
    if is_blank(label_name) {
        missing.push("Label is required".to_string());
    }
    if is_blank(category) {
        missing.push("Category is required".to_string());
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(MappingError::new(MappingErrorKind::MissingField, missing))
    }
}

pub(crate) fn list(state: &StoreState, names: &dyn DisplayNames) -> Vec<MappingSummary> {
    state
        .mappings
        .iter()
        .filter(|(_, mapping)| mapping.label_value.is_none())
        .map(|(id, mapping)| MappingSummary {
            id: *id,
            entity: entities::display_name(mapping.entity.as_deref(), names),
            entity_key: mapping.entity.clone(),
            label_name: mapping.label_name.clone(),
            category: state
                .category_for_tag(mapping.tag_id)
                .map(|(_, category)| category.description.clone())
                .unwrap_or_default(),
        })
        .collect()
}

pub(crate) fn show(
    state: &StoreState,
    id: RecordId,
    names: &dyn DisplayNames,
) -> Result<MappingShowResponse, MappingError> {
    let mapping = state.mapping(id).ok_or_else(|| MappingError::not_found(id))?;
    let (_, category) = state.category_for_tag(mapping.tag_id).ok_or_else(|| {
        MappingError::single(
            MappingErrorKind::NotFound,
            format!("Tag category of {} {} not found", MAPPING_NAME, id),
        )
    })?;
    Ok(MappingShowResponse {
        id,
        entity: entities::display_name(mapping.entity.as_deref(), names),
        entity_key: mapping.entity.clone(),
        label_name: mapping.label_name.clone(),
        category_name: category.name.clone(),
        category: category.description.clone(),
    })
}

pub(crate) fn entity_options(names: &dyn DisplayNames) -> Vec<EntityOption> {
    entities::entity_options(names)
        .into_iter()
        .map(|(name, key)| EntityOption { name, key })
        .collect()
}

enum AddTarget {
    ExistingTag(RecordId),
    NewCategory(String),
}

/// Adds a mapping, creating its category unless the entity is "all entities".
pub(crate) fn add(
    state: &mut StoreState,
    request: &MappingAddRequest,
    names: &dyn DisplayNames,
) -> Result<RecordId, MappingError> {
    require_fields(&request.label_name, &request.category)?;
    // A blank entity selects the default entity, as the form and the CLI do.
    let entity_key = request.entity.as_deref().filter(|key| !is_blank(key));
    let entity = entities::lookup(entity_key)
        .map_err(|err| MappingError::single(MappingErrorKind::InvalidEntity, err.to_string()))?;
    let label = request.label_name.as_str();
    let description = request.category.as_str();
    let entity_name = entities::display_name(entity_key, names);
    let label_taken = state.has_mapping_for_label(label);

    let target = if entity.is_all_entities() {
        // Categories for "all entities" are chosen by name and must pre-exist.
        let tag_id = state
            .category_by_name(description)
            .map(|(_, category)| category.tag_id)
            .ok_or_else(|| tag_not_found(&entity_name, label, description))?;
        if label_taken {
            return Err(unique_mapping(&entity_name, label, description));
        }
        AddTarget::ExistingTag(tag_id)
    } else {
        let category_name = entities::category_name_from_label(entity, label).map_err(|err| {
            MappingError::single(MappingErrorKind::InvalidEntity, err.to_string())
        })?;
        if label_taken
            || state.mapped_category_by_description(description).is_some()
            || state.category_by_name(&category_name).is_some()
        {
            return Err(unique_mapping(&entity_name, label, description));
        }
        AddTarget::NewCategory(category_name)
    };

    let tag_id = match target {
        AddTarget::ExistingTag(tag_id) => tag_id,
        AddTarget::NewCategory(name) => {
            let category_id = state
                .create_category(&name, description, true, true)
                .map_err(|err| MappingError::persistence("add", err))?;
            state
                .category(category_id)
                .map(|category| category.tag_id)
                .ok_or_else(|| MappingError::persistence("add", "category was not created"))?
        }
    };
    state
        .create_mapping(entity_key, label, tag_id)
        .map_err(|err| MappingError::persistence("add", err))
}

/// Changes the category a mapping tracks. Returns the mapping's label name.
pub(crate) fn update(
    state: &mut StoreState,
    request: &MappingUpdateRequest,
    names: &dyn DisplayNames,
) -> Result<String, MappingError> {
    let mapping = state
        .mapping(request.id)
        .cloned()
        .ok_or_else(|| MappingError::not_found(request.id))?;
    if is_blank(&request.category) {
        return Err(MappingError::single(
            MappingErrorKind::MissingField,
            "Category is required",
        ));
    }
    let description = request.category.as_str();

    if entities::is_all_entities(mapping.entity.as_deref()) {
        let tag_id = state
            .category_by_name(description)
            .map(|(_, category)| category.tag_id)
            .ok_or_else(|| {
                let entity_name = entities::display_name(mapping.entity.as_deref(), names);
                tag_not_found(&entity_name, &mapping.label_name, description)
            })?;
        state
            .retag_mapping(request.id, tag_id)
            .map_err(|err| MappingError::persistence("save", err))?;
    } else {
        let category_id = state
            .category_for_tag(mapping.tag_id)
            .map(|(id, _)| id)
            .ok_or_else(|| MappingError::persistence("save", "Tag category not found"))?;
        state
            .update_category_description(category_id, description)
            .map_err(|err| MappingError::persistence("save", err))?;
    }
    Ok(mapping.label_name)
}

/// Outcome of a delete: the mapping's label plus the labels of "all entities"
/// mappings that were bound to its category and went with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DeletedMapping {
    pub label_name: String,
    pub detached: Vec<String>,
}

/// Deletes a mapping and, unless it targets "all entities", the category it owns.
/// Other mappings bound to that category are deleted in the same unit of work.
pub(crate) fn delete(state: &mut StoreState, id: RecordId) -> Result<DeletedMapping, MappingError> {
    let mapping = state
        .mapping(id)
        .cloned()
        .ok_or_else(|| MappingError::not_found(id))?;
    let category_id = state.category_for_tag(mapping.tag_id).map(|(id, _)| id);

    let mut messages = Vec::new();
    let mut detached = Vec::new();
    if let Err(err) = state.delete_mapping(id) {
        messages.push(field_message("Mapping", &err));
    }
    if !entities::is_all_entities(mapping.entity.as_deref()) {
        match category_id {
            Some(category_id) => {
                for dependent in state.mappings_for_category(category_id) {
                    match state.delete_mapping(dependent) {
                        Ok(removed) => detached.push(removed.label_name),
                        Err(err) => messages.push(field_message("Mapping", &err)),
                    }
                }
                if let Err(err) = state.delete_category(category_id) {
                    messages.push(field_message("Category", &err));
                }
            }
            None => messages.push("Category not found".to_string()),
        }
    }
    if !messages.is_empty() {
        return Err(MappingError::new(MappingErrorKind::Persistence, messages));
    }
    Ok(DeletedMapping {
        label_name: mapping.label_name,
        detached,
    })
}

fn field_message(field: &str, err: &StoreError) -> String {
    format!("{} {}", field, err.message())
}
