// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::entities::{BuiltinDisplayNames, DisplayNames};
use crate::management::blocking::BlockingPool;
use crate::management::categories::{CATEGORIES_DOMAIN_ID, CategoryCommand, CategoryListResponse};
use crate::management::errors::{ManagementError, ManagementErrorKind};
use crate::management::limits::LimitError;
use crate::management::mappings::{
    EntityOptionsResponse, MAPPINGS_DOMAIN_ID, MappingCommand, MappingListResponse,
    MappingShowResponse,
};
use crate::management::store::MappingStore;
use crate::runtime_paths::RuntimePaths;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

const MAX_MESSAGE_CHARS: usize = 1024;

#[derive(Clone)]
pub struct ManagementContext {
    pub blocking_pool: BlockingPool,
    pub display_names: Arc<dyn DisplayNames>,
    pub(crate) mapping_store: Arc<MappingStore>,
}

impl ManagementContext {
    /// Opens the mapping store under `state/sys` of an already laid out runtime root.
    pub fn new(runtime_paths: &RuntimePaths) -> Result<Self, ManagementError> {
        let mapping_store = MappingStore::new(runtime_paths.state_sys_dir.clone())
            .map(Arc::new)
            .map_err(|err| ManagementError::internal(format!("Mapping store error: {}", err)))?;
        Ok(Self {
            blocking_pool: BlockingPool::default_pool(),
            display_names: Arc::new(BuiltinDisplayNames),
            mapping_store,
        })
    }

    pub fn from_runtime_root(root: &Path) -> Result<Self, ManagementError> {
        let bootstrap = crate::bootstrap::bootstrap_runtime(root)
            .map_err(|err| ManagementError::internal(format!("Bootstrap error: {}", err)))?;
        Self::new(&bootstrap.runtime_paths)
    }

    pub fn with_display_names(mut self, display_names: Arc<dyn DisplayNames>) -> Self {
        self.display_names = display_names;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOrigin {
    Cli,
    Http,
}

impl fmt::Display for RequestOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestOrigin::Cli => write!(f, "cli"),
            RequestOrigin::Http => write!(f, "http"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ManagementCommand {
    Mappings(MappingCommand),
    Categories(CategoryCommand),
}

impl ManagementCommand {
    pub fn domain_id(&self) -> u32 {
        match self {
            ManagementCommand::Mappings(_) => MAPPINGS_DOMAIN_ID,
            ManagementCommand::Categories(_) => CATEGORIES_DOMAIN_ID,
        }
    }

    pub fn action_id(&self) -> u32 {
        match self {
            ManagementCommand::Mappings(command) => command.action_id(),
            ManagementCommand::Categories(command) => command.action_id(),
        }
    }

    /// Rejects oversized fields before the command reaches a handler.
    pub fn validate_limits(&self) -> Result<(), LimitError> {
        match self {
            ManagementCommand::Mappings(command) => command.validate_limits(),
            ManagementCommand::Categories(command) => command.validate_limits(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ManagementRequest {
    pub request_id: u32,
    pub origin: RequestOrigin,
    pub command: ManagementCommand,
}

impl ManagementRequest {
    pub fn domain_id(&self) -> u32 {
        self.command.domain_id()
    }

    pub fn action_id(&self) -> u32 {
        self.command.action_id()
    }
}

#[derive(Debug, Clone)]
pub struct ManagementResponse {
    pub domain_id: u32,
    pub action_id: u32,
    pub request_id: u32,
    pub payload: ResponsePayload,
}

impl ManagementResponse {
    pub fn message(
        domain_id: u32,
        action_id: u32,
        request_id: u32,
        message: impl Into<String>,
    ) -> Result<Self, ManagementError> {
        let payload = ResponsePayload::Message(MessageResponse::new(message)?);
        Ok(Self {
            domain_id,
            action_id,
            request_id,
            payload,
        })
    }

    pub fn failure(&self) -> Option<&FailureResponse> {
        match &self.payload {
            ResponsePayload::Failure(failure) => Some(failure),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ResponsePayload {
    Message(MessageResponse),
    Failure(FailureResponse),
    MappingList(MappingListResponse),
    MappingShow(MappingShowResponse),
    EntityOptions(EntityOptionsResponse),
    CategoryList(CategoryListResponse),
}

#[derive(Debug, Clone, Serialize, serde::Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Result<Self, ManagementError> {
        let message = message.into();
        let message_len = message.chars().count();
        if message_len > MAX_MESSAGE_CHARS {
            return Err(ManagementError::new(
                ManagementErrorKind::Validation,
                None,
                None,
                format!(
                    "Message exceeds {} characters (got {})",
                    MAX_MESSAGE_CHARS, message_len
                ),
            ));
        }
        Ok(Self { message })
    }
}

/// A rejected request: a stable error code plus every user-facing message.
#[derive(Debug, Clone, Serialize)]
pub struct FailureResponse {
    #[serde(rename = "error")]
    pub code: &'static str,
    #[serde(skip)]
    pub kind: ManagementErrorKind,
    pub messages: Vec<String>,
}
