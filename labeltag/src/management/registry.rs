// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::management::core::{ManagementContext, ManagementRequest, ManagementResponse};
use crate::management::errors::DomainResult;
use futures_util::future::BoxFuture;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DomainActionKey {
    pub domain_id: u32,
    pub action_id: u32,
}

impl DomainActionKey {
    pub fn new(domain_id: u32, action_id: u32) -> Self {
        Self {
            domain_id,
            action_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ActionDescriptor {
    pub name: &'static str,
    pub id: u32,
}

#[derive(Debug, Clone)]
pub struct DomainDescriptor {
    pub name: &'static str,
    pub id: u32,
    pub actions: Vec<ActionDescriptor>,
}

#[derive(Debug)]
pub struct RegistryError {
    message: String,
}

impl RegistryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "registry error: {}", self.message)
    }
}

impl Error for RegistryError {}

pub type ManagementHandler = Arc<
    dyn Fn(
            ManagementRequest,
            Arc<ManagementContext>,
        ) -> BoxFuture<'static, DomainResult<ManagementResponse>>
        + Send
        + Sync,
>;

#[derive(Default)]
pub struct ManagementRegistry {
    handlers: BTreeMap<DomainActionKey, ManagementHandler>,
    domains: BTreeMap<u32, DomainDescriptor>,
}

impl ManagementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_domain(&mut self, domain: DomainDescriptor) -> Result<(), RegistryError> {
        if self.domains.contains_key(&domain.id) {
            return Err(RegistryError::new(format!(
                "Domain ID {} already registered",
                domain.id
            )));
        }
        self.domains.insert(domain.id, domain);
        Ok(())
    }

    pub fn domains(&self) -> Vec<DomainDescriptor> {
        self.domains.values().cloned().collect()
    }

    pub fn register_handler(
        &mut self,
        key: DomainActionKey,
        handler: ManagementHandler,
    ) -> Result<(), RegistryError> {
        let domain = self.domains.get(&key.domain_id).ok_or_else(|| {
            RegistryError::new(format!(
                "Domain {} must be registered before its handlers",
                key.domain_id
            ))
        })?;
        if !domain.actions.iter().any(|action| action.id == key.action_id) {
            return Err(RegistryError::new(format!(
                "Action {} is not declared by domain '{}'",
                key.action_id, domain.name
            )));
        }
        if self.handlers.contains_key(&key) {
            return Err(RegistryError::new(format!(
                "Handler already registered for domain {} action {}",
                key.domain_id, key.action_id
            )));
        }
        self.handlers.insert(key, handler);
        Ok(())
    }

    /// Registers one handler for several request actions of a domain.
    pub fn register_handlers(
        &mut self,
        domain_id: u32,
        action_ids: &[u32],
        handler: ManagementHandler,
    ) -> Result<(), RegistryError> {
        for action_id in action_ids {
            self.register_handler(DomainActionKey::new(domain_id, *action_id), handler.clone())?;
        }
        Ok(())
    }

    pub fn handler(&self, key: &DomainActionKey) -> Option<&ManagementHandler> {
        self.handlers.get(key)
    }

    /// `domain.action` for log lines, falling back to the raw ids.
    pub fn describe(&self, key: &DomainActionKey) -> String {
        let Some(domain) = self.domains.get(&key.domain_id) else {
            return format!("{}.{}", key.domain_id, key.action_id);
        };
        match domain.actions.iter().find(|action| action.id == key.action_id) {
            Some(action) => format!("{}.{}", domain.name, action.name),
            None => format!("{}.{}", domain.name, key.action_id),
        }
    }
}
