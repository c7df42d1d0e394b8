// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::management::core::{
    ManagementCommand, ManagementContext, ManagementRequest, ManagementResponse, RequestOrigin,
};
use crate::management::errors::{DomainError, DomainResult, ManagementError, ManagementErrorKind};
use crate::management::registry::{DomainActionKey, ManagementRegistry};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::{mpsc, oneshot};

const BUS_CHANNEL_DEPTH: usize = 64;

/// Single consumer task that runs management requests one at a time.
#[derive(Clone)]
pub struct ManagementBus {
    sender: mpsc::Sender<BusMessage>,
    registry: Arc<ManagementRegistry>,
    next_request_id: Arc<AtomicU32>,
}

struct BusMessage {
    request: ManagementRequest,
    reply: oneshot::Sender<Result<ManagementResponse, ManagementError>>,
}

impl ManagementBus {
    pub fn start(registry: ManagementRegistry, context: ManagementContext) -> Self {
        let (sender, mut receiver) = mpsc::channel::<BusMessage>(BUS_CHANNEL_DEPTH);
        let registry = Arc::new(registry);
        let registry_for_task = registry.clone();
        let context = Arc::new(context);

        tokio::spawn(async move {
            while let Some(message) = receiver.recv().await {
                let result = dispatch(&registry_for_task, &context, message.request).await;
                let _ = message.reply.send(result);
            }
            log::debug!("Management bus stopped");
        });

        Self {
            sender,
            registry,
            next_request_id: Arc::new(AtomicU32::new(1)),
        }
    }

    pub fn registry(&self) -> Arc<ManagementRegistry> {
        self.registry.clone()
    }

    pub async fn send(
        &self,
        origin: RequestOrigin,
        command: ManagementCommand,
    ) -> Result<ManagementResponse, ManagementError> {
        let request_id = self.allocate_request_id();
        self.send_request(ManagementRequest {
            request_id,
            origin,
            command,
        })
        .await
    }

    pub async fn send_request(
        &self,
        request: ManagementRequest,
    ) -> Result<ManagementResponse, ManagementError> {
        if request.request_id == 0 {
            return Err(ManagementError::new(
                ManagementErrorKind::Validation,
                None,
                None,
                "request_id must be non-zero",
            ));
        }
        let (reply_tx, reply_rx) = oneshot::channel();
        let message = BusMessage {
            request,
            reply: reply_tx,
        };

        self.sender
            .send(message)
            .await
            .map_err(|_| ManagementError::internal("Management bus is unavailable"))?;

        reply_rx
            .await
            .map_err(|_| ManagementError::internal("Management bus dropped response"))?
    }

    fn allocate_request_id(&self) -> u32 {
        loop {
            let id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
            if id != 0 {
                return id;
            }
        }
    }
}

async fn dispatch(
    registry: &Arc<ManagementRegistry>,
    context: &Arc<ManagementContext>,
    request: ManagementRequest,
) -> Result<ManagementResponse, ManagementError> {
    let key = DomainActionKey::new(request.domain_id(), request.action_id());
    log::trace!(
        "Management bus request {} ({}, request_id={})",
        registry.describe(&key),
        request.origin,
        request.request_id
    );
    let handler = registry.handler(&key).ok_or_else(|| {
        ManagementError::new(
            ManagementErrorKind::NotFound,
            Some(key.domain_id),
            Some(key.action_id),
            "No handler registered for command",
        )
    })?;
    request.command.validate_limits().map_err(|err| {
        ManagementError::new(
            ManagementErrorKind::Validation,
            Some(key.domain_id),
            Some(key.action_id),
            err.to_string(),
        )
    })?;

    let result: DomainResult<ManagementResponse> = handler(request, context.clone()).await;
    let response = result.map_err(|err| normalize_error(err.as_ref(), key.domain_id, key.action_id))?;
    log::trace!(
        "Management bus response {}",
        registry.describe(&DomainActionKey::new(response.domain_id, response.action_id))
    );
    Ok(response)
}

fn normalize_error(err: &dyn DomainError, domain_id: u32, action_id: u32) -> ManagementError {
    ManagementError::new(
        err.kind(),
        Some(domain_id),
        Some(action_id),
        err.to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::management::mappings::{
        MAPPING_ACTION_ADD_OK, MAPPING_ACTION_LIST_OK, MAPPINGS_DOMAIN_ID, MappingAddRequest,
        MappingListRequest,
    };
    use crate::management::{MappingCommand, ResponsePayload, build_default_registry};
    use crate::util::test_fixtures::TestFixtureRoot;

    fn start_bus(fixture: &TestFixtureRoot) -> ManagementBus {
        let runtime_paths = fixture.runtime_paths().unwrap();
        let context = ManagementContext::new(&runtime_paths).expect("context");
        ManagementBus::start(build_default_registry().expect("registry"), context)
    }

    #[tokio::test]
    async fn bus_dispatches_add_then_list() {
        let fixture = TestFixtureRoot::new_unique("bus-add-list").unwrap();
        let bus = start_bus(&fixture);

        let added = bus
            .send(
                RequestOrigin::Cli,
                ManagementCommand::Mappings(MappingCommand::Add(MappingAddRequest {
                    entity: Some("ContainerNode".to_string()),
                    label_name: "app".to_string(),
                    category: "App Label".to_string(),
                })),
            )
            .await
            .expect("add response");
        assert_eq!(added.domain_id, MAPPINGS_DOMAIN_ID);
        assert_eq!(added.action_id, MAPPING_ACTION_ADD_OK);

        let listed = bus
            .send(
                RequestOrigin::Cli,
                ManagementCommand::Mappings(MappingCommand::List(MappingListRequest {})),
            )
            .await
            .expect("list response");
        assert_eq!(listed.action_id, MAPPING_ACTION_LIST_OK);
        assert!(listed.request_id > added.request_id);
        match listed.payload {
            ResponsePayload::MappingList(list) => {
                assert_eq!(list.mappings.len(), 1);
                assert_eq!(list.mappings[0].entity, "Container Node");
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[tokio::test]
    async fn bus_rejects_zero_request_id() {
        let fixture = TestFixtureRoot::new_unique("bus-zero-id").unwrap();
        let bus = start_bus(&fixture);
        let err = bus
            .send_request(ManagementRequest {
                request_id: 0,
                origin: RequestOrigin::Http,
                command: ManagementCommand::Mappings(MappingCommand::List(MappingListRequest {})),
            })
            .await
            .expect_err("zero id rejected");
        assert_eq!(err.kind(), ManagementErrorKind::Validation);
    }

    #[tokio::test]
    async fn bus_enforces_field_limits() {
        let fixture = TestFixtureRoot::new_unique("bus-limits").unwrap();
        let bus = start_bus(&fixture);
        let err = bus
            .send(
                RequestOrigin::Http,
                ManagementCommand::Mappings(MappingCommand::Add(MappingAddRequest {
                    entity: None,
                    label_name: "x".repeat(400),
                    category: "Tier".to_string(),
                })),
            )
            .await
            .expect_err("oversized label rejected");
        assert_eq!(err.kind(), ManagementErrorKind::Validation);
        assert!(err.message().contains("Label name"));
    }
}
