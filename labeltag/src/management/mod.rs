// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

macro_rules! define_domain_responses {
    ($domain_id:expr) => {
        fn response_ok(
            action_id: u32,
            request_id: u32,
            message: &str,
        ) -> crate::management::ManagementResponse {
            crate::management::ManagementResponse::message(
                $domain_id,
                action_id,
                request_id,
                message,
            )
            .unwrap_or_else(|err| {
                log::warn!("Response message rejected: {}", err);
                crate::management::ManagementResponse {
                    domain_id: $domain_id,
                    action_id,
                    request_id,
                    payload: crate::management::ResponsePayload::Message(
                        crate::management::MessageResponse {
                            message: "OK".to_string(),
                        },
                    ),
                }
            })
        }

        fn response_failure(
            action_id: u32,
            request_id: u32,
            failure: crate::management::FailureResponse,
        ) -> crate::management::ManagementResponse {
            crate::management::ManagementResponse {
                domain_id: $domain_id,
                action_id,
                request_id,
                payload: crate::management::ResponsePayload::Failure(failure),
            }
        }
    };
}

mod blocking;
mod bus;
pub mod categories;
pub mod cli;
pub mod cli_helper;
mod core;
mod errors;
mod limits;
pub mod mappings;
mod registry;
mod store;
mod yaml_store;

pub use blocking::{BlockingError, BlockingPool};
pub use bus::ManagementBus;
pub use categories::{CategoryCommand, CategoryListResponse, CategorySummary};
pub use core::{
    FailureResponse, ManagementCommand, ManagementContext, ManagementRequest, ManagementResponse,
    MessageResponse, RequestOrigin, ResponsePayload,
};
pub use errors::{DomainError, DomainResult, ManagementError, ManagementErrorKind};
pub use limits::LimitError;
pub use mappings::{
    EditSession, EntityOption, EntityOptionsResponse, FormChanges, MappingCommand, MappingError,
    MappingErrorKind, MappingForm, MappingListResponse, MappingShowResponse, MappingSummary,
};
pub use registry::{
    ActionDescriptor, DomainActionKey, DomainDescriptor, ManagementHandler, ManagementRegistry,
    RegistryError,
};
pub use store::{RecordId, STORE_FILE_NAME, StoreError, StoreState};

pub fn build_default_registry() -> Result<ManagementRegistry, RegistryError> {
    let mut registry = ManagementRegistry::new();
    mappings::register(&mut registry)?;
    categories::register(&mut registry)?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_routes_every_request_action() {
        let registry = build_default_registry().expect("registry");
        for action_id in [1, 2, 3, 4, 5, 6] {
            let key = DomainActionKey::new(mappings::MAPPINGS_DOMAIN_ID, action_id);
            assert!(registry.handler(&key).is_some(), "mapping action {}", action_id);
        }
        for action_id in [1, 4, 6] {
            let key = DomainActionKey::new(categories::CATEGORIES_DOMAIN_ID, action_id);
            assert!(registry.handler(&key).is_some(), "category action {}", action_id);
        }
        assert_eq!(
            registry.describe(&DomainActionKey::new(mappings::MAPPINGS_DOMAIN_ID, 102)),
            "mappings.add_err"
        );
    }
}
