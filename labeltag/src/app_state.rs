// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::management::{
    ManagementBus, ManagementContext, ManagementError, build_default_registry,
};

pub struct AppState {
    pub management_bus: ManagementBus,
}

impl AppState {
    pub fn new(management_bus: ManagementBus) -> Self {
        Self { management_bus }
    }

    /// Starts a management bus over `context`. Must be called inside a tokio runtime.
    pub fn start(context: ManagementContext) -> Result<Self, ManagementError> {
        let registry = build_default_registry()
            .map_err(|err| ManagementError::internal(err.to_string()))?;
        Ok(Self::new(ManagementBus::start(registry, context)))
    }
}
