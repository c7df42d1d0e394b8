// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::management::errors::{DomainError, ManagementErrorKind};
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

const DEFAULT_BLOCKING_WORKERS: usize = 2;
const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
pub struct BlockingError {
    context: &'static str,
    message: String,
    kind: ManagementErrorKind,
}

impl BlockingError {
    pub fn kind(&self) -> ManagementErrorKind {
        self.kind
    }
}

impl fmt::Display for BlockingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.context, self.message)
    }
}

impl Error for BlockingError {}

impl DomainError for BlockingError {
    fn kind(&self) -> ManagementErrorKind {
        self.kind
    }
}

/// Bounded pool for store writes. Callers wait up to `acquire_timeout` for a
/// slot and get `Busy` after that.
#[derive(Clone)]
pub struct BlockingPool {
    permits: Arc<Semaphore>,
    acquire_timeout: Duration,
}

impl BlockingPool {
    pub fn new(workers: usize, acquire_timeout: Duration) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(workers.max(1))),
            acquire_timeout,
        }
    }

    pub fn default_pool() -> Self {
        Self::new(DEFAULT_BLOCKING_WORKERS, DEFAULT_ACQUIRE_TIMEOUT)
    }

    pub async fn run_blocking<F, R>(
        &self,
        context: &'static str,
        task: F,
    ) -> Result<R, BlockingError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let permit =
            match tokio::time::timeout(self.acquire_timeout, self.permits.clone().acquire_owned())
                .await
            {
                Ok(Ok(permit)) => permit,
                Ok(Err(_)) => {
                    return Err(BlockingError {
                        context,
                        message: "blocking pool closed".to_string(),
                        kind: ManagementErrorKind::Internal,
                    });
                }
                Err(_) => {
                    log::warn!("Blocking pool saturated for {}", context);
                    return Err(BlockingError {
                        context,
                        message: "blocking pool saturated".to_string(),
                        kind: ManagementErrorKind::Busy,
                    });
                }
            };

        let result = tokio::task::spawn_blocking(task).await;
        drop(permit);
        result.map_err(|err| BlockingError {
            context,
            message: format!("blocking task failed: {}", err),
            kind: ManagementErrorKind::Internal,
        })
    }
}
