//! Bulk operations coordinator.
//!
//! A bulk delete is a set of independent single-record deletes. Each id gets
//! its own outcome; one failure neither aborts nor rolls back the others.

use futures::StreamExt;
use futures::stream;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use tracing::debug;
use utoipa::ToSchema;

use crate::error::{ErrorKind, RegistryError, RegistryResult};
use crate::model::InterfaceId;

/// Why one item of a bulk operation failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&RegistryError> for BulkFailure {
    fn from(err: &RegistryError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteResult {
    pub succeeded: BTreeSet<InterfaceId>,
    pub failed: BTreeMap<InterfaceId, BulkFailure>,
}

impl BulkDeleteResult {
    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BulkCoordinator {
    concurrency: usize,
}

impl BulkCoordinator {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    /// Runs `delete` once per distinct id with at most `concurrency` calls in
    /// flight, collecting every outcome.
    pub async fn delete_all<I, F, Fut>(&self, ids: I, delete: F) -> BulkDeleteResult
    where
        I: IntoIterator<Item = InterfaceId>,
        F: Fn(InterfaceId) -> Fut,
        Fut: Future<Output = RegistryResult<()>>,
    {
        let ids: BTreeSet<InterfaceId> = ids.into_iter().collect();
        let mut result = BulkDeleteResult::default();
        if ids.is_empty() {
            return result;
        }

        let count = ids.len();
        let mut outcomes = stream::iter(ids)
            .map(|id| {
                let fut = delete(id);
                async move { (id, fut.await) }
            })
            .buffer_unordered(self.concurrency);

        while let Some((id, outcome)) = outcomes.next().await {
            match outcome {
                Ok(()) => {
                    result.succeeded.insert(id);
                }
                Err(err) => {
                    debug!(id, error = %err, "Bulk delete item failed");
                    result.failed.insert(id, BulkFailure::from(&err));
                }
            }
        }

        debug!(
            requested = count,
            succeeded = result.succeeded.len(),
            failed = result.failed.len(),
            "Bulk delete finished"
        );
        result
    }
}
