//! Invocation analytics.
//!
//! The gateway reports calls through [`InvocationAnalytics::increment_call_count`];
//! the console reads them back as a ranked report. Counting must never block
//! or fail the invocation path, so unknown ids and store failures are logged
//! and dropped.

use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::warn;

use crate::error::RegistryResult;
use crate::model::{InterfaceId, InvocationRank};
use crate::query::{InterfaceFilter, SortField, SortOrder, SortSpec};
use crate::store::{InterfaceStore, StoreError};

#[derive(Clone)]
pub struct InvocationAnalytics {
    store: Arc<dyn InterfaceStore>,
}

impl InvocationAnalytics {
    pub fn new(store: Arc<dyn InterfaceStore>) -> Self {
        Self { store }
    }

    /// Adds `delta` calls to an interface. Failures are logged, not returned.
    pub async fn increment_call_count(&self, id: InterfaceId, delta: u64) {
        match self.store.increment_call_count(id, delta).await {
            Ok(_) => {}
            Err(StoreError::NotFound { .. }) => {
                warn!(id, delta, "Dropping call count for unknown interface");
            }
            Err(err) => {
                warn!(id, delta, error = %err, "Failed to record call count");
            }
        }
    }

    pub async fn reset_call_count(&self, id: InterfaceId) -> RegistryResult<()> {
        self.store.reset_call_count(id).await?;
        Ok(())
    }

    /// Up to `n` interfaces by call count, highest first, ties by id.
    pub async fn top_n(&self, n: i64) -> RegistryResult<Vec<InvocationRank>> {
        if n <= 0 {
            return Ok(Vec::new());
        }
        let limit = usize::try_from(n).unwrap_or(usize::MAX);
        let sort = SortSpec::new(SortField::CallNo, SortOrder::Desc);
        let (records, _) = self
            .store
            .scan(&InterfaceFilter::default(), &sort, 0, limit)
            .await?;
        Ok(records.iter().map(InvocationRank::from).collect())
    }

    /// Sum of call counts over a selection; unknown ids contribute nothing.
    pub async fn total_calls(&self, ids: &BTreeSet<InterfaceId>) -> RegistryResult<u64> {
        let mut total: u64 = 0;
        for id in ids {
            match self.store.get(*id).await {
                Ok(info) => total = total.saturating_add(info.call_no),
                Err(StoreError::NotFound { .. }) => {}
                Err(err) => return Err(err.into()),
            }
        }
        Ok(total)
    }
}
