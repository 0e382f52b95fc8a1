//! Request-token deduplication for interface creation.
//!
//! A client that retries an add after a lost response sends the same token
//! again. Within the window the retry resolves to the id created by the first
//! attempt instead of inserting a duplicate record.

use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;
use tracing::debug;

use crate::error::{RegistryError, RegistryResult};
use crate::model::{InterfaceFields, InterfaceId};

struct TokenSlot {
    created: Instant,
    outcome: OnceCell<(InterfaceId, InterfaceFields)>,
}

#[derive(Clone)]
pub struct IdempotencyCache {
    slots: Arc<DashMap<String, Arc<TokenSlot>>>,
    window: Duration,
}

impl IdempotencyCache {
    pub fn new(window: Duration) -> Self {
        Self {
            slots: Arc::new(DashMap::new()),
            window,
        }
    }

    /// Runs `create` at most once per live token.
    ///
    /// Concurrent callers with the same token wait for the first one. A
    /// failed `create` leaves the token unused so the next retry runs it
    /// again. A token replayed with different fields is a `DuplicateKey`.
    pub async fn resolve<F, Fut>(
        &self,
        token: &str,
        fields: &InterfaceFields,
        create: F,
    ) -> RegistryResult<InterfaceId>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = RegistryResult<InterfaceId>>,
    {
        self.purge_expired();
        let slot = self
            .slots
            .entry(token.to_string())
            .or_insert_with(|| {
                Arc::new(TokenSlot {
                    created: Instant::now(),
                    outcome: OnceCell::new(),
                })
            })
            .clone();

        let mut created_here = false;
        let flag = &mut created_here;
        let (id, original) = slot
            .outcome
            .get_or_try_init(|| async move {
                *flag = true;
                let id = create().await?;
                Ok::<_, RegistryError>((id, fields.clone()))
            })
            .await?;

        if !created_here && original != fields {
            return Err(RegistryError::DuplicateKey(format!(
                "request token {} was already used for a different interface",
                token
            )));
        }
        if !created_here {
            debug!(token, id, "Replayed add request resolved to existing interface");
        }
        Ok(*id)
    }

    fn purge_expired(&self) {
        let window = self.window;
        self.slots.retain(|_, slot| slot.created.elapsed() < window);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.slots.len()
    }
}
