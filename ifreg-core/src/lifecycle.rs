//! Lifecycle manager for interface records.
//!
//! Two states, `Disabled` (initial) and `Online`, each reachable from the
//! other. The only way to move between them is [`LifecycleManager::online`]
//! or [`LifecycleManager::offline`]; both are idempotent. Generic updates go
//! through [`LifecycleManager::check_update`], which refuses any attempt to
//! change the state as a side effect.

use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{RegistryError, RegistryResult};
use crate::model::{InterfaceId, InterfaceStatus};
use crate::store::InterfaceStore;

/// Outcome of a lifecycle request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Changed {
        from: InterfaceStatus,
        to: InterfaceStatus,
    },
    Unchanged(InterfaceStatus),
}

impl Transition {
    pub fn between(from: InterfaceStatus, to: InterfaceStatus) -> Self {
        if from == to {
            Self::Unchanged(to)
        } else {
            Self::Changed { from, to }
        }
    }

    pub fn is_changed(&self) -> bool {
        matches!(self, Self::Changed { .. })
    }
}

#[derive(Clone)]
pub struct LifecycleManager {
    store: Arc<dyn InterfaceStore>,
}

impl LifecycleManager {
    pub fn new(store: Arc<dyn InterfaceStore>) -> Self {
        Self { store }
    }

    /// `Disabled -> Online`. Already online is a successful no-op.
    pub async fn online(&self, id: InterfaceId) -> RegistryResult<Transition> {
        self.move_to(id, InterfaceStatus::Online).await
    }

    /// `Online -> Disabled`. Already disabled is a successful no-op.
    pub async fn offline(&self, id: InterfaceId) -> RegistryResult<Transition> {
        self.move_to(id, InterfaceStatus::Disabled).await
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn move_to(&self, id: InterfaceId, target: InterfaceStatus) -> RegistryResult<Transition> {
        let previous = self.store.set_status(id, target).await?;
        let transition = Transition::between(previous, target);
        match transition {
            Transition::Changed { from, to } => {
                info!(id, %from, %to, "Interface lifecycle changed");
            }
            Transition::Unchanged(status) => {
                debug!(id, %status, "Interface already in requested state");
            }
        }
        Ok(transition)
    }

    /// Validates the status carried by a generic update.
    ///
    /// A requested status equal to the current one is accepted and ignored;
    /// anything else must go through `online`/`offline`.
    pub fn check_update(
        id: InterfaceId,
        current: InterfaceStatus,
        requested: Option<InterfaceStatus>,
    ) -> RegistryResult<()> {
        match requested {
            Some(status) if status != current => Err(RegistryError::InvalidTransition {
                id,
                message: format!(
                    "update cannot change status from {} to {}; use online/offline",
                    current, status
                ),
            }),
            _ => Ok(()),
        }
    }
}
