//! Per-caller grants on interfaces.
//!
//! A [`UserInterfaceInfo`] records that one caller may invoke one interface,
//! how many calls it has made and how many it has left. Callers are opaque
//! numeric ids; authenticating them is the gateway's job.
//!
//! Invoking through a grant charges the grant and feeds the interface's
//! call count, so the top-invocations report reflects grant traffic.

mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::error::{RegistryError, RegistryResult};
use crate::model::{InterfaceId, InterfaceStatus, StatusWire};
use crate::query::{Page, PageRequest};
use crate::store::InterfaceStore;

pub use store::{Consumption, GrantStore};

pub type UserId = u64;
pub type GrantId = u64;

/// Whether a grant may be used.
///
/// Serialized by name; input also accepts the console codes `0` for
/// `Normal` and `1` for `Banned`.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case", try_from = "StatusWire")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum GrantStatus {
    #[default]
    Normal,
    Banned,
}

impl TryFrom<StatusWire> for GrantStatus {
    type Error = String;

    fn try_from(value: StatusWire) -> Result<Self, Self::Error> {
        match value {
            StatusWire::Code(0) => Ok(Self::Normal),
            StatusWire::Code(1) => Ok(Self::Banned),
            StatusWire::Code(code) => Err(format!("unknown grant status code {}", code)),
            StatusWire::Name(name) => name
                .parse()
                .map_err(|_| format!("unknown grant status {}", name)),
        }
    }
}

/// One caller's grant on one interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserInterfaceInfo {
    pub id: GrantId,
    pub user_id: UserId,
    pub interface_info_id: InterfaceId,
    /// Calls made through this grant.
    pub total_num: u64,
    /// Calls still allowed.
    pub left_num: u64,
    pub status: GrantStatus,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddUserInterfaceRequest {
    pub user_id: UserId,
    pub interface_info_id: InterfaceId,
    #[serde(default)]
    pub left_num: u64,
}

/// Partial update of a grant. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserInterfacePatch {
    #[serde(default)]
    pub left_num: Option<u64>,
    #[serde(default)]
    pub status: Option<GrantStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserInterfaceFilter {
    #[serde(default)]
    pub id: Option<GrantId>,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub interface_info_id: Option<InterfaceId>,
    #[serde(default)]
    pub status: Option<GrantStatus>,
}

impl UserInterfaceFilter {
    pub fn matches(&self, grant: &UserInterfaceInfo) -> bool {
        self.id.is_none_or(|id| id == grant.id)
            && self.user_id.is_none_or(|user| user == grant.user_id)
            && self
                .interface_info_id
                .is_none_or(|interface| interface == grant.interface_info_id)
            && self.status.is_none_or(|status| status == grant.status)
    }
}

/// Listing request for grants, in ascending id order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserInterfaceQuery {
    #[serde(default)]
    pub filter: UserInterfaceFilter,
    pub page: PageRequest,
}

impl UserInterfaceQuery {
    pub fn page(page_size: u64, page_number: u64) -> Self {
        Self {
            filter: UserInterfaceFilter::default(),
            page: PageRequest::new(page_size, page_number),
        }
    }

    pub fn with_filter(mut self, filter: UserInterfaceFilter) -> Self {
        self.filter = filter;
        self
    }
}

/// Grant bookkeeping over the grant store and the interface store.
#[derive(Clone)]
pub struct UserInterfaceLedger {
    grants: GrantStore,
    interfaces: Arc<dyn InterfaceStore>,
}

impl UserInterfaceLedger {
    pub fn new(grants: GrantStore, interfaces: Arc<dyn InterfaceStore>) -> Self {
        Self { grants, interfaces }
    }

    /// Creates a grant. The interface must exist and the caller must not
    /// already hold a grant for it.
    pub async fn add(
        &self,
        request: AddUserInterfaceRequest,
    ) -> RegistryResult<UserInterfaceInfo> {
        self.interfaces.get(request.interface_info_id).await?;
        let grant = self.grants.insert(request).await?;
        info!(
            id = grant.id,
            user_id = grant.user_id,
            interface_id = grant.interface_info_id,
            left = grant.left_num,
            "Grant created"
        );
        Ok(grant)
    }

    pub fn get(&self, id: GrantId) -> RegistryResult<UserInterfaceInfo> {
        self.grants.get(id)
    }

    pub async fn update(
        &self,
        id: GrantId,
        patch: UserInterfacePatch,
    ) -> RegistryResult<UserInterfaceInfo> {
        let grant = self.grants.update(id, patch).await?;
        info!(id, status = %grant.status, left = grant.left_num, "Grant updated");
        Ok(grant)
    }

    pub async fn delete(&self, id: GrantId) -> RegistryResult<UserInterfaceInfo> {
        let grant = self.grants.delete(id).await?;
        info!(id, user_id = grant.user_id, "Grant deleted");
        Ok(grant)
    }

    pub async fn list(&self, query: &UserInterfaceQuery) -> Page<UserInterfaceInfo> {
        let (records, total) = self
            .grants
            .scan(&query.filter, query.page.offset(), query.page.limit())
            .await;
        Page {
            records,
            total: total as u64,
            page_size: query.page.page_size,
            page_number: query.page.page_number,
        }
    }

    /// Charges one call of `user_id` against its grant for `interface_id`.
    ///
    /// Fails with [`RegistryError::Forbidden`] when the caller holds no
    /// grant, the grant is banned or used up, or the interface is not
    /// online. The interface's own call count is left to the caller.
    pub async fn charge(
        &self,
        user_id: UserId,
        interface_id: InterfaceId,
    ) -> RegistryResult<UserInterfaceInfo> {
        let Some(id) = self.grants.find(user_id, interface_id) else {
            return Err(RegistryError::Forbidden(format!(
                "user {} holds no grant for interface {}",
                user_id, interface_id
            )));
        };
        let interface = self.interfaces.get(interface_id).await?;
        if interface.status != InterfaceStatus::Online {
            return Err(RegistryError::Forbidden(format!(
                "interface {} is not online",
                interface_id
            )));
        }
        match self.grants.consume(id)? {
            Consumption::Consumed(grant) => {
                debug!(id, user_id, interface_id, left = grant.left_num, "Grant charged");
                Ok(grant)
            }
            Consumption::Banned => Err(RegistryError::Forbidden(format!(
                "grant {} is banned",
                id
            ))),
            Consumption::Exhausted => Err(RegistryError::Forbidden(format!(
                "grant {} has no calls left",
                id
            ))),
        }
    }

    pub async fn flush(&self) -> RegistryResult<()> {
        self.grants.flush().await
    }

    pub async fn is_available(&self) -> bool {
        self.grants.is_available().await
    }
}
