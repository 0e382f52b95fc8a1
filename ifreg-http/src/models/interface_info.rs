use ifreg_core::query::{InterfaceFilter, InterfaceQuery, PageRequest, SortField, SortOrder, SortSpec};
use ifreg_core::{InterfaceId, InterfacePatch, RegistryError, RegistryResult};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Request addressing a single record
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IdRequest {
    pub id: InterfaceId,
}

/// Request addressing a set of interfaces
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct IdsRequest {
    #[serde(default)]
    pub ids: Vec<InterfaceId>,
}

/// Query parameters of `GET /interfaceInfo/get`
#[derive(Debug, Clone, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GetInterfaceParams {
    /// Interface identifier
    pub id: InterfaceId,
}

/// Partial update of one interface
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateInterfaceRequest {
    pub id: InterfaceId,

    #[serde(flatten)]
    pub patch: InterfacePatch,
}

/// Invocation report sent by the gateway
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InvokeRequest {
    pub id: InterfaceId,

    /// Number of calls to record
    #[serde(default = "default_delta")]
    pub delta: u64,
}

fn default_delta() -> u64 {
    1
}

/// Listing request as sent by the admin console
///
/// Filter fields sit at the top level next to the paging and sorting
/// parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceQueryRequest {
    /// 1-based page number
    #[serde(default)]
    pub current: Option<u64>,

    #[serde(default)]
    pub page_size: Option<u64>,

    #[serde(flatten)]
    pub filter: InterfaceFilter,

    /// One of id, name, method, url, status, callNo, createTime, updateTime
    #[serde(default)]
    pub sort_field: Option<String>,

    /// `asc`/`ascend` or `desc`/`descend`
    #[serde(default)]
    pub sort_order: Option<String>,
}

impl InterfaceQueryRequest {
    pub fn into_query(self, default_page_size: u64) -> RegistryResult<InterfaceQuery> {
        let field = match non_blank(self.sort_field.as_deref()) {
            Some(raw) => raw
                .parse::<SortField>()
                .map_err(|_| RegistryError::validation(format!("unknown sortField {}", raw)))?,
            None => SortField::default(),
        };
        let order = match non_blank(self.sort_order.as_deref()) {
            Some(raw) => raw
                .parse::<SortOrder>()
                .map_err(|_| RegistryError::validation(format!("unknown sortOrder {}", raw)))?,
            None => SortOrder::default(),
        };

        Ok(InterfaceQuery {
            filter: self.filter,
            sort: SortSpec::new(field, order),
            page: PageRequest::new(
                self.page_size.unwrap_or(default_page_size),
                self.current.unwrap_or(1),
            ),
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
