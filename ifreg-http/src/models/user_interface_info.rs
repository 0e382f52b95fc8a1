use ifreg_core::InterfaceId;
use ifreg_core::query::PageRequest;
use ifreg_core::user_interface::{
    GrantId, UserId, UserInterfaceFilter, UserInterfacePatch, UserInterfaceQuery,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Query parameters of `GET /userInterfaceInfo/get/vo`
#[derive(Debug, Clone, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GetUserInterfaceParams {
    /// Grant identifier
    pub id: GrantId,
}

/// Partial update of one grant
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateUserInterfaceRequest {
    pub id: GrantId,

    #[serde(flatten)]
    pub patch: UserInterfacePatch,
}

/// Grant listing request as sent by the admin console
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserInterfaceQueryRequest {
    /// 1-based page number
    #[serde(default)]
    pub current: Option<u64>,

    #[serde(default)]
    pub page_size: Option<u64>,

    #[serde(flatten)]
    pub filter: UserInterfaceFilter,
}

impl UserInterfaceQueryRequest {
    pub fn into_query(self, default_page_size: u64) -> UserInterfaceQuery {
        UserInterfaceQuery {
            filter: self.filter,
            page: PageRequest::new(
                self.page_size.unwrap_or(default_page_size),
                self.current.unwrap_or(1),
            ),
        }
    }
}

/// One call made by a caller through its grant
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvokeAsRequest {
    pub user_id: UserId,
    pub interface_info_id: InterfaceId,
}
