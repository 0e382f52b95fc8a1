use axum::{extract::State, response::Json};
use ifreg_core::ApiResponse;
use ifreg_core::query::Page;
use ifreg_core::user_interface::{AddUserInterfaceRequest, GrantId, UserInterfaceInfo};

use crate::error::AppResult;
use crate::extract::{ApiJson, ApiQuery};
use crate::models::{
    GetUserInterfaceParams, IdRequest, InvokeAsRequest, UpdateUserInterfaceRequest,
    UserInterfaceQueryRequest,
};
use crate::server::AppState;

/// Grant a caller access to an interface
///
/// A caller holds at most one grant per interface.
#[utoipa::path(
    post,
    path = "/api/userInterfaceInfo/add",
    request_body = AddUserInterfaceRequest,
    responses(
        (status = 200, description = "Grant created", body = ApiResponse<u64>),
        (status = 404, description = "Interface not found"),
        (status = 409, description = "Caller already holds a grant for the interface")
    ),
    tag = "userInterfaceInfo"
)]
#[axum::debug_handler]
pub async fn add_user_interface(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<AddUserInterfaceRequest>,
) -> AppResult<Json<ApiResponse<GrantId>>> {
    let id = state.registry.add_user_interface(request).await?;
    Ok(Json(ApiResponse::ok(id)))
}

/// Get one grant
#[utoipa::path(
    get,
    path = "/api/userInterfaceInfo/get/vo",
    params(GetUserInterfaceParams),
    responses(
        (status = 200, description = "Grant found", body = ApiResponse<UserInterfaceInfo>),
        (status = 404, description = "Grant not found")
    ),
    tag = "userInterfaceInfo"
)]
#[axum::debug_handler]
pub async fn get_user_interface(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<GetUserInterfaceParams>,
) -> AppResult<Json<ApiResponse<UserInterfaceInfo>>> {
    let grant = state.registry.get_user_interface(params.id).await?;
    Ok(Json(ApiResponse::ok(grant)))
}

/// Update a grant's remaining calls or status
#[utoipa::path(
    post,
    path = "/api/userInterfaceInfo/update",
    request_body = UpdateUserInterfaceRequest,
    responses(
        (status = 200, description = "Grant updated", body = ApiResponse<bool>),
        (status = 404, description = "Grant not found")
    ),
    tag = "userInterfaceInfo"
)]
#[axum::debug_handler]
pub async fn update_user_interface(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<UpdateUserInterfaceRequest>,
) -> AppResult<Json<ApiResponse<bool>>> {
    state
        .registry
        .update_user_interface(request.id, request.patch)
        .await?;
    Ok(Json(ApiResponse::ok(true)))
}

/// Delete a grant
#[utoipa::path(
    post,
    path = "/api/userInterfaceInfo/delete",
    request_body = IdRequest,
    responses(
        (status = 200, description = "Grant deleted", body = ApiResponse<bool>),
        (status = 404, description = "Grant not found")
    ),
    tag = "userInterfaceInfo"
)]
#[axum::debug_handler]
pub async fn delete_user_interface(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<IdRequest>,
) -> AppResult<Json<ApiResponse<bool>>> {
    state.registry.delete_user_interface(request.id).await?;
    Ok(Json(ApiResponse::ok(true)))
}

/// List grants page by page
#[utoipa::path(
    post,
    path = "/api/userInterfaceInfo/list/page",
    request_body = UserInterfaceQueryRequest,
    responses(
        (status = 200, description = "Page of grants", body = ApiResponse<Page<UserInterfaceInfo>>),
        (status = 400, description = "Invalid paging or filter")
    ),
    tag = "userInterfaceInfo"
)]
#[axum::debug_handler]
pub async fn list_user_interfaces(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<UserInterfaceQueryRequest>,
) -> AppResult<Json<ApiResponse<Page<UserInterfaceInfo>>>> {
    let query = request.into_query(state.registry.config().default_page_size);
    let page = state.registry.list_user_interfaces(query).await?;
    Ok(Json(ApiResponse::ok(page)))
}

/// Record one call made through a grant
///
/// Called by the gateway once it has authenticated the caller. Charges the
/// grant and counts the call towards the interface.
#[utoipa::path(
    post,
    path = "/api/userInterfaceInfo/invoke",
    request_body = InvokeAsRequest,
    responses(
        (status = 200, description = "Call recorded", body = ApiResponse<UserInterfaceInfo>),
        (status = 403, description = "No usable grant or interface offline"),
        (status = 404, description = "Interface not found")
    ),
    tag = "userInterfaceInfo"
)]
#[axum::debug_handler]
pub async fn invoke_as_user(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<InvokeAsRequest>,
) -> AppResult<Json<ApiResponse<UserInterfaceInfo>>> {
    let grant = state
        .registry
        .invoke_as(request.user_id, request.interface_info_id)
        .await?;
    Ok(Json(ApiResponse::ok(grant)))
}
