use axum::{extract::State, response::Json};
use ifreg_core::bulk::BulkDeleteResult;
use ifreg_core::query::Page;
use ifreg_core::{AddInterfaceRequest, ApiResponse, InterfaceId, InterfaceInfo};
use tracing::info;

use crate::error::AppResult;
use crate::extract::{ApiJson, ApiQuery};
use crate::models::{
    GetInterfaceParams, IdRequest, IdsRequest, InterfaceQueryRequest, InvokeRequest,
    UpdateInterfaceRequest,
};
use crate::server::AppState;

/// Register an interface
///
/// New interfaces start disabled with a zero call count. Sending the same
/// `requestToken` again returns the id of the first registration.
#[utoipa::path(
    post,
    path = "/api/interfaceInfo/add",
    request_body = AddInterfaceRequest,
    responses(
        (status = 200, description = "Interface registered", body = ApiResponse<u64>),
        (status = 400, description = "Invalid interface fields"),
        (status = 409, description = "Request token reused for a different interface"),
        (status = 504, description = "Store timed out")
    ),
    tag = "interfaceInfo"
)]
#[axum::debug_handler]
pub async fn add_interface(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<AddInterfaceRequest>,
) -> AppResult<Json<ApiResponse<InterfaceId>>> {
    let id = state.registry.add(request).await?;
    Ok(Json(ApiResponse::ok(id)))
}

/// Get one interface
#[utoipa::path(
    get,
    path = "/api/interfaceInfo/get",
    params(GetInterfaceParams),
    responses(
        (status = 200, description = "Interface found", body = ApiResponse<InterfaceInfo>),
        (status = 400, description = "Missing or malformed id"),
        (status = 404, description = "Interface not found")
    ),
    tag = "interfaceInfo"
)]
#[axum::debug_handler]
pub async fn get_interface(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<GetInterfaceParams>,
) -> AppResult<Json<ApiResponse<InterfaceInfo>>> {
    let info = state.registry.get(params.id).await?;
    Ok(Json(ApiResponse::ok(info)))
}

/// Update an interface
///
/// Absent fields are left unchanged; an empty string clears an optional
/// field. The status can only be changed through online/offline.
#[utoipa::path(
    post,
    path = "/api/interfaceInfo/update",
    request_body = UpdateInterfaceRequest,
    responses(
        (status = 200, description = "Interface updated", body = ApiResponse<bool>),
        (status = 400, description = "Invalid fields or status change"),
        (status = 404, description = "Interface not found")
    ),
    tag = "interfaceInfo"
)]
#[axum::debug_handler]
pub async fn update_interface(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<UpdateInterfaceRequest>,
) -> AppResult<Json<ApiResponse<bool>>> {
    state.registry.update(request.id, request.patch).await?;
    Ok(Json(ApiResponse::ok(true)))
}

/// Delete an interface
#[utoipa::path(
    post,
    path = "/api/interfaceInfo/delete",
    request_body = IdRequest,
    responses(
        (status = 200, description = "Interface deleted", body = ApiResponse<bool>),
        (status = 404, description = "Interface not found")
    ),
    tag = "interfaceInfo"
)]
#[axum::debug_handler]
pub async fn delete_interface(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<IdRequest>,
) -> AppResult<Json<ApiResponse<bool>>> {
    state.registry.delete(request.id).await?;
    Ok(Json(ApiResponse::ok(true)))
}

/// Delete several interfaces
///
/// Every id is deleted independently. The response lists the ids that were
/// deleted and the reason each remaining id failed.
#[utoipa::path(
    post,
    path = "/api/interfaceInfo/delete/batch",
    request_body = IdsRequest,
    responses(
        (status = 200, description = "Per-item outcome", body = ApiResponse<BulkDeleteResult>),
        (status = 400, description = "Malformed request")
    ),
    tag = "interfaceInfo"
)]
#[axum::debug_handler]
pub async fn delete_interfaces(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<IdsRequest>,
) -> AppResult<Json<ApiResponse<BulkDeleteResult>>> {
    let result = state.registry.bulk_delete(request.ids).await;
    if !result.is_complete_success() {
        info!(
            succeeded = result.succeeded.len(),
            failed = result.failed.len(),
            "Bulk delete partially failed"
        );
    }
    Ok(Json(ApiResponse::ok(result)))
}

/// Publish an interface
#[utoipa::path(
    post,
    path = "/api/interfaceInfo/online",
    request_body = IdRequest,
    responses(
        (status = 200, description = "Interface online", body = ApiResponse<bool>),
        (status = 404, description = "Interface not found")
    ),
    tag = "interfaceInfo"
)]
#[axum::debug_handler]
pub async fn online_interface(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<IdRequest>,
) -> AppResult<Json<ApiResponse<bool>>> {
    state.registry.online(request.id).await?;
    Ok(Json(ApiResponse::ok(true)))
}

/// Withdraw an interface
#[utoipa::path(
    post,
    path = "/api/interfaceInfo/offline",
    request_body = IdRequest,
    responses(
        (status = 200, description = "Interface disabled", body = ApiResponse<bool>),
        (status = 404, description = "Interface not found")
    ),
    tag = "interfaceInfo"
)]
#[axum::debug_handler]
pub async fn offline_interface(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<IdRequest>,
) -> AppResult<Json<ApiResponse<bool>>> {
    state.registry.offline(request.id).await?;
    Ok(Json(ApiResponse::ok(true)))
}

/// List interfaces page by page
#[utoipa::path(
    post,
    path = "/api/interfaceInfo/list/page",
    request_body = InterfaceQueryRequest,
    responses(
        (status = 200, description = "Page of interfaces", body = ApiResponse<Page<InterfaceInfo>>),
        (status = 400, description = "Invalid paging, filter or sort"),
        (status = 504, description = "Store timed out")
    ),
    tag = "interfaceInfo"
)]
#[axum::debug_handler]
pub async fn list_interfaces(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<InterfaceQueryRequest>,
) -> AppResult<Json<ApiResponse<Page<InterfaceInfo>>>> {
    let query = request.into_query(state.registry.config().default_page_size)?;
    let page = state.registry.list_by_page(query).await?;
    Ok(Json(ApiResponse::ok(page)))
}

/// Record interface invocations
///
/// Called by the gateway after forwarding requests. Never fails for an
/// unknown id; the increment is dropped and logged instead.
#[utoipa::path(
    post,
    path = "/api/interfaceInfo/invoke",
    request_body = InvokeRequest,
    responses(
        (status = 200, description = "Invocation recorded", body = ApiResponse<bool>),
        (status = 400, description = "Malformed request")
    ),
    tag = "interfaceInfo"
)]
#[axum::debug_handler]
pub async fn invoke_interface(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<InvokeRequest>,
) -> AppResult<Json<ApiResponse<bool>>> {
    state
        .registry
        .increment_call_count(request.id, request.delta)
        .await;
    Ok(Json(ApiResponse::ok(true)))
}

/// Total call count of a selection of interfaces
#[utoipa::path(
    post,
    path = "/api/interfaceInfo/callNo/total",
    request_body = IdsRequest,
    responses(
        (status = 200, description = "Sum of call counts", body = ApiResponse<u64>),
        (status = 504, description = "Store timed out")
    ),
    tag = "interfaceInfo"
)]
#[axum::debug_handler]
pub async fn total_call_count(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<IdsRequest>,
) -> AppResult<Json<ApiResponse<u64>>> {
    let total = state.registry.total_call_count(request.ids).await?;
    Ok(Json(ApiResponse::ok(total)))
}
