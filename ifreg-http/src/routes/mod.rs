pub mod analysis;
pub mod interface_info;
pub mod user_interface_info;

use crate::handlers;
use crate::models::{
    IdRequest, IdsRequest, InterfaceQueryRequest, InvokeAsRequest, InvokeRequest,
    UpdateInterfaceRequest, UpdateUserInterfaceRequest, UserInterfaceQueryRequest,
};
use crate::server::AppState;
use axum::{Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use ifreg_core::bulk::{BulkDeleteResult, BulkFailure};
use ifreg_core::query::{InterfaceFilter, SortField, SortOrder};
use ifreg_core::user_interface::{
    AddUserInterfaceRequest, GrantStatus, UserInterfaceFilter, UserInterfaceInfo,
    UserInterfacePatch,
};
use ifreg_core::{
    AddInterfaceRequest, ErrorKind, InterfaceFields, InterfaceInfo, InterfacePatch,
    InterfaceStatus, InvocationRank,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::interface_info::add_interface,
        handlers::interface_info::get_interface,
        handlers::interface_info::update_interface,
        handlers::interface_info::delete_interface,
        handlers::interface_info::delete_interfaces,
        handlers::interface_info::online_interface,
        handlers::interface_info::offline_interface,
        handlers::interface_info::list_interfaces,
        handlers::interface_info::invoke_interface,
        handlers::interface_info::total_call_count,
        handlers::user_interface_info::add_user_interface,
        handlers::user_interface_info::get_user_interface,
        handlers::user_interface_info::update_user_interface,
        handlers::user_interface_info::delete_user_interface,
        handlers::user_interface_info::list_user_interfaces,
        handlers::user_interface_info::invoke_as_user,
        handlers::analysis::top_invocations
    ),
    components(schemas(
        AddInterfaceRequest,
        InterfaceFields,
        InterfaceInfo,
        InterfacePatch,
        InterfaceStatus,
        InterfaceFilter,
        SortField,
        SortOrder,
        InvocationRank,
        BulkDeleteResult,
        BulkFailure,
        ErrorKind,
        IdRequest,
        IdsRequest,
        InvokeRequest,
        UpdateInterfaceRequest,
        InterfaceQueryRequest,
        AddUserInterfaceRequest,
        UserInterfaceInfo,
        UserInterfacePatch,
        UserInterfaceFilter,
        GrantStatus,
        UpdateUserInterfaceRequest,
        UserInterfaceQueryRequest,
        InvokeAsRequest
    ))
)]
pub struct ApiDoc;

/// Create the main API router with state
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(health_check))
        .nest("/api", api_router())
}

fn api_router() -> Router<AppState> {
    Router::new()
        .merge(interface_info::routes())
        .merge(user_interface_info::routes())
        .merge(analysis::routes())
}

/// Health check endpoint for container health monitoring
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    if state.registry.is_available().await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
