use crate::handlers::{
    add_interface, delete_interface, delete_interfaces, get_interface, invoke_interface,
    list_interfaces, offline_interface, online_interface, total_call_count, update_interface,
};
use crate::server::AppState;
use axum::{
    Router,
    routing::{get, post},
};

/// Create the interface info routes with state
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/interfaceInfo/add", post(add_interface))
        .route("/interfaceInfo/get", get(get_interface))
        .route("/interfaceInfo/update", post(update_interface))
        .route("/interfaceInfo/delete", post(delete_interface))
        .route("/interfaceInfo/delete/batch", post(delete_interfaces))
        .route("/interfaceInfo/online", post(online_interface))
        .route("/interfaceInfo/offline", post(offline_interface))
        .route("/interfaceInfo/list/page", post(list_interfaces))
        .route("/interfaceInfo/invoke", post(invoke_interface))
        .route("/interfaceInfo/callNo/total", post(total_call_count))
}
