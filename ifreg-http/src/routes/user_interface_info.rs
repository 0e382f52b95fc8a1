use crate::handlers::{
    add_user_interface, delete_user_interface, get_user_interface, invoke_as_user,
    list_user_interfaces, update_user_interface,
};
use crate::server::AppState;
use axum::{
    Router,
    routing::{get, post},
};

/// Create the user interface grant routes with state
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/userInterfaceInfo/add", post(add_user_interface))
        .route("/userInterfaceInfo/get/vo", get(get_user_interface))
        .route("/userInterfaceInfo/update", post(update_user_interface))
        .route("/userInterfaceInfo/delete", post(delete_user_interface))
        .route("/userInterfaceInfo/list/page", post(list_user_interfaces))
        .route("/userInterfaceInfo/invoke", post(invoke_as_user))
}
