use crate::handlers::top_invocations;
use crate::server::AppState;
use axum::{Router, routing::get};

/// Create the analysis routes with state
pub fn routes() -> Router<AppState> {
    Router::new().route("/analysis/top", get(top_invocations))
}
