use axum::{extract::State, response::Json};
use ifreg_core::{ApiResponse, InvocationRank};

use crate::error::AppResult;
use crate::extract::ApiQuery;
use crate::models::TopQuery;
use crate::server::AppState;

/// Most invoked interfaces
///
/// Returns up to `n` interfaces ordered by call count, highest first. Ties
/// are ordered by id.
#[utoipa::path(
    get,
    path = "/api/analysis/top",
    params(TopQuery),
    responses(
        (status = 200, description = "Ranking computed", body = ApiResponse<Vec<InvocationRank>>),
        (status = 400, description = "Malformed query"),
        (status = 504, description = "Store timed out")
    ),
    tag = "analysis"
)]
#[axum::debug_handler]
pub async fn top_invocations(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<TopQuery>,
) -> AppResult<Json<ApiResponse<Vec<InvocationRank>>>> {
    let ranking = state.registry.top_invocations(query.n()).await?;
    Ok(Json(ApiResponse::ok(ranking)))
}
