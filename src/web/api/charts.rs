use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::storage::StoredChart;
use crate::web::api::error::{ApiResult, ErrorResponse};
use crate::web::auth::{AppState, AuthenticatedUser};

#[derive(Debug, Serialize, ToSchema)]
pub struct ChartListResponse {
    pub success: bool,
    pub charts: Vec<StoredChart>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChartResponse {
    pub success: bool,
    pub chart: StoredChart,
}

#[utoipa::path(
    get,
    path = "/api/charts",
    tag = "charts",
    responses(
        (status = 200, description = "Saved charts, newest first", body = ChartListResponse),
        (status = 401, description = "Missing or invalid session")
    ),
    security(("session" = []))
)]
pub async fn list_charts(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<impl IntoResponse> {
    let charts = state.charts.list(&user.id)?;
    Ok((
        StatusCode::OK,
        Json(ChartListResponse {
            success: true,
            charts,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/charts/{id}",
    tag = "charts",
    params(
        ("id" = String, Path, description = "Chart ID")
    ),
    responses(
        (status = 200, description = "Chart details", body = ChartResponse),
        (status = 401, description = "Missing or invalid session"),
        (status = 404, description = "Chart not found", body = ErrorResponse)
    ),
    security(("session" = []))
)]
pub async fn get_chart(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let chart = state.charts.get(&user.id, &id)?;
    Ok((
        StatusCode::OK,
        Json(ChartResponse {
            success: true,
            chart,
        }),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/charts/{id}",
    tag = "charts",
    params(
        ("id" = String, Path, description = "Chart ID")
    ),
    responses(
        (status = 204, description = "Chart deleted"),
        (status = 401, description = "Missing or invalid session"),
        (status = 404, description = "Chart not found", body = ErrorResponse)
    ),
    security(("session" = []))
)]
pub async fn delete_chart(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state.charts.delete(&user.id, &id)?;
    log::info!("Deleted chart {} of user {}", id, user.id);
    Ok(StatusCode::NO_CONTENT)
}
