use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::astro::{BirthQuery, ChartSummary, PlanetPosition, Provenance};
use crate::storage::{BirthRecord, NewChart};
use crate::web::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::web::auth::{AppState, AuthenticatedUser};

#[derive(Debug, Deserialize, ToSchema)]
pub struct HoroscopeRequest {
    pub year: i32,
    pub month: u32,
    pub date: u32,
    pub hours: u32,
    pub minutes: u32,
    #[serde(default)]
    pub seconds: u32,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: f64,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    /// Persist the chart in the user's saved charts.
    #[serde(default)]
    pub save: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HoroscopeResponse {
    pub success: bool,
    pub source: Provenance,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(flatten)]
    pub summary: ChartSummary,
    pub planets: Vec<PlanetPosition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_id: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/horoscope",
    tag = "horoscope",
    request_body = HoroscopeRequest,
    responses(
        (status = 200, description = "Chart computed (from the API or simulated)", body = HoroscopeResponse),
        (status = 400, description = "Invalid or malformed birth data", body = ErrorResponse),
        (status = 401, description = "Missing or invalid session")
    ),
    security(("session" = []))
)]
pub async fn compute_horoscope(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    payload: Result<Json<HoroscopeRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload?;
    let query = BirthQuery::new(
        request.year,
        request.month,
        request.date,
        request.hours,
        request.minutes,
        request.seconds,
        request.latitude,
        request.longitude,
        request.timezone,
    )?
    .with_options(state.config.astrology.options.clone());

    let chart = state.calculator.compute_chart(&query, &state.api_key).await;

    let summary = ChartSummary::from_chart(&chart).ok_or_else(|| {
        ApiError::Internal("chart is missing the Sun, the Moon or the Ascendant".into())
    })?;

    let chart_id = if request.save {
        let stored = state.charts.save(
            &user.id,
            NewChart {
                title: request.title,
                birth: BirthRecord::from_query(&query, request.city),
                summary: summary.clone(),
                chart: chart.clone(),
            },
        )?;
        log::info!("Saved chart {} for user {}", stored.id, user.id);
        Some(stored.id)
    } else {
        None
    };

    Ok((
        StatusCode::OK,
        Json(HoroscopeResponse {
            success: true,
            source: chart.source,
            warning: chart.warning,
            summary,
            planets: chart.planets,
            chart_id,
        }),
    ))
}
