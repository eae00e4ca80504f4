use axum::{routing::get, routing::post, routing::put, Router};
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::astro::{AstroError, AstrologyClient, FallbackGenerator, ResilientCalculator};
use crate::storage::{ChartStore, UserError, UserStore};

use super::api::account as account_handlers;
use super::api::charts as chart_handlers;
use super::api::horoscope as horoscope_handlers;
use super::api::session as session_handlers;
use super::api_doc::ApiDoc;
use super::auth::AppState;
use super::config::Config;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("astrology client: {0}")]
    Client(#[from] AstroError),
    #[error("user store: {0}")]
    Users(#[from] UserError),
}

pub fn build_calculator(config: &Config) -> Result<ResilientCalculator, AstroError> {
    let client = AstrologyClient::new(
        config.astrology.endpoints.clone(),
        config.astrology.retry_policy(),
    )?;
    Ok(ResilientCalculator::new(client, FallbackGenerator::new()))
}

pub fn build_state(config: Config) -> Result<AppState, ServerError> {
    let api_key = config.api_key().unwrap_or_else(|e| {
        log::warn!("{}; charts will be simulated", e);
        String::new()
    });
    let calculator = build_calculator(&config)?;
    let charts = ChartStore::new(config.charts.base_folder.clone());
    let users = UserStore::new(
        config.users.base_folder.clone(),
        config.users.hash_memory_kib,
        config.users.hash_iterations,
    )?;

    Ok(AppState {
        config: Arc::new(config),
        calculator: Arc::new(calculator),
        charts: Arc::new(charts),
        users: Arc::new(users),
        api_key: api_key.into(),
    })
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Chart computation
        .route("/api/horoscope", post(horoscope_handlers::compute_horoscope))
        // Saved charts
        .route("/api/charts", get(chart_handlers::list_charts))
        .route(
            "/api/charts/{id}",
            get(chart_handlers::get_chart).delete(chart_handlers::delete_chart),
        )
        // Accounts
        .route("/api/auth/register", post(account_handlers::register))
        .route("/api/auth/login", post(account_handlers::login))
        .route("/api/profile", put(account_handlers::update_profile))
        // Session
        .route("/api/auth/me", get(session_handlers::me))
        .route("/api/auth/logout", post(session_handlers::logout))
        // OpenAPI / Swagger
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(config: Config) -> Result<(), ServerError> {
    let bind_addr = config.web.bind.clone();
    log::info!(
        "Astrology endpoints: {}",
        config.astrology.endpoints.join(", ")
    );

    let state = build_state(config)?;
    let app = router(state);

    log::info!("Starting server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
