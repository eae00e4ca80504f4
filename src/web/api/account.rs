use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::astro::QueryError;
use crate::storage::{BirthPlace, BirthProfile, ProfileChanges, StoredUser};
use crate::web::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::web::auth::{issue_token, session_cookie, AppState, AuthenticatedUser};

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Profile fields to change. Omitted fields keep their stored value.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ProfileRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>, format = Date)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub birth_time: Option<NaiveTime>,
    #[serde(default)]
    pub birth_place: Option<BirthPlace>,
}

/// A user as returned to clients. Sessions issued outside the account flow
/// have no email or birth profile.
#[derive(Debug, Serialize, ToSchema)]
pub struct AccountView {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth: Option<BirthProfile>,
}

impl From<StoredUser> for AccountView {
    fn from(user: StoredUser) -> Self {
        AccountView {
            id: user.id,
            name: user.name,
            email: Some(user.email),
            birth: Some(user.birth),
        }
    }
}

impl From<AuthenticatedUser> for AccountView {
    fn from(user: AuthenticatedUser) -> Self {
        AccountView {
            id: user.id,
            name: user.name,
            email: None,
            birth: None,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AccountResponse {
    pub success: bool,
    pub user: AccountView,
}

/// Signs a session for `user` and answers with it as the `token` cookie.
fn start_session(
    state: &AppState,
    status: StatusCode,
    user: StoredUser,
) -> ApiResult<impl IntoResponse> {
    let ttl = state.config.auth.token_ttl;
    let session = AuthenticatedUser {
        id: user.id.clone(),
        name: user.name.clone(),
    };
    let token = issue_token(&state.config.auth.jwt_secret, &session, ttl)
        .map_err(|e| ApiError::Internal(format!("could not sign session: {e}")))?;

    Ok((
        status,
        [(header::SET_COOKIE, session_cookie(&token, ttl))],
        Json(AccountResponse {
            success: true,
            user: user.into(),
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "account",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created, session cookie set", body = AccountResponse),
        (status = 400, description = "Missing fields, mismatched or short password, or email taken", body = ErrorResponse)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload?;

    if request.name.trim().is_empty()
        || request.email.trim().is_empty()
        || request.password.is_empty()
    {
        return Err(ApiError::Validation(
            "name, email and password are required".into(),
        ));
    }
    if !request.email.contains('@') {
        return Err(ApiError::Validation("invalid email address".into()));
    }
    if request.password != request.password_confirmation {
        return Err(ApiError::Validation("passwords do not match".into()));
    }
    if request.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "password must have at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let user = state
        .users
        .register(&request.name, &request.email, &request.password)?;
    log::info!("Registered user {}", user.id);

    start_session(&state, StatusCode::CREATED, user)
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "account",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in, session cookie set", body = AccountResponse),
        (status = 400, description = "Missing fields", body = ErrorResponse),
        (status = 401, description = "Unknown email or wrong password", body = ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload?;

    if request.email.trim().is_empty() || request.password.is_empty() {
        return Err(ApiError::Validation("email and password are required".into()));
    }

    let user = state
        .users
        .authenticate(&request.email, &request.password)?
        .ok_or(ApiError::InvalidCredentials)?;

    start_session(&state, StatusCode::OK, user)
}

#[utoipa::path(
    put,
    path = "/api/profile",
    tag = "account",
    request_body = ProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = AccountResponse),
        (status = 400, description = "Invalid birth place", body = ErrorResponse),
        (status = 401, description = "Missing or invalid session"),
        (status = 404, description = "Session has no account", body = ErrorResponse)
    ),
    security(("session" = []))
)]
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    payload: Result<Json<ProfileRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload?;

    if let Some(place) = &request.birth_place {
        check_place(place)?;
    }

    let updated = state.users.update_profile(
        &user.id,
        ProfileChanges {
            name: request.name,
            date: request.birth_date,
            time: request.birth_time,
            place: request.birth_place,
        },
    )?;

    Ok((
        StatusCode::OK,
        Json(AccountResponse {
            success: true,
            user: updated.into(),
        }),
    ))
}

fn check_place(place: &BirthPlace) -> Result<(), QueryError> {
    let in_range = |value: f64, limit: f64| value.is_finite() && value.abs() <= limit;

    if !in_range(place.latitude, 90.0) {
        return Err(QueryError::OutOfRange("latitude"));
    }
    if !in_range(place.longitude, 180.0) {
        return Err(QueryError::OutOfRange("longitude"));
    }
    if !in_range(place.timezone, 14.0) {
        return Err(QueryError::OutOfRange("timezone offset"));
    }
    Ok(())
}
