use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::astro::ResilientCalculator;
use crate::storage::{ChartStore, UserStore};

use super::config::Config;

pub const SESSION_COOKIE: &str = "token";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthenticatedUser {
    pub id: String,
    pub name: String,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub calculator: Arc<ResilientCalculator>,
    pub charts: Arc<ChartStore>,
    pub users: Arc<UserStore>,
    pub api_key: Arc<str>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    name: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug)]
pub enum AuthError {
    MissingAuth,
    InvalidFormat,
    InvalidToken,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingAuth => (StatusCode::UNAUTHORIZED, "missing_auth"),
            AuthError::InvalidFormat => (StatusCode::UNAUTHORIZED, "invalid_auth_format"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token"),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub fn issue_token(
    secret: &str,
    user: &AuthenticatedUser,
    ttl: Duration,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user.id.clone(),
        name: user.name.clone(),
        iat: now,
        exp: now + ttl.as_secs() as i64,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// `Set-Cookie` value carrying a session token for `ttl`.
pub fn session_cookie(token: &str, ttl: Duration) -> String {
    format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
        SESSION_COOKIE,
        token,
        ttl.as_secs()
    )
}

pub fn verify_token(secret: &str, token: &str) -> Result<AuthenticatedUser, AuthError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|e| {
        log::debug!("Rejected session token: {}", e);
        AuthError::InvalidToken
    })?;

    Ok(AuthenticatedUser {
        id: data.claims.sub,
        name: data.claims.name,
    })
}

/// Session token from the `token` cookie, falling back to a Bearer header.
fn session_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().strip_prefix("token="))
        .find(|token| !token.is_empty());

    if let Some(token) = from_cookie {
        return Ok(token);
    }

    let auth_header = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingAuth)?
        .to_str()
        .map_err(|_| AuthError::InvalidFormat)?;

    auth_header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidFormat)
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers)?;
        verify_token(&state.config.auth.jwt_secret, token)
    }
}
