use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::storage::UserError;
use crate::web::api::account::AccountView;
use crate::web::api::error::ApiResult;
use crate::web::auth::{AppState, AuthenticatedUser, SESSION_COOKIE};

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub success: bool,
    pub user: AccountView,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LogoutResponse {
    pub success: bool,
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "session",
    responses(
        (status = 200, description = "Current user", body = SessionResponse),
        (status = 401, description = "Missing or invalid session")
    ),
    security(("session" = []))
)]
pub async fn me(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<impl IntoResponse> {
    let account = match state.users.get(&user.id) {
        Ok(stored) => AccountView::from(stored),
        Err(UserError::NotFound(_)) => AccountView::from(user),
        Err(e) => return Err(e.into()),
    };

    Ok(Json(SessionResponse {
        success: true,
        user: account,
    }))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "session",
    responses(
        (status = 200, description = "Session cookie cleared", body = LogoutResponse)
    )
)]
pub async fn logout() -> impl IntoResponse {
    let cookie = format!("{}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax", SESSION_COOKIE);
    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(LogoutResponse { success: true }),
    )
}
