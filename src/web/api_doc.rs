use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};

use super::api::account::{
    AccountResponse, AccountView, LoginRequest, ProfileRequest, RegisterRequest,
};
use super::api::charts::{ChartListResponse, ChartResponse};
use super::api::error::ErrorResponse;
use super::api::horoscope::{HoroscopeRequest, HoroscopeResponse};
use super::api::session::{LogoutResponse, SessionResponse};

#[derive(OpenApi)]
#[openapi(
    paths(
        super::api::horoscope::compute_horoscope,
        super::api::charts::list_charts,
        super::api::charts::get_chart,
        super::api::charts::delete_chart,
        super::api::account::register,
        super::api::account::login,
        super::api::account::update_profile,
        super::api::session::me,
        super::api::session::logout,
    ),
    components(
        schemas(
            HoroscopeRequest,
            HoroscopeResponse,
            ChartListResponse,
            ChartResponse,
            RegisterRequest,
            LoginRequest,
            ProfileRequest,
            AccountResponse,
            AccountView,
            SessionResponse,
            LogoutResponse,
            ErrorResponse,
            crate::astro::PlanetPosition,
            crate::astro::Provenance,
            crate::astro::ChartSummary,
            crate::storage::StoredChart,
            crate::storage::BirthRecord,
            crate::storage::BirthProfile,
            crate::storage::BirthPlace,
        )
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Portal Astrológico API",
        description = "Accounts, birth chart computation and saved charts",
        version = "0.1.0"
    ),
    tags(
        (name = "horoscope", description = "Chart computation"),
        (name = "charts", description = "Saved charts"),
        (name = "account", description = "Registration, login and profile"),
        (name = "session", description = "Session inspection")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new("token"))),
            );
        }
    }
}
