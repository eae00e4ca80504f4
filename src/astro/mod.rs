mod calculator;
mod client;
mod error;
mod fallback;
mod horoscope;
mod types;

pub use calculator::{ResilientCalculator, DEGRADED_WARNING};
pub use client::{AstrologyClient, RetryPolicy, DEFAULT_ENDPOINTS};
pub use error::{AstroError, QueryError};
pub use fallback::FallbackGenerator;
pub use horoscope::ChartSummary;
pub use types::{
    BirthQuery, ChartOptions, ChartResult, PlanetPosition, Provenance, PLANETS, ZODIAC_SIGNS,
};
