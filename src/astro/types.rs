use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::error::QueryError;

pub const ZODIAC_SIGNS: [&str; 12] = [
    "Aries",
    "Taurus",
    "Gemini",
    "Cancer",
    "Leo",
    "Virgo",
    "Libra",
    "Scorpio",
    "Sagittarius",
    "Capricorn",
    "Aquarius",
    "Pisces",
];

pub const PLANETS: [&str; 11] = [
    "Sun",
    "Moon",
    "Mercury",
    "Venus",
    "Mars",
    "Jupiter",
    "Saturn",
    "Uranus",
    "Neptune",
    "Pluto",
    "Ascendant",
];

/// Calculation options forwarded to the astrology service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChartOptions {
    #[serde(default = "default_observation_point")]
    pub observation_point: String,
    #[serde(default = "default_ayanamsha")]
    pub ayanamsha: String,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_observation_point() -> String {
    "topocentric".to_string()
}

fn default_ayanamsha() -> String {
    "tropical".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            observation_point: default_observation_point(),
            ayanamsha: default_ayanamsha(),
            language: default_language(),
        }
    }
}

/// Birth moment and place. Only constructible through [`BirthQuery::new`],
/// so every instance holds a calendar-valid date and in-range coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct BirthQuery {
    date: NaiveDate,
    time: NaiveTime,
    latitude: f64,
    longitude: f64,
    timezone_offset: f64,
    options: ChartOptions,
}

impl BirthQuery {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
        latitude: f64,
        longitude: f64,
        timezone_offset: f64,
    ) -> Result<Self, QueryError> {
        let date = NaiveDate::from_ymd_opt(year, month, day)
            .ok_or(QueryError::InvalidDate { year, month, day })?;
        if hour > 23 {
            return Err(QueryError::OutOfRange("hour"));
        }
        if minute > 59 {
            return Err(QueryError::OutOfRange("minute"));
        }
        if second > 59 {
            return Err(QueryError::OutOfRange("second"));
        }
        let time = NaiveTime::from_hms_opt(hour, minute, second)
            .ok_or(QueryError::OutOfRange("time"))?;
        check_range("latitude", latitude, -90.0, 90.0)?;
        check_range("longitude", longitude, -180.0, 180.0)?;
        check_range("timezone", timezone_offset, -14.0, 14.0)?;

        Ok(Self {
            date,
            time,
            latitude,
            longitude,
            timezone_offset,
            options: ChartOptions::default(),
        })
    }

    pub fn with_options(mut self, options: ChartOptions) -> Self {
        self.options = options;
        self
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }

    pub fn month(&self) -> u32 {
        self.date.month()
    }

    pub fn day(&self) -> u32 {
        self.date.day()
    }

    pub fn hour(&self) -> u32 {
        self.time.hour()
    }

    pub fn minute(&self) -> u32 {
        self.time.minute()
    }

    pub fn second(&self) -> u32 {
        self.time.second()
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn time(&self) -> NaiveTime {
        self.time
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn timezone_offset(&self) -> f64 {
        self.timezone_offset
    }

    pub fn options(&self) -> &ChartOptions {
        &self.options
    }
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), QueryError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(QueryError::OutOfRange(field))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PlanetPosition {
    pub planet: String,
    pub sign: String,
    /// Degree within the zodiac as reported by the provider.
    pub degree: f64,
    pub retrograde: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Provenance {
    #[serde(rename = "api")]
    Api,
    #[serde(rename = "simulado")]
    Simulated,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Api => "api",
            Provenance::Simulated => "simulado",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChartResult {
    pub planets: Vec<PlanetPosition>,
    pub source: Provenance,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl ChartResult {
    pub fn planet(&self, name: &str) -> Option<&PlanetPosition> {
        self.planets.iter().find(|p| p.planet == name)
    }
}
