use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

use crate::astro::{BirthQuery, ChartResult, ChartSummary, PlanetPosition, Provenance};

const DEFAULT_TITLE: &str = "Meu Mapa Astral";
const DEFAULT_CITY: &str = "Não informada";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Chart not found: {0}")]
    NotFound(String),
    #[error("Invalid identifier: {0}")]
    InvalidId(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BirthRecord {
    #[schema(value_type = String, format = Date)]
    pub date: NaiveDate,
    #[schema(value_type = String)]
    pub time: NaiveTime,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: f64,
    pub city: String,
}

impl BirthRecord {
    pub fn from_query(query: &BirthQuery, city: Option<String>) -> Self {
        BirthRecord {
            date: query.date(),
            time: query.time(),
            latitude: query.latitude(),
            longitude: query.longitude(),
            timezone: query.timezone_offset(),
            city: city
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CITY.to_string()),
        }
    }
}

/// A chart saved by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StoredChart {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub birth: BirthRecord,
    pub summary: ChartSummary,
    pub planets: Vec<PlanetPosition>,
    pub source: Provenance,
    #[serde(default)]
    pub favorite: bool,
    pub created_at: DateTime<Utc>,
}

pub struct NewChart {
    pub title: Option<String>,
    pub birth: BirthRecord,
    pub summary: ChartSummary,
    pub chart: ChartResult,
}

pub struct ChartStore {
    base: PathBuf,
}

impl ChartStore {
    pub fn new(base: PathBuf) -> Self {
        ChartStore { base }
    }

    fn user_path(&self, user_id: &str) -> Result<PathBuf, StorageError> {
        check_id(user_id)?;
        Ok(self.base.join(user_id))
    }

    fn chart_path(&self, user_id: &str, id: &str) -> Result<PathBuf, StorageError> {
        check_id(id)?;
        Ok(self.user_path(user_id)?.join(format!("{}.json", id)))
    }

    pub fn save(&self, user_id: &str, new: NewChart) -> Result<StoredChart, StorageError> {
        let folder = self.user_path(user_id)?;
        std::fs::create_dir_all(&folder)?;

        let created_at = Utc::now();
        let stored = StoredChart {
            id: generate_id(created_at),
            user_id: user_id.to_string(),
            title: new.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            birth: new.birth,
            summary: new.summary,
            planets: new.chart.planets,
            source: new.chart.source,
            favorite: false,
            created_at,
        };

        let path = self.chart_path(user_id, &stored.id)?;
        std::fs::write(path, serde_json::to_vec_pretty(&stored)?)?;
        Ok(stored)
    }

    /// All charts of a user, newest first.
    pub fn list(&self, user_id: &str) -> Result<Vec<StoredChart>, StorageError> {
        let path = self.user_path(user_id)?;

        if !path.exists() {
            return Ok(Vec::new());
        }

        let mut charts = Vec::new();
        for entry in path.read_dir()? {
            let entry = entry?;
            let entry_path = entry.path();

            if !entry_path.is_file() || entry_path.extension().map_or(true, |e| e != "json") {
                continue;
            }

            let content = match std::fs::read(&entry_path) {
                Ok(content) => content,
                Err(e) => {
                    error!("Failed to read chart file {}: {}", entry_path.display(), e);
                    continue;
                }
            };

            match serde_json::from_slice::<StoredChart>(&content) {
                Ok(chart) => charts.push(chart),
                Err(e) => error!("Failed to parse chart {}: {}", entry_path.display(), e),
            }
        }

        charts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(charts)
    }

    pub fn get(&self, user_id: &str, id: &str) -> Result<StoredChart, StorageError> {
        let path = self.chart_path(user_id, id)?;

        if !path.exists() {
            return Err(StorageError::NotFound(id.to_string()));
        }

        let content = std::fs::read(&path)?;
        Ok(serde_json::from_slice(&content)?)
    }

    pub fn delete(&self, user_id: &str, id: &str) -> Result<(), StorageError> {
        let path = self.chart_path(user_id, id)?;

        if !path.exists() {
            return Err(StorageError::NotFound(id.to_string()));
        }

        std::fs::remove_file(path)?;
        Ok(())
    }
}

pub(super) fn check_id(id: &str) -> Result<(), StorageError> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidId(id.to_string()))
    }
}

fn generate_id(created_at: DateTime<Utc>) -> String {
    let uuid = uuid::Uuid::new_v4();
    let timestamp = created_at.format("%Y%m%dT%H%M%S%3fZ");
    format!("{}_{}", timestamp, uuid)
}
