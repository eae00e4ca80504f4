use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;
use utoipa::ToSchema;

use super::charts::check_id;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Password hashing failed: {0}")]
    Hash(String),
    #[error("Email already registered: {0}")]
    EmailTaken(String),
    #[error("User not found: {0}")]
    NotFound(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BirthPlace {
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

/// Birth data a user keeps on their account, each part optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BirthProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = Date)]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub time: Option<NaiveTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place: Option<BirthPlace>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    #[serde(default)]
    pub birth: BirthProfile,
    pub created_at: DateTime<Utc>,
}

/// Fields of a profile update. `None` leaves the stored value untouched.
#[derive(Debug, Default)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub place: Option<BirthPlace>,
}

/// Accounts stored as one JSON file per user id. Email lookups scan the
/// folder; emails are kept trimmed and lowercased.
pub struct UserStore {
    base: PathBuf,
    hasher: Argon2<'static>,
    // serializes the email uniqueness check with the write that follows it
    register_lock: Mutex<()>,
}

impl UserStore {
    /// `memory_kib` and `iterations` are the Argon2id cost parameters used for
    /// new password hashes. Existing hashes carry their own parameters.
    pub fn new(base: PathBuf, memory_kib: u32, iterations: u32) -> Result<Self, UserError> {
        let params = Params::new(memory_kib, iterations, Params::DEFAULT_P_COST, None)
            .map_err(|e| UserError::Hash(e.to_string()))?;

        Ok(UserStore {
            base,
            hasher: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            register_lock: Mutex::new(()),
        })
    }

    fn user_path(&self, id: &str) -> Result<PathBuf, UserError> {
        check_id(id).map_err(|_| UserError::NotFound(id.to_string()))?;
        Ok(self.base.join(format!("{}.json", id)))
    }

    pub fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<StoredUser, UserError> {
        let email = normalize_email(email);
        let _guard = self
            .register_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if self.find_by_email(&email)?.is_some() {
            return Err(UserError::EmailTaken(email));
        }

        let salt = SaltString::generate(&mut rand::thread_rng());
        let password_hash = self
            .hasher
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| UserError::Hash(e.to_string()))?
            .to_string();

        let user = StoredUser {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            email,
            password_hash,
            birth: BirthProfile::default(),
            created_at: Utc::now(),
        };

        self.write(&user)?;
        Ok(user)
    }

    pub fn get(&self, id: &str) -> Result<StoredUser, UserError> {
        let path = self.user_path(id)?;

        if !path.exists() {
            return Err(UserError::NotFound(id.to_string()));
        }

        let content = std::fs::read(&path)?;
        Ok(serde_json::from_slice(&content)?)
    }

    pub fn find_by_email(&self, email: &str) -> Result<Option<StoredUser>, UserError> {
        let email = normalize_email(email);

        if !self.base.exists() {
            return Ok(None);
        }

        for entry in self.base.read_dir()? {
            let entry_path = entry?.path();

            if !entry_path.is_file() || entry_path.extension().map_or(true, |e| e != "json") {
                continue;
            }

            let content = match std::fs::read(&entry_path) {
                Ok(content) => content,
                Err(e) => {
                    error!("Failed to read user file {}: {}", entry_path.display(), e);
                    continue;
                }
            };

            match serde_json::from_slice::<StoredUser>(&content) {
                Ok(user) if user.email == email => return Ok(Some(user)),
                Ok(_) => {}
                Err(e) => error!("Failed to parse user {}: {}", entry_path.display(), e),
            }
        }

        Ok(None)
    }

    /// The account matching `email` when `password` verifies against it.
    pub fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<StoredUser>, UserError> {
        let Some(user) = self.find_by_email(email)? else {
            return Ok(None);
        };

        let hash = match PasswordHash::new(&user.password_hash) {
            Ok(hash) => hash,
            Err(e) => {
                error!("Stored password hash for user {} is unreadable: {}", user.id, e);
                return Ok(None);
            }
        };

        match self.hasher.verify_password(password.as_bytes(), &hash) {
            Ok(()) => Ok(Some(user)),
            Err(_) => Ok(None),
        }
    }

    pub fn update_profile(
        &self,
        id: &str,
        changes: ProfileChanges,
    ) -> Result<StoredUser, UserError> {
        let mut user = self.get(id)?;

        if let Some(name) = changes.name.filter(|n| !n.trim().is_empty()) {
            user.name = name.trim().to_string();
        }
        if let Some(date) = changes.date {
            user.birth.date = Some(date);
        }
        if let Some(time) = changes.time {
            user.birth.time = Some(time);
        }
        if let Some(place) = changes.place {
            user.birth.place = Some(place);
        }

        self.write(&user)?;
        Ok(user)
    }

    fn write(&self, user: &StoredUser) -> Result<(), UserError> {
        std::fs::create_dir_all(&self.base)?;
        let path = self.user_path(&user.id)?;
        std::fs::write(path, serde_json::to_vec_pretty(user)?)?;
        Ok(())
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
