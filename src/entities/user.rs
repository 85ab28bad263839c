//! User entity - Account utente con helper per la password e blob delle preferenze

use super::enums::Difficulty;
use bcrypt::{DEFAULT_COST, hash, verify};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::{FromRow, types::Json};

#[derive(Serialize, Deserialize, Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub preferences: Json<UserPreferences>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Verify if target_password matches the stored hashed password
    pub fn verify_password(&self, target_password: &str) -> bool {
        verify(target_password, &self.password_hash).unwrap_or(false)
    }

    /// Hash a password using bcrypt with default cost
    pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
        let hash = hash(password, DEFAULT_COST)?;
        Ok(hash)
    }
}

/// Preferenze lato client. Le chiavi sconosciute al server vengono mantenute
/// in `extra` e riscritte invariate.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct UserPreferences {
    pub theme: String,
    pub daily_goal_minutes: u32,
    pub notifications: bool,
    pub preferred_difficulty: Option<Difficulty>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            theme: "light".to_string(),
            daily_goal_minutes: 30,
            notifications: true,
            preferred_difficulty: None,
            extra: Map::new(),
        }
    }
}
