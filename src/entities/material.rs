//! Material entity - File di studio caricato, i byte stanno nell'object storage

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Serialize, Deserialize, Debug, Clone, FromRow)]
pub struct Material {
    pub id: i64,
    pub user_id: i64,
    pub course_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub storage_key: String,
    pub created_at: DateTime<Utc>,
}

impl Material {
    /// Indica se il contenuto può essere inserito in un prompt testuale
    pub fn is_text(&self) -> bool {
        self.content_type.starts_with("text/") || self.content_type == "application/json"
    }
}
