//! StudySession entity - Blocco di studio cronometrato, opzionalmente legato a un corso

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Serialize, Deserialize, Debug, Clone, FromRow)]
pub struct StudySession {
    pub id: i64,
    pub user_id: i64,
    pub course_id: Option<i64>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_secs: Option<i64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StudySession {
    pub fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }
}

/// Secondi interi tra inizio e fine, mai negativi
pub fn duration_between(started_at: DateTime<Utc>, ended_at: DateTime<Utc>) -> i64 {
    (ended_at - started_at).num_seconds().max(0)
}
