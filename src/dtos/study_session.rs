//! Study session DTOs - Data Transfer Objects per sessioni e statistiche

use crate::entities::StudySession;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct StudySessionDTO {
    pub id: i64,
    pub course_id: Option<i64>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_secs: Option<i64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<StudySession> for StudySessionDTO {
    fn from(value: StudySession) -> Self {
        Self {
            id: value.id,
            course_id: value.course_id,
            started_at: value.started_at,
            ended_at: value.ended_at,
            duration_secs: value.duration_secs,
            notes: value.notes,
            created_at: value.created_at,
        }
    }
}

/// Body della richiesta POST /api/study-sessions
#[derive(Deserialize, Debug, Validate)]
pub struct CreateStudySessionRequestDTO {
    pub course_id: Option<i64>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,

    #[validate(length(max = 5000, message = "Notes must be at most 5000 characters"))]
    pub notes: Option<String>,
}

/// Body della richiesta PUT /api/study-sessions/{id}
///
/// `course_id`: se assente il collegamento resta, `null` scollega la sessione.
#[derive(Deserialize, Debug, Validate)]
pub struct UpdateStudySessionRequestDTO {
    #[serde(default, deserialize_with = "present")]
    pub course_id: Option<Option<i64>>,
    pub ended_at: Option<DateTime<Utc>>,

    #[validate(length(max = 5000, message = "Notes must be at most 5000 characters"))]
    pub notes: Option<String>,
}

/// Avvolge in `Some` qualunque valore presente, `null` compreso.
/// Insieme a `#[serde(default)]` un campo mancante resta `None`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Body della richiesta POST /api/study-sessions/{id}/end
#[derive(Deserialize, Debug, Default, Validate)]
pub struct EndStudySessionDTO {
    #[validate(length(max = 5000, message = "Notes must be at most 5000 characters"))]
    pub notes: Option<String>,
}

/// DTO per creare una nuova sessione (senza id)
#[derive(Debug, Clone)]
pub struct CreateStudySessionDTO {
    pub user_id: i64,
    pub course_id: Option<i64>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_secs: Option<i64>,
    pub notes: Option<String>,
}

/// DTO per aggiornare una sessione (vengono scritti solo i campi `Some`,
/// `course_id: Some(None)` rimuove il corso)
#[derive(Debug, Clone, Default)]
pub struct UpdateStudySessionDTO {
    pub course_id: Option<Option<i64>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_secs: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CourseStudyTotalDTO {
    pub course_id: Option<i64>,
    pub course_title: Option<String>,
    pub sessions: i64,
    pub total_duration_secs: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DailyStudyTotalDTO {
    pub date: NaiveDate,
    pub total_duration_secs: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StudyStatsDTO {
    pub days: i64,
    pub total_sessions: i64,
    pub total_duration_secs: i64,
    pub average_duration_secs: i64,
    pub current_streak_days: i64,
    pub by_course: Vec<CourseStudyTotalDTO>,
    pub daily: Vec<DailyStudyTotalDTO>,
}
