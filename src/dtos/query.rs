//! Query DTOs - Parametri della query string

use crate::entities::CourseStatus;
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// GET /api/courses?status=&search=
#[derive(Deserialize, Debug, Default)]
pub struct CourseQuery {
    pub status: Option<CourseStatus>,
    pub search: Option<String>,
}

/// GET /api/materials?course_id=
#[derive(Deserialize, Debug, Default)]
pub struct MaterialQuery {
    pub course_id: Option<i64>,
}

/// GET /api/study-sessions?course_id=&from=&to=&limit=
#[derive(Deserialize, Debug, Default, Clone)]
pub struct StudySessionQuery {
    pub course_id: Option<i64>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

/// GET /api/study-sessions/stats?days=
#[derive(Deserialize, Debug, Default)]
pub struct StatsQuery {
    pub days: Option<i64>,
}
