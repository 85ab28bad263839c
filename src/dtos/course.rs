//! Course DTOs - Data Transfer Objects per i corsi

use crate::entities::{Course, CourseModule, CourseStatus, Difficulty};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CourseDTO {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub subject: Option<String>,
    pub difficulty: Difficulty,
    pub status: CourseStatus,
    pub progress: i64,
    pub modules: Vec<CourseModule>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Course> for CourseDTO {
    fn from(value: Course) -> Self {
        Self {
            id: value.id,
            user_id: value.user_id,
            title: value.title,
            description: value.description,
            subject: value.subject,
            difficulty: value.difficulty,
            status: value.status,
            progress: value.progress,
            modules: value.modules.0,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

/// Body della richiesta POST /api/courses
#[derive(Deserialize, Debug, Validate)]
pub struct CreateCourseRequestDTO {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,

    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,

    #[validate(length(max = 100, message = "Subject must be at most 100 characters"))]
    pub subject: Option<String>,

    #[serde(default)]
    pub difficulty: Option<Difficulty>,

    #[serde(default)]
    pub modules: Vec<CourseModule>,
}

/// Body della richiesta PUT /api/courses/{id}
#[derive(Deserialize, Debug, Validate)]
pub struct UpdateCourseRequestDTO {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: Option<String>,

    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,

    #[validate(length(max = 100, message = "Subject must be at most 100 characters"))]
    pub subject: Option<String>,

    pub difficulty: Option<Difficulty>,
    pub status: Option<CourseStatus>,
    pub modules: Option<Vec<CourseModule>>,
}

/// Body della richiesta PATCH /api/courses/{id}/modules/{m}/lessons/{l}
#[derive(Deserialize, Debug)]
pub struct LessonProgressDTO {
    pub completed: bool,
}

/// DTO per creare un nuovo corso (senza id)
#[derive(Debug, Clone)]
pub struct CreateCourseDTO {
    pub user_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub subject: Option<String>,
    pub difficulty: Difficulty,
    pub status: CourseStatus,
    pub progress: i64,
    pub modules: Vec<CourseModule>,
}

/// DTO per aggiornare un corso (vengono scritti solo i campi `Some`)
#[derive(Debug, Clone, Default)]
pub struct UpdateCourseDTO {
    pub title: Option<String>,
    pub description: Option<String>,
    pub subject: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub status: Option<CourseStatus>,
    pub progress: Option<i64>,
    pub modules: Option<Vec<CourseModule>>,
}
