//! Material DTOs - Data Transfer Objects per i materiali caricati

use crate::entities::Material;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MaterialDTO {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
}

impl From<Material> for MaterialDTO {
    fn from(value: Material) -> Self {
        Self {
            id: value.id,
            course_id: value.course_id,
            title: value.title,
            description: value.description,
            file_name: value.file_name,
            content_type: value.content_type,
            size_bytes: value.size_bytes,
            created_at: value.created_at,
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct MaterialUrlDTO {
    pub url: String,
    pub expires_in_secs: u64,
}

/// DTO per creare il record di un materiale dopo aver salvato il file
#[derive(Debug, Clone)]
pub struct CreateMaterialDTO {
    pub user_id: i64,
    pub course_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub storage_key: String,
}

/// Body della richiesta PUT /api/materials/{id}, usato anche dal repository
#[derive(Deserialize, Debug, Clone, Default, Validate)]
pub struct UpdateMaterialDTO {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: Option<String>,

    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,
}
