//! MaterialRepository - Repository per la gestione dei materiali caricati

use super::{Create, Delete, PoolType, Read, Update};
use crate::dtos::{CreateMaterialDTO, UpdateMaterialDTO};
use crate::entities::Material;
use chrono::Utc;
use sqlx::Error;
use tracing::{debug, info, instrument};

const MATERIAL_COLUMNS: &str = "id, user_id, course_id, title, description, file_name, \
                                content_type, size_bytes, storage_key, created_at";

pub struct MaterialRepository {
    connection_pool: PoolType,
}

impl MaterialRepository {
    pub fn new(connection_pool: PoolType) -> Self {
        Self { connection_pool }
    }

    /// Material by id, only if it belongs to `user_id`
    #[instrument(skip(self))]
    pub async fn find_owned(&self, id: i64, user_id: i64) -> Result<Option<Material>, Error> {
        debug!("Reading owned material");
        sqlx::query_as::<_, Material>(&format!(
            "SELECT {MATERIAL_COLUMNS} FROM materials WHERE id = ? AND user_id = ?"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.connection_pool)
        .await
    }

    /// Materials of a user, newest first, optionally restricted to one course
    #[instrument(skip(self))]
    pub async fn find_many_by_user(
        &self,
        user_id: i64,
        course_id: Option<i64>,
    ) -> Result<Vec<Material>, Error> {
        debug!("Listing materials for user");
        let mut query_builder = sqlx::QueryBuilder::new("SELECT ");
        query_builder
            .push(MATERIAL_COLUMNS)
            .push(" FROM materials WHERE user_id = ")
            .push_bind(user_id);
        if let Some(course_id) = course_id {
            query_builder.push(" AND course_id = ").push_bind(course_id);
        }
        query_builder.push(" ORDER BY created_at DESC, id DESC");

        let materials = query_builder
            .build_query_as::<Material>()
            .fetch_all(&self.connection_pool)
            .await?;

        debug!("Found {} materials", materials.len());
        Ok(materials)
    }
}

impl Create<Material, CreateMaterialDTO> for MaterialRepository {
    #[instrument(skip(self, data), fields(course_id = %data.course_id, key = %data.storage_key))]
    async fn create(&self, data: &CreateMaterialDTO) -> Result<Material, Error> {
        debug!("Creating new material");
        let material = sqlx::query_as::<_, Material>(&format!(
            "INSERT INTO materials \
             (user_id, course_id, title, description, file_name, content_type, size_bytes, storage_key, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING {MATERIAL_COLUMNS}"
        ))
        .bind(data.user_id)
        .bind(data.course_id)
        .bind(&data.title)
        .bind(&data.description)
        .bind(&data.file_name)
        .bind(&data.content_type)
        .bind(data.size_bytes)
        .bind(&data.storage_key)
        .bind(Utc::now())
        .fetch_one(&self.connection_pool)
        .await?;

        info!("Material created with id {}", material.id);
        Ok(material)
    }
}

impl Read<Material, i64> for MaterialRepository {
    #[instrument(skip(self), fields(material_id = %id))]
    async fn read(&self, id: &i64) -> Result<Option<Material>, Error> {
        debug!("Reading material by id");
        sqlx::query_as::<_, Material>(&format!(
            "SELECT {MATERIAL_COLUMNS} FROM materials WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
    }
}

impl Update<Material, UpdateMaterialDTO, i64> for MaterialRepository {
    #[instrument(skip(self, data), fields(material_id = %id))]
    async fn update(&self, id: &i64, data: &UpdateMaterialDTO) -> Result<Material, Error> {
        debug!("Updating material");
        let current = self.read(id).await?.ok_or(Error::RowNotFound)?;

        if data.title.is_none() && data.description.is_none() {
            debug!("No fields to update, returning current material");
            return Ok(current);
        }

        let mut query_builder = sqlx::QueryBuilder::new("UPDATE materials SET ");
        let mut separated = query_builder.separated(", ");
        if let Some(ref title) = data.title {
            separated.push("title = ");
            separated.push_bind_unseparated(title);
        }
        if let Some(ref description) = data.description {
            separated.push("description = ");
            separated.push_bind_unseparated(description);
        }
        query_builder.push(" WHERE id = ").push_bind(*id);
        query_builder.push(" RETURNING ").push(MATERIAL_COLUMNS);

        let material = query_builder
            .build_query_as::<Material>()
            .fetch_one(&self.connection_pool)
            .await?;

        info!("Material updated successfully");
        Ok(material)
    }
}

impl Delete<i64> for MaterialRepository {
    #[instrument(skip(self), fields(material_id = %id))]
    async fn delete(&self, id: &i64) -> Result<(), Error> {
        debug!("Deleting material");
        sqlx::query("DELETE FROM materials WHERE id = ?")
            .bind(id)
            .execute(&self.connection_pool)
            .await?;

        info!("Material deleted successfully");
        Ok(())
    }
}
