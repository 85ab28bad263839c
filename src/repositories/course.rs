//! CourseRepository - Repository per la gestione dei corsi

use super::{Create, Delete, PoolType, Read, Update};
use crate::dtos::{CourseQuery, CreateCourseDTO, UpdateCourseDTO};
use crate::entities::Course;
use chrono::Utc;
use sqlx::{Error, types::Json};
use tracing::{debug, info, instrument};

const COURSE_COLUMNS: &str = "id, user_id, title, description, subject, difficulty, status, \
                              progress, modules, created_at, updated_at";

pub struct CourseRepository {
    connection_pool: PoolType,
}

impl CourseRepository {
    pub fn new(connection_pool: PoolType) -> Self {
        Self { connection_pool }
    }

    /// Course by id, only if it belongs to `user_id`
    #[instrument(skip(self))]
    pub async fn find_owned(&self, id: i64, user_id: i64) -> Result<Option<Course>, Error> {
        debug!("Reading owned course");
        sqlx::query_as::<_, Course>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE id = ? AND user_id = ?"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.connection_pool)
        .await
    }

    /// Courses of a user, newest first, with optional status and text filters.
    /// `search` is a literal, case-insensitive substring of title or subject.
    #[instrument(skip(self, filter))]
    pub async fn find_many_by_user(
        &self,
        user_id: i64,
        filter: &CourseQuery,
    ) -> Result<Vec<Course>, Error> {
        debug!("Listing courses for user");
        let mut query_builder = sqlx::QueryBuilder::new("SELECT ");
        query_builder
            .push(COURSE_COLUMNS)
            .push(" FROM courses WHERE user_id = ")
            .push_bind(user_id);

        if let Some(status) = filter.status {
            query_builder.push(" AND status = ").push_bind(status);
        }
        query_builder.push(" ORDER BY created_at DESC, id DESC");

        let mut courses = query_builder
            .build_query_as::<Course>()
            .fetch_all(&self.connection_pool)
            .await?;

        // SQLite LIKE and lower() only fold ASCII, the text filter runs here
        if let Some(needle) = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
        {
            courses.retain(|course| matches_search(course, &needle));
        }

        debug!("Found {} courses", courses.len());
        Ok(courses)
    }

    /// Titles of the given courses, used to label statistics
    #[instrument(skip(self, ids))]
    pub async fn find_titles(&self, ids: &[i64]) -> Result<Vec<(i64, String)>, Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut query_builder = sqlx::QueryBuilder::new("SELECT id, title FROM courses WHERE id IN (");
        let mut separated = query_builder.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        query_builder
            .build_query_as::<(i64, String)>()
            .fetch_all(&self.connection_pool)
            .await
    }
}

/// `needle` must already be lowercased
fn matches_search(course: &Course, needle: &str) -> bool {
    course.title.to_lowercase().contains(needle)
        || course
            .subject
            .as_deref()
            .is_some_and(|subject| subject.to_lowercase().contains(needle))
}

impl Create<Course, CreateCourseDTO> for CourseRepository {
    #[instrument(skip(self, data), fields(user_id = %data.user_id))]
    async fn create(&self, data: &CreateCourseDTO) -> Result<Course, Error> {
        debug!("Creating new course");
        let now = Utc::now();
        let course = sqlx::query_as::<_, Course>(&format!(
            "INSERT INTO courses \
             (user_id, title, description, subject, difficulty, status, progress, modules, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING {COURSE_COLUMNS}"
        ))
        .bind(data.user_id)
        .bind(&data.title)
        .bind(&data.description)
        .bind(&data.subject)
        .bind(data.difficulty)
        .bind(data.status)
        .bind(data.progress)
        .bind(Json(&data.modules))
        .bind(now)
        .bind(now)
        .fetch_one(&self.connection_pool)
        .await?;

        info!("Course created with id {}", course.id);
        Ok(course)
    }
}

impl Read<Course, i64> for CourseRepository {
    #[instrument(skip(self), fields(course_id = %id))]
    async fn read(&self, id: &i64) -> Result<Option<Course>, Error> {
        debug!("Reading course by id");
        sqlx::query_as::<_, Course>(&format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.connection_pool)
            .await
    }
}

impl Update<Course, UpdateCourseDTO, i64> for CourseRepository {
    #[instrument(skip(self, data), fields(course_id = %id))]
    async fn update(&self, id: &i64, data: &UpdateCourseDTO) -> Result<Course, Error> {
        debug!("Updating course");
        let mut query_builder = sqlx::QueryBuilder::new("UPDATE courses SET updated_at = ");
        query_builder.push_bind(Utc::now());

        if let Some(ref title) = data.title {
            query_builder.push(", title = ").push_bind(title);
        }
        if let Some(ref description) = data.description {
            query_builder.push(", description = ").push_bind(description);
        }
        if let Some(ref subject) = data.subject {
            query_builder.push(", subject = ").push_bind(subject);
        }
        if let Some(difficulty) = data.difficulty {
            query_builder.push(", difficulty = ").push_bind(difficulty);
        }
        if let Some(status) = data.status {
            query_builder.push(", status = ").push_bind(status);
        }
        if let Some(progress) = data.progress {
            query_builder.push(", progress = ").push_bind(progress);
        }
        if let Some(ref modules) = data.modules {
            query_builder.push(", modules = ").push_bind(Json(modules));
        }

        query_builder.push(" WHERE id = ").push_bind(*id);
        query_builder.push(" RETURNING ").push(COURSE_COLUMNS);

        let course = query_builder
            .build_query_as::<Course>()
            .fetch_optional(&self.connection_pool)
            .await?
            .ok_or(Error::RowNotFound)?;

        info!("Course updated successfully");
        Ok(course)
    }
}

impl Delete<i64> for CourseRepository {
    /// Materials go with the course (ON DELETE CASCADE), sessions are
    /// detached (ON DELETE SET NULL)
    #[instrument(skip(self), fields(course_id = %id))]
    async fn delete(&self, id: &i64) -> Result<(), Error> {
        debug!("Deleting course");
        sqlx::query("DELETE FROM courses WHERE id = ?")
            .bind(id)
            .execute(&self.connection_pool)
            .await?;

        info!("Course deleted successfully");
        Ok(())
    }
}
