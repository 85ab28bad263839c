//! StudySessionRepository - Repository per la gestione delle sessioni di studio

use super::{Create, Delete, PoolType, Read, Update};
use crate::dtos::{CreateStudySessionDTO, StudySessionQuery, UpdateStudySessionDTO};
use crate::entities::StudySession;
use chrono::{DateTime, Utc};
use sqlx::Error;
use tracing::{debug, info, instrument};

const SESSION_COLUMNS: &str =
    "id, user_id, course_id, started_at, ended_at, duration_secs, notes, created_at";

pub struct StudySessionRepository {
    connection_pool: PoolType,
}

impl StudySessionRepository {
    pub fn new(connection_pool: PoolType) -> Self {
        Self { connection_pool }
    }

    /// Session by id, only if it belongs to `user_id`
    #[instrument(skip(self))]
    pub async fn find_owned(&self, id: i64, user_id: i64) -> Result<Option<StudySession>, Error> {
        debug!("Reading owned study session");
        sqlx::query_as::<_, StudySession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM study_sessions WHERE id = ? AND user_id = ?"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.connection_pool)
        .await
    }

    /// The session still running for a user, if any
    #[instrument(skip(self))]
    pub async fn find_open_by_user(&self, user_id: i64) -> Result<Option<StudySession>, Error> {
        debug!("Looking for an open study session");
        sqlx::query_as::<_, StudySession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM study_sessions \
             WHERE user_id = ? AND ended_at IS NULL ORDER BY started_at DESC LIMIT 1"
        ))
        .bind(user_id)
        .fetch_optional(&self.connection_pool)
        .await
    }

    /// Sessions of a user, newest first
    #[instrument(skip(self, filter))]
    pub async fn find_many_by_user(
        &self,
        user_id: i64,
        filter: &StudySessionQuery,
        limit: i64,
    ) -> Result<Vec<StudySession>, Error> {
        debug!("Listing study sessions for user");
        let mut query_builder = sqlx::QueryBuilder::new("SELECT ");
        query_builder
            .push(SESSION_COLUMNS)
            .push(" FROM study_sessions WHERE user_id = ")
            .push_bind(user_id);
        if let Some(course_id) = filter.course_id {
            query_builder.push(" AND course_id = ").push_bind(course_id);
        }
        if let Some(from) = filter.from {
            query_builder.push(" AND started_at >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            query_builder.push(" AND started_at <= ").push_bind(to);
        }
        query_builder
            .push(" ORDER BY started_at DESC, id DESC LIMIT ")
            .push_bind(limit);

        let sessions = query_builder
            .build_query_as::<StudySession>()
            .fetch_all(&self.connection_pool)
            .await?;

        debug!("Found {} study sessions", sessions.len());
        Ok(sessions)
    }

    /// Finished sessions that started at or after `since`
    #[instrument(skip(self))]
    pub async fn find_finished_since(
        &self,
        user_id: i64,
        since: DateTime<Utc>,
    ) -> Result<Vec<StudySession>, Error> {
        debug!("Loading finished study sessions for statistics");
        sqlx::query_as::<_, StudySession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM study_sessions \
             WHERE user_id = ? AND ended_at IS NOT NULL AND started_at >= ? \
             ORDER BY started_at ASC"
        ))
        .bind(user_id)
        .bind(since)
        .fetch_all(&self.connection_pool)
        .await
    }
}

impl Create<StudySession, CreateStudySessionDTO> for StudySessionRepository {
    #[instrument(skip(self, data), fields(user_id = %data.user_id))]
    async fn create(&self, data: &CreateStudySessionDTO) -> Result<StudySession, Error> {
        debug!("Creating new study session");
        let session = sqlx::query_as::<_, StudySession>(&format!(
            "INSERT INTO study_sessions \
             (user_id, course_id, started_at, ended_at, duration_secs, notes, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING {SESSION_COLUMNS}"
        ))
        .bind(data.user_id)
        .bind(data.course_id)
        .bind(data.started_at)
        .bind(data.ended_at)
        .bind(data.duration_secs)
        .bind(&data.notes)
        .bind(Utc::now())
        .fetch_one(&self.connection_pool)
        .await?;

        info!("Study session created with id {}", session.id);
        Ok(session)
    }
}

impl Read<StudySession, i64> for StudySessionRepository {
    #[instrument(skip(self), fields(session_id = %id))]
    async fn read(&self, id: &i64) -> Result<Option<StudySession>, Error> {
        debug!("Reading study session by id");
        sqlx::query_as::<_, StudySession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM study_sessions WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
    }
}

impl Update<StudySession, UpdateStudySessionDTO, i64> for StudySessionRepository {
    #[instrument(skip(self, data), fields(session_id = %id))]
    async fn update(&self, id: &i64, data: &UpdateStudySessionDTO) -> Result<StudySession, Error> {
        debug!("Updating study session");
        let current = self.read(id).await?.ok_or(Error::RowNotFound)?;

        if data.course_id.is_none()
            && data.ended_at.is_none()
            && data.duration_secs.is_none()
            && data.notes.is_none()
        {
            debug!("No fields to update, returning current session");
            return Ok(current);
        }

        let mut query_builder = sqlx::QueryBuilder::new("UPDATE study_sessions SET ");
        let mut separated = query_builder.separated(", ");
        if let Some(course_id) = data.course_id {
            separated.push("course_id = ");
            separated.push_bind_unseparated(course_id);
        }
        if let Some(ended_at) = data.ended_at {
            separated.push("ended_at = ");
            separated.push_bind_unseparated(ended_at);
        }
        if let Some(duration_secs) = data.duration_secs {
            separated.push("duration_secs = ");
            separated.push_bind_unseparated(duration_secs);
        }
        if let Some(ref notes) = data.notes {
            separated.push("notes = ");
            separated.push_bind_unseparated(notes);
        }
        query_builder.push(" WHERE id = ").push_bind(*id);
        query_builder.push(" RETURNING ").push(SESSION_COLUMNS);

        let session = query_builder
            .build_query_as::<StudySession>()
            .fetch_one(&self.connection_pool)
            .await?;

        info!("Study session updated successfully");
        Ok(session)
    }
}

impl Delete<i64> for StudySessionRepository {
    #[instrument(skip(self), fields(session_id = %id))]
    async fn delete(&self, id: &i64) -> Result<(), Error> {
        debug!("Deleting study session");
        sqlx::query("DELETE FROM study_sessions WHERE id = ?")
            .bind(id)
            .execute(&self.connection_pool)
            .await?;

        info!("Study session deleted successfully");
        Ok(())
    }
}
