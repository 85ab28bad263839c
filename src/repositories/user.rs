//! UserRepository - Repository per la gestione degli utenti

use super::{Create, Delete, PoolType, Read, Update};
use crate::dtos::{CreateUserDTO, UpdateUserDTO};
use crate::entities::{User, UserPreferences};
use chrono::Utc;
use sqlx::{Error, types::Json};
use tracing::{debug, info, instrument};

const USER_COLUMNS: &str = "id, name, username, email, password_hash, bio, avatar_url, \
                            preferences, created_at, updated_at";

pub struct UserRepository {
    connection_pool: PoolType,
}

impl UserRepository {
    pub fn new(connection_pool: PoolType) -> Self {
        Self { connection_pool }
    }

    /// Find user by exact email match (case-insensitive)
    #[instrument(skip(self))]
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        debug!("Finding user by email");
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ? COLLATE NOCASE"
        ))
        .bind(email)
        .fetch_optional(&self.connection_pool)
        .await
    }

    /// Find user by exact username match (case-insensitive)
    #[instrument(skip(self))]
    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, Error> {
        debug!("Finding user by username");
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ? COLLATE NOCASE"
        ))
        .bind(username)
        .fetch_optional(&self.connection_pool)
        .await
    }

    /// Find the user a login identifier refers to, email first then username
    #[instrument(skip(self))]
    pub async fn find_by_login(&self, identifier: &str) -> Result<Option<User>, Error> {
        match self.find_by_email(identifier).await? {
            Some(user) => Ok(Some(user)),
            None => self.find_by_username(identifier).await,
        }
    }
}

impl Create<User, CreateUserDTO> for UserRepository {
    #[instrument(skip(self, data), fields(username = %data.username))]
    async fn create(&self, data: &CreateUserDTO) -> Result<User, Error> {
        debug!("Creating new user");
        let now = Utc::now();
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (name, username, email, password_hash, preferences, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING {USER_COLUMNS}"
        ))
        .bind(&data.name)
        .bind(&data.username)
        .bind(data.email.to_lowercase())
        .bind(&data.password_hash)
        .bind(Json(UserPreferences::default()))
        .bind(now)
        .bind(now)
        .fetch_one(&self.connection_pool)
        .await?;

        info!("User created with id {}", user.id);
        Ok(user)
    }
}

impl Read<User, i64> for UserRepository {
    #[instrument(skip(self), fields(user_id = %id))]
    async fn read(&self, id: &i64) -> Result<Option<User>, Error> {
        debug!("Reading user by id");
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.connection_pool)
            .await
    }
}

impl Update<User, UpdateUserDTO, i64> for UserRepository {
    #[instrument(skip(self, data), fields(user_id = %id))]
    async fn update(&self, id: &i64, data: &UpdateUserDTO) -> Result<User, Error> {
        debug!("Updating user");
        let mut query_builder = sqlx::QueryBuilder::new("UPDATE users SET updated_at = ");
        query_builder.push_bind(Utc::now());

        if let Some(ref name) = data.name {
            query_builder.push(", name = ").push_bind(name);
        }
        if let Some(ref bio) = data.bio {
            query_builder.push(", bio = ").push_bind(bio);
        }
        if let Some(ref avatar_url) = data.avatar_url {
            query_builder.push(", avatar_url = ").push_bind(avatar_url);
        }
        if let Some(ref preferences) = data.preferences {
            query_builder
                .push(", preferences = ")
                .push_bind(Json(preferences.clone()));
        }
        if let Some(ref password_hash) = data.password_hash {
            query_builder.push(", password_hash = ").push_bind(password_hash);
        }

        query_builder.push(" WHERE id = ").push_bind(*id);
        query_builder
            .push(" RETURNING ")
            .push(USER_COLUMNS);

        let user = query_builder
            .build_query_as::<User>()
            .fetch_optional(&self.connection_pool)
            .await?
            .ok_or(Error::RowNotFound)?;

        info!("User updated successfully");
        Ok(user)
    }
}

impl Delete<i64> for UserRepository {
    /// Hard delete. Courses, materials and sessions go with the user through
    /// ON DELETE CASCADE.
    #[instrument(skip(self), fields(user_id = %id))]
    async fn delete(&self, id: &i64) -> Result<(), Error> {
        debug!("Deleting user");
        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.connection_pool)
            .await?;

        info!("User deleted successfully");
        Ok(())
    }
}
