//! User DTOs - Data Transfer Objects per account e profili

use crate::entities::{User, UserPreferences};
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::Validate;

lazy_static! {
    static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_.-]+$").unwrap();
}

/// Vista pubblica di un utente, l'hash della password non esce mai dal server
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UserDTO {
    pub id: i64,
    pub name: String,
    pub username: String,
    pub email: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub preferences: UserPreferences,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserDTO {
    fn from(value: User) -> Self {
        Self {
            id: value.id,
            name: value.name,
            username: value.username,
            email: value.email,
            bio: value.bio,
            avatar_url: value.avatar_url,
            preferences: value.preferences.0,
            created_at: value.created_at,
        }
    }
}

/// Body della registrazione
#[derive(Deserialize, Debug, Validate)]
pub struct RegisterDTO {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,

    #[validate(
        length(min = 3, max = 30, message = "Username must be between 3 and 30 characters"),
        regex(path = *USERNAME_RE, message = "Username may only contain letters, digits, '_', '.' and '-'")
    )]
    pub username: String,

    #[validate(email(message = "Email is not valid"))]
    pub email: String,

    #[validate(length(min = 8, max = 128, message = "Password must be between 8 and 128 characters"))]
    pub password: String,
}

/// Body del login, `email` accetta anche uno username
#[derive(Deserialize, Debug)]
pub struct LoginDTO {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct AuthResponseDTO {
    pub token: String,
    pub user: UserDTO,
}

#[derive(Deserialize, Debug, Validate)]
pub struct UpdateProfileDTO {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 1000, message = "Bio must be at most 1000 characters"))]
    pub bio: Option<String>,

    #[validate(url(message = "Avatar must be a valid URL"))]
    pub avatar_url: Option<String>,

    pub preferences: Option<UserPreferences>,
}

#[derive(Deserialize, Debug, Validate)]
pub struct ChangePasswordDTO {
    pub current_password: String,

    #[validate(length(min = 8, max = 128, message = "Password must be between 8 and 128 characters"))]
    pub new_password: String,
}

/// DTO per creare un nuovo utente (senza id, password già hashata)
#[derive(Debug, Clone)]
pub struct CreateUserDTO {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// DTO per aggiornare un utente (vengono scritti solo i campi `Some`)
#[derive(Debug, Clone, Default)]
pub struct UpdateUserDTO {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub preferences: Option<UserPreferences>,
    pub password_hash: Option<String>,
}
