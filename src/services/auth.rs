//! Auth services - Registrazione, login e gestione dell'account

use crate::core::auth::{cleared_cookie, session_cookie};
use crate::core::{AppError, AppJson, AppState, encode_jwt};
use crate::dtos::{
    AuthResponseDTO, ChangePasswordDTO, CreateUserDTO, LoginDTO, RegisterDTO, UpdateProfileDTO,
    UpdateUserDTO, UserDTO,
};
use crate::entities::User;
use crate::repositories::{Create, Delete, Update};
use crate::storage::FileStorage;
use axum::{
    Extension,
    extract::{Json, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use validator::Validate;

fn hash_password(password: &str) -> Result<String, AppError> {
    User::hash_password(password).map_err(|e| {
        error!("Failed to hash password: {:?}", e);
        AppError::internal_server_error("Failed to hash password")
    })
}

fn header_value(value: &str) -> Result<HeaderValue, AppError> {
    HeaderValue::from_str(value)
        .map_err(|_| AppError::internal_server_error("Failed to build response header"))
}

/// Token più gli header che lo trasportano (Authorization e cookie)
fn issue_session(state: &AppState, user: &User) -> Result<(String, HeaderMap), AppError> {
    let hours = state.config.jwt_expiration_hours;
    let token = encode_jwt(user.id, &user.username, &state.config.jwt_secret, hours)?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        header_value(&session_cookie(&token, hours * 60 * 60))?,
    );
    headers.insert(
        header::AUTHORIZATION,
        header_value(&format!("Bearer {}", token))?,
    );
    Ok((token, headers))
}

#[instrument(skip(state, body), fields(username = %body.username))]
pub async fn register_user(
    State(state): State<Arc<AppState>>,
    AppJson(body): AppJson<RegisterDTO>,
) -> Result<impl IntoResponse, AppError> {
    debug!("Registering new user");
    // 1. Validare il body (lunghezze, caratteri dello username, formato email)
    // 2. Se email o username sono già in uso ritornare CONFLICT
    // 3. Calcolare l'hash della password e salvare l'utente
    // 4. Emettere un token così il client è subito autenticato
    body.validate()?;

    if state.users.find_by_email(&body.email).await?.is_some() {
        warn!("Registration attempted with an email already in use");
        return Err(AppError::conflict("Email already registered"));
    }
    if state.users.find_by_username(&body.username).await?.is_some() {
        warn!("Registration attempted with a username already in use");
        return Err(AppError::conflict("Username already taken"));
    }

    let password_hash = hash_password(&body.password)?;
    let user = state
        .users
        .create(&CreateUserDTO {
            name: body.name.trim().to_string(),
            username: body.username,
            email: body.email,
            password_hash,
        })
        .await?;

    let (token, headers) = issue_session(&state, &user)?;

    info!("User registered with id {}", user.id);
    Ok((
        StatusCode::CREATED,
        headers,
        Json(AuthResponseDTO {
            token,
            user: UserDTO::from(user),
        }),
    ))
}

#[instrument(skip(state, body))]
pub async fn login_user(
    State(state): State<Arc<AppState>>,
    AppJson(body): AppJson<LoginDTO>,
) -> Result<impl IntoResponse, AppError> {
    debug!("Login attempt");
    // 1. Fallire subito con identificativo o password vuoti, prima di interrogare il DB
    // 2. Cercare l'utente per email, poi per username
    // 3. Verificare la password con l'hash salvato
    // 4. Ritornare il token nel body, nell'header Authorization e come cookie
    let identifier = body.email.trim();
    if identifier.is_empty() || body.password.is_empty() {
        return Err(AppError::unauthorized("Invalid credentials"));
    }

    let user = match state.users.find_by_login(identifier).await? {
        Some(user) => user,
        None => {
            warn!("Login for unknown user");
            return Err(AppError::unauthorized("Invalid credentials"));
        }
    };

    if !user.verify_password(&body.password) {
        warn!("Wrong password for user {}", user.id);
        return Err(AppError::unauthorized("Invalid credentials"));
    }

    let (token, headers) = issue_session(&state, &user)?;

    info!("User {} logged in", user.id);
    Ok((
        StatusCode::OK,
        headers,
        Json(AuthResponseDTO {
            token,
            user: UserDTO::from(user),
        }),
    ))
}

#[instrument(skip(current_user), fields(user_id = %current_user.id))]
pub async fn get_me(Extension(current_user): Extension<User>) -> Json<UserDTO> {
    debug!("Returning authenticated user");
    Json(UserDTO::from(current_user))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.id))]
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    AppJson(body): AppJson<UpdateProfileDTO>,
) -> Result<Json<UserDTO>, AppError> {
    debug!("Updating profile");
    body.validate()?;

    let updated = state
        .users
        .update(
            &current_user.id,
            &UpdateUserDTO {
                name: body.name.map(|n| n.trim().to_string()),
                bio: body.bio,
                avatar_url: body.avatar_url,
                preferences: body.preferences,
                password_hash: None,
            },
        )
        .await?;

    info!("Profile updated");
    Ok(Json(UserDTO::from(updated)))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.id))]
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    AppJson(body): AppJson<ChangePasswordDTO>,
) -> Result<StatusCode, AppError> {
    debug!("Changing password");
    // 1. Validare la nuova password
    // 2. La password attuale deve corrispondere, altrimenti UNAUTHORIZED
    // 3. Salvare il nuovo hash
    body.validate()?;

    if !current_user.verify_password(&body.current_password) {
        warn!("Password change with wrong current password");
        return Err(AppError::unauthorized("Current password is incorrect"));
    }

    let password_hash = hash_password(&body.new_password)?;
    state
        .users
        .update(
            &current_user.id,
            &UpdateUserDTO {
                password_hash: Some(password_hash),
                ..Default::default()
            },
        )
        .await?;

    info!("Password changed");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.id))]
pub async fn delete_account(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
) -> Result<impl IntoResponse, AppError> {
    debug!("Deleting account");
    // 1. Rimuovere tutti i file salvati dell'utente (best effort)
    // 2. Eliminare l'utente, le righe collegate seguono per cascade
    // 3. Cancellare il cookie di login
    state
        .storage
        .purge_prefix(&FileStorage::user_prefix(current_user.id))
        .await;

    state.users.delete(&current_user.id).await?;

    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, header_value(&cleared_cookie())?);

    info!("Account deleted");
    Ok((StatusCode::NO_CONTENT, headers))
}
