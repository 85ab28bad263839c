use crate::core::{AppError, AppState};
use crate::repositories::Read;
use axum::extract::State;
use axum::{body::Body, extract::Request, http, http::Response, middleware::Next};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Nome del cookie impostato al login
pub const TOKEN_COOKIE: &str = "token";

// Payload del JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,    // user id
    pub username: String,
    pub exp: usize,  // expiry time of the token
    pub iat: usize,  // issued at time of the token
}

#[instrument(skip(secret), fields(user_id = %user_id, username = %username))]
pub fn encode_jwt(
    user_id: i64,
    username: &str,
    secret: &str,
    ttl_hours: i64,
) -> Result<String, AppError> {
    debug!("Encoding JWT token for user");
    let now = Utc::now();
    let exp = (now + Duration::hours(ttl_hours)).timestamp() as usize;
    let iat = now.timestamp() as usize;
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp,
        iat,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map(|token| {
        info!("JWT token encoded successfully");
        token
    })
    .map_err(|e| {
        error!("Failed to encode JWT token: {:?}", e);
        AppError::internal_server_error("Error in encoding jwt token")
    })
}

#[instrument(skip(jwt_token, secret))]
pub fn decode_jwt(
    jwt_token: &str,
    secret: &str,
) -> Result<TokenData<Claims>, jsonwebtoken::errors::Error> {
    debug!("Decoding JWT token");
    decode(
        jwt_token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
}

/// Estrae il token da `Authorization: Bearer <token>`, in mancanza dell'header
/// usa il cookie di login
fn extract_token(req: &Request) -> Result<String, AppError> {
    if let Some(header) = req.headers().get(http::header::AUTHORIZATION) {
        let value = header.to_str().map_err(|_| {
            warn!("Invalid authorization header format");
            AppError::unauthorized("Invalid authorization header")
        })?;
        let mut parts = value.split_whitespace();
        return match (parts.next(), parts.next(), parts.next()) {
            (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => {
                Ok(token.to_string())
            }
            _ => {
                warn!("Malformed authorization header");
                Err(AppError::unauthorized(
                    "Authorization header must be 'Bearer <token>'",
                ))
            }
        };
    }

    req.headers()
        .get_all(http::header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == TOKEN_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
        .ok_or_else(|| {
            warn!("Missing authorization header");
            AppError::unauthorized("Please add the JWT token to the header")
        })
}

#[instrument(skip(state, req, next))]
pub async fn authentication_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response<Body>, AppError> {
    debug!("Running authentication middleware");
    let token = extract_token(&req)?;

    let token_data = decode_jwt(&token, &state.config.jwt_secret).map_err(|e| {
        warn!("Failed to decode JWT token: {:?}", e);
        AppError::unauthorized("Unable to decode token")
    })?;

    // Recupera l'utente dal database, il token da solo non basta se
    // l'account è stato eliminato
    let current_user = match state.users.read(&token_data.claims.sub).await? {
        Some(user) => {
            debug!("User authenticated: {}", user.username);
            user
        }
        None => {
            warn!("User not found in database: {}", token_data.claims.sub);
            return Err(AppError::unauthorized("You are not an authorized user"));
        }
    };
    req.extensions_mut().insert(current_user);
    Ok(next.run(req).await)
}

/// Cookie con il token appena emesso
pub fn session_cookie(token: &str, max_age_secs: i64) -> String {
    format!(
        "{}={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        TOKEN_COOKIE, token, max_age_secs
    )
}

/// Cookie che fa scartare il token al client
pub fn cleared_cookie() -> String {
    format!(
        "{}=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0",
        TOKEN_COOKIE
    )
}
