//! Core Module - Componenti infrastrutturali dell'applicazione
//!
//! - Autenticazione e JWT
//! - Configurazione
//! - Pool del database
//! - Gestione degli errori ed extractor delle richieste
//! - Rate limiting
//! - Stato dell'applicazione

pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod extract;
pub mod rate_limit;
pub mod state;

pub use auth::{Claims, authentication_middleware, decode_jwt, encode_jwt};
pub use config::Config;
pub use error::AppError;
pub use extract::{AppJson, AppPath, AppQuery};
pub use rate_limit::{RateLimiter, ai_rate_limit_middleware};
pub use state::AppState;
