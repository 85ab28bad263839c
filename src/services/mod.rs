//! Services module - Handler HTTP raggruppati per risorsa
//!
//! Ogni sotto-modulo contiene gli endpoint di un gruppo di routes. Gli handler
//! ricevono lo stato condiviso e lo `User` autenticato dalle extensions della
//! richiesta e ritornano `Result<_, AppError>`.

pub mod ai;
pub mod auth;
pub mod course;
pub mod material;
pub mod study_session;

pub use ai::{chat, generate_course, generate_flashcards, generate_lesson, generate_quiz};
pub use auth::{
    change_password, delete_account, get_me, login_user, register_user, update_profile,
};
pub use course::{
    create_course, delete_course, get_course, list_courses, set_lesson_completion, update_course,
};
pub use material::{
    delete_material, download_material, get_material, get_material_url, list_materials,
    update_material, upload_material,
};
pub use study_session::{
    create_session, delete_session, end_session, get_session, get_stats, list_sessions,
    update_session,
};

use crate::core::AppState;
use crate::monitoring::current_memory_mb;
use axum::extract::{Json, State};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
pub struct HealthDTO {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub memory_mb: f64,
}

/// Health check, senza autenticazione
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthDTO> {
    Json(HealthDTO {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.started_at.elapsed().as_secs(),
        memory_mb: current_memory_mb(),
    })
}
