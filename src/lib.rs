//! StudyTrack server library - espone il router e i moduli per il binario e i test

pub mod ai;
pub mod core;
pub mod dtos;
pub mod entities;
pub mod monitoring;
pub mod repositories;
pub mod services;
pub mod storage;

pub use crate::core::{AppError, AppState, Config, auth, config};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, patch, post, put},
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Spazio per l'incapsulamento multipart e i campi testo attorno al file
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Crea il router dell'applicazione
pub fn create_router(state: Arc<AppState>) -> Router {
    use services::health;

    let api = Router::new()
        .route("/health", get(health))
        .nest("/auth", configure_auth_routes(state.clone()))
        .nest("/courses", configure_course_routes(state.clone()))
        .nest("/materials", configure_material_routes(state.clone()))
        .nest("/study-sessions", configure_study_session_routes(state.clone()))
        .nest("/ai", configure_ai_routes(state.clone()));

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origin = match config.frontend_url.parse::<HeaderValue>() {
        Ok(origin) => AllowOrigin::exact(origin),
        Err(_) => {
            warn!("FRONTEND_URL is not a valid origin, cross-origin requests are refused");
            AllowOrigin::list([])
        }
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers([header::AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(60 * 60))
}

/// Configura le routes di autenticazione: login e register sono pubbliche, il resto richiede il token
fn configure_auth_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use crate::core::authentication_middleware;
    use services::*;

    let public_routes = Router::new()
        .route("/register", post(register_user))
        .route("/login", post(login_user));

    let protected_routes = Router::new()
        .route("/me", get(get_me))
        .route("/profile", put(update_profile))
        .route("/password", put(change_password))
        .route("/account", delete(delete_account))
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ));

    public_routes.merge(protected_routes)
}

fn configure_course_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use crate::core::authentication_middleware;
    use services::*;

    Router::new()
        .route("/", get(list_courses).post(create_course))
        .route(
            "/{course_id}",
            get(get_course).put(update_course).delete(delete_course),
        )
        .route(
            "/{course_id}/modules/{module_index}/lessons/{lesson_index}",
            patch(set_lesson_completion),
        )
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ))
}

fn configure_material_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use crate::core::authentication_middleware;
    use services::*;

    let body_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/", get(list_materials).post(upload_material))
        .route(
            "/{material_id}",
            get(get_material)
                .put(update_material)
                .delete(delete_material),
        )
        .route("/{material_id}/url", get(get_material_url))
        .route("/{material_id}/download", get(download_material))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ))
}

fn configure_study_session_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use crate::core::authentication_middleware;
    use services::*;

    Router::new()
        .route("/", get(list_sessions).post(create_session))
        .route("/stats", get(get_stats))
        .route(
            "/{session_id}",
            get(get_session).put(update_session).delete(delete_session),
        )
        .route("/{session_id}/end", post(end_session))
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ))
}

/// Configura le routes AI: prima l'autenticazione (layer esterno), poi il rate limit per utente
fn configure_ai_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use crate::core::{ai_rate_limit_middleware, authentication_middleware};
    use services::*;

    Router::new()
        .route("/generate-lesson", post(generate_lesson))
        .route("/generate-quiz", post(generate_quiz))
        .route("/generate-flashcards", post(generate_flashcards))
        .route("/generate-course", post(generate_course))
        .route("/chat", post(chat))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            ai_rate_limit_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ))
}
