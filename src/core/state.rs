//! Application State - Stato condiviso dell'applicazione
//!
//! Contiene i repository, i client di storage e AI, il rate limiter e
//! la configurazione condivisa da tutte le routes e i middleware.

use crate::ai::TextGenerator;
use crate::core::config::Config;
use crate::core::rate_limit::RateLimiter;
use crate::repositories::{
    CourseRepository, MaterialRepository, PoolType, StudySessionRepository, UserRepository,
};
use crate::storage::FileStorage;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Stato globale dell'applicazione condiviso da routes e middleware
pub struct AppState {
    /// Repository per gli utenti
    pub users: UserRepository,

    /// Repository per i corsi
    pub courses: CourseRepository,

    /// Repository per i materiali caricati
    pub materials: MaterialRepository,

    /// Repository per le sessioni di studio
    pub sessions: StudySessionRepository,

    /// Object storage con i file dei materiali
    pub storage: FileStorage,

    /// Backend di generazione testo per le routes AI
    pub ai: Arc<dyn TextGenerator>,

    /// Finestra scorrevole per utente davanti alle routes AI
    pub ai_limiter: RateLimiter,

    pub config: Config,

    pub started_at: Instant,
}

impl AppState {
    /// Crea lo stato collegando ogni repository al pool condiviso.
    pub fn new(
        pool: PoolType,
        storage: FileStorage,
        ai: Arc<dyn TextGenerator>,
        config: Config,
    ) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            courses: CourseRepository::new(pool.clone()),
            materials: MaterialRepository::new(pool.clone()),
            sessions: StudySessionRepository::new(pool),
            storage,
            ai,
            ai_limiter: RateLimiter::new(
                config.ai_rate_limit_max,
                Duration::from_secs(config.ai_rate_limit_window_secs),
            ),
            config,
            started_at: Instant::now(),
        }
    }
}
