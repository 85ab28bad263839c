//! Rate limiter a finestra scorrevole per le routes AI
//!
//! Ogni chiave (l'id dell'utente autenticato) ha una coda di istanti.
//! Gli istanti più vecchi della finestra vengono scartati a ogni controllo.

use crate::core::{AppError, AppState};
use crate::entities::User;
use axum::extract::State;
use axum::{body::Body, extract::Request, http::Response, middleware::Next};
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    windows: DashMap<i64, VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: DashMap::new(),
        }
    }

    /// Registra una richiesta per `key`. Se rifiutata ritorna quanto attendere.
    pub fn check(&self, key: i64) -> Result<(), Duration> {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: i64, now: Instant) -> Result<(), Duration> {
        let mut entry = self.windows.entry(key).or_default();
        let hits = entry.value_mut();

        while let Some(oldest) = hits.front() {
            if now.saturating_duration_since(*oldest) >= self.window {
                hits.pop_front();
            } else {
                break;
            }
        }

        if hits.len() >= self.max_requests {
            let retry_after = hits
                .front()
                .map(|oldest| self.window.saturating_sub(now.saturating_duration_since(*oldest)))
                .unwrap_or(self.window);
            return Err(retry_after);
        }

        hits.push_back(now);
        Ok(())
    }
}

/// Secondi interi di attesa per il client, mai zero
fn retry_after_secs(wait: Duration) -> u64 {
    let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
    secs.max(1)
}

/// Va eseguito dopo `authentication_middleware`, la chiave è l'id utente
#[instrument(skip(state, req, next))]
pub async fn ai_rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response<Body>, AppError> {
    let user_id = req
        .extensions()
        .get::<User>()
        .map(|u| u.id)
        .ok_or_else(|| {
            warn!("User not found in request extensions");
            AppError::unauthorized("User not authenticated")
        })?;

    if let Err(wait) = state.ai_limiter.check(user_id) {
        let secs = retry_after_secs(wait);
        warn!("AI rate limit exceeded for user {}, retry in {}s", user_id, secs);
        return Err(AppError::too_many_requests("Too many AI requests, slow down")
            .with_retry_after(secs));
    }

    debug!("AI rate limit check passed for user {}", user_id);
    Ok(next.run(req).await)
}
