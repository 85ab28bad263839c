//! Modulo AI - Backend di generazione testo e gestione delle risposte
//!
//! I services parlano con un [`TextGenerator`]. In produzione è il client
//! HTTP di Gemini, nei test un generatore scriptato. Le risposte del modello
//! sono testo: [`parse`] recupera il JSON al loro interno e [`output`] lo
//! converte nei formati dell'API.

pub mod gemini;
pub mod output;
pub mod parse;
pub mod prompts;

pub use gemini::GeminiClient;
pub use parse::extract_json;

use async_trait::async_trait;
use thiserror::Error;

/// Errori prodotti durante la comunicazione con il backend di generazione
#[derive(Debug, Error)]
pub enum AiError {
    /// Nessuna API key configurata.
    #[error("AI generation is not configured")]
    NotConfigured,

    /// Errore di trasporto HTTP.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Il provider ha risposto con uno status di errore.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Il provider ha risposto 429.
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Il provider ha risposto senza testo (candidate bloccato o vuoto).
    #[error("empty response from model")]
    EmptyResponse,

    /// La risposta non contiene il JSON atteso.
    #[error("parse error: {0}")]
    Parse(String),
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Esegue un prompt e ritorna la risposta testuale del modello
    async fn generate(&self, prompt: &str) -> Result<String, AiError>;
}

/// Usato senza API key configurata, ogni chiamata fallisce con `NotConfigured`
pub struct DisabledGenerator;

#[async_trait]
impl TextGenerator for DisabledGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, AiError> {
        Err(AiError::NotConfigured)
    }
}
