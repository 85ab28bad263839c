#![allow(dead_code)]

use async_trait::async_trait;
use axum_test::TestServer;
use serde_json::{Value, json};
use sqlx::SqlitePool;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use studytrack::ai::{AiError, TextGenerator};
use studytrack::core::{AppState, Config, encode_jwt};
use studytrack::storage::FileStorage;

pub const JWT_SECRET: &str = "studytrack-integration-test-secret";

/// Limite di upload usato nei test, abbastanza piccolo da superarlo facilmente
pub const MAX_UPLOAD_BYTES: usize = 1024;

/// Configurazione condivisa da ogni server di test
pub fn test_config() -> Config {
    Config {
        jwt_secret: JWT_SECRET.to_string(),
        max_upload_bytes: MAX_UPLOAD_BYTES,
        ai_rate_limit_max: 3,
        ai_rate_limit_window_secs: 60,
        ..Config::default()
    }
}

/// Generatore di testo che risponde da una coda e registra i prompt ricevuti
#[derive(Default)]
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<String, AiError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        self.replies.lock().unwrap().push_back(Ok(reply.into()));
    }

    pub fn push_error(&self, error: AiError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, AiError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(AiError::EmptyResponse))
    }
}

/// Crea un AppState per i test
///
/// # Arguments
/// * `pool` - Pool creato da `#[sqlx::test]`, migrations già applicate
///
/// # Returns
/// Arc<AppState> con storage in memoria e un generatore senza risposte in coda
pub fn create_test_state(pool: SqlitePool) -> Arc<AppState> {
    create_test_state_with_ai(pool, ScriptedGenerator::new())
}

pub fn create_test_state_with_ai(pool: SqlitePool, ai: Arc<ScriptedGenerator>) -> Arc<AppState> {
    Arc::new(AppState::new(
        pool,
        FileStorage::in_memory(),
        ai,
        test_config(),
    ))
}

/// Crea un TestServer attorno al router reale
pub fn create_test_server(state: Arc<AppState>) -> TestServer {
    let app = studytrack::create_router(state);
    TestServer::new(app).expect("Failed to create test server")
}

/// Token valido per uno degli utenti dei fixtures
pub fn create_test_jwt(user_id: i64, username: &str) -> String {
    encode_jwt(user_id, username, JWT_SECRET, 24).expect("Failed to create JWT token")
}

/// Token per `alice` (id 1 nel fixture users)
pub fn alice_token() -> String {
    create_test_jwt(1, "alice")
}

/// Token per `bob` (id 2 nel fixture users)
pub fn bob_token() -> String {
    create_test_jwt(2, "bob")
}

/// Registra un utente tramite l'API e ritorna il token e il JSON dell'utente
pub async fn register(server: &TestServer, username: &str, password: &str) -> (String, Value) {
    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "name": "Test User",
            "username": username,
            "email": format!("{}@example.com", username),
            "password": password,
        }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);

    let body: Value = response.json();
    let token = body["token"].as_str().expect("token in response").to_string();
    (token, body["user"].clone())
}
