use dotenv::dotenv;
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use tracing::{info, warn};

const DEFAULT_JWT_SECRET: &str = "change-me-studytrack-dev-secret";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub server_host: String,
    pub server_port: u16,
    pub app_env: String,
    pub frontend_url: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_api_base: String,
    pub storage_bucket: Option<String>,
    pub upload_dir: String,
    pub max_upload_bytes: usize,
    pub signed_url_ttl_secs: u64,
    pub ai_rate_limit_max: usize,
    pub ai_rate_limit_window_secs: u64,
    pub monitor_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://studytrack.db?mode=rwc".to_string(),
            max_connections: 10,
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            jwt_expiration_hours: 24,
            server_host: "127.0.0.1".to_string(),
            server_port: 5000,
            app_env: "development".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            gemini_api_key: None,
            gemini_model: "gemini-1.5-flash".to_string(),
            gemini_api_base: "https://generativelanguage.googleapis.com".to_string(),
            storage_bucket: None,
            upload_dir: "./uploads".to_string(),
            max_upload_bytes: 50 * 1024 * 1024,
            signed_url_ttl_secs: 3600,
            ai_rate_limit_max: 10,
            ai_rate_limit_window_secs: 60,
            monitor_interval_secs: 0,
        }
    }
}

impl Config {
    /// Carica la configurazione dalle variabili d'ambiente.
    /// Chiama prima dotenv() così un file `.env` locale viene letto.
    pub fn from_env() -> Result<Self, String> {
        dotenv().ok();
        let defaults = Self::default();

        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            warn!("JWT_SECRET not set, using default (not secure for production!)");
            defaults.jwt_secret.clone()
        });

        let max_upload_mb: usize = parse_var("MAX_UPLOAD_MB", 50)?;
        let ai_rate_limit_max: usize = parse_var("AI_RATE_LIMIT_MAX", defaults.ai_rate_limit_max)?;
        if ai_rate_limit_max == 0 {
            return Err("Invalid AI_RATE_LIMIT_MAX: must be at least 1".to_string());
        }
        let ai_rate_limit_window_secs: u64 =
            parse_var("AI_RATE_LIMIT_WINDOW_SECS", defaults.ai_rate_limit_window_secs)?;
        if ai_rate_limit_window_secs == 0 {
            return Err("Invalid AI_RATE_LIMIT_WINDOW_SECS: must be at least 1".to_string());
        }

        Ok(Config {
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            max_connections: parse_var("MAX_DB_CONNECTIONS", defaults.max_connections)?,
            jwt_secret,
            jwt_expiration_hours: parse_var("JWT_EXPIRATION_HOURS", defaults.jwt_expiration_hours)?,
            server_host: env::var("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: parse_var("SERVER_PORT", defaults.server_port)?,
            app_env: env::var("APP_ENV").unwrap_or(defaults.app_env),
            frontend_url: env::var("FRONTEND_URL").unwrap_or(defaults.frontend_url),
            gemini_api_key: non_empty_var("GEMINI_API_KEY"),
            gemini_model: env::var("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            gemini_api_base: env::var("GEMINI_API_BASE").unwrap_or(defaults.gemini_api_base),
            storage_bucket: non_empty_var("STORAGE_BUCKET"),
            upload_dir: env::var("UPLOAD_DIR").unwrap_or(defaults.upload_dir),
            max_upload_bytes: max_upload_mb * 1024 * 1024,
            signed_url_ttl_secs: parse_var("SIGNED_URL_TTL_SECS", defaults.signed_url_ttl_secs)?,
            ai_rate_limit_max,
            ai_rate_limit_window_secs,
            monitor_interval_secs: parse_var("MONITOR_INTERVAL_SECS", defaults.monitor_interval_secs)?,
        })
    }

    /// Logga la configurazione (nascondendo i segreti)
    pub fn log_summary(&self) {
        info!("Server configuration:");
        info!("  Environment: {}", self.app_env);
        info!("  Server address: {}:{}", self.server_host, self.server_port);
        info!("  Database: {}", Self::mask_url(&self.database_url));
        info!("  Max DB connections: {}", self.max_connections);
        info!("  Frontend origin: {}", self.frontend_url);
        info!(
            "  Storage: {}",
            match &self.storage_bucket {
                Some(bucket) => format!("gcs://{}", bucket),
                None => format!("local ({})", self.upload_dir),
            }
        );
        info!("  Max upload: {} bytes", self.max_upload_bytes);
        info!(
            "  AI: {} ({})",
            self.gemini_model,
            if self.gemini_api_key.is_some() { "key configured" } else { "disabled, no key" }
        );
        info!(
            "  AI rate limit: {} requests / {}s",
            self.ai_rate_limit_max, self.ai_rate_limit_window_secs
        );
        if self.jwt_secret == DEFAULT_JWT_SECRET {
            warn!("  JWT secret: USING DEFAULT (INSECURE!)");
        } else {
            info!("  JWT secret: custom secret configured");
        }
    }

    /// Maschera le credenziali di un URL di connessione per i log
    fn mask_url(url: &str) -> String {
        if let Some(at_pos) = url.find('@') {
            if let Some(scheme_end) = url.find("://") {
                let scheme = &url[..scheme_end + 3];
                let after_at = &url[at_pos..];
                return format!("{}***{}", scheme, after_at);
            }
            return "***".to_string();
        }
        url.to_string()
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(key: &str, default: T) -> Result<T, String>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| format!("Invalid {}: {} ({})", key, raw, e)),
        Err(_) => Ok(default),
    }
}
