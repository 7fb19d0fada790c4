// src/config.rs

use std::env;
use std::str::FromStr;
use std::time::Duration;

use dotenvy::dotenv;
use url::Url;

/// Default endpoint of the toxicity scoring service.
pub const DEFAULT_TOXICITY_URL: &str = "http://127.0.0.1:8001/validate-comment";

/// Tokens are valid for seven days unless overridden.
pub const DEFAULT_JWT_EXPIRATION: u64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub port: u16,
    pub db_max_connections: u32,
    pub cors_origins: Vec<String>,
    pub moderation: ModerationConfig,
}

/// Settings for the external toxicity scorer.
#[derive(Debug, Clone)]
pub struct ModerationConfig {
    pub endpoint: Url,
    pub timeout: Duration,
    /// Optional local cut-off applied to every returned score.
    pub threshold: Option<f64>,
    /// When true, an unreachable scorer lets the comment through.
    pub fail_open: bool,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            endpoint: Url::parse(DEFAULT_TOXICITY_URL).expect("default toxicity URL is valid"),
            timeout: Duration::from_millis(3000),
            threshold: None,
            fail_open: true,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let cors_origins = env::var("CORS_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_else(|_| {
                vec![
                    "http://localhost:3000".to_string(),
                    "http://127.0.0.1:3000".to_string(),
                ]
            });

        let endpoint = env::var("TOXICITY_API_URL")
            .unwrap_or_else(|_| DEFAULT_TOXICITY_URL.to_string());
        let endpoint = Url::parse(&endpoint)
            .expect("TOXICITY_API_URL must be a valid URL");

        let moderation = ModerationConfig {
            endpoint,
            timeout: Duration::from_millis(parse_var("TOXICITY_TIMEOUT_MS").unwrap_or(3000)),
            threshold: parse_var("TOXICITY_THRESHOLD"),
            fail_open: parse_var("MODERATION_FAIL_OPEN").unwrap_or(true),
        };

        Self {
            database_url,
            jwt_secret,
            jwt_expiration: parse_var("JWT_EXPIRATION").unwrap_or(DEFAULT_JWT_EXPIRATION),
            rust_log,
            port: parse_var("PORT").unwrap_or(3000),
            db_max_connections: parse_var("DB_MAX_CONNECTIONS").unwrap_or(5),
            cors_origins,
            moderation,
        }
    }
}

/// Reads and parses an optional variable. Unparseable values are logged and ignored.
fn parse_var<T: FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring invalid value for {}: {:?}", key, raw);
            None
        }
    }
}
