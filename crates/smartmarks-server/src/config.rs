use anyhow::Context;
use std::env;
use std::time::Duration;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Postgres connection URL; bookmarks are kept in memory when unset
    pub database_url: Option<String>,
    /// HS256 key for session tokens
    pub jwt_secret: Vec<u8>,
    pub session_ttl: Duration,
    /// Per-user change feed buffer before slow subscribers start lagging
    pub feed_capacity: usize,
    pub google_client_id: Option<String>,
    /// OAuth redirect target registered with the provider
    pub redirect_url: String,
    /// Mount the callback route that mints sessions for verified identities
    pub trusted_callback: bool,
    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("PORT must be a port number")?;
        let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.is_empty());

        let jwt_secret = env::var("SMARTMARKS_JWT_SECRET")
            .context("SMARTMARKS_JWT_SECRET must be set")?
            .into_bytes();
        if jwt_secret.len() < 32 {
            anyhow::bail!("SMARTMARKS_JWT_SECRET must be at least 32 bytes");
        }

        let session_ttl = env::var("SMARTMARKS_SESSION_TTL_SECS")
            .unwrap_or_else(|_| "86400".to_string())
            .parse()
            .map(Duration::from_secs)
            .context("SMARTMARKS_SESSION_TTL_SECS must be a number of seconds")?;
        let feed_capacity = env::var("SMARTMARKS_FEED_CAPACITY")
            .unwrap_or_else(|_| "256".to_string())
            .parse()
            .context("SMARTMARKS_FEED_CAPACITY must be a positive integer")?;
        if feed_capacity == 0 {
            anyhow::bail!("SMARTMARKS_FEED_CAPACITY must be a positive integer");
        }

        let google_client_id = env::var("SMARTMARKS_GOOGLE_CLIENT_ID").ok();
        let redirect_url = env::var("SMARTMARKS_REDIRECT_URL")
            .unwrap_or_else(|_| format!("http://localhost:{}/auth/callback/google", port));
        let trusted_callback = env::var("SMARTMARKS_TRUSTED_CALLBACK")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        let log_format = match env::var("SMARTMARKS_LOG_FORMAT") {
            Ok(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Ok(Self {
            host,
            port,
            database_url,
            jwt_secret,
            session_ttl,
            feed_capacity,
            google_client_id,
            redirect_url,
            trusted_callback,
            log_format,
        })
    }
}
