use serde::Deserialize;

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// PostgreSQL connection string
    pub database_url: String,

    /// Redis connection string (only used when dispatch dedup is enabled)
    pub redis_url: String,

    /// Maximum number of PostgreSQL connections in the pool (default: 20)
    pub db_max_connections: u32,

    /// Firebase project that owns the FCM sender
    pub fcm_project_id: Option<String>,

    /// FCM API base URL (default: https://fcm.googleapis.com)
    pub fcm_base_url: String,

    /// Path to a Google service-account JSON file
    pub google_application_credentials: Option<String>,

    /// Pre-issued OAuth2 access token; skips the service-account exchange
    pub fcm_access_token: Option<String>,

    /// Concurrent per-token requests within one batch (default: 10)
    pub fcm_send_concurrency: usize,

    /// Per-request HTTP timeout in seconds (default: 10)
    pub fcm_request_timeout_secs: u64,

    /// Interval between polls of the notifications table in milliseconds
    pub trigger_poll_interval_ms: u64,

    /// Maximum rows claimed per poll
    pub trigger_batch_size: i64,

    /// How long a claimed row stays with its poller before another may take it
    pub trigger_claim_lease_secs: u64,

    /// TTL of the per-record dispatch claim; 0 disables dedup
    pub dispatch_dedup_ttl_seconds: u64,

    /// Port the HTTP API listens on
    pub api_port: u16,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?,
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", "20", "u32")?,
            fcm_project_id: std::env::var("FCM_PROJECT_ID").ok(),
            fcm_base_url: std::env::var("FCM_BASE_URL")
                .unwrap_or_else(|_| "https://fcm.googleapis.com".to_string()),
            google_application_credentials: std::env::var("GOOGLE_APPLICATION_CREDENTIALS").ok(),
            fcm_access_token: std::env::var("FCM_ACCESS_TOKEN").ok(),
            fcm_send_concurrency: parse_var("FCM_SEND_CONCURRENCY", "10", "usize")?,
            fcm_request_timeout_secs: parse_var("FCM_REQUEST_TIMEOUT_SECS", "10", "u64")?,
            trigger_poll_interval_ms: parse_var("TRIGGER_POLL_INTERVAL_MS", "1000", "u64")?,
            trigger_batch_size: parse_var("TRIGGER_BATCH_SIZE", "100", "i64")?,
            trigger_claim_lease_secs: parse_var("TRIGGER_CLAIM_LEASE_SECS", "300", "u64")?,
            dispatch_dedup_ttl_seconds: parse_var("DISPATCH_DEDUP_TTL_SECONDS", "0", "u64")?,
            api_port: parse_var("API_PORT", "3000", "u16")?,
        })
    }

    /// FCM project id, required by anything that sends pushes.
    pub fn require_fcm_project_id(&self) -> anyhow::Result<&str> {
        self.fcm_project_id
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("FCM_PROJECT_ID environment variable is required"))
    }

    pub fn dedup_enabled(&self) -> bool {
        self.dispatch_dedup_ttl_seconds > 0
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, default: &str, kind: &str) -> anyhow::Result<T> {
    std::env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|_| anyhow::anyhow!("{key} must be a valid {kind}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_var_default() {
        let v: u64 = parse_var("DONORLINK_TEST_UNSET_VAR", "42", "u64").unwrap();
        assert_eq!(v, 42);
    }

    #[test]
    fn test_parse_var_invalid_default_reports_key() {
        let err = parse_var::<u16>("DONORLINK_TEST_UNSET_PORT", "not-a-port", "u16").unwrap_err();
        assert_eq!(
            err.to_string(),
            "DONORLINK_TEST_UNSET_PORT must be a valid u16"
        );
    }
}
