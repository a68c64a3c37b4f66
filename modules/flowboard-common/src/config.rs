use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Redis
    pub redis_url: String,

    // Stream + consumer group
    pub stream_key: String,
    pub group_name: String,

    // Web server
    pub web_host: String,
    pub web_port: u16,

    // Engine tuning
    pub stream_max_len: usize,
    pub read_block: Duration,
    pub read_error_backoff: Duration,
    pub recovery_interval: Duration,
    pub recovery_min_idle: Duration,
    pub recovery_batch: usize,
    pub board_fetch_count: usize,
    pub push_interval: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are malformed.
    pub fn from_env() -> Self {
        Self {
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            stream_key: env::var("WORKFLOW_STREAM_KEY")
                .unwrap_or_else(|_| "workflow:document_stream".to_string()),
            group_name: env::var("WORKFLOW_GROUP_NAME")
                .unwrap_or_else(|_| "approval_workers_group".to_string()),
            web_host: env::var("WEB_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            web_port: env_parse("WEB_PORT", 3000),
            stream_max_len: env_parse("WORKFLOW_STREAM_MAXLEN", 10_000),
            read_block: Duration::from_millis(env_parse("WORKFLOW_READ_BLOCK_MS", 5_000)),
            read_error_backoff: Duration::from_millis(env_parse("WORKFLOW_READ_BACKOFF_MS", 2_000)),
            recovery_interval: Duration::from_millis(env_parse(
                "WORKFLOW_RECOVERY_INTERVAL_MS",
                60_000,
            )),
            recovery_min_idle: Duration::from_millis(env_parse(
                "WORKFLOW_RECOVERY_MIN_IDLE_MS",
                60_000,
            )),
            recovery_batch: env_parse("WORKFLOW_RECOVERY_BATCH", 50),
            board_fetch_count: env_parse("WORKFLOW_BOARD_FETCH_COUNT", 50),
            push_interval: Duration::from_millis(env_parse("WORKFLOW_PUSH_INTERVAL_MS", 1_000)),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("{key} must be a number, got '{raw}'")),
        Err(_) => default,
    }
}
