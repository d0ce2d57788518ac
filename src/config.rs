use std::time::Duration;

use clap::{ArgAction, Parser, ValueEnum};

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackendKind {
    Memory,
    Redis,
}

// CLI argument structure, every flag can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "campus-api")]
#[command(about = "School management REST backend")]
pub struct Config {
    // Address to listen on
    #[arg(long, env = "ADDR", default_value = "0.0.0.0:8080")]
    pub addr: String,

    // Deployment label, only used in logs
    #[arg(long, env = "ENV", default_value = "development")]
    pub env: String,

    #[arg(long, env = "RATE_LIMITER_ENABLED", default_value_t = true, action = ArgAction::Set)]
    pub rate_limiter_enabled: bool,

    // Rate limit max requests per window (also the burst size)
    #[arg(long, env = "RATE_LIMITER_REQUESTS_COUNT", default_value_t = 10)]
    pub rate_limit: u32,

    // Rate limit window in seconds
    #[arg(long, env = "RATE_LIMITER_WINDOW_SECS", default_value_t = 5)]
    pub rate_window: u64,

    #[arg(long, env = "CACHE_ENABLED", default_value_t = true, action = ArgAction::Set)]
    pub cache_enabled: bool,

    #[arg(long, env = "CACHE_BACKEND", value_enum, default_value_t = CacheBackendKind::Memory)]
    pub cache_backend: CacheBackendKind,

    // Redis address and credentials, e.g. redis://:password@localhost:6379/0
    #[arg(long, env = "REDIS_URL", default_value = "redis://127.0.0.1:6379/0")]
    pub redis_url: String,

    // Cache TTL in seconds for list queries
    #[arg(long, env = "CACHE_TTL_SECS", default_value_t = 30)]
    pub cache_ttl: u64,

    // Requests still running after this many seconds are answered with 408
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 60)]
    pub request_timeout: u64,

    #[arg(long, env = "AUTH_TOKEN_SECRET", default_value = "example", hide_env_values = true)]
    pub jwt_secret: String,

    #[arg(long, env = "AUTH_TOKEN_ISSUER", default_value = "campus")]
    pub jwt_issuer: String,

    // Token lifetime in hours
    #[arg(long, env = "AUTH_TOKEN_TTL_HOURS", default_value_t = 24 * 7)]
    pub jwt_ttl_hours: u64,

    // Credentials guarding exec self-registration
    #[arg(long, env = "AUTH_BASIC_USER", default_value = "admin")]
    pub basic_user: String,

    #[arg(long, env = "AUTH_BASIC_PASS", default_value = "admin", hide_env_values = true)]
    pub basic_pass: String,
}

impl Config {
    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_window)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn jwt_ttl(&self) -> Duration {
        Duration::from_secs(self.jwt_ttl_hours * 60 * 60)
    }
}
