use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::auth::Authenticator;
use crate::cache::{CacheBackend, MemoryCache, RedisCache, spawn_cache_cleanup};
use crate::config::{CacheBackendKind, Config};
use crate::error::ConfigError;
use crate::rate_limit::TokenBucketLimiter;
use crate::store::Store;

// app's shared state
pub struct AppState {
    pub config: Config,
    pub store: Store,
    pub cache: Option<Arc<dyn CacheBackend>>, // None when caching is disabled
    pub cache_ttl: Duration,
    pub limiter: Option<Arc<TokenBucketLimiter>>, // None when rate limiting is disabled
    pub authenticator: Authenticator,
}

impl AppState {
    pub fn new(config: Config) -> Result<Arc<Self>, ConfigError> {
        let limiter = if config.rate_limiter_enabled {
            let limiter = TokenBucketLimiter::new(config.rate_limit, config.rate_window())?;
            info!(
                "Rate limit: {} requests per {:?} ({:.2} tokens/s)",
                limiter.burst(),
                limiter.window(),
                limiter.rate()
            );
            Some(Arc::new(limiter))
        } else {
            info!("Rate limiter disabled");
            None
        };

        let cache: Option<Arc<dyn CacheBackend>> = match (config.cache_enabled, config.cache_backend) {
            (false, _) => {
                info!("Cache disabled");
                None
            }
            (true, CacheBackendKind::Memory) => {
                info!("Using in-memory cache (TTL: {}s)", config.cache_ttl);
                Some(Arc::new(MemoryCache::new()))
            }
            (true, CacheBackendKind::Redis) => {
                info!("Using Redis cache (TTL: {}s)", config.cache_ttl);
                Some(Arc::new(RedisCache::new(&config.redis_url)?))
            }
        };

        if config.jwt_secret == "example" {
            warn!("AUTH_TOKEN_SECRET is the built-in default, set a real secret outside development");
        }
        let authenticator = Authenticator::new(&config.jwt_secret, &config.jwt_issuer, config.jwt_ttl());

        Ok(Arc::new(Self {
            cache_ttl: config.cache_ttl(),
            config,
            store: Store::new(),
            cache,
            limiter,
            authenticator,
        }))
    }

    /// Starts the limiter sweep and the cache purge. Both stop once `cancel`
    /// fires.
    pub fn spawn_background_tasks(&self, cancel: &CancellationToken) -> Vec<JoinHandle<()>> {
        let mut tasks = Vec::new();
        if let Some(limiter) = &self.limiter {
            tasks.push(limiter.spawn_cleanup(cancel.clone()));
        }
        if let Some(cache) = &self.cache {
            let every = self.cache_ttl.max(Duration::from_secs(1));
            tasks.push(spawn_cache_cleanup(Arc::clone(cache), every, cancel.clone()));
        }
        tasks
    }
}
