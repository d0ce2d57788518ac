//! Cache-aside reads for list endpoints.
//!
//! Lists are looked up under a key derived from a prefix and the query
//! parameters, and refetched from the store on a miss. Nothing is invalidated
//! on writes: a cached list can be up to one TTL behind the store. The cache
//! is never allowed to fail a request; read and write errors are logged and
//! the store answers instead.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{CacheError, ConfigError};
use crate::metrics::{CACHE_ERRORS, CACHE_HITS, CACHE_MISSES, CACHE_SIZE};

const REDIS_CONNECT_TIMEOUT: Duration = Duration::from_millis(500);
const REDIS_COMMAND_TIMEOUT: Duration = Duration::from_millis(500);

/// Byte-level key/value store with per-entry expiry.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    async fn set_ex(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;

    /// Drops expired entries and returns how many went. Backends that expire
    /// keys on their own keep the default.
    fn purge_expired(&self) -> usize {
        0
    }
}

/// Runs [`CacheBackend::purge_expired`] every `every` until `cancel` fires.
pub fn spawn_cache_cleanup(
    cache: Arc<dyn CacheBackend>,
    every: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        // the first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let removed = cache.purge_expired();
                    if removed > 0 {
                        debug!(removed, "Purged expired cache entries");
                    }
                }
            }
        }
        debug!("Cache cleanup stopped");
    })
}

// Cache entry with timestamp
#[derive(Clone)]
pub struct CacheEntry {
    pub payload: Vec<u8>,
    pub created_at: Instant,
    pub ttl: Duration,
}

impl CacheEntry {
    fn is_fresh(&self) -> bool {
        self.created_at.elapsed() < self.ttl
    }
}

/// In-process backend, expired entries are dropped when read.
#[derive(Default)]
pub struct MemoryCache {
    entries: DashMap<String, CacheEntry>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        if let Some(entry) = self.entries.get(key) {
            if entry.is_fresh() {
                return Ok(Some(entry.payload.clone()));
            }
        }
        if self.entries.remove_if(key, |_, entry| !entry.is_fresh()).is_some() {
            CACHE_SIZE.set(self.len() as f64);
        }
        Ok(None)
    }

    async fn set_ex(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                payload: value,
                created_at: Instant::now(),
                ttl,
            },
        );
        CACHE_SIZE.set(self.len() as f64);
        Ok(())
    }

    fn purge_expired(&self) -> usize {
        let before = self.len();
        self.entries.retain(|_, entry| entry.is_fresh());
        let remaining = self.len();
        CACHE_SIZE.set(remaining as f64);
        before.saturating_sub(remaining)
    }
}

/// Redis backend. Connects on first use and keeps retrying on later calls
/// while the server is unreachable.
pub struct RedisCache {
    client: redis::Client,
    connection: OnceCell<ConnectionManager>,
}

impl RedisCache {
    pub fn new(url: &str) -> Result<Self, ConfigError> {
        let client =
            redis::Client::open(url).map_err(|e| ConfigError::CacheEndpoint(e.to_string()))?;
        Ok(Self {
            client,
            connection: OnceCell::new(),
        })
    }

    async fn connection(&self) -> Result<ConnectionManager, CacheError> {
        let manager = self
            .connection
            .get_or_try_init(|| async {
                timeout(REDIS_CONNECT_TIMEOUT, self.client.get_connection_manager())
                    .await
                    .map_err(|_| CacheError::Backend("connection timed out".to_string()))?
                    .map_err(CacheError::from)
            })
            .await?;
        Ok(manager.clone())
    }
}

// A server that accepts the connection but never answers must not stall the request
async fn bounded<T>(
    command: impl Future<Output = redis::RedisResult<T>>,
) -> Result<T, CacheError> {
    timeout(REDIS_COMMAND_TIMEOUT, command)
        .await
        .map_err(|_| CacheError::Backend("command timed out".to_string()))?
        .map_err(CacheError::from)
}

#[async_trait]
impl CacheBackend for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.connection().await?;
        let data: Option<Vec<u8>> = bounded(conn.get(key)).await?;
        Ok(data)
    }

    async fn set_ex(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let _: () = bounded(conn.set_ex(key, value, ttl.as_secs().max(1))).await?;
        Ok(())
    }
}

/// Builds `prefix:k1=v1&k2=v2` with parameter names in lexicographic order,
/// so the same query always lands on the same key. Values are form-encoded,
/// a `&` or `=` inside a value cannot pose as another parameter.
pub fn cache_key<K, V>(
    prefix: &str,
    params: impl IntoIterator<Item = (K, V)>,
) -> Result<String, CacheError>
where
    K: AsRef<str>,
    V: Display,
{
    let sorted: BTreeMap<String, String> = params
        .into_iter()
        .map(|(k, v)| (k.as_ref().to_string(), v.to_string()))
        .collect();

    let query = serde_urlencoded::to_string(&sorted)?;
    Ok(format!("{prefix}:{query}"))
}

pub fn students_by_teacher_key(teacher_id: i64) -> String {
    format!("students:teacher:{teacher_id}")
}

/// Serves a list from the cache under `prefix` + `params`, falling back to
/// `fetch` and writing its result back.
///
/// Only an error from `fetch` is returned.
pub async fn get_list_with_cache<T, E, F, Fut, K, V>(
    cache: &dyn CacheBackend,
    prefix: &str,
    params: impl IntoIterator<Item = (K, V)>,
    ttl: Duration,
    fetch: F,
) -> Result<Vec<T>, E>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Vec<T>, E>>,
    K: AsRef<str>,
    V: Display,
{
    match cache_key(prefix, params) {
        Ok(key) => get_by_key_with_cache(cache, &key, ttl, fetch).await,
        Err(e) => {
            CACHE_ERRORS.inc();
            warn!(%prefix, error = %e, "Cache key could not be built");
            fetch().await
        }
    }
}

/// Same read-through discipline as [`get_list_with_cache`] for a key the
/// caller already built, e.g. [`students_by_teacher_key`].
pub async fn get_by_key_with_cache<T, E, F, Fut>(
    cache: &dyn CacheBackend,
    key: &str,
    ttl: Duration,
    fetch: F,
) -> Result<Vec<T>, E>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Vec<T>, E>>,
{
    if let Some(cached) = read_list::<T>(cache, key).await {
        CACHE_HITS.inc();
        debug!(%key, "Cache HIT");
        return Ok(cached);
    }

    CACHE_MISSES.inc();
    debug!(%key, "Cache MISS");

    let list = fetch().await?;
    write_list(cache, key, &list, ttl).await;
    Ok(list)
}

async fn read_list<T: DeserializeOwned>(cache: &dyn CacheBackend, key: &str) -> Option<Vec<T>> {
    let bytes = match cache.get(key).await {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return None,
        Err(e) => {
            CACHE_ERRORS.inc();
            warn!(%key, error = %e, "Cache read failed");
            return None;
        }
    };

    match serde_json::from_slice::<Vec<T>>(&bytes) {
        Ok(list) if !list.is_empty() => Some(list),
        Ok(_) => None,
        Err(e) => {
            CACHE_ERRORS.inc();
            warn!(%key, error = %e, "Cached payload could not be decoded");
            None
        }
    }
}

async fn write_list<T: Serialize>(cache: &dyn CacheBackend, key: &str, list: &[T], ttl: Duration) {
    let result = match serde_json::to_vec(list) {
        Ok(payload) => cache.set_ex(key, payload, ttl).await,
        Err(e) => Err(CacheError::from(e)),
    };

    if let Err(e) = result {
        CACHE_ERRORS.inc();
        warn!(%key, error = %e, "Cache write failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TTL: Duration = Duration::from_secs(30);

    // Wraps a memory cache and counts calls, optionally failing all of them
    #[derive(Default)]
    struct CountingCache {
        inner: MemoryCache,
        fail: bool,
        reads: AtomicUsize,
        writes: AtomicUsize,
    }

    impl CountingCache {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl CacheBackend for CountingCache {
        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(CacheError::Backend("connection refused".into()));
            }
            self.inner.get(key).await
        }

        async fn set_ex(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(CacheError::Backend("connection refused".into()));
            }
            self.inner.set_ex(key, value, ttl).await
        }
    }

    fn student_params() -> Vec<(&'static str, String)> {
        vec![
            ("limit", "10".to_string()),
            ("offset", "0".to_string()),
            ("sort", "id".to_string()),
            ("order", "asc".to_string()),
        ]
    }

    #[test]
    fn key_sorts_parameter_names() {
        assert_eq!(
            cache_key("students:list", student_params()).unwrap(),
            "students:list:limit=10&offset=0&order=asc&sort=id"
        );
    }

    #[test]
    fn key_ignores_insertion_order() {
        let forward = student_params();
        let backward: Vec<_> = student_params().into_iter().rev().collect();
        let as_map: HashMap<&str, String> = student_params().into_iter().collect();

        let key = cache_key("teachers:list", forward).unwrap();
        assert_eq!(key, cache_key("teachers:list", backward).unwrap());
        assert_eq!(key, cache_key("teachers:list", &as_map).unwrap());
    }

    #[test]
    fn separators_inside_values_are_escaped() {
        let mut smuggled = student_params();
        smuggled.push(("search", "a&sort=x".to_string()));

        let mut plain = student_params();
        plain.retain(|(k, _)| *k != "sort");
        plain.push(("sort", "x&sort=id".to_string()));
        plain.push(("search", "a".to_string()));

        let smuggled = cache_key("students:list", smuggled).unwrap();
        assert_ne!(smuggled, cache_key("students:list", plain).unwrap());
        assert!(smuggled.contains("search=a%26sort%3Dx"));
    }

    #[tokio::test]
    async fn distinct_queries_never_share_a_page() {
        let cache = MemoryCache::new();
        let search = |term: &str, sort: &str| {
            vec![
                ("limit", "10".to_string()),
                ("offset", "0".to_string()),
                ("order", "asc".to_string()),
                ("search", term.to_string()),
                ("sort", sort.to_string()),
            ]
        };

        let first = get_list_with_cache(&cache, "students:list", search("a", "x&sort=id"), TTL, || async {
            Ok::<_, String>(vec!["bita".to_string()])
        })
        .await
        .unwrap();
        assert_eq!(first, vec!["bita".to_string()]);

        let second = get_list_with_cache(&cache, "students:list", search("a&sort=x", "id"), TTL, || async {
            Ok::<_, String>(Vec::<String>::new())
        })
        .await
        .unwrap();
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn miss_fetches_once_then_hit_skips_fetch() {
        let cache = CountingCache::default();
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let list = get_list_with_cache(&cache, "students:list", student_params(), TTL, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(vec![1_i64, 2, 3])
            })
            .await
            .unwrap();
            assert_eq!(list, vec![1, 2, 3]);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.writes.load(Ordering::SeqCst), 1);
        assert!(
            cache
                .inner
                .get("students:list:limit=10&offset=0&order=asc&sort=id")
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn unreachable_cache_falls_back_to_fetch() {
        let cache = CountingCache::failing();
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let list = get_list_with_cache(&cache, "students:list", student_params(), TTL, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(vec!["ada".to_string()])
            })
            .await
            .unwrap();
            assert_eq!(list, vec!["ada".to_string()]);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.reads.load(Ordering::SeqCst), 2);
        assert_eq!(cache.writes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn fetch_error_is_returned_and_nothing_cached() {
        let cache = CountingCache::default();

        let result: Result<Vec<i64>, String> =
            get_list_with_cache(&cache, "execs:list", student_params(), TTL, || async {
                Err("db down".to_string())
            })
            .await;

        assert_eq!(result, Err("db down".to_string()));
        assert_eq!(cache.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cached_empty_list_is_a_miss() {
        let cache = CountingCache::default();
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let list: Vec<i64> = get_list_with_cache(&cache, "execs:list", student_params(), TTL, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(Vec::new())
            })
            .await
            .unwrap();
            assert!(list.is_empty());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn undecodable_payload_is_refetched() {
        let cache = CountingCache::default();
        let key = students_by_teacher_key(7);
        cache.inner.set_ex(&key, b"not json".to_vec(), TTL).await.unwrap();

        let list = get_by_key_with_cache(&cache, &key, TTL, || async { Ok::<_, String>(vec![7_i64]) })
            .await
            .unwrap();

        assert_eq!(list, vec![7]);
        assert_eq!(cache.writes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn point_lookup_uses_teacher_key() {
        let cache = MemoryCache::new();

        get_by_key_with_cache(&cache, &students_by_teacher_key(3), TTL, || async {
            Ok::<_, String>(vec![10_i64, 11])
        })
        .await
        .unwrap();

        let bytes = cache.get("students:teacher:3").await.unwrap().unwrap();
        assert_eq!(serde_json::from_slice::<Vec<i64>>(&bytes).unwrap(), vec![10, 11]);
    }

    #[tokio::test]
    async fn memory_entries_expire() {
        let cache = MemoryCache::new();
        cache
            .set_ex("k", b"[1]".to_vec(), Duration::from_millis(20))
            .await
            .unwrap();
        assert!(cache.get("k").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(cache.get("k").await.unwrap().is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn purge_drops_entries_nobody_reads_again() {
        let cache = MemoryCache::new();
        for offset in 0..1000 {
            let key = format!("students:list:limit=10&offset={offset}");
            cache.set_ex(&key, b"[1]".to_vec(), Duration::from_millis(5)).await.unwrap();
        }
        cache.set_ex("students:teacher:1", b"[1]".to_vec(), TTL).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(cache.purge_expired(), 1000);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn cleanup_task_purges_then_stops_on_cancel() {
        let cache = Arc::new(MemoryCache::new());
        cache.set_ex("k", b"[1]".to_vec(), Duration::from_millis(5)).await.unwrap();

        let cancel = CancellationToken::new();
        let handle = spawn_cache_cleanup(cache.clone(), Duration::from_millis(10), cancel.clone());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(cache.is_empty());

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("cleanup task should exit")
            .unwrap();
    }

    #[test]
    fn rejects_malformed_redis_url() {
        assert!(RedisCache::new("not a url").is_err());
    }
}
