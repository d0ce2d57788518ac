use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram};

lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("campus_requests_total", "Total number of requests").expect("metric registers");
    pub static ref RATE_LIMITED_TOTAL: Counter =
        register_counter!("campus_rate_limited_total", "Requests rejected by the rate limiter").expect("metric registers");
    pub static ref CACHE_HITS: Counter =
        register_counter!("campus_cache_hits_total", "Total cache hits").expect("metric registers");
    pub static ref CACHE_MISSES: Counter =
        register_counter!("campus_cache_misses_total", "Total cache misses").expect("metric registers");
    pub static ref CACHE_ERRORS: Counter =
        register_counter!("campus_cache_errors_total", "Cache reads or writes that failed").expect("metric registers");
    pub static ref CACHE_SIZE: Gauge =
        register_gauge!("campus_cache_size", "Current number of entries in the in-memory cache").expect("metric registers");
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "campus_request_latency_seconds",
        "Request latency in seconds"
    )
    .expect("metric registers");
    pub static ref TRACKED_CLIENTS: Gauge =
        register_gauge!("campus_rate_limit_clients", "Clients currently tracked by the rate limiter").expect("metric registers");
}
