//! Per-client token-bucket admission.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::RateLimitConfig;
use crate::error::ApiError;
use crate::observability::metrics;

/// A simple token bucket.
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(capacity: f64, now: Instant) -> Self {
        Self {
            tokens: capacity,
            last_refill: now,
        }
    }

    fn try_acquire(&mut self, capacity: f64, refill_rate: f64, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();

        // Refill tokens
        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        if now > self.last_refill {
            self.last_refill = now;
        }

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// One token bucket per client key, all under the same policy.
///
/// A single lock guards the whole map, so the refill-check-consume sequence
/// for a key is atomic with respect to every other caller. Entries are never
/// removed unless [`ClientLimiterRegistry::sweep_idle`] is called.
pub struct ClientLimiterRegistry {
    buckets: Mutex<HashMap<String, TokenBucket>>,
    capacity: f64,
    refill_per_second: f64,
}

impl ClientLimiterRegistry {
    pub fn new(capacity: u32, refill_per_second: f64) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            capacity: capacity as f64,
            refill_per_second,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.capacity, config.refill_per_second)
    }

    /// Admit or reject one request from `key`, consuming a token on success.
    pub fn admit(&self, key: &str) -> bool {
        let mut buckets = self.lock();
        // Read the clock under the lock so `last_refill` only moves forward.
        let now = Instant::now();
        self.acquire(&mut buckets, key, now)
    }

    /// Same as [`admit`](Self::admit), with the clock supplied by the caller.
    pub fn admit_at(&self, key: &str, now: Instant) -> bool {
        let mut buckets = self.lock();
        self.acquire(&mut buckets, key, now)
    }

    fn acquire(&self, buckets: &mut HashMap<String, TokenBucket>, key: &str, now: Instant) -> bool {
        let bucket = buckets
            .entry(key.to_owned())
            .or_insert_with(|| TokenBucket::new(self.capacity, now));

        bucket.try_acquire(self.capacity, self.refill_per_second, now)
    }

    /// Drop buckets untouched for longer than `retention`. Returns how many.
    pub fn sweep_idle(&self, retention: Duration) -> usize {
        self.sweep_idle_at(retention, Instant::now())
    }

    pub fn sweep_idle_at(&self, retention: Duration, now: Instant) -> usize {
        let mut buckets = self.lock();
        let before = buckets.len();
        buckets.retain(|_, bucket| now.saturating_duration_since(bucket.last_refill) <= retention);
        before - buckets.len()
    }

    /// Number of client keys currently tracked.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> u32 {
        self.capacity as u32
    }

    pub fn refill_per_second(&self) -> f64 {
        self.refill_per_second
    }

    // Bucket updates cannot panic halfway, so a poisoned map is still consistent.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, TokenBucket>> {
        self.buckets.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ClientLimiterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientLimiterRegistry")
            .field("capacity", &self.capacity)
            .field("refill_per_second", &self.refill_per_second)
            .field("clients", &self.len())
            .finish()
    }
}

/// Admission gate. Runs before anything else on every route, keyed by peer IP.
pub async fn admission_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(registry): State<Arc<ClientLimiterRegistry>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let key = addr.ip().to_string();

    if registry.admit(&key) {
        next.run(request).await
    } else {
        tracing::warn!(client = %key, path = %request.uri().path(), "Rate limit exceeded");
        metrics::record_rate_limited();
        ApiError::RateLimited.into_response()
    }
}
