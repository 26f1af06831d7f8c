//! In-memory sliding-window rate limiting.
//!
//! Each key (a client IP, or a client IP paired with a resume field) keeps the
//! instants of its recent requests. A request is rejected once the number of
//! instants inside the window reaches `max_requests`.
//!
//! Memory stays bounded two ways: a cleanup pass runs every
//! `cleanup_interval` checks, and at most `max_tracked_keys` keys are held.
//! When the cap is reached a new key forces a cleanup; if the map is still
//! full the request is rejected.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::config::Config;
use crate::enhance::models::FieldKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("rate limit exceeded, retry after {retry_after_secs}s")]
pub struct RateLimitExceeded {
    pub retry_after_secs: u64,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum number of requests allowed in the window.
    pub max_requests: u32,

    /// Size of the sliding window.
    pub window: Duration,

    /// Run cleanup every N checks.
    pub cleanup_interval: u64,

    /// Hard cap on the number of distinct keys held in memory.
    pub max_tracked_keys: usize,
}

impl RateLimitConfig {
    pub fn per_minute(max_requests: u32) -> Self {
        Self {
            max_requests,
            ..Default::default()
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window: Duration::from_secs(60),
            cleanup_interval: 100,
            max_tracked_keys: 10_000,
        }
    }
}

/// Sliding-window limiter keyed by any hashable value.
pub struct RateLimiter<K> {
    config: RateLimitConfig,
    state: RwLock<HashMap<K, Vec<Instant>>>,
    request_count: AtomicU64,
}

impl<K> RateLimiter<K>
where
    K: Hash + Eq + Clone + Debug,
{
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            state: RwLock::new(HashMap::new()),
            request_count: AtomicU64::new(0),
        }
    }

    /// Records a request for `key`, or rejects it if the window is full.
    pub fn check(&self, key: &K) -> Result<(), RateLimitExceeded> {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &K, now: Instant) -> Result<(), RateLimitExceeded> {
        let cutoff = now.checked_sub(self.config.window).unwrap_or(now);

        let count = self.request_count.fetch_add(1, Ordering::Relaxed);
        if count > 0 && count % self.config.cleanup_interval == 0 {
            tracing::debug!(request_count = count, "running periodic rate limiter cleanup");
            self.cleanup_at(now);
        }

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        if !state.contains_key(key) && state.len() >= self.config.max_tracked_keys {
            drop(state);
            tracing::debug!(
                max_tracked_keys = self.config.max_tracked_keys,
                "max tracked keys reached, forcing cleanup"
            );
            self.cleanup_at(now);
            state = self.state.write().unwrap_or_else(PoisonError::into_inner);

            if !state.contains_key(key) && state.len() >= self.config.max_tracked_keys {
                tracing::warn!(
                    key = ?key,
                    tracked_keys = state.len(),
                    "rejecting new key: max tracked keys reached"
                );
                return Err(RateLimitExceeded {
                    retry_after_secs: self.config.window.as_secs().max(1),
                });
            }
        }

        let timestamps = state.entry(key.clone()).or_default();
        timestamps.retain(|&t| t > cutoff);

        if timestamps.len() >= self.config.max_requests as usize {
            let retry_after = timestamps
                .first()
                .map(|&oldest| (oldest + self.config.window).saturating_duration_since(now))
                .unwrap_or(self.config.window);
            tracing::warn!(
                key = ?key,
                requests = timestamps.len(),
                max = self.config.max_requests,
                "rate limit exceeded"
            );
            return Err(RateLimitExceeded {
                retry_after_secs: ceil_secs(retry_after),
            });
        }

        timestamps.push(now);
        Ok(())
    }

    /// Drops keys with no requests inside the window.
    fn cleanup_at(&self, now: Instant) {
        let cutoff = now.checked_sub(self.config.window).unwrap_or(now);
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.retain(|_, timestamps| {
            timestamps.retain(|&t| t > cutoff);
            !timestamps.is_empty()
        });
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.state.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

fn ceil_secs(d: Duration) -> u64 {
    let secs = d.as_secs() + u64::from(d.subsec_nanos() > 0);
    secs.max(1)
}

/// The limiters shared by the enhancement and PDF endpoints.
pub struct Limiters {
    pub enhance_ip: RateLimiter<IpAddr>,
    pub enhance_field: RateLimiter<(IpAddr, FieldKind)>,
    pub pdf_ip: RateLimiter<IpAddr>,
}

impl Limiters {
    pub fn from_config(config: &Config) -> Self {
        Self {
            enhance_ip: RateLimiter::new(RateLimitConfig::per_minute(
                config.enhance_rate_limit_per_minute,
            )),
            enhance_field: RateLimiter::new(RateLimitConfig::per_minute(
                config.enhance_field_rate_limit_per_minute,
            )),
            pdf_ip: RateLimiter::new(RateLimitConfig::per_minute(
                config.pdf_rate_limit_per_minute,
            )),
        }
    }

    /// Per-IP limit first, then the per-field limit for that IP.
    pub fn check_enhance(&self, ip: IpAddr, field: FieldKind) -> Result<(), RateLimitExceeded> {
        self.enhance_ip.check(&ip)?;
        self.enhance_field.check(&(ip, field))
    }
}
