//! Token-bucket throttle keyed by an arbitrary string.
//!
//! Buckets live in the shared [`CacheStore`] with a TTL equal to the policy
//! window, so an idle key simply disappears and comes back full. Refill is
//! lazy: tokens are recomputed from the elapsed whole seconds on each request.
//! The read-modify-write runs through [`CacheStore::update`], so concurrent
//! requests on one key cannot both spend the same token.

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use common::errors::AppError;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{instrument, warn};

use crate::cache::CacheStore;

/// Capacity and refill window of a bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub points: u32,
    pub window_secs: u64,
}

impl RateLimitPolicy {
    pub const fn new(points: u32, window_secs: u64) -> Self {
        Self {
            points,
            window_secs,
        }
    }
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self::new(10, 60)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RateBucket {
    tokens: f64,
    last_refill_ms: i64,
}

pub struct RateLimiter {
    store: Arc<dyn CacheStore>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Spend one token from the bucket for `key`; `false` means the caller is throttled.
    pub async fn allow(&self, key: &str, policy: RateLimitPolicy) -> Result<bool, AppError> {
        self.allow_at(key, policy, Utc::now().timestamp_millis()).await
    }

    #[instrument(skip(self, policy), fields(key = %key))]
    pub async fn allow_at(
        &self,
        key: &str,
        policy: RateLimitPolicy,
        now_ms: i64,
    ) -> Result<bool, AppError> {
        if policy.points == 0 {
            return Ok(false);
        }

        let bucket_key = format!("rate_limit:{}", key);
        let stored = self
            .store
            .update(
                &bucket_key,
                policy.window_secs,
                Box::new(move |current| {
                    let bucket = current.and_then(|v| serde_json::from_value(v).ok());
                    take_token(bucket, policy, now_ms)
                        .and_then(|next| serde_json::to_value(next).ok())
                }),
            )
            .await?;

        let allowed = stored.is_some();
        if !allowed {
            warn!(
                key = %key,
                points = policy.points,
                window_secs = policy.window_secs,
                "Rate limit exceeded"
            );
        }
        Ok(allowed)
    }
}

fn take_token(
    bucket: Option<RateBucket>,
    policy: RateLimitPolicy,
    now_ms: i64,
) -> Option<RateBucket> {
    let points = f64::from(policy.points);

    let Some(bucket) = bucket else {
        return Some(RateBucket {
            tokens: points - 1.0,
            last_refill_ms: now_ms,
        });
    };

    let elapsed_secs = ((now_ms - bucket.last_refill_ms).max(0) / 1000) as f64;
    let refill_rate = points / policy.window_secs.max(1) as f64;
    let tokens = (bucket.tokens + elapsed_secs * refill_rate).min(points);

    // Whole tokens only, so the bucket never goes negative
    if tokens >= 1.0 {
        Some(RateBucket {
            tokens: tokens - 1.0,
            last_refill_ms: now_ms,
        })
    } else {
        None
    }
}

/// Middleware state: which limiter, which policy, and how requests are keyed.
#[derive(Clone)]
pub struct RateLimitGuard {
    limiter: Arc<RateLimiter>,
    policy: RateLimitPolicy,
    operation: Option<&'static str>,
}

impl RateLimitGuard {
    /// Default scope: one bucket per client address shared by every unpoliced route.
    pub fn per_client(limiter: Arc<RateLimiter>, policy: RateLimitPolicy) -> Self {
        Self {
            limiter,
            policy,
            operation: None,
        }
    }

    /// Explicit policy for one operation, bucketed per (client address, operation).
    pub fn per_operation(
        limiter: Arc<RateLimiter>,
        operation: &'static str,
        policy: RateLimitPolicy,
    ) -> Self {
        Self {
            limiter,
            policy,
            operation: Some(operation),
        }
    }

    fn key_for(&self, client: &str) -> String {
        match self.operation {
            Some(operation) => format!("{}:{}", client, operation),
            None => client.to_string(),
        }
    }
}

/// Rejects the request with 429 once the caller's bucket is empty
pub async fn enforce(
    State(guard): State<RateLimitGuard>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client = client_address(&request);
    let key = guard.key_for(&client);

    if !guard.limiter.allow(&key, guard.policy).await? {
        return Err(AppError::too_many_requests(format!(
            "limit of {} requests per {} seconds exceeded",
            guard.policy.points, guard.policy.window_secs
        )));
    }

    Ok(next.run(request).await)
}

fn client_address(request: &Request) -> String {
    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    if let Some(address) = forwarded {
        return address.to_string();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
