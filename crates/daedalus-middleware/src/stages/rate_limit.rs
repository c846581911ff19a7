//! Rate limiting middleware.
//!
//! Each client address owns a token bucket holding up to `attempts` tokens
//! and refilling at `attempts / interval`. A request spends one token;
//! an empty bucket answers `429 Too Many Requests`.
//!
//! Buckets idle for longer than [`IDLE_TIMEOUT`] are evicted by a sweeper
//! task that stops with the application's shutdown signal.
//!
//! ## Example
//!
//! ```
//! use daedalus_middleware::stages::RateLimitMiddleware;
//! use std::time::Duration;
//!
//! let limiter = RateLimitMiddleware::new(100, Duration::from_secs(60));
//! assert_eq!(limiter.attempts(), 100);
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use daedalus_core::{Outcome, ShutdownSignal};
use http::StatusCode;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Flow, Middleware};

/// How often idle buckets are evicted.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Buckets untouched for longer than this are evicted.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(180);

const TOO_MANY_REQUESTS: &str = "Too Many Requests";

#[derive(Debug, Clone)]
struct Bucket {
    tokens: f64,
    refilled_at: Instant,
    last_attempt: Instant,
}

/// Per-client token bucket limiter.
#[derive(Debug, Clone)]
pub struct RateLimitMiddleware {
    attempts: u32,
    interval: Duration,
    buckets: Arc<Mutex<HashMap<String, Bucket>>>,
}

impl RateLimitMiddleware {
    /// Allows `attempts` requests per `interval`, in bursts of up to
    /// `attempts`.
    pub fn new(attempts: u32, interval: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            interval,
            buckets: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Bucket size.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Tokens added per second.
    pub fn refill_rate(&self) -> f64 {
        let secs = self.interval.as_secs_f64();
        if secs <= 0.0 {
            return f64::INFINITY;
        }
        f64::from(self.attempts) / secs
    }

    /// Spends a token of `ip`. Returns `false` when the bucket is empty.
    pub async fn allow(&self, ip: &str) -> bool {
        let ip = if ip.is_empty() { "localhost" } else { ip };
        let burst = f64::from(self.attempts);
        let rate = self.refill_rate();
        let now = Instant::now();

        let mut buckets = self.buckets.lock().await;
        let bucket = buckets.entry(ip.to_string()).or_insert_with(|| Bucket {
            tokens: burst,
            refilled_at: now,
            last_attempt: now,
        });

        let elapsed = now.duration_since(bucket.refilled_at).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * rate).min(burst);
        bucket.refilled_at = now;
        bucket.last_attempt = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Evicts buckets idle for longer than `max_idle`. Returns how many
    /// were removed.
    pub async fn sweep(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().await;
        let before = buckets.len();
        buckets.retain(|_, bucket| now.duration_since(bucket.last_attempt) <= max_idle);
        before - buckets.len()
    }

    /// Number of tracked clients.
    pub async fn tracked(&self) -> usize {
        self.buckets.lock().await.len()
    }

    /// Spawns the idle bucket sweeper.
    ///
    /// The task runs every [`SWEEP_INTERVAL`] and exits once `shutdown`
    /// triggers.
    pub fn spawn_sweeper(&self, shutdown: ShutdownSignal) -> JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let evicted = limiter.sweep(IDLE_TIMEOUT).await;
                        if evicted > 0 {
                            debug!(evicted, "rate limit buckets swept");
                        }
                    }
                    () = shutdown.recv() => {
                        info!("rate limit sweeper stopped");
                        break;
                    }
                }
            }
        })
    }
}

impl Middleware for RateLimitMiddleware {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    fn process<'a>(&'a self, ctx: &'a mut MiddlewareContext) -> BoxFuture<'a, Flow> {
        Box::pin(async move {
            if self.allow(&ctx.client().ip).await {
                Flow::Continue
            } else {
                debug!(ip = %ctx.client().ip, "rate limit exceeded");
                Flow::Halt(
                    Outcome::text(TOO_MANY_REQUESTS).with_status(StatusCode::TOO_MANY_REQUESTS),
                )
            }
        })
    }
}
