//! Per-client fixed-window rate limiting.
//!
//! Each client identity (its network address) owns a [`ClientRateRecord`]
//! holding a request count and the instant its current window ends:
//!
//! ```text
//! first request        → count = 1, reset_at = now + window      (allowed)
//! now >  reset_at      → count = 1, reset_at = now + window      (allowed)
//! now <= reset_at      → count += 1, rejected when count > max
//! ```
//!
//! This is a fixed window, so a client can get up to twice the limit through
//! across a window edge. A background sweep running once per window removes
//! records whose window has ended, keeping memory bounded by active clients.
//!
//! Every read-modify-write against the record map happens under a single
//! write lock, and the sweep takes the same lock.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::pages::status_page;

/// Default window length (1 minute).
pub const DEFAULT_RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

/// Default number of requests admitted per window.
pub const DEFAULT_RATE_LIMIT_MAX: u32 = 15;

/// Identity used when a request carries no usable address.
pub const UNKNOWN_CLIENT: &str = "unknown";

// =============================================================================
// Records
// =============================================================================

/// Request count of one client inside its current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientRateRecord {
    /// Requests seen in the current window (always >= 1)
    pub count: u32,

    /// Instant the current window ends
    pub window_reset_at: Instant,
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The request may proceed
    Allowed {
        /// Position of this request in the client's window
        count: u32,
    },

    /// The client exhausted its window
    Rejected {
        /// Time until the window resets
        retry_after: Duration,
    },
}

impl Admission {
    /// Whether the request was admitted.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allowed { .. })
    }
}

// =============================================================================
// Rate Limiter
// =============================================================================

/// Fixed-window request counter keyed by client identity.
///
/// Created once at startup and shared behind an `Arc` by the middleware and
/// the sweep task.
#[derive(Debug)]
pub struct RateLimiter {
    records: RwLock<HashMap<String, ClientRateRecord>>,
    window: Duration,
    max_per_window: u32,
}

impl RateLimiter {
    /// Create a limiter admitting `max_per_window` requests per `window`.
    pub fn new(window: Duration, max_per_window: u32) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            window,
            max_per_window,
        }
    }

    /// Window length.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Requests admitted per window.
    pub fn max_per_window(&self) -> u32 {
        self.max_per_window
    }

    /// Decide whether a request from `identity` may proceed now.
    pub async fn admit(&self, identity: &str) -> Admission {
        self.admit_at(identity, Instant::now()).await
    }

    /// Decide whether a request from `identity` arriving at `now` may proceed.
    pub async fn admit_at(&self, identity: &str, now: Instant) -> Admission {
        let mut records = self.records.write().await;

        let record = match records.entry(identity.to_owned()) {
            Entry::Vacant(slot) => {
                slot.insert(ClientRateRecord {
                    count: 1,
                    window_reset_at: now + self.window,
                });
                return Admission::Allowed { count: 1 };
            }
            Entry::Occupied(slot) => slot.into_mut(),
        };

        if now > record.window_reset_at {
            record.count = 1;
            record.window_reset_at = now + self.window;
            return Admission::Allowed { count: 1 };
        }

        record.count = record.count.saturating_add(1);
        if record.count > self.max_per_window {
            Admission::Rejected {
                retry_after: record.window_reset_at.saturating_duration_since(now),
            }
        } else {
            Admission::Allowed {
                count: record.count,
            }
        }
    }

    /// Remove every record whose window has ended. Returns how many were removed.
    pub async fn sweep(&self) -> usize {
        self.sweep_at(Instant::now()).await
    }

    /// Remove every record whose window ended before `now`.
    pub async fn sweep_at(&self, now: Instant) -> usize {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, record| now <= record.window_reset_at);
        before - records.len()
    }

    /// Current record for an identity, if any.
    pub async fn record(&self, identity: &str) -> Option<ClientRateRecord> {
        self.records.read().await.get(identity).copied()
    }

    /// Number of identities currently tracked.
    pub async fn tracked_clients(&self) -> usize {
        self.records.read().await.len()
    }

    /// Spawn the periodic sweep, running once per window.
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        let period = limiter.window;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;
                let removed = limiter.sweep().await;
                if removed > 0 {
                    debug!(removed = removed, "Swept expired rate limit records");
                }
            }
        })
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_RATE_LIMIT_WINDOW, DEFAULT_RATE_LIMIT_MAX)
    }
}

// =============================================================================
// Client Identity
// =============================================================================

/// Resolve the rate-limit identity of a request.
///
/// With `trust_proxy`, the leftmost `X-Forwarded-For` address wins. Otherwise
/// (or when the header is absent) the peer socket address is used.
pub fn client_identity(request: &Request, trust_proxy: bool) -> String {
    if trust_proxy {
        let forwarded = request
            .headers()
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty());

        if let Some(address) = forwarded {
            return address.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

// =============================================================================
// Axum Middleware
// =============================================================================

/// State for [`rate_limit_middleware`].
#[derive(Debug, Clone)]
pub struct RateLimitState {
    /// Shared limiter
    pub limiter: Arc<RateLimiter>,

    /// Whether to trust `X-Forwarded-For`
    pub trust_proxy: bool,
}

/// Reject requests from clients that exhausted their window with 429.
pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Response {
    let identity = client_identity(&request, state.trust_proxy);

    match state.limiter.admit(&identity).await {
        Admission::Allowed { .. } => next.run(request).await,
        Admission::Rejected { retry_after } => {
            warn!(
                client = %identity,
                path = request.uri().path(),
                "Rate limit exceeded"
            );

            let mut response = status_page(StatusCode::TOO_MANY_REQUESTS);
            let seconds = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(seconds.max(1)));
            response
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
