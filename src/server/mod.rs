//! HTTP server layer for the gateway.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │                                                                 │
//! │  ┌────────────┐  ┌─────────────┐  ┌──────────┐  ┌───────────┐   │
//! │  │ rate_limit │  │ maintenance │  │  guard   │  │ envelope  │   │
//! │  │   (429)    │  │    (503)    │  │  (403)   │  │  (JSON)   │   │
//! │  └────────────┘  └─────────────┘  └──────────┘  └───────────┘   │
//! │                                                                 │
//! │  ┌────────────┐  ┌─────────────┐  ┌─────────────────────────┐   │
//! │  │  handlers  │  │    pages    │  │         routes          │   │
//! │  │ (builtin)  │  │ (dispatch)  │  │    (router config)      │   │
//! │  └────────────┘  └─────────────┘  └─────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod envelope;
pub mod guard;
pub mod handlers;
pub mod maintenance;
pub mod pages;
pub mod rate_limit;
pub mod routes;

pub use envelope::{apply_envelope, envelope_middleware, raw_json, Envelope, RawJson};
pub use guard::{is_blocked, is_servable_media, path_guard_middleware, security_headers_middleware};
pub use handlers::{AppState, HealthResponse, BUILTIN_PATHS};
pub use maintenance::{
    maintenance_middleware, should_block, GateDecision, MaintenanceGate, MaintenanceResponse,
};
pub use pages::{
    dispatch_status, rejection_middleware, render_status_page, status_page, DISPATCHED_STATUSES,
};
pub use rate_limit::{
    client_identity, rate_limit_middleware, Admission, ClientRateRecord, RateLimitState,
    RateLimiter, DEFAULT_RATE_LIMIT_MAX, DEFAULT_RATE_LIMIT_WINDOW,
};
pub use routes::{build_gateway, builtin_router, create_router, Gateway, RouterConfig};
