use axum::http::StatusCode;
use thiserror::Error;

/// Errors raised while reading the gateway settings document
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file could not be read
    #[error("Failed to read settings from {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The settings file is not a valid settings document
    #[error("Invalid settings document in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors raised while registering an endpoint plugin
#[derive(Debug, Clone, Error)]
pub enum PluginError {
    /// Route path does not start with '/'
    #[error("Invalid route path '{path}': paths must start with '/'")]
    InvalidPath { path: String },

    /// Route path is already owned by another module (or by the gateway itself)
    #[error("Route '{path}' is already registered by {owner}")]
    DuplicateRoute { path: String, owner: String },

    /// The registrar reported a failure
    #[error("Registration failed: {0}")]
    Registration(String),

    /// The registrar panicked
    #[error("Registrar panicked: {0}")]
    Panicked(String),
}

/// Failures surfaced by request handlers.
///
/// Every variant maps to one of the status classes rendered by the error
/// dispatcher. The message is logged server-side and never sent to clients.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Malformed request (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Missing credentials (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Access to the resource is not allowed (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource does not exist (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Path exists but not for this method (405)
    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    /// Request or upstream call timed out (408)
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Client exceeded its request budget (429)
    #[error("Rate limit exceeded for {0}")]
    RateLimited(String),

    /// An upstream service failed (502)
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// The gateway cannot serve the request right now (503)
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Settings could not be read (500)
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    /// Local file I/O failed (500)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON document could not be parsed (500)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Anything else (500)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// HTTP status class for this failure.
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            GatewayError::Forbidden(_) => StatusCode::FORBIDDEN,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            GatewayError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::Upstream(_) => StatusCode::BAD_GATEWAY,
            GatewayError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Settings(_)
            | GatewayError::Io(_)
            | GatewayError::Json(_)
            | GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl GatewayError {
    /// Classify a failure reported only as a status and a detail message.
    ///
    /// Statuses outside the dispatched set become [`GatewayError::Internal`].
    pub fn from_status(status: StatusCode, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        match status.as_u16() {
            400 => GatewayError::BadRequest(detail),
            401 => GatewayError::Unauthorized(detail),
            403 => GatewayError::Forbidden(detail),
            404 => GatewayError::NotFound(detail),
            405 => GatewayError::MethodNotAllowed(detail),
            408 => GatewayError::Timeout(detail),
            429 => GatewayError::RateLimited(detail),
            502 => GatewayError::Upstream(detail),
            503 => GatewayError::Unavailable(detail),
            code => GatewayError::Internal(format!("{} ({})", detail, code)),
        }
    }
}
