//! Error dispatcher and static pages.
//!
//! Every failure the gateway reports ends up here. A fixed set of status
//! classes each has a static HTML body; any other status is rendered as the
//! 500 page. The underlying error is logged before the body is produced, and
//! no internal error text is ever included in what the client receives.

use std::any::Any;

use axum::{
    body::to_bytes,
    extract::Request,
    http::{header, Method, StatusCode, Uri},
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use tracing::{debug, error, warn};

use crate::error::GatewayError;

/// Status codes with a dedicated page.
pub const DISPATCHED_STATUSES: [StatusCode; 10] = [
    StatusCode::BAD_REQUEST,
    StatusCode::UNAUTHORIZED,
    StatusCode::FORBIDDEN,
    StatusCode::NOT_FOUND,
    StatusCode::METHOD_NOT_ALLOWED,
    StatusCode::REQUEST_TIMEOUT,
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
];

/// Escape HTML special characters.
pub(crate) fn html_escape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}

/// Collapse a status onto the dispatched set; unknown statuses become 500.
pub fn dispatch_status(status: StatusCode) -> StatusCode {
    if DISPATCHED_STATUSES.contains(&status) {
        status
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

fn page_copy(status: StatusCode) -> (&'static str, &'static str) {
    match status.as_u16() {
        400 => (
            "Bad Request",
            "The request could not be understood. Check the parameters and try again.",
        ),
        401 => (
            "Unauthorized",
            "You need valid credentials to access this resource.",
        ),
        403 => (
            "Forbidden",
            "You do not have permission to access this resource.",
        ),
        404 => (
            "Not Found",
            "The endpoint you are looking for does not exist or has been moved.",
        ),
        405 => (
            "Method Not Allowed",
            "This endpoint does not support the requested HTTP method.",
        ),
        408 => (
            "Request Timeout",
            "The request took too long to complete. Please try again.",
        ),
        429 => (
            "Too Many Requests",
            "You have sent too many requests. Please wait a minute before trying again.",
        ),
        502 => (
            "Bad Gateway",
            "An upstream service returned an invalid response. Please try again later.",
        ),
        503 => (
            "Service Unavailable",
            "The service is temporarily unavailable. Please try again later.",
        ),
        _ => (
            "Internal Server Error",
            "Something went wrong on our side. Please try again later.",
        ),
    }
}

fn render_page(code: u16, title: &str, message: &str) -> String {
    let title = html_escape(title);
    let message = html_escape(message);

    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{code} - {title}</title>
    <style>
        body {{
            margin: 0;
            min-height: 100vh;
            display: flex;
            align-items: center;
            justify-content: center;
            background: #0f0f0f;
            color: #e5e5e5;
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
        }}
        .card {{
            text-align: center;
            max-width: 480px;
            padding: 32px;
        }}
        .code {{
            font-size: 72px;
            font-weight: 700;
            color: #90ee90;
        }}
        a {{
            color: #90ee90;
        }}
    </style>
</head>
<body>
    <div class="card">
        <div class="code">{code}</div>
        <h1>{title}</h1>
        <p>{message}</p>
        <p><a href="/">Back to documentation</a></p>
    </div>
</body>
</html>"##
    )
}

/// Render the static body for a status (after collapsing onto the dispatched set).
pub fn render_status_page(status: StatusCode) -> String {
    let status = dispatch_status(status);
    let (title, message) = page_copy(status);
    render_page(status.as_u16(), title, message)
}

/// Render the page shown to browsers while maintenance is enabled.
pub fn render_maintenance_page(attribution: &str) -> String {
    render_page(
        503,
        "Under Maintenance",
        &format!(
            "The API is currently under maintenance. Please try again later. ({})",
            attribution
        ),
    )
}

/// Build the complete response for a status.
pub fn status_page(status: StatusCode) -> Response {
    let status = dispatch_status(status);
    (status, Html(render_status_page(status))).into_response()
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Convert GatewayError to HTTP response.
///
/// - 5xx errors are logged at ERROR level
/// - 404s at DEBUG (common and expected)
/// - other 4xx at WARN
impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!(status = status.as_u16(), error = ?self, "Server error: {}", self);
        } else if status == StatusCode::NOT_FOUND {
            debug!(status = status.as_u16(), "Resource not found: {}", self);
        } else {
            warn!(status = status.as_u16(), "Client error: {}", self);
        }

        status_page(status)
    }
}

// =============================================================================
// Terminal Handlers
// =============================================================================

/// Fallback for paths no route matched.
pub async fn not_found_handler(uri: Uri) -> Response {
    GatewayError::NotFound(uri.path().to_string()).into_response()
}

/// Fallback for known paths requested with an unsupported method.
pub async fn method_not_allowed_handler(method: Method, uri: Uri) -> Response {
    GatewayError::MethodNotAllowed(format!("{} {}", method, uri.path())).into_response()
}

/// Upper bound on a rejection body read for logging.
const REJECTION_LOG_LIMIT: usize = 4 * 1024;

/// Route plain-text error responses through the dispatcher.
///
/// Extractor rejections are answered by axum as `text/plain` with the
/// decoder's message. They are logged here and replaced by the status page.
/// JSON and HTML responses pass through untouched.
pub async fn rejection_middleware(request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    let status = response.status();

    let is_plain_text = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("text/plain"));

    if !(status.is_client_error() || status.is_server_error()) || !is_plain_text {
        return response;
    }

    let detail = match to_bytes(response.into_body(), REJECTION_LOG_LIMIT).await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(_) => "unreadable rejection body".to_string(),
    };
    GatewayError::from_status(status, detail).into_response()
}

/// Extract a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Turn a handler panic into the 500 page.
pub fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    GatewayError::Internal(format!("handler panicked: {}", panic_message(&*payload))).into_response()
}

// =============================================================================
// Tests
// =============================================================================
