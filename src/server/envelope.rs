//! Response envelope.
//!
//! Every JSON object leaving the gateway gets two standard fields:
//!
//! ```text
//! handler output:  {"foo": 1}
//! client receives: {"status": true, "creator": "<attribution>", "foo": 1}
//! ```
//!
//! Fields set by the handler always win, so `{"status": false}` stays false
//! and a handler-provided `creator` is kept. Arrays, strings, numbers and
//! other non-object values pass through unchanged.
//!
//! The envelope is a response layer, so plugins get it without doing
//! anything. Responses built with [`raw_json`] carry the [`RawJson`] marker and
//! are sent as-is.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::error;

use super::pages::status_page;

/// Largest JSON body the envelope will buffer.
pub const MAX_ENVELOPE_BODY: usize = 16 * 1024 * 1024;

/// Response extension marking a JSON body that must not be enveloped.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawJson;

/// Serialize `value` as JSON without applying the envelope.
pub fn raw_json<T: Serialize>(value: T) -> Response {
    let mut response = Json(value).into_response();
    response.extensions_mut().insert(RawJson);
    response
}

/// Apply the envelope overlay to a JSON value.
pub fn apply_envelope(value: Value, creator: &str) -> Value {
    match value {
        Value::Object(fields) => {
            let mut enveloped = Map::with_capacity(fields.len() + 2);
            enveloped.insert("status".to_string(), Value::Bool(true));
            enveloped.insert("creator".to_string(), Value::String(creator.to_string()));
            for (key, field) in fields {
                enveloped.insert(key, field);
            }
            Value::Object(enveloped)
        }
        other => other,
    }
}

/// State for [`envelope_middleware`].
#[derive(Debug, Clone)]
pub struct Envelope {
    creator: Arc<str>,
}

impl Envelope {
    /// Create an envelope injecting the given attribution.
    pub fn new(creator: impl Into<Arc<str>>) -> Self {
        Self {
            creator: creator.into(),
        }
    }

    /// Configured attribution.
    pub fn creator(&self) -> &str {
        &self.creator
    }
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| {
            let mime = value.split(';').next().unwrap_or("").trim();
            mime.eq_ignore_ascii_case("application/json")
        })
        .unwrap_or(false)
}

/// Rewrite JSON object bodies with the envelope fields.
pub async fn envelope_middleware(
    State(envelope): State<Envelope>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;

    if !is_json(&response) || response.extensions().get::<RawJson>().is_some() {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, MAX_ENVELOPE_BODY).await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("Failed to buffer JSON response for envelope: {}", e);
            return status_page(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let rewritten = match serde_json::from_slice::<Value>(&bytes) {
        Ok(value @ Value::Object(_)) => {
            serde_json::to_vec_pretty(&apply_envelope(value, envelope.creator())).ok()
        }
        _ => None,
    };

    let body = match rewritten {
        Some(rewritten) => {
            parts.headers.remove(header::CONTENT_LENGTH);
            Body::from(rewritten)
        }
        None => Body::from(bytes),
    };

    Response::from_parts(parts, body)
}

// =============================================================================
// Tests
// =============================================================================
