//! `GET /tools/remini?url=&res=&enhance=` - image upscaling.
//!
//! The source image is downloaded, then uploaded as multipart form data to
//! the upscale service. The service reply is reshaped into a stable result
//! object.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::get,
    Json,
};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

use crate::error::PluginError;
use crate::plugins::{ApiFailure, RouteModule, RouteScope};

/// Upscale service endpoint.
pub const UPSCALE_URL: &str = "https://upscale.cloudkuimages.guru/hd.php";

const UPSCALE_ORIGIN: &str = "https://upscale.cloudkuimages.guru";

/// Accepted target resolutions.
pub const RESOLUTIONS: &[&str] = &["480p", "720p", "1080p", "2k", "4k", "8k", "12k"];

const DEFAULT_RESOLUTION: &str = "1080p";

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];

/// Image upscale plugin.
#[derive(Debug, Clone, Copy, Default)]
pub struct Remini;

impl RouteModule for Remini {
    fn identity(&self) -> &str {
        "tools/remini"
    }

    fn register(&self, scope: &mut RouteScope<'_>) -> Result<(), PluginError> {
        let http = scope.http().clone();
        scope.route("/tools/remini", get(upscale_handler).with_state(http));
        Ok(())
    }
}

/// Raw query parameters.
#[derive(Debug, Default, Deserialize)]
struct UpscaleQuery {
    url: Option<String>,
    res: Option<String>,
    enhance: Option<String>,
}

/// A validated upscale request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpscaleRequest {
    /// Source image URL
    pub image_url: String,

    /// Target resolution, lowercased
    pub resolution: String,

    /// Whether to enhance in addition to upscaling
    pub enhance: bool,
}

fn is_image_url(candidate: &str) -> bool {
    if Url::parse(candidate).is_err() {
        return false;
    }

    let lower = candidate.to_ascii_lowercase();
    let Some(rest) = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"))
    else {
        return false;
    };

    rest.rsplit_once('.')
        .map(|(head, ext)| !head.is_empty() && IMAGE_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

/// Validate query parameters.
///
/// `enhance` is on unless explicitly `false`; `res` defaults to 1080p.
pub fn validate(
    url: Option<&str>,
    res: Option<&str>,
    enhance: Option<&str>,
) -> Result<UpscaleRequest, ApiFailure> {
    let image_url = url.filter(|url| is_image_url(url)).ok_or_else(|| {
        ApiFailure::bad_request(
            "Invalid image URL. Example: ?url=https://example.com/image.jpg",
        )
    })?;

    let resolution = res.unwrap_or(DEFAULT_RESOLUTION).to_ascii_lowercase();
    if !RESOLUTIONS.contains(&resolution.as_str()) {
        return Err(ApiFailure::bad_request(format!(
            "Invalid resolution. Choose one of: {}",
            RESOLUTIONS.join(", ")
        )));
    }

    Ok(UpscaleRequest {
        image_url: image_url.to_string(),
        resolution,
        enhance: enhance != Some("false"),
    })
}

/// Reshape the upscale service reply.
fn upscale_result(reply: &Value) -> Result<Value, ApiFailure> {
    if reply.get("status").and_then(Value::as_str) != Some("success") {
        return Err(ApiFailure::upstream(format!("Upscale failed: {}", reply)));
    }

    let data = &reply["data"];
    Ok(json!({
        "url": data["url"],
        "filename": data["filename"],
        "original": data["original"],
        "resolution_from": data["original_resolution"],
        "resolution_to": data["resolution_now"],
        "enhanced": data["enhanced"],
        "size_before": data["original_size"],
        "size_after": data["new_size"],
    }))
}

async fn upscale_handler(
    State(http): State<reqwest::Client>,
    query: Result<Query<UpscaleQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiFailure> {
    let Query(query) = query?;
    let request = validate(
        query.url.as_deref(),
        query.res.as_deref(),
        query.enhance.as_deref(),
    )?;

    let image = http
        .get(&request.image_url)
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await?;

    let form = Form::new()
        .part("image", Part::bytes(image.to_vec()).file_name("image.jpg"))
        .text("resolution", request.resolution.clone())
        .text("enhance", request.enhance.to_string());

    let reply: Value = http
        .post(UPSCALE_URL)
        .header("origin", UPSCALE_ORIGIN)
        .header("referer", format!("{}/", UPSCALE_ORIGIN))
        .multipart(form)
        .send()
        .await?
        .json()
        .await?;

    let result = upscale_result(&reply)?;
    Ok(Json(json!({ "status": true, "result": result })))
}
