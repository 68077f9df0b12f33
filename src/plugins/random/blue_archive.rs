//! `GET /random/ba` - a random Blue Archive illustration.
//!
//! The image list is a JSON array of links published upstream. Each request
//! fetches the list, picks one link at random and relays the image bytes.

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::get,
};
use rand::seq::SliceRandom;
use tracing::debug;

use crate::error::PluginError;
use crate::plugins::{ApiFailure, RouteModule, RouteScope};

/// Published list of image links.
pub const LINKS_URL: &str =
    "https://raw.githubusercontent.com/rynxzyy/blue-archive-r-img/refs/heads/main/links.json";

/// Random Blue Archive image plugin.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlueArchive;

impl RouteModule for BlueArchive {
    fn identity(&self) -> &str {
        "random/blue-archive"
    }

    fn register(&self, scope: &mut RouteScope<'_>) -> Result<(), PluginError> {
        let http = scope.http().clone();
        scope.route("/random/ba", get(random_image_handler).with_state(http));
        Ok(())
    }
}

/// Pick one link uniformly at random.
pub fn pick_link(links: &[String]) -> Option<&str> {
    links.choose(&mut rand::thread_rng()).map(String::as_str)
}

async fn random_image_handler(
    State(http): State<reqwest::Client>,
) -> Result<Response, ApiFailure> {
    let links: Vec<String> = http
        .get(LINKS_URL)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let link = pick_link(&links)
        .ok_or_else(|| ApiFailure::upstream("Failed to fetch Blue Archive image"))?
        .to_string();
    debug!(link = %link, "Relaying random image");

    let image = http.get(&link).send().await?.error_for_status()?.bytes().await?;

    Ok(([(header::CONTENT_TYPE, "image/png")], image).into_response())
}
