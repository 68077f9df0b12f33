//! `GET /image/search/sticker?q=` - sticker pack search.
//!
//! Scrapes the public search page and returns each pack's title and link.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::get,
    Json,
};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use url::Url;

use crate::error::PluginError;
use crate::plugins::{ApiFailure, RouteModule, RouteScope};

/// Site searched for sticker packs.
pub const STICKER_BASE_URL: &str = "https://getstickerpack.com";

const PACK_SELECTOR: &str = ".sticker-pack-cols a";
const TITLE_SELECTOR: &str = ".title";

/// Sticker search plugin.
#[derive(Debug, Clone, Copy, Default)]
pub struct StickerSearch;

impl RouteModule for StickerSearch {
    fn identity(&self) -> &str {
        "image/sticker"
    }

    fn register(&self, scope: &mut RouteScope<'_>) -> Result<(), PluginError> {
        let http = scope.http().clone();
        scope.route("/image/search/sticker", get(search_handler).with_state(http));
        Ok(())
    }
}

/// A sticker pack found by a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StickerPack {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Default, Deserialize)]
struct SearchQuery {
    q: Option<String>,
}

/// Search page URL for a query.
pub fn search_url(query: &str) -> Result<Url, url::ParseError> {
    Url::parse_with_params(&format!("{}/stickers", STICKER_BASE_URL), &[("query", query)])
}

/// Extract sticker packs from a search result page.
///
/// Entries without a title or link are skipped. Relative links are resolved
/// against the site root.
pub fn parse_packs(html: &str) -> Vec<StickerPack> {
    let (Ok(pack_selector), Ok(title_selector)) =
        (Selector::parse(PACK_SELECTOR), Selector::parse(TITLE_SELECTOR))
    else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    document
        .select(&pack_selector)
        .filter_map(|link| {
            let title = link
                .select(&title_selector)
                .next()
                .map(|el| el.text().collect::<String>().trim().to_string())
                .filter(|title| !title.is_empty())?;
            let href = link
                .value()
                .attr("href")
                .map(str::trim)
                .filter(|href| !href.is_empty())?;

            let url = if href.starts_with("http") {
                href.to_string()
            } else {
                format!("{}{}", STICKER_BASE_URL, href)
            };

            Some(StickerPack { title, url })
        })
        .collect()
}

async fn search_handler(
    State(http): State<reqwest::Client>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiFailure> {
    let Query(query) = query?;
    let q = query.q.filter(|q| !q.is_empty()).ok_or_else(|| {
        ApiFailure::bad_request("Missing parameter q. Example: /image/search/sticker?q=anime")
    })?;

    let url = search_url(&q)
        .map_err(|e| ApiFailure::bad_request(format!("Invalid query: {}", e)))?;
    let page = http.get(url).send().await?.error_for_status()?.text().await?;

    let packs = parse_packs(&page);
    Ok(Json(json!({
        "status": true,
        "total": packs.len(),
        "result": packs,
    })))
}
