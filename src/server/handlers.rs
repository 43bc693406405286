//! Feed, radar and robots handlers.

use super::AppState;
use crate::cache::CachedResponse;
use crate::error::FeedError;
use crate::outputs::OutputFormat;
use crate::pipeline::build_feed;
use crate::scrapers::{self, SourceAdapter};
use crate::utils::{etag_for, if_none_match};
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use url::Url;

/// Query parameters accepted by every feed route.
#[derive(Debug, Default, Deserialize)]
pub struct FeedQuery {
    pub pages: Option<String>,
    pub format: Option<String>,
}

impl FeedQuery {
    /// Parse `pages`, defaulting to 1 and bounded by `max_pages`.
    pub fn page_count(&self, max_pages: u32) -> Result<u32, FeedError> {
        let Some(raw) = self.pages.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(1);
        };
        match raw.parse::<u32>() {
            Ok(n) if (1..=max_pages).contains(&n) => Ok(n),
            _ => Err(FeedError::Config(format!(
                "pages must be an integer between 1 and {max_pages}, got {raw:?}"
            ))),
        }
    }

    pub fn output_format(&self) -> Result<OutputFormat, FeedError> {
        self.format.as_deref().unwrap_or_default().parse()
    }
}

/// `GET /zjzs/info`
pub async fn zjzs_default_handler(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response, FeedError> {
    let zjzs = state.zjzs.clone();
    let category = zjzs.default_category();
    feed_response(&state, zjzs.as_ref(), category, &query, uri.to_string(), &headers).await
}

/// `GET /zjzs/info/{class_id}`
pub async fn zjzs_handler(
    State(state): State<AppState>,
    Path(class_id): Path<String>,
    Query(query): Query<FeedQuery>,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response, FeedError> {
    let zjzs = state.zjzs.clone();
    feed_response(&state, zjzs.as_ref(), &class_id, &query, uri.to_string(), &headers).await
}

/// Serve a feed from the response cache, or build, render and cache it.
///
/// Parameters are validated before the cache or the upstream is consulted.
/// A request whose `If-None-Match` matches gets 304 and counts as a validator
/// match; otherwise a cached answer counts as a cache hit.
#[instrument(level = "info", skip_all, fields(source = adapter.name(), category_id, cache_key = %cache_key))]
pub async fn feed_response(
    state: &AppState,
    adapter: &dyn SourceAdapter,
    category_id: &str,
    query: &FeedQuery,
    cache_key: String,
    headers: &HeaderMap,
) -> Result<Response, FeedError> {
    let pages = query.page_count(state.settings.max_pages)?;
    let format = query.output_format()?;
    let validator = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let (rendered, from_cache) = match state.cache.get(&cache_key).await {
        Some(cached) => (cached, true),
        None => {
            let feed = build_feed(state.fetcher.as_ref(), adapter, category_id, pages).await?;
            let body = format.render(&feed, state.settings.cache_ttl)?;
            let rendered = CachedResponse {
                etag: etag_for(&body),
                body,
                content_type: format.content_type(),
            };
            state.cache.insert(cache_key.clone(), rendered.clone()).await;
            (rendered, false)
        }
    };

    if validator.is_some_and(|v| if_none_match(&v, &rendered.etag)) {
        state.telemetry.on_validator_match();
        info!("Validator matched; answering 304");
        return Ok(not_modified(&rendered.etag));
    }
    if from_cache {
        state.telemetry.on_cache_hit();
    }

    Ok(feed_ok(rendered, state.settings.cache_ttl.as_secs()))
}

fn not_modified(etag: &str) -> Response {
    let mut response = StatusCode::NOT_MODIFIED.into_response();
    if let Ok(value) = HeaderValue::from_str(etag) {
        response.headers_mut().insert(header::ETAG, value);
    }
    response
}

fn feed_ok(rendered: CachedResponse, max_age: u64) -> Response {
    let mut response = rendered.body.into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(rendered.content_type));
    if let Ok(value) = HeaderValue::from_str(&rendered.etag) {
        headers.insert(header::ETAG, value);
    }
    if let Ok(value) = HeaderValue::from_str(&format!("public, max-age={max_age}")) {
        headers.insert(header::CACHE_CONTROL, value);
    }
    response
}

#[derive(Debug, Deserialize)]
pub struct RadarQuery {
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RadarResponse {
    pub path: String,
}

/// `GET /radar?url=<source url>`
pub async fn radar_handler(
    State(state): State<AppState>,
    Query(query): Query<RadarQuery>,
) -> Result<Json<RadarResponse>, FeedError> {
    let raw = query
        .url
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| FeedError::Config("missing url query parameter".to_string()))?;
    let url = Url::parse(raw).map_err(|e| FeedError::Config(format!("invalid url {raw:?}: {e}")))?;

    let adapters: [&dyn SourceAdapter; 1] = [state.zjzs.as_ref()];
    scrapers::reverse_map(&adapters, &url)
        .map(|path| Json(RadarResponse { path }))
        .ok_or_else(|| FeedError::NoRoute(url.to_string()))
}

/// `GET /robots.txt`
pub async fn robots_handler(State(state): State<AppState>) -> Response {
    let body = if state.settings.disallow_robot {
        "User-agent: *\nDisallow: /\n"
    } else {
        "User-agent: *\nDisallow:\n"
    };
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response()
}
