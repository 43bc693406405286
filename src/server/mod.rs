//! HTTP surface: routes, shared state and middleware.
//!
//! # Endpoints
//!
//! - `GET /`                       - Landing page with the optional debug panel
//! - `GET /robots.txt`             - Crawling policy
//! - `GET /radar?url=...`          - Map a source URL to its feed route
//! - `GET /zjzs/info`              - Zhejiang notices, default category
//! - `GET /zjzs/info/{class_id}`   - Zhejiang notices for one category
//!
//! Feed routes accept `pages` (1..=max_pages, default 1) and `format`
//! (`rss` default, `json`). A request still running after the response
//! timeout is abandoned with 504.

use crate::cache::ResponseCache;
use crate::cli::Cli;
use crate::fetch::Fetcher;
use crate::scrapers::zjzs::Zjzs;
use crate::telemetry::Telemetry;
use axum::http::StatusCode;
use axum::{Router, middleware::from_fn_with_state, routing::get};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;

pub mod handlers;
pub mod index;
pub mod middleware;

/// Runtime settings the handlers need, taken from the [`Cli`].
#[derive(Debug, Clone)]
pub struct Settings {
    pub max_pages: u32,
    pub node_name: Option<String>,
    pub debug_info: String,
    pub disallow_robot: bool,
    pub cache_ttl: Duration,
    pub response_timeout: Duration,
}

impl From<&Cli> for Settings {
    fn from(cli: &Cli) -> Self {
        Self {
            max_pages: cli.max_pages,
            node_name: cli.node_name.clone(),
            debug_info: cli.debug_info.clone(),
            disallow_robot: cli.disallow_robot,
            cache_ttl: cli.cache_ttl(),
            response_timeout: cli.response_timeout(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub fetcher: Arc<dyn Fetcher>,
    pub telemetry: Arc<dyn Telemetry>,
    pub cache: Arc<ResponseCache>,
    pub settings: Arc<Settings>,
    pub zjzs: Arc<Zjzs>,
}

impl AppState {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        telemetry: Arc<dyn Telemetry>,
        settings: Settings,
        cache_max_entries: usize,
    ) -> Self {
        Self {
            fetcher,
            telemetry,
            cache: Arc::new(ResponseCache::new(settings.cache_ttl, cache_max_entries)),
            settings: Arc::new(settings),
            zjzs: Arc::new(Zjzs::new()),
        }
    }
}

/// Build the application router with telemetry and request tracing.
pub fn app_router(state: AppState) -> Router {
    let response_timeout = state.settings.response_timeout;
    Router::new()
        .route("/", get(index::index_handler))
        .route("/robots.txt", get(handlers::robots_handler))
        .route("/radar", get(handlers::radar_handler))
        .route("/zjzs/info", get(handlers::zjzs_default_handler))
        .route("/zjzs/info/{class_id}", get(handlers::zjzs_handler))
        .layer(
            ServiceBuilder::new()
                .layer(middleware::trace_layer())
                .layer(from_fn_with_state(state.clone(), middleware::record_telemetry))
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::GATEWAY_TIMEOUT,
                    response_timeout,
                )),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::MockFetcher;
    use crate::telemetry::CounterSet;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use axum::response::Response;
    use serde_json::Value;
    use tower::ServiceExt;

    const LISTING: &str = r#"<div class="news-list">
        <div class="item"><div class="title"><a href="/Index/InfoPage.aspx?id=1"> </a></div><div class="des">发布时间:2024-03-04</div></div>
        <div class="item"><div class="title"><a href="/Index/InfoPage.aspx?id=2">Exam schedule</a></div><div class="des">发布时间:2024-03-05</div></div>
    </div>"#;

    fn settings(cache_ttl: Duration) -> Settings {
        Settings {
            max_pages: 5,
            node_name: None,
            debug_info: "s3cret".to_string(),
            disallow_robot: true,
            cache_ttl,
            response_timeout: Duration::from_secs(5),
        }
    }

    fn state_with(fetcher: MockFetcher, cache_ttl: Duration) -> (AppState, Arc<MockFetcher>, Arc<CounterSet>) {
        let fetcher = Arc::new(fetcher);
        let telemetry = Arc::new(CounterSet::new());
        let state = AppState::new(fetcher.clone(), telemetry.clone(), settings(cache_ttl), 16);
        (state, fetcher, telemetry)
    }

    async fn send(state: &AppState, uri: &str, if_none_match: Option<&str>) -> Response {
        let mut request = Request::builder().uri(uri);
        if let Some(tag) = if_none_match {
            request = request.header(header::IF_NONE_MATCH, tag);
        }
        app_router(state.clone())
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_feed_route_renders_rss() {
        let (state, fetcher, telemetry) =
            state_with(MockFetcher::new().page(1, LISTING, 0), Duration::ZERO);

        let response = send(&state, "/zjzs/info/11", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            response.headers()[header::CONTENT_TYPE]
                .to_str()
                .unwrap()
                .starts_with("application/rss+xml")
        );
        assert!(response.headers().contains_key(header::ETAG));

        let xml = body_text(response).await;
        assert_eq!(xml.matches("<item>").count(), 1);
        assert!(xml.contains("<link>https://zk.zjzs.net/Index/InfoPage.aspx?id=2</link>"));
        assert_eq!(fetcher.call_count(), 1);

        let response = send(&state, "/zjzs/info", None).await;
        assert_eq!(response.status(), StatusCode::OK);

        let snap = telemetry.snapshot();
        assert_eq!(snap.request, 2);
        assert_eq!(snap.error, 0);
        assert_eq!(snap.routes, vec![("/zjzs/info/{class_id}".to_string(), 2)]);
        assert_eq!(snap.paths[0].0, "/zjzs/info/11");
        assert_eq!(snap.paths[1].0, "/zjzs/info");
    }

    #[tokio::test]
    async fn test_default_category_and_json_format() {
        let (state, fetcher, _) = state_with(MockFetcher::new().page(1, LISTING, 0), Duration::ZERO);

        let response = send(&state, "/zjzs/info?format=json", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let value: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(
            value["home_page_url"],
            "https://zk.zjzs.net/Index/InfoSQList.aspx?classID=11"
        );
        assert_eq!(value["items"].as_array().unwrap().len(), 1);

        let seen = fetcher.seen_queries.lock().unwrap().clone();
        assert!(seen[0].contains(&("classID".to_string(), "11".to_string())));
    }

    #[tokio::test]
    async fn test_pages_fan_out() {
        let fetcher = MockFetcher::new()
            .page(1, LISTING, 20)
            .page(2, LISTING, 0)
            .page(3, LISTING, 0);
        let (state, fetcher, _) = state_with(fetcher, Duration::ZERO);

        let response = send(&state, "/zjzs/info/11?pages=3", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await.matches("<item>").count(), 3);
        assert_eq!(fetcher.call_count(), 3);
    }

    #[tokio::test]
    async fn test_invalid_pages_rejected_before_fetch() {
        let (state, fetcher, telemetry) = state_with(MockFetcher::new(), Duration::ZERO);

        for uri in ["/zjzs/info/11?pages=0", "/zjzs/info/11?pages=6", "/zjzs/info/11?pages=x"] {
            let response = send(&state, uri, None).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        }
        assert_eq!(fetcher.call_count(), 0);
        assert_eq!(telemetry.snapshot().error, 3);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_bad_gateway() {
        let fetcher = MockFetcher::new()
            .page(1, LISTING, 0)
            .failing_page(2, Some(500), 0);
        let (state, _, telemetry) = state_with(fetcher, Duration::from_secs(60));

        let response = send(&state, "/zjzs/info/11?pages=2", None).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let value: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(value["error"]["code"], "upstream_error");
        assert_eq!(value["error"]["details"]["page"], 2);

        let snap = telemetry.snapshot();
        assert_eq!(snap.error, 1);
        assert_eq!(snap.error_paths[0].0, "/zjzs/info/11");
    }

    #[tokio::test]
    async fn test_empty_listing_is_ok() {
        let (state, _, _) = state_with(MockFetcher::new().page(1, "<html></html>", 0), Duration::ZERO);

        let response = send(&state, "/zjzs/info/99", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await.matches("<item>").count(), 0);
    }

    #[tokio::test]
    async fn test_cache_hit_and_validator_match() {
        let (state, fetcher, telemetry) =
            state_with(MockFetcher::new().page(1, LISTING, 0), Duration::from_secs(60));

        let first = send(&state, "/zjzs/info/11", None).await;
        let etag = first.headers()[header::ETAG].to_str().unwrap().to_string();

        let second = send(&state, "/zjzs/info/11", None).await;
        assert_eq!(second.status(), StatusCode::OK);

        let third = send(&state, "/zjzs/info/11", Some(&etag)).await;
        assert_eq!(third.status(), StatusCode::NOT_MODIFIED);

        assert_eq!(fetcher.call_count(), 1);
        let snap = telemetry.snapshot();
        assert_eq!(snap.request, 3);
        assert_eq!(snap.hit_cache, 1);
        assert_eq!(snap.etag, 1);
        assert_eq!(snap.error, 0);
    }

    #[tokio::test]
    async fn test_validator_matches_after_rerender() {
        let (state, fetcher, telemetry) =
            state_with(MockFetcher::new().page(1, LISTING, 0), Duration::ZERO);

        let first = send(&state, "/zjzs/info/11", None).await;
        let etag = first.headers()[header::ETAG].to_str().unwrap().to_string();

        tokio::time::sleep(Duration::from_millis(1100)).await;
        let second = send(&state, "/zjzs/info/11", Some(&etag)).await;
        assert_eq!(second.status(), StatusCode::NOT_MODIFIED);
        assert_eq!(second.headers()[header::ETAG].to_str().unwrap(), etag);

        assert_eq!(fetcher.call_count(), 2);
        let snap = telemetry.snapshot();
        assert_eq!(snap.etag, 1);
        assert_eq!(snap.hit_cache, 0);
    }

    #[tokio::test]
    async fn test_slow_request_times_out() {
        let (mut state, _, telemetry) =
            state_with(MockFetcher::new().page(1, LISTING, 2_000), Duration::ZERO);
        let mut settings = (*state.settings).clone();
        settings.response_timeout = Duration::from_millis(50);
        state.settings = Arc::new(settings);

        let response = send(&state, "/zjzs/info/11", None).await;
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);

        let snap = telemetry.snapshot();
        assert_eq!(snap.error, 1);
        assert_eq!(snap.error_routes[0].0, "/zjzs/info/{class_id}");
    }

    #[tokio::test]
    async fn test_radar_without_url_is_json_error() {
        let (state, _, _) = state_with(MockFetcher::new(), Duration::ZERO);

        let response = send(&state, "/radar", None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let value: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(value["error"]["code"], "validation_error");
    }

    #[tokio::test]
    async fn test_radar() {
        let (state, _, _) = state_with(MockFetcher::new(), Duration::ZERO);

        let response = send(
            &state,
            "/radar?url=https%3A%2F%2Fzk.zjzs.net%2FIndex%2FInfoSQList.aspx%3FclassID%3D7",
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let value: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(value["path"], "/zjzs/info/7");

        let response = send(&state, "/radar?url=https%3A%2F%2Fexample.com%2F", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_index_debug_panel_gated_by_token() {
        let (state, _, _) = state_with(MockFetcher::new(), Duration::ZERO);

        let hidden = body_text(send(&state, "/", None).await).await;
        assert!(hidden.contains("Welcome"));
        assert!(!hidden.contains("Hot Routes"));

        let shown = body_text(send(&state, "/?debug=s3cret", None).await).await;
        assert!(shown.contains("Hot Routes"));
        assert!(shown.contains("Request Amount: </span><span class=\"debug-value\">2"));
    }

    #[tokio::test]
    async fn test_robots() {
        let (state, _, _) = state_with(MockFetcher::new(), Duration::ZERO);
        let body = body_text(send(&state, "/robots.txt", None).await).await;
        assert!(body.contains("Disallow: /"));
    }
}
