//! Request tracing and telemetry middleware.

use super::AppState;
use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tower_http::LatencyUnit;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Route key for requests that matched no route.
const UNMATCHED_ROUTE: &str = "(unmatched)";

/// Registrations that serve one logical route, keyed by the template they report as.
const ROUTE_ALIASES: [(&str, &str); 1] = [("/zjzs/info", "/zjzs/info/{class_id}")];

/// Telemetry route key for a matched axum route template.
pub fn route_key(matched: &str) -> &str {
    ROUTE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == matched)
        .map(|(_, canonical)| *canonical)
        .unwrap_or(matched)
}

/// HTTP request spans at `INFO` with status and latency in milliseconds.
pub fn trace_layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>> {
    TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Millis),
        )
}

/// Report the request's start and outcome to the telemetry sink.
///
/// Cache hits and validator matches are reported by the handlers in between.
/// Any status of 400 or above counts as an error.
pub async fn record_telemetry(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|m| route_key(m.as_str()).to_owned())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_string());
    let path = req.uri().path().to_owned();

    state.telemetry.on_start(&route, &path);
    let response = next.run(req).await;

    if response.status().is_client_error() || response.status().is_server_error() {
        state.telemetry.on_error(&route, &path);
    } else {
        state.telemetry.on_success();
    }
    response
}
