//! Landing page and debug panel.
//!
//! The debug panel is a read-only view over a [`TelemetrySnapshot`]. It is
//! shown when `debug_info` is `"true"`, or when it equals the request's
//! `debug` query parameter; `"false"` or an empty value hides it.

use super::{AppState, Settings};
use crate::telemetry::{DEFAULT_TOP_N, TelemetrySnapshot};
use axum::extract::{Query, State};
use axum::response::Html;
use quick_xml::escape::escape;
use serde::Deserialize;
use std::fmt::Write;

#[derive(Debug, Default, Deserialize)]
pub struct IndexQuery {
    pub debug: Option<String>,
}

/// Whether the debug panel is visible for a request carrying `debug_query`.
pub fn debug_visible(debug_info: &str, debug_query: Option<&str>) -> bool {
    match debug_info {
        "" | "false" => false,
        "true" => true,
        token => debug_query == Some(token),
    }
}

fn percent(ratio: f64, request: u64) -> String {
    if request == 0 {
        "0".to_string()
    } else {
        format!("{:.2}%", ratio * 100.0)
    }
}

fn hot_list(entries: &[(String, u64)]) -> String {
    entries.iter().fold(String::new(), |mut out, (key, count)| {
        let _ = write!(out, "{count} {}<br>", escape(key.as_str()));
        out
    })
}

/// Name/value rows of the debug panel, in display order.
pub fn debug_rows(settings: &Settings, snap: &TelemetrySnapshot) -> Vec<(&'static str, String)> {
    let mut rows = Vec::new();
    if let Some(node) = &settings.node_name {
        rows.push(("Node Name", escape(node.as_str()).into_owned()));
    }
    rows.push(("Version", env!("CARGO_PKG_VERSION").to_string()));
    rows.push(("Started At", snap.started_at.to_rfc2822()));
    rows.push(("Cache Duration", format!("{}s", settings.cache_ttl.as_secs())));
    rows.push(("Request Amount", snap.request.to_string()));
    rows.push((
        "Request Frequency",
        format!("{:.3} times/minute", snap.requests_per_minute()),
    ));
    rows.push(("Cache Hit Ratio", percent(snap.hit_ratio(), snap.request)));
    rows.push(("ETag Matched Ratio", percent(snap.validator_ratio(), snap.request)));
    rows.push(("Health", percent(snap.health_ratio(), snap.request)));
    rows.push((
        "Uptime",
        format!("{:.2} hour(s)", snap.uptime.as_secs_f64() / 3600.0),
    ));
    rows.push(("Hot Routes", hot_list(&snap.hot_routes(DEFAULT_TOP_N))));
    rows.push(("Hot Paths", hot_list(&snap.hot_paths(DEFAULT_TOP_N))));
    rows.push(("Hot Error Routes", hot_list(&snap.hot_error_routes(DEFAULT_TOP_N))));
    rows.push(("Hot Error Paths", hot_list(&snap.hot_error_paths(DEFAULT_TOP_N))));
    rows
}

/// `GET /`
pub async fn index_handler(
    State(state): State<AppState>,
    Query(query): Query<IndexQuery>,
) -> Html<String> {
    let mut page = String::from(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>listing_feed</title></head><body>\n\
         <h1>Welcome to listing_feed</h1>\n\
         <p>If you can see this page, the feed server is running.</p>\n",
    );

    if debug_visible(&state.settings.debug_info, query.debug.as_deref()) {
        let snap = state.telemetry.snapshot();
        page.push_str("<details><summary>Debug Info</summary>\n");
        for (name, value) in debug_rows(&state.settings, &snap) {
            let _ = writeln!(
                page,
                "<div class=\"debug-item\"><span class=\"debug-key\">{name}: </span><span class=\"debug-value\">{value}</span></div>"
            );
        }
        page.push_str("</details>\n");
    }

    page.push_str("</body></html>\n");
    Html(page)
}
