//! Concurrent fetching of consecutive listing pages.
//!
//! All pages of one request are fetched at the same time and may complete in
//! any order, but the returned bodies are always in page order (page 1 at
//! index 0). The first failing page aborts the whole fetch: remaining
//! in-flight requests are dropped and no partial result is returned.

use crate::error::FeedError;
use crate::fetch::Fetcher;
use crate::models::PageRequest;
use crate::scrapers::SourceAdapter;
use futures::stream::{self, StreamExt};
use std::time::Instant;
use tracing::{debug, error, info, instrument};

/// Build the page requests for pages `1..=page_count`.
pub fn plan_pages(adapter: &dyn SourceAdapter, category_id: &str, page_count: u32) -> Vec<PageRequest> {
    (1..=page_count)
        .map(|page_index| PageRequest {
            page_index,
            page_size: adapter.page_size(),
            category_id: category_id.to_string(),
        })
        .collect()
}

/// Fetch `page_count` listing pages of `category_id` concurrently.
///
/// # Errors
///
/// - [`FeedError::Config`] when `page_count` is zero (no fetch is issued)
/// - [`FeedError::Fetch`] naming the first page that failed
#[instrument(level = "info", skip_all, fields(source = adapter.name(), category_id, page_count))]
pub async fn fetch_pages(
    fetcher: &dyn Fetcher,
    adapter: &dyn SourceAdapter,
    category_id: &str,
    page_count: u32,
) -> Result<Vec<String>, FeedError> {
    if page_count == 0 {
        return Err(FeedError::Config("pages must be a positive integer".to_string()));
    }

    let t0 = Instant::now();
    let endpoint = adapter.listing_endpoint();
    let requests = plan_pages(adapter, category_id, page_count);
    let mut bodies: Vec<Option<String>> = vec![None; requests.len()];

    let mut completions = stream::iter(requests)
        .map(|request| {
            let endpoint = &endpoint;
            async move {
                let query = adapter.page_query(&request);
                let result = fetcher.get(endpoint, &query).await;
                (request.page_index, result)
            }
        })
        .buffer_unordered(page_count as usize);

    while let Some((page, result)) = completions.next().await {
        match result {
            Ok(body) => {
                debug!(page, bytes = body.len(), "Page fetched");
                bodies[(page - 1) as usize] = Some(body);
            }
            Err(e) => {
                error!(page, status = ?e.status, error = %e, "Page fetch failed; abandoning request");
                return Err(FeedError::Fetch {
                    page,
                    status: e.status,
                    cause: e.cause,
                });
            }
        }
    }

    info!(
        pages = page_count,
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "Fetched listing pages"
    );
    Ok(bodies.into_iter().flatten().collect())
}
