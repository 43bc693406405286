//! One scrape-to-feed invocation: fetch pages, extract records, assemble.

use crate::assemble::assemble;
use crate::error::FeedError;
use crate::fetch::Fetcher;
use crate::models::{Feed, RawRecord};
use crate::pager::fetch_pages;
use crate::scrapers::SourceAdapter;
use crate::utils::truncate_for_log;
use tracing::{info, instrument, warn};

/// Build the feed for `category_id` from its first `pages` listing pages.
#[instrument(level = "info", skip_all, fields(source = adapter.name(), category_id, pages))]
pub async fn build_feed(
    fetcher: &dyn Fetcher,
    adapter: &dyn SourceAdapter,
    category_id: &str,
    pages: u32,
) -> Result<Feed, FeedError> {
    let bodies = fetch_pages(fetcher, adapter, category_id, pages).await?;

    let records: Vec<Vec<RawRecord>> = bodies
        .iter()
        .enumerate()
        .map(|(i, html)| {
            let page = adapter.extract(html);
            if page.is_empty() {
                warn!(
                    page = i + 1,
                    preview = %truncate_for_log(html, 200),
                    "Listing page contained no entries"
                );
            }
            page
        })
        .collect();

    let feed = assemble(records, adapter, adapter.feed_meta(category_id));
    info!(items = feed.items.len(), "Assembled feed");
    Ok(feed)
}
