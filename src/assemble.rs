//! Merge per-page records into a [`Feed`].

use crate::dates::parse_date;
use crate::models::{Feed, FeedItem, FeedMeta, RawRecord};
use crate::scrapers::SourceAdapter;
use tracing::debug;

/// Flatten pages in order, normalize dates and drop untitled records.
///
/// Records repeated across pages are kept as-is.
pub fn assemble(pages: Vec<Vec<RawRecord>>, adapter: &dyn SourceAdapter, meta: FeedMeta) -> Feed {
    let format = adapter.date_format();
    let tz = adapter.timezone();

    let items: Vec<FeedItem> = pages
        .into_iter()
        .flatten()
        .filter_map(|record| {
            let title = record.title.trim();
            if title.is_empty() {
                debug!(link = %record.link, "Dropping record with empty title");
                return None;
            }
            Some(FeedItem {
                title: title.to_string(),
                pub_date: parse_date(&record.raw_date, format, tz),
                link: record.link,
            })
        })
        .collect();

    Feed {
        title: meta.title,
        link: meta.link,
        items,
    }
}
