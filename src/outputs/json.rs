//! JSON Feed 1.1 output.
//!
//! # Output Structure
//!
//! ```json
//! {
//!   "version": "https://jsonfeed.org/version/1.1",
//!   "title": "...",
//!   "home_page_url": "https://...",
//!   "items": [
//!     { "id": "https://...", "url": "https://...", "title": "...", "date_published": "2024-03-05T00:00:00+08:00" }
//!   ]
//! }
//! ```
//!
//! `date_published` is omitted for items without a parsed date.

use crate::error::FeedError;
use crate::models::Feed;
use serde::Serialize;
use tracing::{debug, instrument};

const JSON_FEED_VERSION: &str = "https://jsonfeed.org/version/1.1";

#[derive(Serialize)]
struct JsonFeed<'a> {
    version: &'static str,
    title: &'a str,
    home_page_url: &'a str,
    items: Vec<JsonFeedItem<'a>>,
}

#[derive(Serialize)]
struct JsonFeedItem<'a> {
    id: &'a str,
    url: &'a str,
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    date_published: Option<String>,
}

/// Render `feed` as a JSON Feed document.
#[instrument(level = "debug", skip_all, fields(items = feed.items.len()))]
pub fn render(feed: &Feed) -> Result<String, FeedError> {
    let doc = JsonFeed {
        version: JSON_FEED_VERSION,
        title: &feed.title,
        home_page_url: feed.link.as_str(),
        items: feed
            .items
            .iter()
            .map(|item| JsonFeedItem {
                id: item.link.as_str(),
                url: item.link.as_str(),
                title: &item.title,
                date_published: item.pub_date.map(|d| d.to_rfc3339()),
            })
            .collect(),
    };

    let json = serde_json::to_string(&doc)?;
    debug!(bytes = json.len(), "Rendered JSON feed");
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FeedItem;
    use chrono::{FixedOffset, TimeZone};
    use serde_json::Value;
    use url::Url;

    #[test]
    fn test_render_json_feed() {
        let tz = FixedOffset::east_opt(8 * 3600).unwrap();
        let feed = Feed {
            title: "Listing".to_string(),
            link: Url::parse("https://zk.zjzs.net/Index/InfoSQList.aspx?classID=11").unwrap(),
            items: vec![
                FeedItem {
                    title: "dated".to_string(),
                    link: Url::parse("https://zk.zjzs.net/a").unwrap(),
                    pub_date: Some(tz.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap()),
                },
                FeedItem {
                    title: "undated".to_string(),
                    link: Url::parse("https://zk.zjzs.net/b").unwrap(),
                    pub_date: None,
                },
            ],
        };

        let value: Value = serde_json::from_str(&render(&feed).unwrap()).unwrap();
        assert_eq!(value["version"], JSON_FEED_VERSION);
        assert_eq!(
            value["home_page_url"],
            "https://zk.zjzs.net/Index/InfoSQList.aspx?classID=11"
        );
        assert_eq!(value["items"][0]["title"], "dated");
        assert_eq!(value["items"][0]["date_published"], "2024-03-05T00:00:00+08:00");
        assert_eq!(value["items"][1]["url"], "https://zk.zjzs.net/b");
        assert!(value["items"][1].get("date_published").is_none());
    }
}
