//! Zhejiang self-study examination notice listings.
//!
//! This module scrapes the notice board of [zk.zjzs.net](https://zk.zjzs.net).
//! The human-facing listing at `/Index/InfoSQList.aspx?classID=<id>` loads its
//! entries from an AJAX fragment, `/Index/ajax_InfoSQList.aspx`, which is what
//! we fetch. Each entry looks like:
//!
//! ```html
//! <div class="news-list">
//!   <div class="item">
//!     <div class="title"><a href="/Index/InfoPage.aspx?id=1">Title</a></div>
//!     <div class="des">发布时间:2024-03-05</div>
//!   </div>
//! </div>
//! ```

use super::SourceAdapter;
use crate::models::{FeedMeta, PageRequest, RawRecord};
use chrono::FixedOffset;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, instrument, warn};
use url::Url;

const BASE_URL: &str = "https://zk.zjzs.net";
const DEFAULT_CLASS_ID: &str = "11";
const PAGE_SIZE: u32 = 10;

static ITEM_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".news-list .item").expect("valid item selector"));
static TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".title a").expect("valid title selector"));
static DATE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".des").expect("valid date selector"));
static PUBLISHED_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*发布时间\s*[:：]\s*").expect("valid prefix regex"));

/// Listing pages of source paths that map back to `/zjzs/info/{class_id}`.
const RADAR_PATHS: [&str; 2] = ["/Index/InfoSQList.aspx", "/Index/InfoPage.aspx"];

#[derive(Debug, Clone)]
pub struct Zjzs {
    base: Url,
}

impl Zjzs {
    pub fn new() -> Self {
        Self {
            base: Url::parse(BASE_URL).expect("valid base url"),
        }
    }
}

impl Default for Zjzs {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract listing entries from one page of markup.
///
/// Entries without a resolvable link are dropped with a log line. An
/// entry without a title is still returned; filtering is the assembler's job.
#[instrument(level = "debug", skip_all, fields(bytes = html.len()))]
pub fn extract_listing(html: &str, base: &Url) -> Vec<RawRecord> {
    let document = Html::parse_document(html);
    let mut records = Vec::new();

    for entry in document.select(&ITEM_SELECTOR) {
        let Some(anchor) = entry.select(&TITLE_SELECTOR).next() else {
            debug!("Listing entry has no title link; skipping");
            continue;
        };
        let title = anchor.text().collect::<String>().trim().to_string();

        let Some(href) = anchor.value().attr("href") else {
            debug!(%title, "Listing entry has no href; skipping");
            continue;
        };
        let link = match base.join(href.trim()) {
            Ok(link) => link,
            Err(e) => {
                warn!(%title, href, error = %e, "Unresolvable link; skipping entry");
                continue;
            }
        };

        let date_label = entry
            .select(&DATE_SELECTOR)
            .next()
            .map(|d| d.text().collect::<String>())
            .unwrap_or_default();
        let raw_date = PUBLISHED_PREFIX.replace(&date_label, "").trim().to_string();

        records.push(RawRecord {
            title,
            link,
            raw_date,
        });
    }

    debug!(count = records.len(), "Extracted listing entries");
    records
}

impl SourceAdapter for Zjzs {
    fn name(&self) -> &'static str {
        "zjzs"
    }

    fn base_url(&self) -> &Url {
        &self.base
    }

    fn date_format(&self) -> &'static str {
        "YYYY-MM-DD"
    }

    fn timezone(&self) -> FixedOffset {
        FixedOffset::east_opt(8 * 3600).expect("UTC+8 is a valid offset")
    }

    fn default_category(&self) -> &'static str {
        DEFAULT_CLASS_ID
    }

    fn page_size(&self) -> u32 {
        PAGE_SIZE
    }

    fn listing_endpoint(&self) -> Url {
        let mut url = self.base.clone();
        url.set_path("/Index/ajax_InfoSQList.aspx");
        url
    }

    fn page_query(&self, request: &PageRequest) -> Vec<(String, String)> {
        vec![
            ("pageSize".to_string(), request.page_size.to_string()),
            ("goPage".to_string(), request.page_index.to_string()),
            ("classID".to_string(), request.category_id.clone()),
        ]
    }

    fn extract(&self, html: &str) -> Vec<RawRecord> {
        extract_listing(html, self.base_url())
    }

    fn feed_meta(&self, category_id: &str) -> FeedMeta {
        let mut link = self.base.clone();
        link.set_path("/Index/InfoSQList.aspx");
        link.query_pairs_mut().append_pair("classID", category_id);
        FeedMeta {
            title: format!("浙江自考信息公告（classID={category_id}）"),
            link,
        }
    }

    fn reverse_map(&self, url: &Url) -> Option<String> {
        if url.host_str() != self.base.host_str() || !RADAR_PATHS.contains(&url.path()) {
            return None;
        }
        let class_id = url
            .query_pairs()
            .find(|(k, _)| k == "classID")
            .map(|(_, v)| v.into_owned())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_CLASS_ID.to_string());
        Some(format!("/zjzs/info/{}", urlencoding::encode(&class_id)))
    }
}
