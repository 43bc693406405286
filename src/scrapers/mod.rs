//! Listing sources that can be turned into feeds.
//!
//! Each source is a [`SourceAdapter`]: it knows where its listing pages live,
//! how to request one page, how to pull records out of the returned markup,
//! and how its dates are written. The pager and assembler only talk to this
//! trait, so a new source is added by implementing it in a new submodule.
//!
//! # Supported Sources
//!
//! | Source | Module | Route | Notes |
//! |--------|--------|-------|-------|
//! | Zhejiang self-study exam notices | [`zjzs`] | `/zjzs/info/{class_id}` | AJAX listing fragment, 10 entries per page |

use crate::models::{FeedMeta, PageRequest, RawRecord};
use chrono::FixedOffset;
use url::Url;

pub mod zjzs;

/// Capability every listing source provides.
pub trait SourceAdapter: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Base URL that relative links are resolved against.
    fn base_url(&self) -> &Url;

    /// Moment-style date pattern of the listing's date labels.
    fn date_format(&self) -> &'static str;

    /// Timezone the source publishes dates in.
    fn timezone(&self) -> FixedOffset;

    /// Category used when the request does not name one.
    fn default_category(&self) -> &'static str;

    /// Entries per listing page.
    fn page_size(&self) -> u32;

    /// Endpoint the listing pages are fetched from.
    fn listing_endpoint(&self) -> Url;

    /// Query parameters for one page fetch.
    fn page_query(&self, request: &PageRequest) -> Vec<(String, String)>;

    /// Pull the listing entries out of one page of markup.
    ///
    /// A page without matching entries yields an empty vector. Entries whose
    /// link cannot be resolved are skipped.
    fn extract(&self, html: &str) -> Vec<RawRecord>;

    /// Feed title and canonical (human-facing) link for a category.
    fn feed_meta(&self, category_id: &str) -> FeedMeta;

    /// Map a URL on the source's own site back to this service's route path.
    fn reverse_map(&self, url: &Url) -> Option<String>;
}

/// Find the first adapter that claims `url` and return its route path.
pub fn reverse_map(adapters: &[&dyn SourceAdapter], url: &Url) -> Option<String> {
    adapters.iter().find_map(|a| a.reverse_map(url))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reverse_map_dispatches_to_matching_adapter() {
        let zjzs = zjzs::Zjzs::new();
        let adapters: [&dyn SourceAdapter; 1] = [&zjzs];

        let url = Url::parse("https://zk.zjzs.net/Index/InfoSQList.aspx?classID=42").unwrap();
        assert_eq!(reverse_map(&adapters, &url), Some("/zjzs/info/42".to_string()));

        let other = Url::parse("https://example.com/Index/InfoSQList.aspx?classID=42").unwrap();
        assert_eq!(reverse_map(&adapters, &other), None);
    }
}
