//! Feed serializers.
//!
//! # Submodules
//!
//! - [`rss`]: RSS 2.0 document, the default
//! - [`json`]: JSON Feed 1.1 document
//!
//! Both keep the feed's item order.

use crate::error::FeedError;
use crate::models::Feed;
use std::str::FromStr;
use std::time::Duration;

pub mod json;
pub mod rss;

/// Output format selected with the `format` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Rss,
    Json,
}

impl OutputFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            OutputFormat::Rss => "application/rss+xml; charset=utf-8",
            OutputFormat::Json => "application/feed+json; charset=utf-8",
        }
    }

    /// Serialize `feed`. `ttl` is advertised to readers where the format allows.
    pub fn render(self, feed: &Feed, ttl: Duration) -> Result<String, FeedError> {
        match self {
            OutputFormat::Rss => rss::render(feed, ttl),
            OutputFormat::Json => json::render(feed),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "" | "rss" | "xml" => Ok(OutputFormat::Rss),
            "json" => Ok(OutputFormat::Json),
            other => Err(FeedError::UnknownFormat(other.to_string())),
        }
    }
}
