//! Data models for scraped listing records and the feeds built from them.
//!
//! This module defines the core data structures used throughout the application:
//! - [`RawRecord`]: One listing entry exactly as a source adapter extracted it
//! - [`FeedItem`]: A validated, normalized entry ready for serialization
//! - [`Feed`]: The ordered collection of items for one category
//! - [`PageRequest`]: The parameter bundle for fetching one listing page
//! - [`FeedMeta`]: Title and canonical link a source assigns to a category

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use url::Url;

/// A listing entry as extracted from one page of markup.
///
/// Produced by a [`SourceAdapter`](crate::scrapers::SourceAdapter) and
/// consumed by the assembler; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// Entry title, already trimmed. May be empty; the assembler drops those.
    pub title: String,
    /// Absolute link, resolved against the source's base URL.
    pub link: Url,
    /// Date label with any "published at" marker stripped.
    pub raw_date: String,
}

/// A normalized feed entry.
///
/// The title is never empty and the link is always absolute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedItem {
    pub title: String,
    pub link: Url,
    /// Publication timestamp in the source's timezone, absent when the
    /// date label could not be parsed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pub_date: Option<DateTime<FixedOffset>>,
}

/// The output of one pipeline invocation.
///
/// Item order is page-fetch order, then document order within a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Feed {
    pub title: String,
    pub link: Url,
    pub items: Vec<FeedItem>,
}

/// Title and canonical listing link for one category of a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedMeta {
    pub title: String,
    pub link: Url,
}

/// Parameters for one listing page fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page index.
    pub page_index: u32,
    pub page_size: u32,
    pub category_id: String,
}
