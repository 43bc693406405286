//! RSS 2.0 output.
//!
//! # Output Structure
//!
//! ```text
//! <rss version="2.0">
//!   <channel>
//!     <title/> <link/> <description/> [<lastBuildDate/>] <ttl/>
//!     <item> <title/> <link/> <guid isPermaLink="true"/> [<pubDate/>] </item>
//!   </channel>
//! </rss>
//! ```
//!
//! The document depends only on the feed and the ttl, so equal feeds render
//! to equal bytes and keep their ETag. `lastBuildDate` is the newest item date.

use crate::error::FeedError;
use crate::models::Feed;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::io::Write;
use std::time::Duration;
use tracing::{debug, instrument};

fn write_text_element<W: Write>(w: &mut Writer<W>, name: &str, text: &str) -> Result<(), FeedError> {
    w.write_event(Event::Start(BytesStart::new(name)))?;
    w.write_event(Event::Text(BytesText::new(text)))?;
    w.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// Render `feed` as an RSS 2.0 document.
#[instrument(level = "debug", skip_all, fields(items = feed.items.len()))]
pub fn render(feed: &Feed, ttl: Duration) -> Result<String, FeedError> {
    let mut w = Writer::new_with_indent(Vec::new(), b' ', 2);

    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("version", "2.0"));
    w.write_event(Event::Start(rss))?;
    w.write_event(Event::Start(BytesStart::new("channel")))?;

    write_text_element(&mut w, "title", &feed.title)?;
    write_text_element(&mut w, "link", feed.link.as_str())?;
    write_text_element(&mut w, "description", &feed.title)?;
    if let Some(newest) = feed.items.iter().filter_map(|i| i.pub_date).max() {
        write_text_element(&mut w, "lastBuildDate", &newest.to_rfc2822())?;
    }
    write_text_element(&mut w, "ttl", &(ttl.as_secs() / 60).max(1).to_string())?;

    for item in &feed.items {
        w.write_event(Event::Start(BytesStart::new("item")))?;
        write_text_element(&mut w, "title", &item.title)?;
        write_text_element(&mut w, "link", item.link.as_str())?;

        let mut guid = BytesStart::new("guid");
        guid.push_attribute(("isPermaLink", "true"));
        w.write_event(Event::Start(guid))?;
        w.write_event(Event::Text(BytesText::new(item.link.as_str())))?;
        w.write_event(Event::End(BytesEnd::new("guid")))?;

        if let Some(pub_date) = item.pub_date {
            write_text_element(&mut w, "pubDate", &pub_date.to_rfc2822())?;
        }
        w.write_event(Event::End(BytesEnd::new("item")))?;
    }

    w.write_event(Event::End(BytesEnd::new("channel")))?;
    w.write_event(Event::End(BytesEnd::new("rss")))?;

    let xml = String::from_utf8(w.into_inner()).map_err(|e| FeedError::Render(e.to_string()))?;
    debug!(bytes = xml.len(), "Rendered RSS");
    Ok(xml)
}
