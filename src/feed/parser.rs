use quick_xml::de::from_str;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors produced while normalizing a feed document.
///
/// All of these are recoverable from the pipeline's point of view: the cycle
/// logs the failure and the feed waits for its next turn.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Neither the document root nor an `rss` envelope contains a channel
    #[error("no channel element found")]
    NoChannel,
    /// Channel is present but lacks title, link, or description
    #[error("missing required channel properties")]
    MissingChannelFields,
    /// Document is not well-formed XML
    #[error("invalid feed XML: {0}")]
    Xml(#[from] quick_xml::DeError),
    /// Document is not valid UTF-8
    #[error("feed is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),
}

// ============================================================================
// Normalized Feed
// ============================================================================

/// Channel metadata plus its items, in source order
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFeed {
    pub title: String,
    pub link: String,
    pub description: String,
    pub items: Vec<ParsedItem>,
}

/// A single feed entry. Fields missing in the source default to empty
/// strings — item-level gaps are never an error.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedItem {
    pub title: String,
    pub link: String,
    pub description: String,
    pub pub_date: String,
}

// ============================================================================
// Raw Document Shapes
// ============================================================================

/// `<rss version="2.0"><channel>...</channel></rss>`
#[derive(Debug, Deserialize)]
struct RssEnvelope {
    channel: Option<RawChannel>,
}

/// Repeated `<item>` elements collect into the Vec, so the absent / single /
/// many shapes all land here: no `item` field leaves the default empty list,
/// one element yields a one-entry list, several yield all of them in order.
#[derive(Debug, Default, Deserialize)]
struct RawChannel {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    #[serde(default, rename = "item")]
    items: Vec<RawItem>,
}

#[derive(Debug, Deserialize)]
struct RawItem {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
}

// ============================================================================
// Parsing
// ============================================================================

/// Normalize a raw RSS document.
///
/// The channel element is accepted either at the document root or nested
/// under an `rss` root. Channel `title`, `link`, and `description` are
/// required; item fields are individually optional and default to `""`.
pub fn parse_feed(raw: &[u8]) -> Result<ParsedFeed, ParseError> {
    let text = std::str::from_utf8(raw)?;

    let channel = match root_element_name(text).as_deref() {
        Some("rss") => from_str::<RssEnvelope>(text)?
            .channel
            .ok_or(ParseError::NoChannel)?,
        Some("channel") => from_str::<RawChannel>(text)?,
        _ => return Err(ParseError::NoChannel),
    };

    let (Some(title), Some(link), Some(description)) =
        (channel.title, channel.link, channel.description)
    else {
        return Err(ParseError::MissingChannelFields);
    };

    let items = channel
        .items
        .into_iter()
        .map(|item| ParsedItem {
            title: item.title.unwrap_or_default(),
            link: item.link.unwrap_or_default(),
            description: item.description.unwrap_or_default(),
            pub_date: item.pub_date.unwrap_or_default(),
        })
        .collect();

    Ok(ParsedFeed {
        title,
        link,
        description,
        items,
    })
}

/// Name of the document's first element, skipping the XML declaration,
/// comments, and whitespace.
fn root_element_name(text: &str) -> Option<String> {
    let mut reader = Reader::from_str(text);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Some(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rss(channel_body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel>{}</channel></rss>"#,
            channel_body
        )
    }

    const CHANNEL_META: &str = "<title>Blog</title>\
        <link>https://example.com</link>\
        <description>A blog</description>";

    #[test]
    fn test_channel_under_rss_root() {
        let doc = rss(CHANNEL_META);
        let feed = parse_feed(doc.as_bytes()).unwrap();
        assert_eq!(feed.title, "Blog");
        assert_eq!(feed.link, "https://example.com");
        assert_eq!(feed.description, "A blog");
        assert!(feed.items.is_empty());
    }

    #[test]
    fn test_channel_at_document_root() {
        let doc = format!("<channel>{}</channel>", CHANNEL_META);
        let feed = parse_feed(doc.as_bytes()).unwrap();
        assert_eq!(feed.title, "Blog");
    }

    #[test]
    fn test_unrelated_root_is_no_channel() {
        let doc = "<html><body>not a feed</body></html>";
        assert!(matches!(
            parse_feed(doc.as_bytes()),
            Err(ParseError::NoChannel)
        ));
    }

    #[test]
    fn test_rss_without_channel_is_no_channel() {
        let doc = r#"<rss version="2.0"></rss>"#;
        assert!(matches!(
            parse_feed(doc.as_bytes()),
            Err(ParseError::NoChannel)
        ));
    }

    #[test]
    fn test_missing_description_is_missing_fields() {
        let doc = rss("<title>Blog</title><link>https://example.com</link>");
        assert!(matches!(
            parse_feed(doc.as_bytes()),
            Err(ParseError::MissingChannelFields)
        ));
    }

    #[test]
    fn test_no_item_field_yields_empty_list() {
        let doc = rss(CHANNEL_META);
        let feed = parse_feed(doc.as_bytes()).unwrap();
        assert_eq!(feed.items.len(), 0);
    }

    #[test]
    fn test_single_item_yields_one_element() {
        let doc = rss(&format!(
            "{}<item><title>One</title><link>https://example.com/1</link>\
             <description>first</description>\
             <pubDate>Mon, 02 Jan 2006 15:04:05 +0000</pubDate></item>",
            CHANNEL_META
        ));
        let feed = parse_feed(doc.as_bytes()).unwrap();
        assert_eq!(feed.items.len(), 1);
        assert_eq!(
            feed.items[0],
            ParsedItem {
                title: "One".into(),
                link: "https://example.com/1".into(),
                description: "first".into(),
                pub_date: "Mon, 02 Jan 2006 15:04:05 +0000".into(),
            }
        );
    }

    #[test]
    fn test_two_items_in_source_order() {
        let doc = rss(&format!(
            "{}<item><title>One</title></item><item><title>Two</title></item>",
            CHANNEL_META
        ));
        let feed = parse_feed(doc.as_bytes()).unwrap();
        assert_eq!(feed.items.len(), 2);
        assert_eq!(feed.items[0].title, "One");
        assert_eq!(feed.items[1].title, "Two");
    }

    #[test]
    fn test_missing_item_fields_default_to_empty() {
        let doc = rss(&format!("{}<item><title>Sparse</title></item>", CHANNEL_META));
        let feed = parse_feed(doc.as_bytes()).unwrap();
        let item = &feed.items[0];
        assert_eq!(item.title, "Sparse");
        assert_eq!(item.link, "");
        assert_eq!(item.description, "");
        assert_eq!(item.pub_date, "");
    }

    #[test]
    fn test_invalid_utf8_is_encoding_error() {
        let bytes = [0xFF, 0xFE, b'<', b'r', b's', b's', b'>'];
        assert!(matches!(
            parse_feed(&bytes),
            Err(ParseError::Encoding(_))
        ));
    }
}
