//! RSS 2.0 and Atom feed parsing.
//!
//! Both formats are handled by one pass over the document: `<item>` and
//! `<entry>` open an entry, and their direct children are matched by name.
//! The first occurrence of each field wins.
//!
//! | Field       | RSS 2.0        | Atom                 |
//! |-------------|----------------|----------------------|
//! | title       | `title`        | `title`              |
//! | link        | `link` text    | `link@href`          |
//! | description | `description`  | `summary`            |
//! | published   | `pubDate`      | `published`          |

use itertools::Itertools;
use quick_xml::Reader;
use quick_xml::errors::IllFormedError;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesStart, Event};
use tracing::{error, info, instrument};

use crate::http::{FetchText, Fetcher};
use crate::models::{FeedItem, RssOptions, SourceItem};
use crate::scrapers::description::MAX_DESCRIPTION_CHARS;
use crate::utils::truncate_chars;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Description,
    Summary,
    PubDate,
    Published,
}

impl Field {
    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Self::Title),
            b"link" => Some(Self::Link),
            b"description" => Some(Self::Description),
            b"summary" => Some(Self::Summary),
            b"pubDate" => Some(Self::PubDate),
            b"published" => Some(Self::Published),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct RawEntry {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    summary: Option<String>,
    pub_date: Option<String>,
    published: Option<String>,
}

impl RawEntry {
    fn slot(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::Description => &mut self.description,
            Field::Summary => &mut self.summary,
            Field::PubDate => &mut self.pub_date,
            Field::Published => &mut self.published,
        }
    }

    fn has(&self, field: Field) -> bool {
        match field {
            Field::Title => self.title.is_some(),
            Field::Link => self.link.is_some(),
            Field::Description => self.description.is_some(),
            Field::Summary => self.summary.is_some(),
            Field::PubDate => self.pub_date.is_some(),
            Field::Published => self.published.is_some(),
        }
    }

    /// Keep only the first value seen for a field.
    fn set_once(&mut self, field: Field, value: String) {
        let slot = self.slot(field);
        if slot.is_none() {
            *slot = Some(value);
        }
    }

    fn into_item(self) -> Option<FeedItem> {
        let published = self.published_or_pub_date();
        let title = self.title.unwrap_or_default().trim().to_string();
        let url = self.link.unwrap_or_default().trim().to_string();
        if title.is_empty() || url.is_empty() {
            return None;
        }
        let description = self.description.or(self.summary).unwrap_or_default();
        Some(FeedItem {
            title,
            url,
            description: truncate_chars(description.trim(), MAX_DESCRIPTION_CHARS),
            published,
        })
    }

    fn published_or_pub_date(&self) -> String {
        self.pub_date
            .as_deref()
            .or(self.published.as_deref())
            .unwrap_or_default()
            .trim()
            .to_string()
    }
}

fn is_entry(name: &[u8]) -> bool {
    name == b"item" || name == b"entry"
}

fn href(reader: &Reader<&[u8]>, e: &BytesStart<'_>) -> Result<Option<String>, quick_xml::Error> {
    match e.try_get_attribute("href")? {
        Some(attr) => Ok(Some(
            attr.decode_and_unescape_value(reader.decoder())?.into_owned(),
        )),
        None => Ok(None),
    }
}

/// Parse a feed document into entries, in document order.
///
/// Entries missing a title or link are dropped; so are entries whose link
/// repeats an earlier one. At most `limit` entries are returned.
///
/// # Errors
///
/// Returns the underlying [`quick_xml::Error`] for malformed XML, including
/// a document that ends while an element is still open.
pub fn parse_feed(xml: &str, limit: usize) -> Result<Vec<FeedItem>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);

    let mut entries: Vec<RawEntry> = Vec::new();
    let mut current: Option<RawEntry> = None;
    // Open elements below the current entry.
    let mut depth = 0usize;
    let mut capture: Option<Field> = None;
    let mut text = String::new();
    // Every open element in the document, innermost last.
    let mut open: Vec<String> = Vec::new();

    loop {
        let event = reader.read_event()?;
        match &event {
            Event::Start(e) => open.push(String::from_utf8_lossy(e.name().as_ref()).into_owned()),
            Event::End(_) => {
                open.pop();
            }
            _ => {}
        }

        match event {
            Event::Start(e) => match current.as_mut() {
                Some(entry) => {
                    depth += 1;
                    if depth == 1 {
                        capture = Field::from_name(e.name().as_ref()).filter(|f| !entry.has(*f));
                        text.clear();
                        if capture == Some(Field::Link) {
                            if let Some(h) = href(&reader, &e)? {
                                entry.set_once(Field::Link, h);
                                capture = None;
                            }
                        }
                    }
                }
                None => {
                    if is_entry(e.name().as_ref()) {
                        current = Some(RawEntry::default());
                        depth = 0;
                    }
                }
            },
            Event::Empty(e) => {
                if let Some(entry) = current.as_mut() {
                    if depth == 0 {
                        if let Some(field) = Field::from_name(e.name().as_ref()) {
                            let value = if field == Field::Link {
                                href(&reader, &e)?.unwrap_or_default()
                            } else {
                                String::new()
                            };
                            entry.set_once(field, value);
                        }
                    }
                }
            }
            Event::Text(t) => {
                if capture.is_some() && depth == 1 {
                    text.push_str(&t.decode()?);
                }
            }
            Event::CData(c) => {
                if capture.is_some() && depth == 1 {
                    text.push_str(&c.decode()?);
                }
            }
            Event::GeneralRef(r) => {
                if capture.is_some() && depth == 1 {
                    if let Some(ch) = r.resolve_char_ref()? {
                        text.push(ch);
                    } else {
                        let name = r.decode()?;
                        match resolve_predefined_entity(&name) {
                            Some(resolved) => text.push_str(resolved),
                            None => {
                                text.push('&');
                                text.push_str(&name);
                                text.push(';');
                            }
                        }
                    }
                }
            }
            Event::End(_) => {
                if current.is_some() {
                    if depth == 0 {
                        entries.extend(current.take());
                    } else {
                        if depth == 1 {
                            if let (Some(field), Some(entry)) = (capture.take(), current.as_mut()) {
                                entry.set_once(field, std::mem::take(&mut text));
                            }
                        }
                        depth -= 1;
                    }
                }
            }
            Event::Eof => {
                if let Some(name) = open.pop() {
                    return Err(quick_xml::Error::IllFormed(IllFormedError::MissingEndTag(name)));
                }
                break;
            }
            _ => {}
        }
    }

    Ok(entries
        .into_iter()
        .filter_map(RawEntry::into_item)
        .unique_by(|item| item.url.clone())
        .take(limit)
        .collect())
}

/// Fetch and parse one configured feed.
#[instrument(level = "info", skip_all, fields(url = opts.url.as_deref().unwrap_or("")))]
pub async fn fetch<F: FetchText>(fetcher: &Fetcher<F>, opts: &RssOptions) -> Vec<FeedItem> {
    let Some(url) = opts.url.as_deref().filter(|u| !u.is_empty()) else {
        return Vec::new();
    };
    let Some(body) = fetcher.text(url).await else {
        return Vec::new();
    };

    match parse_feed(&body, opts.limit) {
        Ok(items) => {
            info!(count = items.len(), "Fetched feed entries");
            items
        }
        Err(e) => {
            error!(%url, error = %e, "Error parsing RSS");
            Vec::new()
        }
    }
}

/// [`fetch`], wrapped as generic source items.
pub async fn fetch_items<F: FetchText>(fetcher: &Fetcher<F>, opts: &RssOptions) -> Vec<SourceItem> {
    fetch(fetcher, opts)
        .await
        .into_iter()
        .map(SourceItem::Feed)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::stub::StubHttp;
    use std::time::Duration;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom">
  <channel>
    <title>Lab Blog</title>
    <link>https://lab.example</link>
    <item>
      <title>Model &amp; tools release</title>
      <link>https://lab.example/posts/release</link>
      <description><![CDATA[<p>We are shipping.</p>]]></description>
      <pubDate>Fri, 13 Feb 2026 18:00:00 GMT</pubDate>
    </item>
    <item>
      <title>   </title>
      <link>https://lab.example/posts/untitled</link>
    </item>
    <item>
      <title>Duplicate</title>
      <link>https://lab.example/posts/release</link>
    </item>
    <item>
      <title>Research note</title>
      <link>
        https://lab.example/posts/note
      </link>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Lab</title>
  <link href="https://atom.example/"/>
  <entry>
    <title type="html">Scaling &#8220;laws&#8221;</title>
    <link rel="alternate" href="https://atom.example/scaling"/>
    <link rel="related" href="https://atom.example/other"/>
    <summary>Short summary</summary>
    <published>2026-02-13T10:00:00Z</published>
    <updated>2026-02-14T10:00:00Z</updated>
  </entry>
  <entry>
    <title>No link</title>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_rss() {
        let items = parse_feed(RSS, 10).unwrap();
        assert_eq!(items.len(), 2);

        assert_eq!(items[0].title, "Model & tools release");
        assert_eq!(items[0].url, "https://lab.example/posts/release");
        assert_eq!(items[0].description, "<p>We are shipping.</p>");
        assert_eq!(items[0].published, "Fri, 13 Feb 2026 18:00:00 GMT");

        assert_eq!(items[1].title, "Research note");
        assert_eq!(items[1].url, "https://lab.example/posts/note");
        assert_eq!(items[1].description, "");
    }

    #[test]
    fn test_parse_atom() {
        let items = parse_feed(ATOM, 10).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Scaling \u{201c}laws\u{201d}");
        assert_eq!(items[0].url, "https://atom.example/scaling");
        assert_eq!(items[0].description, "Short summary");
        assert_eq!(items[0].published, "2026-02-13T10:00:00Z");
    }

    #[test]
    fn test_limit_and_truncation() {
        let long = "x".repeat(400);
        let xml = format!(
            "<rss><channel>\
             <item><title>A</title><link>https://e.com/a</link><description>{long}</description></item>\
             <item><title>B</title><link>https://e.com/b</link></item>\
             </channel></rss>"
        );
        let items = parse_feed(&xml, 1).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].description.chars().count(), MAX_DESCRIPTION_CHARS);
    }

    #[test]
    fn test_malformed_xml_errors() {
        let xml = "<rss><channel><item><title>Broken</link></item></channel></rss>";
        assert!(parse_feed(xml, 10).is_err());
    }

    #[test]
    fn test_truncated_document_errors() {
        let xml = "<rss><channel><item><title>A</title><link>https://e.com/a</link></item>";
        assert!(parse_feed(xml, 10).is_err());
    }

    #[test]
    fn test_limit_counts_only_usable_entries() {
        let xml = "<rss><channel>\
             <item><title></title><link>https://e.com/empty</link></item>\
             <item><title>A</title><link>https://e.com/a</link></item>\
             <item><title>A again</title><link>https://e.com/a</link></item>\
             <item><title>B</title><link>https://e.com/b</link></item>\
             <item><title>C</title><link>https://e.com/c</link></item>\
             </channel></rss>";
        let items = parse_feed(xml, 2).unwrap();
        let titles: Vec<&str> = items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, ["A", "B"]);
    }

    #[tokio::test]
    async fn test_fetch_without_url_is_empty() {
        let http = StubHttp::new();
        let fetcher = Fetcher::new(&http, Duration::from_secs(1));
        assert!(fetch(&fetcher, &RssOptions::default()).await.is_empty());
        assert!(http.requested().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_swallows_parse_errors() {
        let http = StubHttp::new().with("https://e.com/feed", "<rss><item><title>x</link></rss>");
        let fetcher = Fetcher::new(&http, Duration::from_secs(1));
        let opts = RssOptions {
            url: Some("https://e.com/feed".to_string()),
            limit: 10,
        };
        assert!(fetch(&fetcher, &opts).await.is_empty());
    }
}
