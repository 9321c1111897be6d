//! TechMeme headline collection for the report's TechMeme section.
//!
//! Stories come from the public TechMeme feed; the renderer reads them back
//! from `data/techneme.json`.

use scraper::Html;
use tracing::{info, instrument};

use crate::http::{FetchText, Fetcher};
use crate::models::{FeedItem, RssOptions, TechmemeStory};
use crate::scrapers::rss;

pub const DEFAULT_FEED_URL: &str = "https://www.techmeme.com/feed.xml";

const SUMMARY_CHARS: usize = 150;

/// Headline without the trailing `(Source / Author)` attribution.
fn clean_title(title: &str) -> String {
    title.split('(').next().unwrap_or_default().trim().to_string()
}

/// Plain-text summary, cut to 150 characters plus `...` when longer.
fn summarize(description: &str) -> String {
    let fragment = Html::parse_fragment(description);
    let text = fragment
        .root_element()
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    if text.chars().count() > SUMMARY_CHARS {
        let cut: String = text.chars().take(SUMMARY_CHARS).collect();
        format!("{cut}...")
    } else {
        text
    }
}

fn to_story(item: FeedItem) -> TechmemeStory {
    TechmemeStory {
        title: clean_title(&item.title),
        url: item.url,
        summary: summarize(&item.description),
        timestamp: item.published,
    }
}

/// Fetch the first `limit` TechMeme stories.
#[instrument(level = "info", skip_all, fields(%feed_url, limit))]
pub async fn fetch_stories<F: FetchText>(
    fetcher: &Fetcher<F>,
    feed_url: &str,
    limit: usize,
) -> Vec<TechmemeStory> {
    let opts = RssOptions {
        url: Some(feed_url.to_string()),
        limit,
    };
    let stories: Vec<TechmemeStory> = rss::fetch(fetcher, &opts)
        .await
        .into_iter()
        .map(to_story)
        .collect();
    info!(count = stories.len(), "Fetched TechMeme stories");
    stories
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::stub::StubHttp;
    use std::time::Duration;

    #[test]
    fn test_clean_title_drops_attribution() {
        assert_eq!(
            clean_title("Acme raises $2B to build AI chips (Jane Doe / Bloomberg)"),
            "Acme raises $2B to build AI chips"
        );
        assert_eq!(clean_title("No attribution"), "No attribution");
    }

    #[test]
    fn test_summarize_strips_markup_and_truncates() {
        assert_eq!(summarize("<p><b>Acme</b> ships   a model.</p>"), "Acme ships a model.");

        let long = format!("<p>{}</p>", "word ".repeat(60));
        let s = summarize(&long);
        assert!(s.ends_with("..."));
        assert_eq!(s.chars().count(), SUMMARY_CHARS + 3);
    }

    #[tokio::test]
    async fn test_fetch_stories() {
        let feed = r#"<rss><channel>
            <item><title>Story one (A / Wire)</title><link>https://t.example/1</link>
              <description>&lt;p&gt;First&lt;/p&gt;</description><pubDate>Sat, 14 Feb 2026 09:00:00 -0500</pubDate></item>
            <item><title>Story two</title><link>https://t.example/2</link></item>
            <item><title>Story three</title><link>https://t.example/3</link></item>
        </channel></rss>"#;
        let http = StubHttp::new().with(DEFAULT_FEED_URL, feed);
        let fetcher = Fetcher::new(&http, Duration::from_secs(1));

        let stories = fetch_stories(&fetcher, DEFAULT_FEED_URL, 2).await;
        assert_eq!(stories.len(), 2);
        assert_eq!(stories[0].title, "Story one");
        assert_eq!(stories[0].summary, "First");
        assert_eq!(stories[0].timestamp, "Sat, 14 Feb 2026 09:00:00 -0500");
        assert_eq!(stories[1].summary, "");
    }
}
