//! Hacker News top stories via the Firebase API.
//!
//! The top-stories list is walked in rank order. Only the first
//! [`CANDIDATE_WINDOW`] ids are ever inspected, so a strict `min_score` can
//! yield fewer than `limit` stories.

use futures::stream::{self, StreamExt};
use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::http::{FetchText, Fetcher, PAGE_TIMEOUT};
use crate::models::{HackerNewsItem, HackerNewsOptions, SourceItem};
use crate::scrapers::description::{MAX_DESCRIPTION_CHARS, extract_description};
use crate::utils::{truncate_chars, unix_to_local_iso};

const TOP_STORIES_URL: &str = "https://hacker-news.firebaseio.com/v0/topstories.json";
const CANDIDATE_WINDOW: usize = 30;

/// Raw item as returned by `/v0/item/<id>.json`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HnStory {
    title: Option<String>,
    url: Option<String>,
    score: Option<i64>,
    by: Option<String>,
    time: Option<i64>,
}

fn item_url(id: u64) -> String {
    format!("https://hacker-news.firebaseio.com/v0/item/{id}.json")
}

/// Turn a raw story into an output item, or `None` if it does not qualify.
///
/// A story qualifies when it links somewhere and meets `min_score`.
/// The description is left empty for the caller to fill.
fn qualify(id: u64, story: HnStory, min_score: i64) -> Option<HackerNewsItem> {
    let score = story.score.unwrap_or(0);
    let url = story.url.filter(|u| !u.is_empty())?;
    if score < min_score {
        return None;
    }
    Some(HackerNewsItem {
        title: story.title.unwrap_or_default(),
        url,
        score,
        by: story.by.unwrap_or_default(),
        time: unix_to_local_iso(story.time.unwrap_or(0)),
        comments: format!("https://news.ycombinator.com/item?id={id}"),
        description: String::new(),
    })
}

/// Fetch qualifying top stories.
#[instrument(level = "info", skip_all, fields(min_score = opts.min_score, limit = opts.limit))]
pub async fn fetch<F: FetchText>(fetcher: &Fetcher<F>, opts: &HackerNewsOptions) -> Vec<SourceItem> {
    let Some(ids) = fetcher.json::<Vec<u64>>(TOP_STORIES_URL).await else {
        return Vec::new();
    };

    let items: Vec<HackerNewsItem> = stream::iter(ids.into_iter().take(CANDIDATE_WINDOW))
        .filter_map(|id| async move {
            let story = fetcher.json::<HnStory>(&item_url(id)).await?;
            let mut item = qualify(id, story, opts.min_score)?;
            if opts.fetch_description {
                if let Some(html) = fetcher.text_with_timeout(&item.url, PAGE_TIMEOUT).await {
                    item.description =
                        truncate_chars(&extract_description(&html), MAX_DESCRIPTION_CHARS);
                }
            }
            debug!(id, score = item.score, "Qualifying HN story");
            Some(item)
        })
        .take(opts.limit)
        .collect()
        .await;

    info!(count = items.len(), "Fetched Hacker News stories");
    items.into_iter().map(SourceItem::HackerNews).collect()
}
