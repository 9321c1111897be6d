//! Data models for source configuration, fetched items, and the daily digest.
//!
//! This module defines the core data structures used throughout the application:
//! - [`SourcesConfig`] / [`SourceEntry`]: the `sources.json` fetch configuration
//! - Per-type options: [`HackerNewsOptions`], [`RedditOptions`],
//!   [`GithubTrendingOptions`], [`RssOptions`]
//! - Fetched output: [`FetchedSources`], [`SourceResult`], [`SourceItem`]
//! - The curated digest consumed by the renderer: [`DailyReport`] and friends
//! - TechMeme stories: [`TechmemeFile`], [`TechmemeStory`]
//!
//! Field names follow the JSON files on disk (`snake_case` for fetcher output,
//! the digest's own mix of `snake_case` and `camelCase`).

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Top-level shape of `sources.json`.
#[derive(Debug, Default, Deserialize)]
pub struct SourcesConfig {
    #[serde(default)]
    pub sources: Vec<SourceEntry>,
}

/// One configured source.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceEntry {
    /// Key under which results are stored in the output.
    #[serde(default)]
    pub id: String,
    /// Source type: `hackernews`, `reddit`, `github_trending`, or `rss`.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Disabled sources are skipped.
    #[serde(default)]
    pub enabled: bool,
    /// Type-specific options; decoded lazily by [`SourceEntry::options`].
    #[serde(default)]
    pub config: Value,
}

impl SourceEntry {
    /// Decode `config` into a type's option struct, treating a missing or
    /// `null` config as an empty object so every default applies.
    pub fn options<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        match &self.config {
            Value::Null => serde_json::from_value(Value::Object(Default::default())),
            other => serde_json::from_value(other.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HackerNewsOptions {
    pub min_score: i64,
    pub limit: usize,
    pub fetch_description: bool,
}

impl Default for HackerNewsOptions {
    fn default() -> Self {
        Self {
            min_score: 100,
            limit: 10,
            fetch_description: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RedditOptions {
    pub subreddit: String,
    pub sort: String,
    pub limit: usize,
    pub min_score: i64,
}

impl Default for RedditOptions {
    fn default() -> Self {
        Self {
            subreddit: "all".to_string(),
            sort: "hot".to_string(),
            limit: 10,
            min_score: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GithubTrendingOptions {
    /// Empty means all languages.
    pub language: String,
    pub since: String,
    pub limit: usize,
    pub fetch_description: bool,
}

impl Default for GithubTrendingOptions {
    fn default() -> Self {
        Self {
            language: String::new(),
            since: "daily".to_string(),
            limit: 5,
            fetch_description: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RssOptions {
    pub url: Option<String>,
    pub limit: usize,
}

impl Default for RssOptions {
    fn default() -> Self {
        Self { url: None, limit: 10 }
    }
}

/// A qualifying Hacker News story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HackerNewsItem {
    pub title: String,
    pub url: String,
    pub score: i64,
    pub by: String,
    /// Local naive ISO-8601 submission time.
    pub time: String,
    /// Link to the HN discussion page.
    pub comments: String,
    pub description: String,
}

/// A Reddit post above the score threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedditPost {
    pub title: String,
    pub url: String,
    pub score: i64,
    pub author: String,
    pub subreddit: String,
    pub num_comments: i64,
    pub permalink: String,
}

/// A repository scraped from GitHub Trending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingRepo {
    /// `owner/name`.
    pub repo: String,
    pub name: String,
    pub url: String,
    pub description: String,
    /// Kept as a string, matching the scraped digits.
    pub stars_today: String,
    pub language: String,
}

/// One RSS `<item>` or Atom `<entry>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    pub title: String,
    pub url: String,
    pub description: String,
    pub published: String,
}

/// Any fetched item; serialized without a tag so each keeps its own shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SourceItem {
    HackerNews(HackerNewsItem),
    Reddit(RedditPost),
    GithubTrending(TrendingRepo),
    Feed(FeedItem),
}

/// Results for one source id.
#[derive(Debug, Clone, Serialize)]
pub struct SourceResult {
    #[serde(rename = "type")]
    pub kind: String,
    pub count: usize,
    pub items: Vec<SourceItem>,
}

/// Contents of `data/fetched_sources.json`.
///
/// `sources` serializes as a JSON object whose keys keep configuration order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FetchedSources {
    pub fetched_at: String,
    #[serde(serialize_with = "ordered_map")]
    pub sources: Vec<(String, SourceResult)>,
}

fn ordered_map<S: Serializer>(entries: &[(String, SourceResult)], s: S) -> Result<S::Ok, S::Error> {
    s.collect_map(entries.iter().map(|(id, result)| (id, result)))
}

impl FetchedSources {
    /// Store `result` under `id`. A repeated id replaces the earlier result
    /// but keeps its position.
    pub fn insert(&mut self, id: String, result: SourceResult) {
        match self.sources.iter_mut().find(|(k, _)| *k == id) {
            Some((_, slot)) => *slot = result,
            None => self.sources.push((id, result)),
        }
    }

    pub fn get(&self, id: &str) -> Option<&SourceResult> {
        self.sources.iter().find(|(k, _)| k == id).map(|(_, r)| r)
    }

    pub fn total_items(&self) -> usize {
        self.sources.iter().map(|(_, s)| s.count).sum()
    }
}

/// The curated digest (`data/daily.json`), as the renderer reads it.
///
/// Every field is optional: the renderer must produce a stable page from
/// partial input, with strict checks left to the validator.
#[derive(Debug, Default, Deserialize)]
pub struct DailyReport {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub headlines: Option<Vec<DigestItem>>,
    #[serde(default)]
    pub sections: Option<Sections>,
    #[serde(default)]
    pub x_highlights: Option<Vec<XHighlight>>,
}

/// The six fixed report sections.
#[derive(Debug, Default, Deserialize)]
pub struct Sections {
    #[serde(default)]
    pub releases: Option<Vec<DigestItem>>,
    #[serde(default)]
    pub updates: Option<Vec<DigestItem>>,
    #[serde(default)]
    pub opensource: Option<Vec<DigestItem>>,
    #[serde(default)]
    pub benchmarks: Option<Vec<DigestItem>>,
    #[serde(default)]
    pub business: Option<Vec<DigestItem>>,
    #[serde(default)]
    pub risks: Option<Vec<DigestItem>>,
}

/// A single news entry in a headline list or section.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct DigestItem {
    pub title: String,
    pub time: String,
    pub what: String,
    pub why: String,
    pub sources: Option<Vec<SourceLink>>,
}

/// A named link backing a digest item.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct SourceLink {
    /// Rendered as `source` when absent.
    pub name: Option<String>,
    pub url: String,
}

/// Accept any JSON scalar where text is expected; `null` becomes empty.
fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// A high-engagement post on X.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct XHighlight {
    #[serde(deserialize_with = "lenient_string")]
    pub author: String,
    #[serde(deserialize_with = "lenient_string")]
    pub handle: String,
    #[serde(deserialize_with = "lenient_string")]
    pub text: String,
    #[serde(deserialize_with = "lenient_string")]
    pub url: String,
    /// Engagement counters are only shown when they are integers.
    pub likes: Option<Value>,
    pub reposts: Option<Value>,
    pub replies: Option<Value>,
}

/// Contents of `data/techneme.json`.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct TechmemeFile {
    #[serde(default)]
    pub stories: Vec<TechmemeStory>,
}

/// A TechMeme headline.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TechmemeStory {
    pub title: String,
    pub url: String,
    pub summary: String,
    pub timestamp: String,
}
