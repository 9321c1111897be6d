//! News source fetchers.
//!
//! Each configured source entry in `sources.json` is dispatched to one
//! fetcher by its `type`:
//!
//! | Type | Module | Method |
//! |------|--------|--------|
//! | `hackernews` | [`hackernews`] | Firebase JSON API, top 30 stories |
//! | `reddit` | [`reddit`] | Subreddit `.json` listing |
//! | `github_trending` | [`github_trending`] | HTML scrape with regexes |
//! | `rss` | [`rss`] | RSS 2.0 / Atom XML |
//!
//! [`techmeme`] is not a configured source; it backs the separate
//! `techmeme` command.
//!
//! Fetchers never fail: network and parse errors are logged and the source
//! contributes an empty item list.

pub mod description;
pub mod github_trending;
pub mod hackernews;
pub mod reddit;
pub mod rss;
pub mod techmeme;

use tracing::{error, info, instrument, warn};

use crate::http::{FetchText, Fetcher};
use crate::models::{
    FetchedSources, GithubTrendingOptions, HackerNewsOptions, RedditOptions, RssOptions,
    SourceEntry, SourceItem, SourceResult, SourcesConfig,
};
use crate::utils::local_iso_now;

/// Supported source types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    HackerNews,
    Reddit,
    GithubTrending,
    Rss,
}

impl SourceKind {
    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "hackernews" => Some(Self::HackerNews),
            "reddit" => Some(Self::Reddit),
            "github_trending" => Some(Self::GithubTrending),
            "rss" => Some(Self::Rss),
            _ => None,
        }
    }
}

/// Fetch one source. `None` means the entry was unusable and is left out of
/// the output entirely (unknown type or undecodable config).
#[instrument(level = "info", skip_all, fields(id = %entry.id, kind = %entry.kind))]
pub async fn fetch_source<F: FetchText>(
    fetcher: &Fetcher<F>,
    entry: &SourceEntry,
) -> Option<Vec<SourceItem>> {
    let Some(kind) = SourceKind::parse(&entry.kind) else {
        warn!("Unknown source type");
        return None;
    };

    macro_rules! options {
        ($ty:ty) => {
            match entry.options::<$ty>() {
                Ok(opts) => opts,
                Err(e) => {
                    error!(error = %e, "Invalid source config; skipping");
                    return None;
                }
            }
        };
    }

    let items = match kind {
        SourceKind::HackerNews => hackernews::fetch(fetcher, &options!(HackerNewsOptions)).await,
        SourceKind::Reddit => reddit::fetch(fetcher, &options!(RedditOptions)).await,
        SourceKind::GithubTrending => {
            github_trending::fetch(fetcher, &options!(GithubTrendingOptions)).await
        }
        SourceKind::Rss => rss::fetch_items(fetcher, &options!(RssOptions)).await,
    };
    Some(items)
}

/// Fetch every enabled source, in configuration order.
#[instrument(level = "info", skip_all, fields(configured = config.sources.len()))]
pub async fn fetch_all<F: FetchText>(fetcher: &Fetcher<F>, config: &SourcesConfig) -> FetchedSources {
    let mut fetched = FetchedSources {
        fetched_at: local_iso_now(),
        sources: Vec::new(),
    };

    for entry in &config.sources {
        if !entry.enabled {
            info!(id = %entry.id, "Skipping disabled source");
            continue;
        }

        info!(id = %entry.id, kind = %entry.kind, "Fetching source");
        if let Some(items) = fetch_source(fetcher, entry).await {
            info!(id = %entry.id, count = items.len(), "Got items");
            fetched.insert(
                entry.id.clone(),
                SourceResult {
                    kind: entry.kind.clone(),
                    count: items.len(),
                    items,
                },
            );
        }
    }

    fetched
}
