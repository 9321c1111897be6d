//! Reddit subreddit listings via the public `.json` endpoints.

use serde::Deserialize;
use tracing::{info, instrument};
use urlencoding::encode;

use crate::http::{FetchText, Fetcher};
use crate::models::{RedditOptions, RedditPost, SourceItem};

#[derive(Debug, Deserialize)]
struct Listing {
    data: Option<ListingData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListingData {
    children: Vec<Child>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Child {
    data: RawPost,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPost {
    title: String,
    url: String,
    score: i64,
    author: String,
    subreddit: String,
    num_comments: i64,
    permalink: String,
}

/// Listing URL; asks for twice the limit so the score filter has headroom.
fn listing_url(opts: &RedditOptions) -> String {
    format!(
        "https://www.reddit.com/r/{}/{}.json?limit={}",
        encode(&opts.subreddit),
        encode(&opts.sort),
        opts.limit * 2
    )
}

fn select_posts(listing: Listing, opts: &RedditOptions) -> Vec<RedditPost> {
    let Some(data) = listing.data else {
        return Vec::new();
    };

    data.children
        .into_iter()
        .map(|c| c.data)
        .filter(|p| p.score >= opts.min_score)
        .take(opts.limit)
        .map(|p| RedditPost {
            title: p.title,
            url: p.url,
            score: p.score,
            author: p.author,
            subreddit: p.subreddit,
            num_comments: p.num_comments,
            permalink: format!("https://reddit.com{}", p.permalink),
        })
        .collect()
}

/// Fetch posts from one subreddit.
#[instrument(level = "info", skip_all, fields(subreddit = %opts.subreddit, sort = %opts.sort))]
pub async fn fetch<F: FetchText>(fetcher: &Fetcher<F>, opts: &RedditOptions) -> Vec<SourceItem> {
    let Some(listing) = fetcher.json::<Listing>(&listing_url(opts)).await else {
        return Vec::new();
    };
    let posts = select_posts(listing, opts);
    info!(count = posts.len(), "Fetched Reddit posts");
    posts.into_iter().map(SourceItem::Reddit).collect()
}
