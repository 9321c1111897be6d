//! GitHub Trending repositories.
//!
//! GitHub has no trending API, so the HTML page is scraped. Each repository is
//! an `<article class="Box-row">`; fields are pulled out of each chunk with
//! regexes rather than a DOM, since the markup around them shifts often but
//! the individual fragments below have stayed stable.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, instrument};
use url::Url;
use urlencoding::encode;

use crate::http::{FetchText, Fetcher, PAGE_TIMEOUT};
use crate::models::{GithubTrendingOptions, SourceItem, TrendingRepo};
use crate::scrapers::description::{MAX_DESCRIPTION_CHARS, extract_description};
use crate::utils::truncate_chars;

const ARTICLE_MARKER: &str = r#"<article class="Box-row""#;

static GITHUB: Lazy<Url> = Lazy::new(|| Url::parse("https://github.com/").unwrap());

static REPO_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<h2[^>]*>.*?<a[^>]*href="/([^"]+)"[^>]*>"#).unwrap());
static DESCRIPTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<p[^>]*class="[^"]*col-9[^"]*"[^>]*>(.*?)</p>"#).unwrap());
static STARS_TODAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9,]+)\s*stars?\s+today").unwrap());
static LANGUAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<span[^>]*itemprop="programmingLanguage"[^>]*>([^<]+)</span>"#).unwrap()
});

fn trending_url(opts: &GithubTrendingOptions) -> String {
    format!(
        "https://github.com/trending/{}?since={}",
        encode(&opts.language),
        encode(&opts.since)
    )
}

/// Decode the three entities GitHub emits in descriptions.
fn decode_basic_entities(s: &str) -> String {
    s.replace("&amp;", "&").replace("&lt;", "<").replace("&gt;", ">")
}

/// Parse one `Box-row` chunk. Returns `None` for chunks without a repo link
/// and for navigation links (login, sponsors).
fn parse_article(chunk: &str) -> Option<TrendingRepo> {
    let repo = REPO_LINK.captures(chunk)?.get(1)?.as_str().trim().to_string();
    if repo.starts_with("login") || repo.starts_with("sponsors") {
        return None;
    }

    let description = DESCRIPTION
        .captures(chunk)
        .and_then(|c| c.get(1))
        .map(|m| decode_basic_entities(&m.as_str().trim().replace('\n', " ")))
        .unwrap_or_default();

    let stars_today = STARS_TODAY
        .captures(chunk)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().replace(',', ""))
        .unwrap_or_else(|| "0".to_string());

    let language = LANGUAGE
        .captures(chunk)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default();

    let name = repo.rsplit('/').next().unwrap_or_default().to_string();
    let url = GITHUB
        .join(&repo)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| format!("https://github.com/{repo}"));

    Some(TrendingRepo {
        repo,
        name,
        url,
        description,
        stars_today,
        language,
    })
}

/// Parse a trending page into at most `limit` repositories.
pub fn parse_trending_page(html: &str, limit: usize) -> Vec<TrendingRepo> {
    html.split(ARTICLE_MARKER)
        .skip(1)
        .filter_map(parse_article)
        .take(limit)
        .collect()
}

/// Fetch trending repositories, back-filling empty descriptions from the
/// repository page when `fetch_description` is set.
#[instrument(level = "info", skip_all, fields(language = %opts.language, since = %opts.since))]
pub async fn fetch<F: FetchText>(
    fetcher: &Fetcher<F>,
    opts: &GithubTrendingOptions,
) -> Vec<SourceItem> {
    let Some(html) = fetcher.text(&trending_url(opts)).await else {
        return Vec::new();
    };

    let mut repos = parse_trending_page(&html, opts.limit);
    if opts.fetch_description {
        for repo in repos.iter_mut().filter(|r| r.description.is_empty()) {
            if let Some(page) = fetcher.text_with_timeout(&repo.url, PAGE_TIMEOUT).await {
                repo.description = truncate_chars(&extract_description(&page), MAX_DESCRIPTION_CHARS);
                debug!(repo = %repo.repo, "Back-filled description from repo page");
            }
        }
    }

    info!(count = repos.len(), "Fetched GitHub trending repositories");
    repos.into_iter().map(SourceItem::GithubTrending).collect()
}
