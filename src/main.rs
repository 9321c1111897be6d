//! # AI Daily Report
//!
//! The content pipeline behind a static AI news site: collect candidate
//! stories from public sources, check the curated digest, and render it into
//! an HTML page with a browsable archive.
//!
//! ## Features
//!
//! - Fetches Hacker News, Reddit, GitHub Trending and RSS/Atom feeds as
//!   configured in `sources.json` (or `sources.yaml`)
//! - Validates `data/daily.json` before it is published
//! - Renders `archive/YYYY-MM-DD.html` and `index.html` from `template.html`
//! - Migrates older archive pages to the current markup
//! - Pulls TechMeme headlines into `data/techneme.json`
//!
//! ## Usage
//!
//! ```sh
//! ai_daily_report fetch
//! ai_daily_report validate
//! ai_daily_report render
//! ai_daily_report migrate --dry-run
//! ai_daily_report techmeme
//! ```
//!
//! ## Architecture
//!
//! The steps run as separate invocations, with the digest curated in between:
//! 1. **Fetching**: every enabled source is read into raw candidates
//! 2. **Curation**: a human or model writes `data/daily.json` (outside this tool)
//! 3. **Validation**: the digest's structure is checked; failures exit with 2
//! 4. **Rendering**: the digest and TechMeme headlines become the day's page

use chrono::Utc;
use clap::Parser;
use std::error::Error;
use std::process::ExitCode;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod http;
mod migrate;
mod models;
mod outputs;
mod scrapers;
mod utils;
mod validate;

use cli::{Cli, Command};
use config::{Layout, load_sources};
use http::{Fetcher, HttpClient, RetryFetch};
use models::TechmemeFile;
use outputs::{html, json};
use validate::{ValidationError, validate_file};

/// First retry delay; later attempts back off exponentially.
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

#[tokio::main]
#[instrument]
async fn main() -> Result<ExitCode, Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = Instant::now();

    let args = Cli::parse();
    debug!(root = %args.root.display(), command = ?args.command, "Parsed CLI arguments");
    let layout = Layout::new(&args.root);
    let (max_retries, timeout_secs) = (args.max_retries, args.timeout_secs);

    let code = match args.command {
        Command::Fetch { sources, output } => {
            let fetcher = build_fetcher(max_retries, timeout_secs)?;
            let sources_path = sources.unwrap_or_else(|| layout.sources_path());
            let config = load_sources(&sources_path).await?;

            let fetched = scrapers::fetch_all(&fetcher, &config).await;
            let output = output.unwrap_or_else(|| layout.fetched_sources_path());
            json::write_pretty(&output, &fetched).await?;
            info!(
                sources = fetched.sources.len(),
                total = fetched.total_items(),
                path = %output.display(),
                "Fetch complete"
            );
            ExitCode::SUCCESS
        }

        Command::Validate { input } => {
            let input = input.unwrap_or_else(|| layout.daily_path());
            match validate_file(&input).await {
                Ok(report) => {
                    for w in &report.warnings {
                        warn!(warning = %w, "Digest warning");
                    }
                    info!(path = %input.display(), "ok");
                    for w in &report.self_check_warnings {
                        warn!(warning = %w, "Self-check warning");
                    }
                    ExitCode::SUCCESS
                }
                Err(e) => match e.downcast_ref::<ValidationError>() {
                    Some(v) => {
                        error!(path = %input.display(), error = %v, "Digest failed validation");
                        ExitCode::from(2)
                    }
                    None => return Err(e),
                },
            }
        }

        Command::Render => {
            let path = html::render_report(&layout, Utc::now()).await?;
            info!(path = %path.display(), "Render complete");
            ExitCode::SUCCESS
        }

        Command::Migrate { dry_run } => {
            let summary = migrate::run(&layout, dry_run).await?;
            debug!(?summary, "Migration summary");
            ExitCode::SUCCESS
        }

        Command::Techmeme {
            feed_url,
            limit,
            output,
        } => {
            let fetcher = build_fetcher(max_retries, timeout_secs)?;
            let stories = scrapers::techmeme::fetch_stories(&fetcher, &feed_url, limit).await;
            if stories.is_empty() {
                warn!("No TechMeme stories fetched; leaving existing file untouched");
            } else {
                let output = output.unwrap_or_else(|| layout.techmeme_path());
                json::write_pretty(&output, &TechmemeFile { stories }).await?;
            }
            ExitCode::SUCCESS
        }
    };

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(code)
}

fn build_fetcher(
    max_retries: usize,
    timeout_secs: u64,
) -> Result<Fetcher<RetryFetch<HttpClient>>, Box<dyn Error>> {
    let http = RetryFetch::new(HttpClient::new()?, max_retries, RETRY_BASE_DELAY);
    Ok(Fetcher::new(http, Duration::from_secs(timeout_secs)))
}
