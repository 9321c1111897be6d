//! Command-line interface definitions for the AI daily report pipeline.
//!
//! Global options select the site root and network behavior; each pipeline
//! step is a subcommand. Global options can also come from environment
//! variables.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::scrapers::techmeme::DEFAULT_FEED_URL;

/// Command-line arguments for the AI daily report pipeline.
///
/// # Examples
///
/// ```sh
/// # Collect raw candidates into data/fetched_sources.json
/// ai_daily_report fetch
///
/// # Check the curated digest, then render it
/// ai_daily_report validate && ai_daily_report render
///
/// # Rewrite old archive pages without touching disk
/// ai_daily_report --root ./site migrate --dry-run
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Site root containing sources.json, template.html, data/ and archive/
    #[arg(long, global = true, env = "AI_DAILY_ROOT", default_value = ".")]
    pub root: PathBuf,

    /// Timeout for API and feed requests, in seconds
    #[arg(long, global = true, env = "AI_DAILY_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Extra attempts for a failed HTTP request
    #[arg(long, global = true, env = "AI_DAILY_MAX_RETRIES", default_value_t = 2)]
    pub max_retries: usize,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Fetch every enabled source into fetched_sources.json
    Fetch {
        /// Source configuration (default: <root>/sources.json)
        #[arg(long)]
        sources: Option<PathBuf>,

        /// Output file (default: <root>/data/fetched_sources.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate the curated digest
    Validate {
        /// Digest file (default: <root>/data/daily.json)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Render the digest into archive/<date>.html and index.html
    Render,

    /// Rewrite older archive pages to the current template
    Migrate {
        /// Report what would change without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Fetch TechMeme headlines into data/techneme.json
    Techmeme {
        /// RSS feed to read
        #[arg(long, default_value = DEFAULT_FEED_URL)]
        feed_url: String,

        /// Number of stories to keep
        #[arg(long, default_value_t = 5)]
        limit: usize,

        /// Output file (default: <root>/data/techneme.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}
