//! Utility functions for string truncation, date formatting, and file system checks.
//!
//! This module provides helper functions used throughout the application:
//! - Character-safe truncation for descriptions and log previews
//! - Date helpers for archive file names and the Chinese date heading
//! - File system validation for output directories

use chrono::{DateTime, Local, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

static ARCHIVE_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid archive date regex"));

/// Keep at most `max` characters of `s`.
///
/// Counts characters, not bytes, so multi-byte text (CJK titles, emoji) is
/// never split in the middle of a code point.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_chars("héllo", 2), "hé");
/// ```
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` characters with an ellipsis and
/// byte count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log("a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    let kept = truncate_chars(s, max);
    if kept.len() == s.len() {
        kept
    } else {
        let rest = s.len() - kept.len();
        format!("{kept}…(+{rest} bytes)")
    }
}

/// True when a file stem looks like an archive date (`YYYY-MM-DD`).
pub fn is_archive_date(stem: &str) -> bool {
    ARCHIVE_DATE.is_match(stem)
}

/// Convert `2026-02-06` to `2026年2月6日`.
///
/// Returns `None` when the input is not a valid `YYYY-MM-DD` date.
pub fn date_to_chinese(date: &str) -> Option<String> {
    use chrono::Datelike;

    let dt = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").ok()?;
    Some(format!("{}年{}月{}日", dt.year(), dt.month(), dt.day()))
}

/// Local wall-clock timestamp with microseconds, e.g. `2026-02-14T08:00:01.123456`.
pub fn local_iso_now() -> String {
    Local::now()
        .naive_local()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}

/// Render a Unix timestamp as a local naive ISO-8601 string without fractions.
///
/// Out-of-range timestamps fall back to the epoch.
pub fn unix_to_local_iso(ts: i64) -> String {
    let utc = DateTime::<Utc>::from_timestamp(ts, 0).unwrap_or_default();
    utc.with_timezone(&Local)
        .naive_local()
        .format("%Y-%m-%dT%H:%M:%S")
        .to_string()
}

/// Ensure a directory exists and is writable.
///
/// This function creates the directory if it doesn't exist, then performs
/// a write test by creating and immediately deleting a probe file.
///
/// # Errors
///
/// Returns an error if:
/// - The directory cannot be created
/// - The directory is not writable (permission denied, read-only filesystem, etc.)
#[instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    // Try a small sync write using std fs (simpler error surface)
    let probe_path = path.join("..__probe_write__");
    stdfs::File::create(&probe_path)?;
    let _ = stdfs::remove_file(&probe_path);
    info!("Output directory is writable");
    Ok(())
}
