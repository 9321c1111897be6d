//! Archive page discovery and navigation markup.
//!
//! # Archive Files
//!
//! Every rendered day lives at `archive/YYYY-MM-DD.html`. Pages whose stem is
//! not a date (scratch files, `index.html` copies) are ignored everywhere.
//!
//! Two navigation styles are produced from the same date list:
//! - **Links** (`{{ARCHIVE_LINKS}}`): a plain list of the newest 14 days
//! - **Nav** (`{{ARCHIVE_NAV}}`): every day as a pill, current day highlighted

use itertools::Itertools;
use std::error::Error;
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;
use tracing::{debug, instrument};

use crate::outputs::html::html_escape;
use crate::utils::is_archive_date;

/// How many days the plain archive list shows.
pub const ARCHIVE_LINK_LIMIT: usize = 14;

/// List archive dates in `dir`, newest first.
///
/// A missing directory is treated as an empty archive.
#[instrument(level = "debug", skip_all, fields(dir = %dir.display()))]
pub async fn list_archive_dates(dir: &Path) -> Result<Vec<String>, Box<dyn Error>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Box::new(e)),
    };

    let mut dates = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("html") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            if is_archive_date(stem) {
                dates.push(stem.to_string());
            }
        }
    }

    dates.sort_unstable_by(|a, b| b.cmp(a));
    debug!(count = dates.len(), "Scanned archive");
    Ok(dates)
}

/// Merge `current` into a newest-first date list.
pub fn with_current(dates: &[String], current: &str) -> Vec<String> {
    dates
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(current))
        .filter(|d| is_archive_date(d))
        .unique()
        .sorted_unstable_by(|a, b| b.cmp(a))
        .map(str::to_string)
        .collect()
}

/// Plain newest-first link list, at most [`ARCHIVE_LINK_LIMIT`] entries.
pub fn archive_links(dates: &[String]) -> String {
    dates
        .iter()
        .take(ARCHIVE_LINK_LIMIT)
        .map(|d| {
            let d = html_escape(d);
            format!(r#"<a href="./archive/{d}.html">{d}</a>"#)
        })
        .join("\n")
}

/// Pill navigation over every archive day, with `current` highlighted.
///
/// Returns an empty string for an empty archive.
pub fn archive_nav(dates: &[String], current: &str) -> String {
    if dates.is_empty() {
        return String::new();
    }

    let mut parts = vec![
        r#"<div style="margin-top: 24px;">"#.to_string(),
        r#"<div style="display: flex; flex-wrap: wrap; gap: 8px; justify-content: center;">"#
            .to_string(),
    ];
    for date in dates.iter().filter(|d| is_archive_date(d)) {
        if date == current {
            parts.push(format!(
                r#"<span style="padding: 4px 10px; background: var(--foreground); color: var(--background); border-radius: 6px; font-size: 12px; font-weight: 500;">{date}</span>"#
            ));
        } else {
            parts.push(format!(
                r#"<a href="./archive/{date}.html" style="padding: 4px 10px; background: var(--card); border: 1px solid var(--border); border-radius: 6px; font-size: 12px; color: var(--foreground); text-decoration: none;">{date}</a>"#
            ));
        }
    }
    parts.push("</div>".to_string());
    parts.push("</div>".to_string());
    parts.join("\n")
}
