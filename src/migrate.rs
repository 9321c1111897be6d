//! Migration of older archive pages to the current template.
//!
//! Older pages carry their own header, footer and class vocabulary. Migration
//! keeps only the news content of each page, rewrites its class names to the
//! card vocabulary the current stylesheet knows, and wraps it in
//! `template.html` again.
//!
//! The newest archive page is left alone; it is re-rendered from the digest
//! once migration finishes.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{error, info, instrument, warn};

use crate::config::Layout;
use crate::outputs::archive::list_archive_dates;
use crate::outputs::html::{Page, fill_template, render_report};

static CONTAINER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<div\s+class="container">\s*(.+?)\s*</div>\s*</body>"#).unwrap());
static HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<header>.*?</header>").unwrap());
static PAGE_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<div\s+class="page-title">.*?</div>"#).unwrap());
static FOOTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<footer>.*?</footer>").unwrap());
static BLANK_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

static NEWS_TITLE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"<div\s+class="news-title">"#).unwrap());
static NEWS_DESC: Lazy<Regex> = Lazy::new(|| Regex::new(r#"<div\s+class="news-desc">"#).unwrap());
static NEWS_TIME: Lazy<Regex> = Lazy::new(|| Regex::new(r#"<div\s+class="news-time">"#).unwrap());
static CHECK_SECTION: Lazy<Regex> = Lazy::new(|| Regex::new(r#"class="check-section"[^>]*>"#).unwrap());
static ARCHIVE_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<(?:section|div)\s+class="archive"[^>]*>.*?</(?:section|div)>"#).unwrap()
});
static FONT_STYLE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"style="[^"]*font-family[^"]*""#).unwrap());

const CLASS_RENAMES: [(&str, &str); 13] = [
    (r#"class="news-item""#, r#"class="card""#),
    (r#"class="news-source""#, r#"class="card-sources""#),
    (r#"class="news-sources""#, r#"class="card-sources""#),
    (r#"class="news-tag""#, r#"class="tag""#),
    (r#"class="tag highlight""#, r#"class="tag tag-hot""#),
    (r#"class="check-title""#, r#"class="highlight-title""#),
    (r#"class="check-list""#, r#"class="highlight-list""#),
    (r#"class="x-card""#, r#"class="card""#),
    (r#"class="x-header""#, r#"class="card-meta""#),
    (r#"class="x-name""#, r#"class="x-author""#),
    (r#"class="x-stats""#, r#"class="x-engagement""#),
    (r#"class="dedupe-list""#, r#"class="highlight-box""#),
    ("<section>", r#"<section class="section">"#),
];

/// Counts reported by [`run`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MigrationSummary {
    pub migrated: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Body content of an old page, without its header, title block and footer.
///
/// Returns an empty string when the page has no `container` div.
pub fn extract_body_content(html: &str) -> String {
    let Some(inner) = CONTAINER.captures(html).and_then(|c| c.get(1)) else {
        return String::new();
    };

    let content = HEADER.replace_all(inner.as_str(), "");
    let content = PAGE_TITLE.replace_all(&content, "");
    let content = FOOTER.replace_all(&content, "");
    BLANK_RUNS.replace_all(content.trim(), "\n\n").into_owned()
}

/// Rewrite old class names to the card vocabulary and drop blocks the
/// current template provides itself.
pub fn normalize_content(content: &str) -> String {
    let content = NEWS_TITLE.replace_all(content, r#"<div class="card-title">"#);
    let content = NEWS_DESC.replace_all(&content, r#"<div class="card-content">"#);
    let content = NEWS_TIME.replace_all(&content, r#"<div class="card-meta">"#);
    let content = CHECK_SECTION.replace_all(&content, r#"class="highlight-box">"#);

    let content = CLASS_RENAMES
        .iter()
        .fold(content.into_owned(), |out, (from, to)| out.replace(from, to));

    let content = ARCHIVE_BLOCK.replace_all(&content, "");
    FONT_STYLE.replace_all(&content, "").into_owned()
}

/// Wrap migrated content in the current template.
pub fn build_new_page(
    template: &str,
    date: &str,
    content: &str,
    archive_dates: &[String],
    now: DateTime<Utc>,
) -> String {
    fill_template(
        template,
        &Page {
            date,
            content,
            archive_dates,
            generated_at: now,
        },
    )
}

/// Migrate one archive page in place.
///
/// Returns `Ok(false)` when the page has no extractable content. Under
/// `dry_run` nothing is written.
#[instrument(level = "info", skip(path, template, archive_dates), fields(path = %path.display()))]
pub async fn migrate_file(
    path: &Path,
    date: &str,
    template: &str,
    archive_dates: &[String],
    dry_run: bool,
) -> Result<bool, Box<dyn Error>> {
    let html = fs::read_to_string(path).await?;

    let content = extract_body_content(&html);
    if content.trim().is_empty() {
        warn!("No content extracted, skipping");
        return Ok(false);
    }

    let content = normalize_content(&content);
    let page = build_new_page(template, date, &content, archive_dates, Utc::now());

    if dry_run {
        info!(bytes = page.len(), "Would write migrated page");
        return Ok(true);
    }

    fs::write(path, &page).await?;
    info!(bytes = page.len(), "Wrote migrated page");
    Ok(true)
}

/// Migrate every archive page except the newest, then re-render the current
/// day unless `dry_run` is set.
///
/// # Errors
///
/// Fails when the archive cannot be listed or `template.html` cannot be read.
/// Per-page failures are counted, not returned.
#[instrument(level = "info", skip_all, fields(dry_run = dry_run))]
pub async fn run(layout: &Layout, dry_run: bool) -> Result<MigrationSummary, Box<dyn Error>> {
    let mut summary = MigrationSummary::default();

    let dates = list_archive_dates(&layout.archive_dir()).await?;
    let Some(latest) = dates.first().cloned() else {
        info!("No archive files found");
        return Ok(summary);
    };
    info!(count = dates.len(), %latest, "Found archive files; newest is kept as-is");

    let template = fs::read_to_string(layout.template_path()).await?;

    // Oldest first, matching the order the pages were written in.
    for date in dates.iter().rev() {
        if *date == latest {
            summary.skipped += 1;
            continue;
        }
        match migrate_file(&layout.archive_page(date), date, &template, &dates, dry_run).await {
            Ok(true) => summary.migrated += 1,
            Ok(false) => summary.failed += 1,
            Err(e) => {
                error!(%date, error = %e, "Failed to migrate archive page");
                summary.failed += 1;
            }
        }
    }

    info!(
        migrated = summary.migrated,
        skipped = summary.skipped,
        failed = summary.failed,
        dry_run,
        "Migration finished"
    );

    if !dry_run {
        match render_report(layout, Utc::now()).await {
            Ok(path) => info!(path = %path.display(), "Re-rendered current report"),
            Err(e) => error!(error = %e, "Re-render after migration failed"),
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    const OLD_PAGE: &str = r#"<html><head><style>body { font-family: serif; }</style></head>
<body>
<div class="container">
  <header><h1>AI 日报</h1></header>
  <div class="page-title">2026-02-06</div>



  <section>
    <h2 class="section-title">发布</h2>
    <div class="news-item">
      <div class="news-title">Model X</div>
      <div class="news-time">09:00</div>
      <div class="news-desc">Launched.</div>
      <p style="font-family: Georgia">Note</p>
      <div class="news-source">Blog</div>
      <span class="tag highlight">hot</span>
    </div>
  </section>
  <section class="archive"><a href="./2026-02-05.html">old</a></section>
  <footer>generated</footer>
</div>
</body></html>"#;

    #[test]
    fn test_extract_body_content() {
        let content = extract_body_content(OLD_PAGE);
        assert!(content.starts_with("<section>"));
        assert!(!content.contains("<header>"));
        assert!(!content.contains("page-title"));
        assert!(!content.contains("<footer>"));
        assert!(!content.contains("\n\n\n"));
        assert!(content.contains("Model X"));
    }

    #[test]
    fn test_extract_body_content_without_container() {
        assert_eq!(extract_body_content("<html><body><p>hi</p></body></html>"), "");
    }

    #[test]
    fn test_normalize_content_classes() {
        let out = normalize_content(&extract_body_content(OLD_PAGE));
        assert!(out.starts_with(r#"<section class="section">"#));
        assert!(out.contains(r#"<div class="card">"#));
        assert!(out.contains(r#"<div class="card-title">Model X</div>"#));
        assert!(out.contains(r#"<div class="card-meta">09:00</div>"#));
        assert!(out.contains(r#"<div class="card-content">Launched.</div>"#));
        assert!(out.contains("<p >Note</p>"));
        assert!(out.contains(r#"<div class="card-sources">Blog</div>"#));
        assert!(out.contains(r#"class="tag tag-hot""#));
        assert!(!out.contains("class=\"archive\""));
        assert!(!out.contains("font-family"));
    }

    #[test]
    fn test_normalize_check_and_x_blocks() {
        let html = r#"<div class="check-section" id="c"><div class="check-title">T</div><ul class="check-list"></ul></div>
<div class="x-card"><div class="x-header"><span class="x-name">A</span></div><div class="x-stats">1</div></div>
<ul class="dedupe-list"></ul><section class="section">kept</section>"#;
        let out = normalize_content(html);
        assert!(out.starts_with(r#"<div class="highlight-box"><div class="highlight-title">T</div><ul class="highlight-list">"#));
        assert!(out.contains(r#"<div class="card"><div class="card-meta"><span class="x-author">A</span></div><div class="x-engagement">1</div>"#));
        assert!(out.contains(r#"<ul class="highlight-box">"#));
        assert!(out.contains(r#"<section class="section">kept</section>"#));
    }

    #[test]
    fn test_build_new_page() {
        let tpl = "<h1>{{DATE_HUMAN}}</h1>{{CONTENT}}<nav>{{ARCHIVE_NAV}}</nav>";
        let dates = vec!["2026-02-07".to_string(), "2026-02-06".to_string()];
        let page = build_new_page(tpl, "2026-02-06", "<p>c</p>", &dates, Utc::now());
        assert!(page.starts_with("<h1>2026年2月6日</h1><p>c</p><nav>"));
        assert!(page.contains(r#"font-weight: 500;">2026-02-06</span>"#));
        assert!(page.contains(r#"<a href="./archive/2026-02-07.html""#));
    }

    #[tokio::test]
    async fn test_run_skips_latest_and_counts() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = Layout::new(tmp.path());
        std::fs::create_dir_all(layout.archive_dir()).unwrap();
        std::fs::write(layout.template_path(), "<h1>{{DATE_HUMAN}}</h1>\n{{CONTENT}}").unwrap();
        std::fs::write(layout.archive_page("2026-02-05"), OLD_PAGE).unwrap();
        std::fs::write(layout.archive_page("2026-02-06"), "<html><body>nothing</body></html>").unwrap();
        std::fs::write(layout.archive_page("2026-02-14"), "current").unwrap();

        let summary = run(&layout, true).await.unwrap();
        assert_eq!(
            summary,
            MigrationSummary {
                migrated: 1,
                skipped: 1,
                failed: 1
            }
        );
        // Dry run leaves everything untouched.
        assert_eq!(std::fs::read_to_string(layout.archive_page("2026-02-05")).unwrap(), OLD_PAGE);
        assert!(!layout.index_path().exists());

        run(&layout, false).await.unwrap();
        let migrated = std::fs::read_to_string(layout.archive_page("2026-02-05")).unwrap();
        assert!(migrated.starts_with("<h1>2026年2月5日</h1>\n<section class=\"section\">"));
        // The re-render writes today's page and the homepage.
        assert!(layout.index_path().exists());
    }

    #[tokio::test]
    async fn test_run_empty_archive() {
        let tmp = tempfile::tempdir().unwrap();
        let summary = run(&Layout::new(tmp.path()), false).await.unwrap();
        assert_eq!(summary, MigrationSummary::default());
    }
}
