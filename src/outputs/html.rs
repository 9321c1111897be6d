//! HTML report rendering.
//!
//! Converts the curated digest into the day's page. The markup is kept
//! deliberately plain (`news-item`, `news-title`, `news-meta`, `news-desc`,
//! `card-sources`); all styling lives in `template.html`.
//!
//! # Page Structure
//!
//! Sections are emitted in a fixed order, and the X and TechMeme sections are
//! always present (with a placeholder line when empty) so the layout does not
//! shift from day to day:
//!
//! 1. 核心看点 (headlines)
//! 2. X highlights
//! 3. TechMeme
//! 4. The six topic sections, in [`SECTION_TITLES`] order
//!
//! # Output
//!
//! ```text
//! archive/2026-02-14.html   # the rendered page
//! index.html                # byte-identical copy of the latest page
//! ```

use chrono::{DateTime, Utc};
use itertools::Itertools;
use std::error::Error;
use std::path::PathBuf;
use tokio::fs;
use tracing::{info, instrument};

use crate::config::Layout;
use crate::models::{DailyReport, DigestItem, Sections, SourceLink, TechmemeFile, TechmemeStory, XHighlight};
use crate::outputs::archive::{archive_links, archive_nav, list_archive_dates, with_current};
use crate::outputs::json::read_or_default;
use crate::utils::{date_to_chinese, ensure_writable_dir};

/// Topic sections: digest key and rendered heading.
pub const SECTION_TITLES: [(&str, &str); 6] = [
    ("releases", "🚀 发布 / 上线"),
    ("updates", "📈 更新 / 迭代"),
    ("opensource", "🔓 开源 / 权重"),
    ("benchmarks", "📊 评测 / 基准"),
    ("business", "💼 商业 / 融资"),
    ("risks", "⚠️ 风险 / 事故"),
];

const MAX_X_HIGHLIGHTS: usize = 12;
const MAX_TECHMEME_STORIES: usize = 5;

/// Escape text for use in element content and double- or single-quoted attributes.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Source links joined with `、`. A source without a URL renders as bare text.
pub fn render_sources(sources: &[SourceLink]) -> String {
    sources
        .iter()
        .map(|src| {
            let name = html_escape(src.name.as_deref().unwrap_or("source"));
            let url = html_escape(&src.url);
            if url.is_empty() {
                name
            } else {
                format!(r#"<a href="{url}" target="_blank">{name}</a>"#)
            }
        })
        .join("、")
}

/// One `news-item` article per digest item. Empty fields leave a blank line
/// in place of their element.
pub fn render_items(items: &[DigestItem]) -> String {
    items
        .iter()
        .map(|it| {
            let title = html_escape(&it.title);
            let when = html_escape(&it.time);
            let what = html_escape(&it.what);
            let why = html_escape(&it.why);
            let sources_html = render_sources(it.sources.as_deref().unwrap_or_default());

            let line = |present: bool, markup: String| if present { markup } else { String::new() };
            [
                r#"<article class="news-item">"#.to_string(),
                line(!title.is_empty(), format!(r#"  <h3 class="news-title">{title}</h3>"#)),
                line(!when.is_empty(), format!(r#"  <div class="news-meta">{when}</div>"#)),
                line(
                    !what.is_empty(),
                    format!(r#"  <div class="news-desc"><strong>事件：</strong>{what}</div>"#),
                ),
                line(
                    !why.is_empty(),
                    format!(r#"  <div class="news-desc"><strong>为什么重要：</strong>{why}</div>"#),
                ),
                line(
                    !sources_html.is_empty(),
                    format!(r#"  <div class="card-sources">来源：{sources_html}</div>"#),
                ),
                "</article>".to_string(),
            ]
            .join("\n")
        })
        .filter(|p| !p.trim().is_empty())
        .join("\n")
}

fn engagement(x: &XHighlight) -> String {
    [("❤️", &x.likes), ("🔄", &x.reposts), ("💬", &x.replies)]
        .into_iter()
        .filter_map(|(icon, v)| v.as_ref().and_then(|v| v.as_i64()).map(|n| format!("{icon} {n}")))
        .join(" | ")
}

/// The X highlights section; always rendered.
pub fn render_x_highlights(items: Option<&[XHighlight]>) -> String {
    let mut parts = vec![
        r#"<section class="section">"#.to_string(),
        r#"  <h2 class="section-title">🔥 X 高互动事件（8-12条）</h2>"#.to_string(),
    ];

    let items = items.unwrap_or_default();
    if items.is_empty() {
        parts.push(r#"<div class="news-desc">今日无（或 bird 未配置/抓取失败）。</div>"#.to_string());
        parts.push("</section>".to_string());
        return parts.join("\n");
    }

    for x in items.iter().take(MAX_X_HIGHLIGHTS) {
        let author = html_escape(&x.author);
        let handle = html_escape(&x.handle);
        let text = html_escape(&x.text);
        let url = html_escape(&x.url);
        let eng_html = engagement(x);

        parts.push(r#"<article class="news-item">"#.to_string());
        parts.push(format!(
            r#"  <h3 class="news-title">{author} <span style="color: var(--text-secondary); font-weight: 400;">{handle}</span></h3>"#
        ));
        parts.push(format!(r#"  <div class="news-desc">{text}</div>"#));
        if !eng_html.is_empty() {
            parts.push(format!(r#"  <div class="news-meta">{eng_html}</div>"#));
        }
        if !url.is_empty() {
            parts.push(format!(r#"  <a class="news-link" href="{url}" target="_blank">查看原贴 →</a>"#));
        }
        parts.push("</article>".to_string());
    }

    parts.push("</section>".to_string());
    parts.join("\n")
}

/// The TechMeme section; always rendered.
pub fn render_techmeme(stories: &[TechmemeStory]) -> String {
    let mut parts = vec![
        r#"<section class="section">"#.to_string(),
        r#"  <h2 class="section-title">🌐 TechMeme 当日头条</h2>"#.to_string(),
    ];

    if stories.is_empty() {
        parts.push(r#"<div class="news-desc">今日无（或抓取失败）。</div>"#.to_string());
        parts.push("</section>".to_string());
        return parts.join("\n");
    }

    for s in stories.iter().take(MAX_TECHMEME_STORIES) {
        let title = html_escape(&s.title);
        let url = html_escape(&s.url);
        let summary = html_escape(&s.summary);
        parts.push(r#"<article class="news-item">"#.to_string());
        parts.push(format!(r#"  <h3 class="news-title">{title}</h3>"#));
        if !summary.is_empty() {
            parts.push(format!(r#"  <div class="news-desc">{summary}</div>"#));
        }
        if !url.is_empty() {
            parts.push(format!(r#"  <a class="news-link" href="{url}" target="_blank">阅读更多 →</a>"#));
        }
        parts.push("</article>".to_string());
    }
    parts.push("</section>".to_string());
    parts.join("\n")
}

fn section_items<'a>(sections: &'a Sections, key: &str) -> &'a [DigestItem] {
    let list = match key {
        "releases" => sections.releases.as_deref(),
        "updates" => sections.updates.as_deref(),
        "opensource" => sections.opensource.as_deref(),
        "benchmarks" => sections.benchmarks.as_deref(),
        "business" => sections.business.as_deref(),
        "risks" => sections.risks.as_deref(),
        _ => None,
    };
    list.unwrap_or_default()
}

/// The full `{{CONTENT}}` block for a digest.
pub fn render_content(daily: &DailyReport, stories: &[TechmemeStory]) -> String {
    let mut parts = vec![
        r#"<section class="section">"#.to_string(),
        r#"  <h2 class="section-title">🔥 核心看点</h2>"#.to_string(),
        render_items(daily.headlines.as_deref().unwrap_or_default()),
        "</section>".to_string(),
        render_x_highlights(daily.x_highlights.as_deref()),
        render_techmeme(stories),
    ];

    let empty = Sections::default();
    let sections = daily.sections.as_ref().unwrap_or(&empty);
    for (key, title) in SECTION_TITLES {
        parts.push(r#"<section class="section">"#.to_string());
        parts.push(format!(r#"  <h2 class="section-title">{}</h2>"#, html_escape(title)));
        parts.push(render_items(section_items(sections, key)));
        parts.push("</section>".to_string());
    }

    parts.into_iter().filter(|p| !p.trim().is_empty()).join("\n")
}

/// Everything substituted into `template.html`.
#[derive(Debug)]
pub struct Page<'a> {
    pub date: &'a str,
    pub content: &'a str,
    /// Archive dates, newest first, including `date`.
    pub archive_dates: &'a [String],
    pub generated_at: DateTime<Utc>,
}

/// Fill every supported `{{PLACEHOLDER}}` in `tpl`.
///
/// Both the original template markers (`DATE`, `DATE_CN`, `CONTENT`,
/// `ARCHIVE_LINKS`) and the newer ones (`DATE_HUMAN`, `GENERATED_AT_UTC`,
/// `ARCHIVE_NAV`) are filled, so either template generation renders.
pub fn fill_template(tpl: &str, page: &Page<'_>) -> String {
    let date_cn = date_to_chinese(page.date).unwrap_or_else(|| page.date.to_string());
    let substitutions = [
        ("{{DATE}}", html_escape(page.date)),
        ("{{DATE_CN}}", html_escape(&date_cn)),
        ("{{DATE_HUMAN}}", html_escape(&date_cn)),
        ("{{CONTENT}}", page.content.to_string()),
        ("{{ARCHIVE_LINKS}}", archive_links(page.archive_dates)),
        (
            "{{GENERATED_AT_UTC}}",
            page.generated_at.format("%Y-%m-%d %H:%M UTC").to_string(),
        ),
        ("{{ARCHIVE_NAV}}", archive_nav(page.archive_dates, page.date)),
    ];

    substitutions
        .iter()
        .fold(tpl.to_string(), |out, (marker, value)| out.replace(marker, value))
}

/// Render the current digest into its archive page and the homepage.
///
/// Returns the archive page path.
///
/// # Errors
///
/// Fails when `template.html` is missing, when a data file is not valid JSON,
/// when the digest date cannot be used as a file name, or on write errors.
#[instrument(level = "info", skip_all, fields(root = %layout.root().display()))]
pub async fn render_report(layout: &Layout, now: DateTime<Utc>) -> Result<PathBuf, Box<dyn Error>> {
    let daily: DailyReport = read_or_default(&layout.daily_path()).await?;
    let techmeme: TechmemeFile = read_or_default(&layout.techmeme_path()).await?;

    let date = daily
        .date
        .clone()
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| now.format("%Y-%m-%d").to_string());
    if date.contains(['/', '\\']) || date.contains("..") {
        return Err(format!("digest date {date:?} is not usable as an archive file name").into());
    }

    let tpl = fs::read_to_string(layout.template_path()).await?;
    let content = render_content(&daily, &techmeme.stories);
    let archive_dates = with_current(&list_archive_dates(&layout.archive_dir()).await?, &date);

    let page = Page {
        date: &date,
        content: &content,
        archive_dates: &archive_dates,
        generated_at: now,
    };
    let out = fill_template(&tpl, &page);

    ensure_writable_dir(&layout.archive_dir()).await?;
    let archive_path = layout.archive_page(&date);
    fs::write(&archive_path, out).await?;
    fs::copy(&archive_path, layout.index_path()).await?;

    info!(path = %archive_path.display(), bytes = content.len(), "Rendered daily report");
    Ok(archive_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(title: &str) -> DigestItem {
        DigestItem {
            title: title.to_string(),
            time: "2026-02-14".to_string(),
            what: "Shipped <v2>".to_string(),
            why: "It's faster".to_string(),
            sources: Some(vec![SourceLink {
                name: Some("Blog".to_string()),
                url: "https://lab.example/a?x=1&y=2".to_string(),
            }]),
        }
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape(r#"<a href="x">Tom & Jerry's</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&#39;s&lt;/a&gt;"
        );
    }

    #[test]
    fn test_render_sources() {
        let sources = vec![
            SourceLink { name: Some("A".into()), url: "https://a.example".into() },
            SourceLink { name: Some("Offline".into()), url: String::new() },
            SourceLink { name: None, url: "https://c.example".into() },
        ];
        assert_eq!(
            render_sources(&sources),
            r#"<a href="https://a.example" target="_blank">A</a>、Offline、<a href="https://c.example" target="_blank">source</a>"#
        );
        assert_eq!(render_sources(&[]), "");
    }

    #[test]
    fn test_render_items_full() {
        let html = render_items(&[item("Launch")]);
        let expected = [
            r#"<article class="news-item">"#,
            r#"  <h3 class="news-title">Launch</h3>"#,
            r#"  <div class="news-meta">2026-02-14</div>"#,
            r#"  <div class="news-desc"><strong>事件：</strong>Shipped &lt;v2&gt;</div>"#,
            r#"  <div class="news-desc"><strong>为什么重要：</strong>It&#39;s faster</div>"#,
            r#"  <div class="card-sources">来源：<a href="https://lab.example/a?x=1&amp;y=2" target="_blank">Blog</a></div>"#,
            "</article>",
        ]
        .join("\n");
        assert_eq!(html, expected);
    }

    #[test]
    fn test_render_items_keeps_blank_lines_for_missing_fields() {
        let sparse = DigestItem {
            title: "Only title".to_string(),
            ..Default::default()
        };
        let html = render_items(&[sparse]);
        assert_eq!(
            html,
            "<article class=\"news-item\">\n  <h3 class=\"news-title\">Only title</h3>\n\n\n\n\n</article>"
        );
        assert_eq!(render_items(&[]), "");
    }

    #[test]
    fn test_x_highlights_placeholder_and_cap() {
        let empty = render_x_highlights(None);
        assert!(empty.contains("今日无（或 bird 未配置/抓取失败）。"));
        assert!(empty.ends_with("</section>"));

        let many: Vec<XHighlight> = (0..15)
            .map(|i| XHighlight {
                author: format!("user{i}"),
                handle: "@u".to_string(),
                text: "hi".to_string(),
                url: format!("https://x.com/u/status/{i}"),
                ..Default::default()
            })
            .collect();
        let html = render_x_highlights(Some(&many));
        assert_eq!(html.matches(r#"<article class="news-item">"#).count(), MAX_X_HIGHLIGHTS);
        assert!(!html.contains("class=\"news-meta\""));
    }

    #[test]
    fn test_x_engagement_only_integers() {
        let x = XHighlight {
            author: "Lab".into(),
            likes: Some(serde_json::json!(120)),
            reposts: Some(serde_json::json!("lots")),
            replies: Some(serde_json::json!(7)),
            ..Default::default()
        };
        assert_eq!(engagement(&x), "❤️ 120 | 💬 7");
    }

    #[test]
    fn test_techmeme_section() {
        assert!(render_techmeme(&[]).contains("今日无（或抓取失败）。"));

        let stories: Vec<TechmemeStory> = (0..7)
            .map(|i| TechmemeStory {
                title: format!("Story {i}"),
                url: format!("https://t.example/{i}"),
                ..Default::default()
            })
            .collect();
        let html = render_techmeme(&stories);
        assert_eq!(html.matches("阅读更多 →").count(), MAX_TECHMEME_STORIES);
        assert!(!html.contains("Story 5"));
        assert!(!html.contains(r#"<div class="news-desc">"#));
    }

    #[test]
    fn test_render_content_order() {
        let daily = DailyReport {
            date: Some("2026-02-14".into()),
            headlines: Some(vec![item("Headline")]),
            sections: Some(Sections {
                risks: Some(vec![item("Outage")]),
                ..Default::default()
            }),
            x_highlights: None,
        };
        let html = render_content(&daily, &[]);

        let pos = |needle: &str| html.find(needle).unwrap_or_else(|| panic!("missing {needle}"));
        assert!(pos("🔥 核心看点") < pos("Headline"));
        assert!(pos("Headline") < pos("X 高互动事件"));
        assert!(pos("X 高互动事件") < pos("TechMeme 当日头条"));
        assert!(pos("TechMeme 当日头条") < pos("🚀 发布 / 上线"));
        assert!(pos("💼 商业 / 融资") < pos("⚠️ 风险 / 事故"));
        assert!(pos("⚠️ 风险 / 事故") < pos("Outage"));
        // Empty sections still show their heading but no blank filler.
        assert!(!html.contains("\n\n"));
    }

    #[test]
    fn test_fill_template() {
        let tpl = "<title>{{DATE}}</title><h1>{{DATE_CN}}</h1><main>{{CONTENT}}</main><nav>{{ARCHIVE_LINKS}}</nav><footer>{{GENERATED_AT_UTC}}</footer>";
        let dates = vec!["2026-02-14".to_string(), "2026-02-13".to_string()];
        let page = Page {
            date: "2026-02-14",
            content: "<p>body</p>",
            archive_dates: &dates,
            generated_at: Utc.with_ymd_and_hms(2026, 2, 14, 9, 5, 0).unwrap(),
        };
        let out = fill_template(tpl, &page);
        assert!(out.starts_with("<title>2026-02-14</title><h1>2026年2月14日</h1><main><p>body</p></main>"));
        assert!(out.contains(r#"<a href="./archive/2026-02-13.html">2026-02-13</a>"#));
        assert!(out.contains("<footer>2026-02-14 09:05 UTC</footer>"));
    }

    #[test]
    fn test_fill_template_unparsable_date_falls_back() {
        let page = Page {
            date: "Feb 14",
            content: "",
            archive_dates: &[],
            generated_at: Utc::now(),
        };
        assert_eq!(fill_template("{{DATE_CN}}", &page), "Feb 14");
    }

    #[tokio::test]
    async fn test_render_report_writes_archive_and_index() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = Layout::new(tmp.path());
        std::fs::create_dir_all(layout.data_dir()).unwrap();
        std::fs::create_dir_all(layout.archive_dir()).unwrap();
        std::fs::write(layout.archive_page("2026-02-12"), "old").unwrap();
        std::fs::write(
            layout.template_path(),
            "<h1>{{DATE_CN}}</h1>\n{{CONTENT}}\n<nav>{{ARCHIVE_LINKS}}</nav>",
        )
        .unwrap();
        std::fs::write(
            layout.daily_path(),
            r#"{"date": "2026-02-14", "headlines": [{"title": "Big launch", "what": "w", "why": "y"}]}"#,
        )
        .unwrap();

        let now = Utc.with_ymd_and_hms(2026, 2, 14, 10, 0, 0).unwrap();
        let path = render_report(&layout, now).await.unwrap();
        assert_eq!(path, layout.archive_page("2026-02-14"));

        let page = std::fs::read(&path).unwrap();
        let index = std::fs::read(layout.index_path()).unwrap();
        assert_eq!(page, index);

        let page = String::from_utf8(page).unwrap();
        assert!(page.starts_with("<h1>2026年2月14日</h1>"));
        assert!(page.contains("Big launch"));
        assert!(page.contains("TechMeme 当日头条"));
        assert!(page.contains(
            "<a href=\"./archive/2026-02-14.html\">2026-02-14</a>\n<a href=\"./archive/2026-02-12.html\">2026-02-12</a>"
        ));
    }

    #[tokio::test]
    async fn test_render_report_defaults_date_and_requires_template() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = Layout::new(tmp.path());
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 0, 30, 0).unwrap();

        assert!(render_report(&layout, now).await.is_err());

        std::fs::write(layout.template_path(), "{{DATE}}").unwrap();
        let path = render_report(&layout, now).await.unwrap();
        assert_eq!(path, layout.archive_page("2026-03-01"));
        assert_eq!(std::fs::read_to_string(layout.index_path()).unwrap(), "2026-03-01");
    }

    #[tokio::test]
    async fn test_render_report_rejects_path_like_date() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = Layout::new(tmp.path());
        std::fs::create_dir_all(layout.data_dir()).unwrap();
        std::fs::write(layout.template_path(), "{{DATE}}").unwrap();
        std::fs::write(layout.daily_path(), r#"{"date": "../escape"}"#).unwrap();
        assert!(render_report(&layout, Utc::now()).await.is_err());
    }
}
