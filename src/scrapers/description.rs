//! Page description extraction from `<meta>` tags.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

/// Longest description kept for any fetched item.
pub const MAX_DESCRIPTION_CHARS: usize = 300;

static META: Lazy<Selector> = Lazy::new(|| Selector::parse("meta").unwrap());

/// Extract a short description from an HTML page.
///
/// Prefers `og:description` (usually better written), then the plain
/// `description` meta tag. Attribute values match case-insensitively and the
/// result is trimmed. Returns an empty string when neither is present.
pub fn extract_description(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }

    let document = Html::parse_document(html);
    let metas: Vec<ElementRef<'_>> = document.select(&META).collect();

    meta_content(&metas, "property", "og:description")
        .or_else(|| meta_content(&metas, "name", "description"))
        .unwrap_or_default()
}

fn meta_content(metas: &[ElementRef<'_>], key: &str, expected: &str) -> Option<String> {
    metas
        .iter()
        .filter(|m| {
            m.value()
                .attr(key)
                .is_some_and(|v| v.eq_ignore_ascii_case(expected))
        })
        .filter_map(|m| m.value().attr("content"))
        .map(str::trim)
        .find(|c| !c.is_empty())
        .map(str::to_string)
}
