//! Loose schema validation for the curated digest (`data/daily.json`).
//!
//! The digest is written by hand or by a model, so it drifts. This check
//! catches missing or empty required fields and legacy field names before
//! anything is rendered or published.
//!
//! Hard failures stop at the first problem and surface as a
//! [`ValidationError`] (process exit code 2). Soft problems are collected as
//! warnings on the [`ValidationReport`].

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde_json::{Map, Value};
use std::error::Error;
use std::path::Path;
use thiserror::Error;
use tokio::fs;
use tracing::instrument;
use url::Url;

/// Sections that must be present (as lists, possibly empty).
pub const REQUIRED_SECTIONS: [&str; 6] =
    ["releases", "updates", "opensource", "benchmarks", "business", "risks"];

/// Keys expected inside `self_check`; missing ones only warn.
const SELF_CHECK_KEYS: [&str; 4] = ["coverage_analysis", "freshness_check", "bird_status", "dedupe_keys"];

/// Field names models tend to emit from older prompts, with a fix hint.
const LEGACY_FIELD_HINTS: [(&str, &str); 4] = [
    ("source", "use 'sources' (array of {name, url}) instead of 'source'"),
    ("published", "use 'time' instead of 'published'"),
    ("summary", "use 'what' + 'why' instead of 'summary'"),
    ("category", "remove 'category' (section key implies the category)"),
];

const FRESHNESS_HOURS: i64 = 48;

/// The digest failed validation.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ValidationError(pub String);

/// Outcome of a successful validation.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Problems noticed before the "ok" verdict (freshness, X coverage).
    pub warnings: Vec<String>,
    /// `self_check` problems, reported after the verdict.
    pub self_check_warnings: Vec<String>,
}

type Check<T> = Result<T, ValidationError>;

fn fail<T>(msg: impl Into<String>) -> Check<T> {
    Err(ValidationError(msg.into()))
}

fn must_str<'a>(obj: &'a Map<String, Value>, key: &str, ctx: &str) -> Check<&'a str> {
    match obj.get(key).and_then(Value::as_str) {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => fail(format!("{ctx}: missing/empty '{key}'")),
    }
}

fn must_list<'a>(obj: &'a Map<String, Value>, key: &str, ctx: &str) -> Check<&'a Vec<Value>> {
    match obj.get(key).and_then(Value::as_array) {
        Some(list) => Ok(list),
        None => fail(format!("{ctx}: '{key}' must be a list")),
    }
}

fn is_int(v: &Value) -> bool {
    v.is_i64() || v.is_u64()
}

/// True when `url` points at X / Twitter.
fn is_x_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => parsed.host_str().is_some_and(|host| {
            ["x.com", "twitter.com"]
                .iter()
                .any(|d| host == *d || host.ends_with(&format!(".{d}")))
        }),
        Err(_) => url.contains("x.com/") || url.contains("twitter.com/"),
    }
}

struct Validator {
    now: DateTime<Utc>,
    report: ValidationReport,
}

impl Validator {
    fn item(&mut self, it: &Value, ctx: &str) -> Check<()> {
        let Some(obj) = it.as_object() else {
            return fail(format!("{ctx}: item must be object"));
        };

        for (old_key, hint) in LEGACY_FIELD_HINTS {
            if obj.contains_key(old_key) {
                return fail(format!("{ctx}: found legacy field '{old_key}' - {hint}"));
            }
        }

        must_str(obj, "title", ctx)?;
        let time = must_str(obj, "time", ctx)?;
        must_str(obj, "what", ctx)?;
        must_str(obj, "why", ctx)?;

        // Only plain dates are checked; free-form times are accepted as-is.
        if let Ok(date) = NaiveDate::parse_from_str(time.trim(), "%Y-%m-%d") {
            let midnight = date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
            if midnight < self.now - Duration::hours(FRESHNESS_HOURS) {
                self.report
                    .warnings
                    .push(format!("{ctx} time '{time}' is older than {FRESHNESS_HOURS}h"));
            }
        }

        let sources = must_list(obj, "sources", ctx)?;
        if sources.is_empty() {
            return fail(format!("{ctx}: sources must have at least 1 entry"));
        }
        for (i, s) in sources.iter().enumerate() {
            let Some(src) = s.as_object() else {
                return fail(format!("{ctx}: sources[{i}] must be object"));
            };
            let sctx = format!("{ctx}: sources[{i}]");
            must_str(src, "name", &sctx)?;
            must_str(src, "url", &sctx)?;
        }
        Ok(())
    }

    fn x_highlights(&mut self, xh: &Value) -> Check<()> {
        let Some(list) = xh.as_array() else {
            return fail("daily.x_highlights must be a list when present");
        };
        if list.len() > 20 {
            return fail(format!("daily.x_highlights size out of range (got {})", list.len()));
        }
        for (i, x) in list.iter().enumerate() {
            let ctx = format!("daily.x_highlights[{}]", i + 1);
            let Some(obj) = x.as_object() else {
                return fail(format!("{ctx} must be object"));
            };
            for key in ["author", "handle", "text", "url"] {
                must_str(obj, key, &ctx)?;
            }
            for key in ["likes", "reposts", "replies"] {
                if obj.get(key).is_some_and(|v| !is_int(v)) {
                    return fail(format!("{ctx}.{key} must be int"));
                }
            }
        }
        Ok(())
    }

    fn summary(&mut self, daily: &Map<String, Value>) -> Check<()> {
        let Some(summary) = daily.get("summary").and_then(Value::as_object) else {
            return fail("daily.summary must be object");
        };
        let bullets_ok = summary
            .get("bullets")
            .and_then(Value::as_array)
            .is_some_and(|b| {
                (3..=5).contains(&b.len())
                    && b.iter()
                        .all(|x| x.as_str().is_some_and(|s| !s.trim().is_empty()))
            });
        if !bullets_ok {
            return fail("daily.summary.bullets must be 3-5 non-empty strings");
        }
        must_str(summary, "url", "daily.summary")?;
        must_str(summary, "archiveUrl", "daily.summary")?;
        Ok(())
    }

    fn self_check(&mut self, daily: &Map<String, Value>) {
        let warnings = &mut self.report.self_check_warnings;
        match daily.get("self_check").and_then(Value::as_object) {
            Some(sc) if !sc.is_empty() => {
                for key in SELF_CHECK_KEYS {
                    match sc.get(key) {
                        None => warnings.push(format!("self_check.{key} is missing")),
                        Some(v) if is_empty_value(v) => {
                            warnings.push(format!("self_check.{key} is empty"))
                        }
                        Some(_) => {}
                    }
                }
            }
            _ => warnings.push("self_check is missing or empty".to_string()),
        }
    }
}

/// Falsy in the JSON sense: null, false, 0, "", [], {}.
fn is_empty_value(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// Every item in headlines and sections, for cross-cutting checks.
fn all_items(daily: &Map<String, Value>) -> impl Iterator<Item = &Value> {
    let headlines = daily
        .get("headlines")
        .and_then(Value::as_array)
        .into_iter()
        .flatten();
    let sections = daily
        .get("sections")
        .and_then(Value::as_object)
        .into_iter()
        .flat_map(|s| s.values())
        .filter_map(Value::as_array)
        .flatten();
    headlines.chain(sections)
}

fn has_any_x_link(daily: &Map<String, Value>) -> bool {
    all_items(daily)
        .filter_map(|it| it.get("sources").and_then(Value::as_array))
        .flatten()
        .filter_map(|s| s.get("url").and_then(Value::as_str))
        .any(is_x_url)
}

/// Validate a parsed digest as of `now`.
///
/// # Errors
///
/// Returns the first hard failure as a [`ValidationError`].
pub fn validate_daily(daily: &Value, now: DateTime<Utc>) -> Result<ValidationReport, ValidationError> {
    let Some(obj) = daily.as_object() else {
        return fail("daily: document must be object");
    };
    let mut v = Validator {
        now,
        report: ValidationReport::default(),
    };

    must_str(obj, "date", "daily")?;

    let headlines = must_list(obj, "headlines", "daily")?;
    if !(3..=5).contains(&headlines.len()) {
        return fail(format!(
            "daily.headlines must be 3-5 items (got {})",
            headlines.len()
        ));
    }
    for (idx, it) in headlines.iter().enumerate() {
        v.item(it, &format!("daily.headlines[{}]", idx + 1))?;
    }

    let Some(sections) = obj.get("sections").and_then(Value::as_object) else {
        return fail("daily.sections must be object");
    };
    for key in REQUIRED_SECTIONS {
        let Some(items) = sections.get(key).and_then(Value::as_array) else {
            return fail(format!("daily.sections.{key} must be list (can be empty)"));
        };
        for (idx, it) in items.iter().enumerate() {
            v.item(it, &format!("daily.sections.{key}[{}]", idx + 1))?;
        }
    }

    let xh = obj.get("x_highlights").filter(|xh| !xh.is_null());
    if let Some(xh) = xh {
        v.x_highlights(xh)?;
    }
    let no_highlights = xh.and_then(Value::as_array).is_none_or(|l| l.is_empty());
    if no_highlights && !has_any_x_link(obj) {
        v.report.warnings.push(
            "no X/Twitter source found (x_highlights empty, no x.com links in sources)".to_string(),
        );
    }

    v.summary(obj)?;
    v.self_check(obj);

    Ok(v.report)
}

/// Read and validate a digest file.
///
/// # Errors
///
/// A missing file is reported as a [`ValidationError`]; unreadable or
/// non-JSON content surfaces as the underlying I/O or parse error.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn validate_file(path: &Path) -> Result<ValidationReport, Box<dyn Error>> {
    if !path.exists() {
        return Err(Box::new(ValidationError(format!("missing {}", path.display()))));
    }
    let raw = fs::read_to_string(path).await?;
    let daily: Value = serde_json::from_str(&raw)?;
    Ok(validate_daily(&daily, Utc::now())?)
}
