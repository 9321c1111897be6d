//! HTTP access with exponential backoff retry logic.
//!
//! Every scraper goes through the [`FetchText`] trait so the network layer can
//! be swapped out (tests use an in-memory stub).
//!
//! # Architecture
//!
//! - [`FetchText`]: Core trait defining an async GET that yields text
//! - [`HttpClient`]: `reqwest`-backed implementation with the report's user agent
//! - [`RetryFetch`]: Decorator that adds retry logic to any `FetchText` implementation
//! - [`Fetcher`]: What scrapers hold; applies the default timeout and the
//!   "log and return nothing" error policy
//!
//! # Retry Strategy
//!
//! - Exponential backoff starting at the configured base delay
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added between attempts
//! - Client errors ([`HttpStatusError`] 4xx other than 408/429) are not retried

use rand::{Rng, rng};
use serde::de::DeserializeOwned;
use std::error::Error;
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};

use crate::utils::truncate_for_log;

/// User agent sent with every request.
pub const USER_AGENT: &str = "Mozilla/5.0 (compatible; AI-Daily-Report/1.0)";

/// Timeout used for secondary page fetches (article pages, repo pages).
pub const PAGE_TIMEOUT: Duration = Duration::from_secs(10);

/// Trait for async HTTP GET returning the decoded body.
pub trait FetchText {
    /// Fetch `url` and return its body as UTF-8 text.
    ///
    /// Non-success HTTP statuses are reported as errors.
    async fn get_text(&self, url: &str, timeout: Duration) -> Result<String, Box<dyn Error>>;
}

/// A response with a 4xx or 5xx status.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("HTTP {status} for {url}")]
pub struct HttpStatusError {
    pub url: String,
    pub status: u16,
}

impl HttpStatusError {
    /// Server errors, timeouts (408) and rate limiting (429) may succeed on retry.
    pub fn is_transient(&self) -> bool {
        !(400..500).contains(&self.status) || self.status == 408 || self.status == 429
    }
}

/// True when retrying `e` cannot help.
fn is_permanent(e: &(dyn Error + 'static)) -> bool {
    e.downcast_ref::<HttpStatusError>()
        .is_some_and(|s| !s.is_transient())
}

/// `reqwest`-backed [`FetchText`] implementation.
///
/// Certificate verification is disabled: several feed hosts serve broken
/// chains and the report only reads public content.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> Result<Self, Box<dyn Error>> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .danger_accept_invalid_certs(true)
            .build()?;
        Ok(Self { client })
    }
}

impl FetchText for HttpClient {
    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn get_text(&self, url: &str, timeout: Duration) -> Result<String, Box<dyn Error>> {
        let t0 = Instant::now();
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await?;
        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(Box::new(HttpStatusError {
                url: url.to_string(),
                status: status.as_u16(),
            }));
        }
        let body = response.text().await?;
        debug!(
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "GET complete"
        );
        Ok(body)
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`FetchText`] implementation.
///
/// The delay between retries follows this formula:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryFetch<T> {
    /// The underlying client to wrap.
    inner: T,
    /// Maximum number of retry attempts before giving up.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: Duration,
    /// Maximum delay cap.
    max_delay: Duration,
}

impl<T> RetryFetch<T>
where
    T: FetchText,
{
    /// Create a new retry wrapper around an existing [`FetchText`] implementation.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let client = RetryFetch::new(HttpClient::new()?, 2, Duration::from_millis(500));
    /// ```
    pub fn new(inner: T, max_retries: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> FetchText for RetryFetch<T>
where
    T: FetchText,
{
    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn get_text(&self, url: &str, timeout: Duration) -> Result<String, Box<dyn Error>> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.get_text(url, timeout).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    attempt += 1;
                    let total_dt = total_t0.elapsed();

                    if is_permanent(e.as_ref()) {
                        debug!(attempt, error = %e, "GET failed permanently; not retrying");
                        return Err(e);
                    }

                    if attempt > self.max_retries {
                        if self.max_retries > 0 {
                            warn!(
                                attempt,
                                max = self.max_retries,
                                elapsed_ms_total = total_dt.as_millis() as u64,
                                error = %e,
                                "GET exhausted retries"
                            );
                        }
                        return Err(e);
                    }

                    // backoff calc
                    let shift = (attempt - 1).min(16) as u32;
                    let delay = self
                        .base_delay
                        .saturating_mul(1u32 << shift)
                        .min(self.max_delay);
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + Duration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_total = total_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "GET attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// The handle scrapers use for all network access.
///
/// Errors never escape a `Fetcher`: they are logged and turned into `None`,
/// so one dead source cannot abort the whole fetch run.
#[derive(Debug)]
pub struct Fetcher<F> {
    http: F,
    timeout: Duration,
}

impl<F: FetchText> Fetcher<F> {
    pub fn new(http: F, timeout: Duration) -> Self {
        Self { http, timeout }
    }

    /// Fetch `url` with the default timeout.
    pub async fn text(&self, url: &str) -> Option<String> {
        self.text_with_timeout(url, self.timeout).await
    }

    /// Fetch `url` with an explicit timeout.
    pub async fn text_with_timeout(&self, url: &str, timeout: Duration) -> Option<String> {
        match self.http.get_text(url, timeout).await {
            Ok(body) => Some(body),
            Err(e) => {
                error!(%url, error = %e, "Error fetching URL");
                None
            }
        }
    }

    /// Fetch `url` and decode it as JSON into `T`.
    pub async fn json<T: DeserializeOwned>(&self, url: &str) -> Option<T> {
        let body = self.text(url).await?;
        match serde_json::from_str::<T>(&body) {
            Ok(value) => Some(value),
            Err(e) => {
                error!(
                    %url,
                    error = %e,
                    body_preview = %truncate_for_log(&body, 200),
                    "Error parsing JSON"
                );
                None
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::stub::StubHttp;
    use super::*;
    use serde::Deserialize;
    use std::cell::Cell;

    /// Fails `failures` times, then succeeds.
    struct Flaky {
        failures: usize,
        calls: Cell<usize>,
    }

    impl FetchText for Flaky {
        async fn get_text(&self, _url: &str, _timeout: Duration) -> Result<String, Box<dyn Error>> {
            let n = self.calls.get();
            self.calls.set(n + 1);
            if n < self.failures {
                Err("connection reset".into())
            } else {
                Ok("fine".to_string())
            }
        }
    }

    #[tokio::test]
    async fn test_retry_recovers_after_transient_failures() {
        let flaky = Flaky { failures: 2, calls: Cell::new(0) };
        let client = RetryFetch::new(flaky, 3, Duration::from_millis(1));
        let body = client.get_text("https://example.com", PAGE_TIMEOUT).await.unwrap();
        assert_eq!(body, "fine");
        assert_eq!(client.inner.calls.get(), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_retries() {
        let flaky = Flaky { failures: 10, calls: Cell::new(0) };
        let client = RetryFetch::new(flaky, 1, Duration::from_millis(1));
        assert!(client.get_text("https://example.com", PAGE_TIMEOUT).await.is_err());
        assert_eq!(client.inner.calls.get(), 2);
    }

    #[tokio::test]
    async fn test_zero_retries_makes_a_single_attempt() {
        let flaky = Flaky { failures: 1, calls: Cell::new(0) };
        let client = RetryFetch::new(flaky, 0, Duration::from_millis(1));
        assert!(client.get_text("https://example.com", PAGE_TIMEOUT).await.is_err());
        assert_eq!(client.inner.calls.get(), 1);
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let http = StubHttp::new().with_status("https://paywall.example/", 403);
        let client = RetryFetch::new(&http, 2, Duration::from_millis(1));

        assert!(client.get_text("https://gone.example/", PAGE_TIMEOUT).await.is_err());
        assert!(client.get_text("https://paywall.example/", PAGE_TIMEOUT).await.is_err());
        assert_eq!(http.requested(), ["https://gone.example/", "https://paywall.example/"]);
    }

    #[tokio::test]
    async fn test_server_errors_and_rate_limits_are_retried() {
        let http = StubHttp::new()
            .with_status("https://busy.example/", 503)
            .with_status("https://slow.example/", 429);
        let client = RetryFetch::new(&http, 2, Duration::from_millis(1));

        assert!(client.get_text("https://busy.example/", PAGE_TIMEOUT).await.is_err());
        assert!(client.get_text("https://slow.example/", PAGE_TIMEOUT).await.is_err());
        assert_eq!(http.requested().len(), 6);
    }

    #[test]
    fn test_status_classification() {
        let status = |status| HttpStatusError { url: String::new(), status };
        assert!(!status(404).is_transient());
        assert!(!status(401).is_transient());
        assert!(status(408).is_transient());
        assert!(status(429).is_transient());
        assert!(status(500).is_transient());
        assert!(status(502).is_transient());
    }

    #[tokio::test]
    async fn test_fetcher_swallows_errors() {
        let fetcher = Fetcher::new(StubHttp::new(), Duration::from_secs(1));
        assert_eq!(fetcher.text("https://missing.example").await, None);
    }

    #[tokio::test]
    async fn test_fetcher_json_decodes_and_rejects_garbage() {
        #[derive(Deserialize, Debug, PartialEq)]
        struct Thing {
            n: u32,
        }

        let http = StubHttp::new()
            .with("https://a.example/ok", r#"{"n": 7}"#)
            .with("https://a.example/bad", "<html>nope</html>");
        let fetcher = Fetcher::new(http, Duration::from_secs(1));

        assert_eq!(fetcher.json::<Thing>("https://a.example/ok").await, Some(Thing { n: 7 }));
        assert_eq!(fetcher.json::<Thing>("https://a.example/bad").await, None);
    }
}
