use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;
use reqwest::header::USER_AGENT;

const REQUEST_TIMEOUT_SECS: u64 = 30;
const TEXT_FETCH_ATTEMPTS: u32 = 3;
const TEXT_FETCH_BACKOFF_MS: u64 = 300;

static CLIENT: OnceCell<Client> = OnceCell::new();

pub fn http_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build http client")
    })
}

/// GET a plain-text body (playlists). Retries a couple of times with a fixed
/// short pause; the last error is returned.
pub fn fetch_text(url: &str, timeout: Duration) -> Result<String> {
    let client = http_client()?;
    let mut last_err = None;
    for attempt in 0..TEXT_FETCH_ATTEMPTS {
        let fetched = client
            .get(url)
            .header(USER_AGENT, "Mozilla/5.0")
            .timeout(timeout)
            .send()
            .with_context(|| format!("request {url}"))
            .and_then(|res| {
                res.error_for_status()
                    .with_context(|| format!("status for {url}"))
            })
            .and_then(|res| res.text().with_context(|| format!("read body {url}")));
        match fetched {
            Ok(body) => return Ok(body),
            Err(err) => {
                tracing::debug!(url, attempt, "text fetch failed: {err:#}");
                last_err = Some(err);
                if attempt + 1 < TEXT_FETCH_ATTEMPTS {
                    std::thread::sleep(Duration::from_millis(TEXT_FETCH_BACKOFF_MS));
                }
            }
        }
    }
    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("fetch failed for {url}")))
}
