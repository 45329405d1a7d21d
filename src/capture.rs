use std::io::{BufRead, Read};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::{Result, anyhow};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::http_client::http_client;

static M3U8_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)https?://[^\s'"]+\.m3u8(?:\?[^\s'"]*)?"#).expect("static regex")
});

const VALIDATE_TIMEOUT_SECS: u64 = 20;
const URL_SEARCH_WINDOW: usize = 5;

/// Single-slot holder for the first qualifying stream URL seen on the wire.
/// Observers `offer` what they see; one caller blocks in `wait`.
#[derive(Debug, Default)]
pub struct CaptureSlot {
    slot: Mutex<Option<String>>,
    filled: Condvar,
}

impl CaptureSlot {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Stores the first m3u8 URL found in `observed`. Later offers are ignored
    /// once the slot holds a value. Returns whether this call filled it.
    pub fn offer(&self, observed: &str) -> bool {
        let Some(found) = find_stream_url(observed) else {
            return false;
        };
        let mut guard = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        if guard.is_some() {
            return false;
        }
        *guard = Some(found.to_string());
        self.filled.notify_all();
        true
    }

    pub fn wait(&self, timeout: Duration) -> Option<String> {
        let guard = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        let (guard, _) = self
            .filled
            .wait_timeout_while(guard, timeout, |slot| slot.is_none())
            .unwrap_or_else(|e| e.into_inner());
        guard.clone()
    }
}

/// Feeds every line of `reader` to `slot` on a background thread, stopping
/// early once the slot is filled.
pub fn observe_lines<R>(reader: R, slot: Arc<CaptureSlot>) -> thread::JoinHandle<()>
where
    R: BufRead + Send + 'static,
{
    thread::spawn(move || {
        for line in reader.lines() {
            let Ok(line) = line else {
                break;
            };
            if slot.offer(&line) {
                break;
            }
        }
    })
}

pub fn find_stream_url(text: &str) -> Option<&str> {
    M3U8_URL.find(text).map(|m| m.as_str())
}

/// Light check that the URL answers with a playlist. Any failure is `false`.
pub fn validate_stream(url: &str) -> bool {
    let Ok(client) = http_client() else {
        return false;
    };
    let resp = client
        .get(url)
        .timeout(Duration::from_secs(VALIDATE_TIMEOUT_SECS))
        .send();
    let Ok(resp) = resp else {
        return false;
    };
    if resp.status().as_u16() >= 400 {
        return false;
    }
    let mut head = Vec::with_capacity(2048);
    let _ = resp.take(2048).read_to_end(&mut head);
    head.windows(7).any(|w| w == b"#EXTM3U") || url.to_lowercase().ends_with(".m3u8")
}

/// Points the entry for `channel` at `new_url`. The channel line is the first
/// one containing the name (case-insensitive); its URL is the first `http`
/// line among the next few lines, inserted when none is found. Returns the
/// new text, or `None` when the URL was already current.
pub fn update_channel_url(text: &str, channel: &str, new_url: &str) -> Result<Option<String>> {
    let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
    let needle = channel.to_lowercase();
    let idx = lines
        .iter()
        .position(|l| l.to_lowercase().contains(&needle))
        .ok_or_else(|| anyhow!("channel {channel:?} not found in playlist"))?;

    let window_end = (idx + 1 + URL_SEARCH_WINDOW).min(lines.len());
    let url_line = (idx + 1..window_end).find(|&j| lines[j].trim().starts_with("http"));
    match url_line {
        Some(j) if lines[j].trim() == new_url.trim() => return Ok(None),
        Some(j) => lines[j] = new_url.to_string(),
        None => lines.insert(idx + 1, new_url.to_string()),
    }

    let mut out = lines.join("\n");
    out.push('\n');
    Ok(Some(out))
}
