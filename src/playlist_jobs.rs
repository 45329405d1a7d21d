use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::config::{ConfigError, compile_pattern, compile_patterns, env_non_empty};
use crate::http_client::fetch_text;
use crate::m3u::{normalize_name, parse_entries};
use crate::matcher::{ChannelRule, ChannelTable, Pick, RegionGuard};
use crate::rewrite::{RewriteMode, Rewritten, rewrite_playlist};

const PLAYLIST_TIMEOUT_SECS: u64 = 25;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaylistsDocument {
    #[serde(default)]
    pub jobs: Vec<JobEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobEntry {
    pub name: String,
    pub source_url: String,
    pub dest_raw_url: String,
    pub dest_repo_path: String,
    pub output_local_path: PathBuf,
    pub commit_message: String,
    #[serde(default)]
    pub mode: RewriteMode,
    #[serde(default)]
    pub region_markers: Vec<String>,
    #[serde(default)]
    pub channels: Vec<ChannelEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelEntry {
    pub name: String,
    #[serde(default)]
    pub source_patterns: Vec<String>,
    #[serde(default)]
    pub dest_aliases: Vec<String>,
    #[serde(default)]
    pub dest_patterns: Vec<String>,
    #[serde(default)]
    pub require_source_word: Option<String>,
    #[serde(default)]
    pub region_guard: Option<RegionGuardEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegionGuardEntry {
    pub foreign: String,
    pub required: String,
}

/// Where the destination playlist is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestinationInput {
    Remote(String),
    Local(PathBuf),
}

#[derive(Debug, Clone)]
pub struct PlaylistJob {
    pub name: String,
    pub source_url: String,
    pub destination: DestinationInput,
    pub dest_repo_path: String,
    pub output_local_path: PathBuf,
    pub commit_message: String,
    pub mode: RewriteMode,
    pub table: ChannelTable,
}

impl PlaylistJob {
    pub fn load(path: &Path, name: &str) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read playlist jobs {}", path.display()))?;
        Self::from_toml_str(&raw, name).with_context(|| format!("parse {}", path.display()))
    }

    pub fn from_toml_str(raw: &str, name: &str) -> Result<Self> {
        let doc: PlaylistsDocument = toml::from_str(raw).context("invalid playlist jobs toml")?;
        let entry = doc
            .jobs
            .into_iter()
            .find(|j| j.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| ConfigError::UnknownJob(name.to_string()))?;
        Ok(Self::from_entry(entry)?)
    }

    pub fn from_entry(entry: JobEntry) -> Result<Self, ConfigError> {
        let rules = entry
            .channels
            .iter()
            .map(channel_rule)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            name: entry.name,
            source_url: entry.source_url,
            destination: DestinationInput::Remote(entry.dest_raw_url),
            dest_repo_path: entry.dest_repo_path,
            output_local_path: entry.output_local_path,
            commit_message: entry.commit_message,
            mode: entry.mode,
            table: ChannelTable {
                rules,
                region_markers: entry
                    .region_markers
                    .iter()
                    .map(|m| m.to_lowercase())
                    .collect(),
            },
        })
    }

    /// `SOURCE_URL`, `DEST_RAW_URL`, `DEST_LOCAL_PATH`, `DEST_REPO_PATH`,
    /// `COMMIT_MESSAGE` and `OUTPUT_LOCAL_PATH` replace the preset values.
    pub fn apply_env_overrides(&mut self) {
        if let Some(url) = env_non_empty("SOURCE_URL") {
            self.source_url = url;
        }
        if let Some(url) = env_non_empty("DEST_RAW_URL") {
            self.destination = DestinationInput::Remote(url);
        }
        if let Some(path) = env_non_empty("DEST_LOCAL_PATH") {
            self.destination = DestinationInput::Local(PathBuf::from(path));
        }
        if let Some(path) = env_non_empty("DEST_REPO_PATH") {
            self.dest_repo_path = path;
        }
        if let Some(msg) = env_non_empty("COMMIT_MESSAGE") {
            self.commit_message = msg;
        }
        if let Some(path) = env_non_empty("OUTPUT_LOCAL_PATH") {
            self.output_local_path = PathBuf::from(path);
        }
    }

    pub fn wanted(&self) -> impl Iterator<Item = &str> {
        self.table.rules.iter().map(|r| r.name.as_str())
    }

    pub fn fetch_source(&self) -> Result<String> {
        fetch_text(&self.source_url, Duration::from_secs(PLAYLIST_TIMEOUT_SECS))
            .context("source playlist fetch failed")
    }

    pub fn fetch_destination(&self) -> Result<String> {
        match &self.destination {
            DestinationInput::Remote(url) => {
                fetch_text(url, Duration::from_secs(PLAYLIST_TIMEOUT_SECS))
                    .context("destination playlist fetch failed")
            }
            DestinationInput::Local(path) => fs::read_to_string(path)
                .with_context(|| format!("read destination {}", path.display())),
        }
    }

    /// Picks the best source URL per wanted channel and rewrites `dest`.
    pub fn sync(&self, source: &str, dest: &str) -> SyncResult {
        let picked = self.table.pick_urls(&parse_entries(source));
        let rewritten = rewrite_playlist(dest, &self.table, &picked, self.mode);
        SyncResult { picked, rewritten }
    }
}

#[derive(Debug, Clone)]
pub struct SyncResult {
    pub picked: HashMap<String, Pick>,
    pub rewritten: Rewritten,
}

fn channel_rule(entry: &ChannelEntry) -> Result<ChannelRule, ConfigError> {
    let mut rule = ChannelRule::new(entry.name.clone())
        .with_aliases(&entry.dest_aliases)
        .with_source_patterns(compile_patterns(&entry.source_patterns)?);
    rule.dest_patterns = compile_patterns(&entry.dest_patterns)?;
    rule.require_source_word = entry
        .require_source_word
        .as_deref()
        .map(normalize_name)
        .filter(|w| !w.is_empty());
    rule.region_guard = entry
        .region_guard
        .as_ref()
        .map(|g| {
            Ok::<_, ConfigError>(RegionGuard {
                foreign: compile_pattern(&g.foreign)?,
                required: compile_pattern(&g.required)?,
            })
        })
        .transpose()?;
    Ok(rule)
}
