use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_TIMEZONE: &str = "Asia/Baghdad";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing {0}")]
    MissingCredential(&'static str),
    #[error("invalid FORCE_DATE: {0}")]
    InvalidForcedDate(String),
    #[error("invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("unknown timezone {0:?}")]
    UnknownTimezone(String),
    #[error("unknown playlist job {0:?}")]
    UnknownJob(String),
}

/// Digest config as written on disk. Every key is optional; an absent list
/// behaves like an empty one.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DigestDocument {
    pub timezone: Option<String>,
    pub exclude_if_league_matches: Vec<String>,
    pub exclude_if_team_matches: Vec<String>,
    pub allowed_competitions: Vec<CompetitionEntry>,
    pub allowed_leagues: Vec<String>,
    pub channel_priority_patterns: Vec<String>,
    pub league_channels: Vec<LeagueChannelEntry>,
    pub tv_preferred_countries: Vec<String>,
    pub broadcaster_map: Vec<BroadcasterEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompetitionEntry {
    pub name: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeagueChannelEntry {
    pub if_league: Option<String>,
    #[serde(default)]
    pub candidates: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BroadcasterEntry {
    pub pattern: String,
    pub channel: String,
}

#[derive(Debug, Clone)]
pub struct CompetitionMatcher {
    pub name: Option<Regex>,
    pub country: Option<Regex>,
}

#[derive(Debug, Clone)]
pub struct LeagueChannels {
    pub league: Regex,
    pub candidates: Vec<String>,
}

/// Immutable snapshot the digest pipeline runs against.
#[derive(Debug, Clone)]
pub struct DigestConfig {
    pub timezone: Tz,
    pub exclude_leagues: Vec<Regex>,
    pub exclude_teams: Vec<Regex>,
    pub allowed_competitions: Vec<CompetitionMatcher>,
    pub allowed_leagues: Vec<Regex>,
    pub channel_priority: Vec<Regex>,
    pub league_channels: Vec<LeagueChannels>,
    pub preferred_tv_countries: Vec<Regex>,
    pub broadcaster_map: Vec<(Regex, String)>,
}

impl DigestConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read digest config {}", path.display()))?;
        Self::from_toml_str(&raw).with_context(|| format!("parse {}", path.display()))
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let doc: DigestDocument = toml::from_str(raw).context("invalid digest config toml")?;
        Ok(Self::from_document(doc)?)
    }

    pub fn from_document(doc: DigestDocument) -> Result<Self, ConfigError> {
        let tz_name = doc
            .timezone
            .as_deref()
            .and_then(non_empty)
            .unwrap_or(DEFAULT_TIMEZONE);
        let timezone = tz_name
            .parse::<Tz>()
            .map_err(|_| ConfigError::UnknownTimezone(tz_name.to_string()))?;

        let allowed_competitions = doc
            .allowed_competitions
            .iter()
            .map(|entry| {
                Ok(CompetitionMatcher {
                    name: compile_optional(entry.name.as_deref())?,
                    country: compile_optional(entry.country.as_deref())?,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let mut league_channels = Vec::new();
        for rule in &doc.league_channels {
            let Some(pattern) = rule.if_league.as_deref().and_then(non_empty) else {
                continue;
            };
            league_channels.push(LeagueChannels {
                league: compile_pattern(pattern)?,
                candidates: rule.candidates.clone(),
            });
        }

        let broadcaster_map = doc
            .broadcaster_map
            .iter()
            .map(|entry| Ok((compile_pattern(&entry.pattern)?, entry.channel.clone())))
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self {
            timezone,
            exclude_leagues: compile_patterns(&doc.exclude_if_league_matches)?,
            exclude_teams: compile_patterns(&doc.exclude_if_team_matches)?,
            allowed_competitions,
            allowed_leagues: compile_patterns(&doc.allowed_leagues)?,
            channel_priority: compile_patterns(&doc.channel_priority_patterns)?,
            league_channels,
            preferred_tv_countries: compile_patterns(&doc.tv_preferred_countries)?,
            broadcaster_map,
        })
    }
}

#[derive(Debug, Clone)]
pub struct DigestCredentials {
    pub apifootball_key: String,
    pub sportmonks_token: Option<String>,
}

impl DigestCredentials {
    pub fn from_env() -> Result<Self, ConfigError> {
        let apifootball_key = env_non_empty("APIFOOTBALL_KEY")
            .ok_or(ConfigError::MissingCredential("APIFOOTBALL_KEY"))?;
        Ok(Self {
            apifootball_key,
            sportmonks_token: env_non_empty("SPORTMONKS_TOKEN"),
        })
    }
}

/// The local calendar day to build: `FORCE_DATE` when given, today in `tz` otherwise.
pub fn resolve_digest_date(forced: Option<&str>, tz: Tz) -> Result<NaiveDate, ConfigError> {
    match forced.and_then(non_empty) {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| ConfigError::InvalidForcedDate(raw.to_string())),
        None => Ok(Utc::now().with_timezone(&tz).date_naive()),
    }
}

/// Patterns are always case-insensitive.
pub fn compile_pattern(pattern: &str) -> Result<Regex, ConfigError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })
}

pub fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>, ConfigError> {
    patterns.iter().map(|p| compile_pattern(p)).collect()
}

fn compile_optional(pattern: Option<&str>) -> Result<Option<Regex>, ConfigError> {
    pattern.and_then(non_empty).map(compile_pattern).transpose()
}

pub fn env_non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|v| {
            let t = v.trim().to_ascii_lowercase();
            !(t.is_empty() || t == "0" || t == "false" || t == "off" || t == "no")
        })
        .unwrap_or(default)
}

pub(crate) fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}
