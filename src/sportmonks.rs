use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Deserialize;

use crate::http_client::http_client;

const SPORTMONKS_API_BASE: &str = "https://api.sportmonks.com/v3/football";

/// A secondary-provider fixture, reduced to what cross-referencing needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignFixture {
    pub id: u64,
    /// Lowercased, trimmed participant names.
    pub teams: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TvStation {
    pub name: String,
    pub country: String,
}

/// Broadcast metadata lookups. Callers treat every error as "no channel".
pub trait TvLookup {
    fn fixtures_for_date(&self, date: NaiveDate) -> Result<Vec<ForeignFixture>>;
    fn tv_stations(&self, fixture_id: u64) -> Result<Vec<TvStation>>;
}

pub struct Sportmonks {
    token: String,
}

impl Sportmonks {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<String> {
        let client = http_client()?;
        let resp = client
            .get(url)
            .header(AUTHORIZATION, &self.token)
            .header(ACCEPT, "application/json")
            .query(query)
            .send()
            .context("sportmonks request failed")?;
        let status = resp.status();
        let body = resp.text().context("failed reading sportmonks body")?;
        if !status.is_success() {
            let head: String = body.chars().take(200).collect();
            return Err(anyhow!("http {status}: {head}"));
        }
        Ok(body)
    }
}

impl TvLookup for Sportmonks {
    fn fixtures_for_date(&self, date: NaiveDate) -> Result<Vec<ForeignFixture>> {
        let url = format!("{SPORTMONKS_API_BASE}/fixtures/date/{}", date.format("%Y-%m-%d"));
        let body = self.get(&url, &[("include", "participants;league;country")])?;
        parse_sportmonks_fixtures_json(&body)
    }

    fn tv_stations(&self, fixture_id: u64) -> Result<Vec<TvStation>> {
        let url = format!("{SPORTMONKS_API_BASE}/tv-stations/fixtures/{fixture_id}");
        let body = self.get(&url, &[])?;
        parse_sportmonks_tvstations_json(&body)
    }
}

/// Stand-in used when no token is configured.
pub struct NoTvLookup;

impl TvLookup for NoTvLookup {
    fn fixtures_for_date(&self, _date: NaiveDate) -> Result<Vec<ForeignFixture>> {
        Ok(Vec::new())
    }

    fn tv_stations(&self, _fixture_id: u64) -> Result<Vec<TvStation>> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct SmFixture {
    id: u64,
    #[serde(default)]
    participants: Vec<SmNamed>,
}

#[derive(Debug, Default, Deserialize)]
struct SmNamed {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SmStation {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    country: Option<SmNamed>,
}

pub fn parse_sportmonks_fixtures_json(raw: &str) -> Result<Vec<ForeignFixture>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let env: Envelope<SmFixture> =
        serde_json::from_str(trimmed).context("invalid sportmonks fixtures json")?;
    Ok(env
        .data
        .into_iter()
        .map(|fx| ForeignFixture {
            id: fx.id,
            teams: fx
                .participants
                .into_iter()
                .map(|p| p.name.unwrap_or_default().trim().to_lowercase())
                .collect(),
        })
        .collect())
}

pub fn parse_sportmonks_tvstations_json(raw: &str) -> Result<Vec<TvStation>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let env: Envelope<SmStation> =
        serde_json::from_str(trimmed).context("invalid sportmonks tv-stations json")?;
    Ok(env
        .data
        .into_iter()
        .map(|st| TvStation {
            name: st.name.unwrap_or_default(),
            country: st.country.and_then(|c| c.name).unwrap_or_default(),
        })
        .collect())
}
