use anyhow::{Context, Result};
use chrono::NaiveDate;
use reqwest::header::USER_AGENT;
use serde::Deserialize;
use serde_json::Value;

use crate::http_client::http_client;

const APIFOOTBALL_FIXTURES_URL: &str = "https://v3.football.api-sports.io/fixtures";

/// One match as reported by the primary provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixture {
    pub home: String,
    pub away: String,
    pub league: String,
    pub league_country: String,
    /// Raw provider timestamp; parsed (and possibly rejected) by the filter.
    pub kickoff: Option<String>,
    pub status_short: String,
    pub home_goals: Option<u32>,
    pub away_goals: Option<u32>,
}

pub trait FixtureSource {
    fn fixtures_for_date(&self, date: NaiveDate) -> Result<Vec<Fixture>>;
}

/// api-football.com v3. Any transport or status error is returned to the
/// caller, which treats it as fatal.
pub struct ApiFootball {
    api_key: String,
    timezone: String,
}

impl ApiFootball {
    pub fn new(api_key: impl Into<String>, timezone: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            timezone: timezone.into(),
        }
    }
}

impl FixtureSource for ApiFootball {
    fn fixtures_for_date(&self, date: NaiveDate) -> Result<Vec<Fixture>> {
        let client = http_client()?;
        let date_iso = date.format("%Y-%m-%d").to_string();
        let body = client
            .get(APIFOOTBALL_FIXTURES_URL)
            .header(USER_AGENT, "Mozilla/5.0")
            .header("x-apisports-key", &self.api_key)
            .query(&[("date", date_iso.as_str()), ("timezone", self.timezone.as_str())])
            .send()
            .context("fixtures request failed")?
            .error_for_status()
            .context("fixtures request rejected")?
            .text()
            .context("failed reading fixtures body")?;
        let fixtures = parse_apifootball_fixtures_json(&body)?;
        tracing::debug!(
            date = %date_iso,
            tz = %self.timezone,
            count = fixtures.len(),
            "api-football fixtures"
        );
        Ok(fixtures)
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    response: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiFixture {
    fixture: ApiFixtureInfo,
    league: ApiLeague,
    teams: ApiTeams,
    goals: ApiGoals,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiFixtureInfo {
    date: Option<String>,
    status: ApiStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiStatus {
    short: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiLeague {
    name: Option<String>,
    country: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiTeams {
    home: ApiTeam,
    away: ApiTeam,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiTeam {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiGoals {
    home: Option<Value>,
    away: Option<Value>,
}

/// Elements that do not have the expected shape are skipped, not fatal.
pub fn parse_apifootball_fixtures_json(raw: &str) -> Result<Vec<Fixture>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let data: ApiResponse = serde_json::from_str(trimmed).context("invalid api-football json")?;

    let mut out = Vec::with_capacity(data.response.len());
    for item in data.response {
        match serde_json::from_value::<ApiFixture>(item) {
            Ok(fx) => out.push(fixture_from_api(fx)),
            Err(err) => tracing::debug!("skipping malformed fixture: {err}"),
        }
    }
    Ok(out)
}

fn fixture_from_api(fx: ApiFixture) -> Fixture {
    Fixture {
        home: fx.teams.home.name.unwrap_or_default(),
        away: fx.teams.away.name.unwrap_or_default(),
        league: fx.league.name.unwrap_or_default(),
        league_country: fx.league.country.unwrap_or_default(),
        kickoff: fx
            .fixture
            .date
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
        status_short: fx.fixture.status.short.unwrap_or_default(),
        home_goals: goal_count(fx.goals.home.as_ref()),
        away_goals: goal_count(fx.goals.away.as_ref()),
    }
}

// Only integral JSON numbers count as a goal tally.
fn goal_count(value: Option<&Value>) -> Option<u32> {
    value
        .and_then(|v| v.as_u64())
        .and_then(|n| u32::try_from(n).ok())
}
