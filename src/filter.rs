use std::fmt;

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use regex::Regex;

use crate::config::DigestConfig;
use crate::fixtures::Fixture;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    ExcludedLeague,
    ExcludedTeam,
    LeagueNotAllowed,
    MissingKickoff,
    UnparsableKickoff(String),
    OutsideLocalDay(DateTime<Utc>),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExcludedLeague => write!(f, "league excluded (youth/women/reserve)"),
            Self::ExcludedTeam => write!(f, "team excluded (youth/women/reserve)"),
            Self::LeagueNotAllowed => write!(f, "league not allowed"),
            Self::MissingKickoff => write!(f, "missing kickoff"),
            Self::UnparsableKickoff(raw) => write!(f, "unparsable kickoff {raw:?}"),
            Self::OutsideLocalDay(at) => write!(f, "outside local day ({})", at.to_rfc3339()),
        }
    }
}

/// The local calendar day a digest is built for, as a half-open UTC window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalDay {
    pub date: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl LocalDay {
    pub fn new(date: NaiveDate, tz: Tz) -> Self {
        let next = date.checked_add_days(Days::new(1)).unwrap_or(date);
        Self {
            date,
            start: local_midnight(date, tz),
            end: local_midnight(next, tz),
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

// Zones that skip midnight on a DST switch start the day at the first valid instant.
fn local_midnight(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let midnight = date.and_time(chrono::NaiveTime::MIN);
    (0..=2)
        .find_map(|h| {
            tz.from_local_datetime(&(midnight + chrono::Duration::hours(h)))
                .earliest()
        })
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}

/// Runs the filter stages in order and stops at the first rejection. On
/// acceptance the parsed kickoff is handed back.
pub fn check_fixture(
    fixture: &Fixture,
    cfg: &DigestConfig,
    day: &LocalDay,
) -> Result<DateTime<Utc>, Rejection> {
    if any_match(&fixture.league, &cfg.exclude_leagues) {
        return Err(Rejection::ExcludedLeague);
    }
    if any_match(&fixture.home, &cfg.exclude_teams) || any_match(&fixture.away, &cfg.exclude_teams)
    {
        return Err(Rejection::ExcludedTeam);
    }
    if !league_allowed(cfg, &fixture.league, &fixture.league_country) {
        return Err(Rejection::LeagueNotAllowed);
    }
    let raw = fixture
        .kickoff
        .as_deref()
        .ok_or(Rejection::MissingKickoff)?;
    let kickoff =
        parse_kickoff(raw).ok_or_else(|| Rejection::UnparsableKickoff(raw.to_string()))?;
    if !day.contains(kickoff) {
        return Err(Rejection::OutsideLocalDay(kickoff));
    }
    Ok(kickoff)
}

pub fn any_match(text: &str, patterns: &[Regex]) -> bool {
    patterns.iter().any(|rx| rx.is_match(text))
}

/// Name+country pairs take precedence; the name-only list is consulted only
/// when no pair is configured. Nothing configured allows nothing.
pub fn league_allowed(cfg: &DigestConfig, league: &str, country: &str) -> bool {
    if !cfg.allowed_competitions.is_empty() {
        return cfg.allowed_competitions.iter().any(|comp| {
            let ok_name = comp.name.as_ref().is_none_or(|rx| rx.is_match(league));
            let ok_country = comp.country.as_ref().is_none_or(|rx| rx.is_match(country));
            ok_name && ok_country
        });
    }
    any_match(league, &cfg.allowed_leagues)
}

pub fn parse_kickoff(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    // Offset-less timestamps are taken as UTC.
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}
