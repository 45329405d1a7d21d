use std::path::Path;

use anyhow::{Context, Result};
use chrono::{NaiveDate, SecondsFormat};
use serde::Serialize;

use crate::channel::ChannelResolver;
use crate::config::DigestConfig;
use crate::filter::{LocalDay, check_fixture};
use crate::fixtures::{Fixture, FixtureSource};
use crate::publish::write_atomic;
use crate::sportmonks::TvLookup;
use crate::status::{MatchStatus, final_score};

const ID_NAME_CHARS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchRecord {
    pub id: String,
    pub home: String,
    pub away: String,
    pub league: String,
    pub league_country: String,
    pub channel_src: Option<String>,
    pub channel: String,
    pub start_utc: String,
    pub status: MatchStatus,
    pub status_label: String,
    pub score: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Digest {
    pub date: String,
    pub matches: Vec<MatchRecord>,
}

/// Fetch, filter, resolve and sort. A primary-provider error aborts the run;
/// the TV lookup never does.
pub fn run_digest(
    source: &dyn FixtureSource,
    lookup: &dyn TvLookup,
    cfg: &DigestConfig,
    date: NaiveDate,
) -> Result<Digest> {
    let fixtures = source
        .fixtures_for_date(date)
        .context("primary fixture provider failed")?;
    tracing::debug!(count = fixtures.len(), %date, "primary fixtures");
    let resolver = ChannelResolver::new(cfg, lookup, date);
    Ok(build_digest(&fixtures, cfg, date, &resolver))
}

pub fn build_digest(
    fixtures: &[Fixture],
    cfg: &DigestConfig,
    date: NaiveDate,
    resolver: &ChannelResolver<'_>,
) -> Digest {
    let day = LocalDay::new(date, cfg.timezone);
    let date_iso = date.format("%Y-%m-%d").to_string();

    let mut matches = Vec::new();
    for fx in fixtures {
        let kickoff = match check_fixture(fx, cfg, &day) {
            Ok(kickoff) => kickoff,
            Err(reason) => {
                tracing::debug!("drop {} vs {} [{}]: {reason}", fx.home, fx.away, fx.league);
                continue;
            }
        };

        let status = MatchStatus::from_short(&fx.status_short);
        let resolved = resolver.resolve(&fx.home, &fx.away, &fx.league);

        matches.push(MatchRecord {
            id: match_id(&fx.home, &fx.away, &date_iso),
            home: fx.home.clone(),
            away: fx.away.clone(),
            league: fx.league.clone(),
            league_country: fx.league_country.clone(),
            channel_src: resolved.source,
            channel: resolved.channel,
            start_utc: kickoff.to_rfc3339_opts(SecondsFormat::Secs, true),
            status,
            status_label: status.label().to_string(),
            score: final_score(status, fx.home_goals, fx.away_goals),
        });
    }

    // Uniform "...Z" formatting makes the string order chronological.
    matches.sort_by(|a, b| a.start_utc.cmp(&b.start_utc));

    Digest {
        date: date_iso,
        matches,
    }
}

pub fn match_id(home: &str, away: &str, date_iso: &str) -> String {
    let h: String = home.chars().take(ID_NAME_CHARS).collect();
    let a: String = away.chars().take(ID_NAME_CHARS).collect();
    format!("{h}-{a}-{date_iso}").replace(' ', "")
}

/// Replaces `path` in one rename so readers never see a half-written digest.
pub fn write_digest(path: &Path, digest: &Digest) -> Result<()> {
    let json = serde_json::to_string_pretty(digest).context("serialize digest")?;
    write_atomic(path, json.as_bytes())
}
