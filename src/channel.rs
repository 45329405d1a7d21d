use std::collections::HashSet;

use chrono::NaiveDate;
use regex::Regex;

use crate::config::{DigestConfig, LeagueChannels};
use crate::sportmonks::{ForeignFixture, TvLookup, TvStation};

pub const DEFAULT_CHANNEL: &str = "beIN Sports 1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedChannel {
    /// Display name used by the app.
    pub channel: String,
    /// Raw broadcaster name reported by the TV provider, when one was found.
    pub source: Option<String>,
}

/// Resolves a channel per accepted fixture. Secondary-provider fixtures are
/// fetched once up front; any lookup error degrades to the league fallback.
pub struct ChannelResolver<'a> {
    cfg: &'a DigestConfig,
    lookup: &'a dyn TvLookup,
    foreign: Vec<ForeignFixture>,
}

impl<'a> ChannelResolver<'a> {
    pub fn new(cfg: &'a DigestConfig, lookup: &'a dyn TvLookup, date: NaiveDate) -> Self {
        let foreign = lookup.fixtures_for_date(date).unwrap_or_else(|err| {
            tracing::debug!("tv provider fixtures unavailable: {err:#}");
            Vec::new()
        });
        tracing::debug!(count = foreign.len(), "tv provider fixtures");
        Self {
            cfg,
            lookup,
            foreign,
        }
    }

    pub fn resolve(&self, home: &str, away: &str, league: &str) -> ResolvedChannel {
        let mut source = None;
        let mut mapped = None;

        match match_foreign_fixture(home, away, &self.foreign) {
            Some(id) => {
                let stations = self.lookup.tv_stations(id).unwrap_or_else(|err| {
                    tracing::debug!(fixture = id, "tv stations unavailable: {err:#}");
                    Vec::new()
                });
                tracing::debug!(fixture = id, count = stations.len(), "tv stations");
                if let Some(station) = pick_station(&stations, &self.cfg.preferred_tv_countries) {
                    mapped = map_broadcaster(&station.name, &self.cfg.broadcaster_map);
                    source = Some(station.name.clone()).filter(|s| !s.is_empty());
                }
            }
            None if !self.foreign.is_empty() => {
                tracing::debug!("no tv provider match for {home} vs {away}");
            }
            None => {}
        }

        let channel = mapped.unwrap_or_else(|| fallback_channel(league, self.cfg));
        ResolvedChannel { channel, source }
    }
}

/// Exact membership of both names first, then substring containment over the
/// joined participant names.
pub fn match_foreign_fixture(home: &str, away: &str, foreign: &[ForeignFixture]) -> Option<u64> {
    let h = home.trim().to_lowercase();
    let a = away.trim().to_lowercase();
    if h.is_empty() || a.is_empty() {
        return None;
    }
    foreign
        .iter()
        .find(|fx| fx.teams.contains(&h) && fx.teams.contains(&a))
        .or_else(|| {
            foreign.iter().find(|fx| {
                let joined = fx.teams.join(" ");
                joined.contains(&h) && joined.contains(&a)
            })
        })
        .map(|fx| fx.id)
}

/// Preference patterns are tried in order, each scanning stations in source
/// order; with no country match the first station is used.
pub fn pick_station<'s>(stations: &'s [TvStation], preferred: &[Regex]) -> Option<&'s TvStation> {
    preferred
        .iter()
        .find_map(|rx| stations.iter().find(|st| rx.is_match(&st.country)))
        .or_else(|| stations.first())
}

pub fn map_broadcaster(name: &str, map: &[(Regex, String)]) -> Option<String> {
    if name.is_empty() {
        return None;
    }
    map.iter()
        .find(|(rx, _)| rx.is_match(name))
        .map(|(_, target)| target.clone())
}

pub fn collect_candidates(league: &str, rules: &[LeagueChannels]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for rule in rules.iter().filter(|r| r.league.is_match(league)) {
        for cand in &rule.candidates {
            if seen.insert(cand.as_str()) {
                out.push(cand.clone());
            }
        }
    }
    out
}

pub fn apply_priority(candidates: &[String], priority: &[Regex]) -> Option<String> {
    priority
        .iter()
        .find_map(|rx| candidates.iter().find(|c| rx.is_match(c)))
        .or_else(|| candidates.first())
        .cloned()
}

pub fn fallback_channel(league: &str, cfg: &DigestConfig) -> String {
    let candidates = collect_candidates(league, &cfg.league_channels);
    apply_priority(&candidates, &cfg.channel_priority)
        .unwrap_or_else(|| DEFAULT_CHANNEL.to_string())
}
