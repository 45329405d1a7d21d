use std::fs;
use std::path::PathBuf;

use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use serde_json::Value;

use matchday_feeds::config::DigestConfig;
use matchday_feeds::digest::{run_digest, write_digest};
use matchday_feeds::fixtures::{Fixture, FixtureSource, parse_apifootball_fixtures_json};
use matchday_feeds::sportmonks::{
    ForeignFixture, NoTvLookup, TvLookup, TvStation, parse_sportmonks_fixtures_json,
    parse_sportmonks_tvstations_json,
};
use matchday_feeds::status::MatchStatus;

const CONFIG: &str = r#"
timezone = "Asia/Baghdad"
exclude_if_league_matches = ['\bu(19|21|23)\b']
exclude_if_team_matches = ['\bwomen\b']
channel_priority_patterns = ["^SSC"]
tv_preferred_countries = ["qatar"]

[[allowed_competitions]]
name = "^premier league"
country = "^england$"

[[league_channels]]
if_league = "premier league"
candidates = ["beIN Sports 2", "SSC 1"]

[[broadcaster_map]]
pattern = 'bein\s*sports?\s*(hd)?\s*1\b'
channel = "beIN Sports 1"
"#;

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn may_first() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 1).expect("valid date")
}

struct FileSource;

impl FixtureSource for FileSource {
    fn fixtures_for_date(&self, _date: NaiveDate) -> Result<Vec<Fixture>> {
        parse_apifootball_fixtures_json(&read_fixture("apifootball_fixtures.json"))
    }
}

struct DownSource;

impl FixtureSource for DownSource {
    fn fixtures_for_date(&self, _date: NaiveDate) -> Result<Vec<Fixture>> {
        Err(anyhow!("http 499"))
    }
}

struct FileTv;

impl TvLookup for FileTv {
    fn fixtures_for_date(&self, _date: NaiveDate) -> Result<Vec<ForeignFixture>> {
        parse_sportmonks_fixtures_json(&read_fixture("sportmonks_fixtures.json"))
    }

    fn tv_stations(&self, fixture_id: u64) -> Result<Vec<TvStation>> {
        assert_eq!(fixture_id, 19134470);
        parse_sportmonks_tvstations_json(&read_fixture("sportmonks_tvstations.json"))
    }
}

struct DownTv;

impl TvLookup for DownTv {
    fn fixtures_for_date(&self, _date: NaiveDate) -> Result<Vec<ForeignFixture>> {
        Err(anyhow!("http 401: unauthorized"))
    }

    fn tv_stations(&self, _fixture_id: u64) -> Result<Vec<TvStation>> {
        Err(anyhow!("http 401: unauthorized"))
    }
}

#[test]
fn builds_sorted_digest_with_tv_channel() {
    let cfg = DigestConfig::from_toml_str(CONFIG).expect("config");
    let digest = run_digest(&FileSource, &FileTv, &cfg, may_first()).expect("digest");

    assert_eq!(digest.date, "2024-05-01");
    assert_eq!(digest.matches.len(), 2, "u21 fixture is excluded");

    let live = &digest.matches[0];
    assert_eq!(live.home, "Club C");
    assert_eq!(live.start_utc, "2024-05-01T13:30:00Z");
    assert_eq!(live.status, MatchStatus::Live);
    assert_eq!(live.status_label, "جارية الآن");
    assert_eq!(live.score, None);
    assert_eq!(live.channel, "SSC 1");
    assert_eq!(live.channel_src, None);

    let done = &digest.matches[1];
    assert_eq!(done.id, "ClubA-ClubB-2024-05-01");
    assert_eq!(done.start_utc, "2024-05-01T18:00:00Z");
    assert_eq!(done.status, MatchStatus::Finished);
    assert_eq!(done.score.as_deref(), Some("2-1"));
    assert_eq!(done.channel, "beIN Sports 1");
    assert_eq!(done.channel_src.as_deref(), Some("beIN Sports HD 1"));
}

#[test]
fn tv_provider_failure_falls_back_to_league_channel() {
    let cfg = DigestConfig::from_toml_str(CONFIG).expect("config");
    let digest = run_digest(&FileSource, &DownTv, &cfg, may_first()).expect("digest");
    assert_eq!(digest.matches.len(), 2);
    for m in &digest.matches {
        assert_eq!(m.channel, "SSC 1");
        assert!(m.channel_src.is_none());
    }
}

#[test]
fn primary_provider_failure_is_fatal() {
    let cfg = DigestConfig::from_toml_str(CONFIG).expect("config");
    let err = run_digest(&DownSource, &NoTvLookup, &cfg, may_first()).expect_err("must fail");
    assert!(format!("{err:#}").contains("http 499"));
}

#[test]
fn other_local_day_is_empty() {
    let cfg = DigestConfig::from_toml_str(CONFIG).expect("config");
    let next = NaiveDate::from_ymd_opt(2024, 5, 2).expect("valid date");
    let digest = run_digest(&FileSource, &NoTvLookup, &cfg, next).expect("digest");
    assert_eq!(digest.date, "2024-05-02");
    assert!(digest.matches.is_empty());
}

#[test]
fn no_allow_list_yields_empty_digest() {
    let cfg = DigestConfig::from_toml_str("").expect("config");
    let digest = run_digest(&FileSource, &FileTv, &cfg, may_first()).expect("digest");
    assert!(digest.matches.is_empty());
}

#[test]
fn written_digest_has_expected_shape() {
    let cfg = DigestConfig::from_toml_str(CONFIG).expect("config");
    let digest = run_digest(&FileSource, &NoTvLookup, &cfg, may_first()).expect("digest");

    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("matches").join("today.json");
    write_digest(&out, &digest).expect("write");
    // Second write replaces the first.
    write_digest(&out, &digest).expect("rewrite");

    let json: Value = serde_json::from_str(&fs::read_to_string(&out).expect("read")).expect("json");
    assert_eq!(json["date"], "2024-05-01");
    let matches = json["matches"].as_array().expect("matches array");
    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0]["status"], "LIVE");
    assert!(matches[0]["score"].is_null());
    assert!(matches[0]["channel_src"].is_null());
    assert_eq!(matches[1]["status"], "FT");
    assert_eq!(matches[1]["status_label"], "انتهت");
    assert_eq!(matches[1]["score"], "2-1");
    assert_eq!(matches[1]["league_country"], "England");
    assert!(!dir.path().join("matches").join("today.json.tmp").exists());
}
