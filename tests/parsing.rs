use std::fs;
use std::path::PathBuf;

use matchday_feeds::fixtures::parse_apifootball_fixtures_json;
use matchday_feeds::sportmonks::{parse_sportmonks_fixtures_json, parse_sportmonks_tvstations_json};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

#[test]
fn parses_apifootball_fixture() {
    let raw = read_fixture("apifootball_fixtures.json");
    let rows = parse_apifootball_fixtures_json(&raw).expect("fixture should parse");
    assert_eq!(rows.len(), 3, "malformed element is skipped");
    assert_eq!(rows[0].home, "Club A");
    assert_eq!(rows[0].away, "Club B");
    assert_eq!(rows[0].league, "Premier League");
    assert_eq!(rows[0].league_country, "England");
    assert_eq!(rows[0].kickoff.as_deref(), Some("2024-05-01T21:00:00+03:00"));
    assert_eq!(rows[0].status_short, "FT");
    assert_eq!(rows[0].home_goals, Some(2));
    assert_eq!(rows[0].away_goals, Some(1));
    assert_eq!(rows[1].status_short, "2H");
    assert_eq!(rows[2].home_goals, None);
}

#[test]
fn empty_apifootball_body_is_no_fixtures() {
    assert!(parse_apifootball_fixtures_json("").expect("empty").is_empty());
    assert!(parse_apifootball_fixtures_json("null").expect("null").is_empty());
    assert!(parse_apifootball_fixtures_json(r#"{"errors":{"token":"bad"}}"#)
        .expect("no response key")
        .is_empty());
    assert!(parse_apifootball_fixtures_json("<html>").is_err());
}

#[test]
fn parses_sportmonks_fixtures() {
    let raw = read_fixture("sportmonks_fixtures.json");
    let rows = parse_sportmonks_fixtures_json(&raw).expect("fixture should parse");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].id, 19134470);
    assert_eq!(rows[0].teams, vec!["club a", "club b"]);
    assert_eq!(rows[1].teams, vec!["other", "else"]);
}

#[test]
fn parses_sportmonks_tv_stations() {
    let raw = read_fixture("sportmonks_tvstations.json");
    let rows = parse_sportmonks_tvstations_json(&raw).expect("fixture should parse");
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[1].name, "beIN Sports HD 1");
    assert_eq!(rows[1].country, "Qatar");
    assert_eq!(rows[2].country, "");
}
