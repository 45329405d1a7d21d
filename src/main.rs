use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use clap::builder::FalseyValueParser;

use matchday_feeds::config::{DigestConfig, DigestCredentials, resolve_digest_date};
use matchday_feeds::digest::{run_digest, write_digest};
use matchday_feeds::fixtures::ApiFootball;
use matchday_feeds::logging;
use matchday_feeds::sportmonks::{NoTvLookup, Sportmonks, TvLookup};

/// Builds the daily football digest (today's matches, channel and status).
#[derive(Debug, Parser)]
#[command(name = "matchday_feeds", version)]
struct Args {
    /// Digest rules (timezone, allow/exclude lists, channel tables).
    #[arg(long, env = "DIGEST_CONFIG", default_value = "config/digest.toml")]
    config: PathBuf,

    /// Output JSON path; always overwritten.
    #[arg(long, env = "DIGEST_OUT", default_value = "matches/today.json")]
    out: PathBuf,

    /// Build for this local date (YYYY-MM-DD) instead of today.
    #[arg(long, env = "FORCE_DATE")]
    date: Option<String>,

    /// Log every dropped fixture with its reason.
    #[arg(long, env = "DEBUG_MATCHES", value_parser = FalseyValueParser::new())]
    debug: bool,
}

fn main() -> ExitCode {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let args = Args::parse();
    logging::init(args.debug);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("ERROR: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let creds = DigestCredentials::from_env()?;
    let cfg = DigestConfig::load(&args.config)?;
    let date = resolve_digest_date(args.date.as_deref(), cfg.timezone)?;

    let source = ApiFootball::new(creds.apifootball_key, cfg.timezone.name());
    let lookup: Box<dyn TvLookup> = match creds.sportmonks_token {
        Some(token) => Box::new(Sportmonks::new(token)),
        None => {
            tracing::debug!("SPORTMONKS_TOKEN not set, skipping TV lookup");
            Box::new(NoTvLookup)
        }
    };

    let digest = run_digest(&source, lookup.as_ref(), &cfg, date)?;
    write_digest(&args.out, &digest)?;
    tracing::info!(
        "Wrote {} with {} matches.",
        args.out.display(),
        digest.matches.len()
    );
    Ok(())
}
