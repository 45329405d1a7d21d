use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use clap::builder::FalseyValueParser;

use matchday_feeds::logging;
use matchday_feeds::playlist_jobs::PlaylistJob;
use matchday_feeds::publish::{PublishTarget, publish};

/// Copies fresh stream URLs for the wanted channels of one job from the
/// source playlist into the destination playlist.
#[derive(Debug, Parser)]
#[command(name = "playlist_sync", version)]
struct Args {
    /// Job preset name (e.g. premierleague, dazn, match_football).
    job: String,

    /// Playlist job presets.
    #[arg(long, env = "PLAYLIST_JOBS", default_value = "config/playlists.toml")]
    jobs: PathBuf,

    /// Compute and print the result without publishing.
    #[arg(long)]
    dry_run: bool,

    #[arg(long, env = "DEBUG_PLAYLIST", value_parser = FalseyValueParser::new())]
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
            eprintln!("[x] Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let mut job = PlaylistJob::load(&args.jobs, &args.job)?;
    job.apply_env_overrides();
    let target = PublishTarget::from_env(
        &job.output_local_path,
        &job.dest_repo_path,
        &job.commit_message,
    );

    let source = job.fetch_source()?;
    let dest = job.fetch_destination()?;
    let result = job.sync(&source, &dest);

    tracing::info!("Picked from source:");
    for name in job.wanted() {
        let tag = if result.picked.contains_key(name) { "✓" } else { "x" };
        tracing::info!("  {tag} {name}");
    }
    for (name, outcome) in &result.rewritten.report.entries {
        tracing::info!("{name}: {outcome}");
    }

    if args.dry_run {
        print!("{}", result.rewritten.text);
        return Ok(());
    }

    let written = publish(&target, &result.rewritten.text)?;
    tracing::info!(
        changes = result.rewritten.report.changes(),
        "Updated {written}"
    );
    Ok(())
}
