use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use clap::builder::FalseyValueParser;

use matchday_feeds::capture::{CaptureSlot, observe_lines, update_channel_url, validate_stream};
use matchday_feeds::config::env_bool;
use matchday_feeds::logging;
use matchday_feeds::publish::write_atomic;

/// Waits for the first m3u8 request URL in an observed request log and
/// points one playlist entry at it.
#[derive(Debug, Parser)]
#[command(name = "stream_capture", version)]
struct Args {
    /// Request log to read, one URL per line. Reads stdin when omitted.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Playlist whose entry gets the captured URL.
    #[arg(long, env = "TARGET_PLAYLIST", default_value = "bein.m3u")]
    playlist: PathBuf,

    /// Channel name searched for in the playlist (case-insensitive).
    #[arg(long, env = "CHANNEL_NAME", default_value = "bein sports 1")]
    channel: String,

    #[arg(long, env = "CAPTURE_TIMEOUT_SEC", default_value_t = 90)]
    timeout_sec: u64,

    #[arg(long, env = "DEBUG_CAPTURE", value_parser = FalseyValueParser::new())]
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
    let dry_run = env_bool("DRY_RUN", true);
    let slot = CaptureSlot::new();

    // The reader thread is left detached; it may still be blocked on stdin.
    let _reader = match &args.input {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
            observe_lines(BufReader::new(file), Arc::clone(&slot))
        }
        None => observe_lines(BufReader::new(io::stdin()), Arc::clone(&slot)),
    };

    tracing::info!("Waiting up to {}s for an m3u8 request...", args.timeout_sec);
    let Some(url) = slot.wait(Duration::from_secs(args.timeout_sec)) else {
        bail!("no m3u8 URL observed within {}s", args.timeout_sec);
    };
    tracing::info!("Captured {url}");

    if !validate_stream(&url) {
        tracing::warn!("captured URL did not validate, using it anyway");
    }

    let text = fs::read_to_string(&args.playlist)
        .with_context(|| format!("read {}", args.playlist.display()))?;
    let Some(updated) = update_channel_url(&text, &args.channel, &url)? else {
        tracing::info!("{} already points at the captured URL", args.channel);
        return Ok(());
    };

    if dry_run {
        tracing::info!("DRY_RUN set, not writing {}", args.playlist.display());
        return Ok(());
    }
    write_atomic(&args.playlist, updated.as_bytes())?;
    tracing::info!("Updated {} in {}", args.channel, args.playlist.display());
    Ok(())
}
