use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

const DEFAULT_FILTER: &str = "info";

/// Installs the stderr subscriber. `debug` forces debug level for the whole
/// crate; otherwise `RUST_LOG` applies, falling back to info.
pub fn init(debug: bool) {
    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(filter_for(debug, std::env::var("RUST_LOG").ok().as_deref()))
        .try_init();
}

fn filter_for(debug: bool, rust_log: Option<&str>) -> EnvFilter {
    if debug {
        return EnvFilter::new("debug");
    }
    rust_log
        .filter(|s| !s.trim().is_empty())
        .and_then(|s| EnvFilter::try_new(s).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}
