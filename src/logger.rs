use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Default verbosity when `RUST_LOG` is unset, blank or unparsable.
pub const DEFAULT_DIRECTIVE: &str = "channel_leads=info";

/// Install the global subscriber. Logs go to stderr so stdout keeps only the
/// run summary.
pub fn init() -> Result<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(rust_log.as_deref()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))?;
    Ok(())
}

/// `RUST_LOG` replaces the default outright, so it can lower verbosity as
/// well as raise it.
pub fn env_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .filter(|s| !s.trim().is_empty())
        .and_then(|s| EnvFilter::try_new(s).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVE))
}
