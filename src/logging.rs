use anyhow::{Context, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;

const DEFAULT_FILTER: &str = "tracklist=info";
const LOG_FILE_NAME: &str = "tracklist.log";

/// Sends tracing output to a log file, since stdout belongs to the terminal UI.
/// `RUST_LOG` overrides the default filter.
pub fn init(log_dir: &Path) -> Result<PathBuf> {
    let env_filter = EnvFilter::builder()
        .with_env_var("RUST_LOG")
        .try_from_env()
        .or_else(|_| EnvFilter::builder().parse(DEFAULT_FILTER))
        .context("failed to build log filter")?;

    let path = log_dir.join(LOG_FILE_NAME);
    let log_file =
        File::create(&path).with_context(|| format!("failed to create {}", path.display()))?;

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_ansi(false);

    let subscriber = tracing_subscriber::Registry::default()
        .with(env_filter)
        .with(file_layer);

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to install tracing subscriber")?;
    Ok(path)
}
