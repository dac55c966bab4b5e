//! Log sink (C9): structured event stream (spec §6), one line per event,
//! readable by an external viewer. JSON when writing to a file, compact when
//! writing to a terminal -- the same split the corpus's server binaries make.

use std::path::Path;

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber. When `log_file` is given, events
/// are written there as newline-delimited JSON; otherwise they go to stderr
/// in compact form.
pub fn init(log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .with_writer(file)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .compact()
                .init();
        }
    }
    Ok(())
}
