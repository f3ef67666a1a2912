//! Installation of the `tracing` subscriber used by the `sale-dashboard`
//! binary. Library code only emits events.

use strum_macros::Display;
use tracing::level_filters::LevelFilter;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Display, clap::ValueEnum)]
#[strum(serialize_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Builds the filter from `RUST_LOG`, falling back to `default_level` for
/// anything `RUST_LOG` does not mention.
pub fn env_filter(default_level: Level) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(default_level).into())
        .from_env_lossy()
}

/// Logs to stderr so that the rendered dashboard on stdout stays clean.
pub fn init(default_level: Level, format: LogFormat) -> Result<(), String> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(true)
        .with_line_number(true);
    match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
    .map_err(|e| format!("failed to install log subscriber: {e}"))
}
