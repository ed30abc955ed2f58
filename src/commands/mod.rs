pub mod ask;
pub mod demo;
pub mod serve;

use std::path::Path;

use anyhow::Context;
use clap::ArgMatches;
use selfgrade_runtime::config::{Config, LogFormat, LoggingConfig};
use tracing_subscriber::EnvFilter;

/// Load configuration from `--config` (if given) plus the environment.
pub fn load_config(matches: &ArgMatches) -> anyhow::Result<Config> {
    let path = matches.get_one::<String>("config").map(Path::new);
    Config::load(path).context("failed to load configuration")
}

/// Initialize tracing for structured logging.
///
/// A non-empty `RUST_LOG` replaces the configured level. Logs go to stderr
/// so command output on stdout stays machine-readable.
pub fn init_tracing(logging: &LoggingConfig) {
    let filter = build_filter(&logging.level, std::env::var("RUST_LOG").ok().as_deref());

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let result = match logging.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.try_init(),
    };

    if let Err(e) = result {
        eprintln!("Failed to initialize logging: {}", e);
    }
}

fn build_filter(level: &str, rust_log: Option<&str>) -> EnvFilter {
    if let Some(directives) = rust_log.filter(|d| !d.trim().is_empty()) {
        if let Ok(filter) = EnvFilter::try_new(directives) {
            return filter;
        }
        eprintln!("Ignoring invalid RUST_LOG value: {}", directives);
    }

    let level = level.parse::<tracing::Level>().unwrap_or(tracing::Level::INFO);
    EnvFilter::default().add_directive(level.into())
}
