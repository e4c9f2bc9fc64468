//! Logging setup
//!
//! `RUST_LOG` wins when set. Otherwise core and CLI log at `info`, or `warn`
//! in quiet mode. Logs go to stderr unless `log_file` is configured.

use std::fs::OpenOptions;

use tracing_subscriber::EnvFilter;

use keyvault_core::Config;

fn default_directives(quiet: bool) -> String {
    let level = if quiet { "warn" } else { "info" };
    format!("keyvault_core={},keyvault={}", level, level)
}

/// Install the global subscriber
pub fn init_logging(config: &Config, quiet: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(quiet)));

    let Some(log_path) = &config.log_file else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_ansi(atty::is(atty::Stream::Stderr))
            .with_writer(std::io::stderr)
            .try_init();
        return;
    };

    let log_file = match OpenOptions::new().create(true).append(true).open(log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not open log file {:?}: {}", log_path, e);
            return;
        }
    };

    // Initialize file-based logging (ignore error if already initialized)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(log_file)
        .try_init();
}
