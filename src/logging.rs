// SPDX-License-Identifier: MIT
//
// Log setup. The screen owns stdout and stderr is hidden behind it while
// raw mode is on, so log lines go to a file or nowhere.

use std::fs::{self, OpenOptions};
use std::sync::Mutex;

use anyhow::{Context, anyhow};
use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

/// Environment variable that overrides the configured level.
pub const LOG_ENV: &str = "TILDE_LOG";

/// The filter to use: `TILDE_LOG` if set and valid, else the configured
/// level.
pub fn filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// Install the global subscriber. Returns `false` when no log file is
/// configured and logging stays off.
pub fn init(config: &LogConfig) -> anyhow::Result<bool> {
    let Some(path) = config.file.as_deref().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(false);
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("cannot create log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter(config))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow!("cannot install log subscriber: {e}"))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::level_filters::LevelFilter;

    #[test]
    fn no_file_means_no_logging() {
        assert!(!init(&LogConfig::default()).unwrap());
    }

    #[test]
    fn empty_file_path_means_no_logging() {
        let config = LogConfig {
            file: Some(std::path::PathBuf::new()),
            ..LogConfig::default()
        };
        assert!(!init(&config).unwrap());
    }

    #[test]
    fn configured_level_is_used() {
        let config = LogConfig {
            level: "debug".to_string(),
            file: None,
        };
        if std::env::var_os(LOG_ENV).is_none() {
            assert_eq!(filter(&config).max_level_hint(), Some(LevelFilter::DEBUG));
        }
    }
}
