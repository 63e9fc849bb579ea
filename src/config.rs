// SPDX-License-Identifier: MIT
//
// User configuration, read once at startup from `~/.tilde/config.toml`.
//
//   banner = "tilde -- version 0.1.0"   # welcome banner text
//   filler = "~"                        # glyph for empty rows
//
//   [input]
//   timeout_ms = 100                    # idle and inter-byte timeout
//
//   [log]
//   level = "info"                      # EnvFilter directive
//   file = "/tmp/tilde.log"             # omit to disable logging
//
// Every key is optional. A missing file means all defaults; a file that
// does not parse is an error, reported before the terminal is touched.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use tilde_screen::view::{DEFAULT_FILLER, View};
use tilde_term::terminal::RawModeConfig;

/// Shortest accepted input timeout. Anything lower turns the idle wait
/// into a busy loop.
const MIN_TIMEOUT_MS: u64 = 10;

/// Longest accepted input timeout, the most `VTIME` can express.
const MAX_TIMEOUT_MS: u64 = 25_500;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Text centered on the middle row when there is no content.
    pub banner: String,
    /// Glyph drawn at the start of empty rows.
    pub filler: String,
    pub input: InputConfig,
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            banner: concat!("tilde -- version ", env!("CARGO_PKG_VERSION")).to_string(),
            filler: DEFAULT_FILLER.to_string(),
            input: InputConfig::default(),
            log: LogConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// How long to wait for a key, and for each byte of an escape sequence.
    pub timeout_ms: u64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self { timeout_ms: 100 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter when `TILDE_LOG` is unset.
    pub level: String,
    /// Log destination. No file, no logging: stdout belongs to the screen.
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl Config {
    /// `$HOME/.tilde/config.toml`, if `HOME` is set.
    pub fn default_path() -> Option<PathBuf> {
        std::env::var_os("HOME")
            .filter(|home| !home.is_empty())
            .map(|home| PathBuf::from(home).join(".tilde").join("config.toml"))
    }

    /// Load from the default path, falling back to defaults.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load from `path`. A file that does not exist yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The input timeout, kept within what the terminal can honor.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.input.timeout_ms.clamp(MIN_TIMEOUT_MS, MAX_TIMEOUT_MS))
    }

    /// Raw mode settings with `VTIME` derived from the input timeout.
    pub fn raw_mode(&self) -> RawModeConfig {
        RawModeConfig::with_timeout(self.timeout())
    }

    /// Banner and filler for the screen.
    pub fn view(&self) -> View {
        View::new(self.banner.clone(), self.filler.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(text: &str) -> Config {
        toml::from_str(text).unwrap()
    }

    #[test]
    fn defaults() {
        let c = Config::default();
        assert!(c.banner.starts_with("tilde -- version "));
        assert_eq!(c.filler, "~");
        assert_eq!(c.input.timeout_ms, 100);
        assert_eq!(c.log.level, "info");
        assert_eq!(c.log.file, None);
    }

    #[test]
    fn empty_file_is_defaults() {
        assert_eq!(parse(""), Config::default());
    }

    #[test]
    fn full_file() {
        let c = parse(
            r#"
            banner = "hello"
            filler = "."

            [input]
            timeout_ms = 250

            [log]
            level = "debug"
            file = "/tmp/tilde.log"
            "#,
        );
        assert_eq!(c.banner, "hello");
        assert_eq!(c.filler, ".");
        assert_eq!(c.input.timeout_ms, 250);
        assert_eq!(c.log.level, "debug");
        assert_eq!(c.log.file, Some(PathBuf::from("/tmp/tilde.log")));
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let c = parse("[log]\nfile = \"t.log\"\n");
        assert_eq!(c.log.level, "info");
        assert_eq!(c.input, InputConfig::default());
        assert_eq!(c.filler, "~");
    }

    #[test]
    fn wrong_type_is_rejected() {
        assert!(toml::from_str::<Config>("[input]\ntimeout_ms = \"fast\"\n").is_err());
    }

    #[test]
    fn timeout_is_clamped() {
        let mut c = Config::default();
        assert_eq!(c.timeout(), Duration::from_millis(100));
        c.input.timeout_ms = 0;
        assert_eq!(c.timeout(), Duration::from_millis(MIN_TIMEOUT_MS));
        c.input.timeout_ms = u64::MAX;
        assert_eq!(c.timeout(), Duration::from_millis(MAX_TIMEOUT_MS));
    }

    #[test]
    fn raw_mode_uses_deciseconds() {
        let mut c = Config::default();
        c.input.timeout_ms = 300;
        assert_eq!(c.raw_mode().timeout_ds, 3);
        assert_eq!(Config::default().raw_mode().timeout_ds, 1);
    }

    #[test]
    fn view_carries_banner_and_filler() {
        let c = parse("banner = \"b\"\nfiller = \"#\"\n");
        let view = c.view();
        assert_eq!(view.banner(), "b");
        assert_eq!(view.filler(), "#");
    }

    #[test]
    fn missing_file_is_defaults() {
        let path = std::env::temp_dir().join("tilde-no-such-dir").join("config.toml");
        assert_eq!(Config::load_from(&path).unwrap(), Config::default());
    }

    #[test]
    fn unparseable_file_is_parse_error() {
        let path = std::env::temp_dir().join(format!("tilde-bad-config-{}.toml", std::process::id()));
        fs::write(&path, "banner = [").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        fs::remove_file(&path).ok();

        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().starts_with("invalid config "));
    }

    #[test]
    fn directory_is_read_error() {
        let err = Config::load_from(&std::env::temp_dir()).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
