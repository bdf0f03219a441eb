//! CLI configuration.
//!
//! Optional TOML file at `--config` or `~/.config/esplink/config.toml`.
//! Values are layered flag > environment > file > built-in default; clap
//! already folds the environment into the flag values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use esplink_board::RetryPolicy;
use esplink_protocol::{
    CLI_CONNECT_TIMEOUT, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_RETRIES, DEFAULT_RETRY_DELAY,
};
use serde::{Deserialize, Serialize};

use crate::cli::Cli;

/// On-disk configuration. Every field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Connect timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default)]
    pub token: String,

    #[serde(default)]
    pub token_query: bool,

    #[serde(default = "default_retries")]
    pub retries: u32,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

fn default_host() -> String {
    DEFAULT_HOST.into()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_timeout_ms() -> u64 {
    CLI_CONNECT_TIMEOUT.as_millis() as u64
}

fn default_retries() -> u32 {
    DEFAULT_RETRIES
}

fn default_retry_delay_ms() -> u64 {
    DEFAULT_RETRY_DELAY.as_millis() as u64
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_ms: default_timeout_ms(),
            token: String::new(),
            token_query: false,
            retries: default_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl FileConfig {
    /// Reads `explicit`, or the default path if it exists.
    ///
    /// A missing default file yields built-in defaults; a missing explicit
    /// file is an error. Nothing is ever written.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        match explicit {
            Some(path) => Self::read(path),
            None => match default_path() {
                Some(path) if path.exists() => Self::read(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    fn read(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }
}

fn default_path() -> Option<PathBuf> {
    let home = std::env::var_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("esplink")
            .join("config.toml"),
    )
}

/// Effective settings for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub connect_timeout: Duration,
    pub token: String,
    pub token_query: bool,
    pub retry: RetryPolicy,
}

impl Settings {
    pub fn merge(cli: &Cli, file: FileConfig) -> Self {
        Self {
            host: cli.host.clone().unwrap_or(file.host),
            port: cli.port.unwrap_or(file.port),
            connect_timeout: Duration::from_millis(cli.timeout.unwrap_or(file.timeout_ms)),
            token: cli.token.clone().unwrap_or(file.token),
            token_query: cli.token_query || file.token_query,
            retry: RetryPolicy::new(
                cli.retries.unwrap_or(file.retries),
                Duration::from_millis(cli.retry_delay.unwrap_or(file.retry_delay_ms)),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Command;

    /// A command line with no flags given. Built directly so `ESP32_*`
    /// variables in the test environment cannot leak in.
    fn bare_cli() -> Cli {
        Cli {
            command: Command::Health,
            host: None,
            port: None,
            timeout: None,
            token: None,
            token_query: false,
            retries: None,
            retry_delay: None,
            config: None,
        }
    }

    #[test]
    fn defaults() {
        let config = FileConfig::default();
        assert_eq!(config.host, "esp32.local");
        assert_eq!(config.port, 3030);
        assert_eq!(config.timeout_ms, 5000);
        assert!(config.token.is_empty());
        assert!(!config.token_query);
        assert_eq!(config.retries, 3);
        assert_eq!(config.retry_delay_ms, 2000);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: FileConfig = toml::from_str(r#"host = "10.0.0.7""#).unwrap();
        assert_eq!(config.host, "10.0.0.7");
        assert_eq!(config.port, 3030);
        assert_eq!(config.retries, 3);
    }

    #[test]
    fn load_explicit_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "port = 4000\ntoken = \"abc\"\nretries = 1\n").unwrap();

        let config = FileConfig::load(Some(&path)).unwrap();
        assert_eq!(config.port, 4000);
        assert_eq!(config.token, "abc");
        assert_eq!(config.retries, 1);
        assert_eq!(config.host, "esp32.local");
    }

    #[test]
    fn load_missing_explicit_file_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("absent.toml");

        let err = FileConfig::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("absent.toml"));
        assert!(!path.exists());
    }

    #[test]
    fn load_rejects_malformed_toml() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "port = \"not a number\"").unwrap();

        assert!(FileConfig::load(Some(&path)).is_err());
    }

    #[test]
    fn flags_override_file() {
        let file = FileConfig {
            host: "from-file.local".into(),
            port: 4000,
            token: "file-token".into(),
            ..FileConfig::default()
        };
        let cli = Cli {
            host: Some("192.0.2.9".into()),
            token: Some("flag-token".into()),
            retry_delay: Some(250),
            ..bare_cli()
        };
        let settings = Settings::merge(&cli, file);

        assert_eq!(settings.host, "192.0.2.9");
        assert_eq!(settings.port, 4000);
        assert_eq!(settings.token, "flag-token");
        assert_eq!(settings.retry.retry_delay, Duration::from_millis(250));
        assert_eq!(settings.retry.retries, 3);
    }

    #[test]
    fn file_values_used_without_flags() {
        let file = FileConfig {
            timeout_ms: 8000,
            token_query: true,
            ..FileConfig::default()
        };
        let settings = Settings::merge(&bare_cli(), file);

        assert_eq!(settings.connect_timeout, Duration::from_millis(8000));
        assert!(settings.token_query);
    }

    #[test]
    fn nothing_set_means_built_in_defaults() {
        let settings = Settings::merge(&bare_cli(), FileConfig::default());
        assert_eq!(settings.host, "esp32.local");
        assert_eq!(settings.port, 3030);
        assert_eq!(settings.connect_timeout, Duration::from_millis(5000));
        assert_eq!(settings.retry, RetryPolicy::default());
    }
}
