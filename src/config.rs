//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.sentinel.toml` files.

use crate::analysis::ProgressSettings;
use crate::cli::{Args, OutputFormat};
use crate::summary::PollerSettings;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default config file name, looked up in the current directory.
pub const CONFIG_FILE: &str = ".sentinel.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Audit API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// AI summary polling schedule.
    #[serde(default)]
    pub poller: PollerSettings,

    /// Simulated progress display.
    #[serde(default)]
    pub progress: ProgressSettings,

    /// Output settings.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Audit API connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the audit service.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout() -> u64 {
    120 // audits routinely take over a minute
}

/// Output settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Default format for `scan` output.
    #[serde(default)]
    pub format: OutputFormat,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.sentinel.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(CONFIG_FILE);

        if path.exists() {
            Ok(Some(Self::load(&path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence, but only when they were explicitly
    /// given (including through `SENTINEL_API_URL`).
    pub fn merge_with_args(&mut self, args: &Args) {
        if let Some(ref url) = args.api_url {
            self.api.base_url = url.clone();
        }
        if let Some(timeout) = args.request_timeout {
            self.api.timeout_seconds = timeout;
        }
        if args.verbose {
            self.output.verbose = true;
        }
    }

    /// Check values that may come from the config file.
    ///
    /// Applies the same rules as the matching CLI flags.
    pub fn validate(&self) -> Result<()> {
        let url = &self.api.base_url;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            bail!("[api] base_url must start with 'http://' or 'https://' (got '{}')", url);
        }
        if self.api.timeout_seconds == 0 {
            bail!("[api] timeout_seconds must be at least 1");
        }
        if self.poller.interval_seconds == 0 {
            bail!("[poller] interval_seconds must be at least 1");
        }
        if self.poller.timeout_seconds == 0 {
            bail!("[poller] timeout_seconds must be at least 1");
        }
        if self.progress.enabled && self.progress.tick_millis == 0 {
            bail!("[progress] tick_millis must be at least 1 when progress is enabled");
        }

        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://localhost:8000");
        assert_eq!(config.poller.interval_seconds, 3);
        assert_eq!(config.poller.timeout_seconds, 300);
        assert_eq!(config.progress.tick_millis, 800);
        assert_eq!(config.progress.step, 15);
        assert_eq!(config.progress.ceiling, 90);
        assert!(config.progress.enabled);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[api]
base_url = "https://audit.example.com"

[poller]
interval_seconds = 5

[progress]
enabled = false

[output]
format = "json"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.api.base_url, "https://audit.example.com");
        assert_eq!(config.api.timeout_seconds, 120);
        assert_eq!(config.poller.interval_seconds, 5);
        assert_eq!(config.poller.timeout_seconds, 300);
        assert!(!config.progress.enabled);
        assert_eq!(config.progress.step, 15);
        assert_eq!(config.output.format, OutputFormat::Json);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[api]"));
        assert!(toml_str.contains("[poller]"));
        assert!(toml_str.contains("[progress]"));

        let reparsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(reparsed.poller.timeout_seconds, 300);
    }

    #[test]
    fn test_load_from_dir() {
        let dir = TempDir::new().unwrap();
        assert!(Config::load_from_dir(dir.path()).unwrap().is_none());

        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[api]\nbase_url = \"http://10.0.0.5:8000\"\n",
        )
        .unwrap();
        let config = Config::load_from_dir(dir.path()).unwrap().unwrap();
        assert_eq!(config.api.base_url, "http://10.0.0.5:8000");

        std::fs::write(dir.path().join(CONFIG_FILE), "[api\nbroken").unwrap();
        assert!(Config::load_from_dir(dir.path()).is_err());
    }

    #[test]
    fn test_merge_with_args_only_overrides_given_flags() {
        let mut config: Config = toml::from_str(
            "[api]\nbase_url = \"https://audit.example.com\"\ntimeout_seconds = 30\n",
        )
        .unwrap();

        let args = Args::try_parse_from(["sentinel", "history", "0x0", "--request-timeout", "45"]).unwrap();
        config.merge_with_args(&args);
        assert_eq!(config.api.timeout_seconds, 45);
        if std::env::var("SENTINEL_API_URL").is_err() {
            assert_eq!(config.api.base_url, "https://audit.example.com");
        }

        let args = Args::try_parse_from([
            "sentinel",
            "history",
            "0x0",
            "--api-url",
            "http://127.0.0.1:9000",
            "-v",
        ])
        .unwrap();
        config.merge_with_args(&args);
        assert_eq!(config.api.base_url, "http://127.0.0.1:9000");
        assert!(config.output.verbose);
    }

    #[test]
    fn test_validate_defaults() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_file_values() {
        let cases = [
            "[poller]\ninterval_seconds = 0\n",
            "[poller]\ntimeout_seconds = 0\n",
            "[api]\nbase_url = \"localhost:8000\"\n",
            "[api]\ntimeout_seconds = 0\n",
            "[progress]\ntick_millis = 0\n",
        ];
        for case in cases {
            let config: Config = toml::from_str(case).unwrap();
            assert!(config.validate().is_err(), "accepted {:?}", case);
        }

        let config: Config = toml::from_str("[progress]\nenabled = false\ntick_millis = 0\n").unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cli_url_fixes_bad_file_url() {
        let mut config: Config = toml::from_str("[api]\nbase_url = \"localhost:8000\"\n").unwrap();
        let args = Args::try_parse_from([
            "sentinel",
            "history",
            "0x0",
            "--api-url",
            "https://audit.example.com",
        ])
        .unwrap();
        config.merge_with_args(&args);
        assert!(config.validate().is_ok());
    }
}
