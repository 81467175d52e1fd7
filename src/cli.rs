//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::{Chain, RiskLevel};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Sentinel - smart-contract security audits from the command line
///
/// Submits contracts to the Auto Sentinel audit API, follows the
/// asynchronous AI analysis, and renders threat reports.
///
/// Examples:
///   sentinel scan 0x1234567890123456789012345678901234567890
///   sentinel scan 0x1234...7890 --chain polygon --format markdown -o report.md
///   sentinel summary 0x1234...7890 --timeout 120
///   sentinel history 0x1234...7890
///   sentinel init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Base URL of the audit API
    ///
    /// Defaults to the config file value, then http://localhost:8000.
    #[arg(long, global = true, value_name = "URL", env = "SENTINEL_API_URL")]
    pub api_url: Option<String>,

    /// HTTP request timeout in seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub request_timeout: Option<u64>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .sentinel.toml in the current directory
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Submit a contract for a full security audit
    Scan(ScanArgs),

    /// Follow the AI summary of a previously submitted audit
    Summary(SummaryArgs),

    /// List past audit runs for an address
    History {
        /// Contract address (0x followed by 40 hex digits)
        address: String,
    },

    /// Fetch the detailed compliance report for an address
    Compliance {
        /// Contract address (0x followed by 40 hex digits)
        address: String,

        /// Save the report as compliance-report-<address>.json
        #[arg(long)]
        save: bool,
    },

    /// Load a stored audit report from the service
    Load {
        /// Report path as listed by `sentinel history`
        path: String,

        /// Contract address the report belongs to
        #[arg(long)]
        address: String,

        /// Blockchain network
        #[arg(long, default_value = "ethereum")]
        chain: Chain,

        /// Output format
        #[arg(long, value_name = "FORMAT")]
        format: Option<OutputFormat>,
    },

    /// Generate a default .sentinel.toml configuration file
    InitConfig,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ScanArgs {
    /// Contract address (0x followed by 40 hex digits)
    pub address: String,

    /// Blockchain network
    #[arg(long, default_value = "ethereum")]
    pub chain: Chain,

    /// Disable the simulated progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Do not wait for a pending AI summary
    #[arg(long)]
    pub no_wait_summary: bool,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (text, markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Fail if the contract's risk is at or above this level
    ///
    /// Useful for CI pipelines. Exit code 2 when the threshold is met.
    #[arg(long, value_name = "LEVEL")]
    pub fail_on: Option<FailOnLevel>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct SummaryArgs {
    /// Contract address (0x followed by 40 hex digits)
    pub address: String,

    /// Blockchain network
    #[arg(long, default_value = "ethereum")]
    pub chain: Chain,

    /// Seconds between status requests (default from config: 3)
    #[arg(long, value_name = "SECS")]
    pub interval: Option<u64>,

    /// Give up after this many seconds (default from config: 300)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Check the summary status once instead of polling
    #[arg(long, conflicts_with_all = ["interval", "timeout", "retries"])]
    pub once: bool,

    /// Retry up to N times after a failure that is not a timeout
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub retries: u32,
}

/// Output format for reports.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Terminal summary (default)
    #[default]
    Text,
    /// Markdown document
    Markdown,
    /// JSON document
    Json,
}

/// Risk threshold for --fail-on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, clap::ValueEnum)]
pub enum FailOnLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl FailOnLevel {
    pub fn risk_level(self) -> RiskLevel {
        match self {
            FailOnLevel::Low => RiskLevel::Low,
            FailOnLevel::Medium => RiskLevel::Medium,
            FailOnLevel::High => RiskLevel::High,
            FailOnLevel::Critical => RiskLevel::Critical,
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref url) = self.api_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("API URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if self.request_timeout == Some(0) {
            return Err("Request timeout must be at least 1 second".to_string());
        }

        if let Command::Summary(ref summary) = self.command {
            if summary.interval == Some(0) {
                return Err("Polling interval must be at least 1 second".to_string());
            }
            if summary.timeout == Some(0) {
                return Err("Polling timeout must be at least 1 second".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
