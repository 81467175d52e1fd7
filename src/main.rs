//! Sentinel - smart-contract security audits from the command line
//!
//! A CLI client for the Auto Sentinel audit API. It submits contracts for
//! analysis, follows the asynchronous AI summary, and renders reports.
//!
//! Exit codes:
//!   0 - Success (risk below --fail-on threshold, or no --fail-on set)
//!   1 - Runtime error (validation, connection, backend error, etc.)
//!   2 - Contract risk at or above the --fail-on threshold

mod analysis;
mod api;
mod cli;
mod config;
mod error;
mod history;
mod models;
mod report;
mod summary;

use analysis::AnalysisController;
use anyhow::{Context, Result};
use api::{AuditClient, ClientConfig};
use cli::{Args, Command, OutputFormat, ScanArgs, SummaryArgs};
use config::{Config, CONFIG_FILE};
use error::ApiError;
use indicatif::{ProgressBar, ProgressStyle};
use models::{AuditRequest, AuditResult};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use summary::{PollerSettings, SummaryPoller, SummarySource, SummaryState};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle init-config early (no logging needed)
    if matches!(args.command, Command::InitConfig) {
        return handle_init_config();
    }

    // Load configuration (before logging, so the file can enable verbose output)
    let (config, config_warning) = load_config(&args);
    let mut config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);
    if let Err(e) = config.validate() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    init_logging(&args, &config);

    info!("Sentinel v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    if let Some(warning) = config_warning {
        warn!("Failed to load config: {:#}; using defaults", warning);
    }

    match run(args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("\n❌ Error: {}", e);
            if let Some(api_error) = e.downcast_ref::<ApiError>() {
                if api_error.is_validation() {
                    eprintln!("   Addresses are 0x followed by 40 hex digits.");
                } else if api_error.is_transport() {
                    eprintln!("   Check that the audit service is running (--api-url or SENTINEL_API_URL).");
                }
            }
            std::process::exit(1);
        }
    }
}

/// Handle init-config: generate a default .sentinel.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to point at your audit service and tune polling.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args, config: &Config) {
    let level = if config.output.verbose && !args.quiet {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Dispatch the selected command. Returns the process exit code.
async fn run(args: Args, config: Config) -> Result<i32> {
    let client = AuditClient::new(ClientConfig {
        base_url: config.api.base_url.clone(),
        timeout_seconds: config.api.timeout_seconds,
    })?;
    info!("Audit API: {}", client.base_url());

    match args.command.clone() {
        Command::Scan(scan) => run_scan(&args, &config, client, scan).await,
        Command::Summary(summary) => run_summary(&args, &config, client, summary).await,
        Command::History { address } => run_history(&client, &address).await,
        Command::Compliance { address, save } => run_compliance(&client, &address, save).await,
        Command::Load {
            path,
            address,
            chain,
            format,
        } => {
            let request = AuditRequest::new(&address, chain.as_str())?;
            let result = client.load_audit_file(&path, &request).await?;
            if !args.quiet {
                println!("✅ Historical report loaded: {}", path);
            }
            let format = format.unwrap_or(config.output.format);
            emit_report(&result, None, format, None)?;
            Ok(0)
        }
        Command::InitConfig => handle_init_config().map(|_| 0),
    }
}

/// Submit an audit, follow its AI summary, and render the report.
async fn run_scan(args: &Args, config: &Config, client: AuditClient, scan: ScanArgs) -> Result<i32> {
    let mut progress = config.progress.clone();
    if scan.no_progress {
        progress.enabled = false;
    }

    if !args.quiet {
        println!(
            "🔬 Starting comprehensive security analysis of {} on {}...",
            scan.address.trim(),
            scan.chain.display_name()
        );
    }

    let controller = AnalysisController::new(client, progress).quiet(args.quiet);
    let result = controller
        .submit_analysis(&scan.address, scan.chain.as_str())
        .await?;

    if !args.quiet {
        let risk = result.risk();
        println!("{} Analysis complete! Risk level: {}", risk.emoji(), risk);
    }

    let polled = if result.ai_summary_pending() && !scan.no_wait_summary {
        let request = AuditRequest::new(&scan.address, scan.chain.as_str())?;
        let source = Arc::new(controller.client().clone());
        Some(follow_summary(source, &config.poller, &request, 0, args.quiet).await)
    } else {
        None
    };

    let format = scan.format.unwrap_or(config.output.format);
    emit_report(&result, polled.as_ref(), format, scan.output.as_ref())?;

    // Check --fail-on threshold
    if let Some(level) = scan.fail_on {
        if report::exceeds_threshold(&result, level.risk_level()) {
            eprintln!(
                "\n⛔ Risk level {} is at or above {:?}. Failing (exit code 2).",
                result.risk(),
                level
            );
            return Ok(2);
        }
    }

    Ok(0)
}

/// Poll (or check once) the AI summary of an existing audit.
async fn run_summary(
    args: &Args,
    config: &Config,
    client: AuditClient,
    summary: SummaryArgs,
) -> Result<i32> {
    let request = AuditRequest::new(&summary.address, summary.chain.as_str())?;

    let mut settings = config.poller.clone();
    if let Some(interval) = summary.interval {
        settings.interval_seconds = interval;
    }
    if let Some(timeout) = summary.timeout {
        settings.timeout_seconds = timeout;
    }

    let state = if summary.once {
        SummaryState::from_fetch(
            client
                .fetch_summary(request.address(), request.chain())
                .await,
        )
    } else {
        follow_summary(Arc::new(client), &settings, &request, summary.retries, args.quiet).await
    };

    match state {
        SummaryState::Completed { summary: text } => {
            println!("\n🧠 AI Threat Analysis:\n");
            println!("{}", report::strip_html(&text));
            Ok(0)
        }
        // Only a single --once check can still be pending
        SummaryState::Pending => {
            println!("⏳ AI analysis still in progress.");
            Ok(0)
        }
        SummaryState::Failed { message, timed_out } => {
            eprintln!("\n❌ {}", message);
            if !timed_out {
                eprintln!(
                    "   Retry with: sentinel summary {} --chain {} --once",
                    request.address(),
                    request.chain()
                );
            }
            Ok(1)
        }
    }
}

/// Run a polling session to completion while showing a spinner. Ctrl-C ends it.
async fn follow_summary<S: SummarySource>(
    source: Arc<S>,
    settings: &PollerSettings,
    request: &AuditRequest,
    retries: u32,
    quiet: bool,
) -> SummaryState {
    let spinner = if quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.magenta} [{elapsed_precise}] {msg}") {
            pb.set_style(style);
        }
        pb.set_message("🧠 AI analysis in progress...");
        pb.enable_steady_tick(Duration::from_millis(120));
        pb
    };

    let poller = SummaryPoller::new(source, settings.clone());
    let handle = poller.start(request);

    let interrupted = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    let state = summary::follow(&handle, settings.interval(), retries, interrupted, |attempt| {
        spinner.set_message(format!("🔁 Retrying AI summary ({}/{})...", attempt, retries));
    })
    .await;

    if handle.is_running() {
        debug!("Stopping AI summary poller for {}", request.address());
    }
    handle.stop();
    spinner.finish_and_clear();
    state
}

/// Render a report and print or save it.
fn emit_report(
    result: &AuditResult,
    polled: Option<&SummaryState>,
    format: OutputFormat,
    output: Option<&PathBuf>,
) -> Result<()> {
    let rendered = match format {
        OutputFormat::Text => report::generate_terminal_summary(result, polled),
        OutputFormat::Markdown => report::generate_markdown_report(result, polled),
        OutputFormat::Json => report::generate_json_report(result, polled)?,
    };

    match output {
        Some(path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            println!("\n✅ Report saved to: {}", path.display());
        }
        None => println!("{}", rendered),
    }

    Ok(())
}

async fn run_history(client: &AuditClient, address: &str) -> Result<i32> {
    let outcome = history::load_history(client, address).await?;
    println!("{}", report::generate_history_listing(address.trim(), &outcome));

    if let Some(latest) = outcome.items().first() {
        println!(
            "   Open the latest with: sentinel load '{}' --address {}",
            latest.file_path,
            address.trim()
        );
    }
    Ok(0)
}

async fn run_compliance(client: &AuditClient, address: &str, save: bool) -> Result<i32> {
    let address = models::validate_address(address)?;
    let compliance = client.compliance_report(&address).await?;

    println!("{}", report::generate_compliance_summary(&compliance));

    if save {
        let path = PathBuf::from(format!("compliance-report-{}.json", address));
        let content = serde_json::to_string_pretty(&compliance)?;
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("✅ Compliance report saved to: {}", path.display());
    }

    Ok(0)
}

/// Load configuration from file or use defaults.
///
/// An explicit `--config` path must load. A broken default file is reported
/// as a warning once logging is up, and defaults are used instead.
fn load_config(args: &Args) -> (Result<Config>, Option<anyhow::Error>) {
    if let Some(ref config_path) = args.config {
        return (Config::load(config_path), None);
    }

    match Config::load_default() {
        Ok(Some(config)) => (Ok(config), None),
        Ok(None) => (Ok(Config::default()), None),
        Err(e) => (Ok(Config::default()), Some(e)),
    }
}
