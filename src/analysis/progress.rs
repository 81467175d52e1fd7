//! Simulated progress display for in-flight audits.
//!
//! The backend reports no milestones while an audit runs, so the percentage
//! shown here is produced locally on a fixed schedule. It is labeled
//! "simulated" everywhere it is rendered and never reaches 100% until the
//! real response has arrived.

use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Status lines cycled through while the audit is running.
pub const STATUS_MESSAGES: [&str; 6] = [
    "🔍 Scanning contract bytecode...",
    "🧠 Running AI threat analysis...",
    "⚡ Checking for vulnerabilities...",
    "🛡️ Analyzing security patterns...",
    "📊 Calculating risk metrics...",
    "🎯 Finalizing threat assessment...",
];

pub const COMPLETE_MESSAGE: &str = "✅ Analysis complete!";

/// Schedule of the simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressSettings {
    /// Show the simulated progress bar at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Milliseconds between ticks.
    #[serde(default = "default_tick_millis")]
    pub tick_millis: u64,

    /// Percentage added per tick.
    #[serde(default = "default_step")]
    pub step: u64,

    /// Percentage the simulation stops at until the real result lands.
    #[serde(default = "default_ceiling")]
    pub ceiling: u64,
}

impl Default for ProgressSettings {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            tick_millis: default_tick_millis(),
            step: default_step(),
            ceiling: default_ceiling(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_tick_millis() -> u64 {
    800
}

fn default_step() -> u64 {
    15
}

fn default_ceiling() -> u64 {
    90
}

/// Pure state of the simulation, advanced one tick at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedProgress {
    percent: u64,
    message_index: usize,
    step: u64,
    ceiling: u64,
}

impl SimulatedProgress {
    pub fn new(settings: &ProgressSettings) -> Self {
        Self {
            percent: 0,
            message_index: 0,
            step: settings.step,
            ceiling: settings.ceiling.min(99),
        }
    }

    pub fn percent(&self) -> u64 {
        self.percent
    }

    pub fn message(&self) -> &'static str {
        STATUS_MESSAGES[self.message_index]
    }

    /// Whether further ticks would change nothing.
    pub fn at_ceiling(&self) -> bool {
        self.percent >= self.ceiling
    }

    /// Advance one tick. Returns false once the ceiling is reached.
    pub fn tick(&mut self) -> bool {
        if self.at_ceiling() {
            return false;
        }

        let next = self.percent + self.step;
        if next >= self.ceiling {
            self.percent = self.ceiling;
            return false;
        }

        self.percent = next;
        self.message_index = (self.message_index + 1).min(STATUS_MESSAGES.len() - 1);
        true
    }
}

/// Owned handle to a running simulation.
///
/// Dropping the ticker stops its timer task; `finish` and `abandon` also
/// settle the bar.
pub struct ProgressTicker {
    bar: ProgressBar,
    task: Option<JoinHandle<()>>,
}

impl ProgressTicker {
    /// Start ticking `bar` according to `settings`.
    pub fn start(settings: &ProgressSettings, bar: ProgressBar) -> Self {
        let mut progress = SimulatedProgress::new(settings);

        bar.set_length(100);
        bar.set_position(progress.percent());
        bar.set_message(progress.message());

        if !settings.enabled || settings.tick_millis == 0 {
            return Self { bar, task: None };
        }

        let period = Duration::from_millis(settings.tick_millis);
        let tick_bar = bar.clone();
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                interval.tick().await;
                let advanced = progress.tick();
                tick_bar.set_position(progress.percent());
                tick_bar.set_message(progress.message());
                if !advanced {
                    debug!("Simulated progress reached {}%", progress.percent());
                    break;
                }
            }
        });

        Self {
            bar,
            task: Some(task),
        }
    }

    /// Bar styled for terminal output, or hidden when disabled.
    pub fn terminal_bar(settings: &ProgressSettings, quiet: bool) -> ProgressBar {
        if quiet || !settings.enabled {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(100);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% (simulated) {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb.enable_steady_tick(Duration::from_millis(120));
        pb
    }

    /// Stop the timer and show completion.
    pub fn finish(mut self) {
        self.stop();
        self.bar.set_position(100);
        self.bar.finish_with_message(COMPLETE_MESSAGE);
    }

    /// Stop the timer and clear the bar after a failure.
    pub fn abandon(mut self) {
        self.stop();
        self.bar.set_position(0);
        self.bar.finish_and_clear();
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        self.stop();
    }
}
