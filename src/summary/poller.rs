//! AI summary poller.
//!
//! After an audit returns with its AI narrative still pending, a polling
//! session queries the status endpoint on a fixed interval until the
//! summary completes, fails, or the session's absolute timeout expires.
//!
//! A session is owned through a [`PollHandle`]. The handle holds the only
//! reference to the background task; stopping or dropping it aborts the
//! task, which also drops any request that is still in flight. Status
//! requests of a session, scheduled or manual, never overlap.

use crate::api::AuditClient;
use crate::error::ApiError;
use crate::models::{AuditRequest, Chain, SummaryStatus, SummaryStatusKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, info, warn};

/// Anything that can report the AI summary status of an audit.
#[async_trait]
pub trait SummarySource: Send + Sync + 'static {
    async fn fetch_summary(&self, address: &str, chain: Chain) -> Result<SummaryStatus, ApiError>;
}

#[async_trait]
impl SummarySource for AuditClient {
    async fn fetch_summary(&self, address: &str, chain: Chain) -> Result<SummaryStatus, ApiError> {
        self.ai_summary(address, chain).await
    }
}

/// Poller-side view of the AI summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryState {
    Pending,
    Completed { summary: String },
    Failed { message: String, timed_out: bool },
}

impl SummaryState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SummaryState::Pending)
    }

    /// Failures other than the session timeout may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SummaryState::Failed { timed_out: false, .. })
    }

    fn from_status(status: SummaryStatus) -> Self {
        match status.status {
            SummaryStatusKind::Pending => SummaryState::Pending,
            SummaryStatusKind::Completed => SummaryState::Completed {
                summary: status.summary.unwrap_or_default(),
            },
            SummaryStatusKind::Error => SummaryState::Failed {
                message: status
                    .error_message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| "AI analysis failed".to_string()),
                timed_out: false,
            },
        }
    }

    pub fn from_fetch(fetched: Result<SummaryStatus, ApiError>) -> Self {
        match fetched {
            Ok(status) => Self::from_status(status),
            Err(e) => SummaryState::Failed {
                message: e.to_string(),
                timed_out: false,
            },
        }
    }

    fn interrupted(current: SummaryState, message: &str) -> Self {
        match current {
            SummaryState::Pending => SummaryState::Failed {
                message: message.to_string(),
                timed_out: false,
            },
            settled => settled,
        }
    }

    fn timed_out(timeout: Duration) -> Self {
        SummaryState::Failed {
            message: format!("AI analysis timed out after {}s", timeout.as_secs()),
            timed_out: true,
        }
    }
}

/// Polling schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerSettings {
    /// Seconds between a response and the next status request.
    #[serde(default = "default_interval")]
    pub interval_seconds: u64,

    /// Absolute budget of a session, counted from its start.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_interval() -> u64 {
    3
}

fn default_timeout() -> u64 {
    300
}

impl PollerSettings {
    /// Never shorter than one second.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds.max(1))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Starts polling sessions against a [`SummarySource`].
pub struct SummaryPoller<S> {
    source: Arc<S>,
    settings: PollerSettings,
}

impl<S: SummarySource> SummaryPoller<S> {
    pub fn new(source: Arc<S>, settings: PollerSettings) -> Self {
        Self { source, settings }
    }

    /// Start a session for `request`. The first status request is issued immediately.
    pub fn start(&self, request: &AuditRequest) -> PollHandle<S> {
        let (sender, receiver) = watch::channel(SummaryState::Pending);
        let state = Arc::new(sender);
        let gate = Arc::new(Mutex::new(()));

        info!(
            "Polling AI summary for {} every {}s (timeout {}s)",
            request.address(),
            self.settings.interval_seconds,
            self.settings.timeout_seconds
        );

        let task = tokio::spawn(run_session(
            Arc::clone(&self.source),
            request.address().to_string(),
            request.chain(),
            self.settings.clone(),
            state.clone(),
            Arc::clone(&gate),
        ));

        // The task owns the only strong sender, so the channel closes when it ends.
        PollHandle {
            source: Arc::clone(&self.source),
            address: request.address().to_string(),
            chain: request.chain(),
            state: Arc::downgrade(&state),
            gate,
            receiver,
            task: Some(task),
        }
    }
}

/// Owned polling session.
pub struct PollHandle<S> {
    source: Arc<S>,
    address: String,
    chain: Chain,
    state: Weak<watch::Sender<SummaryState>>,
    gate: Arc<Mutex<()>>,
    receiver: watch::Receiver<SummaryState>,
    task: Option<JoinHandle<()>>,
}

impl<S: SummarySource> PollHandle<S> {
    pub fn state(&self) -> SummaryState {
        self.receiver.borrow().clone()
    }

    /// Whether the background task is still scheduled.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Read-only stream of state changes.
    pub fn subscribe(&self) -> watch::Receiver<SummaryState> {
        self.receiver.clone()
    }

    /// Resolve at the first terminal state.
    ///
    /// If the session task ends without settling, the session is reported
    /// as failed rather than left pending.
    pub async fn wait(&self) -> SummaryState {
        let mut receiver = self.subscribe();
        let settled = receiver
            .wait_for(SummaryState::is_terminal)
            .await
            .map(|state| (*state).clone());
        match settled {
            Ok(state) => state,
            Err(_) => {
                let last = receiver.borrow().clone();
                SummaryState::interrupted(last, "AI summary polling stopped before a result arrived")
            }
        }
    }

    /// Issue exactly one status request outside the schedule.
    ///
    /// The interval and timeout are not restarted. The request waits for any
    /// scheduled request in flight. A terminal answer settles a
    /// still-pending session; a session that already settled keeps its state.
    pub async fn retry(&self) -> SummaryState {
        let _turn = self.gate.lock().await;
        debug!("Manual AI summary check for {}", self.address);
        let answer = SummaryState::from_fetch(self.source.fetch_summary(&self.address, self.chain).await);
        if let Some(state) = self.state.upgrade() {
            settle(&state, answer.clone());
        }
        answer
    }

    /// Cancel the session.
    pub fn stop(mut self) {
        self.abort();
    }

    fn abort(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("AI summary polling for {} stopped", self.address);
        }
    }
}

impl<S> Drop for PollHandle<S> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Deadline used when the configured timeout does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Move a pending session to a terminal state. Returns false if nothing changed.
fn settle(state: &watch::Sender<SummaryState>, next: SummaryState) -> bool {
    state.send_if_modified(|current| {
        if current.is_terminal() || !next.is_terminal() {
            return false;
        }
        *current = next;
        true
    })
}

async fn run_session<S: SummarySource>(
    source: Arc<S>,
    address: String,
    chain: Chain,
    settings: PollerSettings,
    state: Arc<watch::Sender<SummaryState>>,
    gate: Arc<Mutex<()>>,
) {
    let timeout = settings.timeout();
    let deadline = Instant::now()
        .checked_add(timeout)
        .unwrap_or_else(|| Instant::now() + FAR_FUTURE);
    let mut attempt: u32 = 0;

    loop {
        if state.borrow().is_terminal() {
            return;
        }
        if Instant::now() >= deadline {
            break;
        }

        attempt += 1;
        debug!("AI summary status request #{} for {}", attempt, address);

        let fetched = tokio::select! {
            biased;
            _ = sleep_until(deadline) => break,
            fetched = async {
                let _turn = gate.lock().await;
                source.fetch_summary(&address, chain).await
            } => fetched,
        };

        let next = SummaryState::from_fetch(fetched);
        if next.is_terminal() {
            match &next {
                SummaryState::Completed { .. } => info!("AI summary completed after {} requests", attempt),
                SummaryState::Failed { message, .. } => warn!("AI summary failed: {}", message),
                SummaryState::Pending => {}
            }
            settle(&state, next);
            return;
        }

        tokio::select! {
            biased;
            _ = sleep_until(deadline) => break,
            _ = sleep(settings.interval()) => {}
        }
    }

    warn!("AI summary for {} timed out after {}s", address, timeout.as_secs());
    settle(&state, SummaryState::timed_out(timeout));
}

/// Wait for a session to settle, re-probing failures that are not timeouts.
///
/// Each of the up to `retries` requests is issued one `interval` after the
/// previous answer. A request that still reports pending counts as a failed
/// attempt. `on_retry` is called with the attempt number before each request.
/// When `cancel` resolves, the state reached so far is returned.
pub async fn follow<S, C, F>(
    handle: &PollHandle<S>,
    interval: Duration,
    retries: u32,
    cancel: C,
    mut on_retry: F,
) -> SummaryState
where
    S: SummarySource,
    C: Future<Output = ()>,
    F: FnMut(u32),
{
    tokio::pin!(cancel);

    let mut state = tokio::select! {
        state = handle.wait() => state,
        _ = &mut cancel => {
            warn!("AI summary polling interrupted");
            return SummaryState::interrupted(handle.state(), "AI summary polling cancelled");
        }
    };

    for attempt in 1..=retries {
        if !state.is_retryable() {
            break;
        }
        on_retry(attempt);
        info!("Retrying AI summary ({}/{})", attempt, retries);

        let answer = tokio::select! {
            answer = async {
                sleep(interval).await;
                handle.retry().await
            } => answer,
            _ = &mut cancel => {
                warn!("AI summary retry interrupted");
                return state;
            }
        };

        state = match answer {
            SummaryState::Pending => SummaryState::Failed {
                message: "AI analysis still in progress after retry".to_string(),
                timed_out: false,
            },
            settled => settled,
        };
    }

    state
}
