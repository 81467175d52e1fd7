//! Analysis request controller.
//!
//! Owns the "submit an audit" workflow: input validation, the simulated
//! progress display while the request is in flight, and reconciliation of
//! overlapping submissions so only the newest result is ever returned.

use crate::analysis::progress::{ProgressSettings, ProgressTicker};
use crate::api::AuditClient;
use crate::error::ApiError;
use crate::models::{AuditRequest, AuditResult};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// Drives audit submissions against a single [`AuditClient`].
pub struct AnalysisController {
    client: AuditClient,
    progress: ProgressSettings,
    quiet: bool,
    generation: AtomicU64,
}

impl AnalysisController {
    pub fn new(client: AuditClient, progress: ProgressSettings) -> Self {
        Self {
            client,
            progress,
            quiet: false,
            generation: AtomicU64::new(0),
        }
    }

    /// Suppress the terminal progress bar.
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn client(&self) -> &AuditClient {
        &self.client
    }

    /// Validate input, run the audit, and apply the result.
    ///
    /// Validation failures return before any network call. If another
    /// submission starts while this one is in flight, this call's result is
    /// discarded and [`ApiError::Superseded`] is returned.
    pub async fn submit_analysis(&self, address: &str, chain: &str) -> Result<AuditResult, ApiError> {
        let request = AuditRequest::new(address, chain)?;

        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Starting analysis #{} for {}", ticket, request.address());

        let bar = ProgressTicker::terminal_bar(&self.progress, self.quiet);
        let ticker = ProgressTicker::start(&self.progress, bar);

        let outcome = self.client.audit_contract(&request).await;

        if self.generation.load(Ordering::SeqCst) != ticket {
            info!("Discarding stale result of analysis #{}", ticket);
            ticker.abandon();
            return Err(ApiError::Superseded);
        }

        match outcome {
            Ok(result) => {
                ticker.finish();
                info!(
                    "Analysis complete for {}: risk level {}",
                    result.contract_address,
                    result.risk()
                );
                Ok(result)
            }
            Err(e) => {
                ticker.abandon();
                warn!("Contract analysis error: {}", e);
                Err(e)
            }
        }
    }
}
