//! Audit API client.
//!
//! Wraps a single `reqwest::Client` and exposes one method per backend
//! endpoint. Status codes and transport failures are mapped to
//! [`ApiError`] here so callers only ever see user-facing errors.

use crate::error::ApiError;
use crate::models::{
    AuditRequest, AuditResult, Chain, ComplianceReport, HistoryItem, HistoryResponse,
    SummaryStatus,
};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Connection settings for the audit API.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_seconds: 120,
        }
    }
}

/// Client for the audit API.
#[derive(Debug, Clone)]
pub struct AuditClient {
    config: ClientConfig,
    http_client: reqwest::Client,
}

impl AuditClient {
    /// Create a new client. Trailing slashes on the base URL are ignored.
    pub fn new(mut config: ClientConfig) -> Result<Self, ApiError> {
        config.base_url = config.base_url.trim_end_matches('/').to_string();

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ApiError::Transport(format!("failed to create HTTP client: {}", e)))?;

        debug!("Audit API client targeting {}", config.base_url);

        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    /// `POST /audit-contract`
    pub async fn audit_contract(&self, request: &AuditRequest) -> Result<AuditResult, ApiError> {
        info!(
            "Requesting audit for {} on {}",
            request.address(),
            request.chain()
        );

        let builder = self
            .http_client
            .post(self.url("/audit-contract"))
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&json!({
                "address": request.address(),
                "chain": request.chain().as_str(),
            }));

        let response = self.send(builder).await?;
        let result: AuditResult = self.read_json(response).await?;

        if !result.is_well_formed() {
            warn!("Audit response is missing contract_address");
            return Err(ApiError::InvalidResponse);
        }

        Ok(result)
    }

    /// `GET /ai-summary/{address}?chain=`
    pub async fn ai_summary(&self, address: &str, chain: Chain) -> Result<SummaryStatus, ApiError> {
        let builder = self
            .http_client
            .get(self.url(&format!("/ai-summary/{}", address)))
            .query(&[("chain", chain.as_str())]);

        let response = self.send(builder).await?;
        self.read_json(response).await
    }

    /// `GET /audit-history/{address}`
    pub async fn audit_history(&self, address: &str) -> Result<Vec<HistoryItem>, ApiError> {
        let builder = self
            .http_client
            .get(self.url(&format!("/audit-history/{}", address)));

        let response = self.send(builder).await?;
        let body: HistoryResponse = self.read_json(response).await?;
        let (items, skipped) = body.into_items();
        if skipped > 0 {
            warn!("Skipped {} malformed history entries for {}", skipped, address);
        }
        Ok(items)
    }

    /// `GET /compliance-report/{address}`
    pub async fn compliance_report(&self, address: &str) -> Result<ComplianceReport, ApiError> {
        let response = self
            .http_client
            .get(self.url(&format!("/compliance-report/{}", address)))
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(&e, self.config.timeout_seconds))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Http {
                status: status.as_u16(),
                message: "Failed to fetch detailed compliance report".to_string(),
            });
        }

        self.read_json(response).await
    }

    /// `GET /load-audit-file?path=&address=&chain=`
    pub async fn load_audit_file(
        &self,
        path: &str,
        request: &AuditRequest,
    ) -> Result<AuditResult, ApiError> {
        let builder = self.http_client.get(self.url("/load-audit-file")).query(&[
            ("path", path),
            ("address", request.address()),
            ("chain", request.chain().as_str()),
        ]);

        let response = self.send(builder).await?;
        let result: AuditResult = self.read_json(response).await?;

        if !result.is_well_formed() {
            return Err(ApiError::InvalidResponse);
        }

        Ok(result)
    }

    /// Send a request and turn non-success statuses into errors.
    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(&e, self.config.timeout_seconds))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        debug!("API error {}: {}", status, body);
        Err(ApiError::from_status(status.as_u16(), &body))
    }

    async fn read_json<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T, ApiError> {
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::from_reqwest(&e, self.config.timeout_seconds))?;

        serde_json::from_str(&body).map_err(|e| {
            warn!("Failed to parse API response: {}", e);
            ApiError::InvalidResponse
        })
    }
}
