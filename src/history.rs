//! Audit history loading.
//!
//! A single request per call, with no pagination and no retry. "No history
//! yet" is a normal outcome and is kept apart from fetch failures, which
//! come back as `Err`.

use crate::api::AuditClient;
use crate::error::ApiError;
use crate::models::{validate_address, HistoryItem};
use tracing::{debug, info};

/// Successful result of a history lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryOutcome {
    /// The address has never been analyzed.
    Empty,
    /// Past runs, in the order the backend returned them.
    Entries(Vec<HistoryItem>),
}

impl HistoryOutcome {
    pub fn items(&self) -> &[HistoryItem] {
        match self {
            HistoryOutcome::Empty => &[],
            HistoryOutcome::Entries(items) => items,
        }
    }
}

/// Fetch past audit runs for `address`.
pub async fn load_history(client: &AuditClient, address: &str) -> Result<HistoryOutcome, ApiError> {
    let address = validate_address(address)?;
    debug!("Loading audit history for {}", address);

    let items = client.audit_history(&address).await?;
    info!("Loaded {} history entries for {}", items.len(), address);

    if items.is_empty() {
        Ok(HistoryOutcome::Empty)
    } else {
        Ok(HistoryOutcome::Entries(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ClientConfig;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ADDRESS: &str = "0x1234567890123456789012345678901234567890";

    fn client_for(server: &MockServer) -> AuditClient {
        AuditClient::new(ClientConfig {
            base_url: server.uri(),
            timeout_seconds: 5,
        })
        .unwrap()
    }

    async fn serve_history(body: ResponseTemplate) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/audit-history/{}", ADDRESS)))
            .respond_with(body)
            .expect(1)
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_empty_history_is_not_an_error() {
        let server = serve_history(ResponseTemplate::new(200).set_body_json(json!({"history": []}))).await;

        let outcome = load_history(&client_for(&server), ADDRESS).await.unwrap();
        assert_eq!(outcome, HistoryOutcome::Empty);
        assert!(outcome.items().is_empty());
    }

    #[tokio::test]
    async fn test_entries_are_returned_in_order() {
        let server = serve_history(ResponseTemplate::new(200).set_body_json(json!({
            "history": [
                {"timestamp": "20250120_143022", "total_issues": 3, "file_path": "/reports/a.json"},
                {"timestamp": "20250119_091545", "total_issues": 0, "file_path": "/reports/b.json"}
            ]
        })))
        .await;

        let outcome = load_history(&client_for(&server), ADDRESS).await.unwrap();
        let items = outcome.items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].total_issues, 3);
        assert_eq!(items[1].file_path, "/reports/b.json");
    }

    #[tokio::test]
    async fn test_failures_are_distinct_from_empty() {
        let server = serve_history(ResponseTemplate::new(200).set_body_string("not json")).await;
        let err = load_history(&client_for(&server), ADDRESS).await.unwrap_err();
        assert_eq!(err, ApiError::InvalidResponse);

        let server = serve_history(ResponseTemplate::new(500)).await;
        let err = load_history(&client_for(&server), ADDRESS).await.unwrap_err();
        assert!(matches!(err, ApiError::Server(_)));
    }

    #[tokio::test]
    async fn test_invalid_address_skips_request() {
        let server = MockServer::start().await;
        let err = load_history(&client_for(&server), "0xZZZ").await.unwrap_err();
        assert!(err.is_validation());
        assert!(server.received_requests().await.unwrap_or_default().is_empty());
    }
}
