//! Error types for talking to the audit API.
//!
//! Every variant's `Display` output is the message shown to the user, so
//! callers can surface errors without further formatting.

use thiserror::Error;

/// Generic fallback when the backend gives us nothing better.
pub const GENERIC_FAILURE: &str = "Failed to analyze contract";

/// Errors produced by the audit API client and the analysis workflow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The address was empty or whitespace.
    #[error("Please enter a valid contract address")]
    EmptyAddress,

    /// The address did not match `0x` followed by 40 hex digits.
    #[error("Invalid contract address format. Please enter a valid Ethereum address.")]
    InvalidAddress,

    /// The chain identifier is not one we know about.
    #[error("Unsupported chain '{chain}'. Supported chains: {supported}")]
    UnsupportedChain { chain: String, supported: String },

    /// HTTP 404.
    #[error("{0}")]
    NotFound(String),

    /// HTTP 400, with the `detail` from the body when present.
    #[error("{0}")]
    BadRequest(String),

    /// HTTP 429.
    #[error("Too many requests. Please wait a moment and try again.")]
    RateLimited,

    /// HTTP 5xx.
    #[error("{0}")]
    Server(String),

    /// Any other non-success status.
    #[error("{message}")]
    Http { status: u16, message: String },

    /// The service could not be reached or the connection broke.
    #[error("Unable to reach the security analysis service: {0}")]
    Transport(String),

    /// The HTTP request itself exceeded the client timeout.
    #[error("Request to the security analysis service timed out after {0}s")]
    RequestTimeout(u64),

    /// A 2xx response that is missing required data or is not valid JSON.
    #[error("Invalid response from security analysis service")]
    InvalidResponse,

    /// A newer analysis started before this one finished; its result was dropped.
    #[error("Analysis superseded by a newer request")]
    Superseded,
}

impl ApiError {
    /// True for errors raised before any network call was made.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ApiError::EmptyAddress | ApiError::InvalidAddress | ApiError::UnsupportedChain { .. }
        )
    }

    /// True for errors coming from the network layer rather than the backend.
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_) | ApiError::RequestTimeout(_))
    }

    /// Map a non-success HTTP status and its raw body to a user-facing error.
    ///
    /// `body` is parsed as JSON when possible so that `detail`/`message`
    /// fields from the backend can be surfaced.
    pub fn from_status(status: u16, body: &str) -> Self {
        match serde_json::from_str::<serde_json::Value>(body) {
            Ok(json) => {
                let detail = json
                    .get("detail")
                    .and_then(|v| v.as_str())
                    .filter(|s| !s.is_empty());
                let message = json
                    .get("message")
                    .and_then(|v| v.as_str())
                    .filter(|s| !s.is_empty());

                match status {
                    404 => ApiError::NotFound(
                        "Contract not found. Please verify the address and network.".to_string(),
                    ),
                    400 => ApiError::BadRequest(
                        detail
                            .unwrap_or("Invalid request. Please check your input.")
                            .to_string(),
                    ),
                    429 => ApiError::RateLimited,
                    s if s >= 500 => {
                        ApiError::Server("Server error. Please try again later.".to_string())
                    }
                    _ => ApiError::Http {
                        status,
                        message: detail.or(message).unwrap_or(GENERIC_FAILURE).to_string(),
                    },
                }
            }
            Err(_) => match status {
                404 => ApiError::NotFound("Contract not found on the selected network".to_string()),
                429 => ApiError::RateLimited,
                s if s >= 500 => ApiError::Server("Server temporarily unavailable".to_string()),
                _ => ApiError::Http {
                    status,
                    message: GENERIC_FAILURE.to_string(),
                },
            },
        }
    }

    /// Convert a reqwest send/receive failure into a transport error.
    pub fn from_reqwest(err: &reqwest::Error, timeout_seconds: u64) -> Self {
        if err.is_timeout() {
            ApiError::RequestTimeout(timeout_seconds)
        } else if err.is_connect() {
            ApiError::Transport("connection refused or host unreachable".to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}
