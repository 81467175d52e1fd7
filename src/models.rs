//! Data models for the audit client.
//!
//! This module contains the request and response types exchanged with the
//! audit API, plus the enumerated risk and severity levels used when
//! rendering results.

use crate::error::ApiError;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Marker the backend puts in `ai_summary` while the narrative is still being written.
pub const SUMMARY_PLACEHOLDER: &str = "analysis in progress";

/// Supported blockchain networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Ethereum,
    Polygon,
    Bsc,
    Arbitrum,
    Optimism,
    Base,
}

impl Chain {
    pub const ALL: [Chain; 6] = [
        Chain::Ethereum,
        Chain::Polygon,
        Chain::Bsc,
        Chain::Arbitrum,
        Chain::Optimism,
        Chain::Base,
    ];

    /// Identifier used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Ethereum => "ethereum",
            Chain::Polygon => "polygon",
            Chain::Bsc => "bsc",
            Chain::Arbitrum => "arbitrum",
            Chain::Optimism => "optimism",
            Chain::Base => "base",
        }
    }

    /// Human-readable network name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Chain::Ethereum => "Ethereum Mainnet",
            Chain::Polygon => "Polygon",
            Chain::Bsc => "Binance Smart Chain",
            Chain::Arbitrum => "Arbitrum",
            Chain::Optimism => "Optimism",
            Chain::Base => "Base",
        }
    }

    fn supported_list() -> String {
        Chain::ALL
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Chain {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Chain::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| ApiError::UnsupportedChain {
                chain: s.to_string(),
                supported: Chain::supported_list(),
            })
    }
}

/// A validated audit request.
///
/// The only way to build one is [`AuditRequest::new`], so holding an
/// `AuditRequest` means the address and chain have already been checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditRequest {
    address: String,
    chain: Chain,
}

impl AuditRequest {
    /// Validate user input and build a request.
    pub fn new(address: &str, chain: &str) -> Result<Self, ApiError> {
        let address = validate_address(address)?;
        let chain = chain.parse::<Chain>()?;
        Ok(Self { address, chain })
    }

    /// Lowercased, trimmed address as sent to the backend.
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn chain(&self) -> Chain {
        self.chain
    }
}

/// Check an address against `^0x[a-fA-F0-9]{40}$` and normalize it.
pub fn validate_address(address: &str) -> Result<String, ApiError> {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        return Err(ApiError::EmptyAddress);
    }

    let well_formed = trimmed.len() == 42
        && trimmed.starts_with("0x")
        && trimmed[2..].chars().all(|c| c.is_ascii_hexdigit());

    if !well_formed {
        return Err(ApiError::InvalidAddress);
    }

    Ok(trimmed.to_lowercase())
}

/// Overall risk rating of an audited contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RiskLevel {
    Unknown,
    Low,
    Medium,
    High,
    Critical,
}

impl From<&str> for RiskLevel {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "low" => RiskLevel::Low,
            "medium" => RiskLevel::Medium,
            "high" => RiskLevel::High,
            "critical" => RiskLevel::Critical,
            _ => RiskLevel::Unknown,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Unknown => write!(f, "Unknown"),
            RiskLevel::Low => write!(f, "Low"),
            RiskLevel::Medium => write!(f, "Medium"),
            RiskLevel::High => write!(f, "High"),
            RiskLevel::Critical => write!(f, "Critical"),
        }
    }
}

impl RiskLevel {
    pub fn emoji(&self) -> &'static str {
        match self {
            RiskLevel::Low => "✅",
            RiskLevel::Medium => "⚠️",
            RiskLevel::High | RiskLevel::Critical => "🚨",
            RiskLevel::Unknown => "❔",
        }
    }

    /// Short verdict for non-technical users.
    pub fn user_label(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Safe to Use",
            RiskLevel::Medium => "Use with Caution",
            RiskLevel::High => "High Risk",
            RiskLevel::Critical => "Do Not Use",
            RiskLevel::Unknown => "Unknown",
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            RiskLevel::Low => {
                "This contract appears safe to interact with. No major security risks detected."
            }
            RiskLevel::Medium => {
                "Exercise caution when using this contract. Some security concerns were found."
            }
            RiskLevel::High => {
                "High risk detected! Only interact with this contract if you understand the risks."
            }
            RiskLevel::Critical => {
                "DO NOT USE this contract! Critical security flaws could result in loss of funds."
            }
            RiskLevel::Unknown => "Unable to determine safety level. Exercise extreme caution.",
        }
    }
}

/// Severity of a single vulnerability finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Informational,
    Low,
    Medium,
    High,
    Critical,
}

impl From<&str> for Severity {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "critical" => Severity::Critical,
            "high" => Severity::High,
            "medium" => Severity::Medium,
            "low" => Severity::Low,
            _ => Severity::Informational,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Informational => write!(f, "Informational"),
            Severity::Low => write!(f, "Low"),
            Severity::Medium => write!(f, "Medium"),
            Severity::High => write!(f, "High"),
            Severity::Critical => write!(f, "Critical"),
        }
    }
}

impl Severity {
    pub fn emoji(&self) -> &'static str {
        match self {
            Severity::Informational => "🔵",
            Severity::Low => "🟢",
            Severity::Medium => "🟡",
            Severity::High => "🟠",
            Severity::Critical => "🔴",
        }
    }
}

/// A single vulnerability reported by the backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VulnerabilityDetail {
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: String,
    pub description: String,
    pub impact: String,
    pub recommendation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
}

impl VulnerabilityDetail {
    pub fn severity(&self) -> Severity {
        Severity::from(self.severity.as_str())
    }
}

/// Aggregate counters and scores for an audit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityMetrics {
    pub total_issues: u64,
    pub critical_issues: u64,
    pub high_issues: u64,
    pub medium_issues: u64,
    pub low_issues: u64,
    pub informational_issues: u64,
    pub code_quality_score: f64,
    pub security_score: f64,
    pub trust_score: f64,
    pub contract_age_days: u64,
    pub transaction_count: u64,
    pub unique_users: u64,
}

/// Verification details of the contract source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractInfo {
    pub is_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compiler_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implementation_address: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OwnershipAnalysis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_address: Option<String>,
    pub is_multisig: bool,
    pub ownership_renounced: bool,
    pub admin_functions: Vec<String>,
    pub centralization_risk: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingAnalysis {
    pub is_honeypot: bool,
    pub honeypot_confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buy_tax: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sell_tax: Option<f64>,
    pub liquidity_locked: bool,
    pub trading_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_transaction_limit: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialPresence {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telegram: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discord: Option<String>,
    pub social_score: f64,
}

/// The full audit payload returned by `/audit-contract` and `/load-audit-file`.
///
/// Known fields are typed; anything else the backend sends is kept in
/// `extra` so a JSON export round-trips without loss.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditResult {
    pub contract_address: String,
    pub chain: String,
    pub audit_timestamp: String,
    pub risk_level: String,
    pub risk_score: f64,
    pub security_metrics: SecurityMetrics,
    pub vulnerabilities: Vec<VulnerabilityDetail>,
    pub ai_summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_summary_status: Option<String>,
    pub recommendations: Vec<String>,
    pub gas_optimization_hints: Vec<String>,
    pub audit_file_path: String,
    pub contract_info: ContractInfo,
    pub ownership_analysis: OwnershipAnalysis,
    pub trading_analysis: TradingAnalysis,
    pub social_presence: SocialPresence,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compliance_report: Option<ComplianceReport>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl AuditResult {
    pub fn risk(&self) -> RiskLevel {
        RiskLevel::from(self.risk_level.as_str())
    }

    /// Minimal sanity check applied to every successful response.
    pub fn is_well_formed(&self) -> bool {
        !self.contract_address.trim().is_empty()
    }

    /// Whether the AI narrative is still being produced asynchronously.
    pub fn ai_summary_pending(&self) -> bool {
        if let Some(status) = self.ai_summary_status.as_deref() {
            return status.eq_ignore_ascii_case("pending");
        }
        let summary = self.ai_summary.trim();
        summary.is_empty() || summary.to_lowercase().contains(SUMMARY_PLACEHOLDER)
    }
}

/// Lifecycle reported by `/ai-summary/{address}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryStatusKind {
    Pending,
    Completed,
    Error,
}

/// Response body of `/ai-summary/{address}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryStatus {
    pub status: SummaryStatusKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

/// One past audit run for an address.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryItem {
    /// Backend timestamp in `YYYYMMDD_HHMMSS` form.
    pub timestamp: String,
    pub total_issues: u64,
    pub file_path: String,
}

impl HistoryItem {
    pub fn recorded_at(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.timestamp, "%Y%m%d_%H%M%S").ok()
    }

    /// Timestamp formatted for display, falling back to the raw value.
    pub fn display_date(&self) -> String {
        match self.recorded_at() {
            Some(dt) => dt.format("%d %B %Y, %H:%M").to_string(),
            None => self.timestamp.clone(),
        }
    }
}

/// Response body of `/audit-history/{address}`.
///
/// Entries stay raw so one malformed entry cannot void the whole list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryResponse {
    #[serde(default)]
    pub history: Vec<serde_json::Value>,
}

impl HistoryResponse {
    /// Entries that parse as [`HistoryItem`], in backend order, plus the number skipped.
    pub fn into_items(self) -> (Vec<HistoryItem>, usize) {
        let total = self.history.len();
        let items: Vec<HistoryItem> = self
            .history
            .into_iter()
            .filter_map(|entry| serde_json::from_value(entry).ok())
            .collect();
        let skipped = total - items.len();
        (items, skipped)
    }
}

/// A single regulatory violation in a compliance report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplianceViolation {
    pub violation_type: String,
    pub law_article: String,
    pub penalty_description: String,
    pub fine_amount: String,
    pub enforcement_agency: String,
    pub severity_level: String,
    pub compliance_action: String,
}

/// Regulatory compliance report for a contract.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplianceReport {
    pub contract_address: String,
    pub scan_timestamp: String,
    pub total_violations: u64,
    pub violations: Vec<ComplianceViolation>,
    pub compliance_status: String,
    #[serde(alias = "satgas_pasti_report_required")]
    pub report_required: bool,
    pub recommended_actions: Vec<String>,
    pub legal_risk_score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_example_address_accepted() {
        let req = AuditRequest::new("0x1234567890123456789012345678901234567890", "ethereum")
            .unwrap();
        assert_eq!(req.address(), "0x1234567890123456789012345678901234567890");
        assert_eq!(req.chain(), Chain::Ethereum);
    }

    #[test]
    fn test_address_is_trimmed_and_lowercased() {
        let req =
            AuditRequest::new("  0xABCDEFabcdef0123456789ABCDEFabcdef012345 ", "Polygon").unwrap();
        assert_eq!(req.address(), "0xabcdefabcdef0123456789abcdefabcdef012345");
        assert_eq!(req.chain(), Chain::Polygon);
    }

    #[test]
    fn test_invalid_addresses_rejected() {
        assert_eq!(
            AuditRequest::new("0xZZZ", "ethereum"),
            Err(ApiError::InvalidAddress)
        );
        assert_eq!(AuditRequest::new("   ", "ethereum"), Err(ApiError::EmptyAddress));

        let bad = [
            "1234567890123456789012345678901234567890",
            "0x123456789012345678901234567890123456789",
            "0x12345678901234567890123456789012345678901",
            "0X1234567890123456789012345678901234567890",
            "0x123456789012345678901234567890123456789g",
        ];
        for addr in bad {
            assert_eq!(validate_address(addr), Err(ApiError::InvalidAddress), "{addr}");
        }
    }

    #[test]
    fn test_unknown_chain_rejected() {
        let err = AuditRequest::new("0x1234567890123456789012345678901234567890", "solana")
            .unwrap_err();
        assert!(matches!(err, ApiError::UnsupportedChain { .. }));
        assert!(err.to_string().contains("ethereum, polygon"));
    }

    #[test]
    fn test_risk_ordering_and_labels() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::High < RiskLevel::Critical);
        assert_eq!(RiskLevel::from("CRITICAL"), RiskLevel::Critical);
        assert_eq!(RiskLevel::from("whatever"), RiskLevel::Unknown);
        assert_eq!(RiskLevel::Low.user_label(), "Safe to Use");
        assert_eq!(RiskLevel::Critical.user_label(), "Do Not Use");
    }

    #[test]
    fn test_severity_parsing() {
        assert_eq!(Severity::from("High"), Severity::High);
        assert_eq!(Severity::from("Informational"), Severity::Informational);
        assert!(Severity::Informational < Severity::Low);
        assert_eq!(Severity::Critical.emoji(), "🔴");
    }

    #[test]
    fn test_audit_result_tolerates_partial_payload() {
        let result: AuditResult = serde_json::from_value(json!({
            "contract_address": "0xabc",
            "risk_level": "High",
            "vulnerabilities": [{"type": "Reentrancy", "severity": "Critical"}],
            "indonesian_crime_analysis": {"overall_crime_risk": 12}
        }))
        .unwrap();

        assert!(result.is_well_formed());
        assert_eq!(result.risk(), RiskLevel::High);
        assert_eq!(result.vulnerabilities[0].severity(), Severity::Critical);
        assert!(result.extra.contains_key("indonesian_crime_analysis"));

        let exported = serde_json::to_value(&result).unwrap();
        assert_eq!(exported["indonesian_crime_analysis"]["overall_crime_risk"], 12);
    }

    #[test]
    fn test_ai_summary_pending_detection() {
        let mut result = AuditResult {
            contract_address: "0xabc".into(),
            ai_summary: "<p>AI analysis in progress...</p>".into(),
            ..Default::default()
        };
        assert!(result.ai_summary_pending());

        result.ai_summary = "<p>No issues.</p>".into();
        assert!(!result.ai_summary_pending());

        result.ai_summary_status = Some("pending".into());
        assert!(result.ai_summary_pending());
    }

    #[test]
    fn test_history_timestamp_formatting() {
        let item = HistoryItem {
            timestamp: "20250120_143022".into(),
            total_issues: 3,
            file_path: "/reports/audit_20250120_143022.json".into(),
        };
        assert_eq!(item.display_date(), "20 January 2025, 14:30");

        let odd = HistoryItem {
            timestamp: "yesterday".into(),
            ..item
        };
        assert_eq!(odd.display_date(), "yesterday");
    }

    #[test]
    fn test_history_tolerates_bad_entries() {
        let response: HistoryResponse = serde_json::from_value(json!({
            "history": [
                {"timestamp": "20250120_143022", "total_issues": 3, "file_path": "/reports/a.json"},
                {"timestamp": "20250119_091545", "total_issues": "many", "file_path": "/reports/b.json"},
                {"timestamp": "20250118_080000", "file_path": "/reports/c.json"},
                "garbage"
            ]
        }))
        .unwrap();

        let (items, skipped) = response.into_items();
        assert_eq!(skipped, 2);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].total_issues, 3);
        assert_eq!(items[1].file_path, "/reports/c.json");
        assert_eq!(items[1].total_issues, 0);
    }

    #[test]
    fn test_summary_status_parsing() {
        let status: SummaryStatus = serde_json::from_value(json!({
            "status": "completed",
            "summary": "All good",
            "started_at": "2025-01-20T14:30:22Z",
            "completed_at": "2025-01-20T14:31:02Z"
        }))
        .unwrap();
        assert_eq!(status.status, SummaryStatusKind::Completed);
        assert_eq!(status.summary.as_deref(), Some("All good"));
    }
}
