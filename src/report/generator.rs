//! Report generation.
//!
//! This module renders audit results as Markdown or JSON documents and
//! as compact terminal summaries. All styling goes through the fixed
//! emoji tokens on [`RiskLevel`] and [`Severity`].

use crate::analysis::{most_common_types, sort_by_severity, VulnerabilitySummary};
use crate::history::HistoryOutcome;
use crate::models::{AuditResult, ComplianceReport, RiskLevel, Severity, VulnerabilityDetail};
use crate::summary::SummaryState;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Resolve the AI narrative to show, preferring a finished poll over the audit payload.
pub fn resolve_ai_summary(result: &AuditResult, polled: Option<&SummaryState>) -> String {
    match polled {
        Some(SummaryState::Completed { summary }) => strip_html(summary),
        Some(SummaryState::Failed { message, .. }) => {
            format!("AI summary unavailable: {}", message)
        }
        Some(SummaryState::Pending) => "AI analysis in progress...".to_string(),
        None => strip_html(&result.ai_summary),
    }
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(result: &AuditResult, polled: Option<&SummaryState>) -> String {
    let mut output = String::new();

    output.push_str("# Sentinel Audit Report\n\n");
    output.push_str(&generate_metadata_section(result, Utc::now()));
    output.push_str(&generate_risk_section(result));
    output.push_str(&generate_ai_section(&resolve_ai_summary(result, polled)));
    output.push_str(&generate_vulnerabilities_section(&result.vulnerabilities));
    output.push_str(&generate_intelligence_section(result));
    output.push_str(&generate_list_section("Recommendations", &result.recommendations));
    output.push_str(&generate_list_section(
        "Gas Optimization Hints",
        &result.gas_optimization_hints,
    ));
    output.push_str(&generate_footer());

    output
}

fn generate_metadata_section(result: &AuditResult, generated_at: DateTime<Utc>) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Contract:** `{}`\n", result.contract_address));
    if !result.chain.is_empty() {
        section.push_str(&format!("- **Chain:** {}\n", result.chain));
    }
    if !result.audit_timestamp.is_empty() {
        section.push_str(&format!("- **Audited At:** {}\n", result.audit_timestamp));
    }
    if let Some(name) = result.contract_info.contract_name.as_deref() {
        section.push_str(&format!("- **Contract Name:** {}\n", name));
    }
    section.push_str(&format!(
        "- **Report Generated:** {}\n",
        generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    if !result.audit_file_path.is_empty() {
        section.push_str(&format!("- **Stored Report:** `{}`\n", result.audit_file_path));
    }
    section.push('\n');

    section
}

fn generate_risk_section(result: &AuditResult) -> String {
    let risk = result.risk();
    let metrics = &result.security_metrics;
    let mut section = String::new();

    section.push_str("## Risk Assessment\n\n");
    section.push_str(&format!(
        "{} **{}** ({} risk, score {:.1})\n\n",
        risk.emoji(),
        risk.user_label(),
        risk,
        result.risk_score
    ));
    section.push_str(&format!("> {}\n\n", risk.recommendation()));

    section.push_str("| Security Score | Code Quality | Trust Score |\n");
    section.push_str("|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {:.0} | {:.0} | {:.0} |\n\n",
        metrics.security_score, metrics.code_quality_score, metrics.trust_score
    ));

    section
}

fn generate_ai_section(summary: &str) -> String {
    if summary.trim().is_empty() {
        return String::new();
    }

    format!("## AI Threat Analysis\n\n{}\n\n", summary.trim())
}

fn generate_vulnerabilities_section(vulnerabilities: &[VulnerabilityDetail]) -> String {
    let mut section = String::new();
    section.push_str("## Vulnerabilities\n\n");

    if vulnerabilities.is_empty() {
        section.push_str("No vulnerabilities were reported for this contract. 🎉\n\n");
        return section;
    }

    let summary = VulnerabilitySummary::from_vulnerabilities(vulnerabilities);
    section.push_str(&format!(
        "| {} Critical | {} High | {} Medium | {} Low | {} Info | **Total** |\n",
        Severity::Critical.emoji(),
        Severity::High.emoji(),
        Severity::Medium.emoji(),
        Severity::Low.emoji(),
        Severity::Informational.emoji(),
    ));
    section.push_str("|:---:|:---:|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | {} | {} | **{}** |\n\n",
        summary.critical,
        summary.high,
        summary.medium,
        summary.low,
        summary.informational,
        summary.total
    ));

    let common = most_common_types(&summary, 5);
    if common.len() > 1 {
        section.push_str("### Most Common Findings\n\n");
        for (kind, count) in common {
            section.push_str(&format!("- {} ({})\n", kind, count));
        }
        section.push('\n');
    }

    let mut sorted = vulnerabilities.to_vec();
    sort_by_severity(&mut sorted);
    for vuln in &sorted {
        section.push_str(&generate_vulnerability_block(vuln));
    }

    section
}

fn generate_vulnerability_block(vuln: &VulnerabilityDetail) -> String {
    let severity = vuln.severity();
    let mut block = String::new();

    block.push_str(&format!(
        "### {} **{}** {}\n\n",
        severity.emoji(),
        severity.to_string().to_uppercase(),
        vuln.kind
    ));

    match (vuln.function_name.as_deref(), vuln.line_number) {
        (Some(func), Some(line)) => block.push_str(&format!("**Location:** `{}` (line {})\n\n", func, line)),
        (Some(func), None) => block.push_str(&format!("**Location:** `{}`\n\n", func)),
        (None, Some(line)) => block.push_str(&format!("**Location:** line {}\n\n", line)),
        (None, None) => {}
    }
    if !vuln.description.is_empty() {
        block.push_str(&format!("**Description:** {}\n\n", vuln.description));
    }
    if !vuln.impact.is_empty() {
        block.push_str(&format!("**Impact:** {}\n\n", vuln.impact));
    }
    if !vuln.recommendation.is_empty() {
        block.push_str(&format!("**Recommendation:** {}\n\n", vuln.recommendation));
    }

    block
}

fn generate_intelligence_section(result: &AuditResult) -> String {
    let info = &result.contract_info;
    let owner = &result.ownership_analysis;
    let trading = &result.trading_analysis;
    let mut section = String::new();

    section.push_str("## Contract Intelligence\n\n");
    section.push_str(&format!(
        "- **Verified Source:** {}\n",
        yes_no(info.is_verified)
    ));
    if let Some(compiler) = info.compiler_version.as_deref() {
        section.push_str(&format!("- **Compiler:** {}\n", compiler));
    }
    if let Some(proxy) = info.proxy_type.as_deref() {
        section.push_str(&format!("- **Proxy:** {}\n", proxy));
    }
    if let Some(addr) = owner.owner_address.as_deref() {
        section.push_str(&format!("- **Owner:** `{}`\n", addr));
    }
    section.push_str(&format!(
        "- **Ownership Renounced:** {}\n",
        yes_no(owner.ownership_renounced)
    ));
    if !owner.centralization_risk.is_empty() {
        section.push_str(&format!(
            "- **Centralization Risk:** {}\n",
            owner.centralization_risk
        ));
    }
    if trading.is_honeypot {
        section.push_str(&format!(
            "- 🚨 **Honeypot detected** (confidence {:.0}%)\n",
            trading.honeypot_confidence
        ));
    }
    if let (Some(buy), Some(sell)) = (trading.buy_tax, trading.sell_tax) {
        section.push_str(&format!("- **Buy/Sell Tax:** {:.1}% / {:.1}%\n", buy, sell));
    }
    section.push('\n');

    section
}

fn generate_list_section(title: &str, items: &[String]) -> String {
    if items.is_empty() {
        return String::new();
    }

    let mut section = format!("## {}\n\n", title);
    for (i, item) in items.iter().enumerate() {
        section.push_str(&format!("{}. {}\n", i + 1, item));
    }
    section.push('\n');

    section
}

fn generate_footer() -> String {
    "---\n\n*Generated by Sentinel. Findings come from the Auto Sentinel audit service.*\n"
        .to_string()
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    generated_at: DateTime<Utc>,
    audit: &'a AuditResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    ai_summary: Option<String>,
}

/// Generate a JSON report. The audit payload is embedded unchanged.
pub fn generate_json_report(result: &AuditResult, polled: Option<&SummaryState>) -> Result<String> {
    let report = JsonReport {
        generated_at: Utc::now(),
        audit: result,
        ai_summary: polled.map(|_| resolve_ai_summary(result, polled)),
    };
    serde_json::to_string_pretty(&report).map_err(Into::into)
}

/// Compact summary for the terminal.
pub fn generate_terminal_summary(result: &AuditResult, polled: Option<&SummaryState>) -> String {
    let risk = result.risk();
    let summary = VulnerabilitySummary::from_vulnerabilities(&result.vulnerabilities);
    let mut out = String::new();

    out.push_str(&format!("\n📊 Threat Report for {}\n", result.contract_address));
    out.push_str(&format!(
        "   Risk: {} {} ({}, score {:.1})\n",
        risk.emoji(),
        risk,
        risk.user_label(),
        result.risk_score
    ));
    out.push_str(&format!("   {}\n", risk.recommendation()));
    out.push_str(&format!(
        "   Findings: {} | {} Critical: {} | {} High: {} | {} Medium: {} | {} Low: {}\n",
        summary.total,
        Severity::Critical.emoji(),
        summary.critical,
        Severity::High.emoji(),
        summary.high,
        Severity::Medium.emoji(),
        summary.medium,
        Severity::Low.emoji(),
        summary.low
    ));
    if let Some(worst) = summary.worst() {
        out.push_str(&format!("   Worst finding: {} {}\n", worst.emoji(), worst));
    }
    if result.trading_analysis.is_honeypot {
        out.push_str("   🚨 Honeypot pattern detected\n");
    }

    let ai = resolve_ai_summary(result, polled);
    if !ai.trim().is_empty() {
        out.push_str("\n🧠 AI Threat Analysis:\n");
        for line in ai.lines().filter(|l| !l.trim().is_empty()) {
            out.push_str(&format!("   {}\n", line.trim()));
        }
    }

    out
}

/// Terminal listing of past runs.
pub fn generate_history_listing(address: &str, outcome: &HistoryOutcome) -> String {
    let mut out = format!("\n📜 Analysis history for {}\n", address);

    match outcome {
        HistoryOutcome::Empty => {
            out.push_str("   No analysis history yet. Run `sentinel scan` to start one.\n");
        }
        HistoryOutcome::Entries(items) => {
            for item in items {
                out.push_str(&format!(
                    "   • {} | {} issue{} | {}\n",
                    item.display_date(),
                    item.total_issues,
                    if item.total_issues == 1 { "" } else { "s" },
                    item.file_path
                ));
            }
            out.push_str(&format!("\n   Total: {} runs\n", items.len()));
        }
    }

    out
}

/// Terminal rendering of a compliance report.
pub fn generate_compliance_summary(report: &ComplianceReport) -> String {
    let mut out = format!("\n⚖️  Compliance report for {}\n", report.contract_address);

    let status = if report.compliance_status.is_empty() {
        "UNKNOWN"
    } else {
        report.compliance_status.as_str()
    };
    out.push_str(&format!("   Status: {}\n", status));
    out.push_str(&format!("   Legal risk score: {:.1}\n", report.legal_risk_score));
    out.push_str(&format!("   Violations: {}\n", report.total_violations));
    if report.report_required {
        out.push_str("   🚨 Regulatory report required\n");
    }

    for violation in &report.violations {
        out.push_str(&format!(
            "   • [{}] {} ({}), action: {}\n",
            violation.severity_level,
            violation.violation_type,
            violation.law_article,
            violation.compliance_action
        ));
    }

    if !report.recommended_actions.is_empty() {
        out.push_str("   Recommended actions:\n");
        for action in &report.recommended_actions {
            out.push_str(&format!("     - {}\n", action));
        }
    }

    out
}

/// Whether the audited risk meets a `--fail-on` threshold.
pub fn exceeds_threshold(result: &AuditResult, threshold: RiskLevel) -> bool {
    let risk = result.risk();
    risk != RiskLevel::Unknown && risk >= threshold
}

/// Remove markup from backend-provided HTML, keeping paragraph breaks.
///
/// A `<` only opens a tag when followed by a letter, `/` or `!`; anything
/// else, and a tag left unterminated, is kept as text.
pub fn strip_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut tag = String::new();
    let mut in_tag = false;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '<' if !in_tag
                && chars
                    .peek()
                    .is_some_and(|next| next.is_ascii_alphabetic() || *next == '/' || *next == '!') =>
            {
                in_tag = true;
                tag.clear();
            }
            '>' if in_tag => {
                in_tag = false;
                let name = tag
                    .trim_start_matches('/')
                    .split_whitespace()
                    .next()
                    .unwrap_or("")
                    .to_lowercase();
                if matches!(name.as_str(), "p" | "br" | "br/" | "div" | "li" | "h1" | "h2" | "h3" | "h4") {
                    out.push('\n');
                }
            }
            _ if in_tag => tag.push(c),
            _ => out.push(c),
        }
    }

    if in_tag {
        out.push('<');
        out.push_str(&tag);
    }

    out.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HistoryItem;

    fn create_test_result() -> AuditResult {
        let mut result = AuditResult {
            contract_address: "0x1234567890123456789012345678901234567890".to_string(),
            chain: "ethereum".to_string(),
            audit_timestamp: "2025-01-20T14:30:22Z".to_string(),
            risk_level: "High".to_string(),
            risk_score: 72.5,
            ai_summary: "<p>Owner can <b>mint</b> freely.</p><p>Liquidity unlocked.</p>".to_string(),
            recommendations: vec!["Renounce minting rights".to_string()],
            ..Default::default()
        };
        result.vulnerabilities = vec![
            VulnerabilityDetail {
                kind: "Unrestricted Mint".to_string(),
                severity: "Critical".to_string(),
                description: "Owner can mint unlimited tokens".to_string(),
                function_name: Some("mint".to_string()),
                line_number: Some(88),
                ..Default::default()
            },
            VulnerabilityDetail {
                kind: "Floating Pragma".to_string(),
                severity: "Low".to_string(),
                ..Default::default()
            },
        ];
        result.trading_analysis.is_honeypot = true;
        result.trading_analysis.honeypot_confidence = 87.0;
        result
    }

    #[test]
    fn test_generate_markdown_report() {
        let markdown = generate_markdown_report(&create_test_result(), None);

        assert!(markdown.contains("# Sentinel Audit Report"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("High Risk"));
        assert!(markdown.contains("## Vulnerabilities"));
        assert!(markdown.contains("Unrestricted Mint"));
        assert!(markdown.contains("`mint` (line 88)"));
        assert!(markdown.contains("Honeypot detected"));
        assert!(markdown.contains("1. Renounce minting rights"));
        assert!(!markdown.contains("<p>"));
    }

    #[test]
    fn test_critical_findings_listed_first() {
        let markdown = generate_markdown_report(&create_test_result(), None);
        let critical = markdown.find("**CRITICAL** Unrestricted Mint").unwrap();
        let low = markdown.find("**LOW** Floating Pragma").unwrap();
        assert!(critical < low);
    }

    #[test]
    fn test_polled_summary_takes_precedence() {
        let result = create_test_result();
        let done = SummaryState::Completed {
            summary: "<p>Final narrative</p>".to_string(),
        };
        assert_eq!(resolve_ai_summary(&result, Some(&done)), "Final narrative");

        let failed = SummaryState::Failed {
            message: "AI analysis timed out after 300s".to_string(),
            timed_out: true,
        };
        assert!(resolve_ai_summary(&result, Some(&failed)).contains("timed out"));
    }

    #[test]
    fn test_generate_json_report_embeds_audit() {
        let json = generate_json_report(&create_test_result(), None).unwrap();
        assert!(json.contains("\"audit\""));
        assert!(json.contains("\"contract_address\""));

        let done = SummaryState::Completed {
            summary: "Final narrative".to_string(),
        };
        let json = generate_json_report(&create_test_result(), Some(&done)).unwrap();
        assert!(json.contains("Final narrative"));
    }

    #[test]
    fn test_terminal_summary() {
        let text = generate_terminal_summary(&create_test_result(), None);
        assert!(text.contains("High Risk"));
        assert!(text.contains("Findings: 2"));
        assert!(text.contains("Worst finding: 🔴 Critical"));
        assert!(text.contains("Honeypot"));
        assert!(text.contains("Owner can mint freely."));
    }

    #[test]
    fn test_history_listing_empty_and_filled() {
        let empty = generate_history_listing("0xabc", &HistoryOutcome::Empty);
        assert!(empty.contains("No analysis history"));

        let filled = generate_history_listing(
            "0xabc",
            &HistoryOutcome::Entries(vec![HistoryItem {
                timestamp: "20250120_143022".to_string(),
                total_issues: 1,
                file_path: "/reports/a.json".to_string(),
            }]),
        );
        assert!(filled.contains("20 January 2025, 14:30"));
        assert!(filled.contains("1 issue |"));
    }

    #[test]
    fn test_exceeds_threshold() {
        let result = create_test_result();
        assert!(exceeds_threshold(&result, RiskLevel::Medium));
        assert!(exceeds_threshold(&result, RiskLevel::High));
        assert!(!exceeds_threshold(&result, RiskLevel::Critical));

        let unknown = AuditResult {
            risk_level: "n/a".to_string(),
            ..result
        };
        assert!(!exceeds_threshold(&unknown, RiskLevel::Low));
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(strip_html("<p>a &amp; b</p>"), "a & b");
        assert_eq!(strip_html("one<br>two"), "one\ntwo");
        assert_eq!(strip_html("plain"), "plain");
        assert_eq!(strip_html("<p>a < b and c > d</p>"), "a < b and c > d");
        assert_eq!(strip_html("balance <= limit"), "balance <= limit");
        assert_eq!(strip_html("x <unclosed"), "x <unclosed");
    }
}
