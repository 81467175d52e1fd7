//! Vulnerability aggregation and statistics.
//!
//! This module groups the findings of an audit and computes the counters
//! shown in reports.

use crate::models::{Severity, VulnerabilityDetail};
use std::collections::HashMap;

/// Counts of findings per severity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VulnerabilitySummary {
    pub total: usize,
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub informational: usize,
    /// Findings grouped by vulnerability type.
    pub by_type: HashMap<String, usize>,
}

impl VulnerabilitySummary {
    pub fn from_vulnerabilities(vulnerabilities: &[VulnerabilityDetail]) -> Self {
        let mut summary = Self {
            total: vulnerabilities.len(),
            ..Self::default()
        };

        for vuln in vulnerabilities {
            match vuln.severity() {
                Severity::Critical => summary.critical += 1,
                Severity::High => summary.high += 1,
                Severity::Medium => summary.medium += 1,
                Severity::Low => summary.low += 1,
                Severity::Informational => summary.informational += 1,
            }

            *summary.by_type.entry(vuln.kind.clone()).or_insert(0) += 1;
        }

        summary
    }

    /// Highest severity present, if any findings exist.
    pub fn worst(&self) -> Option<Severity> {
        [
            (Severity::Critical, self.critical),
            (Severity::High, self.high),
            (Severity::Medium, self.medium),
            (Severity::Low, self.low),
            (Severity::Informational, self.informational),
        ]
        .into_iter()
        .find(|(_, count)| *count > 0)
        .map(|(severity, _)| severity)
    }
}

/// Sort findings by severity (critical first), keeping backend order within a level.
pub fn sort_by_severity(vulnerabilities: &mut [VulnerabilityDetail]) {
    vulnerabilities.sort_by(|a, b| b.severity().cmp(&a.severity()));
}

/// Most frequent vulnerability types, highest count first.
pub fn most_common_types(summary: &VulnerabilitySummary, n: usize) -> Vec<(String, usize)> {
    let mut types: Vec<(String, usize)> = summary
        .by_type
        .iter()
        .map(|(kind, count)| (kind.clone(), *count))
        .collect();

    types.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    types.truncate(n);
    types
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vuln(kind: &str, severity: &str) -> VulnerabilityDetail {
        VulnerabilityDetail {
            kind: kind.to_string(),
            severity: severity.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_summary_counts() {
        let vulns = vec![
            vuln("Reentrancy", "Critical"),
            vuln("Reentrancy", "High"),
            vuln("Floating Pragma", "Informational"),
            vuln("Unchecked Call", "low"),
        ];

        let summary = VulnerabilitySummary::from_vulnerabilities(&vulns);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.critical, 1);
        assert_eq!(summary.high, 1);
        assert_eq!(summary.low, 1);
        assert_eq!(summary.informational, 1);
        assert_eq!(summary.by_type.get("Reentrancy"), Some(&2));
        assert_eq!(summary.worst(), Some(Severity::Critical));
    }

    #[test]
    fn test_empty_summary() {
        let summary = VulnerabilitySummary::from_vulnerabilities(&[]);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.worst(), None);
    }

    #[test]
    fn test_sort_by_severity() {
        let mut vulns = vec![
            vuln("a", "Low"),
            vuln("b", "Critical"),
            vuln("c", "Medium"),
        ];
        sort_by_severity(&mut vulns);
        let order: Vec<_> = vulns.iter().map(|v| v.kind.as_str()).collect();
        assert_eq!(order, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_rank_types() {
        let vulns = vec![
            vuln("Reentrancy", "High"),
            vuln("Reentrancy", "High"),
            vuln("Overflow", "Medium"),
        ];
        let summary = VulnerabilitySummary::from_vulnerabilities(&vulns);
        let top = most_common_types(&summary, 1);
        assert_eq!(top, vec![("Reentrancy".to_string(), 2)]);
    }
}
