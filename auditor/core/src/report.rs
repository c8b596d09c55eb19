use crate::violation::{LatestTagContainer, RootContainer, Severity, Violation};
use serde::Serialize;
use std::collections::BTreeMap;

/// Findings, by category, in discovery order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Findings {
    pub latest_tag_containers: Vec<LatestTagContainer>,
    pub root_containers: Vec<RootContainer>,
    pub cis_violations: Vec<Violation>,
    pub network_policy_violations: Vec<Violation>,
    pub service_account_violations: Vec<Violation>,
}

/// The outcome of scanning a single namespace.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NamespaceOutcome {
    Scanned,
    /// The auditor was not permitted to scan the namespace.
    Skipped,
    /// The scan failed part-way; any findings gathered before the failure are retained.
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    #[serde(flatten)]
    pub findings: Findings,
    pub summary: Summary,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub namespaces_scanned: usize,
    pub namespaces_skipped: usize,
    pub namespaces_failed: usize,
    pub latest_tag_issues: usize,
    pub root_user_issues: usize,
    pub cis_violations: usize,
    pub network_policy_issues: usize,
    pub service_account_issues: usize,
    pub total_issues: usize,
    /// Benchmark violations (CIS, network policy, and service account) by severity.
    pub violations_by_severity: BTreeMap<Severity, usize>,
}

/// Accumulates per-namespace results into a report.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    findings: Findings,
    scanned: usize,
    skipped: usize,
    failed: usize,
}

// === impl Findings ===

impl Findings {
    pub fn extend(&mut self, other: Findings) {
        let Findings {
            latest_tag_containers,
            root_containers,
            cis_violations,
            network_policy_violations,
            service_account_violations,
        } = other;
        self.latest_tag_containers.extend(latest_tag_containers);
        self.root_containers.extend(root_containers);
        self.cis_violations.extend(cis_violations);
        self.network_policy_violations
            .extend(network_policy_violations);
        self.service_account_violations
            .extend(service_account_violations);
    }

    pub fn len(&self) -> usize {
        self.latest_tag_containers.len()
            + self.root_containers.len()
            + self.cis_violations.len()
            + self.network_policy_violations.len()
            + self.service_account_violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over all benchmark violations, regardless of category.
    pub fn violations(&self) -> impl Iterator<Item = &Violation> {
        self.cis_violations
            .iter()
            .chain(&self.network_policy_violations)
            .chain(&self.service_account_violations)
    }
}

// === impl ReportBuilder ===

impl ReportBuilder {
    pub fn push(&mut self, outcome: NamespaceOutcome, findings: Findings) {
        match outcome {
            NamespaceOutcome::Scanned => self.scanned += 1,
            NamespaceOutcome::Skipped => self.skipped += 1,
            NamespaceOutcome::Failed => self.failed += 1,
        }
        self.findings.extend(findings);
    }

    pub fn build(self) -> ScanReport {
        let Self {
            findings,
            scanned,
            skipped,
            failed,
        } = self;

        let mut violations_by_severity = BTreeMap::new();
        for v in findings.violations() {
            *violations_by_severity.entry(v.severity).or_default() += 1;
        }

        let summary = Summary {
            namespaces_scanned: scanned,
            namespaces_skipped: skipped,
            namespaces_failed: failed,
            latest_tag_issues: findings.latest_tag_containers.len(),
            root_user_issues: findings.root_containers.len(),
            cis_violations: findings.cis_violations.len(),
            network_policy_issues: findings.network_policy_violations.len(),
            service_account_issues: findings.service_account_violations.len(),
            total_issues: findings.len(),
            violations_by_severity,
        };

        ScanReport { findings, summary }
    }
}

// === impl Summary ===

impl Summary {
    /// The sum of the per-category counts.
    pub fn category_total(&self) -> usize {
        self.latest_tag_issues
            + self.root_user_issues
            + self.cis_violations
            + self.network_policy_issues
            + self.service_account_issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::violation::{Control, Level, Locator, RootReason};
    use maplit::btreemap;
    use pretty_assertions::assert_eq;

    const CONTROL: Control = Control {
        id: "5.2.1",
        title: "Minimize the admission of privileged containers",
        severity: Severity::Critical,
        level: Some(Level::L1),
    };

    fn mk_findings(ns: &str) -> Findings {
        Findings {
            latest_tag_containers: vec![LatestTagContainer {
                namespace: ns.to_string(),
                pod: "pod-0".to_string(),
                container: "app".to_string(),
                image: "nginx:latest".to_string(),
            }],
            root_containers: vec![RootContainer {
                namespace: ns.to_string(),
                pod: "pod-0".to_string(),
                container: "app".to_string(),
                reason: RootReason::NoSecurityContext,
                scope: None,
                user_id: None,
                run_as_non_root: None,
            }],
            cis_violations: vec![CONTROL.violation(
                Locator::Container {
                    namespace: ns.to_string(),
                    pod: "pod-0".to_string(),
                    container: "app".to_string(),
                },
                "privileged",
                "unprivilege it",
            )],
            network_policy_violations: vec![],
            service_account_violations: vec![],
        }
    }

    #[test]
    fn summary_counts_match_categories() {
        let mut builder = ReportBuilder::default();
        builder.push(NamespaceOutcome::Scanned, mk_findings("ns-0"));
        builder.push(NamespaceOutcome::Skipped, Findings::default());
        builder.push(NamespaceOutcome::Failed, mk_findings("ns-2"));
        let report = builder.build();

        let summary = &report.summary;
        assert_eq!(summary.namespaces_scanned, 1);
        assert_eq!(summary.namespaces_skipped, 1);
        assert_eq!(summary.namespaces_failed, 1);
        assert_eq!(summary.latest_tag_issues, 2);
        assert_eq!(summary.root_user_issues, 2);
        assert_eq!(summary.cis_violations, 2);
        assert_eq!(summary.total_issues, 6);
        assert_eq!(summary.total_issues, summary.category_total());
        assert_eq!(
            summary.violations_by_severity,
            btreemap! { Severity::Critical => 2 }
        );

        let namespaces = report
            .findings
            .latest_tag_containers
            .iter()
            .map(|f| f.namespace.as_str())
            .collect::<Vec<_>>();
        assert_eq!(namespaces, vec!["ns-0", "ns-2"]);
    }

    #[test]
    fn serializes_camel_case() {
        let mut builder = ReportBuilder::default();
        builder.push(NamespaceOutcome::Scanned, mk_findings("ns-0"));
        let json = serde_json::to_value(builder.build()).unwrap();

        assert_eq!(
            json["rootContainers"][0],
            serde_json::json!({
                "namespace": "ns-0",
                "pod": "pod-0",
                "container": "app",
                "reason": "no security context (defaults to root)",
                "userId": null,
                "runAsNonRoot": null,
            })
        );
        assert_eq!(
            json["cisViolations"][0],
            serde_json::json!({
                "namespace": "ns-0",
                "pod": "pod-0",
                "container": "app",
                "controlId": "5.2.1",
                "controlTitle": "Minimize the admission of privileged containers",
                "severity": "Critical",
                "level": "L1",
                "description": "privileged",
                "remediation": "unprivilege it",
            })
        );
        assert_eq!(json["networkPolicyViolations"], serde_json::json!([]));
        assert_eq!(json["summary"]["totalIssues"], 3);
        assert_eq!(json["summary"]["violationsBySeverity"]["Critical"], 1);
    }

    #[test]
    fn account_locator_serializes_service_account() {
        let v = Control {
            id: "5.1.6",
            title: "Ensure that Service Account Tokens are only mounted where necessary",
            severity: Severity::Medium,
            level: None,
        }
        .violation(
            Locator::ServiceAccount {
                namespace: "ns-0".to_string(),
                service_account: "default".to_string(),
            },
            "automounted",
            "disable it",
        );
        let json = serde_json::to_value(v).unwrap();
        assert_eq!(json["serviceAccount"], "default");
        assert_eq!(json["namespace"], "ns-0");
        assert!(json.get("level").is_none());
    }
}
