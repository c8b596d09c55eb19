use kube_auditor_core::Summary;
use kube_auditor_k8s_api::ErrorKind;
use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{counter::Counter, family::Family, histogram::Histogram},
    registry::{Registry, Unit},
};
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct ScanMetrics {
    scans: Family<ScanLabels, Counter>,
    duration: Histogram,
    namespace_errors: Family<ErrorLabels, Counter>,
    violations: Family<CategoryLabels, Counter>,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct ScanLabels {
    outcome: &'static str,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct ErrorLabels {
    kind: &'static str,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct CategoryLabels {
    category: &'static str,
}

// === impl ScanMetrics ===

impl Default for ScanMetrics {
    /// Metrics that are recorded but not exported.
    fn default() -> Self {
        Self {
            scans: Family::default(),
            duration: Self::duration_histogram(),
            namespace_errors: Family::default(),
            violations: Family::default(),
        }
    }
}

impl ScanMetrics {
    pub fn register(reg: &mut Registry) -> Self {
        let metrics = Self::default();

        reg.register(
            "scans",
            "Count of cluster scans by outcome",
            metrics.scans.clone(),
        );
        reg.register_with_unit(
            "scan_duration",
            "Histogram of the time taken to scan the cluster",
            Unit::Seconds,
            metrics.duration.clone(),
        );
        reg.register(
            "namespace_errors",
            "Count of namespaces that could not be fully scanned, by error kind",
            metrics.namespace_errors.clone(),
        );
        reg.register(
            "violations",
            "Count of findings reported, by category",
            metrics.violations.clone(),
        );

        metrics
    }

    fn duration_histogram() -> Histogram {
        Histogram::new([0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 300.0])
    }

    pub(crate) fn namespace_error(&self, kind: ErrorKind) {
        self.namespace_errors
            .get_or_create(&ErrorLabels {
                kind: kind.as_str(),
            })
            .inc();
    }

    pub(crate) fn scan_completed(&self, summary: &Summary, elapsed: Duration) {
        let outcome = if summary.namespaces_skipped + summary.namespaces_failed == 0 {
            "complete"
        } else {
            "partial"
        };
        self.scans.get_or_create(&ScanLabels { outcome }).inc();
        self.duration.observe(elapsed.as_secs_f64());

        for (category, count) in [
            ("latest_tag", summary.latest_tag_issues),
            ("root_user", summary.root_user_issues),
            ("cis", summary.cis_violations),
            ("network_policy", summary.network_policy_issues),
            ("service_account", summary.service_account_issues),
        ] {
            self.violations
                .get_or_create(&CategoryLabels { category })
                .inc_by(count as u64);
        }
    }

    pub(crate) fn scan_failed(&self, elapsed: Duration) {
        self.scans
            .get_or_create(&ScanLabels { outcome: "failed" })
            .inc();
        self.duration.observe(elapsed.as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus_client::encoding::text::encode;

    #[test]
    fn records_scan_outcomes() {
        let mut reg = Registry::default();
        let metrics = ScanMetrics::register(&mut reg);

        let summary = Summary {
            namespaces_scanned: 2,
            namespaces_failed: 1,
            cis_violations: 3,
            ..Default::default()
        };
        metrics.scan_completed(&summary, Duration::from_millis(250));
        metrics.namespace_error(ErrorKind::Unavailable);
        metrics.scan_failed(Duration::from_millis(10));

        let mut text = String::new();
        encode(&mut text, &reg).unwrap();
        assert!(text.contains(r#"scans_total{outcome="partial"} 1"#), "{text}");
        assert!(text.contains(r#"scans_total{outcome="failed"} 1"#), "{text}");
        assert!(
            text.contains(r#"namespace_errors_total{kind="unavailable"} 1"#),
            "{text}"
        );
        assert!(
            text.contains(r#"violations_total{category="cis"} 3"#),
            "{text}"
        );
        assert!(text.contains("scan_duration_seconds_count 2"), "{text}");
    }
}
