#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod convert;
mod metrics;
mod namespace;

#[cfg(test)]
mod tests;

pub use self::{
    metrics::ScanMetrics,
    namespace::{walk, WalkError},
};
use futures::prelude::*;
use kube_auditor_core::{Catalog, Findings, NamespaceOutcome, ReportBuilder, ScanReport};
use kube_auditor_k8s_api::{self as k8s, ClusterApi, ResourceExt};
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// Audits every namespace in a cluster.
#[derive(Debug)]
pub struct Scanner<C> {
    cluster: C,
    catalog: Catalog,
    concurrency: usize,
    metrics: ScanMetrics,
}

// === impl Scanner ===

impl<C: ClusterApi> Scanner<C> {
    pub const DEFAULT_CONCURRENCY: usize = 4;

    pub fn new(cluster: C, metrics: ScanMetrics) -> Self {
        Self {
            cluster,
            catalog: Catalog::default(),
            concurrency: Self::DEFAULT_CONCURRENCY,
            metrics,
        }
    }

    /// Sets the number of namespaces walked at once. A value of 1 walks namespaces sequentially.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn cluster(&self) -> &C {
        &self.cluster
    }

    /// Scans the cluster.
    ///
    /// Only a failure to list namespaces fails the scan. Namespaces that cannot be walked are
    /// counted in the report's summary, and findings gathered before a namespace failed are
    /// kept. Findings are reported in namespace listing order.
    #[instrument(name = "scan", skip(self))]
    pub async fn scan(&self) -> k8s::Result<ScanReport> {
        let start = Instant::now();
        info!("Scanning cluster");

        let namespaces = match self.cluster.list_namespaces().await {
            Ok(namespaces) => namespaces,
            Err(error) => {
                self.metrics.scan_failed(start.elapsed());
                return Err(error);
            }
        };
        let names = namespaces.iter().map(|ns| ns.name_any()).collect::<Vec<_>>();
        debug!(namespaces = names.len());

        let walks = names
            .iter()
            .map(|ns| self.walk_namespace(ns))
            .collect::<Vec<_>>();
        let results = stream::iter(walks)
            .buffered(self.concurrency)
            .collect::<Vec<_>>()
            .await;

        let mut report = ReportBuilder::default();
        for (ns, res) in results {
            match res {
                Ok(findings) => report.push(NamespaceOutcome::Scanned, findings),
                Err(WalkError { findings, error }) => {
                    self.metrics.namespace_error(error.kind());
                    if error.is_forbidden() {
                        warn!(namespace = %ns, %error, "Not permitted to scan namespace; skipping");
                        report.push(NamespaceOutcome::Skipped, findings);
                    } else {
                        error!(namespace = %ns, %error, "Failed to scan namespace");
                        report.push(NamespaceOutcome::Failed, findings);
                    }
                }
            }
        }

        let report = report.build();
        self.metrics.scan_completed(&report.summary, start.elapsed());
        info!(
            scanned = report.summary.namespaces_scanned,
            skipped = report.summary.namespaces_skipped,
            failed = report.summary.namespaces_failed,
            issues = report.summary.total_issues,
            "Scan complete"
        );
        Ok(report)
    }

    async fn walk_namespace<'a>(
        &'a self,
        ns: &'a str,
    ) -> (&'a str, Result<Findings, WalkError>) {
        let res = namespace::walk(&self.cluster, &self.catalog, ns).await;
        (ns, res)
    }
}
