use crate::{
    http::{self, ReportService},
    k8s::{ClusterApi, KubeCluster},
    scan::{ScanMetrics, Scanner},
};
use anyhow::{bail, Result};
use clap::Parser;
use prometheus_client::registry::Registry;
use std::{
    net::SocketAddr,
    num::{NonZeroU32, NonZeroUsize},
    sync::Arc,
};
use tracing::{info, info_span, warn, Instrument};

#[derive(Debug, Parser)]
#[clap(name = "kube-auditor", about = "A read-only Kubernetes security auditor")]
pub struct Args {
    #[clap(
        long,
        default_value = "kube_auditor=info,warn",
        env = "KUBE_AUDITOR_LOG"
    )]
    log_level: kubert::LogFilter,

    #[clap(long, default_value = "plain")]
    log_format: kubert::LogFormat,

    #[clap(flatten)]
    client: kubert::ClientArgs,

    #[clap(flatten)]
    admin: kubert::AdminArgs,

    /// The address on which scan reports are served.
    #[clap(long, default_value = "0.0.0.0:5000", env = "KUBE_AUDITOR_HTTP_ADDR")]
    http_addr: SocketAddr,

    /// The number of namespaces scanned at once.
    #[clap(long, default_value = "4")]
    scan_concurrency: NonZeroUsize,

    /// The maximum number of objects requested per list call.
    #[clap(long, default_value = "500")]
    list_page_size: NonZeroU32,
}

impl Args {
    #[inline]
    pub async fn parse_and_run() -> Result<()> {
        Self::parse().run().await
    }

    pub async fn run(self) -> Result<()> {
        let Self {
            log_level,
            log_format,
            client,
            admin,
            http_addr,
            scan_concurrency,
            list_page_size,
        } = self;

        let mut prom = <Registry>::default();
        let scan_metrics = ScanMetrics::register(prom.sub_registry_with_prefix("kube_auditor"));
        let rt_metrics = kubert::RuntimeMetrics::register(prom.sub_registry_with_prefix("kube"));

        let runtime = kubert::Runtime::builder()
            .with_log(log_level, log_format)
            .with_metrics(rt_metrics)
            .with_admin(admin.into_builder().with_prometheus(prom))
            .with_client(client)
            .build()
            .await?;

        let cluster = KubeCluster::new(runtime.client()).with_page_size(list_page_size.get());

        // A failed probe is not fatal: requests report the error until the cluster is reachable.
        match cluster.version().await {
            Ok(version) => info!(%version, "Connected to cluster"),
            Err(error) => warn!(%error, "Failed to connect to cluster"),
        }

        let scanner =
            Scanner::new(cluster, scan_metrics).with_concurrency(scan_concurrency.get());
        let svc = ReportService::new(Arc::new(scanner));
        tokio::spawn(
            http::serve(http_addr, svc, runtime.shutdown_handle()).instrument(info_span!("http")),
        );

        // Block the main thread on the shutdown signal. Once it fires, wait for in-flight
        // requests to complete before exiting.
        if runtime.run().await.is_err() {
            bail!("Aborted");
        }

        Ok(())
    }
}
