use super::*;
use kube_auditor_core::RootReason;
use kube_auditor_k8s_api::ErrorKind;
use maplit::hashmap;
use pretty_assertions::assert_eq;
use std::{collections::HashMap, time::Duration};

type Listing<T> = Result<Vec<T>, ErrorKind>;

#[derive(Default)]
struct FakeCluster {
    namespaces: Vec<&'static str>,
    namespaces_error: Option<ErrorKind>,
    pods: HashMap<&'static str, Listing<k8s::Pod>>,
    service_accounts: HashMap<&'static str, Listing<k8s::ServiceAccount>>,
    network_policies: HashMap<&'static str, Listing<k8s::NetworkPolicy>>,
    delays: HashMap<&'static str, Duration>,
}

#[async_trait::async_trait]
impl ClusterApi for FakeCluster {
    async fn list_namespaces(&self) -> k8s::Result<Vec<k8s::Namespace>> {
        if let Some(kind) = self.namespaces_error {
            return Err(kind.into_error("injected namespace listing failure"));
        }
        Ok(self.namespaces.iter().map(|name| mk_ns(name)).collect())
    }

    async fn list_pods(&self, ns: &str) -> k8s::Result<Vec<k8s::Pod>> {
        if let Some(delay) = self.delays.get(ns) {
            tokio::time::sleep(*delay).await;
        }
        listing(&self.pods, ns)
    }

    async fn list_service_accounts(&self, ns: &str) -> k8s::Result<Vec<k8s::ServiceAccount>> {
        listing(&self.service_accounts, ns)
    }

    async fn list_network_policies(&self, ns: &str) -> k8s::Result<Vec<k8s::NetworkPolicy>> {
        listing(&self.network_policies, ns)
    }

    async fn version(&self) -> k8s::Result<String> {
        Ok("v1.33.0".to_string())
    }
}

fn listing<T: Clone>(
    listings: &HashMap<&'static str, Listing<T>>,
    ns: &str,
) -> k8s::Result<Vec<T>> {
    match listings.get(ns) {
        Some(Ok(items)) => Ok(items.clone()),
        Some(Err(kind)) => Err(kind.into_error(format!("injected {kind} failure in {ns}"))),
        None => Ok(Vec::new()),
    }
}

fn mk_scanner(cluster: FakeCluster) -> Scanner<FakeCluster> {
    tracing_subscriber::fmt().with_test_writer().try_init().ok();
    Scanner::new(cluster, ScanMetrics::default())
}

#[tokio::test]
async fn scans_are_idempotent() {
    let scanner = mk_scanner(FakeCluster {
        namespaces: vec!["web"],
        pods: hashmap! {
            "web" => Ok(vec![mk_pod("web-0", [("nginx", "nginx")])]),
        },
        service_accounts: hashmap! {
            "web" => Ok(vec![mk_sa("default", None)]),
        },
        ..Default::default()
    });

    let first = scanner.scan().await.expect("scan must succeed");
    let second = scanner.scan().await.expect("scan must succeed");
    assert_eq!(first, second);
    assert_eq!(
        first.summary.total_issues,
        first.summary.category_total()
    );
    assert_eq!(first.summary.namespaces_scanned, 1);
}

#[tokio::test]
async fn reports_every_category() {
    let scanner = mk_scanner(FakeCluster {
        namespaces: vec!["web"],
        pods: hashmap! {
            "web" => Ok(vec![mk_pod("web-0", [("nginx", "nginx")])]),
        },
        service_accounts: hashmap! {
            "web" => Ok(vec![mk_sa("default", None), mk_sa("locked", Some(false))]),
        },
        ..Default::default()
    });

    let report = scanner.scan().await.expect("scan must succeed");
    assert_eq!(report.findings.latest_tag_containers.len(), 1);
    assert_eq!(report.findings.latest_tag_containers[0].image, "nginx:latest");
    assert_eq!(report.findings.root_containers.len(), 1);
    assert_eq!(
        report.findings.root_containers[0].reason,
        RootReason::NoSecurityContext
    );
    assert!(!report.findings.cis_violations.is_empty());
    assert_eq!(report.findings.network_policy_violations.len(), 1);
    assert_eq!(report.findings.service_account_violations.len(), 1);
}

#[tokio::test]
async fn forbidden_service_accounts_are_skipped() {
    let scanner = mk_scanner(FakeCluster {
        namespaces: vec!["web"],
        pods: hashmap! {
            "web" => Ok(vec![mk_pod("web-0", [("nginx", "nginx:1.27")])]),
        },
        service_accounts: hashmap! { "web" => Err(ErrorKind::Forbidden) },
        ..Default::default()
    });

    let report = scanner.scan().await.expect("scan must succeed");
    assert!(report.findings.service_account_violations.is_empty());
    assert_eq!(report.findings.network_policy_violations.len(), 1);
    assert_eq!(report.summary.namespaces_scanned, 1);
    assert_eq!(report.summary.namespaces_skipped, 0);
    assert_eq!(report.summary.namespaces_failed, 0);
}

#[tokio::test]
async fn forbidden_network_policies_are_skipped() {
    let scanner = mk_scanner(FakeCluster {
        namespaces: vec!["web"],
        network_policies: hashmap! { "web" => Err(ErrorKind::Forbidden) },
        service_accounts: hashmap! {
            "web" => Ok(vec![mk_sa("default", Some(true))]),
        },
        ..Default::default()
    });

    let report = scanner.scan().await.expect("scan must succeed");
    assert!(report.findings.network_policy_violations.is_empty());
    assert_eq!(report.findings.service_account_violations.len(), 1);
    assert_eq!(report.summary.namespaces_scanned, 1);
}

#[tokio::test]
async fn network_policy_suppresses_violation() {
    let scanner = mk_scanner(FakeCluster {
        namespaces: vec!["web"],
        network_policies: hashmap! { "web" => Ok(vec![mk_netpol("deny-all")]) },
        ..Default::default()
    });

    let report = scanner.scan().await.expect("scan must succeed");
    assert!(report.findings.network_policy_violations.is_empty());
}

#[tokio::test]
async fn findings_follow_namespace_order() {
    let scanner = mk_scanner(FakeCluster {
        namespaces: vec!["a", "b", "c", "d"],
        pods: hashmap! {
            "a" => Ok(vec![mk_pod("pod", [("app", "a")])]),
            "b" => Ok(vec![mk_pod("pod", [("app", "b")])]),
            "c" => Ok(vec![mk_pod("pod", [("app", "c")])]),
            "d" => Ok(vec![mk_pod("pod", [("app", "d")])]),
        },
        // Earlier namespaces finish last.
        delays: hashmap! {
            "a" => Duration::from_millis(30),
            "b" => Duration::from_millis(20),
            "c" => Duration::from_millis(10),
        },
        ..Default::default()
    })
    .with_concurrency(4);

    let report = scanner.scan().await.expect("scan must succeed");
    let images = report
        .findings
        .latest_tag_containers
        .iter()
        .map(|f| f.image.as_str())
        .collect::<Vec<_>>();
    assert_eq!(images, vec!["a:latest", "b:latest", "c:latest", "d:latest"]);

    let namespaces = report
        .findings
        .network_policy_violations
        .iter()
        .map(|v| v.locator.namespace())
        .collect::<Vec<_>>();
    assert_eq!(namespaces, vec!["a", "b", "c", "d"]);
}

#[tokio::test]
async fn failed_namespace_keeps_partial_findings() {
    let scanner = mk_scanner(FakeCluster {
        namespaces: vec!["a", "b"],
        pods: hashmap! {
            "a" => Ok(vec![mk_pod("pod", [("app", "a")])]),
            "b" => Ok(vec![mk_pod("pod", [("app", "b")])]),
        },
        network_policies: hashmap! { "a" => Err(ErrorKind::Unavailable) },
        service_accounts: hashmap! {
            "a" => Ok(vec![mk_sa("default", None)]),
            "b" => Ok(vec![mk_sa("default", None)]),
        },
        ..Default::default()
    });

    let report = scanner.scan().await.expect("scan must succeed");
    assert_eq!(report.summary.namespaces_scanned, 1);
    assert_eq!(report.summary.namespaces_failed, 1);

    // Container findings from the failed namespace are kept.
    let images = report
        .findings
        .latest_tag_containers
        .iter()
        .map(|f| f.image.as_str())
        .collect::<Vec<_>>();
    assert_eq!(images, vec!["a:latest", "b:latest"]);

    // The walk stopped before service accounts were listed in the failed namespace.
    let accounts = report
        .findings
        .service_account_violations
        .iter()
        .map(|v| v.locator.namespace())
        .collect::<Vec<_>>();
    assert_eq!(accounts, vec!["b"]);
}

#[tokio::test]
async fn forbidden_pods_skip_namespace() {
    let scanner = mk_scanner(FakeCluster {
        namespaces: vec!["secret", "web"],
        pods: hashmap! {
            "secret" => Err(ErrorKind::Forbidden),
            "web" => Ok(vec![mk_pod("pod", [("app", "web")])]),
        },
        ..Default::default()
    });

    let report = scanner.scan().await.expect("scan must succeed");
    assert_eq!(report.summary.namespaces_scanned, 1);
    assert_eq!(report.summary.namespaces_skipped, 1);
    assert!(report
        .findings
        .violations()
        .all(|v| v.locator.namespace() == "web"));
}

#[tokio::test]
async fn namespace_listing_failure_is_fatal() {
    for kind in [
        ErrorKind::Unauthorized,
        ErrorKind::Forbidden,
        ErrorKind::Unavailable,
        ErrorKind::Other,
    ] {
        let scanner = mk_scanner(FakeCluster {
            namespaces_error: Some(kind),
            ..Default::default()
        });
        let error = scanner.scan().await.expect_err("scan must fail");
        assert_eq!(error.kind(), kind);
    }
}

#[tokio::test]
async fn sequential_scan_matches_concurrent_scan() {
    let mk_cluster = || FakeCluster {
        namespaces: vec!["default", "web"],
        pods: hashmap! {
            "default" => Ok(vec![mk_pod("pod", [("app", "busybox")])]),
            "web" => Ok(vec![mk_pod("pod", [("app", "nginx")])]),
        },
        ..Default::default()
    };

    let sequential = mk_scanner(mk_cluster()).with_concurrency(1);
    let concurrent = mk_scanner(mk_cluster()).with_concurrency(8);
    assert_eq!(
        sequential.scan().await.expect("scan must succeed"),
        concurrent.scan().await.expect("scan must succeed"),
    );
}

fn mk_ns(name: &str) -> k8s::Namespace {
    k8s::Namespace {
        metadata: k8s::ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn mk_pod(
    name: impl Into<String>,
    containers: impl IntoIterator<Item = (&'static str, &'static str)>,
) -> k8s::Pod {
    k8s::Pod {
        metadata: k8s::ObjectMeta {
            name: Some(name.into()),
            ..Default::default()
        },
        spec: Some(k8s::PodSpec {
            containers: containers
                .into_iter()
                .map(|(name, image)| k8s::Container {
                    name: name.to_string(),
                    image: Some(image.to_string()),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn mk_sa(name: &str, automount: Option<bool>) -> k8s::ServiceAccount {
    k8s::ServiceAccount {
        metadata: k8s::ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        automount_service_account_token: automount,
        ..Default::default()
    }
}

fn mk_netpol(name: &str) -> k8s::NetworkPolicy {
    k8s::NetworkPolicy {
        metadata: k8s::ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}
