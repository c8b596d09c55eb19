use crate::convert;
use kube_auditor_core::{Catalog, Findings, NamespaceResources};
use kube_auditor_k8s_api::{self as k8s, ClusterApi};
use thiserror::Error;
use tracing::{debug, instrument};

/// A namespace walk that failed after it started.
///
/// Findings for everything inspected before the failure are retained.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct WalkError {
    pub findings: Findings,
    #[source]
    pub error: k8s::Error,
}

/// Evaluates every check against a single namespace.
///
/// Pods are listed first and a failure to list them fails the walk. Network policies and
/// service accounts are listed afterwards; when the auditor is not permitted to list them the
/// corresponding checks are skipped, and any other failure ends the walk with the findings
/// gathered so far.
#[instrument(name = "namespace", skip_all, fields(ns = %namespace))]
pub async fn walk<C>(
    cluster: &C,
    catalog: &Catalog,
    namespace: &str,
) -> Result<Findings, WalkError>
where
    C: ClusterApi + ?Sized,
{
    let pods = cluster
        .list_pods(namespace)
        .await
        .map_err(|error| WalkError {
            findings: Findings::default(),
            error,
        })?;

    let mut resources = NamespaceResources {
        name: namespace.to_string(),
        pods: pods.iter().map(convert::pod).collect(),
        ..Default::default()
    };

    let policies = cluster.list_network_policies(namespace).await;
    match permitted(policies, "networkpolicies") {
        Ok(policies) => {
            resources.network_policies = policies
                .map(|policies| policies.iter().map(convert::network_policy_name).collect());
        }
        Err(error) => {
            return Err(WalkError {
                findings: catalog.evaluate(&resources),
                error,
            })
        }
    }

    let accounts = cluster.list_service_accounts(namespace).await;
    match permitted(accounts, "serviceaccounts") {
        Ok(accounts) => {
            resources.service_accounts =
                accounts.map(|accounts| accounts.iter().map(convert::service_account).collect());
        }
        Err(error) => {
            return Err(WalkError {
                findings: catalog.evaluate(&resources),
                error,
            })
        }
    }

    let findings = catalog.evaluate(&resources);
    debug!(
        pods = resources.pods.len(),
        findings = findings.len(),
        "Evaluated namespace"
    );
    Ok(findings)
}

/// Treats a permission-denied listing as unknown rather than as a failure.
fn permitted<T>(
    res: k8s::Result<Vec<T>>,
    resource: &'static str,
) -> k8s::Result<Option<Vec<T>>> {
    match res {
        Ok(items) => Ok(Some(items)),
        Err(error) if error.is_forbidden() => {
            debug!(%error, resource, "Not permitted to list; skipping checks");
            Ok(None)
        }
        Err(error) => Err(error),
    }
}
