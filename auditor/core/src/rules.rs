//! The CIS Kubernetes Benchmark control catalog.
//!
//! Each control is a [`Rule`] over one of three evaluation contexts:
//!
//! - [`ContainerContext`]: a single container together with the pod that declares it. Most
//!   controls are evaluated here, resolving settings with container-then-pod precedence.
//! - [`NamespaceContext`]: a namespace and its network policies, evaluated once per namespace.
//! - [`AccountContext`]: a single service account, evaluated once per account.
//!
//! A [`Catalog`] holds the ordered set of rules for each context. The image-tag and root-user
//! checks are not benchmark controls and live in [`image`] and [`user`].

mod container;
pub mod image;
mod namespace;
pub mod user;


pub use self::{container::*, namespace::*};
use crate::{
    model::{Container, NamespaceResources, Pod, Resolved, SecurityContext, ServiceAccount},
    report::Findings,
    violation::{Control, Locator, Violation},
};

/// A single control, evaluated against a context of type `Cx`.
pub trait Rule<Cx>: Send + Sync {
    fn control(&self) -> &'static Control;

    fn evaluate(&self, cx: &Cx) -> Option<Violation>;
}

pub type ContainerRule = dyn for<'a> Rule<ContainerContext<'a>>;
pub type NamespaceRule = dyn for<'a> Rule<NamespaceContext<'a>>;
pub type AccountRule = dyn for<'a> Rule<AccountContext<'a>>;

#[derive(Copy, Clone, Debug)]
pub struct ContainerContext<'a> {
    pub namespace: &'a str,
    pub pod: &'a Pod,
    pub container: &'a Container,
}

#[derive(Copy, Clone, Debug)]
pub struct NamespaceContext<'a> {
    pub namespace: &'a str,
    pub network_policies: &'a [String],
}

#[derive(Copy, Clone, Debug)]
pub struct AccountContext<'a> {
    pub namespace: &'a str,
    pub account: &'a ServiceAccount,
}

/// The ordered set of controls applied during a scan.
pub struct Catalog {
    containers: Vec<Box<ContainerRule>>,
    namespaces: Vec<Box<NamespaceRule>>,
    accounts: Vec<Box<AccountRule>>,
}

// === impl ContainerContext ===

impl<'a> ContainerContext<'a> {
    pub fn new(namespace: &'a str, pod: &'a Pod, container: &'a Container) -> Self {
        Self {
            namespace,
            pod,
            container,
        }
    }

    pub fn locator(&self) -> Locator {
        Locator::Container {
            namespace: self.namespace.to_string(),
            pod: self.pod.name.clone(),
            container: self.container.locator_name(),
        }
    }

    pub fn container_security_context(&self) -> Option<&'a SecurityContext> {
        self.container.security_context.as_ref()
    }

    pub fn pod_security_context(&self) -> Option<&'a SecurityContext> {
        self.pod.security_context.as_ref()
    }

    /// Resolves a setting, preferring the container's security context over the pod's.
    pub fn resolve<T, F>(&self, field: F) -> Option<Resolved<T>>
    where
        F: Fn(&'a SecurityContext) -> Option<T>,
    {
        Resolved::from_contexts(
            self.container_security_context(),
            self.pod_security_context(),
            field,
        )
    }
}

// === impl NamespaceContext ===

impl NamespaceContext<'_> {
    pub fn locator(&self) -> Locator {
        Locator::Namespace {
            namespace: self.namespace.to_string(),
        }
    }
}

// === impl AccountContext ===

impl AccountContext<'_> {
    pub fn locator(&self) -> Locator {
        Locator::ServiceAccount {
            namespace: self.namespace.to_string(),
            service_account: self.account.name.clone(),
        }
    }
}

// === impl Catalog ===

impl Default for Catalog {
    /// The benchmark controls, in benchmark order.
    fn default() -> Self {
        Self {
            containers: vec![
                Box::new(SecretMounts),
                Box::new(Privileged),
                Box::new(HostPid),
                Box::new(HostIpc),
                Box::new(HostNetwork),
                Box::new(PrivilegeEscalation),
                Box::new(NetRawCapability),
                Box::new(AddedCapabilities),
                Box::new(CapabilitiesNotDropped),
                Box::new(SeccompProfileMissing),
                Box::new(SecurityContextMissing),
                Box::new(DefaultNamespace),
            ],
            namespaces: vec![Box::new(NetworkPolicyMissing)],
            accounts: vec![Box::new(ServiceAccountTokenAutomount)],
        }
    }
}

impl Catalog {
    /// Lists every control in the catalog.
    pub fn controls(&self) -> impl Iterator<Item = &'static Control> + '_ {
        self.containers
            .iter()
            .map(|r| r.control())
            .chain(self.namespaces.iter().map(|r| r.control()))
            .chain(self.accounts.iter().map(|r| r.control()))
    }

    pub fn evaluate_container(&self, cx: &ContainerContext<'_>) -> Vec<Violation> {
        self.containers
            .iter()
            .filter_map(|rule| rule.evaluate(cx))
            .collect()
    }

    pub fn evaluate_namespace(&self, cx: &NamespaceContext<'_>) -> Vec<Violation> {
        self.namespaces
            .iter()
            .filter_map(|rule| rule.evaluate(cx))
            .collect()
    }

    pub fn evaluate_account(&self, cx: &AccountContext<'_>) -> Vec<Violation> {
        self.accounts
            .iter()
            .filter_map(|rule| rule.evaluate(cx))
            .collect()
    }

    /// Evaluates every check against a namespace snapshot.
    ///
    /// Findings are ordered by pod, then by container (regular containers before init
    /// containers). Namespace- and account-level findings are only produced when the
    /// corresponding listing is known.
    pub fn evaluate(&self, resources: &NamespaceResources) -> Findings {
        let namespace = resources.name.as_str();
        let mut findings = Findings::default();

        for pod in &resources.pods {
            for container in pod.all_containers() {
                let cx = ContainerContext::new(namespace, pod, container);
                findings
                    .latest_tag_containers
                    .extend(image::check_latest_tag(&cx));
                findings.root_containers.extend(user::check_root_user(&cx));
                findings.cis_violations.extend(self.evaluate_container(&cx));
            }
        }

        if let Some(network_policies) = resources.network_policies.as_deref() {
            let cx = NamespaceContext {
                namespace,
                network_policies,
            };
            findings
                .network_policy_violations
                .extend(self.evaluate_namespace(&cx));
        }

        for account in resources.service_accounts.iter().flatten() {
            let cx = AccountContext { namespace, account };
            findings
                .service_account_violations
                .extend(self.evaluate_account(&cx));
        }

        findings
    }
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.controls().map(|c| c.id))
            .finish()
    }
}
