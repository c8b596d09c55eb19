//! A snapshot of the workload state that the rules inspect.
//!
//! Every setting that Kubernetes allows to be omitted is an `Option`: rules must be able to tell
//! an unset field apart from one that is explicitly `false` or `0`, because an unset field usually
//! means the runtime's (insecure) default applies.

use serde::Serialize;

/// Security settings that may be declared on a container or on its pod.
///
/// Pod-level contexts never carry `privileged`, `allow_privilege_escalation`, or `capabilities` in
/// the Kubernetes API, but the model permits them so that precedence is applied uniformly.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SecurityContext {
    pub privileged: Option<bool>,
    pub allow_privilege_escalation: Option<bool>,
    pub run_as_user: Option<i64>,
    pub run_as_non_root: Option<bool>,
    pub capabilities: Option<Capabilities>,
    pub seccomp_profile: Option<SeccompProfile>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub add: Option<Vec<String>>,
    pub drop: Option<Vec<String>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeccompProfile {
    /// One of `RuntimeDefault`, `Localhost`, or `Unconfined`.
    pub kind: String,
    pub localhost_profile: Option<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    Regular,
    Init,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Container {
    pub name: String,
    pub image: String,
    pub kind: ContainerKind,
    pub security_context: Option<SecurityContext>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Pod {
    pub name: String,
    pub containers: Vec<Container>,
    pub init_containers: Vec<Container>,
    pub security_context: Option<SecurityContext>,
    pub host_pid: Option<bool>,
    pub host_ipc: Option<bool>,
    pub host_network: Option<bool>,
    pub volumes: Vec<Volume>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Volume {
    pub name: String,
    /// Set when the volume is backed by a `Secret`.
    pub secret: Option<SecretSource>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SecretSource {
    pub secret_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceAccount {
    pub name: String,
    pub automount_service_account_token: Option<bool>,
}

/// Everything the rules need to know about a single namespace.
///
/// `network_policies` and `service_accounts` are `None` when the lookup could not be performed
/// (e.g. the auditor is not permitted to list them); the corresponding rules are then skipped
/// rather than reporting on an unknown state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NamespaceResources {
    pub name: String,
    pub pods: Vec<Pod>,
    pub network_policies: Option<Vec<String>>,
    pub service_accounts: Option<Vec<ServiceAccount>>,
}

/// Identifies which security context supplied a resolved setting.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Container,
    Pod,
}

/// A setting's effective value after container-then-pod precedence has been applied.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Resolved<T> {
    pub value: T,
    pub scope: Scope,
}

// === impl Container ===

impl Container {
    pub fn regular(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            kind: ContainerKind::Regular,
            security_context: None,
        }
    }

    pub fn init(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            kind: ContainerKind::Init,
            ..Self::regular(name, image)
        }
    }

    pub fn with_security_context(mut self, sc: SecurityContext) -> Self {
        self.security_context = Some(sc);
        self
    }

    /// The name used to locate this container in findings.
    ///
    /// Init containers are prefixed so they cannot be confused with a regular container of the
    /// same name.
    pub fn locator_name(&self) -> String {
        match self.kind {
            ContainerKind::Regular => self.name.clone(),
            ContainerKind::Init => format!("init-{}", self.name),
        }
    }
}

// === impl Pod ===

impl Pod {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Iterates over regular containers followed by init containers.
    pub fn all_containers(&self) -> impl Iterator<Item = &Container> {
        self.containers.iter().chain(self.init_containers.iter())
    }

    /// Iterates over the pod's secret-backed volumes.
    pub fn secret_volumes(&self) -> impl Iterator<Item = &Volume> {
        self.volumes.iter().filter(|v| v.secret.is_some())
    }
}

// === impl Resolved ===

impl<T> Resolved<T> {
    /// Resolves a setting from the container's context, falling back to the pod's.
    pub fn from_contexts<'a, F>(
        container: Option<&'a SecurityContext>,
        pod: Option<&'a SecurityContext>,
        field: F,
    ) -> Option<Self>
    where
        F: Fn(&'a SecurityContext) -> Option<T>,
    {
        if let Some(value) = container.and_then(&field) {
            return Some(Self {
                value,
                scope: Scope::Container,
            });
        }

        pod.and_then(&field).map(|value| Self {
            value,
            scope: Scope::Pod,
        })
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Container => "container".fmt(f),
            Self::Pod => "pod".fmt(f),
        }
    }
}
