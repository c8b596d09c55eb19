use super::{ContainerContext, Rule};
use crate::{
    model::Capabilities,
    violation::{Control, Level, Severity, Violation},
};

const NET_RAW: &str = "NET_RAW";
const ALL: &str = "ALL";

/// 5.1.4
#[derive(Copy, Clone, Debug, Default)]
pub struct SecretMounts;

/// 5.2.1
#[derive(Copy, Clone, Debug, Default)]
pub struct Privileged;

/// 5.2.2
#[derive(Copy, Clone, Debug, Default)]
pub struct HostPid;

/// 5.2.3
#[derive(Copy, Clone, Debug, Default)]
pub struct HostIpc;

/// 5.2.4
#[derive(Copy, Clone, Debug, Default)]
pub struct HostNetwork;

/// 5.2.5
#[derive(Copy, Clone, Debug, Default)]
pub struct PrivilegeEscalation;

/// 5.2.7
#[derive(Copy, Clone, Debug, Default)]
pub struct NetRawCapability;

/// 5.2.8
#[derive(Copy, Clone, Debug, Default)]
pub struct AddedCapabilities;

/// 5.2.9
#[derive(Copy, Clone, Debug, Default)]
pub struct CapabilitiesNotDropped;

/// 5.7.2
#[derive(Copy, Clone, Debug, Default)]
pub struct SeccompProfileMissing;

/// 5.7.3
#[derive(Copy, Clone, Debug, Default)]
pub struct SecurityContextMissing;

/// 5.7.4
#[derive(Copy, Clone, Debug, Default)]
pub struct DefaultNamespace;

/// Capabilities are resolved as a whole: a container that declares a `capabilities` object
/// replaces the pod's entirely.
fn resolved_capabilities<'a>(cx: &ContainerContext<'a>) -> Option<&'a Capabilities> {
    cx.resolve(|sc| sc.capabilities.as_ref())
        .map(|resolved| resolved.value)
}

impl<'a> Rule<ContainerContext<'a>> for SecretMounts {
    fn control(&self) -> &'static Control {
        const CONTROL: Control = Control {
            id: "5.1.4",
            title: "Minimize access to secrets",
            severity: Severity::Medium,
            level: Some(Level::L1),
        };
        &CONTROL
    }

    fn evaluate(&self, cx: &ContainerContext<'a>) -> Option<Violation> {
        let names = cx
            .pod
            .secret_volumes()
            .map(|v| format!("'{}'", v.name))
            .collect::<Vec<_>>();
        if names.is_empty() {
            return None;
        }

        let noun = if names.len() == 1 { "volume" } else { "volumes" };
        Some(self.control().violation(
            cx.locator(),
            format!(
                "Pod mounts secret {noun} {} which may provide unnecessary access to sensitive data",
                names.join(", ")
            ),
            "Review if each secret mount is necessary and remove it if not required. Use least privilege principle for secret access.",
        ))
    }
}

impl<'a> Rule<ContainerContext<'a>> for Privileged {
    fn control(&self) -> &'static Control {
        const CONTROL: Control = Control {
            id: "5.2.1",
            title: "Minimize the admission of privileged containers",
            severity: Severity::Critical,
            level: Some(Level::L1),
        };
        &CONTROL
    }

    fn evaluate(&self, cx: &ContainerContext<'a>) -> Option<Violation> {
        let privileged = cx.container_security_context()?.privileged?;
        if !privileged {
            return None;
        }

        Some(self.control().violation(
            cx.locator(),
            "Container is running in privileged mode, which grants access to all host devices and bypasses security mechanisms",
            "Remove 'privileged: true' from container security context. Run containers with minimal privileges required.",
        ))
    }
}

impl<'a> Rule<ContainerContext<'a>> for HostPid {
    fn control(&self) -> &'static Control {
        const CONTROL: Control = Control {
            id: "5.2.2",
            title: "Minimize the admission of containers wishing to share the host process ID namespace",
            severity: Severity::High,
            level: Some(Level::L1),
        };
        &CONTROL
    }

    fn evaluate(&self, cx: &ContainerContext<'a>) -> Option<Violation> {
        if cx.pod.host_pid != Some(true) {
            return None;
        }

        Some(self.control().violation(
            cx.locator(),
            "Pod is sharing the host process ID namespace, which allows visibility into host processes",
            "Remove 'hostPID: true' from the pod specification unless absolutely necessary for the application function.",
        ))
    }
}

impl<'a> Rule<ContainerContext<'a>> for HostIpc {
    fn control(&self) -> &'static Control {
        const CONTROL: Control = Control {
            id: "5.2.3",
            title: "Minimize the admission of containers wishing to share the host IPC namespace",
            severity: Severity::High,
            level: Some(Level::L1),
        };
        &CONTROL
    }

    fn evaluate(&self, cx: &ContainerContext<'a>) -> Option<Violation> {
        if cx.pod.host_ipc != Some(true) {
            return None;
        }

        Some(self.control().violation(
            cx.locator(),
            "Pod is sharing the host IPC namespace, which allows access to host inter-process communication",
            "Remove 'hostIPC: true' from the pod specification unless required for specific application needs.",
        ))
    }
}

impl<'a> Rule<ContainerContext<'a>> for HostNetwork {
    fn control(&self) -> &'static Control {
        const CONTROL: Control = Control {
            id: "5.2.4",
            title: "Minimize the admission of containers wishing to share the host network namespace",
            severity: Severity::High,
            level: Some(Level::L1),
        };
        &CONTROL
    }

    fn evaluate(&self, cx: &ContainerContext<'a>) -> Option<Violation> {
        if cx.pod.host_network != Some(true) {
            return None;
        }

        Some(self.control().violation(
            cx.locator(),
            "Pod is using the host network namespace, which provides access to the host's network interfaces",
            "Remove 'hostNetwork: true' from the pod specification. Use Kubernetes services and ingress for network access.",
        ))
    }
}

impl<'a> Rule<ContainerContext<'a>> for PrivilegeEscalation {
    fn control(&self) -> &'static Control {
        const CONTROL: Control = Control {
            id: "5.2.5",
            title: "Minimize the admission of containers with allowPrivilegeEscalation",
            severity: Severity::High,
            level: Some(Level::L1),
        };
        &CONTROL
    }

    fn evaluate(&self, cx: &ContainerContext<'a>) -> Option<Violation> {
        // Privilege escalation is permitted unless it is explicitly disabled.
        let allowed = cx
            .resolve(|sc| sc.allow_privilege_escalation)
            .map_or(true, |resolved| resolved.value);
        if !allowed {
            return None;
        }

        Some(self.control().violation(
            cx.locator(),
            "Container allows privilege escalation, which can be used to gain additional privileges",
            "Set 'allowPrivilegeEscalation: false' in container security context.",
        ))
    }
}

impl<'a> Rule<ContainerContext<'a>> for NetRawCapability {
    fn control(&self) -> &'static Control {
        const CONTROL: Control = Control {
            id: "5.2.7",
            title: "Minimize the admission of containers with the NET_RAW capability",
            severity: Severity::Medium,
            level: Some(Level::L1),
        };
        &CONTROL
    }

    fn evaluate(&self, cx: &ContainerContext<'a>) -> Option<Violation> {
        let added = resolved_capabilities(cx)?.add.as_ref()?;
        if !added.iter().any(|c| c == NET_RAW) {
            return None;
        }

        Some(self.control().violation(
            cx.locator(),
            "Container has NET_RAW capability, which allows raw socket access and network packet manipulation",
            "Remove NET_RAW from added capabilities unless specifically required for network operations.",
        ))
    }
}

impl<'a> Rule<ContainerContext<'a>> for AddedCapabilities {
    fn control(&self) -> &'static Control {
        const CONTROL: Control = Control {
            id: "5.2.8",
            title: "Minimize the admission of containers with added capabilities",
            severity: Severity::Medium,
            level: Some(Level::L1),
        };
        &CONTROL
    }

    fn evaluate(&self, cx: &ContainerContext<'a>) -> Option<Violation> {
        let added = resolved_capabilities(cx)?.add.as_ref()?;
        if added.is_empty() {
            return None;
        }

        Some(self.control().violation(
            cx.locator(),
            format!("Container has added capabilities: {}", added.join(", ")),
            "Remove unnecessary capabilities from the container. Use principle of least privilege.",
        ))
    }
}

impl<'a> Rule<ContainerContext<'a>> for CapabilitiesNotDropped {
    fn control(&self) -> &'static Control {
        const CONTROL: Control = Control {
            id: "5.2.9",
            title: "Minimize the admission of containers with capabilities assigned",
            severity: Severity::Medium,
            level: Some(Level::L1),
        };
        &CONTROL
    }

    fn evaluate(&self, cx: &ContainerContext<'a>) -> Option<Violation> {
        let dropped = resolved_capabilities(cx)
            .and_then(|caps| caps.drop.as_deref())
            .unwrap_or_default();

        if dropped.is_empty() {
            return Some(self.control().violation(
                cx.locator(),
                "Container does not drop all capabilities. Default capabilities may be unnecessary.",
                "Add 'drop: [\"ALL\"]' to container capabilities and only add back required capabilities.",
            ));
        }

        if dropped.iter().any(|c| c == ALL) {
            return None;
        }

        let violation = self.control().violation(
            cx.locator(),
            "Container does not drop ALL capabilities, which may leave unnecessary privileges",
            "Consider dropping ALL capabilities first, then adding only required ones.",
        );
        Some(violation.graded(Severity::Low, Level::L2))
    }
}

impl<'a> Rule<ContainerContext<'a>> for SeccompProfileMissing {
    fn control(&self) -> &'static Control {
        const CONTROL: Control = Control {
            id: "5.7.2",
            title: "Ensure that the seccomp profile is set to docker/default in your pod definitions",
            severity: Severity::Medium,
            level: Some(Level::L1),
        };
        &CONTROL
    }

    fn evaluate(&self, cx: &ContainerContext<'a>) -> Option<Violation> {
        if cx.resolve(|sc| sc.seccomp_profile.as_ref()).is_some() {
            return None;
        }

        Some(self.control().violation(
            cx.locator(),
            "No seccomp profile is set, which allows unrestricted system calls",
            "Set seccomp profile to 'RuntimeDefault' or 'Localhost' with appropriate profile.",
        ))
    }
}

impl<'a> Rule<ContainerContext<'a>> for SecurityContextMissing {
    fn control(&self) -> &'static Control {
        const CONTROL: Control = Control {
            id: "5.7.3",
            title: "Apply Security Context to Your Pods and Containers",
            severity: Severity::High,
            level: Some(Level::L1),
        };
        &CONTROL
    }

    fn evaluate(&self, cx: &ContainerContext<'a>) -> Option<Violation> {
        if cx.container_security_context().is_some() || cx.pod_security_context().is_some() {
            return None;
        }

        Some(self.control().violation(
            cx.locator(),
            "No security context is defined for pod or container",
            "Define security context with appropriate settings: runAsNonRoot, runAsUser, fsGroup, etc.",
        ))
    }
}

impl<'a> Rule<ContainerContext<'a>> for DefaultNamespace {
    fn control(&self) -> &'static Control {
        const CONTROL: Control = Control {
            id: "5.7.4",
            title: "The default namespace should not be used",
            severity: Severity::Low,
            level: Some(Level::L1),
        };
        &CONTROL
    }

    fn evaluate(&self, cx: &ContainerContext<'a>) -> Option<Violation> {
        if cx.namespace != "default" {
            return None;
        }

        Some(self.control().violation(
            cx.locator(),
            "Pod is deployed in the default namespace, which is not recommended for production workloads",
            "Create dedicated namespaces for different applications and environments instead of using 'default'.",
        ))
    }
}
