//! Conversions from Kubernetes API objects into the audit model.
//!
//! Missing optional fields are carried through as `None`. A pod without a spec has no
//! containers, and a missing name becomes the empty string.

use kube_auditor_core as core;
use kube_auditor_k8s_api as k8s;

pub fn pod(pod: &k8s::Pod) -> core::Pod {
    let name = pod.metadata.name.clone().unwrap_or_default();
    let Some(spec) = pod.spec.as_ref() else {
        return core::Pod::new(name);
    };

    core::Pod {
        name,
        containers: spec
            .containers
            .iter()
            .map(|c| container(c, core::ContainerKind::Regular))
            .collect(),
        init_containers: spec
            .init_containers
            .iter()
            .flatten()
            .map(|c| container(c, core::ContainerKind::Init))
            .collect(),
        security_context: spec.security_context.as_ref().map(pod_security_context),
        host_pid: spec.host_pid,
        host_ipc: spec.host_ipc,
        host_network: spec.host_network,
        volumes: spec.volumes.iter().flatten().map(volume).collect(),
    }
}

pub fn service_account(sa: &k8s::ServiceAccount) -> core::ServiceAccount {
    core::ServiceAccount {
        name: sa.metadata.name.clone().unwrap_or_default(),
        automount_service_account_token: sa.automount_service_account_token,
    }
}

pub fn network_policy_name(np: &k8s::NetworkPolicy) -> String {
    np.metadata.name.clone().unwrap_or_default()
}

fn container(c: &k8s::Container, kind: core::ContainerKind) -> core::Container {
    core::Container {
        name: c.name.clone(),
        image: c.image.clone().unwrap_or_default(),
        kind,
        security_context: c.security_context.as_ref().map(security_context),
    }
}

fn security_context(sc: &k8s::SecurityContext) -> core::SecurityContext {
    core::SecurityContext {
        privileged: sc.privileged,
        allow_privilege_escalation: sc.allow_privilege_escalation,
        run_as_user: sc.run_as_user,
        run_as_non_root: sc.run_as_non_root,
        capabilities: sc.capabilities.as_ref().map(|caps| core::Capabilities {
            add: caps.add.clone(),
            drop: caps.drop.clone(),
        }),
        seccomp_profile: sc.seccomp_profile.as_ref().map(seccomp_profile),
    }
}

// Pod security contexts cannot express privilege, escalation, or capabilities.
fn pod_security_context(sc: &k8s::PodSecurityContext) -> core::SecurityContext {
    core::SecurityContext {
        run_as_user: sc.run_as_user,
        run_as_non_root: sc.run_as_non_root,
        seccomp_profile: sc.seccomp_profile.as_ref().map(seccomp_profile),
        ..Default::default()
    }
}

fn seccomp_profile(sp: &k8s::SeccompProfile) -> core::SeccompProfile {
    core::SeccompProfile {
        kind: sp.type_.clone(),
        localhost_profile: sp.localhost_profile.clone(),
    }
}

fn volume(v: &k8s::Volume) -> core::Volume {
    core::Volume {
        name: v.name.clone(),
        secret: v.secret.as_ref().map(|s| core::SecretSource {
            secret_name: s.secret_name.clone(),
        }),
    }
}
