#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod cluster;
mod error;

pub use self::{
    cluster::{ClusterApi, KubeCluster},
    error::{BoxError, Error, ErrorKind, Result},
};
pub use k8s_openapi::api::{
    self,
    core::v1::{
        Capabilities, Container, Namespace, Pod, PodSecurityContext, PodSpec, SeccompProfile,
        SecretVolumeSource, SecurityContext, ServiceAccount, Volume,
    },
    networking::v1::NetworkPolicy,
};
pub use kube::api::{ObjectMeta, ResourceExt};
