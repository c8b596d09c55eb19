#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub use kube_auditor_core as core;
pub use kube_auditor_k8s_api as k8s;
pub use kube_auditor_k8s_scan as scan;

mod args;
pub mod http;

pub use self::args::Args;
