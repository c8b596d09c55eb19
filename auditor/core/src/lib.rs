#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod model;
pub mod report;
pub mod rules;
pub mod violation;

pub use self::{
    model::{
        Capabilities, Container, ContainerKind, NamespaceResources, Pod, Resolved, Scope,
        SeccompProfile, SecretSource, SecurityContext, ServiceAccount, Volume,
    },
    report::{Findings, NamespaceOutcome, ReportBuilder, ScanReport, Summary},
    rules::Catalog,
    violation::{
        Control, LatestTagContainer, Level, Locator, RootContainer, RootReason, Severity,
        Violation,
    },
};
