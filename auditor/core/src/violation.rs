use crate::model::Scope;
use serde::Serialize;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

/// CIS profile level: `L1` controls are broadly applicable, `L2` controls are stricter and may
/// affect functionality.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Level {
    L1,
    L2,
}

/// Static description of a benchmark control.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Control {
    pub id: &'static str,
    pub title: &'static str,
    pub severity: Severity,
    pub level: Option<Level>,
}

/// Identifies where a violation was found.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged, rename_all_fields = "camelCase")]
pub enum Locator {
    Container {
        namespace: String,
        pod: String,
        container: String,
    },
    ServiceAccount {
        namespace: String,
        service_account: String,
    },
    Namespace {
        namespace: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    #[serde(flatten)]
    pub locator: Locator,
    pub control_id: &'static str,
    pub control_title: &'static str,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<Level>,
    pub description: String,
    pub remediation: String,
}

/// A container whose image resolves to the `latest` tag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestTagContainer {
    pub namespace: String,
    pub pod: String,
    pub container: String,
    /// The image reference, with `:latest` appended when the tag was implicit.
    pub image: String,
}

/// A container that runs, or may run, as root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RootContainer {
    pub namespace: String,
    pub pod: String,
    pub container: String,
    pub reason: RootReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,
    pub user_id: Option<i64>,
    pub run_as_non_root: Option<bool>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RootReason {
    RunAsUserZero,
    RunAsNonRootFalse,
    NoSecurityContext,
    NoUserSettings,
}

// === impl Severity ===

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Critical => "Critical".fmt(f),
            Self::High => "High".fmt(f),
            Self::Medium => "Medium".fmt(f),
            Self::Low => "Low".fmt(f),
        }
    }
}

// === impl Control ===

impl Control {
    /// Builds a violation of this control with its default severity and level.
    pub fn violation(
        &self,
        locator: Locator,
        description: impl Into<String>,
        remediation: impl Into<String>,
    ) -> Violation {
        Violation {
            locator,
            control_id: self.id,
            control_title: self.title,
            severity: self.severity,
            level: self.level,
            description: description.into(),
            remediation: remediation.into(),
        }
    }
}

// === impl Locator ===

impl Locator {
    pub fn namespace(&self) -> &str {
        match self {
            Self::Container { namespace, .. }
            | Self::ServiceAccount { namespace, .. }
            | Self::Namespace { namespace } => namespace,
        }
    }
}

// === impl Violation ===

impl Violation {
    /// Overrides the control's default grading, for controls whose severity depends on how badly
    /// the setting misses the benchmark.
    pub fn graded(mut self, severity: Severity, level: Level) -> Self {
        self.severity = severity;
        self.level = Some(level);
        self
    }
}

// === impl RootReason ===

impl RootReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RunAsUserZero => "runAsUser=0",
            Self::RunAsNonRootFalse => "runAsNonRoot=false",
            Self::NoSecurityContext => "no security context (defaults to root)",
            Self::NoUserSettings => "security context exists but no user settings (defaults to root)",
        }
    }
}

impl std::fmt::Display for RootReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.as_str().fmt(f)
    }
}

impl Serialize for RootReason {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}
