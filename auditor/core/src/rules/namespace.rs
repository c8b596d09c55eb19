use super::{AccountContext, NamespaceContext, Rule};
use crate::violation::{Control, Severity, Violation};

/// 5.3.2
#[derive(Copy, Clone, Debug, Default)]
pub struct NetworkPolicyMissing;

/// 5.1.6
#[derive(Copy, Clone, Debug, Default)]
pub struct ServiceAccountTokenAutomount;

impl<'a> Rule<NamespaceContext<'a>> for NetworkPolicyMissing {
    fn control(&self) -> &'static Control {
        const CONTROL: Control = Control {
            id: "5.3.2",
            title: "Ensure that all Namespaces have Network Policies defined",
            severity: Severity::Medium,
            level: None,
        };
        &CONTROL
    }

    fn evaluate(&self, cx: &NamespaceContext<'a>) -> Option<Violation> {
        if !cx.network_policies.is_empty() {
            return None;
        }

        Some(self.control().violation(
            cx.locator(),
            format!(
                "Namespace '{}' has no network policies defined, allowing unrestricted network access",
                cx.namespace
            ),
            "Create network policies to restrict ingress and egress traffic for pods in this namespace.",
        ))
    }
}

impl<'a> Rule<AccountContext<'a>> for ServiceAccountTokenAutomount {
    fn control(&self) -> &'static Control {
        const CONTROL: Control = Control {
            id: "5.1.6",
            title: "Ensure that Service Account Tokens are only mounted where necessary",
            severity: Severity::Medium,
            level: None,
        };
        &CONTROL
    }

    fn evaluate(&self, cx: &AccountContext<'a>) -> Option<Violation> {
        // Tokens are mounted unless automounting is explicitly disabled.
        if cx.account.automount_service_account_token == Some(false) {
            return None;
        }

        Some(self.control().violation(
            cx.locator(),
            format!(
                "Service account '{}' has automountServiceAccountToken enabled",
                cx.account.name
            ),
            "Set 'automountServiceAccountToken: false' unless the pod specifically needs Kubernetes API access.",
        ))
    }
}
