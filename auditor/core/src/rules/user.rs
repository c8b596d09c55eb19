//! Detects containers that run, or may run, as the root user.

use super::ContainerContext;
use crate::{
    model::Scope,
    violation::{RootContainer, RootReason},
};

/// Evaluates a container's effective user.
///
/// Settings are resolved with container-then-pod precedence and checked in order, stopping at
/// the first match:
///
/// 1. `runAsUser: 0` is root.
/// 2. Any other explicit `runAsUser` is not root, regardless of what else is set.
/// 3. `runAsNonRoot: false` permits root.
/// 4. With no security context at all, the image's user (usually root) applies.
/// 5. With a security context that sets neither field, the image's user applies as well.
pub fn check_root_user(cx: &ContainerContext<'_>) -> Option<RootContainer> {
    let run_as_user = cx.resolve(|sc| sc.run_as_user);
    let run_as_non_root = cx.resolve(|sc| sc.run_as_non_root);

    let finding = |reason, scope: Option<Scope>, user_id| RootContainer {
        namespace: cx.namespace.to_string(),
        pod: cx.pod.name.clone(),
        container: cx.container.locator_name(),
        reason,
        scope,
        user_id,
        run_as_non_root: run_as_non_root.map(|r| r.value),
    };

    if let Some(user) = run_as_user {
        if user.value != 0 {
            return None;
        }
        return Some(finding(RootReason::RunAsUserZero, Some(user.scope), Some(0)));
    }

    if let Some(non_root) = run_as_non_root {
        if non_root.value {
            return None;
        }
        return Some(finding(
            RootReason::RunAsNonRootFalse,
            Some(non_root.scope),
            None,
        ));
    }

    if cx.container_security_context().is_none() && cx.pod_security_context().is_none() {
        return Some(finding(RootReason::NoSecurityContext, None, None));
    }

    Some(finding(RootReason::NoUserSettings, None, None))
}
