//! Detects images that resolve to the mutable `latest` tag.

use super::ContainerContext;
use crate::violation::LatestTagContainer;

const LATEST: &str = ":latest";

/// Returns the image reference to report if `image` resolves to the `latest` tag.
///
/// An explicit `:latest` tag is reported as-is. A reference without a tag is reported with
/// `:latest` appended, since that is what the runtime pulls. Only the final path segment can
/// carry a tag: in `registry:5000/app`, the colon introduces a registry port. Digest-pinned
/// references are immutable and are not reported.
pub fn latest_reference(image: &str) -> Option<String> {
    if image.is_empty() {
        return None;
    }

    if image.ends_with(LATEST) {
        return Some(image.to_string());
    }

    if image.contains('@') {
        return None;
    }

    let name = image.rsplit('/').next().unwrap_or(image);
    if name.contains(':') {
        return None;
    }

    Some(format!("{image}{LATEST}"))
}

pub fn check_latest_tag(cx: &ContainerContext<'_>) -> Option<LatestTagContainer> {
    let image = latest_reference(&cx.container.image)?;
    Some(LatestTagContainer {
        namespace: cx.namespace.to_string(),
        pod: cx.pod.name.clone(),
        container: cx.container.locator_name(),
        image,
    })
}
