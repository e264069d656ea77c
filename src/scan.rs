use crate::{error::HostError, host::Host};
use tracing::{error, trace};

/// Drops roots that are duplicates of, or contained in, other roots, so that the subtrees left over are disjoint.
pub fn disjoint_roots<H: Host>(host: &H, roots: &[H::Element]) -> Vec<H::Element> {
	let mut kept: Vec<H::Element> = Vec::with_capacity(roots.len());
	for root in roots {
		if kept.iter().any(|k| host.contains(k, root)) {
			continue;
		}
		kept.retain(|k| !host.contains(root, k));
		kept.push(root.clone());
	}
	kept
}

/// Every element carrying `events_attribute` among `roots` and their descendants, each exactly once.
///
/// A root whose subtree can't be queried is logged and skipped.
pub fn eventful_elements<H: Host>(host: &H, roots: &[H::Element], events_attribute: &str) -> Vec<H::Element> {
	let selector = format!("[{}]", events_attribute);
	let mut found = Vec::new();
	for root in disjoint_roots(host, roots) {
		if host.has_attribute(&root, events_attribute) {
			found.push(root.clone());
		}
		match host.query_selector_all(Some(&root), &selector) {
			Ok(descendants) => found.extend(descendants),
			Err(error) => error!("Failed to scan below {:?}: {}", root, error),
		}
	}
	trace!("Found {} eventful element(s).", found.len());
	found
}

/// Resolves `selector` to roots for an initial scan.
///
/// # Errors
///
/// Iff `selector` is invalid.
pub fn roots_by_selector<H: Host>(host: &H, selector: &str) -> Result<Vec<H::Element>, HostError> {
	host.query_selector_all(None, selector)
}
