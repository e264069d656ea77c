use crate::{
	error::{FragmentError, HostError, PatchError, ResolutionError},
	grammar::ActionKind,
	host::Host,
};
use tracing::{error, instrument, trace, trace_span};

impl ActionKind {
	/// Whether this kind needs a fragment to create a new element from.
	#[must_use]
	pub fn creates_element(self) -> bool {
		match self {
			Self::Swap | Self::Append | Self::Prepend => true,
			Self::Remove | Self::Reset => false,
		}
	}

	/// Whether the patch result is re-scanned for bindings afterwards. Only kinds that create elements have anything to scan.
	#[must_use]
	pub fn rebinds(self) -> bool {
		match self {
			Self::Swap | Self::Append | Self::Prepend => true,
			Self::Remove | Self::Reset => false,
		}
	}
}

/// The elements a patch newly inserted into the document.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchResult<E> {
	pub kind: ActionKind,
	pub created: Vec<E>,
}
impl<E> PatchResult<E> {
	/// The nodes to re-scan: the created set, or nothing if `kind` opts out of re-binding.
	#[must_use]
	pub fn rebind_roots(&self) -> &[E] {
		if self.kind.rebinds() {
			&self.created
		} else {
			&[]
		}
	}
}

/// Applies `kind` to every element currently matching `target`.
///
/// # Errors
///
/// Iff `target` matches nothing, or `kind` needs a fragment and `fragment` yields no element.
/// Host failures on individual elements are logged and don't stop the remaining ones.
#[instrument(skip(host, fragment))]
pub fn apply<H: Host>(host: &H, kind: ActionKind, target: &str, fragment: Option<&str>) -> Result<PatchResult<H::Element>, PatchError> {
	let matches = host.query_selector_all(None, target)?;
	if matches.is_empty() {
		return Err(ResolutionError::NoMatch(target.to_owned()).into());
	}
	apply_to(host, kind, &matches, fragment)
}

/// Applies `kind` to each of `targets`. See [`apply`].
///
/// # Errors
///
/// Iff `kind` needs a fragment and `fragment` yields no element.
/// Targets no longer in the document when their turn comes are skipped.
pub fn apply_to<H: Host>(host: &H, kind: ActionKind, targets: &[H::Element], fragment: Option<&str>) -> Result<PatchResult<H::Element>, PatchError> {
	let mut created = Vec::new();
	for target in targets {
		let span = trace_span!("Patching element", %kind, ?target);
		let _enter = span.enter();

		// An earlier target may have been an ancestor of this one.
		if !host.is_connected(target) {
			trace!("Skipping detached element.");
			continue;
		}

		if kind.creates_element() {
			let html = fragment.ok_or(FragmentError::Missing(kind.as_str()))?;
			let element = host.create_element(html)?.ok_or(FragmentError::NoElement)?;
			match insert(host, kind, target, &element) {
				Ok(()) => created.push(element),
				Err(error) => error!("Failed to {} element: {}", kind, error),
			}
		} else {
			let result = match kind {
				ActionKind::Remove => host.remove(target),
				ActionKind::Reset => host.reset(target),
				_ => Ok(()),
			};
			if let Err(error) = result {
				error!("Failed to {} element: {}", kind, error);
			}
		}
	}
	trace!("Created {} element(s).", created.len());
	Ok(PatchResult { kind, created })
}

/// Puts an already created element in place of, or into, `target`.
///
/// # Errors
///
/// Iff the host refuses the mutation. Kinds that don't create elements are a no-op.
pub fn insert<H: Host>(host: &H, kind: ActionKind, target: &H::Element, element: &H::Element) -> Result<(), HostError> {
	match kind {
		ActionKind::Swap => host.replace_with(target, element),
		ActionKind::Append => host.append_child(target, element),
		ActionKind::Prepend => host.prepend_child(target, element),
		ActionKind::Remove | ActionKind::Reset => Ok(()),
	}
}
