use crate::{
	config::Config,
	error::{HostError, PatchError},
	grammar::ActionKind,
	host::Host,
	params::Resolvers,
	patch::{self, PatchResult},
	push::PushChannel,
	scan,
};
use core::cell::RefCell;
use std::rc::Rc;
use tracing::{error, info, instrument, trace, trace_span};

/// Binds, dispatches and patches on top of one [`Host`].
///
/// Listeners and response callbacks only hold weak references to the runtime:
/// dropping the last [`Rc`] turns every binding it registered into a no-op.
pub struct Runtime<H: Host> {
	pub(crate) host: H,
	pub(crate) config: Config,
	pub(crate) client_id: String,
	pub(crate) resolvers: Resolvers<H>,
	pub(crate) push: RefCell<PushChannel<H::Stream>>,
}
impl<H: Host + 'static> Runtime<H> {
	#[must_use]
	pub fn new(host: H, config: Config) -> Rc<Self> {
		Self::with_resolvers(host, config, Resolvers::default())
	}

	#[must_use]
	pub fn with_resolvers(host: H, config: Config, resolvers: Resolvers<H>) -> Rc<Self> {
		let client_id = host.generate_client_id();
		trace!("Client instance id: {}", client_id);
		Rc::new(Self {
			host,
			config,
			client_id,
			resolvers,
			push: RefCell::new(PushChannel::default()),
		})
	}

	pub fn host(&self) -> &H {
		&self.host
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Sent as the client id header with every request.
	pub fn client_id(&self) -> &str {
		&self.client_id
	}

	/// Scans the configured root selector and opens the push channel, if one is configured.
	///
	/// # Errors
	///
	/// Iff the root selector is invalid. A push channel that fails to open is only logged.
	#[instrument(skip(self))]
	pub fn start(self: &Rc<Self>) -> Result<usize, HostError> {
		let roots = scan::roots_by_selector(&self.host, &self.config.root_selector)?;
		let bound = self.scan(&roots);
		info!("Bound {} event type(s) below {:?}.", bound, self.config.root_selector);

		if self.config.stream_url.is_some() {
			if let Err(error) = self.connect_push() {
				error!("Failed to open push channel: {}", error);
			}
		}
		Ok(bound)
	}

	/// Binds every eventful element among `roots` and their descendants.
	///
	/// Returns the number of newly registered listeners. Elements with a malformed events attribute are logged and skipped.
	#[instrument(skip(self, roots), fields(roots = roots.len()))]
	pub fn scan(self: &Rc<Self>, roots: &[H::Element]) -> usize {
		let elements = scan::eventful_elements(&self.host, roots, &self.config.attributes.events);
		if elements.is_empty() {
			trace!("No eventful elements.");
			return 0;
		}

		let mut bound = 0;
		for element in &elements {
			let span = trace_span!("Binding element", ?element);
			let _enter = span.enter();
			match self.bind(element) {
				Ok(count) => bound += count,
				Err(error) => {
					if cfg!(feature = "dangerous-logging") {
						error!("Failed to parse events for node {:?} ({:?}): {}", element, self.host.attribute(element, &self.config.attributes.events), error);
					} else {
						error!("Failed to parse events for node {:?}: {}", element, error);
					}
				}
			}
		}
		bound
	}

	/// Applies a patch to every element matching `target` and re-binds what it created.
	///
	/// # Errors
	///
	/// See [`patch::apply`].
	#[instrument(skip(self, fragment))]
	pub fn patch(self: &Rc<Self>, kind: ActionKind, target: &str, fragment: Option<&str>) -> Result<PatchResult<H::Element>, PatchError> {
		let result = patch::apply(&self.host, kind, target, fragment)?;
		self.rebind(&result);
		Ok(result)
	}

	pub(crate) fn rebind(self: &Rc<Self>, result: &PatchResult<H::Element>) {
		let roots = result.rebind_roots();
		if !roots.is_empty() {
			let bound = self.scan(roots);
			trace!("Re-bound {} event type(s) after {}.", bound, result.kind);
		}
	}
}
