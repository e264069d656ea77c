//! The capability boundary towards the host environment.
//!
//! Everything the runtime does to the document, the network or the push stream goes through [`Host`].
//! [`WebHost`](`crate::web::WebHost`) implements it on top of [`web_sys`].

use crate::error::HostError;
use core::fmt::Debug;

/// A fully built outbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
	pub method: &'static str,
	pub url: String,
	pub headers: Vec<(String, String)>,
}

/// A terminal response. Transport-level failures are reported as [`HostError`] instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
	pub status: u16,
	pub body: String,
}

/// Lifecycle notifications of a push stream subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
	Open,
	Message(String),
	Error(String),
}

pub type Listener<E> = Box<dyn Fn(&E)>;
pub type ResponseCallback = Box<dyn FnOnce(Result<Response, HostError>)>;
pub type StreamCallback = Box<dyn Fn(StreamEvent)>;

/// Document, network and stream capabilities.
///
/// All calls happen on the single UI thread. Callbacks handed to the host are invoked later from the host's event loop,
/// never re-entrantly from inside the call that registered them.
pub trait Host {
	/// A live element handle. Equality is node identity.
	type Element: Clone + PartialEq + Debug;
	type Event;
	type Stream;

	/// All elements matching `selector` under `root` (or the whole document), in document order.
	///
	/// # Errors
	///
	/// Iff `selector` is not a valid selector.
	fn query_selector_all(&self, root: Option<&Self::Element>, selector: &str) -> Result<Vec<Self::Element>, HostError>;

	/// Whether `descendant` is `ancestor` or inside it.
	fn contains(&self, ancestor: &Self::Element, descendant: &Self::Element) -> bool;

	/// Whether `element` is currently part of the document.
	fn is_connected(&self, element: &Self::Element) -> bool;

	fn attribute(&self, element: &Self::Element, name: &str) -> Option<String>;

	fn has_attribute(&self, element: &Self::Element, name: &str) -> bool {
		self.attribute(element, name).is_some()
	}

	/// The current form value of `element`, if it is a form control.
	fn value(&self, element: &Self::Element) -> Option<String>;

	/// Parses `html` and returns its first top-level element, detached.
	///
	/// # Errors
	///
	/// Iff the fragment can't be parsed at all. A fragment without elements is `Ok(None)`.
	fn create_element(&self, html: &str) -> Result<Option<Self::Element>, HostError>;

	/// # Errors
	///
	/// Iff the host refuses the mutation.
	fn replace_with(&self, target: &Self::Element, replacement: &Self::Element) -> Result<(), HostError>;

	/// # Errors
	///
	/// Iff the host refuses the mutation.
	fn append_child(&self, parent: &Self::Element, child: &Self::Element) -> Result<(), HostError>;

	/// # Errors
	///
	/// Iff the host refuses the mutation.
	fn prepend_child(&self, parent: &Self::Element, child: &Self::Element) -> Result<(), HostError>;

	/// Detaches `element` from the tree. Its listeners go with it.
	///
	/// # Errors
	///
	/// Iff the host refuses the mutation.
	fn remove(&self, element: &Self::Element) -> Result<(), HostError>;

	/// Invokes the native reset behaviour of a form or form control.
	///
	/// # Errors
	///
	/// Iff `element` has no reset behaviour.
	fn reset(&self, element: &Self::Element) -> Result<(), HostError>;

	/// Marks `event_type` as bound on `element`. Returns `false` iff it already was.
	///
	/// The mark lives on the node itself, so it disappears together with the node.
	fn claim_binding(&self, element: &Self::Element, event_type: &str) -> bool;

	/// Undoes [`claim_binding`](`Host::claim_binding`) after the listener could not be attached.
	fn release_binding(&self, element: &Self::Element, event_type: &str);

	/// # Errors
	///
	/// Iff the listener could not be attached.
	fn add_event_listener(&self, element: &Self::Element, event_type: &str, listener: Listener<Self::Event>) -> Result<(), HostError>;

	fn prevent_default(&self, event: &Self::Event);

	/// The element whose listener is handling `event`.
	///
	/// Listeners don't hold on to their element, so this is how they find it again.
	fn current_target(&self, event: &Self::Event) -> Option<Self::Element>;

	/// Sends `request` asynchronously. `on_complete` runs at most once, with the terminal response or a transport failure.
	///
	/// # Errors
	///
	/// Iff the request could not be issued at all, in which case `on_complete` is dropped without being called.
	fn send(&self, request: Request, on_complete: ResponseCallback) -> Result<(), HostError>;

	/// # Errors
	///
	/// Iff the subscription could not be created.
	fn open_stream(&self, url: &str, on_event: StreamCallback) -> Result<Self::Stream, HostError>;

	fn close_stream(&self, stream: &Self::Stream);

	/// A fresh random identifier. Called once per runtime.
	fn generate_client_id(&self) -> String {
		uuid::Uuid::new_v4().to_string()
	}
}
