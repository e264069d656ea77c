//! Failure taxonomy.
//!
//! Every failure is local: it is reported where it occurs and only ever cancels the node, action or patch it belongs to.

use thiserror::Error;

/// A node's events attribute could not be decoded. The node contributes no bindings.
#[derive(Debug, Error)]
pub enum ParseError {
	#[error("events attribute is not valid JSON: {0}")]
	Json(#[from] serde_json::Error),
	#[error("events attribute must be a mapping from event type to a list of actions")]
	NotAMapping,
	#[error("actions for event type {event_type:?} must be a list")]
	NotAList { event_type: String },
	#[error("action entry #{index} for {event_type:?} must be a non-empty list")]
	MalformedEntry { event_type: String, index: usize },
	#[error("unknown action kind {kind:?} for {event_type:?}")]
	UnknownKind { event_type: String, kind: String },
	#[error("second element of action entry #{index} for {event_type:?} must be a config mapping or an endpoint list")]
	UnexpectedSecond { event_type: String, index: usize },
	#[error("config of action entry #{index} for {event_type:?} is invalid: {source}")]
	Config { event_type: String, index: usize, source: serde_json::Error },
	#[error("endpoint of action entry #{index} for {event_type:?} must be a list starting with a URL path")]
	Endpoint { event_type: String, index: usize },
}

/// An action could not be turned into a concrete target or request. The action is skipped; its siblings still run.
#[derive(Debug, Error)]
pub enum ResolutionError {
	#[error("action has no explicit target and its element carries no view id")]
	MissingTarget,
	#[error("target selector {0:?} matched no elements")]
	NoMatch(String),
	#[error("unknown dynamic parameter resolver {0:?}")]
	UnknownResolver(String),
	#[error("dynamic parameter resolver {resolver:?} expects {expected}")]
	BadArguments { resolver: String, expected: &'static str },
	#[error("dynamic parameter selector {0:?} matched no elements")]
	NoParamMatch(String),
	#[error("element matched by {selector:?} has no {what}")]
	NoValue { selector: String, what: &'static str },
	#[error("fragment root carries no view id")]
	MissingViewId,
	#[error("no element with view id {0:?}")]
	UnknownView(String),
	#[error(transparent)]
	Host(#[from] HostError),
}

/// A request or the push stream failed. No retry, no rollback.
#[derive(Debug, Error)]
pub enum TransportError {
	#[error("unexpected response status {0}")]
	Status(u16),
	#[error("request failed: {0}")]
	Request(String),
	#[error("stream failed: {0}")]
	Stream(String),
	#[error("could not serialize request parameters: {0}")]
	Params(#[from] serde_json::Error),
	#[error(transparent)]
	Host(#[from] HostError),
}

/// A fragment did not yield a usable element for a patch kind that creates one.
#[derive(Debug, Error)]
pub enum FragmentError {
	#[error("{0} requires a fragment but none was provided")]
	Missing(&'static str),
	#[error("fragment contains no element")]
	NoElement,
}

/// A capability call into the host environment failed.
#[derive(Debug, Error)]
#[error("{operation} failed: {message}")]
pub struct HostError {
	pub operation: &'static str,
	pub message: String,
}
impl HostError {
	#[must_use]
	pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
		Self { operation, message: message.into() }
	}
}

/// Why a patch was skipped.
#[derive(Debug, Error)]
pub enum PatchError {
	#[error(transparent)]
	Resolution(#[from] ResolutionError),
	#[error(transparent)]
	Fragment(#[from] FragmentError),
	#[error(transparent)]
	Host(#[from] HostError),
}
