//! Server-pushed fragments over a single long-lived stream.
//!
//! Each message is a heartbeat, the end signal, or a fragment whose root carries a view id.
//! A fragment replaces the live element with the same view id.
//! The subscription is closed for good on the end signal or on any error; there is no reconnection.

use crate::{
	config::Config,
	error::{FragmentError, PatchError, ResolutionError, TransportError},
	grammar::ActionKind,
	host::{Host, StreamEvent},
	patch::{self, PatchResult},
	runtime::Runtime,
	target::attribute_selector,
};
use serde_json::Value;
use std::rc::{Rc, Weak};
use tracing::{error, info, instrument, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushState {
	/// No subscription was opened yet.
	Idle,
	Connecting,
	Open,
	/// Terminal.
	Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMessage<'a> {
	Heartbeat,
	End,
	Fragment(&'a str),
}

/// Sorts a raw stream payload.
///
/// The end signal is either the bare end token or a JSON object `{"msg": <end token>}`.
#[must_use]
pub fn classify<'a>(config: &Config, data: &'a str) -> StreamMessage<'a> {
	let trimmed = data.trim();
	if trimmed == config.heartbeat {
		return StreamMessage::Heartbeat;
	}
	if trimmed == config.end_message {
		return StreamMessage::End;
	}
	if trimmed.starts_with('{') {
		if let Ok(Value::Object(object)) = serde_json::from_str::<Value>(trimmed) {
			if object.get("msg").and_then(Value::as_str) == Some(config.end_message.as_str()) {
				return StreamMessage::End;
			}
		}
	}
	StreamMessage::Fragment(data)
}

pub struct PushChannel<S> {
	state: PushState,
	stream: Option<S>,
}
impl<S> Default for PushChannel<S> {
	fn default() -> Self {
		Self { state: PushState::Idle, stream: None }
	}
}

impl<H: Host + 'static> Runtime<H> {
	#[must_use]
	pub fn push_state(&self) -> PushState {
		self.push.borrow().state
	}

	/// Opens the push subscription. There is only ever one per runtime, and a closed one stays closed.
	///
	/// # Errors
	///
	/// Iff no stream URL is configured or the host fails to open the stream. The channel is closed in the latter case.
	#[instrument(skip(self))]
	pub fn connect_push(self: &Rc<Self>) -> Result<(), TransportError> {
		let url = match &self.config.stream_url {
			Some(url) => url,
			None => return Err(TransportError::Stream("no stream URL configured".to_owned())),
		};
		let state = self.push_state();
		if state != PushState::Idle {
			warn!("Push channel already {:?}; not opening another.", state);
			return Ok(());
		}

		let on_event = {
			let runtime = Rc::downgrade(self);
			Box::new(move |event: StreamEvent| {
				if let Some(runtime) = Weak::upgrade(&runtime) {
					runtime.on_stream_event(event);
				}
			})
		};
		match self.host.open_stream(url, on_event) {
			Ok(stream) => {
				let mut push = self.push.borrow_mut();
				push.state = PushState::Connecting;
				push.stream = Some(stream);
				Ok(())
			}
			Err(error) => {
				self.push.borrow_mut().state = PushState::Closed;
				Err(error.into())
			}
		}
	}

	/// Closes the subscription permanently.
	pub fn close_push(&self) {
		let stream = {
			let mut push = self.push.borrow_mut();
			push.state = PushState::Closed;
			push.stream.take()
		};
		if let Some(stream) = stream {
			self.host.close_stream(&stream);
			info!("Closed push channel.");
		}
	}

	fn on_stream_event(self: &Rc<Self>, event: StreamEvent) {
		if self.push_state() == PushState::Closed {
			return trace!("Ignoring stream event on closed push channel.");
		}

		match event {
			StreamEvent::Open => {
				self.push.borrow_mut().state = PushState::Open;
				info!("Push channel opened.");
			}
			StreamEvent::Error(message) => {
				error!("{}", TransportError::Stream(message));
				self.close_push();
			}
			StreamEvent::Message(data) => match classify(&self.config, &data) {
				StreamMessage::Heartbeat => trace!("Ping!"),
				StreamMessage::End => self.close_push(),
				StreamMessage::Fragment(html) => {
					if let Err(error) = self.apply_pushed(html) {
						error!("Dropping pushed fragment: {}", error);
					}
				}
			},
		}
	}

	/// Swaps a pushed fragment in for the live element with the same view id, then re-binds it.
	///
	/// # Errors
	///
	/// Iff the fragment has no element, its root has no view id, or no live element carries that view id.
	/// The document is unchanged in all of these cases.
	#[instrument(skip(self, html))]
	pub fn apply_pushed(self: &Rc<Self>, html: &str) -> Result<PatchResult<H::Element>, PatchError> {
		let element = self.host.create_element(html)?.ok_or(FragmentError::NoElement)?;
		let view_id = self.host.attribute(&element, &self.config.attributes.view_id).ok_or(ResolutionError::MissingViewId)?;
		let selector = attribute_selector(&self.config.attributes.view_id, &view_id);
		let target = self
			.host
			.query_selector_all(None, &selector)?
			.into_iter()
			.next()
			.ok_or_else(|| ResolutionError::UnknownView(view_id.clone()))?;

		if cfg!(feature = "dangerous-logging") {
			info!("Replacing view {:?} with {:?}.", view_id, html);
		} else {
			info!("Replacing view {:?}.", view_id);
		}
		patch::insert(&self.host, ActionKind::Swap, &target, &element)?;

		let result = PatchResult { kind: ActionKind::Swap, created: vec![element] };
		self.rebind(&result);
		Ok(result)
	}
}
