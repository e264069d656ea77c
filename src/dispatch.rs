//! Listener registration and the request lifecycle of a single action.

use crate::{
	config::Config,
	error::{HostError, ParseError, TransportError},
	grammar::{parse_binding_spec, ActionDescriptor, ActionKind},
	host::{Host, Request, Response},
	runtime::Runtime,
	target::{resolve_target, ViewIdentity},
};
use serde_json::Value;
use std::rc::{Rc, Weak};
use tracing::{error, info, trace, trace_span, warn};
use url::form_urlencoded::byte_serialize;

pub const OK: u16 = 200;

/// Builds `GET <path>?<params_key>=<JSON array>`. Without parameters, the bare path is requested.
///
/// # Errors
///
/// Iff `params` can't be serialized.
pub fn build_request(config: &Config, client_id: &str, path: &str, params: &[Value]) -> Result<Request, TransportError> {
	let mut location = path.to_owned();
	if !params.is_empty() {
		let json = serde_json::to_string(params)?;
		location.push(if path.contains('?') { '&' } else { '?' });
		location.extend(byte_serialize(config.params_key.as_bytes()));
		location.push('=');
		location.extend(byte_serialize(json.as_bytes()));
	}
	Ok(Request {
		method: "GET",
		url: location,
		headers: vec![(config.client_id_header.clone(), client_id.to_owned())],
	})
}

impl<H: Host + 'static> Runtime<H> {
	/// Registers one listener per event type in `element`'s events attribute, unless that type is already bound there.
	///
	/// The attribute is decoded anew on every call. Returns the number of listeners added.
	///
	/// # Errors
	///
	/// Iff the events attribute is malformed, in which case nothing is registered.
	pub fn bind(self: &Rc<Self>, element: &H::Element) -> Result<usize, ParseError> {
		let attributes = &self.config.attributes;
		let raw = match self.host.attribute(element, &attributes.events) {
			Some(raw) => raw,
			None => return Ok(0),
		};
		let view = ViewIdentity::of(&self.host, element, attributes);
		let self_target = view.as_ref().map(|view| view.selector(attributes));
		let spec = parse_binding_spec(&raw, self_target.as_deref())?;

		let mut added = 0;
		for (event_type, actions) in spec.into_inner() {
			if !self.host.claim_binding(element, &event_type) {
				trace!("'{}' is already bound on {:?}.", event_type, element);
				continue;
			}

			info!("Adding '{}' type listener with {} action(s) for node {:?}.", event_type, actions.len(), element);
			// Must not capture `element`: the listener lives on the element and is collected with it.
			let listener = {
				let runtime = Rc::downgrade(self);
				let view = view.clone();
				let event_type = event_type.clone();
				Box::new(move |event: &H::Event| {
					if let Some(runtime) = Weak::upgrade(&runtime) {
						let element = runtime.host.current_target(event);
						runtime.fire(element.as_ref(), &event_type, view.as_ref(), &actions, event);
					} else {
						warn!("'{}' fired after its runtime was dropped.", event_type);
					}
				})
			};
			match self.host.add_event_listener(element, &event_type, listener) {
				Ok(()) => added += 1,
				Err(error) => {
					self.host.release_binding(element, &event_type);
					error!("Failed to add '{}' listener to {:?}: {}", event_type, element, error);
				}
			}
		}
		Ok(added)
	}

	/// Runs `actions` strictly in order. Each one succeeds or fails on its own.
	fn fire(self: &Rc<Self>, element: Option<&H::Element>, event_type: &str, view: Option<&ViewIdentity>, actions: &[ActionDescriptor], event: &H::Event) {
		let span = trace_span!("Dispatching", event_type, ?element);
		let _enter = span.enter();

		if self.config.prevents_default(event_type) {
			self.host.prevent_default(event);
		}
		info!("Calling {} '{}' action(s) for node {:?}.", actions.len(), event_type, element);
		for (index, action) in actions.iter().enumerate() {
			let span = trace_span!("Action", index, kind = %action.kind);
			let _enter = span.enter();
			self.run_action(element, event_type, view, action);
		}
	}

	fn run_action(self: &Rc<Self>, element: Option<&H::Element>, event_type: &str, view: Option<&ViewIdentity>, action: &ActionDescriptor) {
		let target = match resolve_target(&action.config, view, &self.config.attributes) {
			Ok(target) => target,
			Err(error) => return error!("Skipping '{}' {} action of node {:?} (config {:?}): {}", event_type, action.kind, element, action.config, error),
		};

		let endpoint = match &action.endpoint {
			Some(endpoint) => endpoint,
			None => {
				if let Err(error) = self.patch(action.kind, &target, None) {
					error!("{} of {:?} failed: {}", action.kind, target, error);
				}
				return;
			}
		};

		let params = match self.resolvers.resolve(&self.host, &endpoint.params) {
			Ok(params) => params,
			Err(error) => return error!("Aborting '{}' {} action of node {:?}, entry {}: {}", event_type, action.kind, element, action.to_entry(), error),
		};
		if cfg!(feature = "dangerous-logging") {
			trace!("Resolved parameters: {:?}", params);
		}

		let request = match build_request(&self.config, &self.client_id, &endpoint.path, &params) {
			Ok(request) => request,
			Err(error) => return error!("Aborting '{}' {} action of node {:?}: {}", event_type, action.kind, element, error),
		};
		trace!("{} {}", request.method, request.url);

		let on_complete = {
			let runtime = Rc::downgrade(self);
			let kind = action.kind;
			Box::new(move |result: Result<Response, HostError>| {
				if let Some(runtime) = Weak::upgrade(&runtime) {
					runtime.complete(kind, &target, result);
				}
			})
		};
		if let Err(error) = self.host.send(request, on_complete) {
			error!("{}", TransportError::from(error));
		}
	}

	fn complete(self: &Rc<Self>, kind: ActionKind, target: &str, result: Result<Response, HostError>) {
		let span = trace_span!("Response", %kind, target);
		let _enter = span.enter();

		let body = match result {
			Ok(Response { status: OK, body }) => body,
			Ok(Response { status, .. }) => return error!("{}", TransportError::Status(status)),
			Err(error) => return error!("{}", TransportError::Request(error.to_string())),
		};
		if cfg!(feature = "dangerous-logging") {
			trace!("Fragment: {:?}", body);
		}

		if let Err(error) = self.patch(kind, target, Some(&body)) {
			error!("{} of {:?} failed: {}", kind, target, error);
		}
	}
}
