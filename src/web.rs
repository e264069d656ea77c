//! [`Host`] on top of the browser DOM, `XMLHttpRequest` and `EventSource`.

use crate::{
	config::Config,
	error::HostError,
	host::{Host, Listener, Request, Response, ResponseCallback, StreamCallback, StreamEvent},
	runtime::Runtime,
};
use js_sys::{Object, Reflect};
use std::rc::Rc;
use tracing::{error, instrument, trace};
use wasm_bindgen::{closure::Closure, prelude::wasm_bindgen, JsCast, JsValue};
use web_sys::{Document, Element, Event, EventSource, HtmlFormElement, HtmlInputElement, HtmlSelectElement, HtmlTemplateElement, HtmlTextAreaElement, MessageEvent, NodeList, XmlHttpRequest};

/// Property on bound elements holding the set of event types already bound there.
const BOUND_EVENTS_KEY: &str = "__siltaBoundEvents";

fn js_error(operation: &'static str) -> impl FnOnce(JsValue) -> HostError {
	move |error| HostError::new(operation, format!("{:?}", error))
}

fn elements(list: &NodeList) -> Vec<Element> {
	(0..list.length()).filter_map(|i| list.item(i)).filter_map(|node| node.dyn_into::<Element>().ok()).collect()
}

#[derive(Debug, Clone)]
pub struct WebHost {
	document: Document,
}
impl WebHost {
	/// Attaches to the current window's document.
	///
	/// # Errors
	///
	/// Iff there is no window or document, e.g. in a worker.
	pub fn new() -> Result<Self, HostError> {
		let document = web_sys::window()
			.and_then(|window| window.document())
			.ok_or_else(|| HostError::new("window.document", "no document available"))?;
		Ok(Self::for_document(document))
	}

	#[must_use]
	pub fn for_document(document: Document) -> Self {
		Self { document }
	}

	#[must_use]
	pub fn document(&self) -> &Document {
		&self.document
	}
}

impl Host for WebHost {
	type Element = Element;
	type Event = Event;
	type Stream = EventSource;

	fn query_selector_all(&self, root: Option<&Element>, selector: &str) -> Result<Vec<Element>, HostError> {
		let list = match root {
			Some(root) => root.query_selector_all(selector),
			None => self.document.query_selector_all(selector),
		}
		.map_err(js_error("querySelectorAll"))?;
		Ok(elements(&list))
	}

	fn contains(&self, ancestor: &Element, descendant: &Element) -> bool {
		ancestor.contains(Some(descendant.as_ref()))
	}

	fn is_connected(&self, element: &Element) -> bool {
		element.is_connected()
	}

	fn attribute(&self, element: &Element, name: &str) -> Option<String> {
		element.get_attribute(name)
	}

	fn has_attribute(&self, element: &Element, name: &str) -> bool {
		element.has_attribute(name)
	}

	fn value(&self, element: &Element) -> Option<String> {
		if let Some(input) = element.dyn_ref::<HtmlInputElement>() {
			Some(input.value())
		} else if let Some(text_area) = element.dyn_ref::<HtmlTextAreaElement>() {
			Some(text_area.value())
		} else if let Some(select) = element.dyn_ref::<HtmlSelectElement>() {
			Some(select.value())
		} else {
			None
		}
	}

	fn create_element(&self, html: &str) -> Result<Option<Element>, HostError> {
		let template: HtmlTemplateElement = self
			.document
			.create_element("template")
			.map_err(js_error("createElement"))?
			.dyn_into()
			.map_err(|element| HostError::new("createElement", format!("expected <template> but got {:?}", element)))?;
		template.set_inner_html(html);
		Ok(template.content().first_element_child())
	}

	fn replace_with(&self, target: &Element, replacement: &Element) -> Result<(), HostError> {
		target.replace_with_with_node_1(replacement).map_err(js_error("replaceWith"))
	}

	fn append_child(&self, parent: &Element, child: &Element) -> Result<(), HostError> {
		parent.append_with_node_1(child).map_err(js_error("append"))
	}

	fn prepend_child(&self, parent: &Element, child: &Element) -> Result<(), HostError> {
		parent.prepend_with_node_1(child).map_err(js_error("prepend"))
	}

	fn remove(&self, element: &Element) -> Result<(), HostError> {
		element.remove();
		Ok(())
	}

	fn reset(&self, element: &Element) -> Result<(), HostError> {
		if let Some(form) = element.dyn_ref::<HtmlFormElement>() {
			form.reset();
		} else if let Some(input) = element.dyn_ref::<HtmlInputElement>() {
			input.set_value(&input.default_value());
		} else if let Some(text_area) = element.dyn_ref::<HtmlTextAreaElement>() {
			text_area.set_value(&text_area.text_content().unwrap_or_default());
		} else {
			return Err(HostError::new("reset", format!("<{}> has no reset behaviour", element.tag_name())));
		}
		Ok(())
	}

	fn claim_binding(&self, element: &Element, event_type: &str) -> bool {
		let key = JsValue::from_str(BOUND_EVENTS_KEY);
		let bound = match Reflect::get(element, &key) {
			Ok(bound) if bound.is_object() => bound,
			_ => {
				let bound: JsValue = Object::new().into();
				if Reflect::set(element, &key, &bound).is_err() {
					error!("Could not mark {:?} as bound. It may be bound again.", element);
				}
				bound
			}
		};
		let event_type = JsValue::from_str(event_type);
		if Reflect::has(&bound, &event_type).unwrap_or(false) {
			return false;
		}
		if Reflect::set(&bound, &event_type, &JsValue::TRUE).is_err() {
			error!("Could not mark {:?} as bound on {:?}. It may be bound again.", event_type, element);
		}
		true
	}

	fn release_binding(&self, element: &Element, event_type: &str) {
		if let Ok(bound) = Reflect::get(element, &JsValue::from_str(BOUND_EVENTS_KEY)) {
			if bound.is_object() && Reflect::delete_property(bound.unchecked_ref::<Object>(), &JsValue::from_str(event_type)).is_err() {
				error!("Could not unmark '{}' on {:?}.", event_type, element);
			}
		}
	}

	fn add_event_listener(&self, element: &Element, event_type: &str, listener: Listener<Event>) -> Result<(), HostError> {
		// Handed over to the JS garbage collector. `listener` holds no handle to `element`, so the two can be collected together.
		let callback = Closure::wrap(Box::new(move |event: Event| listener(&event)) as Box<dyn Fn(Event)>).into_js_value();
		element.add_event_listener_with_callback(event_type, callback.unchecked_ref()).map_err(js_error("addEventListener"))
	}

	fn prevent_default(&self, event: &Event) {
		event.prevent_default();
	}

	fn current_target(&self, event: &Event) -> Option<Element> {
		event.current_target().and_then(|target| target.dyn_into::<Element>().ok())
	}

	#[instrument(skip(self, on_complete))]
	fn send(&self, request: Request, on_complete: ResponseCallback) -> Result<(), HostError> {
		let xhr = XmlHttpRequest::new().map_err(js_error("new XMLHttpRequest"))?;
		xhr.open_with_async(request.method, &request.url, true).map_err(js_error("XMLHttpRequest.open"))?;
		for (name, value) in &request.headers {
			xhr.set_request_header(name, value).map_err(js_error("XMLHttpRequest.setRequestHeader"))?;
		}

		let on_load_end = {
			let xhr = xhr.clone();
			Closure::once_into_js(move || {
				let result = match xhr.status() {
					Ok(0) | Err(_) => Err(HostError::new("XMLHttpRequest", "network error")),
					Ok(status) => xhr
						.response_text()
						.map(|body| Response { status, body: body.unwrap_or_default() })
						.map_err(js_error("XMLHttpRequest.responseText")),
				};
				on_complete(result);
			})
		};
		xhr.set_onloadend(Some(on_load_end.unchecked_ref()));
		xhr.send().map_err(js_error("XMLHttpRequest.send"))
	}

	#[instrument(skip(self, on_event))]
	fn open_stream(&self, url: &str, on_event: StreamCallback) -> Result<EventSource, HostError> {
		let source = EventSource::new(url).map_err(js_error("new EventSource"))?;
		let on_event: Rc<dyn Fn(StreamEvent)> = on_event.into();

		let on_open = {
			let on_event = Rc::clone(&on_event);
			Closure::wrap(Box::new(move |_: Event| on_event(StreamEvent::Open)) as Box<dyn Fn(Event)>).into_js_value()
		};
		let on_message = {
			let on_event = Rc::clone(&on_event);
			Closure::wrap(Box::new(move |event: MessageEvent| match event.data().as_string() {
				Some(data) => on_event(StreamEvent::Message(data)),
				None => trace!("Ignoring non-text stream message."),
			}) as Box<dyn Fn(MessageEvent)>)
			.into_js_value()
		};
		let on_error = {
			let source = source.clone();
			Closure::wrap(Box::new(move |event: Event| on_event(StreamEvent::Error(format!("{} (readyState {})", event.type_(), source.ready_state())))) as Box<dyn Fn(Event)>).into_js_value()
		};

		source.set_onopen(Some(on_open.unchecked_ref()));
		source.set_onmessage(Some(on_message.unchecked_ref()));
		source.set_onerror(Some(on_error.unchecked_ref()));
		Ok(source)
	}

	fn close_stream(&self, stream: &EventSource) {
		stream.set_onopen(None);
		stream.set_onmessage(None);
		stream.set_onerror(None);
		stream.close();
	}
}

/// Binds the current document and opens the push channel with a default [`Config`].
///
/// The returned runtime must be kept alive for the bindings to keep working.
///
/// # Errors
///
/// Iff there is no document or the root selector is invalid.
pub fn start() -> Result<Rc<Runtime<WebHost>>, HostError> {
	start_with(Config::default())
}

/// # Errors
///
/// Iff there is no document or the root selector is invalid.
pub fn start_with(config: Config) -> Result<Rc<Runtime<WebHost>>, HostError> {
	let runtime = Runtime::new(WebHost::new()?, config);
	runtime.start()?;
	Ok(runtime)
}

/// Page bootstrap for JavaScript: `startSilta()` or `startSilta('{"rootSelector": "main"}')`.
///
/// The runtime stays alive for the rest of the page's life.
///
/// # Errors
///
/// Iff the configuration is invalid or the page can't be bound.
#[wasm_bindgen(js_name = startSilta)]
pub fn start_silta(config: Option<String>) -> Result<(), JsValue> {
	let config = match config {
		Some(json) => Config::from_json(&json).map_err(|error| JsValue::from_str(&error.to_string()))?,
		None => Config::default(),
	};
	let runtime = start_with(config).map_err(|error| JsValue::from_str(&error.to_string()))?;
	std::mem::forget(runtime);
	Ok(())
}
