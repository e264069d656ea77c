//! An in-memory [`Host`] for native tests.
//!
//! Supports a small HTML subset (elements, quoted or bare attributes, text, void and self-closing tags)
//! and compound selectors made of `tag`, `#id`, `.class`, `[attr]` and `[attr="value"]`.
//! Requests and stream events are driven manually from the test.

#![allow(dead_code)]

use silta_dom::{
	error::HostError,
	host::{Host, Listener, Request, Response, ResponseCallback, StreamCallback, StreamEvent},
};
use std::{
	cell::{Cell, RefCell},
	collections::HashSet,
	iter::Peekable,
	rc::Rc,
	str::Chars,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

pub struct FakeEvent {
	pub r#type: String,
	pub current_target: NodeId,
	pub default_prevented: Cell<bool>,
}

#[derive(Default)]
struct Node {
	tag: String,
	attributes: Vec<(String, String)>,
	children: Vec<NodeId>,
	parent: Option<NodeId>,
	text: String,
	value: Option<String>,
	listeners: Vec<(String, Rc<dyn Fn(&FakeEvent)>)>,
	bound: HashSet<String>,
}

const VOID: &[&str] = &["input", "br", "img", "hr", "meta", "link"];

pub struct PendingRequest {
	pub request: Request,
	callback: Option<ResponseCallback>,
}

#[derive(Default)]
pub struct FakeHost {
	nodes: RefCell<Vec<Node>>,
	requests: RefCell<Vec<PendingRequest>>,
	stream: RefCell<Option<(String, Rc<dyn Fn(StreamEvent)>)>>,
	closed_streams: Cell<usize>,
	fail_stream: Cell<bool>,
	fail_listeners: Cell<bool>,
}

impl FakeHost {
	/// A document whose `<body>` contains `body`.
	pub fn with_body(body: &str) -> Self {
		let host = Self::default();
		host.nodes.borrow_mut().push(Node { tag: "#document".to_owned(), ..Node::default() });
		let body = host.parse(&format!("<body>{}</body>", body)).into_iter().next().expect("body");
		host.attach(NodeId(0), body, None);
		host
	}

	pub fn failing_stream(self) -> Self {
		self.fail_stream.set(true);
		self
	}

	/// While set, attaching listeners fails.
	pub fn set_failing_listeners(&self, failing: bool) {
		self.fail_listeners.set(failing);
	}

	pub fn body(&self) -> NodeId {
		self.nodes.borrow()[0].children[0]
	}

	pub fn find(&self, selector: &str) -> Vec<NodeId> {
		self.query_selector_all(None, selector).expect("valid selector")
	}

	pub fn one(&self, selector: &str) -> NodeId {
		let found = self.find(selector);
		assert_eq!(found.len(), 1, "expected exactly one match for {:?}", selector);
		found[0]
	}

	pub fn tag(&self, node: NodeId) -> String {
		self.nodes.borrow()[node.0].tag.clone()
	}

	/// Concatenated text content.
	pub fn text(&self, node: NodeId) -> String {
		self.text_in(&self.nodes.borrow(), node)
	}

	fn text_in(&self, nodes: &[Node], node: NodeId) -> String {
		let mut text = nodes[node.0].text.clone();
		for &child in &nodes[node.0].children {
			text.push_str(&self.text_in(nodes, child));
		}
		text
	}

	pub fn children(&self, node: NodeId) -> Vec<NodeId> {
		self.nodes.borrow()[node.0].children.clone()
	}

	pub fn is_attached(&self, node: NodeId) -> bool {
		let nodes = self.nodes.borrow();
		let mut current = Some(node);
		while let Some(id) = current {
			if id == NodeId(0) {
				return true;
			}
			current = nodes[id.0].parent;
		}
		false
	}

	pub fn set_value(&self, node: NodeId, value: &str) {
		self.nodes.borrow_mut()[node.0].value = Some(value.to_owned());
	}

	pub fn listener_count(&self, node: NodeId, event_type: &str) -> usize {
		self.nodes.borrow()[node.0].listeners.iter().filter(|(t, _)| t == event_type).count()
	}

	/// Fires `event_type` on `node`, calling its listeners outside of any borrow.
	pub fn dispatch(&self, node: NodeId, event_type: &str) -> FakeEvent {
		let listeners: Vec<_> = self.nodes.borrow()[node.0].listeners.iter().filter(|(t, _)| t == event_type).map(|(_, l)| Rc::clone(l)).collect();
		let event = FakeEvent { r#type: event_type.to_owned(), current_target: node, default_prevented: Cell::new(false) };
		for listener in listeners {
			listener(&event);
		}
		event
	}

	pub fn requests(&self) -> Vec<Request> {
		self.requests.borrow().iter().map(|pending| pending.request.clone()).collect()
	}

	pub fn is_pending(&self, index: usize) -> bool {
		self.requests.borrow()[index].callback.is_some()
	}

	pub fn respond(&self, index: usize, status: u16, body: &str) {
		self.complete(index, Ok(Response { status, body: body.to_owned() }));
	}

	pub fn fail(&self, index: usize, message: &str) {
		self.complete(index, Err(HostError::new("fake request", message)));
	}

	fn complete(&self, index: usize, result: Result<Response, HostError>) {
		let callback = self.requests.borrow_mut()[index].callback.take().expect("request already completed");
		callback(result);
	}

	pub fn stream_url(&self) -> Option<String> {
		self.stream.borrow().as_ref().map(|(url, _)| url.clone())
	}

	pub fn closed_streams(&self) -> usize {
		self.closed_streams.get()
	}

	pub fn stream_event(&self, event: StreamEvent) {
		let callback = self.stream.borrow().as_ref().map(|(_, callback)| Rc::clone(callback)).expect("no stream open");
		callback(event);
	}

	pub fn stream_message(&self, data: &str) {
		self.stream_event(StreamEvent::Message(data.to_owned()));
	}

	fn attach(&self, parent: NodeId, child: NodeId, index: Option<usize>) {
		self.detach(child);
		let mut nodes = self.nodes.borrow_mut();
		let children = &mut nodes[parent.0].children;
		match index {
			Some(index) => children.insert(index, child),
			None => children.push(child),
		}
		nodes[child.0].parent = Some(parent);
	}

	fn detach(&self, node: NodeId) -> Option<(NodeId, usize)> {
		let mut nodes = self.nodes.borrow_mut();
		let parent = nodes[node.0].parent.take()?;
		let children = &mut nodes[parent.0].children;
		let index = children.iter().position(|&c| c == node)?;
		children.remove(index);
		Some((parent, index))
	}

	fn descendants(&self, root: NodeId, out: &mut Vec<NodeId>) {
		for child in self.children(root) {
			out.push(child);
			self.descendants(child, out);
		}
	}

	/// Parses `html` into detached top-level elements.
	fn parse(&self, html: &str) -> Vec<NodeId> {
		let mut parser = Parser { input: html.as_bytes(), position: 0 };
		let mut top = Vec::new();
		let mut stack: Vec<NodeId> = Vec::new();
		while let Some(token) = parser.next_token() {
			match token {
				Token::Text(text) => {
					if let Some(&parent) = stack.last() {
						self.nodes.borrow_mut()[parent.0].text.push_str(&text);
					}
				}
				Token::Open { tag, attributes, self_closing } => {
					let id = {
						let mut nodes = self.nodes.borrow_mut();
						nodes.push(Node { tag: tag.clone(), attributes, ..Node::default() });
						NodeId(nodes.len() - 1)
					};
					match stack.last() {
						Some(&parent) => self.attach(parent, id, None),
						None => top.push(id),
					}
					if !self_closing && !VOID.contains(&tag.as_str()) {
						stack.push(id);
					}
				}
				Token::Close(tag) => {
					if let Some(position) = stack.iter().rposition(|&id| self.nodes.borrow()[id.0].tag == tag) {
						stack.truncate(position);
					}
				}
			}
		}
		top
	}

	fn matches(&self, node: NodeId, selector: &[Condition]) -> bool {
		let nodes = self.nodes.borrow();
		let node = &nodes[node.0];
		let attribute = |name: &str| node.attributes.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str());
		selector.iter().all(|condition| match condition {
			Condition::Tag(tag) => node.tag == *tag,
			Condition::Id(id) => attribute("id") == Some(id.as_str()),
			Condition::Class(class) => attribute("class").map_or(false, |classes| classes.split_whitespace().any(|c| c == class.as_str())),
			Condition::Has(name) => attribute(name.as_str()).is_some(),
			Condition::Equals(name, value) => attribute(name.as_str()) == Some(value.as_str()),
		})
	}
}

impl Host for FakeHost {
	type Element = NodeId;
	type Event = FakeEvent;
	type Stream = ();

	fn query_selector_all(&self, root: Option<&NodeId>, selector: &str) -> Result<Vec<NodeId>, HostError> {
		let selector = parse_selector(selector).ok_or_else(|| HostError::new("querySelectorAll", format!("invalid selector {:?}", selector)))?;
		let mut candidates = Vec::new();
		self.descendants(root.copied().unwrap_or(NodeId(0)), &mut candidates);
		Ok(candidates.into_iter().filter(|&node| self.matches(node, &selector)).collect())
	}

	fn contains(&self, ancestor: &NodeId, descendant: &NodeId) -> bool {
		let nodes = self.nodes.borrow();
		let mut current = Some(*descendant);
		while let Some(id) = current {
			if id == *ancestor {
				return true;
			}
			current = nodes[id.0].parent;
		}
		false
	}

	fn is_connected(&self, element: &NodeId) -> bool {
		self.is_attached(*element)
	}

	fn attribute(&self, element: &NodeId, name: &str) -> Option<String> {
		self.nodes.borrow()[element.0].attributes.iter().find(|(n, _)| n == name).map(|(_, v)| v.clone())
	}

	fn value(&self, element: &NodeId) -> Option<String> {
		let nodes = self.nodes.borrow();
		let node = &nodes[element.0];
		match node.tag.as_str() {
			"input" | "textarea" | "select" => Some(node.value.clone().unwrap_or_else(|| self.attribute(element, "value").unwrap_or_default())),
			_ => None,
		}
	}

	fn create_element(&self, html: &str) -> Result<Option<NodeId>, HostError> {
		Ok(self.parse(html).into_iter().next())
	}

	fn replace_with(&self, target: &NodeId, replacement: &NodeId) -> Result<(), HostError> {
		let (parent, index) = self.detach(*target).ok_or_else(|| HostError::new("replaceWith", "target has no parent"))?;
		self.detach(*replacement);
		self.attach(parent, *replacement, Some(index));
		Ok(())
	}

	fn append_child(&self, parent: &NodeId, child: &NodeId) -> Result<(), HostError> {
		self.attach(*parent, *child, None);
		Ok(())
	}

	fn prepend_child(&self, parent: &NodeId, child: &NodeId) -> Result<(), HostError> {
		self.attach(*parent, *child, Some(0));
		Ok(())
	}

	fn remove(&self, element: &NodeId) -> Result<(), HostError> {
		self.detach(*element);
		Ok(())
	}

	fn reset(&self, element: &NodeId) -> Result<(), HostError> {
		let mut controls = vec![*element];
		match self.tag(*element).as_str() {
			"form" => self.descendants(*element, &mut controls),
			"input" | "textarea" | "select" => (),
			other => return Err(HostError::new("reset", format!("<{}> has no reset behaviour", other))),
		}
		let mut nodes = self.nodes.borrow_mut();
		for control in controls {
			nodes[control.0].value = None;
		}
		Ok(())
	}

	fn claim_binding(&self, element: &NodeId, event_type: &str) -> bool {
		self.nodes.borrow_mut()[element.0].bound.insert(event_type.to_owned())
	}

	fn release_binding(&self, element: &NodeId, event_type: &str) {
		self.nodes.borrow_mut()[element.0].bound.remove(event_type);
	}

	fn add_event_listener(&self, element: &NodeId, event_type: &str, listener: Listener<FakeEvent>) -> Result<(), HostError> {
		if self.fail_listeners.get() {
			return Err(HostError::new("addEventListener", "refused"));
		}
		self.nodes.borrow_mut()[element.0].listeners.push((event_type.to_owned(), Rc::from(listener)));
		Ok(())
	}

	fn prevent_default(&self, event: &FakeEvent) {
		event.default_prevented.set(true);
	}

	fn current_target(&self, event: &FakeEvent) -> Option<NodeId> {
		Some(event.current_target)
	}

	fn send(&self, request: Request, on_complete: ResponseCallback) -> Result<(), HostError> {
		self.requests.borrow_mut().push(PendingRequest { request, callback: Some(on_complete) });
		Ok(())
	}

	fn open_stream(&self, url: &str, on_event: StreamCallback) -> Result<(), HostError> {
		if self.fail_stream.get() {
			return Err(HostError::new("open_stream", "refused"));
		}
		*self.stream.borrow_mut() = Some((url.to_owned(), Rc::from(on_event)));
		Ok(())
	}

	fn close_stream(&self, _: &()) {
		self.closed_streams.set(self.closed_streams.get() + 1);
	}
}

enum Token {
	Open { tag: String, attributes: Vec<(String, String)>, self_closing: bool },
	Close(String),
	Text(String),
}

struct Parser<'a> {
	input: &'a [u8],
	position: usize,
}
impl Parser<'_> {
	fn peek(&self) -> Option<u8> {
		self.input.get(self.position).copied()
	}

	fn skip_whitespace(&mut self) {
		while self.peek().map_or(false, |b| b.is_ascii_whitespace()) {
			self.position += 1;
		}
	}

	fn take_while(&mut self, predicate: impl Fn(u8) -> bool) -> String {
		let start = self.position;
		while self.peek().map_or(false, &predicate) {
			self.position += 1;
		}
		String::from_utf8_lossy(&self.input[start..self.position]).into_owned()
	}

	fn next_token(&mut self) -> Option<Token> {
		match self.peek()? {
			b'<' => {
				self.position += 1;
				if self.peek() == Some(b'/') {
					self.position += 1;
					let tag = self.take_while(|b| b != b'>').trim().to_ascii_lowercase();
					self.position += 1;
					return Some(Token::Close(tag));
				}
				let tag = self.take_while(|b| b.is_ascii_alphanumeric() || b == b'-').to_ascii_lowercase();
				let mut attributes = Vec::new();
				let mut self_closing = false;
				loop {
					self.skip_whitespace();
					match self.peek() {
						None => break,
						Some(b'>') => {
							self.position += 1;
							break;
						}
						Some(b'/') => {
							self_closing = true;
							self.position += 1;
						}
						Some(_) => {
							let name = self.take_while(|b| !b.is_ascii_whitespace() && b != b'=' && b != b'>' && b != b'/').to_ascii_lowercase();
							self.skip_whitespace();
							let value = if self.peek() == Some(b'=') {
								self.position += 1;
								self.skip_whitespace();
								match self.peek() {
									Some(quote @ b'"') | Some(quote @ b'\'') => {
										self.position += 1;
										let value = self.take_while(|b| b != quote);
										self.position += 1;
										decode_entities(&value)
									}
									_ => self.take_while(|b| !b.is_ascii_whitespace() && b != b'>'),
								}
							} else {
								String::new()
							};
							attributes.push((name, value));
						}
					}
				}
				Some(Token::Open { tag, attributes, self_closing })
			}
			_ => Some(Token::Text(decode_entities(&self.take_while(|b| b != b'<')))),
		}
	}
}

fn decode_entities(text: &str) -> String {
	text.replace("&quot;", "\"").replace("&#39;", "'").replace("&lt;", "<").replace("&gt;", ">").replace("&amp;", "&")
}

#[derive(Debug)]
enum Condition {
	Tag(String),
	Id(String),
	Class(String),
	Has(String),
	Equals(String, String),
}

fn take_name(chars: &mut Peekable<Chars<'_>>) -> String {
	let mut name = String::new();
	while let Some(&c) = chars.peek() {
		if c.is_alphanumeric() || c == '-' || c == '_' {
			name.push(c);
			chars.next();
		} else {
			break;
		}
	}
	name
}

fn parse_selector(selector: &str) -> Option<Vec<Condition>> {
	let mut chars = selector.trim().chars().peekable();
	let mut conditions = Vec::new();
	while let Some(&c) = chars.peek() {
		let condition = match c {
			'#' => {
				chars.next();
				Condition::Id(take_name(&mut chars))
			}
			'.' => {
				chars.next();
				Condition::Class(take_name(&mut chars))
			}
			'[' => {
				chars.next();
				let attribute = take_name(&mut chars);
				match chars.next()? {
					']' => Condition::Has(attribute),
					'=' => {
						if chars.next()? != '"' {
							return None;
						}
						let mut value = String::new();
						loop {
							match chars.next()? {
								'\\' => {
									let escaped = chars.next()?;
									if escaped == 'a' {
										value.push('\n');
										if chars.peek() == Some(&' ') {
											chars.next();
										}
									} else {
										value.push(escaped);
									}
								}
								'"' => break,
								c => value.push(c),
							}
						}
						if chars.next()? != ']' {
							return None;
						}
						Condition::Equals(attribute, value)
					}
					_ => return None,
				}
			}
			c if c.is_alphanumeric() => Condition::Tag(take_name(&mut chars).to_ascii_lowercase()),
			_ => return None,
		};
		conditions.push(condition);
	}
	if conditions.is_empty() {
		None
	} else {
		Some(conditions)
	}
}
