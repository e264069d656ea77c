//! Decoding of the declarative events attribute.
//!
//! The attribute value is a JSON mapping from event type to a list of action entries.
//! Each entry is `[kind]`, `[kind, endpoint]`, `[kind, config]` or `[kind, config, endpoint]`,
//! where an endpoint is itself a list `[path, param...]` and a config is a mapping.

use crate::error::ParseError;
use core::fmt::{self, Display, Formatter};
use hashbrown::HashMap;
use serde::Deserialize;
use serde_json::{Map, Value};

/// The closed set of patch operations an action can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
	Swap,
	Append,
	Prepend,
	Remove,
	Reset,
}
impl ActionKind {
	#[must_use]
	pub fn parse(kind: &str) -> Option<Self> {
		Some(match kind {
			"swap" => Self::Swap,
			"append" => Self::Append,
			"prepend" => Self::Prepend,
			"remove" => Self::Remove,
			"reset" => Self::Reset,
			_ => return None,
		})
	}

	#[must_use]
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Swap => "swap",
			Self::Append => "append",
			Self::Prepend => "prepend",
			Self::Remove => "remove",
			Self::Reset => "reset",
		}
	}
}
impl Display for ActionKind {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Per-action configuration. Only `target` is interpreted; other keys are kept as hints.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ActionConfig {
	#[serde(default)]
	pub target: Option<String>,
	#[serde(flatten)]
	pub hints: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
	pub path: String,
	/// Positional parameters, each a literal or a dynamic reference (see [`crate::params`]).
	pub params: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActionDescriptor {
	pub kind: ActionKind,
	pub config: ActionConfig,
	/// [`None`] for purely local actions, which patch without a fragment.
	pub endpoint: Option<Endpoint>,
}
impl ActionDescriptor {
	/// Re-encodes this action as an attribute entry (`[kind, config, endpoint?]`).
	#[must_use]
	pub fn to_entry(&self) -> Value {
		let mut config = self.config.hints.clone();
		if let Some(target) = &self.config.target {
			config.insert("target".to_owned(), Value::String(target.clone()));
		}
		let mut entry = vec![Value::String(self.kind.as_str().to_owned()), Value::Object(config)];
		if let Some(endpoint) = &self.endpoint {
			let mut list = vec![Value::String(endpoint.path.clone())];
			list.extend(endpoint.params.iter().cloned());
			entry.push(Value::Array(list));
		}
		Value::Array(entry)
	}
}

/// Event type → actions in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindingSpec(HashMap<String, Vec<ActionDescriptor>>);
impl BindingSpec {
	#[must_use]
	pub fn actions(&self, event_type: &str) -> Option<&[ActionDescriptor]> {
		self.0.get(event_type).map(Vec::as_slice)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &[ActionDescriptor])> {
		self.0.iter().map(|(event_type, actions)| (event_type.as_str(), actions.as_slice()))
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.0.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	#[must_use]
	pub fn into_inner(self) -> HashMap<String, Vec<ActionDescriptor>> {
		self.0
	}
}

/// Decodes one events attribute value.
///
/// `self_target` is the enclosing-view selector of the element, if it carries a view id.
/// It becomes the target of every action that doesn't name one explicitly.
///
/// # Errors
///
/// Iff `raw` is not well-formed. Decoding is all-or-nothing per element.
pub fn parse_binding_spec(raw: &str, self_target: Option<&str>) -> Result<BindingSpec, ParseError> {
	let events = match serde_json::from_str::<Value>(raw)? {
		Value::Object(events) => events,
		_ => return Err(ParseError::NotAMapping),
	};

	let mut spec = HashMap::with_capacity(events.len());
	for (event_type, entries) in events {
		let entries = match entries {
			Value::Array(entries) => entries,
			_ => return Err(ParseError::NotAList { event_type }),
		};
		let actions = entries
			.into_iter()
			.enumerate()
			.map(|(index, entry)| parse_entry(&event_type, index, entry, self_target))
			.collect::<Result<Vec<_>, _>>()?;
		spec.insert(event_type, actions);
	}
	Ok(BindingSpec(spec))
}

fn parse_entry(event_type: &str, index: usize, entry: Value, self_target: Option<&str>) -> Result<ActionDescriptor, ParseError> {
	let malformed = || ParseError::MalformedEntry { event_type: event_type.to_owned(), index };

	let mut parts = match entry {
		Value::Array(parts) if !parts.is_empty() && parts.len() <= 3 => parts.into_iter(),
		_ => return Err(malformed()),
	};

	let kind = match parts.next() {
		Some(Value::String(kind)) => ActionKind::parse(&kind).ok_or_else(|| ParseError::UnknownKind { event_type: event_type.to_owned(), kind })?,
		_ => return Err(malformed()),
	};

	let (config, endpoint) = match (parts.next(), parts.next()) {
		(None, _) => (None, None),
		(Some(endpoint @ Value::Array(_)), None) => (None, Some(endpoint)),
		(Some(Value::Object(config)), endpoint) => (Some(config), endpoint),
		_ => return Err(ParseError::UnexpectedSecond { event_type: event_type.to_owned(), index }),
	};

	let mut config = match config {
		Some(config) => ActionConfig::deserialize(Value::Object(config)).map_err(|source| ParseError::Config { event_type: event_type.to_owned(), index, source })?,
		None => ActionConfig::default(),
	};
	if config.target.is_none() {
		config.target = self_target.map(str::to_owned);
	}

	let endpoint = endpoint.map(|endpoint| parse_endpoint(endpoint).ok_or(ParseError::Endpoint { event_type: event_type.to_owned(), index })).transpose()?;

	Ok(ActionDescriptor { kind, config, endpoint })
}

fn parse_endpoint(endpoint: Value) -> Option<Endpoint> {
	let mut list = match endpoint {
		Value::Array(list) => list.into_iter(),
		_ => return None,
	};
	match list.next() {
		Some(Value::String(path)) => Some(Endpoint { path, params: list.collect() }),
		_ => None,
	}
}
