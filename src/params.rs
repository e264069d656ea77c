//! Dispatch-time resolution of endpoint parameters.
//!
//! A parameter tree may contain, at any depth, lists tagged with a marker in first position:
//!
//! - `["dynamic", resolver, args...]` is replaced by the value `resolver` reads from the document *when the action fires*.
//! - `["lit", value]` is replaced by `value`, which is not walked any further.
//!
//! Everything else is passed through unchanged.

use crate::{error::ResolutionError, host::Host};
use hashbrown::HashMap;
use serde_json::{Map, Value};

pub const DYNAMIC_MARKER: &str = "dynamic";
pub const LITERAL_MARKER: &str = "lit";

/// What [`prewalk`] does with a node after transforming it.
pub enum Step {
	/// Walk into the children of this value.
	Descend(Value),
	/// Use this value as is.
	Done(Value),
}

/// Structure-preserving pre-order walk: `transform` sees every node before its children are visited.
///
/// # Errors
///
/// The first error returned by `transform`. Nothing after it is visited.
pub fn prewalk<E>(value: Value, transform: &mut impl FnMut(Value) -> Result<Step, E>) -> Result<Value, E> {
	match transform(value)? {
		Step::Done(value) => Ok(value),
		Step::Descend(Value::Array(items)) => items.into_iter().map(|item| prewalk(item, &mut *transform)).collect::<Result<Vec<_>, E>>().map(Value::Array),
		Step::Descend(Value::Object(entries)) => entries
			.into_iter()
			.map(|(key, item)| Ok((key, prewalk(item, &mut *transform)?)))
			.collect::<Result<Map<_, _>, E>>()
			.map(Value::Object),
		Step::Descend(scalar) => Ok(scalar),
	}
}

/// A parsed `["dynamic", resolver, args...]` node.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicParamRef {
	pub resolver: String,
	pub args: Vec<Value>,
}
impl DynamicParamRef {
	/// Recognizes a dynamic reference. Any other value is handed back.
	///
	/// # Errors
	///
	/// `value` itself, if it isn't a dynamic reference.
	pub fn recognize(value: Value) -> Result<Self, Value> {
		let resolver = match &value {
			Value::Array(items) if items.len() >= 2 && items[0] == DYNAMIC_MARKER => items[1].as_str().map(str::to_owned),
			_ => None,
		};
		match (resolver, value) {
			(Some(resolver), Value::Array(items)) => Ok(Self { resolver, args: items.into_iter().skip(2).collect() }),
			(_, value) => Err(value),
		}
	}
}

pub type Resolver<H> = fn(&H, &[Value]) -> Result<Value, ResolutionError>;

/// The fixed table of named dynamic parameter resolvers.
pub struct Resolvers<H: Host> {
	table: HashMap<&'static str, Resolver<H>>,
}
impl<H: Host> Default for Resolvers<H> {
	fn default() -> Self {
		let mut table = HashMap::new();
		table.insert("value", resolve_value::<H> as Resolver<H>);
		table.insert("attribute", resolve_attribute::<H>);
		Self { table }
	}
}
impl<H: Host> Resolvers<H> {
	/// Adds or replaces a named resolver.
	pub fn register(&mut self, name: &'static str, resolver: Resolver<H>) {
		self.table.insert(name, resolver);
	}

	/// Resolves every dynamic reference in `params` against the live document.
	///
	/// # Errors
	///
	/// The first resolution failure. In that case no value is produced at all.
	pub fn resolve(&self, host: &H, params: &[Value]) -> Result<Vec<Value>, ResolutionError> {
		params.iter().cloned().map(|param| prewalk(param, &mut |node| self.step(host, node))).collect()
	}

	fn step(&self, host: &H, node: Value) -> Result<Step, ResolutionError> {
		match node {
			Value::Array(items) if items.len() == 2 && items[0] == LITERAL_MARKER => Ok(Step::Done(items.into_iter().nth(1).unwrap_or(Value::Null))),
			node => match DynamicParamRef::recognize(node) {
				Ok(dynamic) => {
					let resolver = self.table.get(dynamic.resolver.as_str()).ok_or_else(|| ResolutionError::UnknownResolver(dynamic.resolver.clone()))?;
					resolver(host, &dynamic.args).map(Step::Done)
				}
				Err(node) => Ok(Step::Descend(node)),
			},
		}
	}
}

fn first_match<H: Host>(host: &H, selector: &str) -> Result<H::Element, ResolutionError> {
	host.query_selector_all(None, selector)?.into_iter().next().ok_or_else(|| ResolutionError::NoParamMatch(selector.to_owned()))
}

/// `["dynamic", "value", selector]`: the form value of the first element matching `selector`.
fn resolve_value<H: Host>(host: &H, args: &[Value]) -> Result<Value, ResolutionError> {
	let selector = match args {
		[Value::String(selector)] => selector,
		_ => return Err(ResolutionError::BadArguments { resolver: "value".to_owned(), expected: "a single selector" }),
	};
	let element = first_match(host, selector)?;
	host.value(&element).map(Value::String).ok_or_else(|| ResolutionError::NoValue { selector: selector.clone(), what: "form value" })
}

/// `["dynamic", "attribute", selector, name]`: an attribute of the first element matching `selector`.
fn resolve_attribute<H: Host>(host: &H, args: &[Value]) -> Result<Value, ResolutionError> {
	let (selector, name) = match args {
		[Value::String(selector), Value::String(name)] => (selector, name),
		_ => return Err(ResolutionError::BadArguments { resolver: "attribute".to_owned(), expected: "a selector and an attribute name" }),
	};
	let element = first_match(host, selector)?;
	host.attribute(&element, name).map(Value::String).ok_or_else(|| ResolutionError::NoValue { selector: selector.clone(), what: "such attribute" })
}
