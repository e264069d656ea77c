use crate::{config::AttributeNames, error::ResolutionError, grammar::ActionConfig, host::Host};

/// The server-assigned view scope of an element.
///
/// Ids are opaque and never generated or changed on this side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewIdentity {
	pub id: String,
	pub name: Option<String>,
	pub r#type: Option<String>,
}
impl ViewIdentity {
	/// Reads the view attributes of `element`. [`None`] iff it has no view id.
	pub fn of<H: Host>(host: &H, element: &H::Element, attributes: &AttributeNames) -> Option<Self> {
		host.attribute(element, &attributes.view_id).map(|id| Self {
			id,
			name: host.attribute(element, &attributes.view_name),
			r#type: host.attribute(element, &attributes.view_type),
		})
	}

	/// The selector addressing exactly this view.
	#[must_use]
	pub fn selector(&self, attributes: &AttributeNames) -> String {
		attribute_selector(&attributes.view_id, &self.id)
	}
}

/// `[name="value"]`, with `value` escaped as a CSS string.
#[must_use]
pub fn attribute_selector(name: &str, value: &str) -> String {
	let mut selector = String::with_capacity(name.len() + value.len() + 5);
	selector.push('[');
	selector.push_str(name);
	selector.push_str("=\"");
	for c in value.chars() {
		match c {
			'"' | '\\' => {
				selector.push('\\');
				selector.push(c);
			}
			'\n' => selector.push_str("\\a "),
			c => selector.push(c),
		}
	}
	selector.push_str("\"]");
	selector
}

/// Explicit `target` first, then the element's own view, otherwise an error.
///
/// # Errors
///
/// [`ResolutionError::MissingTarget`] iff neither is available.
pub fn resolve_target(config: &ActionConfig, view: Option<&ViewIdentity>, attributes: &AttributeNames) -> Result<String, ResolutionError> {
	config
		.target
		.clone()
		.or_else(|| view.map(|view| view.selector(attributes)))
		.ok_or(ResolutionError::MissingTarget)
}
