use serde::Deserialize;

/// Names of the attributes that make up the declarative contract with the server-side renderer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AttributeNames {
	pub events: String,
	pub view_id: String,
	pub view_name: String,
	pub view_type: String,
}
impl Default for AttributeNames {
	fn default() -> Self {
		Self {
			events: "silta-events".to_owned(),
			view_id: "silta-view-id".to_owned(),
			view_name: "silta-view-name".to_owned(),
			view_type: "silta-view-type".to_owned(),
		}
	}
}

/// Runtime configuration.
///
/// Every field has a default matching the server renderer's conventions, so an empty JSON object is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
	pub attributes: AttributeNames,
	/// Query parameter carrying the JSON-encoded positional parameter list.
	pub params_key: String,
	/// Request header carrying the client instance id.
	pub client_id_header: String,
	/// Selector of the root(s) scanned by [`Runtime::start`](`crate::Runtime::start`).
	pub root_selector: String,
	/// Push stream location. [`None`] disables the push channel.
	pub stream_url: Option<String>,
	pub heartbeat: String,
	/// Terminates the push stream, either as the bare payload or as `{"msg": <end_message>}`.
	pub end_message: String,
	/// Event types whose default action is cancelled before the configured actions run.
	pub prevent_default_on: Vec<String>,
}
impl Default for Config {
	fn default() -> Self {
		Self {
			attributes: AttributeNames::default(),
			params_key: "__params".to_owned(),
			client_id_header: "client-id".to_owned(),
			root_selector: "body".to_owned(),
			stream_url: Some("/stream".to_owned()),
			heartbeat: "ping".to_owned(),
			end_message: "end".to_owned(),
			prevent_default_on: vec!["click".to_owned(), "submit".to_owned()],
		}
	}
}
impl Config {
	/// Reads a (possibly partial) configuration from JSON. Missing fields keep their defaults.
	///
	/// # Errors
	///
	/// Iff `json` is not a valid configuration object.
	pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
		serde_json::from_str(json)
	}

	#[must_use]
	pub fn prevents_default(&self, event_type: &str) -> bool {
		self.prevent_default_on.iter().any(|t| t == event_type)
	}
}
