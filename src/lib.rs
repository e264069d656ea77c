#![doc(html_root_url = "https://docs.rs/silta-dom/0.0.1")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Declarative event bindings for server-rendered HTML.
//!
//! Elements carry an events attribute describing, per DOM event type, a list of actions.
//! When the event fires, each action fetches a fragment from its endpoint (or uses none, for local actions),
//! patches it into the document (`swap`, `append`, `prepend`, `remove` or `reset`) and binds whatever the patch created.
//! A push stream can deliver fragments addressed by view id, which are swapped in the same way.
//!
//! The document, network and stream are reached through [`Host`]. [`web::WebHost`] is the browser implementation.

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod config;
pub mod dispatch;
pub mod error;
pub mod grammar;
pub mod host;
pub mod params;
pub mod patch;
pub mod push;
mod runtime;
pub mod scan;
pub mod target;
pub mod web;

pub use config::Config;
pub use grammar::{parse_binding_spec, ActionDescriptor, ActionKind, BindingSpec};
pub use host::Host;
pub use patch::PatchResult;
pub use push::PushState;
pub use runtime::Runtime;
pub use target::ViewIdentity;
