//! In-memory document model
//!
//! The framework renders into, diffs and observes this model. It covers the
//! part of the browser DOM the framework relies on:
//!
//! - [`Node`]: elements, text and comments with ordered attributes,
//!   `inner_html`/`outer_html`, id/tag/attribute lookup, listeners, handler
//!   slots and event dispatch with bubbling
//! - [`Document`]: the `<html>`/`<head>`/`<body>` tree
//! - [`MutationObserver`]: child-list observation with records delivered on
//!   the next scheduler tick
//! - [`Window`]: location, session history, `popstate` and scrolling
//!
//! A browser host keeps this model and the real DOM in step; nothing in the
//! framework talks to the host directly.

pub mod document;
pub mod event;
pub mod node;
pub mod observer;
pub mod parser;
pub mod window;

pub use document::Document;
pub use event::{Event, EventHandler, EventType, UnknownEventType};
pub use node::{ListenerId, Node, NodeType};
pub use observer::{MutationObserver, MutationRecord};
pub use window::{HistoryEntry, Window};

use thiserror::Error;

/// Errors raised by document operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
	/// Tag or attribute name is not acceptable.
	#[error("invalid name '{0}'")]
	InvalidName(String),
	/// The node cannot be inserted at the requested position.
	#[error("node cannot be inserted at this position")]
	HierarchyRequest,
	/// The reference node is not a child of this node.
	#[error("node is not a child of this node")]
	NotFound,
	/// The operation only applies to elements.
	#[error("operation requires an element")]
	NotAnElement,
	/// Markup nests deeper than the parser accepts.
	#[error("markup nests deeper than {limit} elements")]
	NestingTooDeep {
		/// Maximum accepted depth
		limit: usize,
	},
	/// A URL could not be parsed.
	#[error("invalid url: {0}")]
	InvalidUrl(#[from] url::ParseError),
	/// History entries must stay on the current origin.
	#[error("history entries must stay on origin {origin}, got {url}")]
	CrossOrigin {
		/// Current origin
		origin: String,
		/// Rejected URL
		url: String,
	},
}
