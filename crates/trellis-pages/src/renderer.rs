//! Tree renderer
//!
//! [`JsxRenderer`] lowers a [`Jsx`] tree into detached document nodes and
//! serializes them. Event-handler attributes never reach the markup: the
//! element is given an id and the handler is bound to the live element with
//! that id on the next tick.

use crate::context::{Context, ID_PREFIX};
use crate::dom::{DomError, EventHandler, EventType, Node, parser};
use crate::jsx::{AttrValue, Child, FRAGMENT, Jsx, RenderOutput, format_number};

/// Opening of the wrapper every rendered component emits.
pub const WRAPPER_PREFIX: &str = "<div id=\"tr-";

/// Renders templates to markup within a [`Context`]
#[derive(Debug, Clone)]
pub struct JsxRenderer {
	context: Context,
}

impl JsxRenderer {
	/// Renderer for `context`
	pub fn new(context: &Context) -> Self {
		Self {
			context: context.clone(),
		}
	}

	/// Markup for a template result
	///
	/// Text output is used verbatim; trees are lowered and serialized with
	/// every `<fragment>`/`</fragment>` tag removed.
	pub fn render_to_html(&self, output: &RenderOutput) -> Result<String, DomError> {
		match output {
			RenderOutput::Text(markup) => Ok(markup.clone()),
			RenderOutput::Tree(tree) => self.render_jsx(tree),
		}
	}

	/// Markup for a tree
	pub fn render_jsx(&self, tree: &Jsx) -> Result<String, DomError> {
		let root = self.lower(tree)?;
		Ok(strip_fragments(&root.outer_html()))
	}

	fn lower(&self, tree: &Jsx) -> Result<Node, DomError> {
		let element = Node::element(&tree.node_name)?;
		let mut handlers: Vec<(EventType, EventHandler)> = Vec::new();

		for (name, value) in &tree.attributes {
			if let Some(event_type) = EventType::from_attribute(name) {
				match value {
					AttrValue::Handler(handler) => handlers.push((event_type, handler.clone())),
					_ => crate::warn_log!("Dropping non-handler value for event attribute '{}'", name),
				}
				continue;
			}
			if let AttrValue::Handler(_) = value {
				crate::warn_log!("'{}' is not an event attribute; handler ignored", name);
				continue;
			}
			if let Some(text) = value.as_attribute_text() {
				element.set_attribute(name, &text)?;
			}
		}

		if !handlers.is_empty() {
			let id = match element.id() {
				Some(id) => id,
				None => {
					let id = self.context.mint_id();
					element.set_attribute("id", &id)?;
					id
				}
			};
			self.bind_handlers_next_tick(id, handlers);
		}

		for child in &tree.children {
			self.append_child(&element, child)?;
		}
		Ok(element)
	}

	fn append_child(&self, element: &Node, child: &Child) -> Result<(), DomError> {
		match child {
			Child::Empty | Child::Bool(false) => Ok(()),
			Child::Bool(true) => element.append_child(&Node::text("true")),
			Child::Number(number) => element.append_child(&Node::text(format_number(*number))),
			Child::Text(text) => {
				if self.is_trusted_markup(text) {
					for node in parser::parse_fragment(text)? {
						element.append_child(&node)?;
					}
					Ok(())
				} else {
					element.append_child(&Node::text(text.as_str()))
				}
			}
			Child::Node(tree) => element.append_child(&self.lower(tree)?),
		}
	}

	/// Whether `text` is the wrapper of a component issued by this context
	pub fn is_trusted_markup(&self, text: &str) -> bool {
		let Some(rest) = text.trim_start().strip_prefix(WRAPPER_PREFIX) else {
			return false;
		};
		let Some(end) = rest.find('"') else {
			return false;
		};
		self.context
			.is_issued(&format!("{}{}", ID_PREFIX, &rest[..end]))
	}

	fn bind_handlers_next_tick(&self, id: String, handlers: Vec<(EventType, EventHandler)>) {
		let document = self.context.document();
		self.context.asap(move || {
			let Some(element) = document.get_element_by_id(&id) else {
				crate::debug_log!("Element '{}' is gone; skipping handler binding", id);
				return;
			};
			for (event_type, handler) in handlers {
				element.set_event_handler(event_type, Some(handler));
			}
		});
	}
}

/// Remove every literal `<fragment>` and `</fragment>`
pub fn strip_fragments(markup: &str) -> String {
	markup
		.replace(&format!("<{}>", FRAGMENT), "")
		.replace(&format!("</{}>", FRAGMENT), "")
}
