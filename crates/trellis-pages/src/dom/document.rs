//! Document
//!
//! A [`Document`] owns a tree rooted at a document node with the usual
//! `<html><head><title></title></head><body></body></html>` skeleton.

use std::fmt;

use super::DomError;
use super::node::Node;

/// Handle to a document; clones share the tree
#[derive(Clone)]
pub struct Document {
	root: Node,
}

impl Default for Document {
	fn default() -> Self {
		Self::new()
	}
}

impl Document {
	/// Create a document with an empty head and body
	pub fn new() -> Self {
		let root = Node::document_root();
		let html = Node::element_unchecked("html");
		let head = Node::element_unchecked("head");
		let title = Node::element_unchecked("title");
		let body = Node::element_unchecked("body");

		head.push_parsed_child(title);
		html.push_parsed_child(head);
		html.push_parsed_child(body);
		root.push_parsed_child(html);

		Self { root }
	}

	/// Create a document whose body holds `body_html`
	pub fn with_body(body_html: &str) -> Result<Self, DomError> {
		let document = Self::new();
		document.body().set_inner_html(body_html)?;
		Ok(document)
	}

	/// The document node
	pub fn root(&self) -> &Node {
		&self.root
	}

	/// `<html>`
	pub fn document_element(&self) -> Node {
		self.root
			.children()
			.into_iter()
			.next()
			.unwrap_or_else(|| self.root.clone())
	}

	fn section(&self, tag: &str) -> Node {
		let html = self.document_element();
		if let Some(found) = html.children().into_iter().find(|node| node.tag_name() == tag) {
			return found;
		}
		let created = Node::element_unchecked(tag);
		let _ = html.append_child(&created);
		created
	}

	/// `<head>`, created when missing
	pub fn head(&self) -> Node {
		self.section("head")
	}

	/// `<body>`, created when missing
	pub fn body(&self) -> Node {
		self.section("body")
	}

	/// Create a detached element owned by nothing until appended
	pub fn create_element(&self, tag: &str) -> Result<Node, DomError> {
		Node::element(tag)
	}

	/// Create a detached text node
	pub fn create_text_node(&self, data: &str) -> Node {
		Node::text(data)
	}

	/// Element with the given id anywhere in the document
	pub fn get_element_by_id(&self, id: &str) -> Option<Node> {
		self.root.get_element_by_id(id)
	}

	/// Elements with the given tag name, in document order
	pub fn elements_by_tag_name(&self, tag: &str) -> Vec<Node> {
		self.root.elements_by_tag_name(tag)
	}

	/// Elements carrying `name`, optionally with exactly `value`
	pub fn find_by_attribute(&self, name: &str, value: Option<&str>) -> Vec<Node> {
		self.root.find_by_attribute(name, value)
	}

	/// `<meta name="...">` in the head
	pub fn meta(&self, name: &str) -> Option<Node> {
		self.head()
			.find_by_attribute("name", Some(name))
			.into_iter()
			.find(|node| node.tag_name() == "meta")
	}

	/// Text of `<title>`
	pub fn title(&self) -> String {
		self.head()
			.elements_by_tag_name("title")
			.first()
			.map(Node::text_content)
			.unwrap_or_default()
	}

	/// Replace the text of `<title>`, creating it when missing
	pub fn set_title(&self, title: &str) {
		let head = self.head();
		let element = match head.elements_by_tag_name("title").into_iter().next() {
			Some(element) => element,
			None => {
				let element = Node::element_unchecked("title");
				let _ = head.append_child(&element);
				element
			}
		};
		element.set_text_content(title);
	}

	/// Serialized document
	pub fn to_html(&self) -> String {
		self.root.outer_html()
	}
}

impl fmt::Debug for Document {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Document")
			.field("title", &self.title())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_skeleton() {
		let document = Document::new();
		assert_eq!(
			document.to_html(),
			"<html><head><title></title></head><body></body></html>"
		);
		assert!(document.body().is_connected());
	}

	#[rstest]
	fn test_title() {
		let document = Document::new();
		document.set_title("Home | Site");
		assert_eq!(document.title(), "Home | Site");
	}

	#[rstest]
	fn test_get_element_by_id_only_sees_attached_nodes() {
		let document = Document::with_body(r#"<div id="app-root"></div>"#).unwrap();
		assert!(document.get_element_by_id("app-root").is_some());

		let detached = document.create_element("p").unwrap();
		detached.set_attribute("id", "floating").unwrap();
		assert!(document.get_element_by_id("floating").is_none());
	}

	#[rstest]
	fn test_meta_lookup() {
		let document = Document::new();
		document
			.head()
			.set_inner_html(r#"<title>t</title><meta name="description" content="d">"#)
			.unwrap();
		let meta = document.meta("description").unwrap();
		assert_eq!(meta.attribute("content").as_deref(), Some("d"));
	}
}
