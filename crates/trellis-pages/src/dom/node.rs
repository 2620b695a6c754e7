//! Tree nodes
//!
//! A [`Node`] is a reference-counted handle; clones refer to the same node
//! and equality is identity. Parents are held weakly so detached subtrees are
//! freed once nothing references them.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use super::DomError;
use super::event::{Event, EventHandler, EventType};
use super::observer::{self, ObserverInner};
use super::parser;

/// Kind of a [`Node`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
	/// Root of a document tree
	Document,
	/// Element with a tag name and attributes
	Element,
	/// Character data
	Text,
	/// `<!-- ... -->`
	Comment,
}

/// Handle returned by [`Node::add_event_listener`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub(crate) type NavigationHook = Rc<dyn Fn(&str)>;

pub(crate) struct NodeData {
	node_type: NodeType,
	name: String,
	data: RefCell<String>,
	parent: RefCell<Weak<NodeData>>,
	children: RefCell<Vec<Node>>,
	attributes: RefCell<Vec<(String, String)>>,
	listeners: RefCell<Vec<(ListenerId, EventType, EventHandler)>>,
	next_listener: Cell<u64>,
	handlers: RefCell<HashMap<EventType, EventHandler>>,
	pub(crate) observers: RefCell<Vec<Weak<ObserverInner>>>,
	offset_top: Cell<i64>,
	navigation: RefCell<Option<NavigationHook>>,
}

/// Node in a document tree
#[derive(Clone)]
pub struct Node(pub(crate) Rc<NodeData>);

impl PartialEq for Node {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}

impl Eq for Node {}

/// Whether `name` is acceptable as an element tag name.
pub fn is_valid_element_name(name: &str) -> bool {
	let mut chars = name.chars();
	matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
		&& chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == ':' || c == '_')
}

/// Whether `name` is acceptable as an attribute name.
pub fn is_valid_attribute_name(name: &str) -> bool {
	!name.is_empty()
		&& !name
			.chars()
			.any(|c| c.is_whitespace() || c.is_control() || matches!(c, '"' | '\'' | '>' | '/' | '=' | '<'))
}

impl Node {
	fn with(node_type: NodeType, name: String, data: String) -> Self {
		Node(Rc::new(NodeData {
			node_type,
			name,
			data: RefCell::new(data),
			parent: RefCell::new(Weak::new()),
			children: RefCell::new(Vec::new()),
			attributes: RefCell::new(Vec::new()),
			listeners: RefCell::new(Vec::new()),
			next_listener: Cell::new(0),
			handlers: RefCell::new(HashMap::new()),
			observers: RefCell::new(Vec::new()),
			offset_top: Cell::new(0),
			navigation: RefCell::new(None),
		}))
	}

	/// New detached element
	///
	/// The tag name is lowercased.
	pub fn element(tag: &str) -> Result<Self, DomError> {
		if !is_valid_element_name(tag) {
			return Err(DomError::InvalidName(tag.to_string()));
		}
		Ok(Self::element_unchecked(tag))
	}

	pub(crate) fn element_unchecked(tag: &str) -> Self {
		Self::with(NodeType::Element, tag.to_ascii_lowercase(), String::new())
	}

	/// New detached text node
	pub fn text(data: impl Into<String>) -> Self {
		Self::with(NodeType::Text, "#text".to_string(), data.into())
	}

	/// New detached comment node
	pub fn comment(data: impl Into<String>) -> Self {
		Self::with(NodeType::Comment, "#comment".to_string(), data.into())
	}

	pub(crate) fn document_root() -> Self {
		Self::with(NodeType::Document, "#document".to_string(), String::new())
	}

	/// Kind of node
	pub fn node_type(&self) -> NodeType {
		self.0.node_type
	}

	/// Whether this is an element
	pub fn is_element(&self) -> bool {
		self.0.node_type == NodeType::Element
	}

	/// Lowercase tag name for elements, `#text`/`#comment`/`#document` otherwise
	pub fn tag_name(&self) -> &str {
		&self.0.name
	}

	/// Character data of a text or comment node
	pub fn data(&self) -> String {
		self.0.data.borrow().clone()
	}

	/// Replace the character data of a text or comment node
	pub fn set_data(&self, data: impl Into<String>) {
		*self.0.data.borrow_mut() = data.into();
	}

	/// Concatenated text of this node and its descendants
	pub fn text_content(&self) -> String {
		match self.node_type() {
			NodeType::Text => self.data(),
			NodeType::Comment => String::new(),
			_ => self
				.child_nodes()
				.iter()
				.map(Node::text_content)
				.collect(),
		}
	}

	/// Replace all children with a single text node
	pub fn set_text_content(&self, text: &str) {
		let nodes = if text.is_empty() {
			Vec::new()
		} else {
			vec![Node::text(text)]
		};
		self.replace_all_children(nodes);
	}

	/// Parent node
	pub fn parent(&self) -> Option<Node> {
		self.0.parent.borrow().upgrade().map(Node)
	}

	/// Parent node when it is an element
	pub fn parent_element(&self) -> Option<Node> {
		self.parent().filter(Node::is_element)
	}

	/// All child nodes in order
	pub fn child_nodes(&self) -> Vec<Node> {
		self.0.children.borrow().clone()
	}

	/// Element children in order
	pub fn children(&self) -> Vec<Node> {
		self.0
			.children
			.borrow()
			.iter()
			.filter(|child| child.is_element())
			.cloned()
			.collect()
	}

	/// Number of element children
	pub fn child_element_count(&self) -> usize {
		self.0
			.children
			.borrow()
			.iter()
			.filter(|child| child.is_element())
			.count()
	}

	/// First child node
	pub fn first_child(&self) -> Option<Node> {
		self.0.children.borrow().first().cloned()
	}

	/// Whether `other` is this node or one of its descendants
	pub fn contains(&self, other: &Node) -> bool {
		let mut current = Some(other.clone());
		while let Some(node) = current {
			if node == *self {
				return true;
			}
			current = node.parent();
		}
		false
	}

	/// Topmost ancestor (the node itself when detached)
	pub fn root(&self) -> Node {
		let mut node = self.clone();
		while let Some(parent) = node.parent() {
			node = parent;
		}
		node
	}

	/// Whether the node is attached to a document
	pub fn is_connected(&self) -> bool {
		self.root().node_type() == NodeType::Document
	}

	fn check_insertable(&self, child: &Node) -> Result<(), DomError> {
		if matches!(self.node_type(), NodeType::Text | NodeType::Comment)
			|| child.node_type() == NodeType::Document
			|| child.contains(self)
		{
			return Err(DomError::HierarchyRequest);
		}
		Ok(())
	}

	fn detach(child: &Node) {
		if let Some(parent) = child.parent() {
			parent
				.0
				.children
				.borrow_mut()
				.retain(|node| node != child);
			*child.0.parent.borrow_mut() = Weak::new();
			observer::enqueue(&parent, Vec::new(), vec![child.clone()]);
		}
	}

	/// Append `child`, moving it out of its current parent first
	pub fn append_child(&self, child: &Node) -> Result<(), DomError> {
		self.insert_before(child, None)
	}

	/// Insert `child` before `reference`, or at the end when `reference` is
	/// `None`
	pub fn insert_before(&self, child: &Node, reference: Option<&Node>) -> Result<(), DomError> {
		self.check_insertable(child)?;
		if let Some(reference) = reference
			&& reference.parent().as_ref() != Some(self)
		{
			return Err(DomError::NotFound);
		}

		Self::detach(child);
		*child.0.parent.borrow_mut() = Rc::downgrade(&self.0);
		{
			let mut children = self.0.children.borrow_mut();
			let position = reference
				.and_then(|reference| children.iter().position(|node| node == reference))
				.unwrap_or(children.len());
			children.insert(position, child.clone());
		}
		observer::enqueue(self, vec![child.clone()], Vec::new());
		Ok(())
	}

	/// Remove `child` from this node
	pub fn remove_child(&self, child: &Node) -> Result<Node, DomError> {
		if child.parent().as_ref() != Some(self) {
			return Err(DomError::NotFound);
		}
		Self::detach(child);
		Ok(child.clone())
	}

	/// Detach this node from its parent, if any
	pub fn remove(&self) {
		Self::detach(self);
	}

	pub(crate) fn replace_all_children(&self, nodes: Vec<Node>) {
		let removed = std::mem::take(&mut *self.0.children.borrow_mut());
		for node in &removed {
			*node.0.parent.borrow_mut() = Weak::new();
		}
		for node in &nodes {
			Self::detach(node);
			*node.0.parent.borrow_mut() = Rc::downgrade(&self.0);
		}
		*self.0.children.borrow_mut() = nodes.clone();

		if !removed.is_empty() || !nodes.is_empty() {
			observer::enqueue(self, nodes, removed);
		}
	}

	pub(crate) fn push_parsed_child(&self, child: Node) {
		*child.0.parent.borrow_mut() = Rc::downgrade(&self.0);
		self.0.children.borrow_mut().push(child);
	}

	/// Attribute value
	pub fn attribute(&self, name: &str) -> Option<String> {
		let name = name.to_ascii_lowercase();
		self.0
			.attributes
			.borrow()
			.iter()
			.find(|(key, _)| *key == name)
			.map(|(_, value)| value.clone())
	}

	/// Whether the attribute is present
	pub fn has_attribute(&self, name: &str) -> bool {
		self.attribute(name).is_some()
	}

	/// Set an attribute, keeping its position when it already exists
	pub fn set_attribute(&self, name: &str, value: &str) -> Result<(), DomError> {
		if !self.is_element() {
			return Err(DomError::NotAnElement);
		}
		if !is_valid_attribute_name(name) {
			return Err(DomError::InvalidName(name.to_string()));
		}
		self.set_attribute_unchecked(&name.to_ascii_lowercase(), value);
		Ok(())
	}

	pub(crate) fn set_attribute_unchecked(&self, name: &str, value: &str) {
		let mut attributes = self.0.attributes.borrow_mut();
		match attributes.iter_mut().find(|(key, _)| key == name) {
			Some((_, existing)) => *existing = value.to_string(),
			None => attributes.push((name.to_string(), value.to_string())),
		}
	}

	/// Remove an attribute; returns whether it was present
	pub fn remove_attribute(&self, name: &str) -> bool {
		let name = name.to_ascii_lowercase();
		let mut attributes = self.0.attributes.borrow_mut();
		let before = attributes.len();
		attributes.retain(|(key, _)| *key != name);
		attributes.len() != before
	}

	/// Attributes in document order
	pub fn attributes(&self) -> Vec<(String, String)> {
		self.0.attributes.borrow().clone()
	}

	/// `id` attribute
	pub fn id(&self) -> Option<String> {
		self.attribute("id")
	}

	/// `value` of a form control
	pub fn value(&self) -> Option<String> {
		self.attribute("value")
	}

	/// Set the `value` of a form control
	pub fn set_value(&self, value: &str) -> Result<(), DomError> {
		self.set_attribute("value", value)
	}

	/// Markup of the children
	pub fn inner_html(&self) -> String {
		parser::serialize_children(self)
	}

	/// Markup of the node itself
	pub fn outer_html(&self) -> String {
		parser::serialize(self)
	}

	/// Replace the children with the parsed `html`
	pub fn set_inner_html(&self, html: &str) -> Result<(), DomError> {
		if !matches!(self.node_type(), NodeType::Element | NodeType::Document) {
			return Err(DomError::NotAnElement);
		}
		let nodes = parser::parse_fragment(html)?;
		self.replace_all_children(nodes);
		Ok(())
	}

	/// Descendant elements in document order
	pub fn descendants(&self) -> Vec<Node> {
		let mut found = Vec::new();
		self.collect_descendants(&mut found);
		found
	}

	fn collect_descendants(&self, found: &mut Vec<Node>) {
		for child in self.0.children.borrow().iter() {
			if child.is_element() {
				found.push(child.clone());
				child.collect_descendants(found);
			}
		}
	}

	/// First descendant element with the given `id`
	pub fn get_element_by_id(&self, id: &str) -> Option<Node> {
		self.descendants()
			.into_iter()
			.find(|node| node.id().as_deref() == Some(id))
	}

	/// Descendant elements with the given tag name
	pub fn elements_by_tag_name(&self, tag: &str) -> Vec<Node> {
		let tag = tag.to_ascii_lowercase();
		self.descendants()
			.into_iter()
			.filter(|node| node.tag_name() == tag)
			.collect()
	}

	/// Descendant elements carrying `name`, optionally with exactly `value`
	pub fn find_by_attribute(&self, name: &str, value: Option<&str>) -> Vec<Node> {
		self.descendants()
			.into_iter()
			.filter(|node| match (node.attribute(name), value) {
				(Some(actual), Some(expected)) => actual == expected,
				(Some(_), None) => true,
				(None, _) => false,
			})
			.collect()
	}

	/// Register a listener; several listeners may share an event type
	pub fn add_event_listener(&self, event_type: EventType, handler: EventHandler) -> ListenerId {
		let id = ListenerId(self.0.next_listener.get());
		self.0.next_listener.set(id.0 + 1);
		self.0
			.listeners
			.borrow_mut()
			.push((id, event_type, handler));
		id
	}

	/// Remove a listener; returns whether it existed
	pub fn remove_event_listener(&self, id: ListenerId) -> bool {
		let mut listeners = self.0.listeners.borrow_mut();
		let before = listeners.len();
		listeners.retain(|(listener, _, _)| *listener != id);
		listeners.len() != before
	}

	/// Number of listeners registered for `event_type`
	pub fn listener_count(&self, event_type: EventType) -> usize {
		self.0
			.listeners
			.borrow()
			.iter()
			.filter(|(_, kind, _)| *kind == event_type)
			.count()
	}

	/// Set or clear the handler slot for `event_type` (the `onclick` property
	/// equivalent); a new handler replaces the previous one
	pub fn set_event_handler(&self, event_type: EventType, handler: Option<EventHandler>) {
		let mut handlers = self.0.handlers.borrow_mut();
		match handler {
			Some(handler) => {
				handlers.insert(event_type, handler);
			}
			None => {
				handlers.remove(&event_type);
			}
		}
	}

	/// Handler slot for `event_type`
	pub fn event_handler(&self, event_type: EventType) -> Option<EventHandler> {
		self.0.handlers.borrow().get(&event_type).cloned()
	}

	/// Dispatch `event` at this node, bubbling to ancestors
	///
	/// Returns `false` when a handler called `prevent_default`.
	pub fn dispatch_event(&self, event: &Event) -> bool {
		event.set_target(self);

		let mut path = vec![self.clone()];
		if event.bubbles() {
			let mut current = self.parent();
			while let Some(node) = current {
				current = node.parent();
				path.push(node);
			}
		}

		for node in &path {
			event.set_current_target(Some(node));

			if let Some(handler) = node.event_handler(event.event_type()) {
				handler(event);
			}
			let listeners: Vec<EventHandler> = node
				.0
				.listeners
				.borrow()
				.iter()
				.filter(|(_, kind, _)| *kind == event.event_type())
				.map(|(_, _, handler)| handler.clone())
				.collect();
			for listener in listeners {
				listener(event);
			}

			if event.propagation_stopped() {
				break;
			}
		}

		event.set_current_target(None);
		!event.default_prevented()
	}

	/// Simulate a click, following an enclosing link when not prevented
	pub fn click(&self) {
		let event = Event::new(EventType::Click);
		if !self.dispatch_event(&event) {
			return;
		}

		let mut current = Some(self.clone());
		while let Some(node) = current {
			if node.tag_name() == "a"
				&& let Some(href) = node.attribute("href")
			{
				let hook = node.root().0.navigation.borrow().clone();
				if let Some(hook) = hook {
					hook(&href);
				}
				return;
			}
			current = node.parent();
		}
	}

	pub(crate) fn set_navigation_hook(&self, hook: NavigationHook) {
		*self.0.navigation.borrow_mut() = Some(hook);
	}

	/// Distance from the top of the document, in pixels
	///
	/// The document model performs no layout; hosts (and tests) supply it.
	pub fn offset_top(&self) -> i64 {
		self.0.offset_top.get()
	}

	/// Record the layout offset reported by the host
	pub fn set_offset_top(&self, offset: i64) {
		self.0.offset_top.set(offset);
	}
}

impl fmt::Debug for Node {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.node_type() {
			NodeType::Element => f
				.debug_struct("Element")
				.field("tag", &self.tag_name())
				.field("id", &self.id())
				.finish(),
			_ => f
				.debug_struct("Node")
				.field("name", &self.tag_name())
				.field("data", &self.0.data.borrow())
				.finish(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn div() -> Node {
		Node::element("div").unwrap()
	}

	#[rstest]
	fn test_element_lowercases_tag() {
		assert_eq!(Node::element("DIV").unwrap().tag_name(), "div");
	}

	#[rstest]
	#[case("")]
	#[case("1abc")]
	#[case("a b")]
	#[case("<p")]
	fn test_invalid_element_name(#[case] name: &str) {
		assert!(matches!(Node::element(name), Err(DomError::InvalidName(_))));
	}

	#[rstest]
	fn test_append_moves_node() {
		let first = div();
		let second = div();
		let child = Node::element("span").unwrap();

		first.append_child(&child).unwrap();
		second.append_child(&child).unwrap();

		assert!(first.child_nodes().is_empty());
		assert_eq!(child.parent(), Some(second));
	}

	#[rstest]
	fn test_append_ancestor_is_rejected() {
		let parent = div();
		let child = div();
		parent.append_child(&child).unwrap();
		assert_eq!(child.append_child(&parent), Err(DomError::HierarchyRequest));
	}

	#[rstest]
	fn test_insert_before() {
		let parent = div();
		let a = Node::text("a");
		let b = Node::text("b");
		parent.append_child(&b).unwrap();
		parent.insert_before(&a, Some(&b)).unwrap();
		assert_eq!(parent.text_content(), "ab");
	}

	#[rstest]
	fn test_attributes_keep_order() {
		let node = div();
		node.set_attribute("id", "x").unwrap();
		node.set_attribute("class", "c").unwrap();
		node.set_attribute("id", "y").unwrap();
		assert_eq!(
			node.attributes(),
			vec![
				("id".to_string(), "y".to_string()),
				("class".to_string(), "c".to_string())
			]
		);
		assert!(node.remove_attribute("ID"));
		assert!(!node.has_attribute("id"));
	}

	#[rstest]
	fn test_get_element_by_id_searches_descendants() {
		let root = div();
		root.set_inner_html(r#"<section><p id="target">x</p></section>"#)
			.unwrap();
		let found = root.get_element_by_id("target").unwrap();
		assert_eq!(found.tag_name(), "p");
		assert!(root.get_element_by_id("missing").is_none());
	}

	#[rstest]
	fn test_dispatch_bubbles_and_prevents_default() {
		let parent = div();
		let child = Node::element("button").unwrap();
		parent.append_child(&child).unwrap();
		let log = Rc::new(RefCell::new(Vec::new()));

		let log_parent = log.clone();
		parent.add_event_listener(
			EventType::Click,
			Rc::new(move |event: &Event| {
				log_parent.borrow_mut().push("parent");
				event.prevent_default();
			}),
		);
		let log_child = log.clone();
		child.set_event_handler(
			EventType::Click,
			Some(Rc::new(move |_: &Event| log_child.borrow_mut().push("child"))),
		);

		let proceed = child.dispatch_event(&Event::new(EventType::Click));

		assert!(!proceed);
		assert_eq!(*log.borrow(), vec!["child", "parent"]);
	}

	#[rstest]
	fn test_handler_slot_replaces_previous() {
		let node = div();
		let count = Rc::new(Cell::new(0));
		for _ in 0..3 {
			let count = count.clone();
			node.set_event_handler(
				EventType::Click,
				Some(Rc::new(move |_: &Event| count.set(count.get() + 1))),
			);
		}
		node.click();
		assert_eq!(count.get(), 1);
	}

	#[rstest]
	fn test_stop_propagation() {
		let parent = div();
		let child = div();
		parent.append_child(&child).unwrap();
		let reached = Rc::new(Cell::new(false));

		child.add_event_listener(EventType::Input, Rc::new(|event: &Event| event.stop_propagation()));
		let reached_clone = reached.clone();
		parent.add_event_listener(
			EventType::Input,
			Rc::new(move |_: &Event| reached_clone.set(true)),
		);

		child.dispatch_event(&Event::new(EventType::Input));
		assert!(!reached.get());
	}

	#[rstest]
	fn test_remove_event_listener() {
		let node = div();
		let id = node.add_event_listener(EventType::Click, Rc::new(|_: &Event| {}));
		assert_eq!(node.listener_count(EventType::Click), 1);
		assert!(node.remove_event_listener(id));
		assert_eq!(node.listener_count(EventType::Click), 0);
	}

	#[rstest]
	fn test_find_by_attribute() {
		let root = div();
		root.set_inner_html(r#"<a routed="true"></a><a></a><a routed="false"></a>"#)
			.unwrap();
		assert_eq!(root.find_by_attribute("routed", None).len(), 2);
		assert_eq!(root.find_by_attribute("routed", Some("true")).len(), 1);
	}
}
