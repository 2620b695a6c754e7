//! Node tree model and builder
//!
//! Templates describe markup as a [`Jsx`] tree: a node name, ordered
//! attributes and a flat list of [`Child`]ren. Trees are built either with
//! the [`h`] element builder or through [`build`], which also instantiates
//! components when handed a [`ComponentRef`].
//!
//! ## Example
//!
//! ```
//! use trellis_pages::jsx::{h, Child};
//!
//! let tree = h("ul")
//! 	.attr("class", "items")
//! 	.child(h("li").child("one"))
//! 	.child(h("li").child(2))
//! 	.build();
//!
//! assert_eq!(tree.node_name, "ul");
//! assert_eq!(tree.children.len(), 2);
//! assert!(matches!(tree.children[0], Child::Node(_)));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use futures::future::LocalBoxFuture;

use crate::component::{Component, ComponentExt};
use crate::context::Context;
use crate::dom::{Event, EventHandler, EventType};

/// Reserved node name for transparent grouping.
pub const FRAGMENT: &str = "fragment";

/// Attribute value
#[derive(Clone)]
pub enum AttrValue {
	/// Literal text
	Text(String),
	/// `false` omits the attribute, `true` renders `"true"`
	Bool(bool),
	/// Rendered in shortest form (`1`, `1.5`)
	Number(f64),
	/// Event handler bound on the next tick
	Handler(EventHandler),
}

impl AttrValue {
	/// Rendered attribute text, `None` when the attribute is omitted
	pub fn as_attribute_text(&self) -> Option<String> {
		match self {
			AttrValue::Text(text) => Some(text.clone()),
			AttrValue::Bool(true) => Some("true".to_string()),
			AttrValue::Bool(false) | AttrValue::Handler(_) => None,
			AttrValue::Number(number) => Some(format_number(*number)),
		}
	}
}

impl fmt::Debug for AttrValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			AttrValue::Text(text) => f.debug_tuple("Text").field(text).finish(),
			AttrValue::Bool(value) => f.debug_tuple("Bool").field(value).finish(),
			AttrValue::Number(number) => f.debug_tuple("Number").field(number).finish(),
			AttrValue::Handler(_) => f.write_str("Handler(..)"),
		}
	}
}

impl From<&str> for AttrValue {
	fn from(value: &str) -> Self {
		AttrValue::Text(value.to_string())
	}
}

impl From<String> for AttrValue {
	fn from(value: String) -> Self {
		AttrValue::Text(value)
	}
}

impl From<&String> for AttrValue {
	fn from(value: &String) -> Self {
		AttrValue::Text(value.clone())
	}
}

impl From<bool> for AttrValue {
	fn from(value: bool) -> Self {
		AttrValue::Bool(value)
	}
}

impl From<EventHandler> for AttrValue {
	fn from(handler: EventHandler) -> Self {
		AttrValue::Handler(handler)
	}
}

macro_rules! numeric_conversions {
	($($ty:ty),*) => {
		$(
			impl From<$ty> for AttrValue {
				fn from(value: $ty) -> Self {
					AttrValue::Number(value as f64)
				}
			}

			impl From<$ty> for Child {
				fn from(value: $ty) -> Self {
					Child::Number(value as f64)
				}
			}

			impl From<$ty> for ChildArg {
				fn from(value: $ty) -> Self {
					ChildArg::Single(Child::Number(value as f64))
				}
			}
		)*
	};
}

numeric_conversions!(i32, i64, u8, u16, u32, u64, usize, f32, f64);

/// Format a number the way markup shows it: integers without a fraction,
/// infinities as `Infinity`.
pub fn format_number(number: f64) -> String {
	if number.is_infinite() {
		return if number > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
	}
	format!("{}", number)
}

/// Child of a [`Jsx`] node
#[derive(Debug, Clone)]
pub enum Child {
	/// Nested element
	Node(Jsx),
	/// Text, escaped unless it is the wrapper of an issued component
	Text(String),
	/// Number rendered as text
	Number(f64),
	/// `false` renders nothing, `true` renders `"true"`
	Bool(bool),
	/// Renders nothing
	Empty,
}

impl From<Jsx> for Child {
	fn from(node: Jsx) -> Self {
		Child::Node(node)
	}
}

impl From<ElementBuilder> for Child {
	fn from(builder: ElementBuilder) -> Self {
		Child::Node(builder.build())
	}
}

impl From<&str> for Child {
	fn from(text: &str) -> Self {
		Child::Text(text.to_string())
	}
}

impl From<String> for Child {
	fn from(text: String) -> Self {
		Child::Text(text)
	}
}

impl From<bool> for Child {
	fn from(value: bool) -> Self {
		Child::Bool(value)
	}
}

impl<T: Into<Child>> From<Option<T>> for Child {
	fn from(value: Option<T>) -> Self {
		value.map_or(Child::Empty, Into::into)
	}
}

/// Child argument to [`build`]: a single child or a list collapsed into its
/// parent
#[derive(Debug, Clone)]
pub enum ChildArg {
	/// One child
	Single(Child),
	/// Children spliced in place
	List(Vec<Child>),
}

impl From<Child> for ChildArg {
	fn from(child: Child) -> Self {
		ChildArg::Single(child)
	}
}

impl From<Jsx> for ChildArg {
	fn from(node: Jsx) -> Self {
		ChildArg::Single(Child::Node(node))
	}
}

impl From<ElementBuilder> for ChildArg {
	fn from(builder: ElementBuilder) -> Self {
		ChildArg::Single(builder.into())
	}
}

impl From<&str> for ChildArg {
	fn from(text: &str) -> Self {
		ChildArg::Single(text.into())
	}
}

impl From<String> for ChildArg {
	fn from(text: String) -> Self {
		ChildArg::Single(Child::Text(text))
	}
}

impl From<Vec<Child>> for ChildArg {
	fn from(children: Vec<Child>) -> Self {
		ChildArg::List(children)
	}
}

/// Collapse one level of nesting
pub fn flatten_children(children: Vec<ChildArg>) -> Vec<Child> {
	let mut flat = Vec::with_capacity(children.len());
	for child in children {
		match child {
			ChildArg::Single(child) => flat.push(child),
			ChildArg::List(list) => flat.extend(list),
		}
	}
	flat
}

/// Node tree
#[derive(Debug, Clone)]
pub struct Jsx {
	/// Tag name (or [`FRAGMENT`])
	pub node_name: String,
	/// Attributes in insertion order, unique by name
	pub attributes: Vec<(String, AttrValue)>,
	/// Flattened children
	pub children: Vec<Child>,
}

impl Jsx {
	/// Node without attributes or children
	pub fn new(node_name: impl Into<String>) -> Self {
		Self {
			node_name: node_name.into(),
			attributes: Vec::new(),
			children: Vec::new(),
		}
	}

	/// Attribute by name
	pub fn attribute(&self, name: &str) -> Option<&AttrValue> {
		self.attributes
			.iter()
			.find(|(key, _)| key == name)
			.map(|(_, value)| value)
	}

	/// Set an attribute, replacing an existing value in place
	pub fn set_attribute(&mut self, name: impl Into<String>, value: AttrValue) {
		let name = name.into();
		match self.attributes.iter_mut().find(|(key, _)| *key == name) {
			Some((_, existing)) => *existing = value,
			None => self.attributes.push((name, value)),
		}
	}
}

/// Value returned by component templates
#[derive(Debug, Clone)]
pub enum RenderOutput {
	/// Markup used verbatim
	Text(String),
	/// Tree lowered by the renderer
	Tree(Jsx),
}

impl Default for RenderOutput {
	fn default() -> Self {
		RenderOutput::Text(String::new())
	}
}

impl From<Jsx> for RenderOutput {
	fn from(tree: Jsx) -> Self {
		RenderOutput::Tree(tree)
	}
}

impl From<ElementBuilder> for RenderOutput {
	fn from(builder: ElementBuilder) -> Self {
		RenderOutput::Tree(builder.build())
	}
}

impl From<String> for RenderOutput {
	fn from(text: String) -> Self {
		RenderOutput::Text(text)
	}
}

impl From<&str> for RenderOutput {
	fn from(text: &str) -> Self {
		RenderOutput::Text(text.to_string())
	}
}

/// Builder behind [`h`]
#[derive(Debug, Clone)]
pub struct ElementBuilder {
	node: Jsx,
}

/// Start building an element
pub fn h(tag: impl Into<String>) -> ElementBuilder {
	ElementBuilder {
		node: Jsx::new(tag),
	}
}

/// Transparent grouping of `children`
pub fn fragment<I, C>(children: I) -> Jsx
where
	I: IntoIterator<Item = C>,
	C: Into<Child>,
{
	h(FRAGMENT).children(children).build()
}

impl ElementBuilder {
	/// Set an attribute
	pub fn attr(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
		self.node.set_attribute(name, value.into());
		self
	}

	/// Bind `handler` to `event_type` (the `on{event}` attribute)
	pub fn on<F>(mut self, event_type: EventType, handler: F) -> Self
	where
		F: Fn(&Event) + 'static,
	{
		self.node.set_attribute(
			format!("on{}", event_type.as_str()),
			AttrValue::Handler(Rc::new(handler)),
		);
		self
	}

	/// Append a child
	pub fn child(mut self, child: impl Into<Child>) -> Self {
		self.node.children.push(child.into());
		self
	}

	/// Append several children
	pub fn children<I, C>(mut self, children: I) -> Self
	where
		I: IntoIterator<Item = C>,
		C: Into<Child>,
	{
		self.node
			.children
			.extend(children.into_iter().map(Into::into));
		self
	}

	/// Finish the node
	pub fn build(self) -> Jsx {
		self.node
	}
}

/// Constructs a component from props and child content
pub type ComponentFactory = Rc<dyn Fn(&Context, Vec<(String, AttrValue)>, Vec<Child>) -> Rc<dyn Component>>;

/// Named component constructor
#[derive(Clone)]
pub struct ComponentRef {
	name: String,
	factory: ComponentFactory,
}

impl ComponentRef {
	/// Wrap a factory
	pub fn new<F>(name: impl Into<String>, factory: F) -> Self
	where
		F: Fn(&Context, Vec<(String, AttrValue)>, Vec<Child>) -> Rc<dyn Component> + 'static,
	{
		Self {
			name: name.into(),
			factory: Rc::new(factory),
		}
	}

	/// Registered name
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Create a component instance
	pub fn instantiate(
		&self,
		context: &Context,
		props: Vec<(String, AttrValue)>,
		children: Vec<Child>,
	) -> Rc<dyn Component> {
		(self.factory)(context, props, children)
	}
}

impl fmt::Debug for ComponentRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ComponentRef")
			.field("name", &self.name)
			.finish_non_exhaustive()
	}
}

/// What [`build`] constructs
#[derive(Debug, Clone)]
pub enum NodeKind {
	/// Plain element
	Tag(String),
	/// Component instantiated through its factory
	Component(ComponentRef),
}

/// Result of [`build`]
pub enum Built {
	/// Element tree
	Tree(Jsx),
	/// Rendered component markup (wrapper included), pending its template
	Pending(LocalBoxFuture<'static, String>),
}

impl Built {
	/// Resolve into a child: trees as nodes, components as their markup
	pub async fn into_child(self) -> Child {
		match self {
			Built::Tree(tree) => Child::Node(tree),
			Built::Pending(markup) => Child::Text(markup.await),
		}
	}
}

impl fmt::Debug for Built {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Built::Tree(tree) => f.debug_tuple("Tree").field(tree).finish(),
			Built::Pending(_) => f.write_str("Pending(..)"),
		}
	}
}

/// Build a node
///
/// Tags become trees with flattened children. Components are instantiated
/// immediately (minting and registering their id) and rendered against the
/// router's current route.
pub fn build(
	context: &Context,
	kind: NodeKind,
	attributes: Vec<(String, AttrValue)>,
	children: Vec<ChildArg>,
) -> Built {
	let children = flatten_children(children);
	match kind {
		NodeKind::Tag(name) => {
			let mut node = Jsx::new(name);
			for (name, value) in attributes {
				node.set_attribute(name, value);
			}
			node.children = children;
			Built::Tree(node)
		}
		NodeKind::Component(component) => {
			let instance = component.instantiate(context, attributes, children);
			let route = context.router().current_route();
			Built::Pending(instance.render(route, true))
		}
	}
}

/// Component lookup by name
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
	components: HashMap<String, ComponentRef>,
}

impl ComponentRegistry {
	/// Empty registry
	pub fn new() -> Self {
		Self::default()
	}

	/// Register `component` under its name, replacing a previous entry
	pub fn register(&mut self, component: ComponentRef) -> &mut Self {
		self.components
			.insert(component.name().to_string(), component);
		self
	}

	/// Registered component
	pub fn get(&self, name: &str) -> Option<&ComponentRef> {
		self.components.get(name)
	}

	/// Node kind for `name`: the registered component, or a tag
	pub fn resolve(&self, name: &str) -> NodeKind {
		match self.get(name) {
			Some(component) => NodeKind::Component(component.clone()),
			None => NodeKind::Tag(name.to_string()),
		}
	}

	/// [`build`] by name
	pub fn build_named(
		&self,
		context: &Context,
		name: &str,
		attributes: Vec<(String, AttrValue)>,
		children: Vec<ChildArg>,
	) -> Built {
		build(context, self.resolve(name), attributes, children)
	}
}
