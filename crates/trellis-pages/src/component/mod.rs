//! Components
//!
//! A component supplies a [`Component::template`] and embeds a
//! [`ComponentBase`] holding its identity and per-instance state. Everything
//! else (rendering with a wrapper, in-place re-rendering, keyed ids,
//! references, disconnect detection) comes from [`ComponentExt`], which every
//! component gets for free.
//!
//! # Example
//!
//! ```
//! use async_trait::async_trait;
//! use trellis_pages::component::{Component, ComponentBase};
//! use trellis_pages::jsx::{RenderOutput, h};
//! use trellis_pages::router::Route;
//!
//! struct Greeting {
//! 	base: ComponentBase,
//! 	name: String,
//! }
//!
//! #[async_trait(?Send)]
//! impl Component for Greeting {
//! 	fn base(&self) -> &ComponentBase {
//! 		&self.base
//! 	}
//!
//! 	async fn template(&self, _route: Option<&Route>) -> RenderOutput {
//! 		h("p").child(format!("Hello, {}!", self.name)).into()
//! 	}
//! }
//! ```

mod raw_html;
mod state;

pub use raw_html::RawHtml;
pub use state::{StateField, StoreKind};

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::LocalBoxFuture;
use serde_json::Value;
use trellis_core::{Observable, Store, SubscriptionId};
use uuid::Uuid;

use crate::context::Context;
use crate::dom::{MutationObserver, Node};
use crate::jsx::RenderOutput;
use crate::reconcile::reconcile;
use crate::renderer::JsxRenderer;
use crate::router::Route;

/// Attribute carrying reference markers.
pub const REF_ATTRIBUTE: &str = "ref";

/// CSS `display` of a component's wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayStyle {
	/// `inline-block`, the default for components
	#[default]
	InlineBlock,
	/// `block`, used by pages
	Block,
}

impl DisplayStyle {
	/// CSS keyword
	pub fn as_str(&self) -> &'static str {
		match self {
			DisplayStyle::InlineBlock => "inline-block",
			DisplayStyle::Block => "block",
		}
	}
}

impl fmt::Display for DisplayStyle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A reusable piece of UI.
///
/// Implementors embed a [`ComponentBase`] and describe their markup in
/// [`Component::template`]; lifecycle operations come from [`ComponentExt`].
#[async_trait(?Send)]
pub trait Component: 'static {
	/// Identity and per-instance state.
	fn base(&self) -> &ComponentBase;

	/// Markup for `route`.
	async fn template(&self, route: Option<&Route>) -> RenderOutput;

	/// Called once after the rendered element has left the document.
	fn disconnected(&self) {}
}

/// Identity and bookkeeping shared by every component
pub struct ComponentBase {
	context: Context,
	id: String,
	display: DisplayStyle,
	ids: RefCell<HashMap<String, String>>,
	state: Store,
	bindings: RefCell<HashSet<String>>,
	subscriptions: RefCell<Vec<(Observable<Value>, SubscriptionId)>>,
	re_render_in_flight: Cell<bool>,
	observer: RefCell<Option<MutationObserver>>,
	disconnected: Cell<bool>,
}

impl ComponentBase {
	/// Base for an inline component; mints and registers its id.
	pub fn new(context: &Context) -> Self {
		Self::with_display(context, DisplayStyle::InlineBlock)
	}

	/// Base for a page (block wrapper).
	pub fn for_page(context: &Context) -> Self {
		Self::with_display(context, DisplayStyle::Block)
	}

	/// Base with an explicit wrapper display.
	pub fn with_display(context: &Context, display: DisplayStyle) -> Self {
		Self {
			id: context.mint_id(),
			context: context.clone(),
			display,
			ids: RefCell::new(HashMap::new()),
			state: Store::new(),
			bindings: RefCell::new(HashSet::new()),
			subscriptions: RefCell::new(Vec::new()),
			re_render_in_flight: Cell::new(false),
			observer: RefCell::new(None),
			disconnected: Cell::new(false),
		}
	}

	/// Wrapper display
	pub fn display(&self) -> DisplayStyle {
		self.display
	}

	/// Records a state binding; `false` when it already existed.
	pub(crate) fn insert_binding(&self, binding: String) -> bool {
		self.bindings.borrow_mut().insert(binding)
	}

	pub(crate) fn track_subscription(&self, observable: Observable<Value>, id: SubscriptionId) {
		self.subscriptions.borrow_mut().push((observable, id));
	}

	fn release_subscriptions(&self) {
		let subscriptions = std::mem::take(&mut *self.subscriptions.borrow_mut());
		for (observable, id) in subscriptions {
			observable.unsubscribe(id);
		}
		self.bindings.borrow_mut().clear();
	}
}

impl fmt::Debug for ComponentBase {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ComponentBase")
			.field("id", &self.id)
			.field("display", &self.display)
			.field("bindings", &self.bindings.borrow())
			.field("disconnected", &self.disconnected.get())
			.finish_non_exhaustive()
	}
}

/// What a reference resolves to
#[derive(Debug, Clone, PartialEq)]
pub enum RefTarget {
	/// Live element carrying the marker
	Element(Node),
	/// No live element yet; the marker to place in a `ref` attribute
	Marker(String),
}

impl RefTarget {
	/// The element, when one is live
	pub fn element(&self) -> Option<&Node> {
		match self {
			RefTarget::Element(node) => Some(node),
			RefTarget::Marker(_) => None,
		}
	}
}

struct InFlight<'a>(&'a Cell<bool>);

impl Drop for InFlight<'_> {
	fn drop(&mut self) {
		self.0.set(false);
	}
}

/// Lifecycle operations available on every [`Component`].
pub trait ComponentExt: Component {
	/// The `tr-{uuid}` id of the wrapper.
	fn id(&self) -> &str {
		&self.base().id
	}

	/// The framework context.
	fn context(&self) -> &Context {
		&self.base().context
	}

	/// The live wrapper element, if rendered and attached.
	fn element(&self) -> Option<Node> {
		self.context().document().get_element_by_id(self.id())
	}

	/// A `{key}-{uuid}` id, stable per key for this instance.
	fn ids(&self, key: &str) -> String {
		self.base()
			.ids
			.borrow_mut()
			.entry(key.to_string())
			.or_insert_with(|| format!("{}-{}", key, Uuid::new_v4()))
			.clone()
	}

	/// Component-local state.
	fn state(&self) -> &Store {
		&self.base().state
	}

	/// The marker templates place in a `ref` attribute for `key`.
	fn ref_marker(&self, key: &str) -> String {
		format!("{}-{}", key, self.id())
	}

	/// The live element marked with `key`, or the marker to place.
	fn reference(&self, key: &str) -> RefTarget {
		let marker = self.ref_marker(key);
		match self
			.context()
			.document()
			.find_by_attribute(REF_ATTRIBUTE, Some(&marker))
			.into_iter()
			.next()
		{
			Some(element) => RefTarget::Element(element),
			None => RefTarget::Marker(marker),
		}
	}

	/// Sanitizes `text` as plain text, or as HTML when `allow_html` is set.
	fn user_input(&self, text: &str, allow_html: bool) -> String {
		let sanitizer = self.context().sanitizer();
		if allow_html {
			sanitizer.html(text)
		} else {
			sanitizer.plain_text(text)
		}
	}

	/// Sanitized `value` of the element with `element_id`; empty when
	/// missing.
	fn input_value(&self, element_id: &str, allow_html: bool) -> String {
		self.context()
			.document()
			.get_element_by_id(element_id)
			.and_then(|element| element.value())
			.filter(|value| !value.is_empty())
			.map(|value| self.user_input(&value, allow_html))
			.unwrap_or_default()
	}

	/// Whether the disconnect hook has run since the last render.
	fn is_disconnected(&self) -> bool {
		self.base().disconnected.get()
	}

	/// Template output rendered to markup, without the wrapper.
	///
	/// Rendering failures are logged and yield empty content.
	fn render_content<'a>(&'a self, route: Option<&'a Route>) -> LocalBoxFuture<'a, String> {
		async move {
			let output = self.template(route).await;
			match JsxRenderer::new(self.context()).render_to_html(&output) {
				Ok(markup) => markup,
				Err(error) => {
					crate::error_log!("Component {} failed to render: {}", self.id(), error);
					String::new()
				}
			}
		}
		.boxed_local()
	}

	/// Renders the component for `route`, wrapped in
	/// `<div id="{id}" style="display: ...;">` when `include_wrapper` is set.
	///
	/// On the next tick, starts watching the wrapper's parent to detect
	/// removal. A new render re-arms the disconnect hook.
	fn render(self: Rc<Self>, route: Option<Route>, include_wrapper: bool) -> LocalBoxFuture<'static, String> {
		async move {
			let content = self.render_content(route.as_ref()).await;
			self.base().disconnected.set(false);
			observe_disconnection(self.clone());

			if include_wrapper {
				format!(
					r#"<div id="{}" style="display: {};">{}</div>"#,
					self.id(),
					self.base().display,
					content
				)
			} else {
				content
			}
		}
		.boxed_local()
	}

	/// Re-renders in place, keeping live nodes where the markup allows.
	///
	/// The in-flight flag is taken when this is called, not when the future
	/// is first polled: a call made while another re-render is pending is
	/// dropped. Without a live element nothing happens.
	fn re_render(&self, route: Option<Route>) -> LocalBoxFuture<'_, ()> {
		let base = self.base();
		if base.re_render_in_flight.replace(true) {
			crate::debug_log!("Re-render of {} already in flight; dropped", self.id());
			return futures::future::ready(()).boxed_local();
		}
		let in_flight = InFlight(&base.re_render_in_flight);
		async move {
			update_in_place(self, route).await;
			drop(in_flight);
		}
		.boxed_local()
	}

	/// Queues a [`re_render`](ComponentExt::re_render) on the scheduler.
	///
	/// Requests made before the queued one has finished are dropped, so any
	/// number of writes in one tick cost a single re-render.
	fn schedule_re_render(self: Rc<Self>, route: Option<Route>) {
		let base = self.base();
		if base.re_render_in_flight.replace(true) {
			crate::debug_log!("Re-render of {} already queued; dropped", self.id());
			return;
		}
		let context = base.context.clone();
		context.spawn(async move {
			let _in_flight = InFlight(&self.base().re_render_in_flight);
			update_in_place(self.as_ref(), route).await;
		});
	}
}

async fn update_in_place<C: Component + ?Sized>(component: &C, route: Option<Route>) {
	let Some(element) = component.element() else {
		return;
	};

	let markers = strip_ref_markers(&element);
	let markup = component.render_content(route.as_ref()).await;
	let fresh = Node::element_unchecked("div");
	let parsed = fresh.set_inner_html(&markup);
	restore_ref_markers(markers);
	if let Err(error) = parsed {
		crate::error_log!("Re-render of {} produced unparsable markup: {}", component.id(), error);
		return;
	}

	let Some(element) = component.element() else {
		return;
	};
	reconcile(&element, &fresh);
	tracing::trace!(target: "trellis_pages::component", id = %component.id(), "re-rendered");

	component.context().router().use_client_routing();
}

impl<C: Component + ?Sized> ComponentExt for C {}

fn strip_ref_markers(element: &Node) -> Vec<(Node, String)> {
	element
		.find_by_attribute(REF_ATTRIBUTE, None)
		.into_iter()
		.filter_map(|node| {
			let marker = node.attribute(REF_ATTRIBUTE)?;
			node.remove_attribute(REF_ATTRIBUTE);
			Some((node, marker))
		})
		.collect()
}

fn restore_ref_markers(markers: Vec<(Node, String)>) {
	for (node, marker) in markers {
		node.set_attribute_unchecked(REF_ATTRIBUTE, &marker);
	}
}

/// Watches the parent of `component`'s wrapper on the next tick.
///
/// The observer keeps the component alive while it stays in the document and
/// lets go of it once the disconnect hook has run.
fn observe_disconnection<C: Component + ?Sized>(component: Rc<C>) {
	let context = component.context().clone();
	context.asap(move || {
		let base = component.base();
		let Some(parent) = component.element().and_then(|element| element.parent()) else {
			crate::debug_log!("Component {} is not in the document; not observed", component.id());
			return;
		};

		let watched = component.clone();
		let observer = MutationObserver::new(&base.context.scheduler(), move |_records, observer| {
			if watched.element().is_some() {
				return;
			}
			observer.disconnect();
			let base = watched.base();
			base.observer.borrow_mut().take();
			if !base.disconnected.replace(true) {
				tracing::debug!(target: "trellis_pages::component", id = %watched.id(), "disconnected");
				base.release_subscriptions();
				watched.disconnected();
			}
		});
		observer.observe(&parent);

		if let Some(previous) = base.observer.borrow_mut().replace(observer) {
			previous.disconnect();
		}
	});
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::dom::Window;
	use crate::jsx::h;
	use rstest::{fixture, rstest};

	struct Counter {
		base: ComponentBase,
		count: Cell<u32>,
		disconnects: Rc<Cell<u32>>,
	}

	impl Counter {
		fn new(context: &Context) -> Rc<Self> {
			Rc::new(Self {
				base: ComponentBase::new(context),
				count: Cell::new(0),
				disconnects: Rc::new(Cell::new(0)),
			})
		}
	}

	#[async_trait(?Send)]
	impl Component for Counter {
		fn base(&self) -> &ComponentBase {
			&self.base
		}

		async fn template(&self, _route: Option<&Route>) -> RenderOutput {
			h("p")
				.attr(REF_ATTRIBUTE, self.ref_marker("label"))
				.child(format!("Count: {}", self.count.get()))
				.into()
		}

		fn disconnected(&self) {
			self.disconnects.set(self.disconnects.get() + 1);
		}
	}

	#[fixture]
	fn context() -> Context {
		Context::new(Window::new("http://localhost/").unwrap())
	}

	fn mount(context: &Context, component: &Rc<Counter>) {
		let markup = context.block_on(component.clone().render(None, true));
		context
			.document()
			.body()
			.set_inner_html(&format!("<section>{}</section><aside></aside>", markup))
			.unwrap();
		context.run_until_stalled();
	}

	#[rstest]
	fn test_render_wraps_with_id_and_display(context: Context) {
		let component = Counter::new(&context);
		let markup = context.block_on(component.clone().render(None, true));

		assert_eq!(
			markup,
			format!(
				r#"<div id="{}" style="display: inline-block;"><p ref="label-{}">Count: 0</p></div>"#,
				component.id(),
				component.id()
			)
		);
		assert!(context.is_issued(component.id()));
	}

	#[rstest]
	fn test_render_without_wrapper(context: Context) {
		let component = Counter::new(&context);
		let markup = context.block_on(component.clone().render(None, false));
		assert!(markup.starts_with("<p "));
	}

	#[rstest]
	fn test_ids_are_memoized_per_key(context: Context) {
		let component = Counter::new(&context);
		let other = Counter::new(&context);

		assert_eq!(component.ids("input"), component.ids("input"));
		assert_ne!(component.ids("input"), component.ids("button"));
		assert_ne!(component.ids("input"), other.ids("input"));
		assert!(component.ids("input").starts_with("input-"));
	}

	#[rstest]
	fn test_re_render_without_element_is_noop(context: Context) {
		let component = Counter::new(&context);
		let before = context.document().to_html();

		context.block_on(component.re_render(None));

		assert_eq!(context.document().to_html(), before);
	}

	#[rstest]
	fn test_re_render_updates_in_place(context: Context) {
		let component = Counter::new(&context);
		mount(&context, &component);
		let paragraph = component.element().unwrap().children()[0].clone();

		component.count.set(5);
		context.block_on(component.re_render(None));

		let element = component.element().unwrap();
		assert_eq!(element.children()[0], paragraph);
		assert_eq!(paragraph.text_content(), "Count: 5");
		assert_eq!(
			paragraph.attribute(REF_ATTRIBUTE),
			Some(component.ref_marker("label"))
		);
	}

	#[rstest]
	fn test_re_render_while_pending_is_dropped(context: Context) {
		let component = Counter::new(&context);
		mount(&context, &component);

		let first = component.re_render(None);
		component.count.set(9);
		context.block_on(component.re_render(None));
		assert!(component.element().unwrap().text_content().contains("Count: 0"));

		context.block_on(first);
		assert!(component.element().unwrap().text_content().contains("Count: 9"));
		assert!(!component.base().re_render_in_flight.get());
	}

	#[rstest]
	fn test_unpolled_re_render_releases_flag(context: Context) {
		let component = Counter::new(&context);
		mount(&context, &component);

		drop(component.re_render(None));
		component.count.set(4);
		context.block_on(component.re_render(None));
		assert!(component.element().unwrap().text_content().contains("Count: 4"));
	}

	struct Pair {
		base: ComponentBase,
		left: StateField<u32>,
		right: StateField<u32>,
		templates: Cell<u32>,
	}

	impl Pair {
		fn new(context: &Context) -> Rc<Self> {
			Rc::new_cyclic(|weak: &std::rc::Weak<Pair>| Pair {
				base: ComponentBase::new(context),
				left: StateField::from_weak(weak, StoreKind::Component, "left"),
				right: StateField::from_weak(weak, StoreKind::Component, "right"),
				templates: Cell::new(0),
			})
		}
	}

	#[async_trait(?Send)]
	impl Component for Pair {
		fn base(&self) -> &ComponentBase {
			&self.base
		}

		async fn template(&self, _route: Option<&Route>) -> RenderOutput {
			self.templates.set(self.templates.get() + 1);
			let left = self.left.get().ok().flatten().unwrap_or_default();
			let right = self.right.get().ok().flatten().unwrap_or_default();
			h("p").child(format!("{} {}", left, right)).into()
		}
	}

	#[rstest]
	fn test_writes_in_one_tick_re_render_once(context: Context) {
		let component = Pair::new(&context);
		let markup = context.block_on(component.clone().render(None, true));
		context.document().body().set_inner_html(&markup).unwrap();
		context.run_until_stalled();
		assert_eq!(component.templates.get(), 1);

		component.left.set(1).unwrap();
		component.right.set(2).unwrap();
		context.run_until_stalled();

		assert_eq!(component.templates.get(), 2);
		assert_eq!(component.element().unwrap().text_content(), "1 2");

		component.left.set(3).unwrap();
		context.run_until_stalled();
		assert_eq!(component.templates.get(), 3);
		assert_eq!(component.element().unwrap().text_content(), "3 2");
	}

	#[rstest]
	fn test_reference_resolves_live_element(context: Context) {
		let component = Counter::new(&context);
		assert_eq!(
			component.reference("label"),
			RefTarget::Marker(component.ref_marker("label"))
		);

		mount(&context, &component);
		let target = component.reference("label");
		assert_eq!(target.element().map(Node::tag_name), Some("p"));
	}

	#[rstest]
	fn test_input_value_is_sanitized(context: Context) {
		let component = Counter::new(&context);
		context
			.document()
			.body()
			.set_inner_html(r#"<input id="name" value="&lt;b&gt;Ann&lt;/b&gt;">"#)
			.unwrap();

		assert_eq!(component.input_value("name", false), "Ann");
		assert_eq!(component.input_value("missing", false), "");
	}

	#[rstest]
	fn test_disconnected_fires_once(context: Context) {
		let component = Counter::new(&context);
		mount(&context, &component);

		component.element().unwrap().remove();
		context.run_until_stalled();
		assert_eq!(component.disconnects.get(), 1);
		assert!(component.is_disconnected());

		context.document().body().set_inner_html("<p>gone</p>").unwrap();
		context.run_until_stalled();
		assert_eq!(component.disconnects.get(), 1);
	}

	#[rstest]
	fn test_sibling_reparent_does_not_disconnect(context: Context) {
		let component = Counter::new(&context);
		let markup = context.block_on(component.clone().render(None, true));
		let body = context.document().body();
		body.set_inner_html(&format!("<section>{}<span id=\"sibling\"></span></section><aside></aside>", markup))
			.unwrap();
		context.run_until_stalled();

		let sibling = context.document().get_element_by_id("sibling").unwrap();
		let aside = body.elements_by_tag_name("aside").remove(0);
		aside.append_child(&sibling).unwrap();
		context.run_until_stalled();

		assert_eq!(component.disconnects.get(), 0);
		assert!(!component.is_disconnected());
	}
}
