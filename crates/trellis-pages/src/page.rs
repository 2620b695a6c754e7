//! Pages
//!
//! A [`Page`] is a component that claims routes. Once mounted with
//! [`mount_page`], it listens to the router: the first page whose
//! [`Page::matches`] accepts an unclaimed route renders itself into the
//! document's `<main>`, applies its SEO defaults and marks the route as
//! handled.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use async_trait::async_trait;
use trellis_core::SubscriptionId;

use crate::component::{Component, ComponentExt};
use crate::dom::Node;
use crate::router::Route;

/// How a page expects to be pre-rendered; advisory only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
	/// Rendered in the browser only
	Dynamic,
	/// Pre-rendered once
	Static,
	/// Pre-rendered, then refreshed in the browser
	#[default]
	Hybrid,
}

impl RenderMode {
	/// Comment written after the page's markup
	pub fn comment(&self) -> &'static str {
		match self {
			RenderMode::Dynamic => "<!-- trellis-dynamic-render -->",
			RenderMode::Static => "<!-- trellis-static-render -->",
			RenderMode::Hybrid => "<!-- trellis-hybrid-render -->",
		}
	}
}

impl fmt::Display for RenderMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.comment())
	}
}

/// A routable component.
///
/// Pages should build their base with
/// [`ComponentBase::for_page`](crate::component::ComponentBase::for_page) so
/// they render as blocks.
#[async_trait(?Send)]
pub trait Page: Component {
	/// Whether this page handles `route`.
	async fn matches(&self, route: &Route) -> bool;

	/// Pre-rendering hint.
	fn render_mode(&self) -> RenderMode {
		RenderMode::Hybrid
	}

	/// Document title; `None` restores the site title.
	fn title(&self) -> Option<String> {
		None
	}

	/// Description meta tag.
	fn description(&self) -> Option<String> {
		None
	}

	/// Preview image meta tag.
	fn image_url(&self) -> Option<String> {
		None
	}
}

/// The document's first `<main>` element.
pub fn main_element(page: &dyn Component) -> Option<Node> {
	page.context()
		.document()
		.elements_by_tag_name("main")
		.into_iter()
		.next()
}

/// Subscribes `page` to route changes.
///
/// The router holds the page until the returned subscription is removed with
/// [`Router::unsubscribe`](crate::router::Router::unsubscribe).
pub fn mount_page<P: Page>(page: &Rc<P>) -> SubscriptionId {
	let bound_path = Rc::new(RefCell::new(String::new()));
	let page = page.clone();
	let router = page.context().router().clone();

	router.subscribe(move |route: Route| {
		let page = page.clone();
		let bound_path = bound_path.clone();
		async move {
			handle_route_change(&page, &bound_path, route).await;
		}
	})
}

async fn handle_route_change<P: Page>(page: &Rc<P>, bound_path: &RefCell<String>, route: Route) {
	let router = page.context().router().clone();
	let claims = router.route_handled().is_empty() && page.matches(&route).await;
	if !claims {
		bound_path.borrow_mut().clear();
		return;
	}

	let path_is_new = *bound_path.borrow() != route.path;
	if page.element().is_none() || path_is_new {
		*bound_path.borrow_mut() = route.path.clone();
		router.set_route_handled(page.id());
		render_in_main(page, route).await;
	}
}

async fn render_in_main<P: Page>(page: &Rc<P>, route: Route) {
	let context = page.context().clone();
	context.seo().set_default_tags(
		page.title().as_deref(),
		page.description().as_deref(),
		page.image_url().as_deref(),
	);

	tracing::debug!(target: "trellis_pages::page", id = %page.id(), path = %route.path, "rendering page");
	let markup = page.clone().render(Some(route), true).await;
	let Some(main) = main_element(page.as_ref()) else {
		crate::warn_log!("No <main> element to render page {} into", page.id());
		return;
	};
	if let Err(error) = main.set_inner_html(&format!("{}\n{}", markup, page.render_mode().comment())) {
		crate::error_log!("Could not insert page {}: {}", page.id(), error);
		return;
	}

	context.router().use_client_routing();
}
