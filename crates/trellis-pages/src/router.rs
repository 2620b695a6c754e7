//! Client-side router
//!
//! The [`Router`] turns hrefs into [`Route`]s, publishes them to its
//! subscribers (awaited in subscription order) and keeps session history in
//! step. [`Router::use_client_routing`] intercepts clicks on same-origin
//! anchors so navigation stays in the app.
//!
//! Claiming a route is cooperative: the router clears
//! [`Router::route_handled`] before any other subscriber runs, and the first
//! page that matches records its id there.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};
use trellis_core::{AsyncObservable, SubscriptionId, XssSanitizer};
use url::{Position, Url};

use crate::dom::{Event, EventType, Window};

/// Attribute marking anchors that already route in-app.
pub const ROUTED_ATTRIBUTE: &str = "routed";

/// Distance kept above a hash target when scrolling to it, in pixels.
pub const HASH_SCROLL_OFFSET: i64 = 50;

/// Priority of the router's own subscriber; nothing runs before it.
const ROUTER_PRIORITY: u8 = u8::MAX;

/// Priority of the app shell's subscriber: after the router, before pages.
pub const SHELL_PRIORITY: u8 = 1;

/// A parsed location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
	/// The href the route was computed from.
	pub href: String,
	/// Path without origin, query, hash, trailing `/` or `.html`.
	pub path: String,
	/// Non-empty path segments.
	pub route_params: Vec<String>,
	/// `key=value` pairs of the query string.
	pub query_params: HashMap<String, String>,
	/// Segments following each `#`.
	pub hash_params: Vec<String>,
}

impl Route {
	/// Query parameter by key.
	pub fn query(&self, key: &str) -> Option<&str> {
		self.query_params.get(key).map(String::as_str)
	}
}

struct RouterInner {
	window: Window,
	sanitizer: Rc<dyn XssSanitizer>,
	route: AsyncObservable<Route>,
	route_handled: RefCell<String>,
	current_route: RefCell<Option<Route>>,
	scroll_on_route_change: Cell<bool>,
}

/// Client-side router; clones share it.
#[derive(Clone)]
pub struct Router {
	inner: Rc<RouterInner>,
}

impl Router {
	/// Creates a router over `window`.
	///
	/// Registers the router's own route subscriber (always first) and reacts
	/// to `popstate` by publishing the restored location.
	pub fn new(window: Window, sanitizer: Rc<dyn XssSanitizer>) -> Self {
		let router = Self {
			inner: Rc::new(RouterInner {
				window,
				sanitizer,
				route: AsyncObservable::new(),
				route_handled: RefCell::new(String::new()),
				current_route: RefCell::new(None),
				scroll_on_route_change: Cell::new(true),
			}),
		};

		let weak = Rc::downgrade(&router.inner);
		router.inner.route.subscribe_with_priority(ROUTER_PRIORITY, move |route: Route| {
			let weak = weak.clone();
			async move {
				if let Some(router) = Router::upgrade(&weak) {
					router.on_route_published(route);
				}
			}
		});

		let weak = Rc::downgrade(&router.inner);
		router.inner.window.on_popstate(move |_state| {
			let Some(router) = Router::upgrade(&weak) else {
				return;
			};
			let href = router.inner.window.location_href();
			crate::debug_log!("popstate: routing to {}", href);
			router.inner.window.scheduler().spawn(async move {
				router.route_to(&href, false).await;
			});
		});

		router
	}

	fn upgrade(weak: &Weak<RouterInner>) -> Option<Self> {
		weak.upgrade().map(|inner| Self { inner })
	}

	fn on_route_published(&self, route: Route) {
		self.inner.route_handled.borrow_mut().clear();

		if self.inner.scroll_on_route_change.get() {
			let window = self.inner.window.clone();
			self.inner
				.window
				.scheduler()
				.asap(move || scroll_to_top_or_hash(&window, &route));
		}
	}

	/// The window this router navigates.
	pub fn window(&self) -> &Window {
		&self.inner.window
	}

	/// The route observable.
	pub fn route(&self) -> AsyncObservable<Route> {
		self.inner.route.clone()
	}

	/// Subscribes to route changes; subscribers run in subscription order.
	pub fn subscribe<F, Fut>(&self, callback: F) -> SubscriptionId
	where
		F: Fn(Route) -> Fut + 'static,
		Fut: Future<Output = ()> + 'static,
	{
		self.inner.route.subscribe(callback)
	}

	/// Subscribes ahead of every subscriber with a lower `priority`.
	///
	/// [`Router::subscribe`] uses priority `0`. The router's own subscriber
	/// always runs first.
	pub fn subscribe_with_priority<F, Fut>(&self, priority: u8, callback: F) -> SubscriptionId
	where
		F: Fn(Route) -> Fut + 'static,
		Fut: Future<Output = ()> + 'static,
	{
		self.inner
			.route
			.subscribe_with_priority(priority.min(ROUTER_PRIORITY - 1), callback)
	}

	/// Removes a route subscriber.
	pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
		self.inner.route.unsubscribe(id)
	}

	/// Id of the page that claimed the current route, empty when unclaimed.
	pub fn route_handled(&self) -> String {
		self.inner.route_handled.borrow().clone()
	}

	/// Records the page that claimed the current route.
	pub fn set_route_handled(&self, id: impl Into<String>) {
		*self.inner.route_handled.borrow_mut() = id.into();
	}

	/// The last route passed to [`Router::route_to`].
	pub fn current_route(&self) -> Option<Route> {
		self.inner.current_route.borrow().clone()
	}

	/// Whether route changes scroll the window.
	pub fn scroll_on_route_change(&self) -> bool {
		self.inner.scroll_on_route_change.get()
	}

	/// Enables or disables scrolling on route changes.
	pub fn set_scroll_on_route_change(&self, enabled: bool) {
		self.inner.scroll_on_route_change.set(enabled);
	}

	/// Computes the route for `href`.
	pub fn get_route_from_href(&self, href: &str) -> Route {
		let path = self.clean_path(href);
		let route_params = path
			.split('/')
			.filter(|segment| !segment.is_empty())
			.map(|segment| self.decode_and_sanitize(segment))
			.collect();

		Route {
			href: href.to_string(),
			route_params,
			query_params: self.query_params(href),
			hash_params: self.hash_params(href),
			path,
		}
	}

	/// Navigates to `href`.
	///
	/// Records the route as current, awaits every subscriber, then adds a
	/// history entry when `push` is set.
	pub async fn route_to(&self, href: &str, push: bool) -> Route {
		let route = self.get_route_from_href(href);
		*self.inner.current_route.borrow_mut() = Some(route.clone());
		tracing::debug!(target: "trellis_pages::router", path = %route.path, push, "route_to");

		self.inner.route.publish(route.clone()).await;

		if push {
			match serde_json::to_value(&route) {
				Ok(state) => {
					if let Err(error) = self.inner.window.push_state(state, href) {
						crate::warn_log!("Could not record history for {}: {}", href, error);
					}
				}
				Err(error) => crate::error_log!("Could not serialize route {}: {}", route.path, error),
			}
		}

		route
	}

	/// Arms in-app routing on every anchor not yet armed, on the next tick.
	///
	/// Anchors with `target="_blank"` are left to the browser.
	pub fn use_client_routing(&self) {
		let weak = Rc::downgrade(&self.inner);
		self.inner.window.scheduler().asap(move || {
			if let Some(router) = Router::upgrade(&weak) {
				router.arm_anchors();
			}
		});
	}

	fn arm_anchors(&self) {
		let anchors = self.inner.window.document().elements_by_tag_name("a");
		for anchor in anchors {
			if anchor.attribute(ROUTED_ATTRIBUTE).as_deref() == Some("true")
				|| anchor.attribute("target").as_deref() == Some("_blank")
			{
				continue;
			}

			anchor.set_attribute_unchecked(ROUTED_ATTRIBUTE, "true");
			let weak = Rc::downgrade(&self.inner);
			anchor.add_event_listener(
				EventType::Click,
				Rc::new(move |event: &Event| {
					if let Some(router) = Router::upgrade(&weak) {
						router.route_with_history(event);
					}
				}),
			);
		}
	}

	fn route_with_history(&self, event: &Event) {
		let Some(href) = event
			.current_target()
			.and_then(|anchor| anchor.attribute("href"))
		else {
			return;
		};
		let window = &self.inner.window;
		let Ok(target) = window.resolve(&href) else {
			return;
		};
		if target.origin() != window.location().origin() {
			return;
		}

		event.prevent_default();
		if target.as_str() != window.location_href() {
			let router = self.clone();
			let target = target.to_string();
			window.scheduler().spawn(async move {
				router.route_to(&target, true).await;
			});
		}
	}

	fn clean_path(&self, href: &str) -> String {
		let origin = self.inner.window.origin();
		let relative = match href.strip_prefix(origin.as_str()) {
			Some(rest) => rest.to_string(),
			None => match Url::parse(href) {
				Ok(url) if url.has_host() => url[Position::BeforePath..].to_string(),
				_ => href.to_string(),
			},
		};

		let end = relative.find(['?', '#']).unwrap_or(relative.len());
		let mut path = &relative[..end];
		if path.len() > 1 {
			path = path.strip_suffix('/').unwrap_or(path);
		}
		let path = path.strip_suffix(".html").unwrap_or(path);

		if path.is_empty() {
			"/".to_string()
		} else {
			path.to_string()
		}
	}

	fn query_params(&self, href: &str) -> HashMap<String, String> {
		let Some((_, query)) = href.split_once('?') else {
			return HashMap::new();
		};
		let query = query.split('#').next().unwrap_or_default();

		query
			.split('&')
			.filter(|pair| !pair.is_empty())
			.map(|pair| {
				let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
				(key.to_string(), self.decode_and_sanitize(value))
			})
			.collect()
	}

	fn hash_params(&self, href: &str) -> Vec<String> {
		href.split('#')
			.skip(1)
			.map(|segment| self.decode_and_sanitize(segment))
			.collect()
	}

	fn decode_and_sanitize(&self, raw: &str) -> String {
		let decoded = urlencoding::decode(raw).map_or_else(|_| raw.to_string(), |text| text.into_owned());
		self.inner.sanitizer.plain_text(&decoded)
	}
}

fn scroll_to_top_or_hash(window: &Window, route: &Route) {
	match route.hash_params.first().filter(|id| !id.is_empty()) {
		Some(id) => {
			if let Some(element) = window.document().get_element_by_id(id) {
				window.scroll_to(0, element.offset_top() - HASH_SCROLL_OFFSET);
			}
		}
		None => window.scroll_to(0, 0),
	}
}

impl fmt::Debug for Router {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Router")
			.field("route_handled", &self.inner.route_handled.borrow())
			.field("current_route", &self.inner.current_route.borrow())
			.field("scroll_on_route_change", &self.inner.scroll_on_route_change.get())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use futures::executor::block_on;
	use rstest::{fixture, rstest};
	use trellis_core::DefaultSanitizer;

	#[fixture]
	fn router() -> Router {
		let window = Window::new("http://localhost/").unwrap();
		Router::new(window, Rc::new(DefaultSanitizer::new()))
	}

	#[rstest]
	#[case("http://localhost/", "/")]
	#[case("http://localhost", "/")]
	#[case("http://localhost/about/", "/about")]
	#[case("http://localhost/docs/intro.html", "/docs/intro")]
	#[case("http://localhost/a/b?x=1#top", "/a/b")]
	#[case("https://elsewhere.example/a/b/", "/a/b")]
	#[case("/relative/path/", "/relative/path")]
	#[case("/search?q=rust", "/search")]
	fn test_clean_path(router: Router, #[case] href: &str, #[case] expected: &str) {
		assert_eq!(router.get_route_from_href(href).path, expected);
	}

	#[rstest]
	fn test_route_parts(router: Router) {
		let route = router.get_route_from_href("http://localhost/blog/my%20post.html?page=2&tag=a%20b#comments#42");

		assert_eq!(route.path, "/blog/my%20post");
		assert_eq!(route.route_params, vec!["blog".to_string(), "my post".to_string()]);
		assert_eq!(route.query("page"), Some("2"));
		assert_eq!(route.query("tag"), Some("a b"));
		assert_eq!(route.hash_params, vec!["comments".to_string(), "42".to_string()]);
	}

	#[rstest]
	fn test_foreign_host_route_parts(router: Router) {
		let segments = router.get_route_from_href("http://host/one/two/");
		assert_eq!(segments.route_params, vec!["one".to_string(), "two".to_string()]);

		let query = router.get_route_from_href("http://host?one=one&two=two");
		assert_eq!(query.path, "/");
		assert_eq!(query.query_params.len(), 2);
		assert_eq!(query.query("one"), Some("one"));
		assert_eq!(query.query("two"), Some("two"));

		let hash = router.get_route_from_href("http://host#one#two");
		assert_eq!(hash.hash_params, vec!["one".to_string(), "two".to_string()]);
		assert!(hash.route_params.is_empty());
	}

	#[rstest]
	fn test_single_query_pair_keeps_everything_after_first_equals(router: Router) {
		let route = router.get_route_from_href("/?token=a=b");
		assert_eq!(route.query("token"), Some("a=b"));
	}

	#[rstest]
	fn test_query_key_without_value(router: Router) {
		let route = router.get_route_from_href("/?flag&x=1");
		assert_eq!(route.query("flag"), Some(""));
		assert_eq!(route.query("x"), Some("1"));
	}

	#[rstest]
	fn test_params_are_sanitized(router: Router) {
		let route = router.get_route_from_href("/%3Cb%3Ebold%3C%2Fb%3E?q=%3Cscript%3Ealert(1)%3C%2Fscript%3E#%3Ci%3E");

		assert_eq!(route.route_params, vec!["bold".to_string()]);
		assert_eq!(route.query("q"), Some(""));
		assert_eq!(route.hash_params, vec![String::new()]);
	}

	#[rstest]
	fn test_route_serializes_camel_case(router: Router) {
		let value = serde_json::to_value(router.get_route_from_href("/a?b=c")).unwrap();
		assert!(value.get("routeParams").is_some());
		assert!(value.get("queryParams").is_some());
		assert!(value.get("hashParams").is_some());
	}

	#[rstest]
	fn test_route_to_publishes_and_pushes(router: Router) {
		let seen = Rc::new(RefCell::new(Vec::new()));
		let seen_clone = seen.clone();
		router.subscribe(move |route: Route| {
			let seen = seen_clone.clone();
			async move { seen.borrow_mut().push(route.path) }
		});
		router.set_route_handled("tr-page");

		let route = block_on(router.route_to("http://localhost/next", true));

		assert_eq!(route.path, "/next");
		assert_eq!(*seen.borrow(), vec!["/next".to_string()]);
		assert_eq!(router.current_route(), Some(route.clone()));
		assert_eq!(router.route_handled(), "");
		assert_eq!(router.window().location_href(), "http://localhost/next");
		assert_eq!(
			router.window().history_state(),
			serde_json::to_value(&route).unwrap()
		);
	}

	#[rstest]
	fn test_route_to_without_push_leaves_history(router: Router) {
		block_on(router.route_to("http://localhost/quiet", false));
		assert_eq!(router.window().history_length(), 1);
	}

	#[rstest]
	fn test_scrolls_to_hash_target(router: Router) {
		let body = router.window().document().body();
		body.set_inner_html(r#"<h2 id="section">Section</h2>"#).unwrap();
		router
			.window()
			.document()
			.get_element_by_id("section")
			.unwrap()
			.set_offset_top(300);
		router.window().scroll_to(0, 900);

		block_on(router.route_to("http://localhost/page#section", false));
		assert_eq!(router.window().scroll_position(), (0, 900));

		router.window().scheduler().run_until_stalled();
		assert_eq!(router.window().scroll_position(), (0, 250));
	}

	#[rstest]
	fn test_scrolls_to_top_without_hash(router: Router) {
		router.window().scroll_to(0, 900);
		block_on(router.route_to("http://localhost/page", false));
		router.window().scheduler().run_until_stalled();
		assert_eq!(router.window().scroll_position(), (0, 0));
	}

	#[rstest]
	fn test_scrolling_can_be_disabled(router: Router) {
		router.set_scroll_on_route_change(false);
		router.window().scroll_to(0, 900);
		block_on(router.route_to("http://localhost/page", false));
		router.window().scheduler().run_until_stalled();
		assert_eq!(router.window().scroll_position(), (0, 900));
	}

	#[rstest]
	fn test_client_routing_intercepts_local_links(router: Router) {
		let body = router.window().document().body();
		body.set_inner_html(
			r#"<a id="local" href="/about">About</a><a id="external" href="https://elsewhere.example/">Out</a><a id="blank" href="/new" target="_blank">New</a>"#,
		)
		.unwrap();
		let document = router.window().document();

		router.use_client_routing();
		router.window().scheduler().run_until_stalled();

		let local = document.get_element_by_id("local").unwrap();
		let external = document.get_element_by_id("external").unwrap();
		let blank = document.get_element_by_id("blank").unwrap();
		assert_eq!(local.attribute(ROUTED_ATTRIBUTE).as_deref(), Some("true"));
		assert_eq!(external.attribute(ROUTED_ATTRIBUTE).as_deref(), Some("true"));
		assert_eq!(blank.attribute(ROUTED_ATTRIBUTE), None);

		local.click();
		router.window().scheduler().run_until_stalled();
		assert!(router.window().navigations().is_empty());
		assert_eq!(router.current_route().map(|route| route.path), Some("/about".to_string()));
		assert_eq!(router.window().location_href(), "http://localhost/about");

		external.click();
		assert_eq!(
			router.window().navigations(),
			vec!["https://elsewhere.example/".to_string()]
		);
	}

	#[rstest]
	fn test_client_routing_arms_each_anchor_once(router: Router) {
		let body = router.window().document().body();
		body.set_inner_html(r#"<a id="local" href="/about">About</a>"#)
			.unwrap();

		router.use_client_routing();
		router.use_client_routing();
		router.window().scheduler().run_until_stalled();

		let anchor = router.window().document().get_element_by_id("local").unwrap();
		assert_eq!(anchor.listener_count(EventType::Click), 1);
	}

	#[rstest]
	fn test_popstate_routes_without_push(router: Router) {
		block_on(router.route_to("http://localhost/one", true));
		block_on(router.route_to("http://localhost/two", true));

		router.window().back();
		router.window().scheduler().run_until_stalled();

		assert_eq!(router.current_route().map(|route| route.path), Some("/one".to_string()));
		assert_eq!(router.window().history_length(), 3);
	}
}
