//! App shell
//!
//! [`App`] is the per-thread singleton that owns the layout around the
//! pages. [`App::start`] renders the default layout into `#app-root`, arms
//! client routing and publishes the first route. Later, a layout published
//! through [`App::update_layout`] replaces the default one until the next
//! route change restores it.
//!
//! ## Example
//!
//! ```
//! use trellis_pages::app::{App, AppOptions, Environment};
//!
//! let app = App::instance(AppOptions::new().environment(Environment::Development)).unwrap();
//! assert_eq!(app.environment_variable("mode"), Some("development"));
//! App::destroy();
//! ```

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use trellis_core::{LogEntry, Logger, Observable, Store, SubscriptionId, XssSanitizer};

use crate::component::ComponentExt;
use crate::context::Context;
use crate::dom::{DomError, Node, Window};
use crate::jsx::Jsx;
use crate::page::{Page, mount_page};
use crate::renderer::JsxRenderer;
use crate::router::{Route, Router, SHELL_PRIORITY};

/// Id of the element the app renders into
pub const ROOT_ID: &str = "app-root";

/// Id of the layout container inside [`ROOT_ID`]
pub const LAYOUT_ID: &str = "app-root-layout";

/// Attribute flagging whether the container shows the default layout
pub const DEFAULT_LAYOUT_ATTRIBUTE: &str = "data-default-layout";

const DEFAULT_WINDOW_HREF: &str = "http://localhost/";

thread_local! {
	static INSTANCE: RefCell<Option<Rc<App>>> = const { RefCell::new(None) };
}

/// App shell errors
#[derive(Debug, Error)]
pub enum AppError {
	/// The document has no element to render into
	#[error("No element with id `{0}` to start the app in")]
	MissingRoot(String),

	/// Layout markup could not be rendered
	#[error("DOM error: {0}")]
	Dom(#[from] DomError),

	/// Options could not be parsed
	#[error("Invalid app options: {0}")]
	Options(#[from] serde_json::Error),

	/// Unknown environment name
	#[error("Unknown environment: {0}")]
	UnknownEnvironment(String),

	/// A page built on another context than the app's
	#[error("Page {0} does not share the app's context")]
	ForeignContext(String),
}

/// Which variable set the app runs with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
	/// Local development; logger entries are echoed as warnings
	Development,
	/// Deployed build
	#[default]
	Production,
}

impl fmt::Display for Environment {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Environment::Development => write!(f, "development"),
			Environment::Production => write!(f, "production"),
		}
	}
}

impl FromStr for Environment {
	type Err = AppError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"development" | "dev" => Ok(Environment::Development),
			"production" | "prod" => Ok(Environment::Production),
			_ => Err(AppError::UnknownEnvironment(s.to_string())),
		}
	}
}

/// Variables used in [`Environment::Development`] unless overridden
pub fn default_development_variables() -> HashMap<String, String> {
	HashMap::from([
		("mode".to_string(), "development".to_string()),
		("apiServer".to_string(), "http://localhost:5000".to_string()),
	])
}

/// Variables used in [`Environment::Production`] unless overridden
pub fn default_production_variables() -> HashMap<String, String> {
	HashMap::from([
		("mode".to_string(), "production".to_string()),
		("apiServer".to_string(), "http://www.example.com/api".to_string()),
	])
}

/// Options for [`App::instance`]
///
/// The serializable part can be read from JSON:
///
/// ```
/// use trellis_pages::app::{AppOptions, Environment};
///
/// let options = AppOptions::from_json(r#"{
/// 	"environment": "development",
/// 	"developmentVariables": { "apiServer": "http://localhost:8080" }
/// }"#).unwrap();
/// assert_eq!(options.selected_environment(), Environment::Development);
/// ```
#[derive(Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppOptions {
	environment: Environment,
	production_variables: Option<HashMap<String, String>>,
	development_variables: Option<HashMap<String, String>>,
	#[serde(skip)]
	window: Option<Window>,
	#[serde(skip)]
	sanitizer: Option<Rc<dyn XssSanitizer>>,
	#[serde(skip)]
	context: Option<Context>,
}

impl AppOptions {
	/// Production defaults over a blank `http://localhost/` window
	pub fn new() -> Self {
		Self::default()
	}

	/// Parse options from JSON
	pub fn from_json(json: &str) -> Result<Self, AppError> {
		Ok(serde_json::from_str(json)?)
	}

	/// Select the environment
	pub fn environment(mut self, environment: Environment) -> Self {
		self.environment = environment;
		self
	}

	/// Replace the production variable set
	pub fn production_variables(mut self, variables: HashMap<String, String>) -> Self {
		self.production_variables = Some(variables);
		self
	}

	/// Replace the development variable set
	pub fn development_variables(mut self, variables: HashMap<String, String>) -> Self {
		self.development_variables = Some(variables);
		self
	}

	/// Run in `window`
	pub fn window(mut self, window: Window) -> Self {
		self.window = Some(window);
		self
	}

	/// Use a custom sanitizer
	pub fn sanitizer(mut self, sanitizer: Rc<dyn XssSanitizer>) -> Self {
		self.sanitizer = Some(sanitizer);
		self
	}

	/// Run within an existing context; `window` and `sanitizer` are ignored
	pub fn context(mut self, context: Context) -> Self {
		self.context = Some(context);
		self
	}

	/// Environment these options select
	pub fn selected_environment(&self) -> Environment {
		self.environment
	}

	fn into_context(self) -> Result<Context, AppError> {
		if let Some(context) = self.context {
			return Ok(context);
		}
		let window = match self.window {
			Some(window) => window,
			None => Window::new(DEFAULT_WINDOW_HREF)?,
		};
		let mut builder = Context::builder(window);
		if let Some(sanitizer) = self.sanitizer {
			builder = builder.sanitizer(sanitizer);
		}
		Ok(builder.build())
	}
}

impl fmt::Debug for AppOptions {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("AppOptions")
			.field("environment", &self.environment)
			.field("production_variables", &self.production_variables)
			.field("development_variables", &self.development_variables)
			.field("window", &self.window)
			.field("has_sanitizer", &self.sanitizer.is_some())
			.field("has_context", &self.context.is_some())
			.finish()
	}
}

/// Application shell
pub struct App {
	this: Weak<App>,
	context: Context,
	environment: Environment,
	variables: HashMap<String, String>,
	logger_subscription: Cell<Option<SubscriptionId>>,
	route_subscription: SubscriptionId,
	layout: Observable<Option<Jsx>>,
	layout_subscription: Cell<Option<SubscriptionId>>,
	default_layout: RefCell<Option<Jsx>>,
}

impl App {
	/// The app of this thread, created from `options` on first use
	///
	/// Later calls return the existing app and ignore their options until
	/// [`App::destroy`] is called.
	pub fn instance(options: AppOptions) -> Result<Rc<App>, AppError> {
		if let Some(app) = Self::current() {
			return Ok(app);
		}
		let app = Self::new(options)?;
		INSTANCE.with(|instance| *instance.borrow_mut() = Some(app.clone()));
		Ok(app)
	}

	/// The app of this thread, if one was created
	pub fn current() -> Option<Rc<App>> {
		INSTANCE.with(|instance| instance.borrow().clone())
	}

	/// Tear down the app of this thread
	///
	/// Drops the logger, route and layout subscriptions; the next
	/// [`App::instance`] call builds a fresh app.
	pub fn destroy() {
		let Some(app) = INSTANCE.with(|instance| instance.borrow_mut().take()) else {
			return;
		};
		if let Some(id) = app.logger_subscription.take() {
			app.logger().entry_logged().unsubscribe(id);
		}
		if let Some(id) = app.layout_subscription.take() {
			app.layout.unsubscribe(id);
		}
		app.router().unsubscribe(app.route_subscription);
		tracing::debug!(target: "trellis_pages::app", "app destroyed");
	}

	fn new(options: AppOptions) -> Result<Rc<App>, AppError> {
		let environment = options.environment;
		let variables = match environment {
			Environment::Development => options
				.development_variables
				.clone()
				.unwrap_or_else(default_development_variables),
			Environment::Production => options
				.production_variables
				.clone()
				.unwrap_or_else(default_production_variables),
		};
		let context = options.into_context()?;

		let app = Rc::new_cyclic(|this: &Weak<App>| {
			let weak = this.clone();
			let route_subscription = context.router().subscribe_with_priority(SHELL_PRIORITY, move |_route: Route| {
				let app = weak.upgrade();
				async move {
					if let Some(app) = app {
						app.restore_default_layout();
					}
				}
			});

			App {
				this: this.clone(),
				context: context.clone(),
				environment,
				variables,
				logger_subscription: Cell::new(None),
				route_subscription,
				layout: Observable::new(),
				layout_subscription: Cell::new(None),
				default_layout: RefCell::new(None),
			}
		});

		if environment == Environment::Development {
			let id = app
				.logger()
				.entry_logged()
				.subscribe(|entry: &LogEntry| crate::warn_log!("{}", entry));
			app.logger_subscription.set(Some(id));
		}

		tracing::debug!(target: "trellis_pages::app", %environment, "app created");
		Ok(app)
	}

	/// Render `layout` into `#app-root` and route to the current location
	pub async fn start(&self, layout: Jsx) -> Result<(), AppError> {
		let document = self.context.document();
		let root = document
			.get_element_by_id(ROOT_ID)
			.ok_or_else(|| AppError::MissingRoot(ROOT_ID.to_string()))?;

		let markup = JsxRenderer::new(&self.context).render_jsx(&layout)?;
		*self.default_layout.borrow_mut() = Some(layout);
		root.set_inner_html(&format!(
			r#"<div id="{}" {}="true">{}</div>"#,
			LAYOUT_ID, DEFAULT_LAYOUT_ATTRIBUTE, markup
		))?;
		self.router().use_client_routing();

		let weak = self.this.clone();
		let id = self.layout.subscribe(move |layout: &Option<Jsx>| {
			if let Some(app) = weak.upgrade() {
				app.apply_layout(layout.as_ref());
			}
		});
		if let Some(previous) = self.layout_subscription.replace(Some(id)) {
			self.layout.unsubscribe(previous);
		}

		let href = self.context.window().location_href();
		self.router().route_to(&href, false).await;
		Ok(())
	}

	fn layout_container(&self) -> Option<Node> {
		self.context.document().get_element_by_id(LAYOUT_ID)
	}

	fn apply_layout(&self, layout: Option<&Jsx>) {
		let Some(container) = self.layout_container() else {
			return;
		};
		let markup = match layout {
			Some(layout) => match JsxRenderer::new(&self.context).render_jsx(layout) {
				Ok(markup) => markup,
				Err(error) => {
					crate::error_log!("Could not render layout: {}", error);
					return;
				}
			},
			None => String::new(),
		};
		if let Err(error) = self.fill_container(&container, &markup, false) {
			crate::error_log!("Could not insert layout: {}", error);
		}
	}

	fn restore_default_layout(&self) {
		let Some(container) = self.layout_container() else {
			return;
		};
		if container.attribute(DEFAULT_LAYOUT_ATTRIBUTE).as_deref() == Some("true") {
			return;
		}
		let Some(layout) = self.default_layout.borrow().clone() else {
			return;
		};

		let result = JsxRenderer::new(&self.context)
			.render_jsx(&layout)
			.and_then(|markup| self.fill_container(&container, &markup, true));
		if let Err(error) = result {
			crate::error_log!("Could not restore the default layout: {}", error);
		}
	}

	fn fill_container(&self, container: &Node, markup: &str, default: bool) -> Result<(), DomError> {
		container.set_inner_html(markup)?;
		container.set_attribute(DEFAULT_LAYOUT_ATTRIBUTE, if default { "true" } else { "false" })?;
		self.router().use_client_routing();
		Ok(())
	}

	/// Layout observable; publishing `Some` swaps the layout, `None` empties it
	pub fn layout(&self) -> &Observable<Option<Jsx>> {
		&self.layout
	}

	/// Publish a layout
	pub fn update_layout(&self, layout: Option<Jsx>) {
		self.layout.publish(layout);
	}

	/// The document's first `<main>` element
	pub fn main(&self) -> Option<Node> {
		self.context
			.document()
			.elements_by_tag_name("main")
			.into_iter()
			.next()
	}

	/// Subscribe `page` to this app's route changes
	///
	/// The page must have been built on the app's context.
	pub fn mount_page<P: Page>(&self, page: &Rc<P>) -> Result<SubscriptionId, AppError> {
		if !page.context().same_as(&self.context) {
			return Err(AppError::ForeignContext(page.id().to_string()));
		}
		Ok(mount_page(page))
	}

	/// Replace the app store's state
	pub fn initialize_store(&self, state: HashMap<String, Value>) {
		self.store().set_state(state);
	}

	/// App-wide store
	pub fn store(&self) -> &Store {
		self.context.app_store()
	}

	/// Router
	pub fn router(&self) -> &Router {
		self.context.router()
	}

	/// Context shared with components
	pub fn context(&self) -> &Context {
		&self.context
	}

	/// Logger
	pub fn logger(&self) -> &Logger {
		self.context.logger()
	}

	/// Selected environment
	pub fn environment(&self) -> Environment {
		self.environment
	}

	/// Variable of the selected environment
	pub fn environment_variable(&self, key: &str) -> Option<&str> {
		self.variables.get(key).map(String::as_str)
	}

	/// All variables of the selected environment
	pub fn environment_variables(&self) -> &HashMap<String, String> {
		&self.variables
	}
}

impl fmt::Debug for App {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("App")
			.field("environment", &self.environment)
			.field("variables", &self.variables)
			.field("route_subscription", &self.route_subscription)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::component::{Component, ComponentBase};
	use crate::jsx::{RenderOutput, h};
	use async_trait::async_trait;
	use rstest::rstest;
	use serial_test::serial;

	struct Landing {
		base: ComponentBase,
	}

	#[async_trait(?Send)]
	impl Component for Landing {
		fn base(&self) -> &ComponentBase {
			&self.base
		}

		async fn template(&self, _route: Option<&Route>) -> RenderOutput {
			h("h1").child("Landing").into()
		}
	}

	#[async_trait(?Send)]
	impl Page for Landing {
		async fn matches(&self, _route: &Route) -> bool {
			true
		}
	}

	fn window_with_root(href: &str) -> Window {
		let window = Window::new(href).unwrap();
		window
			.document()
			.body()
			.set_inner_html(r#"<div id="app-root"></div>"#)
			.unwrap();
		window
	}

	fn container(app: &App) -> Node {
		app.context().document().get_element_by_id(LAYOUT_ID).unwrap()
	}

	#[rstest]
	#[serial]
	fn test_first_instance_wins() {
		let first = App::instance(AppOptions::new().environment(Environment::Development)).unwrap();
		let second = App::instance(AppOptions::new().environment(Environment::Production)).unwrap();

		assert!(Rc::ptr_eq(&first, &second));
		assert_eq!(second.environment(), Environment::Development);
		assert!(App::current().is_some());

		App::destroy();
		assert!(App::current().is_none());
	}

	#[rstest]
	#[case(Environment::Development, "development", "http://localhost:5000")]
	#[case(Environment::Production, "production", "http://www.example.com/api")]
	#[serial]
	fn test_default_variables(#[case] environment: Environment, #[case] mode: &str, #[case] api: &str) {
		let app = App::instance(AppOptions::new().environment(environment)).unwrap();

		assert_eq!(app.environment_variable("mode"), Some(mode));
		assert_eq!(app.environment_variable("apiServer"), Some(api));
		assert_eq!(app.environment_variable("missing"), None);

		App::destroy();
	}

	#[rstest]
	#[serial]
	fn test_custom_variables_replace_defaults() {
		let app = App::instance(
			AppOptions::new()
				.production_variables(HashMap::from([("apiServer".to_string(), "https://api.test".to_string())])),
		)
		.unwrap();

		assert_eq!(app.environment_variable("apiServer"), Some("https://api.test"));
		assert_eq!(app.environment_variable("mode"), None);

		App::destroy();
	}

	#[rstest]
	#[case("development", Environment::Development)]
	#[case("DEV", Environment::Development)]
	#[case("Production", Environment::Production)]
	#[case("prod", Environment::Production)]
	fn test_environment_parsing(#[case] input: &str, #[case] expected: Environment) {
		assert_eq!(input.parse::<Environment>().unwrap(), expected);
	}

	#[rstest]
	fn test_unknown_environment_is_rejected() {
		let error = "staging".parse::<Environment>().unwrap_err();
		assert!(matches!(error, AppError::UnknownEnvironment(name) if name == "staging"));
	}

	#[rstest]
	fn test_options_from_json() {
		let options = AppOptions::from_json(r#"{"environment":"development","developmentVariables":{"mode":"local"}}"#)
			.unwrap();
		assert_eq!(options.selected_environment(), Environment::Development);
		assert_eq!(
			options.development_variables,
			Some(HashMap::from([("mode".to_string(), "local".to_string())]))
		);
		assert!(options.production_variables.is_none());

		assert!(matches!(AppOptions::from_json("{\"environment\": 3}"), Err(AppError::Options(_))));
	}

	#[rstest]
	#[serial]
	fn test_development_forwards_logger_entries() {
		let app = App::instance(AppOptions::new().environment(Environment::Development)).unwrap();
		let logged = app.logger().entry_logged();
		assert_eq!(logged.subscriber_count(), 1);

		app.logger().warn("careful");
		assert_eq!(app.logger().entries().len(), 1);

		App::destroy();
		assert_eq!(logged.subscriber_count(), 0);
	}

	#[rstest]
	#[serial]
	fn test_production_does_not_forward_logger_entries() {
		let app = App::instance(AppOptions::new()).unwrap();
		assert_eq!(app.logger().entry_logged().subscriber_count(), 0);
		App::destroy();
	}

	#[rstest]
	#[serial]
	fn test_start_without_root_fails() {
		let app = App::instance(AppOptions::new()).unwrap();
		let result = app.context().block_on(app.start(h("main").build()));

		assert!(matches!(result, Err(AppError::MissingRoot(id)) if id == ROOT_ID));
		App::destroy();
	}

	#[rstest]
	#[serial]
	fn test_start_renders_default_layout_and_routes() {
		let app = App::instance(AppOptions::new().window(window_with_root("http://localhost/docs/"))).unwrap();
		let layout = h("div").attr("class", "shell").child(h("main")).build();

		app.context().block_on(app.start(layout)).unwrap();

		let container = container(&app);
		assert_eq!(container.attribute(DEFAULT_LAYOUT_ATTRIBUTE).as_deref(), Some("true"));
		assert_eq!(container.inner_html(), r#"<div class="shell"><main></main></div>"#);
		assert!(app.main().is_some());
		assert_eq!(app.router().current_route().map(|route| route.path), Some("/docs".to_string()));

		App::destroy();
	}

	#[rstest]
	#[serial]
	fn test_layout_swap_and_restore() {
		let app = App::instance(AppOptions::new().window(window_with_root("http://localhost/"))).unwrap();
		app.context().block_on(app.start(h("main").build())).unwrap();

		app.update_layout(Some(h("section").child("checkout").build()));
		let container = container(&app);
		assert_eq!(container.attribute(DEFAULT_LAYOUT_ATTRIBUTE).as_deref(), Some("false"));
		assert_eq!(container.inner_html(), "<section>checkout</section>");
		assert!(app.main().is_none());

		app.context().block_on(app.router().route_to("http://localhost/other", false));
		assert_eq!(container.attribute(DEFAULT_LAYOUT_ATTRIBUTE).as_deref(), Some("true"));
		assert_eq!(container.inner_html(), "<main></main>");

		App::destroy();
	}

	#[rstest]
	#[serial]
	fn test_empty_layout_clears_container() {
		let app = App::instance(AppOptions::new().window(window_with_root("http://localhost/"))).unwrap();
		app.context().block_on(app.start(h("main").build())).unwrap();

		app.update_layout(None);

		let container = container(&app);
		assert_eq!(container.inner_html(), "");
		assert_eq!(container.attribute(DEFAULT_LAYOUT_ATTRIBUTE).as_deref(), Some("false"));

		App::destroy();
	}

	#[rstest]
	#[serial]
	fn test_layout_is_restored_before_earlier_mounted_pages() {
		let context = Context::new(window_with_root("http://localhost/"));
		let page = Rc::new(Landing {
			base: ComponentBase::for_page(&context),
		});
		crate::page::mount_page(&page);

		let app = App::instance(AppOptions::new().context(context.clone())).unwrap();
		context.block_on(app.start(h("main").build())).unwrap();
		app.update_layout(Some(h("aside").child("no main here").build()));
		context.run_until_stalled();

		context.block_on(app.router().route_to("http://localhost/next", false));

		let main = app.main().unwrap();
		assert!(main.inner_html().contains("<h1>Landing</h1>"));
		assert_eq!(app.router().route_handled(), page.id());

		App::destroy();
	}

	#[rstest]
	#[serial]
	fn test_page_from_other_context_is_rejected() {
		let app = App::instance(AppOptions::new()).unwrap();
		let other = Context::new(Window::new("http://localhost/").unwrap());
		let page = Rc::new(Landing {
			base: ComponentBase::for_page(&other),
		});

		let result = app.mount_page(&page);

		assert!(matches!(result, Err(AppError::ForeignContext(id)) if id == page.id()));
		assert_eq!(app.router().route().subscriber_count(), 2);
		App::destroy();
	}

	#[rstest]
	#[serial]
	fn test_initialize_store() {
		let app = App::instance(AppOptions::new()).unwrap();
		app.initialize_store(HashMap::from([("user".to_string(), serde_json::json!({"name": "Ada"}))]));

		assert_eq!(app.store().value_at("user"), Some(serde_json::json!({"name": "Ada"})));
		App::destroy();
	}
}
