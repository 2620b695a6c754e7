//! Facade re-export tests

use rstest::rstest;
use serial_test::serial;
use trellis::prelude::*;

#[rstest]
fn test_core_store_through_facade() {
	let store = trellis::core::Store::new();
	store.set_state_at(vec![1, 2, 3], "items").unwrap();

	assert_eq!(store.get_state_at::<Vec<u32>>("items").unwrap(), Some(vec![1, 2, 3]));
}

#[rstest]
fn test_pages_renderer_through_facade() {
	let context = Context::new(Window::new("http://localhost/").unwrap());
	let markup = trellis::pages::JsxRenderer::new(&context)
		.render_jsx(&h("p").child("<b>").build())
		.unwrap();

	assert_eq!(markup, "<p>&lt;b&gt;</p>");
}

#[rstest]
#[serial]
fn test_prelude_app_singleton() {
	let app = App::instance(AppOptions::new()).unwrap();
	assert_eq!(app.environment_variable("mode"), Some("production"));

	App::destroy();
	assert!(App::current().is_none());
}

#[rstest]
#[serial]
fn test_prelude_environment_selects_variables() {
	let app = App::instance(AppOptions::new().environment(Environment::Development)).unwrap();
	assert_eq!(app.environment_variable("apiServer"), Some("http://localhost:5000"));

	App::destroy();
}
