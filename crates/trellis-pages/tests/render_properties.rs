//! Property-based tests for rendering and reconciliation
//!
//! Rendered markup must parse back into the same text and attributes, and
//! reconciling fresh markup into a live tree must leave the live tree
//! serializing exactly like the fresh one.

use proptest::prelude::*;
use rstest::rstest;
use trellis_pages::dom::Node;
use trellis_pages::jsx::{Jsx, h};
use trellis_pages::renderer::JsxRenderer;
use trellis_pages::{Context, Window, reconcile};

fn context() -> Context {
	Context::new(Window::new("http://localhost/").unwrap())
}

fn parse(markup: &str) -> Node {
	let container = Node::element("div").unwrap();
	container.set_inner_html(markup).unwrap();
	container
}

fn list(items: &[String]) -> Jsx {
	h("ul")
		.children(items.iter().map(|item| h("li").child(item.clone())))
		.build()
}

proptest! {
	#[test]
	fn prop_text_survives_render_and_parse(text in "[a-zA-Z0-9 <>&\"'=/;#]{0,40}") {
		let context = context();
		let markup = JsxRenderer::new(&context)
			.render_jsx(&h("p").child(text.clone()).build())
			.unwrap();

		let parsed = parse(&markup);
		let paragraph = parsed.children().remove(0);
		prop_assert_eq!(paragraph.tag_name(), "p");
		prop_assert_eq!(paragraph.text_content(), text);
	}

	#[test]
	fn prop_attribute_survives_render_and_parse(value in "[a-zA-Z0-9 <>&\"'=]{0,30}") {
		let context = context();
		let markup = JsxRenderer::new(&context)
			.render_jsx(&h("span").attr("title", value.clone()).build())
			.unwrap();

		let span = parse(&markup).children().remove(0);
		prop_assert_eq!(span.attribute("title"), Some(value));
	}

	#[test]
	fn prop_reconcile_matches_fresh_markup(
		before in proptest::collection::vec("[a-z ]{0,8}", 0..6),
		after in proptest::collection::vec("[a-z ]{0,8}", 0..6),
	) {
		let context = context();
		let renderer = JsxRenderer::new(&context);
		let live = parse(&renderer.render_jsx(&list(&before)).unwrap());
		let fresh = parse(&renderer.render_jsx(&list(&after)).unwrap());
		let expected = fresh.inner_html();

		reconcile(&live, &fresh);
		prop_assert_eq!(live.inner_html(), expected);
	}
}

#[rstest]
fn test_reconcile_keeps_nodes_for_same_shape() {
	let context = context();
	let renderer = JsxRenderer::new(&context);
	let before = ["a".to_string(), "b".to_string()];
	let after = ["a".to_string(), "c".to_string()];
	let live = parse(&renderer.render_jsx(&list(&before)).unwrap());
	let fresh = parse(&renderer.render_jsx(&list(&after)).unwrap());
	let second = live.children()[0].children()[1].clone();

	reconcile(&live, &fresh);

	assert!(live.contains(&second));
	assert_eq!(second.text_content(), "c");
}
