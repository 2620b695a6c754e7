//! Raw markup component

use std::rc::Rc;

use async_trait::async_trait;

use super::{Component, ComponentBase, ComponentExt};
use crate::context::Context;
use crate::jsx::{AttrValue, ComponentRef, RenderOutput};
use crate::router::Route;

/// Renders a markup string as-is, sanitized as HTML unless opted out.
#[derive(Debug)]
pub struct RawHtml {
	base: ComponentBase,
	markup: String,
}

impl RawHtml {
	/// Component name used in a [`ComponentRegistry`](crate::jsx::ComponentRegistry).
	pub const NAME: &'static str = "raw-html";

	/// Sanitized markup.
	pub fn new(context: &Context, markup: &str) -> Self {
		Self::with_sanitizing(context, markup, true)
	}

	/// Markup kept verbatim when `sanitize` is `false`.
	pub fn with_sanitizing(context: &Context, markup: &str, sanitize: bool) -> Self {
		let mut component = Self {
			base: ComponentBase::new(context),
			markup: String::new(),
		};
		component.markup = if sanitize {
			component.user_input(markup, true)
		} else {
			markup.to_string()
		};
		component
	}

	/// Markup this component renders.
	pub fn markup(&self) -> &str {
		&self.markup
	}

	/// Factory reading the `html` prop (and `sanitize`, default `true`).
	pub fn component_ref() -> ComponentRef {
		ComponentRef::new(Self::NAME, |context, props, _children| {
			let prop = |name: &str| {
				props
					.iter()
					.find(|(key, _)| key == name)
					.map(|(_, value)| value)
			};
			let markup = prop("html")
				.and_then(AttrValue::as_attribute_text)
				.unwrap_or_default();
			let sanitize = !matches!(prop("sanitize"), Some(AttrValue::Bool(false)));
			Rc::new(RawHtml::with_sanitizing(context, &markup, sanitize)) as Rc<dyn Component>
		})
	}
}

#[async_trait(?Send)]
impl Component for RawHtml {
	fn base(&self) -> &ComponentBase {
		&self.base
	}

	async fn template(&self, _route: Option<&Route>) -> RenderOutput {
		RenderOutput::Text(self.markup.clone())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::dom::Window;
	use crate::jsx::{Built, ComponentRegistry};
	use rstest::{fixture, rstest};

	#[fixture]
	fn context() -> Context {
		Context::new(Window::new("http://localhost/").unwrap())
	}

	#[rstest]
	fn test_markup_is_sanitized_by_default(context: Context) {
		let component = RawHtml::new(&context, "<b>bold</b><script>alert(1)</script>");
		assert!(component.markup().contains("<b>bold</b>"));
		assert!(!component.markup().contains("<script>"));
	}

	#[rstest]
	fn test_unsanitized_markup_is_verbatim(context: Context) {
		let component = RawHtml::with_sanitizing(&context, "<custom-tag>x</custom-tag>", false);
		assert_eq!(component.markup(), "<custom-tag>x</custom-tag>");
	}

	#[rstest]
	fn test_renders_through_registry(context: Context) {
		let mut registry = ComponentRegistry::new();
		registry.register(RawHtml::component_ref());

		let built = registry.build_named(
			&context,
			RawHtml::NAME,
			vec![("html".to_string(), AttrValue::from("<em>hi</em>"))],
			Vec::new(),
		);
		let Built::Pending(markup) = built else {
			panic!("components render asynchronously");
		};
		let markup = context.block_on(markup);

		assert!(markup.starts_with(r#"<div id="tr-"#));
		assert!(markup.ends_with(r#"style="display: inline-block;"><em>hi</em></div>"#));
	}
}
