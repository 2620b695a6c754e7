//! Trellis Pages - client-side UI framework
//!
//! Components describe their markup as node trees, render once into a
//! wrapper `<div>` carrying a framework-issued id, and re-render by
//! reconciling fresh markup into their live element. A router turns
//! location changes into [`Route`]s that pages claim, and the [`App`] shell
//! owns the layout around them.
//!
//! ## Architecture
//!
//! - [`dom`]: in-memory document model (nodes, events, mutation observer,
//!   window with history and a task queue)
//! - [`scheduler`]: single-threaded cooperative task queue
//! - [`context`]: the [`Context`] handle threaded through constructors
//! - [`jsx`]: node trees and the [`h`](jsx::h) builder
//! - [`renderer`]: tree to markup, with deferred event-handler binding
//! - [`reconcile`](mod@reconcile): in-place update of live nodes
//! - [`component`]: the [`Component`] trait and its lifecycle
//! - [`router`]: path, query and hash parsing, client-side navigation
//! - [`seo`]: document title and meta tags
//! - [`page`]: routable components
//! - [`app`]: the app shell singleton
//!
//! ## Example
//!
//! ```
//! use async_trait::async_trait;
//! use trellis_pages::component::{Component, ComponentBase, ComponentExt};
//! use trellis_pages::jsx::{RenderOutput, h};
//! use trellis_pages::router::Route;
//! use trellis_pages::{Context, Window};
//! use std::rc::Rc;
//!
//! struct Hello {
//! 	base: ComponentBase,
//! }
//!
//! #[async_trait(?Send)]
//! impl Component for Hello {
//! 	fn base(&self) -> &ComponentBase {
//! 		&self.base
//! 	}
//!
//! 	async fn template(&self, _route: Option<&Route>) -> RenderOutput {
//! 		h("p").child("Hello").into()
//! 	}
//! }
//!
//! let context = Context::new(Window::new("http://localhost/").unwrap());
//! let hello = Rc::new(Hello { base: ComponentBase::new(&context) });
//! let markup = context.block_on(hello.clone().render(None, true));
//!
//! assert!(markup.starts_with(r#"<div id="tr-"#));
//! assert!(markup.ends_with(r#"style="display: inline-block;"><p>Hello</p></div>"#));
//! ```

#![warn(missing_docs)]

// Logging macros
#[macro_use]
pub mod logging;

// Document model and task queue
pub mod dom;
pub mod scheduler;

// Rendering
pub mod context;
pub mod jsx;
pub mod reconcile;
pub mod renderer;

// Components and routing
pub mod app;
pub mod component;
pub mod page;
pub mod router;
pub mod seo;

pub use app::{App, AppError, AppOptions, Environment};
pub use component::{Component, ComponentBase, ComponentExt, DisplayStyle, RawHtml, StateField, StoreKind};
pub use context::{Context, ContextBuilder};
pub use dom::{Document, DomError, Node, Window};
pub use jsx::{AttrValue, Child, ComponentRef, ComponentRegistry, Jsx, RenderOutput, fragment, h};
pub use page::{Page, RenderMode, mount_page};
pub use reconcile::reconcile;
pub use renderer::JsxRenderer;
pub use router::{Route, Router};
pub use scheduler::Scheduler;
pub use seo::{DocumentSeo, MetaTag, SeoService};
