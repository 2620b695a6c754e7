//! Client-side UI framework.
//!
//! This module provides access to trellis-pages: the in-memory document
//! model, the node-tree renderer and reconciler, components and their
//! lifecycle, the router, pages and the app shell.
//!
//! ## Example
//!
//! ```rust
//! use trellis::pages::jsx::h;
//! use trellis::pages::{Context, JsxRenderer, Window};
//!
//! let context = Context::new(Window::new("http://localhost/").unwrap());
//! let markup = JsxRenderer::new(&context)
//! 	.render_jsx(&h("p").child("a < b").build())
//! 	.unwrap();
//! assert_eq!(markup, "<p>a &lt; b</p>");
//! ```

pub use trellis_pages::*;
