//! # Trellis
//!
//! A lightweight client-side UI framework. Components describe their markup
//! as node trees, render into a wrapper element carrying a framework-issued
//! id, and update by reconciling fresh markup into their live element. A
//! router turns location changes into routes that pages claim, and an app
//! shell owns the layout around them.
//!
//! ## Feature Flags
//!
//! - `core` - sanitizer, observables, reactive store, logger and storage
//! - `pages` - document model, renderer, reconciler, components, router and
//!   app shell (implies `core`)
//! - `full` (default) - everything
//! - `debug-hooks` - `debug_log!` output in debug builds
//!
//! ## Example
//!
//! ```
//! use trellis::prelude::*;
//!
//! let app = App::instance(AppOptions::new().environment(Environment::Development)).unwrap();
//! assert_eq!(app.environment_variable("apiServer"), Some("http://localhost:5000"));
//! App::destroy();
//! ```

#![warn(missing_docs)]

#[cfg(feature = "core")]
pub mod core;
#[cfg(feature = "pages")]
pub mod pages;

/// Commonly used types
pub mod prelude {
	// External
	pub use async_trait::async_trait;
	pub use serde::{Deserialize, Serialize};

	#[cfg(feature = "core")]
	pub use crate::core::{
		KeyValueStorage, LogEntry, LogLevel, Logger, Observable, Store, StoreError, StoredValue,
		SubscriptionId, XssSanitizer,
	};

	#[cfg(feature = "pages")]
	pub use crate::pages::{
		App, AppError, AppOptions, Component, ComponentBase, ComponentExt, Context, Environment,
		Jsx, Page, RawHtml, RenderMode, RenderOutput, Route, Router, StateField, StoreKind, Window,
		fragment, h, mount_page,
	};
}
