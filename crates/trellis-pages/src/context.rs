//! Context
//!
//! A [`Context`] bundles everything components, the router and the app
//! shell share: the window (and through it the document and scheduler), the
//! issued-id registry, the app-wide store, and the sanitizer, SEO, storage
//! and logger collaborators. It is passed explicitly to constructors.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

use trellis_core::{DefaultSanitizer, Logger, Storages, Store, XssSanitizer};
use uuid::Uuid;

use crate::dom::{Document, Window};
use crate::router::Router;
use crate::scheduler::Scheduler;
use crate::seo::{DocumentSeo, SeoService};

/// Prefix of every id minted by the framework.
pub const ID_PREFIX: &str = "tr-";

struct ContextInner {
	window: Window,
	router: Router,
	app_store: Store,
	issued_ids: RefCell<HashSet<String>>,
	sanitizer: Rc<dyn XssSanitizer>,
	seo: Rc<dyn SeoService>,
	storages: Storages,
	logger: Logger,
}

/// Shared framework context; clones are cheap handles
#[derive(Clone)]
pub struct Context {
	inner: Rc<ContextInner>,
}

/// Builder for [`Context`]
pub struct ContextBuilder {
	window: Window,
	sanitizer: Option<Rc<dyn XssSanitizer>>,
	seo: Option<Rc<dyn SeoService>>,
	storages: Option<Storages>,
	logger: Option<Logger>,
}

impl ContextBuilder {
	/// Use a custom sanitizer
	pub fn sanitizer(mut self, sanitizer: Rc<dyn XssSanitizer>) -> Self {
		self.sanitizer = Some(sanitizer);
		self
	}

	/// Use a custom SEO service
	pub fn seo(mut self, seo: Rc<dyn SeoService>) -> Self {
		self.seo = Some(seo);
		self
	}

	/// Use custom session/local storage backends
	pub fn storages(mut self, storages: Storages) -> Self {
		self.storages = Some(storages);
		self
	}

	/// Use a specific logger
	pub fn logger(mut self, logger: Logger) -> Self {
		self.logger = Some(logger);
		self
	}

	/// Build the context
	pub fn build(self) -> Context {
		let sanitizer = self
			.sanitizer
			.unwrap_or_else(|| Rc::new(DefaultSanitizer::new()));
		let seo = self
			.seo
			.unwrap_or_else(|| Rc::new(DocumentSeo::new(self.window.document())));
		let router = Router::new(self.window.clone(), sanitizer.clone());

		Context {
			inner: Rc::new(ContextInner {
				window: self.window,
				router,
				app_store: Store::new(),
				issued_ids: RefCell::new(HashSet::new()),
				sanitizer,
				seo,
				storages: self.storages.unwrap_or_default(),
				logger: self.logger.unwrap_or_default(),
			}),
		}
	}
}

impl Context {
	/// Context over `window` with default collaborators
	pub fn new(window: Window) -> Self {
		Self::builder(window).build()
	}

	/// Start building a context over `window`
	pub fn builder(window: Window) -> ContextBuilder {
		ContextBuilder {
			window,
			sanitizer: None,
			seo: None,
			storages: None,
			logger: None,
		}
	}

	/// Window
	pub fn window(&self) -> &Window {
		&self.inner.window
	}

	/// Document shown in the window
	pub fn document(&self) -> Document {
		self.inner.window.document()
	}

	/// Task queue
	pub fn scheduler(&self) -> Scheduler {
		self.inner.window.scheduler()
	}

	/// Router
	pub fn router(&self) -> &Router {
		&self.inner.router
	}

	/// App-wide store
	pub fn app_store(&self) -> &Store {
		&self.inner.app_store
	}

	/// Sanitizer collaborator
	pub fn sanitizer(&self) -> &Rc<dyn XssSanitizer> {
		&self.inner.sanitizer
	}

	/// SEO collaborator
	pub fn seo(&self) -> &Rc<dyn SeoService> {
		&self.inner.seo
	}

	/// Storage backends
	pub fn storages(&self) -> &Storages {
		&self.inner.storages
	}

	/// Logger collaborator
	pub fn logger(&self) -> &Logger {
		&self.inner.logger
	}

	/// Whether `other` is a handle to this same context
	pub fn same_as(&self, other: &Context) -> bool {
		Rc::ptr_eq(&self.inner, &other.inner)
	}

	/// Mint a new `tr-{uuid}` id and record it as issued
	pub fn mint_id(&self) -> String {
		let id = format!("{}{}", ID_PREFIX, Uuid::new_v4());
		self.inner.issued_ids.borrow_mut().insert(id.clone());
		id
	}

	/// Whether `id` was minted by this context
	pub fn is_issued(&self, id: &str) -> bool {
		self.inner.issued_ids.borrow().contains(id)
	}

	/// Number of ids minted so far
	pub fn issued_count(&self) -> usize {
		self.inner.issued_ids.borrow().len()
	}

	/// Run `task` on the next tick
	pub fn asap<F: FnOnce() + 'static>(&self, task: F) {
		self.scheduler().asap(task);
	}

	/// Queue `future` on the scheduler
	pub fn spawn<Fut: Future<Output = ()> + 'static>(&self, future: Fut) {
		self.scheduler().spawn(future);
	}

	/// Drain the scheduler
	pub fn run_until_stalled(&self) {
		self.scheduler().run_until_stalled();
	}

	/// Run `future` to completion without draining the scheduler
	pub fn block_on<Fut: Future>(&self, future: Fut) -> Fut::Output {
		self.scheduler().block_on(future)
	}
}

impl fmt::Debug for Context {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Context")
			.field("window", &self.inner.window)
			.field("issued_ids", &self.issued_count())
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_minted_ids_are_registered_and_unique() {
		let context = Context::new(Window::new("http://localhost/").unwrap());
		let first = context.mint_id();
		let second = context.mint_id();

		assert!(first.starts_with(ID_PREFIX));
		assert_ne!(first, second);
		assert!(context.is_issued(&first));
		assert!(!context.is_issued("tr-not-issued"));
		assert_eq!(context.issued_count(), 2);
	}

	#[rstest]
	fn test_clones_share_registry() {
		let context = Context::new(Window::new("http://localhost/").unwrap());
		let id = context.clone().mint_id();
		assert!(context.is_issued(&id));
	}
}
