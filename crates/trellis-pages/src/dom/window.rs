//! Window: location, session history and scrolling
//!
//! History traversal mirrors the browser: `back`/`forward`/`go` update the
//! location immediately and fire `popstate` on the next scheduler tick.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use serde_json::Value;
use trellis_core::{Observable, SubscriptionId};
use url::Url;

use super::DomError;
use super::document::Document;
use crate::scheduler::Scheduler;

/// One session history entry
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
	/// Absolute URL
	pub url: String,
	/// State passed to `push_state`/`replace_state`
	pub state: Value,
}

struct WindowInner {
	document: Document,
	scheduler: Scheduler,
	location: RefCell<Url>,
	entries: RefCell<Vec<HistoryEntry>>,
	index: Cell<usize>,
	scroll: Cell<(i64, i64)>,
	popstate: Observable<Value>,
	navigations: RefCell<Vec<String>>,
}

/// Browsing context; clones share it
#[derive(Clone)]
pub struct Window {
	inner: Rc<WindowInner>,
}

impl Window {
	/// New window showing an empty document at `href`
	pub fn new(href: &str) -> Result<Self, DomError> {
		Self::with_document(href, Document::new(), Scheduler::new())
	}

	/// New window over an existing document and scheduler
	pub fn with_document(href: &str, document: Document, scheduler: Scheduler) -> Result<Self, DomError> {
		let location = Url::parse(href)?;
		let window = Self {
			inner: Rc::new(WindowInner {
				document,
				scheduler,
				entries: RefCell::new(vec![HistoryEntry {
					url: location.to_string(),
					state: Value::Null,
				}]),
				location: RefCell::new(location),
				index: Cell::new(0),
				scroll: Cell::new((0, 0)),
				popstate: Observable::new(),
				navigations: RefCell::new(Vec::new()),
			}),
		};

		let weak: Weak<WindowInner> = Rc::downgrade(&window.inner);
		window
			.inner
			.document
			.root()
			.set_navigation_hook(Rc::new(move |href: &str| {
				if let Some(inner) = weak.upgrade() {
					Window { inner }.navigate(href);
				}
			}));
		Ok(window)
	}

	/// Displayed document
	pub fn document(&self) -> Document {
		self.inner.document.clone()
	}

	/// Task queue of this window
	pub fn scheduler(&self) -> Scheduler {
		self.inner.scheduler.clone()
	}

	/// Current location
	pub fn location(&self) -> Url {
		self.inner.location.borrow().clone()
	}

	/// Current location as a string
	pub fn location_href(&self) -> String {
		self.inner.location.borrow().to_string()
	}

	/// `scheme://host[:port]` of the current location
	pub fn origin(&self) -> String {
		self.inner.location.borrow().origin().ascii_serialization()
	}

	/// Resolve `href` against the current location
	pub fn resolve(&self, href: &str) -> Result<Url, DomError> {
		Ok(self.inner.location.borrow().join(href)?)
	}

	/// Move to `href` without touching history (the host reporting where it
	/// is)
	pub fn set_location(&self, href: &str) -> Result<(), DomError> {
		let url = self.resolve(href)?;
		let index = self.inner.index.get();
		if let Some(entry) = self.inner.entries.borrow_mut().get_mut(index) {
			entry.url = url.to_string();
		}
		*self.inner.location.borrow_mut() = url;
		Ok(())
	}

	fn same_origin_url(&self, href: &str) -> Result<Url, DomError> {
		let url = self.resolve(href)?;
		let origin = self.origin();
		if url.origin().ascii_serialization() != origin {
			return Err(DomError::CrossOrigin {
				origin,
				url: url.to_string(),
			});
		}
		Ok(url)
	}

	/// Add a history entry for `href` (same origin only)
	pub fn push_state(&self, state: Value, href: &str) -> Result<(), DomError> {
		let url = self.same_origin_url(href)?;
		let index = self.inner.index.get();
		{
			let mut entries = self.inner.entries.borrow_mut();
			entries.truncate(index + 1);
			entries.push(HistoryEntry {
				url: url.to_string(),
				state,
			});
		}
		self.inner.index.set(index + 1);
		*self.inner.location.borrow_mut() = url;
		Ok(())
	}

	/// Replace the current history entry (same origin only)
	pub fn replace_state(&self, state: Value, href: &str) -> Result<(), DomError> {
		let url = self.same_origin_url(href)?;
		let index = self.inner.index.get();
		if let Some(entry) = self.inner.entries.borrow_mut().get_mut(index) {
			*entry = HistoryEntry {
				url: url.to_string(),
				state,
			};
		}
		*self.inner.location.borrow_mut() = url;
		Ok(())
	}

	/// Number of history entries
	pub fn history_length(&self) -> usize {
		self.inner.entries.borrow().len()
	}

	/// State of the current history entry
	pub fn history_state(&self) -> Value {
		self.inner
			.entries
			.borrow()
			.get(self.inner.index.get())
			.map(|entry| entry.state.clone())
			.unwrap_or(Value::Null)
	}

	/// Traverse `delta` entries; out-of-range traversals do nothing
	pub fn go(&self, delta: isize) {
		let Some(target) = self.inner.index.get().checked_add_signed(delta) else {
			return;
		};
		let Some(entry) = self.inner.entries.borrow().get(target).cloned() else {
			return;
		};
		if delta == 0 {
			return;
		}

		let Ok(url) = Url::parse(&entry.url) else {
			return;
		};
		self.inner.index.set(target);
		*self.inner.location.borrow_mut() = url;

		let popstate = self.inner.popstate.clone();
		self.inner
			.scheduler
			.asap(move || popstate.publish(entry.state));
	}

	/// `go(-1)`
	pub fn back(&self) {
		self.go(-1);
	}

	/// `go(1)`
	pub fn forward(&self) {
		self.go(1);
	}

	/// Subscribe to `popstate`; the callback receives the entry's state
	pub fn on_popstate<F>(&self, callback: F) -> SubscriptionId
	where
		F: Fn(&Value) + 'static,
	{
		self.inner.popstate.subscribe(callback)
	}

	/// The `popstate` observable
	pub fn popstate(&self) -> Observable<Value> {
		self.inner.popstate.clone()
	}

	/// Scroll the viewport
	pub fn scroll_to(&self, x: i64, y: i64) {
		self.inner.scroll.set((x, y));
	}

	/// Current scroll offsets `(x, y)`
	pub fn scroll_position(&self) -> (i64, i64) {
		self.inner.scroll.get()
	}

	/// Default action of following a link: move to `href` and record a new
	/// history entry
	pub fn navigate(&self, href: &str) {
		let url = match self.resolve(href) {
			Ok(url) => url,
			Err(error) => {
				crate::warn_log!("Ignoring navigation to '{}': {}", href, error);
				return;
			}
		};

		let index = self.inner.index.get();
		{
			let mut entries = self.inner.entries.borrow_mut();
			entries.truncate(index + 1);
			entries.push(HistoryEntry {
				url: url.to_string(),
				state: Value::Null,
			});
		}
		self.inner.index.set(index + 1);
		self.inner.navigations.borrow_mut().push(url.to_string());
		*self.inner.location.borrow_mut() = url;
	}

	/// Every URL followed through [`Window::navigate`]
	pub fn navigations(&self) -> Vec<String> {
		self.inner.navigations.borrow().clone()
	}
}

impl fmt::Debug for Window {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Window")
			.field("location", &self.location_href())
			.field("history_length", &self.history_length())
			.finish()
	}
}
