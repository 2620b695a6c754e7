//! Observable - publish/subscribe channels
//!
//! Two flavours share the same subscription bookkeeping:
//!
//! - [`Observable<T>`]: subscribers are plain closures invoked synchronously
//!   by [`Observable::publish`].
//! - [`AsyncObservable<T>`]: subscribers return futures, and
//!   [`AsyncObservable::publish`] awaits each of them in subscription order
//!   before the next one starts.
//!
//! Both remember the last published value and hand out [`SubscriptionId`]s
//! that can later be passed to `unsubscribe`.
//!
//! ## Example
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use trellis_core::Observable;
//!
//! let seen = Rc::new(Cell::new(0));
//! let observable = Observable::new();
//!
//! let seen_clone = seen.clone();
//! let id = observable.subscribe(move |value: &i32| seen_clone.set(*value));
//!
//! observable.publish(7);
//! assert_eq!(seen.get(), 7);
//!
//! assert!(observable.unsubscribe(id));
//! observable.publish(8);
//! assert_eq!(seen.get(), 7);
//! ```

use core::cell::{Cell, RefCell};
use core::fmt;
use core::future::Future;

extern crate alloc;
use alloc::rc::Rc;

use futures::FutureExt;
use futures::future::LocalBoxFuture;

/// Handle identifying one subscription on an observable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
	/// Raw numeric value, unique per observable.
	pub fn as_u64(&self) -> u64 {
		self.0
	}
}

impl fmt::Display for SubscriptionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "subscription-{}", self.0)
	}
}

/// Ordered subscriber list with monotonically increasing ids.
///
/// Entries are kept sorted by descending priority; equal priorities keep
/// subscription order.
struct Subscribers<S> {
	next_id: Cell<u64>,
	entries: RefCell<Vec<(SubscriptionId, u8, S)>>,
}

impl<S: Clone> Subscribers<S> {
	fn new() -> Self {
		Self {
			next_id: Cell::new(0),
			entries: RefCell::new(Vec::new()),
		}
	}

	fn add(&self, subscriber: S, priority: u8) -> SubscriptionId {
		let id = SubscriptionId(self.next_id.get());
		self.next_id.set(self.next_id.get() + 1);
		let mut entries = self.entries.borrow_mut();
		let position = entries
			.iter()
			.position(|(_, existing, _)| *existing < priority)
			.unwrap_or(entries.len());
		entries.insert(position, (id, priority, subscriber));
		id
	}

	fn remove(&self, id: SubscriptionId) -> bool {
		let mut entries = self.entries.borrow_mut();
		let before = entries.len();
		entries.retain(|(entry_id, _, _)| *entry_id != id);
		entries.len() != before
	}

	/// Copy of the current list so callbacks may (un)subscribe while running.
	fn snapshot(&self) -> Vec<(SubscriptionId, S)> {
		self.entries
			.borrow()
			.iter()
			.map(|(id, _, subscriber)| (*id, subscriber.clone()))
			.collect()
	}

	fn contains(&self, id: SubscriptionId) -> bool {
		self.entries.borrow().iter().any(|(entry_id, _, _)| *entry_id == id)
	}

	fn len(&self) -> usize {
		self.entries.borrow().len()
	}

	fn clear(&self) {
		self.entries.borrow_mut().clear();
	}
}

type SyncCallback<T> = Rc<dyn Fn(&T)>;

struct ObservableInner<T> {
	subscribers: Subscribers<SyncCallback<T>>,
	current: RefCell<Option<T>>,
}

/// Synchronous observable
///
/// Cloning yields another handle to the same subscriber list.
pub struct Observable<T: 'static> {
	inner: Rc<ObservableInner<T>>,
}

impl<T: 'static> Clone for Observable<T> {
	fn clone(&self) -> Self {
		Self {
			inner: self.inner.clone(),
		}
	}
}

impl<T: 'static> Default for Observable<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T: 'static> Observable<T> {
	/// Create an observable with no subscribers and no current value
	pub fn new() -> Self {
		Self {
			inner: Rc::new(ObservableInner {
				subscribers: Subscribers::new(),
				current: RefCell::new(None),
			}),
		}
	}

	/// Register a subscriber and return its handle
	pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
	where
		F: Fn(&T) + 'static,
	{
		self.inner.subscribers.add(Rc::new(callback), 0)
	}

	/// Remove a subscriber. Returns `false` when the id was unknown.
	pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
		self.inner.subscribers.remove(id)
	}

	/// Whether `id` is still subscribed
	pub fn is_subscribed(&self, id: SubscriptionId) -> bool {
		self.inner.subscribers.contains(id)
	}

	/// Store `value` as current and invoke every subscriber in order
	pub fn publish(&self, value: T)
	where
		T: Clone,
	{
		*self.inner.current.borrow_mut() = Some(value.clone());

		for (id, callback) in self.inner.subscribers.snapshot() {
			// A subscriber earlier in this pass may have removed this one.
			if !self.inner.subscribers.contains(id) {
				continue;
			}
			callback(&value);
		}
	}

	/// Last published value
	pub fn current(&self) -> Option<T>
	where
		T: Clone,
	{
		self.inner.current.borrow().clone()
	}

	/// Number of live subscriptions
	pub fn subscriber_count(&self) -> usize {
		self.inner.subscribers.len()
	}

	/// Drop every subscription
	pub fn cancel(&self) {
		self.inner.subscribers.clear();
	}
}

impl<T: fmt::Debug + 'static> fmt::Debug for Observable<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Observable")
			.field("subscribers", &self.subscriber_count())
			.field("current", &self.inner.current.borrow())
			.finish()
	}
}

type AsyncCallback<T> = Rc<dyn Fn(T) -> LocalBoxFuture<'static, ()>>;

struct AsyncObservableInner<T> {
	subscribers: Subscribers<AsyncCallback<T>>,
	current: RefCell<Option<T>>,
}

/// Observable whose subscribers are awaited one after another
pub struct AsyncObservable<T: 'static> {
	inner: Rc<AsyncObservableInner<T>>,
}

impl<T: 'static> Clone for AsyncObservable<T> {
	fn clone(&self) -> Self {
		Self {
			inner: self.inner.clone(),
		}
	}
}

impl<T: Clone + 'static> Default for AsyncObservable<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T: Clone + 'static> AsyncObservable<T> {
	/// Create an observable with no subscribers and no current value
	pub fn new() -> Self {
		Self {
			inner: Rc::new(AsyncObservableInner {
				subscribers: Subscribers::new(),
				current: RefCell::new(None),
			}),
		}
	}

	/// Register an asynchronous subscriber
	///
	/// The callback receives its own clone of every published value.
	pub fn subscribe<F, Fut>(&self, callback: F) -> SubscriptionId
	where
		F: Fn(T) -> Fut + 'static,
		Fut: Future<Output = ()> + 'static,
	{
		self.subscribe_with_priority(0, callback)
	}

	/// Register an asynchronous subscriber ahead of every subscriber with a
	/// lower `priority`
	///
	/// Plain [`subscribe`](Self::subscribe) uses priority `0`; equal
	/// priorities are awaited in subscription order.
	pub fn subscribe_with_priority<F, Fut>(&self, priority: u8, callback: F) -> SubscriptionId
	where
		F: Fn(T) -> Fut + 'static,
		Fut: Future<Output = ()> + 'static,
	{
		let callback: AsyncCallback<T> = Rc::new(move |value| callback(value).boxed_local());
		self.inner.subscribers.add(callback, priority)
	}

	/// Remove a subscriber. Returns `false` when the id was unknown.
	pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
		self.inner.subscribers.remove(id)
	}

	/// Whether `id` is still subscribed
	pub fn is_subscribed(&self, id: SubscriptionId) -> bool {
		self.inner.subscribers.contains(id)
	}

	/// Store `value` as current and await every subscriber in order
	pub async fn publish(&self, value: T) {
		*self.inner.current.borrow_mut() = Some(value.clone());

		for (id, callback) in self.inner.subscribers.snapshot() {
			if !self.inner.subscribers.contains(id) {
				continue;
			}
			callback(value.clone()).await;
		}
	}

	/// Last published value
	pub fn current(&self) -> Option<T> {
		self.inner.current.borrow().clone()
	}

	/// Number of live subscriptions
	pub fn subscriber_count(&self) -> usize {
		self.inner.subscribers.len()
	}

	/// Drop every subscription
	pub fn cancel(&self) {
		self.inner.subscribers.clear();
	}
}

impl<T: 'static> fmt::Debug for AsyncObservable<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("AsyncObservable")
			.field("subscribers", &self.inner.subscribers.len())
			.finish()
	}
}
