//! Reactive store
//!
//! A [`Store`] is a flat map from path to [`serde_json::Value`], paired with a
//! lazily created [`Observable`] per path. Writing a path publishes the new
//! value to that path's observers only.

use core::cell::RefCell;
use std::collections::HashMap;

extern crate alloc;
use alloc::rc::Rc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::observable::Observable;

/// Errors raised while moving typed values in and out of a [`Store`]
#[derive(Debug, Error)]
pub enum StoreError {
	/// The value could not be converted to JSON.
	#[error("failed to serialize state at '{path}': {source}")]
	Serialize {
		/// Store path being written
		path: String,
		/// Underlying serde error
		#[source]
		source: serde_json::Error,
	},
	/// The stored JSON does not match the requested type.
	#[error("failed to deserialize state at '{path}': {source}")]
	Deserialize {
		/// Store path being read
		path: String,
		/// Underlying serde error
		#[source]
		source: serde_json::Error,
	},
}

#[derive(Default)]
struct StoreInner {
	values: RefCell<HashMap<String, Value>>,
	observables: RefCell<HashMap<String, Observable<Value>>>,
}

/// Path-keyed reactive state container
///
/// `Store` is a cheap handle: clones share the same state.
#[derive(Clone, Default)]
pub struct Store {
	inner: Rc<StoreInner>,
}

impl Store {
	/// Create an empty store
	pub fn new() -> Self {
		Self::default()
	}

	/// Create a store pre-populated with `state`
	///
	/// No observer exists yet, so nothing is notified.
	pub fn with_state(state: HashMap<String, Value>) -> Self {
		let store = Self::new();
		*store.inner.values.borrow_mut() = state;
		store
	}

	/// Read the value at `path` as `T`
	///
	/// Returns `Ok(None)` for an unset path.
	///
	/// # Example
	///
	/// ```
	/// use trellis_core::Store;
	///
	/// let store = Store::new();
	/// assert_eq!(store.get_state_at::<i32>("count").unwrap(), None);
	///
	/// store.set_state_at(3, "count").unwrap();
	/// assert_eq!(store.get_state_at::<i32>("count").unwrap(), Some(3));
	/// ```
	pub fn get_state_at<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, StoreError> {
		self.value_at(path)
			.map(|value| {
				serde_json::from_value(value).map_err(|source| StoreError::Deserialize {
					path: path.to_string(),
					source,
				})
			})
			.transpose()
	}

	/// Raw JSON value at `path`
	pub fn value_at(&self, path: &str) -> Option<Value> {
		self.inner.values.borrow().get(path).cloned()
	}

	/// Write `value` at `path` and notify that path's observers
	pub fn set_state_at<T: Serialize>(&self, value: T, path: &str) -> Result<(), StoreError> {
		let value = serde_json::to_value(value).map_err(|source| StoreError::Serialize {
			path: path.to_string(),
			source,
		})?;
		self.set_value_at(value, path);
		Ok(())
	}

	/// Write a raw JSON value at `path` and notify that path's observers
	pub fn set_value_at(&self, value: Value, path: &str) {
		tracing::trace!(path, "store write");
		self.inner
			.values
			.borrow_mut()
			.insert(path.to_string(), value.clone());
		self.observable_at(path).publish(value);
	}

	/// Observable for `path`, created on first access and reused afterwards
	pub fn observable_at(&self, path: &str) -> Observable<Value> {
		self.inner
			.observables
			.borrow_mut()
			.entry(path.to_string())
			.or_default()
			.clone()
	}

	/// Number of subscribers observing `path`
	pub fn subscriber_count(&self, path: &str) -> usize {
		self.inner
			.observables
			.borrow()
			.get(path)
			.map_or(0, Observable::subscriber_count)
	}

	/// Snapshot of the whole store
	pub fn state(&self) -> HashMap<String, Value> {
		self.inner.values.borrow().clone()
	}

	/// Replace the whole store
	///
	/// Every path whose value changed (including removed paths, which are
	/// published as `null`) notifies its existing observers.
	pub fn set_state(&self, state: HashMap<String, Value>) {
		let previous = core::mem::replace(&mut *self.inner.values.borrow_mut(), state.clone());

		let observed: Vec<(String, Observable<Value>)> = self
			.inner
			.observables
			.borrow()
			.iter()
			.map(|(path, observable)| (path.clone(), observable.clone()))
			.collect();

		for (path, observable) in observed {
			let old = previous.get(&path);
			let new = state.get(&path);
			if old != new {
				observable.publish(new.cloned().unwrap_or(Value::Null));
			}
		}
	}
}

impl core::fmt::Debug for Store {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("Store")
			.field("values", &self.inner.values.borrow())
			.finish()
	}
}
