//! State bindings
//!
//! A [`StateField`] is an accessor pair over one path of either the
//! component's own store or the app store. Reading it the first time
//! subscribes the owning component, so that later writes at that path
//! re-render it.

use std::fmt;
use std::marker::PhantomData;
use std::rc::{Rc, Weak};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use trellis_core::{Store, StoreError};

use super::{Component, ComponentExt};

/// Which store a [`StateField`] reads and writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
	/// The component's own store
	Component,
	/// The app-wide store of the context
	App,
}

impl StoreKind {
	/// Prefix of the binding key
	pub fn as_str(&self) -> &'static str {
		match self {
			StoreKind::Component => "component",
			StoreKind::App => "app",
		}
	}
}

/// Typed, re-rendering accessor for one store path
pub struct StateField<T> {
	component: Weak<dyn Component>,
	kind: StoreKind,
	key: String,
	marker: PhantomData<fn() -> T>,
}

impl<T> Clone for StateField<T> {
	fn clone(&self) -> Self {
		Self {
			component: self.component.clone(),
			kind: self.kind,
			key: self.key.clone(),
			marker: PhantomData,
		}
	}
}

impl<T: Serialize + DeserializeOwned> StateField<T> {
	/// Field over `key` in `component`'s own store
	pub fn component<C: Component>(component: &Rc<C>, key: impl Into<String>) -> Self {
		Self::new(component, StoreKind::Component, key.into())
	}

	/// Field over `key` in the app store
	pub fn app<C: Component>(component: &Rc<C>, key: impl Into<String>) -> Self {
		Self::new(component, StoreKind::App, key.into())
	}

	fn new<C: Component>(component: &Rc<C>, kind: StoreKind, key: String) -> Self {
		Self::from_weak(&Rc::downgrade(component), kind, key)
	}

	/// Field for a component still under construction (see [`Rc::new_cyclic`])
	pub fn from_weak<C: Component>(component: &Weak<C>, kind: StoreKind, key: impl Into<String>) -> Self {
		let component: Weak<dyn Component> = component.clone();
		Self {
			component,
			kind,
			key: key.into(),
			marker: PhantomData,
		}
	}

	/// Store path
	pub fn key(&self) -> &str {
		&self.key
	}

	/// Backing store
	pub fn kind(&self) -> StoreKind {
		self.kind
	}

	fn store(&self, component: &dyn Component) -> Store {
		match self.kind {
			StoreKind::Component => component.state().clone(),
			StoreKind::App => component.context().app_store().clone(),
		}
	}

	/// Current value; the first read binds the component for re-rendering
	///
	/// `None` when unset or when the component is gone.
	pub fn get(&self) -> Result<Option<T>, StoreError> {
		let Some(component) = self.component.upgrade() else {
			return Ok(None);
		};
		let store = self.store(component.as_ref());
		self.bind(&component, &store);
		store.get_state_at(&self.key)
	}

	/// Write the value, notifying subscribers of this path
	pub fn set(&self, value: T) -> Result<(), StoreError> {
		let Some(component) = self.component.upgrade() else {
			return Ok(());
		};
		self.store(component.as_ref()).set_state_at(value, &self.key)
	}

	fn bind(&self, component: &Rc<dyn Component>, store: &Store) {
		let binding = format!("{}-store-{}", self.kind.as_str(), self.key);
		if !component.base().insert_binding(binding) {
			return;
		}

		let weak = Rc::downgrade(component);
		let observable = store.observable_at(&self.key);
		let id = observable.subscribe(move |_value: &Value| {
			let Some(component) = weak.upgrade() else {
				return;
			};
			let route = component.context().router().current_route();
			component.schedule_re_render(route);
		});
		component.base().track_subscription(observable, id);
	}
}

impl<T> fmt::Debug for StateField<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("StateField")
			.field("kind", &self.kind)
			.field("key", &self.key)
			.finish()
	}
}
