//! Child-list mutation observers
//!
//! Records are queued synchronously as the tree changes and delivered to the
//! observer's callback on the next scheduler tick, batched per observer.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use super::node::Node;
use crate::scheduler::Scheduler;

/// One child-list change
#[derive(Debug, Clone)]
pub struct MutationRecord {
	/// Node whose children changed
	pub target: Node,
	/// Nodes inserted into `target`
	pub added_nodes: Vec<Node>,
	/// Nodes removed from `target`
	pub removed_nodes: Vec<Node>,
}

type ObserverCallback = Box<dyn Fn(Vec<MutationRecord>, &MutationObserver)>;

pub(crate) struct ObserverInner {
	callback: ObserverCallback,
	queue: RefCell<Vec<MutationRecord>>,
	delivery_scheduled: Cell<bool>,
	scheduler: Scheduler,
	targets: RefCell<Vec<Node>>,
}

/// Observer of child-list mutations
///
/// The observer stays active while this handle (or a clone) is alive.
#[derive(Clone)]
pub struct MutationObserver {
	inner: Rc<ObserverInner>,
}

impl MutationObserver {
	/// Create an observer delivering through `scheduler`
	pub fn new<F>(scheduler: &Scheduler, callback: F) -> Self
	where
		F: Fn(Vec<MutationRecord>, &MutationObserver) + 'static,
	{
		Self {
			inner: Rc::new(ObserverInner {
				callback: Box::new(callback),
				queue: RefCell::new(Vec::new()),
				delivery_scheduled: Cell::new(false),
				scheduler: scheduler.clone(),
				targets: RefCell::new(Vec::new()),
			}),
		}
	}

	/// Watch `target`'s child list
	pub fn observe(&self, target: &Node) {
		let already = self.inner.targets.borrow().contains(target);
		if already {
			return;
		}
		target
			.0
			.observers
			.borrow_mut()
			.push(Rc::downgrade(&self.inner));
		self.inner.targets.borrow_mut().push(target.clone());
	}

	/// Stop observing every target and drop queued records
	pub fn disconnect(&self) {
		let targets = std::mem::take(&mut *self.inner.targets.borrow_mut());
		for target in targets {
			target
				.0
				.observers
				.borrow_mut()
				.retain(|observer| !std::ptr::eq(observer.as_ptr(), Rc::as_ptr(&self.inner)));
		}
		self.inner.queue.borrow_mut().clear();
	}

	/// Take the queued records without waiting for delivery
	pub fn take_records(&self) -> Vec<MutationRecord> {
		std::mem::take(&mut *self.inner.queue.borrow_mut())
	}

	/// Whether at least one target is observed
	pub fn is_observing(&self) -> bool {
		!self.inner.targets.borrow().is_empty()
	}

	fn deliver(inner: Rc<ObserverInner>) {
		inner.delivery_scheduled.set(false);
		let records = std::mem::take(&mut *inner.queue.borrow_mut());
		if records.is_empty() {
			return;
		}
		let observer = MutationObserver {
			inner: inner.clone(),
		};
		(inner.callback)(records, &observer);
	}
}

impl fmt::Debug for MutationObserver {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MutationObserver")
			.field("targets", &self.inner.targets.borrow().len())
			.field("queued", &self.inner.queue.borrow().len())
			.finish()
	}
}

/// Queue a record for every observer of `target`.
pub(crate) fn enqueue(target: &Node, added_nodes: Vec<Node>, removed_nodes: Vec<Node>) {
	let observers: Vec<Rc<ObserverInner>> = {
		let mut registered = target.0.observers.borrow_mut();
		registered.retain(|observer| observer.strong_count() > 0);
		registered.iter().filter_map(Weak::upgrade).collect()
	};

	for observer in observers {
		observer.queue.borrow_mut().push(MutationRecord {
			target: target.clone(),
			added_nodes: added_nodes.clone(),
			removed_nodes: removed_nodes.clone(),
		});

		if observer.delivery_scheduled.replace(true) {
			continue;
		}
		let weak = Rc::downgrade(&observer);
		observer.scheduler.asap(move || {
			if let Some(inner) = weak.upgrade() {
				MutationObserver::deliver(inner);
			}
		});
	}
}
