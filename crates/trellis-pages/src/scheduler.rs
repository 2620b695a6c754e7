//! Cooperative scheduler
//!
//! Work queued with [`Scheduler::asap`] or [`Scheduler::spawn`] runs after
//! the current synchronous work, when the host (or a test) drives the queue
//! with [`Scheduler::run_until_stalled`]. This is the "next tick" of the UI
//! thread: deferred event binding, mutation-record delivery, scroll
//! restoration and state-triggered re-renders all go through it.
//!
//! ## Example
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use trellis_pages::Scheduler;
//!
//! let scheduler = Scheduler::new();
//! let ran = Rc::new(Cell::new(false));
//!
//! let ran_clone = ran.clone();
//! scheduler.asap(move || ran_clone.set(true));
//! assert!(!ran.get());
//!
//! scheduler.run_until_stalled();
//! assert!(ran.get());
//! ```

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

use futures::executor::{LocalPool, LocalSpawner};
use futures::task::LocalSpawnExt;

struct SchedulerInner {
	pool: RefCell<LocalPool>,
	spawner: LocalSpawner,
}

/// Handle to a single-threaded task queue; clones share the queue
#[derive(Clone)]
pub struct Scheduler {
	inner: Rc<SchedulerInner>,
}

impl Default for Scheduler {
	fn default() -> Self {
		Self::new()
	}
}

impl Scheduler {
	/// Create an empty scheduler
	pub fn new() -> Self {
		let pool = LocalPool::new();
		let spawner = pool.spawner();
		Self {
			inner: Rc::new(SchedulerInner {
				pool: RefCell::new(pool),
				spawner,
			}),
		}
	}

	/// Run `task` on the next tick
	pub fn asap<F>(&self, task: F)
	where
		F: FnOnce() + 'static,
	{
		self.spawn(async move { task() });
	}

	/// Run `future` to completion on the queue
	pub fn spawn<Fut>(&self, future: Fut)
	where
		Fut: Future<Output = ()> + 'static,
	{
		if let Err(error) = self.inner.spawner.spawn_local(future) {
			crate::error_log!("Failed to queue task: {}", error);
		}
	}

	/// Run queued work, including work queued while running, until nothing
	/// can make progress
	///
	/// Must not be called from inside a queued task.
	pub fn run_until_stalled(&self) {
		match self.inner.pool.try_borrow_mut() {
			Ok(mut pool) => pool.run_until_stalled(),
			Err(_) => crate::warn_log!("Scheduler drained re-entrantly; ignoring"),
		}
	}

	/// Run `future` to completion on the calling thread without draining the
	/// queue
	///
	/// Must not be called from inside a queued task.
	pub fn block_on<Fut: Future>(&self, future: Fut) -> Fut::Output {
		futures::executor::block_on(future)
	}
}

impl fmt::Debug for Scheduler {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Scheduler").finish_non_exhaustive()
	}
}
