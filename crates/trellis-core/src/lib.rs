//! Trellis Core - framework-independent building blocks
//!
//! This crate holds the pieces of trellis that do not depend on a document
//! model:
//!
//! - [`security`]: HTML escaping and the [`XssSanitizer`] collaborator
//! - [`observable`]: synchronous and asynchronous publish/subscribe channels
//! - [`store`]: the path-keyed reactive [`Store`]
//! - [`logger`]: the [`Logger`] collaborator with a subscribable entry stream
//! - [`storage`]: key/value persistence behind [`KeyValueStorage`]
//!
//! Everything here is single-threaded (`Rc`/`RefCell`): trellis runs on the
//! UI thread of its host and never shares state across threads.

#![warn(missing_docs)]

pub mod logger;
pub mod observable;
pub mod security;
pub mod storage;
pub mod store;

pub use logger::{LogEntry, LogLevel, Logger};
pub use observable::{AsyncObservable, Observable, SubscriptionId};
pub use security::xss::{DefaultSanitizer, XssSanitizer};
pub use storage::{
	KeyValueStorage, MemoryStorage, StorageError, StorageMode, Storages, StoredValue,
};
pub use store::{Store, StoreError};
