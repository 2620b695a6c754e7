//! Framework-independent building blocks.
//!
//! Sanitizing, observables, the reactive store, the logger and key/value
//! storage.
//!
//! # Examples
//!
//! ```rust
//! use trellis::core::Store;
//!
//! let store = Store::new();
//! store.set_state_at("dark", "theme").unwrap();
//! assert_eq!(store.get_state_at::<String>("theme").unwrap().as_deref(), Some("dark"));
//! ```

pub use trellis_core::*;
