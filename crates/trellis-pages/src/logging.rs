//! Logging abstraction layer for trellis-pages
//!
//! Development-time logging macros. Output goes through `tracing`, so any
//! subscriber the host installs (console bridge, `tracing-subscriber`, ...)
//! receives it. All macros are no-ops in release builds.
//!
//! ## Macro Overview
//!
//! | Macro | Debug Assertions | Feature Required | Level |
//! |-------|------------------|------------------|-------|
//! | `debug_log!` | Required | `debug-hooks` | `DEBUG` |
//! | `info_log!` | Required | None | `INFO` |
//! | `warn_log!` | Required | None | `WARN` |
//! | `error_log!` | Required | None | `ERROR` |
//!
//! ## Example
//!
//! ```ignore
//! use trellis_pages::{debug_log, info_log, warn_log, error_log};
//!
//! // Only logged when both `debug-hooks` feature and `debug_assertions` are enabled
//! debug_log!("Binding handler on {}", id);
//!
//! info_log!("Component mounted");
//! warn_log!("Route {} matched no page", path);
//! error_log!("Failed to render: {}", error);
//! ```

#[doc(hidden)]
pub use tracing as __tracing;

/// Logs a debug message (requires `debug-hooks` feature + `debug_assertions`)
///
/// This macro is for internal framework diagnostics.
/// It compiles to a no-op when conditions are not met.
#[macro_export]
#[cfg(all(debug_assertions, feature = "debug-hooks"))]
macro_rules! debug_log {
	($($arg:tt)*) => {{
		$crate::logging::__tracing::debug!(target: "trellis_pages", "{}", format!($($arg)*));
	}};
}

/// No-op debug_log when conditions are not met
#[macro_export]
#[cfg(not(all(debug_assertions, feature = "debug-hooks")))]
macro_rules! debug_log {
	($($arg:tt)*) => {{}};
}

/// Logs an info message (requires `debug_assertions`)
#[macro_export]
#[cfg(debug_assertions)]
macro_rules! info_log {
	($($arg:tt)*) => {{
		$crate::logging::__tracing::info!(target: "trellis_pages", "{}", format!($($arg)*));
	}};
}

/// No-op info_log in release builds
#[macro_export]
#[cfg(not(debug_assertions))]
macro_rules! info_log {
	($($arg:tt)*) => {{}};
}

/// Logs a warning message (requires `debug_assertions`)
///
/// The app shell forwards logger entries here in development mode.
#[macro_export]
#[cfg(debug_assertions)]
macro_rules! warn_log {
	($($arg:tt)*) => {{
		$crate::logging::__tracing::warn!(target: "trellis_pages", "{}", format!($($arg)*));
	}};
}

/// No-op warn_log in release builds
#[macro_export]
#[cfg(not(debug_assertions))]
macro_rules! warn_log {
	($($arg:tt)*) => {{}};
}

/// Logs an error message (requires `debug_assertions`)
#[macro_export]
#[cfg(debug_assertions)]
macro_rules! error_log {
	($($arg:tt)*) => {{
		$crate::logging::__tracing::error!(target: "trellis_pages", "{}", format!($($arg)*));
	}};
}

/// No-op error_log in release builds
#[macro_export]
#[cfg(not(debug_assertions))]
macro_rules! error_log {
	($($arg:tt)*) => {{}};
}
