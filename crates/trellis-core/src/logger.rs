//! Structured logger collaborator
//!
//! Every entry is emitted as a `tracing` event and published on
//! [`Logger::entry_logged`] so hosts (or the app shell in development mode)
//! can mirror it elsewhere.

use core::cell::RefCell;
use core::fmt;

extern crate alloc;
use alloc::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::observable::Observable;

/// Severity of a [`LogEntry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
	/// Fine-grained diagnostics
	Trace,
	/// Normal operation
	Info,
	/// Something unexpected that was recovered from
	Warning,
	/// An operation failed
	Error,
}

impl fmt::Display for LogLevel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			LogLevel::Trace => "trace",
			LogLevel::Info => "info",
			LogLevel::Warning => "warning",
			LogLevel::Error => "error",
		};
		f.write_str(name)
	}
}

/// One logged message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
	/// Human readable message
	pub message: String,
	/// Severity
	pub level: LogLevel,
	/// Optional origin (component id, module, ...)
	pub source: Option<String>,
}

impl LogEntry {
	/// Create an entry without a source
	pub fn new(message: impl Into<String>, level: LogLevel) -> Self {
		Self {
			message: message.into(),
			level,
			source: None,
		}
	}

	/// Attach a source
	pub fn with_source(mut self, source: impl Into<String>) -> Self {
		self.source = Some(source.into());
		self
	}
}

impl fmt::Display for LogEntry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.source {
			Some(source) => write!(f, "[{}] {}: {}", self.level, source, self.message),
			None => write!(f, "[{}] {}", self.level, self.message),
		}
	}
}

#[derive(Default)]
struct LoggerInner {
	entries: RefCell<Vec<LogEntry>>,
	entry_logged: Observable<LogEntry>,
}

/// Logger handle; clones share entries and subscribers
#[derive(Clone, Default)]
pub struct Logger {
	inner: Rc<LoggerInner>,
}

impl Logger {
	/// Create an empty logger
	pub fn new() -> Self {
		Self::default()
	}

	/// Record `entry`, emit it through `tracing` and notify subscribers
	pub fn log(&self, entry: LogEntry) {
		let source = entry.source.as_deref().unwrap_or("trellis");
		match entry.level {
			LogLevel::Trace => tracing::trace!(source, "{}", entry.message),
			LogLevel::Info => tracing::info!(source, "{}", entry.message),
			LogLevel::Warning => tracing::warn!(source, "{}", entry.message),
			LogLevel::Error => tracing::error!(source, "{}", entry.message),
		}

		self.inner.entries.borrow_mut().push(entry.clone());
		self.inner.entry_logged.publish(entry);
	}

	/// Log an info message
	pub fn info(&self, message: impl Into<String>) {
		self.log(LogEntry::new(message, LogLevel::Info));
	}

	/// Log a warning
	pub fn warn(&self, message: impl Into<String>) {
		self.log(LogEntry::new(message, LogLevel::Warning));
	}

	/// Log an error
	pub fn error(&self, message: impl Into<String>) {
		self.log(LogEntry::new(message, LogLevel::Error));
	}

	/// Observable publishing every new entry
	pub fn entry_logged(&self) -> Observable<LogEntry> {
		self.inner.entry_logged.clone()
	}

	/// All entries logged so far
	pub fn entries(&self) -> Vec<LogEntry> {
		self.inner.entries.borrow().clone()
	}

	/// Forget recorded entries (subscribers are kept)
	pub fn clear(&self) {
		self.inner.entries.borrow_mut().clear();
	}
}

impl fmt::Debug for Logger {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Logger")
			.field("entries", &self.inner.entries.borrow().len())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_log_records_and_publishes() {
		let logger = Logger::new();
		let seen = Rc::new(RefCell::new(Vec::new()));

		let seen_clone = seen.clone();
		logger
			.entry_logged()
			.subscribe(move |entry: &LogEntry| seen_clone.borrow_mut().push(entry.level));

		logger.info("started");
		logger.error("failed");

		assert_eq!(*seen.borrow(), vec![LogLevel::Info, LogLevel::Error]);
		assert_eq!(logger.entries().len(), 2);
	}

	#[rstest]
	#[case(LogEntry::new("hi", LogLevel::Info), "[info] hi")]
	#[case(LogEntry::new("hi", LogLevel::Warning).with_source("router"), "[warning] router: hi")]
	fn test_entry_display(#[case] entry: LogEntry, #[case] expected: &str) {
		assert_eq!(entry.to_string(), expected);
	}

	#[rstest]
	fn test_clear_keeps_subscribers() {
		let logger = Logger::new();
		logger.entry_logged().subscribe(|_| {});
		logger.warn("x");
		logger.clear();
		assert!(logger.entries().is_empty());
		assert_eq!(logger.entry_logged().subscriber_count(), 1);
	}
}
