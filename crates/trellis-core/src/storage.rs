//! Key/value persistence
//!
//! [`KeyValueStorage`] abstracts the host's session/local storage.
//! [`StoredValue`] layers typed access on top: next to every value it writes a
//! `{key}_storage_type` marker so that plain strings come back verbatim while
//! everything else round-trips through JSON.

use core::cell::{Cell, RefCell};
use std::collections::HashMap;

extern crate alloc;
use alloc::rc::Rc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Suffix of the key holding a stored value's type marker.
pub const STORAGE_TYPE_SUFFIX: &str = "_storage_type";

/// Errors raised by storage backends and typed accessors
#[derive(Debug, Error)]
pub enum StorageError {
	/// The backend refused the write because it is full.
	#[error("storage quota exceeded while writing '{key}'")]
	QuotaExceeded {
		/// Key being written
		key: String,
	},
	/// The value could not be converted to JSON.
	#[error("failed to serialize value for '{key}': {source}")]
	Serialize {
		/// Key being written
		key: String,
		/// Underlying serde error
		#[source]
		source: serde_json::Error,
	},
	/// The stored text does not match the requested type.
	#[error("failed to deserialize value for '{key}': {source}")]
	Deserialize {
		/// Key being read
		key: String,
		/// Underlying serde error
		#[source]
		source: serde_json::Error,
	},
}

/// Which host storage area a value lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageMode {
	/// Cleared when the session ends
	Session,
	/// Survives sessions
	Local,
}

/// String key/value storage backend
pub trait KeyValueStorage {
	/// Value stored at `key`
	fn get(&self, key: &str) -> Option<String>;

	/// Store `value` at `key`
	fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

	/// Remove `key`; removing a missing key is not an error
	fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-memory [`KeyValueStorage`] with an optional byte quota
#[derive(Debug, Default)]
pub struct MemoryStorage {
	entries: RefCell<HashMap<String, String>>,
	quota: Cell<Option<usize>>,
}

impl MemoryStorage {
	/// Create an unbounded storage
	pub fn new() -> Self {
		Self::default()
	}

	/// Create a storage rejecting writes once keys plus values exceed `bytes`
	pub fn with_quota(bytes: usize) -> Self {
		let storage = Self::new();
		storage.quota.set(Some(bytes));
		storage
	}

	/// Number of stored keys
	pub fn len(&self) -> usize {
		self.entries.borrow().len()
	}

	/// Whether nothing is stored
	pub fn is_empty(&self) -> bool {
		self.entries.borrow().is_empty()
	}

	fn used_bytes_without(&self, key: &str) -> usize {
		self.entries
			.borrow()
			.iter()
			.filter(|(k, _)| k.as_str() != key)
			.map(|(k, v)| k.len() + v.len())
			.sum()
	}
}

impl KeyValueStorage for MemoryStorage {
	fn get(&self, key: &str) -> Option<String> {
		self.entries.borrow().get(key).cloned()
	}

	fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
		if let Some(quota) = self.quota.get()
			&& self.used_bytes_without(key) + key.len() + value.len() > quota
		{
			return Err(StorageError::QuotaExceeded {
				key: key.to_string(),
			});
		}
		self.entries
			.borrow_mut()
			.insert(key.to_string(), value.to_string());
		Ok(())
	}

	fn remove(&self, key: &str) -> Result<(), StorageError> {
		self.entries.borrow_mut().remove(key);
		Ok(())
	}
}

/// Session and local storage backends, selected by [`StorageMode`]
#[derive(Clone)]
pub struct Storages {
	session: Rc<dyn KeyValueStorage>,
	local: Rc<dyn KeyValueStorage>,
}

impl Storages {
	/// Build from explicit backends
	pub fn new(session: Rc<dyn KeyValueStorage>, local: Rc<dyn KeyValueStorage>) -> Self {
		Self { session, local }
	}

	/// Two independent in-memory backends
	pub fn in_memory() -> Self {
		Self::new(Rc::new(MemoryStorage::new()), Rc::new(MemoryStorage::new()))
	}

	/// Backend for `mode`
	pub fn for_mode(&self, mode: StorageMode) -> Rc<dyn KeyValueStorage> {
		match mode {
			StorageMode::Session => self.session.clone(),
			StorageMode::Local => self.local.clone(),
		}
	}
}

impl Default for Storages {
	fn default() -> Self {
		Self::in_memory()
	}
}

impl core::fmt::Debug for Storages {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("Storages").finish_non_exhaustive()
	}
}

/// Typed accessor pair for one storage key
///
/// # Example
///
/// ```
/// use std::rc::Rc;
/// use trellis_core::{MemoryStorage, StoredValue};
///
/// let storage = Rc::new(MemoryStorage::new());
/// let greeting: StoredValue<String> = StoredValue::new(storage.clone(), "greeting");
/// greeting.set(&"hello".to_string()).unwrap();
/// assert_eq!(greeting.get().unwrap(), Some("hello".to_string()));
///
/// let count: StoredValue<u32> = StoredValue::new(storage, "count");
/// count.set(&5).unwrap();
/// assert_eq!(count.get().unwrap(), Some(5));
/// ```
pub struct StoredValue<T> {
	storage: Rc<dyn KeyValueStorage>,
	key: String,
	_marker: core::marker::PhantomData<fn() -> T>,
}

impl<T> Clone for StoredValue<T> {
	fn clone(&self) -> Self {
		Self {
			storage: self.storage.clone(),
			key: self.key.clone(),
			_marker: core::marker::PhantomData,
		}
	}
}

impl<T: Serialize + DeserializeOwned> StoredValue<T> {
	/// Bind `key` in `storage`
	pub fn new(storage: Rc<dyn KeyValueStorage>, key: impl Into<String>) -> Self {
		Self {
			storage,
			key: key.into(),
			_marker: core::marker::PhantomData,
		}
	}

	/// Storage key
	pub fn key(&self) -> &str {
		&self.key
	}

	fn type_key(&self) -> String {
		format!("{}{}", self.key, STORAGE_TYPE_SUFFIX)
	}

	/// Read the value
	///
	/// Values marked `string` are returned verbatim. Anything else is parsed
	/// as JSON, and text that is not valid JSON is read as a plain string.
	pub fn get(&self) -> Result<Option<T>, StorageError> {
		let Some(raw) = self.storage.get(&self.key) else {
			return Ok(None);
		};

		let value = match self.storage.get(&self.type_key()).as_deref() {
			Some("string") => Value::String(raw),
			_ => serde_json::from_str(&raw).unwrap_or(Value::String(raw)),
		};

		serde_json::from_value(value)
			.map(Some)
			.map_err(|source| StorageError::Deserialize {
				key: self.key.clone(),
				source,
			})
	}

	/// Write the value together with its type marker
	pub fn set(&self, value: &T) -> Result<(), StorageError> {
		let json = serde_json::to_value(value).map_err(|source| StorageError::Serialize {
			key: self.key.clone(),
			source,
		})?;

		let (type_name, raw) = match json {
			Value::String(text) => ("string", text),
			other => (json_type_name(&other), other.to_string()),
		};

		self.storage.set(&self.type_key(), type_name)?;
		self.storage.set(&self.key, &raw)
	}

	/// Remove the value and its type marker
	pub fn remove(&self) -> Result<(), StorageError> {
		self.storage.remove(&self.type_key())?;
		self.storage.remove(&self.key)
	}
}

fn json_type_name(value: &Value) -> &'static str {
	match value {
		Value::Null => "object",
		Value::Bool(_) => "boolean",
		Value::Number(_) => "number",
		Value::String(_) => "string",
		Value::Array(_) | Value::Object(_) => "object",
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::{fixture, rstest};
	use serde::Deserialize;

	#[fixture]
	fn storage() -> Rc<MemoryStorage> {
		Rc::new(MemoryStorage::new())
	}

	#[derive(Debug, PartialEq, Serialize, Deserialize)]
	struct Settings {
		dark: bool,
	}

	#[rstest]
	fn test_string_is_stored_verbatim(storage: Rc<MemoryStorage>) {
		let value: StoredValue<String> = StoredValue::new(storage.clone(), "name");
		value.set(&"{not json".to_string()).unwrap();

		assert_eq!(storage.get("name").as_deref(), Some("{not json"));
		assert_eq!(storage.get("name_storage_type").as_deref(), Some("string"));
		assert_eq!(value.get().unwrap(), Some("{not json".to_string()));
	}

	#[rstest]
	fn test_numeric_looking_string_stays_string(storage: Rc<MemoryStorage>) {
		let value: StoredValue<String> = StoredValue::new(storage, "zip");
		value.set(&"01234".to_string()).unwrap();
		assert_eq!(value.get().unwrap(), Some("01234".to_string()));
	}

	#[rstest]
	fn test_object_round_trips_as_json(storage: Rc<MemoryStorage>) {
		let value: StoredValue<Settings> = StoredValue::new(storage.clone(), "settings");
		value.set(&Settings { dark: true }).unwrap();

		assert_eq!(storage.get("settings_storage_type").as_deref(), Some("object"));
		assert_eq!(value.get().unwrap(), Some(Settings { dark: true }));
	}

	#[rstest]
	fn test_unmarked_non_json_reads_as_string(storage: Rc<MemoryStorage>) {
		storage.set("legacy", "plain words").unwrap();
		let value: StoredValue<String> = StoredValue::new(storage, "legacy");
		assert_eq!(value.get().unwrap(), Some("plain words".to_string()));
	}

	#[rstest]
	fn test_missing_key_is_none(storage: Rc<MemoryStorage>) {
		let value: StoredValue<u8> = StoredValue::new(storage, "nothing");
		assert_eq!(value.get().unwrap(), None);
	}

	#[rstest]
	fn test_remove_clears_marker(storage: Rc<MemoryStorage>) {
		let value: StoredValue<u8> = StoredValue::new(storage.clone(), "n");
		value.set(&1).unwrap();
		value.remove().unwrap();
		assert!(storage.is_empty());
	}

	#[rstest]
	fn test_quota_exceeded() {
		let storage = MemoryStorage::with_quota(8);
		assert!(storage.set("k", "1234").is_ok());
		let err = storage.set("other", "1234").unwrap_err();
		assert!(matches!(err, StorageError::QuotaExceeded { ref key } if key == "other"));
	}

	#[rstest]
	fn test_modes_are_independent() {
		let storages = Storages::in_memory();
		storages
			.for_mode(StorageMode::Session)
			.set("k", "v")
			.unwrap();
		assert_eq!(storages.for_mode(StorageMode::Local).get("k"), None);
	}
}
