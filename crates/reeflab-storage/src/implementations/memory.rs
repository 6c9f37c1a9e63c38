//! In-memory storage backend implementation for the portal.
//!
//! This module provides a memory-based implementation of the
//! StorageInterface trait, useful for testing and development scenarios
//! where persistence is not required.

use crate::{StorageError, StorageInterface};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory storage implementation.
///
/// Documents live in a nested HashMap keyed by collection then id,
/// providing fast access but no persistence across restarts.
pub struct MemoryStorage {
	/// The in-memory store protected by a read-write lock.
	store: Arc<RwLock<HashMap<String, HashMap<String, Vec<u8>>>>>,
}

impl MemoryStorage {
	/// Creates a new MemoryStorage instance.
	pub fn new() -> Self {
		Self {
			store: Arc::new(RwLock::new(HashMap::new())),
		}
	}
}

impl Default for MemoryStorage {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl StorageInterface for MemoryStorage {
	async fn get_bytes(&self, collection: &str, id: &str) -> Result<Vec<u8>, StorageError> {
		let store = self.store.read().await;
		store
			.get(collection)
			.and_then(|documents| documents.get(id))
			.cloned()
			.ok_or(StorageError::NotFound)
	}

	async fn set_bytes(
		&self,
		collection: &str,
		id: &str,
		value: Vec<u8>,
	) -> Result<(), StorageError> {
		let mut store = self.store.write().await;
		store
			.entry(collection.to_string())
			.or_default()
			.insert(id.to_string(), value);
		Ok(())
	}

	async fn delete(&self, collection: &str, id: &str) -> Result<(), StorageError> {
		let mut store = self.store.write().await;
		if let Some(documents) = store.get_mut(collection) {
			documents.remove(id);
		}
		Ok(())
	}

	async fn exists(&self, collection: &str, id: &str) -> Result<bool, StorageError> {
		let store = self.store.read().await;
		Ok(store
			.get(collection)
			.is_some_and(|documents| documents.contains_key(id)))
	}

	async fn list_ids(&self, collection: &str) -> Result<Vec<String>, StorageError> {
		let store = self.store.read().await;
		let mut ids: Vec<String> = store
			.get(collection)
			.map(|documents| documents.keys().cloned().collect())
			.unwrap_or_default();
		ids.sort();
		Ok(ids)
	}
}

/// Factory function to create a memory storage backend from configuration.
///
/// Memory storage requires no configuration parameters.
pub fn create_storage(_config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	Ok(Box::new(MemoryStorage::new()))
}
