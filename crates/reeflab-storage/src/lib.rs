//! Storage module for the reeflab portal backend.
//!
//! This module provides abstractions for persistent storage of portal
//! data, supporting different backend implementations such as in-memory
//! or file-based document stores. Documents are grouped into named
//! collections and addressed by id; atomicity is per document write.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod memory;
}

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	/// Error that occurs when a requested document is not found.
	#[error("Not found")]
	NotFound,
	/// Error that occurs during serialization/deserialization.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Error that occurs in the storage backend.
	#[error("Backend error: {0}")]
	Backend(String),
	/// Error that occurs during configuration parsing.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the low-level interface for storage backends.
///
/// This trait must be implemented by any storage backend that wants to
/// integrate with the portal. It provides collection/id keyed byte
/// operations plus collection listing for queue and mirror scans.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Retrieves raw bytes for the given document.
	async fn get_bytes(&self, collection: &str, id: &str) -> Result<Vec<u8>, StorageError>;

	/// Stores raw bytes, creating or replacing the document.
	async fn set_bytes(
		&self,
		collection: &str,
		id: &str,
		value: Vec<u8>,
	) -> Result<(), StorageError>;

	/// Deletes the document. Deleting an absent document is a no-op.
	async fn delete(&self, collection: &str, id: &str) -> Result<(), StorageError>;

	/// Checks if a document exists.
	async fn exists(&self, collection: &str, id: &str) -> Result<bool, StorageError>;

	/// Lists the ids of all documents in a collection.
	async fn list_ids(&self, collection: &str) -> Result<Vec<String>, StorageError>;
}

/// Type alias for storage factory functions.
///
/// This is the function signature that all storage implementations must
/// provide to create instances of their storage interface.
pub type StorageFactory = fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>;

/// Get all registered storage implementations.
///
/// Returns a vector of (name, factory) tuples for all available storage
/// implementations, used when wiring the service from configuration.
pub fn get_all_implementations() -> Vec<(&'static str, StorageFactory)> {
	use implementations::{file, memory};

	vec![
		("file", file::create_storage as StorageFactory),
		("memory", memory::create_storage as StorageFactory),
	]
}

/// High-level storage service that provides typed operations.
///
/// The StorageService wraps a low-level storage backend and provides
/// convenient methods for storing and retrieving typed documents with
/// automatic JSON serialization/deserialization.
pub struct StorageService {
	/// The underlying storage backend implementation.
	backend: Box<dyn StorageInterface>,
}

impl StorageService {
	/// Creates a new StorageService with the specified backend.
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		Self { backend }
	}

	/// Stores a serializable document, creating or replacing it.
	pub async fn store<T: Serialize>(
		&self,
		collection: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		let bytes =
			serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend.set_bytes(collection, id, bytes).await
	}

	/// Retrieves and deserializes a document.
	pub async fn retrieve<T: DeserializeOwned>(
		&self,
		collection: &str,
		id: &str,
	) -> Result<T, StorageError> {
		let bytes = self.backend.get_bytes(collection, id).await?;
		serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization(e.to_string()))
	}

	/// Updates an existing document.
	///
	/// This method first checks that the document exists, making it
	/// semantically different from store() which creates or overwrites.
	pub async fn update<T: Serialize>(
		&self,
		collection: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		if !self.backend.exists(collection, id).await? {
			return Err(StorageError::NotFound);
		}
		let bytes =
			serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend.set_bytes(collection, id, bytes).await
	}

	/// Removes a document from storage.
	pub async fn remove(&self, collection: &str, id: &str) -> Result<(), StorageError> {
		self.backend.delete(collection, id).await
	}

	/// Checks if a document exists.
	pub async fn exists(&self, collection: &str, id: &str) -> Result<bool, StorageError> {
		self.backend.exists(collection, id).await
	}

	/// Retrieves and deserializes every document in a collection.
	///
	/// Documents deleted between the listing and the read are skipped
	/// rather than failing the whole scan.
	pub async fn retrieve_all<T: DeserializeOwned>(
		&self,
		collection: &str,
	) -> Result<Vec<T>, StorageError> {
		let ids = self.backend.list_ids(collection).await?;
		let mut documents = Vec::with_capacity(ids.len());
		for id in ids {
			match self.backend.get_bytes(collection, &id).await {
				Ok(bytes) => {
					let document = serde_json::from_slice(&bytes)
						.map_err(|e| StorageError::Serialization(e.to_string()))?;
					documents.push(document);
				},
				Err(StorageError::NotFound) => continue,
				Err(e) => return Err(e),
			}
		}
		Ok(documents)
	}
}
