//! File-based storage backend implementation for the portal.
//!
//! This module provides a filesystem implementation of the
//! StorageInterface trait. Each collection is a directory and each
//! document a JSON file, giving simple persistence without external
//! dependencies. Writes go through a temporary file and rename so a
//! crash never leaves a half-written document behind.

use crate::{StorageError, StorageInterface};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use tokio::fs;

/// Configuration for the file storage backend.
#[derive(Debug, Deserialize)]
struct FileStorageConfig {
	/// Base directory for collection subdirectories.
	storage_path: String,
}

/// File-based storage implementation.
pub struct FileStorage {
	/// Base directory path for storing collections.
	base_path: PathBuf,
}

impl FileStorage {
	/// Creates a new FileStorage rooted at the given directory.
	pub fn new(base_path: impl Into<PathBuf>) -> Self {
		Self {
			base_path: base_path.into(),
		}
	}

	/// Rejects ids that could escape the collection directory.
	fn validate_segment(segment: &str) -> Result<(), StorageError> {
		if segment.is_empty()
			|| segment.contains(['/', '\\'])
			|| segment == "."
			|| segment == ".."
		{
			return Err(StorageError::Backend(format!(
				"Invalid storage key segment: {:?}",
				segment
			)));
		}
		Ok(())
	}

	fn document_path(&self, collection: &str, id: &str) -> Result<PathBuf, StorageError> {
		Self::validate_segment(collection)?;
		Self::validate_segment(id)?;
		Ok(self
			.base_path
			.join(collection)
			.join(format!("{}.json", id)))
	}
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, collection: &str, id: &str) -> Result<Vec<u8>, StorageError> {
		let path = self.document_path(collection, id)?;
		match fs::read(&path).await {
			Ok(bytes) => Ok(bytes),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn set_bytes(
		&self,
		collection: &str,
		id: &str,
		value: Vec<u8>,
	) -> Result<(), StorageError> {
		let path = self.document_path(collection, id)?;
		let dir = path.parent().expect("document path always has a parent");
		fs::create_dir_all(dir)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;

		// Write-then-rename keeps the document atomic on POSIX filesystems
		let tmp_path = path.with_extension("json.tmp");
		fs::write(&tmp_path, &value)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		fs::rename(&tmp_path, &path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		Ok(())
	}

	async fn delete(&self, collection: &str, id: &str) -> Result<(), StorageError> {
		let path = self.document_path(collection, id)?;
		match fs::remove_file(&path).await {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn exists(&self, collection: &str, id: &str) -> Result<bool, StorageError> {
		let path = self.document_path(collection, id)?;
		Ok(fs::try_exists(&path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?)
	}

	async fn list_ids(&self, collection: &str) -> Result<Vec<String>, StorageError> {
		Self::validate_segment(collection)?;
		let dir = self.base_path.join(collection);

		let mut entries = match fs::read_dir(&dir).await {
			Ok(entries) => entries,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
			Err(e) => return Err(StorageError::Backend(e.to_string())),
		};

		let mut ids = Vec::new();
		while let Some(entry) = entries
			.next_entry()
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?
		{
			let name = entry.file_name();
			let name = name.to_string_lossy();
			if let Some(id) = name.strip_suffix(".json") {
				ids.push(id.to_string());
			}
		}
		ids.sort();
		Ok(ids)
	}
}

/// Factory function to create a file storage backend from configuration.
///
/// Configuration parameters:
/// - `storage_path`: base directory for collection subdirectories
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	let config: FileStorageConfig = config
		.clone()
		.try_into()
		.map_err(|e: toml::de::Error| StorageError::Configuration(e.message().to_string()))?;
	Ok(Box::new(FileStorage::new(config.storage_path)))
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::tempdir;

	#[tokio::test]
	async fn test_set_get_roundtrip() {
		let dir = tempdir().unwrap();
		let storage = FileStorage::new(dir.path());

		storage
			.set_bytes("orders", "ord-1", b"{\"id\":\"ord-1\"}".to_vec())
			.await
			.unwrap();
		let bytes = storage.get_bytes("orders", "ord-1").await.unwrap();
		assert_eq!(bytes, b"{\"id\":\"ord-1\"}".to_vec());
	}

	#[tokio::test]
	async fn test_missing_document_is_not_found() {
		let dir = tempdir().unwrap();
		let storage = FileStorage::new(dir.path());

		let result = storage.get_bytes("orders", "missing").await;
		assert!(matches!(result, Err(StorageError::NotFound)));
		assert!(!storage.exists("orders", "missing").await.unwrap());
	}

	#[tokio::test]
	async fn test_delete_is_idempotent() {
		let dir = tempdir().unwrap();
		let storage = FileStorage::new(dir.path());

		storage
			.set_bytes("sync_queue", "q-1", b"{}".to_vec())
			.await
			.unwrap();
		storage.delete("sync_queue", "q-1").await.unwrap();
		// Second delete of an absent document succeeds
		storage.delete("sync_queue", "q-1").await.unwrap();
	}

	#[tokio::test]
	async fn test_list_ids_skips_foreign_files() {
		let dir = tempdir().unwrap();
		let storage = FileStorage::new(dir.path());

		storage
			.set_bytes("benchling_samples", "AQS-QPCR-0001", b"{}".to_vec())
			.await
			.unwrap();
		storage
			.set_bytes("benchling_samples", "AQS-MTG-0002", b"{}".to_vec())
			.await
			.unwrap();
		// A stray non-JSON file must not surface as a document id
		std::fs::write(
			dir.path().join("benchling_samples").join("notes.txt"),
			b"ignore me",
		)
		.unwrap();

		let ids = storage.list_ids("benchling_samples").await.unwrap();
		assert_eq!(
			ids,
			vec!["AQS-MTG-0002".to_string(), "AQS-QPCR-0001".to_string()]
		);
	}

	#[tokio::test]
	async fn test_path_traversal_rejected() {
		let dir = tempdir().unwrap();
		let storage = FileStorage::new(dir.path());

		let result = storage.get_bytes("orders", "../escape").await;
		assert!(matches!(result, Err(StorageError::Backend(_))));
	}
}
