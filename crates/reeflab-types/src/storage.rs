//! Storage collection names for the portal.

/// Collections of persisted documents.
///
/// This enum provides type safety for storage operations by replacing
/// string literals with strongly typed variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreCollection {
	/// Customer orders and their sample lists.
	Orders,
	/// Local mirror of Benchling sample entities.
	BenchlingSamples,
	/// Durable retry queue for external pushes.
	SyncQueue,
	/// Singleton sync coordination document.
	SyncMeta,
}

impl StoreCollection {
	/// Returns the string representation of the collection.
	pub fn as_str(&self) -> &'static str {
		match self {
			StoreCollection::Orders => "orders",
			StoreCollection::BenchlingSamples => "benchling_samples",
			StoreCollection::SyncQueue => "sync_queue",
			StoreCollection::SyncMeta => "sync_meta",
		}
	}
}
