//! Order state machine over the persisted document store.
//!
//! All order mutations flow through `update_order_with` so every write
//! refreshes `updated_at` and happens as a single document replacement.
//! Guarded status transitions additionally check ownership and the
//! static transition table before mutating anything.

use crate::state::transition::{is_transition_allowed, transition_label};
use crate::{epoch_secs, CoreError};
use reeflab_storage::{StorageError, StorageService};
use reeflab_types::{AuthContext, Order, OrderStatus, StoreCollection};
use std::sync::Arc;
use tracing::info;

/// Applies guarded status transitions and closure-based updates to
/// persisted orders.
pub struct OrderStateMachine {
	storage: Arc<StorageService>,
}

impl OrderStateMachine {
	/// Creates a state machine backed by the given storage service.
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}

	/// Loads an order by id.
	pub async fn get_order(&self, order_id: &str) -> Result<Order, CoreError> {
		self.storage
			.retrieve(StoreCollection::Orders.as_str(), order_id)
			.await
			.map_err(|e| match e {
				StorageError::NotFound => {
					CoreError::NotFound(format!("Order not found: {}", order_id))
				},
				other => other.into(),
			})
	}

	/// Lists every persisted order.
	pub async fn get_all_orders(&self) -> Result<Vec<Order>, CoreError> {
		Ok(self
			.storage
			.retrieve_all(StoreCollection::Orders.as_str())
			.await?)
	}

	/// Persists a new order, replacing any existing document with the
	/// same id.
	pub async fn store_order(&self, order: &Order) -> Result<(), CoreError> {
		self.storage
			.store(StoreCollection::Orders.as_str(), &order.id, order)
			.await?;
		Ok(())
	}

	/// Loads an order, applies the mutation, stamps `updated_at`, and
	/// writes the result back as one document replacement.
	pub async fn update_order_with<F>(&self, order_id: &str, mutate: F) -> Result<Order, CoreError>
	where
		F: FnOnce(&mut Order),
	{
		let mut order = self.get_order(order_id).await?;
		mutate(&mut order);
		order.updated_at = epoch_secs();
		self.storage
			.update(StoreCollection::Orders.as_str(), order_id, &order)
			.await?;
		Ok(order)
	}

	/// Applies a status transition on behalf of the caller.
	///
	/// The caller must own the order or be an administrator, and the
	/// transition must appear in the static table with the caller's
	/// privilege level. A kit-sent transition stamps `dispatched_at`
	/// in the same write as the status change.
	pub async fn apply_transition(
		&self,
		order_id: &str,
		new_status: OrderStatus,
		caller: &AuthContext,
	) -> Result<Order, CoreError> {
		let order = self.get_order(order_id).await?;

		if !caller.can_act_for(&order.user_id) {
			return Err(CoreError::Unauthorized(format!(
				"order {} belongs to another user",
				order_id
			)));
		}

		if !is_transition_allowed(order.status, new_status, caller.admin) {
			return Err(CoreError::Unauthorized(format!(
				"transition from {} to {} is not permitted",
				order.status, new_status
			)));
		}

		let updated = self
			.update_order_with(order_id, |order| {
				order.status = new_status;
				if new_status == OrderStatus::KitSent {
					order.dispatched_at = Some(epoch_secs());
				}
			})
			.await?;

		info!(
			order_id = %order_id,
			action = transition_label(order.status, new_status).unwrap_or("transition"),
			status = %new_status,
			"Order status updated"
		);
		Ok(updated)
	}
}
