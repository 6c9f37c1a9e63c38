//! Order endpoints: creation, retrieval, status transitions, approval,
//! and sample submission.

use crate::apis::map_core_error;
use reeflab_core::{ApprovalOrchestrator, OrderStateMachine, SampleSubmission};
use reeflab_types::{
	ApiError, AuthContext, CreateOrderRequest, Order, SubmitSamplesRequest, UpdateStatusRequest,
};
use std::collections::HashSet;

/// Creates a new order in the reviewing state for the caller.
pub async fn create_order(
	state: &OrderStateMachine,
	caller: &AuthContext,
	request: CreateOrderRequest,
) -> Result<Order, ApiError> {
	let mut seen = HashSet::new();
	for sample in &request.requested_samples {
		if sample.name.is_empty() {
			return Err(ApiError::BadRequest {
				message: "sample names must not be empty".to_string(),
				details: None,
			});
		}
		if !seen.insert(&sample.name) {
			return Err(ApiError::BadRequest {
				message: format!("duplicate sample name: {}", sample.name),
				details: None,
			});
		}
	}

	let order = Order::new(
		uuid::Uuid::new_v4().to_string(),
		&caller.uid,
		request.requested_samples,
		crate::epoch_secs(),
	);
	state.store_order(&order).await.map_err(map_core_error)?;
	tracing::info!(order_id = %order.id, user_id = %caller.uid, "Order created");
	Ok(order)
}

/// Lists the caller's orders; administrators see every order.
pub async fn list_orders(
	state: &OrderStateMachine,
	caller: &AuthContext,
) -> Result<Vec<Order>, ApiError> {
	let mut orders = state.get_all_orders().await.map_err(map_core_error)?;
	if !caller.admin {
		orders.retain(|order| order.user_id == caller.uid);
	}
	Ok(orders)
}

/// Retrieves one order; owner or administrator only.
pub async fn get_order(
	state: &OrderStateMachine,
	caller: &AuthContext,
	order_id: &str,
) -> Result<Order, ApiError> {
	let order = state.get_order(order_id).await.map_err(map_core_error)?;
	if !caller.can_act_for(&order.user_id) {
		return Err(ApiError::Unauthorized {
			message: format!("order {} belongs to another user", order_id),
		});
	}
	Ok(order)
}

/// Runs the approval orchestrator; administrators only.
pub async fn approve_order(
	orchestrator: &ApprovalOrchestrator,
	caller: &AuthContext,
	order_id: &str,
) -> Result<Order, ApiError> {
	if !caller.admin {
		return Err(ApiError::Unauthorized {
			message: "approval requires the administrator role".to_string(),
		});
	}
	orchestrator.approve(order_id).await.map_err(map_core_error)
}

/// Applies a guarded status transition.
pub async fn update_status(
	state: &OrderStateMachine,
	caller: &AuthContext,
	order_id: &str,
	request: UpdateStatusRequest,
) -> Result<Order, ApiError> {
	state
		.apply_transition(order_id, request.status, caller)
		.await
		.map_err(map_core_error)
}

/// Submits returned samples on an order.
pub async fn submit_samples(
	submission: &SampleSubmission,
	caller: &AuthContext,
	order_id: &str,
	request: SubmitSamplesRequest,
) -> Result<Order, ApiError> {
	submission
		.submit(order_id, &request.sample_ids, caller)
		.await
		.map_err(map_core_error)
}
