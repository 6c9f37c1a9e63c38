//! Customer sample submission flow.
//!
//! Marks physically returned samples as submitted on their order. The
//! external push happens before the local commit; a push that cannot
//! be confirmed is queued durably by the sync engine, so the local
//! status change is never ahead of a change the external system will
//! eventually see.

use crate::state::OrderStateMachine;
use crate::sync::SyncEngine;
use crate::{epoch_secs, CoreError};
use reeflab_types::{AuthContext, Order, SampleStatus};
use std::sync::Arc;
use tracing::info;

/// Handles customer submission of returned samples.
pub struct SampleSubmission {
	state: Arc<OrderStateMachine>,
	sync: Arc<SyncEngine>,
}

impl SampleSubmission {
	pub fn new(state: Arc<OrderStateMachine>, sync: Arc<SyncEngine>) -> Self {
		Self { state, sync }
	}

	/// Submits the named samples on an order.
	///
	/// Names matching unsubmitted samples move to the submitted list
	/// with the returned status. Names already submitted are skipped
	/// for customers and refreshed in place for administrators, never
	/// duplicated. Names matching nothing on the order are rejected
	/// before any mutation.
	pub async fn submit(
		&self,
		order_id: &str,
		sample_names: &[String],
		caller: &AuthContext,
	) -> Result<Order, CoreError> {
		if sample_names.is_empty() {
			return Err(CoreError::Validation(
				"no sample ids were provided".to_string(),
			));
		}

		let order = self.state.get_order(order_id).await?;
		if !caller.can_act_for(&order.user_id) {
			return Err(CoreError::Unauthorized(format!(
				"order {} belongs to another user",
				order_id
			)));
		}

		let mut to_submit = Vec::new();
		let mut to_resubmit = Vec::new();
		for name in sample_names {
			if order.unsubmitted_samples.iter().any(|s| &s.name == name) {
				to_submit.push(name.clone());
			} else if order.submitted_samples.iter().any(|s| &s.name == name) {
				// Resubmission is admin-only; customers naming an
				// already-submitted sample get a no-op for it
				if caller.admin {
					to_resubmit.push(name.clone());
				}
			} else {
				return Err(CoreError::Validation(format!(
					"sample {} is not on order {}",
					name, order_id
				)));
			}
		}

		// External push first; a queued push still counts as durable
		for name in to_submit.iter().chain(to_resubmit.iter()) {
			self.sync.push_submission(order_id, name).await?;
		}

		let updated = self
			.state
			.update_order_with(order_id, move |order| {
				let now = epoch_secs();
				let mut moved: Vec<_> = order
					.unsubmitted_samples
					.iter()
					.filter(|s| to_submit.contains(&s.name))
					.cloned()
					.collect();
				order
					.unsubmitted_samples
					.retain(|s| !to_submit.contains(&s.name));
				for sample in &mut moved {
					sample.status = Some(SampleStatus::SampleReturned);
					sample.last_updated = now;
				}
				order.submitted_samples.append(&mut moved);

				for sample in &mut order.submitted_samples {
					if to_resubmit.contains(&sample.name) {
						sample.status = Some(SampleStatus::SampleReturned);
						sample.last_updated = now;
					}
				}
			})
			.await?;

		info!(
			order_id = %order_id,
			submitted = sample_names.len(),
			"Samples submitted"
		);
		Ok(updated)
	}
}
