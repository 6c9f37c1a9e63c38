//! Order approval orchestration.
//!
//! Approving an order provisions one lab entity per requested sample in
//! the external system. Provisioning is asynchronous on the Benchling
//! side: the bulk creation call returns task ids which are persisted on
//! the order before any polling, so a retried approval resumes the
//! existing tasks instead of provisioning duplicates. Polling is
//! bounded; when tasks are still running at the deadline the caller
//! gets a distinguished not-ready error and retries the whole request.

use crate::state::OrderStateMachine;
use crate::CoreError;
use reeflab_benchling::{BenchlingService, EntityCreationSpec, EntitySpec, TaskState};
use reeflab_types::{Order, OrderStatus, OrderedSample, Sample, ServiceType};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{info, warn};

/// Drives an order through external provisioning into the approved
/// state.
pub struct ApprovalOrchestrator {
	state: Arc<OrderStateMachine>,
	benchling: Arc<BenchlingService>,
	schema_id: String,
	poll_interval: Duration,
	max_wait: Duration,
}

impl ApprovalOrchestrator {
	pub fn new(
		state: Arc<OrderStateMachine>,
		benchling: Arc<BenchlingService>,
		schema_id: String,
		poll_interval: Duration,
		max_wait: Duration,
	) -> Self {
		Self {
			state,
			benchling,
			schema_id,
			poll_interval,
			max_wait,
		}
	}

	/// Approves an order, provisioning its samples externally first.
	///
	/// Idempotent: an order that is already approved with provisioned
	/// samples returns unchanged, and a retry after a not-ready failure
	/// resumes the persisted tasks.
	pub async fn approve(&self, order_id: &str) -> Result<Order, CoreError> {
		let order = self.state.get_order(order_id).await?;

		if order.status == OrderStatus::Approved && !order.ordered_samples.is_empty() {
			return Ok(order);
		}
		if order.status != OrderStatus::Reviewing && order.status != OrderStatus::Approved {
			return Err(CoreError::Validation(format!(
				"order {} cannot be approved from status {}",
				order_id, order.status
			)));
		}
		if order.requested_samples.is_empty() {
			return Err(CoreError::Validation(format!(
				"order {} has no requested samples to provision",
				order_id
			)));
		}

		let task_ids = if order.task_ids.is_empty() {
			let task_ids = self
				.benchling
				.create_entities_async(creation_spec(&self.schema_id, &order))
				.await?;
			info!(
				order_id = %order_id,
				tasks = task_ids.len(),
				"Issued entity provisioning request"
			);
			// Persist before polling so a retry never re-provisions
			let ids = task_ids.clone();
			self.state
				.update_order_with(order_id, move |order| {
					order.task_ids = ids;
				})
				.await?;
			task_ids
		} else {
			order.task_ids.clone()
		};

		let entities = self.await_tasks(&task_ids).await?;

		let updated = self
			.state
			.update_order_with(order_id, move |order| {
				// Sample lists are populated at most once per order
				if order.ordered_samples.is_empty() {
					for entity in &entities {
						let service = ServiceType::from_sample_name(&entity.registry_id);
						order.ordered_samples.push(OrderedSample {
							name: entity.name.clone(),
							service,
							registry_id: Some(entity.registry_id.clone()),
						});
						order.unsubmitted_samples.push(Sample {
							name: entity.registry_id.clone(),
							status: None,
							service,
							report_url: None,
							last_updated: crate::epoch_secs(),
						});
					}
				}
				order.status = OrderStatus::Approved;
			})
			.await?;

		info!(
			order_id = %order_id,
			samples = updated.ordered_samples.len(),
			"Order approved"
		);
		Ok(updated)
	}

	/// Polls every task until all succeed, one fails, or the deadline
	/// passes with tasks still running.
	async fn await_tasks(
		&self,
		task_ids: &[String],
	) -> Result<Vec<reeflab_benchling::BenchlingEntity>, CoreError> {
		let deadline = Instant::now() + self.max_wait;

		loop {
			let mut entities = Vec::new();
			let mut all_succeeded = true;

			for task_id in task_ids {
				let status = self.benchling.get_task_status(task_id).await?;
				match status.state {
					TaskState::Succeeded => entities.extend(status.entities),
					TaskState::Failed => {
						let detail = status
							.message
							.unwrap_or_else(|| "no failure detail".to_string());
						warn!(task_id = %task_id, detail = %detail, "Provisioning task failed");
						return Err(CoreError::ProvisioningFailed(detail));
					},
					TaskState::Running => all_succeeded = false,
				}
			}

			if all_succeeded {
				return Ok(entities);
			}
			if Instant::now() + self.poll_interval > deadline {
				return Err(CoreError::NotReady);
			}
			sleep(self.poll_interval).await;
		}
	}
}

fn creation_spec(schema_id: &str, order: &Order) -> EntityCreationSpec {
	EntityCreationSpec {
		schema_id: schema_id.to_string(),
		entities: order
			.requested_samples
			.iter()
			.map(|requested| {
				let mut fields = HashMap::new();
				fields.insert("service".to_string(), requested.service.to_string());
				fields.insert("orderId".to_string(), order.id.clone());
				EntitySpec {
					name: requested.name.clone(),
					fields,
				}
			})
			.collect(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use reeflab_benchling::implementations::mock::MockBenchling;
	use reeflab_benchling::BenchlingInterface;
	use reeflab_storage::{implementations::memory::MemoryStorage, StorageService};
	use reeflab_types::AuthContext;

	const SCHEMA: &str = "ts_aqsample";

	fn harness() -> (Arc<OrderStateMachine>, MockBenchling, ApprovalOrchestrator) {
		let state = Arc::new(OrderStateMachine::new(Arc::new(StorageService::new(
			Box::new(MemoryStorage::new()),
		))));
		let mock = MockBenchling::new();
		let orchestrator = ApprovalOrchestrator::new(
			state.clone(),
			Arc::new(BenchlingService::new(Box::new(mock.clone()))),
			SCHEMA.to_string(),
			Duration::from_millis(10),
			Duration::from_millis(100),
		);
		(state, mock, orchestrator)
	}

	fn requested(names: &[&str]) -> Vec<OrderedSample> {
		names
			.iter()
			.map(|name| OrderedSample {
				name: name.to_string(),
				service: ServiceType::from_sample_name(name),
				registry_id: None,
			})
			.collect()
	}

	async fn seed_order(state: &OrderStateMachine, id: &str, samples: &[&str]) {
		let order = Order::new(id, "user-1", requested(samples), 1_700_000_000);
		state.store_order(&order).await.unwrap();
	}

	#[tokio::test]
	async fn test_approve_provisions_and_populates_samples() {
		let (state, _mock, orchestrator) = harness();
		seed_order(&state, "ord-1", &["AQS-QPCR-0001", "AQS-MTG-0002"]).await;

		let order = orchestrator.approve("ord-1").await.unwrap();
		assert_eq!(order.status, OrderStatus::Approved);
		assert_eq!(order.ordered_samples.len(), 2);
		assert_eq!(order.unsubmitted_samples.len(), 2);
		assert_eq!(order.ordered_samples[0].service, ServiceType::Qpcr);
		assert_eq!(order.ordered_samples[1].service, ServiceType::Metagenomics);
		assert!(order.ordered_samples[0].registry_id.is_some());
		assert!(order.unsubmitted_samples[0].status.is_none());
	}

	#[tokio::test]
	async fn test_approve_is_idempotent() {
		let (state, mock, orchestrator) = harness();
		seed_order(&state, "ord-1", &["AQS-QPCR-0001"]).await;

		orchestrator.approve("ord-1").await.unwrap();
		let again = orchestrator.approve("ord-1").await.unwrap();
		assert_eq!(again.status, OrderStatus::Approved);
		assert_eq!(again.ordered_samples.len(), 1);
		assert_eq!(mock.create_calls(), 1);
	}

	#[tokio::test]
	async fn test_not_ready_persists_tasks_for_retry() {
		let (state, mock, orchestrator) = harness();
		mock.set_polls_until_success(1000);
		seed_order(&state, "ord-1", &["AQS-QPCR-0001"]).await;

		let result = orchestrator.approve("ord-1").await;
		assert!(matches!(result, Err(CoreError::NotReady)));
		assert_eq!(
			result.unwrap_err().to_string(),
			"Benchling task is not yet fully setup, please wait 1 min"
		);

		// Task ids survived the failure; order is still reviewing
		let order = state.get_order("ord-1").await.unwrap();
		assert_eq!(order.status, OrderStatus::Reviewing);
		assert!(!order.task_ids.is_empty());

		// Retry resumes the persisted tasks without re-provisioning
		mock.set_polls_until_success(0);
		for task_id in &order.task_ids {
			// Drain the remaining polls recorded on the existing task
			while !matches!(
				mock.get_task_status(task_id).await.unwrap().state,
				TaskState::Succeeded
			) {}
		}
		let approved = orchestrator.approve("ord-1").await.unwrap();
		assert_eq!(approved.status, OrderStatus::Approved);
		assert_eq!(mock.create_calls(), 1);
	}

	#[tokio::test]
	async fn test_failed_task_surfaces_detail() {
		let (state, mock, orchestrator) = harness();
		mock.set_polls_until_success(1000);
		seed_order(&state, "ord-1", &["AQS-QPCR-0001"]).await;

		let _ = orchestrator.approve("ord-1").await;
		let order = state.get_order("ord-1").await.unwrap();
		mock.fail_task(&order.task_ids[0], "registry rejected name");

		let result = orchestrator.approve("ord-1").await;
		match result {
			Err(CoreError::ProvisioningFailed(detail)) => {
				assert_eq!(detail, "registry rejected name");
			},
			other => panic!("expected provisioning failure, got {:?}", other),
		}
	}

	#[tokio::test]
	async fn test_approve_rejects_empty_request() {
		let (state, _mock, orchestrator) = harness();
		seed_order(&state, "ord-1", &[]).await;

		let result = orchestrator.approve("ord-1").await;
		assert!(matches!(result, Err(CoreError::Validation(_))));
	}

	#[tokio::test]
	async fn test_approve_rejects_dispatched_order() {
		let (state, _mock, orchestrator) = harness();
		seed_order(&state, "ord-1", &["AQS-QPCR-0001"]).await;
		let admin = AuthContext {
			uid: "admin-1".to_string(),
			admin: true,
		};
		orchestrator.approve("ord-1").await.unwrap();
		state
			.apply_transition("ord-1", OrderStatus::KitSent, &admin)
			.await
			.unwrap();

		let result = orchestrator.approve("ord-1").await;
		assert!(matches!(result, Err(CoreError::Validation(_))));
	}

	#[tokio::test]
	async fn test_approve_missing_order() {
		let (_state, _mock, orchestrator) = harness();
		let result = orchestrator.approve("missing").await;
		assert!(matches!(result, Err(CoreError::NotFound(_))));
	}
}
