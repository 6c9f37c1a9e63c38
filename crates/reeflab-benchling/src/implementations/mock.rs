//! In-memory mock implementation of the lab system client.
//!
//! Used for development runs and for exercising the approval and sync
//! flows in tests without a live Benchling tenant. The mock registers
//! entities through the same asynchronous task lifecycle as the real
//! API: creation returns a task id that reports RUNNING for a
//! configurable number of polls before reaching SUCCEEDED.

use crate::{
	BenchlingEntity, BenchlingError, BenchlingInterface, EntityCreationSpec, TaskState, TaskStatus,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Configuration for the mock client.
#[derive(Debug, Default, Deserialize)]
struct MockClientConfig {
	/// Number of RUNNING polls before a task succeeds.
	#[serde(default)]
	polls_until_success: u32,
}

#[derive(Debug, Clone)]
struct MockTask {
	state: TaskState,
	remaining_polls: u32,
	entities: Vec<BenchlingEntity>,
	message: Option<String>,
}

#[derive(Default)]
struct MockState {
	/// Registered entities keyed by registry id.
	entities: HashMap<String, BenchlingEntity>,
	tasks: HashMap<String, MockTask>,
	polls_until_success: u32,
	fail_pushes: bool,
	create_calls: usize,
	list_calls: usize,
	next_task: usize,
	next_entity: usize,
}

/// Mock implementation of the lab system client.
#[derive(Clone)]
pub struct MockBenchling {
	state: Arc<Mutex<MockState>>,
}

impl MockBenchling {
	/// Creates a mock whose tasks succeed on the first poll.
	pub fn new() -> Self {
		Self {
			state: Arc::new(Mutex::new(MockState::default())),
		}
	}

	/// Sets how many RUNNING polls precede task success.
	pub fn set_polls_until_success(&self, polls: u32) {
		self.state.lock().unwrap().polls_until_success = polls;
	}

	/// Makes subsequent update/delete pushes fail with an API error.
	pub fn set_fail_pushes(&self, fail: bool) {
		self.state.lock().unwrap().fail_pushes = fail;
	}

	/// Marks a task as permanently failed.
	pub fn fail_task(&self, task_id: &str, message: &str) {
		let mut state = self.state.lock().unwrap();
		if let Some(task) = state.tasks.get_mut(task_id) {
			task.state = TaskState::Failed;
			task.message = Some(message.to_string());
		}
	}

	/// Number of bulk creation requests issued so far.
	pub fn create_calls(&self) -> usize {
		self.state.lock().unwrap().create_calls
	}

	/// Number of entity listing requests issued so far.
	pub fn list_calls(&self) -> usize {
		self.state.lock().unwrap().list_calls
	}

	/// Registers an entity directly, bypassing the task lifecycle.
	pub fn insert_entity(&self, entity: BenchlingEntity) {
		let mut state = self.state.lock().unwrap();
		state.entities.insert(entity.registry_id.clone(), entity);
	}

	/// Returns the registered entity for a registry id, if any.
	pub fn entity(&self, registry_id: &str) -> Option<BenchlingEntity> {
		self.state.lock().unwrap().entities.get(registry_id).cloned()
	}
}

impl Default for MockBenchling {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl BenchlingInterface for MockBenchling {
	async fn create_entities_async(
		&self,
		spec: EntityCreationSpec,
	) -> Result<Vec<String>, BenchlingError> {
		let mut state = self.state.lock().unwrap();
		state.create_calls += 1;

		let mut entities = Vec::with_capacity(spec.entities.len());
		for entity_spec in spec.entities {
			state.next_entity += 1;
			entities.push(BenchlingEntity {
				id: format!("ent-{}", state.next_entity),
				registry_id: entity_spec.name.clone(),
				name: entity_spec.name,
				schema_id: spec.schema_id.clone(),
				entity_type: "CustomEntity".to_string(),
				modified_at: "2026-01-01T00:00:00Z".to_string(),
				fields: entity_spec.fields,
			});
		}

		state.next_task += 1;
		let task_id = format!("task-{}", state.next_task);
		let remaining_polls = state.polls_until_success;
		state.tasks.insert(
			task_id.clone(),
			MockTask {
				state: TaskState::Running,
				remaining_polls,
				entities,
				message: None,
			},
		);
		Ok(vec![task_id])
	}

	async fn get_task_status(&self, task_id: &str) -> Result<TaskStatus, BenchlingError> {
		let mut state = self.state.lock().unwrap();
		let task = state
			.tasks
			.get(task_id)
			.cloned()
			.ok_or_else(|| BenchlingError::NotFound(task_id.to_string()))?;

		match task.state {
			TaskState::Failed => Ok(TaskStatus {
				state: TaskState::Failed,
				message: task.message,
				entities: Vec::new(),
			}),
			TaskState::Succeeded => Ok(TaskStatus {
				state: TaskState::Succeeded,
				message: None,
				entities: task.entities,
			}),
			TaskState::Running if task.remaining_polls == 0 => {
				// Task completes: register its entities
				for entity in &task.entities {
					state
						.entities
						.insert(entity.registry_id.clone(), entity.clone());
				}
				let registered = task.entities.clone();
				state.tasks.get_mut(task_id).unwrap().state = TaskState::Succeeded;
				Ok(TaskStatus {
					state: TaskState::Succeeded,
					message: None,
					entities: registered,
				})
			},
			TaskState::Running => {
				state.tasks.get_mut(task_id).unwrap().remaining_polls -= 1;
				Ok(TaskStatus {
					state: TaskState::Running,
					message: None,
					entities: Vec::new(),
				})
			},
		}
	}

	async fn list_entities(&self, schema_id: &str) -> Result<Vec<BenchlingEntity>, BenchlingError> {
		let mut state = self.state.lock().unwrap();
		state.list_calls += 1;
		let mut entities: Vec<BenchlingEntity> = state
			.entities
			.values()
			.filter(|e| e.schema_id == schema_id)
			.cloned()
			.collect();
		entities.sort_by(|a, b| a.registry_id.cmp(&b.registry_id));
		Ok(entities)
	}

	async fn update_entity(
		&self,
		id: &str,
		fields: HashMap<String, String>,
	) -> Result<(), BenchlingError> {
		let mut state = self.state.lock().unwrap();
		if state.fail_pushes {
			return Err(BenchlingError::Api("injected push failure".to_string()));
		}

		// Registry upsert: unknown ids become new registered entities
		state.next_entity += 1;
		let internal_id = format!("ent-{}", state.next_entity);
		let entry = state
			.entities
			.entry(id.to_string())
			.or_insert_with(|| BenchlingEntity {
				id: internal_id,
				registry_id: id.to_string(),
				name: id.to_string(),
				schema_id: String::new(),
				entity_type: "CustomEntity".to_string(),
				modified_at: "2026-01-01T00:00:00Z".to_string(),
				fields: HashMap::new(),
			});
		entry.fields.extend(fields);
		Ok(())
	}

	async fn delete_entity(&self, id: &str) -> Result<(), BenchlingError> {
		let mut state = self.state.lock().unwrap();
		if state.fail_pushes {
			return Err(BenchlingError::Api("injected push failure".to_string()));
		}
		state
			.entities
			.remove(id)
			.map(|_| ())
			.ok_or_else(|| BenchlingError::NotFound(id.to_string()))
	}
}

/// Factory function to create a mock client from configuration.
///
/// Configuration parameters:
/// - `polls_until_success`: RUNNING polls before tasks succeed (default 0)
pub fn create_client(
	config: &toml::Value,
) -> Result<Box<dyn BenchlingInterface>, BenchlingError> {
	let config: MockClientConfig = config
		.clone()
		.try_into()
		.map_err(|e: toml::de::Error| BenchlingError::Api(e.message().to_string()))?;
	let client = MockBenchling::new();
	client.set_polls_until_success(config.polls_until_success);
	Ok(Box::new(client))
}
