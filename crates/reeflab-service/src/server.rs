//! HTTP server for the reeflab portal API.
//!
//! Routes are thin: each handler authenticates the caller and hands
//! off to the processing functions in `apis`.

use crate::apis;
use crate::auth::{authenticate, AuthVerifier};
use axum::{
	body::Bytes,
	extract::{Path, State},
	http::HeaderMap,
	response::Json,
	routing::{get, patch, post},
	Router,
};
use reeflab_config::ApiConfig;
use reeflab_core::{ApprovalOrchestrator, OrderStateMachine, SampleSubmission, SyncEngine};
use reeflab_types::{
	ApiError, CreateOrderRequest, CreateSampleRequest, ImportSummary, Order, QueueSummary,
	SubmitSamplesRequest, SyncMetadata, SyncQueueEntry, SyncedSample, UpdateSampleRequest,
	UpdateStatusRequest, WebhookOutcome,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	pub state_machine: Arc<OrderStateMachine>,
	pub orchestrator: Arc<ApprovalOrchestrator>,
	pub submission: Arc<SampleSubmission>,
	pub sync: Arc<SyncEngine>,
	pub verifier: Arc<dyn AuthVerifier>,
	/// Shared webhook secret; verification is skipped when absent.
	pub webhook_secret: Option<String>,
}

/// Builds the portal router.
pub fn build_router(state: AppState) -> Router {
	Router::new()
		.route("/orders", post(handle_create_order).get(handle_list_orders))
		.route("/orders/{id}", get(handle_get_order))
		.route("/orders/{id}/approve", post(handle_approve_order))
		.route("/orders/{id}/status", patch(handle_update_status))
		.route("/orders/{id}/samples/submit", post(handle_submit_samples))
		.route(
			"/admin/samples/benchling",
			get(handle_list_samples).post(handle_create_sample),
		)
		.route(
			"/admin/samples/benchling/{id}",
			patch(handle_update_sample).delete(handle_delete_sample),
		)
		.route(
			"/admin/samples/import",
			post(handle_run_import).get(handle_import_status),
		)
		.route(
			"/admin/samples/sync",
			post(handle_drain_queue).delete(handle_clear_queue),
		)
		.route("/webhooks/benchling", post(handle_webhook))
		.layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
		.with_state(state)
}

/// Starts the HTTP server.
pub async fn start_server(
	api_config: ApiConfig,
	state: AppState,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = build_router(state);
	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Portal API server starting on {}", bind_address);

	axum::serve(listener, app).await?;
	Ok(())
}

async fn handle_create_order(
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(request): Json<CreateOrderRequest>,
) -> Result<Json<Order>, ApiError> {
	let caller = authenticate(&headers, state.verifier.as_ref())?;
	let order = apis::orders::create_order(&state.state_machine, &caller, request).await?;
	Ok(Json(order))
}

async fn handle_list_orders(
	State(state): State<AppState>,
	headers: HeaderMap,
) -> Result<Json<Vec<Order>>, ApiError> {
	let caller = authenticate(&headers, state.verifier.as_ref())?;
	let orders = apis::orders::list_orders(&state.state_machine, &caller).await?;
	Ok(Json(orders))
}

async fn handle_get_order(
	State(state): State<AppState>,
	Path(id): Path<String>,
	headers: HeaderMap,
) -> Result<Json<Order>, ApiError> {
	let caller = authenticate(&headers, state.verifier.as_ref())?;
	let order = apis::orders::get_order(&state.state_machine, &caller, &id).await?;
	Ok(Json(order))
}

async fn handle_approve_order(
	State(state): State<AppState>,
	Path(id): Path<String>,
	headers: HeaderMap,
) -> Result<Json<Order>, ApiError> {
	let caller = authenticate(&headers, state.verifier.as_ref())?;
	let order = apis::orders::approve_order(&state.orchestrator, &caller, &id).await?;
	Ok(Json(order))
}

async fn handle_update_status(
	State(state): State<AppState>,
	Path(id): Path<String>,
	headers: HeaderMap,
	Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Order>, ApiError> {
	let caller = authenticate(&headers, state.verifier.as_ref())?;
	let order = apis::orders::update_status(&state.state_machine, &caller, &id, request).await?;
	Ok(Json(order))
}

async fn handle_submit_samples(
	State(state): State<AppState>,
	Path(id): Path<String>,
	headers: HeaderMap,
	Json(request): Json<SubmitSamplesRequest>,
) -> Result<Json<Order>, ApiError> {
	let caller = authenticate(&headers, state.verifier.as_ref())?;
	let order = apis::orders::submit_samples(&state.submission, &caller, &id, request).await?;
	Ok(Json(order))
}

async fn handle_list_samples(
	State(state): State<AppState>,
	headers: HeaderMap,
) -> Result<Json<Vec<SyncedSample>>, ApiError> {
	let caller = authenticate(&headers, state.verifier.as_ref())?;
	let samples = apis::samples::list_samples(&state.sync, &caller).await?;
	Ok(Json(samples))
}

async fn handle_create_sample(
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(request): Json<CreateSampleRequest>,
) -> Result<Json<SyncedSample>, ApiError> {
	let caller = authenticate(&headers, state.verifier.as_ref())?;
	let sample = apis::samples::create_sample(&state.sync, &caller, request).await?;
	Ok(Json(sample))
}

async fn handle_update_sample(
	State(state): State<AppState>,
	Path(id): Path<String>,
	headers: HeaderMap,
	Json(request): Json<UpdateSampleRequest>,
) -> Result<Json<SyncedSample>, ApiError> {
	let caller = authenticate(&headers, state.verifier.as_ref())?;
	let sample = apis::samples::update_sample(&state.sync, &caller, &id, request).await?;
	Ok(Json(sample))
}

async fn handle_delete_sample(
	State(state): State<AppState>,
	Path(id): Path<String>,
	headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
	let caller = authenticate(&headers, state.verifier.as_ref())?;
	apis::samples::delete_sample(&state.sync, &caller, &id).await?;
	Ok(Json(serde_json::json!({"deleted": id})))
}

async fn handle_run_import(
	State(state): State<AppState>,
	headers: HeaderMap,
) -> Result<Json<ImportSummary>, ApiError> {
	let caller = authenticate(&headers, state.verifier.as_ref())?;
	let summary = apis::samples::run_import(&state.sync, &caller).await?;
	Ok(Json(summary))
}

async fn handle_import_status(
	State(state): State<AppState>,
	headers: HeaderMap,
) -> Result<Json<SyncMetadata>, ApiError> {
	let caller = authenticate(&headers, state.verifier.as_ref())?;
	let meta = apis::samples::import_status(&state.sync, &caller).await?;
	Ok(Json(meta))
}

async fn handle_drain_queue(
	State(state): State<AppState>,
	headers: HeaderMap,
) -> Result<Json<QueueSummary>, ApiError> {
	let caller = authenticate(&headers, state.verifier.as_ref())?;
	let summary = apis::samples::drain_queue(&state.sync, &caller).await?;
	Ok(Json(summary))
}

async fn handle_clear_queue(
	State(state): State<AppState>,
	headers: HeaderMap,
) -> Result<Json<Vec<SyncQueueEntry>>, ApiError> {
	let caller = authenticate(&headers, state.verifier.as_ref())?;
	let entries = apis::samples::clear_queue(&state.sync, &caller).await?;
	Ok(Json(entries))
}

async fn handle_webhook(
	State(state): State<AppState>,
	headers: HeaderMap,
	body: Bytes,
) -> Result<Json<WebhookOutcome>, ApiError> {
	let outcome = apis::webhook::process_webhook(
		&state.sync,
		state.webhook_secret.as_deref(),
		&headers,
		&body,
	)
	.await?;
	Ok(Json(outcome))
}
