use axum::{
	Json, Router,
	extract::{Path, Query, State},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use agora_domain::{
	consensus::{AgreementSummaries, BucketConsensus, ResponseConsensus},
	status::{AnalysisStrategy, JobStatus, StrategyRequest, TriggerMode},
};
use agora_service::{Error as ServiceError, TriggerRequest, TriggerResponse};
use agora_storage::models::AnalysisJob;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TriggerBody {
	pub user_id: String,
	#[serde(default)]
	pub mode: TriggerMode,
	#[serde(default)]
	pub strategy: StrategyRequest,
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
	pub user_id: String,
}

/// Timestamps are Unix seconds.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobView {
	pub job_id: Uuid,
	pub conversation_id: Uuid,
	pub status: JobStatus,
	pub strategy: AnalysisStrategy,
	pub created_by: String,
	pub created_at: i64,
	pub updated_at: i64,
	pub locked_at: Option<i64>,
	pub attempts: i32,
	pub last_error: Option<String>,
}
impl From<AnalysisJob> for JobView {
	fn from(job: AnalysisJob) -> Self {
		Self {
			job_id: job.job_id,
			conversation_id: job.conversation_id,
			status: job.status,
			strategy: job.strategy,
			created_by: job.created_by,
			created_at: job.created_at.unix_timestamp(),
			updated_at: job.updated_at.unix_timestamp(),
			locked_at: job.locked_at.map(|at| at.unix_timestamp()),
			attempts: job.attempts,
			last_error: job.last_error,
		}
	}
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}
impl ApiError {
	fn new(
		status: StatusCode,
		error_code: impl Into<String>,
		message: impl Into<String>,
		fields: Option<Vec<String>>,
	) -> Self {
		Self { status, error_code: error_code.into(), message: message.into(), fields }
	}
}
impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		match err {
			ServiceError::InvalidRequest { message } =>
				json_error(StatusCode::BAD_REQUEST, "INVALID_REQUEST", message, None),
			ServiceError::Unauthorized { message } =>
				json_error(StatusCode::FORBIDDEN, "NOT_A_MEMBER", message, None),
			ServiceError::NotFound { message } =>
				json_error(StatusCode::NOT_FOUND, "NOT_FOUND", message, None),
			ServiceError::Conflict { message } =>
				json_error(StatusCode::CONFLICT, "CONFLICT", message, None),
			ServiceError::Provider { message } => {
				tracing::error!(error = %message, "Provider failure.");

				json_error(StatusCode::BAD_GATEWAY, "PROVIDER_ERROR", "Provider failed.", None)
			},
			ServiceError::Storage { message } => {
				tracing::error!(error = %message, "Storage failure.");

				json_error(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", "Internal error.", None)
			},
		}
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body =
			ErrorBody { error_code: self.error_code, message: self.message, fields: self.fields };

		(self.status, Json(body)).into_response()
	}
}

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/conversations/{conversation_id}/analysis", post(trigger_analysis))
		.route("/v1/analysis/jobs/{job_id}", get(get_job))
		.route("/v1/conversations/{conversation_id}/consensus/responses", get(response_consensus))
		.route("/v1/conversations/{conversation_id}/consensus/statements", get(statement_consensus))
		.route("/v1/conversations/{conversation_id}/consensus/summaries", get(agreement_summaries))
		.with_state(state)
}

pub fn json_error(
	status: StatusCode,
	code: &str,
	message: impl Into<String>,
	fields: Option<Vec<String>>,
) -> ApiError {
	ApiError::new(status, code, message, fields)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn trigger_analysis(
	State(state): State<AppState>,
	Path(conversation_id): Path<Uuid>,
	Json(body): Json<TriggerBody>,
) -> Result<Json<TriggerResponse>, ApiError> {
	if body.user_id.trim().is_empty() {
		return Err(json_error(
			StatusCode::BAD_REQUEST,
			"INVALID_REQUEST",
			"user_id must be non-empty.",
			Some(vec!["$.user_id".to_string()]),
		));
	}

	let request = TriggerRequest {
		conversation_id,
		user_id: body.user_id,
		mode: body.mode,
		strategy: body.strategy,
	};
	let response = state.service.trigger(request).await?;

	Ok(Json(response))
}

async fn get_job(
	State(state): State<AppState>,
	Path(job_id): Path<Uuid>,
) -> Result<Json<JobView>, ApiError> {
	let job = state.service.get_job(job_id).await?;

	Ok(Json(job.into()))
}

async fn response_consensus(
	State(state): State<AppState>,
	Path(conversation_id): Path<Uuid>,
	Query(query): Query<UserQuery>,
) -> Result<Json<Vec<ResponseConsensus>>, ApiError> {
	let response = state.service.response_consensus(conversation_id, &query.user_id).await?;

	Ok(Json(response))
}

async fn statement_consensus(
	State(state): State<AppState>,
	Path(conversation_id): Path<Uuid>,
	Query(query): Query<UserQuery>,
) -> Result<Json<Vec<BucketConsensus>>, ApiError> {
	let response = state.service.statement_consensus(conversation_id, &query.user_id).await?;

	Ok(Json(response))
}

async fn agreement_summaries(
	State(state): State<AppState>,
	Path(conversation_id): Path<Uuid>,
	Query(query): Query<UserQuery>,
) -> Result<Json<AgreementSummaries>, ApiError> {
	let response = state.service.agreement_summaries(conversation_id, &query.user_id).await?;

	Ok(Json(response))
}
