use axum::{
	Json, Router,
	extract::State,
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::Serialize;

use govly_service::{
	ExtractionOutcome, QueryRequest, QueryResponse, SchemaRequest, ServiceError,
};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/query/links", post(query_links))
		.route("/v1/query/forms", post(query_forms))
		.route("/v1/forms/schema", post(form_schema))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn query_links(
	State(state): State<AppState>,
	Json(payload): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
	let response = state.service.query_links(payload).await?;

	Ok(Json(response))
}

async fn query_forms(
	State(state): State<AppState>,
	Json(payload): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
	let response = state.service.query_forms(payload).await?;

	Ok(Json(response))
}

async fn form_schema(
	State(state): State<AppState>,
	Json(payload): Json<SchemaRequest>,
) -> Result<Json<ExtractionOutcome>, ApiError> {
	let response = state.service.extract_schema(payload, &|| false).await?;

	Ok(Json(response))
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
			ServiceError::InvalidQuery { message } =>
				Self::new(StatusCode::BAD_REQUEST, "invalid_query", message, None),
			ServiceError::NotFound { message } =>
				Self::new(StatusCode::NOT_FOUND, "not_found", message, None),
			ServiceError::Provider { stage, message } => Self::new(
				StatusCode::BAD_GATEWAY,
				"provider_error",
				message,
				Some(vec![stage.to_string()]),
			),
			ServiceError::GenerationFailed { message } =>
				Self::new(StatusCode::BAD_GATEWAY, "generation_failed", message, None),
			ServiceError::RetrievalUnavailable { message } =>
				Self::new(StatusCode::BAD_GATEWAY, "retrieval_unavailable", message, None),
			ServiceError::Storage { message } =>
				Self::new(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", message, None),
			ServiceError::Cancelled => Self::new(
				StatusCode::REQUEST_TIMEOUT,
				"cancelled",
				"Request was cancelled.".to_string(),
				None,
			),
		}
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		if self.status.is_server_error() {
			tracing::error!(
				status = %self.status,
				error_code = self.error_code.as_str(),
				message = self.message.as_str(),
				"Request failed."
			);
		}

		let body = ErrorBody {
			error_code: self.error_code,
			message: self.message,
			fields: self.fields,
		};

		(self.status, Json(body)).into_response()
	}
}
