use axum::{
	Json, Router,
	extract::State,
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use kueater_service::Error as ServiceError;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/embeddings", post(embeddings))
		.route("/v1/recommendations", post(recommendations))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingRequest {
	pub text: String,
}

#[derive(Debug, Serialize)]
pub struct EmbeddingResponse {
	pub vector: Vec<f32>,
}

async fn embeddings(
	State(state): State<AppState>,
	Json(payload): Json<EmbeddingRequest>,
) -> Result<Json<EmbeddingResponse>, ApiError> {
	let vector = state.service.embedding(&payload.text).await?;

	Ok(Json(EmbeddingResponse { vector }))
}

#[derive(Debug, Deserialize)]
pub struct RecommendationRequest {
	pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct RecommendationAccepted {
	pub user_id: Uuid,
}

// Scoring a full catalog is slow; the request is acknowledged immediately
// and the run completes in the background. Failures surface in the logs
// and leave the previous batch current.
async fn recommendations(
	State(state): State<AppState>,
	Json(payload): Json<RecommendationRequest>,
) -> (StatusCode, Json<RecommendationAccepted>) {
	let service = state.service.clone();
	let user_id = payload.user_id;

	tokio::spawn(async move {
		if let Err(err) = service.generate_recommendations(user_id).await {
			tracing::error!(%user_id, %err, "Recommendations generation failed.");
		}
	});

	(StatusCode::ACCEPTED, Json(RecommendationAccepted { user_id }))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}

impl ApiError {
	fn new(status: StatusCode, error_code: impl Into<String>, message: impl Into<String>) -> Self {
		Self { status, error_code: error_code.into(), message: message.into() }
	}
}

impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		match err {
			ServiceError::InvalidRequest { message } => {
				Self::new(StatusCode::BAD_REQUEST, "invalid_request", message)
			},
			ServiceError::Provider { message } => {
				Self::new(StatusCode::BAD_GATEWAY, "provider_error", message)
			},
			ServiceError::DataIntegrity { message } => {
				Self::new(StatusCode::INTERNAL_SERVER_ERROR, "data_integrity", message)
			},
			ServiceError::KeywordTable { message } => {
				Self::new(StatusCode::INTERNAL_SERVER_ERROR, "keyword_table", message)
			},
			ServiceError::Storage { message } => {
				Self::new(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", message)
			},
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}
