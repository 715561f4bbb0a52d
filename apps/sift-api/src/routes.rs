use axum::{
	Json, Router,
	extract::{Path, State},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sift_service::{
	CandidateGraphScore, ExpansionEnvelope, ExpansionRequest, IdfRefreshReport, ScoreRequest,
	SyncOutcome, TaxonomyBuildReport, WarmupReport,
};
use sift_taxonomy::document::TaxonomyDocument;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/expansion/search", post(search))
		.route("/v1/candidates/score", post(score))
		.with_state(state)
}

/// Mutating and operational endpoints live on the loopback-only admin bind.
pub fn admin_router(state: AppState) -> Router {
	Router::new()
		.route("/v1/admin/taxonomy/build", post(build_taxonomy))
		.route("/v1/admin/idf/refresh", post(refresh_idf))
		.route("/v1/admin/warmup", post(warm_up))
		.route("/v1/admin/candidates/{candidate_id}/sync", post(sync_candidate))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn search(
	State(state): State<AppState>,
	Json(payload): Json<ExpansionRequest>,
) -> Result<Json<ExpansionEnvelope>, ApiError> {
	let response = state.service.expand(payload).await?;

	Ok(Json(response))
}

async fn score(
	State(state): State<AppState>,
	Json(payload): Json<ScoreRequest>,
) -> Result<Json<CandidateGraphScore>, ApiError> {
	let response = state.service.score_candidate(payload).await?;

	Ok(Json(response))
}

async fn build_taxonomy(
	State(state): State<AppState>,
	Json(payload): Json<TaxonomyDocument>,
) -> Result<Json<TaxonomyBuildReport>, ApiError> {
	let response = state.service.build_taxonomy(&payload).await?;

	Ok(Json(response))
}

async fn refresh_idf(State(state): State<AppState>) -> Result<Json<IdfRefreshReport>, ApiError> {
	let response = state.service.refresh_idf().await?;

	Ok(Json(response))
}

#[derive(Debug, Default, Deserialize)]
struct WarmupRequest {
	#[serde(default)]
	queries: Vec<String>,
}

/// Primes the expansion cache. An empty or absent body warms the configured
/// startup queries.
async fn warm_up(
	State(state): State<AppState>,
	payload: Option<Json<WarmupRequest>>,
) -> Result<Json<WarmupReport>, ApiError> {
	let queries = match payload {
		Some(Json(request)) if !request.queries.is_empty() => request.queries,
		_ => state.service.cfg.warmup.queries.clone(),
	};
	let report = state.service.warm_up(&queries).await;

	Ok(Json(report))
}

#[derive(Debug, Serialize)]
struct SyncResponse {
	outcome: SyncOutcome,
	/// A sync for this candidate was already outstanding; nothing new was
	/// queued. Still a 200: the requested state will be reached.
	deduplicated: bool,
}

async fn sync_candidate(
	State(state): State<AppState>,
	Path(candidate_id): Path<Uuid>,
) -> Result<Json<SyncResponse>, ApiError> {
	let outcome = state.service.enqueue_candidate_sync(candidate_id).await?;

	Ok(Json(SyncResponse { outcome, deduplicated: outcome == SyncOutcome::Deduplicated }))
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
impl From<sift_service::Error> for ApiError {
	fn from(err: sift_service::Error) -> Self {
		match err {
			sift_service::Error::InvalidRequest { message } => {
				Self::new(StatusCode::UNPROCESSABLE_ENTITY, "invalid_request", message)
			},
			sift_service::Error::Taxonomy(err) => {
				Self::new(StatusCode::UNPROCESSABLE_ENTITY, "invalid_taxonomy", err.to_string())
			},
			sift_service::Error::GraphUnconfigured => Self::new(
				StatusCode::SERVICE_UNAVAILABLE,
				"graph_unconfigured",
				"No graph store is configured.",
			),
			sift_service::Error::Graph(sift_graph::Error::CircuitOpen) => Self::new(
				StatusCode::SERVICE_UNAVAILABLE,
				"graph_unavailable",
				"The graph store is temporarily unavailable.",
			),
			sift_service::Error::Graph(err) => {
				Self::new(StatusCode::BAD_GATEWAY, "graph_error", err.to_string())
			},
			sift_service::Error::Storage(err) => {
				tracing::error!(error = %err, "Storage error while serving a request.");

				Self::new(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", "Storage failure.")
			},
			sift_service::Error::Internal { message } => {
				tracing::error!(%message, "Internal error while serving a request.");

				Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", "Internal error.")
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
