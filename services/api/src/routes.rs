use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Extension, Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::infra::{AppState, MemoryService};
use maturity_engine::assessment::{AnswerValue, AssessmentId, OrganizationId, QuestionId};
use maturity_engine::repository::RepositoryError;
use maturity_engine::{AssessmentServiceError, SuggestionEngineError};

#[derive(Debug, Deserialize)]
pub(crate) struct StartAssessmentRequest {
    pub(crate) assessment_id: String,
    pub(crate) organization_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponsePayload {
    pub(crate) value: AnswerValue,
    #[serde(default)]
    pub(crate) updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct GenerateParams {
    #[serde(default)]
    pub(crate) force: bool,
}

pub(crate) fn with_assessment_routes(service: Arc<MemoryService>) -> Router {
    Router::new()
        .route("/api/v1/assessments", axum::routing::post(start_handler))
        .route("/api/v1/assessments/:assessment_id/scores", get(scores_handler))
        .route(
            "/api/v1/assessments/:assessment_id/suggestions",
            get(suggestions_handler).post(generate_handler),
        )
        .route("/api/v1/assessments/:assessment_id/report", get(report_handler))
        .route(
            "/api/v1/assessments/:assessment_id/responses/:question_id",
            put(record_response_handler).delete(clear_response_handler),
        )
        .with_state(service)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn start_handler(
    State(service): State<Arc<MemoryService>>,
    Json(request): Json<StartAssessmentRequest>,
) -> Response {
    match service.start_assessment(
        AssessmentId(request.assessment_id),
        OrganizationId(request.organization_id),
    ) {
        Ok(assessment) => (StatusCode::CREATED, Json(assessment)).into_response(),
        Err(error) => service_error(error),
    }
}

pub(crate) async fn scores_handler(
    State(service): State<Arc<MemoryService>>,
    Path(assessment_id): Path<String>,
) -> Response {
    let id = AssessmentId(assessment_id);
    match service.engine().get_scores(&id) {
        Ok(scores) => {
            let payload = json!({
                "assessment_id": id,
                "scores": scores,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => engine_error(error),
    }
}

pub(crate) async fn suggestions_handler(
    State(service): State<Arc<MemoryService>>,
    Path(assessment_id): Path<String>,
) -> Response {
    let id = AssessmentId(assessment_id);
    match service.engine().get_assessment_suggestions(&id) {
        Ok(suggestions) => {
            let payload = json!({
                "assessment_id": id,
                "suggestions": suggestions,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => engine_error(error),
    }
}

pub(crate) async fn generate_handler(
    State(service): State<Arc<MemoryService>>,
    Path(assessment_id): Path<String>,
    Query(params): Query<GenerateParams>,
) -> Response {
    let id = AssessmentId(assessment_id);
    let result = if params.force {
        service.engine().generate_suggestions(&id)
    } else {
        service.engine().ensure_suggestions(&id)
    };

    match result {
        Ok(suggestions) => {
            let payload = json!({
                "assessment_id": id,
                "suggestions": suggestions,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => engine_error(error),
    }
}

pub(crate) async fn report_handler(
    State(service): State<Arc<MemoryService>>,
    Path(assessment_id): Path<String>,
) -> Response {
    match service.engine().report(&AssessmentId(assessment_id)) {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(error) => engine_error(error),
    }
}

pub(crate) async fn record_response_handler(
    State(service): State<Arc<MemoryService>>,
    Path((assessment_id, question_id)): Path<(String, String)>,
    Json(payload): Json<ResponsePayload>,
) -> Response {
    let updated_at = payload.updated_at.unwrap_or_else(Utc::now);
    match service.record_response(
        &AssessmentId(assessment_id),
        &QuestionId(question_id),
        payload.value,
        updated_at,
    ) {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(error) => service_error(error),
    }
}

pub(crate) async fn clear_response_handler(
    State(service): State<Arc<MemoryService>>,
    Path((assessment_id, question_id)): Path<(String, String)>,
) -> Response {
    match service.clear_response(&AssessmentId(assessment_id), &QuestionId(question_id)) {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(error) => service_error(error),
    }
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn engine_error(error: SuggestionEngineError) -> Response {
    let status = match &error {
        SuggestionEngineError::AssessmentNotFound(_) => StatusCode::NOT_FOUND,
        SuggestionEngineError::NoResponses(_) => StatusCode::CONFLICT,
        SuggestionEngineError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        SuggestionEngineError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, error.to_string())
}

fn service_error(error: AssessmentServiceError) -> Response {
    match error {
        AssessmentServiceError::Engine(error) => engine_error(error),
        AssessmentServiceError::AssessmentNotFound(_) | AssessmentServiceError::UnknownQuestion(_) => {
            error_response(StatusCode::NOT_FOUND, error.to_string())
        }
        AssessmentServiceError::Repository(RepositoryError::Conflict) => {
            error_response(StatusCode::CONFLICT, "assessment already exists".to_string())
        }
        AssessmentServiceError::Repository(RepositoryError::NotFound) => {
            error_response(StatusCode::NOT_FOUND, error.to_string())
        }
        AssessmentServiceError::Repository(_) => {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
        }
    }
}
