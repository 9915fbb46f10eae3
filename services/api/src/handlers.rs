//! Axum Handlers for the REST API
//!
//! This module contains the logic for handling HTTP requests for quiz sessions.
//! It uses `utoipa` doc comments to generate OpenAPI documentation.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use examiner_core::{Answer, QuizError};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    models::{
        AnswerPayload, CreateSessionPayload, ErrorResponse, HealthResponse, SessionView,
        StartResponse, TurnResponse,
    },
    state::AppState,
};

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    BadGateway(String),
    InternalServerError(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { message })).into_response()
            }
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(ErrorResponse { message })).into_response()
            }
            ApiError::Conflict(message) => {
                (StatusCode::CONFLICT, Json(ErrorResponse { message })).into_response()
            }
            ApiError::BadGateway(message) => {
                error!("Upstream failure: {}", message);
                (StatusCode::BAD_GATEWAY, Json(ErrorResponse { message })).into_response()
            }
            ApiError::InternalServerError(err) => {
                error!("Internal Server Error: {:?}", err);
                let message = "An internal server error occurred.".to_string();
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse { message }),
                )
                    .into_response()
            }
        }
    }
}

impl From<QuizError> for ApiError {
    fn from(err: QuizError) -> Self {
        match err {
            QuizError::EmptyAnswer | QuizError::InvalidSessionId(_) => {
                ApiError::BadRequest(err.to_string())
            }
            QuizError::SessionNotFound(_) => ApiError::NotFound(err.to_string()),
            QuizError::SessionAlreadyStarted(_)
            | QuizError::NotAwaitingAnswer { .. }
            | QuizError::SessionCompleted(_) => ApiError::Conflict(err.to_string()),
            QuizError::Llm(_) | QuizError::Embedding(_) => ApiError::BadGateway(err.to_string()),
            QuizError::MissingQuestion | QuizError::Store(_) => {
                ApiError::InternalServerError(err.into())
            }
        }
    }
}

/// Start a new quiz session and get its first question.
#[utoipa::path(
    post,
    path = "/sessions",
    request_body = CreateSessionPayload,
    responses(
        (status = 201, description = "Session started", body = StartResponse),
        (status = 400, description = "Invalid session id", body = ErrorResponse),
        (status = 409, description = "Session already in progress", body = ErrorResponse),
        (status = 502, description = "Language model unavailable", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateSessionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let session_id = payload
        .session_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let outcome = state.workflow.start(&session_id, &payload.topic).await?;
    info!(session_id = %outcome.session_id, "Session started over HTTP");

    Ok((StatusCode::CREATED, Json(StartResponse::from(outcome))))
}

/// Answer the pending question of a session.
#[utoipa::path(
    post,
    path = "/sessions/{id}/answer",
    request_body = AnswerPayload,
    responses(
        (status = 200, description = "Answer evaluated", body = TurnResponse),
        (status = 400, description = "Empty answer", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "Session is not awaiting an answer", body = ErrorResponse),
        (status = 502, description = "Model or embedding service unavailable", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    params(
        ("id" = String, Path, description = "Session ID")
    )
)]
pub async fn answer_question(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<AnswerPayload>,
) -> Result<Json<TurnResponse>, ApiError> {
    let outcome = state
        .workflow
        .resume(&id, Answer::Text(payload.answer))
        .await?;
    Ok(Json(outcome.into()))
}

/// Skip the pending question of a session.
#[utoipa::path(
    post,
    path = "/sessions/{id}/skip",
    responses(
        (status = 200, description = "Question skipped", body = TurnResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "Session is not awaiting an answer", body = ErrorResponse),
        (status = 502, description = "Language model unavailable", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    params(
        ("id" = String, Path, description = "Session ID")
    )
)]
pub async fn skip_question(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TurnResponse>, ApiError> {
    let outcome = state.workflow.skip(&id).await?;
    Ok(Json(outcome.into()))
}

/// Get the current state and results of a session.
#[utoipa::path(
    get,
    path = "/sessions/{id}",
    responses(
        (status = 200, description = "Session details", body = SessionView),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    params(
        ("id" = String, Path, description = "Session ID")
    )
)]
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, ApiError> {
    let quiz = state.workflow.status(&id).await?;
    Ok(Json(SessionView::new(id, quiz)))
}

/// Delete a session and its stored state.
#[utoipa::path(
    delete,
    path = "/sessions/{id}",
    responses(
        (status = 204, description = "Session deleted"),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    params(
        ("id" = String, Path, description = "Session ID")
    )
)]
pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.workflow.reset(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!(
            "Session with id '{}' not found",
            id
        )))
    }
}

/// Liveness check.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
