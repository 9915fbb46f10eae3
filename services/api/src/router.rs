//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the REST API and OpenAPI documentation.

use crate::{
    handlers,
    models::{
        AnswerPayload, CreateSessionPayload, ErrorResponse, HealthResponse, QuestionView,
        ResultView, SessionView, StartResponse, TurnResponse,
    },
    state::AppState,
};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::create_session,
        handlers::answer_question,
        handlers::skip_question,
        handlers::get_session,
        handlers::delete_session,
        handlers::health,
    ),
    components(
        schemas(CreateSessionPayload, AnswerPayload, QuestionView, StartResponse, TurnResponse, ResultView, SessionView, HealthResponse, ErrorResponse)
    ),
    tags(
        (name = "Examiner API", description = "Quiz sessions scored by answer similarity")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route("/sessions", post(handlers::create_session))
        .route(
            "/sessions/{id}",
            get(handlers::get_session).delete(handlers::delete_session),
        )
        .route("/sessions/{id}/answer", post(handlers::answer_question))
        .route("/sessions/{id}/skip", post(handlers::skip_question))
        .with_state(app_state);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(handlers::health))
        .merge(api_router)
}
