//! API Models
//!
//! Request and response bodies for the session endpoints, with `utoipa`
//! schemas for the OpenAPI document.

use chrono::{DateTime, Utc};
use examiner_core::{
    Question, QuizState, StartOutcome, TurnOutcome, state::AnswerRecord,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct CreateSessionPayload {
    /// Blank topics fall back to "General".
    #[serde(default)]
    #[schema(example = "Machine Learning")]
    pub topic: String,
    /// Generated by the server when absent.
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub session_id: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct AnswerPayload {
    #[schema(example = "Supervised learning fits a model to labelled examples.")]
    pub answer: String,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct QuestionView {
    /// The question to answer.
    pub text: String,
    /// Model prose around the question, possibly empty.
    pub preamble: String,
}

impl From<Question> for QuestionView {
    fn from(question: Question) -> Self {
        Self {
            text: question.text,
            preamble: question.preamble,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct StartResponse {
    pub session_id: String,
    pub question: QuestionView,
}

impl From<StartOutcome> for StartResponse {
    fn from(outcome: StartOutcome) -> Self {
        Self {
            session_id: outcome.session_id,
            question: outcome.question.into(),
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct TurnResponse {
    #[schema(example = "Similarity score: 0.8123")]
    pub feedback: String,
    /// Absent once the quiz is over.
    pub next_question: Option<QuestionView>,
    pub summary: Option<String>,
    /// Final score out of ten.
    pub score: Option<f32>,
    pub complete: bool,
}

impl From<TurnOutcome> for TurnResponse {
    fn from(outcome: TurnOutcome) -> Self {
        let complete = outcome.is_complete();
        Self {
            feedback: outcome.feedback,
            next_question: outcome.next_question.map(QuestionView::from),
            summary: outcome.summary,
            score: outcome.score,
            complete,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct ResultView {
    pub question: String,
    pub answer: Option<String>,
    pub evaluation: String,
    pub similarity: Option<f32>,
}

impl From<AnswerRecord> for ResultView {
    fn from(record: AnswerRecord) -> Self {
        Self {
            question: record.question,
            answer: record.answer,
            evaluation: record.evaluation,
            similarity: record.similarity,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct SessionView {
    pub session_id: String,
    pub topic: String,
    #[schema(example = "awaiting_answer")]
    pub phase: String,
    pub questions_asked: u32,
    /// The question currently waiting for an answer.
    pub question: Option<QuestionView>,
    pub results: Vec<ResultView>,
    pub summary: Option<String>,
    pub score: Option<f32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionView {
    pub fn new(session_id: impl Into<String>, state: QuizState) -> Self {
        let score = state.is_done().then(|| state.score_out_of_ten()).flatten();
        let question = if state.is_done() {
            None
        } else {
            state.next_question.map(QuestionView::from)
        };
        Self {
            session_id: session_id.into(),
            topic: state.topic,
            phase: state.phase.to_string(),
            questions_asked: state.questions_asked,
            question,
            results: state.results.into_iter().map(ResultView::from).collect(),
            summary: state.summary,
            score,
            created_at: state.created_at,
            updated_at: state.updated_at,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
}
