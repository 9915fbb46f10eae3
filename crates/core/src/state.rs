//! Session State
//!
//! The single durable record kept per quiz session. Everything the workflow
//! needs to resume after a suspension, including its control-flow position,
//! lives here and round-trips through `serde`.

use crate::message::{ChatMessage, Role};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Topic used when the caller supplies a blank one.
pub const DEFAULT_TOPIC: &str = "General";

/// Evaluation text recorded for a skipped question.
pub const SKIPPED_EVALUATION: &str = "Question was skipped";

/// User entry recorded in the history for a skipped question.
pub const SKIPPED_ANSWER: &str = "Skipped";

/// Position of a session inside the generate → collect → evaluate cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Generating,
    AwaitingAnswer,
    Evaluating,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Generating => write!(f, "generating"),
            Phase::AwaitingAnswer => write!(f, "awaiting_answer"),
            Phase::Evaluating => write!(f, "evaluating"),
            Phase::Done => write!(f, "done"),
        }
    }
}

/// A generated question, split into the literal question and the model prose around it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// The question the learner has to answer. The evaluator only sees this.
    pub text: String,
    /// Feedback, scoring narrative or instructions that preceded the question.
    #[serde(default)]
    pub preamble: String,
}

impl Question {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            preamble: String::new(),
        }
    }

    /// Renders the question the way it should be presented to the learner.
    pub fn display(&self) -> String {
        if self.preamble.is_empty() {
            self.text.clone()
        } else {
            format!("{}\n\n{}", self.preamble, self.text)
        }
    }
}

/// What the learner supplied when the workflow was resumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum Answer {
    Text(String),
    Skip,
}

/// Outcome of one answered or skipped question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question: String,
    /// `None` when the question was skipped.
    pub answer: Option<String>,
    pub evaluation: String,
    pub similarity: Option<f32>,
}

impl AnswerRecord {
    pub fn skipped(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: None,
            evaluation: SKIPPED_EVALUATION.to_string(),
            similarity: None,
        }
    }
}

/// Persisted state of one quiz session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizState {
    pub messages: Vec<ChatMessage>,
    pub topic: String,
    pub next_question: Option<Question>,
    pub phase: Phase,
    /// Index of the current question, 0 until the first one is generated.
    pub questions_asked: u32,
    pub pending_answer: Option<Answer>,
    pub results: Vec<AnswerRecord>,
    pub summary: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QuizState {
    /// Creates an empty session for `topic`, falling back to [`DEFAULT_TOPIC`] when blank.
    pub fn new(topic: &str) -> Self {
        let topic = normalize_topic(topic);
        let now = Utc::now();
        Self {
            messages: Vec::new(),
            topic,
            next_question: None,
            phase: Phase::Generating,
            questions_asked: 0,
            pending_answer: None,
            results: Vec::new(),
            summary: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_system_instruction(&self) -> bool {
        self.messages
            .first()
            .is_some_and(|m| m.role == Role::System)
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    /// Mean similarity over the answers that were actually scored.
    pub fn average_similarity(&self) -> Option<f32> {
        let scores: Vec<f32> = self.results.iter().filter_map(|r| r.similarity).collect();
        if scores.is_empty() {
            return None;
        }
        Some(scores.iter().sum::<f32>() / scores.len() as f32)
    }

    /// Final score out of ten. Skipped questions count as zero.
    pub fn score_out_of_ten(&self) -> Option<f32> {
        if self.results.is_empty() {
            return None;
        }
        let total: f32 = self
            .results
            .iter()
            .map(|r| r.similarity.unwrap_or(0.0).clamp(0.0, 1.0))
            .sum();
        Some(total / self.results.len() as f32 * 10.0)
    }
}

pub(crate) fn normalize_topic(topic: &str) -> String {
    let trimmed = topic.trim();
    if trimmed.is_empty() {
        DEFAULT_TOPIC.to_string()
    } else {
        trimmed.to_string()
    }
}
