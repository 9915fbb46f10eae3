use crate::{embeddings::EmbeddingError, state::Phase};

/// Errors surfaced to the caller of a quiz turn.
#[derive(Debug, thiserror::Error)]
pub enum QuizError {
    #[error("Session '{0}' not found")]
    SessionNotFound(String),
    #[error("Session '{0}' has already been started")]
    SessionAlreadyStarted(String),
    #[error("Session is not awaiting an answer (current phase: {phase})")]
    NotAwaitingAnswer { phase: Phase },
    #[error("Session '{0}' is already complete")]
    SessionCompleted(String),
    #[error("Answer must not be empty; skip the question instead")]
    EmptyAnswer,
    #[error("Invalid session id: '{0}'")]
    InvalidSessionId(String),
    #[error("Session has no pending question")]
    MissingQuestion,
    #[error("Language model call failed: {0}")]
    Llm(#[source] anyhow::Error),
    #[error("Embedding call failed: {0}")]
    Embedding(#[from] EmbeddingError),
    #[error("Session store failure: {0}")]
    Store(#[source] anyhow::Error),
}

impl QuizError {
    /// True for failures of the external model or embedding services.
    pub fn is_upstream(&self) -> bool {
        matches!(self, QuizError::Llm(_) | QuizError::Embedding(_))
    }
}

pub type QuizResult<T> = Result<T, QuizError>;
