//! Examiner Core
//!
//! A conversational quiz agent: it asks a learner questions on a topic,
//! scores each free-text answer by embedding similarity against a
//! model-generated reference answer, and reports a final score.
//!
//! The workflow is a fixed generate → collect → evaluate cycle whose state is
//! checkpointed into a [`store::SessionStore`] after every step, so a session
//! paused while waiting for an answer can be resumed later, even by another
//! process.

pub mod collector;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod evaluator;
pub mod generator;
pub mod llm_client;
pub mod message;
pub mod offline;
pub mod prompts;
pub mod similarity;
pub mod state;
pub mod store;
pub mod workflow;

pub use error::{QuizError, QuizResult};
pub use state::{Answer, Phase, Question, QuizState};
pub use workflow::{QuizWorkflow, StartOutcome, TurnOutcome};
