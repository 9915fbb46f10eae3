//! Quiz Workflow Orchestrator
//!
//! Drives the fixed generate → collect → evaluate cycle for a session and
//! checkpoints the state after every node. The collection step is a logical
//! pause: `start` and `resume` return as soon as a question is waiting, and a
//! later `resume` (possibly from another process) picks the session up from
//! its persisted [`Phase`].

use crate::{
    collector,
    embeddings::EmbeddingClient,
    error::{QuizError, QuizResult},
    evaluator::AnswerEvaluator,
    generator::{Generated, QuestionBudget, QuestionGenerator},
    llm_client::LLMClient,
    message::ChatMessage,
    prompts::Prompts,
    state::{Answer, Phase, Question, QuizState, normalize_topic},
    store::{SessionStore, is_valid_session_id},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// User entry that opens every session's conversation.
pub const KICKOFF_MESSAGE: &str = "start";

/// Returned by [`QuizWorkflow::start`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StartOutcome {
    pub session_id: String,
    pub question: Question,
}

/// Returned by [`QuizWorkflow::resume`]. `next_question == None` means the quiz is over.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnOutcome {
    pub feedback: String,
    pub next_question: Option<Question>,
    pub summary: Option<String>,
    /// Final score out of ten, present once the quiz is over.
    pub score: Option<f32>,
}

impl TurnOutcome {
    pub fn is_complete(&self) -> bool {
        self.next_question.is_none()
    }
}

pub struct QuizWorkflow {
    store: Arc<dyn SessionStore>,
    generator: QuestionGenerator,
    evaluator: AnswerEvaluator,
}

impl QuizWorkflow {
    pub fn new(
        llm: Arc<dyn LLMClient>,
        embeddings: Arc<dyn EmbeddingClient>,
        store: Arc<dyn SessionStore>,
        prompts: Prompts,
        budget: QuestionBudget,
    ) -> Self {
        let prompts = Arc::new(prompts);
        Self {
            store,
            generator: QuestionGenerator::new(llm.clone(), prompts.clone(), budget),
            evaluator: AnswerEvaluator::new(llm, embeddings, prompts),
        }
    }

    /// Opens a session on `topic` and returns its first question.
    ///
    /// A session that failed during its first generation is retried in place
    /// on its stored topic; a finished one is replaced.
    #[instrument(skip_all, fields(session_id = %session_id))]
    pub async fn start(&self, session_id: &str, topic: &str) -> QuizResult<StartOutcome> {
        if !is_valid_session_id(session_id) {
            return Err(QuizError::InvalidSessionId(session_id.to_string()));
        }

        let mut state = match self.load(session_id).await? {
            Some(existing) if existing.phase == Phase::Generating && existing.questions_asked == 0 => {
                let requested = normalize_topic(topic);
                if requested != existing.topic {
                    warn!(
                        stored = %existing.topic,
                        requested = %requested,
                        "Session already has a topic; keeping the stored one"
                    );
                }
                info!(topic = %existing.topic, "Retrying generation of the first question");
                existing
            }
            Some(existing) if !existing.is_done() => {
                return Err(QuizError::SessionAlreadyStarted(session_id.to_string()));
            }
            _ => {
                let mut state = QuizState::new(topic);
                self.generator.ensure_system_instruction(&mut state);
                state.push(ChatMessage::user(KICKOFF_MESSAGE));
                info!(topic = %state.topic, "Starting quiz session");
                state
            }
        };
        self.save(session_id, &state).await?;

        match self.generator.generate(&mut state).await? {
            Generated::Question(_) => {
                let question = collector::suspend(&mut state)?;
                self.save(session_id, &state).await?;
                Ok(StartOutcome {
                    session_id: session_id.to_string(),
                    question,
                })
            }
            Generated::Completed(_) => {
                state.phase = Phase::Done;
                self.save(session_id, &state).await?;
                Err(QuizError::SessionCompleted(session_id.to_string()))
            }
        }
    }

    /// Feeds `answer` into the paused session, evaluates it and generates the next turn.
    ///
    /// Safe to repeat after a failure: the session continues from the last
    /// checkpoint and an already recorded answer is not recorded twice.
    #[instrument(skip_all, fields(session_id = %session_id))]
    pub async fn resume(&self, session_id: &str, answer: Answer) -> QuizResult<TurnOutcome> {
        let mut state = self
            .load(session_id)
            .await?
            .ok_or_else(|| QuizError::SessionNotFound(session_id.to_string()))?;

        match state.phase {
            Phase::Done => return Err(QuizError::SessionCompleted(session_id.to_string())),
            Phase::AwaitingAnswer => {
                collector::accept(&mut state, answer)?;
                self.save(session_id, &state).await?;
            }
            Phase::Evaluating => {
                if state.pending_answer.as_ref() != Some(&answer) {
                    warn!("Session is re-evaluating its recorded answer; ignoring the new one");
                }
            }
            Phase::Generating => {
                info!("Retrying generation of the next question");
            }
        }

        if state.phase == Phase::Evaluating {
            self.evaluator.record(&mut state).await?;
            state.phase = Phase::Generating;
            self.save(session_id, &state).await?;
        }

        let feedback = state
            .results
            .last()
            .map(|r| r.evaluation.clone())
            .unwrap_or_default();

        match self.generator.generate(&mut state).await? {
            Generated::Question(_) => {
                let question = collector::suspend(&mut state)?;
                self.save(session_id, &state).await?;
                Ok(TurnOutcome {
                    feedback,
                    next_question: Some(question),
                    summary: None,
                    score: None,
                })
            }
            Generated::Completed(summary) => {
                state.phase = Phase::Done;
                self.save(session_id, &state).await?;
                let score = state.score_out_of_ten();
                info!(score = ?score, "Quiz session finished");
                Ok(TurnOutcome {
                    feedback,
                    next_question: None,
                    summary: Some(summary),
                    score,
                })
            }
        }
    }

    /// Shorthand for resuming with [`Answer::Skip`].
    pub async fn skip(&self, session_id: &str) -> QuizResult<TurnOutcome> {
        self.resume(session_id, Answer::Skip).await
    }

    pub async fn status(&self, session_id: &str) -> QuizResult<QuizState> {
        self.load(session_id)
            .await?
            .ok_or_else(|| QuizError::SessionNotFound(session_id.to_string()))
    }

    /// Discards the session. Returns whether it existed.
    pub async fn reset(&self, session_id: &str) -> QuizResult<bool> {
        let existed = self
            .store
            .delete(session_id)
            .await
            .map_err(QuizError::Store)?;
        if existed {
            info!(session_id, "Session reset");
        }
        Ok(existed)
    }

    async fn load(&self, session_id: &str) -> QuizResult<Option<QuizState>> {
        self.store.load(session_id).await.map_err(QuizError::Store)
    }

    async fn save(&self, session_id: &str, state: &QuizState) -> QuizResult<()> {
        self.store
            .save(session_id, state)
            .await
            .map_err(QuizError::Store)
    }
}
