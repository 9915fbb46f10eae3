//! Answer Evaluation Node
//!
//! Scores a learner's answer against a reference answer produced by the
//! language model, using cosine similarity over their embeddings.

use crate::{
    embeddings::EmbeddingClient,
    error::{QuizError, QuizResult},
    llm_client::LLMClient,
    message::ChatMessage,
    prompts::Prompts,
    similarity::cosine_similarity,
    state::{Answer, AnswerRecord, Question, QuizState},
};
use std::sync::Arc;
use tracing::{debug, info};

/// Scored comparison of one answer.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub reference_answer: String,
    pub similarity: f32,
    pub feedback: String,
}

pub fn feedback_message(similarity: f32) -> String {
    format!("Similarity score: {:.4}", similarity)
}

pub struct AnswerEvaluator {
    llm: Arc<dyn LLMClient>,
    embeddings: Arc<dyn EmbeddingClient>,
    prompts: Arc<Prompts>,
}

impl AnswerEvaluator {
    pub fn new(
        llm: Arc<dyn LLMClient>,
        embeddings: Arc<dyn EmbeddingClient>,
        prompts: Arc<Prompts>,
    ) -> Self {
        Self {
            llm,
            embeddings,
            prompts,
        }
    }

    /// Compares `answer` with the model's own answer to `question`.
    pub async fn evaluate(&self, question: &Question, answer: &str) -> QuizResult<Evaluation> {
        let request = vec![ChatMessage::user(
            self.prompts.reference_request(&question.text),
        )];
        let reference_answer = self
            .llm
            .complete(request)
            .await
            .map_err(QuizError::Llm)?
            .trim()
            .to_string();
        debug!(reference = %reference_answer, "Reference answer generated");

        let reference_vector = self.embeddings.embed(&reference_answer).await?;
        let answer_vector = self.embeddings.embed(answer).await?;
        let similarity = cosine_similarity(&reference_vector, &answer_vector)?;

        Ok(Evaluation {
            reference_answer,
            similarity,
            feedback: feedback_message(similarity),
        })
    }

    /// Evaluates the pending answer and appends the feedback to the session.
    ///
    /// A skipped question is recorded without contacting either service.
    /// Returns the feedback text.
    pub async fn record(&self, state: &mut QuizState) -> QuizResult<String> {
        let question = state.next_question.clone().ok_or(QuizError::MissingQuestion)?;
        let answer = state.pending_answer.clone().ok_or(QuizError::NotAwaitingAnswer {
            phase: state.phase,
        })?;

        let record = match answer {
            Answer::Skip => AnswerRecord::skipped(question.text.clone()),
            Answer::Text(text) => {
                let evaluation = self.evaluate(&question, &text).await?;
                info!(similarity = evaluation.similarity, "Answer evaluated");
                AnswerRecord {
                    question: question.text.clone(),
                    answer: Some(text),
                    evaluation: evaluation.feedback,
                    similarity: Some(evaluation.similarity),
                }
            }
        };

        let feedback = record.evaluation.clone();
        state.push(ChatMessage::assistant(feedback.clone()));
        state.results.push(record);
        state.pending_answer = None;
        Ok(feedback)
    }
}
