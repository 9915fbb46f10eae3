//! Question Generation Node
//!
//! Ensures the system instruction heads the history, asks the model for the
//! next turn, and splits the reply into a [`Question`] or a final summary.

use crate::{
    error::{QuizError, QuizResult},
    llm_client::LLMClient,
    message::ChatMessage,
    prompts::Prompts,
    state::{Question, QuizState},
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Line prefix that introduces the literal question in a model reply.
pub const QUESTION_MARKER: &str = "QUESTION:";
/// Marker the model emits once it decides the quiz is over.
pub const COMPLETE_MARKER: &str = "[QUIZ_COMPLETE]";

/// How many questions a session may ask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionBudget {
    /// Completion requested by the model is ignored before this many questions.
    pub min_questions: u32,
    /// After this many questions the session is wrapped up unconditionally.
    pub max_questions: u32,
}

impl Default for QuestionBudget {
    fn default() -> Self {
        Self {
            min_questions: 5,
            max_questions: 8,
        }
    }
}

/// Result of one generation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generated {
    Question(Question),
    Completed(String),
}

/// A model reply, before the question budget is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReply {
    pub complete: bool,
    pub question: Question,
}

pub struct QuestionGenerator {
    llm: Arc<dyn LLMClient>,
    prompts: Arc<Prompts>,
    budget: QuestionBudget,
}

impl QuestionGenerator {
    pub fn new(llm: Arc<dyn LLMClient>, prompts: Arc<Prompts>, budget: QuestionBudget) -> Self {
        Self {
            llm,
            prompts,
            budget,
        }
    }

    /// Inserts the system instruction at the head of the history unless it is already there.
    pub fn ensure_system_instruction(&self, state: &mut QuizState) {
        if state.has_system_instruction() {
            return;
        }
        let instruction = self.prompts.system_instruction(
            &state.topic,
            self.budget.min_questions,
            self.budget.max_questions,
        );
        state.messages.insert(0, ChatMessage::system(instruction));
        state.touch();
    }

    /// Runs the model over the history and records its reply.
    ///
    /// On a model failure the state is left untouched apart from the system
    /// instruction, so the step can be retried.
    pub async fn generate(&self, state: &mut QuizState) -> QuizResult<Generated> {
        self.ensure_system_instruction(state);

        let wrapping_up = state.questions_asked >= self.budget.max_questions;
        let mut request = state.messages.clone();
        if wrapping_up {
            request.push(ChatMessage::user(self.prompts.wrap_up.clone()));
        }

        debug!(
            topic = %state.topic,
            questions_asked = state.questions_asked,
            wrapping_up,
            "Generating next turn"
        );
        let reply = self.llm.complete(request).await.map_err(QuizError::Llm)?;

        let parsed = parse_reply(&reply);
        let may_complete = state.questions_asked >= self.budget.min_questions;

        if wrapping_up || (parsed.complete && may_complete) {
            let summary = strip_complete_marker(&reply);
            info!(questions_asked = state.questions_asked, "Quiz completed");
            state.push(ChatMessage::assistant(summary.clone()));
            state.next_question = None;
            state.summary = Some(summary.clone());
            return Ok(Generated::Completed(summary));
        }

        if parsed.complete {
            warn!(
                questions_asked = state.questions_asked,
                min_questions = self.budget.min_questions,
                "Model tried to finish early; continuing with its reply as a question"
            );
        }

        state.push(ChatMessage::assistant(reply));
        state.questions_asked += 1;
        state.next_question = Some(parsed.question.clone());
        info!(question_index = state.questions_asked, "Question generated");
        Ok(Generated::Question(parsed.question))
    }
}

/// Splits a model reply into the question and the prose preceding it.
///
/// The question starts at the first line beginning with [`QUESTION_MARKER`]
/// (case-insensitive, optional markdown emphasis). Without a marker the
/// whole reply is treated as the question.
pub fn parse_reply(reply: &str) -> ParsedReply {
    let complete = reply.contains(COMPLETE_MARKER);
    let body = strip_complete_marker(reply);

    let lines: Vec<&str> = body.lines().collect();
    let marker_line = lines.iter().position(|line| marker_offset(line).is_some());

    let question = match marker_line {
        Some(idx) => {
            let line = lines[idx];
            let offset = marker_offset(line).unwrap_or(0);
            let mut text = line[offset..].trim().trim_matches('*').trim().to_string();
            let rest = lines[idx + 1..].join("\n");
            if !rest.trim().is_empty() {
                if !text.is_empty() {
                    text.push('\n');
                }
                text.push_str(rest.trim());
            }
            Question {
                text,
                preamble: lines[..idx].join("\n").trim().to_string(),
            }
        }
        None => Question::new(body),
    };

    ParsedReply { complete, question }
}

/// Byte offset just past the marker when `line` starts with it.
fn marker_offset(line: &str) -> Option<usize> {
    let trimmed = line.trim_start();
    let lead = line.len() - trimmed.len();
    let unstarred = trimmed.trim_start_matches('*');
    let stars = trimmed.len() - unstarred.len();
    let candidate = unstarred.get(..QUESTION_MARKER.len())?;
    if candidate.eq_ignore_ascii_case(QUESTION_MARKER) {
        Some(lead + stars + QUESTION_MARKER.len())
    } else {
        None
    }
}

fn strip_complete_marker(reply: &str) -> String {
    reply.replace(COMPLETE_MARKER, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::MockLLMClient;
    use crate::message::Role;

    fn generator(llm: MockLLMClient, budget: QuestionBudget) -> QuestionGenerator {
        QuestionGenerator::new(Arc::new(llm), Arc::new(Prompts::default()), budget)
    }

    #[test]
    fn test_parse_reply_with_marker_and_preamble() {
        let reply = "Mostly correct, I'd give that 0.8.\nRunning total: 1.8/2\n\nQUESTION: What does the GIL protect?";
        let parsed = parse_reply(reply);
        assert!(!parsed.complete);
        assert_eq!(parsed.question.text, "What does the GIL protect?");
        assert_eq!(
            parsed.question.preamble,
            "Mostly correct, I'd give that 0.8.\nRunning total: 1.8/2"
        );
    }

    #[test]
    fn test_parse_reply_markdown_marker_and_continuation() {
        let reply = "Let's begin.\n**Question:** Explain list comprehensions.\nGive an example.";
        let parsed = parse_reply(reply);
        assert_eq!(
            parsed.question.text,
            "Explain list comprehensions.\nGive an example."
        );
        assert_eq!(parsed.question.preamble, "Let's begin.");
    }

    #[test]
    fn test_parse_reply_without_marker() {
        let parsed = parse_reply("  What is a decorator?  ");
        assert_eq!(parsed.question, Question::new("What is a decorator?"));
    }

    #[test]
    fn test_parse_reply_detects_completion() {
        let parsed = parse_reply("[QUIZ_COMPLETE]\nFinal score: 7/10. Well done.");
        assert!(parsed.complete);
        assert_eq!(parsed.question.text, "Final score: 7/10. Well done.");
    }

    #[test]
    fn test_marker_inside_a_sentence_is_not_a_marker() {
        let parsed = parse_reply("The next question: what is a tuple?");
        assert_eq!(parsed.question.preamble, "");
        assert_eq!(parsed.question.text, "The next question: what is a tuple?");
    }

    #[tokio::test]
    async fn test_system_instruction_inserted_once() {
        let mut llm = MockLLMClient::new();
        llm.expect_complete()
            .times(2)
            .returning(|_| Ok("QUESTION: What is Python?".to_string()));
        let generator = generator(llm, QuestionBudget::default());

        let mut state = QuizState::new("Python");
        state.push(ChatMessage::user("start"));
        generator.generate(&mut state).await.unwrap();
        generator.generate(&mut state).await.unwrap();

        let systems = state
            .messages
            .iter()
            .filter(|m| m.role == Role::System)
            .count();
        assert_eq!(systems, 1);
        assert_eq!(state.messages[0].role, Role::System);
        assert!(state.messages[0].content.contains("'Python'"));
        assert_eq!(state.messages[1], ChatMessage::user("start"));
        assert_eq!(state.questions_asked, 2);
    }

    #[tokio::test]
    async fn test_generated_question_is_stored() {
        let mut llm = MockLLMClient::new();
        llm.expect_complete()
            .withf(|messages| messages.len() == 2 && messages[0].role == Role::System)
            .times(1)
            .returning(|_| Ok("Welcome!\nQUESTION: What is a generator?".to_string()));
        let generator = generator(llm, QuestionBudget::default());

        let mut state = QuizState::new("Python");
        state.push(ChatMessage::user("start"));
        let generated = generator.generate(&mut state).await.unwrap();

        let expected = Question {
            text: "What is a generator?".to_string(),
            preamble: "Welcome!".to_string(),
        };
        assert_eq!(generated, Generated::Question(expected.clone()));
        assert_eq!(state.next_question, Some(expected));
        assert_eq!(
            state.messages.last().unwrap(),
            &ChatMessage::assistant("Welcome!\nQUESTION: What is a generator?")
        );
    }

    #[tokio::test]
    async fn test_early_completion_is_ignored() {
        let mut llm = MockLLMClient::new();
        llm.expect_complete()
            .returning(|_| Ok("[QUIZ_COMPLETE]\nQUESTION: One more: what is PEP 8?".to_string()));
        let generator = generator(
            llm,
            QuestionBudget {
                min_questions: 3,
                max_questions: 5,
            },
        );

        let mut state = QuizState::new("Python");
        state.questions_asked = 1;
        let generated = generator.generate(&mut state).await.unwrap();

        assert_eq!(
            generated,
            Generated::Question(Question::new("One more: what is PEP 8?"))
        );
        assert_eq!(state.questions_asked, 2);
        assert_eq!(state.summary, None);
    }

    #[tokio::test]
    async fn test_completion_honoured_after_minimum() {
        let mut llm = MockLLMClient::new();
        llm.expect_complete()
            .returning(|_| Ok("[QUIZ_COMPLETE]\nFinal score: 8/10.".to_string()));
        let generator = generator(
            llm,
            QuestionBudget {
                min_questions: 2,
                max_questions: 5,
            },
        );

        let mut state = QuizState::new("Python");
        state.questions_asked = 2;
        state.next_question = Some(Question::new("old"));
        let generated = generator.generate(&mut state).await.unwrap();

        assert_eq!(generated, Generated::Completed("Final score: 8/10.".to_string()));
        assert_eq!(state.next_question, None);
        assert_eq!(state.summary.as_deref(), Some("Final score: 8/10."));
        assert_eq!(state.questions_asked, 2);
        // The history keeps the summary, not the raw marker.
        assert_eq!(
            state.messages.last().unwrap(),
            &ChatMessage::assistant("Final score: 8/10.")
        );
        assert!(!state.messages.iter().any(|m| m.content.contains(COMPLETE_MARKER)));
    }

    #[tokio::test]
    async fn test_budget_exhausted_sends_wrap_up_without_recording_it() {
        let mut llm = MockLLMClient::new();
        llm.expect_complete()
            .withf(|messages| {
                messages
                    .last()
                    .is_some_and(|m| m.role == Role::User && m.content.contains("last question"))
            })
            .times(1)
            .returning(|_| Ok("You scored 6/10.".to_string()));
        let generator = generator(
            llm,
            QuestionBudget {
                min_questions: 1,
                max_questions: 1,
            },
        );

        let mut state = QuizState::new("Python");
        state.questions_asked = 1;
        let before = state.messages.len();
        let generated = generator.generate(&mut state).await.unwrap();

        assert_eq!(generated, Generated::Completed("You scored 6/10.".to_string()));
        // system instruction + the summary reply, no wrap-up entry
        assert_eq!(state.messages.len(), before + 2);
        assert_eq!(state.messages.last().unwrap().role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_model_failure_propagates() {
        let mut llm = MockLLMClient::new();
        llm.expect_complete()
            .returning(|_| Err(anyhow::anyhow!("rate limited")));
        let generator = generator(llm, QuestionBudget::default());

        let mut state = QuizState::new("Python");
        let err = generator.generate(&mut state).await.unwrap_err();
        assert!(matches!(err, QuizError::Llm(_)));
        assert_eq!(state.questions_asked, 0);
        assert_eq!(state.next_question, None);
        assert_eq!(state.messages.len(), 1);
    }
}
