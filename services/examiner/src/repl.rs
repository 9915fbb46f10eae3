//! Interactive quiz loop.
//!
//! Reads answers line by line and prints feedback and questions. Generic over
//! the reader and writer so it can be driven from tests.

use anyhow::Result;
use examiner_core::{Answer, Phase, Question, QuizError, QuizWorkflow, TurnOutcome};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::warn;

const EXIT_COMMAND: &str = "exit";
const SKIP_COMMAND: &str = "skip";

/// How the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplExit {
    Completed,
    /// The user left, or input ended, with the quiz still in progress.
    Quit,
}

pub struct Repl<'a> {
    workflow: &'a QuizWorkflow,
    session_id: String,
    topic: String,
}

impl<'a> Repl<'a> {
    pub fn new(workflow: &'a QuizWorkflow, session_id: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            workflow,
            session_id: session_id.into(),
            topic: topic.into(),
        }
    }

    pub async fn run<R, W>(&self, input: R, output: &mut W) -> Result<ReplExit>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        write_line(
            output,
            &format!(
                "Welcome to the Examiner! Type '{}' to pass on a question, '{}' to quit.\n",
                SKIP_COMMAND, EXIT_COMMAND
            ),
        )
        .await?;

        if self.open(output).await? == ReplExit::Completed {
            return Ok(ReplExit::Completed);
        }

        let mut lines = input.lines();
        loop {
            output.write_all(b"You: ").await?;
            output.flush().await?;

            let Some(line) = lines.next_line().await? else {
                write_line(output, "").await?;
                return self.leave(output).await;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line.eq_ignore_ascii_case(EXIT_COMMAND) {
                return self.leave(output).await;
            }

            let answer = if line.eq_ignore_ascii_case(SKIP_COMMAND) {
                Answer::Skip
            } else {
                Answer::Text(line.to_string())
            };

            match self.workflow.resume(&self.session_id, answer).await {
                Ok(turn) => {
                    if show_turn(output, &turn).await? {
                        return Ok(ReplExit::Completed);
                    }
                }
                Err(e) => report(output, &e).await?,
            }
        }
    }

    /// Starts the session, or picks up the one already stored under this id.
    async fn open<W: AsyncWrite + Unpin>(&self, output: &mut W) -> Result<ReplExit> {
        let existing = match self.workflow.status(&self.session_id).await {
            Ok(state) => Some(state),
            Err(QuizError::SessionNotFound(_)) => None,
            Err(e) => return Err(e.into()),
        };

        match existing {
            Some(state) if state.phase == Phase::AwaitingAnswer => {
                write_line(
                    output,
                    &format!(
                        "Resuming session '{}' on {} (question {}).",
                        self.session_id, state.topic, state.questions_asked
                    ),
                )
                .await?;
                if let Some(question) = &state.next_question {
                    show_question(output, question).await?;
                }
                Ok(ReplExit::Quit)
            }
            Some(state)
                if state.phase == Phase::Evaluating
                    || (state.phase == Phase::Generating && state.questions_asked > 0) =>
            {
                write_line(output, "Finishing the interrupted turn...").await?;
                let pending = state.pending_answer.clone().unwrap_or(Answer::Skip);
                let turn = self.workflow.resume(&self.session_id, pending).await?;
                if show_turn(output, &turn).await? {
                    Ok(ReplExit::Completed)
                } else {
                    Ok(ReplExit::Quit)
                }
            }
            _ => {
                let started = self.workflow.start(&self.session_id, &self.topic).await;
                match started {
                    Ok(outcome) => {
                        show_question(output, &outcome.question).await?;
                        Ok(ReplExit::Quit)
                    }
                    Err(QuizError::SessionCompleted(_)) => {
                        let state = self.workflow.status(&self.session_id).await?;
                        if let Some(summary) = &state.summary {
                            write_line(output, &format!("Examiner: {}", summary)).await?;
                        }
                        Ok(ReplExit::Completed)
                    }
                    Err(e) => Err(e.into()),
                }
            }
        }
    }

    async fn leave<W: AsyncWrite + Unpin>(&self, output: &mut W) -> Result<ReplExit> {
        write_line(
            output,
            &format!(
                "Progress saved. Continue later with --session-id {}",
                self.session_id
            ),
        )
        .await?;
        Ok(ReplExit::Quit)
    }
}

/// Prints one turn. Returns true when the quiz is over.
async fn show_turn<W: AsyncWrite + Unpin>(output: &mut W, turn: &TurnOutcome) -> Result<bool> {
    write_line(output, &format!("Examiner: {}", turn.feedback)).await?;
    match &turn.next_question {
        Some(question) => {
            show_question(output, question).await?;
            Ok(false)
        }
        None => {
            if let Some(summary) = &turn.summary {
                write_line(output, &format!("Examiner: {}", summary)).await?;
            }
            if let Some(score) = turn.score {
                write_line(output, &format!("Final score: {:.1}/10", score)).await?;
            }
            write_line(output, "The quiz is complete. Goodbye!").await?;
            Ok(true)
        }
    }
}

async fn show_question<W: AsyncWrite + Unpin>(output: &mut W, question: &Question) -> Result<()> {
    write_line(output, &format!("Examiner: {}", question.display())).await
}

async fn report<W: AsyncWrite + Unpin>(output: &mut W, err: &QuizError) -> Result<()> {
    match err {
        QuizError::EmptyAnswer => write_line(output, &format!("Examiner: {}", err)).await,
        _ => {
            warn!(error = %err, "Turn failed");
            write_line(output, &format!("Error: {}", err)).await?;
            if err.is_upstream() {
                write_line(
                    output,
                    "Your progress is saved. Enter anything to retry the last step.",
                )
                .await?;
            }
            Ok(())
        }
    }
}

async fn write_line<W: AsyncWrite + Unpin>(output: &mut W, line: &str) -> Result<()> {
    output.write_all(line.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use examiner_core::{
        collector,
        generator::QuestionBudget,
        message::{ChatMessage, Role},
        offline::{HashingEmbeddingClient, ScriptedLLMClient},
        prompts::Prompts,
        state::AnswerRecord,
        store::{FileSessionStore, MemorySessionStore, SessionStore},
    };
    use std::sync::Arc;
    use tokio::io::BufReader;

    fn workflow_with(store: Arc<dyn SessionStore>, questions: u32) -> QuizWorkflow {
        QuizWorkflow::new(
            Arc::new(ScriptedLLMClient::demo("Rust", questions)),
            Arc::new(HashingEmbeddingClient::default()),
            store,
            Prompts::default(),
            QuestionBudget {
                min_questions: questions,
                max_questions: questions,
            },
        )
    }

    async fn drive(workflow: &QuizWorkflow, session_id: &str, input: &str) -> (ReplExit, String) {
        let mut output = Vec::new();
        let exit = Repl::new(workflow, session_id, "Rust")
            .run(BufReader::new(input.as_bytes()), &mut output)
            .await
            .unwrap();
        (exit, String::from_utf8(output).unwrap())
    }

    #[tokio::test]
    async fn test_runs_quiz_to_completion() {
        let workflow = workflow_with(Arc::new(MemorySessionStore::new()), 2);

        let (exit, output) = drive(
            &workflow,
            "1",
            "A core idea of Rust is ownership\n\nskip\n",
        )
        .await;

        assert_eq!(exit, ReplExit::Completed);
        assert!(output.contains("(#1)"));
        assert!(output.contains("(#2)"));
        assert!(output.contains("Examiner: Similarity score: "));
        assert!(output.contains("Examiner: Question was skipped"));
        assert!(output.contains("Final score: "));
        assert!(output.contains("The quiz is complete."));
    }

    #[tokio::test]
    async fn test_exit_keeps_session_for_later() {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn SessionStore> =
            Arc::new(FileSessionStore::open(dir.path()).await.unwrap());

        let workflow = workflow_with(store.clone(), 2);
        let (exit, output) = drive(&workflow, "learner", "exit\n").await;
        assert_eq!(exit, ReplExit::Quit);
        assert!(output.contains("--session-id learner"));

        // A fresh process over the same directory shows the pending question again.
        let workflow = workflow_with(store.clone(), 2);
        let (exit, output) = drive(&workflow, "learner", "").await;
        assert_eq!(exit, ReplExit::Quit);
        assert!(output.contains("Resuming session 'learner' on Rust (question 1)."));
        assert!(output.contains("(#1)"));

        let state = store.load("learner").await.unwrap().unwrap();
        assert_eq!(state.phase, Phase::AwaitingAnswer);
        assert!(state.results.is_empty());
    }

    #[tokio::test]
    async fn test_skip_and_exit_commands_are_case_insensitive() {
        let workflow = workflow_with(Arc::new(MemorySessionStore::new()), 3);
        let (exit, output) = drive(&workflow, "1", "SKIP\nExit\n").await;

        assert_eq!(exit, ReplExit::Quit);
        assert!(output.contains("Question was skipped"));
        assert!(output.contains("(#2)"));
        assert!(!output.contains("(#3)"));
    }

    #[tokio::test]
    async fn test_interrupted_evaluation_is_finished_on_open() {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        let workflow = workflow_with(store.clone(), 3);
        workflow.start("1", "Rust").await.unwrap();

        // Crash after the answer was recorded but before it was evaluated.
        let mut state = store.load("1").await.unwrap().unwrap();
        collector::accept(&mut state, Answer::Text("Borrowing is checked at compile time".into()))
            .unwrap();
        store.save("1", &state).await.unwrap();

        let (exit, output) = drive(&workflow, "1", "").await;

        assert_eq!(exit, ReplExit::Quit);
        assert!(output.contains("Finishing the interrupted turn..."));
        assert!(output.contains("Examiner: Similarity score: "));
        assert!(output.contains("(#2)"));

        let state = store.load("1").await.unwrap().unwrap();
        assert_eq!(state.phase, Phase::AwaitingAnswer);
        assert_eq!(state.results.len(), 1);
        assert_eq!(
            state.results[0].answer.as_deref(),
            Some("Borrowing is checked at compile time")
        );
        let answers = state
            .messages
            .iter()
            .filter(|m| m.role == Role::User && m.content == "Borrowing is checked at compile time")
            .count();
        assert_eq!(answers, 1);
    }

    #[tokio::test]
    async fn test_interrupted_generation_is_finished_on_open() {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        let workflow = workflow_with(store.clone(), 3);
        let started = workflow.start("1", "Rust").await.unwrap();

        // Crash after a skip was recorded but before the next question came back.
        let mut state = store.load("1").await.unwrap().unwrap();
        collector::accept(&mut state, Answer::Skip).unwrap();
        state.results.push(AnswerRecord::skipped(started.question.text));
        state.push(ChatMessage::assistant("Question was skipped"));
        state.pending_answer = None;
        state.phase = Phase::Generating;
        store.save("1", &state).await.unwrap();

        let (exit, output) = drive(&workflow, "1", "").await;

        assert_eq!(exit, ReplExit::Quit);
        assert!(output.contains("Finishing the interrupted turn..."));
        assert!(output.contains("Examiner: Question was skipped"));
        assert!(output.contains("(#2)"));

        let state = store.load("1").await.unwrap().unwrap();
        assert_eq!(state.phase, Phase::AwaitingAnswer);
        assert_eq!(state.results.len(), 1);
        assert_eq!(state.questions_asked, 2);
    }
}
