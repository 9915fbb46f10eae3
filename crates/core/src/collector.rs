//! Answer Collection Node
//!
//! The suspension point of the workflow. Reaching it parks the session in
//! [`Phase::AwaitingAnswer`]; supplying an answer records it and hands the
//! session over to evaluation.

use crate::{
    error::{QuizError, QuizResult},
    message::ChatMessage,
    state::{Answer, Phase, Question, QuizState, SKIPPED_ANSWER},
};

/// Parks the session until the learner answers, returning the question to surface.
pub fn suspend(state: &mut QuizState) -> QuizResult<Question> {
    let question = state.next_question.clone().ok_or(QuizError::MissingQuestion)?;
    state.phase = Phase::AwaitingAnswer;
    state.touch();
    Ok(question)
}

/// Records the learner's answer as a user entry and moves the session to evaluation.
pub fn accept(state: &mut QuizState, answer: Answer) -> QuizResult<()> {
    if state.phase != Phase::AwaitingAnswer {
        return Err(QuizError::NotAwaitingAnswer { phase: state.phase });
    }
    let content = match &answer {
        Answer::Text(text) if text.trim().is_empty() => return Err(QuizError::EmptyAnswer),
        Answer::Text(text) => text.clone(),
        Answer::Skip => SKIPPED_ANSWER.to_string(),
    };

    state.push(ChatMessage::user(content));
    state.pending_answer = Some(answer);
    state.phase = Phase::Evaluating;
    Ok(())
}
