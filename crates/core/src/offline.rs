//! Offline Clients
//!
//! Deterministic stand-ins for the language model and the embedding service.
//! They need no network access or API keys, which makes them useful for
//! local demos (`--offline`) and for integration tests.

use crate::{
    embeddings::{EmbeddingClient, EmbeddingError},
    generator::COMPLETE_MARKER,
    llm_client::LLMClient,
    message::{ChatMessage, Role},
};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replays a fixed script of generation replies.
///
/// Requests that carry a system instruction are generation turns and consume
/// the next scripted reply; requests without one are reference-answer
/// requests and receive `reference_answer`. Once the script is exhausted,
/// every generation turn completes the quiz.
pub struct ScriptedLLMClient {
    replies: Mutex<VecDeque<String>>,
    reference_answer: String,
}

impl ScriptedLLMClient {
    pub fn new(replies: Vec<String>, reference_answer: impl Into<String>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            reference_answer: reference_answer.into(),
        }
    }

    /// A short canned quiz on `topic`.
    pub fn demo(topic: &str, questions: u32) -> Self {
        let mut replies: Vec<String> = (1..=questions)
            .map(|n| {
                format!(
                    "Evaluation question {n} of {questions}.\nQUESTION: In one or two sentences, explain a core idea of {topic} that you consider important (#{n})."
                )
            })
            .collect();
        replies.push(format!(
            "{COMPLETE_MARKER}\nThat concludes the evaluation on {topic}. Thanks for taking part!"
        ));
        Self::new(
            replies,
            format!("A core idea of {topic} is understanding its fundamental concepts and applying them."),
        )
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl LLMClient for ScriptedLLMClient {
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let is_generation = messages.first().is_some_and(|m| m.role == Role::System);
        if !is_generation {
            return Ok(self.reference_answer.clone());
        }
        let mut replies = self
            .replies
            .lock()
            .map_err(|_| anyhow::anyhow!("scripted reply queue poisoned"))?;
        Ok(replies
            .pop_front()
            .unwrap_or_else(|| format!("{COMPLETE_MARKER}\nNo more questions.")))
    }
}

/// Hashes lowercase words into a fixed number of buckets.
///
/// Texts sharing vocabulary end up close; text without any words embeds to
/// the zero vector.
#[derive(Debug, Clone)]
pub struct HashingEmbeddingClient {
    dimensions: usize,
}

impl HashingEmbeddingClient {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let bucket = fnv1a(&word.to_lowercase()) as usize % self.dimensions;
            vector[bucket] += 1.0;
        }
        vector
    }
}

impl Default for HashingEmbeddingClient {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
impl EmbeddingClient for HashingEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self.embed_sync(text))
    }
}

fn fnv1a(s: &str) -> u64 {
    s.bytes().fold(0xcbf29ce484222325u64, |hash, b| {
        (hash ^ b as u64).wrapping_mul(0x100000001b3)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::cosine_similarity;

    #[tokio::test]
    async fn test_script_is_replayed_then_completes() {
        let llm = ScriptedLLMClient::new(vec!["QUESTION: one".into()], "ref");
        let generation = vec![ChatMessage::system("rules"), ChatMessage::user("start")];

        assert_eq!(llm.complete(generation.clone()).await.unwrap(), "QUESTION: one");
        assert_eq!(llm.remaining(), 0);
        assert!(llm.complete(generation).await.unwrap().starts_with(COMPLETE_MARKER));
    }

    #[tokio::test]
    async fn test_reference_requests_do_not_consume_script() {
        let llm = ScriptedLLMClient::new(vec!["QUESTION: one".into()], "ref");
        let answer = llm.complete(vec![ChatMessage::user("Question: x")]).await.unwrap();
        assert_eq!(answer, "ref");
        assert_eq!(llm.remaining(), 1);
    }

    #[test]
    fn test_demo_script_length() {
        assert_eq!(ScriptedLLMClient::demo("Rust", 5).remaining(), 6);
    }

    #[test]
    fn test_hashing_embeddings_are_deterministic_and_comparable() {
        let client = HashingEmbeddingClient::default();
        let a = client.embed_sync("Ownership moves values");
        assert_eq!(a, client.embed_sync("ownership MOVES values!"));

        let close = client.embed_sync("ownership moves values between bindings");
        let far = client.embed_sync("photosynthesis");
        let near_score = cosine_similarity(&a, &close).unwrap();
        let far_score = cosine_similarity(&a, &far).unwrap();
        assert!(near_score > far_score);
    }

    #[test]
    fn test_hashing_empty_text_is_zero_vector() {
        let v = HashingEmbeddingClient::new(8).embed_sync("  ...  ");
        assert_eq!(v, vec![0.0; 8]);
    }
}
