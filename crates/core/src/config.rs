//! Model Configuration
//!
//! Which language model and embedding service the quiz talks to, and how
//! many questions a session asks. Shared by the API service and the CLI.

use crate::{
    embeddings::{
        DEFAULT_REQUEST_TIMEOUT, EmbeddingClient, EmbeddingError, HuggingFaceEmbeddingClient,
        OpenAIEmbeddingClient,
    },
    generator::QuestionBudget,
    llm_client::{LLMClient, OpenAICompatibleClient},
    prompts::Prompts,
};
use async_openai::config::OpenAIConfig;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Chat completion providers, all reached through their OpenAI-compatible endpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAI,
    Groq,
    Gemini,
}

impl LlmProvider {
    pub fn api_base(&self) -> &'static str {
        match self {
            LlmProvider::OpenAI => "https://api.openai.com/v1",
            LlmProvider::Groq => "https://api.groq.com/openai/v1",
            LlmProvider::Gemini => "https://generativelanguage.googleapis.com/v1beta/openai",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            LlmProvider::OpenAI => "gpt-4o-mini",
            LlmProvider::Groq => "llama-3.3-70b-versatile",
            LlmProvider::Gemini => "gemini-2.0-flash",
        }
    }

    pub fn api_key_var(&self) -> &'static str {
        match self {
            LlmProvider::OpenAI => "OPENAI_API_KEY",
            LlmProvider::Groq => "GROQ_API_KEY",
            LlmProvider::Gemini => "GEMINI_API_KEY",
        }
    }
}

/// Embedding services.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmbeddingProvider {
    HuggingFace,
    OpenAI,
}

impl EmbeddingProvider {
    pub fn default_model(&self) -> &'static str {
        match self {
            EmbeddingProvider::HuggingFace => "sentence-transformers/all-MiniLM-L6-v2",
            EmbeddingProvider::OpenAI => "text-embedding-3-small",
        }
    }
}

/// Holds the model-facing configuration loaded from the environment.
#[derive(Clone, Debug)]
pub struct ModelConfig {
    pub llm_provider: LlmProvider,
    pub llm_api_key: String,
    pub chat_model: String,
    pub embedding_provider: EmbeddingProvider,
    pub embedding_api_key: Option<String>,
    pub embedding_model: String,
    /// Per-request timeout of the Hugging Face client.
    pub embedding_timeout: Duration,
    pub budget: QuestionBudget,
    pub prompts_path: Option<PathBuf>,
}

impl ModelConfig {
    /// Loads configuration from environment variables.
    ///
    /// Reads the process environment only; binaries load `.env` themselves.
    pub fn from_env() -> Result<Self, ConfigError> {
        let provider_str = std::env::var("LLM_PROVIDER").unwrap_or_else(|_| "groq".to_string());
        let llm_provider = match provider_str.to_lowercase().as_str() {
            "openai" => LlmProvider::OpenAI,
            "groq" => LlmProvider::Groq,
            "gemini" => LlmProvider::Gemini,
            other => {
                return Err(ConfigError::InvalidValue(
                    "LLM_PROVIDER".to_string(),
                    format!("'{}' is not one of openai, groq, gemini", other),
                ));
            }
        };

        let key_var = llm_provider.api_key_var();
        let llm_api_key = std::env::var(key_var).map_err(|_| {
            ConfigError::MissingVar(format!(
                "{} must be set for '{}' provider",
                key_var,
                provider_str.to_lowercase()
            ))
        })?;

        let chat_model = std::env::var("CHAT_MODEL")
            .unwrap_or_else(|_| llm_provider.default_model().to_string());

        let embedding_str =
            std::env::var("EMBEDDING_PROVIDER").unwrap_or_else(|_| "huggingface".to_string());
        let embedding_provider = match embedding_str.to_lowercase().as_str() {
            "huggingface" | "hf" => EmbeddingProvider::HuggingFace,
            "openai" => EmbeddingProvider::OpenAI,
            other => {
                return Err(ConfigError::InvalidValue(
                    "EMBEDDING_PROVIDER".to_string(),
                    format!("'{}' is not one of huggingface, openai", other),
                ));
            }
        };

        let embedding_api_key = match embedding_provider {
            EmbeddingProvider::HuggingFace => std::env::var("HF_API_KEY").ok(),
            EmbeddingProvider::OpenAI => Some(std::env::var("OPENAI_API_KEY").map_err(|_| {
                ConfigError::MissingVar(
                    "OPENAI_API_KEY must be set for 'openai' embeddings".to_string(),
                )
            })?),
        };

        let embedding_model = std::env::var("EMBEDDING_MODEL")
            .unwrap_or_else(|_| embedding_provider.default_model().to_string());

        let embedding_timeout = Duration::from_secs(parse_u32_var(
            "EMBEDDING_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT.as_secs() as u32,
        )? as u64);

        let defaults = QuestionBudget::default();
        let min_questions = parse_u32_var("QUIZ_MIN_QUESTIONS", defaults.min_questions)?;
        let max_questions = parse_u32_var("QUIZ_MAX_QUESTIONS", defaults.max_questions)?;
        let budget = validate_budget(min_questions, max_questions)?;

        let prompts_path = std::env::var("PROMPTS_PATH").ok().map(PathBuf::from);

        Ok(Self {
            llm_provider,
            llm_api_key,
            chat_model,
            embedding_provider,
            embedding_api_key,
            embedding_model,
            embedding_timeout,
            budget,
            prompts_path,
        })
    }

    pub fn build_llm_client(&self) -> Arc<dyn LLMClient> {
        let config = OpenAIConfig::new()
            .with_api_key(&self.llm_api_key)
            .with_api_base(self.llm_provider.api_base());
        Arc::new(OpenAICompatibleClient::new(config, self.chat_model.clone()))
    }

    pub fn build_embedding_client(&self) -> Result<Arc<dyn EmbeddingClient>, EmbeddingError> {
        let client: Arc<dyn EmbeddingClient> = match self.embedding_provider {
            EmbeddingProvider::HuggingFace => Arc::new(
                HuggingFaceEmbeddingClient::new(
                    self.embedding_api_key.clone(),
                    self.embedding_model.clone(),
                )?
                .with_timeout(self.embedding_timeout)?,
            ),
            EmbeddingProvider::OpenAI => {
                let config = OpenAIConfig::new()
                    .with_api_key(self.embedding_api_key.clone().unwrap_or_default())
                    .with_api_base(LlmProvider::OpenAI.api_base());
                Arc::new(OpenAIEmbeddingClient::new(
                    config,
                    self.embedding_model.clone(),
                ))
            }
        };
        Ok(client)
    }

    /// Compiled-in prompts, with overrides from `prompts_path` when set.
    pub fn load_prompts(&self) -> anyhow::Result<Prompts> {
        match &self.prompts_path {
            Some(dir) => Prompts::from_dir(dir),
            None => Ok(Prompts::default()),
        }
    }
}

/// Checks the question range: at least one question, `min <= max`.
pub fn validate_budget(min_questions: u32, max_questions: u32) -> Result<QuestionBudget, ConfigError> {
    if min_questions == 0 || min_questions > max_questions {
        return Err(ConfigError::InvalidValue(
            "QUIZ_MIN_QUESTIONS".to_string(),
            format!(
                "need 1 <= min ({}) <= max ({})",
                min_questions, max_questions
            ),
        ));
    }
    Ok(QuestionBudget {
        min_questions,
        max_questions,
    })
}

fn parse_u32_var(name: &str, default: u32) -> Result<u32, ConfigError> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<u32>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}
