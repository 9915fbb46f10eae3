//! Prompt Templates
//!
//! The instructions sent to the language model. Defaults are compiled in from
//! `crates/core/prompts/*.md`; a deployment can override any of them by
//! dropping a file with the same stem into its prompts directory.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::info;

const QUIZ_SYSTEM: &str = include_str!("../prompts/quiz_system.md");
const REFERENCE_ANSWER: &str = include_str!("../prompts/reference_answer.md");
const WRAP_UP: &str = include_str!("../prompts/wrap_up.md");

/// The set of templates used by the quiz nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompts {
    /// System instruction; placeholders `{topic}`, `{min}`, `{max}`.
    pub quiz_system: String,
    /// Reference-answer extraction; placeholder `{question}`.
    pub reference_answer: String,
    /// User instruction sent when the question budget is exhausted.
    pub wrap_up: String,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            quiz_system: QUIZ_SYSTEM.to_string(),
            reference_answer: REFERENCE_ANSWER.to_string(),
            wrap_up: WRAP_UP.to_string(),
        }
    }
}

impl Prompts {
    /// Loads the defaults, then replaces any template found as `<name>.md` in `dir`.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let mut prompts = Self::default();
        let overrides = load_prompts(dir)?;
        for (key, content) in overrides {
            match key.as_str() {
                "quiz_system" => prompts.quiz_system = content,
                "reference_answer" => prompts.reference_answer = content,
                "wrap_up" => prompts.wrap_up = content,
                other => {
                    tracing::warn!(prompt = other, "Ignoring unknown prompt template");
                    continue;
                }
            }
            info!(prompt = %key, "Loaded prompt override");
        }
        Ok(prompts)
    }

    pub fn system_instruction(&self, topic: &str, min: u32, max: u32) -> String {
        self.quiz_system
            .replace("{topic}", topic)
            .replace("{min}", &min.to_string())
            .replace("{max}", &max.to_string())
    }

    pub fn reference_request(&self, question: &str) -> String {
        self.reference_answer.replace("{question}", question)
    }
}

/// Reads every `.md` file in `dir` into a map keyed by file stem.
fn load_prompts(dir: &Path) -> Result<HashMap<String, String>> {
    let mut prompts = HashMap::new();
    for entry in fs::read_dir(dir)
        .with_context(|| format!("Could not read prompts directory {}", dir.display()))?
    {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("md") {
            let key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .context("Could not get file stem")?
                .to_string();
            prompts.insert(key, fs::read_to_string(&path)?);
        }
    }
    Ok(prompts)
}
