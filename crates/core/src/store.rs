//! Session Stores
//!
//! Durable, keyed storage for [`QuizState`]. The workflow checkpoints after
//! every node, so whatever a store returns from `load` must be exactly what
//! was last passed to `save`.

use crate::state::QuizState;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Keyed persistence for quiz sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, session_id: &str) -> Result<Option<QuizState>>;
    async fn save(&self, session_id: &str, state: &QuizState) -> Result<()>;
    /// Removes the session, returning whether it existed.
    async fn delete(&self, session_id: &str) -> Result<bool>;
}

/// Session ids double as keys and file names, so keep them to a safe alphabet.
pub fn is_valid_session_id(session_id: &str) -> bool {
    !session_id.is_empty()
        && session_id.len() <= 128
        && session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// In-process store. States are kept serialized so a load always goes
/// through the same round trip as a durable store.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, session_id: &str) -> Result<Option<QuizState>> {
        let sessions = self.sessions.lock().await;
        sessions
            .get(session_id)
            .map(|json| serde_json::from_str(json).context("Failed to deserialize session state"))
            .transpose()
    }

    async fn save(&self, session_id: &str, state: &QuizState) -> Result<()> {
        let json = serde_json::to_string(state).context("Failed to serialize session state")?;
        self.sessions
            .lock()
            .await
            .insert(session_id.to_string(), json);
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<bool> {
        Ok(self.sessions.lock().await.remove(session_id).is_some())
    }
}

/// One pretty-printed JSON file per session inside a directory.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    /// Creates the store, creating `dir` if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Could not create state directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, session_id: &str) -> Result<PathBuf> {
        anyhow::ensure!(
            is_valid_session_id(session_id),
            "Invalid session id: '{}'",
            session_id
        );
        Ok(self.dir.join(format!("{}.json", session_id)))
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self, session_id: &str) -> Result<Option<QuizState>> {
        let path = self.path_for(session_id)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(json) => Ok(Some(serde_json::from_str(&json).with_context(|| {
                format!("Corrupt session file {}", path.display())
            })?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Could not read {}", path.display())),
        }
    }

    async fn save(&self, session_id: &str, state: &QuizState) -> Result<()> {
        let path = self.path_for(session_id)?;
        let json = serde_json::to_string_pretty(state)?;
        // Readers only ever see a complete file: write aside, then rename.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .with_context(|| format!("Could not write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<bool> {
        let path = self.path_for(session_id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
