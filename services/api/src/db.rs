//! Data Access Layer
//!
//! A Postgres-backed [`SessionStore`]. Each session is one row in
//! `quiz_sessions`, with the complete workflow state in a JSONB column.

use anyhow::{Context, Result};
use async_trait::async_trait;
use examiner_core::{QuizState, store::SessionStore};
use sqlx::PgPool;

/// A wrapper around the `PgPool` storing quiz sessions.
#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs all pending `sqlx` migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn load(&self, session_id: &str) -> Result<Option<QuizState>> {
        let state_json: Option<serde_json::Value> =
            sqlx::query_scalar("SELECT state_json FROM quiz_sessions WHERE id = $1")
                .bind(session_id)
                .fetch_optional(&self.pool)
                .await?;

        state_json
            .map(|json| serde_json::from_value(json).context("Failed to deserialize session state"))
            .transpose()
    }

    async fn save(&self, session_id: &str, state: &QuizState) -> Result<()> {
        let state_json = serde_json::to_value(state)?;
        sqlx::query(
            r#"
            INSERT INTO quiz_sessions (id, topic, phase, state_json, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE
            SET topic = EXCLUDED.topic,
                phase = EXCLUDED.phase,
                state_json = EXCLUDED.state_json,
                created_at = EXCLUDED.created_at,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(session_id)
        .bind(&state.topic)
        .bind(state.phase.to_string())
        .bind(state_json)
        .bind(state.created_at)
        .bind(state.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM quiz_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
