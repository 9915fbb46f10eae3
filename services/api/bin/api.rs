//! Main Entrypoint for the Examiner API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Choosing the session store (Postgres when configured, memory otherwise).
//! 3. Initializing the model and embedding clients and the quiz workflow.
//! 4. Constructing the Axum router and applying middleware.
//! 5. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use examiner_api::{config::Config, db::PgSessionStore, router::create_router, state::AppState};
use examiner_core::{
    QuizWorkflow,
    store::{MemorySessionStore, SessionStore},
};
use sqlx::PgPool;
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal. Shutting down gracefully...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    // --- 3. Initialize Session Store ---
    let store: Arc<dyn SessionStore> = match &config.database_url {
        Some(database_url) => {
            let pool = PgPool::connect(database_url)
                .await
                .context("Failed to connect to database")?;
            let store = PgSessionStore::new(pool);
            store.run_migrations().await?;
            info!("Database connection established and migrations are up-to-date.");
            Arc::new(store)
        }
        None => {
            warn!("DATABASE_URL not set. Sessions will be kept in memory only.");
            Arc::new(MemorySessionStore::new())
        }
    };

    // --- 4. Initialize Shared Services ---
    let model = &config.model;
    let prompts = model.load_prompts().context("Failed to load prompts")?;
    let llm_client = model.build_llm_client();
    let embedding_client = model
        .build_embedding_client()
        .context("Failed to build embedding client")?;

    let workflow = QuizWorkflow::new(llm_client, embedding_client, store, prompts, model.budget);
    let app_state = Arc::new(AppState::new(workflow));

    // --- 5. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    // --- 6. Start Server ---
    info!(
        provider = ?model.llm_provider,
        model = %model.chat_model,
        embeddings = ?model.embedding_provider,
        embedding_model = %model.embedding_model,
        bind_address = %config.bind_address,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server has shut down.");
    Ok(())
}
