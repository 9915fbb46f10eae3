//! Examiner command-line quiz.
//!
//! Runs one quiz session in the terminal. Sessions are checkpointed to a
//! directory, so quitting and restarting with the same `--session-id` picks up
//! at the pending question.

mod repl;

use anyhow::Context;
use clap::Parser;
use examiner_core::{
    QuizWorkflow,
    config::{ModelConfig, validate_budget},
    embeddings::EmbeddingClient,
    llm_client::LLMClient,
    offline::{HashingEmbeddingClient, ScriptedLLMClient},
    prompts::Prompts,
    store::FileSessionStore,
};
use repl::{Repl, ReplExit};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{Level, info};

#[derive(Parser, Debug)]
#[command(name = "examiner", version, about = "Quiz yourself on a topic, scored by answer similarity")]
struct Args {
    /// Topic to be quizzed on
    #[arg(long, short, default_value = "Machine Learning")]
    topic: String,

    /// Session to start or resume
    #[arg(long, default_value = "1")]
    session_id: String,

    /// Directory holding session checkpoints
    #[arg(long, env = "EXAMINER_STATE_DIR", default_value = ".examiner")]
    state_dir: PathBuf,

    /// Use local scripted clients instead of the configured model services
    #[arg(long)]
    offline: bool,

    /// Number of questions in an offline quiz
    #[arg(long, default_value_t = 5)]
    offline_questions: u32,

    /// Log level written to stderr
    #[arg(long, env = "RUST_LOG", default_value = "WARN")]
    log_level: Level,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // stdout belongs to the conversation
    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    let store = Arc::new(
        FileSessionStore::open(&args.state_dir)
            .await
            .context("Failed to open session directory")?,
    );

    let (llm, embeddings, prompts, budget) = if args.offline {
        let budget = validate_budget(args.offline_questions, args.offline_questions)?;
        info!(questions = args.offline_questions, "Running offline");
        let llm: Arc<dyn LLMClient> =
            Arc::new(ScriptedLLMClient::demo(&args.topic, args.offline_questions));
        let embeddings: Arc<dyn EmbeddingClient> = Arc::new(HashingEmbeddingClient::default());
        (llm, embeddings, Prompts::default(), budget)
    } else {
        let model = ModelConfig::from_env().context("Failed to load configuration")?;
        info!(
            provider = ?model.llm_provider,
            model = %model.chat_model,
            embedding_model = %model.embedding_model,
            "Using configured model services"
        );
        let embeddings = model
            .build_embedding_client()
            .context("Failed to build embedding client")?;
        let prompts = model.load_prompts().context("Failed to load prompts")?;
        (model.build_llm_client(), embeddings, prompts, model.budget)
    };

    let workflow = QuizWorkflow::new(llm, embeddings, store, prompts, budget);

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let exit = Repl::new(&workflow, args.session_id.as_str(), args.topic.as_str())
        .run(stdin, &mut stdout)
        .await?;

    if exit == ReplExit::Completed {
        info!(session_id = %args.session_id, "Session finished");
    }
    Ok(())
}
