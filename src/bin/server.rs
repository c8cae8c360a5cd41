//! HTTP server for the CDP support assistant
//!
//! Loads configuration, refuses to start without a usable OpenAI key, then
//! serves the chat API.

use anyhow::{Context, Result};
use cdp_assistant::api;
use cdp_assistant::config::{AppConfig, ConfigOverrides};
use cdp_assistant::document_store::document_store;
use cdp_assistant::llm::LlmClient;
use cdp_assistant::resolver::AnswerResolver;
use cdp_assistant::service::MessageService;
use cdp_assistant::storage::{MemStorage, MessageStorage};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cdp-assistant")]
#[command(about = "Answers questions about Segment, mParticle, Lytics and Zeotap")]
struct Args {
    /// Address to listen on (or set CDP_BIND_ADDR)
    #[arg(short, long)]
    bind: Option<String>,

    /// OpenAI API key (or set OPENAI_API_KEY env var)
    #[arg(long)]
    api_key: Option<String>,

    /// Chat model (or set OPENAI_MODEL)
    #[arg(long)]
    model: Option<String>,

    /// API base URL (or set OPENAI_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// Append-only JSON-lines file for message history (or set CDP_HISTORY_LOG)
    #[arg(long)]
    history_log: Option<PathBuf>,

    /// End-to-end bound on the LLM phase in seconds (or set CDP_PIPELINE_TIMEOUT_SECS)
    #[arg(long)]
    timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = AppConfig::load(ConfigOverrides {
        api_key: args.api_key,
        model: args.model,
        base_url: args.base_url,
        bind_addr: args.bind,
        history_log: args.history_log,
        pipeline_timeout_secs: args.timeout_secs,
    })
    .context("Refusing to start")?;

    info!(model = %config.model, base_url = %config.base_url, "OpenAI API key found");

    // Build the static documentation tables before the first request.
    let _ = document_store();

    let llm = LlmClient::new(
        config.api_key.clone(),
        config.model.clone(),
        config.base_url.clone(),
    )?;
    let resolver =
        AnswerResolver::new(Arc::new(llm)).with_pipeline_timeout(config.pipeline_timeout);

    let storage: Arc<dyn MessageStorage> = match &config.history_log {
        Some(path) => Arc::new(MemStorage::open_journal(path)?),
        None => Arc::new(MemStorage::new()),
    };

    let service = Arc::new(MessageService::new(resolver, storage));

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;

    api::serve(listener, service).await?;
    Ok(())
}
