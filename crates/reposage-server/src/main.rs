//! RepoSage: multi-repository document question answering server.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

mod registry;
mod routes;
mod state;

use reposage_chat::{LLMConfig, LlmAnswerGenerator};
use reposage_core::{IndexBackend, RepoSageConfig};
use reposage_store::{InMemoryIndex, SqliteIndex, VectorIndex};
use state::AppState;

fn resolve_data_dir() -> PathBuf {
    std::env::var("REPOSAGE_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 {
        match args[1].as_str() {
            "--help" | "-h" | "help" => {
                println!("RepoSage: question answering over per-repository document collections");
                println!();
                println!("Usage: reposage");
                println!();
                println!("Environment:");
                println!("  REPOSAGE_DATA_DIR        Data root (default: data)");
                println!("  PORT                     HTTP port (default: 3003)");
                println!("  REPOSAGE_INDEX           sqlite | memory");
                println!("  REPOSAGE_FANOUT          concurrent | sequential");
                println!("  GEMINI_API_KEY, ANTHROPIC_API_KEY, GROQ_API_KEY, OPENAI_API_KEY");
                return Ok(());
            }
            other => {
                eprintln!("Unknown command: {}. Use 'reposage help' for usage.", other);
                std::process::exit(1);
            }
        }
    }

    let data_dir = resolve_data_dir();
    info!("Data directory: {}", data_dir.display());

    let config = RepoSageConfig::from_env(&data_dir)?;
    let port = config.port;

    // The ONNX model fixes its own width, so the index follows the embedder.
    let embedder = reposage_infer::create_embedder(&config.data_paths.models, config.embedding_dim);
    let index: Arc<dyn VectorIndex> = match config.index_backend {
        IndexBackend::Sqlite => Arc::new(
            SqliteIndex::open(&config.data_paths.vectordb, embedder.dimension())
                .map_err(|e| anyhow::anyhow!("Failed to open index: {}", e))?,
        ),
        IndexBackend::Memory => Arc::new(InMemoryIndex::new(embedder.dimension())),
    };

    let llm_config = LLMConfig::load(&config.data_paths.llm_config_file);
    let llm_status = llm_config.to_status();
    match &llm_status.active_provider {
        Some(provider) => info!(
            "LLM provider: {} ({})",
            provider,
            llm_status.active_model.as_deref().unwrap_or("default")
        ),
        None => tracing::warn!("No LLM provider configured; chat requests will fail"),
    }
    let generator = Arc::new(LlmAnswerGenerator::new(llm_config));

    let state = Arc::new(AppState::new(config, index, embedder, generator, llm_status)?);
    let app = routes::build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("RepoSage server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
