//! KGraph server
//!
//! Extracts knowledge graphs from text with an LLM, persists them in an
//! embedded SurrealDB property graph, and answers questions grounded in
//! an explanatory subgraph.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use kgraph_agents::LlmClient;
use kgraph_db::SurrealGraphStore;
use kgraph_server::{api, AppState, SessionContext};

/// KGraph - knowledge graph extraction and grounded chat
#[derive(Parser)]
#[command(name = "kgraph")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Port to listen on
    #[arg(short, long, default_value = "8000")]
    port: u16,

    /// Database path (defaults to ~/.kgraph/data)
    #[arg(short, long)]
    db_path: Option<PathBuf>,

    /// Use in-memory database (for testing)
    #[arg(long)]
    memory: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env if present.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Initialize database
    let db = if cli.memory {
        info!("Using in-memory database");
        kgraph_db::init_memory().await?
    } else {
        let db_path = cli.db_path.unwrap_or_else(|| {
            let mut path = dirs::home_dir().expect("Could not find home directory");
            path.push(".kgraph");
            path.push("data");
            path
        });

        // Ensure directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!("Using database at: {}", db_path.display());
        kgraph_db::init_persistent(&db_path).await?
    };

    // The LLM service is checked but not required at startup; extraction
    // and chat requests will surface its absence per request.
    let llm = LlmClient::default_local();
    if !llm.health().await.unwrap_or(false) {
        warn!(
            "LLM service not reachable at {}; /extract and /chat will fail until it is up",
            llm.base_url()
        );
    }

    let llm = Arc::new(llm);
    let state = AppState {
        store: SurrealGraphStore::new(db),
        extraction: llm.clone(),
        chat: llm,
        context: SessionContext::new(),
    };

    let app = api::router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("Listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
