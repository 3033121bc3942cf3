//! CLI command implementations

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{json, Value};

use super::args::{Cli, Command};
use super::errors::CliResult;
use crate::server::{HttpServer, ServerConfig};
use crate::stream::MemoryStore;

/// Dispatch a parsed CLI invocation
pub fn run_command(cli: Cli) -> CliResult<()> {
    match cli.command {
        Command::Serve { config, port } => serve(config, port),
        Command::Seed { config, port } => seed(config, port),
    }
}

/// Start the server over an empty store
pub fn serve(config_path: Option<PathBuf>, port: Option<u16>) -> CliResult<()> {
    let config = load_config(config_path, port)?;
    run_server(config, Arc::new(MemoryStore::new()))
}

/// Preload demo documents, then start the server over that store
pub fn seed(config_path: Option<PathBuf>, port: Option<u16>) -> CliResult<()> {
    let config = load_config(config_path, port)?;
    let store = Arc::new(MemoryStore::new());
    preload_demo_documents(&store)?;
    run_server(config, store)
}

/// Insert the demo documents into a store
pub fn preload_demo_documents(store: &MemoryStore) -> CliResult<()> {
    for (collection, document) in demo_documents() {
        store.insert(collection, document)?;
    }
    tracing::info!("demo documents loaded");
    Ok(())
}

fn demo_documents() -> Vec<(&'static str, Value)> {
    vec![
        (
            "donations",
            json!({"donor": "Ada Lovelace", "amount": 250, "campaign": "winter-appeal"}),
        ),
        (
            "donations",
            json!({"donor": "Grace Hopper", "amount": 75, "campaign": "general"}),
        ),
        (
            "contacts",
            json!({"name": "Sam Reyes", "email": "sam@example.org", "subject": "Volunteering"}),
        ),
        (
            "volunteers",
            json!({"name": "Priya Shah", "program": "food-bank"}),
        ),
    ]
}

fn load_config(config_path: Option<PathBuf>, port: Option<u16>) -> CliResult<ServerConfig> {
    let mut config = match config_path {
        Some(path) => ServerConfig::load(&path)?,
        None => ServerConfig::default(),
    };
    if let Some(port) = port {
        config.port = port;
    }
    Ok(config)
}

/// Run the server on a single-threaded cooperative runtime.
///
/// One process serves many concurrent connections; no parallel threads
/// operate on shared connection state.
fn run_server(config: ServerConfig, store: Arc<MemoryStore>) -> CliResult<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(HttpServer::with_store(config, store).start())?;
    Ok(())
}
