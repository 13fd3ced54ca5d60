//! Rocky MCP Server
//!
//! Model Context Protocol server for Rocky, the conversational DeFi yield
//! finder. One conversation session is held for the lifetime of the process.
//!
//! # Features
//!
//! - **Yield search**: Spanish/English criteria to a ranked pool shortlist
//! - **Position details and APY charts** for the last results
//! - **Portfolio summary**: grouping and filtering of tracked holdings

mod cache;
mod config;
mod error;
mod tools;
mod yields;

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use rocky_core::{Agent, Portfolio};
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cache::create_cache;
use crate::config::AppConfig;
use crate::tools::{handle_request, JsonRpcRequest, RockyTools};
use crate::yields::YieldsClient;

fn main() -> anyhow::Result<()> {
    // Logs go to stderr, stdout carries the protocol
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("rocky_mcp=info,rocky_core=info")
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting Rocky MCP Server");

    let rt = Runtime::new()?;

    let config = rt.block_on(async {
        AppConfig::load().await.map_err(|e| {
            tracing::warn!(error = %e, "Using default configuration");
            e
        })
    }).unwrap_or_default();

    tracing::info!(
        yields_api_url = %config.yields.api_url,
        cooldown_seconds = config.cache.ttl_seconds,
        top_n = config.agent.top_n,
        "Configuration loaded"
    );

    let cache = create_cache(&config.cache);
    let yields = YieldsClient::new(&config.yields, cache)?;
    let agent = Agent::new(yields, config.agent.settings());

    let tools = Arc::new(RockyTools::new(agent, Portfolio::sample()));

    tracing::info!("MCP server ready, listening on stdio");

    // Main loop: read JSON-RPC requests from stdin, write responses to stdout
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                tracing::error!(error = %e, "Error reading stdin");
                continue;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        let request: JsonRpcRequest = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(error = %e, line = %line, "Error parsing request");
                continue;
            }
        };

        tracing::debug!(method = %request.method, "Received request");

        let tools_clone = Arc::clone(&tools);
        let response = rt.block_on(async move {
            handle_request(&tools_clone, request).await
        });

        // Notifications get no response
        if let Some(response) = response {
            let response_str = serde_json::to_string(&response).unwrap_or_default();
            if let Err(e) = writeln!(stdout, "{}", response_str) {
                tracing::error!(error = %e, "Error writing response");
            }
            if let Err(e) = stdout.flush() {
                tracing::error!(error = %e, "Error flushing stdout");
            }
        }
    }

    tracing::info!("MCP server shutting down");
    Ok(())
}
