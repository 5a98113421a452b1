//! # Proxigraph
//!
//! The main binary for the Proxigraph bounded proximity graph.
//!
//! This application provides:
//! - HTTP REST API server (axum-based) fed by event records
//! - Background metrics sampling and snapshot saving
//! - CLI interface for replaying event logs and inspecting saved graphs
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    apps/proxigraph (THE BINARY)                 │
//! │                                                                 │
//! │  ┌─────────────┐    ┌─────────────┐    ┌──────────────────┐    │
//! │  │   CLI       │    │   HTTP API  │    │    Scheduler     │    │
//! │  │  (clap)     │    │   (axum)    │    │ (tokio interval) │    │
//! │  └──────┬──────┘    └──────┬──────┘    └────────┬─────────┘    │
//! │         │                  │                    │              │
//! │         └──────────────────┼────────────────────┘              │
//! │                            ▼                                   │
//! │                   ┌─────────────────┐                          │
//! │                   │ proxigraph-core │                          │
//! │                   │  (THE ENGINE)   │                          │
//! │                   └─────────────────┘                          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server, persisting to redb
//! proxigraph -S graph.redb -B redb serve --port 8080
//!
//! # CLI operations
//! proxigraph -S graph.pxg replay -f events.jsonl --save
//! proxigraph -S graph.pxg status --threshold 3
//! proxigraph -S graph.pxg export -o graph.json
//! ```

use clap::Parser;
use proxigraph::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // Initialize tracing; PROXIGRAPH_LOG_FORMAT=json enables machine-parseable output.
    let log_format =
        std::env::var("PROXIGRAPH_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "proxigraph=info,proxigraph_core=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    // Parse CLI arguments
    let cli = cli::Cli::parse();

    if !cli.quiet {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the startup banner.
fn print_banner() {
    println!(
        r#"
  proxigraph v{}
  bounded proximity graph
"#,
        env!("CARGO_PKG_VERSION")
    );
}
