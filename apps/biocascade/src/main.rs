//! # biocascade - Biomarker Cascade Engine
//!
//! The main binary for the biocascade inference engine.
//!
//! This application provides:
//! - HTTP REST API server (axum-based)
//! - CLI interface for one-shot analyses and registry inspection
//! - Data pack loading at start-up
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                   apps/biocascade (THE BINARY)                  │
//! │                                                                 │
//! │  ┌─────────────┐    ┌─────────────┐    ┌──────────────────┐    │
//! │  │   CLI       │    │   HTTP API  │    │  Data pack       │    │
//! │  │  (clap)     │    │   (axum)    │    │  (TOML loader)   │    │
//! │  └──────┬──────┘    └──────┬──────┘    └────────┬─────────┘    │
//! │         │                  │                    │              │
//! │         └──────────────────┼────────────────────┘              │
//! │                            ▼                                   │
//! │                  ┌──────────────────┐                          │
//! │                  │ biocascade-core  │                          │
//! │                  │   (THE LOGIC)    │                          │
//! │                  └──────────────────┘                          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! biocascade server --host 0.0.0.0 --port 8080
//!
//! # CLI operations
//! biocascade analyze -f panel.json
//! biocascade --config pack.toml check
//! biocascade rules --json-mode
//! ```

use biocascade::cli;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // BIOCASCADE_LOG_FORMAT=json enables machine-parseable output.
    let log_format =
        std::env::var("BIOCASCADE_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "biocascade=info,biocascade_core=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();

    // Banner would corrupt machine-readable stdout
    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the biocascade startup banner.
fn print_banner() {
    println!(
        r#"
  ┌┐ ┬┌─┐┌─┐┌─┐┌─┐┌─┐┌─┐┌┬┐┌─┐
  ├┴┐││ ││  ├─┤└─┐│  ├─┤ ││├┤
  └─┘┴└─┘└─┘┴ ┴└─┘└─┘┴ ┴─┴┘└─┘

  Biomarker Cascade Engine v{}

  Deterministic • Cited • Consistency-checked
"#,
        env!("CARGO_PKG_VERSION")
    );
}
