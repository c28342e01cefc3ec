//! ragkb - command-line client for a RAG knowledge-base service.

mod commands;
mod observability;
mod output;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use ragkb_client::{ClientConfig, RagClient};
use tracing::debug;

/// ragkb - Upload documents and ask questions against a knowledge base.
#[derive(Parser)]
#[command(name = "ragkb")]
#[command(about = "Query and manage a RAG knowledge base from the terminal")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Base URL of the API (overrides RAGKB_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Timeout in seconds for non-streaming requests
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    timeout_secs: Option<u64>,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text", global = true)]
    format: output::OutputFormat,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check backend health
    Health,

    /// Upload one or more documents
    Upload {
        /// Files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Ask a question
    Ask {
        /// The question
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,

        /// Number of chunks to retrieve
        #[arg(short = 'k', long)]
        top_k: Option<u32>,

        /// Wait for the whole answer instead of streaming it
        #[arg(long)]
        no_stream: bool,

        /// Do not print the retrieved sources
        #[arg(long)]
        hide_sources: bool,
    },

    /// Delete a document by id
    Delete {
        /// Document id returned by upload
        document_id: String,
    },
}

fn build_client(cli: &Cli) -> anyhow::Result<RagClient> {
    let mut config = ClientConfig::from_env().context("invalid client configuration")?;
    if let Some(url) = &cli.api_url {
        config = config.base_url(url.clone());
    }
    if let Some(secs) = cli.timeout_secs {
        config = config.request_timeout(Duration::from_secs(secs));
    }
    debug!(base_url = %config.base_url, "client configured");
    Ok(RagClient::new(config)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    observability::init_observability(cli.log_level.as_deref());

    let client = build_client(&cli)?;
    match cli.command {
        Commands::Health => commands::health(&client, cli.format).await,
        Commands::Upload { ref files } => commands::upload(&client, files, cli.format).await,
        Commands::Ask {
            ref query,
            top_k,
            no_stream,
            hide_sources,
        } => {
            let options = commands::AskOptions {
                query: query.join(" "),
                top_k,
                stream: !no_stream,
                show_sources: !hide_sources,
            };
            commands::ask(&client, &options, cli.format).await
        }
        Commands::Delete { ref document_id } => {
            commands::delete(&client, document_id, cli.format).await
        }
    }
}
