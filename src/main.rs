//! # Stack Help CLI (`stackhelp`)
//!
//! ## Usage
//!
//! ```bash
//! stackhelp --config ./config/stackhelp.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `stackhelp serve` | Start the HTTP server (`POST /query`) |
//! | `stackhelp ask "<query>"` | Resolve one query and print the answer text |
//! | `stackhelp chat` | Interactive terminal chat |

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use stackhelp::config::{load_config, Config};
use stackhelp::corpus::StackExchangeClient;
use stackhelp::dialogue::{HttpBackend, LocalBackend, ResolveBackend};
use stackhelp::error::ResolveError;
use stackhelp::markup;
use stackhelp::models::Query;
use stackhelp::resolver::Resolver;
use stackhelp::{chat, server};

const DEFAULT_CONFIG: &str = "./config/stackhelp.toml";

/// Stack Help: a chat widget backed by the best Stack Exchange answer.
#[derive(Parser)]
#[command(name = "stackhelp", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Optional: built-in defaults are used when the default path does not
    /// exist. An explicitly given path must exist.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server.
    Serve,

    /// Resolve a single query and print the plain-text answer.
    Ask {
        /// The question to look up.
        query: String,

        /// Print the raw answer JSON instead of plain text.
        #[arg(long)]
        json: bool,
    },

    /// Chat interactively from the terminal.
    ///
    /// Each line on stdin is one submitted message.
    Chat {
        /// Resolve in-process instead of posting to `dialogue.query_url`.
        #[arg(long)]
        local: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stackhelp=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => load_config(path, true)?,
        None => load_config(&PathBuf::from(DEFAULT_CONFIG), false)?,
    };

    match cli.command {
        Commands::Serve => server::run_server(&config).await?,
        Commands::Ask { query, json } => run_ask(&config, &query, json).await?,
        Commands::Chat { local } => {
            let backend: Arc<dyn ResolveBackend> = if local {
                Arc::new(LocalBackend::new(Arc::new(build_resolver(&config)?)))
            } else {
                Arc::new(HttpBackend::new(config.dialogue.query_url.clone()))
            };
            chat::run_chat(&config.dialogue, backend).await?;
        }
    }

    Ok(())
}

fn build_resolver(config: &Config) -> Result<Resolver> {
    let corpus = Arc::new(StackExchangeClient::new(&config.corpus)?);
    Ok(Resolver::new(corpus, &config.corpus))
}

async fn run_ask(config: &Config, raw: &str, json: bool) -> Result<()> {
    let query = Query::parse(raw)?;
    let resolver = build_resolver(config)?;

    match resolver.resolve(&query).await {
        Ok(answer) if json => println!("{}", serde_json::to_string_pretty(&answer)?),
        Ok(answer) => match answer.markup() {
            Some(body) => println!("{}", markup::flatten(body)),
            None => println!("Answer {} has no body.", answer.answer_id),
        },
        Err(ResolveError::NotFound) => println!("No result found."),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
