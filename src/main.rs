//! # File Search Store CLI (`gfss`)
//!
//! Store, document, and query lifecycle against the hosted file-search
//! API, plus a JSON HTTP server for dashboards.
//!
//! ## Usage
//!
//! ```bash
//! gfss --config ./config/gfss.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `gfss store create --name <n>` | Create a store |
//! | `gfss store list` | List stores (one page) |
//! | `gfss store get <name>` | Show one store as JSON |
//! | `gfss store delete <name> [--force]` | Delete a store |
//! | `gfss doc upload <store> <file>` | Upload a local file and wait for ingestion |
//! | `gfss doc import <store> <files/...>` | Import a Files API file |
//! | `gfss doc list <store>` | List documents (one page) |
//! | `gfss doc get <name>` / `gfss doc delete <name>` | Inspect or remove a document |
//! | `gfss query --store <name> "<question>"` | Grounded query with citations |
//! | `gfss serve` | Start the HTTP server |
//!
//! Any failure prints a single `Error: ...` line to stderr and exits 1.
//! Logs go to stderr; set `RUST_LOG=debug` to see request tracing.

use clap::error::ErrorKind;
use clap::{Args, Parser, Subcommand};
use file_search_store::commands::{self, IngestArgs};
use file_search_store::config::{load_config, Config, DEFAULT_CONFIG_PATH};
use file_search_store::rest::build_client;
use file_search_store::server::run_server;
use file_search_store_core::generation::GenerationConfig;
use file_search_store_core::query::QueryOptions;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// gfss: manage hosted file-search stores and ask grounded questions.
///
/// Reads its settings from a TOML file (see `--config`) and the API key
/// from `GEMINI_API_KEY` or `GOOGLE_API_KEY` (a `.env` file is honored).
#[derive(Parser)]
#[command(name = "gfss", version)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/gfss.toml`; when that file is absent the
    /// built-in defaults are used.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create, list, inspect, and delete stores.
    Store {
        #[command(subcommand)]
        action: StoreAction,
    },

    /// Upload, import, list, inspect, and delete documents.
    Doc {
        #[command(subcommand)]
        action: DocAction,
    },

    /// Ask a question grounded in one or more stores.
    Query(QueryArgs),

    /// Start the JSON HTTP server.
    Serve {
        /// Bind address; overrides `[server].bind`.
        #[arg(long)]
        bind: Option<String>,
    },
}

#[derive(Subcommand)]
enum StoreAction {
    /// Create a new store.
    Create {
        /// Human-readable display name.
        #[arg(long)]
        name: String,
    },
    /// List stores, one page at a time.
    List {
        #[arg(long)]
        page_size: Option<u32>,
        #[arg(long)]
        page_token: Option<String>,
        /// Print raw JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Show one store.
    Get {
        /// Resource name (`fileSearchStores/...`).
        name: String,
    },
    /// Delete a store.
    Delete {
        name: String,
        /// Also delete every document in the store.
        #[arg(long)]
        force: bool,
    },
}

/// Flags shared by `doc upload` and `doc import`.
#[derive(Args)]
struct IngestFlags {
    #[arg(long)]
    display_name: Option<String>,
    /// Maximum tokens per chunk.
    #[arg(long)]
    max_tokens: Option<u32>,
    /// Overlapping tokens between adjacent chunks.
    #[arg(long)]
    overlap: Option<u32>,
    /// Custom metadata as `key=value`; numeric values are stored as numbers.
    #[arg(long = "meta")]
    meta: Vec<String>,
    /// Delay between ingestion status checks.
    #[arg(long)]
    poll_interval_ms: Option<u64>,
    /// Give up waiting after this long (the remote job keeps running).
    #[arg(long)]
    timeout_ms: Option<u64>,
}

impl From<IngestFlags> for IngestArgs {
    fn from(flags: IngestFlags) -> Self {
        IngestArgs {
            display_name: flags.display_name,
            max_tokens: flags.max_tokens,
            overlap: flags.overlap,
            metadata: flags.meta,
            poll_interval_ms: flags.poll_interval_ms,
            timeout_ms: flags.timeout_ms,
        }
    }
}

#[derive(Subcommand)]
enum DocAction {
    /// Upload a local file into a store and wait for ingestion.
    Upload {
        store: String,
        file: PathBuf,
        /// Content type; inferred from the extension when omitted.
        #[arg(long)]
        mime_type: Option<String>,
        #[command(flatten)]
        ingest: IngestFlags,
    },
    /// Import a file already uploaded to the Files API (`files/...`).
    Import {
        store: String,
        file_name: String,
        #[command(flatten)]
        ingest: IngestFlags,
    },
    /// List documents in a store, one page at a time.
    List {
        store: String,
        #[arg(long)]
        page_size: Option<u32>,
        #[arg(long)]
        page_token: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Show one document.
    Get { name: String },
    /// Delete a document.
    Delete { name: String },
}

#[derive(Args)]
struct QueryArgs {
    /// The question to ask.
    question: String,
    /// Store to search; repeat for several.
    #[arg(long = "store", required = true)]
    stores: Vec<String>,
    /// Generation model; defaults to `[client].model`.
    #[arg(long)]
    model: Option<String>,
    /// Metadata filter expression, passed through verbatim.
    #[arg(long)]
    filter: Option<String>,
    /// System instruction.
    #[arg(long)]
    system: Option<String>,
    /// Number of chunks to retrieve.
    #[arg(long)]
    retrieval_top_k: Option<u32>,
    #[arg(long)]
    temperature: Option<f32>,
    #[arg(long)]
    top_p: Option<f32>,
    #[arg(long)]
    top_k: Option<i32>,
    #[arg(long)]
    max_output_tokens: Option<i32>,
    /// Stop sequence; repeat for several.
    #[arg(long = "stop")]
    stop: Vec<String>,
    #[arg(long)]
    presence_penalty: Option<f32>,
    #[arg(long)]
    frequency_penalty: Option<f32>,
    #[arg(long)]
    seed: Option<i64>,
    #[arg(long)]
    response_mime_type: Option<String>,
    /// Print the citation list after the answer.
    #[arg(long)]
    show_citations: bool,
    /// Print the result as JSON.
    #[arg(long)]
    json: bool,
}

impl QueryArgs {
    fn options(&self) -> QueryOptions {
        QueryOptions {
            model: self.model.clone(),
            metadata_filter: self.filter.clone(),
            system_instruction: self.system.clone(),
            retrieval_top_k: self.retrieval_top_k,
            generation: GenerationConfig {
                temperature: self.temperature,
                top_p: self.top_p,
                top_k: self.top_k,
                max_output_tokens: self.max_output_tokens,
                stop_sequences: if self.stop.is_empty() {
                    None
                } else {
                    Some(self.stop.clone())
                },
                presence_penalty: self.presence_penalty,
                frequency_penalty: self.frequency_penalty,
                seed: self.seed,
                response_mime_type: self.response_mime_type.clone(),
            },
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load(cli_config: Option<&PathBuf>) -> anyhow::Result<Config> {
    match cli_config {
        Some(path) => load_config(path, true),
        None => load_config(std::path::Path::new(DEFAULT_CONFIG_PATH), false),
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load(cli.config.as_ref())?;

    if let Commands::Serve { bind } = &cli.command {
        return run_server(&config, bind.as_deref()).await;
    }

    let client = build_client(&config)?;
    let poll_defaults = config.poll_options();

    match cli.command {
        Commands::Store { action } => match action {
            StoreAction::Create { name } => commands::store_create(&client, &name).await,
            StoreAction::List {
                page_size,
                page_token,
                json,
            } => commands::store_list(&client, page_size, page_token, json).await,
            StoreAction::Get { name } => commands::store_get(&client, &name).await,
            StoreAction::Delete { name, force } => {
                commands::store_delete(&client, &name, force).await
            }
        },
        Commands::Doc { action } => match action {
            DocAction::Upload {
                store,
                file,
                mime_type,
                ingest,
            } => {
                commands::doc_upload(&client, &store, &file, mime_type, ingest.into(), poll_defaults)
                    .await
            }
            DocAction::Import {
                store,
                file_name,
                ingest,
            } => {
                commands::doc_import(&client, &store, &file_name, ingest.into(), poll_defaults)
                    .await
            }
            DocAction::List {
                store,
                page_size,
                page_token,
                json,
            } => commands::doc_list(&client, &store, page_size, page_token, json).await,
            DocAction::Get { name } => commands::doc_get(&client, &name).await,
            DocAction::Delete { name } => commands::doc_delete(&client, &name).await,
        },
        Commands::Query(args) => {
            let options = args.options();
            commands::query(
                &client,
                &args.stores,
                &args.question,
                &options,
                args.show_citations,
                args.json,
            )
            .await
        }
        Commands::Serve { .. } => Ok(()),
    }
}

/// Collapses a clap usage error into one line, dropping the `error:` prefix
/// and the trailing usage/help hints.
fn usage_error_line(err: &clap::Error) -> String {
    let rendered = err.render().to_string();
    let message = rendered
        .lines()
        .map(str::trim)
        .take_while(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    message
        .strip_prefix("error: ")
        .unwrap_or(&message)
        .to_string()
}

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => err.exit(),
            _ => {
                eprintln!("Error: {}", usage_error_line(&err));
                std::process::exit(1);
            }
        },
    };
    let _ = dotenvy::dotenv();
    init_tracing();

    if let Err(err) = run(cli).await {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}
