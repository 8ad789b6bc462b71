//! Toolsmith: tool retrieval and synthesis for LLM agents.
//!
//! Usage:
//!   toolsmith init                     Write a default config file
//!   toolsmith chat                     Interactive agent loop
//!   toolsmith create <task> [--name]   Synthesize and store a new tool
//!   toolsmith search <context>         Show the tools offered for a context
//!   toolsmith get <id>                 Print one stored tool definition

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use toolsmith::agent::{self, Agent};
use toolsmith::catalog::{CatalogSettings, ToolCatalog};
use toolsmith::config::{self, ToolsmithConfig};
use toolsmith::embedding::OpenAiEmbeddings;
use toolsmith::llm::InferenceClient;
use toolsmith::store::{ChromaStore, MemoryStore, VectorStore};
use toolsmith::types::*;

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "toolsmith")]
#[command(version)]
#[command(about = "Tool retrieval and synthesis for LLM agents")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the config file.
    #[arg(long)]
    config: Option<String>,

    /// Log level (debug, info, warn, error). Overrides the config file.
    #[arg(long)]
    log_level: Option<String>,

    /// Keep the catalog in process memory instead of Chroma.
    #[arg(long)]
    memory: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a default config file.
    Init,

    /// Chat with the agent; type `exit` to quit.
    Chat,

    /// Create a tool from a task description.
    Create {
        /// What the tool should do.
        task: String,

        /// Suggested snake_case name.
        #[arg(long)]
        name: Option<String>,
    },

    /// List the tools offered for a context.
    Search {
        context: String,

        /// Relevant tools to return besides the meta-tool.
        #[arg(long)]
        max: Option<usize>,
    },

    /// Print a stored tool definition.
    Get { id: String },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .as_deref()
        .map(config::resolve_path)
        .unwrap_or_else(config::default_config_path);

    let mut cfg = config::load_config(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    cfg.apply_env();

    // Initialize logging
    let log_level = cli.log_level.clone().unwrap_or_else(|| cfg.log_level.clone());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Init => cmd_init(&config_path),
        Commands::Chat => cmd_chat(&cfg, cli.memory).await,
        Commands::Create { task, name } => {
            cmd_create(&cfg, cli.memory, &task, name.as_deref()).await
        }
        Commands::Search { context, max } => {
            cmd_search(&cfg, cli.memory, &context, max.unwrap_or(cfg.max_tools)).await
        }
        Commands::Get { id } => cmd_get(&cfg, cli.memory, &id).await,
    }
}

// ---------------------------------------------------------------------------
// Command implementations
// ---------------------------------------------------------------------------

fn cmd_init(config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("Config already exists at {}", config_path.display());
        return Ok(());
    }
    config::save_config(&ToolsmithConfig::default(), config_path)?;
    println!("{} Wrote {}", ">>>".green().bold(), config_path.display());
    Ok(())
}

async fn cmd_chat(cfg: &ToolsmithConfig, memory: bool) -> Result<()> {
    let completion = Arc::new(InferenceClient::new(&cfg.llm_api_url, &cfg.llm_api_key));
    let catalog = Arc::new(build_catalog(cfg, memory).with_completion(completion.clone()));
    catalog.ensure_initialized().await?;

    let agent = Agent::new(catalog, completion, cfg);

    println!(
        "{} Chatting with '{}' ({} tools per turn). Type `exit` to quit.",
        ">>>".green().bold(),
        cfg.model,
        cfg.max_tools,
    );

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_cancel.cancel();
        }
    });

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    agent::run_chat_loop(&agent, stdin, tokio::io::stdout(), cancel).await
}

async fn cmd_create(
    cfg: &ToolsmithConfig,
    memory: bool,
    task: &str,
    name: Option<&str>,
) -> Result<()> {
    let completion = Arc::new(InferenceClient::new(&cfg.llm_api_url, &cfg.llm_api_key));
    let catalog = build_catalog(cfg, memory).with_completion(completion);
    catalog.ensure_initialized().await?;

    match catalog.execute_tool_creation(task, name).await {
        CreationOutcome::Created(def) => {
            println!("{} Created tool", ">>>".green().bold());
            println!("{}", serde_json::to_string_pretty(&def)?);
        }
        CreationOutcome::Failed { error } => {
            eprintln!("{} {}", "Error:".red().bold(), error);
            std::process::exit(1);
        }
    }
    Ok(())
}

async fn cmd_search(cfg: &ToolsmithConfig, memory: bool, context: &str, max: usize) -> Result<()> {
    let catalog = build_catalog(cfg, memory);
    let tools = catalog.get_available_tools(context, max).await?;

    println!();
    println!("{}", "=== Available Tools ===".bold());
    println!();
    for tool in &tools {
        println!(
            "  {} {} {}",
            colorize_kind(tool.kind),
            tool.name.bold(),
            tool.id.as_deref().unwrap_or_default().dimmed(),
        );
        println!("      {}", tool.description);
    }
    println!();
    Ok(())
}

async fn cmd_get(cfg: &ToolsmithConfig, memory: bool, id: &str) -> Result<()> {
    let catalog = build_catalog(cfg, memory);
    match catalog.get_tool(id).await? {
        Some(def) => println!("{}", serde_json::to_string_pretty(&def)?),
        None => {
            eprintln!("{} no tool with id '{}'", "Error:".red().bold(), id);
            std::process::exit(1);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build the catalog from config: store backend plus optional embeddings.
fn build_catalog(cfg: &ToolsmithConfig, memory: bool) -> ToolCatalog {
    let store: Arc<dyn VectorStore> = if memory {
        info!("Using in-memory tool catalog");
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(ChromaStore::new(&cfg.chroma_url))
    };

    let catalog = ToolCatalog::new(store, CatalogSettings::from_config(cfg));
    if cfg.embeddings_enabled() {
        catalog.with_embedder(Arc::new(OpenAiEmbeddings::new(
            &cfg.embedding_api_url,
            &cfg.embedding_api_key,
            &cfg.embedding_model,
        )))
    } else {
        catalog
    }
}

fn colorize_kind(kind: Option<ToolKind>) -> String {
    match kind {
        Some(ToolKind::Core) => "[core]".cyan().to_string(),
        Some(ToolKind::LlmGenerated) => "[generated]".green().to_string(),
        None => "[?]".dimmed().to_string(),
    }
}

