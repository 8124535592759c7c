use clap::{Parser, Subcommand};
use maestro_core::{
    IdValidationError, OrchestratorError, Request, RequestContext, RequestId, RequestKind,
};
use maestro_memory::{FileMemoryStore, InMemoryStore, MemoryError, MemoryStore};
use maestro_models::{ModelRegistry, ProviderError};
use maestro_orchestrator::{
    ConfigError, OrchestratorConfig, OrchestratorConfigBuilder, RequestOrchestrator,
};
use maestro_tools::{ToolError, ToolRegistry, WorkspaceListTool};
use std::path::PathBuf;
use std::sync::Arc;

mod demo;

use demo::EchoProvider;

#[derive(Parser, Debug)]
#[command(name = "maestro", version = "0.3.0")]
#[command(about = "Maestro CLI - run requests through the orchestrator")]
struct Cli {
    /// TOML configuration file, applied on top of MAESTRO_* environment variables
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// JSON file for conversation history and knowledge (default: in-memory)
    #[arg(long, global = true)]
    memory: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Execute one request and print the response as JSON
    Run {
        /// Request text
        content: String,
        /// Request kind (chat, command, analysis, refactor, debug, test)
        #[arg(long, default_value = "chat")]
        kind: RequestKind,
        /// Request id (default: generated)
        #[arg(long)]
        id: Option<String>,
        /// Preferred model name
        #[arg(long)]
        model: Option<String>,
        /// Preferred provider name
        #[arg(long)]
        provider: Option<String>,
        /// Model call timeout in ms
        #[arg(long)]
        timeout_ms: Option<u64>,
        /// Workspace root handed to tools
        #[arg(long)]
        workspace: Option<String>,
        /// File the request is about
        #[arg(long)]
        file: Option<String>,
        /// Print lifecycle events to stderr
        #[arg(long)]
        events: bool,
    },
    /// List models available from registered providers
    Models,
    /// List registered tools, or those eligible for a request kind
    Tools {
        #[arg(long)]
        kind: Option<RequestKind>,
    },
    /// Search stored knowledge
    Search {
        query: String,
        #[arg(long, default_value_t = maestro_memory::DEFAULT_KNOWLEDGE_LIMIT)]
        limit: usize,
        #[arg(long)]
        threshold: Option<f64>,
        /// Add this text to knowledge before searching
        #[arg(long)]
        add: Vec<String>,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Invalid request id: {0}")]
    RequestId(#[from] IdValidationError),
    #[error(transparent)]
    Memory(#[from] MemoryError),
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error("Failed to render output: {0}")]
    Output(#[from] serde_json::Error),
}

fn load_config(path: Option<&PathBuf>) -> Result<OrchestratorConfig, ConfigError> {
    let builder = OrchestratorConfigBuilder::from_env()?;
    let builder = match path {
        Some(path) => builder.load_from_file(path)?,
        None => builder,
    };
    builder.build()
}

async fn open_memory(path: Option<&PathBuf>) -> Result<Arc<dyn MemoryStore>, MemoryError> {
    let store: Arc<dyn MemoryStore> = match path {
        Some(path) => Arc::new(FileMemoryStore::open(path).await?),
        None => Arc::new(InMemoryStore::new()),
    };
    Ok(store)
}

fn registries() -> Result<(ModelRegistry, ToolRegistry), CliError> {
    let models = ModelRegistry::new().with_provider(Arc::new(EchoProvider::new()))?;
    let tools = ToolRegistry::new().with_tool(Arc::new(WorkspaceListTool::new()))?;
    Ok((models, tools))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = load_config(cli.config.as_ref())?;
    let memory = open_memory(cli.memory.as_ref()).await?;
    let (models, tools) = registries()?;

    match cli.command {
        Commands::Run {
            content,
            kind,
            id,
            model,
            provider,
            timeout_ms,
            workspace,
            file,
            events,
        } => {
            let mut builder = Request::builder(kind, content).context(RequestContext {
                file_path: file,
                workspace_root: workspace,
                ..RequestContext::default()
            });
            if let Some(id) = id {
                builder = builder.id(RequestId::parse(id)?);
            }
            if let Some(model) = model {
                builder = builder.preferred_model(model);
            }
            if let Some(provider) = provider {
                builder = builder.preferred_provider(provider);
            }
            if let Some(ms) = timeout_ms {
                builder = builder.timeout_millis(ms);
            }

            let orchestrator =
                RequestOrchestrator::new(config, Arc::new(models), Arc::new(tools), memory);
            let mut receiver = orchestrator.subscribe();

            let response = orchestrator.execute(builder.build()).await?;

            if events {
                while let Ok(event) = receiver.try_recv() {
                    eprintln!("{}", serde_json::to_string(&event)?);
                }
            }
            print_json(&response)?;
        }
        Commands::Models => {
            print_json(&models.list_available().await)?;
        }
        Commands::Tools { kind } => {
            let tools = match &config.enabled_tools {
                Some(enabled) => tools.with_enabled_tools(enabled.clone()),
                None => tools,
            };
            let descriptors = match kind {
                Some(kind) => tools.eligible_for(kind),
                None => tools.descriptors(),
            };
            print_json(&descriptors)?;
        }
        Commands::Search {
            query,
            limit,
            threshold,
            add,
        } => {
            for content in add {
                memory.add_knowledge(&content, "cli").await?;
            }
            let threshold = threshold.unwrap_or(config.relevance_threshold);
            let snippets = memory
                .search_relevant_with_threshold(&query, limit, threshold)
                .await?;
            print_json(&snippets)?;
        }
    }

    Ok(())
}

fn log_filter(directives: Option<&str>) -> tracing_subscriber::EnvFilter {
    directives
        .and_then(|d| tracing_subscriber::EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| tracing_subscriber::EnvFilter::new("info"))
}

#[tokio::main]
async fn main() {
    // Initialize JSON logging once; RUST_LOG overrides the info default.
    let env_filter = log_filter(std::env::var("RUST_LOG").ok().as_deref());

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .json()
        .try_init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!(error = %e, "Command failed");
        std::process::exit(1);
    }
}
