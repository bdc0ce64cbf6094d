use anyhow::Context;
use ask_ai::cli::{
    Args, AskConfig, ConfigDiscovery, ConfigLoader, ContextSource, ExecutionMode, ServeConfig,
    ShowConfigOptions,
};
use ask_ai::env::DEFAULT_LOG_FILTER;
use ask_ai::mcp::{AskAiTool, McpServer};
use ask_ai::{AskAiService, Query};
use std::fs;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // stdout carries the protocol stream, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let args = Args::parse();
    let mode = match args.mode() {
        Ok(mode) => mode,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    let result = match mode {
        ExecutionMode::Serve(config) => {
            if let Err(e) = run_server(config).await {
                error!("Server error: {:#}", e);
                eprintln!("Failed to start server: {:#}", e);
                std::process::exit(1);
            }
            Ok(())
        }
        ExecutionMode::Ask(config) => run_ask(config).await,
        ExecutionMode::ShowConfig(options) => show_config(options),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run_server(config: ServeConfig) -> anyhow::Result<()> {
    let loaded = ConfigLoader::load(config.config_override.as_deref())?;
    let service = AskAiService::new(loaded.settings)?;

    info!(
        provider = %service.settings().provider,
        model = %service.settings().model,
        "Ask AI MCP Server is running..."
    );

    McpServer::new()
        .with_tool(AskAiTool::new(service))
        .run_stdio()
        .await?;

    info!("Input closed, shutting down");
    Ok(())
}

async fn run_ask(config: AskConfig) -> anyhow::Result<()> {
    let loaded = ConfigLoader::load(config.config_override.as_deref())?;
    let service = AskAiService::new(loaded.settings)?;

    let mut query = Query::new(config.question);
    match config.context {
        Some(ContextSource::Inline(text)) => query = query.with_context(text),
        Some(ContextSource::File(path)) => {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read context file {:?}", path))?;
            query = query.with_context(text);
        }
        None => {}
    }

    let result = AskAiTool::new(service).ask(query).await;
    if result.is_error {
        eprintln!("{}", result.joined_text());
        std::process::exit(1);
    }

    println!("{}", result.joined_text());
    Ok(())
}

fn show_config(options: ShowConfigOptions) -> anyhow::Result<()> {
    ConfigDiscovery::show_discovery_info(options.config_override.as_deref());
    println!();

    let loaded = ConfigLoader::load(options.config_override.as_deref())?;
    let rendered = toml::to_string_pretty(&loaded.settings.redacted())
        .context("Failed to render settings")?;

    println!("Resolved settings:");
    println!("{}", rendered);
    Ok(())
}
