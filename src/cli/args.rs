//! Command line argument parsing
//!
//! Subcommands:
//! - `serve`: Run the MCP server on stdin/stdout (the default)
//! - `ask`: Send a single question to the configured model and print the answer
//! - `show-config`: Show configuration discovery information

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug)]
pub enum ExecutionMode {
    Serve(ServeConfig),
    Ask(AskConfig),
    ShowConfig(ShowConfigOptions),
}

#[derive(Debug)]
pub struct ServeConfig {
    pub config_override: Option<PathBuf>,
}

#[derive(Debug)]
pub struct AskConfig {
    pub question: String,
    pub context: Option<ContextSource>,
    pub config_override: Option<PathBuf>,
}

/// Where the `ask` command takes its context from
#[derive(Debug, Clone, PartialEq)]
pub enum ContextSource {
    Inline(String),
    File(PathBuf),
}

#[derive(Debug)]
pub struct ShowConfigOptions {
    pub config_override: Option<PathBuf>,
}

#[derive(Debug, Parser)]
#[command(name = "ask-ai")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "MCP server that lets an AI assistant ask another AI model for a second opinion")]
#[command(long_about = None)]
pub struct Args {
    /// Configuration file path (skips discovery)
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the MCP server over stdio
    Serve,
    /// Ask the configured model a single question
    Ask {
        /// The question to ask
        question: String,
        /// Background information sent along with the question
        #[arg(long = "context", value_name = "TEXT")]
        context: Option<String>,
        /// Read the context from a file
        #[arg(long = "context-file", value_name = "FILE", conflicts_with = "context")]
        context_file: Option<PathBuf>,
    },
    /// Show configuration discovery information and the resolved settings
    ShowConfig,
}

impl Args {
    pub fn parse() -> Self {
        Parser::parse()
    }

    pub fn mode(&self) -> Result<ExecutionMode, String> {
        let config_override = self.config.clone();

        match &self.command {
            None | Some(Commands::Serve) => {
                Ok(ExecutionMode::Serve(ServeConfig { config_override }))
            }
            Some(Commands::Ask {
                question,
                context,
                context_file,
            }) => {
                if question.trim().is_empty() {
                    return Err("Question must not be empty".to_string());
                }

                let context = match (context, context_file) {
                    (Some(_), Some(_)) => {
                        return Err("Use either --context or --context-file, not both".to_string());
                    }
                    (Some(text), None) => Some(ContextSource::Inline(text.clone())),
                    (None, Some(path)) => Some(ContextSource::File(path.clone())),
                    (None, None) => None,
                };

                Ok(ExecutionMode::Ask(AskConfig {
                    question: question.clone(),
                    context,
                    config_override,
                }))
            }
            Some(Commands::ShowConfig) => Ok(ExecutionMode::ShowConfig(ShowConfigOptions {
                config_override,
            })),
        }
    }
}
