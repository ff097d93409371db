//! toolbroker: interactive terminal front end
//!
//! Loads the YAML config, reads the LLM credential once, starts the
//! configured tool providers and then runs a line-oriented chat loop.

mod commands;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use toolbroker_core::{
    require_secret, EnvSecretStore, FileConfigProvider, Logger, ToolBroker, TracingLogger,
};

use crate::commands::{Command, HELP};

#[derive(Parser)]
#[command(name = "toolbroker", about = "Chat with an LLM that can call MCP tool providers")]
struct Args {
    /// Config file (defaults to the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Do not start the providers listed in the config file
    #[arg(long)]
    no_providers: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config_provider = match args.config {
        Some(path) => FileConfigProvider::new(path),
        None => FileConfigProvider::user(),
    };
    let config = config_provider
        .config()
        .with_context(|| format!("loading {}", config_provider.path().display()))?;

    let api_key = require_secret(&EnvSecretStore::new(), &config.llm.api_key_env)
        .with_context(|| format!("{} must be set", config.llm.api_key_env))?;

    let logger: Arc<dyn Logger> = Arc::new(TracingLogger::default());
    let broker = ToolBroker::from_config(&config, &api_key, logger);

    if !args.no_providers {
        let failures = broker.start_providers(&config.providers).await;
        if !failures.is_empty() {
            tracing::warn!(count = failures.len(), "Some configured providers did not start");
        }
    }

    tracing::info!(
        model = %config.llm.model,
        providers = broker.list_providers().len(),
        "toolbroker ready"
    );
    println!("{}", HELP);

    let result = run(&broker, &config_provider).await;
    broker.shutdown().await;
    result
}

async fn run(broker: &ToolBroker, config_provider: &FileConfigProvider) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut session: Option<String> = None;

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };

        let command = match commands::parse(&line) {
            Ok(command) => command,
            Err(usage) => {
                println!("{}", usage);
                continue;
            }
        };

        match command {
            Command::Empty => {}
            Command::Help => println!("{}", HELP),
            Command::Quit => break,
            Command::NewSession => {
                if let Some(id) = session.take() {
                    broker.end_session(&id);
                }
                println!("Started a new conversation");
            }
            Command::Add(provider) => {
                let name = provider.name.clone();
                match broker.add_provider(provider).await {
                    Ok(()) => println!("Added provider '{}'", name),
                    Err(e) => println!("Error adding provider: {}", e),
                }
            }
            Command::Remove(name) => match broker.remove_provider(&name).await {
                Ok(()) => println!("Removed provider '{}'", name),
                Err(e) => println!("Error removing provider: {}", e),
            },
            Command::Providers => {
                let names = broker.list_providers();
                if names.is_empty() {
                    println!("No active providers");
                }
                for name in names {
                    println!("  {}", name);
                }
            }
            Command::Tools(provider) => match broker.list_tools(provider.as_deref()).await {
                Ok(tools) if tools.is_empty() => println!("No tools available"),
                Ok(tools) => {
                    for tool in tools {
                        println!("  {} [{}]: {}", tool.name, tool.provider, tool.description);
                    }
                }
                Err(e) => println!("Error listing tools: {}", e),
            },
            Command::Save => match save_providers(broker, config_provider) {
                Ok(count) => println!(
                    "Saved {} providers to {}",
                    count,
                    config_provider.path().display()
                ),
                Err(e) => println!("Error saving config: {}", e),
            },
            Command::Chat(message) => match broker.chat(session.as_deref(), &message).await {
                Ok(reply) => {
                    if let Some(tool) = &reply.tool_name {
                        let arguments = reply
                            .tool_arguments
                            .as_ref()
                            .map(|a| a.to_string())
                            .unwrap_or_default();
                        println!("[tool {} {}]", tool, arguments);
                    }
                    println!("{}", reply.response);
                    session = Some(reply.session_id);
                }
                Err(e) => println!("Error: {}", e),
            },
        }
    }

    Ok(())
}

/// Replace the config's startup providers with the active ones
fn save_providers(broker: &ToolBroker, config_provider: &FileConfigProvider) -> anyhow::Result<usize> {
    let mut config = config_provider.config()?;
    config.providers = broker
        .list_providers()
        .iter()
        .filter_map(|name| broker.registry().config(name))
        .collect();
    config_provider.save(&config)?;
    Ok(config.providers.len())
}
