use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

use scout::agent::Agent;
use scout::cli::{Cli, Commands};
use scout::config::{Config, ReasoningConfig};
use scout::conversation::Conversation;
use scout::gate::ToolGate;
use scout::llm::{catalog_json, OpenAiClient};
use scout::repl;
use scout::tools::{self, Workspace};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("scout=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::from_env().context("invalid configuration")?;

    if let Some(dir) = &cli.project_dir {
        config.project_dir = dir
            .canonicalize()
            .with_context(|| format!("project directory {} is not accessible", dir.display()))?;
    }
    if let Some(max_cycles) = cli.max_cycles {
        config.max_cycles = max_cycles as usize;
    }
    if let Some(system) = &cli.system {
        config.system_prompt = system.clone();
    }
    if cli.no_reasoning {
        config.reasoning.enabled = false;
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    if let Some(Commands::Tools) = cli.command {
        let reasoning = ReasoningConfig::from_env();
        let specs = tools::catalog(reasoning.enabled && !cli.no_reasoning);
        println!("{}", serde_json::to_string_pretty(&catalog_json(&specs)?)?);
        return Ok(());
    }

    let config = load_config(&cli)?;
    tracing::info!(
        project_dir = %config.project_dir.display(),
        model = %config.endpoint.model,
        max_cycles = config.max_cycles,
        reasoning = config.reasoning.enabled,
        "starting session"
    );

    let client = OpenAiClient::new(&config.endpoint);
    let workspace = Workspace::new(config.project_dir.clone(), config.reasoning.clone());
    let agent = Agent::new(
        Box::new(client),
        Box::new(workspace),
        ToolGate::new(config.gate.clone()),
        config.max_cycles,
    );
    let mut conversation = Conversation::with_system(&config.system_prompt);

    match cli.command {
        Some(Commands::Ask { message }) => {
            let answer = agent.run(&mut conversation, &message.join(" ")).await;
            println!("Answer: {}", answer);
        }
        Some(Commands::Chat) | None => {
            let mut stdin = BufReader::new(tokio::io::stdin());
            let mut stdout = tokio::io::stdout();
            repl::run(&agent, &mut conversation, &mut stdin, &mut stdout).await?;
        }
        Some(Commands::Tools) => {}
    }

    Ok(())
}
