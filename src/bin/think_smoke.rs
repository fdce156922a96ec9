use anyhow::Result;
use tracing_subscriber::EnvFilter;

use scout::config::ReasoningConfig;
use scout::tools::{SequentialThinking, ThoughtParams};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("scout=debug")))
        .init();

    // Thought text from the command line or a default planning step
    let thought = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "Plan a simple two-step approach to list project files and read README.".to_string());

    let mut config = ReasoningConfig::default();
    if let Ok(raw) = std::env::var("DISABLE_THOUGHT_LOGGING") {
        config.disable_thought_logging = raw.trim().eq_ignore_ascii_case("true");
    }
    let helper = SequentialThinking::new(config);

    let params = ThoughtParams {
        thought,
        next_thought_needed: false,
        thought_number: 1,
        total_thoughts: 1,
        is_revision: None,
        revises_thought: None,
        branch_from_thought: None,
        branch_id: None,
        needs_more_thoughts: None,
    };

    println!("Calling sequential thinking with one thought step...");
    match helper.think(params).await {
        Ok(output) => println!("\nResult:\n{}", output.render()),
        Err(err) => println!("\nError: {}", err),
    }

    Ok(())
}
