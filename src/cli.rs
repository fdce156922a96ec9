use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional command to run
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Project directory the tools operate on (defaults to the current directory)
    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Maximum tool rounds per question
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    pub max_cycles: Option<u64>,

    /// Replace the default system prompt
    #[arg(long, global = true)]
    pub system: Option<String>,

    /// Do not offer the sequential thinking tool
    #[arg(long, global = true)]
    pub no_reasoning: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start an interactive session (the default)
    Chat,

    /// Send a one-off question and print the answer
    Ask {
        /// The question to send
        #[arg(required = true)]
        message: Vec<String>,
    },

    /// Print the tool catalog sent to the model
    Tools,
}
