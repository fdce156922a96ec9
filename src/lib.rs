pub mod agent;
pub mod cli;
pub mod config;
pub mod conversation;
pub mod gate;
pub mod llm;
pub mod repl;
pub mod tools;
