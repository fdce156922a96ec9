use std::env;
use std::path::PathBuf;

use crate::gate::GateConfig;

pub const DEFAULT_MAX_CYCLES: usize = 8;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful coding assistant with access to file system tools. \
Only use tools for file operations, code analysis, project navigation, or when the user explicitly asks you to run a shell command. \
Do NOT use tools for general knowledge questions; answer from your own knowledge unless the user specifically references files, paths, or commands.";

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("environment variable {0} must be set")]
    Missing(&'static str),
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Where and how to reach the completion endpoint.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

/// Launch settings for the sequential-thinking helper process.
#[derive(Debug, Clone)]
pub struct ReasoningConfig {
    pub enabled: bool,
    pub command: String,
    pub args: Vec<String>,
    pub disable_thought_logging: bool,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: "npx".to_string(),
            args: vec![
                "-y".to_string(),
                "@modelcontextprotocol/server-sequential-thinking".to_string(),
            ],
            disable_thought_logging: false,
        }
    }
}

impl ReasoningConfig {
    /// Reasoning settings alone; needs none of the endpoint variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut reasoning = Self::default();
        if let Some(raw) = lookup("SCOUT_REASONING") {
            reasoning.enabled = !matches!(raw.trim().to_lowercase().as_str(), "off" | "false" | "0");
        }
        if let Some(raw) = lookup("DISABLE_THOUGHT_LOGGING") {
            reasoning.disable_thought_logging = raw.trim().eq_ignore_ascii_case("true");
        }
        reasoning
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub endpoint: EndpointConfig,
    pub project_dir: PathBuf,
    pub max_cycles: usize,
    pub system_prompt: String,
    pub gate: GateConfig,
    pub reasoning: ReasoningConfig,
}

impl Config {
    /// Reads the session configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |var: &'static str| -> Result<String, ConfigError> {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(var))
        };

        let endpoint = EndpointConfig {
            base_url: required("AI_ENDPOINT")?,
            api_key: required("AI_API_KEY")?,
            model: required("DEPLOYMENT_NAME")?,
        };

        let max_cycles = match lookup("AGENT_MAX_CYCLES") {
            Some(raw) => parse_max_cycles("AGENT_MAX_CYCLES", &raw)?,
            None => DEFAULT_MAX_CYCLES,
        };

        let mut gate = GateConfig::default();
        if let Some(raw) = lookup("AGENT_EXPOSURE_MARKERS") {
            gate.exposure_markers = split_markers(&raw);
        }
        if let Some(raw) = lookup("AGENT_SHELL_MARKERS") {
            gate.shell_markers = split_markers(&raw);
        }

        let reasoning = ReasoningConfig::from_lookup(&lookup);

        let project_dir = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

        Ok(Self {
            endpoint,
            project_dir,
            max_cycles,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            gate,
            reasoning,
        })
    }
}

pub fn parse_max_cycles(var: &'static str, raw: &str) -> Result<usize, ConfigError> {
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::Invalid {
            var,
            value: raw.to_string(),
        }),
    }
}

fn split_markers(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|m| m.trim().to_lowercase())
        .filter(|m| !m.is_empty())
        .collect()
}
