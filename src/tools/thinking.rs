//! Bridge to the sequential-thinking MCP server.
//!
//! Each call launches the server as a child process speaking MCP over stdio,
//! performs one tool call, and shuts the process down again.

use std::io::ErrorKind;
use std::time::Duration;

use rmcp::{
    model::{CallToolRequestParam, RawContent},
    service::{RunningService, ServiceExt},
    transport::{ConfigureCommandExt, TokioChildProcess},
    RoleClient,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::process::Command;
use tokio::time::timeout;

use super::{ToolError, ToolOutput, ToolResult};
use crate::config::ReasoningConfig;

const TOOL_NAME: &str = "sequentialthinking";
const NAME_VARIANTS: [&str; 3] = ["sequentialthinking", "sequential-thinking", "sequential_thinking"];
const CONNECT_TIMEOUT: Duration = Duration::from_secs(60);
const CALL_TIMEOUT: Duration = Duration::from_secs(60);

const LAUNCH_FAILURE: &str = "Failed to launch MCP server via npx. Ensure Node.js and npx are installed and available in PATH.";

type ThinkingService = RunningService<RoleClient, ()>;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ThoughtParams {
    #[schemars(description = "Your current thinking step.")]
    pub thought: String,

    #[schemars(description = "Whether another thought step is needed.")]
    pub next_thought_needed: bool,

    #[schemars(description = "Current thought number (1-based).")]
    pub thought_number: u32,

    #[schemars(description = "Estimated total thoughts needed.")]
    pub total_thoughts: u32,

    #[schemars(description = "Whether this revises previous thinking.")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_revision: Option<bool>,

    #[schemars(description = "Which thought is being reconsidered.")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revises_thought: Option<u32>,

    #[schemars(description = "Branching point thought number.")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_from_thought: Option<u32>,

    #[schemars(description = "Branch identifier.")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<String>,

    #[schemars(description = "If reaching end but realizing more thoughts are needed.")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub needs_more_thoughts: Option<bool>,
}

/// Tool names compare equal regardless of case, hyphens, and underscores.
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Names to try, best first: the server's own spelling when it lists a
/// matching tool, then the known variants, then anything else it lists.
pub fn candidate_names(available: &[String]) -> Vec<String> {
    let desired = normalize_name(TOOL_NAME);
    let mut candidates: Vec<String> = Vec::new();

    if let Some(exact) = available.iter().find(|n| normalize_name(n) == desired) {
        candidates.push(exact.clone());
    }
    for variant in NAME_VARIANTS {
        if !candidates.iter().any(|c| c == variant) {
            candidates.push(variant.to_string());
        }
    }
    for name in available {
        if !candidates.contains(name) {
            candidates.push(name.clone());
        }
    }

    candidates
}

/// Structured content wins; otherwise text parts joined by newlines.
pub fn render_call_output(structured: Option<Value>, texts: Vec<String>) -> ToolOutput {
    match structured {
        Some(value) if !value.is_null() => ToolOutput::Structured(value),
        _ if texts.is_empty() => ToolOutput::Text("(no content)".to_string()),
        _ => ToolOutput::Text(texts.join("\n")),
    }
}

pub struct SequentialThinking {
    config: ReasoningConfig,
}

impl SequentialThinking {
    pub fn new(config: ReasoningConfig) -> Self {
        Self { config }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Runs one step of the reasoning chain.
    pub async fn think(&self, params: ThoughtParams) -> ToolResult {
        if !self.config.enabled {
            return Err(ToolError::CollaboratorUnavailable(
                "The sequential thinking helper is disabled for this session.".to_string(),
            ));
        }

        let arguments = serde_json::to_value(&params)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

        let service = self.connect().await?;
        let result = call_with_fallback(&service, arguments).await;

        if let Err(e) = service.cancel().await {
            tracing::debug!(error = %e, "sequential thinking server did not shut down cleanly");
        }

        result
    }

    async fn connect(&self) -> Result<ThinkingService, ToolError> {
        let disable_logging = if self.config.disable_thought_logging {
            "true"
        } else {
            "false"
        };

        tracing::info!(command = %self.config.command, args = ?self.config.args, "launching sequential thinking server");

        let transport = TokioChildProcess::new(Command::new(&self.config.command).configure(|cmd| {
            cmd.args(&self.config.args);
            cmd.env("DISABLE_THOUGHT_LOGGING", disable_logging);
        }))
        .map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                ToolError::CollaboratorUnavailable(LAUNCH_FAILURE.to_string())
            } else {
                ToolError::CollaboratorUnavailable(format!("{} ({})", LAUNCH_FAILURE, e))
            }
        })?;

        timeout(CONNECT_TIMEOUT, ().serve(transport))
            .await
            .map_err(|_| {
                ToolError::CollaboratorUnavailable(format!(
                    "Sequential thinking server did not start within {:?}",
                    CONNECT_TIMEOUT
                ))
            })?
            .map_err(|e| {
                ToolError::Failed(format!("Error calling sequentialthinking via MCP: {}", e))
            })
    }
}

async fn call_with_fallback(service: &ThinkingService, arguments: Value) -> ToolResult {
    let available: Vec<String> = match service.list_tools(Default::default()).await {
        Ok(listed) => listed.tools.into_iter().map(|t| t.name.to_string()).collect(),
        Err(e) => {
            tracing::debug!(error = %e, "listing tools failed, trying known names");
            Vec::new()
        }
    };

    let mut last_error = None;
    for name in candidate_names(&available) {
        let request = CallToolRequestParam {
            name: name.clone().into(),
            arguments: arguments.as_object().cloned(),
        };

        let result = match timeout(CALL_TIMEOUT, service.call_tool(request)).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                last_error = Some(e.to_string());
                continue;
            }
            Err(_) => {
                last_error = Some(format!("call timed out after {:?}", CALL_TIMEOUT));
                continue;
            }
        };

        let texts: Vec<String> = result
            .content
            .iter()
            .map(|c| match &c.raw {
                RawContent::Text(t) => t.text.clone(),
                other => serde_json::to_string(other).unwrap_or_else(|_| "[non-text content]".to_string()),
            })
            .collect();

        if texts.iter().any(|t| t.contains("Unknown tool:")) {
            last_error = Some(texts.join("\n"));
            continue;
        }

        tracing::debug!(tool = %name, "sequential thinking step completed");
        return Ok(render_call_output(result.structured_content, texts));
    }

    Err(ToolError::Failed(format!(
        "Error calling sequentialthinking via MCP: {}",
        last_error.unwrap_or_else(|| "Failed to call sequential thinking tool.".to_string())
    )))
}
