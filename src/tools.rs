mod bash;
mod file;
mod search;
mod thinking;
mod tree;

pub use bash::ExecuteBashParams;
pub use file::{ReadFileParams, WriteFileParams};
pub use search::SearchParams;
pub use thinking::{SequentialThinking, ThoughtParams};
pub use tree::FileTreeParams;

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::config::ReasoningConfig;
use crate::llm::ToolSpec;

pub(crate) const MAX_OUTPUT_LENGTH: usize = 30000;
pub(crate) const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(15);

lazy_static::lazy_static! {
    // Directory names never descended into when walking the project
    static ref DEFAULT_SKIP_DIRS: Vec<&'static str> = vec![
        ".venv", "__pycache__", ".git", ".pytest_cache", ".mypy_cache", ".coverage", "node_modules", ".DS_Store",
    ];
}

/// The capabilities the agent knows about. Anything else is `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolKind {
    ReadFile,
    WriteFile,
    SeeFileTree,
    ExecuteBashCommand,
    SearchInFiles,
    SequentialThinking,
    Unknown(String),
}

impl ToolKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "read_file" => ToolKind::ReadFile,
            "write_file" => ToolKind::WriteFile,
            "see_file_tree" => ToolKind::SeeFileTree,
            "execute_bash_command" => ToolKind::ExecuteBashCommand,
            "search_in_files" => ToolKind::SearchInFiles,
            "sequentialthinking" => ToolKind::SequentialThinking,
            other => ToolKind::Unknown(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ToolKind::ReadFile => "read_file",
            ToolKind::WriteFile => "write_file",
            ToolKind::SeeFileTree => "see_file_tree",
            ToolKind::ExecuteBashCommand => "execute_bash_command",
            ToolKind::SearchInFiles => "search_in_files",
            ToolKind::SequentialThinking => "sequentialthinking",
            ToolKind::Unknown(name) => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Text(String),
    Structured(Value),
}

impl ToolOutput {
    /// Text passes through; structured values become indented JSON.
    pub fn render(&self) -> String {
        match self {
            ToolOutput::Text(text) => text.clone(),
            ToolOutput::Structured(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
        }
    }

    /// Result reported in place of a shell command the gate refused.
    pub fn command_denied(reason: &str) -> Self {
        ToolOutput::Structured(json!({
            "stdout": "",
            "stderr": reason,
            "returncode": 1,
        }))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Failed(String),
    #[error("{0}")]
    CollaboratorUnavailable(String),
}

pub type ToolResult = Result<ToolOutput, ToolError>;

/// Renders a capability outcome as the content of a `tool` message.
pub fn render_result(tool_name: &str, result: &ToolResult) -> String {
    match result {
        Ok(output) => output.render(),
        Err(ToolError::UnknownTool(name)) => format!("Unknown tool: {}", name),
        Err(e) => format!("Error executing {}: {}", tool_name, e),
    }
}

/// The environment the agent acts on.
#[async_trait]
pub trait CapabilityProvider: Send + Sync {
    fn catalog(&self) -> Vec<ToolSpec>;
    async fn invoke(&self, name: &str, arguments: &Value) -> ToolResult;
}

pub(crate) fn parse_args<T: DeserializeOwned>(arguments: &Value) -> Result<T, ToolError> {
    serde_json::from_value(arguments.clone()).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

fn parameters_schema<T: JsonSchema>() -> Value {
    let settings = schemars::gen::SchemaSettings::draft07().with(|s| {
        s.option_nullable = false;
        s.option_add_null_type = false;
        s.inline_subschemas = true;
    });
    let root = settings.into_generator().into_root_schema_for::<T>();
    let mut schema = serde_json::to_value(root).unwrap_or_else(|_| json!({"type": "object"}));
    if let Value::Object(map) = &mut schema {
        map.remove("$schema");
        map.remove("title");
        map.remove("definitions");
    }
    schema
}

fn spec<T: JsonSchema>(kind: ToolKind, description: &str) -> ToolSpec {
    ToolSpec {
        name: kind.name().to_string(),
        description: description.to_string(),
        parameters: parameters_schema::<T>(),
    }
}

/// Tool definitions offered to the endpoint.
pub fn catalog(include_reasoning: bool) -> Vec<ToolSpec> {
    let mut specs = vec![
        spec::<ReadFileParams>(
            ToolKind::ReadFile,
            "Read and return the contents of a file at the given relative filepath. Prefer this over running shell commands like 'cat'.",
        ),
        spec::<WriteFileParams>(
            ToolKind::WriteFile,
            "Write content to a file at the given relative filepath, creating directories as needed",
        ),
        spec::<FileTreeParams>(
            ToolKind::SeeFileTree,
            "Return a list of all files and directories under the given root directory",
        ),
        spec::<ExecuteBashParams>(
            ToolKind::ExecuteBashCommand,
            "Execute a bash command in the shell and return its output, error, and exit code. Only use when the user explicitly asks to run a shell/terminal command. Prefer read_file/search_in_files for reading content.",
        ),
        spec::<SearchParams>(
            ToolKind::SearchInFiles,
            "Search for a pattern in all files under the given root directory",
        ),
    ];

    if include_reasoning {
        specs.push(spec::<ThoughtParams>(
            ToolKind::SequentialThinking,
            "Facilitates a detailed, step-by-step thinking process for problem-solving and analysis using an MCP server.",
        ));
    }

    specs
}

/// Head and tail of overly long output with a count of the dropped lines.
pub(crate) fn truncate_output(content: &str) -> String {
    if content.len() <= MAX_OUTPUT_LENGTH {
        return content.to_string();
    }

    let half_length = MAX_OUTPUT_LENGTH / 2;
    let head_end = floor_char_boundary(content, half_length);
    let tail_start = ceil_char_boundary(content, content.len() - half_length);

    let start = &content[..head_end];
    let end = &content[tail_start..];

    let middle_content = &content[head_end..tail_start];
    let truncated_lines_count = middle_content.chars().filter(|&c| c == '\n').count();

    format!(
        "{}\n\n... [{} lines truncated] ...\n\n{}",
        start, truncated_lines_count, end
    )
}

fn floor_char_boundary(s: &str, mut idx: usize) -> usize {
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn ceil_char_boundary(s: &str, mut idx: usize) -> usize {
    while idx < s.len() && !s.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

/// Capabilities rooted at a project directory.
pub struct Workspace {
    root: PathBuf,
    skip_dirs: Vec<String>,
    command_timeout: Duration,
    thinking: SequentialThinking,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>, reasoning: ReasoningConfig) -> Self {
        Self {
            root: root.into(),
            skip_dirs: DEFAULT_SKIP_DIRS.iter().map(|d| d.to_string()).collect(),
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            thinking: SequentialThinking::new(reasoning),
        }
    }

    /// Replaces the glob patterns of directory names skipped while walking.
    pub fn with_skip_dirs(mut self, patterns: Vec<String>) -> Self {
        self.skip_dirs = patterns;
        self
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Relative paths are taken from the project root.
    pub(crate) fn resolve(&self, path: &str) -> PathBuf {
        let candidate = Path::new(path);
        if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.root.join(candidate)
        }
    }

    pub(crate) fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .to_string()
    }

    pub(crate) fn skips_dir(&self, name: &str) -> bool {
        self.skip_dirs
            .iter()
            .any(|pattern| glob_match::glob_match(pattern, name))
    }
}

#[async_trait]
impl CapabilityProvider for Workspace {
    fn catalog(&self) -> Vec<ToolSpec> {
        catalog(self.thinking.is_enabled())
    }

    async fn invoke(&self, name: &str, arguments: &Value) -> ToolResult {
        match ToolKind::from_name(name) {
            ToolKind::ReadFile => file::read_file(self, parse_args(arguments)?).await,
            ToolKind::WriteFile => file::write_file(self, parse_args(arguments)?).await,
            ToolKind::SeeFileTree => tree::see_file_tree(self, parse_args(arguments)?).await,
            ToolKind::ExecuteBashCommand => {
                bash::execute_bash_command(self, parse_args(arguments)?, self.command_timeout).await
            }
            ToolKind::SearchInFiles => search::search_in_files(self, parse_args(arguments)?).await,
            ToolKind::SequentialThinking => self.thinking.think(parse_args(arguments)?).await,
            ToolKind::Unknown(name) => Err(ToolError::UnknownTool(name)),
        }
    }
}
