use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::fs;

use super::tree::{default_root, walk};
use super::{ToolError, ToolOutput, ToolResult, Workspace};

const MAX_SEARCH_FILES: usize = 10_000;
const MAX_SEARCH_MATCHES: usize = 1_000;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchParams {
    #[schemars(description = "Pattern to search for in files")]
    pub pattern: String,

    #[schemars(description = "Root directory to search from, relative to the project directory")]
    #[serde(default = "default_root")]
    pub root_dir: String,
}

/// Plain substring search, one match per line as `[path, line_number, line]`.
pub(super) async fn search_in_files(workspace: &Workspace, params: SearchParams) -> ToolResult {
    search_with_limits(workspace, params, MAX_SEARCH_FILES, MAX_SEARCH_MATCHES).await
}

async fn search_with_limits(
    workspace: &Workspace,
    params: SearchParams,
    max_entries: usize,
    max_matches: usize,
) -> ToolResult {
    if params.pattern.is_empty() {
        return Err(ToolError::InvalidArguments("pattern must not be empty".to_string()));
    }

    let root = workspace.resolve(&params.root_dir);
    tracing::debug!(root = %root.display(), pattern = %params.pattern, "searching files");

    let (entries, walk_truncated) = walk(workspace, &root, max_entries).await?;
    let mut matches: Vec<Value> = Vec::new();
    let mut matches_truncated = false;

    'files: for entry in entries.iter().filter(|e| !e.is_dir) {
        // Unreadable and non-UTF-8 files are skipped
        let Ok(content) = fs::read_to_string(&entry.path).await else {
            continue;
        };

        let relative = workspace.relative(&entry.path);
        for (idx, line) in content.lines().enumerate() {
            if !line.contains(&params.pattern) {
                continue;
            }
            if matches.len() >= max_matches {
                matches_truncated = true;
                break 'files;
            }
            matches.push(json!([relative, idx + 1, line.trim()]));
        }
    }

    if matches_truncated {
        matches.push(Value::String(format!(
            "... search stopped after {} matches; use a more specific pattern or root_dir",
            max_matches
        )));
    }
    if walk_truncated {
        matches.push(Value::String(format!(
            "... only the first {} entries were searched; use a more specific root_dir",
            max_entries
        )));
    }

    Ok(ToolOutput::Structured(Value::Array(matches)))
}
