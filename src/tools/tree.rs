use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use tokio::fs;

use super::{ToolError, ToolOutput, ToolResult, Workspace};

const MAX_TREE_ENTRIES: usize = 1000;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FileTreeParams {
    #[schemars(description = "Root directory to list from, relative to the project directory")]
    #[serde(default = "default_root")]
    pub root_dir: String,
}

pub(super) fn default_root() -> String {
    ".".to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub(super) struct Entry {
    pub path: PathBuf,
    pub is_dir: bool,
}

/// Walks `root` directory by directory: every level's entries (sorted by
/// name) come before the contents of its subdirectories.
pub(super) async fn walk(
    workspace: &Workspace,
    root: &Path,
    limit: usize,
) -> Result<(Vec<Entry>, bool), ToolError> {
    let metadata = fs::metadata(root).await.map_err(|_| {
        ToolError::Failed(format!("Path '{}' does not exist", workspace.relative(root)))
    })?;
    if !metadata.is_dir() {
        return Err(ToolError::Failed(format!(
            "Path '{}' is not a directory",
            workspace.relative(root)
        )));
    }

    let mut entries = Vec::new();
    let mut truncated = false;
    walk_directory(workspace, root, &mut entries, &mut truncated, limit).await?;
    Ok((entries, truncated))
}

type WalkFuture<'a> = Pin<Box<dyn Future<Output = Result<(), ToolError>> + Send + 'a>>;

fn walk_directory<'a>(
    workspace: &'a Workspace,
    path: &'a Path,
    entries: &'a mut Vec<Entry>,
    truncated: &'a mut bool,
    limit: usize,
) -> WalkFuture<'a> {
    Box::pin(async move {
        let mut level = Vec::new();
        let mut reader = fs::read_dir(path).await?;

        while let Some(dir_entry) = reader.next_entry().await? {
            let file_type = match dir_entry.file_type().await {
                Ok(file_type) => file_type,
                Err(_) => continue,
            };
            let is_dir = file_type.is_dir();
            let name = dir_entry.file_name().to_string_lossy().to_string();

            if is_dir && workspace.skips_dir(&name) {
                continue;
            }
            level.push(Entry {
                path: dir_entry.path(),
                is_dir,
            });
        }
        level.sort_by(|a, b| a.path.cmp(&b.path));

        for entry in &level {
            if entries.len() >= limit {
                *truncated = true;
                return Ok(());
            }
            entries.push(entry.clone());
        }

        for entry in level.iter().filter(|e| e.is_dir) {
            if *truncated {
                break;
            }
            // Unreadable subdirectories are listed but not descended into
            let _ = walk_directory(workspace, &entry.path, &mut *entries, &mut *truncated, limit).await;
        }

        Ok(())
    })
}

pub(super) async fn see_file_tree(workspace: &Workspace, params: FileTreeParams) -> ToolResult {
    let root = workspace.resolve(&params.root_dir);
    tracing::debug!(root = %root.display(), "listing file tree");

    let (entries, truncated) = walk(workspace, &root, MAX_TREE_ENTRIES).await?;

    let mut listing: Vec<Value> = entries
        .iter()
        .map(|entry| Value::String(workspace.relative(&entry.path)))
        .collect();

    if truncated {
        listing.push(Value::String(format!(
            "... listing stopped after {} entries; use a more specific root_dir",
            MAX_TREE_ENTRIES
        )));
    }

    Ok(ToolOutput::Structured(Value::Array(listing)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReasoningConfig;
    use crate::tools::CapabilityProvider;
    use serde_json::json;
    use std::fs::{create_dir_all, write};
    use tempfile::tempdir;

    fn create_project() -> anyhow::Result<tempfile::TempDir> {
        let dir = tempdir()?;
        create_dir_all(dir.path().join("src/inner"))?;
        create_dir_all(dir.path().join(".git/objects"))?;
        create_dir_all(dir.path().join("node_modules/pkg"))?;
        write(dir.path().join("README.md"), "hello")?;
        write(dir.path().join("src/main.py"), "print('hi')")?;
        write(dir.path().join("src/inner/util.py"), "x = 1")?;
        write(dir.path().join(".git/objects/blob"), "binary")?;
        write(dir.path().join("node_modules/pkg/index.js"), "module")?;
        Ok(dir)
    }

    fn listing(output: ToolOutput) -> Vec<String> {
        match output {
            ToolOutput::Structured(Value::Array(items)) => items
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            other => panic!("unexpected output {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_tree_lists_relative_paths_and_skips_dirs() -> anyhow::Result<()> {
        let dir = create_project()?;
        let ws = Workspace::new(dir.path(), ReasoningConfig::default());

        let paths = listing(ws.invoke("see_file_tree", &json!({})).await?);

        assert_eq!(
            paths,
            vec!["README.md", "src", "src/inner", "src/main.py", "src/inner/util.py"]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_tree_from_subdirectory() -> anyhow::Result<()> {
        let dir = create_project()?;
        let ws = Workspace::new(dir.path(), ReasoningConfig::default());

        let paths = listing(ws.invoke("see_file_tree", &json!({"root_dir": "src"})).await?);

        assert_eq!(paths, vec!["src/inner", "src/main.py", "src/inner/util.py"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_tree_missing_root() {
        let dir = tempdir().unwrap();
        let ws = Workspace::new(dir.path(), ReasoningConfig::default());

        let err = ws
            .invoke("see_file_tree", &json!({"root_dir": "nope"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[tokio::test]
    async fn test_walk_stops_at_limit() -> anyhow::Result<()> {
        let dir = create_project()?;
        let ws = Workspace::new(dir.path(), ReasoningConfig::default());

        let (entries, truncated) = walk(&ws, dir.path(), 2).await?;
        assert_eq!(entries.len(), 2);
        assert!(truncated);
        Ok(())
    }
}
