use schemars::JsonSchema;
use serde::Deserialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::{truncate_output, ToolError, ToolOutput, ToolResult, Workspace};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ReadFileParams {
    #[schemars(description = "Path to the file, relative to the project directory")]
    pub filepath: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct WriteFileParams {
    #[schemars(description = "Path to the file, relative to the project directory")]
    pub filepath: String,

    #[schemars(description = "Content to write to the file")]
    pub content: String,
}

pub(super) async fn read_file(workspace: &Workspace, params: ReadFileParams) -> ToolResult {
    let path = workspace.resolve(&params.filepath);
    tracing::debug!(path = %path.display(), "reading file");

    let metadata = fs::metadata(&path)
        .await
        .map_err(|_| ToolError::Failed(format!("File '{}' does not exist", params.filepath)))?;

    if !metadata.is_file() {
        return Err(ToolError::Failed(format!(
            "Path '{}' is not a file",
            params.filepath
        )));
    }

    let content = fs::read_to_string(&path).await?;
    Ok(ToolOutput::Text(truncate_output(&content)))
}

pub(super) async fn write_file(workspace: &Workspace, params: WriteFileParams) -> ToolResult {
    let path = workspace.resolve(&params.filepath);
    tracing::debug!(path = %path.display(), bytes = params.content.len(), "writing file");

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let mut file = fs::File::create(&path).await?;
    file.write_all(params.content.as_bytes()).await?;
    file.flush().await?;

    Ok(ToolOutput::Text(format!(
        "Successfully wrote to {}",
        params.filepath
    )))
}
