use std::process::Stdio;
use std::time::{Duration, Instant};

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;
use tokio::process::Command as TokioCommand;
use tokio::time::timeout;

use super::{truncate_output, ToolError, ToolOutput, ToolResult, Workspace};

lazy_static::lazy_static! {
    // Long-running servers that would never return within the timeout
    static ref BLOCKED_FRAGMENTS: Vec<(&'static str, &'static str)> = vec![
        (
            "runserver",
            "Error: Running the Django development server (runserver) is not allowed through this tool.",
        ),
    ];
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ExecuteBashParams {
    #[schemars(description = "The bash command to execute")]
    pub command: String,

    #[schemars(description = "Working directory to run the command in, relative to the project directory")]
    pub cwd: Option<String>,
}

fn blocked_reason(command: &str) -> Option<&'static str> {
    BLOCKED_FRAGMENTS
        .iter()
        .find(|(fragment, _)| command.contains(fragment))
        .map(|(_, reason)| *reason)
}

fn command_result(stdout: &str, stderr: &str, returncode: i32) -> ToolOutput {
    ToolOutput::Structured(json!({
        "stdout": truncate_output(stdout),
        "stderr": truncate_output(stderr),
        "returncode": returncode,
    }))
}

pub(super) async fn execute_bash_command(
    workspace: &Workspace,
    params: ExecuteBashParams,
    limit: Duration,
) -> ToolResult {
    let command = params.command.trim();
    if command.is_empty() {
        return Err(ToolError::InvalidArguments("command is empty".to_string()));
    }

    if let Some(reason) = blocked_reason(command) {
        tracing::warn!(command, "refusing blocked command");
        return Ok(command_result("", reason, 1));
    }

    let cwd = match &params.cwd {
        Some(dir) if !dir.trim().is_empty() => workspace.resolve(dir),
        _ => workspace.root().to_path_buf(),
    };

    let (shell, shell_arg) = if cfg!(target_os = "windows") {
        ("cmd", "/C")
    } else {
        ("bash", "-c")
    };

    let mut cmd = TokioCommand::new(shell);
    cmd.arg(shell_arg)
        .arg(command)
        .current_dir(&cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let start_time = Instant::now();
    let output = match timeout(limit, cmd.output()).await {
        Ok(result) => result?,
        Err(_) => {
            return Err(ToolError::Failed(format!(
                "Command '{}' timed out after {} seconds",
                command,
                limit.as_secs_f32()
            )))
        }
    };

    let returncode = output.status.code().unwrap_or(-1);
    tracing::debug!(
        command,
        returncode,
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "command finished"
    );

    Ok(command_result(
        &String::from_utf8_lossy(&output.stdout),
        &String::from_utf8_lossy(&output.stderr),
        returncode,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReasoningConfig;
    use crate::tools::CapabilityProvider;
    use serde_json::Value;
    use tempfile::tempdir;

    fn fields(output: ToolOutput) -> (String, String, i64) {
        match output {
            ToolOutput::Structured(value) => (
                value["stdout"].as_str().unwrap_or_default().to_string(),
                value["stderr"].as_str().unwrap_or_default().to_string(),
                value["returncode"].as_i64().unwrap_or(i64::MIN),
            ),
            other => panic!("unexpected output {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_bash_basic_commands() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let ws = Workspace::new(dir.path(), ReasoningConfig::default());

        let result = ws
            .invoke("execute_bash_command", &json!({"command": "echo 'Hello, world!'"}))
            .await?;
        let (stdout, stderr, code) = fields(result);
        assert_eq!(stdout.trim(), "Hello, world!");
        assert!(stderr.is_empty());
        assert_eq!(code, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_bash_runs_in_project_and_cwd() -> anyhow::Result<()> {
        let dir = tempdir()?;
        std::fs::create_dir(dir.path().join("sub"))?;
        std::fs::write(dir.path().join("sub/marker.txt"), "x")?;
        let ws = Workspace::new(dir.path(), ReasoningConfig::default());

        let result = ws
            .invoke("execute_bash_command", &json!({"command": "ls", "cwd": "sub"}))
            .await?;
        let (stdout, _, code) = fields(result);
        assert!(stdout.contains("marker.txt"));
        assert_eq!(code, 0);

        let result = ws
            .invoke("execute_bash_command", &json!({"command": "ls"}))
            .await?;
        let (stdout, _, _) = fields(result);
        assert!(stdout.contains("sub"));
        Ok(())
    }

    #[tokio::test]
    async fn test_bash_command_with_error() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let ws = Workspace::new(dir.path(), ReasoningConfig::default());

        let result = ws
            .invoke("execute_bash_command", &json!({"command": "echo oops >&2; exit 3"}))
            .await?;
        let (_, stderr, code) = fields(result);
        assert_eq!(stderr.trim(), "oops");
        assert_eq!(code, 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_bash_command_timeout() {
        let dir = tempdir().unwrap();
        let ws = Workspace::new(dir.path(), ReasoningConfig::default())
            .with_command_timeout(Duration::from_millis(200));

        let result = ws
            .invoke("execute_bash_command", &json!({"command": "sleep 3"}))
            .await;
        match result {
            Err(ToolError::Failed(msg)) => assert!(msg.contains("timed out")),
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_runserver_is_blocked() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let ws = Workspace::new(dir.path(), ReasoningConfig::default());

        let result = ws
            .invoke("execute_bash_command", &json!({"command": "python manage.py runserver"}))
            .await?;
        let (stdout, stderr, code) = fields(result);
        assert!(stdout.is_empty());
        assert!(stderr.contains("runserver"));
        assert_eq!(code, 1);
        Ok(())
    }

    #[test]
    fn test_command_result_shape() {
        let output = command_result("out", "", 0);
        match output {
            ToolOutput::Structured(Value::Object(map)) => {
                let keys: Vec<&str> = map.keys().map(String::as_str).collect();
                assert_eq!(keys.len(), 3);
                assert!(keys.contains(&"stdout") && keys.contains(&"stderr") && keys.contains(&"returncode"));
            }
            other => panic!("unexpected output {:?}", other),
        }
    }
}
