//! Interactive question/answer session on top of the agent loop.

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::agent::Agent;
use crate::conversation::Conversation;

const PROMPT: &str = "\nYour question: ";
const GOODBYE: &str = "\n\nGoodbye! Thanks for chatting!\n";

#[derive(Debug, PartialEq)]
enum Input {
    Query(String),
    Empty,
    Exit,
    Eof,
}

pub fn banner() -> String {
    let rule = "=".repeat(80);
    format!(
        "{rule}\n\
         INTERACTIVE CODING AGENT - Have a conversation!\n\
         Type your questions and press Enter. Use /exit or Ctrl+D to leave.\n\
         I can help with file operations, code analysis, and general questions.\n\n\
         Tips:\n\
         - Single-line: type and press Enter.\n\
         - Multi-line: type /ml and press Enter, then paste lines; finish with /end (or ---) on its own line.\n\
         {rule}\n"
    )
}

async fn read_line<R>(reader: &mut R) -> Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

async fn read_input<R, W>(reader: &mut R, writer: &mut W) -> Result<Input>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    writer.write_all(PROMPT.as_bytes()).await?;
    writer.flush().await?;

    let Some(line) = read_line(reader).await? else {
        return Ok(Input::Eof);
    };
    let mut query = line.trim().to_string();

    if query.eq_ignore_ascii_case("/ml") {
        writer
            .write_all(b"Enter multi-line input. Finish with /end or --- on a line by itself.\n")
            .await?;
        writer.flush().await?;

        let mut lines = Vec::new();
        // EOF also finishes the block
        while let Some(line) = read_line(reader).await? {
            if matches!(line.trim(), "/end" | "---") {
                break;
            }
            lines.push(line);
        }
        query = lines.join("\n").trim().to_string();
    }

    let lowered = query.to_lowercase();
    if lowered == "/exit" || lowered == "/quit" {
        return Ok(Input::Exit);
    }
    if query.is_empty() {
        return Ok(Input::Empty);
    }
    Ok(Input::Query(query))
}

/// Runs the session until `/exit`, `/quit`, or end of input.
pub async fn run<R, W>(
    agent: &Agent,
    conversation: &mut Conversation,
    reader: &mut R,
    writer: &mut W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    writer.write_all(banner().as_bytes()).await?;

    loop {
        match read_input(reader, writer).await? {
            Input::Query(query) => {
                let answer = agent.run(conversation, &query).await;
                writer
                    .write_all(format!("Answer: {}\n", answer).as_bytes())
                    .await?;
            }
            Input::Empty => writer.write_all(b"Please enter a question.\n").await?,
            Input::Exit => {
                writer.write_all(b"Exiting...\n").await?;
                break;
            }
            Input::Eof => {
                writer.write_all(GOODBYE.as_bytes()).await?;
                break;
            }
        }
    }

    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::ToolGate;
    use crate::llm::{AssistantTurn, CompletionClient, LlmError, Message, ToolSpec};
    use crate::tools::{CapabilityProvider, ToolError, ToolResult};
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::{Arc, Mutex};
    use tokio::io::BufReader;

    /// Answers every prompt by echoing the last user message.
    struct EchoClient {
        seen: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl CompletionClient for EchoClient {
        async fn complete(
            &self,
            messages: &[Message],
            _tools: Option<&[ToolSpec]>,
        ) -> Result<AssistantTurn, LlmError> {
            let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
            self.seen.lock().unwrap().push(last.clone());
            Ok(AssistantTurn::text(format!("echo: {}", last)))
        }
    }

    struct NoTools;

    #[async_trait]
    impl CapabilityProvider for NoTools {
        fn catalog(&self) -> Vec<ToolSpec> {
            Vec::new()
        }

        async fn invoke(&self, name: &str, _arguments: &Value) -> ToolResult {
            Err(ToolError::UnknownTool(name.to_string()))
        }
    }

    async fn session(input: &str) -> (String, Vec<String>, Conversation) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let agent = Agent::new(
            Box::new(EchoClient { seen: seen.clone() }),
            Box::new(NoTools),
            ToolGate::default(),
            8,
        );
        let mut conversation = Conversation::with_system("sys");
        let mut reader = BufReader::new(input.as_bytes());
        let mut output: Vec<u8> = Vec::new();

        run(&agent, &mut conversation, &mut reader, &mut output)
            .await
            .unwrap();

        let seen = seen.lock().unwrap().clone();
        (String::from_utf8(output).unwrap(), seen, conversation)
    }

    #[tokio::test]
    async fn test_single_line_questions() {
        let (output, seen, conversation) = session("hello\nwhat next?\n/exit\n").await;

        assert_eq!(seen, vec!["hello", "what next?"]);
        assert!(output.contains("Answer: echo: hello\n"));
        assert!(output.contains("Answer: echo: what next?\n"));
        assert!(output.ends_with("Exiting...\n"));
        assert_eq!(conversation.len(), 5);
    }

    #[tokio::test]
    async fn test_multi_line_block() {
        let (_, seen, _) = session("/ml\nfirst line\n  second line\n/end\n/quit\n").await;
        assert_eq!(seen, vec!["first line\n  second line"]);

        let (_, seen, _) = session("/ML\none\n---\n/exit\n").await;
        assert_eq!(seen, vec!["one"]);
    }

    #[tokio::test]
    async fn test_multi_line_ends_at_eof() {
        let (output, seen, _) = session("/ml\nunterminated").await;

        assert_eq!(seen, vec!["unterminated"]);
        assert!(output.ends_with(GOODBYE));
    }

    #[tokio::test]
    async fn test_empty_input_is_rejected() {
        let (output, seen, _) = session("   \n/exit\n").await;

        assert!(seen.is_empty());
        assert!(output.contains("Please enter a question.\n"));
    }

    #[tokio::test]
    async fn test_eof_says_goodbye() {
        let (output, seen, conversation) = session("").await;

        assert!(seen.is_empty());
        assert!(output.starts_with(&banner()));
        assert!(output.ends_with(GOODBYE));
        assert_eq!(conversation.len(), 1);
    }
}
