mod models;
mod openai;

pub use models::{AssistantTurn, Message, Role, ToolInvocation, ToolSpec};
pub use openai::{catalog_json, OpenAiClient};

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("request to completion endpoint failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("completion endpoint returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("failed to decode completion response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("completion endpoint returned no choices")]
    EmptyResponse,
}

/// A remote model that produces one assistant turn per call.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(
        &self,
        messages: &[Message],
        tools: Option<&[ToolSpec]>,
    ) -> Result<AssistantTurn, LlmError>;
}
