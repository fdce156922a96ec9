use super::models::{
    AssistantTurn, ChatRequest, ChatResponse, Message, ToolInvocation, ToolSpec, WireFunction,
    WireFunctionCall, WireMessage, WireTool, WireToolCall,
};
use super::{CompletionClient, LlmError};
use crate::config::EndpointConfig;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;

/// Client for an OpenAI-compatible `chat/completions` endpoint.
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(config: &EndpointConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn send_request(&self, request: &ChatRequest<'_>) -> Result<ChatResponse, LlmError> {
        let response = self
            .http
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api { status, body });
        }

        let text = response.text().await?;
        let parsed: ChatResponse = serde_json::from_str(&text)?;
        Ok(parsed)
    }
}

pub(crate) fn to_wire(message: &Message) -> WireMessage {
    WireMessage {
        role: message.role,
        content: Some(message.content.clone()),
        tool_calls: message
            .tool_invocations
            .iter()
            .map(|invocation| WireToolCall {
                id: Some(invocation.id.clone()),
                call_type: "function".to_string(),
                function: WireFunctionCall {
                    name: invocation.name.clone(),
                    arguments: invocation.arguments_json(),
                },
            })
            .collect(),
        tool_call_id: message.tool_invocation_id.clone(),
    }
}

pub(crate) fn tool_to_wire(spec: &ToolSpec) -> WireTool {
    WireTool {
        tool_type: "function",
        function: WireFunction {
            name: spec.name.clone(),
            description: spec.description.clone(),
            parameters: spec.parameters.clone(),
        },
    }
}

/// The `tools` array exactly as it is sent to the endpoint.
pub fn catalog_json(specs: &[ToolSpec]) -> Result<Value, serde_json::Error> {
    serde_json::to_value(specs.iter().map(tool_to_wire).collect::<Vec<_>>())
}

fn generated_id() -> String {
    format!("call_{}", uuid::Uuid::new_v4().simple())
}

/// Missing or repeated ids get a generated `call_<uuid>` so every invocation
/// in a turn has its own id.
pub(crate) fn from_wire(message: WireMessage) -> AssistantTurn {
    let mut seen = HashSet::new();
    let tool_invocations = message
        .tool_calls
        .into_iter()
        .map(|call| {
            let id = match call.id.filter(|id| !id.is_empty()) {
                Some(id) if !seen.contains(&id) => id,
                Some(id) => {
                    tracing::warn!(%id, "endpoint repeated a tool call id");
                    generated_id()
                }
                None => generated_id(),
            };
            seen.insert(id.clone());

            let arguments = if call.function.arguments.trim().is_empty() {
                Value::Object(Default::default())
            } else {
                serde_json::from_str(&call.function.arguments)
                    .unwrap_or(Value::String(call.function.arguments))
            };
            ToolInvocation::new(id, call.function.name, arguments)
        })
        .collect();

    AssistantTurn {
        content: message.content,
        tool_invocations,
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(
        &self,
        messages: &[Message],
        tools: Option<&[ToolSpec]>,
    ) -> Result<AssistantTurn, LlmError> {
        let request = ChatRequest {
            model: &self.model,
            messages: messages.iter().map(to_wire).collect(),
            tools: tools.map(|specs| specs.iter().map(tool_to_wire).collect()),
        };

        let response = self.send_request(&request).await?;
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or(LlmError::EmptyResponse)?;

        Ok(from_wire(choice.message))
    }
}
