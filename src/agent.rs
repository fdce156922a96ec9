//! The tool-calling conversation loop.
//!
//! One call to [`Agent::run`] takes a user query to a final answer: it asks
//! the endpoint for a turn, executes any requested tools in order, feeds the
//! results back, and repeats until the endpoint answers without tools or the
//! cycle limit is hit.

use crate::conversation::Conversation;
use crate::gate::ToolGate;
use crate::llm::{AssistantTurn, CompletionClient, LlmError, ToolInvocation};
use crate::tools::{render_result, CapabilityProvider, ToolError, ToolKind, ToolOutput};

use tracing::{info, warn};

pub const FALLBACK_PREFIX: &str = "No final model answer was returned. Here's the latest tool result:\n";

const PREVIEW_CHARS: usize = 200;

/// Final answer used when the loop ends without model text.
pub fn fallback_answer(last_tool_result: &str) -> String {
    format!("{}{}", FALLBACK_PREFIX, last_tool_result)
}

pub struct Agent {
    client: Box<dyn CompletionClient>,
    tools: Box<dyn CapabilityProvider>,
    gate: ToolGate,
    max_cycles: usize,
}

impl Agent {
    pub fn new(
        client: Box<dyn CompletionClient>,
        tools: Box<dyn CapabilityProvider>,
        gate: ToolGate,
        max_cycles: usize,
    ) -> Self {
        Self {
            client,
            tools,
            gate,
            max_cycles: max_cycles.max(1),
        }
    }

    pub fn max_cycles(&self) -> usize {
        self.max_cycles
    }

    /// Drives `user_text` to a final answer. Never fails: endpoint errors and
    /// an exhausted cycle budget both end in an assistant message.
    pub async fn run(&self, conversation: &mut Conversation, user_text: &str) -> String {
        conversation.push_user(user_text);

        let mut cycles = 0;
        let mut last_tool_result: Option<String> = None;

        loop {
            let turn = match self.request_turn(conversation).await {
                Ok(turn) => turn,
                Err(e) => {
                    warn!(error = %e, "completion request failed");
                    let answer = format!("Error: {}", e);
                    conversation.push_assistant(answer.clone());
                    return answer;
                }
            };

            if !turn.has_invocations() {
                let content = turn.content.unwrap_or_default();
                let answer = match (&last_tool_result, content.is_empty()) {
                    (Some(last), true) => fallback_answer(last),
                    _ => content,
                };
                conversation.push_assistant(answer.clone());
                return answer;
            }

            let AssistantTurn {
                content,
                tool_invocations,
            } = turn;
            conversation.push_assistant_with_tools(content.unwrap_or_default(), tool_invocations.clone());

            for invocation in &tool_invocations {
                let rendered = self.execute(conversation, invocation).await;
                conversation.push_tool_result(&invocation.id, rendered.clone());
                last_tool_result = Some(rendered);
            }

            cycles += 1;
            if cycles >= self.max_cycles {
                warn!(cycles, "tool cycle limit reached without a final answer");
                let answer = fallback_answer(last_tool_result.as_deref().unwrap_or_default());
                conversation.push_assistant(answer.clone());
                return answer;
            }
        }
    }

    async fn request_turn(&self, conversation: &mut Conversation) -> Result<AssistantTurn, LlmError> {
        let expose = self.gate.should_expose_tools(conversation);
        let catalog = expose.then(|| self.tools.catalog());

        info!(
            prompt = conversation.turns() + 1,
            tools_offered = expose,
            "sending prompt to model"
        );
        for message in conversation.messages() {
            info!(role = ?message.role, "{}", message.content);
        }

        let turn = self
            .client
            .complete(conversation.messages(), catalog.as_deref())
            .await?;
        conversation.record_exchange();

        let requested: Vec<&str> = turn.tool_invocations.iter().map(|i| i.name.as_str()).collect();
        info!(
            content = turn.content.as_deref().unwrap_or(""),
            tool_calls = ?requested,
            "received model response"
        );

        Ok(turn)
    }

    async fn execute(&self, conversation: &Conversation, invocation: &ToolInvocation) -> String {
        info!(tool = %invocation.name, args = %invocation.arguments, "executing tool");

        if ToolKind::from_name(&invocation.name) == ToolKind::ExecuteBashCommand {
            let auth = self.gate.authorize_shell_execution(conversation);
            if !auth.allowed {
                warn!(tool = %invocation.name, "shell execution denied");
                return ToolOutput::command_denied(&auth.reason).render();
            }
        }

        let result = self.tools.invoke(&invocation.name, &invocation.arguments).await;
        if let Err(ToolError::CollaboratorUnavailable(reason)) = &result {
            warn!(tool = %invocation.name, %reason, "collaborator unavailable");
        }

        let rendered = render_result(&invocation.name, &result);
        info!(tool = %invocation.name, result = %preview(&rendered), "tool finished");
        rendered
    }
}

fn preview(text: &str) -> String {
    if text.chars().count() <= PREVIEW_CHARS {
        return text.to_string();
    }
    let head: String = text.chars().take(PREVIEW_CHARS).collect();
    format!("{}...", head)
}
