use crate::llm::{Message, Role, ToolInvocation};

/// Append-only message log for one session plus the count of completed
/// endpoint exchanges.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    turns: usize,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a conversation whose first message is the given system prompt.
    /// A blank prompt yields an empty conversation.
    pub fn with_system(system: &str) -> Self {
        let mut conversation = Self::new();
        if !system.trim().is_empty() {
            conversation.messages.push(Message::system(system));
        }
        conversation
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn turns(&self) -> usize {
        self.turns
    }

    pub fn record_exchange(&mut self) -> usize {
        self.turns += 1;
        self.turns
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(Message::assistant(content));
    }

    pub fn push_assistant_with_tools(
        &mut self,
        content: impl Into<String>,
        invocations: Vec<ToolInvocation>,
    ) {
        self.messages
            .push(Message::assistant_with_tools(content, invocations));
    }

    /// Appends a tool result. The id should belong to an invocation of the
    /// latest assistant message that has not been answered yet.
    pub fn push_tool_result(&mut self, invocation_id: &str, content: impl Into<String>) {
        if !self.pending_invocation_ids().iter().any(|id| id == invocation_id) {
            tracing::warn!(invocation_id, "tool result has no pending invocation");
        }
        self.messages.push(Message::tool(invocation_id, content));
    }

    /// Invocation ids of the latest assistant message still awaiting a result.
    pub fn pending_invocation_ids(&self) -> Vec<String> {
        let Some(assistant_idx) = self
            .messages
            .iter()
            .rposition(|m| m.role == Role::Assistant)
        else {
            return Vec::new();
        };

        let answered: Vec<&str> = self.messages[assistant_idx + 1..]
            .iter()
            .filter_map(|m| m.tool_invocation_id.as_deref())
            .collect();

        self.messages[assistant_idx]
            .tool_invocations
            .iter()
            .filter(|inv| !answered.contains(&inv.id.as_str()))
            .map(|inv| inv.id.clone())
            .collect()
    }

    pub fn last_user_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_system_message_is_first() {
        let conversation = Conversation::with_system("be brief");
        assert_eq!(conversation.len(), 1);
        assert_eq!(conversation.messages()[0].role, Role::System);

        let empty = Conversation::with_system("   ");
        assert!(empty.is_empty());
    }

    #[test]
    fn test_last_user_text() {
        let mut conversation = Conversation::with_system("sys");
        assert_eq!(conversation.last_user_text(), None);

        conversation.push_user("first");
        conversation.push_assistant("ok");
        conversation.push_user("second");
        conversation.push_assistant("done");

        assert_eq!(conversation.last_user_text(), Some("second"));
    }

    #[test]
    fn test_pending_invocations_shrink_as_results_arrive() {
        let mut conversation = Conversation::new();
        conversation.push_user("read both files");
        conversation.push_assistant_with_tools(
            "",
            vec![
                ToolInvocation::new("a", "read_file", json!({"filepath": "a"})),
                ToolInvocation::new("b", "read_file", json!({"filepath": "b"})),
            ],
        );
        assert_eq!(conversation.pending_invocation_ids(), vec!["a", "b"]);

        conversation.push_tool_result("a", "A");
        assert_eq!(conversation.pending_invocation_ids(), vec!["b"]);

        conversation.push_tool_result("b", "B");
        assert!(conversation.pending_invocation_ids().is_empty());
    }

    #[test]
    fn test_record_exchange_counts_up() {
        let mut conversation = Conversation::new();
        assert_eq!(conversation.record_exchange(), 1);
        assert_eq!(conversation.record_exchange(), 2);
        assert_eq!(conversation.turns(), 2);
    }

    #[test]
    fn test_unmatched_tool_result_is_kept() {
        let mut conversation = Conversation::new();
        conversation.push_user("read file a.txt");
        conversation.push_assistant_with_tools(
            "",
            vec![ToolInvocation::new("call_0", "read_file", json!({"filepath": "a.txt"}))],
        );
        conversation.push_tool_result("call_0", "first");
        conversation.push_tool_result("call_0", "second");

        assert_eq!(conversation.len(), 4);
        assert!(conversation.pending_invocation_ids().is_empty());
    }
}
