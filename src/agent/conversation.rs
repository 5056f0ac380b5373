//! Conversation state owned by one session.

use crate::llm::{ChatMessage, Role, ToolCall};

/// Ordered, append-only list of messages sent to the model.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    /// Start a conversation with a system prompt.
    pub fn with_system_prompt(prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::system(prompt)],
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.push(ChatMessage::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.push(ChatMessage::assistant(content));
    }

    pub fn push_tool_calls(&mut self, content: Option<String>, calls: Vec<ToolCall>) {
        self.push(ChatMessage::assistant_tool_calls(content, calls));
    }

    pub fn push_tool_result(&mut self, call_id: impl Into<String>, content: impl Into<String>) {
        self.push(ChatMessage::tool_result(call_id, content));
    }

    /// Tool results recorded for `call_id`.
    pub fn results_for<'a>(&'a self, call_id: &'a str) -> impl Iterator<Item = &'a ChatMessage> {
        self.messages
            .iter()
            .filter(move |m| m.role == Role::Tool && m.tool_call_id.as_deref() == Some(call_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_messages_in_append_order() {
        let mut conv = Conversation::with_system_prompt("be brief");
        conv.push_user("weather in Oslo?");
        conv.push_tool_calls(None, vec![ToolCall::new("c1", "get_weather", "{}")]);
        conv.push_tool_result("c1", "cold");
        conv.push_assistant("It is cold.");

        let roles: Vec<Role> = conv.messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::Tool, Role::Assistant]
        );
        assert_eq!(conv.results_for("c1").count(), 1);
        assert_eq!(conv.results_for("c2").count(), 0);
    }

    #[test]
    fn consecutive_assistant_entries_are_not_merged() {
        let mut conv = Conversation::default();
        assert!(conv.is_empty());
        conv.push_assistant("{\"step\":\"PLAN\"}");
        conv.push_assistant("{\"step\":\"PLAN\"}");
        assert_eq!(conv.len(), 2);
    }
}
