//! Conversation management for the AI agent

use crate::tools::{ToolResult, ToolUse};
use serde::{Deserialize, Serialize};

/// Role of a message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User message
    User,
    /// Assistant (AI) message
    Assistant,
    /// Output of a tool the assistant asked for
    Tool,
}

/// Content of a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Simple text content
    Text(String),
    /// Tool invocations requested by the assistant, with any text sent alongside
    ToolCalls {
        text: Option<String>,
        calls: Vec<ToolUse>,
    },
    /// Result of one tool invocation
    ToolResult(ToolResult),
}

impl From<String> for MessageContent {
    fn from(s: String) -> Self {
        MessageContent::Text(s)
    }
}

impl From<&str> for MessageContent {
    fn from(s: &str) -> Self {
        MessageContent::Text(s.to_string())
    }
}

impl PartialEq<&str> for MessageContent {
    fn eq(&self, other: &&str) -> bool {
        match self {
            MessageContent::Text(text) => text == other,
            _ => false,
        }
    }
}

impl MessageContent {
    /// Get text content if this is a text message, None otherwise
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageContent::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// A message in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the sender
    pub role: Role,
    /// Content of the message
    pub content: MessageContent,
}

impl Message {
    /// Create a new user message with text content
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(content.into()),
        }
    }

    /// Create a new assistant message with text content
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Text(content.into()),
        }
    }

    /// Create an assistant message that requests tool invocations
    pub fn assistant_tool_calls(text: Option<String>, calls: Vec<ToolUse>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::ToolCalls { text, calls },
        }
    }

    /// Create a message carrying a tool result
    pub fn tool_result(result: ToolResult) -> Self {
        Self {
            role: Role::Tool,
            content: MessageContent::ToolResult(result),
        }
    }

    /// Get the text content if this is a text message
    pub fn as_text(&self) -> Option<&str> {
        self.content.as_text()
    }

    /// Tool calls carried by this message, if any
    pub fn tool_calls(&self) -> &[ToolUse] {
        match &self.content {
            MessageContent::ToolCalls { calls, .. } => calls,
            _ => &[],
        }
    }

    /// Whether this is plain user text, the only safe start for a truncated history
    fn is_user_text(&self) -> bool {
        self.role == Role::User && matches!(self.content, MessageContent::Text(_))
    }

    /// Get the character count of this message
    pub fn char_count(&self) -> usize {
        match &self.content {
            MessageContent::Text(text) => text.len(),
            MessageContent::ToolCalls { text, calls } => {
                text.as_ref().map(|t| t.len()).unwrap_or(0)
                    + calls
                        .iter()
                        .map(|call| call.name.len() + call.input.to_string().len())
                        .sum::<usize>()
            }
            MessageContent::ToolResult(result) => result.content.len(),
        }
    }
}

/// A conversation with the AI agent
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    /// System prompt
    pub system_prompt: Option<String>,
    /// Messages in the conversation
    pub messages: Vec<Message>,
}

impl Conversation {
    /// Create a new empty conversation
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a conversation with a system prompt
    pub fn with_system_prompt(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: Some(system_prompt.into()),
            messages: Vec::new(),
        }
    }

    /// Add a message to the conversation
    pub fn add_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Add a user message
    pub fn add_user_message(&mut self, content: impl Into<String>) {
        self.add_message(Message::user(content));
    }

    /// Add an assistant message
    pub fn add_assistant_message(&mut self, content: impl Into<String>) {
        self.add_message(Message::assistant(content));
    }

    /// Get all messages
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Clear all messages (keeps system prompt)
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Get the total number of characters in the conversation
    pub fn total_chars(&self) -> usize {
        self.system_prompt.as_ref().map(|s| s.len()).unwrap_or(0)
            + self.messages.iter().map(|m| m.char_count()).sum::<usize>()
    }

    /// Get the number of messages in the conversation
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Truncate conversation to stay within a character limit
    ///
    /// Removes the oldest messages first, and only ever cuts just before a user text
    /// message, so a tool result never survives without the assistant request it
    /// answers. The most recent user request and everything after it are always kept,
    /// even when that alone exceeds the limit.
    ///
    /// # Returns
    /// Number of messages removed
    pub fn truncate_to_limit(&mut self, max_chars: usize) -> usize {
        let system_chars = self.system_prompt.as_ref().map(|s| s.len()).unwrap_or(0);
        let mut current_chars: usize = self.messages.iter().map(|m| m.char_count()).sum();

        if current_chars + system_chars <= max_chars {
            return 0;
        }

        let Some(latest_request) = self.messages.iter().rposition(Message::is_user_text) else {
            return 0;
        };

        let target_chars = max_chars.saturating_sub(system_chars);
        let mut remove = 0;
        while remove < latest_request
            && (current_chars > target_chars || !self.messages[remove].is_user_text())
        {
            current_chars = current_chars.saturating_sub(self.messages[remove].char_count());
            remove += 1;
        }

        self.messages.drain(..remove);
        remove
    }

    /// Ensure conversation stays within token budget by truncating if needed
    ///
    /// Uses a rough approximation of 4 characters per token.
    pub fn truncate_to_tokens(&mut self, max_tokens: usize) -> usize {
        self.truncate_to_limit(max_tokens.saturating_mul(4))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(id: &str) -> ToolUse {
        ToolUse {
            id: id.to_string(),
            name: "find_file".to_string(),
            input: serde_json::json!({"filename": "a.txt"}),
        }
    }

    #[test]
    fn test_message_creation() {
        let user_msg = Message::user("Hello");
        assert_eq!(user_msg.role, Role::User);
        assert_eq!(user_msg.content, "Hello");

        let assistant_msg = Message::assistant("Hi there!");
        assert_eq!(assistant_msg.role, Role::Assistant);
        assert_eq!(assistant_msg.as_text(), Some("Hi there!"));
    }

    #[test]
    fn test_tool_messages() {
        let request = Message::assistant_tool_calls(None, vec![call("c1")]);
        assert_eq!(request.role, Role::Assistant);
        assert_eq!(request.tool_calls().len(), 1);
        assert_eq!(request.as_text(), None);

        let result = Message::tool_result(ToolResult::success("c1".into(), "found".into()));
        assert_eq!(result.role, Role::Tool);
        assert_eq!(result.char_count(), 5);
        assert!(result.tool_calls().is_empty());
    }

    #[test]
    fn test_conversation_basics() {
        let mut conv = Conversation::new();
        assert_eq!(conv.messages().len(), 0);

        conv.add_user_message("Hello");
        conv.add_assistant_message("Hi!");
        assert_eq!(conv.message_count(), 2);
        assert_eq!(conv.messages()[0].role, Role::User);
        assert_eq!(conv.messages()[1].role, Role::Assistant);
    }

    #[test]
    fn test_conversation_clear_keeps_system_prompt() {
        let mut conv = Conversation::with_system_prompt("System");
        conv.add_user_message("Hello");
        conv.clear();
        assert_eq!(conv.message_count(), 0);
        assert_eq!(conv.system_prompt, Some("System".to_string()));
    }

    #[test]
    fn test_total_chars() {
        let mut conv = Conversation::with_system_prompt("12345");
        conv.add_user_message("Hello");
        conv.add_assistant_message("Hi");
        assert_eq!(conv.total_chars(), 12);
    }

    #[test]
    fn test_truncate_to_limit_no_truncation_needed() {
        let mut conv = Conversation::new();
        conv.add_user_message("Hello");
        conv.add_assistant_message("Hi");

        assert_eq!(conv.truncate_to_limit(100), 0);
        assert_eq!(conv.message_count(), 2);
    }

    #[test]
    fn test_truncate_to_limit_removes_whole_exchanges() {
        let mut conv = Conversation::new();
        conv.add_user_message("First message"); // 13
        conv.add_assistant_message("Second"); // 6
        conv.add_user_message("Third"); // 5

        // Dropping the first message would leave an assistant reply at the front
        let removed = conv.truncate_to_limit(15);
        assert_eq!(removed, 2);
        assert_eq!(conv.message_count(), 1);
        assert_eq!(conv.messages()[0].content, "Third");
    }

    #[test]
    fn test_truncate_never_orphans_tool_results() {
        let mut conv = Conversation::new();
        conv.add_user_message("a".repeat(40));
        conv.add_message(Message::assistant_tool_calls(None, vec![call("c1")]));
        conv.add_message(Message::tool_result(ToolResult::success(
            "c1".into(),
            "b".repeat(40),
        )));
        conv.add_assistant_message("done");
        conv.add_user_message("next");

        conv.truncate_to_limit(50);
        assert!(conv.messages()[0].is_user_text());
        assert_eq!(conv.messages()[0].content, "next");
    }

    #[test]
    fn test_truncate_keeps_latest_message() {
        let mut conv = Conversation::with_system_prompt("x".repeat(100));
        conv.add_user_message("old");
        conv.add_user_message("new prompt");

        conv.truncate_to_limit(10);
        assert_eq!(conv.message_count(), 1);
        assert_eq!(conv.messages()[0].content, "new prompt");
    }

    #[test]
    fn test_truncate_keeps_current_tool_batch_whole() {
        let mut conv = Conversation::new();
        conv.add_user_message("a".repeat(40));
        conv.add_message(Message::assistant_tool_calls(None, vec![call("c1"), call("c2")]));
        for id in ["c1", "c2"] {
            conv.add_message(Message::tool_result(ToolResult::success(
                id.into(),
                "b".repeat(40),
            )));
        }

        assert_eq!(conv.truncate_to_limit(50), 0);
        assert_eq!(conv.message_count(), 4);
        assert!(conv.messages()[0].is_user_text());
    }

    #[test]
    fn test_truncate_cuts_only_before_latest_request() {
        let mut conv = Conversation::new();
        conv.add_user_message("old request");
        conv.add_assistant_message("old answer");
        conv.add_user_message("current request");
        conv.add_message(Message::assistant_tool_calls(None, vec![call("c1")]));
        conv.add_message(Message::tool_result(ToolResult::success(
            "c1".into(),
            "c".repeat(200),
        )));

        assert_eq!(conv.truncate_to_limit(20), 2);
        assert_eq!(conv.messages()[0].content, "current request");
        assert_eq!(conv.messages()[2].role, Role::Tool);
    }

    #[test]
    fn test_truncate_to_tokens() {
        let mut conv = Conversation::new();
        conv.add_user_message("a".repeat(20));
        conv.add_user_message("b".repeat(20));
        conv.add_user_message("c".repeat(20));

        // 6 tokens ~ 24 chars
        let removed = conv.truncate_to_tokens(6);
        assert_eq!(removed, 2);
        assert_eq!(conv.messages()[0].content, "c".repeat(20).as_str());
    }
}
