use serde::{Deserialize, Serialize};

use super::tool::ToolCall;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A message to or from an LLM, in the chat-completions shape
pub struct Message {
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Only present on assistant messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Only present on tool messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    fn new(role: Role) -> Self {
        Message {
            role,
            content: None,
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Create a new user message
    pub fn user<S: Into<String>>(text: S) -> Self {
        Message::new(Role::User).with_text(text)
    }

    /// Create a new assistant message with the given text
    pub fn assistant<S: Into<String>>(text: S) -> Self {
        Message::new(Role::Assistant).with_text(text)
    }

    /// Create an assistant message with no text, to be filled with tool calls
    pub fn assistant_empty() -> Self {
        Message::new(Role::Assistant)
    }

    /// Create the tool-role message answering the tool call `tool_call_id`
    pub fn tool<I: Into<String>, S: Into<String>>(tool_call_id: I, content: S) -> Self {
        // Content is always present on tool messages, even when empty
        let mut message = Message::new(Role::Tool);
        message.content = Some(content.into());
        message.tool_call_id = Some(tool_call_id.into());
        message
    }

    /// Set the text content, an empty string leaves the content unset
    pub fn with_text<S: Into<String>>(mut self, text: S) -> Self {
        let text = text.into();
        self.content = if text.is_empty() { None } else { Some(text) };
        self
    }

    /// Append a tool call to the message
    pub fn with_tool_call(mut self, tool_call: ToolCall) -> Self {
        self.tool_calls.get_or_insert_with(Vec::new).push(tool_call);
        self
    }

    /// The text content, or an empty string
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }

    /// Tool calls requested by this message, empty for non-assistant messages
    pub fn tool_calls(&self) -> &[ToolCall] {
        self.tool_calls.as_deref().unwrap_or_default()
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls().is_empty()
    }
}
