//! Turn domain types.
//!
//! A turn is one message unit in a conversation: the user's prompt, the
//! decision model's output (text or tool-call requests), or a tool result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role of a turn's author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The decision model
    Model,
    /// Tool execution result
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::User => "user",
            Role::Model => "model",
            Role::Tool => "tool",
        };
        f.write_str(s)
    }
}

/// A single turn in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Unique turn ID
    pub id: String,

    /// Who produced this turn
    pub role: Role,

    /// The text content
    pub content: String,

    /// Tool calls requested by the model (if any), in request order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<TurnToolCall>,

    /// If this is a tool result, which tool call it answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a new user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    /// Create a model turn carrying final text.
    pub fn model(content: impl Into<String>) -> Self {
        Self::with_role(Role::Model, content)
    }

    /// Create a model turn requesting tool calls.
    pub fn model_tool_calls(content: impl Into<String>, tool_calls: Vec<TurnToolCall>) -> Self {
        let mut turn = Self::with_role(Role::Model, content);
        turn.tool_calls = tool_calls;
        turn
    }

    /// Create a tool result turn.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        let mut turn = Self::with_role(Role::Tool, content);
        turn.tool_call_id = Some(tool_call_id.into());
        turn
    }

    /// Whether this turn is a model turn requesting tools.
    pub fn is_tool_call(&self) -> bool {
        self.role == Role::Model && !self.tool_calls.is_empty()
    }
}

/// A tool call embedded in a model turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnToolCall {
    /// Unique ID for this tool call
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Arguments as JSON string
    pub arguments: String,
}
