use serde::{Deserialize, Serialize};

use crate::ids::{MessageId, SessionId};

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Assistant,
    User,
    System,
    Tool,
}

/// A snapshot of one message, published every time the agent updates it.
///
/// Text and reasoning parts carry the *accumulated* content of the message so
/// far, not just the newest piece. Consumers that stream to a client must diff
/// successive snapshots themselves.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MessageEvent {
    pub session_id: SessionId,
    pub message_id: MessageId,
    pub role: Role,
    pub parts: Vec<MessagePart>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessagePart {
    Text {
        text: String,
    },
    Reasoning {
        thinking: String,
    },
    ToolCall(ToolCallPart),
    ToolResult(ToolResultPart),
    Image {
        url: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
    Binary {
        path: String,
        mime_type: String,
        data: Vec<u8>,
    },
    Finish {
        reason: FinishReason,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCallPart {
    pub id: String,
    pub name: String,
    /// Raw (possibly still streaming) JSON arguments.
    pub input: String,
    pub finished: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolResultPart {
    pub tool_call_id: String,
    pub name: String,
    pub content: String,
    pub is_error: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    EndTurn,
    MaxTokens,
    ToolUse,
    Canceled,
    Error,
    PermissionDenied,
    Unknown,
}

impl MessageEvent {
    pub fn new(session_id: SessionId, role: Role, parts: Vec<MessagePart>) -> Self {
        Self {
            session_id,
            message_id: MessageId::new(),
            role,
            parts,
        }
    }

    pub fn assistant(session_id: SessionId, parts: Vec<MessagePart>) -> Self {
        Self::new(session_id, Role::Assistant, parts)
    }

    pub fn assistant_text(session_id: SessionId, text: impl Into<String>) -> Self {
        Self::assistant(session_id, vec![MessagePart::text(text)])
    }

    /// Keep the message id when publishing a later snapshot of the same message.
    pub fn with_message_id(mut self, message_id: MessageId) -> Self {
        self.message_id = message_id;
        self
    }

    /// Accumulated text of the first text part, if any.
    pub fn text(&self) -> Option<&str> {
        self.parts.iter().find_map(|p| match p {
            MessagePart::Text { text } => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn reasoning(&self) -> Option<&str> {
        self.parts.iter().find_map(|p| match p {
            MessagePart::Reasoning { thinking } => Some(thinking.as_str()),
            _ => None,
        })
    }

    pub fn is_finished(&self) -> bool {
        self.parts.iter().any(|p| matches!(p, MessagePart::Finish { .. }))
    }
}

impl MessagePart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn reasoning(thinking: impl Into<String>) -> Self {
        Self::Reasoning {
            thinking: thinking.into(),
        }
    }

    pub fn finish(reason: FinishReason) -> Self {
        Self::Finish { reason }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Reasoning { .. } => "reasoning",
            Self::ToolCall(_) => "tool_call",
            Self::ToolResult(_) => "tool_result",
            Self::Image { .. } => "image",
            Self::Binary { .. } => "binary",
            Self::Finish { .. } => "finish",
        }
    }
}
