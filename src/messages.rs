// Copyright (c) 2026 Elias Bachaalany
// SPDX-License-Identifier: MIT

//! Protocol messages exchanged with the agent CLI.
//!
//! Every line the agent writes to stdout is one JSON object with a `type`
//! discriminant and, for `system` and `result`, a `subtype`. Variant records
//! here do not store the discriminants themselves: [`Message`] owns them and
//! writes them back on encode. Fields that no variant names are kept in each
//! record's `extra` map, so nothing the agent sends is lost.

use crate::content::{ContentBlock, ToolUseBlock};
use crate::control::{ControlRequest, ControlResponse};
use crate::error::Result;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

fn default_assistant_role() -> String {
    "assistant".to_string()
}

fn default_user_role() -> String {
    "user".to_string()
}

// =============================================================================
// System
// =============================================================================

/// `system/init`: session bootstrap information.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemInit {
    pub cwd: String,
    pub session_id: String,
    pub tools: Vec<String>,
    pub mcp_servers: Vec<Value>,
    pub model: String,
    #[serde(rename = "permissionMode")]
    pub permission_mode: String,
    pub slash_commands: Vec<String>,
    #[serde(rename = "apiKeySource", skip_serializing_if = "Option::is_none")]
    pub api_key_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claude_code_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_style: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub agents: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub plugins: Vec<Value>,
    /// Only emitted by CLI versions that know about fast mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fast_mode_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `system/status`: out-of-band session state change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(rename = "permissionMode", skip_serializing_if = "Option::is_none")]
    pub permission_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// =============================================================================
// Assistant
// =============================================================================

/// The upstream message body wrapped by an `assistant` line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default = "default_assistant_role")]
    pub role: String,
    /// Blocks in the order they were produced.
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_sequence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for AssistantBody {
    fn default() -> Self {
        Self {
            id: None,
            model: None,
            role: default_assistant_role(),
            content: Vec::new(),
            stop_reason: None,
            stop_sequence: None,
            usage: None,
            extra: Map::new(),
        }
    }
}

/// `assistant`: one group of content blocks from a model turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantMessage {
    pub message: AssistantBody,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_tool_use_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AssistantMessage {
    /// Build an assistant message from content blocks.
    pub fn from_blocks(content: Vec<ContentBlock>) -> Self {
        Self {
            message: AssistantBody {
                content,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Concatenated text of all text blocks.
    pub fn text(&self) -> String {
        self.message
            .content
            .iter()
            .filter_map(ContentBlock::as_text)
            .collect()
    }

    pub fn tool_uses(&self) -> impl Iterator<Item = &ToolUseBlock> {
        self.message.content.iter().filter_map(ContentBlock::as_tool_use)
    }
}

// =============================================================================
// User
// =============================================================================

/// Body of a user text message. `content` is the raw input string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserTextBody {
    #[serde(default = "default_user_role")]
    pub role: String,
    /// Empty when the line carried no content or `null`.
    #[serde(default)]
    pub content: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `user` whose `message.content` is a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserTextMessage {
    pub message: UserTextBody,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_tool_use_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserTextMessage {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            message: UserTextBody {
                role: default_user_role(),
                content: content.into(),
                extra: Map::new(),
            },
            parent_tool_use_id: None,
            session_id: None,
            uuid: None,
            extra: Map::new(),
        }
    }
}

/// Body of a tool-result message: an array of `tool_result` blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserToolResultBody {
    #[serde(default = "default_user_role")]
    pub role: String,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `user` whose `message.content` is an array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserToolResultMessage {
    pub message: UserToolResultBody,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_tool_use_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    /// Tool-specific structured result, shape depends on the tool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_use_result: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of a replayed user message. The content is echoed back as received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserReplayBody {
    #[serde(default = "default_user_role")]
    pub role: String,
    #[serde(default)]
    pub content: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `user` with `isReplay: true`: the agent echoing an input it received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserReplayMessage {
    #[serde(rename = "isReplay")]
    pub is_replay: bool,
    pub message: UserReplayBody,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_tool_use_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// =============================================================================
// Result
// =============================================================================

/// A tool call the permission layer refused during the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionDenial {
    pub tool_name: String,
    pub tool_use_id: String,
    #[serde(default)]
    pub tool_input: Value,
}

/// `result/success`: final outcome of a completed run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultSuccess {
    /// Set for runs that finished but were truncated.
    pub is_error: bool,
    pub duration_ms: u64,
    pub duration_api_ms: u64,
    pub num_turns: u32,
    pub result: String,
    pub session_id: String,
    pub total_cost_usd: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Value>,
    #[serde(rename = "modelUsage", skip_serializing_if = "Option::is_none")]
    pub model_usage: Option<Value>,
    pub permission_denials: Vec<PermissionDenial>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body shared by `result/error_during_execution` and `result/error_max_turns`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultError {
    pub is_error: bool,
    pub duration_ms: u64,
    pub duration_api_ms: u64,
    pub num_turns: u32,
    pub session_id: String,
    pub total_cost_usd: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Value>,
    #[serde(rename = "modelUsage", skip_serializing_if = "Option::is_none")]
    pub model_usage: Option<Value>,
    pub permission_denials: Vec<PermissionDenial>,
    /// Upstream error strings. Empty or partial for max-turns.
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// =============================================================================
// Stream event
// =============================================================================

/// `stream_event`: a raw upstream streaming event, passed through untouched.
///
/// Only emitted when partial-message streaming is requested. See
/// [`crate::upstream`] for the typed view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamEvent {
    pub event: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_tool_use_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StreamEvent {
    /// The upstream event name, e.g. `content_block_delta`.
    pub fn event_type(&self) -> Option<&str> {
        self.event.get("type").and_then(Value::as_str)
    }
}

// =============================================================================
// Message (discriminated union)
// =============================================================================

/// One line of protocol traffic.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    SystemInit(SystemInit),
    SystemStatus(SystemStatus),
    Assistant(AssistantMessage),
    UserText(UserTextMessage),
    UserToolResult(UserToolResultMessage),
    UserReplay(UserReplayMessage),
    ResultSuccess(ResultSuccess),
    ResultErrorDuringExecution(ResultError),
    ResultErrorMaxTurns(ResultError),
    StreamEvent(StreamEvent),
    ControlRequest(ControlRequest),
    ControlResponse(ControlResponse),
}

impl Message {
    /// A plain-text user turn, as written to the agent's stdin.
    pub fn user_text(content: impl Into<String>) -> Self {
        Message::UserText(UserTextMessage::new(content))
    }

    /// Wire `type` of this variant.
    pub fn message_type(&self) -> &'static str {
        match self {
            Message::SystemInit(_) | Message::SystemStatus(_) => "system",
            Message::Assistant(_) => "assistant",
            Message::UserText(_) | Message::UserToolResult(_) | Message::UserReplay(_) => "user",
            Message::ResultSuccess(_)
            | Message::ResultErrorDuringExecution(_)
            | Message::ResultErrorMaxTurns(_) => "result",
            Message::StreamEvent(_) => "stream_event",
            Message::ControlRequest(_) => "control_request",
            Message::ControlResponse(_) => "control_response",
        }
    }

    /// Wire `subtype`, for the types that carry one at the top level.
    pub fn subtype(&self) -> Option<&'static str> {
        match self {
            Message::SystemInit(_) => Some("init"),
            Message::SystemStatus(_) => Some("status"),
            Message::ResultSuccess(_) => Some("success"),
            Message::ResultErrorDuringExecution(_) => Some("error_during_execution"),
            Message::ResultErrorMaxTurns(_) => Some("error_max_turns"),
            _ => None,
        }
    }

    pub fn is_result(&self) -> bool {
        self.message_type() == "result"
    }

    pub fn session_id(&self) -> Option<&str> {
        match self {
            Message::SystemInit(m) => Some(&m.session_id),
            Message::SystemStatus(m) => m.session_id.as_deref(),
            Message::Assistant(m) => m.session_id.as_deref(),
            Message::UserText(m) => m.session_id.as_deref(),
            Message::UserToolResult(m) => m.session_id.as_deref(),
            Message::UserReplay(m) => m.session_id.as_deref(),
            Message::ResultSuccess(m) => Some(&m.session_id),
            Message::ResultErrorDuringExecution(m) | Message::ResultErrorMaxTurns(m) => {
                Some(&m.session_id)
            }
            Message::StreamEvent(m) => m.session_id.as_deref(),
            Message::ControlRequest(_) | Message::ControlResponse(_) => None,
        }
    }

    pub fn as_assistant(&self) -> Option<&AssistantMessage> {
        match self {
            Message::Assistant(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_result_success(&self) -> Option<&ResultSuccess> {
        match self {
            Message::ResultSuccess(m) => Some(m),
            _ => None,
        }
    }

    /// Error body for either error result subtype.
    pub fn as_result_error(&self) -> Option<&ResultError> {
        match self {
            Message::ResultErrorDuringExecution(m) | Message::ResultErrorMaxTurns(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_control_request(&self) -> Option<&ControlRequest> {
        match self {
            Message::ControlRequest(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_stream_event(&self) -> Option<&StreamEvent> {
        match self {
            Message::StreamEvent(m) => Some(m),
            _ => None,
        }
    }

    /// Text of an assistant message, if this is one.
    pub fn assistant_text(&self) -> Option<String> {
        self.as_assistant().map(AssistantMessage::text)
    }

    /// JSON value of this message as it appears on the wire.
    pub fn to_value(&self) -> Result<Value> {
        let body = match self {
            Message::SystemInit(m) => serde_json::to_value(m)?,
            Message::SystemStatus(m) => serde_json::to_value(m)?,
            Message::Assistant(m) => serde_json::to_value(m)?,
            Message::UserText(m) => serde_json::to_value(m)?,
            Message::UserToolResult(m) => serde_json::to_value(m)?,
            Message::UserReplay(m) => serde_json::to_value(m)?,
            Message::ResultSuccess(m) => serde_json::to_value(m)?,
            Message::ResultErrorDuringExecution(m) | Message::ResultErrorMaxTurns(m) => {
                serde_json::to_value(m)?
            }
            Message::StreamEvent(m) => serde_json::to_value(m)?,
            Message::ControlRequest(m) => serde_json::to_value(m)?,
            Message::ControlResponse(m) => serde_json::to_value(m)?,
        };

        let mut object = match body {
            Value::Object(object) => object,
            _ => Map::new(),
        };
        object.insert("type".into(), Value::String(self.message_type().into()));
        if let Some(subtype) = self.subtype() {
            object.insert("subtype".into(), Value::String(subtype.into()));
        }
        Ok(Value::Object(object))
    }

    /// Encode as one protocol line, without the trailing newline.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_value()?)?)
    }
}

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_value()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Message {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        crate::decoder::decode_value(value).map_err(serde::de::Error::custom)
    }
}
