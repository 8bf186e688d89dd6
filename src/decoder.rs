// Copyright (c) 2026 Elias Bachaalany
// SPDX-License-Identifier: MIT

//! Decoding protocol lines into typed [`Message`] values.
//!
//! Decoding is two-stage. A head record reads only the discriminants needed
//! to pick a variant; the chosen variant then decodes the full object. The
//! `user` type has no subtype and is told apart by shape: an `isReplay` flag
//! first, then whether `message.content` is an array.

use crate::content::ContentBlock;
use crate::control::{ControlRequest, ControlResponse};
use crate::error::{ProtocolError, Result};
use crate::messages::{
    AssistantMessage, Message, ResultError, ResultSuccess, StreamEvent, SystemInit, SystemStatus,
    UserReplayMessage, UserTextMessage, UserToolResultMessage,
};
use serde::de::{DeserializeOwned, Error as _};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::trace;

/// Common envelope fields used to select the dispatch branch.
#[derive(Debug, Deserialize)]
struct EnvelopeHead {
    #[serde(rename = "type")]
    message_type: Option<String>,
    #[serde(default)]
    subtype: Option<Value>,
}

/// The two structural signals that separate the `user` sub-variants.
#[derive(Debug, Default, Deserialize)]
struct UserHead {
    #[serde(rename = "isReplay", default)]
    is_replay: Option<Value>,
    #[serde(default)]
    message: Option<UserBodyHead>,
}

#[derive(Debug, Default, Deserialize)]
struct UserBodyHead {
    /// `None` when absent, `Some(Value::Null)` for an explicit `null`.
    #[serde(default, deserialize_with = "present")]
    content: Option<Value>,
}

fn present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Where a content block appears, which decides the block types allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockContext {
    /// `assistant.message.content`: text, tool_use and thinking.
    Assistant,
    /// `user.message.content` arrays: tool_result only.
    ToolResult,
}

impl BlockContext {
    fn name(self) -> &'static str {
        match self {
            BlockContext::Assistant => "assistant content",
            BlockContext::ToolResult => "user tool_result content",
        }
    }

    fn allows(self, block_type: &str) -> bool {
        match self {
            BlockContext::Assistant => matches!(block_type, "text" | "tool_use" | "thinking"),
            BlockContext::ToolResult => block_type == "tool_result",
        }
    }
}

/// Decode one protocol line from raw bytes.
pub fn decode(bytes: &[u8]) -> Result<Message> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| ProtocolError::malformed(format!("invalid JSON: {e}")))?;
    decode_value(value)
}

/// Decode one protocol line.
pub fn decode_str(line: &str) -> Result<Message> {
    decode(line.as_bytes())
}

/// Decode every non-blank line of a newline-delimited stream.
pub fn decode_lines(text: &str) -> Result<Vec<Message>> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(decode_str)
        .collect()
}

/// Decode an already-parsed JSON value.
pub fn decode_value(value: Value) -> Result<Message> {
    let Value::Object(mut object) = value else {
        return Err(ProtocolError::malformed("expected a JSON object"));
    };

    let head = EnvelopeHead::deserialize(&Value::Object(object.clone()))
        .map_err(|e| ProtocolError::malformed(format!("unreadable envelope: {e}")))?;
    let message_type = head
        .message_type
        .ok_or_else(|| ProtocolError::malformed("missing \"type\" field"))?;
    let subtype = head.subtype.as_ref().and_then(Value::as_str).map(str::to_string);

    trace!(message_type = %message_type, subtype = ?subtype, "decoding message");

    object.remove("type");
    match message_type.as_str() {
        "system" => {
            object.remove("subtype");
            match subtype.as_deref() {
                Some("init") => body::<SystemInit>(object, "system/init").map(Message::SystemInit),
                Some("status") => {
                    body::<SystemStatus>(object, "system/status").map(Message::SystemStatus)
                }
                _ => Err(unknown_subtype(&message_type, subtype)),
            }
        }
        "assistant" => decode_assistant(object).map(Message::Assistant),
        "user" => decode_user(object),
        "result" => {
            object.remove("subtype");
            match subtype.as_deref() {
                Some("success") => {
                    body::<ResultSuccess>(object, "result/success").map(Message::ResultSuccess)
                }
                Some("error_during_execution") => {
                    body::<ResultError>(object, "result/error_during_execution")
                        .map(Message::ResultErrorDuringExecution)
                }
                Some("error_max_turns") => body::<ResultError>(object, "result/error_max_turns")
                    .map(Message::ResultErrorMaxTurns),
                _ => Err(unknown_subtype(&message_type, subtype)),
            }
        }
        "stream_event" => body::<StreamEvent>(object, "stream_event").map(Message::StreamEvent),
        "control_request" => {
            body::<ControlRequest>(object, "control_request").map(Message::ControlRequest)
        }
        "control_response" => {
            body::<ControlResponse>(object, "control_response").map(Message::ControlResponse)
        }
        other => Err(ProtocolError::malformed(format!(
            "unrecognized message type {other:?}"
        ))),
    }
}

/// Decode one content block, checking its type against `context`.
pub fn decode_block(value: Value, context: BlockContext) -> Result<ContentBlock> {
    let block_type = value.get("type").and_then(Value::as_str).map(str::to_string);
    match block_type {
        Some(ref t) if context.allows(t) => serde_json::from_value(value)
            .map_err(|e| ProtocolError::decode("content block", e)),
        _ => Err(ProtocolError::UnknownBlockType {
            context: context.name(),
            block_type,
        }),
    }
}

/// Decode a block array in encounter order.
pub fn decode_blocks(values: Vec<Value>, context: BlockContext) -> Result<Vec<ContentBlock>> {
    values
        .into_iter()
        .map(|value| decode_block(value, context))
        .collect()
}

fn body<T: DeserializeOwned>(object: Map<String, Value>, stage: &'static str) -> Result<T> {
    serde_json::from_value(Value::Object(object)).map_err(|e| ProtocolError::decode(stage, e))
}

fn unknown_subtype(message_type: &str, subtype: Option<String>) -> ProtocolError {
    ProtocolError::UnknownSubtype {
        message_type: message_type.to_string(),
        subtype,
    }
}

/// Pull `message.content` out as an array so block dispatch can run on it.
fn take_content_array(
    object: &mut Map<String, Value>,
    stage: &'static str,
) -> Result<Option<Vec<Value>>> {
    let Some(Value::Object(message)) = object.get_mut("message") else {
        return Ok(None);
    };
    match message.remove("content") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => Ok(Some(items)),
        Some(other) => Err(ProtocolError::decode(
            stage,
            serde_json::Error::custom(format!("expected content array, found {other}")),
        )),
    }
}

fn decode_assistant(mut object: Map<String, Value>) -> Result<AssistantMessage> {
    let content = take_content_array(&mut object, "assistant content")?;
    let mut message: AssistantMessage = body(object, "assistant")?;
    if let Some(items) = content {
        message.message.content = decode_blocks(items, BlockContext::Assistant)?;
    }
    Ok(message)
}

fn decode_user(mut object: Map<String, Value>) -> Result<Message> {
    let head = UserHead::deserialize(&Value::Object(object.clone()))
        .map_err(|e| ProtocolError::decode("user envelope", e))?;

    if head.is_replay.as_ref().and_then(Value::as_bool) == Some(true) {
        trace!("user message is a replay");
        return body::<UserReplayMessage>(object, "user replay").map(Message::UserReplay);
    }
    // A present-but-false flag is dropped so it doesn't land in `extra`.
    object.remove("isReplay");

    let content = head.message.and_then(|m| m.content);
    match content {
        Some(Value::Array(_)) => {
            let items = take_content_array(&mut object, "user tool_result content")?
                .unwrap_or_default();
            let mut message: UserToolResultMessage = body(object, "user tool_result")?;
            message.message.content = decode_blocks(items, BlockContext::ToolResult)?;
            Ok(Message::UserToolResult(message))
        }
        Some(Value::String(_)) | None => {
            body::<UserTextMessage>(object, "user text").map(Message::UserText)
        }
        Some(Value::Null) => {
            // Null content is an empty turn.
            if let Some(Value::Object(message)) = object.get_mut("message") {
                message.remove("content");
            }
            body::<UserTextMessage>(object, "user text").map(Message::UserText)
        }
        Some(other) => {
            // Anything else is kept as opaque text.
            if let Some(Value::Object(message)) = object.get_mut("message") {
                message.insert("content".into(), Value::String(other.to_string()));
            }
            body::<UserTextMessage>(object, "user text").map(Message::UserText)
        }
    }
}
