// Copyright (c) 2026 Elias Bachaalany
// SPDX-License-Identifier: MIT

//! Upstream streaming events carried by `stream_event` messages.
//!
//! The simulated completion API frames each response as
//! `message_start`, then per block `content_block_start` /
//! `content_block_delta`* / `content_block_stop`, then `message_delta` and
//! `message_stop`. An `error` event may replace any of these.

use crate::error::{ProtocolError, Result};
use crate::messages::StreamEvent;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Incremental update inside a `content_block_delta`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Delta {
    TextDelta { text: String },
    InputJsonDelta { partial_json: String },
    ThinkingDelta { thinking: String },
    SignatureDelta { signature: String },
}

/// Error payload of an `error` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamError {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
}

/// One upstream streaming event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UpstreamEvent {
    MessageStart {
        message: Map<String, Value>,
    },
    ContentBlockStart {
        index: u32,
        content_block: Map<String, Value>,
    },
    ContentBlockDelta {
        index: u32,
        delta: Delta,
    },
    ContentBlockStop {
        index: u32,
    },
    MessageDelta {
        delta: Map<String, Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        usage: Option<Value>,
    },
    MessageStop,
    Ping,
    Error {
        error: UpstreamError,
    },
}

impl UpstreamEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            UpstreamEvent::MessageStart { .. } => "message_start",
            UpstreamEvent::ContentBlockStart { .. } => "content_block_start",
            UpstreamEvent::ContentBlockDelta { .. } => "content_block_delta",
            UpstreamEvent::ContentBlockStop { .. } => "content_block_stop",
            UpstreamEvent::MessageDelta { .. } => "message_delta",
            UpstreamEvent::MessageStop => "message_stop",
            UpstreamEvent::Ping => "ping",
            UpstreamEvent::Error { .. } => "error",
        }
    }

    /// Text carried by a text delta.
    pub fn text_delta(&self) -> Option<&str> {
        match self {
            UpstreamEvent::ContentBlockDelta {
                delta: Delta::TextDelta { text },
                ..
            } => Some(text),
            _ => None,
        }
    }
}

impl StreamEvent {
    /// Typed view of the wrapped event. The stored payload is left untouched.
    pub fn upstream(&self) -> Result<UpstreamEvent> {
        serde_json::from_value(Value::Object(self.event.clone()))
            .map_err(|e| ProtocolError::decode("stream event payload", e))
    }
}

/// Concatenate the text deltas of a sequence of stream events.
pub fn collect_text<'a>(events: impl IntoIterator<Item = &'a StreamEvent>) -> String {
    events
        .into_iter()
        .filter_map(|e| e.upstream().ok())
        .filter_map(|e| e.text_delta().map(str::to_string))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stream_event(event: Value) -> StreamEvent {
        StreamEvent {
            event: event.as_object().cloned().unwrap_or_default(),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_text_delta() {
        let event = stream_event(json!({
            "type": "content_block_delta",
            "index": 0,
            "delta": {"type": "text_delta", "text": "Hel"}
        }));
        let upstream = event.upstream().unwrap();
        assert_eq!(upstream.event_type(), "content_block_delta");
        assert_eq!(upstream.text_delta(), Some("Hel"));
        assert_eq!(event.event_type(), Some("content_block_delta"));
    }

    #[test]
    fn test_parse_message_stop_and_error() {
        let stop = stream_event(json!({"type": "message_stop"}));
        assert_eq!(stop.upstream().unwrap(), UpstreamEvent::MessageStop);

        let err = stream_event(json!({
            "type": "error",
            "error": {"type": "overloaded_error", "message": "Overloaded"}
        }));
        match err.upstream().unwrap() {
            UpstreamEvent::Error { error } => {
                assert_eq!(error.error_type, "overloaded_error");
                assert_eq!(error.message, "Overloaded");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_event_is_a_decode_error() {
        let event = stream_event(json!({"type": "future_event"}));
        let err = event.upstream().unwrap_err();
        assert!(err.is_decode_error());
    }

    #[test]
    fn test_collect_text_skips_non_text_events() {
        let events = vec![
            stream_event(json!({"type": "message_start", "message": {"id": "msg_1"}})),
            stream_event(json!({
                "type": "content_block_start",
                "index": 0,
                "content_block": {"type": "text", "text": ""}
            })),
            stream_event(json!({
                "type": "content_block_delta",
                "index": 0,
                "delta": {"type": "text_delta", "text": "Hello"}
            })),
            stream_event(json!({
                "type": "content_block_delta",
                "index": 0,
                "delta": {"type": "text_delta", "text": "!"}
            })),
            stream_event(json!({"type": "content_block_stop", "index": 0})),
        ];
        assert_eq!(collect_text(&events), "Hello!");
    }
}
