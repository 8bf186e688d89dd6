// Copyright (c) 2026 Elias Bachaalany
// SPDX-License-Identifier: MIT

//! Control channel messages.
//!
//! `control_request` and `control_response` travel in both directions, keyed
//! by `request_id`. Their payloads are open-ended and stored as JSON maps;
//! [`ControlRequest::kind`] and [`ControlResponse::kind`] give typed views for
//! the subtypes this crate understands and leave the rest opaque.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A control request, either from the agent (permission prompts) or to it
/// (configuration changes).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlRequest {
    pub request_id: String,
    pub request: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A control response. The `response` map carries `subtype`, `request_id`
/// and the subtype-specific payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlResponse {
    pub response: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Typed view of a [`ControlRequest`] payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlRequestKind {
    /// The agent asks whether a tool call may proceed.
    CanUseTool {
        tool_name: String,
        input: Value,
        tool_use_id: Option<String>,
        permission_suggestions: Vec<Value>,
        blocked_path: Option<String>,
        decision_reason: Option<String>,
    },
    SetPermissionMode {
        mode: String,
    },
    /// `None` resets to the default model.
    SetModel {
        model: Option<String>,
    },
    Interrupt,
    Other {
        subtype: Option<String>,
    },
}

/// Typed view of a [`ControlResponse`] payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlResponseKind {
    Success {
        request_id: String,
        response: Option<Value>,
    },
    Error {
        request_id: String,
        error: String,
    },
    Other {
        subtype: Option<String>,
    },
}

/// Answer to a `can_use_tool` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "behavior", rename_all = "lowercase")]
pub enum PermissionDecision {
    Allow {
        #[serde(rename = "updatedInput")]
        updated_input: Value,
    },
    Deny {
        message: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        interrupt: bool,
    },
}

fn str_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_string)
}

impl ControlRequest {
    /// Build a request with the given subtype and extra payload fields.
    pub fn new(
        request_id: impl Into<String>,
        subtype: impl Into<String>,
        fields: Map<String, Value>,
    ) -> Self {
        let mut request = Map::new();
        request.insert("subtype".into(), Value::String(subtype.into()));
        request.extend(fields);
        Self {
            request_id: request_id.into(),
            request,
            extra: Map::new(),
        }
    }

    pub fn set_permission_mode(request_id: impl Into<String>, mode: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert("mode".into(), Value::String(mode.into()));
        Self::new(request_id, "set_permission_mode", fields)
    }

    pub fn set_model(request_id: impl Into<String>, model: Option<String>) -> Self {
        let mut fields = Map::new();
        fields.insert("model".into(), model.map(Value::String).unwrap_or(Value::Null));
        Self::new(request_id, "set_model", fields)
    }

    pub fn interrupt(request_id: impl Into<String>) -> Self {
        Self::new(request_id, "interrupt", Map::new())
    }

    pub fn subtype(&self) -> Option<&str> {
        self.request.get("subtype").and_then(Value::as_str)
    }

    pub fn kind(&self) -> ControlRequestKind {
        let req = &self.request;
        match self.subtype() {
            Some("can_use_tool") => ControlRequestKind::CanUseTool {
                tool_name: str_field(req, "tool_name").unwrap_or_default(),
                input: req.get("input").cloned().unwrap_or(Value::Null),
                tool_use_id: str_field(req, "tool_use_id"),
                permission_suggestions: req
                    .get("permission_suggestions")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default(),
                blocked_path: str_field(req, "blocked_path"),
                decision_reason: str_field(req, "decision_reason"),
            },
            Some("set_permission_mode") => ControlRequestKind::SetPermissionMode {
                mode: str_field(req, "mode").unwrap_or_default(),
            },
            Some("set_model") => ControlRequestKind::SetModel {
                model: str_field(req, "model"),
            },
            Some("interrupt") => ControlRequestKind::Interrupt,
            other => ControlRequestKind::Other {
                subtype: other.map(str::to_string),
            },
        }
    }
}

impl ControlResponse {
    fn with_field(subtype: &str, request_id: String, key: &str, value: Value) -> Self {
        let mut response = Map::new();
        response.insert("subtype".into(), Value::String(subtype.into()));
        response.insert("request_id".into(), Value::String(request_id));
        response.insert(key.into(), value);
        Self {
            response,
            extra: Map::new(),
        }
    }

    /// A success response carrying `payload`.
    pub fn success(request_id: impl Into<String>, payload: Value) -> Self {
        Self::with_field("success", request_id.into(), "response", payload)
    }

    pub fn error(request_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self::with_field("error", request_id.into(), "error", Value::String(error.into()))
    }

    /// Answer a `can_use_tool` request.
    pub fn decision(request_id: impl Into<String>, decision: &PermissionDecision) -> Result<Self> {
        let payload = serde_json::to_value(decision)?;
        Ok(Self::success(request_id, payload))
    }

    /// Allow the tool call, optionally with rewritten input.
    pub fn allow(request_id: impl Into<String>, updated_input: Value) -> Result<Self> {
        Self::decision(request_id, &PermissionDecision::Allow { updated_input })
    }

    pub fn deny(request_id: impl Into<String>, message: impl Into<String>) -> Result<Self> {
        Self::decision(
            request_id,
            &PermissionDecision::Deny {
                message: message.into(),
                interrupt: false,
            },
        )
    }

    pub fn request_id(&self) -> Option<&str> {
        self.response.get("request_id").and_then(Value::as_str)
    }

    pub fn kind(&self) -> ControlResponseKind {
        let resp = &self.response;
        let request_id = str_field(resp, "request_id").unwrap_or_default();
        match resp.get("subtype").and_then(Value::as_str) {
            Some("success") => ControlResponseKind::Success {
                request_id,
                response: resp.get("response").cloned(),
            },
            Some("error") => ControlResponseKind::Error {
                request_id,
                error: str_field(resp, "error").unwrap_or_default(),
            },
            other => ControlResponseKind::Other {
                subtype: other.map(str::to_string),
            },
        }
    }

    /// The permission decision carried by a success response, if any.
    pub fn permission_decision(&self) -> Option<PermissionDecision> {
        match self.kind() {
            ControlResponseKind::Success {
                response: Some(payload),
                ..
            } => serde_json::from_value(payload).ok(),
            _ => None,
        }
    }
}
