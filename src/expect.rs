// Copyright (c) 2026 Elias Bachaalany
// SPDX-License-Identifier: MIT

//! Ready-made expected-message patterns.
//!
//! Each builder returns a [`Pattern::volatile`] pattern: run-dependent fields
//! (ids, timings, costs, session metadata) are ignored, and fields the agent
//! always emits but scenarios rarely care about are filled with wildcards.
//! Narrow a pattern further with [`Pattern::asserting`].

use crate::pattern::Pattern;
use crate::sentinel::{any_array, any_number, any_object, any_string};
use serde_json::{json, Value};

/// `system/init`, any session.
pub fn system_init() -> Pattern {
    Pattern::volatile(json!({
        "type": "system",
        "subtype": "init",
        "model": any_string(),
        "permissionMode": any_string(),
    }))
}

/// `system/status` reporting a permission mode change.
pub fn system_status(permission_mode: &str) -> Pattern {
    Pattern::volatile(json!({
        "type": "system",
        "subtype": "status",
        "permissionMode": permission_mode,
    }))
    .ignoring(["status"])
}

fn assistant(content: Vec<Value>) -> Pattern {
    Pattern::volatile(json!({
        "type": "assistant",
        "message": {
            "role": "assistant",
            "content": content,
        },
    }))
}

/// `assistant` carrying exactly one text block.
pub fn assistant_text(text: &str) -> Pattern {
    assistant(vec![json!({"type": "text", "text": text})])
}

/// `assistant` carrying exactly one tool call.
pub fn assistant_tool_use(name: &str, input: Value) -> Pattern {
    assistant(vec![json!({
        "type": "tool_use",
        "id": any_string(),
        "name": name,
        "input": input,
    })])
}

/// `assistant` carrying exactly one thinking block, any content.
pub fn assistant_thinking() -> Pattern {
    assistant(vec![json!({
        "type": "thinking",
        "thinking": any_string(),
        "signature": any_string(),
    })])
}

/// `user` carrying the result of tool call `tool_use_id`.
pub fn user_tool_result(tool_use_id: &str) -> Pattern {
    Pattern::volatile(json!({
        "type": "user",
        "message": {
            "role": "user",
            "content": [{
                "type": "tool_result",
                "tool_use_id": tool_use_id,
                "content": any_string(),
            }],
        },
    }))
    .ignoring(["message.content.*.is_error"])
    .asserting(["message.content.0.tool_use_id"])
}

fn result(subtype: &str, fields: Value) -> Pattern {
    let mut expected = json!({
        "type": "result",
        "subtype": subtype,
        "num_turns": any_number(),
        "permission_denials": any_array(),
    });
    if let (Some(target), Value::Object(extra)) = (expected.as_object_mut(), fields) {
        target.extend(extra);
    }
    Pattern::volatile(expected)
}

/// `result/success` with the given final text.
pub fn result_success(text: &str) -> Pattern {
    result("success", json!({"is_error": false, "result": text}))
}

/// `result/error_during_execution`, any upstream error list.
pub fn result_error_during_execution() -> Pattern {
    result(
        "error_during_execution",
        json!({"is_error": true, "errors": any_array()}),
    )
}

/// `result/error_max_turns`.
pub fn result_error_max_turns() -> Pattern {
    result(
        "error_max_turns",
        json!({"is_error": true, "errors": any_array()}),
    )
}

/// A `can_use_tool` permission prompt for `tool_name`.
pub fn control_can_use_tool(tool_name: &str) -> Pattern {
    Pattern::volatile(json!({
        "type": "control_request",
        "request_id": any_string(),
        "request": {
            "subtype": "can_use_tool",
            "tool_name": tool_name,
            "input": any_object(),
        },
    }))
    .ignoring([
        "request.tool_use_id",
        "request.permission_suggestions",
        "request.blocked_path",
        "request.decision_reason",
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assistant_text_matches_real_line() {
        let observed = json!({
            "type": "assistant",
            "message": {
                "id": "msg_01",
                "type": "message",
                "role": "assistant",
                "model": "claude-sonnet-4-5",
                "content": [{"type": "text", "text": "Hello!"}],
                "stop_reason": null,
                "stop_sequence": null,
                "usage": {"input_tokens": 3, "output_tokens": 2}
            },
            "parent_tool_use_id": null,
            "session_id": "3f1c",
            "uuid": "9a2b"
        });
        assert!(assistant_text("Hello!").matches(&observed));
        assert!(!assistant_text("Goodbye!").matches(&observed));
    }

    #[test]
    fn test_tool_use_id_is_pinned_on_results() {
        let observed = json!({
            "type": "user",
            "message": {
                "role": "user",
                "content": [{"type": "tool_result", "tool_use_id": "toolu_1", "content": "ok"}]
            },
            "session_id": "s"
        });
        assert!(user_tool_result("toolu_1").matches(&observed));
        assert!(!user_tool_result("toolu_2").matches(&observed));
    }

    #[test]
    fn test_result_success_pattern() {
        let observed = json!({
            "type": "result",
            "subtype": "success",
            "is_error": false,
            "duration_ms": 10,
            "duration_api_ms": 8,
            "num_turns": 1,
            "result": "Hello!",
            "session_id": "s",
            "total_cost_usd": 0.001,
            "usage": {},
            "modelUsage": {},
            "permission_denials": [],
            "uuid": "u"
        });
        assert!(result_success("Hello!").matches(&observed));
        assert!(!result_error_during_execution().matches(&observed));
    }

    #[test]
    fn test_can_use_tool_pattern_accepts_minimal_request() {
        let observed = json!({
            "type": "control_request",
            "request_id": "req_7",
            "request": {"subtype": "can_use_tool", "tool_name": "Bash", "input": {"command": "ls"}, "tool_use_id": "toolu_3", "permission_suggestions": [], "blocked_path": "/tmp"}
        });
        assert!(control_can_use_tool("Bash").matches(&observed));
        assert!(!control_can_use_tool("Write").matches(&observed));
    }
}
