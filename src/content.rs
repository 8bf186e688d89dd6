// Copyright (c) 2026 Elias Bachaalany
// SPDX-License-Identifier: MIT

//! Content blocks carried inside assistant and tool-result messages.
//!
//! Serialization uses the wire `type` tag directly. Decoding from raw JSON
//! should go through [`crate::decoder`], which checks the block type against
//! the context the block appears in.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A text block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub text: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolUseBlock {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub input: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Extended thinking output. Always precedes the blocks it leads to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThinkingBlock {
    pub thinking: String,
    #[serde(default)]
    pub signature: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Result of a tool invocation, sent back on a `user` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResultBlock {
    pub tool_use_id: String,
    /// Either a plain string or an array of nested blocks.
    #[serde(default)]
    pub content: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One entry of a message `content` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text(TextBlock),
    ToolUse(ToolUseBlock),
    Thinking(ThinkingBlock),
    ToolResult(ToolResultBlock),
}

impl ContentBlock {
    /// Wire name of this block's `type`.
    pub fn block_type(&self) -> &'static str {
        match self {
            ContentBlock::Text(_) => "text",
            ContentBlock::ToolUse(_) => "tool_use",
            ContentBlock::Thinking(_) => "thinking",
            ContentBlock::ToolResult(_) => "tool_result",
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text(TextBlock {
            text: text.into(),
            extra: Map::new(),
        })
    }

    pub fn tool_use(
        id: impl Into<String>,
        name: impl Into<String>,
        input: Map<String, Value>,
    ) -> Self {
        ContentBlock::ToolUse(ToolUseBlock {
            id: id.into(),
            name: name.into(),
            input,
            extra: Map::new(),
        })
    }

    pub fn thinking(thinking: impl Into<String>, signature: impl Into<String>) -> Self {
        ContentBlock::Thinking(ThinkingBlock {
            thinking: thinking.into(),
            signature: signature.into(),
            extra: Map::new(),
        })
    }

    pub fn tool_result(tool_use_id: impl Into<String>, content: impl Into<Value>) -> Self {
        ContentBlock::ToolResult(ToolResultBlock {
            tool_use_id: tool_use_id.into(),
            content: content.into(),
            is_error: None,
            extra: Map::new(),
        })
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text(block) => Some(&block.text),
            _ => None,
        }
    }

    pub fn as_tool_use(&self) -> Option<&ToolUseBlock> {
        match self {
            ContentBlock::ToolUse(block) => Some(block),
            _ => None,
        }
    }

    pub fn as_tool_result(&self) -> Option<&ToolResultBlock> {
        match self {
            ContentBlock::ToolResult(block) => Some(block),
            _ => None,
        }
    }
}
