// Copyright (c) 2026 Elias Bachaalany
// SPDX-License-Identifier: MIT

//! Error types for the stream protocol crate.

use crate::runner::ConformanceReport;
use std::time::Duration;
use thiserror::Error;

/// Main error type for decoding, pattern construction and process I/O.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Bytes are not a JSON object, or carry no usable `type` field.
    #[error("Malformed envelope: {reason}")]
    MalformedEnvelope { reason: String },

    /// A known `type` carried a `subtype` outside the known variant set.
    #[error("Unknown subtype {subtype:?} for message type {message_type:?}")]
    UnknownSubtype {
        message_type: String,
        subtype: Option<String>,
    },

    /// A content block carried a `type` not allowed in its context.
    #[error("Unknown content block type {block_type:?} in {context}")]
    UnknownBlockType {
        context: &'static str,
        block_type: Option<String>,
    },

    /// The discriminants resolved but the variant body did not decode.
    #[error("Failed to decode {stage}: {source}")]
    Decode {
        stage: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A pattern literal is not valid JSON.
    #[error("Invalid pattern: {0}")]
    PatternInvalid(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Transport/IO error
    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// The stream ended before the expected message arrived.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Reading from the agent process timed out
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// Failed to start the agent process
    #[error("Failed to start agent CLI: {0}")]
    ProcessStart(std::io::Error),

    /// Agent process exited unexpectedly
    #[error("Agent CLI exited unexpectedly with code {0:?}")]
    ProcessExit(Option<i32>),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// One or more expected patterns were not found in the observed stream.
    #[error("{0}")]
    Conformance(ConformanceReport),
}

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, ProtocolError>;

impl ProtocolError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedEnvelope {
            reason: reason.into(),
        }
    }

    pub(crate) fn decode(stage: &'static str, source: serde_json::Error) -> Self {
        Self::Decode { stage, source }
    }

    /// Create an invalid config error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Returns true if this error came out of message decoding.
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            ProtocolError::MalformedEnvelope { .. }
                | ProtocolError::UnknownSubtype { .. }
                | ProtocolError::UnknownBlockType { .. }
                | ProtocolError::Decode { .. }
        )
    }
}
