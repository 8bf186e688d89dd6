// Copyright (c) 2026 Elias Bachaalany
// SPDX-License-Identifier: MIT

#![forbid(unsafe_code)]

//! # Agent stream protocol
//!
//! Typed messages and conformance checking for the line-delimited JSON
//! protocol an agent CLI speaks in stream-json mode.
//!
//! - [`decoder`] turns each stdout line into a [`Message`].
//! - [`Pattern`]s describe expected messages, with [`sentinel`] wildcards and
//!   ignored field paths.
//! - [`assert_sequence`] finds the expected patterns, in order, in what the
//!   agent actually wrote.
//!
//! ## Quick Start
//!
//! ```no_run
//! use agent_stream_protocol::{expect, AgentProcess, HarnessOptions};
//!
//! #[tokio::main]
//! async fn main() -> agent_stream_protocol::Result<()> {
//!     let mut agent = AgentProcess::launch(&HarnessOptions::new())?;
//!     agent.send_user_text("Say hello").await?;
//!     let observed = agent.collect_until_result().await?;
//!
//!     agent_stream_protocol::assert_decoded_sequence(
//!         &observed,
//!         &[
//!             expect::system_init(),
//!             expect::assistant_text("Hello!"),
//!             expect::result_success("Hello!"),
//!         ],
//!     )?
//!     .into_result()?;
//!
//!     agent.wait().await?;
//!     Ok(())
//! }
//! ```

pub mod content;
pub mod control;
pub mod decoder;
pub mod error;
pub mod expect;
pub mod matcher;
pub mod messages;
pub mod pattern;
pub mod process;
pub mod runner;
pub mod sentinel;
pub mod transport;
pub mod upstream;
pub mod version;

// Re-export main types at crate root for convenience
pub use error::{ProtocolError, Result};

pub use content::{ContentBlock, TextBlock, ThinkingBlock, ToolResultBlock, ToolUseBlock};

pub use messages::{
    AssistantBody, AssistantMessage, Message, PermissionDenial, ResultError, ResultSuccess,
    StreamEvent, SystemInit, SystemStatus, UserReplayBody, UserReplayMessage, UserTextBody,
    UserTextMessage, UserToolResultBody, UserToolResultMessage,
};

pub use control::{
    ControlRequest, ControlRequestKind, ControlResponse, ControlResponseKind, PermissionDecision,
};

pub use upstream::{Delta, UpstreamError, UpstreamEvent};

pub use decoder::{decode, decode_lines, decode_str, decode_value, BlockContext};

pub use sentinel::{
    any_array, any_number, any_object, any_string, SentinelKind, Slot, Wildcard,
};

pub use pattern::{IgnoreSet, Pattern, VOLATILE_PATHS};

pub use matcher::{explain_mismatch, matches, matches_with, Mismatch};

pub use runner::{
    assert_decoded_sequence, assert_sequence, ConformanceFailure, ConformanceReport,
    NearestCandidate,
};

pub use version::{CliVersion, FieldGate, VersionGates};

pub use transport::{MessageReader, MessageWriter};

pub use process::{
    cached_cli_version, detect_cli_version, find_agent_cli, find_executable, AgentProcess,
    HarnessOptions,
};
