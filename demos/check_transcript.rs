// Copyright (c) 2026 Elias Bachaalany
// SPDX-License-Identifier: MIT

//! Decode a recorded stream-json transcript and check its overall shape.
//!
//! Usage: `cargo run --example check_transcript -- path/to/transcript.ndjson`
//!
//! Every line is decoded into a typed message and listed. The transcript is
//! then checked for an init message followed, eventually, by a result.

use agent_stream_protocol::{
    assert_decoded_sequence, decode_lines, expect, Message, Pattern, ProtocolError,
};
use std::env;
use std::fs;

fn describe(message: &Message) -> String {
    match message {
        Message::Assistant(m) => {
            let blocks: Vec<_> = m.message.content.iter().map(|b| b.block_type()).collect();
            format!("assistant [{}]", blocks.join(", "))
        }
        Message::StreamEvent(e) => {
            format!("stream_event {}", e.event_type().unwrap_or("?"))
        }
        Message::ControlRequest(r) => {
            format!("control_request {}", r.subtype().unwrap_or("?"))
        }
        other => match other.subtype() {
            Some(subtype) => format!("{}/{}", other.message_type(), subtype),
            None => other.message_type().to_string(),
        },
    }
}

fn main() -> agent_stream_protocol::Result<()> {
    let Some(path) = env::args().nth(1) else {
        eprintln!("usage: check_transcript <transcript.ndjson>");
        std::process::exit(2);
    };

    let text = fs::read_to_string(&path).map_err(ProtocolError::Transport)?;
    let messages = decode_lines(&text)?;

    println!("=== {} ({} messages) ===\n", path, messages.len());
    for (index, message) in messages.iter().enumerate() {
        println!("{index:>4}  {}", describe(message));
    }

    // Any result subtype ends a well-formed turn.
    let any_result = Pattern::volatile(serde_json::json!({
        "type": "result",
        "subtype": agent_stream_protocol::any_string(),
    }))
    .ignoring([
        "is_error",
        "num_turns",
        "result",
        "permission_denials",
        "errors",
    ]);

    let report = assert_decoded_sequence(&messages, &[expect::system_init(), any_result])?;
    println!("\n{report}");
    report.into_result()
}
