// Copyright (c) 2026 Elias Bachaalany
// SPDX-License-Identifier: MIT

//! Answer the agent's tool permission prompts over the control channel.
//!
//! This example shows how to:
//! - Route permission prompts to stdio with `--permission-prompt-tool stdio`
//! - Allow reads and deny everything else
//! - Check that every denial shows up in the final result

use agent_stream_protocol::{
    AgentProcess, ControlRequestKind, ControlResponse, HarnessOptions, Message,
};
use std::time::Duration;

#[tokio::main]
async fn main() -> agent_stream_protocol::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let options = HarnessOptions::new()
        .timeout(Duration::from_secs(180))
        .args(["--permission-prompt-tool", "stdio", "--max-turns", "4"]);

    let mut agent = AgentProcess::launch(&options)?;
    let prompt = "Read Cargo.toml, then write a file named notes.txt containing its package name.";
    println!("You: {prompt}\n");
    agent.send_user_text(prompt).await?;

    let mut denied = Vec::new();
    loop {
        let message = agent.next_message().await?;
        match &message {
            Message::ControlRequest(request) => {
                if let ControlRequestKind::CanUseTool { tool_name, input, .. } = request.kind() {
                    let response = if tool_name == "Read" {
                        println!("[allow] {tool_name}");
                        ControlResponse::allow(&request.request_id, input)?
                    } else {
                        println!("[deny]  {tool_name}");
                        denied.push(tool_name.clone());
                        ControlResponse::deny(&request.request_id, "Only reads are allowed here.")?
                    };
                    agent.send_message(&Message::ControlResponse(response)).await?;
                }
            }
            Message::Assistant(reply) => {
                let text = reply.text();
                if !text.is_empty() {
                    println!("Assistant: {text}");
                }
            }
            _ => {}
        }

        if message.is_result() {
            let reported = match &message {
                Message::ResultSuccess(r) => r.permission_denials.len(),
                other => other.as_result_error().map_or(0, |r| r.permission_denials.len()),
            };
            println!("\nDenied {} call(s), result reports {reported}", denied.len());
            break;
        }
    }

    agent.wait().await?;
    Ok(())
}
