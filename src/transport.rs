// Copyright (c) 2026 Elias Bachaalany
// SPDX-License-Identifier: MIT

//! Line-delimited JSON framing over async byte streams.
//!
//! Each protocol message is one JSON object followed by `\n`. Readers accept
//! `\r\n` and skip blank lines.

use crate::decoder;
use crate::error::{ProtocolError, Result};
use crate::messages::Message;
use std::io;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::trace;

/// Reads protocol lines from an async byte stream.
///
/// Bytes of a partly read line stay buffered across calls, so a read that
/// is dropped (for example by a timeout) resumes where it stopped.
pub struct MessageReader<R> {
    reader: BufReader<R>,
    buffer: Vec<u8>,
    lines_read: usize,
}

impl<R> MessageReader<R>
where
    R: AsyncRead + Unpin + Send,
{
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            buffer: Vec::new(),
            lines_read: 0,
        }
    }

    /// Read the next non-blank line, without its line terminator.
    ///
    /// Returns [`ProtocolError::ConnectionClosed`] at end of stream. A final
    /// line with no trailing newline is still returned.
    pub async fn read_line(&mut self) -> Result<String> {
        loop {
            let bytes_read = self.reader.read_until(b'\n', &mut self.buffer).await?;
            if bytes_read == 0 && self.buffer.is_empty() {
                return Err(ProtocolError::ConnectionClosed);
            }

            let raw = std::mem::take(&mut self.buffer);
            let text =
                String::from_utf8(raw).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            let line = text.trim_end_matches(['\n', '\r']);
            if line.trim().is_empty() {
                continue;
            }
            self.lines_read += 1;
            trace!(line_number = self.lines_read, len = line.len(), "line received");
            return Ok(line.to_string());
        }
    }

    /// Read and decode the next message.
    pub async fn read_message(&mut self) -> Result<Message> {
        let line = self.read_line().await?;
        decoder::decode_str(&line)
    }

    /// Number of non-blank lines returned so far.
    pub fn lines_read(&self) -> usize {
        self.lines_read
    }

    pub fn into_inner(self) -> R {
        self.reader.into_inner()
    }
}

/// Writes protocol lines to an async byte stream.
pub struct MessageWriter<W> {
    writer: W,
}

impl<W> MessageWriter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write `line` followed by `\n`.
    ///
    /// The line must not itself contain a newline; JSON encoders never
    /// produce one outside of string escapes.
    pub async fn write_line(&mut self, line: &str) -> Result<()> {
        if line.contains('\n') {
            return Err(ProtocolError::invalid_config(
                "protocol lines cannot contain a newline",
            ));
        }
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        // Flush may fail on Windows with pipes, but data is still written.
        let _ = self.writer.flush().await;
        Ok(())
    }

    /// Encode `message` and write it as one line.
    pub async fn write_message(&mut self, message: &Message) -> Result<()> {
        let line = message.encode()?;
        self.write_line(&line).await
    }

    /// Close the write side so the peer observes end of input.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.writer.shutdown().await?;
        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::ControlResponse;

    #[tokio::test]
    async fn test_read_lines() {
        let data: &[u8] = b"{\"a\":1}\n{\"b\":2}\n";
        let mut reader = MessageReader::new(data);

        assert_eq!(reader.read_line().await.unwrap(), "{\"a\":1}");
        assert_eq!(reader.read_line().await.unwrap(), "{\"b\":2}");
        assert!(matches!(
            reader.read_line().await,
            Err(ProtocolError::ConnectionClosed)
        ));
        assert_eq!(reader.lines_read(), 2);
    }

    #[tokio::test]
    async fn test_read_line_crlf_and_blank_lines() {
        let data: &[u8] = b"\r\n\n{\"a\":1}\r\n   \n{\"b\":2}";
        let mut reader = MessageReader::new(data);

        assert_eq!(reader.read_line().await.unwrap(), "{\"a\":1}");
        // Final line without a trailing newline.
        assert_eq!(reader.read_line().await.unwrap(), "{\"b\":2}");
        assert!(matches!(
            reader.read_line().await,
            Err(ProtocolError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_read_line_resumes_after_timeout() {
        let (mut client, server) = tokio::io::duplex(1024);
        let mut reader = MessageReader::new(server);

        client.write_all(b"{\"type\":").await.unwrap();
        let timed_out =
            tokio::time::timeout(std::time::Duration::from_millis(50), reader.read_line()).await;
        assert!(timed_out.is_err());

        client.write_all(b"\"system\"}\n").await.unwrap();
        assert_eq!(reader.read_line().await.unwrap(), "{\"type\":\"system\"}");
        assert_eq!(reader.lines_read(), 1);
    }

    #[tokio::test]
    async fn test_read_line_rejects_invalid_utf8() {
        let data: &[u8] = b"\xff\xfe\n";
        let mut reader = MessageReader::new(data);
        assert!(matches!(
            reader.read_line().await,
            Err(ProtocolError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn test_read_message_decodes() {
        let data: &[u8] = b"{\"type\":\"system\",\"subtype\":\"status\",\"permissionMode\":\"plan\"}\n";
        let mut reader = MessageReader::new(data);

        let msg = reader.read_message().await.unwrap();
        assert_eq!(msg.message_type(), "system");
        assert_eq!(msg.subtype(), Some("status"));
    }

    #[tokio::test]
    async fn test_read_message_surfaces_decode_errors() {
        let data: &[u8] = b"not json\n";
        let mut reader = MessageReader::new(data);

        let err = reader.read_message().await.unwrap_err();
        assert!(err.is_decode_error(), "{err}");
    }

    #[tokio::test]
    async fn test_write_message() {
        let mut writer = MessageWriter::new(Vec::new());
        writer
            .write_message(&Message::user_text("Say hello"))
            .await
            .unwrap();
        writer.write_line("{}").await.unwrap();

        let written = String::from_utf8(writer.into_inner()).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "{}");
        let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(value["type"], "user");
        assert_eq!(value["message"]["content"], "Say hello");
    }

    #[tokio::test]
    async fn test_write_line_rejects_embedded_newline() {
        let mut writer = MessageWriter::new(Vec::new());
        let result = writer.write_line("{}\n{}").await;
        assert!(matches!(result, Err(ProtocolError::InvalidConfig(_))));
        assert!(writer.get_ref().is_empty());
    }

    #[tokio::test]
    async fn test_duplex_round_trip() {
        let (client, server) = tokio::io::duplex(1024);
        let mut writer = MessageWriter::new(client);
        let mut reader = MessageReader::new(server);

        let sent = Message::ControlResponse(ControlResponse::deny("req_1", "not allowed").unwrap());
        writer.write_message(&sent).await.unwrap();
        writer.shutdown().await.unwrap();

        assert_eq!(reader.read_message().await.unwrap(), sent);
        assert!(matches!(
            reader.read_message().await,
            Err(ProtocolError::ConnectionClosed)
        ));
    }
}
