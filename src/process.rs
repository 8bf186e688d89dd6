// Copyright (c) 2026 Elias Bachaalany
// SPDX-License-Identifier: MIT

//! Launching the agent CLI and collecting its stream output.
//!
//! The CLI runs in print mode with stream-json on both stdin and stdout.
//! [`AgentProcess`] writes user turns and control responses to its stdin and
//! decodes every stdout line into a [`Message`].

use crate::error::{ProtocolError, Result};
use crate::messages::Message;
use crate::transport::{MessageReader, MessageWriter};
use crate::version::CliVersion;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tracing::{debug, warn};

/// Environment variable naming the agent CLI executable.
pub const AGENT_CLI_PATH_ENV: &str = "AGENT_CLI_PATH";

/// Executable name looked up on `PATH` when no override is set.
pub const AGENT_CLI_NAME: &str = "claude";

/// Per-run timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Arguments selecting the stream-json protocol on both pipes.
pub const STREAM_JSON_ARGS: &[&str] = &[
    "-p",
    "--output-format",
    "stream-json",
    "--input-format",
    "stream-json",
    "--verbose",
];

// =============================================================================
// Harness Options
// =============================================================================

/// How to launch the agent CLI for one run.
#[derive(Debug, Clone)]
pub struct HarnessOptions {
    /// Working directory for the CLI (None = inherit from parent).
    pub working_directory: Option<PathBuf>,

    /// Environment variables to set.
    pub environment: HashMap<String, String>,

    /// Whether to inherit the parent's environment variables.
    pub inherit_environment: bool,

    /// Arguments appended after the stream-json arguments.
    pub extra_args: Vec<String>,

    /// Upper bound for a single read, and for a whole collection run.
    pub timeout: Duration,

    /// Explicit executable; [`find_agent_cli`] is used when unset.
    pub executable: Option<PathBuf>,

    /// Ask the CLI for `stream_event` partial messages.
    pub include_partial_messages: bool,

    /// Pipe stderr instead of discarding it.
    pub capture_stderr: bool,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl HarnessOptions {
    pub fn new() -> Self {
        Self {
            working_directory: None,
            environment: HashMap::new(),
            inherit_environment: true,
            extra_args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            executable: None,
            include_partial_messages: false,
            capture_stderr: false,
        }
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    /// Add an environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    pub fn inherit_env(mut self, inherit: bool) -> Self {
        self.inherit_environment = inherit;
        self
    }

    /// Append one CLI argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }

    pub fn include_partial_messages(mut self, include: bool) -> Self {
        self.include_partial_messages = include;
        self
    }

    pub fn capture_stderr(mut self, capture: bool) -> Self {
        self.capture_stderr = capture;
        self
    }

    /// Full argument list passed to the CLI.
    pub fn cli_args(&self) -> Vec<String> {
        let mut args: Vec<String> = STREAM_JSON_ARGS.iter().map(|a| a.to_string()).collect();
        if self.include_partial_messages {
            args.push("--include-partial-messages".to_string());
        }
        args.extend(self.extra_args.iter().cloned());
        args
    }

    /// The configured executable, or the one found by [`find_agent_cli`].
    pub fn resolve_executable(&self) -> Result<PathBuf> {
        if let Some(path) = &self.executable {
            return Ok(path.clone());
        }
        find_agent_cli().ok_or_else(|| {
            ProtocolError::invalid_config(format!(
                "agent CLI not found; set {AGENT_CLI_PATH_ENV} or put `{AGENT_CLI_NAME}` on PATH"
            ))
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(ProtocolError::invalid_config("timeout must be non-zero"));
        }
        if let Some(dir) = &self.working_directory {
            if !dir.is_dir() {
                return Err(ProtocolError::invalid_config(format!(
                    "working directory {} does not exist",
                    dir.display()
                )));
            }
        }
        Ok(())
    }
}

// =============================================================================
// Agent Process
// =============================================================================

/// A running agent CLI speaking the stream-json protocol.
pub struct AgentProcess {
    child: Child,
    writer: Option<MessageWriter<ChildStdin>>,
    reader: MessageReader<ChildStdout>,
    stderr: Option<ChildStderr>,
    timeout: Duration,
}

impl AgentProcess {
    /// Spawn the executable configured in `options` (or found on `PATH`).
    pub fn launch(options: &HarnessOptions) -> Result<Self> {
        let executable = options.resolve_executable()?;
        Self::spawn(executable, options)
    }

    /// Spawn `executable` with the stream-json arguments from `options`.
    pub fn spawn(executable: impl AsRef<Path>, options: &HarnessOptions) -> Result<Self> {
        Self::spawn_with_args(executable, &options.cli_args(), options)
    }

    /// Spawn `executable` with exactly `args`, ignoring the CLI argument
    /// settings in `options`.
    pub fn spawn_with_args(
        executable: impl AsRef<Path>,
        args: &[String],
        options: &HarnessOptions,
    ) -> Result<Self> {
        options.validate()?;
        let executable = executable.as_ref();
        debug!(executable = %executable.display(), ?args, "spawning agent CLI");

        let mut cmd = Command::new(executable);
        cmd.args(args).kill_on_drop(true);

        if let Some(dir) = &options.working_directory {
            cmd.current_dir(dir);
        }

        if !options.inherit_environment {
            cmd.env_clear();
        }
        for (key, value) in &options.environment {
            cmd.env(key, value);
        }

        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(if options.capture_stderr {
            Stdio::piped()
        } else {
            Stdio::null()
        });

        let mut child = cmd.spawn().map_err(ProtocolError::ProcessStart)?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ProtocolError::invalid_config("Failed to capture stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ProtocolError::invalid_config("Failed to capture stdout"))?;
        let stderr = child.stderr.take();

        debug!(pid = ?child.id(), "agent CLI started");
        Ok(Self {
            child,
            writer: Some(MessageWriter::new(stdin)),
            reader: MessageReader::new(stdout),
            stderr,
            timeout: options.timeout,
        })
    }

    /// Write one raw line to the CLI's stdin.
    pub async fn send_line(&mut self, line: &str) -> Result<()> {
        let writer = self.writer.as_mut().ok_or(ProtocolError::ConnectionClosed)?;
        writer.write_line(line).await
    }

    pub async fn send_message(&mut self, message: &Message) -> Result<()> {
        self.send_line(&message.encode()?).await
    }

    /// Send a plain-text user turn.
    pub async fn send_user_text(&mut self, text: impl Into<String>) -> Result<()> {
        self.send_message(&Message::user_text(text)).await
    }

    /// Close stdin so the CLI sees end of input.
    pub fn close_stdin(&mut self) {
        self.writer = None;
    }

    /// Next decoded stdout message, within the configured timeout.
    ///
    /// End of stdout is reported as [`ProtocolError::ProcessExit`] with the
    /// CLI's exit code.
    pub async fn next_message(&mut self) -> Result<Message> {
        let timeout = self.timeout;
        match tokio::time::timeout(timeout, self.read_next()).await {
            Ok(result) => result,
            Err(_) => {
                warn!(?timeout, "timed out waiting for agent CLI output");
                Err(ProtocolError::Timeout(timeout))
            }
        }
    }

    /// Read messages up to and including the first `result` message.
    ///
    /// The whole collection shares one timeout.
    pub async fn collect_until_result(&mut self) -> Result<Vec<Message>> {
        let timeout = self.timeout;
        let mut messages = Vec::new();
        let collected = tokio::time::timeout(timeout, self.collect_into(&mut messages)).await;
        match collected {
            Ok(result) => result.map(|()| messages),
            Err(_) => {
                warn!(
                    ?timeout,
                    collected = messages.len(),
                    "timed out before a result message"
                );
                Err(ProtocolError::Timeout(timeout))
            }
        }
    }

    async fn collect_into(&mut self, messages: &mut Vec<Message>) -> Result<()> {
        loop {
            let message = self.read_next().await?;
            let done = message.is_result();
            messages.push(message);
            if done {
                debug!(count = messages.len(), "result message received");
                return Ok(());
            }
        }
    }

    async fn read_next(&mut self) -> Result<Message> {
        match self.reader.read_message().await {
            Err(ProtocolError::ConnectionClosed) => {
                let status = self.child.wait().await?;
                debug!(code = ?status.code(), "agent CLI closed stdout");
                Err(ProtocolError::ProcessExit(status.code()))
            }
            other => other,
        }
    }

    /// Get the process ID.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Take stderr (can only be called once, and only when captured).
    pub fn take_stderr(&mut self) -> Option<ChildStderr> {
        self.stderr.take()
    }

    /// Close stdin and wait for the CLI to exit, returning its exit code.
    pub async fn wait(&mut self) -> Result<Option<i32>> {
        self.close_stdin();
        let status = self.child.wait().await?;
        debug!(code = ?status.code(), "agent CLI exited");
        Ok(status.code())
    }

    /// Forcefully kill the process.
    pub fn kill(&mut self) -> Result<()> {
        self.child.start_kill().map_err(ProtocolError::Transport)
    }
}

// =============================================================================
// Utility Functions
// =============================================================================

/// Find an executable in the system PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

/// Find the agent CLI: `AGENT_CLI_PATH` first, then `claude` on `PATH`.
pub fn find_agent_cli() -> Option<PathBuf> {
    find_agent_cli_from(std::env::var(AGENT_CLI_PATH_ENV).ok().as_deref())
}

fn find_agent_cli_from(override_path: Option<&str>) -> Option<PathBuf> {
    if let Some(cli_path) = override_path {
        let cli_path = cli_path.trim();
        if !cli_path.is_empty() {
            let path = PathBuf::from(cli_path);
            if path.exists() {
                return Some(path);
            }
            warn!(path = %path.display(), "{AGENT_CLI_PATH_ENV} does not exist, falling back to PATH");
        }
    }

    if let Some(path) = find_executable(AGENT_CLI_NAME) {
        return Some(path);
    }

    #[cfg(windows)]
    {
        if let Some(path) = find_executable("claude.cmd") {
            return Some(path);
        }
        if let Some(path) = find_executable("claude.exe") {
            return Some(path);
        }
    }

    None
}

/// Run `<executable> --version` and parse the reported version.
pub async fn detect_cli_version(executable: impl AsRef<Path>) -> Result<CliVersion> {
    let executable = executable.as_ref();
    let timeout = Duration::from_secs(30);
    let output = tokio::time::timeout(
        timeout,
        Command::new(executable)
            .arg("--version")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output(),
    )
    .await
    .map_err(|_| ProtocolError::Timeout(timeout))?
    .map_err(ProtocolError::ProcessStart)?;

    if !output.status.success() {
        return Err(ProtocolError::ProcessExit(output.status.code()));
    }
    let version = CliVersion::parse(&String::from_utf8_lossy(&output.stdout))?;
    debug!(executable = %executable.display(), %version, "detected agent CLI version");
    Ok(version)
}

static DETECTED_VERSION: OnceLock<CliVersion> = OnceLock::new();

/// [`detect_cli_version`], run once per test process.
///
/// The first successful detection is reused for every later call, whatever
/// executable they name.
pub async fn cached_cli_version(executable: impl AsRef<Path>) -> Result<CliVersion> {
    if let Some(version) = DETECTED_VERSION.get() {
        return Ok(*version);
    }
    let version = detect_cli_version(executable).await?;
    Ok(*DETECTED_VERSION.get_or_init(|| version))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_harness_options_builder() {
        let options = HarnessOptions::new()
            .cwd("/tmp")
            .env("FOO", "bar")
            .inherit_env(false)
            .arg("--model")
            .arg("sonnet")
            .timeout(Duration::from_secs(5))
            .executable("/opt/agent/bin/claude")
            .capture_stderr(true);

        assert_eq!(options.working_directory, Some(PathBuf::from("/tmp")));
        assert_eq!(options.environment.get("FOO"), Some(&"bar".to_string()));
        assert!(!options.inherit_environment);
        assert_eq!(options.timeout, Duration::from_secs(5));
        assert!(options.capture_stderr);
        assert_eq!(
            options.resolve_executable().unwrap(),
            PathBuf::from("/opt/agent/bin/claude")
        );
        assert_eq!(&options.cli_args()[STREAM_JSON_ARGS.len()..], ["--model", "sonnet"]);
    }

    #[test]
    fn test_harness_options_default() {
        let options = HarnessOptions::default();

        assert!(options.working_directory.is_none());
        assert!(options.environment.is_empty());
        assert!(options.inherit_environment);
        assert_eq!(options.timeout, DEFAULT_TIMEOUT);
        assert_eq!(
            options.cli_args(),
            [
                "-p",
                "--output-format",
                "stream-json",
                "--input-format",
                "stream-json",
                "--verbose"
            ]
        );
    }

    #[test]
    fn test_partial_messages_flag() {
        let args = HarnessOptions::new()
            .include_partial_messages(true)
            .arg("--max-turns")
            .arg("1")
            .cli_args();
        assert_eq!(
            &args[STREAM_JSON_ARGS.len()..],
            ["--include-partial-messages", "--max-turns", "1"]
        );
    }

    #[test]
    fn test_validate() {
        assert!(HarnessOptions::new().validate().is_ok());
        assert!(matches!(
            HarnessOptions::new().timeout(Duration::ZERO).validate(),
            Err(ProtocolError::InvalidConfig(_))
        ));
        assert!(matches!(
            HarnessOptions::new()
                .cwd("/definitely/not/a/real/dir")
                .validate(),
            Err(ProtocolError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_agent_cli_override_wins_when_it_exists() {
        let exe = std::env::current_exe().unwrap();
        let padded = format!("  {}  ", exe.display());
        assert_eq!(find_agent_cli_from(Some(&padded)), Some(exe.clone()));

        // A stale override falls back to PATH lookup.
        let missing = "/nonexistent/agent-cli";
        assert_eq!(
            find_agent_cli_from(Some(missing)),
            find_agent_cli_from(None)
        );
        assert_eq!(find_agent_cli_from(Some("   ")), find_agent_cli_from(None));
    }

    #[cfg(unix)]
    fn sh(script: &str, options: &HarnessOptions) -> AgentProcess {
        let args = vec!["-c".to_string(), script.to_string()];
        AgentProcess::spawn_with_args("sh", &args, options).unwrap()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_collect_until_result() {
        let script = r#"
read line
printf '%s\n' '{"type":"system","subtype":"init","session_id":"s","model":"m","permissionMode":"default"}'
printf '%s\n' '{"type":"assistant","message":{"role":"assistant","content":[{"type":"text","text":"Hello!"}]}}'
printf '%s\n' '{"type":"result","subtype":"success","is_error":false,"num_turns":1,"result":"Hello!","session_id":"s"}'
printf '%s\n' '{"type":"system","subtype":"status"}'
"#;
        let mut agent = sh(script, &HarnessOptions::new().timeout(Duration::from_secs(10)));
        agent.send_user_text("Say hello").await.unwrap();

        let messages = agent.collect_until_result().await.unwrap();
        let types: Vec<_> = messages.iter().map(Message::message_type).collect();
        assert_eq!(types, ["system", "assistant", "result"]);
        assert_eq!(messages[1].assistant_text().as_deref(), Some("Hello!"));

        // The trailing line is still readable after the result.
        assert_eq!(agent.next_message().await.unwrap().subtype(), Some("status"));
        assert_eq!(agent.wait().await.unwrap(), Some(0));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_before_result() {
        let mut agent = sh("exit 3", &HarnessOptions::new());
        let err = agent.collect_until_result().await.unwrap_err();
        assert!(matches!(err, ProtocolError::ProcessExit(Some(3))), "{err}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout() {
        let options = HarnessOptions::new().timeout(Duration::from_millis(100));
        let mut agent = sh("sleep 5", &options);
        let err = agent.next_message().await.unwrap_err();
        assert!(matches!(err, ProtocolError::Timeout(_)), "{err}");
        agent.kill().unwrap();
    }

    #[tokio::test]
    async fn test_spawn_missing_executable() {
        let result = AgentProcess::spawn("/definitely/not/an/agent", &HarnessOptions::new());
        assert!(matches!(result, Err(ProtocolError::ProcessStart(_))));
    }
}
