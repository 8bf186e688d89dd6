// Copyright (c) 2026 Elias Bachaalany
// SPDX-License-Identifier: MIT

//! Agent CLI versions and version-gated pattern fields.
//!
//! Some fields only appear from a given CLI release onward. Test code
//! declares those fields as [`FieldGate`]s and lets [`VersionGates::apply`]
//! relax a pattern for older CLIs. Matching and decoding never look at
//! versions.

use crate::error::{ProtocolError, Result};
use crate::pattern::Pattern;
use std::fmt;
use std::str::FromStr;

/// A `major.minor.patch` CLI release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CliVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl CliVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse the output of `<cli> --version`, e.g. `2.0.14 (Claude Code)`.
    ///
    /// The first whitespace-separated token that starts with a digit is taken
    /// as the version; a leading `v` and any `-prerelease` or `+build` suffix
    /// are dropped. Missing minor or patch components default to zero.
    pub fn parse(output: &str) -> Result<Self> {
        let token = output
            .split_whitespace()
            .map(|t| t.trim_start_matches('v'))
            .find(|t| t.starts_with(|c: char| c.is_ascii_digit()))
            .ok_or_else(|| unrecognized(output))?;
        let core = token.split(['-', '+']).next().unwrap_or(token);

        let mut parts = core.split('.').map(str::parse::<u32>);
        let mut next = || parts.next().transpose().map_err(|_| unrecognized(output));
        let major = next()?.ok_or_else(|| unrecognized(output))?;
        let minor = next()?.unwrap_or(0);
        let patch = next()?.unwrap_or(0);
        Ok(Self::new(major, minor, patch))
    }
}

fn unrecognized(output: &str) -> ProtocolError {
    ProtocolError::invalid_config(format!("Unrecognized CLI version output: {output:?}"))
}

impl FromStr for CliVersion {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for CliVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// A pattern path that the CLI only emits from `since` onward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldGate {
    pub path: String,
    pub since: CliVersion,
}

impl FieldGate {
    pub fn new(path: impl Into<String>, since: CliVersion) -> Self {
        Self {
            path: path.into(),
            since,
        }
    }
}

/// First release that reports `fast_mode_state` in `system/init`.
pub const FAST_MODE_STATE_SINCE: CliVersion = CliVersion::new(2, 1, 0);

/// A table of version-gated fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionGates {
    gates: Vec<FieldGate>,
}

impl VersionGates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gates for fields known to be version dependent.
    pub fn defaults() -> Self {
        Self::new().gate("fast_mode_state", FAST_MODE_STATE_SINCE)
    }

    /// Add a gate for `path`.
    pub fn gate(mut self, path: impl Into<String>, since: CliVersion) -> Self {
        self.gates.push(FieldGate::new(path, since));
        self
    }

    pub fn gates(&self) -> &[FieldGate] {
        &self.gates
    }

    /// Whether a CLI at `version` emits `path`. Ungated paths always are.
    pub fn includes(&self, path: &str, version: &CliVersion) -> bool {
        self.gates
            .iter()
            .filter(|gate| gate.path == path)
            .all(|gate| *version >= gate.since)
    }

    /// `pattern` with every gated path that `version` predates ignored.
    pub fn apply(&self, pattern: &Pattern, version: &CliVersion) -> Pattern {
        let absent: Vec<&str> = self
            .gates
            .iter()
            .filter(|gate| *version < gate.since)
            .map(|gate| gate.path.as_str())
            .collect();
        if absent.is_empty() {
            return pattern.clone();
        }
        tracing::debug!(%version, ?absent, "relaxing version-gated fields");
        pattern.ignoring(absent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_cli_output() {
        assert_eq!(
            CliVersion::parse("2.0.14 (Claude Code)").unwrap(),
            CliVersion::new(2, 0, 14)
        );
        assert_eq!(
            CliVersion::parse("v1.2.3-beta.1\n").unwrap(),
            CliVersion::new(1, 2, 3)
        );
        assert_eq!(CliVersion::parse("agent 3").unwrap(), CliVersion::new(3, 0, 0));
        assert_eq!("2.1.0".parse::<CliVersion>().unwrap().to_string(), "2.1.0");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for output in ["", "Claude Code", "2.x.1"] {
            let err = CliVersion::parse(output).unwrap_err();
            assert!(matches!(err, ProtocolError::InvalidConfig(_)), "{output:?}");
        }
    }

    #[test]
    fn test_versions_order_numerically() {
        assert!(CliVersion::new(2, 0, 9) < CliVersion::new(2, 0, 10));
        assert!(CliVersion::new(1, 99, 99) < CliVersion::new(2, 0, 0));
    }

    #[test]
    fn test_includes() {
        let gates = VersionGates::defaults();
        assert!(!gates.includes("fast_mode_state", &CliVersion::new(2, 0, 14)));
        assert!(gates.includes("fast_mode_state", &FAST_MODE_STATE_SINCE));
        assert!(gates.includes("model", &CliVersion::new(0, 0, 1)));
    }

    #[test]
    fn test_apply_relaxes_gated_fields_for_older_versions() {
        let pattern = Pattern::new(json!({
            "type": "system",
            "subtype": "init",
            "fast_mode_state": "off"
        }));
        let gates = VersionGates::defaults();

        let old = gates.apply(&pattern, &CliVersion::new(2, 0, 14));
        assert!(old.matches(&json!({"type": "system", "subtype": "init"})));

        let new = gates.apply(&pattern, &CliVersion::new(2, 1, 3));
        assert_eq!(new, pattern);
        assert!(!new.matches(&json!({"type": "system", "subtype": "init"})));
    }
}
