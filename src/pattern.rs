// Copyright (c) 2026 Elias Bachaalany
// SPDX-License-Identifier: MIT

//! Expected-message patterns.
//!
//! A [`Pattern`] is an expected JSON value plus a set of dot-delimited field
//! paths to leave out of the comparison. A `*` segment stands for exactly one
//! object key or array index. Paths passed to [`Pattern::asserting`] are
//! compared even when an ignore path covers them.

use crate::error::{ProtocolError, Result};
use crate::matcher::{self, Mismatch};
use crate::messages::Message;
use crate::sentinel::Wildcard;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

/// Fields whose value changes from run to run or across CLI versions.
/// [`Pattern::volatile`] ignores these unless a test asserts them.
pub const VOLATILE_PATHS: &[&str] = &[
    "uuid",
    "session_id",
    "cwd",
    "tools",
    "mcp_servers",
    "slash_commands",
    "agents",
    "skills",
    "plugins",
    "apiKeySource",
    "claude_code_version",
    "output_style",
    "fast_mode_state",
    "duration_ms",
    "duration_api_ms",
    "total_cost_usd",
    "usage",
    "modelUsage",
    "tool_use_result",
    "message.id",
    "message.type",
    "message.model",
    "message.usage",
    "message.stop_reason",
    "message.content.*.id",
    "message.content.*.signature",
    "message.content.*.tool_use_id",
];

/// Resolved set of ignored paths, with asserted paths taking precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreSet {
    ignored: Vec<Vec<String>>,
    asserted: Vec<Vec<String>>,
}

fn split_path(path: &str) -> Vec<String> {
    path.split('.').map(str::to_string).collect()
}

fn segment_matches(pattern: &str, segment: &str) -> bool {
    pattern == "*" || pattern == segment
}

/// Whether `pattern` names `path` itself or one of its ancestors.
fn covers(pattern: &[String], path: &[String]) -> bool {
    pattern.len() <= path.len()
        && pattern
            .iter()
            .zip(path)
            .all(|(p, segment)| segment_matches(p, segment))
}

/// Whether `pattern` names a strict descendant of `path`.
fn lies_below(pattern: &[String], path: &[String]) -> bool {
    pattern.len() > path.len()
        && pattern
            .iter()
            .zip(path)
            .all(|(p, segment)| segment_matches(p, segment))
}

impl IgnoreSet {
    pub fn new<'a>(
        ignored: impl IntoIterator<Item = &'a str>,
        asserted: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        Self {
            ignored: ignored.into_iter().map(split_path).collect(),
            asserted: asserted.into_iter().map(split_path).collect(),
        }
    }

    /// Whether the field at `path` (one segment per key or index) is exempt.
    ///
    /// An ignore entry exempts its whole subtree; an asserted entry brings
    /// its whole subtree back, whatever ignore entry covers it.
    pub fn contains(&self, path: &[String]) -> bool {
        self.ignored.iter().any(|p| covers(p, path))
            && !self.asserted.iter().any(|p| covers(p, path))
    }

    /// Whether an asserted path sits strictly below `path`.
    pub fn asserts_below(&self, path: &[String]) -> bool {
        self.asserted.iter().any(|p| lies_below(p, path))
    }

    /// Whether comparison can stop at `path`: it is exempt and nothing
    /// underneath it is asserted.
    pub fn skips(&self, path: &[String]) -> bool {
        self.contains(path) && !self.asserts_below(path)
    }
}

/// An expected message plus the paths exempt from comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    expected: Value,
    ignored: BTreeSet<String>,
    asserted: BTreeSet<String>,
}

impl Pattern {
    /// A pattern that compares every field of `expected`.
    pub fn new(expected: Value) -> Self {
        Self {
            expected,
            ignored: BTreeSet::new(),
            asserted: BTreeSet::new(),
        }
    }

    /// A pattern that ignores [`VOLATILE_PATHS`].
    pub fn volatile(expected: Value) -> Self {
        Self::new(expected).ignoring(VOLATILE_PATHS.iter().copied())
    }

    /// Parse a pattern from a JSON literal.
    pub fn parse(literal: &str) -> Result<Self> {
        serde_json::from_str(literal)
            .map(Self::new)
            .map_err(|e| ProtocolError::PatternInvalid(e.to_string()))
    }

    /// A pattern matching exactly what `message` encodes to.
    pub fn from_message(message: &Message) -> Result<Self> {
        Ok(Self::new(message.to_value()?))
    }

    /// A copy of this pattern with `paths` added to the ignore set.
    pub fn ignoring<I, S>(&self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut next = self.clone();
        next.ignored.extend(paths.into_iter().map(Into::into));
        next
    }

    /// A copy of this pattern that compares `paths` even if ignored.
    pub fn asserting<I, S>(&self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut next = self.clone();
        next.asserted.extend(paths.into_iter().map(Into::into));
        next
    }

    pub fn expected(&self) -> &Value {
        &self.expected
    }

    /// Expected `type` discriminant, when the pattern pins one.
    ///
    /// A wildcard or ignored `type` pins nothing.
    pub fn message_type(&self) -> Option<&str> {
        let message_type = self.expected.get("type")?;
        if Wildcard::recognize(message_type).is_some() || self.is_ignored("type") {
            return None;
        }
        message_type.as_str()
    }

    /// Ignore paths after removing the asserted ones.
    pub fn ignored_paths(&self) -> impl Iterator<Item = &str> {
        self.ignored
            .iter()
            .filter(|p| !self.asserted.contains(*p))
            .map(String::as_str)
    }

    pub fn asserted_paths(&self) -> impl Iterator<Item = &str> {
        self.asserted.iter().map(String::as_str)
    }

    /// Whether the dot-delimited `path` is exempt from comparison.
    pub fn is_ignored(&self, path: &str) -> bool {
        self.ignore_set().contains(&split_path(path))
    }

    pub fn ignore_set(&self) -> IgnoreSet {
        IgnoreSet::new(
            self.ignored.iter().map(String::as_str),
            self.asserted.iter().map(String::as_str),
        )
    }

    pub fn matches(&self, actual: &Value) -> bool {
        matcher::matches_with(actual, &self.expected, &self.ignore_set())
    }

    /// First divergence between `actual` and this pattern, if any.
    pub fn explain(&self, actual: &Value) -> Option<Mismatch> {
        matcher::explain_mismatch(actual, &self.expected, &self.ignore_set())
    }
}

impl From<Value> for Pattern {
    fn from(expected: Value) -> Self {
        Self::new(expected)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expected)?;
        let ignored: Vec<_> = self.ignored_paths().collect();
        if !ignored.is_empty() {
            write!(f, " ignoring [{}]", ignored.join(", "))?;
        }
        Ok(())
    }
}
