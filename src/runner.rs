// Copyright (c) 2026 Elias Bachaalany
// SPDX-License-Identifier: MIT

//! Ordered conformance runs.
//!
//! [`assert_sequence`] looks for each expected pattern, in order, in the
//! observed message stream. A single forward-only cursor is kept: observed
//! messages that match nothing are skipped, and once a pattern consumes a
//! message nothing before it is looked at again. Every unmet pattern is
//! reported, not just the first.

use crate::error::{ProtocolError, Result};
use crate::matcher::Mismatch;
use crate::messages::Message;
use crate::pattern::Pattern;
use serde_json::Value;
use std::fmt;
use tracing::debug;

/// The observed message closest to an unmet pattern, for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct NearestCandidate {
    pub observed_index: usize,
    pub observed: Value,
    pub mismatch: Mismatch,
}

/// One expected pattern that was not found.
#[derive(Debug, Clone, PartialEq)]
pub struct ConformanceFailure {
    /// Position of the pattern in the expected sequence.
    pub expected_index: usize,
    /// Cursor position the search started from.
    pub search_start: usize,
    pub pattern: Pattern,
    pub nearest: Option<NearestCandidate>,
}

/// Outcome of one conformance run.
#[derive(Debug, Clone, PartialEq)]
pub struct ConformanceReport {
    pub failures: Vec<ConformanceFailure>,
    pub observed_len: usize,
    pub expected_len: usize,
}

impl ConformanceReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// `Ok(())` on success, otherwise the report wrapped in an error.
    pub fn into_result(self) -> Result<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(ProtocolError::Conformance(self))
        }
    }
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_success() {
            return write!(
                f,
                "all {} expected patterns found in {} observed messages",
                self.expected_len, self.observed_len
            );
        }
        writeln!(
            f,
            "{} of {} expected patterns not found in {} observed messages",
            self.failures.len(),
            self.expected_len,
            self.observed_len
        )?;
        for failure in &self.failures {
            writeln!(
                f,
                "- expected[{}] not found at or after observed[{}]: {}",
                failure.expected_index, failure.search_start, failure.pattern
            )?;
            if let Some(nearest) = &failure.nearest {
                writeln!(
                    f,
                    "    nearest observed[{}] {}: {}",
                    nearest.observed_index, nearest.observed, nearest.mismatch
                )?;
            }
        }
        Ok(())
    }
}

/// Locate each pattern of `expected`, in order, within `observed`.
pub fn assert_sequence(observed: &[Value], expected: &[Pattern]) -> ConformanceReport {
    let mut cursor = 0;
    let mut failures = Vec::new();

    for (expected_index, pattern) in expected.iter().enumerate() {
        let ignore = pattern.ignore_set();
        let found = observed[cursor..]
            .iter()
            .position(|value| crate::matcher::matches_with(value, pattern.expected(), &ignore));

        match found {
            Some(offset) => {
                debug!(
                    expected_index,
                    observed_index = cursor + offset,
                    "expected pattern matched"
                );
                cursor += offset + 1;
            }
            None => {
                debug!(expected_index, search_start = cursor, "expected pattern not found");
                failures.push(ConformanceFailure {
                    expected_index,
                    search_start: cursor,
                    pattern: pattern.clone(),
                    nearest: nearest_candidate(observed, cursor, pattern),
                });
            }
        }
    }

    ConformanceReport {
        failures,
        observed_len: observed.len(),
        expected_len: expected.len(),
    }
}

/// [`assert_sequence`] over decoded messages.
pub fn assert_decoded_sequence(
    observed: &[Message],
    expected: &[Pattern],
) -> Result<ConformanceReport> {
    let values = observed
        .iter()
        .map(Message::to_value)
        .collect::<Result<Vec<_>>>()?;
    Ok(assert_sequence(&values, expected))
}

/// First message from `start` with the pattern's `type`, or just the first
/// message from `start` when the pattern pins no type.
fn nearest_candidate(
    observed: &[Value],
    start: usize,
    pattern: &Pattern,
) -> Option<NearestCandidate> {
    let wanted = pattern.message_type();
    let (offset, value) = observed[start..].iter().enumerate().find(|(_, value)| {
        wanted.is_none() || value.get("type").and_then(Value::as_str) == wanted
    })?;
    let mismatch = pattern.explain(value)?;
    Some(NearestCandidate {
        observed_index: start + offset,
        observed: value.clone(),
        mismatch,
    })
}
