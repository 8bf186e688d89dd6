// Copyright (c) 2026 Elias Bachaalany
// SPDX-License-Identifier: MIT

//! Structural matching of observed JSON against expected patterns.
//!
//! The relation is driven by the expected side and is deliberately not
//! equality:
//! - an ignored path matches whatever the observed value is, type included,
//!   unless a path below it is asserted, in which case comparison descends
//!   to the asserted field and skips its ignored siblings;
//! - wildcards (see [`crate::sentinel`]) match any value of their kind;
//! - objects need every expected key present and matching, and tolerate
//!   extra observed keys only when their value is `null`;
//! - arrays need the same length and element-wise matches;
//! - numbers compare by numeric value, so `1` matches `1.0`.

use crate::pattern::IgnoreSet;
use crate::sentinel::Wildcard;
use serde_json::{Number, Value};
use std::fmt;

/// Where and why an observed value diverges from the expected one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    /// Dot-delimited path of the divergent field; empty at the root.
    pub path: String,
    pub reason: String,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "<root>: {}", self.reason)
        } else {
            write!(f, "{}: {}", self.path, self.reason)
        }
    }
}

/// Whether `actual` satisfies `expected`, comparing every path.
pub fn matches(actual: &Value, expected: &Value) -> bool {
    matches_with(actual, expected, &IgnoreSet::default())
}

/// Whether `actual` satisfies `expected`, skipping paths in `ignore`.
pub fn matches_with(actual: &Value, expected: &Value, ignore: &IgnoreSet) -> bool {
    explain_mismatch(actual, expected, ignore).is_none()
}

/// The first divergence between `actual` and `expected`, in expected-key
/// order, or `None` when they match.
pub fn explain_mismatch(actual: &Value, expected: &Value, ignore: &IgnoreSet) -> Option<Mismatch> {
    let mut path = Vec::new();
    compare(actual, expected, ignore, &mut path)
}

fn compare(
    actual: &Value,
    expected: &Value,
    ignore: &IgnoreSet,
    path: &mut Vec<String>,
) -> Option<Mismatch> {
    if !path.is_empty() && ignore.skips(path) {
        return None;
    }

    if let Some(wildcard) = Wildcard::recognize(expected) {
        if wildcard.accepts(actual) {
            return None;
        }
        return Some(mismatch(
            path,
            format!(
                "expected {}, found {}",
                wildcard_name(wildcard),
                json_type_name(actual)
            ),
        ));
    }

    match expected {
        Value::Object(expected_obj) => {
            let Some(actual_obj) = actual.as_object() else {
                return Some(type_mismatch(path, expected, actual));
            };

            for (key, expected_value) in expected_obj {
                path.push(key.clone());
                let result = match actual_obj.get(key) {
                    Some(actual_value) => compare(actual_value, expected_value, ignore, path),
                    None if ignore.skips(path) => None,
                    None => Some(mismatch(path, "missing field".to_string())),
                };
                path.pop();
                if result.is_some() {
                    return result;
                }
            }

            for (key, actual_value) in actual_obj {
                if expected_obj.contains_key(key) || actual_value.is_null() {
                    continue;
                }
                path.push(key.clone());
                let result = if ignore.skips(path) {
                    None
                } else {
                    Some(mismatch(
                        path,
                        format!("unexpected field with value {actual_value}"),
                    ))
                };
                path.pop();
                if result.is_some() {
                    return result;
                }
            }
            None
        }
        Value::Array(expected_items) => {
            let Some(actual_items) = actual.as_array() else {
                return Some(type_mismatch(path, expected, actual));
            };
            if actual_items.len() != expected_items.len() {
                return Some(mismatch(
                    path,
                    format!(
                        "expected {} elements, found {}",
                        expected_items.len(),
                        actual_items.len()
                    ),
                ));
            }
            for (index, (actual_item, expected_item)) in
                actual_items.iter().zip(expected_items).enumerate()
            {
                path.push(index.to_string());
                let result = compare(actual_item, expected_item, ignore, path);
                path.pop();
                if result.is_some() {
                    return result;
                }
            }
            None
        }
        Value::Number(expected_num) => match actual {
            Value::Number(actual_num) if numbers_equal(expected_num, actual_num) => None,
            _ => Some(mismatch(path, format!("expected {expected}, found {actual}"))),
        },
        _ => {
            if actual == expected {
                None
            } else {
                Some(mismatch(path, format!("expected {expected}, found {actual}")))
            }
        }
    }
}

fn numbers_equal(left: &Number, right: &Number) -> bool {
    if let (Some(l), Some(r)) = (left.as_i64(), right.as_i64()) {
        return l == r;
    }
    if let (Some(l), Some(r)) = (left.as_u64(), right.as_u64()) {
        return l == r;
    }
    match (left.as_f64(), right.as_f64()) {
        (Some(l), Some(r)) => l == r,
        _ => false,
    }
}

fn mismatch(path: &[String], reason: String) -> Mismatch {
    Mismatch {
        path: path.join("."),
        reason,
    }
}

fn type_mismatch(path: &[String], expected: &Value, actual: &Value) -> Mismatch {
    mismatch(
        path,
        format!(
            "expected {}, found {}",
            json_type_name(expected),
            json_type_name(actual)
        ),
    )
}

const fn wildcard_name(wildcard: Wildcard) -> &'static str {
    match wildcard {
        Wildcard::AnyString => "any value",
        Wildcard::AnyNumber => "any number",
        Wildcard::AnyStringArray => "any array",
        Wildcard::AnyObject => "any object",
    }
}

const fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::Pattern;
    use crate::sentinel::{any_array, any_number, any_object, any_string};
    use serde_json::json;

    fn ignoring(paths: &[&str]) -> IgnoreSet {
        IgnoreSet::new(paths.iter().copied(), Vec::new())
    }

    #[test]
    fn test_reflexive_without_wildcards() {
        let value = json!({
            "type": "assistant",
            "message": {"content": [{"type": "text", "text": "Hi"}], "n": 1.5},
            "flag": true,
            "none": null
        });
        assert!(matches(&value, &value));
    }

    #[test]
    fn test_changing_one_leaf_breaks_match() {
        let expected = json!({"a": {"b": [1, "x", true]}});
        for actual in [
            json!({"a": {"b": [2, "x", true]}}),
            json!({"a": {"b": [1, "y", true]}}),
            json!({"a": {"b": [1, "x", false]}}),
            json!({"a": {"b": [1, "x", null]}}),
        ] {
            assert!(!matches(&actual, &expected), "{actual}");
        }
    }

    #[test]
    fn test_extra_null_keys_are_allowed() {
        let expected = json!({"a": 1});
        assert!(matches(&json!({"a": 1, "b": null}), &expected));

        let m = explain_mismatch(&json!({"a": 1, "b": 2}), &expected, &IgnoreSet::default())
            .unwrap();
        assert_eq!(m.path, "b");
        assert_eq!(m.reason, "unexpected field with value 2");
    }

    #[test]
    fn test_missing_expected_key() {
        let m = explain_mismatch(&json!({}), &json!({"a": null}), &IgnoreSet::default()).unwrap();
        assert_eq!(m.to_string(), "a: missing field");
    }

    #[test]
    fn test_ignored_wildcard_path_tolerates_any_type() {
        let expected = json!({"items": [{"id": "<ignored>", "v": 1}]});
        let ignore = ignoring(&["items.*.id"]);
        assert!(matches_with(&json!({"items": [{"id": "XYZ", "v": 1}]}), &expected, &ignore));
        assert!(matches_with(&json!({"items": [{"id": 123, "v": 1}]}), &expected, &ignore));
        assert!(matches_with(&json!({"items": [{"v": 1}]}), &expected, &ignore));
        assert!(!matches_with(&json!({"items": [{"id": 1, "v": 2}]}), &expected, &ignore));
    }

    #[test]
    fn test_asserted_child_of_ignored_parent_is_compared() {
        let pattern = Pattern::volatile(json!({
            "type": "result",
            "usage": {"output_tokens": 2}
        }))
        .asserting(["usage.output_tokens"]);

        assert!(pattern.matches(&json!({
            "type": "result",
            "usage": {"input_tokens": 40, "output_tokens": 2}
        })));

        let m = pattern
            .explain(&json!({"type": "result", "usage": {"output_tokens": 999}}))
            .unwrap();
        assert_eq!(m.to_string(), "usage.output_tokens: expected 2, found 999");

        let m = pattern.explain(&json!({"type": "result"})).unwrap();
        assert_eq!(m.to_string(), "usage: missing field");
    }

    #[test]
    fn test_asserted_path_under_wildcard_ignore() {
        let expected = json!({"content": [{"id": "a"}, {"id": "b"}]});
        let ignore = IgnoreSet::new(["content"], ["content.*.id"]);
        assert!(matches_with(
            &json!({"content": [{"id": "a"}, {"id": "b"}]}),
            &expected,
            &ignore
        ));
        assert!(!matches_with(
            &json!({"content": [{"id": "a"}, {"id": "c"}]}),
            &expected,
            &ignore
        ));
    }

    #[test]
    fn test_ignored_extra_key() {
        let expected = json!({"type": "result"});
        let actual = json!({"type": "result", "uuid": "abc"});
        assert!(!matches(&actual, &expected));
        assert!(matches_with(&actual, &expected, &ignoring(&["uuid"])));
    }

    #[test]
    fn test_array_length_must_match() {
        let m = explain_mismatch(&json!([1, 2, 3]), &json!([1, 2]), &IgnoreSet::default()).unwrap();
        assert_eq!(m.reason, "expected 2 elements, found 3");
        assert!(!matches(&json!({"a": [1]}), &json!({"a": {"0": 1}})));
    }

    #[test]
    fn test_numbers_compare_numerically() {
        assert!(matches(&json!(1), &json!(1.0)));
        assert!(matches(&json!(1.0), &json!(1)));
        assert!(matches(&json!(u64::MAX), &json!(u64::MAX)));
        assert!(!matches(&json!(1), &json!(1.5)));
        assert!(!matches(&json!("1"), &json!(1)));
    }

    #[test]
    fn test_any_string_matches_everything() {
        for actual in [json!(null), json!(3), json!("s"), json!([1]), json!({"k": 1})] {
            assert!(matches(&actual, &any_string()), "{actual}");
        }
    }

    #[test]
    fn test_kind_wildcards() {
        assert!(matches(&json!(0.25), &any_number()));
        assert!(!matches(&json!("0.25"), &any_number()));
        assert!(matches(&json!([]), &any_array()));
        assert!(matches(&json!(["Bash", "Read"]), &any_array()));
        assert!(!matches(&json!("Bash"), &any_array()));
        assert!(matches(&json!({}), &any_object()));
        assert!(!matches(&json!("str"), &any_object()));

        let m = explain_mismatch(
            &json!({"input": "x"}),
            &json!({"input": any_object()}),
            &IgnoreSet::default(),
        )
        .unwrap();
        assert_eq!(m.to_string(), "input: expected any object, found string");
    }

    #[test]
    fn test_wildcards_nested_in_patterns() {
        let pattern = Pattern::new(json!({
            "type": "result",
            "subtype": "success",
            "duration_ms": any_number(),
            "session_id": any_string(),
            "usage": any_object(),
            "permission_denials": any_array()
        }));
        assert!(pattern.matches(&json!({
            "type": "result",
            "subtype": "success",
            "duration_ms": 1234,
            "session_id": "sess_1",
            "usage": {"input_tokens": 3},
            "permission_denials": []
        })));
    }

    #[test]
    fn test_relation_is_not_symmetric() {
        let narrow = json!({"a": 1});
        let wide = json!({"a": 1, "b": null});
        assert!(matches(&wide, &narrow));
        assert!(!matches(&narrow, &wide));
    }
}
