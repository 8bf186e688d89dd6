// Copyright (c) 2026 Elias Bachaalany
// SPDX-License-Identifier: MIT

//! Wildcard values for expected-message patterns.
//!
//! A wildcard is stored in a pattern as an ordinary JSON value that no real
//! protocol field takes, so it survives serialization and can sit anywhere
//! inside a nested `json!` literal. The matcher recognizes it from its JSON
//! shape alone.
//!
//! | Wildcard         | JSON shape                   | Accepts            |
//! |------------------|------------------------------|--------------------|
//! | `AnyString`      | `"<<any>>"`                  | any value at all   |
//! | `AnyNumber`      | `-9007199254740991`          | any number         |
//! | `AnyStringArray` | `["<<any-array>>"]`          | any array          |
//! | `AnyObject`      | `{"<<any-object>>": true}`   | any object         |
//!
//! The number form assumes protocol numbers are never that negative. Typed
//! code should prefer [`Slot::Any`], which picks the right shape for the
//! field's type.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Reserved string standing for "any value here".
pub const ANY_STRING: &str = "<<any>>";

/// Reserved number standing for "any number here": `-(2^53 - 1)`.
pub const ANY_NUMBER: i64 = -9_007_199_254_740_991;

/// Single element of the reserved any-array literal.
pub const ANY_ARRAY_MARKER: &str = "<<any-array>>";

/// Only key of the reserved any-object literal.
pub const ANY_OBJECT_KEY: &str = "<<any-object>>";

/// The four wildcard kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Wildcard {
    AnyString,
    AnyNumber,
    AnyStringArray,
    AnyObject,
}

impl Wildcard {
    /// The JSON literal standing for this wildcard.
    pub fn to_value(self) -> Value {
        match self {
            Wildcard::AnyString => Value::String(ANY_STRING.to_string()),
            Wildcard::AnyNumber => Value::from(ANY_NUMBER),
            Wildcard::AnyStringArray => Value::Array(vec![Value::String(ANY_ARRAY_MARKER.into())]),
            Wildcard::AnyObject => {
                let mut object = Map::new();
                object.insert(ANY_OBJECT_KEY.to_string(), Value::Bool(true));
                Value::Object(object)
            }
        }
    }

    /// Recognize a wildcard from its JSON shape.
    pub fn recognize(value: &Value) -> Option<Wildcard> {
        match value {
            Value::String(s) if s == ANY_STRING => Some(Wildcard::AnyString),
            Value::Number(n)
                if n.as_i64() == Some(ANY_NUMBER) || n.as_f64() == Some(ANY_NUMBER as f64) =>
            {
                Some(Wildcard::AnyNumber)
            }
            Value::Array(items)
                if items.len() == 1 && items[0].as_str() == Some(ANY_ARRAY_MARKER) =>
            {
                Some(Wildcard::AnyStringArray)
            }
            Value::Object(object) if object.len() == 1 && object.contains_key(ANY_OBJECT_KEY) => {
                Some(Wildcard::AnyObject)
            }
            _ => None,
        }
    }

    /// Whether `actual` is acceptable where this wildcard is expected.
    pub fn accepts(self, actual: &Value) -> bool {
        match self {
            Wildcard::AnyString => true,
            Wildcard::AnyNumber => actual.is_number(),
            Wildcard::AnyStringArray => actual.is_array(),
            Wildcard::AnyObject => actual.is_object(),
        }
    }
}

pub fn any_string() -> Value {
    Wildcard::AnyString.to_value()
}

pub fn any_number() -> Value {
    Wildcard::AnyNumber.to_value()
}

pub fn any_array() -> Value {
    Wildcard::AnyStringArray.to_value()
}

pub fn any_object() -> Value {
    Wildcard::AnyObject.to_value()
}

/// Types that have a wildcard of their own kind.
pub trait SentinelKind {
    const WILDCARD: Wildcard;
}

impl SentinelKind for String {
    const WILDCARD: Wildcard = Wildcard::AnyString;
}

impl SentinelKind for Value {
    const WILDCARD: Wildcard = Wildcard::AnyString;
}

impl SentinelKind for Vec<String> {
    const WILDCARD: Wildcard = Wildcard::AnyStringArray;
}

impl SentinelKind for Map<String, Value> {
    const WILDCARD: Wildcard = Wildcard::AnyObject;
}

macro_rules! numeric_sentinel {
    ($($ty:ty),*) => {
        $(impl SentinelKind for $ty {
            const WILDCARD: Wildcard = Wildcard::AnyNumber;
        })*
    };
}

numeric_sentinel!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

/// A field value in a typed expected message: either an exact value or a
/// wildcard of the field's own kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot<T> {
    Exact(T),
    Any,
}

impl<T> Slot<T> {
    pub fn is_any(&self) -> bool {
        matches!(self, Slot::Any)
    }

    pub fn exact(&self) -> Option<&T> {
        match self {
            Slot::Exact(v) => Some(v),
            Slot::Any => None,
        }
    }
}

impl<T> From<T> for Slot<T> {
    fn from(value: T) -> Self {
        Slot::Exact(value)
    }
}

impl<T: Serialize + SentinelKind> Serialize for Slot<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Slot::Exact(value) => value.serialize(serializer),
            Slot::Any => T::WILDCARD.to_value().serialize(serializer),
        }
    }
}

impl<'de, T: DeserializeOwned + SentinelKind> Deserialize<'de> for Slot<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        if Wildcard::recognize(&value) == Some(T::WILDCARD) {
            return Ok(Slot::Any);
        }
        serde_json::from_value(value)
            .map(Slot::Exact)
            .map_err(serde::de::Error::custom)
    }
}
