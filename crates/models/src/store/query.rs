//! Filter expressions understood by the document store.
//!
//! A query is a list of condition groups. Groups are OR-ed, conditions in a
//! group are AND-ed. A condition key is a dotted field path with an optional
//! operator suffix (`"properties.name?pfx"`); no suffix means equality.
//! The empty query matches every document.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
    Lt,
    Gt,
    Lte,
    Gte,
    Prefix,
    Range,
    Contains,
    NotContains,
}

impl Op {
    fn suffix(self) -> Option<&'static str> {
        match self {
            Op::Eq => None,
            Op::Ne => Some("ne"),
            Op::Lt => Some("lt"),
            Op::Gt => Some("gt"),
            Op::Lte => Some("lte"),
            Op::Gte => Some("gte"),
            Op::Prefix => Some("pfx"),
            Op::Range => Some("r"),
            Op::Contains => Some("contains"),
            Op::NotContains => Some("not_contains"),
        }
    }

    fn from_suffix(s: &str) -> Option<Self> {
        Some(match s {
            "ne" => Op::Ne,
            "lt" => Op::Lt,
            "gt" => Op::Gt,
            "lte" => Op::Lte,
            "gte" => Op::Gte,
            "pfx" => Op::Prefix,
            "r" => Op::Range,
            "contains" => Op::Contains,
            "not_contains" => Op::NotContains,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Query(Vec<Map<String, Value>>);

impl Query {
    /// Matches everything.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Map::is_empty)
    }

    /// Add an equality condition to the current group.
    pub fn eq(self, path: &str, value: impl Into<Value>) -> Self {
        self.with(path, Op::Eq, value)
    }

    /// Add a condition to the current (last) group.
    pub fn with(mut self, path: &str, op: Op, value: impl Into<Value>) -> Self {
        let key = match op.suffix() {
            Some(s) => format!("{path}?{s}"),
            None => path.to_string(),
        };
        if self.0.is_empty() {
            self.0.push(Map::new());
        }
        if let Some(group) = self.0.last_mut() {
            group.insert(key, value.into());
        }
        self
    }

    /// Alternative: documents matching `self` or `other`.
    pub fn or(mut self, other: Query) -> Self {
        self.0.extend(other.0.into_iter().filter(|g| !g.is_empty()));
        self
    }

    /// Accept either a single condition object or a list of them.
    pub fn from_value(value: Value) -> Result<Self, StoreError> {
        match value {
            Value::Null => Ok(Self::all()),
            Value::Object(group) => Ok(Self(vec![group])),
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(group) => Ok(group),
                    other => Err(StoreError::Rejected(format!("query group must be an object, got {other}"))),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Self),
            other => Err(StoreError::Rejected(format!("query must be an object or a list, got {other}"))),
        }
    }

    pub fn groups(&self) -> &[Map<String, Value>] {
        &self.0
    }

    pub fn matches(&self, document: &Value) -> bool {
        if self.is_empty() {
            return true;
        }
        self.0
            .iter()
            .filter(|g| !g.is_empty())
            .any(|group| group.iter().all(|(key, expected)| condition_holds(document, key, expected)))
    }
}

fn condition_holds(document: &Value, key: &str, expected: &Value) -> bool {
    let (path, op) = match key.rsplit_once('?') {
        Some((path, suffix)) => match Op::from_suffix(suffix) {
            Some(op) => (path, op),
            None => (key, Op::Eq),
        },
        None => (key, Op::Eq),
    };
    let actual = lookup(document, path);

    match op {
        Op::Eq => actual == Some(expected),
        Op::Ne => actual != Some(expected),
        Op::Lt => compare(actual, expected) == Some(Ordering::Less),
        Op::Gt => compare(actual, expected) == Some(Ordering::Greater),
        Op::Lte => matches!(compare(actual, expected), Some(Ordering::Less | Ordering::Equal)),
        Op::Gte => matches!(compare(actual, expected), Some(Ordering::Greater | Ordering::Equal)),
        Op::Prefix => match (actual.and_then(Value::as_str), expected.as_str()) {
            (Some(a), Some(p)) => a.starts_with(p),
            _ => false,
        },
        Op::Range => match expected.as_array().map(Vec::as_slice) {
            Some([lo, hi]) => {
                matches!(compare(actual, lo), Some(Ordering::Greater | Ordering::Equal))
                    && matches!(compare(actual, hi), Some(Ordering::Less | Ordering::Equal))
            }
            _ => false,
        },
        Op::Contains => contains(actual, expected),
        Op::NotContains => actual.is_some() && !contains(actual, expected),
    }
}

fn lookup<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(document, |node, segment| node.get(segment))
}

fn compare(actual: Option<&Value>, expected: &Value) -> Option<Ordering> {
    match (actual?, expected) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn contains(actual: Option<&Value>, expected: &Value) -> bool {
    match (actual, expected) {
        (Some(Value::String(a)), Value::String(needle)) => a.contains(needle.as_str()),
        (Some(Value::Array(items)), needle) => items.contains(needle),
        _ => false,
    }
}
