//! Scrape results
//!
//! A result is built fresh for every scrape and serializes straight to JSON.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

/// Keyed result of a template, or of one `Each` item
pub type Record = BTreeMap<String, Value>;

/// Single extracted value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Selector matched nothing, or a filter found nothing
    Null,
    String(String),
    /// Serialized as RFC 3339
    DateTime(DateTime<FixedOffset>),
    /// One scalar per match of an `ArrayProperty`
    List(Vec<Value>),
    /// Named template root
    Map(Record),
    /// One record per item of an `Each`
    Records(Vec<Record>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_records(&self) -> Option<&[Record]> {
        match self {
            Value::Records(records) => Some(records),
            _ => None,
        }
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}
