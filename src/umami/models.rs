//! Normalized analytics result shapes.
//!
//! Whatever wire format the Umami server answers with, the client hands out
//! these types. They are also what gets pretty-printed into tool results.

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;

// =============================================================================
// Websites
// =============================================================================

/// A website tracked by the Umami instance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Website {
    pub id: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,

    #[serde(default)]
    pub domain: Option<String>,

    #[serde(rename = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Stats
// =============================================================================

/// A counter together with its change against the previous period.
///
/// Upstream sends either `{"value": n, "change": m}` or a bare `n`; both end up
/// here, a bare number with `change == 0`. `null` counts as zero.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct ValueChange {
    pub value: i64,
    pub change: i64,
}

impl<'de> Deserialize<'de> for ValueChange {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Counter {
            #[serde(default)]
            value: Option<f64>,
            #[serde(default)]
            change: Option<f64>,
        }

        // Only a JSON object or a number is a counter; arrays are rejected.
        match Option::<Value>::deserialize(deserializer)? {
            None => Ok(ValueChange::default()),
            Some(Value::Number(n)) => Ok(ValueChange {
                value: n.as_f64().unwrap_or_default() as i64,
                change: 0,
            }),
            Some(object @ Value::Object(_)) => {
                let counter: Counter = serde_json::from_value(object).map_err(de::Error::custom)?;
                Ok(ValueChange {
                    value: counter.value.unwrap_or_default() as i64,
                    change: counter.change.unwrap_or_default() as i64,
                })
            }
            Some(other) => Err(de::Error::invalid_type(
                unexpected(&other),
                &"a number or an object with value/change",
            )),
        }
    }
}

fn unexpected(value: &Value) -> de::Unexpected<'_> {
    match value {
        Value::Bool(b) => de::Unexpected::Bool(*b),
        Value::String(s) => de::Unexpected::Str(s),
        Value::Array(_) => de::Unexpected::Seq,
        _ => de::Unexpected::Other("JSON value"),
    }
}

/// Summary statistics for a website over a date range
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Stats {
    #[serde(default)]
    pub pageviews: ValueChange,
    #[serde(default)]
    pub visitors: ValueChange,
    #[serde(default)]
    pub bounces: ValueChange,
    #[serde(default)]
    pub totaltime: ValueChange,
}

// =============================================================================
// Series and metrics
// =============================================================================

/// One bucket of a page-view time series
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageViewPoint {
    /// Bucket timestamp as sent by the server
    #[serde(rename = "t", alias = "x", default, deserialize_with = "null_as_default")]
    pub t: String,

    #[serde(default)]
    pub y: i64,
}

/// A labelled count (top pages, referrers, countries, active visitors...)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetricPoint {
    #[serde(rename = "x", default, deserialize_with = "null_as_default")]
    pub label: String,

    #[serde(rename = "y", default)]
    pub count: i64,
}

impl MetricPoint {
    pub fn new(label: impl Into<String>, count: i64) -> Self {
        Self {
            label: label.into(),
            count,
        }
    }
}

/// Treats an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
