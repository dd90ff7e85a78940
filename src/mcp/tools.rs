//! Tool execution against the Umami client.
//!
//! Argument structs mirror the input schemas in the registry. Defaults for
//! `unit` and `limit` kick in when the field is absent *or* holds its zero
//! value (`""` / `0`).

use super::helpers::text_content;
use super::models::RpcError;
use super::registry::{GET_ACTIVE, GET_METRICS, GET_PAGEVIEWS, GET_STATS, GET_WEBSITES};
use crate::umami::UmamiClient;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

/// Grouping unit used when the caller leaves `unit` empty
pub const DEFAULT_UNIT: &str = "day";
/// Row limit used when the caller leaves `limit` at zero
pub const DEFAULT_LIMIT: i64 = 10;

// =============================================================================
// Tool Inputs
// =============================================================================

/// Input for the get_websites tool
#[derive(Debug, Default, Deserialize)]
pub struct GetWebsitesInput {
    #[serde(default)]
    pub include_teams: bool,
}

/// Input for the get_stats tool
#[derive(Debug, Deserialize)]
pub struct GetStatsInput {
    pub website_id: String,
    #[serde(deserialize_with = "string_or_number")]
    pub start_date: String,
    #[serde(deserialize_with = "string_or_number")]
    pub end_date: String,
}

/// Input for the get_pageviews tool
#[derive(Debug, Deserialize)]
pub struct GetPageViewsInput {
    pub website_id: String,
    #[serde(deserialize_with = "string_or_number")]
    pub start_date: String,
    #[serde(deserialize_with = "string_or_number")]
    pub end_date: String,
    #[serde(default)]
    pub unit: String,
}

impl GetPageViewsInput {
    pub fn unit(&self) -> &str {
        if self.unit.is_empty() {
            DEFAULT_UNIT
        } else {
            &self.unit
        }
    }
}

/// Input for the get_metrics tool
#[derive(Debug, Deserialize)]
pub struct GetMetricsInput {
    pub website_id: String,
    #[serde(deserialize_with = "string_or_number")]
    pub start_date: String,
    #[serde(deserialize_with = "string_or_number")]
    pub end_date: String,
    pub metric_type: String,
    #[serde(default)]
    pub limit: i64,
}

impl GetMetricsInput {
    pub fn limit(&self) -> i64 {
        if self.limit == 0 {
            DEFAULT_LIMIT
        } else {
            self.limit
        }
    }
}

/// Input for the get_active tool
#[derive(Debug, Deserialize)]
pub struct GetActiveInput {
    pub website_id: String,
}

/// Timestamps are documented as strings but clients often send numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Integer(i64),
        Float(f64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Integer(n) => n.to_string(),
        Raw::Float(f) => f.to_string(),
    })
}

fn parse_input<T: DeserializeOwned>(args: Option<Value>) -> Result<T, RpcError> {
    serde_json::from_value(args.unwrap_or(Value::Null))
        .map_err(|e| RpcError::invalid_params(format!("Invalid arguments: {e}")))
}

// =============================================================================
// Dispatch
// =============================================================================

/// Handles `tools/call` once the name has been validated against the catalog.
pub async fn handle_tool_call(
    client: &UmamiClient,
    name: &str,
    args: Option<Value>,
) -> Result<Value, RpcError> {
    debug!(tool = name, "Executing tool");

    match name {
        GET_WEBSITES => {
            let input: GetWebsitesInput = match args {
                None | Some(Value::Null) => GetWebsitesInput::default(),
                args => parse_input(args)?,
            };
            let websites = client
                .get_websites(input.include_teams)
                .await
                .map_err(|e| RpcError::internal(format!("Failed to get websites: {e}")))?;
            text_content(&websites)
        }
        GET_STATS => {
            let input: GetStatsInput = parse_input(args)?;
            let stats = client
                .get_stats(&input.website_id, &input.start_date, &input.end_date)
                .await
                .map_err(|e| RpcError::internal(format!("Failed to get stats: {e}")))?;
            text_content(&stats)
        }
        GET_PAGEVIEWS => {
            let input: GetPageViewsInput = parse_input(args)?;
            let pageviews = client
                .get_page_views(
                    &input.website_id,
                    &input.start_date,
                    &input.end_date,
                    input.unit(),
                )
                .await
                .map_err(|e| RpcError::internal(format!("Failed to get page views: {e}")))?;
            text_content(&pageviews)
        }
        GET_METRICS => {
            let input: GetMetricsInput = parse_input(args)?;
            let metrics = client
                .get_metrics(
                    &input.website_id,
                    &input.start_date,
                    &input.end_date,
                    &input.metric_type,
                    input.limit(),
                )
                .await
                .map_err(|e| RpcError::internal(format!("Failed to get metrics: {e}")))?;
            text_content(&metrics)
        }
        GET_ACTIVE => {
            let input: GetActiveInput = parse_input(args)?;
            let active = client
                .get_active(&input.website_id)
                .await
                .map_err(|e| RpcError::internal(format!("Failed to get active visitors: {e}")))?;
            text_content(&active)
        }
        _ => Err(RpcError::invalid_params(format!("Unknown tool: {name}"))),
    }
}
