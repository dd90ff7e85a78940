//! Static catalog of tools, prompts and resources.
//!
//! Built once at startup and shared read-only by every session, so all
//! clients see the same catalog whichever Umami instance they talk to.

use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

// =============================================================================
// Names
// =============================================================================

pub const GET_WEBSITES: &str = "get_websites";
pub const GET_STATS: &str = "get_stats";
pub const GET_PAGEVIEWS: &str = "get_pageviews";
pub const GET_METRICS: &str = "get_metrics";
pub const GET_ACTIVE: &str = "get_active";

/// The only readable resource
pub const WEBSITES_RESOURCE_URI: &str = "umami://websites";

// =============================================================================
// Definitions
// =============================================================================

/// A tool definition for the `tools/list` response
#[derive(Debug, Clone, Serialize)]
pub struct ToolDef {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// One placeholder of a prompt template
#[derive(Debug, Clone, Copy)]
pub struct PromptArgument {
    pub name: &'static str,
    pub description: &'static str,
    /// Value substituted when the caller does not supply one
    pub default: &'static str,
}

/// A named text template with `{placeholder}` slots
#[derive(Debug, Clone)]
pub struct PromptDef {
    pub name: &'static str,
    pub description: &'static str,
    pub arguments: &'static [PromptArgument],
    pub template: &'static str,
}

impl PromptDef {
    /// Shape used in `prompts/list`
    pub fn to_value(&self) -> Value {
        let arguments: Vec<Value> = self
            .arguments
            .iter()
            .map(|arg| {
                json!({
                    "name": arg.name,
                    "description": arg.description,
                    "required": false,
                })
            })
            .collect();

        json!({
            "name": self.name,
            "description": self.description,
            "arguments": arguments,
        })
    }

    /// Merges defaults with `overrides` (overrides win) and substitutes every
    /// `{key}`. Placeholders with no value are left as they are.
    pub fn render(&self, overrides: &BTreeMap<String, String>) -> String {
        let mut values: BTreeMap<String, String> = self
            .arguments
            .iter()
            .map(|arg| (arg.name.to_string(), arg.default.to_string()))
            .collect();
        values.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));

        values
            .iter()
            .fold(self.template.to_string(), |text, (key, value)| {
                text.replace(&format!("{{{key}}}"), value)
            })
    }
}

/// Read-only registry of everything a client can discover
#[derive(Debug, Clone)]
pub struct CapabilityRegistry {
    tools: Vec<ToolDef>,
    prompts: Vec<PromptDef>,
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self {
            tools: tools(),
            prompts: prompts(),
        }
    }

    pub fn tools(&self) -> &[ToolDef] {
        &self.tools
    }

    pub fn tool(&self, name: &str) -> Option<&ToolDef> {
        self.tools.iter().find(|tool| tool.name == name)
    }

    pub fn prompts(&self) -> &[PromptDef] {
        &self.prompts
    }

    pub fn prompt(&self, name: &str) -> Option<&PromptDef> {
        self.prompts.iter().find(|prompt| prompt.name == name)
    }

    /// `tools/list` result
    pub fn tools_list(&self) -> Value {
        json!({ "tools": self.tools })
    }

    /// `prompts/list` result
    pub fn prompts_list(&self) -> Value {
        let prompts: Vec<Value> = self.prompts.iter().map(PromptDef::to_value).collect();
        json!({ "prompts": prompts })
    }

    /// `resources/list` result
    pub fn resources_list(&self) -> Value {
        json!({
            "resources": [{
                "uri": WEBSITES_RESOURCE_URI,
                "name": "Website List",
                "description": "List of all websites configured in Umami with their IDs and creation dates",
                "mimeType": "application/json"
            }]
        })
    }
}

// =============================================================================
// Tool catalog
// =============================================================================

fn date_range_properties() -> serde_json::Map<String, Value> {
    let mut props = serde_json::Map::new();
    props.insert(
        "website_id".into(),
        json!({ "type": "string", "description": "Website ID as returned by get_websites" }),
    );
    props.insert(
        "start_date".into(),
        json!({ "type": "string", "description": "Range start as a Unix timestamp in milliseconds" }),
    );
    props.insert(
        "end_date".into(),
        json!({ "type": "string", "description": "Range end as a Unix timestamp in milliseconds" }),
    );
    props
}

fn tools() -> Vec<ToolDef> {
    let mut pageview_props = date_range_properties();
    pageview_props.insert(
        "unit".into(),
        json!({
            "type": "string",
            "description": "Time bucket for the series",
            "enum": ["minute", "hour", "day", "month", "year"],
            "default": "day"
        }),
    );

    let mut metric_props = date_range_properties();
    metric_props.insert(
        "metric_type".into(),
        json!({
            "type": "string",
            "description": "Dimension to rank",
            "enum": ["url", "path", "referrer", "browser", "os", "device", "country", "event"]
        }),
    );
    metric_props.insert(
        "limit".into(),
        json!({ "type": "integer", "description": "Maximum number of rows", "default": 10 }),
    );

    vec![
        ToolDef {
            name: GET_WEBSITES,
            description: "List all websites tracked in Umami with their IDs, names and domains",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "include_teams": {
                        "type": "boolean",
                        "description": "Also list websites owned by the user's teams"
                    }
                },
                "required": []
            }),
        },
        ToolDef {
            name: GET_STATS,
            description: "Get summary statistics (page views, visitors, bounces, total time) for a website",
            input_schema: json!({
                "type": "object",
                "properties": date_range_properties(),
                "required": ["website_id", "start_date", "end_date"]
            }),
        },
        ToolDef {
            name: GET_PAGEVIEWS,
            description: "Get the page view time series for a website",
            input_schema: json!({
                "type": "object",
                "properties": pageview_props,
                "required": ["website_id", "start_date", "end_date"]
            }),
        },
        ToolDef {
            name: GET_METRICS,
            description: "Get top pages, referrers, browsers, countries or devices for a website",
            input_schema: json!({
                "type": "object",
                "properties": metric_props,
                "required": ["website_id", "start_date", "end_date", "metric_type"]
            }),
        },
        ToolDef {
            name: GET_ACTIVE,
            description: "Get the number of visitors currently active on a website",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "website_id": { "type": "string", "description": "Website ID as returned by get_websites" }
                },
                "required": ["website_id"]
            }),
        },
    ]
}

// =============================================================================
// Prompt catalog
// =============================================================================

const DAYS_ARG: &str = "Number of days to look back";

fn prompts() -> Vec<PromptDef> {
    vec![
        PromptDef {
            name: "analytics-report",
            description: "Comprehensive analytics report for a website",
            arguments: &[PromptArgument {
                name: "days",
                description: DAYS_ARG,
                default: "30",
            }],
            template: "First call get_websites to find the target website. \
                Then build a full analytics report for the last {days} days by calling:\n\
                - get_stats for the overall visitor numbers\n\
                - get_pageviews (unit: day) for the traffic trend\n\
                - get_metrics for top pages (type: url), referrers (type: referrer), \
                countries (type: country), browsers (type: browser) and devices (type: device)\n\n\
                Summarize the findings in a clear, well-structured report.",
        },
        PromptDef {
            name: "top-pages",
            description: "Most visited pages of a website",
            arguments: &[
                PromptArgument {
                    name: "days",
                    description: DAYS_ARG,
                    default: "7",
                },
                PromptArgument {
                    name: "limit",
                    description: "Number of pages to list",
                    default: "10",
                },
            ],
            template: "First call get_websites to find the target website. \
                Then call get_metrics with type \"url\" over the last {days} days, \
                limited to {limit} results, to find the most visited pages. \
                Present them as a ranked list of page paths with view counts.",
        },
        PromptDef {
            name: "visitor-insights",
            description: "Breakdown of visitors by country, device, browser and OS",
            arguments: &[PromptArgument {
                name: "days",
                description: DAYS_ARG,
                default: "30",
            }],
            template: "First call get_websites to find the target website. \
                Then break down the visitors of the last {days} days \
                by calling get_metrics for each of:\n\
                - type \"country\" for geography\n\
                - type \"device\" for device types\n\
                - type \"browser\" for browsers\n\
                - type \"os\" for operating systems\n\n\
                Present the breakdown with counts and percentages.",
        },
        PromptDef {
            name: "realtime-check",
            description: "Current number of active visitors",
            arguments: &[],
            template: "First call get_websites to find the target website. \
                Then call get_active to check how many visitors are active right now \
                and report that number.",
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overrides(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_catalog_contents() {
        let registry = CapabilityRegistry::new();
        let names: Vec<&str> = registry.tools().iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec![GET_WEBSITES, GET_STATS, GET_PAGEVIEWS, GET_METRICS, GET_ACTIVE]
        );
        assert_eq!(registry.prompts().len(), 4);
        assert!(registry.tool("get_stats").is_some());
        assert!(registry.tool("drop_tables").is_none());
    }

    #[test]
    fn test_tools_list_serializes_input_schema() {
        let list = CapabilityRegistry::new().tools_list();
        let metrics = &list["tools"][3];
        assert_eq!(metrics["name"], GET_METRICS);
        assert_eq!(metrics["inputSchema"]["properties"]["limit"]["default"], 10);
        assert_eq!(metrics["inputSchema"]["required"][3], "metric_type");
    }

    #[test]
    fn test_top_pages_uses_defaults() {
        let registry = CapabilityRegistry::new();
        let text = registry.prompt("top-pages").unwrap().render(&BTreeMap::new());

        assert!(text.contains("last 7 days"));
        assert!(text.contains("limited to 10 results"));
        assert!(!text.contains("{days}"));
        assert!(!text.contains("{limit}"));
    }

    #[test]
    fn test_override_wins_over_default() {
        let registry = CapabilityRegistry::new();
        let text = registry
            .prompt("top-pages")
            .unwrap()
            .render(&overrides(&[("days", "14")]));

        assert!(text.contains("last 14 days"));
        assert!(!text.contains("last 7 days"));
        assert!(text.contains("limited to 10 results"));
    }

    #[test]
    fn test_unresolved_placeholder_left_verbatim() {
        let prompt = PromptDef {
            name: "custom",
            description: "",
            arguments: &[],
            template: "site {site} over {days} days",
        };

        let text = prompt.render(&overrides(&[("days", "3")]));
        assert_eq!(text, "site {site} over 3 days");
    }

    #[test]
    fn test_prompts_list_shape() {
        let list = CapabilityRegistry::new().prompts_list();
        let top_pages = &list["prompts"][1];
        assert_eq!(top_pages["name"], "top-pages");
        assert_eq!(top_pages["arguments"][1]["name"], "limit");
        assert_eq!(top_pages["arguments"][1]["required"], false);
        assert_eq!(list["prompts"][3]["arguments"].as_array().unwrap().len(), 0);
    }
}
