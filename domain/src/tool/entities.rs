//! Tool domain entities

use crate::chart::ChartType;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Argument map passed to a tool. Ordered so that equal argument sets
/// serialize identically (redundancy detection compares them).
pub type ToolArguments = BTreeMap<String, Value>;

/// What a tool does to the exploration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCategory {
    /// Reads the chart without changing it (summaries, tooltips)
    Perception,
    /// Changes the view (zoom, filter, highlight, encoding)
    Action,
    /// Computes derived facts (clusters, correlation, anomalies)
    Analysis,
}

impl ToolCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolCategory::Perception => "perception",
            ToolCategory::Action => "action",
            ToolCategory::Analysis => "analysis",
        }
    }
}

impl std::fmt::Display for ToolCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// JSON type expected for a parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
    /// Any JSON value (e.g. a category that may be a string or a number)
    Any,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Array => "array",
            ParamType::Object => "object",
            ParamType::Any => "any",
        }
    }

    /// Whether `value` has this type. Integers accept whole floats (`2.0`).
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Integer => {
                value.is_i64()
                    || value.is_u64()
                    || value.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0)
            }
            ParamType::Number => value.is_number(),
            ParamType::Boolean => value.is_boolean(),
            ParamType::Array => value.is_array(),
            ParamType::Object => value.is_object(),
            ParamType::Any => true,
        }
    }
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Value constraints beyond the JSON type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamConstraints {
    /// Allowed values
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<Value>>,
    /// Inclusive lower bound for numbers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    /// Inclusive upper bound for numbers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    /// Minimum array length
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,
    /// Maximum array length
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    /// Type of every array element
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<ParamType>,
}

impl ParamConstraints {
    pub fn is_empty(&self) -> bool {
        self == &ParamConstraints::default()
    }
}

/// Parameter specification for a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameter {
    #[serde(rename = "type")]
    pub param_type: ParamType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Value filled in when the argument is omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "ParamConstraints::is_empty")]
    pub constraints: ParamConstraints,
}

impl ToolParameter {
    pub fn new(param_type: ParamType, description: impl Into<String>) -> Self {
        Self {
            param_type,
            required: false,
            description: description.into(),
            default: None,
            constraints: ParamConstraints::default(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn one_of<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.constraints.allowed = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_range(mut self, minimum: Option<f64>, maximum: Option<f64>) -> Self {
        self.constraints.minimum = minimum;
        self.constraints.maximum = maximum;
        self
    }

    /// Array with exactly `len` elements of type `items`
    pub fn with_items(mut self, items: ParamType, min: Option<usize>, max: Option<usize>) -> Self {
        self.constraints.items = Some(items);
        self.constraints.min_items = min;
        self.constraints.max_items = max;
        self
    }
}

/// Immutable metadata for one callable tool.
///
/// Serialized form matches the external descriptor format:
/// `{name, category, description, params: {name: {type, required, ...}}, applicable_chart_types: [..]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub category: ToolCategory,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub params: BTreeMap<String, ToolParameter>,
    /// Empty means the tool applies to every chart type
    #[serde(default)]
    pub applicable_chart_types: BTreeSet<ChartType>,
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        category: ToolCategory,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            category,
            description: description.into(),
            params: BTreeMap::new(),
            applicable_chart_types: BTreeSet::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, param: ToolParameter) -> Self {
        self.params.insert(name.into(), param);
        self
    }

    pub fn applicable_to(mut self, chart_type: ChartType) -> Self {
        self.applicable_chart_types.insert(chart_type);
        self
    }

    pub fn is_applicable(&self, chart_type: ChartType) -> bool {
        self.applicable_chart_types.is_empty() || self.applicable_chart_types.contains(&chart_type)
    }

    /// Copy of `arguments` with declared defaults filled in for omitted parameters
    pub fn with_defaults(&self, arguments: &ToolArguments) -> ToolArguments {
        let mut filled = arguments.clone();
        for (name, param) in &self.params {
            if let Some(default) = &param.default {
                let missing = filled.get(name).is_none_or(|v| v.is_null());
                if missing {
                    filled.insert(name.clone(), default.clone());
                }
            }
        }
        filled
    }
}

/// A proposed tool invocation, created by the orchestration loop from a
/// model decision and consumed once by the executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool_name: String,
    #[serde(default)]
    pub arguments: ToolArguments,
    /// Round in which the model proposed this call
    #[serde(default)]
    pub round: usize,
}

impl ToolCall {
    pub fn new(tool_name: impl Into<String>, round: usize) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments: ToolArguments::new(),
            round,
        }
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    pub fn with_arguments(mut self, arguments: ToolArguments) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(|v| v.as_str())
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.arguments.get(key).and_then(|v| v.as_f64())
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.arguments
            .get(key)
            .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
    }

    /// Compact `name(arg=value, ...)` rendering for logs and progress output
    pub fn signature(&self) -> String {
        let args = self
            .arguments
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{}({})", self.tool_name, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn clusters_descriptor() -> ToolDescriptor {
        ToolDescriptor::new("identify_clusters", ToolCategory::Analysis, "k-means")
            .with_param(
                "n_clusters",
                ToolParameter::new(ParamType::Integer, "cluster count")
                    .with_default(3)
                    .with_range(Some(1.0), Some(10.0)),
            )
            .with_param(
                "method",
                ToolParameter::new(ParamType::String, "algorithm")
                    .with_default("kmeans")
                    .one_of(["kmeans"]),
            )
            .applicable_to(ChartType::ScatterPlot)
    }

    #[test]
    fn test_param_type_matches() {
        assert!(ParamType::Integer.matches(&json!(2)));
        assert!(ParamType::Integer.matches(&json!(2.0)));
        assert!(!ParamType::Integer.matches(&json!(2.5)));
        assert!(ParamType::Number.matches(&json!(2.5)));
        assert!(!ParamType::String.matches(&json!(1)));
        assert!(ParamType::Any.matches(&json!(null)));
    }

    #[test]
    fn test_applicability() {
        let descriptor = clusters_descriptor();
        assert!(descriptor.is_applicable(ChartType::ScatterPlot));
        assert!(!descriptor.is_applicable(ChartType::BarChart));

        let common = ToolDescriptor::new("zoom", ToolCategory::Action, "zoom");
        assert!(common.is_applicable(ChartType::SankeyDiagram));
    }

    #[test]
    fn test_with_defaults_keeps_explicit_values() {
        let descriptor = clusters_descriptor();
        let call = ToolCall::new("identify_clusters", 0).with_arg("n_clusters", 2);
        let filled = descriptor.with_defaults(&call.arguments);

        assert_eq!(filled["n_clusters"], json!(2));
        assert_eq!(filled["method"], json!("kmeans"));
        assert_eq!(call.arguments.len(), 1);
    }

    #[test]
    fn test_descriptor_external_format() {
        let value = serde_json::to_value(clusters_descriptor()).unwrap();
        assert_eq!(value["category"], "analysis");
        assert_eq!(value["params"]["n_clusters"]["type"], "integer");
        assert_eq!(value["params"]["method"]["constraints"]["enum"], json!(["kmeans"]));
        assert_eq!(value["applicable_chart_types"], json!(["scatter_plot"]));

        let parsed: ToolDescriptor = serde_json::from_value(json!({
            "name": "zoom",
            "category": "action",
            "params": {"area": {"type": "array", "required": true}},
            "applicable_chart_types": []
        }))
        .unwrap();
        assert!(parsed.params["area"].required);
        assert!(parsed.applicable_chart_types.is_empty());
    }

    #[test]
    fn test_tool_call_signature() {
        let call = ToolCall::new("identify_clusters", 1)
            .with_arg("n_clusters", 2)
            .with_arg("method", "kmeans");
        assert_eq!(
            call.signature(),
            "identify_clusters(method=\"kmeans\", n_clusters=2)"
        );
        assert_eq!(call.get_i64("n_clusters"), Some(2));
        assert_eq!(call.get_string("method"), Some("kmeans"));
    }
}
