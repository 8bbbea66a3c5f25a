//! JSON Schema tool converter.
//!
//! Renders catalog descriptors as provider-neutral JSON Schema for vendors
//! with a native tool-use API, and for `chartscout tools --schema`.

use chartscout_domain::{ChartType, ParamType, ToolCatalog, ToolDescriptor, ToolParameter};
use serde_json::{Map, Value, json};

/// Converts [`ToolDescriptor`]s to JSON Schema.
///
/// Handles param_type → JSON Schema type mapping:
/// - `string`, `integer`, `number`, `boolean`, `array`, `object` map to themselves
/// - `any` → no `type` keyword (every JSON value validates)
///
/// Defaults, enumerations, numeric bounds and array shapes are carried over
/// as `default`, `enum`, `minimum`/`maximum` and `items`/`minItems`/`maxItems`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSchemaToolConverter;

impl JsonSchemaToolConverter {
    pub fn tool_to_schema(&self, tool: &ToolDescriptor) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for (name, param) in &tool.params {
            properties.insert(name.clone(), Self::param_schema(param));
            if param.required {
                required.push(json!(name));
            }
        }

        json!({
            "name": tool.name,
            "description": tool.description,
            "input_schema": {
                "type": "object",
                "properties": properties,
                "required": required,
                "additionalProperties": false,
            }
        })
    }

    /// Every tool in the catalog, sorted by name
    pub fn all_tools_schema(&self, catalog: &ToolCatalog) -> Vec<Value> {
        catalog.all().map(|t| self.tool_to_schema(t)).collect()
    }

    /// Tools applicable to `chart_type`, sorted by name
    pub fn applicable_tools_schema(&self, catalog: &ToolCatalog, chart_type: ChartType) -> Vec<Value> {
        self.tools_schema(catalog.list_applicable(chart_type))
    }

    pub fn tools_schema<'a>(&self, tools: impl IntoIterator<Item = &'a ToolDescriptor>) -> Vec<Value> {
        let mut tools: Vec<&ToolDescriptor> = tools.into_iter().collect();
        tools.sort_by_key(|t| &t.name);
        tools.into_iter().map(|t| self.tool_to_schema(t)).collect()
    }

    fn type_keyword(param_type: ParamType) -> Option<&'static str> {
        match param_type {
            ParamType::Any => None,
            other => Some(other.as_str()),
        }
    }

    fn param_schema(param: &ToolParameter) -> Value {
        let mut prop = Map::new();
        if let Some(schema_type) = Self::type_keyword(param.param_type) {
            prop.insert("type".to_string(), json!(schema_type));
        }
        if !param.description.is_empty() {
            prop.insert("description".to_string(), json!(param.description));
        }
        if let Some(default) = &param.default {
            prop.insert("default".to_string(), default.clone());
        }

        let constraints = &param.constraints;
        if let Some(allowed) = &constraints.allowed {
            prop.insert("enum".to_string(), json!(allowed));
        }
        if let Some(minimum) = constraints.minimum {
            prop.insert("minimum".to_string(), json!(minimum));
        }
        if let Some(maximum) = constraints.maximum {
            prop.insert("maximum".to_string(), json!(maximum));
        }
        if let Some(items) = constraints.items {
            let item_schema = match Self::type_keyword(items) {
                Some(t) => json!({"type": t}),
                None => json!({}),
            };
            prop.insert("items".to_string(), item_schema);
        }
        if let Some(min_items) = constraints.min_items {
            prop.insert("minItems".to_string(), json!(min_items));
        }
        if let Some(max_items) = constraints.max_items {
            prop.insert("maxItems".to_string(), json!(max_items));
        }
        Value::Object(prop)
    }
}
