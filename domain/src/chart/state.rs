//! Chart state value object

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Snapshot of the declarative chart specification a session is exploring.
///
/// Wraps a Vega-Lite JSON document. Accessors tolerate missing sections; tools
/// that need to modify the spec work on a clone obtained from
/// [`to_spec`](Self::to_spec) and wrap the result in a new `ChartState`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChartState {
    spec: Value,
}

impl ChartState {
    pub fn new(spec: Value) -> Self {
        Self { spec }
    }

    /// Borrow the underlying specification
    pub fn spec(&self) -> &Value {
        &self.spec
    }

    /// Clone the specification for modification
    pub fn to_spec(&self) -> Value {
        self.spec.clone()
    }

    pub fn into_spec(self) -> Value {
        self.spec
    }

    /// Inline data rows (`data.values`), empty if absent
    pub fn data_values(&self) -> &[Value] {
        self.spec
            .pointer("/data/values")
            .and_then(|v| v.as_array())
            .map(|rows| rows.as_slice())
            .unwrap_or(&[])
    }

    /// The encoding object of the spec, falling back to the first layer's encoding
    pub fn encoding(&self) -> Option<&serde_json::Map<String, Value>> {
        self.spec
            .get("encoding")
            .or_else(|| self.spec.pointer("/layer/0/encoding"))
            .and_then(|v| v.as_object())
    }

    /// Field bound to an encoding channel (e.g. `x`, `y`, `color`)
    pub fn encoding_field(&self, channel: &str) -> Option<&str> {
        self.encoding()?
            .get(channel)?
            .get("field")?
            .as_str()
    }

    /// Measurement type of an encoding channel (`quantitative`, `nominal`, ...)
    pub fn encoding_type(&self, channel: &str) -> Option<&str> {
        self.encoding()?
            .get(channel)?
            .get("type")?
            .as_str()
    }

    /// Mark type, accepting both `"mark": "bar"` and `"mark": {"type": "bar"}`
    pub fn mark_type(&self) -> Option<&str> {
        match self.spec.get("mark")? {
            Value::String(s) => Some(s.as_str()),
            Value::Object(obj) => obj.get("type").and_then(|t| t.as_str()),
            _ => None,
        }
    }

    /// Number of transforms currently applied
    pub fn transform_count(&self) -> usize {
        self.spec
            .get("transform")
            .and_then(|t| t.as_array())
            .map_or(0, |t| t.len())
    }
}

impl From<Value> for ChartState {
    fn from(spec: Value) -> Self {
        Self::new(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scatter() -> ChartState {
        ChartState::new(json!({
            "mark": {"type": "point"},
            "data": {"values": [{"d": 1, "a": 2}, {"d": 3, "a": 4}]},
            "encoding": {
                "x": {"field": "d", "type": "quantitative"},
                "y": {"field": "a", "type": "quantitative"}
            }
        }))
    }

    #[test]
    fn test_accessors() {
        let state = scatter();
        assert_eq!(state.data_values().len(), 2);
        assert_eq!(state.encoding_field("x"), Some("d"));
        assert_eq!(state.encoding_type("y"), Some("quantitative"));
        assert_eq!(state.encoding_field("color"), None);
        assert_eq!(state.mark_type(), Some("point"));
        assert_eq!(state.transform_count(), 0);
    }

    #[test]
    fn test_layer_encoding_fallback() {
        let state = ChartState::new(json!({
            "layer": [{"mark": "line", "encoding": {"x": {"field": "date"}}}]
        }));
        assert_eq!(state.encoding_field("x"), Some("date"));
        assert!(state.data_values().is_empty());
    }

    #[test]
    fn test_transparent_serde() {
        let state = scatter();
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["mark"]["type"], "point");
        let back: ChartState = serde_json::from_value(value).unwrap();
        assert_eq!(back, state);
    }
}
