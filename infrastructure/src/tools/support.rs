//! Helpers shared by the chart tool bodies: argument access, Vega-Lite
//! specification editing, and Vega expression formatting.

use chartscout_domain::{ChartState, ChartTool, ToolArguments, ToolFailure, ToolOutcome};
use serde_json::{Map, Value, json};
use std::sync::Arc;

pub(crate) type ToolResult = Result<ToolOutcome, ToolFailure>;

/// A tool name bound to its implementation
pub type ToolBinding = (&'static str, Arc<dyn ChartTool>);

pub(crate) fn bind<T: ChartTool + 'static>(name: &'static str, tool: T) -> ToolBinding {
    (name, Arc::new(tool))
}

pub(crate) fn fail(message: impl Into<String>) -> ToolFailure {
    ToolFailure::new(message)
}

// ==================== Arguments ====================

pub(crate) fn arg_str<'a>(args: &'a ToolArguments, name: &str) -> Result<&'a str, ToolFailure> {
    args.get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| fail(format!("'{}' must be a string", name)))
}

pub(crate) fn arg_f64(args: &ToolArguments, name: &str) -> Result<f64, ToolFailure> {
    args.get(name)
        .and_then(Value::as_f64)
        .ok_or_else(|| fail(format!("'{}' must be a number", name)))
}

pub(crate) fn arg_i64(args: &ToolArguments, name: &str) -> Result<i64, ToolFailure> {
    args.get(name)
        .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
        .ok_or_else(|| fail(format!("'{}' must be an integer", name)))
}

pub(crate) fn arg_bool(args: &ToolArguments, name: &str) -> Result<bool, ToolFailure> {
    args.get(name)
        .and_then(Value::as_bool)
        .ok_or_else(|| fail(format!("'{}' must be a boolean", name)))
}

pub(crate) fn arg_list<'a>(args: &'a ToolArguments, name: &str) -> Result<&'a [Value], ToolFailure> {
    args.get(name)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .ok_or_else(|| fail(format!("'{}' must be an array", name)))
}

/// Optional array argument; `null` counts as absent
pub(crate) fn arg_list_opt<'a>(args: &'a ToolArguments, name: &str) -> Option<&'a [Value]> {
    args.get(name).and_then(Value::as_array).map(Vec::as_slice)
}

pub(crate) fn arg_numbers(args: &ToolArguments, name: &str) -> Result<Vec<f64>, ToolFailure> {
    arg_list(args, name)?
        .iter()
        .map(|v| {
            v.as_f64()
                .ok_or_else(|| fail(format!("'{}' must contain only numbers", name)))
        })
        .collect()
}

/// `[lo, hi]` from a two-element numeric argument, ordered
pub(crate) fn arg_range(args: &ToolArguments, name: &str) -> Result<(f64, f64), ToolFailure> {
    match arg_numbers(args, name)?.as_slice() {
        [a, b] => Ok((a.min(*b), a.max(*b))),
        other => Err(fail(format!(
            "'{}' must have exactly 2 numbers, got {}",
            name,
            other.len()
        ))),
    }
}

// ==================== Specification access ====================

/// Encoding block of the spec, or of its first layer
pub(crate) fn primary_encoding(spec: &Value) -> Option<&Map<String, Value>> {
    spec.get("encoding")
        .and_then(Value::as_object)
        .or_else(|| spec.pointer("/layer/0/encoding").and_then(Value::as_object))
}

pub(crate) fn channel_field(spec: &Value, channel: &str) -> Option<String> {
    primary_encoding(spec)?
        .get(channel)?
        .get("field")?
        .as_str()
        .map(str::to_string)
}

pub(crate) fn channel_type(spec: &Value, channel: &str) -> Option<String> {
    primary_encoding(spec)?
        .get(channel)?
        .get("type")?
        .as_str()
        .map(str::to_string)
}

pub(crate) fn require_field(spec: &Value, channel: &str) -> Result<String, ToolFailure> {
    channel_field(spec, channel)
        .ok_or_else(|| fail(format!("chart has no field encoded on the '{}' channel", channel)))
}

/// Whether any row carries `field`; vacuously true without rows
pub(crate) fn has_field(rows: &[Value], field: &str) -> bool {
    rows.is_empty() || rows.iter().any(|row| row.get(field).is_some_and(|v| !v.is_null()))
}

/// Rows whose `x` and `y` fields are both numeric, as `(index, x, y)`
pub(crate) fn xy_points(rows: &[Value], x: &str, y: &str) -> Vec<(usize, f64, f64)> {
    rows.iter()
        .enumerate()
        .filter_map(|(i, row)| {
            let xv = row.get(x)?.as_f64()?;
            let yv = row.get(y)?.as_f64()?;
            Some((i, xv, yv))
        })
        .collect()
}

pub(crate) fn numeric_column(rows: &[Value], field: &str) -> Vec<f64> {
    rows.iter()
        .filter_map(|row| row.get(field).and_then(Value::as_f64))
        .collect()
}

// ==================== Specification editing ====================

/// Mutable copy of the chart specification, which must be an object
pub(crate) fn spec_object(state: &ChartState) -> Result<Map<String, Value>, ToolFailure> {
    match state.to_spec() {
        Value::Object(map) => Ok(map),
        _ => Err(fail("chart specification is not a JSON object")),
    }
}

pub(crate) fn into_state(spec: Map<String, Value>) -> ChartState {
    ChartState::new(Value::Object(spec))
}

/// Child object under `key`, created (or replaced if not an object) on demand
pub(crate) fn child<'a>(map: &'a mut Map<String, Value>, key: &str) -> &'a mut Map<String, Value> {
    let slot = map.entry(key.to_string()).or_insert(Value::Null);
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    match slot {
        Value::Object(object) => object,
        _ => unreachable!("slot was just set to an object"),
    }
}

/// Encoding block that [`primary_encoding`] reads: the top-level one, else
/// the first layer's, else a new top-level block
pub(crate) fn primary_encoding_mut(spec: &mut Map<String, Value>) -> &mut Map<String, Value> {
    let in_layer = !spec.get("encoding").is_some_and(Value::is_object)
        && spec
            .get("layer")
            .and_then(|layers| layers.get(0))
            .is_some_and(Value::is_object);
    if in_layer {
        match spec.get_mut("layer").and_then(|layers| layers.get_mut(0)) {
            Some(Value::Object(first)) => child(first, "encoding"),
            _ => unreachable!("first layer was just checked to be an object"),
        }
    } else {
        child(spec, "encoding")
    }
}

/// Encoding channel of the spec, created on demand
pub(crate) fn channel_mut<'a>(
    spec: &'a mut Map<String, Value>,
    channel: &str,
) -> &'a mut Map<String, Value> {
    child(child(spec, "encoding"), channel)
}

/// Bind `field` with Vega-Lite `kind` to a channel, keeping other channel properties
pub(crate) fn set_channel(spec: &mut Map<String, Value>, channel: &str, field: &str, kind: &str) {
    let channel = channel_mut(spec, channel);
    channel.insert("field".to_string(), json!(field));
    channel.insert("type".to_string(), json!(kind));
}

pub(crate) fn set_scale_domain(spec: &mut Map<String, Value>, channel: &str, domain: Value) {
    child(channel_mut(spec, channel), "scale").insert("domain".to_string(), domain);
}

/// Append a `{"filter": expr}` transform
pub(crate) fn push_filter(spec: &mut Map<String, Value>, expression: String) {
    let transforms = spec
        .entry("transform".to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    if !transforms.is_array() {
        *transforms = Value::Array(Vec::new());
    }
    if let Value::Array(list) = transforms {
        list.push(json!({ "filter": expression }));
    }
}

/// Full opacity where `test` holds, `dimmed` elsewhere
pub(crate) fn set_opacity_condition(spec: &mut Map<String, Value>, test: String, dimmed: f64) {
    child(spec, "encoding").insert(
        "opacity".to_string(),
        json!({
            "condition": {"test": test, "value": 1.0},
            "value": dimmed,
        }),
    );
}

/// Set `clip: true` on a mark, turning a shorthand mark into an object
fn clip_mark(mark: &mut Value) {
    match mark {
        Value::Object(object) => {
            object.insert("clip".to_string(), Value::Bool(true));
        }
        Value::String(kind) => {
            *mark = json!({"type": kind.clone(), "clip": true});
        }
        _ => {}
    }
}

/// Clip the top-level mark and the marks of every layer
pub(crate) fn clip_marks(spec: &mut Map<String, Value>) {
    if let Some(mark) = spec.get_mut("mark") {
        clip_mark(mark);
    }
    if let Some(Value::Array(layers)) = spec.get_mut("layer") {
        for layer in layers {
            if let Some(mark) = layer.get_mut("mark") {
                clip_mark(mark);
            }
        }
    }
}

/// Move a single-view spec's `mark` and `encoding` into a first layer.
/// Already-layered specs are left alone.
pub(crate) fn ensure_layered(spec: &mut Map<String, Value>) -> &mut Vec<Value> {
    if !matches!(spec.get("layer"), Some(Value::Array(_))) {
        let mark = spec.remove("mark").unwrap_or_else(|| json!("line"));
        let encoding = spec.remove("encoding").unwrap_or_else(|| json!({}));
        spec.insert(
            "layer".to_string(),
            json!([{ "mark": mark, "encoding": encoding }]),
        );
    }
    match spec.get_mut("layer") {
        Some(Value::Array(layers)) => layers,
        _ => unreachable!("layer was just set to an array"),
    }
}

// ==================== Vega expressions ====================

/// `datum.field`, or `datum["field"]` for names that are not identifiers
pub(crate) fn datum(field: &str) -> String {
    let is_identifier = field
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && field
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if is_identifier {
        format!("datum.{}", field)
    } else {
        format!("datum[{}]", Value::String(field.to_string()))
    }
}

/// Number literal without a trailing `.0` for whole values
pub(crate) fn number_literal(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Expression literal for an arbitrary JSON scalar
pub(crate) fn literal(value: &Value) -> String {
    match value {
        Value::Number(n) => n.as_f64().map(number_literal).unwrap_or_else(|| n.to_string()),
        other => other.to_string(),
    }
}

/// `[v1,v2,...]` array literal
pub(crate) fn array_literal(values: &[Value]) -> String {
    format!(
        "[{}]",
        values.iter().map(literal).collect::<Vec<_>>().join(",")
    )
}

/// `datum.f >= lo && datum.f <= hi`
pub(crate) fn range_test(field: &str, lo: f64, hi: f64) -> String {
    let d = datum(field);
    format!(
        "{d} >= {} && {d} <= {}",
        number_literal(lo),
        number_literal(hi)
    )
}

/// Whether a JSON value equals a string, number or boolean given by the model
pub(crate) fn loosely_equal(actual: &Value, wanted: &Value) -> bool {
    match (actual.as_f64(), wanted.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => match (actual, wanted) {
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Number(a), Value::String(b)) | (Value::String(b), Value::Number(a)) => {
                &a.to_string() == b
            }
            (a, b) => a == b,
        },
    }
}

/// Argument map from a JSON object literal
#[cfg(test)]
pub(crate) fn args(value: Value) -> ToolArguments {
    match value {
        Value::Object(map) => map.into_iter().collect(),
        _ => ToolArguments::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datum_quotes_non_identifiers() {
        assert_eq!(datum("duration"), "datum.duration");
        assert_eq!(datum("avg price"), "datum[\"avg price\"]");
        assert_eq!(datum("2020"), "datum[\"2020\"]");
    }

    #[test]
    fn test_literals() {
        assert_eq!(number_literal(5.0), "5");
        assert_eq!(number_literal(2.5), "2.5");
        assert_eq!(array_literal(&[json!("a"), json!(3.0), json!(true)]), "[\"a\",3,true]");
        assert_eq!(range_test("x", 0.0, 25.5), "datum.x >= 0 && datum.x <= 25.5");
    }

    #[test]
    fn test_child_replaces_non_objects() {
        let mut spec = Map::new();
        spec.insert("encoding".to_string(), json!("bogus"));
        channel_mut(&mut spec, "x").insert("field".to_string(), json!("a"));
        assert_eq!(spec["encoding"]["x"]["field"], "a");
    }

    #[test]
    fn test_ensure_layered_moves_mark_and_encoding() {
        let mut spec = match json!({"mark": "line", "encoding": {"x": {"field": "t"}}, "data": {}}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let layers = ensure_layered(&mut spec);
        assert_eq!(layers.len(), 1);
        assert!(spec.get("mark").is_none());
        assert_eq!(spec["layer"][0]["encoding"]["x"]["field"], "t");
    }

    #[test]
    fn test_clip_marks() {
        let mut spec = match json!({"mark": "point", "layer": [{"mark": {"type": "line"}}]}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        clip_marks(&mut spec);
        assert_eq!(spec["mark"], json!({"type": "point", "clip": true}));
        assert_eq!(spec["layer"][0]["mark"]["clip"], true);
    }

    #[test]
    fn test_loosely_equal() {
        assert!(loosely_equal(&json!(3), &json!(3.0)));
        assert!(loosely_equal(&json!("A"), &json!("A")));
        assert!(loosely_equal(&json!(2020), &json!("2020")));
        assert!(!loosely_equal(&json!("a"), &json!("b")));
    }
}
