//! Tools applicable to every chart type: data summary, tooltip lookup,
//! zoom, filter, brush, encoding changes and category highlighting.

use super::stats;
use super::support::{
    ToolBinding, ToolResult, arg_numbers, arg_range, arg_str, array_literal, bind, channel_field,
    channel_type, child, clip_marks, datum, fail, has_field, into_state, loosely_equal,
    primary_encoding, push_filter, range_test, require_field, set_opacity_condition,
    set_scale_domain, spec_object, xy_points,
};
use chartscout_domain::{
    ChartState, ParamType, ToolArguments, ToolCategory, ToolDescriptor, ToolFailure, ToolOutcome,
    ToolParameter,
};
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, BTreeSet};

/// Tool name constants
pub const GET_DATA_SUMMARY: &str = "get_data_summary";
pub const GET_TOOLTIP_DATA: &str = "get_tooltip_data";
pub const ZOOM: &str = "zoom";
pub const FILTER: &str = "filter";
pub const BRUSH: &str = "brush";
pub const CHANGE_ENCODING: &str = "change_encoding";
pub const HIGHLIGHT: &str = "highlight";

/// Categories listed per categorical field
const MAX_LISTED_CATEGORIES: usize = 20;

const ENCODING_CHANNELS: [&str; 9] = [
    "x", "y", "color", "size", "shape", "opacity", "detail", "row", "column",
];

pub fn descriptors() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::new(
            GET_DATA_SUMMARY,
            ToolCategory::Perception,
            "Statistical summary of the chart data: numeric fields get mean, std, min, max and median; categorical fields get their categories and counts",
        )
        .with_param(
            "scope",
            ToolParameter::new(
                ParamType::String,
                "'all' for every row, 'visible' for rows inside the current axis domains",
            )
            .with_default("all")
            .one_of(["all", "visible"]),
        ),
        ToolDescriptor::new(
            GET_TOOLTIP_DATA,
            ToolCategory::Perception,
            "Return the data point nearest to an (x, y) position in data coordinates",
        )
        .with_param(
            "position",
            ToolParameter::new(ParamType::Array, "[x, y] in data coordinates")
                .required()
                .with_items(ParamType::Number, Some(2), Some(2)),
        ),
        ToolDescriptor::new(
            ZOOM,
            ToolCategory::Action,
            "Zoom the x/y axes to an area. Points outside stay in the data but are clipped from view",
        )
        .with_param(
            "area",
            ToolParameter::new(ParamType::Array, "[x1, y1, x2, y2] corners of the area")
                .required()
                .with_items(ParamType::Number, Some(4), Some(4)),
        ),
        ToolDescriptor::new(
            FILTER,
            ToolCategory::Action,
            "Keep only rows whose numeric dimension lies within a range",
        )
        .with_param(
            "dimension",
            ToolParameter::new(ParamType::String, "Field to filter on").required(),
        )
        .with_param(
            "range",
            ToolParameter::new(ParamType::Array, "[min, max] inclusive")
                .required()
                .with_items(ParamType::Number, Some(2), Some(2)),
        ),
        ToolDescriptor::new(
            BRUSH,
            ToolCategory::Action,
            "Select the points inside an area; everything else is dimmed",
        )
        .with_param(
            "area",
            ToolParameter::new(ParamType::Array, "[x1, y1, x2, y2] corners of the area")
                .required()
                .with_items(ParamType::Number, Some(4), Some(4)),
        ),
        ToolDescriptor::new(
            CHANGE_ENCODING,
            ToolCategory::Action,
            "Bind a data field to an encoding channel; the field type is inferred from the data",
        )
        .with_param(
            "channel",
            ToolParameter::new(ParamType::String, "Encoding channel")
                .required()
                .one_of(ENCODING_CHANNELS),
        )
        .with_param(
            "field_name",
            ToolParameter::new(ParamType::String, "Data field to encode").required(),
        ),
        ToolDescriptor::new(
            HIGHLIGHT,
            ToolCategory::Action,
            "Highlight one category (or a list of categories) of the primary categorical field",
        )
        .with_param(
            "category",
            ToolParameter::new(ParamType::Any, "Category value or list of values").required(),
        ),
    ]
}

pub fn bindings() -> Vec<ToolBinding> {
    vec![
        bind(GET_DATA_SUMMARY, get_data_summary),
        bind(GET_TOOLTIP_DATA, get_tooltip_data),
        bind(ZOOM, zoom),
        bind(FILTER, filter),
        bind(BRUSH, brush),
        bind(CHANGE_ENCODING, change_encoding),
        bind(HIGHLIGHT, highlight),
    ]
}

fn get_data_summary(state: &ChartState, args: &ToolArguments) -> ToolResult {
    let all_rows = state.data_values();
    if all_rows.is_empty() {
        return Err(fail("chart has no data rows"));
    }

    let scope = arg_str(args, "scope")?;
    let rows: Vec<&Value> = match scope {
        "visible" => {
            let domains = numeric_domains(state.spec());
            all_rows
                .iter()
                .filter(|row| {
                    domains.iter().all(|(field, lo, hi)| {
                        row.get(field)
                            .and_then(Value::as_f64)
                            .is_some_and(|v| v >= *lo && v <= *hi)
                    })
                })
                .collect()
        }
        _ => all_rows.iter().collect(),
    };

    let field_names: BTreeSet<&str> = rows
        .iter()
        .filter_map(|row| row.as_object())
        .flat_map(|row| row.keys().map(String::as_str))
        .collect();

    let mut numeric = Map::new();
    let mut categorical = Map::new();
    for name in field_names {
        let values: Vec<&Value> = rows
            .iter()
            .filter_map(|row| row.get(name))
            .filter(|v| !v.is_null())
            .collect();
        if values.is_empty() {
            continue;
        }

        if values.iter().all(|v| v.is_number()) {
            let numbers: Vec<f64> = values.iter().filter_map(|v| v.as_f64()).collect();
            if let Some(d) = stats::describe(&numbers) {
                numeric.insert(
                    name.to_string(),
                    json!({
                        "mean": d.mean,
                        "std": d.std,
                        "min": d.min,
                        "max": d.max,
                        "median": d.median,
                    }),
                );
            }
        } else {
            let mut distribution: BTreeMap<String, usize> = BTreeMap::new();
            for value in values {
                let key = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                *distribution.entry(key).or_default() += 1;
            }
            let categories: Vec<&String> =
                distribution.keys().take(MAX_LISTED_CATEGORIES).collect();
            categorical.insert(
                name.to_string(),
                json!({
                    "unique_count": distribution.len(),
                    "categories": categories,
                    "distribution": distribution,
                }),
            );
        }
    }

    Ok(ToolOutcome::new(json!({
        "scope": scope,
        "count": rows.len(),
        "total_count": all_rows.len(),
        "numeric_fields": numeric,
        "categorical_fields": categorical,
    })))
}

/// `(field, lo, hi)` for every encoded channel with a numeric scale domain
fn numeric_domains(spec: &Value) -> Vec<(String, f64, f64)> {
    let Some(encoding) = primary_encoding(spec) else {
        return Vec::new();
    };
    encoding
        .values()
        .filter_map(|channel| {
            let field = channel.get("field")?.as_str()?;
            let domain = channel.pointer("/scale/domain")?.as_array()?;
            match domain.as_slice() {
                [lo, hi] => Some((field.to_string(), lo.as_f64()?, hi.as_f64()?)),
                _ => None,
            }
        })
        .collect()
}

fn get_tooltip_data(state: &ChartState, args: &ToolArguments) -> ToolResult {
    let position = arg_numbers(args, "position")?;
    let [px, py] = position.as_slice() else {
        return Err(fail("'position' must be [x, y]"));
    };
    let spec = state.spec();
    let x = require_field(spec, "x")?;
    let y = require_field(spec, "y")?;

    let rows = state.data_values();
    let nearest = xy_points(rows, &x, &y)
        .into_iter()
        .map(|(i, xv, yv)| (i, ((xv - px).powi(2) + (yv - py).powi(2)).sqrt()))
        .min_by(|a, b| a.1.total_cmp(&b.1));

    match nearest {
        Some((index, distance)) => Ok(ToolOutcome::new(json!({
            "data": rows[index],
            "distance": distance,
        }))),
        None => Err(fail(format!("no data point with numeric '{}' and '{}'", x, y))),
    }
}

/// `(x_lo, x_hi), (y_lo, y_hi)` from `[x1, y1, x2, y2]`
fn area_bounds(
    args: &ToolArguments,
    name: &str,
) -> Result<((f64, f64), (f64, f64)), ToolFailure> {
    match arg_numbers(args, name)?.as_slice() {
        [x1, y1, x2, y2] => Ok(((x1.min(*x2), x1.max(*x2)), (y1.min(*y2), y1.max(*y2)))),
        other => Err(fail(format!(
            "'{}' must have exactly 4 numbers, got {}",
            name,
            other.len()
        ))),
    }
}

/// Set both axis domains and clip marks to them. Rows are kept; fails when
/// no point lies inside the area.
pub(crate) fn zoom_to(
    state: &ChartState,
    (x_lo, x_hi): (f64, f64),
    (y_lo, y_hi): (f64, f64),
) -> ToolResult {
    let spec = state.spec();
    let x = require_field(spec, "x")?;
    let y = require_field(spec, "y")?;
    let points = xy_points(state.data_values(), &x, &y);
    let visible = points
        .iter()
        .filter(|(_, xv, yv)| *xv >= x_lo && *xv <= x_hi && *yv >= y_lo && *yv <= y_hi)
        .count();
    if visible == 0 {
        return Err(fail(format!(
            "no data points in range x:[{}, {}], y:[{}, {}]",
            x_lo, x_hi, y_lo, y_hi
        )));
    }

    let mut new_spec = spec_object(state)?;
    set_scale_domain(&mut new_spec, "x", json!([x_lo, x_hi]));
    set_scale_domain(&mut new_spec, "y", json!([y_lo, y_hi]));
    clip_marks(&mut new_spec);

    let total = points.len();
    Ok(ToolOutcome::new(json!({
        "zoom_range": {"x": [x_lo, x_hi], "y": [y_lo, y_hi]},
        "visible_count": visible,
        "total_count": total,
        "message": format!("showing {} of {} points", visible, total),
    }))
    .with_state(into_state(new_spec)))
}

fn zoom(state: &ChartState, args: &ToolArguments) -> ToolResult {
    let (x_range, y_range) = area_bounds(args, "area")?;
    zoom_to(state, x_range, y_range)
}

fn filter(state: &ChartState, args: &ToolArguments) -> ToolResult {
    filter_range(state, arg_str(args, "dimension")?, arg_range(args, "range")?)
}

/// Append an inclusive range filter on a numeric field
pub(crate) fn filter_range(state: &ChartState, dimension: &str, (lo, hi): (f64, f64)) -> ToolResult {
    let rows = state.data_values();
    if !has_field(rows, dimension) {
        return Err(fail(format!("unknown field '{}'", dimension)));
    }

    let remaining = rows
        .iter()
        .filter_map(|row| row.get(dimension).and_then(Value::as_f64))
        .filter(|v| *v >= lo && *v <= hi)
        .count();

    let mut new_spec = spec_object(state)?;
    push_filter(&mut new_spec, range_test(dimension, lo, hi));
    Ok(ToolOutcome::new(json!({
        "dimension": dimension,
        "range": [lo, hi],
        "remaining_count": remaining,
        "total_count": rows.len(),
    }))
    .with_state(into_state(new_spec)))
}

fn brush(state: &ChartState, args: &ToolArguments) -> ToolResult {
    let ((x_lo, x_hi), (y_lo, y_hi)) = area_bounds(args, "area")?;
    let spec = state.spec();
    let x = require_field(spec, "x")?;
    let y = require_field(spec, "y")?;
    let selected = xy_points(state.data_values(), &x, &y)
        .iter()
        .filter(|(_, xv, yv)| *xv >= x_lo && *xv <= x_hi && *yv >= y_lo && *yv <= y_hi)
        .count();

    let mut new_spec = spec_object(state)?;
    let test = format!(
        "{} && {}",
        range_test(&x, x_lo, x_hi),
        range_test(&y, y_lo, y_hi)
    );
    set_opacity_condition(&mut new_spec, test, 0.3);
    Ok(ToolOutcome::new(json!({
        "brush_range": {"x": [x_lo, x_hi], "y": [y_lo, y_hi]},
        "selected_count": selected,
        "total_count": state.data_values().len(),
    }))
    .with_state(into_state(new_spec)))
}

/// Vega-Lite type for a field, from its first non-null value
fn infer_field_type(rows: &[Value], field: &str) -> &'static str {
    let first = rows
        .iter()
        .filter_map(|row| row.get(field))
        .find(|v| !v.is_null());
    match first {
        Some(Value::Number(_)) => "quantitative",
        Some(Value::String(s)) if s.contains(['-', '/', ':']) => "temporal",
        _ => "nominal",
    }
}

fn change_encoding(state: &ChartState, args: &ToolArguments) -> ToolResult {
    let channel = arg_str(args, "channel")?;
    let field = arg_str(args, "field_name")?;
    let rows = state.data_values();
    if !has_field(rows, field) {
        return Err(fail(format!("unknown field '{}'", field)));
    }
    let field_type = infer_field_type(rows, field);

    let mut new_spec = spec_object(state)?;
    child(&mut new_spec, "encoding").insert(
        channel.to_string(),
        json!({"field": field, "type": field_type}),
    );
    Ok(ToolOutcome::new(json!({
        "channel": channel,
        "field": field,
        "type": field_type,
    }))
    .with_state(into_state(new_spec)))
}

/// First nominal or ordinal field among color, x and y
fn primary_category_field(spec: &Value) -> String {
    ["color", "x", "y"]
        .into_iter()
        .find_map(|channel| {
            let field = channel_field(spec, channel)?;
            matches!(
                channel_type(spec, channel).as_deref(),
                Some("nominal" | "ordinal")
            )
            .then_some(field)
        })
        .unwrap_or_else(|| "category".to_string())
}

fn highlight(state: &ChartState, args: &ToolArguments) -> ToolResult {
    let categories: Vec<Value> = match args.get("category") {
        Some(Value::Array(list)) => list.clone(),
        Some(Value::Null) | None => return Err(fail("'category' is required")),
        Some(single) => vec![single.clone()],
    };
    let field = primary_category_field(state.spec());
    let matched = state
        .data_values()
        .iter()
        .filter_map(|row| row.get(&field))
        .filter(|v| categories.iter().any(|c| loosely_equal(v, c)))
        .count();

    let mut new_spec = spec_object(state)?;
    let test = format!("indexof({}, {}) >= 0", array_literal(&categories), datum(&field));
    set_opacity_condition(&mut new_spec, test, 0.2);
    Ok(ToolOutcome::new(json!({
        "field": field,
        "categories": categories,
        "matched_count": matched,
    }))
    .with_state(into_state(new_spec)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::support::args;

    fn scatter() -> ChartState {
        ChartState::new(json!({
            "mark": "point",
            "data": {"values": [
                {"x": 1, "y": 1, "group": "a"},
                {"x": 2, "y": 3, "group": "a"},
                {"x": 10, "y": 12, "group": "b"},
                {"x": 11, "y": 14, "group": "b"},
            ]},
            "encoding": {
                "x": {"field": "x", "type": "quantitative"},
                "y": {"field": "y", "type": "quantitative"},
                "color": {"field": "group", "type": "nominal"},
            },
        }))
    }

    #[test]
    fn test_data_summary_all() {
        let outcome = get_data_summary(&scatter(), &args(json!({"scope": "all"}))).unwrap();
        let payload = outcome.payload;
        assert!(outcome.state.is_none());
        assert_eq!(payload["count"], 4);
        assert_eq!(payload["numeric_fields"]["x"]["min"], 1.0);
        assert_eq!(payload["numeric_fields"]["x"]["max"], 11.0);
        assert_eq!(payload["categorical_fields"]["group"]["unique_count"], 2);
        assert_eq!(payload["categorical_fields"]["group"]["distribution"]["a"], 2);
    }

    #[test]
    fn test_data_summary_visible_follows_zoom() {
        let zoomed = zoom(&scatter(), &args(json!({"area": [0, 0, 5, 5]})))
            .unwrap()
            .state
            .unwrap();
        let payload = get_data_summary(&zoomed, &args(json!({"scope": "visible"})))
            .unwrap()
            .payload;
        assert_eq!(payload["count"], 2);
        assert_eq!(payload["total_count"], 4);
    }

    #[test]
    fn test_data_summary_without_rows_fails() {
        let empty = ChartState::new(json!({"mark": "point"}));
        assert!(get_data_summary(&empty, &args(json!({"scope": "all"}))).is_err());
    }

    #[test]
    fn test_tooltip_finds_nearest_point() {
        let payload = get_tooltip_data(&scatter(), &args(json!({"position": [10.2, 12.5]})))
            .unwrap()
            .payload;
        assert_eq!(payload["data"]["x"], 10);
        assert!(payload["distance"].as_f64().unwrap() < 1.0);
    }

    #[test]
    fn test_zoom_keeps_rows_and_sets_domains() {
        let state = scatter();
        let outcome = zoom(&state, &args(json!({"area": [5, 15, 0, 0]}))).unwrap();
        let spec = outcome.state.unwrap().into_spec();
        assert_eq!(spec["data"]["values"].as_array().unwrap().len(), 4);
        assert_eq!(spec["encoding"]["x"]["scale"]["domain"], json!([0.0, 5.0]));
        assert_eq!(spec["encoding"]["y"]["scale"]["domain"], json!([0.0, 15.0]));
        assert_eq!(spec["mark"]["clip"], true);
        assert_eq!(outcome.payload["visible_count"], 2);
        // input untouched
        assert_eq!(state.spec()["mark"], "point");
    }

    #[test]
    fn test_zoom_on_empty_area_fails() {
        let err = zoom(&scatter(), &args(json!({"area": [100, 100, 200, 200]}))).unwrap_err();
        assert!(err.message.contains("no data points"));
    }

    #[test]
    fn test_filter_appends_transform() {
        let outcome = filter(
            &scatter(),
            &args(json!({"dimension": "x", "range": [5, 20]})),
        )
        .unwrap();
        let spec = outcome.state.unwrap().into_spec();
        assert_eq!(
            spec["transform"][0]["filter"],
            "datum.x >= 5 && datum.x <= 20"
        );
        assert_eq!(outcome.payload["remaining_count"], 2);

        assert!(
            filter(&scatter(), &args(json!({"dimension": "nope", "range": [0, 1]}))).is_err()
        );
    }

    #[test]
    fn test_brush_dims_outside() {
        let outcome = brush(&scatter(), &args(json!({"area": [0, 0, 5, 5]}))).unwrap();
        let spec = outcome.state.unwrap().into_spec();
        assert_eq!(spec["encoding"]["opacity"]["value"], 0.3);
        assert_eq!(outcome.payload["selected_count"], 2);
    }

    #[test]
    fn test_change_encoding_infers_type() {
        let outcome = change_encoding(
            &scatter(),
            &args(json!({"channel": "shape", "field_name": "group"})),
        )
        .unwrap();
        assert_eq!(outcome.payload["type"], "nominal");
        let spec = outcome.state.unwrap().into_spec();
        assert_eq!(spec["encoding"]["shape"]["field"], "group");

        let rows = [json!({"d": "2024-01-01"})];
        assert_eq!(infer_field_type(&rows, "d"), "temporal");
        assert!(
            change_encoding(
                &scatter(),
                &args(json!({"channel": "x", "field_name": "missing"}))
            )
            .is_err()
        );
    }

    #[test]
    fn test_highlight_uses_primary_category() {
        let outcome = highlight(&scatter(), &args(json!({"category": "b"}))).unwrap();
        assert_eq!(outcome.payload["field"], "group");
        assert_eq!(outcome.payload["matched_count"], 2);
        let spec = outcome.state.unwrap().into_spec();
        assert_eq!(
            spec["encoding"]["opacity"]["condition"]["test"],
            "indexof([\"b\"], datum.group) >= 0"
        );
    }
}
