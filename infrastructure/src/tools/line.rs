//! Line chart tools
//!
//! These work on single-view and layered specs alike; axis fields are read
//! from the top-level encoding or, failing that, from the first layer.

use super::stats;
use super::support::{
    ToolBinding, ToolResult, arg_f64, arg_str, bind, channel_field, channel_type, child,
    clip_marks, ensure_layered, fail, into_state, numeric_column, primary_encoding_mut,
    require_field, spec_object,
};
use chartscout_domain::{
    ChartState, ChartType, ParamType, ToolArguments, ToolCategory, ToolDescriptor, ToolOutcome,
    ToolParameter,
};
use serde_json::{Value, json};

pub const ZOOM_TIME_RANGE: &str = "zoom_time_range";
pub const HIGHLIGHT_TREND: &str = "highlight_trend";
pub const COMPARE_SERIES: &str = "compare_series";
pub const DETECT_ANOMALIES: &str = "detect_anomalies";

/// Anomalies listed in the payload
const MAX_LISTED_ANOMALIES: usize = 10;

pub fn descriptors() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::new(
            ZOOM_TIME_RANGE,
            ToolCategory::Action,
            "Zoom the time axis to [start, end] without removing data",
        )
        .with_param(
            "start",
            ToolParameter::new(ParamType::Any, "Start of the range, e.g. \"2023-01-01\"")
                .required(),
        )
        .with_param(
            "end",
            ToolParameter::new(ParamType::Any, "End of the range").required(),
        )
        .applicable_to(ChartType::LineChart),
        ToolDescriptor::new(
            HIGHLIGHT_TREND,
            ToolCategory::Analysis,
            "Overlay a regression trend line and report the fitted slope",
        )
        .with_param(
            "trend_type",
            ToolParameter::new(ParamType::String, "Trend to look for")
                .with_default("increasing")
                .one_of(["increasing", "decreasing"]),
        )
        .applicable_to(ChartType::LineChart),
        ToolDescriptor::new(
            COMPARE_SERIES,
            ToolCategory::Action,
            "Split the line into one colored series per value of a field",
        )
        .with_param(
            "series_field",
            ToolParameter::new(ParamType::String, "Field identifying the series").required(),
        )
        .applicable_to(ChartType::LineChart),
        ToolDescriptor::new(
            DETECT_ANOMALIES,
            ToolCategory::Analysis,
            "Mark values more than `threshold` standard deviations from the mean",
        )
        .with_param(
            "threshold",
            ToolParameter::new(ParamType::Number, "Z-score threshold")
                .with_default(2.0)
                .with_range(Some(0.0), None),
        )
        .applicable_to(ChartType::LineChart),
    ]
}

pub fn bindings() -> Vec<ToolBinding> {
    vec![
        bind(ZOOM_TIME_RANGE, zoom_time_range),
        bind(HIGHLIGHT_TREND, highlight_trend),
        bind(COMPARE_SERIES, compare_series),
        bind(DETECT_ANOMALIES, detect_anomalies),
    ]
}

/// Channel carrying time: a temporal x or y, else x, else y
fn time_channel(spec: &Value) -> Option<&'static str> {
    ["x", "y"]
        .into_iter()
        .find(|c| channel_type(spec, c).as_deref() == Some("temporal"))
        .or_else(|| ["x", "y"].into_iter().find(|c| channel_field(spec, c).is_some()))
}

fn channel_type_or(spec: &Value, channel: &str, fallback: &str) -> String {
    channel_type(spec, channel).unwrap_or_else(|| fallback.to_string())
}

fn zoom_time_range(state: &ChartState, args: &ToolArguments) -> ToolResult {
    let start = args.get("start").cloned().unwrap_or(Value::Null);
    let end = args.get("end").cloned().unwrap_or(Value::Null);
    if start.is_null() || end.is_null() {
        return Err(fail("'start' and 'end' are required"));
    }
    let Some(axis) = time_channel(state.spec()) else {
        return Err(fail("chart has no time field on x or y"));
    };
    let field = require_field(state.spec(), axis)?;

    let mut spec = spec_object(state)?;
    child(child(primary_encoding_mut(&mut spec), axis), "scale")
        .insert("domain".to_string(), json!([start, end]));
    clip_marks(&mut spec);
    Ok(ToolOutcome::new(json!({
        "field": field,
        "axis": axis,
        "range": [start, end],
    }))
    .with_state(into_state(spec)))
}

fn highlight_trend(state: &ChartState, args: &ToolArguments) -> ToolResult {
    let trend_type = arg_str(args, "trend_type")?;
    let source = state.spec();
    let x = require_field(source, "x")?;
    let y = require_field(source, "y")?;
    let x_type = channel_type_or(source, "x", "temporal");
    let y_type = channel_type_or(source, "y", "quantitative");

    let values = numeric_column(state.data_values(), &y);
    let slope = stats::trend_slope(&values);
    let observed = match slope {
        Some(s) if s > 0.0 => "increasing",
        Some(s) if s < 0.0 => "decreasing",
        _ => "flat",
    };

    let mut spec = spec_object(state)?;
    ensure_layered(&mut spec).push(json!({
        "mark": {"type": "line", "color": "red", "strokeDash": [5, 5], "strokeWidth": 2},
        "transform": [{"regression": y, "on": x}],
        "encoding": {
            "x": {"field": x, "type": x_type},
            "y": {"field": y, "type": y_type},
        },
    }));
    Ok(ToolOutcome::new(json!({
        "trend_type": trend_type,
        "slope": slope,
        "observed_trend": observed,
        "matches_requested": observed == trend_type,
    }))
    .with_state(into_state(spec)))
}

fn compare_series(state: &ChartState, args: &ToolArguments) -> ToolResult {
    let series_field = arg_str(args, "series_field")?;
    let rows = state.data_values();
    if let Some(first) = rows.first()
        && first.get(series_field).is_none()
    {
        return Err(fail(format!("field '{}' not found in data", series_field)));
    }
    let mut series: Vec<&Value> = Vec::new();
    for value in rows.iter().filter_map(|row| row.get(series_field)) {
        if !series.contains(&value) {
            series.push(value);
        }
    }

    let mut spec = spec_object(state)?;
    let encoding = primary_encoding_mut(&mut spec);
    encoding.insert(
        "color".to_string(),
        json!({"field": series_field, "type": "nominal", "legend": {"title": series_field}}),
    );
    encoding
        .entry("detail".to_string())
        .or_insert_with(|| json!({"field": series_field, "type": "nominal"}));
    Ok(ToolOutcome::new(json!({
        "series_field": series_field,
        "series": series,
    }))
    .with_state(into_state(spec)))
}

fn detect_anomalies(state: &ChartState, args: &ToolArguments) -> ToolResult {
    let threshold = arg_f64(args, "threshold")?;
    if threshold <= 0.0 {
        return Err(fail("'threshold' must be greater than 0"));
    }
    let source = state.spec();
    let y = require_field(source, "y")?;
    let x = channel_field(source, "x");

    let rows: Vec<&Value> = state
        .data_values()
        .iter()
        .filter(|row| row.get(&y).is_some_and(Value::is_number))
        .collect();
    if rows.len() < 3 {
        return Err(fail("anomaly detection needs at least 3 values"));
    }
    let values: Vec<f64> = rows.iter().filter_map(|row| row[y.as_str()].as_f64()).collect();
    let mean = stats::mean(&values);
    let std = stats::std_dev(&values, mean);
    let anomalies: Vec<Value> = stats::z_score_outliers(&values, threshold)
        .into_iter()
        .map(|i| rows[i].clone())
        .collect();

    let mut outcome_state = state.clone();
    if !anomalies.is_empty() {
        let mut encoding = json!({
            "y": {"field": y, "type": channel_type_or(source, "y", "quantitative")},
            "tooltip": [{"field": y, "type": "quantitative", "title": "Value (anomaly)"}],
        });
        if let Some(x) = &x {
            let x_type = channel_type_or(source, "x", "temporal");
            encoding["x"] = json!({"field": x, "type": x_type});
            if let Some(Value::Array(tooltip)) = encoding.get_mut("tooltip") {
                tooltip.insert(0, json!({"field": x, "type": x_type, "title": "Time"}));
            }
        }
        let mut spec = spec_object(state)?;
        ensure_layered(&mut spec).push(json!({
            "data": {"values": anomalies},
            "mark": {"type": "point", "color": "red", "size": 100, "filled": true},
            "encoding": encoding,
        }));
        outcome_state = into_state(spec);
    }

    let listed: Vec<&Value> = anomalies.iter().take(MAX_LISTED_ANOMALIES).collect();
    Ok(ToolOutcome::new(json!({
        "anomaly_count": anomalies.len(),
        "anomalies": listed,
        "mean": mean,
        "std": std,
        "threshold": threshold,
    }))
    .with_state(outcome_state))
}
