//! Heatmap tools

use super::support::{
    ToolBinding, ToolResult, arg_bool, arg_f64, arg_list, arg_list_opt, arg_str, array_literal,
    bind, channel_mut, datum, fail, into_state, primary_encoding, push_filter, range_test,
    require_field, set_opacity_condition, spec_object,
};
use chartscout_domain::{
    ChartState, ChartType, ParamType, ToolArguments, ToolCategory, ToolDescriptor, ToolFailure,
    ToolOutcome, ToolParameter,
};
use serde_json::{Value, json};

pub const ADJUST_COLOR_SCALE: &str = "adjust_color_scale";
pub const FILTER_CELLS: &str = "filter_cells";
pub const HIGHLIGHT_REGION: &str = "highlight_region";
pub const CLUSTER_ROWS_COLS: &str = "cluster_rows_cols";
pub const SELECT_SUBMATRIX: &str = "select_submatrix";

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

fn values_param(description: &str) -> ToolParameter {
    ToolParameter::new(ParamType::Array, description).with_items(ParamType::Any, Some(1), None)
}

pub fn descriptors() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::new(
            ADJUST_COLOR_SCALE,
            ToolCategory::Action,
            "Change the color scheme of the cells (e.g. viridis, blues, redblue)",
        )
        .with_param(
            "scheme",
            ToolParameter::new(ParamType::String, "Vega color scheme name").with_default("viridis"),
        )
        .applicable_to(ChartType::Heatmap),
        ToolDescriptor::new(
            FILTER_CELLS,
            ToolCategory::Action,
            "Keep only cells whose value lies within [min_value, max_value]",
        )
        .with_param(
            "min_value",
            ToolParameter::new(ParamType::Number, "Lower bound").required(),
        )
        .with_param(
            "max_value",
            ToolParameter::new(ParamType::Number, "Upper bound").required(),
        )
        .applicable_to(ChartType::Heatmap),
        ToolDescriptor::new(
            HIGHLIGHT_REGION,
            ToolCategory::Action,
            "Highlight the cells at the given columns and rows",
        )
        .with_param("x_values", values_param("Column values").required())
        .with_param("y_values", values_param("Row values").required())
        .applicable_to(ChartType::Heatmap),
        ToolDescriptor::new(
            CLUSTER_ROWS_COLS,
            ToolCategory::Action,
            "Reorder rows and/or columns by an aggregate of the cell values",
        )
        .with_param(
            "cluster_rows",
            ToolParameter::new(ParamType::Boolean, "Reorder rows").with_default(true),
        )
        .with_param(
            "cluster_cols",
            ToolParameter::new(ParamType::Boolean, "Reorder columns").with_default(true),
        )
        .with_param(
            "method",
            ToolParameter::new(ParamType::String, "Aggregate used for ordering")
                .with_default("sum")
                .one_of(["sum", "mean", "max"]),
        )
        .applicable_to(ChartType::Heatmap),
        ToolDescriptor::new(
            SELECT_SUBMATRIX,
            ToolCategory::Action,
            "Keep only the given columns and/or rows; time units such as month or year are matched on the unit",
        )
        .with_param("x_values", values_param("Columns to keep"))
        .with_param("y_values", values_param("Rows to keep"))
        .applicable_to(ChartType::Heatmap),
    ]
}

pub fn bindings() -> Vec<ToolBinding> {
    vec![
        bind(ADJUST_COLOR_SCALE, adjust_color_scale),
        bind(FILTER_CELLS, filter_cells),
        bind(HIGHLIGHT_REGION, highlight_region),
        bind(CLUSTER_ROWS_COLS, cluster_rows_cols),
        bind(SELECT_SUBMATRIX, select_submatrix),
    ]
}

fn adjust_color_scale(state: &ChartState, args: &ToolArguments) -> ToolResult {
    let scheme = arg_str(args, "scheme")?;
    let mut spec = spec_object(state)?;
    channel_mut(&mut spec, "color").insert("scale".to_string(), json!({"scheme": scheme}));
    Ok(ToolOutcome::new(json!({"scheme": scheme})).with_state(into_state(spec)))
}

fn filter_cells(state: &ChartState, args: &ToolArguments) -> ToolResult {
    let min = arg_f64(args, "min_value")?;
    let max = arg_f64(args, "max_value")?;
    let (lo, hi) = (min.min(max), min.max(max));
    let value_field = require_field(state.spec(), "color")?;
    let remaining = state
        .data_values()
        .iter()
        .filter_map(|row| row.get(&value_field).and_then(Value::as_f64))
        .filter(|v| *v >= lo && *v <= hi)
        .count();

    let mut spec = spec_object(state)?;
    push_filter(&mut spec, range_test(&value_field, lo, hi));
    Ok(ToolOutcome::new(json!({
        "field": value_field,
        "range": [lo, hi],
        "remaining_count": remaining,
    }))
    .with_state(into_state(spec)))
}

fn highlight_region(state: &ChartState, args: &ToolArguments) -> ToolResult {
    let xs = arg_list(args, "x_values")?;
    let ys = arg_list(args, "y_values")?;
    let x = require_field(state.spec(), "x")?;
    let y = require_field(state.spec(), "y")?;

    let mut spec = spec_object(state)?;
    let test = format!(
        "indexof({}, {}) >= 0 && indexof({}, {}) >= 0",
        array_literal(xs),
        datum(&x),
        array_literal(ys),
        datum(&y)
    );
    set_opacity_condition(&mut spec, test, 0.3);
    Ok(ToolOutcome::new(json!({
        "x_values": xs,
        "y_values": ys,
    }))
    .with_state(into_state(spec)))
}

fn cluster_rows_cols(state: &ChartState, args: &ToolArguments) -> ToolResult {
    let rows = arg_bool(args, "cluster_rows")?;
    let cols = arg_bool(args, "cluster_cols")?;
    let method = arg_str(args, "method")?;
    let value_field = require_field(state.spec(), "color")?;
    let sort = json!({"op": method, "field": value_field, "order": "descending"});

    let mut spec = spec_object(state)?;
    let mut sorted = Vec::new();
    for (enabled, channel) in [(rows, "y"), (cols, "x")] {
        if enabled && primary_encoding(state.spec()).is_some_and(|e| e.contains_key(channel)) {
            channel_mut(&mut spec, channel).insert("sort".to_string(), sort.clone());
            sorted.push(channel);
        }
    }
    Ok(ToolOutcome::new(json!({
        "sorted_channels": sorted,
        "method": method,
    }))
    .with_state(into_state(spec)))
}

fn time_unit(spec: &Value, channel: &str) -> Option<String> {
    let unit = primary_encoding(spec)?.get(channel)?.get("timeUnit")?;
    unit.as_str()
        .or_else(|| unit.get("unit").and_then(Value::as_str))
        .map(str::to_string)
}

fn whole_number(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_f64().map(|f| f as i64),
        Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f as i64),
        _ => None,
    }
}

/// Month index (0 = January) for a full or three-letter month name, or a number
fn month_index(value: &Value) -> Option<i64> {
    if let Some(name) = value.as_str() {
        let name = name.trim().to_lowercase();
        if let Some(index) = MONTHS
            .iter()
            .position(|m| *m == name || (name.len() == 3 && m.starts_with(name.as_str())))
        {
            return Some(index as i64);
        }
    }
    whole_number(value)
}

/// `indexof([...], unit(datum.field)) >= 0`, or a plain membership test without a time unit
fn membership_test(
    values: &[Value],
    field: &str,
    unit: Option<&str>,
) -> Result<String, ToolFailure> {
    let numbers = |convert: fn(&Value) -> Option<i64>| -> Result<String, ToolFailure> {
        values
            .iter()
            .map(|v| {
                convert(v)
                    .map(|n| n.to_string())
                    .ok_or_else(|| fail(format!("cannot match {} on time unit {:?}", v, unit)))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(|parts| format!("[{}]", parts.join(",")))
    };
    let (list, target) = match unit {
        None => (array_literal(values), datum(field)),
        Some(u @ ("date" | "year")) => (numbers(whole_number)?, format!("{}({})", u, datum(field))),
        Some("month") => {
            let parts: Vec<String> = values
                .iter()
                .map(|v| match month_index(v) {
                    Some(i) => i.to_string(),
                    None => v.to_string(),
                })
                .collect();
            (
                format!("[{}]", parts.join(",")),
                format!("month({})", datum(field)),
            )
        }
        Some(other) => (array_literal(values), format!("{}({})", other, datum(field))),
    };
    Ok(format!("indexof({}, {}) >= 0", list, target))
}

fn select_submatrix(state: &ChartState, args: &ToolArguments) -> ToolResult {
    let xs = arg_list_opt(args, "x_values").filter(|v| !v.is_empty());
    let ys = arg_list_opt(args, "y_values").filter(|v| !v.is_empty());
    if xs.is_none() && ys.is_none() {
        return Err(fail("at least one of 'x_values' or 'y_values' is required"));
    }

    let source = state.spec();
    let mut tests = Vec::new();
    for (values, channel) in [(xs, "x"), (ys, "y")] {
        if let Some(values) = values
            && let Ok(field) = require_field(source, channel)
        {
            let unit = time_unit(source, channel);
            tests.push(membership_test(values, &field, unit.as_deref())?);
        }
    }
    if tests.is_empty() {
        return Err(fail("chart has no x or y field to select on"));
    }

    let mut spec = spec_object(state)?;
    push_filter(&mut spec, tests.join(" && "));
    Ok(ToolOutcome::new(json!({
        "columns": xs.map_or(json!("all"), |v| json!(v.len())),
        "rows": ys.map_or(json!("all"), |v| json!(v.len())),
    }))
    .with_state(into_state(spec)))
}
