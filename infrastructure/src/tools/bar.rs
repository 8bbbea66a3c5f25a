//! Bar chart tools

use super::support::{
    ToolBinding, ToolResult, arg_i64, arg_list, arg_str, array_literal, bind, channel_field,
    channel_mut, datum, fail, has_field, into_state, literal, loosely_equal, push_filter,
    require_field, set_channel, set_opacity_condition, spec_object,
};
use chartscout_domain::{
    ChartState, ChartType, ParamType, ToolArguments, ToolCategory, ToolDescriptor, ToolOutcome,
    ToolParameter,
};
use serde_json::{Value, json};

pub const SORT_BARS: &str = "sort_bars";
pub const FILTER_CATEGORIES: &str = "filter_categories";
pub const HIGHLIGHT_TOP_N: &str = "highlight_top_n";
pub const COMPARE_GROUPS: &str = "compare_groups";

fn order_param() -> ToolParameter {
    ToolParameter::new(ParamType::String, "Sort direction")
        .with_default("descending")
        .one_of(["ascending", "descending"])
}

pub fn descriptors() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::new(
            SORT_BARS,
            ToolCategory::Action,
            "Sort the bars by their value",
        )
        .with_param("order", order_param())
        .applicable_to(ChartType::BarChart),
        ToolDescriptor::new(
            FILTER_CATEGORIES,
            ToolCategory::Action,
            "Show only the listed categories",
        )
        .with_param(
            "categories",
            ToolParameter::new(ParamType::Array, "Categories to keep")
                .required()
                .with_items(ParamType::Any, Some(1), None),
        )
        .applicable_to(ChartType::BarChart),
        ToolDescriptor::new(
            HIGHLIGHT_TOP_N,
            ToolCategory::Action,
            "Highlight the n highest (or lowest) bars and dim the rest",
        )
        .with_param(
            "n",
            ToolParameter::new(ParamType::Integer, "Number of bars to highlight")
                .with_default(2)
                .with_range(Some(1.0), None),
        )
        .with_param("order", order_param())
        .applicable_to(ChartType::BarChart),
        ToolDescriptor::new(
            COMPARE_GROUPS,
            ToolCategory::Action,
            "Color the bars by a grouping field",
        )
        .with_param(
            "group_field",
            ToolParameter::new(ParamType::String, "Field to group by").required(),
        )
        .applicable_to(ChartType::BarChart),
    ]
}

pub fn bindings() -> Vec<ToolBinding> {
    vec![
        bind(SORT_BARS, sort_bars),
        bind(FILTER_CATEGORIES, filter_categories),
        bind(HIGHLIGHT_TOP_N, highlight_top_n),
        bind(COMPARE_GROUPS, compare_groups),
    ]
}

fn sort_bars(state: &ChartState, args: &ToolArguments) -> ToolResult {
    let order = arg_str(args, "order")?;
    let value_field = require_field(state.spec(), "y")?;

    let mut spec = spec_object(state)?;
    channel_mut(&mut spec, "x").insert(
        "sort".to_string(),
        json!({"field": value_field, "order": order}),
    );
    Ok(ToolOutcome::new(json!({"sorted_by": value_field, "order": order}))
        .with_state(into_state(spec)))
}

fn filter_categories(state: &ChartState, args: &ToolArguments) -> ToolResult {
    let categories = arg_list(args, "categories")?;
    let category_field = require_field(state.spec(), "x")?;
    let rows = state.data_values();
    let kept = rows
        .iter()
        .filter_map(|row| row.get(&category_field))
        .filter(|v| categories.iter().any(|c| loosely_equal(v, c)))
        .count();
    if !rows.is_empty() && kept == 0 {
        return Err(fail(format!(
            "none of the categories occur in '{}'",
            category_field
        )));
    }

    let mut spec = spec_object(state)?;
    push_filter(
        &mut spec,
        format!(
            "indexof({}, {}) >= 0",
            array_literal(categories),
            datum(&category_field)
        ),
    );
    Ok(ToolOutcome::new(json!({
        "field": category_field,
        "categories": categories,
        "remaining_count": kept,
    }))
    .with_state(into_state(spec)))
}

fn highlight_top_n(state: &ChartState, args: &ToolArguments) -> ToolResult {
    let n = usize::try_from(arg_i64(args, "n")?).map_err(|_| fail("'n' must be positive"))?;
    let descending = arg_str(args, "order")? == "descending";
    let spec_value = state.spec();
    let value_field = require_field(spec_value, "y")?;
    let rows = state.data_values();
    if rows.is_empty() {
        return Err(fail("chart has no data rows"));
    }

    let mut ranked: Vec<&Value> = rows
        .iter()
        .filter(|row| row.get(&value_field).is_some_and(Value::is_number))
        .collect();
    ranked.sort_by(|a, b| {
        let va = a[value_field.as_str()].as_f64().unwrap_or(0.0);
        let vb = b[value_field.as_str()].as_f64().unwrap_or(0.0);
        if descending { vb.total_cmp(&va) } else { va.total_cmp(&vb) }
    });
    ranked.truncate(n);
    if ranked.is_empty() {
        return Err(fail(format!("no numeric values in '{}'", value_field)));
    }

    let field_expr = datum(&value_field);
    let test = ranked
        .iter()
        .map(|row| format!("{} == {}", field_expr, literal(&row[value_field.as_str()])))
        .collect::<Vec<_>>()
        .join(" || ");

    let mut spec = spec_object(state)?;
    set_opacity_condition(&mut spec, test, 0.3);

    let category_field = channel_field(spec_value, "x");
    let top: Vec<Value> = ranked
        .iter()
        .map(|row| match &category_field {
            Some(field) => json!({"category": row.get(field), "value": row[value_field.as_str()]}),
            None => json!({"value": row[value_field.as_str()]}),
        })
        .collect();
    Ok(ToolOutcome::new(json!({
        "highlighted": top,
        "order": if descending { "descending" } else { "ascending" },
    }))
    .with_state(into_state(spec)))
}

fn compare_groups(state: &ChartState, args: &ToolArguments) -> ToolResult {
    let group_field = arg_str(args, "group_field")?;
    if !has_field(state.data_values(), group_field) {
        return Err(fail(format!("unknown field '{}'", group_field)));
    }
    let mut groups: Vec<&Value> = Vec::new();
    for value in state.data_values().iter().filter_map(|row| row.get(group_field)) {
        if !groups.contains(&value) {
            groups.push(value);
        }
    }

    let mut spec = spec_object(state)?;
    set_channel(&mut spec, "color", group_field, "nominal");
    Ok(ToolOutcome::new(json!({
        "group_field": group_field,
        "groups": groups,
    }))
    .with_state(into_state(spec)))
}
