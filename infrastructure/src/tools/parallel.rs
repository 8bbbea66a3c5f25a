//! Parallel coordinates tools
//!
//! A parallel coordinates chart is a line chart over folded dimensions: a
//! `fold` transform turns each row into one `(key, value)` row per dimension
//! and the x channel encodes the key.

use super::common::filter_range;
use super::support::{
    ToolBinding, ToolResult, arg_i64, arg_list, arg_range, arg_str, bind, channel_mut, datum,
    fail, into_state, set_opacity_condition, spec_object,
};
use chartscout_domain::{
    ChartState, ChartType, ParamType, ToolArguments, ToolCategory, ToolDescriptor, ToolOutcome,
    ToolParameter,
};
use serde_json::{Value, json};

pub const FILTER_DIMENSION: &str = "filter_dimension";
pub const HIGHLIGHT_CLUSTER: &str = "highlight_cluster";
pub const REORDER_DIMENSIONS: &str = "reorder_dimensions";

pub fn descriptors() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::new(
            FILTER_DIMENSION,
            ToolCategory::Action,
            "Keep only the lines whose value on one dimension lies within a range",
        )
        .with_param(
            "dimension",
            ToolParameter::new(ParamType::String, "Dimension to filter on").required(),
        )
        .with_param(
            "range",
            ToolParameter::new(ParamType::Array, "[min, max] inclusive")
                .required()
                .with_items(ParamType::Number, Some(2), Some(2)),
        )
        .applicable_to(ChartType::ParallelCoordinates),
        ToolDescriptor::new(
            HIGHLIGHT_CLUSTER,
            ToolCategory::Action,
            "Highlight the lines of one cluster and fade the others",
        )
        .with_param(
            "cluster_id",
            ToolParameter::new(ParamType::Integer, "Cluster to highlight")
                .required()
                .with_range(Some(0.0), None),
        )
        .applicable_to(ChartType::ParallelCoordinates),
        ToolDescriptor::new(
            REORDER_DIMENSIONS,
            ToolCategory::Action,
            "Reorder the axes; dimensions not listed keep their relative order after the listed ones",
        )
        .with_param(
            "dimension_order",
            ToolParameter::new(ParamType::Array, "Dimension names in the new order")
                .required()
                .with_items(ParamType::String, Some(1), None),
        )
        .applicable_to(ChartType::ParallelCoordinates),
    ]
}

pub fn bindings() -> Vec<ToolBinding> {
    vec![
        bind(FILTER_DIMENSION, filter_dimension),
        bind(HIGHLIGHT_CLUSTER, highlight_cluster),
        bind(REORDER_DIMENSIONS, reorder_dimensions),
    ]
}

fn filter_dimension(state: &ChartState, args: &ToolArguments) -> ToolResult {
    filter_range(state, arg_str(args, "dimension")?, arg_range(args, "range")?)
}

/// `cluster` when the rows have it, else the first `cluster_*` field
fn cluster_field(rows: &[Value]) -> String {
    let Some(first) = rows.first().and_then(Value::as_object) else {
        return "cluster".to_string();
    };
    if first.contains_key("cluster") {
        return "cluster".to_string();
    }
    first
        .keys()
        .find(|k| k.starts_with("cluster_"))
        .cloned()
        .unwrap_or_else(|| "cluster".to_string())
}

fn highlight_cluster(state: &ChartState, args: &ToolArguments) -> ToolResult {
    let cluster_id = arg_i64(args, "cluster_id")?;
    let rows = state.data_values();
    let field = cluster_field(rows);
    let members = rows
        .iter()
        .filter(|row| row.get(&field).and_then(Value::as_i64) == Some(cluster_id))
        .count();

    let mut spec = spec_object(state)?;
    set_opacity_condition(
        &mut spec,
        format!("{} == {}", datum(&field), cluster_id),
        0.1,
    );
    Ok(ToolOutcome::new(json!({
        "cluster_field": field,
        "cluster_id": cluster_id,
        "member_count": members,
    }))
    .with_state(into_state(spec)))
}

fn reorder_dimensions(state: &ChartState, args: &ToolArguments) -> ToolResult {
    let requested: Vec<String> = arg_list(args, "dimension_order")?
        .iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect();

    let mut spec = spec_object(state)?;
    let Some(fold) = spec
        .get_mut("transform")
        .and_then(Value::as_array_mut)
        .and_then(|transforms| {
            transforms
                .iter_mut()
                .find_map(|t| t.get_mut("fold").and_then(Value::as_array_mut))
        })
    else {
        return Err(fail("chart has no fold transform listing its dimensions"));
    };

    let current: Vec<String> = fold
        .iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect();
    if let Some(unknown) = requested.iter().find(|d| !current.contains(d)) {
        return Err(fail(format!(
            "unknown dimension '{}'; dimensions are {:?}",
            unknown, current
        )));
    }

    let mut order: Vec<String> = Vec::with_capacity(current.len());
    for dimension in requested.iter().chain(current.iter()) {
        if !order.contains(dimension) {
            order.push(dimension.clone());
        }
    }
    *fold = order.iter().map(|d| json!(d)).collect();
    channel_mut(&mut spec, "x").insert("sort".to_string(), json!(order));

    Ok(ToolOutcome::new(json!({
        "previous_order": current,
        "dimension_order": order,
    }))
    .with_state(into_state(spec)))
}
