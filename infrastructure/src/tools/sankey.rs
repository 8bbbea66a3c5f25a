//! Sankey diagram tools
//!
//! Flows are rows with `source`, `target` and `value` fields.

use super::support::{
    ToolBinding, ToolResult, arg_f64, arg_str, bind, fail, into_state, literal, push_filter,
    set_opacity_condition, spec_object,
};
use chartscout_domain::{
    ChartState, ChartType, ParamType, ToolArguments, ToolCategory, ToolDescriptor, ToolOutcome,
    ToolParameter,
};
use serde_json::{Value, json};
use std::collections::BTreeMap;

pub const FILTER_FLOW: &str = "filter_flow";
pub const HIGHLIGHT_PATH: &str = "highlight_path";
pub const TRACE_NODE: &str = "trace_node";

pub fn descriptors() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::new(
            FILTER_FLOW,
            ToolCategory::Action,
            "Hide flows smaller than a minimum value",
        )
        .with_param(
            "min_value",
            ToolParameter::new(ParamType::Number, "Smallest flow to keep")
                .required()
                .with_range(Some(0.0), None),
        )
        .applicable_to(ChartType::SankeyDiagram),
        ToolDescriptor::new(
            HIGHLIGHT_PATH,
            ToolCategory::Action,
            "Highlight the flow from one node to another",
        )
        .with_param(
            "source",
            ToolParameter::new(ParamType::String, "Source node").required(),
        )
        .with_param(
            "target",
            ToolParameter::new(ParamType::String, "Target node").required(),
        )
        .applicable_to(ChartType::SankeyDiagram),
        ToolDescriptor::new(
            TRACE_NODE,
            ToolCategory::Analysis,
            "Highlight every flow into or out of a node and report its inflow and outflow",
        )
        .with_param(
            "node_name",
            ToolParameter::new(ParamType::String, "Node to trace").required(),
        )
        .applicable_to(ChartType::SankeyDiagram),
    ]
}

pub fn bindings() -> Vec<ToolBinding> {
    vec![
        bind(FILTER_FLOW, filter_flow),
        bind(HIGHLIGHT_PATH, highlight_path),
        bind(TRACE_NODE, trace_node),
    ]
}

struct Flow<'a> {
    source: &'a str,
    target: &'a str,
    value: f64,
}

fn flows(rows: &[Value]) -> Vec<Flow<'_>> {
    rows.iter()
        .filter_map(|row| {
            Some(Flow {
                source: row.get("source")?.as_str()?,
                target: row.get("target")?.as_str()?,
                value: row.get("value").and_then(Value::as_f64).unwrap_or(0.0),
            })
        })
        .collect()
}

fn filter_flow(state: &ChartState, args: &ToolArguments) -> ToolResult {
    let min_value = arg_f64(args, "min_value")?;
    let all = flows(state.data_values());
    let remaining = all.iter().filter(|f| f.value >= min_value).count();

    let mut spec = spec_object(state)?;
    push_filter(
        &mut spec,
        format!("datum.value >= {}", literal(&json!(min_value))),
    );
    Ok(ToolOutcome::new(json!({
        "min_value": min_value,
        "remaining_count": remaining,
        "total_count": all.len(),
    }))
    .with_state(into_state(spec)))
}

fn highlight_path(state: &ChartState, args: &ToolArguments) -> ToolResult {
    let source = arg_str(args, "source")?;
    let target = arg_str(args, "target")?;
    let all = flows(state.data_values());
    let matching: Vec<&Flow> = all
        .iter()
        .filter(|f| f.source == source && f.target == target)
        .collect();
    if !all.is_empty() && matching.is_empty() {
        return Err(fail(format!("no flow from '{}' to '{}'", source, target)));
    }

    let mut spec = spec_object(state)?;
    let test = format!(
        "datum.source == {} && datum.target == {}",
        json!(source),
        json!(target)
    );
    set_opacity_condition(&mut spec, test, 0.2);
    Ok(ToolOutcome::new(json!({
        "source": source,
        "target": target,
        "value": matching.iter().map(|f| f.value).sum::<f64>(),
    }))
    .with_state(into_state(spec)))
}

fn trace_node(state: &ChartState, args: &ToolArguments) -> ToolResult {
    let node = arg_str(args, "node_name")?;
    let all = flows(state.data_values());

    let mut upstream: BTreeMap<&str, f64> = BTreeMap::new();
    let mut downstream: BTreeMap<&str, f64> = BTreeMap::new();
    for flow in &all {
        if flow.target == node {
            *upstream.entry(flow.source).or_default() += flow.value;
        }
        if flow.source == node {
            *downstream.entry(flow.target).or_default() += flow.value;
        }
    }
    if !all.is_empty() && upstream.is_empty() && downstream.is_empty() {
        return Err(fail(format!("node '{}' has no flows", node)));
    }

    let mut spec = spec_object(state)?;
    let name = json!(node);
    set_opacity_condition(
        &mut spec,
        format!("datum.source == {} || datum.target == {}", name, name),
        0.2,
    );
    Ok(ToolOutcome::new(json!({
        "node": node,
        "inflow": upstream.values().sum::<f64>(),
        "outflow": downstream.values().sum::<f64>(),
        "upstream": upstream,
        "downstream": downstream,
    }))
    .with_state(into_state(spec)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::support::args;

    fn sankey() -> ChartState {
        ChartState::new(json!({
            "usermeta": {"chart_type": "sankey_diagram"},
            "data": {"values": [
                {"source": "Home", "target": "Search", "value": 50},
                {"source": "Home", "target": "Cart", "value": 5},
                {"source": "Search", "target": "Cart", "value": 30},
                {"source": "Cart", "target": "Checkout", "value": 20},
            ]},
            "mark": "rect",
        }))
    }

    #[test]
    fn test_filter_flow() {
        let outcome = filter_flow(&sankey(), &args(json!({"min_value": 20}))).unwrap();
        assert_eq!(outcome.payload["remaining_count"], 3);
        let spec = outcome.state.unwrap().into_spec();
        assert_eq!(spec["transform"][0]["filter"], "datum.value >= 20");
    }

    #[test]
    fn test_highlight_path() {
        let outcome = highlight_path(
            &sankey(),
            &args(json!({"source": "Search", "target": "Cart"})),
        )
        .unwrap();
        assert_eq!(outcome.payload["value"], 30.0);
        let spec = outcome.state.unwrap().into_spec();
        assert_eq!(
            spec["encoding"]["opacity"]["condition"]["test"],
            "datum.source == \"Search\" && datum.target == \"Cart\""
        );

        assert!(
            highlight_path(&sankey(), &args(json!({"source": "Cart", "target": "Home"})))
                .is_err()
        );
    }

    #[test]
    fn test_trace_node() {
        let outcome = trace_node(&sankey(), &args(json!({"node_name": "Cart"}))).unwrap();
        assert_eq!(outcome.payload["inflow"], 35.0);
        assert_eq!(outcome.payload["outflow"], 20.0);
        assert_eq!(outcome.payload["upstream"]["Search"], 30.0);
        assert!(trace_node(&sankey(), &args(json!({"node_name": "Nowhere"}))).is_err());
    }
}
