//! Scatter plot tools

use super::common::zoom_to;
use super::stats;
use super::support::{
    ToolBinding, ToolResult, arg_i64, arg_range, arg_str, bind, child, fail, into_state,
    range_test, require_field, set_opacity_condition, spec_object, xy_points,
};
use chartscout_domain::{
    ChartState, ChartType, ParamType, ToolArguments, ToolCategory, ToolDescriptor, ToolOutcome,
    ToolParameter,
};
use serde_json::{Value, json};

pub const SELECT_REGION: &str = "select_region";
pub const IDENTIFY_CLUSTERS: &str = "identify_clusters";
pub const CALCULATE_CORRELATION: &str = "calculate_correlation";
pub const ZOOM_DENSE_AREA: &str = "zoom_dense_area";

fn range_param(axis: &str) -> ToolParameter {
    ToolParameter::new(ParamType::Array, format!("[min, max] on the {} axis", axis))
        .required()
        .with_items(ParamType::Number, Some(2), Some(2))
}

pub fn descriptors() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::new(
            SELECT_REGION,
            ToolCategory::Action,
            "Select the points inside a rectangle and dim the rest",
        )
        .with_param("x_range", range_param("x"))
        .with_param("y_range", range_param("y"))
        .applicable_to(ChartType::ScatterPlot),
        ToolDescriptor::new(
            IDENTIFY_CLUSTERS,
            ToolCategory::Analysis,
            "Group the points into clusters, color them by cluster and report each cluster's size, center and extent",
        )
        .with_param(
            "n_clusters",
            ToolParameter::new(ParamType::Integer, "Number of clusters")
                .with_default(3)
                .with_range(Some(1.0), Some(10.0)),
        )
        .with_param(
            "method",
            ToolParameter::new(ParamType::String, "Clustering algorithm")
                .with_default("kmeans")
                .one_of(["kmeans"]),
        )
        .applicable_to(ChartType::ScatterPlot),
        ToolDescriptor::new(
            CALCULATE_CORRELATION,
            ToolCategory::Analysis,
            "Correlation coefficient between the x and y fields, with strength and direction",
        )
        .with_param(
            "method",
            ToolParameter::new(ParamType::String, "Correlation measure")
                .with_default("pearson")
                .one_of(["pearson", "spearman"]),
        )
        .applicable_to(ChartType::ScatterPlot),
        ToolDescriptor::new(
            ZOOM_DENSE_AREA,
            ToolCategory::Action,
            "Zoom both axes to a dense region; points outside are clipped, not removed",
        )
        .with_param("x_range", range_param("x"))
        .with_param("y_range", range_param("y"))
        .applicable_to(ChartType::ScatterPlot),
    ]
}

pub fn bindings() -> Vec<ToolBinding> {
    vec![
        bind(SELECT_REGION, select_region),
        bind(IDENTIFY_CLUSTERS, identify_clusters),
        bind(CALCULATE_CORRELATION, calculate_correlation),
        bind(ZOOM_DENSE_AREA, zoom_dense_area),
    ]
}

fn select_region(state: &ChartState, args: &ToolArguments) -> ToolResult {
    let (x_lo, x_hi) = arg_range(args, "x_range")?;
    let (y_lo, y_hi) = arg_range(args, "y_range")?;
    let x = require_field(state.spec(), "x")?;
    let y = require_field(state.spec(), "y")?;
    let selected = xy_points(state.data_values(), &x, &y)
        .iter()
        .filter(|(_, xv, yv)| *xv >= x_lo && *xv <= x_hi && *yv >= y_lo && *yv <= y_hi)
        .count();

    let mut spec = spec_object(state)?;
    let test = format!(
        "{} && {}",
        range_test(&x, x_lo, x_hi),
        range_test(&y, y_lo, y_hi)
    );
    set_opacity_condition(&mut spec, test, 0.2);
    Ok(ToolOutcome::new(json!({
        "selected_count": selected,
        "total_count": state.data_values().len(),
    }))
    .with_state(into_state(spec)))
}

fn identify_clusters(state: &ChartState, args: &ToolArguments) -> ToolResult {
    let n = usize::try_from(arg_i64(args, "n_clusters")?)
        .map_err(|_| fail("'n_clusters' must be positive"))?;
    let method = arg_str(args, "method")?;
    if method != "kmeans" {
        return Err(fail(format!("unsupported clustering method '{}'", method)));
    }
    let x = require_field(state.spec(), "x")?;
    let y = require_field(state.spec(), "y")?;

    let indexed = xy_points(state.data_values(), &x, &y);
    let points: Vec<[f64; 2]> = indexed.iter().map(|(_, xv, yv)| [*xv, *yv]).collect();
    let Some(clustering) = stats::kmeans(&points, n) else {
        return Err(fail(format!(
            "not enough points for {} clusters ({} available)",
            n,
            points.len()
        )));
    };

    let cluster_field = format!("cluster_{}", n);
    let mut spec = spec_object(state)?;
    if let Some(rows) = spec
        .get_mut("data")
        .and_then(|data| data.get_mut("values"))
        .and_then(Value::as_array_mut)
    {
        for ((row_index, _, _), label) in indexed.iter().zip(&clustering.labels) {
            if let Some(Value::Object(row)) = rows.get_mut(*row_index) {
                row.insert(cluster_field.clone(), json!(label));
            }
        }
    }
    child(&mut spec, "encoding").insert(
        "color".to_string(),
        json!({
            "field": cluster_field,
            "type": "nominal",
            "scale": {"scheme": "category10"},
            "legend": {"title": "Cluster"},
        }),
    );

    let statistics: Vec<Value> = clustering
        .centers
        .iter()
        .enumerate()
        .map(|(id, center)| {
            let members: Vec<&[f64; 2]> = points
                .iter()
                .zip(&clustering.labels)
                .filter(|(_, label)| **label == id)
                .map(|(p, _)| p)
                .collect();
            let extent = |axis: usize| {
                let lo = members.iter().map(|p| p[axis]).fold(f64::INFINITY, f64::min);
                let hi = members.iter().map(|p| p[axis]).fold(f64::NEG_INFINITY, f64::max);
                if members.is_empty() { json!(null) } else { json!([lo, hi]) }
            };
            json!({
                "cluster_id": id,
                "size": members.len(),
                "center": center,
                "x_range": extent(0),
                "y_range": extent(1),
            })
        })
        .collect();

    Ok(ToolOutcome::new(json!({
        "n_clusters": n,
        "cluster_field": cluster_field,
        "cluster_statistics": statistics,
    }))
    .with_state(into_state(spec)))
}

fn calculate_correlation(state: &ChartState, args: &ToolArguments) -> ToolResult {
    let method = arg_str(args, "method")?;
    let x = require_field(state.spec(), "x")?;
    let y = require_field(state.spec(), "y")?;
    let points = xy_points(state.data_values(), &x, &y);
    if points.len() < 2 {
        return Err(fail("correlation needs at least 2 points"));
    }
    let xs: Vec<f64> = points.iter().map(|p| p.1).collect();
    let ys: Vec<f64> = points.iter().map(|p| p.2).collect();

    let coefficient = match method {
        "pearson" => stats::pearson(&xs, &ys),
        "spearman" => stats::spearman(&xs, &ys),
        other => return Err(fail(format!("unsupported correlation method '{}'", other))),
    }
    .ok_or_else(|| fail("correlation is undefined for a constant series"))?;

    let magnitude = coefficient.abs();
    let strength = if magnitude >= 0.7 {
        "strong"
    } else if magnitude >= 0.4 {
        "moderate"
    } else {
        "weak"
    };
    let direction = if coefficient > 0.0 { "positive" } else { "negative" };
    Ok(ToolOutcome::new(json!({
        "method": method,
        "correlation_coefficient": coefficient,
        "n": points.len(),
        "strength": strength,
        "direction": direction,
    })))
}

fn zoom_dense_area(state: &ChartState, args: &ToolArguments) -> ToolResult {
    zoom_to(state, arg_range(args, "x_range")?, arg_range(args, "y_range")?)
}
