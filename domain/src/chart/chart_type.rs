//! Chart type classification

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The kind of chart a session explores.
///
/// Tools declare which chart types they apply to; an empty applicability set
/// means the tool works on every chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartType {
    BarChart,
    LineChart,
    ScatterPlot,
    Heatmap,
    ParallelCoordinates,
    SankeyDiagram,
    Unknown,
}

impl Default for ChartType {
    fn default() -> Self {
        ChartType::Unknown
    }
}

impl ChartType {
    /// All concrete chart types (excluding `Unknown`)
    pub const ALL: [ChartType; 6] = [
        ChartType::BarChart,
        ChartType::LineChart,
        ChartType::ScatterPlot,
        ChartType::Heatmap,
        ChartType::ParallelCoordinates,
        ChartType::SankeyDiagram,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChartType::BarChart => "bar_chart",
            ChartType::LineChart => "line_chart",
            ChartType::ScatterPlot => "scatter_plot",
            ChartType::Heatmap => "heatmap",
            ChartType::ParallelCoordinates => "parallel_coordinates",
            ChartType::SankeyDiagram => "sankey_diagram",
            ChartType::Unknown => "unknown",
        }
    }

    /// Infer the chart type from a Vega-Lite specification.
    ///
    /// Resolution order:
    /// 1. An explicit `usermeta.chart_type` hint
    /// 2. A `fold` transform (parallel coordinates are drawn from folded dimensions)
    /// 3. The mark type of the spec (or its first layer)
    pub fn detect(spec: &serde_json::Value) -> ChartType {
        if let Some(hint) = spec
            .pointer("/usermeta/chart_type")
            .and_then(|v| v.as_str())
            && let Ok(chart_type) = hint.parse::<ChartType>()
        {
            return chart_type;
        }

        let has_fold = spec
            .get("transform")
            .and_then(|t| t.as_array())
            .is_some_and(|transforms| transforms.iter().any(|t| t.get("fold").is_some()));
        if has_fold {
            return ChartType::ParallelCoordinates;
        }

        let mark = spec
            .get("mark")
            .or_else(|| spec.pointer("/layer/0/mark"))
            .and_then(|mark| match mark {
                serde_json::Value::String(s) => Some(s.as_str()),
                serde_json::Value::Object(obj) => obj.get("type").and_then(|t| t.as_str()),
                _ => None,
            });

        match mark {
            Some("bar") => ChartType::BarChart,
            Some("line") | Some("area") | Some("trail") => ChartType::LineChart,
            Some("point") | Some("circle") | Some("square") => ChartType::ScatterPlot,
            Some("rect") => ChartType::Heatmap,
            _ => ChartType::Unknown,
        }
    }
}

impl std::fmt::Display for ChartType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ChartType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "bar_chart" | "bar" => Ok(ChartType::BarChart),
            "line_chart" | "line" => Ok(ChartType::LineChart),
            "scatter_plot" | "scatter" => Ok(ChartType::ScatterPlot),
            "heatmap" => Ok(ChartType::Heatmap),
            "parallel_coordinates" | "parallel" => Ok(ChartType::ParallelCoordinates),
            "sankey_diagram" | "sankey" => Ok(ChartType::SankeyDiagram),
            "unknown" => Ok(ChartType::Unknown),
            other => Err(format!("unknown chart type: {}", other)),
        }
    }
}
