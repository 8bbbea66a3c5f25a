//! Prompt templates for chart exploration

use crate::chart::{ChartState, ChartType};
use crate::tool::entities::ToolDescriptor;
use crate::tool::traits::param_type_label;
use crate::tool::value_objects::ExecutionRecord;
use serde_json::{Value, json};

/// Rows of `data.values` shown to the model; the rest is summarized by count
const SNAPSHOT_ROWS: usize = 5;

/// Templates for generating exploration prompts
pub struct ExplorationPromptTemplate;

impl ExplorationPromptTemplate {
    /// System prompt listing the tools applicable to the chart
    pub fn system(chart_type: ChartType, tools: &[&ToolDescriptor]) -> String {
        if tools.is_empty() {
            return Self::static_system(chart_type);
        }

        let tool_descriptions = tools
            .iter()
            .map(|t| {
                let params = t
                    .params
                    .iter()
                    .map(|(name, p)| {
                        let required = if p.required { " (required)" } else { "" };
                        let default = p
                            .default
                            .as_ref()
                            .map(|d| format!(" [default: {}]", d))
                            .unwrap_or_default();
                        format!(
                            "    - {} ({}): {}{}{}",
                            name,
                            param_type_label(p),
                            p.description,
                            required,
                            default
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n");
                let params = if params.is_empty() {
                    "    (none)".to_string()
                } else {
                    params
                };

                format!(
                    "- **{}** [{}]: {}\n  Parameters:\n{}",
                    t.name, t.category, t.description, params
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        format!(
            r#"You are a visual analytics agent exploring a {chart_type} described by a Vega-Lite specification.

## Available Tools

{tool_descriptions}

## How to Respond

Every reply must be exactly one JSON object, in one of two forms.

To act on the chart:

```json
{{
  "type": "tool_calls",
  "reasoning": "why these calls help answer the question",
  "calls": [{{"name": "tool_name", "arguments": {{"param": "value"}}}}],
  "insights": ["facts you have established so far"]
}}
```

To finish:

```json
{{
  "type": "final_answer",
  "text": "your answer to the question",
  "insights": ["facts supporting the answer"]
}}
```

## Guidelines

1. Only call tools from the list above, with the listed parameter names and types
2. Calls in one reply run in order; later calls see the chart produced by earlier ones
3. Failed calls leave the chart unchanged; read the error and correct the call
4. State each insight as one concrete, quantitative sentence
5. Finish as soon as the question is answered
"#,
            chart_type = chart_type,
            tool_descriptions = tool_descriptions
        )
    }

    /// System prompt for a session without tools: answer from the chart as given
    fn static_system(chart_type: ChartType) -> String {
        format!(
            r#"You are a visual analytics agent reading a {chart_type} described by a Vega-Lite specification.
No tools are available: answer from the chart as it is shown.

Reply with exactly one JSON object:

```json
{{
  "type": "final_answer",
  "text": "your answer to the question",
  "insights": ["facts supporting the answer"]
}}
```
"#,
            chart_type = chart_type
        )
    }

    /// User message for one round
    pub fn round_message(
        query: &str,
        round: usize,
        max_rounds: usize,
        state: &ChartState,
        recent: &[ExecutionRecord],
        insights: &[String],
        include_payloads: bool,
    ) -> String {
        let mut message = format!(
            "## Question\n\n{}\n\n## Round\n\n{} of {}\n\n## Current Chart\n\n```json\n{}\n```\n",
            query,
            round + 1,
            max_rounds,
            pretty(&Self::state_snapshot(state))
        );

        if !recent.is_empty() {
            message.push_str("\n## Previous Tool Calls\n\n");
            for record in recent {
                message.push_str(&Self::format_record(record, include_payloads));
                message.push('\n');
            }
        }

        if !insights.is_empty() {
            message.push_str("\n## Insights So Far\n\n");
            for insight in insights {
                message.push_str(&format!("- {}\n", insight));
            }
        }

        message.push_str("\nReply with one JSON object.");
        message
    }

    /// Round message followed by the corrective instruction for a rejected reply
    pub fn with_correction(message: &str, hint: &str) -> String {
        format!("{}\n\n## Correction\n\n{}", message, hint)
    }

    fn format_record(record: &ExecutionRecord, include_payloads: bool) -> String {
        let call = record.call();
        let header = format!("- round {}: {}", call.round + 1, call.signature());
        match (record.error(), record.payload()) {
            (Some(error), _) => format!("{} -> FAILED [{}] {}", header, error.kind, error.message),
            (None, Some(payload)) if include_payloads => {
                format!("{} -> ok\n  result: {}", header, compact(payload))
            }
            (None, _) => format!("{} -> ok", header),
        }
    }

    /// The chart specification with `data.values` cut down to a few rows
    pub fn state_snapshot(state: &ChartState) -> Value {
        let mut snapshot = state.to_spec();
        let rows = state.data_values();
        if rows.len() > SNAPSHOT_ROWS
            && let Some(data) = snapshot.get_mut("data").and_then(|d| d.as_object_mut())
        {
            data.insert(
                "values".to_string(),
                Value::Array(rows[..SNAPSHOT_ROWS].to_vec()),
            );
            data.insert(
                "omitted_rows".to_string(),
                json!(rows.len() - SNAPSHOT_ROWS),
            );
        }
        snapshot
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn compact(value: &Value) -> String {
    crate::core::string::truncate(&value.to_string(), 1500)
}
