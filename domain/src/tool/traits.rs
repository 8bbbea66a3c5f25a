//! Tool domain traits
//!
//! Contains pure domain logic for argument validation and the synchronous
//! [`ChartTool`] implementation seam. The async `ToolExecutorPort` is defined
//! in the application layer (ports).

use super::entities::{ParamType, ToolArguments, ToolDescriptor, ToolParameter};
use super::value_objects::{ToolFailure, ToolOutcome};
use crate::chart::ChartState;
use serde_json::Value;
use thiserror::Error;

/// A single argument that does not satisfy its declared parameter
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid argument '{parameter}': {reason}")]
pub struct ArgumentViolation {
    pub parameter: String,
    pub reason: String,
}

impl ArgumentViolation {
    pub fn new(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }
}

/// Validator for tool arguments
///
/// This is a pure domain trait that validates arguments against a
/// descriptor without any I/O operations.
pub trait ToolValidator {
    /// Validate `arguments` against `descriptor`, reporting the first violation
    fn validate(
        &self,
        arguments: &ToolArguments,
        descriptor: &ToolDescriptor,
    ) -> Result<(), ArgumentViolation>;
}

/// Default implementation of ToolValidator
///
/// Declared parameters are checked in name order (presence, type, allowed
/// values, numeric range, array shape); arguments that match no declared
/// parameter are rejected afterwards.
#[derive(Debug, Clone, Default)]
pub struct DefaultToolValidator;

impl DefaultToolValidator {
    fn check_value(
        name: &str,
        param: &ToolParameter,
        value: &Value,
    ) -> Result<(), ArgumentViolation> {
        if !param.param_type.matches(value) {
            return Err(ArgumentViolation::new(
                name,
                format!("expected {}, got {}", param.param_type, json_type_name(value)),
            ));
        }

        let constraints = &param.constraints;

        if let Some(allowed) = &constraints.allowed
            && !allowed.contains(value)
        {
            let options = allowed
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(ArgumentViolation::new(
                name,
                format!("must be one of [{}], got {}", options, value),
            ));
        }

        if let Some(number) = value.as_f64() {
            if let Some(min) = constraints.minimum
                && number < min
            {
                return Err(ArgumentViolation::new(
                    name,
                    format!("must be >= {}, got {}", min, number),
                ));
            }
            if let Some(max) = constraints.maximum
                && number > max
            {
                return Err(ArgumentViolation::new(
                    name,
                    format!("must be <= {}, got {}", max, number),
                ));
            }
        }

        if let Some(items) = value.as_array() {
            if let Some(min) = constraints.min_items
                && items.len() < min
            {
                return Err(ArgumentViolation::new(
                    name,
                    format!("must have at least {} items, got {}", min, items.len()),
                ));
            }
            if let Some(max) = constraints.max_items
                && items.len() > max
            {
                return Err(ArgumentViolation::new(
                    name,
                    format!("must have at most {} items, got {}", max, items.len()),
                ));
            }
            if let Some(item_type) = constraints.items
                && let Some((index, bad)) = items
                    .iter()
                    .enumerate()
                    .find(|(_, item)| !item_type.matches(item))
            {
                return Err(ArgumentViolation::new(
                    name,
                    format!(
                        "item {} expected {}, got {}",
                        index,
                        item_type,
                        json_type_name(bad)
                    ),
                ));
            }
        }

        Ok(())
    }
}

impl ToolValidator for DefaultToolValidator {
    fn validate(
        &self,
        arguments: &ToolArguments,
        descriptor: &ToolDescriptor,
    ) -> Result<(), ArgumentViolation> {
        for (name, param) in &descriptor.params {
            match arguments.get(name) {
                None | Some(Value::Null) if param.required => {
                    return Err(ArgumentViolation::new(name, "is required"));
                }
                None | Some(Value::Null) => {}
                Some(value) => Self::check_value(name, param, value)?,
            }
        }

        if let Some(unknown) = arguments
            .keys()
            .find(|key| !descriptor.params.contains_key(key.as_str()))
        {
            return Err(ArgumentViolation::new(
                unknown,
                format!("is not a parameter of '{}'", descriptor.name),
            ));
        }

        Ok(())
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// The executable body of a tool.
///
/// Implementations receive the current chart state and arguments that have
/// already been validated and completed with defaults. They must not mutate
/// shared state; a changed chart is returned through [`ToolOutcome`].
pub trait ChartTool: Send + Sync {
    fn invoke(&self, state: &ChartState, args: &ToolArguments) -> Result<ToolOutcome, ToolFailure>;
}

impl<F> ChartTool for F
where
    F: Fn(&ChartState, &ToolArguments) -> Result<ToolOutcome, ToolFailure> + Send + Sync,
{
    fn invoke(&self, state: &ChartState, args: &ToolArguments) -> Result<ToolOutcome, ToolFailure> {
        self(state, args)
    }
}

/// Declared type used when rendering the expected type in prompts
pub fn param_type_label(param: &ToolParameter) -> String {
    match (param.param_type, param.constraints.items) {
        (ParamType::Array, Some(items)) => format!("array<{}>", items),
        (param_type, _) => param_type.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::entities::{ToolCall, ToolCategory};
    use serde_json::json;

    fn zoom() -> ToolDescriptor {
        ToolDescriptor::new("zoom", ToolCategory::Action, "Zoom into an area")
            .with_param(
                "area",
                ToolParameter::new(ParamType::Array, "[x1, x2, y1, y2]")
                    .required()
                    .with_items(ParamType::Number, Some(4), Some(4)),
            )
            .with_param(
                "mode",
                ToolParameter::new(ParamType::String, "zoom mode").one_of(["in", "out"]),
            )
            .with_param(
                "factor",
                ToolParameter::new(ParamType::Number, "zoom factor")
                    .with_range(Some(0.0), Some(10.0)),
            )
    }

    fn validate(call: &ToolCall) -> Result<(), ArgumentViolation> {
        DefaultToolValidator.validate(&call.arguments, &zoom())
    }

    #[test]
    fn test_validator_missing_required() {
        let err = validate(&ToolCall::new("zoom", 0)).unwrap_err();
        assert_eq!(err.parameter, "area");
        assert!(err.reason.contains("required"));
    }

    #[test]
    fn test_validator_unknown_param() {
        let call = ToolCall::new("zoom", 0)
            .with_arg("area", json!([0, 1, 0, 1]))
            .with_arg("bogus", 1);
        let err = validate(&call).unwrap_err();
        assert_eq!(err.parameter, "bogus");
    }

    #[test]
    fn test_validator_type_mismatch() {
        let call = ToolCall::new("zoom", 0).with_arg("area", "everything");
        let err = validate(&call).unwrap_err();
        assert_eq!(err.parameter, "area");
        assert!(err.reason.contains("expected array, got string"));
    }

    #[test]
    fn test_validator_array_shape() {
        let short = ToolCall::new("zoom", 0).with_arg("area", json!([0, 1]));
        assert!(validate(&short).unwrap_err().reason.contains("at least 4"));

        let mixed = ToolCall::new("zoom", 0).with_arg("area", json!([0, 1, "a", 2]));
        assert!(validate(&mixed).unwrap_err().reason.contains("item 2"));
    }

    #[test]
    fn test_validator_enum_and_range() {
        let bad_mode = ToolCall::new("zoom", 0)
            .with_arg("area", json!([0, 1, 0, 1]))
            .with_arg("mode", "sideways");
        assert_eq!(validate(&bad_mode).unwrap_err().parameter, "mode");

        let bad_factor = ToolCall::new("zoom", 0)
            .with_arg("area", json!([0, 1, 0, 1]))
            .with_arg("factor", 11);
        assert!(validate(&bad_factor).unwrap_err().reason.contains("<= 10"));
    }

    #[test]
    fn test_validator_null_optional_is_absent() {
        let call = ToolCall::new("zoom", 0)
            .with_arg("area", json!([0.0, 1.5, 0, 1]))
            .with_arg("mode", Value::Null);
        assert!(validate(&call).is_ok());
    }

    #[test]
    fn test_closure_as_chart_tool() {
        let tool = |state: &ChartState, _args: &ToolArguments| {
            Ok(ToolOutcome::new(json!({"rows": state.data_values().len()})))
        };
        let state = ChartState::new(json!({"data": {"values": [{}, {}]}}));
        let outcome = tool.invoke(&state, &ToolArguments::new()).unwrap();
        assert_eq!(outcome.payload["rows"], 2);
        assert!(outcome.state.is_none());
    }

    #[test]
    fn test_param_type_label() {
        let descriptor = zoom();
        assert_eq!(param_type_label(&descriptor.params["area"]), "array<number>");
        assert_eq!(param_type_label(&descriptor.params["mode"]), "string");
    }
}
