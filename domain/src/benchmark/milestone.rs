//! Milestone predicates over the call history and the insight claims.
//!
//! Predicates are tagged JSON documents (`kind`):
//!
//! ```json
//! {"kind": "tool_invoked", "tools": ["identify_clusters"],
//!  "args": [{"name": "n_clusters", "op": "gte", "value": 2}]}
//! {"kind": "tool_before", "first": {"tools": ["identify_clusters"]}, "then": {"tools": ["zoom"]}}
//! {"kind": "insight_mentions", "keywords": ["two", "group"]}
//! {"kind": "all_of", "predicates": [...]}
//! {"kind": "any_of", "predicates": [...]}
//! ```

use super::matching::claim_matches;
use crate::transcript::TranscriptCall;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    #[default]
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

/// Condition on one argument of a call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgCondition {
    pub name: String,
    #[serde(default)]
    pub op: CompareOp,
    pub value: Value,
}

impl ArgCondition {
    /// A missing argument never satisfies a condition
    pub fn holds(&self, call: &TranscriptCall) -> bool {
        let Some(actual) = call.arguments.get(&self.name) else {
            return false;
        };
        let numbers = actual.as_f64().zip(self.value.as_f64());
        match self.op {
            CompareOp::Eq => match numbers {
                Some((a, b)) => a == b,
                None => actual == &self.value,
            },
            CompareOp::Ne => match numbers {
                Some((a, b)) => a != b,
                None => actual != &self.value,
            },
            CompareOp::Gt => numbers.is_some_and(|(a, b)| a > b),
            CompareOp::Gte => numbers.is_some_and(|(a, b)| a >= b),
            CompareOp::Lt => numbers.is_some_and(|(a, b)| a < b),
            CompareOp::Lte => numbers.is_some_and(|(a, b)| a <= b),
        }
    }
}

/// Selects calls by tool name and argument conditions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallMatcher {
    pub tools: Vec<String>,
    #[serde(default)]
    pub args: Vec<ArgCondition>,
    /// Only count calls that succeeded
    #[serde(default = "default_true")]
    pub successful: bool,
}

fn default_true() -> bool {
    true
}

impl CallMatcher {
    pub fn matches(&self, call: &TranscriptCall) -> bool {
        (!self.successful || call.success)
            && self.tools.iter().any(|t| t == &call.tool_name)
            && self.args.iter().all(|c| c.holds(call))
    }

    fn first_match(&self, calls: &[TranscriptCall], from: usize) -> Option<usize> {
        calls
            .iter()
            .enumerate()
            .skip(from)
            .find(|(_, call)| self.matches(call))
            .map(|(index, _)| index)
    }
}

/// What has to be true of an exploration for a milestone to count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MilestonePredicate {
    /// Some call matches
    ToolInvoked(CallMatcher),
    /// A `first` call happens, a `then` call follows it, and no `then` call
    /// happens before the first `first` call
    ToolBefore { first: CallMatcher, then: CallMatcher },
    /// Some claim mentions enough of the keywords
    InsightMentions {
        keywords: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_fraction: Option<f64>,
    },
    AllOf { predicates: Vec<MilestonePredicate> },
    AnyOf { predicates: Vec<MilestonePredicate> },
}

/// Inputs a predicate is checked against
#[derive(Debug, Clone, Copy)]
pub struct MilestoneContext<'a> {
    pub calls: &'a [TranscriptCall],
    pub claims: &'a [&'a str],
    pub default_min_fraction: f64,
}

impl MilestonePredicate {
    /// Check the predicate against `calls[from..]`.
    ///
    /// Returns the end (exclusive) of the shortest call prefix that satisfies
    /// the predicate, so ordered milestone lists can continue after it.
    /// Insight predicates consume no calls.
    pub fn satisfied_from(&self, ctx: &MilestoneContext<'_>, from: usize) -> Option<usize> {
        match self {
            MilestonePredicate::ToolInvoked(matcher) => {
                matcher.first_match(ctx.calls, from).map(|i| i + 1)
            }
            MilestonePredicate::ToolBefore { first, then } => {
                let first_at = first.first_match(ctx.calls, from)?;
                let then_early = ctx.calls[from..first_at].iter().any(|c| then.matches(c));
                if then_early {
                    return None;
                }
                then.first_match(ctx.calls, first_at + 1).map(|i| i + 1)
            }
            MilestonePredicate::InsightMentions {
                keywords,
                min_fraction,
            } => {
                let fraction = min_fraction.unwrap_or(ctx.default_min_fraction);
                ctx.claims
                    .iter()
                    .any(|claim| claim_matches(keywords, fraction, claim))
                    .then_some(from)
            }
            MilestonePredicate::AllOf { predicates } => predicates
                .iter()
                .map(|p| p.satisfied_from(ctx, from))
                .try_fold(from, |end, next| next.map(|n| end.max(n))),
            MilestonePredicate::AnyOf { predicates } => predicates
                .iter()
                .filter_map(|p| p.satisfied_from(ctx, from))
                .min(),
        }
    }

    /// Structural check, reported as a reason string
    pub fn validate(&self) -> Result<(), String> {
        let check_matcher = |label: &str, matcher: &CallMatcher| {
            if matcher.tools.is_empty() || matcher.tools.iter().any(|t| t.trim().is_empty()) {
                Err(format!("{} needs at least one non-empty tool name", label))
            } else {
                Ok(())
            }
        };
        match self {
            MilestonePredicate::ToolInvoked(matcher) => check_matcher("tool_invoked", matcher),
            MilestonePredicate::ToolBefore { first, then } => {
                check_matcher("tool_before.first", first)?;
                check_matcher("tool_before.then", then)
            }
            MilestonePredicate::InsightMentions {
                keywords,
                min_fraction,
            } => {
                if keywords.iter().all(|k| k.trim().is_empty()) {
                    return Err("insight_mentions needs at least one keyword".to_string());
                }
                match min_fraction {
                    Some(f) if !(*f > 0.0 && *f <= 1.0) => {
                        Err(format!("min_fraction must be in (0, 1], got {}", f))
                    }
                    _ => Ok(()),
                }
            }
            MilestonePredicate::AllOf { predicates } | MilestonePredicate::AnyOf { predicates } => {
                if predicates.is_empty() {
                    return Err("combinator needs at least one predicate".to_string());
                }
                predicates.iter().try_for_each(|p| p.validate())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::value_objects::ToolError;
    use serde_json::json;

    fn call(round: usize, tool: &str, args: Value, success: bool) -> TranscriptCall {
        TranscriptCall {
            round,
            tool_name: tool.to_string(),
            arguments: serde_json::from_value(args).unwrap(),
            success,
            error: (!success).then(|| ToolError::execution_failed("failed")),
        }
    }

    fn calls() -> Vec<TranscriptCall> {
        vec![
            call(0, "get_data_summary", json!({}), true),
            call(1, "identify_clusters", json!({"n_clusters": 2}), true),
            call(2, "zoom", json!({"area": [0, 1, 0, 1]}), true),
            call(3, "identify_clusters", json!({"n_clusters": 4}), false),
        ]
    }

    fn ctx<'a>(calls: &'a [TranscriptCall], claims: &'a [&'a str]) -> MilestoneContext<'a> {
        MilestoneContext {
            calls,
            claims,
            default_min_fraction: 0.5,
        }
    }

    fn predicate(value: Value) -> MilestonePredicate {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_tool_invoked_with_args() {
        let calls = calls();
        let ctx = ctx(&calls, &[]);
        let p = predicate(json!({
            "kind": "tool_invoked",
            "tools": ["identify_clusters"],
            "args": [{"name": "n_clusters", "op": "gte", "value": 2}]
        }));
        assert_eq!(p.satisfied_from(&ctx, 0), Some(2));
        assert_eq!(p.satisfied_from(&ctx, 2), None);
    }

    #[test]
    fn test_failed_calls_need_opt_in() {
        let calls = calls();
        let ctx = ctx(&calls, &[]);
        let strict = predicate(json!({
            "kind": "tool_invoked", "tools": ["identify_clusters"],
            "args": [{"name": "n_clusters", "value": 4.0}]
        }));
        assert_eq!(strict.satisfied_from(&ctx, 0), None);

        let lenient = predicate(json!({
            "kind": "tool_invoked", "tools": ["identify_clusters"], "successful": false,
            "args": [{"name": "n_clusters", "value": 4.0}]
        }));
        assert_eq!(lenient.satisfied_from(&ctx, 0), Some(4));
    }

    #[test]
    fn test_tool_before() {
        let calls = calls();
        let ctx = ctx(&calls, &[]);
        let ok = predicate(json!({
            "kind": "tool_before",
            "first": {"tools": ["identify_clusters"]},
            "then": {"tools": ["zoom"]}
        }));
        assert_eq!(ok.satisfied_from(&ctx, 0), Some(3));

        let reversed = predicate(json!({
            "kind": "tool_before",
            "first": {"tools": ["zoom"]},
            "then": {"tools": ["get_data_summary"]}
        }));
        assert_eq!(reversed.satisfied_from(&ctx, 0), None);
    }

    #[test]
    fn test_insight_and_combinators() {
        let calls = calls();
        let claims = ["The data contains two groups of users"];
        let ctx = ctx(&calls, &claims);

        let mentions = predicate(json!({"kind": "insight_mentions", "keywords": ["two", "groups"]}));
        assert_eq!(mentions.satisfied_from(&ctx, 1), Some(1));

        let all = predicate(json!({"kind": "all_of", "predicates": [
            {"kind": "insight_mentions", "keywords": ["two", "groups"]},
            {"kind": "tool_invoked", "tools": ["zoom"]}
        ]}));
        assert_eq!(all.satisfied_from(&ctx, 0), Some(3));

        let any = predicate(json!({"kind": "any_of", "predicates": [
            {"kind": "tool_invoked", "tools": ["zoom"]},
            {"kind": "tool_invoked", "tools": ["identify_clusters"]}
        ]}));
        assert_eq!(any.satisfied_from(&ctx, 0), Some(2));
    }

    #[test]
    fn test_validate() {
        assert!(predicate(json!({"kind": "tool_invoked", "tools": []})).validate().is_err());
        assert!(predicate(json!({"kind": "any_of", "predicates": []})).validate().is_err());
        assert!(
            predicate(json!({"kind": "insight_mentions", "keywords": ["a"], "min_fraction": 1.5}))
                .validate()
                .is_err()
        );
        assert!(predicate(json!({"kind": "tool_invoked", "tools": ["zoom"]})).validate().is_ok());
    }
}
