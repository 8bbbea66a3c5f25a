//! Benchmark domain: ground-truth tasks and transcript scoring.
//!
//! ```text
//! Transcript ──┐
//!              ├──▶ Evaluator ──▶ ScoreReport { insight, path, tool_usage, efficiency, total, verdict }
//! BenchmarkTask┘
//! ```
//!
//! # Dimensions
//!
//! | Dimension | Inputs |
//! |-----------|--------|
//! | insight | claimed insights (and final answer) vs. critical/secondary keyword sets |
//! | path | milestone predicates over the call history + step efficiency |
//! | tool_usage | required / recommended / inapplicable tool lists, rejected calls |
//! | efficiency | step efficiency minus consecutive repeated calls |
//!
//! The evaluator is a pure function of its inputs and configuration.

pub mod config;
pub mod evaluator;
pub mod matching;
pub mod milestone;
pub mod report;
pub mod task;

pub use config::{EvaluationConfig, EvaluationConfigError, ScoreWeights, VerdictThresholds};
pub use evaluator::{EvaluationError, Evaluator, step_efficiency};
pub use matching::DepthLevel;
pub use milestone::{ArgCondition, CallMatcher, CompareOp, MilestonePredicate};
pub use report::{ScoreReport, SubScores, Verdict};
pub use task::{BenchmarkTask, InsightSpec, MalformedTaskError, MilestoneSpec, StepBudget};
