//! Benchmark evaluator: (transcript, task) → score report.
//!
//! The evaluator holds only its configuration. It never mutates its inputs,
//! and evaluating the same pair twice yields identical reports.

use super::config::{EvaluationConfig, EvaluationConfigError};
use super::matching::{DepthLevel, claim_matches, is_scorable_claim, longest_common_subsequence};
use super::milestone::MilestoneContext;
use super::report::{
    EfficiencyAudit, InsightAudit, PathAudit, ScoreReport, SubScores, ToolUsageAudit, Verdict,
};
use super::task::{BenchmarkTask, InsightSpec, MalformedTaskError, StepBudget};
use crate::transcript::{MalformedTranscriptError, Transcript, TranscriptCall};
use thiserror::Error;

/// Blend of recall, precision and depth in the insight score
const RECALL_SHARE: f64 = 0.60;
const PRECISION_SHARE: f64 = 0.25;
const DEPTH_SHARE: f64 = 0.15;

/// Blend of milestone completion and step efficiency in the path score
const MILESTONE_SHARE: f64 = 0.60;
const STEP_SHARE: f64 = 0.40;

/// Blend of required-tool coverage and call validity in the tool-usage score
const COVERAGE_SHARE: f64 = 0.70;
const VALIDITY_SHARE: f64 = 0.30;

/// Points for using every recommended tool
const RECOMMENDED_BONUS: f64 = 10.0;

/// Coherence deductions: retrying a call that already failed unchanged, and
/// re-running a call whose result is already known
const REPEATED_FAILURE_PENALTY: f64 = 5.0;
const REPEATED_RESULT_PENALTY: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    #[error(transparent)]
    MalformedTranscript(#[from] MalformedTranscriptError),

    #[error(transparent)]
    MalformedTask(#[from] MalformedTaskError),

    #[error("transcript was recorded for task '{transcript}', not '{task}'")]
    TaskMismatch { transcript: String, task: String },
}

/// Scores transcripts against benchmark tasks
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    config: EvaluationConfig,
}

impl Evaluator {
    pub fn new(config: EvaluationConfig) -> Result<Self, EvaluationConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    pub fn evaluate(
        &self,
        transcript: &Transcript,
        task: &BenchmarkTask,
    ) -> Result<ScoreReport, EvaluationError> {
        transcript.validate()?;
        task.validate()?;
        if let Some(recorded) = &transcript.task_id
            && recorded != &task.task_id
        {
            return Err(EvaluationError::TaskMismatch {
                transcript: recorded.clone(),
                task: task.task_id.clone(),
            });
        }

        let claims = self.claims(transcript);
        let step_efficiency =
            step_efficiency(transcript.rounds, &task.steps, task.interaction_required);

        let (insight, insights) = self.score_insights(task, &claims);
        let (path, path_audit) = self.score_path(transcript, task, &claims, step_efficiency);
        let (tool_usage, tool_audit) = self.score_tool_usage(transcript, task);
        let (efficiency, efficiency_audit) = self.score_efficiency(transcript, step_efficiency);

        let scores = SubScores {
            insight,
            path,
            tool_usage,
            efficiency,
        };
        let total = clamp_score(scores.weighted_total(&self.config.weights));

        Ok(ScoreReport {
            task_id: task.task_id.clone(),
            session_id: transcript.session_id.clone(),
            scores,
            weights: self.config.weights,
            total,
            verdict: Verdict::from_total(total, &self.config.thresholds),
            insights,
            path: path_audit,
            tool_usage: tool_audit,
            efficiency: efficiency_audit,
        })
    }

    fn claims<'a>(&self, transcript: &'a Transcript) -> Vec<&'a str> {
        let final_answer = transcript
            .final_answer
            .as_deref()
            .filter(|_| self.config.include_final_answer);
        transcript
            .insights
            .iter()
            .map(String::as_str)
            .chain(final_answer)
            .filter(|claim| is_scorable_claim(claim))
            .collect()
    }

    fn min_fraction(&self, insight: &InsightSpec) -> f64 {
        insight.min_fraction.unwrap_or(self.config.default_min_fraction)
    }

    fn found(&self, insight: &InsightSpec, claims: &[&str]) -> bool {
        let fraction = self.min_fraction(insight);
        claims
            .iter()
            .any(|claim| claim_matches(&insight.keywords, fraction, claim))
    }

    fn score_insights(&self, task: &BenchmarkTask, claims: &[&str]) -> (f64, InsightAudit) {
        let (matched_critical, missing_critical) = self.partition(&task.insights.critical, claims);
        let (matched_secondary, missing_secondary) =
            self.partition(&task.insights.secondary, claims);

        let recall = ratio(matched_critical.len(), task.insights.critical.len());

        let ground_truth: Vec<&InsightSpec> = task
            .insights
            .critical
            .iter()
            .chain(&task.insights.secondary)
            .collect();
        let matched_claims = claims
            .iter()
            .filter(|claim| {
                ground_truth.iter().any(|insight| {
                    claim_matches(&insight.keywords, self.min_fraction(insight), claim)
                })
            })
            .count();
        let precision = if claims.is_empty() {
            0.0
        } else {
            ratio(matched_claims, claims.len())
        };

        let secondary_total = task.insights.secondary.len();
        let depth = if secondary_total == 0 {
            1.0
        } else {
            let cap = self.config.depth_cap.min(secondary_total);
            matched_secondary.len().min(cap) as f64 / cap as f64
        };

        let score = clamp_score(
            100.0 * (RECALL_SHARE * recall + PRECISION_SHARE * precision + DEPTH_SHARE * depth),
        );

        let audit = InsightAudit {
            matched_critical,
            missing_critical,
            matched_secondary,
            missing_secondary,
            recall,
            precision,
            depth,
            claims: claims.len(),
            matched_claims,
            depth_levels: claims.iter().map(|c| DepthLevel::of(c)).collect(),
        };
        (score, audit)
    }

    fn partition(&self, insights: &[InsightSpec], claims: &[&str]) -> (Vec<String>, Vec<String>) {
        let (matched, missing): (Vec<&InsightSpec>, Vec<&InsightSpec>) =
            insights.iter().partition(|i| self.found(i, claims));
        (
            matched.into_iter().map(|i| i.id.clone()).collect(),
            missing.into_iter().map(|i| i.id.clone()).collect(),
        )
    }

    fn score_path(
        &self,
        transcript: &Transcript,
        task: &BenchmarkTask,
        claims: &[&str],
        step_efficiency: f64,
    ) -> (f64, PathAudit) {
        let ctx = MilestoneContext {
            calls: &transcript.calls,
            claims,
            default_min_fraction: self.config.default_min_fraction,
        };

        let mut satisfied_milestones = Vec::new();
        let mut unsatisfied_milestones = Vec::new();
        let mut required_total = 0;
        let mut required_satisfied = 0;
        let mut cursor = 0;

        for milestone in &task.milestones {
            let from = if task.milestones_ordered { cursor } else { 0 };
            let satisfied = match milestone.predicate.satisfied_from(&ctx, from) {
                Some(end) => {
                    cursor = end;
                    true
                }
                None => false,
            };
            if milestone.required {
                required_total += 1;
                if satisfied {
                    required_satisfied += 1;
                }
            }
            if satisfied {
                satisfied_milestones.push(milestone.id.clone());
            } else {
                unsatisfied_milestones.push(milestone.id.clone());
            }
        }

        let milestone_ratio = if required_total == 0 {
            1.0
        } else {
            ratio(required_satisfied, required_total)
        };

        let reference_similarity = task.reference_path.as_ref().map(|reference| {
            let actual = transcript.tool_sequence();
            ratio(longest_common_subsequence(&actual, reference), reference.len())
        });

        let score = clamp_score(MILESTONE_SHARE * milestone_ratio * 100.0 + STEP_SHARE * step_efficiency);
        let audit = PathAudit {
            satisfied_milestones,
            unsatisfied_milestones,
            milestone_ratio,
            rounds: transcript.rounds,
            step_efficiency,
            reference_similarity,
            reasoning_coherence: reasoning_coherence(&transcript.calls),
        };
        (score, audit)
    }

    fn score_tool_usage(&self, transcript: &Transcript, task: &BenchmarkTask) -> (f64, ToolUsageAudit) {
        let expectations = &task.tools;
        let used = |tool: &str| {
            transcript
                .calls
                .iter()
                .any(|c| c.tool_name == tool && !c.was_rejected())
        };

        let missing_required: Vec<String> = expectations
            .required
            .iter()
            .filter(|tool| !used(tool.as_str()))
            .cloned()
            .collect();
        let coverage = if expectations.required.is_empty() {
            1.0
        } else {
            ratio(
                expectations.required.len() - missing_required.len(),
                expectations.required.len(),
            )
        };

        let inapplicable_calls: Vec<usize> = transcript
            .calls
            .iter()
            .enumerate()
            .filter(|(_, c)| expectations.inapplicable.contains(&c.tool_name))
            .map(|(index, _)| index)
            .collect();

        let invalid_calls = transcript.calls.iter().filter(|c| c.was_rejected()).count();
        let considered: Vec<_> = transcript
            .calls
            .iter()
            .filter(|c| !expectations.inapplicable.contains(&c.tool_name))
            .collect();
        let validity = if considered.is_empty() {
            0.0
        } else {
            let valid = considered.iter().filter(|c| !c.was_rejected()).count();
            ratio(valid, considered.len())
        };

        let recommended_used: Vec<String> = expectations
            .recommended
            .iter()
            .filter(|tool| used(tool.as_str()))
            .cloned()
            .collect();
        let bonus = if expectations.recommended.is_empty() {
            0.0
        } else {
            RECOMMENDED_BONUS * ratio(recommended_used.len(), expectations.recommended.len())
        };

        let penalty = self.config.inapplicable_penalty * inapplicable_calls.len() as f64;
        let mut score = clamp_score(
            100.0 * (COVERAGE_SHARE * coverage + VALIDITY_SHARE * validity) + bonus - penalty,
        );
        let capped = !missing_required.is_empty();
        if capped {
            score = score.min(self.config.required_tool_ceiling);
        }

        let audit = ToolUsageAudit {
            missing_required,
            recommended_used,
            inapplicable_calls,
            invalid_calls,
            coverage,
            validity,
            capped,
        };
        (score, audit)
    }

    fn score_efficiency(&self, transcript: &Transcript, step_efficiency: f64) -> (f64, EfficiencyAudit) {
        let redundant_calls: Vec<usize> = transcript
            .calls
            .windows(2)
            .enumerate()
            .filter(|(_, pair)| {
                pair[0].tool_name == pair[1].tool_name && pair[0].arguments == pair[1].arguments
            })
            .map(|(index, _)| index + 1)
            .collect();

        let redundancy_penalty = self.config.redundancy_penalty * redundant_calls.len() as f64;
        let score = clamp_score(step_efficiency - redundancy_penalty);
        (
            score,
            EfficiencyAudit {
                redundant_calls,
                redundancy_penalty,
            },
        )
    }
}

/// Step-count efficiency in `[0, 100]`.
///
/// How well each call builds on what the path already established, 0 to 100.
///
/// Starts at 100. A call identical (tool and arguments) to an earlier failed
/// call costs [`REPEATED_FAILURE_PENALTY`]; one identical to an earlier
/// successful call costs [`REPEATED_RESULT_PENALTY`]. Reported only, never
/// part of the overall score.
pub fn reasoning_coherence(calls: &[TranscriptCall]) -> f64 {
    let mut score = 100.0;
    for (i, call) in calls.iter().enumerate() {
        let earlier = calls[..i]
            .iter()
            .filter(|c| c.tool_name == call.tool_name && c.arguments == call.arguments);
        let (mut failed, mut succeeded) = (false, false);
        for previous in earlier {
            if previous.success {
                succeeded = true;
            } else {
                failed = true;
            }
        }
        if succeeded {
            score -= REPEATED_RESULT_PENALTY;
        } else if failed {
            score -= REPEATED_FAILURE_PENALTY;
        }
    }
    f64::max(score, 0.0)
}

/// 100 at the optimal count. Above it, decays linearly to 0 at `max`; below
/// it, decays linearly to 0 at `min`, but only when the task requires
/// interaction. Counts at or outside the bounds score 0.
pub fn step_efficiency(rounds: usize, steps: &StepBudget, interaction_required: bool) -> f64 {
    let r = rounds as f64;
    let optimal = steps.optimal as f64;

    if rounds == steps.optimal {
        100.0
    } else if rounds > steps.optimal {
        if rounds >= steps.max {
            0.0
        } else {
            let ceiling = steps.max as f64;
            100.0 * (ceiling - r) / (ceiling - optimal)
        }
    } else if !interaction_required {
        100.0
    } else if rounds <= steps.min {
        0.0
    } else {
        let floor = steps.min as f64;
        100.0 * (r - floor) / (optimal - floor)
    }
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

fn clamp_score(score: f64) -> f64 {
    score.clamp(0.0, 100.0)
}
