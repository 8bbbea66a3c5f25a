//! Evaluate Transcript use case
//!
//! Scores transcripts against benchmark tasks. A batch resolves each
//! transcript's task by id and reports failures per transcript, so one
//! malformed transcript never hides the scores of the others.

use chartscout_domain::{
    BenchmarkTask, EvaluationConfig, EvaluationConfigError, EvaluationError, Evaluator,
    ScoreReport, Transcript,
};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum EvaluateError {
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error("No task found for transcript '{session_id}' (task id: {task_id})")]
    TaskNotFound { session_id: String, task_id: String },
}

/// Outcome of one transcript in a batch
#[derive(Debug)]
pub struct BatchEntry {
    /// Where the transcript came from (usually its file path)
    pub source: String,
    pub result: Result<ScoreReport, EvaluateError>,
}

/// Use case for scoring transcripts
#[derive(Debug, Clone, Default)]
pub struct EvaluateTranscriptUseCase {
    evaluator: Evaluator,
}

impl EvaluateTranscriptUseCase {
    pub fn new(config: EvaluationConfig) -> Result<Self, EvaluationConfigError> {
        Ok(Self {
            evaluator: Evaluator::new(config)?,
        })
    }

    pub fn config(&self) -> &EvaluationConfig {
        self.evaluator.config()
    }

    /// Score one transcript against one task
    pub fn execute(
        &self,
        transcript: &Transcript,
        task: &BenchmarkTask,
    ) -> Result<ScoreReport, EvaluateError> {
        let report = self.evaluator.evaluate(transcript, task)?;
        info!(
            task = %report.task_id,
            session = %report.session_id,
            total = report.total,
            verdict = %report.verdict,
            "Transcript evaluated"
        );
        Ok(report)
    }

    /// Score many transcripts.
    ///
    /// A transcript is scored against the task named by its `task_id`; a
    /// transcript without one is scored against the only task when exactly
    /// one is given.
    pub fn execute_batch(
        &self,
        transcripts: Vec<(String, Transcript)>,
        tasks: &[BenchmarkTask],
    ) -> Vec<BatchEntry> {
        transcripts
            .into_iter()
            .map(|(source, transcript)| {
                let result = match Self::resolve_task(&transcript, tasks) {
                    Some(task) => self.execute(&transcript, task),
                    None => Err(EvaluateError::TaskNotFound {
                        session_id: transcript.session_id.clone(),
                        task_id: transcript
                            .task_id
                            .clone()
                            .unwrap_or_else(|| "none".to_string()),
                    }),
                };
                if let Err(e) = &result {
                    warn!(source = %source, error = %e, "Evaluation failed");
                }
                BatchEntry { source, result }
            })
            .collect()
    }

    fn resolve_task<'a>(
        transcript: &Transcript,
        tasks: &'a [BenchmarkTask],
    ) -> Option<&'a BenchmarkTask> {
        match &transcript.task_id {
            Some(id) => tasks
                .iter()
                .find(|t| &t.task_id == id)
                .or_else(|| (tasks.len() == 1).then(|| &tasks[0])),
            None if tasks.len() == 1 => tasks.first(),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartscout_domain::Verdict;

    const TASK: &str = include_str!("../../../demos/scatter_clustering_001/task.json");
    const TRANSCRIPT: &str = include_str!("../../../demos/scatter_clustering_001/transcript.json");

    fn task() -> BenchmarkTask {
        BenchmarkTask::from_json(TASK).unwrap()
    }

    fn transcript() -> Transcript {
        Transcript::from_json(TRANSCRIPT).unwrap()
    }

    #[test]
    fn test_scores_demo_transcript() {
        let use_case = EvaluateTranscriptUseCase::default();
        let report = use_case.execute(&transcript(), &task()).unwrap();

        assert_eq!(report.task_id, "scatter_clustering_001");
        assert!(report.total >= 70.0);
        assert!(matches!(report.verdict, Verdict::Excellent | Verdict::Good));
    }

    #[test]
    fn test_batch_isolates_failures() {
        let mut other_task = transcript();
        other_task.task_id = Some("bar_ranking_002".to_string());

        let mut broken = transcript();
        broken.session_id = String::new();

        let entries = EvaluateTranscriptUseCase::default().execute_batch(
            vec![
                ("good.json".to_string(), transcript()),
                ("broken.json".to_string(), broken),
                ("other.json".to_string(), other_task),
            ],
            &[task()],
        );

        assert_eq!(entries.len(), 3);
        assert!(entries[0].result.is_ok());
        assert!(matches!(
            entries[1].result,
            Err(EvaluateError::Evaluation(EvaluationError::MalformedTranscript(_)))
        ));
        // With a single task the transcript is still scored, and the id
        // mismatch is reported by the evaluator
        assert!(matches!(
            entries[2].result,
            Err(EvaluateError::Evaluation(EvaluationError::TaskMismatch { .. }))
        ));
    }

    #[test]
    fn test_batch_task_not_found() {
        let mut transcript = transcript();
        transcript.task_id = None;
        let mut second = task();
        second.task_id = "another".to_string();

        let entries = EvaluateTranscriptUseCase::default().execute_batch(
            vec![("t.json".to_string(), transcript)],
            &[task(), second],
        );
        assert!(matches!(entries[0].result, Err(EvaluateError::TaskNotFound { .. })));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = EvaluationConfig::default();
        config.weights.path = 0.9;
        assert!(EvaluateTranscriptUseCase::new(config).is_err());
    }
}
