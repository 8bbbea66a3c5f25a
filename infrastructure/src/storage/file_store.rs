//! Filesystem artifact store
//!
//! Layout under the root directory:
//!
//! ```text
//! <root>/transcripts/<session_id>.json
//! <root>/reports/<task_id>__<session_id>.json
//! ```

use async_trait::async_trait;
use chartscout_application::{ArtifactError, ArtifactStore};
use chartscout_domain::{BenchmarkTask, ScoreReport, Transcript};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct FileArtifactStore {
    root: PathBuf,
}

impl FileArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn transcript_path(&self, session_id: &str) -> PathBuf {
        self.root
            .join("transcripts")
            .join(format!("{}.json", file_stem(session_id)))
    }

    pub fn report_path(&self, task_id: &str, session_id: &str) -> PathBuf {
        self.root.join("reports").join(format!(
            "{}__{}.json",
            file_stem(task_id),
            file_stem(session_id)
        ))
    }

    async fn write(path: &Path, content: String) -> Result<(), ArtifactError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| ArtifactError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        tokio::fs::write(path, content)
            .await
            .map_err(|source| ArtifactError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(path = %path.display(), "Artifact written");
        Ok(())
    }

    async fn read(path: &Path) -> Result<String, ArtifactError> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ArtifactError::Io {
                path: path.to_path_buf(),
                source,
            })
    }
}

/// Keep ids usable as file names on every platform
fn file_stem(id: &str) -> String {
    let stem: String = id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() { "unnamed".to_string() } else { stem }
}

#[async_trait]
impl ArtifactStore for FileArtifactStore {
    async fn save_transcript(&self, transcript: &Transcript) -> Result<PathBuf, ArtifactError> {
        let path = self.transcript_path(&transcript.session_id);
        let content = transcript
            .to_json_pretty()
            .map_err(|e| ArtifactError::Serialize(e.to_string()))?;
        Self::write(&path, content).await?;
        Ok(path)
    }

    async fn save_report(&self, report: &ScoreReport) -> Result<PathBuf, ArtifactError> {
        let path = self.report_path(&report.task_id, &report.session_id);
        let content = serde_json::to_string_pretty(report)
            .map_err(|e| ArtifactError::Serialize(e.to_string()))?;
        Self::write(&path, content).await?;
        Ok(path)
    }

    async fn load_transcript(&self, path: &Path) -> Result<Transcript, ArtifactError> {
        let text = Self::read(path).await?;
        Transcript::from_json(&text).map_err(|source| ArtifactError::MalformedTranscript {
            path: path.to_path_buf(),
            source,
        })
    }

    async fn load_task(&self, path: &Path) -> Result<BenchmarkTask, ArtifactError> {
        let text = Self::read(path).await?;
        BenchmarkTask::from_json(&text).map_err(|source| ArtifactError::MalformedTask {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartscout_domain::{EvaluationConfig, Evaluator};

    fn demo_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("demos")
            .join("scatter_clustering_001")
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("session-1-0"), "session-1-0");
        assert_eq!(file_stem("a/b c"), "a_b_c");
        assert_eq!(file_stem(""), "unnamed");
    }

    #[tokio::test]
    async fn test_load_demo_artifacts() {
        let store = FileArtifactStore::new("unused");
        let task = store.load_task(&demo_dir().join("task.json")).await.unwrap();
        assert_eq!(task.task_id, "scatter_clustering_001");

        let transcript = store
            .load_transcript(&demo_dir().join("transcript.json"))
            .await
            .unwrap();
        assert_eq!(transcript.rounds, 3);
        assert_eq!(transcript.task_id.as_deref(), Some("scatter_clustering_001"));
    }

    #[tokio::test]
    async fn test_transcript_round_trip_and_report_save() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileArtifactStore::new(dir.path());
        let transcript = store
            .load_transcript(&demo_dir().join("transcript.json"))
            .await
            .unwrap();

        let path = store.save_transcript(&transcript).await.unwrap();
        assert_eq!(path, store.transcript_path(&transcript.session_id));
        let reloaded = store.load_transcript(&path).await.unwrap();
        assert_eq!(reloaded, transcript);

        let task = store.load_task(&demo_dir().join("task.json")).await.unwrap();
        let report = Evaluator::new(EvaluationConfig::default())
            .unwrap()
            .evaluate(&transcript, &task)
            .unwrap();
        let report_path = store.save_report(&report).await.unwrap();
        assert!(report_path.ends_with("reports/scatter_clustering_001__session-1760000000000-0.json"));
        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(report_path).unwrap()).unwrap();
        assert_eq!(saved["task_id"], "scatter_clustering_001");
    }

    #[tokio::test]
    async fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileArtifactStore::new(dir.path());

        let missing = store.load_transcript(&dir.path().join("missing.json")).await;
        assert!(matches!(missing, Err(ArtifactError::Io { .. })));

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, r#"{"session_id": "s", "rounds": 1}"#).unwrap();
        let malformed = store.load_transcript(&bad).await;
        assert!(matches!(malformed, Err(ArtifactError::MalformedTranscript { .. })));

        let malformed_task = store.load_task(&bad).await;
        assert!(matches!(malformed_task, Err(ArtifactError::MalformedTask { .. })));
    }
}
