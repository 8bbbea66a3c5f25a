//! Artifact store port
//!
//! Persists transcripts and score reports, and loads transcripts and
//! benchmark tasks back for evaluation.

use async_trait::async_trait;
use chartscout_domain::{
    BenchmarkTask, MalformedTaskError, MalformedTranscriptError, ScoreReport, Transcript,
};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization failed: {0}")]
    Serialize(String),

    #[error("{path}: {source}")]
    MalformedTranscript {
        path: PathBuf,
        #[source]
        source: MalformedTranscriptError,
    },

    #[error("{path}: {source}")]
    MalformedTask {
        path: PathBuf,
        #[source]
        source: MalformedTaskError,
    },
}

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Save a transcript; returns where it was written
    async fn save_transcript(&self, transcript: &Transcript) -> Result<PathBuf, ArtifactError>;

    /// Save a score report; returns where it was written
    async fn save_report(&self, report: &ScoreReport) -> Result<PathBuf, ArtifactError>;

    /// Load and validate a transcript
    async fn load_transcript(&self, path: &Path) -> Result<Transcript, ArtifactError>;

    /// Load and validate a benchmark task
    async fn load_task(&self, path: &Path) -> Result<BenchmarkTask, ArtifactError>;
}
