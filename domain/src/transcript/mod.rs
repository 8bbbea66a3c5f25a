//! Transcript domain.
//!
//! A [`Transcript`] is the persisted, read-only projection of a terminated
//! session and the only artifact the benchmark evaluator reads.

pub mod entities;

pub use entities::{MalformedTranscriptError, TerminationState, Transcript, TranscriptCall};
