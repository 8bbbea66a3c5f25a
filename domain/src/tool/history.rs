//! Append-only call history of a session

use super::value_objects::ExecutionRecord;
use serde::{Deserialize, Serialize};

/// Ordered list of every execution attempt in a session.
///
/// Records are never removed or reordered; [`append`](Self::append) stamps
/// each record with its position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallHistory {
    records: Vec<ExecutionRecord>,
}

impl CallHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: ExecutionRecord) -> &ExecutionRecord {
        let sequence = self.records.len();
        self.records.push(record.with_sequence(sequence));
        &self.records[sequence]
    }

    pub fn records(&self) -> &[ExecutionRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExecutionRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last(&self) -> Option<&ExecutionRecord> {
        self.records.last()
    }

    /// Records of one round, in execution order
    pub fn in_round(&self, round: usize) -> impl Iterator<Item = &ExecutionRecord> {
        self.records.iter().filter(move |r| r.call().round == round)
    }

    /// The most recent `n` records
    pub fn recent(&self, n: usize) -> &[ExecutionRecord] {
        let start = self.records.len().saturating_sub(n);
        &self.records[start..]
    }
}
