//! Exploration progress display

pub mod reporter;

pub use reporter::{ProgressReporter, SimpleProgress};
