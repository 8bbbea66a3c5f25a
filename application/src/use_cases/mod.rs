//! Use cases (application services)
//!
//! Use cases orchestrate domain logic and coordinate with ports.

pub mod evaluate_transcript;
pub mod run_exploration;
