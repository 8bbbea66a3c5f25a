//! Prompt domain
//!
//! Templates for the messages sent to a decision model during exploration.

pub mod exploration;

pub use exploration::ExplorationPromptTemplate;
