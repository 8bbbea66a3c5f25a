//! Application-level configuration.
//!
//! - [`ExplorationParams`]: exploration loop control (rounds, retries, timeouts)

pub mod exploration_params;

pub use exploration_params::ExplorationParams;
