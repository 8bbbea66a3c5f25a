//! Configuration file loading for chartscout
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. Environment variables: `CHARTSCOUT_EXPLORATION__MAX_ROUNDS=8`
//! 2. `--config <path>` specified file
//! 3. Project root: `./chartscout.toml` or `./.chartscout.toml`
//! 4. Global: `$XDG_CONFIG_HOME/chartscout/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileConfig, FileExplorationConfig, FileLoggingConfig, FileModelConfig,
    FileOutputConfig, FileOutputFormat,
};
pub use loader::ConfigLoader;
