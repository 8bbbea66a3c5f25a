//! Logging configuration from TOML (`[logging]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw logging configuration from TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Write a JSONL conversation log per session
    pub conversation_log: bool,
    /// Directory for conversation logs (defaults to `<output.directory>/logs`)
    pub directory: Option<String>,
    /// Diagnostic log file, in addition to stderr
    pub file: Option<String>,
}

impl FileLoggingConfig {
    /// Directory conversation logs are written to
    pub fn conversation_dir(&self, output_dir: &str) -> PathBuf {
        match &self.directory {
            Some(dir) => PathBuf::from(dir),
            None => PathBuf::from(output_dir).join("logs"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_dir() {
        let config = FileLoggingConfig::default();
        assert_eq!(config.conversation_dir("out"), PathBuf::from("out/logs"));

        let config = FileLoggingConfig {
            directory: Some("/var/log/chartscout".to_string()),
            ..FileLoggingConfig::default()
        };
        assert_eq!(
            config.conversation_dir("out"),
            PathBuf::from("/var/log/chartscout")
        );
    }
}
