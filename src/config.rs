//! Configuration for the external collaborators and the resolver
//!
//! Loaded from YAML. Every section has defaults, so a partial file (or no
//! file at all) yields a usable configuration.

use crate::frames::RelationTable;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

/// Streaming dependency parser pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Shell pipeline that reads text on stdin and writes dependency lines
    pub command: String,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        let home = std::env::var("ALPINO_HOME").unwrap_or_else(|_| "/opt/Alpino".to_string());
        Self {
            command: format!(
                "{home}/Tokenization/tok | {home}/bin/Alpino end_hook=dependencies -parse"
            ),
        }
    }
}

/// Interactive constituency/dependency parser session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractiveConfig {
    pub command: String,
    /// Modules announced during startup, in order
    pub ready_markers: Vec<String>,
    /// Text acknowledging each module
    pub module_done: String,
    /// Text signalling a startup failure
    pub failure_marker: String,
    /// Text announcing the request loop
    pub shell_marker: String,
    /// Prompt ending each response
    pub prompt: String,
    pub startup_timeout_secs: u64,
    pub response_timeout_secs: u64,
    /// Silence that counts as "no leftover output" before a request
    pub quiet_period_ms: u64,
}

impl Default for InteractiveConfig {
    fn default() -> Self {
        let home = std::env::var("CORENLP_HOME").unwrap_or_else(|_| "/opt/corenlp".to_string());
        let version = std::env::var("CORENLP_VERSION").unwrap_or_else(|_| "3.2.0".to_string());
        let classpath = [
            format!("stanford-corenlp-{version}.jar"),
            format!("stanford-corenlp-{version}-models.jar"),
            "joda-time.jar".to_string(),
            "xom.jar".to_string(),
            "jollyday.jar".to_string(),
        ]
        .iter()
        .map(|jar| format!("{home}/{jar}"))
        .collect::<Vec<_>>()
        .join(":");

        Self {
            command: format!("java -cp {classpath} edu.stanford.nlp.pipeline.StanfordCoreNLP"),
            ready_markers: ["Pos tagger", "NER-all", "NER-muc", "ConLL", "PCFG"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            module_done: "done.".to_string(),
            failure_marker: "Exception".to_string(),
            shell_marker: "Entering interactive shell.".to_string(),
            prompt: "NLP>".to_string(),
            startup_timeout_secs: 600,
            response_timeout_secs: 600,
            quiet_period_ms: 300,
        }
    }
}

impl InteractiveConfig {
    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_secs(self.response_timeout_secs)
    }

    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.quiet_period_ms)
    }
}

/// Frame-semantic tagging service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocketConfig {
    pub host: String,
    pub port: u16,
    pub timeout_secs: u64,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 9888,
            timeout_secs: 300,
        }
    }
}

impl SocketConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub streaming: StreamingConfig,
    pub interactive: InteractiveConfig,
    pub frames: SocketConfig,
    /// Phrase-type to relation-label table used by the resolver
    pub relations: RelationTable,
    /// Frame catalog file (YAML or JSON)
    pub catalog: Option<PathBuf>,
}

impl Config {
    pub fn from_yaml(path: &Path, text: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(text).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(path, &text)
    }

    /// Load `path` if given, else the default location if it exists, else defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match default_config_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }
}

/// `~/.config/annograph/config.yaml` (platform equivalent)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("annograph").join("config.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_point_at_upstream_tools() {
        let config = Config::default();
        assert!(config.streaming.command.contains("end_hook=dependencies"));
        assert_eq!(config.interactive.ready_markers.len(), 5);
        assert_eq!(config.interactive.prompt, "NLP>");
        assert_eq!(config.frames.address(), "localhost:9888");
        assert!(config.catalog.is_none());
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let yaml = "frames:\n  port: 7777\ncatalog: /data/frames.yaml\n";
        let config = Config::from_yaml(Path::new("inline"), yaml).unwrap();
        assert_eq!(config.frames.port, 7777);
        assert_eq!(config.frames.host, "localhost");
        assert_eq!(config.catalog, Some(PathBuf::from("/data/frames.yaml")));
        assert_eq!(config.relations, RelationTable::default());
    }

    #[test]
    fn yaml_roundtrip() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let back = Config::from_yaml(Path::new("inline"), &yaml).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "streaming:\n  command: cat").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.streaming.command, "cat");
    }

    #[test]
    fn invalid_yaml_names_the_file() {
        let err = Config::from_yaml(Path::new("broken.yaml"), "frames: [").unwrap_err();
        assert!(err.to_string().contains("broken.yaml"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Config::load(Path::new("/nonexistent/annograph.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
