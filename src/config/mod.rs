//! Configuration system.
//!
//! Loads configuration from YAML files with a cascading priority system:
//! 1. `./pubmesh.yaml` (current directory - highest priority)
//! 2. `~/.config/pubmesh/pubmesh.yaml` (user config directory)
//! 3. `/etc/pubmesh/pubmesh.yaml` (system - lowest priority)
//!
//! Values from higher priority files override those from lower priority
//! files. All keys are optional; the accessors supply the defaults.
//!
//! ```yaml
//! node:
//!   id: "alpha"
//!   forward: true
//!   ttl: 20
//!   recording-directory: /var/lib/pubmesh/recordings
//!   output-generator-file-cap: 100000
//!   retry: 10
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identity::PeerId;

/// Default config filename.
const CONFIG_FILENAME: &str = "pubmesh.yaml";

/// Default TTL stamped on published node messages.
pub const DEFAULT_TTL: u16 = 20;

/// Default reconnect interval in seconds for lost peers.
pub const DEFAULT_RETRY_SECS: u64 = 10;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {0}")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("cannot parse config file {0}")]
    Parse(PathBuf, #[source] serde_yaml::Error),
}

/// Node configuration (`node.*`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NodeConfig {
    /// Peer id of this node (`node.id`). Generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Whether to relay traffic between peers (`node.forward`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forward: Option<bool>,

    /// Default TTL for published node messages (`node.ttl`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u16>,

    /// Directory for recording outbound messages
    /// (`node.recording-directory`). Recording is off when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recording_directory: Option<PathBuf>,

    /// Maximum number of recorded messages
    /// (`node.output-generator-file-cap`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_generator_file_cap: Option<u64>,

    /// Reconnect interval in seconds for lost peers (`node.retry`).
    /// Zero disables reconnection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<u64>,
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Node configuration (`node.*`).
    #[serde(default)]
    pub node: NodeConfig,
}

impl Config {
    /// Create a new empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and merge every config file found along the standard search
    /// paths, later files winning over earlier ones.
    pub fn load() -> Result<(Self, Vec<PathBuf>), ConfigError> {
        Self::load_from_paths(&Self::search_paths())
    }

    /// Merge the files that exist among `paths`, in the order given.
    ///
    /// The second half of the result names the files that contributed.
    pub fn load_from_paths(paths: &[PathBuf]) -> Result<(Self, Vec<PathBuf>), ConfigError> {
        let found: Vec<PathBuf> = paths.iter().filter(|p| p.exists()).cloned().collect();
        let config = found.iter().try_fold(Config::default(), |mut merged, path| {
            merged.merge(Self::load_file(path)?);
            Ok::<_, ConfigError>(merged)
        })?;
        Ok((config, found))
    }

    /// Parse a single YAML config file.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        serde_yaml::from_str(&text).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
    }

    /// Get the standard search paths in priority order (lowest to highest).
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // System config (lowest priority)
        paths.push(PathBuf::from("/etc/pubmesh").join(CONFIG_FILENAME));

        // User config directory
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("pubmesh").join(CONFIG_FILENAME));
        }

        // Current directory (highest priority)
        paths.push(PathBuf::from(".").join(CONFIG_FILENAME));

        paths
    }

    /// Merge another configuration into this one.
    ///
    /// Values from `other` override values in `self` when present.
    pub fn merge(&mut self, other: Config) {
        if other.node.id.is_some() {
            self.node.id = other.node.id;
        }
        if other.node.forward.is_some() {
            self.node.forward = other.node.forward;
        }
        if other.node.ttl.is_some() {
            self.node.ttl = other.node.ttl;
        }
        if other.node.recording_directory.is_some() {
            self.node.recording_directory = other.node.recording_directory;
        }
        if other.node.output_generator_file_cap.is_some() {
            self.node.output_generator_file_cap = other.node.output_generator_file_cap;
        }
        if other.node.retry.is_some() {
            self.node.retry = other.node.retry;
        }
    }

    /// Create the peer id for this node.
    ///
    /// Uses the configured id when present, otherwise generates a random one.
    pub fn create_peer_id(&self) -> PeerId {
        match &self.node.id {
            Some(id) => PeerId::new(id.clone()),
            None => PeerId::random(),
        }
    }

    /// Check if a peer id is configured (vs. will be generated).
    pub fn has_id(&self) -> bool {
        self.node.id.is_some()
    }

    /// Whether onward relay across peers is enabled. Defaults to true.
    pub fn forward(&self) -> bool {
        self.node.forward.unwrap_or(true)
    }

    /// Default TTL for published node messages.
    pub fn ttl(&self) -> u16 {
        self.node.ttl.unwrap_or(DEFAULT_TTL)
    }

    /// The recording directory, if recording is requested.
    pub fn recording_directory(&self) -> Option<&Path> {
        self.node.recording_directory.as_deref()
    }

    /// Maximum number of recorded messages. Defaults to unlimited.
    pub fn output_generator_file_cap(&self) -> u64 {
        self.node.output_generator_file_cap.unwrap_or(u64::MAX)
    }

    /// Reconnect interval for lost peers. Zero disables reconnection.
    pub fn retry(&self) -> Duration {
        Duration::from_secs(self.node.retry.unwrap_or(DEFAULT_RETRY_SECS))
    }

    /// Serialize this configuration to YAML.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_empty_config_defaults() {
        let config = Config::new();
        assert!(!config.has_id());
        assert!(config.forward());
        assert_eq!(config.ttl(), DEFAULT_TTL);
        assert!(config.recording_directory().is_none());
        assert_eq!(config.output_generator_file_cap(), u64::MAX);
        assert_eq!(config.retry(), Duration::from_secs(DEFAULT_RETRY_SECS));
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
node:
  id: alpha
  forward: false
  ttl: 5
  recording-directory: /tmp/rec
  output-generator-file-cap: 100
  retry: 0
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.create_peer_id(), PeerId::new("alpha"));
        assert!(!config.forward());
        assert_eq!(config.ttl(), 5);
        assert_eq!(
            config.recording_directory(),
            Some(Path::new("/tmp/rec"))
        );
        assert_eq!(config.output_generator_file_cap(), 100);
        assert!(config.retry().is_zero());
    }

    #[test]
    fn test_generated_id_when_absent() {
        let config = Config::new();
        let a = config.create_peer_id();
        let b = config.create_peer_id();
        assert!(!a.is_empty());
        assert_ne!(a, b);
    }

    #[test]
    fn test_cascade_later_overrides_earlier() {
        let dir = TempDir::new().unwrap();
        let low = dir.path().join("low.yaml");
        let high = dir.path().join("high.yaml");
        fs::write(&low, "node:\n  id: low\n  ttl: 3\n").unwrap();
        fs::write(&high, "node:\n  id: high\n").unwrap();

        let (config, loaded) =
            Config::load_from_paths(&[low.clone(), high.clone()]).unwrap();
        assert_eq!(loaded, vec![low, high]);
        // The higher priority file wins for id but leaves ttl alone.
        assert_eq!(config.create_peer_id(), PeerId::new("high"));
        assert_eq!(config.ttl(), 3);
    }

    #[test]
    fn test_missing_files_are_skipped() {
        let (config, loaded) =
            Config::load_from_paths(&[PathBuf::from("/nonexistent/pubmesh.yaml")]).unwrap();
        assert!(loaded.is_empty());
        assert!(!config.has_id());
    }

    #[test]
    fn test_bad_yaml_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.yaml");
        fs::write(&path, "node: [not a mapping").unwrap();
        assert!(matches!(
            Config::load_from_paths(&[path]),
            Err(ConfigError::Parse(..))
        ));
    }

    #[test]
    fn test_yaml_round_trip() {
        let yaml = "node:\n  id: alpha\n  ttl: 7\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        let rendered = config.to_yaml().unwrap();
        let reparsed: Config = serde_yaml::from_str(&rendered).unwrap();
        assert_eq!(reparsed.create_peer_id(), PeerId::new("alpha"));
        assert_eq!(reparsed.ttl(), 7);
    }
}
