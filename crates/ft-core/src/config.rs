//! Connection configuration
//!
//! SSH connection knobs with file-based defaults. The CLI loads
//! `~/.config/fantail/config.toml` if present and applies flag
//! overrides on top.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

fn default_port() -> u16 {
    22
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_remote_command() -> String {
    "fantail remote-tail".to_string()
}

/// Options for establishing remote execution contexts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectOptions {
    /// SSH username (defaults to the local user at connect time)
    #[serde(default)]
    pub username: Option<String>,

    /// SSH port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path to the private key for publickey auth
    /// (defaults to ~/.ssh/id_ed25519)
    #[serde(default)]
    pub private_key_path: Option<PathBuf>,

    /// Per-host connect timeout in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Command executed on the remote host to start the tail producer
    #[serde(default = "default_remote_command")]
    pub remote_command: String,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            username: None,
            port: default_port(),
            private_key_path: None,
            connect_timeout_secs: default_connect_timeout_secs(),
            remote_command: default_remote_command(),
        }
    }
}

impl ConnectOptions {
    /// The SSH username, falling back to the local user
    pub fn username(&self) -> String {
        self.username.clone().unwrap_or_else(whoami::username)
    }

    /// The private key path, falling back to ~/.ssh/id_ed25519
    pub fn private_key_path(&self) -> PathBuf {
        self.private_key_path.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".ssh")
                .join("id_ed25519")
        })
    }

    /// Per-host connect timeout
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Get the default configuration file path
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fantail")
        .join("config.toml")
}

/// Load connect options from a file
pub fn load_options(path: &Path) -> Result<ConnectOptions, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Invalid(format!("Failed to read config: {}", e)))?;

    let options: ConnectOptions = toml::from_str(&content)?;
    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let options = ConnectOptions::default();
        assert_eq!(options.port, 22);
        assert_eq!(options.connect_timeout_secs, 10);
        assert_eq!(options.remote_command, "fantail remote-tail");
        assert!(options.private_key_path().ends_with(".ssh/id_ed25519"));
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = 2222").unwrap();
        writeln!(file, "username = \"deploy\"").unwrap();

        let options = load_options(file.path()).unwrap();
        assert_eq!(options.port, 2222);
        assert_eq!(options.username(), "deploy");
        // Unspecified fields keep their defaults
        assert_eq!(options.remote_command, "fantail remote-tail");
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_options(Path::new("/nonexistent/fantail.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = \"not a number\"").unwrap();

        let result = load_options(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
