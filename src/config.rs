//! Configuration for a coupling session.
//!
//! Loaded from TOML or YAML with auto-detection of the file format, or
//! built in code for embedded use.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LockstepError, LockstepResult};

/// Transport kinds understood by this crate. `"mqtt"` is the production
/// kind (supplied by the embedding application through `BusLink`);
/// `"loopback"` is the in-process transport used by tests and demos.
pub const SUPPORTED_TRANSPORTS: &[&str] = &["mqtt", "loopback"];

/// Settings the engine supplies when opening a coupling session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouplingConfig {
    /// Name this node registers under on the bus. Must be a valid
    /// identifier (leading letter or underscore, then alphanumerics and
    /// underscores).
    pub node_name: String,

    /// Optional workspace prefix shared by every node of one simulation.
    #[serde(default)]
    pub workspace: Option<String>,

    /// Transport kind, matched against the bus link at session start.
    #[serde(default = "default_transport")]
    pub transport: String,

    /// Opaque transport configuration forwarded verbatim to the bus link
    /// (e.g. a broker address).
    #[serde(default)]
    pub transport_config: Option<String>,

    /// Stop the engine when the remote simulation terminates.
    #[serde(default)]
    pub quit_if_remote_stops: bool,

    /// Seconds to wait for a signal from the node. Zero or negative waits
    /// indefinitely.
    #[serde(default = "default_timeout")]
    pub timeout_secs: i64,
}

fn default_transport() -> String {
    "mqtt".to_string()
}

fn default_timeout() -> i64 {
    -1
}

impl CouplingConfig {
    /// Create a config with defaults for everything but the node name.
    pub fn new<S: Into<String>>(node_name: S) -> Self {
        Self {
            node_name: node_name.into(),
            workspace: None,
            transport: default_transport(),
            transport_config: None,
            quit_if_remote_stops: false,
            timeout_secs: default_timeout(),
        }
    }

    /// Load a config from a file (auto-detect format).
    pub fn from_file<P: AsRef<Path>>(path: P) -> LockstepResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| LockstepError::config(format!("Failed to read config file: {}", e)))?;

        let extension = path.extension().and_then(|s| s.to_str());
        match extension {
            Some("toml") => Self::from_toml(&contents),
            Some("yaml") | Some("yml") => Self::from_yaml(&contents),
            _ => Self::from_toml(&contents).or_else(|_| Self::from_yaml(&contents)),
        }
    }

    /// Parse a config from a TOML string.
    pub fn from_toml(contents: &str) -> LockstepResult<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a config from a YAML string.
    pub fn from_yaml(contents: &str) -> LockstepResult<Self> {
        let config: Self = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants a session start relies on.
    pub fn validate(&self) -> LockstepResult<()> {
        if !is_valid_node_name(&self.node_name) {
            return Err(LockstepError::config(format!(
                "'{}' is not a valid node name",
                self.node_name
            )));
        }
        if !SUPPORTED_TRANSPORTS.contains(&self.transport.as_str()) {
            return Err(LockstepError::config(format!(
                "unsupported transport kind '{}'",
                self.transport
            )));
        }
        Ok(())
    }

    /// Wait bound for node signals; `None` means wait indefinitely.
    pub fn timeout(&self) -> Option<Duration> {
        if self.timeout_secs <= 0 {
            None
        } else {
            Some(Duration::from_secs(self.timeout_secs as u64))
        }
    }

    /// Bus-visible name, with the workspace prefix when one is set.
    pub fn qualified_name(&self) -> String {
        match &self.workspace {
            Some(ws) if !ws.is_empty() => format!("{}/{}", ws, self.node_name),
            _ => self.node_name.clone(),
        }
    }
}

/// A node name is an identifier: leading letter or underscore, then
/// alphanumerics and underscores.
pub fn is_valid_node_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
