//! Network settings
//!
//! Persisted as a JSON file next to the host's other configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Which half of a client/server split this network lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Side {
    /// Authoritative: transactions commit
    #[default]
    Server,
    /// Prediction only: transactions are always simulated
    Client,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Server => "Server",
            Side::Client => "Client",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "server" => Some(Side::Server),
            "client" | "remote" => Some(Side::Client),
            _ => None,
        }
    }

    pub fn is_remote(&self) -> bool {
        *self == Side::Client
    }
}

/// Failure to read or write a settings file
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("settings I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Network configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub side: Side,

    // === Node defaults ===
    /// Input slots for nodes built from settings
    pub default_max_inputs: usize,
    /// Output slots for nodes built from settings
    pub default_max_outputs: usize,
    /// Link reach in blocks
    pub default_max_connect_distance: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            side: Side::Server,

            default_max_inputs: DEFAULT_MAX_INPUTS,
            default_max_outputs: DEFAULT_MAX_OUTPUTS,
            default_max_connect_distance: DEFAULT_MAX_CONNECT_DISTANCE,
        }
    }
}

impl Settings {
    /// Apply these defaults to a freshly built node
    pub fn configure(&self, node: crate::net::Node) -> crate::net::Node {
        let max_inputs = if node.accepts() { self.default_max_inputs } else { 0 };
        let max_outputs = if node.emits() { self.default_max_outputs } else { 0 };
        node.with_limits(max_inputs, max_outputs)
            .with_connect_distance(self.default_max_connect_distance)
    }

    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let json = fs::read_to_string(path)?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Load settings, falling back to defaults on any failure
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Using default settings ({})", e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        fs::write(path, self.to_json()?)?;
        log::info!("Settings saved to {}", path.display());
        Ok(())
    }
}
