//! Transport configuration loading.
//!
//! Responsibilities:
//! - Parse the mqtt/transport configuration document (JSON).
//! - Merge an override source onto it; each overridable connection field
//!   falls back to a fixed default when no override is present.
//!
//! Does NOT handle:
//! - Connecting to the broker (the publisher owns transport I/O).
//! - The device profile document itself (see the profile crate).
//!
//! Invariants / Assumptions:
//! - The overridable trio (`mqtt_port`, `mqtt_ip`, `dpl_name`) is always
//!   override-or-default; values the file carries for them are not consulted.
//! - Nothing is cached; every load re-reads the file.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variables consulted by [`ConfigOverrides::from_env`].
pub mod env_vars {
    /// Broker port override.
    pub const MQTT_PORT: &str = "CONNECTOR_MQTT_PORT";
    /// Broker host override.
    pub const MQTT_IP: &str = "CONNECTOR_MQTT_IP";
    /// Device profile document path override.
    pub const DPL_NAME: &str = "CONNECTOR_DPL_NAME";
}

/// Fallbacks applied when an override is absent.
pub mod defaults {
    pub const MQTT_PORT: u16 = 1883;
    pub const MQTT_IP: &str = "127.0.0.1";
    pub const DPL_NAME: &str = "dpl/deviceProfile.json";
}

/// Errors that abort a config load.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Parsed transport configuration with overrides applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Broker port.
    #[serde(default)]
    pub mqtt_port: u16,

    /// Broker host.
    #[serde(default)]
    pub mqtt_ip: String,

    /// Path of the device profile document.
    #[serde(default)]
    pub dpl_name: String,

    /// Remainder of the document, carried through untouched for the
    /// transport layer.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl TransportConfig {
    /// Merge `overrides` onto the parsed document.
    ///
    /// Each overridable field takes the override when present and its fixed
    /// default otherwise.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        self.mqtt_port = overrides.mqtt_port.unwrap_or(defaults::MQTT_PORT);
        self.mqtt_ip = overrides
            .mqtt_ip
            .clone()
            .unwrap_or_else(|| defaults::MQTT_IP.to_string());
        self.dpl_name = overrides
            .dpl_name
            .clone()
            .unwrap_or_else(|| defaults::DPL_NAME.to_string());
    }
}

/// Override source for the connection parameters, decoupled from any
/// particular process-environment API.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub mqtt_port: Option<u16>,
    pub mqtt_ip: Option<String>,
    pub dpl_name: Option<String>,
}

impl ConfigOverrides {
    /// Collect overrides from the process environment.
    ///
    /// Unset and empty variables count as absent. An unparsable port is
    /// logged and ignored rather than failing the load.
    pub fn from_env() -> Self {
        let mqtt_port = non_empty_var(env_vars::MQTT_PORT).and_then(|raw| match raw.parse() {
            Ok(port) => Some(port),
            Err(_) => {
                tracing::warn!(
                    var = env_vars::MQTT_PORT,
                    value = %raw,
                    "ignoring unparsable broker port override"
                );
                None
            }
        });

        Self {
            mqtt_port,
            mqtt_ip: non_empty_var(env_vars::MQTT_IP),
            dpl_name: non_empty_var(env_vars::DPL_NAME),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

/// Load the transport configuration at `path`, applying environment
/// overrides.
pub fn load_config(path: impl AsRef<Path>) -> Result<TransportConfig, ConfigError> {
    load_config_with(path, &ConfigOverrides::from_env())
}

/// Load the transport configuration at `path` with an explicit override
/// source.
pub fn load_config_with(
    path: impl AsRef<Path>,
    overrides: &ConfigOverrides,
) -> Result<TransportConfig, ConfigError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut config: TransportConfig =
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    config.apply_overrides(overrides);
    Ok(config)
}
