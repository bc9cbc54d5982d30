//! Transport configuration for the device-protocol mapper.
//!
//! Loads the mqtt/transport configuration document, merging connection
//! overrides onto it with fixed fallbacks, and exposes the static
//! message-bus topic constants the publisher subscribes with.
//!
//! This crate is a leaf: it knows nothing about the device profile beyond
//! the path it reports in [`TransportConfig::dpl_name`].

pub mod loader;
pub mod topics;

pub use loader::{load_config, load_config_with, ConfigError, ConfigOverrides, TransportConfig};
