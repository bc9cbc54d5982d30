//! Device profile (DPL) document model.
//!
//! The DPL is a JSON document describing device instances, the models they
//! conform to, the protocols they speak, and per-property visitor bindings
//! telling the protocol driver how to reach each named property. A parse
//! always produces a wholly new document; nothing patches one in place.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Top-level DPL document. Sections the file omits default to empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceProfileDocument {
    #[serde(default)]
    pub device_instances: Vec<DeviceInstance>,
    #[serde(default)]
    pub device_models: Vec<DeviceModel>,
    #[serde(default)]
    pub protocols: Vec<ProtocolConfig>,
}

/// A configured device.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInstance {
    /// Unique device id; keys every derived index.
    pub id: String,

    /// Name of the [`DeviceModel`] this device conforms to.
    pub model: String,

    /// Name of the [`ProtocolConfig`] this device speaks.
    pub protocol: String,

    /// Per-property access bindings.
    #[serde(default)]
    pub property_visitors: Vec<PropertyVisitor>,
}

impl DeviceInstance {
    /// The first visitor bound to `(model_name, property_name)`.
    ///
    /// Lookup is keyed on the visitor's own declared binding, independent of
    /// where it sits in the list.
    pub fn visitor(&self, model_name: &str, property_name: &str) -> Option<&PropertyVisitor> {
        self.property_visitors
            .iter()
            .find(|v| v.model_name == model_name && v.property_name == property_name)
    }
}

/// How the protocol driver reads or writes one named property.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyVisitor {
    pub model_name: String,
    pub property_name: String,

    /// Declared protocol designator, e.g. "modbus-rtu" or "modbus-tcp".
    pub protocol: String,

    /// Protocol-specific access payload (register addresses and the like),
    /// carried through untouched for the driver.
    #[serde(flatten)]
    pub config: HashMap<String, serde_json::Value>,
}

/// A device model and its property list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceModel {
    pub name: String,
    #[serde(default)]
    pub properties: Vec<ModelProperty>,
}

/// A named property of a model; opaque beyond its name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelProperty {
    pub name: String,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Protocol configuration; opaque beyond its name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolConfig {
    pub name: String,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Collapse transport-specific modbus designators into one family.
///
/// `modbus-rtu` and `modbus-tcp` address the same register space, so the
/// visitor index keys them as plain `modbus`. Every other designator is its
/// own family, making the mapping total and idempotent.
pub fn protocol_family(protocol: &str) -> &str {
    match protocol {
        "modbus-rtu" | "modbus-tcp" => "modbus",
        other => other,
    }
}
