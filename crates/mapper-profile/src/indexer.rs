//! Profile indices and their rebuild protocol.
//!
//! Four cross-referenced lookup maps are derived from every parse of the
//! DPL document:
//!
//! - instance id → [`DeviceInstance`]
//! - instance id → [`DeviceModel`] (resolved via `instance.model`)
//! - instance id → [`ProtocolConfig`] (resolved via `instance.protocol`)
//! - `"{model}-{property}-{family}"` → [`PropertyVisitor`]
//!
//! A rebuild constructs a complete new [`ProfileIndex`] and swaps it in
//! wholesale; consumers hold `Arc` snapshots and can never observe a
//! half-built index. A failed read or parse leaves the previous snapshot in
//! place (last-known-good).

use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::document::{
    protocol_family, DeviceInstance, DeviceModel, DeviceProfileDocument, PropertyVisitor,
    ProtocolConfig,
};

/// Errors that abort a single reload attempt.
#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("failed to read device profile {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse device profile {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A cross-reference the document declares but does not satisfy.
///
/// Violations never abort a rebuild; the affected entry is simply absent
/// from the corresponding map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityViolation {
    /// `instance.model` names no model in the document.
    ModelNotFound { instance_id: String, model: String },

    /// `instance.protocol` names no protocol in the document.
    ProtocolNotFound {
        instance_id: String,
        protocol: String,
    },

    /// No instance carries a visitor for this model property.
    VisitorNotFound { model: String, property: String },
}

impl fmt::Display for IntegrityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModelNotFound { instance_id, model } => {
                write!(f, "model {model} not found for device {instance_id}")
            }
            Self::ProtocolNotFound {
                instance_id,
                protocol,
            } => {
                write!(f, "protocol {protocol} not found for device {instance_id}")
            }
            Self::VisitorNotFound { model, property } => {
                write!(f, "no visitor found for model {model}, property {property}")
            }
        }
    }
}

/// One immutable snapshot of the four lookup maps.
#[derive(Debug, Clone, Default)]
pub struct ProfileIndex {
    instances: HashMap<String, DeviceInstance>,
    models: HashMap<String, DeviceModel>,
    protocols: HashMap<String, ProtocolConfig>,
    visitors: HashMap<String, PropertyVisitor>,
}

impl ProfileIndex {
    /// Build a fresh index from a parsed document.
    ///
    /// Construction always completes: unresolvable cross-references are
    /// logged, collected, and skipped.
    pub fn build(doc: &DeviceProfileDocument) -> (Self, Vec<IntegrityViolation>) {
        let mut index = Self::default();
        let mut violations = Vec::new();

        for instance in &doc.device_instances {
            index
                .instances
                .insert(instance.id.clone(), instance.clone());

            match doc.device_models.iter().find(|m| m.name == instance.model) {
                Some(model) => {
                    index.models.insert(instance.id.clone(), model.clone());
                }
                None => {
                    report(
                        &mut violations,
                        IntegrityViolation::ModelNotFound {
                            instance_id: instance.id.clone(),
                            model: instance.model.clone(),
                        },
                    );
                }
            }

            match doc.protocols.iter().find(|p| p.name == instance.protocol) {
                Some(protocol) => {
                    index
                        .protocols
                        .insert(instance.id.clone(), protocol.clone());
                }
                None => {
                    report(
                        &mut violations,
                        IntegrityViolation::ProtocolNotFound {
                            instance_id: instance.id.clone(),
                            protocol: instance.protocol.clone(),
                        },
                    );
                }
            }
        }

        for model in &doc.device_models {
            for property in &model.properties {
                let found = doc
                    .device_instances
                    .iter()
                    .find_map(|instance| instance.visitor(&model.name, &property.name));

                match found {
                    Some(visitor) => {
                        let key = visitor_key(
                            &visitor.model_name,
                            &visitor.property_name,
                            &visitor.protocol,
                        );
                        // Duplicate triples overwrite: last write wins.
                        index.visitors.insert(key, visitor.clone());
                    }
                    None => {
                        report(
                            &mut violations,
                            IntegrityViolation::VisitorNotFound {
                                model: model.name.clone(),
                                property: property.name.clone(),
                            },
                        );
                    }
                }
            }
        }

        (index, violations)
    }

    /// The instance registered under `id`.
    pub fn instance(&self, id: &str) -> Option<&DeviceInstance> {
        self.instances.get(id)
    }

    /// The model the instance `id` conforms to.
    pub fn model_for(&self, id: &str) -> Option<&DeviceModel> {
        self.models.get(id)
    }

    /// The protocol configuration the instance `id` speaks.
    pub fn protocol_for(&self, id: &str) -> Option<&ProtocolConfig> {
        self.protocols.get(id)
    }

    /// The visitor bound to `(model, property)` under the protocol's family.
    pub fn visitor(&self, model: &str, property: &str, protocol: &str) -> Option<&PropertyVisitor> {
        self.visitors.get(&visitor_key(model, property, protocol))
    }

    /// Raw composite-key lookup.
    pub fn visitor_by_key(&self, key: &str) -> Option<&PropertyVisitor> {
        self.visitors.get(key)
    }

    /// Ids of every indexed instance, in no particular order.
    pub fn instance_ids(&self) -> impl Iterator<Item = &str> {
        self.instances.keys().map(String::as_str)
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub fn visitor_count(&self) -> usize {
        self.visitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty() && self.visitors.is_empty()
    }
}

fn report(violations: &mut Vec<IntegrityViolation>, violation: IntegrityViolation) {
    tracing::warn!(%violation, "device profile integrity violation");
    violations.push(violation);
}

/// Composite visitor key: `{model}-{property}-{family}`.
///
/// The protocol designator is normalized to its family, so both modbus
/// transports land on the same key.
pub fn visitor_key(model: &str, property: &str, protocol: &str) -> String {
    format!("{model}-{property}-{}", protocol_family(protocol))
}

/// Read and parse a DPL document.
pub fn load_profile(path: impl AsRef<Path>) -> Result<DeviceProfileDocument, ProfileError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|source| ProfileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ProfileError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Owner of the live index snapshot.
///
/// Starts empty; the first successful [`reload`](Self::reload) populates it
/// and every later one supersedes it wholesale. Readers take cheap
/// [`snapshot`](Self::snapshot) clones and are never blocked by a rebuild
/// for longer than the pointer swap.
#[derive(Debug, Default)]
pub struct ProfileIndexer {
    current: RwLock<Arc<ProfileIndex>>,
}

impl ProfileIndexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<ProfileIndex> {
        Arc::clone(&self.current.read())
    }

    /// Derive a new index from `doc` and swap it in.
    pub fn rebuild(&self, doc: &DeviceProfileDocument) -> Vec<IntegrityViolation> {
        let (index, violations) = ProfileIndex::build(doc);
        *self.current.write() = Arc::new(index);
        violations
    }

    /// Read, parse, and rebuild from the document at `path`.
    ///
    /// On read or parse failure the previous snapshot is retained untouched.
    pub fn reload(&self, path: impl AsRef<Path>) -> Result<Vec<IntegrityViolation>, ProfileError> {
        let doc = load_profile(path)?;
        Ok(self.rebuild(&doc))
    }
}
