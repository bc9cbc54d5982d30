//! Device-profile configuration and indexing layer.
//!
//! This crate keeps a set of in-memory lookup indices derived from the
//! device-profile document (the "DPL") consistent with the document on disk.
//! The protocol driver and the message-bus publisher consult the indices to
//! resolve which device maps to which model, which protocol to use, and how
//! to reach each named property.
//!
//! ## Architecture
//!
//! - **[`ProfileIndexer`]**: derives four cross-referenced lookup maps from
//!   each parse of the DPL and swaps them in as one immutable
//!   [`ProfileIndex`] snapshot.
//! - **[`ProfileWatcher`]**: watches the profile location, coalesces write
//!   bursts behind a settle window, and invokes a reload callback. It is
//!   generic over "what to do on change" and never parses the file itself.
//! - **[`watch_and_reload`]**: the canonical wiring of the two. Every
//!   settled change rebuilds the indexer, keeping the last-known-good
//!   snapshot when a read or parse fails.
//!
//! Data flow: watcher detects change → settle window elapses → reload
//! callback fires with the profile path → indexer reads, parses, and
//! rebuilds → consumers observe the new snapshot on their next query.

pub mod document;
pub mod indexer;
pub mod watcher;

pub use document::{
    protocol_family, DeviceInstance, DeviceModel, DeviceProfileDocument, ModelProperty,
    PropertyVisitor, ProtocolConfig,
};
pub use indexer::{
    load_profile, visitor_key, IntegrityViolation, ProfileError, ProfileIndex, ProfileIndexer,
};
pub use watcher::{
    watch_and_reload, watch_and_reload_with_debounce, ProfileWatcher, WatchError,
    DEFAULT_DEBOUNCE,
};
