//! core
//!
//! Domain types, introspection, resolution, merge, and persistence for
//! the node registry.
//!
//! # Modules
//!
//! - [`types`] - Strong types: EntityName, ProfileRef, HwAddr, Fingerprint
//! - [`entity`] - Node and profile records and their YAML mapping
//! - [`fields`] - Field path introspection
//! - [`resolve`] - Profile closure for a node
//! - [`merge`] - Effective node construction with provenance
//! - [`registry`] - The registry document, queries, and storage
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - The serialized document is canonical, so its digest is stable
//! - Merged views are derived on demand and never stored

pub mod config;
pub mod entity;
pub mod fields;
pub mod merge;
pub mod registry;
pub mod resolve;
pub mod types;
