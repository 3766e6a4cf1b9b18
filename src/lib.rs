//! nodereg - Node and profile registry for stateless cluster provisioning
//!
//! A registry holds named node records and named profile records in one
//! YAML document. Nodes reference profiles by name; the effective
//! configuration of a node is its own record layered over the transitive
//! closure of its profiles, with every field tagged by the entity that
//! supplied it.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (`nodectl`)
//! - [`core`] - Domain types, introspection, merge, and persistence
//! - [`ui`] - User-facing output
//!
//! # Correctness Invariants
//!
//! 1. Equal registry content always produces an equal fingerprint
//! 2. Writes are atomic; readers never see a partial document
//! 3. A mutation guarded by a stale fingerprint is refused
//! 4. Merged views never leak back into stored records

pub mod cli;
pub mod core;
pub mod ui;
