//! ui
//!
//! User interaction utilities.
//!
//! # Modules
//!
//! - [`output`] - Output formatting and display
//!
//! # Design
//!
//! Everything a command shows the user goes through this module so the
//! quiet flag is honored in one place. Diagnostics go through `tracing`
//! instead.

pub mod output;
