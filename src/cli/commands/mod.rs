//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Opens the registry store named by the context
//! 2. Calls the core for the operation
//! 3. Formats and displays output
//!
//! Destructive handlers pass the caller's guard straight through to the
//! store, so a stale fingerprint fails before anything is written.

mod hash;
mod node;
mod profile;

use std::path::PathBuf;

use anyhow::Result;

use crate::cli::args::{Command, NodeAction, ProfileAction};
use crate::core::registry::RegistryStore;
use crate::ui::output::Verbosity;

/// Settings shared by every handler.
#[derive(Debug, Clone)]
pub struct Context {
    /// Registry file
    pub nodes_conf: PathBuf,
    /// Membership for nodes added without `--profile`
    pub default_profiles: Vec<String>,
    pub verbosity: Verbosity,
}

impl Context {
    pub fn store(&self) -> RegistryStore {
        RegistryStore::new(&self.nodes_conf)
    }
}

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Node { action } => match action {
            NodeAction::List { all, names } => node::list(ctx, &names, all),
            NodeAction::Get { name, field } => node::get(ctx, &name, &field),
            NodeAction::Add { profiles, names } => node::add(ctx, &names, &profiles),
            NodeAction::Delete { names, guard } => {
                node::delete(ctx, &names, &guard.precondition())
            }
        },
        Command::Profile { action } => match action {
            ProfileAction::List { all, names } => profile::list(ctx, &names, all),
            ProfileAction::Add { names } => profile::add(ctx, &names),
            ProfileAction::Delete { names, guard } => {
                profile::delete(ctx, &names, &guard.precondition())
            }
        },
        Command::Hash => hash::hash(ctx),
    }
}
