//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--nodes-conf <path>`: Registry file to operate on
//! - `--config <path>`: Tool config file to load
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::core::registry::Precondition;
use crate::core::types::Fingerprint;

/// nodectl - Manage the node and profile registry
#[derive(Parser, Debug)]
#[command(name = "nodectl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Registry file (overrides the configured location)
    #[arg(long, global = true, value_name = "PATH")]
    pub nodes_conf: Option<PathBuf>,

    /// Load tool configuration from this file only
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage node records
    #[command(
        name = "node",
        after_help = "\
WORKFLOW EXAMPLES:
    # Effective configuration of every node
    nodectl node list

    # Where each field of n001 comes from
    nodectl node list --all n001

    # One merged field
    nodectl node get n001 NetDevs[eth0].Ipaddr

    # Delete only if nobody changed the registry since you looked
    nodectl node delete n001 --hash $(nodectl hash)"
    )]
    Node {
        #[command(subcommand)]
        action: NodeAction,
    },

    /// Manage profile records
    #[command(name = "profile")]
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Print the registry fingerprint
    #[command(
        name = "hash",
        long_about = "Print the registry fingerprint.\n\n\
            The fingerprint is the SHA-256 digest of the canonical registry \
            document. Pass it to a delete command with --hash to refuse the \
            delete if the registry changed in the meantime."
    )]
    Hash,
}

/// Node subcommands.
#[derive(Subcommand, Debug)]
pub enum NodeAction {
    /// List nodes with their merged configuration
    List {
        /// Show every field with the entity that supplied it
        #[arg(short, long)]
        all: bool,

        /// Nodes to show (all when omitted)
        names: Vec<String>,
    },

    /// Print one field of a merged node
    Get {
        /// Node name
        name: String,

        /// Field path, e.g. `Kernel.Args` or `NetDevs[eth0].Hwaddr`
        field: String,
    },

    /// Add nodes
    Add {
        /// Profile membership (defaults to the configured node defaults)
        #[arg(short = 'P', long = "profile", value_name = "PROFILE")]
        profiles: Vec<String>,

        /// Node names
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Delete nodes
    Delete {
        /// Node names
        #[arg(required = true)]
        names: Vec<String>,

        #[command(flatten)]
        guard: Guard,
    },
}

/// Profile subcommands.
#[derive(Subcommand, Debug)]
pub enum ProfileAction {
    /// List profiles
    List {
        /// Show every field of each profile
        #[arg(short, long)]
        all: bool,

        /// Profiles to show (all when omitted)
        names: Vec<String>,
    },

    /// Add profiles
    Add {
        /// Profile names
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Delete profiles
    Delete {
        /// Profile names
        #[arg(required = true)]
        names: Vec<String>,

        #[command(flatten)]
        guard: Guard,
    },
}

/// Guard required by destructive commands.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct Guard {
    /// Apply only if the registry still has this fingerprint
    #[arg(long, value_name = "HEX")]
    pub hash: Option<Fingerprint>,

    /// Apply unconditionally
    #[arg(long)]
    pub force: bool,
}

impl Guard {
    pub fn precondition(&self) -> Precondition {
        match self.hash {
            Some(fingerprint) => Precondition::Hash(fingerprint),
            None => Precondition::Force,
        }
    }
}
