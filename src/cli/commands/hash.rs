//! hash command - Print the registry fingerprint

use anyhow::{Context as _, Result};

use super::Context;
use crate::ui::output;

/// Print the fingerprint of the registry as it is on disk.
///
/// A missing registry file hashes as the empty registry.
pub fn hash(ctx: &Context) -> Result<()> {
    let registry = ctx
        .store()
        .load_or_default()
        .with_context(|| format!("Failed to load {}", ctx.nodes_conf.display()))?;
    let fingerprint = registry.hash().context("Failed to hash registry")?;
    output::data(fingerprint);
    Ok(())
}
