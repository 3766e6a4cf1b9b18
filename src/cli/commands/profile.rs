//! profile command - List, add, and delete profiles

use anyhow::{Context as _, Result};

use super::node::load;
use super::Context;
use crate::core::fields::field_list;
use crate::core::registry::Precondition;
use crate::ui::output;

/// List raw profiles.
pub fn list(ctx: &Context, names: &[String], all: bool) -> Result<()> {
    let registry = load(ctx)?;
    let profiles = registry
        .find_all_profiles(names)
        .context("Failed to look up profiles")?;

    if !all {
        let rows: Vec<Vec<String>> = profiles
            .iter()
            .map(|(id, profile)| {
                vec![
                    id.clone(),
                    profile.comment.clone(),
                    profile.cluster_name.clone(),
                ]
            })
            .collect();
        output::data(output::format_table(
            &["PROFILE", "COMMENT", "CLUSTER"],
            &rows,
        ));
        return Ok(());
    }

    for (id, profile) in &profiles {
        let rows: Vec<Vec<String>> = field_list(profile)
            .into_iter()
            .map(|field| vec![field.field, field.value])
            .collect();
        output::data(format!("# {id}"));
        output::data(output::format_table(&["FIELD", "VALUE"], &rows));
    }
    Ok(())
}

/// Add empty profiles.
pub fn add(ctx: &Context, names: &[String]) -> Result<()> {
    ctx.store()
        .update(&Precondition::Force, |registry| {
            for name in names {
                registry.add_profile(name)?;
            }
            Ok(())
        })
        .context("Failed to add profiles")?;

    for name in names {
        output::success(format!("Added profile {name}"), ctx.verbosity);
    }
    Ok(())
}

/// Delete profiles under a precondition.
///
/// Nodes that still name a deleted profile keep the reference; it is
/// skipped with a warning when they are merged.
pub fn delete(ctx: &Context, names: &[String], precondition: &Precondition) -> Result<()> {
    ctx.store()
        .delete_profiles(names, precondition)
        .context("Failed to delete profiles")?;

    for name in names {
        output::success(format!("Deleted profile {name}"), ctx.verbosity);
    }
    Ok(())
}
