//! node command - List, show, add, and delete nodes
//!
//! Listing and field lookup work on merged nodes; add and delete work on
//! the raw records.

use anyhow::{Context as _, Result};

use super::Context;
use crate::core::fields::{get_field_string, list_fields};
use crate::core::registry::{Precondition, Registry};
use crate::ui::output;

/// List merged nodes.
///
/// With `all`, every field of each node is shown with its source.
pub fn list(ctx: &Context, names: &[String], all: bool) -> Result<()> {
    let registry = load(ctx)?;
    let nodes = registry
        .find_all_nodes(names)
        .context("Failed to merge nodes")?;

    if !all {
        let rows: Vec<Vec<String>> = nodes
            .iter()
            .map(|(id, node)| {
                vec![
                    id.clone(),
                    node.profile.profiles.join(","),
                    node.profile.cluster_name.clone(),
                    node.profile.image_name.clone(),
                ]
            })
            .collect();
        output::data(output::format_table(
            &["NODE", "PROFILES", "CLUSTER", "IMAGE"],
            &rows,
        ));
        return Ok(());
    }

    for (id, _) in &nodes {
        let (node, fields) = registry
            .merge_node(id)
            .with_context(|| format!("Failed to merge node {id}"))?;
        let rows: Vec<Vec<String>> = list_fields(&node)
            .into_iter()
            .map(|path| {
                let value = get_field_string(&node, &path).unwrap_or_default();
                let source = fields.source(&path).to_string();
                vec![path, source, value]
            })
            .collect();
        output::data(format!("# {id}"));
        output::data(output::format_table(&["FIELD", "SOURCE", "VALUE"], &rows));
    }
    Ok(())
}

/// Print one field of a merged node.
pub fn get(ctx: &Context, name: &str, field: &str) -> Result<()> {
    let registry = load(ctx)?;
    let (node, _) = registry
        .merge_node(name)
        .with_context(|| format!("Failed to merge node {name}"))?;
    let value = get_field_string(&node, field)
        .with_context(|| format!("Failed to read {field} of node {name}"))?;
    output::data(value);
    Ok(())
}

/// Add nodes with the given (or configured) profile membership.
pub fn add(ctx: &Context, names: &[String], profiles: &[String]) -> Result<()> {
    let profiles = if profiles.is_empty() {
        ctx.default_profiles.clone()
    } else {
        profiles.to_vec()
    };

    ctx.store()
        .update(&Precondition::Force, |registry| {
            for name in names {
                let node = registry.add_node(name)?;
                node.profile.profiles.clone_from(&profiles);
            }
            Ok(())
        })
        .context("Failed to add nodes")?;

    for name in names {
        output::success(format!("Added node {name}"), ctx.verbosity);
    }
    Ok(())
}

/// Delete nodes under a precondition.
pub fn delete(ctx: &Context, names: &[String], precondition: &Precondition) -> Result<()> {
    ctx.store()
        .delete_nodes(names, precondition)
        .context("Failed to delete nodes")?;

    for name in names {
        output::success(format!("Deleted node {name}"), ctx.verbosity);
    }
    Ok(())
}

pub(super) fn load(ctx: &Context) -> Result<Registry> {
    ctx.store()
        .load()
        .with_context(|| format!("Failed to load {}", ctx.nodes_conf.display()))
}
