//! Declaration resolution: flattening group references into a [`Model`].
//!
//! Resolution is a three step pipeline: parse the declaration into raw
//! groups, build the reference graph and reject cycles, then flatten each
//! group in dependency order. Flattening walks a group's items in document
//! order; a resource item appends itself, a reference item splices in the
//! referenced group's already-flattened resource list. Because groups are
//! flattened referenced-first, every reference hits a finished list and each
//! group is flattened exactly once no matter how many groups reference it.

use std::collections::HashMap;

use tracing::debug;

use crate::core::{BundleError, Result};
use crate::model::graph::GroupGraph;
use crate::model::parser::{self, RawItem};
use crate::model::{Group, Model, Resource};

/// Resolve a declaration document into an immutable [`Model`].
///
/// Fails with [`BundleError::ModelParse`] on malformed input or a reference
/// to an undeclared group, and [`BundleError::RecursiveGroup`] on reference
/// cycles. Resolving the same text twice yields identical models.
pub fn resolve(declaration: &str) -> Result<Model> {
    let raw = parser::parse_declaration(declaration)?;

    let mut graph = GroupGraph::new();
    for (name, items) in &raw {
        graph.ensure_group(name);
        for item in items {
            if let RawItem::GroupRef(target) = item {
                if !raw.contains_key(target) {
                    return Err(BundleError::ModelParse {
                        reason: format!(
                            "group '{name}' references undeclared group '{target}'"
                        ),
                    });
                }
                graph.add_reference(name, target);
            }
        }
    }

    let order = graph.resolution_order()?;

    let mut flattened: HashMap<String, Vec<Resource>> = HashMap::with_capacity(raw.len());
    for name in order {
        let mut resources = Vec::new();
        for item in &raw[&name] {
            match item {
                RawItem::Resource(resource) => resources.push(resource.clone()),
                RawItem::GroupRef(target) => {
                    resources.extend(flattened[target].iter().cloned());
                }
            }
        }
        debug!(group = %name, resources = resources.len(), "flattened group");
        flattened.insert(name, resources);
    }

    let groups = flattened
        .into_iter()
        .map(|(name, resources)| {
            let group = Group {
                name: name.clone(),
                resources,
            };
            (name, group)
        })
        .collect();
    Ok(Model::new(groups))
}
