//! Tree navigation over a [`ContentStore`].
//!
//! - Which children of a node derive from a template?
//! - What are a node's ancestors, and its full subtree?
//! - Which nodes hold references to a node?
//! - Is a node inside the current site's tree?
//!
//! # Ordering
//!
//! Children keep the store's child order. Ancestors are nearest first, root
//! last. Descendants are breadth-first. Referrers keep link-index order.
//!
//! # Cycle handling
//!
//! A parent chain that revisits a node means the store is malformed and is
//! reported as [`TrellisError::ParentCycle`]. The subtree walk skips
//! revisited nodes instead, matching how the store's own axis would.

use anyhow::Context as _;
use std::collections::{HashSet, VecDeque};
use tracing::debug;

use crate::error::{Result, TrellisError};
use crate::model::{Node, NodeId};
use crate::store::{ContentStore, ContextService, LinkIndex, StoreRegistry};
use crate::template::derives_from;

/// Direct children of `node` whose effective template derives from
/// `template_id`, in store child order.
///
/// # Errors
///
/// [`TrellisError::TemplateCycle`] or [`TrellisError::Store`] from the
/// derivation check or child lookup.
pub fn children_derived_from(
    store: &dyn ContentStore,
    node: &Node,
    template_id: &NodeId,
) -> Result<Vec<Node>> {
    let children = store
        .get_children(node)
        .with_context(|| format!("get_children for '{}'", node.id))?;

    let mut matching = Vec::with_capacity(children.len());
    for child in children {
        if derives_from(store, Some(&child), template_id)? {
            matching.push(child);
        }
    }

    Ok(matching)
}

/// Ancestors of `node`, nearest first. Empty for a root.
///
/// # Errors
///
/// [`TrellisError::ParentCycle`] when the store's ancestor axis contains
/// `node` itself or repeats an entry, or [`TrellisError::Store`].
pub fn ancestors(store: &dyn ContentStore, node: &Node) -> Result<Vec<Node>> {
    let ancestors = store
        .get_ancestors(node)
        .with_context(|| format!("get_ancestors for '{}'", node.id))?;

    let mut seen: HashSet<&NodeId> = HashSet::new();
    seen.insert(&node.id);
    for ancestor in &ancestors {
        if !seen.insert(&ancestor.id) {
            return Err(TrellisError::ParentCycle {
                node: node.id.clone(),
                repeated: ancestor.id.clone(),
            });
        }
    }

    Ok(ancestors)
}

/// Every node below `node`, breadth first, excluding `node`.
///
/// # Errors
///
/// [`TrellisError::Store`] for store failures.
pub fn descendants(store: &dyn ContentStore, node: &Node) -> Result<Vec<Node>> {
    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut queue: VecDeque<Node> = VecDeque::new();
    let mut result: Vec<Node> = Vec::new();

    visited.insert(node.id.clone());
    queue.push_back(node.clone());

    while let Some(current) = queue.pop_front() {
        let children = store
            .get_children(&current)
            .with_context(|| format!("get_children for '{}'", current.id))?;

        for child in children {
            if !visited.insert(child.id.clone()) {
                continue; // cycle guard
            }
            result.push(child.clone());
            queue.push_back(child);
        }
    }

    Ok(result)
}

/// Nodes holding a reference to `node`.
///
/// The referrer is the link's source, the node holding the reference, not
/// its target. Each inbound link is resolved to that source version through
/// the registry. Links whose store is unknown or whose referring version no
/// longer exists are dropped.
///
/// # Errors
///
/// [`TrellisError::Store`] when the link index or a store lookup fails.
pub fn referrers_as_nodes(
    links: &dyn LinkIndex,
    registry: &dyn StoreRegistry,
    node: &Node,
) -> Result<Vec<Node>> {
    let referrers = links
        .get_referrers(node)
        .with_context(|| format!("get_referrers for '{}'", node.id))?;

    let mut nodes = Vec::with_capacity(referrers.len());
    for link in referrers {
        let source = &link.source;
        let Some(store) = registry.get_store_by_name(&source.store) else {
            debug!(store = %source.store, referrer = %source.id, "referrer store unavailable");
            continue;
        };
        let resolved = store
            .get_node(&source.id, &source.language, source.version)
            .with_context(|| format!("get_node '{}' in '{}'", source.id, source.store))?;
        match resolved {
            Some(n) => nodes.push(n),
            None => debug!(referrer = %source.id, "dropping unresolved referrer"),
        }
    }

    Ok(nodes)
}

/// Whether `node` is the context root or sits below it.
///
/// `store` is the store `node` was read from; the parent chain is walked
/// there, so a node from an unrelated tree simply runs out of parents.
///
/// Returns `false` for a `None` node.
///
/// # Errors
///
/// - [`TrellisError::MissingContext`] when the context has no root path or
///   no store.
/// - [`TrellisError::ContextRootNotFound`] when the root path does not
///   resolve in the context store.
/// - [`TrellisError::ParentCycle`] when the parent chain loops.
/// - [`TrellisError::Store`] for store failures.
pub fn is_in_context_tree(
    store: &dyn ContentStore,
    context: &dyn ContextService,
    node: Option<&Node>,
) -> Result<bool> {
    let Some(node) = node else {
        return Ok(false);
    };

    let root_path = context
        .root_path()
        .filter(|p| !p.trim().is_empty())
        .ok_or(TrellisError::MissingContext { what: "root path" })?;
    let context_store = context
        .store()
        .ok_or(TrellisError::MissingContext { what: "store" })?;

    let root = context_store
        .get_node_at_path(root_path)
        .with_context(|| format!("get_node_at_path '{root_path}'"))?
        .ok_or_else(|| TrellisError::ContextRootNotFound {
            path: root_path.to_string(),
            store: context_store.name().to_string(),
        })?;

    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut current = Some(node.clone());

    while let Some(candidate) = current {
        if candidate.id == root.id {
            return Ok(true);
        }
        if !visited.insert(candidate.id.clone()) {
            return Err(TrellisError::ParentCycle {
                node: node.id.clone(),
                repeated: candidate.id,
            });
        }
        current = store
            .get_parent(&candidate)
            .with_context(|| format!("get_parent for '{}'", candidate.id))?;
    }

    Ok(false)
}
