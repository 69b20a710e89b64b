//! Per-language version lookups.

use anyhow::Context as _;

use crate::error::Result;
use crate::model::{Language, Node};
use crate::store::ContentStore;

/// Number of versions `node` has in `language`. `0` for a `None` node.
///
/// # Errors
///
/// [`TrellisError::Store`](crate::error::TrellisError::Store) when the store
/// lookup fails.
pub fn language_version_count(
    store: &dyn ContentStore,
    node: Option<&Node>,
    language: &Language,
) -> Result<usize> {
    let Some(node) = node else {
        return Ok(0);
    };
    let count = store
        .version_count(&node.id, language)
        .with_context(|| format!("version_count for '{}' in '{language}'", node.id))?;
    Ok(count)
}

/// Whether `node` has at least one version in `language`.
///
/// # Errors
///
/// As [`language_version_count`].
pub fn has_language(store: &dyn ContentStore, node: &Node, language: &Language) -> Result<bool> {
    Ok(language_version_count(store, Some(node), language)? > 0)
}
