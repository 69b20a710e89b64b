//! Contracts required from the external content repository.
//!
//! Everything here is owned by the repository, not by this crate: the
//! content store, the registry of named stores, the link index, the publish
//! engine, and the site context. Implementations report failures through
//! `anyhow`; callers in this crate attach context and surface them as
//! [`TrellisError::Store`](crate::error::TrellisError::Store) or
//! [`TrellisError::Publish`](crate::error::TrellisError::Publish).
//!
//! [`crate::memory`] provides in-memory implementations of every trait.

use anyhow::Result;
use std::sync::Arc;

use crate::model::{Language, Link, Node, NodeId, Template, Version};
use crate::publish::PublishOptions;

/// A named tree of versioned, localized nodes.
pub trait ContentStore: Send + Sync {
    /// Registry name of this store (e.g. `master`, `web`).
    fn name(&self) -> &str;

    /// Fetch one exact language version.
    fn get_node(&self, id: &NodeId, language: &Language, version: Version)
    -> Result<Option<Node>>;

    /// Direct children in the store's child order, in the node's language.
    fn get_children(&self, node: &Node) -> Result<Vec<Node>>;

    /// Latest version of the node's parent in the node's language.
    fn get_parent(&self, node: &Node) -> Result<Option<Node>>;

    /// Ancestor axis, nearest ancestor first, root last.
    fn get_ancestors(&self, node: &Node) -> Result<Vec<Node>>;

    fn get_template(&self, id: &NodeId) -> Result<Option<Template>>;

    /// The template that actually governs `node`, which may differ from its
    /// raw `template_id`.
    fn resolve_effective_template(&self, node: &Node) -> Result<Option<Template>>;

    /// Type-engine check: is `node` part of a template definition.
    fn is_template_part(&self, node: &Node) -> Result<bool>;

    /// Latest version at `path` in the default language.
    fn get_node_at_path(&self, path: &str) -> Result<Option<Node>>;

    /// Delete the node (all languages and versions) and its subtree.
    fn delete_node(&self, node: &Node) -> Result<()>;

    /// Write a raw field value on this exact language version.
    fn set_field(&self, node: &Node, name: &str, value: &str) -> Result<()>;

    /// Number of versions `id` has in `language`.
    fn version_count(&self, id: &NodeId, language: &Language) -> Result<usize>;
}

/// Lookup of stores by name.
pub trait StoreRegistry: Send + Sync {
    fn get_store_by_name(&self, name: &str) -> Option<Arc<dyn ContentStore>>;
}

/// Index of references between nodes.
pub trait LinkIndex: Send + Sync {
    /// Links whose target is `node`, in index order.
    fn get_referrers(&self, node: &Node) -> Result<Vec<Link>>;
}

/// Executes publish requests. Synchronous; retry and compensation policy
/// belong to the engine.
pub trait PublishEngine: Send + Sync {
    fn execute(&self, options: &PublishOptions) -> Result<()>;
}

/// The current site: its root path and the store it reads from.
pub trait ContextService {
    fn root_path(&self) -> Option<&str>;
    fn store(&self) -> Option<Arc<dyn ContentStore>>;
}

/// Explicitly passed site context.
#[derive(Clone, Default)]
pub struct SiteContext {
    pub root_path: Option<String>,
    pub store: Option<Arc<dyn ContentStore>>,
}

impl SiteContext {
    pub fn new(root_path: impl Into<String>, store: Arc<dyn ContentStore>) -> Self {
        Self {
            root_path: Some(root_path.into()),
            store: Some(store),
        }
    }
}

impl ContextService for SiteContext {
    fn root_path(&self) -> Option<&str> {
        self.root_path.as_deref()
    }

    fn store(&self) -> Option<Arc<dyn ContentStore>> {
        self.store.clone()
    }
}

impl std::fmt::Debug for SiteContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteContext")
            .field("root_path", &self.root_path)
            .field("store", &self.store.as_ref().map(|s| s.name().to_string()))
            .finish()
    }
}
