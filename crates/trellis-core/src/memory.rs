//! In-memory implementations of the repository contracts.
//!
//! These back the test suite and serve as the reference for the publish
//! engine contract:
//!
//! - Every request is scoped to one language. Removals take out that
//!   language's versions of the subtree and leave other languages live.
//! - A source node whose `__Unpublish` date is at or before the request
//!   timestamp is removed from the target together with its subtree.
//! - Otherwise the latest source version in the request language replaces
//!   whatever version the target held.
//! - A root with no source version in the request language is removed from
//!   the target. When the source has no version of it in any language, it
//!   is removed in every language.
//! - Subtree requests also remove target children that are gone from the
//!   source, with the same language rule.
//!
//! Children are returned in insertion order. Paths compare
//! case-insensitively and ignore a trailing `/`.

use anyhow::{Result, anyhow, bail};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::debug;

use crate::model::fields::{self, UNPUBLISH};
use crate::model::{Language, Link, Node, NodeId, Template, Version, system};
use crate::publish::{PublishMode, PublishOptions};
use crate::store::{ContentStore, LinkIndex, PublishEngine, StoreRegistry};

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// A content store held entirely in memory.
#[derive(Debug)]
pub struct MemoryStore {
    name: String,
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    /// Insertion order doubles as child order.
    nodes: Vec<Node>,
    templates: BTreeMap<NodeId, Template>,
    /// Per-node effective template overrides.
    effective: BTreeMap<NodeId, NodeId>,
}

impl Inner {
    fn position(&self, id: &NodeId, language: &Language, version: Version) -> Option<usize> {
        self.nodes
            .iter()
            .position(|n| n.id == *id && n.language == *language && n.version == version)
    }

    fn latest(&self, id: &NodeId, language: &Language) -> Option<&Node> {
        self.nodes
            .iter()
            .filter(|n| n.id == *id && n.language == *language)
            .max_by_key(|n| n.version)
    }

    fn children_of(&self, parent: &Node) -> Vec<Node> {
        let mut seen: HashSet<&NodeId> = HashSet::new();
        let mut ordered: Vec<&NodeId> = Vec::new();
        for n in &self.nodes {
            if n.parent_id.as_ref() == Some(&parent.id)
                && n.language == parent.language
                && seen.insert(&n.id)
            {
                ordered.push(&n.id);
            }
        }
        ordered
            .into_iter()
            .filter_map(|id| self.latest(id, &parent.language).cloned())
            .collect()
    }

    /// `root` plus every id below it, across all languages.
    fn subtree_ids(&self, root: &NodeId) -> HashSet<NodeId> {
        let mut ids: HashSet<NodeId> = HashSet::new();
        let mut queue: VecDeque<NodeId> = VecDeque::new();
        queue.push_back(root.clone());

        while let Some(current) = queue.pop_front() {
            if !ids.insert(current.clone()) {
                continue; // cycle guard
            }
            for n in &self.nodes {
                if n.parent_id.as_ref() == Some(&current) && !ids.contains(&n.id) {
                    queue.push_back(n.id.clone());
                }
            }
        }

        ids
    }

    fn remove_subtree(&mut self, root: &NodeId) -> usize {
        let ids = self.subtree_ids(root);
        let before = self.nodes.len();
        self.nodes.retain(|n| !ids.contains(&n.id));
        before - self.nodes.len()
    }

    /// Like `remove_subtree`, but only versions in `language` go.
    fn remove_subtree_in(&mut self, root: &NodeId, language: &Language) -> usize {
        let ids = self.subtree_ids(root);
        let before = self.nodes.len();
        self.nodes
            .retain(|n| !(n.language == *language && ids.contains(&n.id)));
        before - self.nodes.len()
    }
}

impl MemoryStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Insert or replace one node version. The node is re-homed to this
    /// store; a replaced version keeps its child-order position.
    pub fn insert(&self, mut node: Node) {
        node.store.clone_from(&self.name);
        let mut inner = self.inner.write();
        match inner.position(&node.id, &node.language, node.version) {
            Some(idx) => inner.nodes[idx] = node,
            None => inner.nodes.push(node),
        }
    }

    pub fn insert_template(&self, template: Template) {
        self.inner
            .write()
            .templates
            .insert(template.id.clone(), template);
    }

    /// Make `template_id` the effective template of `node_id`, independent of
    /// the node's raw template pointer.
    pub fn set_effective_template(&self, node_id: &NodeId, template_id: NodeId) {
        self.inner
            .write()
            .effective
            .insert(node_id.clone(), template_id);
    }

    /// Latest version of `id` in `language`.
    pub fn latest(&self, id: &NodeId, language: &Language) -> Option<Node> {
        self.inner.read().latest(id, language).cloned()
    }

    /// Whether any version of `id` exists in any language.
    pub fn contains(&self, id: &NodeId) -> bool {
        self.inner.read().nodes.iter().any(|n| n.id == *id)
    }

    /// Number of stored node versions.
    pub fn len(&self) -> usize {
        self.inner.read().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().nodes.is_empty()
    }

    /// Remove `id` and everything below it. Returns the number of node
    /// versions removed.
    pub fn remove_subtree(&self, id: &NodeId) -> usize {
        self.inner.write().remove_subtree(id)
    }

    /// Remove the `language` versions of `id` and everything below it.
    /// Other languages stay.
    pub fn remove_subtree_in(&self, id: &NodeId, language: &Language) -> usize {
        self.inner.write().remove_subtree_in(id, language)
    }

    /// Store `node` as the only version of its id and language.
    fn replace_versions(&self, mut node: Node) {
        node.store.clone_from(&self.name);
        let mut inner = self.inner.write();
        let existing = inner
            .nodes
            .iter()
            .position(|n| n.id == node.id && n.language == node.language);
        inner
            .nodes
            .retain(|n| !(n.id == node.id && n.language == node.language));
        match existing {
            Some(idx) if idx <= inner.nodes.len() => inner.nodes.insert(idx, node),
            _ => inner.nodes.push(node),
        }
    }
}

impl ContentStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_node(
        &self,
        id: &NodeId,
        language: &Language,
        version: Version,
    ) -> Result<Option<Node>> {
        let inner = self.inner.read();
        Ok(inner
            .position(id, language, version)
            .map(|idx| inner.nodes[idx].clone()))
    }

    fn get_children(&self, node: &Node) -> Result<Vec<Node>> {
        Ok(self.inner.read().children_of(node))
    }

    fn get_parent(&self, node: &Node) -> Result<Option<Node>> {
        let Some(parent_id) = node.parent_id.as_ref() else {
            return Ok(None);
        };
        Ok(self.latest(parent_id, &node.language))
    }

    fn get_ancestors(&self, node: &Node) -> Result<Vec<Node>> {
        let inner = self.inner.read();
        let mut ancestors: Vec<Node> = Vec::new();
        let mut visited: HashSet<NodeId> = HashSet::new();
        let mut current_parent = node.parent_id.clone();

        while let Some(parent_id) = current_parent {
            if !visited.insert(parent_id.clone()) {
                break; // cycle guard
            }
            let Some(parent) = inner.latest(&parent_id, &node.language) else {
                break;
            };
            current_parent = parent.parent_id.clone();
            ancestors.push(parent.clone());
        }

        Ok(ancestors)
    }

    fn get_template(&self, id: &NodeId) -> Result<Option<Template>> {
        Ok(self.inner.read().templates.get(id).cloned())
    }

    fn resolve_effective_template(&self, node: &Node) -> Result<Option<Template>> {
        let inner = self.inner.read();
        let template_id = inner.effective.get(&node.id).unwrap_or(&node.template_id);
        Ok(inner.templates.get(template_id).cloned())
    }

    fn is_template_part(&self, node: &Node) -> Result<bool> {
        let inner = self.inner.read();
        Ok(inner.templates.contains_key(&node.id)
            || system::TEMPLATE_PARTS.contains(&node.template_id.as_str()))
    }

    fn get_node_at_path(&self, path: &str) -> Result<Option<Node>> {
        let wanted = normalize_path(path);
        let language = Language::default();
        let inner = self.inner.read();
        Ok(inner
            .nodes
            .iter()
            .filter(|n| n.language == language && normalize_path(&n.path) == wanted)
            .max_by_key(|n| n.version)
            .cloned())
    }

    fn delete_node(&self, node: &Node) -> Result<()> {
        let removed = self.inner.write().remove_subtree(&node.id);
        if removed == 0 {
            bail!("node '{}' not found in store '{}'", node.id, self.name);
        }
        debug!(node = %node.id, store = %self.name, removed, "deleted subtree");
        Ok(())
    }

    fn set_field(&self, node: &Node, name: &str, value: &str) -> Result<()> {
        let mut inner = self.inner.write();
        let idx = inner
            .position(&node.id, &node.language, node.version)
            .ok_or_else(|| {
                anyhow!(
                    "node '{}' ({} v{}) not found in store '{}'",
                    node.id,
                    node.language,
                    node.version,
                    self.name
                )
            })?;
        inner.nodes[idx]
            .fields
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn version_count(&self, id: &NodeId, language: &Language) -> Result<usize> {
        Ok(self
            .inner
            .read()
            .nodes
            .iter()
            .filter(|n| n.id == *id && n.language == *language)
            .count())
    }
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_lowercase()
    }
}

// ---------------------------------------------------------------------------
// MemoryRegistry
// ---------------------------------------------------------------------------

/// Shared name → store map. Clones share the same stores.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    stores: Arc<RwLock<BTreeMap<String, Arc<MemoryStore>>>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `store` under its own name, replacing any previous entry.
    pub fn register(&self, store: MemoryStore) -> Arc<MemoryStore> {
        let store = Arc::new(store);
        self.stores
            .write()
            .insert(store.name.clone(), Arc::clone(&store));
        store
    }

    /// Take a store offline.
    pub fn unregister(&self, name: &str) -> Option<Arc<MemoryStore>> {
        self.stores.write().remove(name)
    }

    pub fn get(&self, name: &str) -> Option<Arc<MemoryStore>> {
        self.stores.read().get(name).cloned()
    }
}

impl StoreRegistry for MemoryRegistry {
    fn get_store_by_name(&self, name: &str) -> Option<Arc<dyn ContentStore>> {
        self.get(name).map(|s| s as Arc<dyn ContentStore>)
    }
}

// ---------------------------------------------------------------------------
// MemoryLinkIndex
// ---------------------------------------------------------------------------

/// Link index held in memory, in insertion order.
#[derive(Debug, Default)]
pub struct MemoryLinkIndex {
    links: RwLock<Vec<Link>>,
}

impl MemoryLinkIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, link: Link) {
        self.links.write().push(link);
    }
}

impl LinkIndex for MemoryLinkIndex {
    fn get_referrers(&self, node: &Node) -> Result<Vec<Link>> {
        Ok(self
            .links
            .read()
            .iter()
            .filter(|l| l.target.id == node.id && l.target.store == node.store)
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// MemoryPublisher
// ---------------------------------------------------------------------------

/// Publish engine copying between stores of a [`MemoryRegistry`].
#[derive(Debug)]
pub struct MemoryPublisher {
    registry: MemoryRegistry,
    history: Mutex<Vec<PublishOptions>>,
}

impl MemoryPublisher {
    pub fn new(registry: MemoryRegistry) -> Self {
        Self {
            registry,
            history: Mutex::new(Vec::new()),
        }
    }

    /// Every request executed so far, oldest first.
    pub fn history(&self) -> Vec<PublishOptions> {
        self.history.lock().clone()
    }

    fn publish_tree(
        source: &MemoryStore,
        target: &MemoryStore,
        options: &PublishOptions,
    ) -> Result<()> {
        let deep = options.mode == PublishMode::Subtree;
        let mut visited: HashSet<NodeId> = HashSet::new();
        let mut queue: VecDeque<NodeId> = VecDeque::new();
        queue.push_back(options.root.clone());

        while let Some(id) = queue.pop_front() {
            if !visited.insert(id.clone()) {
                continue; // cycle guard
            }

            let Some(node) = source.latest(&id, &options.language) else {
                let removed = retract(source, target, &id, &options.language);
                debug!(
                    node = %id,
                    language = %options.language,
                    removed,
                    "source node gone, removed from target"
                );
                continue;
            };

            if unpublish_due(&node, options) {
                let removed = target.remove_subtree_in(&id, &options.language);
                debug!(
                    node = %id,
                    language = %options.language,
                    removed,
                    "unpublish date reached, removed from target"
                );
                continue;
            }

            target.replace_versions(node.clone());

            if deep {
                let source_children = source.get_children(&node)?;
                for stale in target.get_children(&node)? {
                    if !source_children.iter().any(|c| c.id == stale.id) {
                        retract(source, target, &stale.id, &options.language);
                    }
                }
                queue.extend(source_children.into_iter().map(|c| c.id));
            }
        }

        Ok(())
    }
}

impl PublishEngine for MemoryPublisher {
    fn execute(&self, options: &PublishOptions) -> Result<()> {
        let source = self
            .registry
            .get(&options.source)
            .ok_or_else(|| anyhow!("source store '{}' is not registered", options.source))?;
        let target = self
            .registry
            .get(&options.target)
            .ok_or_else(|| anyhow!("target store '{}' is not registered", options.target))?;

        self.history.lock().push(options.clone());
        Self::publish_tree(&source, &target, options)
    }
}

/// Take `id`'s subtree out of `target`. Only the request language goes while
/// the source still holds `id` in some language; otherwise every language
/// goes.
fn retract(
    source: &MemoryStore,
    target: &MemoryStore,
    id: &NodeId,
    language: &Language,
) -> usize {
    if source.contains(id) {
        target.remove_subtree_in(id, language)
    } else {
        target.remove_subtree(id)
    }
}

fn unpublish_due(node: &Node, options: &PublishOptions) -> bool {
    node.field(UNPUBLISH)
        .and_then(fields::parse_iso_date)
        .is_some_and(|at| at <= options.timestamp)
}
