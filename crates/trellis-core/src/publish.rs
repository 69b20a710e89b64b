//! Publication commands and the "is the live copy current" check.
//!
//! Every command follows the same linear protocol: build a
//! [`PublishOptions`] (source = the node's own store, target = the configured
//! target store, language = the node's language, timestamp = the clock's
//! now) and hand it to the [`PublishEngine`]. The engine call is synchronous
//! and its failures propagate unchanged as [`TrellisError::Publish`].
//!
//! # Unpublish contract
//!
//! [`Publisher::unpublish`] does not remove anything itself. It stamps
//! `__Unpublish` with the current time and requests a deep publish; the
//! engine is expected to drop a node whose unpublish date has passed.
//! Whether that happens synchronously is up to the engine.
//!
//! # Freshness
//!
//! [`Publisher::is_published`] compares last-modified timestamps between the
//! source node and the target copy of the same id, language, and version. It
//! is a heuristic: clock skew or a partial publish can mislead it.

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::PublishConfig;
use crate::error::{Result, TrellisError};
use crate::model::fields::{self, UNPUBLISH};
use crate::model::{Language, Node, NodeId};
use crate::store::{ContentStore, PublishEngine, StoreRegistry};
use crate::validity;

/// Whether a publish request covers the root only or its whole subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishMode {
    SingleNode,
    Subtree,
}

impl PublishMode {
    #[must_use]
    pub const fn from_deep(deep: bool) -> Self {
        if deep { Self::Subtree } else { Self::SingleNode }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::SingleNode => "single_node",
            Self::Subtree => "subtree",
        }
    }
}

impl fmt::Display for PublishMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One publish request. Built per call and discarded afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishOptions {
    pub source: String,
    pub target: String,
    pub mode: PublishMode,
    pub root: NodeId,
    pub language: Language,
    pub timestamp: DateTime<Utc>,
}

/// Issues publication commands against a registry of stores.
pub struct Publisher<'a> {
    registry: &'a dyn StoreRegistry,
    engine: &'a dyn PublishEngine,
    clock: &'a dyn Clock,
    config: PublishConfig,
}

impl<'a> Publisher<'a> {
    #[must_use]
    pub fn new(
        registry: &'a dyn StoreRegistry,
        engine: &'a dyn PublishEngine,
        clock: &'a dyn Clock,
        config: PublishConfig,
    ) -> Self {
        Self {
            registry,
            engine,
            clock,
            config,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &PublishConfig {
        &self.config
    }

    /// Publish `node`, and its subtree when `deep`.
    ///
    /// # Errors
    ///
    /// [`TrellisError::StoreNotFound`] when the target store is not
    /// registered, or [`TrellisError::Publish`] when the engine fails.
    pub fn publish(&self, node: &Node, deep: bool) -> Result<PublishOptions> {
        if self.registry.get_store_by_name(&self.config.target_store).is_none() {
            return Err(TrellisError::StoreNotFound(self.config.target_store.clone()));
        }

        let options = PublishOptions {
            source: node.store.clone(),
            target: self.config.target_store.clone(),
            mode: PublishMode::from_deep(deep),
            root: node.id.clone(),
            language: node.language.clone(),
            timestamp: self.clock.now(),
        };

        info!(
            node = %node.id,
            source = %options.source,
            target = %options.target,
            mode = %options.mode,
            "publishing node"
        );

        self.engine
            .execute(&options)
            .with_context(|| format!("publish '{}' to '{}'", node.id, options.target))
            .map_err(TrellisError::Publish)?;

        Ok(options)
    }

    /// Publish only when [`validity::is_valid_for_publish`] holds now.
    /// Returns `None` when the node was skipped.
    ///
    /// # Errors
    ///
    /// [`TrellisError::InvalidDate`] for malformed validity fields, otherwise
    /// as [`Publisher::publish`].
    pub fn publish_if_valid(&self, node: &Node, deep: bool) -> Result<Option<PublishOptions>> {
        if !self.is_valid_for_publish(Some(node))? {
            info!(node = %node.id, "skipping publish: node outside its validity window");
            return Ok(None);
        }
        self.publish(node, deep).map(Some)
    }

    /// [`validity::is_valid_for_publish`] at this publisher's clock.
    ///
    /// # Errors
    ///
    /// [`TrellisError::InvalidDate`] for malformed validity fields.
    pub fn is_valid_for_publish(&self, node: Option<&Node>) -> Result<bool> {
        validity::is_valid_for_publish(node, self.clock.now())
    }

    /// Stamp `__Unpublish` with now, then publish the subtree.
    ///
    /// # Errors
    ///
    /// [`TrellisError::StoreNotFound`] when the node's store is not
    /// registered, [`TrellisError::Store`] when the field write fails, or
    /// any error from [`Publisher::publish`].
    pub fn unpublish(&self, node: &Node) -> Result<PublishOptions> {
        let store = self.source_store(node)?;
        let stamp = fields::format_iso_date(self.clock.now());

        store
            .set_field(node, UNPUBLISH, &stamp)
            .with_context(|| format!("set {UNPUBLISH} on '{}'", node.id))?;
        debug!(node = %node.id, unpublish = %stamp, "scheduled unpublish");

        self.publish(node, true)
    }

    /// Delete `node` from its store, then republish its parent's subtree so
    /// the target no longer shows it.
    ///
    /// # Errors
    ///
    /// - [`TrellisError::NoParent`] for a root node; nothing is deleted.
    /// - [`TrellisError::ParentVanished`] when the node is gone or no longer
    ///   sits under the snapshot's parent, or when the parent cannot be
    ///   resolved before or after the delete; nothing is published.
    /// - [`TrellisError::Store`] when the delete fails.
    /// - any error from [`Publisher::publish`].
    pub fn delete_and_publish(&self, node: &Node) -> Result<PublishOptions> {
        let Some(parent_id) = node.parent_id.clone() else {
            return Err(TrellisError::NoParent(node.id.clone()));
        };
        let store = self.source_store(node)?;

        let vanished = || TrellisError::ParentVanished {
            node: node.id.clone(),
            parent: parent_id.clone(),
        };

        // The snapshot may be stale: the node can have moved or gone since.
        let current = store
            .get_node(&node.id, &node.language, node.version)
            .with_context(|| format!("get_node '{}'", node.id))?
            .filter(|n| n.parent_id.as_ref() == Some(&parent_id))
            .ok_or_else(vanished)?;

        let parent = store
            .get_parent(&current)
            .with_context(|| format!("get_parent for '{}'", node.id))?
            .filter(|p| p.id == parent_id)
            .ok_or_else(vanished)?;

        store
            .delete_node(&current)
            .with_context(|| format!("delete '{}' from '{}'", node.id, store.name()))?;
        info!(node = %node.id, store = %store.name(), parent = %parent.id, "deleted node");

        let parent = store
            .get_node(&parent.id, &parent.language, parent.version)
            .with_context(|| format!("get_node '{}'", parent.id))?
            .ok_or_else(vanished)?;

        self.publish(&parent, true)
    }

    /// Whether a current copy of `node` exists in the target store.
    ///
    /// `None` counts as published. An unregistered target store answers per
    /// [`PublishConfig::unavailable_target`].
    ///
    /// # Errors
    ///
    /// [`TrellisError::Store`] when the target lookup fails.
    pub fn is_published(&self, node: Option<&Node>) -> Result<bool> {
        let Some(node) = node else {
            return Ok(true);
        };

        let Some(target) = self.registry.get_store_by_name(&self.config.target_store) else {
            let assumed = self.config.unavailable_target.as_bool();
            warn!(
                node = %node.id,
                target = %self.config.target_store,
                assumed,
                "target store unavailable, applying configured policy"
            );
            return Ok(assumed);
        };

        let live = target
            .get_node(&node.id, &node.language, node.version)
            .with_context(|| format!("get_node '{}' in '{}'", node.id, target.name()))?;

        Ok(match live {
            None => {
                debug!(node = %node.id, "no copy in target store");
                false
            }
            Some(live) if node.updated > live.updated => {
                debug!(
                    node = %node.id,
                    source_updated = %node.updated,
                    target_updated = %live.updated,
                    "target copy is stale"
                );
                false
            }
            Some(_) => true,
        })
    }

    fn source_store(&self, node: &Node) -> Result<Arc<dyn ContentStore>> {
        self.registry
            .get_store_by_name(&node.store)
            .ok_or_else(|| TrellisError::StoreNotFound(node.store.clone()))
    }
}
