//! trellis-core library.
//!
//! Hierarchy-aware helpers over a versioned, localized content tree that
//! lives in an external repository:
//!
//! - [`template`]: does a node's template derive from another?
//! - [`tree`]: children by template, ancestors, descendants, referrers, and
//!   site-tree membership.
//! - [`publish`]: publish, unpublish, delete-and-publish, and live-copy
//!   freshness.
//! - [`validity`]: is a node publishable at a given instant?
//!
//! The repository is reached through the traits in [`store`]; [`memory`]
//! implements all of them in process.
//!
//! # Conventions
//!
//! - **Errors**: library operations return [`error::Result`]. Collaborator
//!   traits return `anyhow::Result`, wrapped with context on the way in.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `debug!`). The
//!   library never installs a subscriber.

pub mod clock;
pub mod config;
pub mod error;
pub mod language;
pub mod memory;
pub mod model;
pub mod publish;
pub mod store;
pub mod template;
pub mod tree;
pub mod validity;

pub use error::{ErrorCode, Result, TrellisError};
pub use model::{Language, Link, Node, NodeId, NodeRef, Template, Version};
pub use publish::{PublishMode, PublishOptions, Publisher};
