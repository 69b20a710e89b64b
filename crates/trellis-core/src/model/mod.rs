//! Content model snapshots read from a [`ContentStore`](crate::store::ContentStore).
//!
//! Nodes, templates, and links are owned by the external store. The types
//! here are plain values: every read hands back a copy that may already be
//! stale by the time the caller inspects it.

pub mod fields;
pub mod id;
pub mod node;

pub use id::{Language, NodeId, Version};
pub use node::{Link, Node, NodeRef, Template};

/// Well-known template ids the type engine treats as template definitions.
pub mod system {
    /// Template of template definitions.
    pub const TEMPLATE: &str = "ab86861a-6030-46c5-b394-e8f99e8b87db";
    /// Template of template sections.
    pub const TEMPLATE_SECTION: &str = "e269fbb5-3750-427a-9149-7aa950b49301";
    /// Template of template fields.
    pub const TEMPLATE_FIELD: &str = "455a3e98-a627-4b40-8035-e683a0331ac7";

    /// All template-part template ids.
    pub const TEMPLATE_PARTS: [&str; 3] = [TEMPLATE, TEMPLATE_SECTION, TEMPLATE_FIELD];
}
