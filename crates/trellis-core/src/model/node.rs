use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::id::{Language, NodeId, Version};

/// A snapshot of one language version of a content node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    /// Raw template pointer as stored on the node.
    pub template_id: NodeId,
    pub parent_id: Option<NodeId>,
    pub language: Language,
    pub version: Version,
    /// Name of the store this snapshot was read from.
    pub store: String,
    /// Slash-separated path, e.g. `/content/home/news`.
    pub path: String,
    /// Last-modified timestamp of this language version.
    pub updated: DateTime<Utc>,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl Node {
    /// A first-version node with no parent and no fields.
    pub fn new(
        id: NodeId,
        template_id: NodeId,
        store: impl Into<String>,
        path: impl Into<String>,
        updated: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            template_id,
            parent_id: None,
            language: Language::default(),
            version: Version::FIRST,
            store: store.into(),
            path: path.into(),
            updated,
            fields: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_parent(mut self, parent_id: NodeId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    #[must_use]
    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    #[must_use]
    pub const fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Raw field value, `None` when the field is absent.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Address of this exact language version.
    pub fn node_ref(&self) -> NodeRef {
        NodeRef {
            store: self.store.clone(),
            id: self.id.clone(),
            language: self.language.clone(),
            version: self.version,
        }
    }

    /// `true` when the node sits at the top of its tree.
    pub const fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// A structural type. Templates form single-base derivation chains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: NodeId,
    pub name: String,
    #[serde(default)]
    pub base_id: Option<NodeId>,
    /// Node supplying default field values for this template.
    #[serde(default)]
    pub standard_values_id: Option<NodeId>,
}

impl Template {
    pub fn new(id: NodeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            base_id: None,
            standard_values_id: None,
        }
    }

    #[must_use]
    pub fn with_base(mut self, base_id: NodeId) -> Self {
        self.base_id = Some(base_id);
        self
    }

    #[must_use]
    pub fn with_standard_values(mut self, node_id: NodeId) -> Self {
        self.standard_values_id = Some(node_id);
        self
    }
}

/// Fully qualified address of one node version in a named store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeRef {
    pub store: String,
    pub id: NodeId,
    pub language: Language,
    pub version: Version,
}

/// A reference held by `source` pointing at `target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub source: NodeRef,
    pub target: NodeRef,
    /// Field on the source node that holds the reference, when known.
    #[serde(default)]
    pub field: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn builder_sets_fields_and_parent() {
        let node = Node::new(
            NodeId::new("n-1"),
            NodeId::new("t-article"),
            "master",
            "/content/n-1",
            ts(),
        )
        .with_parent(NodeId::new("n-root"))
        .with_field("Title", "Hello");

        assert_eq!(node.field("Title"), Some("Hello"));
        assert_eq!(node.field("Missing"), None);
        assert!(!node.is_root());
        assert_eq!(node.version, Version::FIRST);
    }

    #[test]
    fn node_ref_captures_version_address() {
        let node = Node::new(NodeId::new("n-1"), NodeId::new("t"), "master", "/n-1", ts())
            .with_version(Version(4));
        let r = node.node_ref();
        assert_eq!(r.store, "master");
        assert_eq!(r.version, Version(4));
        assert_eq!(r.language, Language::default());
    }

    #[test]
    fn template_builder() {
        let t = Template::new(NodeId::new("t-news"), "News")
            .with_base(NodeId::new("t-article"))
            .with_standard_values(NodeId::new("sv-news"));
        assert_eq!(t.base_id, Some(NodeId::new("t-article")));
        assert_eq!(t.standard_values_id, Some(NodeId::new("sv-news")));
    }
}
