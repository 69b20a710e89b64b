//! Template derivation checks.
//!
//! Every check resolves a node's template through
//! [`ContentStore::resolve_effective_template`] and then follows `base_id`
//! links with [`ContentStore::get_template`]. The walk keeps a visited set:
//! a chain that revisits a template id is reported as
//! [`TrellisError::TemplateCycle`] rather than looping.
//!
//! A missing base template ends the chain quietly, the same way the store
//! would treat a dangling base reference.

use anyhow::Context as _;
use std::collections::HashSet;
use tracing::debug;

use crate::error::{Result, TrellisError};
use crate::model::{Node, NodeId, Template};
use crate::store::ContentStore;

/// Whether `node`'s effective template is `template_id` or derives from it.
///
/// Returns `false` for a `None` node, a null `template_id`, a target template
/// unknown to the store, or a node without an effective template.
///
/// # Errors
///
/// [`TrellisError::TemplateCycle`] when the base chain loops, or
/// [`TrellisError::Store`] when a store lookup fails.
pub fn derives_from(
    store: &dyn ContentStore,
    node: Option<&Node>,
    template_id: &NodeId,
) -> Result<bool> {
    let Some(node) = node else {
        return Ok(false);
    };
    if template_id.is_null() {
        return Ok(false);
    }

    let target = store
        .get_template(template_id)
        .with_context(|| format!("get_template '{template_id}'"))?;
    if target.is_none() {
        debug!(template = %template_id, "target template not in store");
        return Ok(false);
    }

    let Some(effective) = effective_template(store, node)? else {
        return Ok(false);
    };

    let mut visited: Vec<NodeId> = Vec::new();
    let mut current = Some(effective);
    while let Some(template) = current {
        if visited.contains(&template.id) {
            visited.push(template.id.clone());
            return Err(TrellisError::TemplateCycle {
                template_id: template.id,
                chain: visited,
            });
        }
        if template.id == *template_id {
            return Ok(true);
        }
        visited.push(template.id.clone());
        current = base_of(store, &template)?;
    }

    Ok(false)
}

/// The effective template of `node` followed by its base chain.
///
/// # Errors
///
/// [`TrellisError::TemplateCycle`] when the base chain loops, or
/// [`TrellisError::Store`] when a store lookup fails.
pub fn template_chain(store: &dyn ContentStore, node: &Node) -> Result<Vec<Template>> {
    let mut chain: Vec<Template> = Vec::new();
    let mut seen: HashSet<NodeId> = HashSet::new();
    let mut current = effective_template(store, node)?;

    while let Some(template) = current {
        if !seen.insert(template.id.clone()) {
            let mut ids: Vec<NodeId> = chain.iter().map(|t| t.id.clone()).collect();
            ids.push(template.id.clone());
            return Err(TrellisError::TemplateCycle {
                template_id: template.id,
                chain: ids,
            });
        }
        current = base_of(store, &template)?;
        chain.push(template);
    }

    Ok(chain)
}

/// Whether `node` is part of a template definition, per the store's type
/// engine.
///
/// # Errors
///
/// [`TrellisError::Store`] when the store fails.
pub fn is_template(store: &dyn ContentStore, node: &Node) -> Result<bool> {
    Ok(store
        .is_template_part(node)
        .with_context(|| format!("is_template_part '{}'", node.id))?)
}

/// Whether `node` is the standard-values node of its own template.
///
/// # Errors
///
/// [`TrellisError::Store`] when the store fails.
pub fn is_standard_values(store: &dyn ContentStore, node: Option<&Node>) -> Result<bool> {
    let Some(node) = node else {
        return Ok(false);
    };

    Ok(effective_template(store, node)?
        .and_then(|t| t.standard_values_id)
        .is_some_and(|sv| sv == node.id))
}

fn effective_template(store: &dyn ContentStore, node: &Node) -> Result<Option<Template>> {
    Ok(store
        .resolve_effective_template(node)
        .with_context(|| format!("resolve_effective_template '{}'", node.id))?)
}

fn base_of(store: &dyn ContentStore, template: &Template) -> Result<Option<Template>> {
    let Some(base_id) = template.base_id.as_ref().filter(|id| !id.is_null()) else {
        return Ok(None);
    };
    Ok(store
        .get_template(base_id)
        .with_context(|| format!("get_template '{base_id}' (base of '{}')", template.id))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::model::system;
    use chrono::{TimeZone, Utc};

    fn node(id: &str, template: &str) -> Node {
        Node::new(
            NodeId::new(id),
            NodeId::new(template),
            "master",
            format!("/content/{id}"),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        )
    }

    /// Root <- Page <- Article <- News, plus an unrelated template.
    fn store_with_chain() -> MemoryStore {
        let store = MemoryStore::new("master");
        store.insert_template(Template::new(NodeId::new("t-root"), "Root"));
        store.insert_template(
            Template::new(NodeId::new("t-page"), "Page").with_base(NodeId::new("t-root")),
        );
        store.insert_template(
            Template::new(NodeId::new("t-article"), "Article")
                .with_base(NodeId::new("t-page"))
                .with_standard_values(NodeId::new("sv-article")),
        );
        store.insert_template(
            Template::new(NodeId::new("t-news"), "News").with_base(NodeId::new("t-article")),
        );
        store.insert_template(Template::new(NodeId::new("t-other"), "Other"));
        store
    }

    #[test]
    fn derives_from_own_template() {
        let store = store_with_chain();
        let n = node("n-1", "t-news");
        assert!(derives_from(&store, Some(&n), &NodeId::new("t-news")).unwrap());
    }

    #[test]
    fn derives_from_every_base() {
        let store = store_with_chain();
        let n = node("n-1", "t-news");
        for base in ["t-article", "t-page", "t-root"] {
            assert!(
                derives_from(&store, Some(&n), &NodeId::new(base)).unwrap(),
                "expected News to derive from {base}"
            );
        }
    }

    #[test]
    fn does_not_derive_from_unrelated_or_descendant() {
        let store = store_with_chain();
        let n = node("n-1", "t-article");
        assert!(!derives_from(&store, Some(&n), &NodeId::new("t-other")).unwrap());
        assert!(!derives_from(&store, Some(&n), &NodeId::new("t-news")).unwrap());
    }

    #[test]
    fn none_node_and_null_id_are_false() {
        let store = store_with_chain();
        let n = node("n-1", "t-news");
        assert!(!derives_from(&store, None, &NodeId::new("t-root")).unwrap());
        assert!(!derives_from(&store, Some(&n), &NodeId::null()).unwrap());
        assert!(
            !derives_from(
                &store,
                Some(&n),
                &NodeId::new("{00000000-0000-0000-0000-000000000000}")
            )
            .unwrap()
        );
    }

    #[test]
    fn unknown_target_template_is_false() {
        let store = store_with_chain();
        let n = node("n-1", "t-news");
        assert!(!derives_from(&store, Some(&n), &NodeId::new("t-missing")).unwrap());
    }

    #[test]
    fn effective_template_override_wins_over_raw_pointer() {
        let store = store_with_chain();
        let n = node("n-1", "t-other");
        store.set_effective_template(&n.id, NodeId::new("t-news"));
        assert!(derives_from(&store, Some(&n), &NodeId::new("t-root")).unwrap());
        assert!(!derives_from(&store, Some(&n), &NodeId::new("t-other")).unwrap());
    }

    #[test]
    fn cycle_is_reported_not_looped() {
        let store = MemoryStore::new("master");
        store.insert_template(Template::new(NodeId::new("t-a"), "A").with_base(NodeId::new("t-b")));
        store.insert_template(Template::new(NodeId::new("t-b"), "B").with_base(NodeId::new("t-a")));
        store.insert_template(Template::new(NodeId::new("t-z"), "Z"));
        let n = node("n-1", "t-a");

        let err = derives_from(&store, Some(&n), &NodeId::new("t-z")).unwrap_err();
        assert!(matches!(
            err,
            TrellisError::TemplateCycle { ref template_id, ref chain }
                if template_id.as_str() == "t-a" && chain.len() == 3
        ));
    }

    #[test]
    fn cycle_after_match_short_circuits() {
        let store = MemoryStore::new("master");
        store.insert_template(Template::new(NodeId::new("t-a"), "A").with_base(NodeId::new("t-b")));
        store.insert_template(Template::new(NodeId::new("t-b"), "B").with_base(NodeId::new("t-a")));
        let n = node("n-1", "t-a");
        assert!(derives_from(&store, Some(&n), &NodeId::new("t-b")).unwrap());
    }

    #[test]
    fn dangling_base_ends_chain() {
        let store = MemoryStore::new("master");
        store.insert_template(
            Template::new(NodeId::new("t-a"), "A").with_base(NodeId::new("t-gone")),
        );
        store.insert_template(Template::new(NodeId::new("t-z"), "Z"));
        let n = node("n-1", "t-a");
        assert!(!derives_from(&store, Some(&n), &NodeId::new("t-z")).unwrap());
        assert_eq!(template_chain(&store, &n).unwrap().len(), 1);
    }

    #[test]
    fn chain_lists_effective_template_first() {
        let store = store_with_chain();
        let n = node("n-1", "t-news");
        let names: Vec<String> = template_chain(&store, &n)
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["News", "Article", "Page", "Root"]);
    }

    #[test]
    fn chain_reports_cycle() {
        let store = MemoryStore::new("master");
        store.insert_template(Template::new(NodeId::new("t-a"), "A").with_base(NodeId::new("t-a")));
        let n = node("n-1", "t-a");
        assert!(matches!(
            template_chain(&store, &n),
            Err(TrellisError::TemplateCycle { .. })
        ));
    }

    #[test]
    fn standard_values_detection() {
        let store = store_with_chain();
        let sv = node("sv-article", "t-article");
        let regular = node("n-1", "t-article");
        assert!(is_standard_values(&store, Some(&sv)).unwrap());
        assert!(!is_standard_values(&store, Some(&regular)).unwrap());
        assert!(!is_standard_values(&store, None).unwrap());
    }

    #[test]
    fn standard_values_without_template_is_false() {
        let store = MemoryStore::new("master");
        let n = node("n-1", "t-unknown");
        assert!(!is_standard_values(&store, Some(&n)).unwrap());
    }

    #[test]
    fn template_parts_come_from_type_engine() {
        let store = store_with_chain();
        let definition = node("t-article", system::TEMPLATE);
        let field = node("f-title", system::TEMPLATE_FIELD);
        let content = node("n-1", "t-article");
        assert!(is_template(&store, &definition).unwrap());
        assert!(is_template(&store, &field).unwrap());
        assert!(!is_template(&store, &content).unwrap());
    }
}
