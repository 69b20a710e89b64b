use proptest::prelude::*;
use std::collections::HashSet;
use trellis_core::TrellisError;
use trellis_core::memory::MemoryStore;
use trellis_core::model::Language;
use trellis_core::template::{derives_from, template_chain};
use trellis_core::tree::{ancestors, descendants};

use generators::*;

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(256))]

    // -----------------------------------------------------------------------
    // Template derivation
    // -----------------------------------------------------------------------

    #[test]
    fn leaf_derives_from_every_template_in_its_chain(chain in arb_chain()) {
        let store = MemoryStore::new("master");
        chain.install(&store);
        let node = tree_node(0, None, chain.leaf());

        for i in 0..chain.len {
            prop_assert!(derives_from(&store, Some(&node), &TemplateChain::id(i)).unwrap());
        }
        prop_assert!(!derives_from(&store, Some(&node), &unrelated_template()).unwrap());
        prop_assert_eq!(template_chain(&store, &node).unwrap().len(), chain.len);
    }

    #[test]
    fn looping_chain_errors_instead_of_hanging(chain in arb_cyclic_chain()) {
        let store = MemoryStore::new("master");
        chain.install(&store);
        let node = tree_node(0, None, chain.leaf());

        let err = derives_from(&store, Some(&node), &unrelated_template()).unwrap_err();
        let is_cycle = matches!(err, TrellisError::TemplateCycle { .. });
        prop_assert!(is_cycle);
        prop_assert!(template_chain(&store, &node).is_err());

        // Anything actually on the chain is still found before the loop closes.
        prop_assert!(derives_from(&store, Some(&node), &TemplateChain::id(0)).unwrap());
    }

    // -----------------------------------------------------------------------
    // Tree axes
    // -----------------------------------------------------------------------

    #[test]
    fn ancestors_exclude_self_and_end_at_root(parents in arb_tree()) {
        let store = MemoryStore::new("master");
        let template = TemplateChain::id(0);
        install_tree(&store, &parents, &template);
        let language = Language::default();

        for i in 0..=parents.len() {
            let node = store.latest(&tree_node_id(i), &language).unwrap();
            let axis = ancestors(&store, &node).unwrap();

            prop_assert!(axis.iter().all(|a| a.id != node.id));
            prop_assert!(axis.len() <= parents.len());
            let unique: HashSet<_> = axis.iter().map(|a| a.id.clone()).collect();
            prop_assert_eq!(unique.len(), axis.len());

            if i == 0 {
                prop_assert!(axis.is_empty());
            } else {
                prop_assert_eq!(
                    axis.first().map(|a| a.id.clone()),
                    Some(tree_node_id(parents[i - 1]))
                );
                prop_assert_eq!(axis.last().map(|a| a.id.clone()), Some(tree_node_id(0)));
            }
        }
    }

    #[test]
    fn root_descendants_cover_the_rest_of_the_tree(parents in arb_tree()) {
        let store = MemoryStore::new("master");
        install_tree(&store, &parents, &TemplateChain::id(0));
        let root = store.latest(&tree_node_id(0), &Language::default()).unwrap();

        let below = descendants(&store, &root).unwrap();
        prop_assert_eq!(below.len(), parents.len());
        prop_assert!(below.iter().all(|d| d.id != root.id));
    }

    #[test]
    fn every_descendant_lists_the_node_as_ancestor(
        parents in arb_tree(),
        pick in any::<prop::sample::Index>(),
    ) {
        let store = MemoryStore::new("master");
        install_tree(&store, &parents, &TemplateChain::id(0));
        let language = Language::default();
        let chosen = tree_node_id(pick.index(parents.len() + 1));
        let node = store.latest(&chosen, &language).unwrap();

        for d in descendants(&store, &node).unwrap() {
            let axis = ancestors(&store, &d).unwrap();
            prop_assert!(axis.iter().any(|a| a.id == node.id));
        }
    }
}
