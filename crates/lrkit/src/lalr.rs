//! LALR(1) state merging.

use crate::{
    automaton::Edge,
    lr1::{ItemSet, LRAutomaton, LRItemCore},
    types::{Map, Set},
};
use std::collections::BTreeSet;

/// Merge the states of an LR(1) automaton that share the same core.
///
/// Merged states are numbered in order of the first appearance of their
/// core; the item set of a merged state is the union of the grouped states'
/// items. Edges are remapped through the grouping and deduplicated.
#[tracing::instrument(skip_all)]
pub fn merge_cores(lr: &LRAutomaton) -> LRAutomaton {
    let mut groups: Map<BTreeSet<LRItemCore>, usize> = Map::default();
    let mut states: Vec<ItemSet> = vec![];
    let mut mapping: Vec<usize> = Vec::with_capacity(lr.num_states());

    for items in lr.states() {
        let core: BTreeSet<LRItemCore> = items.iter().map(|item| item.core()).collect();
        let id = match groups.get(&core) {
            Some(&id) => {
                states[id].extend(items.iter().copied());
                id
            }
            None => {
                let id = states.len();
                groups.insert(core, id);
                states.push(items.clone());
                id
            }
        };
        mapping.push(id);
    }

    let edges: Set<Edge> = lr
        .edges()
        .iter()
        .map(|edge| Edge::new(edge.symbol, mapping[edge.from], mapping[edge.to]))
        .collect();

    tracing::debug!(
        "LALR(1) merge: {} states -> {} states",
        lr.num_states(),
        states.len()
    );

    LRAutomaton::from_parts(states, edges.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{first_follow::FirstSets, grammar::Grammar};

    #[test]
    fn merges_states_with_equal_cores() {
        let g: Grammar = "
            start -> S
            S -> C C
            C -> c C | d
        "
        .parse()
        .unwrap();
        let first = FirstSets::new(&g);
        let lr = LRAutomaton::canonical(&g, &first);
        let lalr = merge_cores(&lr);
        eprintln!("{}", lalr.display(&g));

        assert_eq!(lr.num_states(), 10);
        assert_eq!(lalr.num_states(), 7);

        // cores are distinct after merging.
        let cores: BTreeSet<BTreeSet<LRItemCore>> = lalr
            .states()
            .iter()
            .map(|items| items.iter().map(|item| item.core()).collect())
            .collect();
        assert_eq!(cores.len(), lalr.num_states());

        // still deterministic.
        let labels: BTreeSet<_> = lalr.edges().iter().map(|e| (e.from, e.symbol)).collect();
        assert_eq!(labels.len(), lalr.edges().len());

        let big_c = g.symbol("C").unwrap();
        let c = g.symbol("c").unwrap();
        let d = g.symbol("d").unwrap();
        assert_ne!(lr.run([c, d]), lr.run([big_c, c, d]));
        assert_eq!(lalr.run([c, d]), lalr.run([big_c, c, d]));
    }

    #[test]
    fn merging_is_stable() {
        let g: Grammar = "
            S -> E
            E -> E '+' T | T
            T -> id | '(' E ')'
        "
        .parse()
        .unwrap();
        let first = FirstSets::new(&g);
        let lalr = merge_cores(&LRAutomaton::canonical(&g, &first));
        assert_eq!(merge_cores(&lalr), lalr);
    }
}
