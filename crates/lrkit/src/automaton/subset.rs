//! Epsilon closure and subset construction.

use super::{Dfa, Finality, Nfa, StateId, SymbolID};
use crate::types::{Map, Queue};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Compute the set of states reachable from `states` through epsilon edges alone.
pub fn epsilon_closure<I>(states: I, nfa: &Nfa) -> BTreeSet<StateId>
where
    I: IntoIterator<Item = StateId>,
{
    let mut queue: Queue<StateId> = states.into_iter().collect();
    while let Some(state) = queue.pop() {
        for next in nfa.successors(state, SymbolID::EPSILON) {
            queue.push(next);
        }
    }
    queue.into_seen().into_iter().collect()
}

/// Convert an NFA into a DFA using the powerset construction.
///
/// DFA states are numbered in breadth-first order of discovery starting from
/// the closure of NFA state `0`. Along with the DFA (whose finality is left
/// unresolved), the NFA states making up each DFA state are returned, indexed
/// by DFA state.
pub fn subset_construct(nfa: &Nfa) -> (Dfa, Vec<BTreeSet<StateId>>) {
    let start = epsilon_closure([0], nfa);

    let mut dfa = Dfa::new();
    let mut closures = vec![start.clone()];
    let mut known: Map<BTreeSet<StateId>, StateId> = Map::default();
    known.insert(start, 0);

    let mut pending = VecDeque::new();
    pending.push_back(0);

    while let Some(current) = pending.pop_front() {
        // 記号ごとに遷移先の集合をまとめる
        let mut moves: BTreeMap<SymbolID, BTreeSet<StateId>> = BTreeMap::new();
        for &state in &closures[current] {
            for (symbol, targets) in nfa.transitions(state) {
                if symbol == SymbolID::EPSILON {
                    continue;
                }
                moves.entry(symbol).or_default().extend(targets);
            }
        }

        for (symbol, targets) in moves {
            let closure = epsilon_closure(targets, nfa);
            let next = match known.get(&closure) {
                Some(&id) => id,
                None => {
                    let id = dfa.add_state();
                    known.insert(closure.clone(), id);
                    closures.push(closure);
                    pending.push_back(id);
                    id
                }
            };
            dfa.set_transition(current, symbol, next);
        }
    }

    tracing::trace!(
        "subset construction: {} NFA states -> {} DFA states",
        nfa.states().len(),
        dfa.num_states()
    );

    (dfa, closures)
}

/// Determine the finality code of every DFA state from the NFA states it is
/// made of. The smallest non-zero code wins; a state without accepting
/// members is non-accepting.
pub fn resolve_finality(
    nfa_finality: &BTreeMap<StateId, Finality>,
    closures: &[BTreeSet<StateId>],
) -> BTreeMap<StateId, Finality> {
    closures
        .iter()
        .enumerate()
        .filter_map(|(id, closure)| {
            closure
                .iter()
                .filter_map(|state| nfa_finality.get(state).copied())
                .filter(|code| *code != 0)
                .min()
                .map(|code| (id, code))
        })
        .collect()
}

/// Convert an NFA into a DFA with resolved finality codes.
pub fn nfa_to_dfa(nfa: &Nfa) -> Dfa {
    let (mut dfa, closures) = subset_construct(nfa);
    for (state, code) in resolve_finality(nfa.finality_map(), &closures) {
        dfa.set_finality(state, code);
    }
    dfa
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton::Edge;

    fn sym(ch: char) -> SymbolID {
        SymbolID::from_char(ch)
    }

    #[test]
    fn closure_follows_epsilon_chains() {
        let nfa = Nfa::from_edges(
            [
                Edge::epsilon(0, 1),
                Edge::epsilon(1, 2),
                Edge::new(sym('a'), 2, 3),
                Edge::epsilon(3, 0),
            ],
            [],
        );
        let closure = epsilon_closure([0], &nfa);
        assert_eq!(closure.into_iter().collect::<Vec<_>>(), [0, 1, 2]);
        let closure = epsilon_closure([3], &nfa);
        assert_eq!(closure.into_iter().collect::<Vec<_>>(), [0, 1, 2, 3]);
    }

    #[test]
    fn empty_nfa_yields_single_state() {
        let (dfa, closures) = subset_construct(&Nfa::new());
        assert_eq!(dfa.num_states(), 1);
        assert_eq!(dfa.edges().count(), 0);
        assert_eq!(closures.len(), 1);
    }

    #[test]
    fn identical_closures_are_shared() {
        // (a|a)b
        let nfa = Nfa::from_edges(
            [
                Edge::new(sym('a'), 0, 1),
                Edge::new(sym('a'), 0, 2),
                Edge::epsilon(1, 3),
                Edge::epsilon(2, 3),
                Edge::new(sym('b'), 3, 4),
            ],
            [(4, 1)],
        );
        let (dfa, closures) = subset_construct(&nfa);
        assert_eq!(dfa.num_states(), 3);
        assert_eq!(closures[1].iter().copied().collect::<Vec<_>>(), [1, 2, 3]);
        assert_eq!(dfa.transition(0, sym('a')), Some(1));
        assert_eq!(dfa.transition(1, sym('b')), Some(2));
        // finality is not resolved yet.
        assert!(dfa.finality_map().is_empty());
    }

    #[test]
    fn smallest_code_wins() {
        let closures: Vec<BTreeSet<StateId>> = vec![
            [0].into_iter().collect(),
            [1, 2, 3].into_iter().collect(),
            [3].into_iter().collect(),
        ];
        let finality: BTreeMap<StateId, Finality> = [(1, 5), (2, 2), (3, 9)].into_iter().collect();
        let resolved = resolve_finality(&finality, &closures);
        assert_eq!(resolved.into_iter().collect::<Vec<_>>(), [(1, 2), (2, 9)]);
    }
}
