//! DFA minimization.

use super::{Dfa, StateId, SymbolID};
use crate::types::Map;
use bit_set::BitSet;
use std::collections::VecDeque;

/// Produce the minimal DFA equivalent to `dfa`.
///
/// Dead states are trimmed, equivalent states merged and unreachable states
/// pruned; the result is numbered breadth-first from state `0`. Applying
/// this function to its own output returns an identical automaton.
pub fn minimize(dfa: &Dfa) -> Dfa {
    let minimized = prune_unreachable(&merge_equivalent(&trim_dead(dfa)));
    tracing::trace!(
        "minimize: {} states -> {} states",
        dfa.num_states(),
        minimized.num_states()
    );
    minimized
}

/// Drop every transition into or out of a state (other than the start) from
/// which no accepting state can be reached.
pub fn trim_dead(dfa: &Dfa) -> Dfa {
    let n = dfa.num_states();

    let mut predecessors: Vec<Vec<StateId>> = vec![vec![]; n];
    for edge in dfa.edges() {
        predecessors[edge.to].push(edge.from);
    }

    let mut live = BitSet::with_capacity(n);
    let mut stack: Vec<StateId> = dfa.finality_map().keys().copied().collect();
    for &state in &stack {
        live.insert(state);
    }
    while let Some(state) = stack.pop() {
        for &pred in &predecessors[state] {
            if live.insert(pred) {
                stack.push(pred);
            }
        }
    }

    let mut trimmed = Dfa::with_states(n);
    for edge in dfa.edges() {
        if live.contains(edge.from) && live.contains(edge.to) {
            trimmed.set_transition(edge.from, edge.symbol, edge.to);
        }
    }
    for (&state, &code) in dfa.finality_map() {
        trimmed.set_finality(state, code);
    }
    trimmed
}

/// Merge equivalent states by iterative partition refinement.
///
/// States start out grouped by finality code and are re-colored by their
/// outgoing transitions until the partition no longer changes. Every class
/// is represented by its smallest state id; the other members keep their
/// ids but lose their transitions, leaving them unreachable.
pub fn merge_equivalent(dfa: &Dfa) -> Dfa {
    let n = dfa.num_states();

    let mut initial: Map<u32, usize> = Map::default();
    let mut colors: Vec<usize> = dfa
        .states()
        .map(|state| {
            let next = initial.len();
            *initial.entry(dfa.finality(state)).or_insert(next)
        })
        .collect();
    let mut num_colors = initial.len();

    loop {
        let mut signatures: Map<(usize, Vec<(SymbolID, usize)>), usize> = Map::default();
        let recolored: Vec<usize> = dfa
            .states()
            .map(|state| {
                let signature = (
                    colors[state],
                    dfa.transitions(state)
                        .map(|(symbol, to)| (symbol, colors[to]))
                        .collect(),
                );
                let next = signatures.len();
                *signatures.entry(signature).or_insert(next)
            })
            .collect();

        let stable = signatures.len() == num_colors;
        colors = recolored;
        num_colors = signatures.len();
        if stable {
            break;
        }
    }

    // 各クラスの代表は最小のID
    let mut representatives: Vec<Option<StateId>> = vec![None; num_colors];
    for state in dfa.states() {
        representatives[colors[state]].get_or_insert(state);
    }
    let representative = |state: StateId| representatives[colors[state]].unwrap_or(state);

    let mut merged = Dfa::with_states(n);
    for state in dfa.states().filter(|s| representative(*s) == *s) {
        for (symbol, to) in dfa.transitions(state) {
            merged.set_transition(state, symbol, representative(to));
        }
        merged.set_finality(state, dfa.finality(state));
    }
    merged
}

/// Remove the states unreachable from state `0`, renumbering the rest
/// contiguously in breadth-first order.
pub fn prune_unreachable(dfa: &Dfa) -> Dfa {
    let mut new_ids: Vec<Option<StateId>> = vec![None; dfa.num_states()];
    let mut order = vec![0];
    new_ids[0] = Some(0);

    let mut queue = VecDeque::new();
    queue.push_back(0);
    while let Some(state) = queue.pop_front() {
        for (_, to) in dfa.transitions(state) {
            if new_ids[to].is_none() {
                new_ids[to] = Some(order.len());
                order.push(to);
                queue.push_back(to);
            }
        }
    }

    let mut pruned = Dfa::with_states(order.len());
    for (new_id, &old_id) in order.iter().enumerate() {
        for (symbol, to) in dfa.transitions(old_id) {
            if let Some(to) = new_ids[to] {
                pruned.set_transition(new_id, symbol, to);
            }
        }
        pruned.set_finality(new_id, dfa.finality(old_id));
    }
    pruned
}
