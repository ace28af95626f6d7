//! Union of independently built DFAs into one multi-pattern recognizer.

use super::{minimize, nfa_to_dfa, Dfa, Edge, Finality, Nfa};

/// Combine several DFAs into a single minimized DFA.
///
/// Every accepting state of the `i`-th input is relabeled with the code
/// `i + 1`, so the finality of the result tells which pattern matched. When
/// more than one pattern matches the same input, the earliest one wins.
pub fn integrate<'a, I>(dfas: I) -> Dfa
where
    I: IntoIterator<Item = &'a Dfa>,
{
    let mut nfa = Nfa::new();
    let mut offset = 1;

    for (i, dfa) in dfas.into_iter().enumerate() {
        let code = (i + 1) as Finality;
        let dfa = minimize(dfa);

        nfa.add_edge(Edge::epsilon(0, offset));
        for edge in dfa.edges() {
            nfa.add_edge(Edge::new(edge.symbol, edge.from + offset, edge.to + offset));
        }
        for &state in dfa.finality_map().keys() {
            nfa.set_finality(state + offset, code);
        }

        offset += dfa.num_states();
    }

    minimize(&nfa_to_dfa(&nfa))
}
