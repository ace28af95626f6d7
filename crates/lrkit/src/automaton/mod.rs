//! Finite automata over integer symbols.
//!
//! Both kinds of automaton are rooted at state `0`. A missing edge means "no
//! transition"; there is no implicit error sink. Every state carries a
//! finality code, where `0` means non-accepting and a non-zero value
//! identifies the pattern that matched.

mod integrate;
mod minimize;
mod subset;

pub use self::{
    integrate::integrate,
    minimize::{merge_equivalent, minimize, prune_unreachable, trim_dead},
    subset::{epsilon_closure, nfa_to_dfa, resolve_finality, subset_construct},
};
pub use lrkit_runtime::SymbolID;

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

/// The identifier of an automaton state.
pub type StateId = usize;

/// The acceptance marker of a state. `0` means non-accepting.
pub type Finality = u32;

/// A labeled transition `(symbol, from, to)`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge {
    pub symbol: SymbolID,
    pub from: StateId,
    pub to: StateId,
}

impl Edge {
    pub const fn new(symbol: SymbolID, from: StateId, to: StateId) -> Self {
        Self { symbol, from, to }
    }

    pub const fn epsilon(from: StateId, to: StateId) -> Self {
        Self::new(SymbolID::EPSILON, from, to)
    }

    pub fn is_epsilon(&self) -> bool {
        self.symbol == SymbolID::EPSILON
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AutomatonError {
    #[error("epsilon edge {} -> {} is not allowed in a DFA", from, to)]
    EpsilonEdge { from: StateId, to: StateId },

    #[error("state {} has more than one transition on {:?}", state, symbol)]
    NonDeterministic { state: StateId, symbol: SymbolID },
}

/// A nondeterministic finite automaton.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Nfa {
    transitions: BTreeMap<StateId, BTreeMap<SymbolID, BTreeSet<StateId>>>,
    finality: BTreeMap<StateId, Finality>,
}

impl Nfa {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an NFA from a flat edge list and a finality assignment.
    pub fn from_edges<E, F>(edges: E, finality: F) -> Self
    where
        E: IntoIterator<Item = Edge>,
        F: IntoIterator<Item = (StateId, Finality)>,
    {
        let mut nfa = Self::new();
        for edge in edges {
            nfa.add_edge(edge);
        }
        for (state, code) in finality {
            nfa.set_finality(state, code);
        }
        nfa
    }

    pub fn add_edge(&mut self, edge: Edge) {
        self.transitions
            .entry(edge.from)
            .or_default()
            .entry(edge.symbol)
            .or_default()
            .insert(edge.to);
    }

    pub fn set_finality(&mut self, state: StateId, code: Finality) {
        if code == 0 {
            self.finality.remove(&state);
        } else {
            self.finality.insert(state, code);
        }
    }

    pub fn finality(&self, state: StateId) -> Finality {
        self.finality.get(&state).copied().unwrap_or(0)
    }

    /// The non-zero finality codes of this automaton.
    pub fn finality_map(&self) -> &BTreeMap<StateId, Finality> {
        &self.finality
    }

    /// Iterate over the outgoing transitions of a state, grouped by symbol.
    pub fn transitions(
        &self,
        state: StateId,
    ) -> impl Iterator<Item = (SymbolID, &BTreeSet<StateId>)> + '_ {
        self.transitions
            .get(&state)
            .into_iter()
            .flat_map(|edges| edges.iter().map(|(symbol, targets)| (*symbol, targets)))
    }

    pub fn successors(&self, state: StateId, symbol: SymbolID) -> impl Iterator<Item = StateId> + '_ {
        self.transitions
            .get(&state)
            .and_then(|edges| edges.get(&symbol))
            .into_iter()
            .flat_map(|targets| targets.iter().copied())
    }

    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.transitions.iter().flat_map(|(from, edges)| {
            edges.iter().flat_map(move |(symbol, targets)| {
                targets.iter().map(move |to| Edge::new(*symbol, *from, *to))
            })
        })
    }

    /// The start state plus every state mentioned by an edge or finality code.
    pub fn states(&self) -> BTreeSet<StateId> {
        let mut states = BTreeSet::new();
        states.insert(0);
        for edge in self.edges() {
            states.insert(edge.from);
            states.insert(edge.to);
        }
        states.extend(self.finality.keys().copied());
        states
    }
}

impl fmt::Display for Nfa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## edges")?;
        for edge in self.edges() {
            writeln!(f, "- {} --{:?}--> {}", edge.from, edge.symbol, edge.to)?;
        }
        writeln!(f, "## finality")?;
        for (state, code) in &self.finality {
            writeln!(f, "- {} => {}", state, code)?;
        }
        Ok(())
    }
}

/// A deterministic finite automaton with states `0..num_states`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dfa {
    num_states: usize,
    transitions: BTreeMap<StateId, BTreeMap<SymbolID, StateId>>,
    finality: BTreeMap<StateId, Finality>,
}

impl Default for Dfa {
    fn default() -> Self {
        Self::with_states(1)
    }
}

impl Dfa {
    /// Create a DFA consisting of a lone start state.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_states(num_states: usize) -> Self {
        Self {
            num_states: num_states.max(1),
            transitions: BTreeMap::new(),
            finality: BTreeMap::new(),
        }
    }

    /// Build a DFA from a flat edge list and a finality assignment.
    pub fn from_edges<E, F>(edges: E, finality: F) -> Result<Self, AutomatonError>
    where
        E: IntoIterator<Item = Edge>,
        F: IntoIterator<Item = (StateId, Finality)>,
    {
        let mut dfa = Self::new();
        for edge in edges {
            if edge.is_epsilon() {
                return Err(AutomatonError::EpsilonEdge {
                    from: edge.from,
                    to: edge.to,
                });
            }
            match dfa.set_transition(edge.from, edge.symbol, edge.to) {
                Some(prev) if prev != edge.to => {
                    return Err(AutomatonError::NonDeterministic {
                        state: edge.from,
                        symbol: edge.symbol,
                    });
                }
                _ => (),
            }
        }
        for (state, code) in finality {
            dfa.set_finality(state, code);
        }
        Ok(dfa)
    }

    pub fn num_states(&self) -> usize {
        self.num_states
    }

    pub fn states(&self) -> std::ops::Range<StateId> {
        0..self.num_states
    }

    pub fn add_state(&mut self) -> StateId {
        let id = self.num_states;
        self.num_states += 1;
        id
    }

    /// Set the transition on `symbol` from `from`, returning the previous target.
    pub fn set_transition(&mut self, from: StateId, symbol: SymbolID, to: StateId) -> Option<StateId> {
        self.num_states = self.num_states.max(from + 1).max(to + 1);
        self.transitions.entry(from).or_default().insert(symbol, to)
    }

    pub fn remove_transition(&mut self, from: StateId, symbol: SymbolID) -> Option<StateId> {
        let edges = self.transitions.get_mut(&from)?;
        let removed = edges.remove(&symbol);
        if edges.is_empty() {
            self.transitions.remove(&from);
        }
        removed
    }

    pub fn transition(&self, state: StateId, symbol: SymbolID) -> Option<StateId> {
        self.transitions.get(&state)?.get(&symbol).copied()
    }

    pub fn transitions(&self, state: StateId) -> impl Iterator<Item = (SymbolID, StateId)> + '_ {
        self.transitions
            .get(&state)
            .into_iter()
            .flat_map(|edges| edges.iter().map(|(symbol, to)| (*symbol, *to)))
    }

    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.transitions.iter().flat_map(|(from, edges)| {
            edges
                .iter()
                .map(move |(symbol, to)| Edge::new(*symbol, *from, *to))
        })
    }

    pub fn set_finality(&mut self, state: StateId, code: Finality) {
        self.num_states = self.num_states.max(state + 1);
        if code == 0 {
            self.finality.remove(&state);
        } else {
            self.finality.insert(state, code);
        }
    }

    pub fn finality(&self, state: StateId) -> Finality {
        self.finality.get(&state).copied().unwrap_or(0)
    }

    /// The non-zero finality codes of this automaton.
    pub fn finality_map(&self) -> &BTreeMap<StateId, Finality> {
        &self.finality
    }

    pub fn is_accepting(&self, state: StateId) -> bool {
        self.finality(state) != 0
    }

    /// Follow the transitions for `input` from the start state and return
    /// the state reached, or `None` if some symbol has no transition.
    pub fn run<I>(&self, input: I) -> Option<StateId>
    where
        I: IntoIterator<Item = SymbolID>,
    {
        input
            .into_iter()
            .try_fold(0, |state, symbol| self.transition(state, symbol))
    }

    /// Return the finality code reached after consuming `input`, `0` if rejected.
    pub fn accepts<I>(&self, input: I) -> Finality
    where
        I: IntoIterator<Item = SymbolID>,
    {
        self.run(input).map_or(0, |state| self.finality(state))
    }

    /// Return the finality code for a string, reading each character as a symbol.
    pub fn accepts_str(&self, input: &str) -> Finality {
        self.accepts(input.chars().map(SymbolID::from_char))
    }

    pub fn to_nfa(&self) -> Nfa {
        Nfa::from_edges(self.edges(), self.finality.iter().map(|(s, c)| (*s, *c)))
    }
}

impl fmt::Display for Dfa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## states: {}", self.num_states)?;
        writeln!(f, "## edges")?;
        for edge in self.edges() {
            writeln!(f, "- {} --{:?}--> {}", edge.from, edge.symbol, edge.to)?;
        }
        writeln!(f, "## finality")?;
        for (state, code) in &self.finality {
            writeln!(f, "- {} => {}", state, code)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(ch: char) -> SymbolID {
        SymbolID::from_char(ch)
    }

    #[test]
    fn dfa_from_edges_rejects_nondeterminism() {
        let err = Dfa::from_edges(
            [Edge::new(sym('a'), 0, 1), Edge::new(sym('a'), 0, 2)],
            [],
        )
        .unwrap_err();
        assert!(matches!(err, AutomatonError::NonDeterministic { state: 0, .. }));

        let err = Dfa::from_edges([Edge::epsilon(0, 1)], []).unwrap_err();
        assert!(matches!(err, AutomatonError::EpsilonEdge { from: 0, to: 1 }));
    }

    #[test]
    fn dfa_run() {
        let dfa = Dfa::from_edges(
            [Edge::new(sym('a'), 0, 1), Edge::new(sym('b'), 1, 2)],
            [(2, 7)],
        )
        .unwrap();
        assert_eq!(dfa.num_states(), 3);
        assert_eq!(dfa.accepts_str("ab"), 7);
        assert_eq!(dfa.accepts_str("a"), 0);
        assert_eq!(dfa.accepts_str("abb"), 0);
        assert_eq!(dfa.run("a".chars().map(SymbolID::from_char)), Some(1));
    }

    #[test]
    fn nfa_states_include_start() {
        let nfa = Nfa::new();
        assert_eq!(nfa.states().into_iter().collect::<Vec<_>>(), [0]);

        let nfa = Nfa::from_edges([Edge::new(sym('a'), 0, 3), Edge::new(sym('a'), 0, 1)], [(3, 1)]);
        assert_eq!(nfa.successors(0, sym('a')).collect::<Vec<_>>(), [1, 3]);
        assert_eq!(nfa.finality(3), 1);
        assert_eq!(nfa.finality(1), 0);
    }
}
