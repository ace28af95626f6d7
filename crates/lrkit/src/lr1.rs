//! The implementation of LR(1) automaton.

use crate::{
    automaton::Edge,
    first_follow::FirstSets,
    grammar::{Grammar, RuleID, SymbolID},
    types::{Map, Queue, Set},
    util::display_fn,
};
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

// LR(1) item
// X: Y1 Y2 ... Yn という構文規則があったとき、それにマーカ位置と先読み記号を付与したもの
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LRItem {
    pub rule: RuleID,
    pub marker: usize,
    pub lookahead: SymbolID,
}

impl LRItem {
    pub const fn new(rule: RuleID, marker: usize, lookahead: SymbolID) -> Self {
        Self {
            rule,
            marker,
            lookahead,
        }
    }

    /// The item with its lookahead stripped.
    pub const fn core(&self) -> LRItemCore {
        LRItemCore {
            rule: self.rule,
            marker: self.marker,
        }
    }

    /// The symbol right after the marker, if any.
    pub fn next_symbol(&self, g: &Grammar) -> Option<SymbolID> {
        g.production(self.rule).right().get(self.marker).copied()
    }

    pub fn is_complete(&self, g: &Grammar) -> bool {
        self.marker >= g.production(self.rule).right().len()
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            write!(f, "{}, {}", self.core().display(g), g.name(self.lookahead))
        })
    }
}

/// A production with a marker position.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LRItemCore {
    pub rule: RuleID,
    pub marker: usize,
}

impl LRItemCore {
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            let rule = g.production(self.rule);
            write!(f, "({} :=", g.name(rule.left()))?;
            for (i, symbol) in rule.right().iter().enumerate() {
                if i == self.marker {
                    f.write_str(" .")?;
                }
                write!(f, " {}", g.name(*symbol))?;
            }
            if self.marker == rule.right().len() {
                f.write_str(" .")?;
            }
            f.write_str(")")
        })
    }
}

/// A closure-complete set of LR(1) items, ordered so that it can serve as a map key.
pub type ItemSet = BTreeSet<LRItem>;

/// Expand `items` to its closure.
///
/// For an item `[A -> α . B β, a]`, the lookaheads of the added `B` items are
/// FIRST of the single symbol following `B` (without epsilon), or `a` itself
/// when `B` ends the production.
pub fn closure<I>(items: I, g: &Grammar, first_sets: &FirstSets) -> ItemSet
where
    I: IntoIterator<Item = LRItem>,
{
    let mut queue: Queue<LRItem> = items.into_iter().collect();
    while let Some(item) = queue.pop() {
        let right = g.production(item.rule).right();

        // [X -> ... @ Y beta]
        //  Y: one nonterminal symbol
        let (y_symbol, beta) = match &right[item.marker.min(right.len())..] {
            [y_symbol, beta @ ..] if g.is_nonterminal(*y_symbol) => (*y_symbol, beta),
            _ => continue,
        };

        let lookaheads: Vec<SymbolID> = match beta.first() {
            Some(next) => first_sets
                .get(*next)
                .into_iter()
                .flatten()
                .copied()
                .filter(|s| *s != SymbolID::EPSILON)
                .collect(),
            None => vec![item.lookahead],
        };

        for &rule in g.productions_of(y_symbol) {
            for &lookahead in &lookaheads {
                queue.push(LRItem::new(rule, 0, lookahead));
            }
        }
    }
    queue.into_seen().into_iter().collect()
}

/// The canonical collection of LR(1) item sets and the transitions among them.
#[derive(Debug, Clone, PartialEq)]
pub struct LRAutomaton {
    states: Vec<ItemSet>,
    edges: Vec<Edge>,
}

impl LRAutomaton {
    /// Build the canonical LR(1) collection.
    ///
    /// States are numbered in breadth-first order of discovery, with the
    /// transitions of each state visited in ascending symbol order. Other
    /// discovery orders yield isomorphic automata.
    #[tracing::instrument(skip_all)]
    pub fn canonical(g: &Grammar, first_sets: &FirstSets) -> Self {
        warn_nullable_lookaheads(g, first_sets);

        let start = closure(
            [LRItem::new(RuleID::ACCEPT, 0, SymbolID::EOI)],
            g,
            first_sets,
        );

        let mut states = vec![start.clone()];
        let mut edges = vec![];
        let mut known: Map<ItemSet, usize> = Map::default();
        known.insert(start, 0);

        // 新規に状態が生成されなくなるまで繰り返す
        let mut current = 0;
        while current < states.len() {
            for (symbol, kernel) in goto_kernels(&states[current], g) {
                let item_set = closure(kernel, g, first_sets);
                let next = match known.get(&item_set) {
                    Some(&id) => id,
                    None => {
                        let id = states.len();
                        known.insert(item_set.clone(), id);
                        states.push(item_set);
                        id
                    }
                };
                edges.push(Edge::new(symbol, current, next));
            }
            current += 1;
        }

        tracing::debug!(
            "canonical LR(1) collection: {} states, {} edges",
            states.len(),
            edges.len()
        );

        Self { states, edges }
    }

    pub(crate) fn from_parts(states: Vec<ItemSet>, edges: Vec<Edge>) -> Self {
        Self { states, edges }
    }

    /// Merge the states sharing the same core into an LALR(1) automaton.
    pub fn to_lalr(&self) -> Self {
        crate::lalr::merge_cores(self)
    }

    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    pub fn states(&self) -> &[ItemSet] {
        &self.states[..]
    }

    pub fn state(&self, id: usize) -> Option<&ItemSet> {
        self.states.get(id)
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges[..]
    }

    pub fn transition(&self, from: usize, symbol: SymbolID) -> Option<usize> {
        self.edges
            .iter()
            .find(|edge| edge.from == from && edge.symbol == symbol)
            .map(|edge| edge.to)
    }

    /// Return the state reached by following `symbols` from the start state.
    pub fn run<I>(&self, symbols: I) -> Option<usize>
    where
        I: IntoIterator<Item = SymbolID>,
    {
        symbols
            .into_iter()
            .try_fold(0, |state, symbol| self.transition(state, symbol))
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for (id, items) in self.states.iter().enumerate() {
                if id > 0 {
                    writeln!(f)?;
                }
                writeln!(f, "#### State {:02}", id)?;

                writeln!(f, "## item_sets")?;
                let mut lookaheads: BTreeMap<LRItemCore, Vec<SymbolID>> = BTreeMap::new();
                for item in items {
                    lookaheads.entry(item.core()).or_default().push(item.lookahead);
                }
                for (core, lookaheads) in &lookaheads {
                    write!(f, "- {}  [", core.display(g))?;
                    for (i, lookahead) in lookaheads.iter().enumerate() {
                        if i > 0 {
                            f.write_str(" ")?;
                        }
                        write!(f, "{}", g.name(*lookahead))?;
                    }
                    f.write_str("]\n")?;
                }

                writeln!(f, "## edges")?;
                for edge in self.edges.iter().filter(|e| e.from == id) {
                    writeln!(f, "- {} => {:02}", g.name(edge.symbol), edge.to)?;
                }
            }
            Ok(())
        })
    }
}

/// 指定したLRアイテム集合から遷移先のLRアイテム集合（未展開）とラベルを抽出する
fn goto_kernels(items: &ItemSet, g: &Grammar) -> BTreeMap<SymbolID, Vec<LRItem>> {
    let mut kernels: BTreeMap<SymbolID, Vec<LRItem>> = BTreeMap::new();
    for item in items {
        if let Some(symbol) = item.next_symbol(g) {
            kernels.entry(symbol).or_default().push(LRItem {
                marker: item.marker + 1,
                ..*item
            });
        }
    }
    kernels
}

/// Warn about `[A -> α . B β]` positions whose lookahead approximation
/// may lose terminals, i.e. where the symbol after `B` is nullable.
fn warn_nullable_lookaheads(g: &Grammar, first_sets: &FirstSets) {
    let mut reported: Set<RuleID> = Set::default();
    for production in g.productions() {
        for pair in production.right().windows(2) {
            if g.is_nonterminal(pair[0]) && first_sets.is_nullable(pair[1]) && reported.insert(production.id()) {
                tracing::warn!(
                    "nullable symbol `{}' follows a nonterminal in `{}'; lookaheads are approximated by its FIRST set only",
                    g.name(pair[1]),
                    production.display(g),
                );
            }
        }
    }
}
