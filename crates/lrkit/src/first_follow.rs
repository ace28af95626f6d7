//! Calculation of FIRST and FOLLOW sets.

use crate::{
    grammar::{Grammar, SymbolID},
    types::{Map, Set},
    util::display_fn,
};
use std::fmt;

/// FIRST sets of every grammar symbol.
///
/// A nullable symbol has `SymbolID::EPSILON` in its FIRST set.
#[derive(Debug)]
pub struct FirstSets {
    map: Map<SymbolID, Set<SymbolID>>,
}

impl FirstSets {
    #[tracing::instrument(skip_all)]
    pub fn new(grammar: &Grammar) -> Self {
        let mut map: Map<SymbolID, Set<SymbolID>> = Map::default();

        // terminal symbols については First(T) = {T} になる
        for terminal in grammar.terminals().chain(Some(SymbolID::EOI)) {
            map.insert(terminal, Some(terminal).into_iter().collect());
        }
        for nonterminal in grammar.nonterminals() {
            map.insert(nonterminal, Set::default());
        }

        // 値が更新されなくなるまで繰り返す
        let mut passes = 0;
        let mut changed = true;
        while changed {
            changed = false;
            passes += 1;
            for production in grammar.productions() {
                let first = first_of(&map, production.right());
                let target = map.entry(production.left()).or_default();
                for symbol in first {
                    changed |= target.insert(symbol);
                }
            }
        }
        tracing::trace!("FIRST sets converged after {} passes", passes);

        Self { map }
    }

    /// `First(X)`
    pub fn get(&self, symbol: SymbolID) -> Option<&Set<SymbolID>> {
        self.map.get(&symbol)
    }

    pub fn is_nullable(&self, symbol: SymbolID) -> bool {
        self.get(symbol)
            .map_or(false, |first| first.contains(&SymbolID::EPSILON))
    }

    /// `First(Y1 Y2 ... Yn)`; contains `EPSILON` iff the whole sequence is nullable.
    pub fn of_sequence(&self, symbols: &[SymbolID]) -> Set<SymbolID> {
        first_of(&self.map, symbols)
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| display_sets(f, g, &self.map, |s| g.is_nonterminal(s)))
    }
}

fn first_of(map: &Map<SymbolID, Set<SymbolID>>, symbols: &[SymbolID]) -> Set<SymbolID> {
    let mut res = Set::default();
    for symbol in symbols {
        let mut nullable = false;
        if let Some(first) = map.get(symbol) {
            for s in first {
                if *s == SymbolID::EPSILON {
                    nullable = true;
                } else {
                    res.insert(*s);
                }
            }
        }
        if !nullable {
            return res;
        }
    }
    res.insert(SymbolID::EPSILON);
    res
}

/// FOLLOW sets of every nonterminal symbol.
#[derive(Debug)]
pub struct FollowSets {
    map: Map<SymbolID, Set<SymbolID>>,
}

impl FollowSets {
    #[tracing::instrument(skip_all)]
    pub fn new(grammar: &Grammar, first_sets: &FirstSets) -> Self {
        let mut map: Map<SymbolID, Set<SymbolID>> = grammar
            .nonterminals()
            .map(|n| (n, Set::default()))
            .collect();
        map.entry(grammar.start_symbol())
            .or_default()
            .insert(SymbolID::EOI);

        // B -> α A β という構文規則に対し
        //  1. First(β) \ {ε} ⊆ Follow(A)
        //  2. β が nullable ならば Follow(B) ⊆ Follow(A)
        let mut changed = true;
        while changed {
            changed = false;
            for production in grammar.productions() {
                let right = production.right();
                for (i, symbol) in right.iter().enumerate() {
                    if !grammar.is_nonterminal(*symbol) {
                        continue;
                    }

                    let beta = first_sets.of_sequence(&right[i + 1..]);
                    let mut added: Vec<SymbolID> = beta
                        .iter()
                        .copied()
                        .filter(|s| *s != SymbolID::EPSILON)
                        .collect();
                    if beta.contains(&SymbolID::EPSILON) {
                        if let Some(follow) = map.get(&production.left()) {
                            added.extend(follow.iter().copied());
                        }
                    }

                    let target = map.entry(*symbol).or_default();
                    for s in added {
                        changed |= target.insert(s);
                    }
                }
            }
        }

        Self { map }
    }

    /// `Follow(X)`, `None` for terminals.
    pub fn get(&self, symbol: SymbolID) -> Option<&Set<SymbolID>> {
        self.map.get(&symbol)
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| display_sets(f, g, &self.map, |_| true))
    }
}

fn display_sets(
    f: &mut fmt::Formatter<'_>,
    g: &Grammar,
    map: &Map<SymbolID, Set<SymbolID>>,
    filter: impl Fn(SymbolID) -> bool,
) -> fmt::Result {
    for (symbol, set) in map.iter().filter(|(s, _)| filter(**s)) {
        write!(f, "{}: {{", g.name(*symbol))?;
        for (i, s) in set.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(&g.name(*s))?;
        }
        writeln!(f, "}}")?;
    }
    Ok(())
}
