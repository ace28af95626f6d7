//! Action table construction.

use crate::{
    first_follow::FirstSets,
    grammar::{Assoc, Grammar, Precedence, RuleID, SymbolID},
    lr1::LRAutomaton,
    types::Map,
    util::display_fn,
};
use lrkit_runtime::{Action, ParseTable, RuleShape, StateID};
use std::{cmp::Ordering, fmt};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Algorithm {
    /// Knuth's canonical LR(1) collection, without merging.
    Canonical,

    /// LR(1) states sharing the same core are merged.
    LALR,
}

/// How clashing entries of the action table are handled.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Mode {
    /// A later entry for the same `(state, symbol)` replaces the earlier one.
    #[default]
    Lenient,

    /// Clashing entries are resolved by precedence, or reported as conflicts.
    Strict,
}

#[derive(Debug, Clone)]
pub struct Config {
    algorithm: Algorithm,
    mode: Mode,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub const fn new() -> Self {
        Self {
            algorithm: Algorithm::LALR,
            mode: Mode::Lenient,
        }
    }

    /// Keep the canonical LR(1) states as they are.
    pub fn use_canonical(&mut self) -> &mut Self {
        self.algorithm = Algorithm::Canonical;
        self
    }

    /// Merge the LR(1) states with the same core (default).
    pub fn use_lalr(&mut self) -> &mut Self {
        self.algorithm = Algorithm::LALR;
        self
    }

    /// Report conflicts instead of overwriting table entries.
    pub fn strict(&mut self, enabled: bool) -> &mut Self {
        self.mode = if enabled { Mode::Strict } else { Mode::Lenient };
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Build the LR automaton selected by this configuration.
    pub fn automaton(&self, grammar: &Grammar) -> LRAutomaton {
        let first_sets = FirstSets::new(grammar);
        let lr = LRAutomaton::canonical(grammar, &first_sets);
        match self.algorithm {
            Algorithm::Canonical => lr,
            Algorithm::LALR => lr.to_lalr(),
        }
    }

    /// Generate the action table for `grammar`.
    #[tracing::instrument(skip_all, fields(algorithm = ?self.algorithm, mode = ?self.mode))]
    pub fn generate(&self, grammar: &Grammar) -> Result<ActionTable, TableError> {
        let automaton = self.automaton(grammar);
        ActionTable::new(grammar, &automaton, self.mode)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("detected {} conflict(s)", _0.len())]
    Conflicts(Vec<Conflict>),
}

/// Two actions competing for the same table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub state: StateID,
    pub symbol: SymbolID,
    pub existing: Action,
    pub incoming: Action,
}

impl Conflict {
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            write!(
                f,
                "state {}, lookahead {}: {} vs {}",
                self.state,
                g.name(self.symbol),
                display_action(g, &self.existing),
                display_action(g, &self.incoming),
            )
        })
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "state {}, symbol {}: {} vs {}",
            self.state, self.symbol, self.existing, self.incoming
        )
    }
}

/// The table mapping `(state, symbol)` to an action.
#[derive(Debug, Clone)]
pub struct ActionTable {
    rows: Vec<Map<SymbolID, Action>>,
    rules: Vec<RuleShape>,
}

impl ActionTable {
    /// Synthesize the action table of an LR automaton.
    pub fn new(g: &Grammar, automaton: &LRAutomaton, mode: Mode) -> Result<Self, TableError> {
        let rules = g
            .productions()
            .iter()
            .map(|p| RuleShape {
                left: p.left(),
                len: p.right().len(),
            })
            .collect();

        let rows = match mode {
            Mode::Lenient => lenient_rows(g, automaton),
            Mode::Strict => strict_rows(g, automaton)?,
        };

        tracing::debug!(
            "action table: {} states, {} entries",
            rows.len(),
            rows.iter().map(|row| row.len()).sum::<usize>()
        );

        Ok(Self { rows, rules })
    }

    pub fn num_states(&self) -> usize {
        self.rows.len()
    }

    pub fn get(&self, state: StateID, symbol: SymbolID) -> Option<Action> {
        self.rows.get(state.index())?.get(&symbol).copied()
    }

    /// Iterate over every entry of this table, state by state.
    pub fn entries(&self) -> impl Iterator<Item = (StateID, SymbolID, Action)> + '_ {
        self.rows.iter().enumerate().flat_map(|(i, row)| {
            row.iter()
                .map(move |(symbol, action)| (StateID::from_index(i), *symbol, *action))
        })
    }

    /// The symbols with a non-`Goto` entry in `state`, in ascending order.
    pub fn expected(&self, state: StateID) -> Vec<SymbolID> {
        let mut symbols: Vec<SymbolID> = self
            .rows
            .get(state.index())
            .into_iter()
            .flat_map(|row| row.iter())
            .filter(|(_, action)| !matches!(action, Action::Goto(..)))
            .map(|(symbol, _)| *symbol)
            .collect();
        symbols.sort();
        symbols
    }

    pub fn rule(&self, rule: RuleID) -> Option<RuleShape> {
        self.rules.get(rule.index()).copied()
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for (i, row) in self.rows.iter().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }
                writeln!(f, "#### State {:02}", i)?;
                for (symbol, action) in row {
                    writeln!(f, "- {} => {}", g.name(*symbol), display_action(g, action))?;
                }
            }
            Ok(())
        })
    }
}

impl ParseTable for ActionTable {
    fn action(&self, current: StateID, symbol: SymbolID) -> Option<Action> {
        self.get(current, symbol)
    }

    fn rule(&self, rule: RuleID) -> Option<RuleShape> {
        ActionTable::rule(self, rule)
    }

    fn expected(&self, current: StateID) -> Vec<SymbolID> {
        ActionTable::expected(self, current)
    }
}

fn display_action<'g>(g: &'g Grammar, action: &'g Action) -> impl fmt::Display + 'g {
    display_fn(move |f| match action {
        Action::Reduce(rule) => match g.get_production(*rule) {
            Some(p) => write!(f, "reduce({})", p.display(g)),
            None => write!(f, "{}", action),
        },
        Action::Shift(n) => write!(f, "shift({:02})", n),
        Action::Goto(n) => write!(f, "goto({:02})", n),
        Action::Accept => f.write_str("accept"),
    })
}

fn edge_action(g: &Grammar, symbol: SymbolID, to: usize) -> Action {
    if g.is_terminal(symbol) {
        Action::Shift(StateID::from_index(to))
    } else {
        Action::Goto(StateID::from_index(to))
    }
}

fn item_action(rule: RuleID) -> Action {
    if rule == RuleID::ACCEPT {
        Action::Accept
    } else {
        Action::Reduce(rule)
    }
}

/// Edges first, then completed items state by state; the last writer wins.
fn lenient_rows(g: &Grammar, automaton: &LRAutomaton) -> Vec<Map<SymbolID, Action>> {
    let mut rows: Vec<Map<SymbolID, Action>> = vec![Map::default(); automaton.num_states()];
    let mut insert = |state: usize, symbol: SymbolID, action: Action| {
        if let Some(prev) = rows[state].insert(symbol, action) {
            if prev != action {
                tracing::trace!(
                    "state {:02}, {}: {} is overwritten by {}",
                    state,
                    g.name(symbol),
                    prev,
                    action
                );
            }
        }
    };

    for edge in automaton.edges() {
        insert(edge.from, edge.symbol, edge_action(g, edge.symbol, edge.to));
    }
    for (state, items) in automaton.states().iter().enumerate() {
        for item in items.iter().filter(|item| item.is_complete(g)) {
            insert(state, item.lookahead, item_action(item.rule));
        }
    }

    rows
}

#[derive(Debug, Default)]
struct PendingAction {
    shift: Option<StateID>,
    reduces: Vec<RuleID>,
}

fn strict_rows(g: &Grammar, automaton: &LRAutomaton) -> Result<Vec<Map<SymbolID, Action>>, TableError> {
    let mut rows = vec![];
    let mut conflicts = vec![];

    for (state, items) in automaton.states().iter().enumerate() {
        let mut row: Map<SymbolID, Action> = Map::default();
        let mut pending: Map<SymbolID, PendingAction> = Map::default();

        for edge in automaton.edges().iter().filter(|e| e.from == state) {
            match edge_action(g, edge.symbol, edge.to) {
                Action::Shift(next) => {
                    pending.entry(edge.symbol).or_default().shift.replace(next);
                }
                action => {
                    row.insert(edge.symbol, action);
                }
            }
        }
        for item in items.iter().filter(|item| item.is_complete(g)) {
            let reduces = &mut pending.entry(item.lookahead).or_default().reduces;
            if !reduces.contains(&item.rule) {
                reduces.push(item.rule);
            }
        }

        let state = StateID::from_index(state);
        for (symbol, action) in pending {
            match resolve_conflict(g, state, symbol, action.shift, &action.reduces) {
                Ok(Some(action)) => {
                    row.insert(symbol, action);
                }
                Ok(None) => (),
                Err(mut found) => conflicts.append(&mut found),
            }
        }
        rows.push(row);
    }

    if conflicts.is_empty() {
        Ok(rows)
    } else {
        for conflict in &conflicts {
            tracing::debug!("conflict: {}", conflict.display(g));
        }
        Err(TableError::Conflicts(conflicts))
    }
}

/// Attempts to resolve shift/reduce conflicts based on precedence/associativity.
///
/// `Ok(None)` means that the entry is removed (non-associative operators).
fn resolve_conflict(
    g: &Grammar,
    state: StateID,
    symbol: SymbolID,
    shift: Option<StateID>,
    reduces: &[RuleID],
) -> Result<Option<Action>, Vec<Conflict>> {
    let conflict = |existing: Action, incoming: Action| Conflict {
        state,
        symbol,
        existing,
        incoming,
    };

    match (shift, reduces) {
        (Some(next), []) => Ok(Some(Action::Shift(next))),
        (None, [reduce]) => Ok(Some(item_action(*reduce))),
        (None, []) => Ok(None),

        // exactly one shift/reduce conflict
        (Some(next), [reduce]) => {
            if *reduce == RuleID::ACCEPT {
                return Err(vec![conflict(Action::Shift(next), Action::Accept)]);
            }

            let shift_prec = g.terminal_precedence(symbol);
            let reduce_prec = g.production(*reduce).precedence(g);

            match compare_precs(shift_prec, reduce_prec) {
                Some(PrecDiff::Left) => Ok(Some(Action::Shift(next))),
                Some(PrecDiff::Right) => Ok(Some(Action::Reduce(*reduce))),
                Some(PrecDiff::Neither) => Ok(None),
                None => Err(vec![conflict(Action::Shift(next), Action::Reduce(*reduce))]),
            }
        }

        // reduce/reduce conflict(s), possibly with a shift
        (shift, [first, rest @ ..]) => {
            let mut conflicts = vec![];
            let existing = match shift {
                Some(next) => {
                    conflicts.push(conflict(Action::Shift(next), item_action(*first)));
                    Action::Shift(next)
                }
                None => item_action(*first),
            };
            for reduce in rest {
                conflicts.push(conflict(existing, item_action(*reduce)));
            }
            Err(conflicts)
        }
    }
}

#[derive(Copy, Clone)]
enum PrecDiff {
    Left,
    Right,
    Neither,
}

fn compare_precs(
    shift_prec: Option<Precedence>,
    reduce_prec: Option<Precedence>,
) -> Option<PrecDiff> {
    match (shift_prec, reduce_prec) {
        (Some(p1), Some(p2)) => match Ord::cmp(&p1.priority, &p2.priority) {
            Ordering::Greater => Some(PrecDiff::Left),
            Ordering::Less => Some(PrecDiff::Right),
            Ordering::Equal => match p1.assoc {
                Assoc::Left => Some(PrecDiff::Right),
                Assoc::Right => Some(PrecDiff::Left),
                Assoc::Nonassoc => Some(PrecDiff::Neither),
            },
        },
        _ => None,
    }
}
