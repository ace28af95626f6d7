//! Grammar types.

use crate::{
    types::{Map, Set},
    util::display_fn,
};
use std::{borrow::Cow, fmt, fs, io, path::Path, str::FromStr};

pub use lrkit_runtime::{RuleID, SymbolID};

/// The first id handed out to named symbols, above every single-character
/// terminal code.
pub const FIRST_NAMED_SYMBOL: i32 = 258;

/// The largest character code usable as a literal terminal.
pub const MAX_LITERAL: u32 = 255;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SymbolKind {
    Terminal,
    Nonterminal,
}

/// The type that represents a production rule in grammar.
#[derive(Debug, Clone, PartialEq)]
pub struct Production {
    id: RuleID,
    left: SymbolID,
    right: Vec<SymbolID>,
    precedence: Option<Precedence>,
}

impl Production {
    pub fn id(&self) -> RuleID {
        self.id
    }

    /// Return the left-hand side of this production.
    pub fn left(&self) -> SymbolID {
        self.left
    }

    /// Return the right-hand side of this production.
    pub fn right(&self) -> &[SymbolID] {
        &self.right[..]
    }

    /// The explicit precedence of this production, or that of its rightmost terminal.
    pub fn precedence(&self, g: &Grammar) -> Option<Precedence> {
        match self.precedence {
            Some(prec) => Some(prec),
            None => self
                .right
                .iter()
                .rev()
                .find(|symbol| g.is_terminal(**symbol))
                .and_then(|t| g.terminal_precedence(*t)),
        }
    }

    // `"LHS -> R1 R2 R3"`
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            write!(f, "{} ->", g.name(self.left))?;
            for symbol in &self.right {
                write!(f, " {}", g.name(*symbol))?;
            }
            Ok(())
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct Precedence {
    pub priority: u16,
    pub assoc: Assoc,
}

impl Precedence {
    pub const fn new(priority: u16, assoc: Assoc) -> Self {
        Self { priority, assoc }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Assoc {
    Left,
    Right,
    Nonassoc,
}

impl fmt::Display for Assoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => write!(f, "left"),
            Self::Right => write!(f, "right"),
            Self::Nonassoc => write!(f, "nonassoc"),
        }
    }
}

/// The grammar definition used to derive the parser tables.
///
/// Production `0` is the augmented start production; its left-hand side is
/// the start symbol of the grammar.
#[derive(Debug)]
pub struct Grammar {
    productions: Vec<Production>,
    terminals: Set<SymbolID>,
    nonterminals: Set<SymbolID>,
    names: Map<SymbolID, String>,
    precedences: Map<SymbolID, Precedence>,
    by_left: Map<SymbolID, Vec<RuleID>>,
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## terminals:")?;
        for &terminal in &self.terminals {
            write!(f, "{} ({})", self.name(terminal), terminal)?;
            if let Some(prec) = self.terminal_precedence(terminal) {
                write!(f, " (priority={}, assoc={})", prec.priority, prec.assoc)?;
            }
            writeln!(f)?;
        }

        writeln!(f, "\n## nonterminals:")?;
        for &nonterminal in &self.nonterminals {
            write!(f, "{} ({})", self.name(nonterminal), nonterminal)?;
            if nonterminal == self.start_symbol() {
                write!(f, " (start)")?;
            }
            writeln!(f)?;
        }

        writeln!(f, "\n## productions:")?;
        for production in &self.productions {
            write!(f, "{}: {}", production.id, production.display(self))?;
            if let Some(prec) = &production.precedence {
                write!(f, " (priority={}, assoc={})", prec.priority, prec.assoc)?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

impl FromStr for Grammar {
    type Err = GrammarError;

    /// Parse a grammar written in the line-oriented `Left -> Right ...` format.
    fn from_str(source: &str) -> Result<Self, Self::Err> {
        crate::syntax::parse(source)
    }
}

impl Grammar {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Grammar, GrammarError> {
        let source = fs::read_to_string(path).map_err(GrammarError::IO)?;
        source.parse()
    }

    /// Define a grammar using the specified function.
    pub fn define<F>(f: F) -> Result<Self, GrammarError>
    where
        F: FnOnce(&mut GrammarDef) -> Result<(), GrammarError>,
    {
        let mut def = GrammarDef {
            productions: vec![],
            terminals: Set::default(),
            nonterminals: Set::default(),
            names: Map::default(),
            precedences: Map::default(),
            start: None,
            next_id: FIRST_NAMED_SYMBOL,
        };
        f(&mut def)?;
        def.end()
    }

    /// Build a grammar from symbol ids chosen by the caller.
    ///
    /// The first production is the augmented start production.
    pub fn from_parts<P, T, N, S>(
        productions: P,
        terminals: T,
        nonterminals: N,
        names: S,
    ) -> Result<Self, GrammarError>
    where
        P: IntoIterator<Item = (SymbolID, Vec<SymbolID>)>,
        T: IntoIterator<Item = SymbolID>,
        N: IntoIterator<Item = SymbolID>,
        S: IntoIterator<Item = (SymbolID, String)>,
    {
        let names: Map<SymbolID, String> = names.into_iter().collect();
        Self::define(|g| {
            for id in terminals {
                g.declare(id, SymbolKind::Terminal, names.get(&id).map(|s| &**s))?;
            }
            for id in nonterminals {
                g.declare(id, SymbolKind::Nonterminal, names.get(&id).map(|s| &**s))?;
            }
            for (left, right) in productions {
                g.rule(left, right)?;
            }
            Ok(())
        })
    }

    pub fn productions(&self) -> &[Production] {
        &self.productions[..]
    }

    pub fn production(&self, id: RuleID) -> &Production {
        &self.productions[id.index()]
    }

    pub fn get_production(&self, id: RuleID) -> Option<&Production> {
        self.productions.get(id.index())
    }

    /// The productions whose left-hand side is `symbol`.
    pub fn productions_of(&self, symbol: SymbolID) -> &[RuleID] {
        self.by_left.get(&symbol).map_or(&[], |rules| &rules[..])
    }

    /// The left-hand side of the augmented start production.
    pub fn start_symbol(&self) -> SymbolID {
        self.productions[RuleID::ACCEPT.index()].left
    }

    pub fn terminals(&self) -> impl Iterator<Item = SymbolID> + '_ {
        self.terminals.iter().copied()
    }

    pub fn nonterminals(&self) -> impl Iterator<Item = SymbolID> + '_ {
        self.nonterminals.iter().copied()
    }

    /// The end-of-input marker counts as a terminal.
    pub fn is_terminal(&self, symbol: SymbolID) -> bool {
        symbol == SymbolID::EOI || self.terminals.contains(&symbol)
    }

    pub fn is_nonterminal(&self, symbol: SymbolID) -> bool {
        self.nonterminals.contains(&symbol)
    }

    pub fn terminal_precedence(&self, symbol: SymbolID) -> Option<Precedence> {
        self.precedences.get(&symbol).copied()
    }

    /// The display name of a symbol.
    pub fn name(&self, symbol: SymbolID) -> Cow<'_, str> {
        match self.names.get(&symbol) {
            Some(name) => Cow::Borrowed(name),
            None => Cow::Owned(default_name(symbol)),
        }
    }

    /// Look up a symbol by its display name.
    pub fn symbol(&self, name: &str) -> Option<SymbolID> {
        self.names
            .iter()
            .find_map(|(id, n)| (n == name).then_some(*id))
    }
}

fn default_name(symbol: SymbolID) -> String {
    match symbol {
        SymbolID::EOI => "$eoi".into(),
        SymbolID::EPSILON => "$epsilon".into(),
        _ => match u32::try_from(symbol.raw()).ok().and_then(char::from_u32) {
            Some(ch) if symbol.raw() <= MAX_LITERAL as i32 => format!("{:?}", ch),
            _ => format!("#{}", symbol.raw()),
        },
    }
}

/// The contextual values for building a `Grammar`.
#[derive(Debug)]
pub struct GrammarDef {
    productions: Vec<Production>,
    terminals: Set<SymbolID>,
    nonterminals: Set<SymbolID>,
    names: Map<SymbolID, String>,
    precedences: Map<SymbolID, Precedence>,
    start: Option<SymbolID>,
    next_id: i32,
}

impl GrammarDef {
    /// Declare a named terminal symbol, assigning the next free id.
    pub fn terminal(&mut self, name: &str) -> Result<SymbolID, GrammarError> {
        let id = self.next_named_id();
        self.declare(id, SymbolKind::Terminal, Some(name))
    }

    /// Declare a nonterminal symbol, assigning the next free id.
    pub fn nonterminal(&mut self, name: &str) -> Result<SymbolID, GrammarError> {
        let id = self.next_named_id();
        self.declare(id, SymbolKind::Nonterminal, Some(name))
    }

    /// Declare (or look up) the terminal whose id is the code of `ch`.
    pub fn literal(&mut self, ch: char) -> Result<SymbolID, GrammarError> {
        if ch == '\0' || ch as u32 > MAX_LITERAL {
            return Err(GrammarError::LiteralOutOfRange(ch));
        }
        let id = SymbolID::from_char(ch);
        if self.terminals.contains(&id) {
            return Ok(id);
        }
        self.declare(id, SymbolKind::Terminal, None)
    }

    /// Declare a symbol with a caller-chosen id.
    pub fn declare(
        &mut self,
        id: SymbolID,
        kind: SymbolKind,
        name: Option<&str>,
    ) -> Result<SymbolID, GrammarError> {
        if id.is_reserved() {
            return Err(GrammarError::ReservedSymbol(id));
        }
        if self.terminals.contains(&id) || self.nonterminals.contains(&id) {
            return Err(GrammarError::DuplicateSymbol(
                self.names.get(&id).cloned().unwrap_or_else(|| default_name(id)),
            ));
        }

        if let Some(name) = name {
            if !verify_name(name) {
                return Err(GrammarError::InvalidName(name.to_owned()));
            }
            if self.names.values().any(|n| n == name) {
                return Err(GrammarError::DuplicateSymbol(name.to_owned()));
            }
            self.names.insert(id, name.to_owned());
        }

        match kind {
            SymbolKind::Terminal => self.terminals.insert(id),
            SymbolKind::Nonterminal => self.nonterminals.insert(id),
        };
        self.next_id = self.next_id.max(id.raw() + 1);

        Ok(id)
    }

    /// Attach a precedence to a terminal symbol.
    pub fn precedence(&mut self, terminal: SymbolID, prec: Precedence) -> Result<(), GrammarError> {
        if !self.terminals.contains(&terminal) {
            return Err(GrammarError::UndefinedSymbol(terminal));
        }
        self.precedences.insert(terminal, prec);
        Ok(())
    }

    pub fn terminal_precedence(&self, terminal: SymbolID) -> Option<Precedence> {
        self.precedences.get(&terminal).copied()
    }

    /// Specify a production rule into this grammar.
    pub fn rule<I>(&mut self, left: SymbolID, right: I) -> Result<(), GrammarError>
    where
        I: IntoIterator<Item = SymbolID>,
    {
        self.rule_with_precedence(left, right, None)
    }

    /// Specify a production rule with an explicit precedence.
    pub fn rule_with_precedence<I>(
        &mut self,
        left: SymbolID,
        right: I,
        precedence: Option<Precedence>,
    ) -> Result<(), GrammarError>
    where
        I: IntoIterator<Item = SymbolID>,
    {
        if !self.nonterminals.contains(&left) {
            return Err(if self.terminals.contains(&left) {
                GrammarError::NotANonterminal(self.name(left))
            } else {
                GrammarError::UndefinedSymbol(left)
            });
        }

        let right: Vec<SymbolID> = right.into_iter().collect();
        for &symbol in &right {
            if symbol.is_reserved() {
                return Err(GrammarError::ReservedSymbol(symbol));
            }
            if !self.terminals.contains(&symbol) && !self.nonterminals.contains(&symbol) {
                return Err(GrammarError::UndefinedSymbol(symbol));
            }
        }

        if self
            .productions
            .iter()
            .any(|p| p.left == left && p.right == right)
        {
            return Err(GrammarError::DuplicateRule(self.name(left)));
        }

        self.productions.push(Production {
            id: RuleID::from_index(self.productions.len()),
            left,
            right,
            precedence,
        });

        Ok(())
    }

    /// Specify the start symbol for this grammar.
    ///
    /// An augmented production `$accept -> start` is inserted in front of
    /// the other productions. Without this call, the first production plays
    /// the role of the augmented start production.
    pub fn start_symbol(&mut self, symbol: SymbolID) -> Result<(), GrammarError> {
        if !self.nonterminals.contains(&symbol) {
            return Err(GrammarError::NotANonterminal(self.name(symbol)));
        }
        self.start.replace(symbol);
        Ok(())
    }

    fn next_named_id(&self) -> SymbolID {
        SymbolID::new(self.next_id)
    }

    fn name(&self, symbol: SymbolID) -> String {
        self.names
            .get(&symbol)
            .cloned()
            .unwrap_or_else(|| default_name(symbol))
    }

    fn end(mut self) -> Result<Grammar, GrammarError> {
        if let Some(start) = self.start.take() {
            let accept = self.next_named_id();
            self.nonterminals.insert(accept);
            self.names.insert(accept, "$accept".into());
            self.productions.insert(
                0,
                Production {
                    id: RuleID::ACCEPT,
                    left: accept,
                    right: vec![start],
                    precedence: None,
                },
            );
            for (i, production) in self.productions.iter_mut().enumerate() {
                production.id = RuleID::from_index(i);
            }
        }

        let start = match self.productions.first() {
            Some(production) => production.left,
            None => return Err(GrammarError::Empty),
        };

        let mut by_left: Map<SymbolID, Vec<RuleID>> = Map::default();
        for production in &self.productions {
            by_left
                .entry(production.left)
                .or_default()
                .push(production.id);
        }

        let start_on_right = self
            .productions
            .iter()
            .any(|p| p.right.contains(&start));
        if start_on_right || by_left[&start].len() != 1 {
            return Err(GrammarError::InvalidStart(self.name(start)));
        }

        for production in &self.productions {
            for symbol in &production.right {
                if self.nonterminals.contains(symbol) && !by_left.contains_key(symbol) {
                    return Err(GrammarError::MissingProduction(self.name(*symbol)));
                }
            }
        }
        for nonterminal in &self.nonterminals {
            if !by_left.contains_key(nonterminal) {
                tracing::warn!(
                    "the nonterminal `{}' has no associated production rule",
                    self.name(*nonterminal)
                );
            }
        }

        Ok(Grammar {
            productions: self.productions,
            terminals: self.terminals,
            nonterminals: self.nonterminals,
            names: self.names,
            precedences: self.precedences,
            by_left,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GrammarError {
    #[error("IO error: {}", _0)]
    IO(io::Error),

    #[error("syntax error at line {}: {}", line, msg)]
    Syntax { line: usize, msg: String },

    #[error("the grammar has no production rules")]
    Empty,

    #[error("undefined symbol {:?}", _0)]
    UndefinedSymbol(SymbolID),

    #[error("reserved symbol {:?} cannot be declared or used in a production", _0)]
    ReservedSymbol(SymbolID),

    #[error("the symbol `{}' has already been declared", _0)]
    DuplicateSymbol(String),

    #[error("duplicate production rule for `{}'", _0)]
    DuplicateRule(String),

    #[error("incorrect symbol name: `{}'", _0)]
    InvalidName(String),

    #[error("the character {:?} cannot be used as a literal terminal", _0)]
    LiteralOutOfRange(char),

    #[error("`{}' is not a nonterminal symbol", _0)]
    NotANonterminal(String),

    #[error("the nonterminal `{}' has no production rule", _0)]
    MissingProduction(String),

    #[error(
        "the start symbol `{}' must have exactly one production and must not appear on any right-hand side",
        _0
    )]
    InvalidStart(String),
}

/// Named symbols are identifiers or quoted operators such as `'=='`.
fn verify_name(s: &str) -> bool {
    if s.len() >= 3 && s.starts_with('\'') && s.ends_with('\'') {
        return !s.chars().any(char::is_whitespace);
    }

    let mut chars = s.chars();
    match chars.next() {
        Some(first) if is_ident_start(first) => chars.all(is_ident_continue),
        _ => false,
    }
}

pub(crate) fn is_ident_start(ch: char) -> bool {
    ch == '_' || unicode_ident::is_xid_start(ch)
}

pub(crate) fn is_ident_continue(ch: char) -> bool {
    unicode_ident::is_xid_continue(ch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_with_explicit_start() {
        let grammar = Grammar::define(|g| {
            let plus = g.literal('+')?;
            let num = g.terminal("NUM")?;
            let expr = g.nonterminal("EXPR")?;
            g.start_symbol(expr)?;
            g.rule(expr, [expr, plus, num])?;
            g.rule(expr, [num])?;
            Ok(())
        })
        .unwrap();

        assert_eq!(grammar.productions().len(), 3);
        assert_eq!(grammar.name(grammar.start_symbol()), "$accept");
        let expr = grammar.symbol("EXPR").unwrap();
        assert_eq!(grammar.production(RuleID::ACCEPT).right(), [expr]);
        assert_eq!(grammar.symbol("NUM"), Some(SymbolID::new(FIRST_NAMED_SYMBOL)));
        assert_eq!(grammar.name(SymbolID::from_char('+')), "'+'");
        assert_eq!(grammar.productions_of(expr), [RuleID::new(1), RuleID::new(2)]);
        assert!(grammar.is_terminal(SymbolID::EOI));
        eprintln!("{}", grammar);
    }

    #[test]
    fn first_production_is_the_start() {
        let grammar = Grammar::define(|g| {
            let x = g.terminal("x")?;
            let s = g.nonterminal("S")?;
            let a = g.nonterminal("A")?;
            g.rule(s, [a])?;
            g.rule(a, [x])?;
            g.rule(a, [])?;
            Ok(())
        })
        .unwrap();
        assert_eq!(grammar.name(grammar.start_symbol()), "S");
        assert_eq!(grammar.productions().len(), 3);
    }

    #[test]
    fn construction_errors() {
        let err = Grammar::define(|_| Ok(())).unwrap_err();
        assert!(matches!(err, GrammarError::Empty));

        let err = Grammar::define(|g| {
            let e = g.nonterminal("E")?;
            g.rule(e, [SymbolID::new(999)])
        })
        .unwrap_err();
        assert!(matches!(err, GrammarError::UndefinedSymbol(s) if s.raw() == 999));

        let err = Grammar::define(|g| {
            let e = g.nonterminal("E")?;
            g.rule(e, [SymbolID::EOI])
        })
        .unwrap_err();
        assert!(matches!(err, GrammarError::ReservedSymbol(SymbolID::EOI)));

        let err = Grammar::define(|g| {
            let x = g.terminal("x")?;
            let e = g.nonterminal("E")?;
            g.rule(e, [e, x])?;
            g.rule(e, [x])
        })
        .unwrap_err();
        assert!(matches!(err, GrammarError::InvalidStart(ref s) if s == "E"));

        let err = Grammar::define(|g| {
            let s = g.nonterminal("S")?;
            let a = g.nonterminal("A")?;
            g.rule(s, [a])
        })
        .unwrap_err();
        assert!(matches!(err, GrammarError::MissingProduction(ref s) if s == "A"));

        let err = Grammar::define(|g| {
            g.terminal("x")?;
            g.terminal("x")?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GrammarError::DuplicateSymbol(..)));

        let err = Grammar::define(|g| g.literal('λ').map(drop)).unwrap_err();
        assert!(matches!(err, GrammarError::LiteralOutOfRange('λ')));

        let err = Grammar::define(|g| g.terminal("1abc").map(drop)).unwrap_err();
        assert!(matches!(err, GrammarError::InvalidName(..)));
    }

    #[test]
    fn from_parts_keeps_caller_ids() {
        let q = SymbolID::new(300);
        let p = SymbolID::new(301);
        let d = SymbolID::new(302);
        let grammar = Grammar::from_parts(
            vec![(q, vec![p]), (p, vec![d]), (p, vec![p, SymbolID::from_char('+'), d])],
            [d, SymbolID::from_char('+')],
            [q, p],
            [(d, "d".to_owned())],
        )
        .unwrap();
        assert_eq!(grammar.start_symbol(), q);
        assert_eq!(grammar.name(d), "d");
        assert_eq!(grammar.name(q), "#300");
        assert!(grammar.is_nonterminal(p));

        let err = Grammar::from_parts(vec![(q, vec![p])], [p], [q, p], []).unwrap_err();
        assert!(matches!(err, GrammarError::DuplicateSymbol(..)));
    }

    #[test]
    fn rule_precedence_falls_back_to_rightmost_terminal() {
        let grammar = Grammar::define(|g| {
            let plus = g.literal('+')?;
            let minus = g.literal('-')?;
            let num = g.terminal("NUM")?;
            let s = g.nonterminal("S")?;
            let e = g.nonterminal("E")?;
            g.precedence(plus, Precedence::new(1, Assoc::Left))?;
            g.precedence(minus, Precedence::new(2, Assoc::Right))?;
            g.rule(s, [e])?;
            g.rule(e, [e, plus, e])?;
            g.rule_with_precedence(e, [minus, e], Some(Precedence::new(3, Assoc::Right)))?;
            g.rule(e, [num])?;
            Ok(())
        })
        .unwrap();
        let precs: Vec<_> = grammar
            .productions()
            .iter()
            .map(|p| p.precedence(&grammar).map(|p| p.priority))
            .collect();
        assert_eq!(precs, [None, Some(1), Some(3), None]);
    }
}
