//! Parse table definition.

use std::fmt;

/// The identifier of a grammar symbol.
///
/// Terminals and nonterminals share one numeric namespace.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct SymbolID {
    raw: i32,
}

impl SymbolID {
    /// Reserved symbol used as a terminal symbol that means the end of input.
    pub const EOI: Self = Self::new(-1);

    /// Reserved symbol that labels empty transitions in automata and marks
    /// nullable entries in FIRST sets.
    pub const EPSILON: Self = Self::new(0);

    #[inline]
    pub const fn new(raw: i32) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn raw(self) -> i32 {
        self.raw
    }

    /// Return the symbol corresponding to a single character.
    #[inline]
    pub const fn from_char(ch: char) -> Self {
        Self::new(ch as i32)
    }

    pub const fn is_reserved(self) -> bool {
        self.raw == Self::EOI.raw || self.raw == Self::EPSILON.raw
    }
}

impl fmt::Debug for SymbolID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::EOI => f.write_str("$eoi"),
            Self::EPSILON => f.write_str("$epsilon"),
            _ => write!(f, "S#{}", self.raw),
        }
    }
}

impl fmt::Display for SymbolID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.raw, f)
    }
}

/// The number to identify the state of LR automaton.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct StateID {
    raw: u32,
}

impl StateID {
    pub const START: Self = Self::new(0);

    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn from_index(index: usize) -> Self {
        Self::new(index as u32)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.raw as usize
    }
}

impl fmt::Debug for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02}", self.raw)
    }
}

impl fmt::Display for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.raw)
    }
}

/// The index of a production rule in grammar.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct RuleID {
    raw: u32,
}

impl RuleID {
    /// The augmented start production.
    pub const ACCEPT: Self = Self::new(0);

    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn from_index(index: usize) -> Self {
        Self::new(index as u32)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.raw as usize
    }
}

impl fmt::Debug for RuleID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P#{:03}", self.raw)
    }
}

impl fmt::Display for RuleID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.raw, f)
    }
}

/// The action that the LR automaton in a state performs on a particular symbol.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    /// Read a lookahead terminal and transition to the specified state.
    Shift(StateID),

    /// Reduce to the specified production rule.
    Reduce(RuleID),

    /// Transition after a reduction to the specified nonterminal.
    Goto(StateID),

    Accept,
}

/// The discriminant of [`Action`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Shift,
    Reduce,
    Goto,
    Accept,
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Shift(..) => ActionKind::Shift,
            Self::Reduce(..) => ActionKind::Reduce,
            Self::Goto(..) => ActionKind::Goto,
            Self::Accept => ActionKind::Accept,
        }
    }

    /// The next state for `Shift`/`Goto`, the production index for `Reduce`.
    pub fn target(&self) -> Option<usize> {
        match self {
            Self::Shift(n) | Self::Goto(n) => Some(n.index()),
            Self::Reduce(r) => Some(r.index()),
            Self::Accept => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shift(n) => write!(f, "shift({})", n),
            Self::Reduce(r) => write!(f, "reduce({})", r),
            Self::Goto(n) => write!(f, "goto({})", n),
            Self::Accept => f.write_str("accept"),
        }
    }
}

/// The shape of a production rule required to perform a reduction.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RuleShape {
    /// The left-hand side of the production.
    pub left: SymbolID,
    /// The number of symbols on the right-hand side.
    pub len: usize,
}

/// The trait for abstracting the generated LR parse table.
pub trait ParseTable {
    /// Return the initial state number.
    fn initial_state(&self) -> StateID {
        StateID::START
    }

    /// Return the action corresponding to the specified state number and
    /// symbol, or `None` if the pair has no entry.
    fn action(&self, current: StateID, symbol: SymbolID) -> Option<Action>;

    /// Return the shape of the specified production rule.
    fn rule(&self, rule: RuleID) -> Option<RuleShape>;

    /// Return the terminals that have an entry in the specified state.
    fn expected(&self, _current: StateID) -> Vec<SymbolID> {
        vec![]
    }
}

impl<T: ?Sized> ParseTable for &T
where
    T: ParseTable,
{
    fn initial_state(&self) -> StateID {
        (**self).initial_state()
    }

    fn action(&self, current: StateID, symbol: SymbolID) -> Option<Action> {
        (**self).action(current, symbol)
    }

    fn rule(&self, rule: RuleID) -> Option<RuleShape> {
        (**self).rule(rule)
    }

    fn expected(&self, current: StateID) -> Vec<SymbolID> {
        (**self).expected(current)
    }
}

impl<T: ?Sized> ParseTable for std::rc::Rc<T>
where
    T: ParseTable,
{
    fn initial_state(&self) -> StateID {
        (**self).initial_state()
    }

    fn action(&self, current: StateID, symbol: SymbolID) -> Option<Action> {
        (**self).action(current, symbol)
    }

    fn rule(&self, rule: RuleID) -> Option<RuleShape> {
        (**self).rule(rule)
    }

    fn expected(&self, current: StateID) -> Vec<SymbolID> {
        (**self).expected(current)
    }
}

impl<T: ?Sized> ParseTable for std::sync::Arc<T>
where
    T: ParseTable,
{
    fn initial_state(&self) -> StateID {
        (**self).initial_state()
    }

    fn action(&self, current: StateID, symbol: SymbolID) -> Option<Action> {
        (**self).action(current, symbol)
    }

    fn rule(&self, rule: RuleID) -> Option<RuleShape> {
        (**self).rule(rule)
    }

    fn expected(&self, current: StateID) -> Vec<SymbolID> {
        (**self).expected(current)
    }
}
