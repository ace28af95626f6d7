//! The implementation of the table-driven shift/reduce parser engine.

use crate::{
    definition::{Action, ParseTable, RuleID, StateID, SymbolID},
    tree::{Hooks, Node, Token},
};
use std::{collections::VecDeque, fmt};

/// The default number of recently consumed tokens kept for diagnostics.
pub const DEFAULT_HISTORY_LIMIT: usize = 8;

/// The instance of LR parser engine that drives incrementally, based on a parse table.
///
/// A parser holds the per-session state only; the table itself is never
/// mutated, so independent sessions may share it through `&T`, `Rc<T>` or `Arc<T>`.
pub struct Parser<T, A>
where
    T: ParseTable,
{
    table: T,
    state_stack: Vec<StateID>,
    node_stack: Vec<Node<A>>,
    history: VecDeque<Token>,
    history_limit: usize,
    accepted: bool,
}

impl<T, A> fmt::Debug for Parser<T, A>
where
    T: ParseTable + fmt::Debug,
    A: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser")
            .field("table", &self.table)
            .field("state_stack", &self.state_stack)
            .field("node_stack", &self.node_stack)
            .field("accepted", &self.accepted)
            .finish_non_exhaustive()
    }
}

/// The result of offering a token to the parser.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Status {
    /// The token has been shifted and the parser waits for the next one.
    InputNeeded,

    /// The input has been accepted; the root can be taken by [`Parser::take_root`].
    Accepted,
}

impl<T, A> Parser<T, A>
where
    T: ParseTable,
    A: Default,
{
    /// Create a parser session using the specified parse table.
    pub fn new(table: T) -> Self {
        let initial_state = table.initial_state();
        Self {
            table,
            state_stack: vec![initial_state],
            node_stack: vec![],
            history: VecDeque::new(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            accepted: false,
        }
    }

    /// Set the number of recently consumed tokens reported with syntax errors.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Discard all per-session state so that the parser can be reused for
    /// an independent input.
    pub fn reset(&mut self) {
        self.state_stack.clear();
        self.state_stack.push(self.table.initial_state());
        self.node_stack.clear();
        self.history.clear();
        self.accepted = false;
    }

    pub fn table(&self) -> &T {
        &self.table
    }

    pub fn state_stack(&self) -> &[StateID] {
        &self.state_stack[..]
    }

    pub fn node_stack(&self) -> &[Node<A>] {
        &self.node_stack[..]
    }

    pub fn is_accepted(&self) -> bool {
        self.accepted
    }

    /// Take the root of the parse tree after acceptance.
    pub fn take_root(&mut self) -> Option<Node<A>> {
        if !self.accepted || self.node_stack.len() != 1 {
            return None;
        }
        self.node_stack.pop()
    }

    /// Offer a token and drive the automaton until the token has been
    /// shifted, the input has been accepted or an error occurs.
    ///
    /// The reductions triggered by the token are only performed once it is
    /// known that the token will be shifted or accepted. On a syntax error
    /// both stacks are left untouched, so the caller may inspect the session
    /// and either retry with another token or [`reset`](Self::reset) it.
    pub fn feed<H>(&mut self, token: Token, hooks: &mut H) -> Result<Status, ParseError>
    where
        H: Hooks<A> + ?Sized,
    {
        if self.accepted {
            return Err(ParseError::AlreadyAccepted);
        }

        let current = self.current_state()?;
        if !self.viable(token.symbol)? {
            let mut expected = vec![];
            for symbol in self.table.expected(current) {
                if self.viable(symbol)? {
                    expected.push(symbol);
                }
            }
            let error = SyntaxError {
                state: current,
                expected,
                recent: self.history.iter().cloned().collect(),
                token,
            };
            tracing::debug!("{}", error);
            hooks.on_error(&error);
            return Err(ParseError::Syntax(error));
        }

        loop {
            let current = self.current_state()?;
            match self.table.action(current, token.symbol) {
                Some(Action::Shift(next)) => {
                    tracing::trace!("shift {:?} -> {:?}", token.symbol, next);
                    self.shift(next, token, hooks);
                    return Ok(Status::InputNeeded);
                }

                Some(Action::Reduce(rule)) => self.reduce(rule, hooks)?,

                Some(Action::Accept) => {
                    tracing::trace!("accept");
                    self.accept(hooks)?;
                    self.remember(token);
                    return Ok(Status::Accepted);
                }

                Some(Action::Goto(..)) | None => {
                    return Err(ParseError::MissingGoto {
                        state: current,
                        symbol: token.symbol,
                    })
                }
            }
        }
    }

    /// Consume a whole token sequence, which must contain the end-of-input
    /// marker, and return the root of the parse tree.
    pub fn parse<I, H>(&mut self, tokens: I, hooks: &mut H) -> Result<Node<A>, ParseError>
    where
        I: IntoIterator<Item = Token>,
        H: Hooks<A> + ?Sized,
    {
        for token in tokens {
            if let Status::Accepted = self.feed(token, hooks)? {
                return self.take_root().ok_or(ParseError::StackUnderflow);
            }
        }
        Err(ParseError::IncompleteInput)
    }

    fn current_state(&self) -> Result<StateID, ParseError> {
        self.state_stack
            .last()
            .copied()
            .ok_or(ParseError::StackUnderflow)
    }

    fn shift<H>(&mut self, next: StateID, token: Token, hooks: &mut H)
    where
        H: Hooks<A> + ?Sized,
    {
        let mut node = Node::leaf(token.symbol, token.text.clone());
        hooks.on_shift(&mut node, &token);
        self.state_stack.push(next);
        self.node_stack.push(node);
        self.remember(token);
    }

    /// Whether `symbol` would end up shifted or accepted after the reductions
    /// it triggers, computed on a copy of the top of the state stack.
    fn viable(&self, symbol: SymbolID) -> Result<bool, ParseError> {
        // The untouched prefix of the state stack and the states pushed on top of it.
        let mut depth = self.state_stack.len();
        let mut pushed: Vec<StateID> = vec![];
        loop {
            let current = match pushed.last() {
                Some(state) => *state,
                None => depth
                    .checked_sub(1)
                    .map(|top| self.state_stack[top])
                    .ok_or(ParseError::StackUnderflow)?,
            };
            match self.table.action(current, symbol) {
                Some(Action::Shift(..)) | Some(Action::Accept) => return Ok(true),
                Some(Action::Goto(..)) | None => return Ok(false),
                Some(Action::Reduce(rule)) => {
                    let shape = self
                        .table
                        .rule(rule)
                        .ok_or(ParseError::UnknownRule(rule))?;
                    let from_pushed = shape.len.min(pushed.len());
                    pushed.truncate(pushed.len() - from_pushed);
                    let rest = shape.len - from_pushed;
                    if rest >= depth {
                        return Err(ParseError::StackUnderflow);
                    }
                    depth -= rest;

                    let top = match pushed.last() {
                        Some(state) => *state,
                        None => self.state_stack[depth - 1],
                    };
                    match self.table.action(top, shape.left) {
                        Some(Action::Goto(next)) => pushed.push(next),
                        _ => {
                            return Err(ParseError::MissingGoto {
                                state: top,
                                symbol: shape.left,
                            })
                        }
                    }
                }
            }
        }
    }

    /// Leave the root of the tree as the only node on the stack.
    ///
    /// A start production with a single symbol on its right-hand side already
    /// has its root in place; otherwise the remaining nodes are folded into a
    /// node of the start production.
    fn accept<H>(&mut self, hooks: &mut H) -> Result<(), ParseError>
    where
        H: Hooks<A> + ?Sized,
    {
        let shape = self
            .table
            .rule(RuleID::ACCEPT)
            .ok_or(ParseError::UnknownRule(RuleID::ACCEPT))?;
        if shape.len != 1 || self.node_stack.len() != 1 {
            if shape.len != self.node_stack.len() {
                return Err(ParseError::StackUnderflow);
            }
            let children = std::mem::take(&mut self.node_stack);
            let mut node = Node::interior(shape.left, RuleID::ACCEPT, children);
            hooks.on_reduce(&mut node);
            self.node_stack.push(node);
        }

        self.accepted = true;
        if let Some(root) = self.node_stack.last_mut() {
            hooks.on_accept(root);
        }
        Ok(())
    }

    fn reduce<H>(&mut self, rule: RuleID, hooks: &mut H) -> Result<(), ParseError>
    where
        H: Hooks<A> + ?Sized,
    {
        let shape = self
            .table
            .rule(rule)
            .ok_or(ParseError::UnknownRule(rule))?;
        if shape.len > self.node_stack.len() || shape.len >= self.state_stack.len() {
            return Err(ParseError::StackUnderflow);
        }

        let children = self.node_stack.split_off(self.node_stack.len() - shape.len);
        self.state_stack
            .truncate(self.state_stack.len() - shape.len);

        let current = self.current_state()?;
        let next = match self.table.action(current, shape.left) {
            Some(Action::Goto(next)) => next,
            _ => {
                return Err(ParseError::MissingGoto {
                    state: current,
                    symbol: shape.left,
                })
            }
        };
        tracing::trace!("reduce {:?} ({:?}) -> goto {:?}", rule, shape.left, next);
        self.state_stack.push(next);

        let mut node = Node::interior(shape.left, rule, children);
        hooks.on_reduce(&mut node);
        self.node_stack.push(node);

        Ok(())
    }

    fn remember(&mut self, token: Token) {
        if self.history_limit == 0 {
            return;
        }
        while self.history.len() >= self.history_limit {
            self.history.pop_front();
        }
        self.history.push_back(token);
    }
}

/// No table entry for the current state and lookahead token.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("unexpected token {:?} ({:?}) at {} in state {}", token.symbol, token.text, token.location, state)]
pub struct SyntaxError {
    /// The state on top of the stack when the error was detected.
    pub state: StateID,
    /// The offending token.
    pub token: Token,
    /// The terminals that have an entry in `state`.
    pub expected: Vec<SymbolID>,
    /// The most recently consumed tokens, oldest first.
    pub recent: Vec<Token>,
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("syntax error: {}", _0)]
    Syntax(SyntaxError),

    #[error("already accepted")]
    AlreadyAccepted,

    #[error("no goto entry for {:?} in state {}", symbol, state)]
    MissingGoto { state: StateID, symbol: SymbolID },

    #[error("unknown production rule {:?}", _0)]
    UnknownRule(RuleID),

    #[error("stack underflow")]
    StackUnderflow,

    #[error("the input ended before it was accepted")]
    IncompleteInput,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::RuleShape;
    use std::collections::HashMap;

    const LIST: SymbolID = SymbolID::new(300);
    const START: SymbolID = SymbolID::new(301);
    const A: SymbolID = SymbolID::from_char('a');

    // START -> LIST
    // LIST  -> LIST 'a'
    // LIST  -> 'a'
    struct Table {
        actions: HashMap<(StateID, SymbolID), Action>,
        rules: Vec<RuleShape>,
    }

    fn table() -> Table {
        let s = StateID::new;
        let mut actions = HashMap::new();
        actions.insert((s(0), A), Action::Shift(s(2)));
        actions.insert((s(0), LIST), Action::Goto(s(1)));
        actions.insert((s(1), A), Action::Shift(s(3)));
        actions.insert((s(1), SymbolID::EOI), Action::Accept);
        actions.insert((s(2), A), Action::Reduce(RuleID::new(2)));
        actions.insert((s(2), SymbolID::EOI), Action::Reduce(RuleID::new(2)));
        actions.insert((s(3), A), Action::Reduce(RuleID::new(1)));
        actions.insert((s(3), SymbolID::EOI), Action::Reduce(RuleID::new(1)));
        Table {
            actions,
            rules: vec![
                RuleShape { left: START, len: 1 },
                RuleShape { left: LIST, len: 2 },
                RuleShape { left: LIST, len: 1 },
            ],
        }
    }

    impl ParseTable for Table {
        fn action(&self, current: StateID, symbol: SymbolID) -> Option<Action> {
            self.actions.get(&(current, symbol)).copied()
        }

        fn rule(&self, rule: RuleID) -> Option<RuleShape> {
            self.rules.get(rule.index()).copied()
        }
    }

    fn tokens(s: &str) -> Vec<Token> {
        s.chars()
            .map(|ch| Token::new(SymbolID::from_char(ch), ch.to_string()))
            .chain(Some(Token::eoi()))
            .collect()
    }

    #[derive(Default)]
    struct Counter;
    impl Hooks<usize> for Counter {
        fn on_shift(&mut self, node: &mut Node<usize>, _: &Token) {
            node.attr = 1;
        }
        fn on_reduce(&mut self, node: &mut Node<usize>) {
            node.attr = node.children().iter().map(|c| c.attr).sum();
        }
    }

    #[test]
    fn batch_parse_builds_left_recursive_tree() {
        let table = table();
        let mut parser = Parser::<_, usize>::new(&table);
        let root = parser.parse(tokens("aaa"), &mut Counter).unwrap();
        assert_eq!(root.symbol(), LIST);
        assert_eq!(root.attr, 3);
        assert_eq!(root.leaves().count(), 3);
        assert_eq!(root.children()[0].children()[0].rule(), Some(RuleID::new(2)));
    }

    #[test]
    fn long_lists_are_parsed_and_dropped() {
        let table = table();
        let mut parser = Parser::<_, usize>::new(&table);
        let n = 300_000;
        let root = parser.parse(tokens(&"a".repeat(n)), &mut Counter).unwrap();
        assert_eq!(root.attr, n);

        let mut nodes = 0;
        let mut depth = 0;
        root.walk(&mut |_, d| {
            nodes += 1;
            depth = depth.max(d);
        });
        assert_eq!(nodes, 2 * n);
        assert_eq!(depth, n);
        drop(root);
    }

    #[test]
    fn streaming_matches_batch() {
        let table = table();
        let mut batch = Parser::<_, usize>::new(&table);
        let expected = batch.parse(tokens("aa"), &mut Counter).unwrap();

        let mut streaming = Parser::<_, usize>::new(&table);
        let mut toks = tokens("aa").into_iter();
        assert_eq!(
            streaming.feed(toks.next().unwrap(), &mut Counter).unwrap(),
            Status::InputNeeded
        );
        assert_eq!(
            streaming.feed(toks.next().unwrap(), &mut Counter).unwrap(),
            Status::InputNeeded
        );
        assert_eq!(
            streaming.feed(toks.next().unwrap(), &mut Counter).unwrap(),
            Status::Accepted
        );
        assert_eq!(streaming.take_root().unwrap(), expected);
    }

    #[test]
    fn syntax_error_keeps_session_reusable() {
        let table = table();
        let mut parser = Parser::<_, ()>::new(&table).with_history_limit(2);
        for token in tokens("aaa").into_iter().take(3) {
            parser.feed(token, &mut ()).unwrap();
        }
        let err = parser
            .feed(Token::new(SymbolID::from_char('b'), "b").at(1, 4), &mut ())
            .unwrap_err();
        match err {
            ParseError::Syntax(err) => {
                assert_eq!(err.token.text, "b");
                assert_eq!(err.recent.len(), 2);
                assert!(err.expected.is_empty());
            }
            err => panic!("unexpected error: {}", err),
        }

        // retry with a corrected token.
        assert_eq!(parser.feed(Token::eoi(), &mut ()).unwrap(), Status::Accepted);
        assert!(matches!(
            parser.feed(Token::eoi(), &mut ()),
            Err(ParseError::AlreadyAccepted)
        ));

        parser.reset();
        assert_eq!(parser.state_stack(), [StateID::START]);
        assert!(parser.node_stack().is_empty());
        assert!(!parser.is_accepted());
    }

    #[test]
    fn empty_input_is_rejected() {
        let table = table();
        let mut parser = Parser::<_, ()>::new(&table);
        assert!(matches!(
            parser.parse(vec![Token::eoi()], &mut ()),
            Err(ParseError::Syntax(..))
        ));
    }

    #[test]
    fn missing_end_marker_is_incomplete() {
        let table = table();
        let mut parser = Parser::<_, ()>::new(&table);
        let input = vec![Token::new(A, "a")];
        assert!(matches!(
            parser.parse(input, &mut ()),
            Err(ParseError::IncompleteInput)
        ));
    }
}
