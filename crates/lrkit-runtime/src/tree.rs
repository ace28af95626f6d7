//! Tokens and parse tree nodes.

use crate::definition::{RuleID, SymbolID};
use std::fmt;

/// The position of a token in the source text.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// An input token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub symbol: SymbolID,
    pub text: String,
    pub location: Location,
}

impl Token {
    pub fn new(symbol: SymbolID, text: impl Into<String>) -> Self {
        Self {
            symbol,
            text: text.into(),
            location: Location::default(),
        }
    }

    /// The end-of-input marker.
    pub fn eoi() -> Self {
        Self::new(SymbolID::EOI, "")
    }

    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.location = Location { line, column };
        self
    }

    pub fn is_eoi(&self) -> bool {
        self.symbol == SymbolID::EOI
    }
}

/// A node of the parse tree, carrying an attribute of type `A`.
///
/// Leaves are built from shifted tokens and interior nodes from reductions.
#[derive(Debug, Clone, PartialEq)]
pub struct Node<A> {
    symbol: SymbolID,
    rule: Option<RuleID>,
    children: Vec<Node<A>>,
    text: Option<String>,
    pub attr: A,
}

impl<A: Default> Node<A> {
    pub fn leaf(symbol: SymbolID, text: impl Into<String>) -> Self {
        Self {
            symbol,
            rule: None,
            children: vec![],
            text: Some(text.into()),
            attr: A::default(),
        }
    }

    pub fn interior(symbol: SymbolID, rule: RuleID, children: Vec<Node<A>>) -> Self {
        Self {
            symbol,
            rule: Some(rule),
            children,
            text: None,
            attr: A::default(),
        }
    }
}

impl<A> Node<A> {
    pub fn symbol(&self) -> SymbolID {
        self.symbol
    }

    /// The production this node was reduced by, or `None` for a leaf.
    pub fn rule(&self) -> Option<RuleID> {
        self.rule
    }

    pub fn is_leaf(&self) -> bool {
        self.rule.is_none()
    }

    pub fn children(&self) -> &[Node<A>] {
        &self.children[..]
    }

    pub fn children_mut(&mut self) -> &mut [Node<A>] {
        &mut self.children[..]
    }

    pub fn into_children(mut self) -> Vec<Node<A>> {
        std::mem::take(&mut self.children)
    }

    /// The literal text of a leaf.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Iterate over the leaves of this subtree from left to right.
    pub fn leaves(&self) -> Leaves<'_, A> {
        Leaves { stack: vec![self] }
    }

    /// Visit the nodes of this subtree in pre-order, along with their depth.
    pub fn walk<F>(&self, f: &mut F)
    where
        F: FnMut(&Node<A>, usize),
    {
        let mut stack = vec![(self, 0)];
        while let Some((node, depth)) = stack.pop() {
            f(node, depth);
            stack.extend(node.children.iter().rev().map(|child| (child, depth + 1)));
        }
    }
}

// Left-recursive lists produce trees as deep as the input is long, so the
// subtrees are released from a worklist instead of recursively.
impl<A> Drop for Node<A> {
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.children);
        while let Some(mut node) = stack.pop() {
            stack.append(&mut node.children);
        }
    }
}

impl<A> fmt::Display for Node<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut res = Ok(());
        self.walk(&mut |node, depth| {
            if res.is_err() {
                return;
            }
            res = match (node.rule, node.text()) {
                (Some(rule), _) => {
                    writeln!(f, "{:indent$}{} (rule {})", "", node.symbol, rule, indent = depth * 2)
                }
                (None, text) => writeln!(
                    f,
                    "{:indent$}{} {:?}",
                    "",
                    node.symbol,
                    text.unwrap_or_default(),
                    indent = depth * 2
                ),
            };
        });
        res
    }
}

#[derive(Debug)]
pub struct Leaves<'n, A> {
    stack: Vec<&'n Node<A>>,
}

impl<'n, A> Iterator for Leaves<'n, A> {
    type Item = &'n Node<A>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.stack.pop() {
            if node.is_leaf() {
                return Some(node);
            }
            self.stack.extend(node.children.iter().rev());
        }
        None
    }
}

/// Client callbacks invoked by the parser.
///
/// All methods default to doing nothing.
pub trait Hooks<A> {
    /// Called after a leaf has been built from a shifted token.
    fn on_shift(&mut self, _node: &mut Node<A>, _token: &Token) {}

    /// Called after an interior node has been built. The reduced symbols are
    /// available as the node's children.
    fn on_reduce(&mut self, _node: &mut Node<A>) {}

    /// Called once with the root of the tree when the input is accepted.
    fn on_accept(&mut self, _root: &mut Node<A>) {}

    fn on_error(&mut self, _error: &crate::parser::SyntaxError) {}
}

impl<A> Hooks<A> for () {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaves_are_in_order() {
        let a = Node::<()>::leaf(SymbolID::new(300), "a");
        let b = Node::<()>::leaf(SymbolID::new(301), "b");
        let c = Node::<()>::leaf(SymbolID::new(302), "c");
        let inner = Node::interior(SymbolID::new(400), RuleID::new(2), vec![b, c]);
        let root = Node::interior(SymbolID::new(401), RuleID::new(1), vec![a, inner]);

        let texts: Vec<_> = root.leaves().filter_map(|n| n.text()).collect();
        assert_eq!(texts, ["a", "b", "c"]);
        assert!(!root.is_leaf());
        assert_eq!(root.children().len(), 2);
    }

    #[test]
    fn walk_is_preorder_with_depth() {
        let a = Node::<()>::leaf(SymbolID::new(300), "a");
        let b = Node::<()>::leaf(SymbolID::new(301), "b");
        let inner = Node::interior(SymbolID::new(400), RuleID::new(2), vec![a]);
        let root = Node::interior(SymbolID::new(401), RuleID::new(1), vec![inner, b]);

        let mut visited = vec![];
        root.walk(&mut |node, depth| visited.push((node.symbol().raw(), depth)));
        assert_eq!(visited, [(401, 0), (400, 1), (300, 2), (301, 1)]);

        let children = root.into_children();
        assert_eq!(children.len(), 2);
        assert_eq!(children[1].text(), Some("b"));
    }

    #[test]
    fn deep_chains_are_dropped_without_recursion() {
        let mut node = Node::<()>::leaf(SymbolID::new(300), "x");
        for _ in 0..1_000_000 {
            node = Node::interior(SymbolID::new(400), RuleID::new(1), vec![node]);
        }
        let mut depth = 0;
        node.walk(&mut |_, d| depth = depth.max(d));
        assert_eq!(depth, 1_000_000);
        drop(node);
    }

    #[test]
    fn display_indents_children() {
        let leaf = Node::<()>::leaf(SymbolID::new(300), "x");
        let root = Node::interior(SymbolID::new(400), RuleID::new(3), vec![leaf]);
        assert_eq!(root.to_string(), "400 (rule 3)\n  300 \"x\"\n");
    }
}
