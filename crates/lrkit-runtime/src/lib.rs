//! Runtime implementation for the `lrkit` LR parser generator.

pub mod definition;
pub mod parser;
pub mod tree;

pub use crate::{
    definition::{Action, ActionKind, ParseTable, RuleID, RuleShape, StateID, SymbolID},
    parser::{ParseError, Parser, Status, SyntaxError},
    tree::{Hooks, Location, Node, Token},
};
