//! Finite automata and LR(1)/LALR(1) parse table generation.

pub mod automaton;
pub mod first_follow;
pub mod grammar;
pub mod lalr;
pub mod lr1;
pub mod table;
pub mod types;
pub mod util;

mod syntax;

pub use crate::{
    grammar::{Grammar, GrammarError},
    table::{ActionTable, Config, TableError},
};
pub use lrkit_runtime as runtime;
