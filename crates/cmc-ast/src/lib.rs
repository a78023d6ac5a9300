//! AST node interface consumed by the cmc binder.
//!
//! Parsing happens elsewhere; this crate only fixes the shape the binder
//! reads: every node carries a kind tag, a span and a parent index, plus
//! kind-specific data reachable through the `get_*` accessors of
//! [`NodeArena`]. The `add_*` builders are used by drivers and tests to
//! assemble trees without a parser.

pub mod base;
pub use base::NodeIndex;

pub mod node;
pub use node::*;

mod node_access;
mod node_arena;

#[cfg(test)]
#[path = "../tests/ast_tests.rs"]
mod ast_tests;
