//! Declaration and statement binding for the cmc compiler.
//!
//! Runs after the declaration pass of `cmc-symbols`:
//!
//! - **Declaration binder**: completes every function symbol (parameter and
//!   return types, specifier rules, special-member classification) and every
//!   class (bases, vtable, implicit special members)
//! - **Checks**: return-path completeness and signature accessibility
//! - **Statement binder**: turns function bodies into the bound tree, with
//!   synthesized bodies for compiler-generated and `default` members

pub mod access_levels;
pub mod binder;
pub mod bound_tree;
pub mod class_binder;
pub mod const_eval;
pub mod declaration_binder;
pub mod return_paths;
pub mod special_members;
pub mod statement_binders;
pub mod synthesis;

mod specifier_rules;

pub use access_levels::{check_function_access_levels, effective_access};
pub use binder::Binder;
pub use bound_tree::{
    BoundClass, BoundCompileUnit, BoundExpression, BoundExpressionKind, BoundFunction, BoundNode,
    BoundStatement, BoundStatementKind,
};
pub use class_binder::complete_class;
pub use const_eval::ConstantEvaluator;
pub use declaration_binder::{bind_declarations, complete_bind_function};
pub use return_paths::{check_function_return_paths, terminates_function};
pub use special_members::special_member_kind;
pub use statement_binders::{KindBinder, StatementBindCallbacks, StatementBinder};
pub use synthesis::generate_synthesized_function_implementation;

#[cfg(test)]
#[path = "../tests/test_support.rs"]
mod test_support;

#[cfg(test)]
#[path = "../tests/declaration_binder_tests.rs"]
mod declaration_binder_tests;

#[cfg(test)]
#[path = "../tests/class_binder_tests.rs"]
mod class_binder_tests;

#[cfg(test)]
#[path = "../tests/return_paths_tests.rs"]
mod return_paths_tests;

#[cfg(test)]
#[path = "../tests/binder_tests.rs"]
mod binder_tests;
