//! Centralized limits and thresholds for the binder.
//!
//! Binding is a single synchronous pass with no cancellation, so every
//! recursive or iterative walk that could run away on malformed input is
//! bounded here. Exceeding a limit is reported as an internal error.

// =============================================================================
// Iteration Limits
// =============================================================================

/// Maximum number of parent links followed in one scope walk.
///
/// Scope parent chains mirror lexical nesting, so real programs stay far
/// below this. A cycle in the chain means a scope was wired to itself.
pub const MAX_SCOPE_WALK_ITERATIONS: usize = 10_000;

/// Maximum number of AST parent links followed by `get_container_scope`.
pub const MAX_NODE_PARENT_WALK: usize = 100_000;

/// Maximum depth of a base-class chain.
///
/// Guards vtable initialisation and base lookups against inheritance cycles
/// that slipped past base-class resolution.
pub const MAX_BASE_CLASS_DEPTH: usize = 256;

// =============================================================================
// Recursion Depth Limits
// =============================================================================

/// Maximum recursion depth for constant-expression evaluation.
///
/// Constants may refer to other constants; a self-referential constant would
/// otherwise recurse forever.
pub const MAX_CONST_EVAL_DEPTH: u32 = 64;

/// Maximum statement nesting examined by the termination check.
pub const MAX_TERMINATION_DEPTH: u32 = 1_000;

/// Maximum nesting of type expressions and typedef indirections.
///
/// A typedef that names itself, directly or through other typedefs, stops
/// here instead of recursing forever.
pub const MAX_TYPE_RESOLUTION_DEPTH: u32 = 64;

/// Maximum nesting of class template instantiations.
pub const MAX_INSTANTIATION_DEPTH: u32 = 64;
