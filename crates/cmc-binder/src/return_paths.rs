//! Return-path completeness for non-void functions.
//!
//! A conservative check: a statement list terminates as soon as one of its
//! statements does, so statements after a terminating one are never looked
//! at. Loops terminate only when their condition is the constant `true`.

use crate::const_eval::ConstantEvaluator;
use cmc_ast::{NodeArena, NodeData, NodeIndex};
use cmc_common::{CompileError, CompileResult, limits};
use cmc_symbols::{FunctionFlags, SymbolId, SymbolTable};
use tracing::debug;

/// Fail unless every control path through the body of `function` ends in a
/// return or throw statement. Void and bodiless functions always pass.
pub fn check_function_return_paths(
    table: &SymbolTable,
    arena: &NodeArena,
    function: SymbolId,
) -> CompileResult<()> {
    let data = table.function_data(function)?;
    if data.is_void() || !data.has(FunctionFlags::HAS_BODY) {
        return Ok(());
    }
    let node = table.node_for_symbol(function);
    let body = arena
        .get(node)
        .and_then(|n| arena.get_function(n))
        .map(|f| f.body)
        .ok_or_else(|| {
            CompileError::internal(format!(
                "function '{}' has no declaration node",
                table.full_name(function)
            ))
        })?;
    let checker = ReturnPathChecker {
        arena,
        evaluator: ConstantEvaluator::new(arena, table),
        table,
    };
    if checker.terminates_function(body, false, 0)? {
        return Ok(());
    }
    debug!(function = %table.full_name(function), "missing return path");
    Err(CompileError::control_flow(
        "not all control paths terminate in return statement or throw statement",
        table.symbol(function)?.span,
    ))
}

/// Does `statement` provably end the function on every path?
pub fn terminates_function(
    table: &SymbolTable,
    arena: &NodeArena,
    statement: NodeIndex,
) -> CompileResult<bool> {
    let checker = ReturnPathChecker {
        arena,
        evaluator: ConstantEvaluator::new(arena, table),
        table,
    };
    checker.terminates_function(statement, false, 0)
}

struct ReturnPathChecker<'a> {
    arena: &'a NodeArena,
    evaluator: ConstantEvaluator<'a>,
    table: &'a SymbolTable,
}

impl ReturnPathChecker<'_> {
    // =========================================================================
    // Statement Analysis
    // =========================================================================

    fn terminates_function(
        &self,
        statement: NodeIndex,
        in_forever_loop: bool,
        depth: u32,
    ) -> CompileResult<bool> {
        if depth > limits::MAX_TERMINATION_DEPTH {
            return Err(CompileError::internal(format!(
                "statement nesting deeper than {}",
                limits::MAX_TERMINATION_DEPTH
            )));
        }
        let Some(node) = self.arena.get(statement) else {
            return Ok(false);
        };
        let depth = depth + 1;
        match &node.data {
            NodeData::Block(block) => self.any_terminates(&block.statements, in_forever_loop, depth),
            NodeData::Clause(clause) => {
                self.any_terminates(&clause.statements, in_forever_loop, depth)
            }
            NodeData::If(data) => {
                let then_terminates =
                    self.terminates_function(data.then_statement, in_forever_loop, depth)?;
                if in_forever_loop && then_terminates {
                    return Ok(true);
                }
                Ok(then_terminates
                    && data.else_statement.is_some()
                    && self.terminates_function(data.else_statement, in_forever_loop, depth)?)
            }
            NodeData::Switch(data) => {
                if data.default.is_none() {
                    return Ok(false);
                }
                for &case in &data.cases {
                    if !self.terminates_function(case, in_forever_loop, depth)? {
                        return Ok(false);
                    }
                }
                self.terminates_function(data.default, in_forever_loop, depth)
            }
            NodeData::Loop(data) => {
                Ok(self.is_always_true(data.condition)?
                    && self.terminates_function(data.body, true, depth)?)
            }
            NodeData::For(data) => {
                let forever = data.condition.is_none() || self.is_always_true(data.condition)?;
                Ok(forever && self.terminates_function(data.body, true, depth)?)
            }
            _ => Ok(node.kind.is_function_terminating()),
        }
    }

    fn any_terminates(
        &self,
        statements: &[NodeIndex],
        in_forever_loop: bool,
        depth: u32,
    ) -> CompileResult<bool> {
        for &statement in statements {
            if self.terminates_function(statement, in_forever_loop, depth)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn is_always_true(&self, condition: NodeIndex) -> CompileResult<bool> {
        let scope = self.table.get_container_scope(self.arena, condition)?;
        self.evaluator.is_always_true(scope, condition)
    }
}
