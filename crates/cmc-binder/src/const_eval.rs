//! Constant expression evaluation.
//!
//! Folds literals, constant and enumeration-constant references, `!`, unary
//! minus, arithmetic, comparisons, `&&` and `||` to a [`ConstValue`].
//! Anything else is not constant and evaluates to `None`.

use cmc_ast::{BinaryOp, LiteralValue, NodeArena, NodeData, NodeIndex, UnaryOp};
use cmc_common::{CompileError, CompileResult, limits};
use cmc_symbols::{ConstValue, ScopeId, ScopeLookup, SymbolId, SymbolKind, SymbolTable};
use tracing::trace;

pub struct ConstantEvaluator<'a> {
    arena: &'a NodeArena,
    table: &'a SymbolTable,
}

impl<'a> ConstantEvaluator<'a> {
    pub fn new(arena: &'a NodeArena, table: &'a SymbolTable) -> ConstantEvaluator<'a> {
        ConstantEvaluator { arena, table }
    }

    /// Value of `expr` as seen from `scope`, or `None` when it is not a
    /// constant expression.
    pub fn evaluate(&self, scope: ScopeId, expr: NodeIndex) -> CompileResult<Option<ConstValue>> {
        self.evaluate_at_depth(scope, expr, 0)
    }

    /// Does `condition` evaluate to the constant `true`?
    pub fn is_always_true(&self, scope: ScopeId, condition: NodeIndex) -> CompileResult<bool> {
        Ok(self.evaluate(scope, condition)? == Some(ConstValue::Bool(true)))
    }

    /// Value of a constant or enumeration constant symbol.
    pub fn constant_value(&self, constant: SymbolId) -> CompileResult<Option<ConstValue>> {
        self.constant_value_at_depth(constant, 0)
    }

    fn evaluate_at_depth(
        &self,
        scope: ScopeId,
        expr: NodeIndex,
        depth: u32,
    ) -> CompileResult<Option<ConstValue>> {
        if depth > limits::MAX_CONST_EVAL_DEPTH {
            return Err(CompileError::internal(format!(
                "constant evaluation deeper than {}",
                limits::MAX_CONST_EVAL_DEPTH
            )));
        }
        let Some(node) = self.arena.get(expr) else {
            return Ok(None);
        };
        let value = match &node.data {
            NodeData::Literal(LiteralValue::Bool(b)) => Some(ConstValue::Bool(*b)),
            NodeData::Literal(LiteralValue::Int(i)) => Some(ConstValue::Int(*i)),
            NodeData::Identifier(data) => {
                match self.table.lookup(scope, &data.name, ScopeLookup::ALL, node.span)? {
                    Some(symbol) => self.constant_value_at_depth(symbol, depth + 1)?,
                    None => None,
                }
            }
            NodeData::Unary(data) => {
                let operand = self.evaluate_at_depth(scope, data.operand, depth + 1)?;
                match (data.op, operand) {
                    (UnaryOp::Not, Some(ConstValue::Bool(b))) => Some(ConstValue::Bool(!b)),
                    (UnaryOp::Neg, Some(ConstValue::Int(i))) => i.checked_neg().map(ConstValue::Int),
                    _ => None,
                }
            }
            NodeData::Binary(data) => {
                let left = self.evaluate_at_depth(scope, data.left, depth + 1)?;
                let right = self.evaluate_at_depth(scope, data.right, depth + 1)?;
                match (left, right) {
                    (Some(l), Some(r)) => fold_binary(data.op, l, r),
                    _ => None,
                }
            }
            _ => None,
        };
        trace!(expr = expr.0, ?value, "evaluated");
        Ok(value)
    }

    fn constant_value_at_depth(
        &self,
        constant: SymbolId,
        depth: u32,
    ) -> CompileResult<Option<ConstValue>> {
        if depth > limits::MAX_CONST_EVAL_DEPTH {
            return Err(CompileError::internal(format!(
                "constant evaluation deeper than {}",
                limits::MAX_CONST_EVAL_DEPTH
            )));
        }
        let symbol = self.table.symbol(constant)?;
        match &symbol.kind {
            SymbolKind::Constant(data) => {
                if data.value.is_some() {
                    return Ok(data.value);
                }
                let node = self.table.node_for_symbol(constant);
                let Some(value) = self
                    .arena
                    .get(node)
                    .and_then(|n| self.arena.get_constant(n))
                    .map(|c| c.value)
                else {
                    return Ok(None);
                };
                let scope = self.table.get_container_scope(self.arena, node)?;
                self.evaluate_at_depth(scope, value, depth + 1)
            }
            SymbolKind::EnumConstant(data) => {
                if data.value.is_some() {
                    return Ok(data.value);
                }
                self.enum_constant_value(symbol.parent, constant, depth)
            }
            _ => Ok(None),
        }
    }

    /// An enumeration constant without a stored value: its own value
    /// expression, or one more than the previous constant, starting at 0.
    fn enum_constant_value(
        &self,
        enum_symbol: SymbolId,
        constant: SymbolId,
        depth: u32,
    ) -> CompileResult<Option<ConstValue>> {
        let enum_scope = self.table.container_scope(enum_symbol)?;
        let mut next = 0i64;
        for &child in &self.table.symbol(enum_symbol)?.children {
            let stored = match &self.table.symbol(child)?.kind {
                SymbolKind::EnumConstant(data) => data.value,
                _ => continue,
            };
            let value = match stored {
                Some(value) => Some(value),
                None => {
                    let expr = self
                        .arena
                        .get(self.table.node_for_symbol(child))
                        .and_then(|n| self.arena.get_enum_constant(n))
                        .map(|c| c.value)
                        .unwrap_or(NodeIndex::NONE);
                    if expr.is_some() {
                        self.evaluate_at_depth(enum_scope, expr, depth + 1)?
                    } else {
                        Some(ConstValue::Int(next))
                    }
                }
            };
            if child == constant {
                return Ok(value);
            }
            match value {
                Some(ConstValue::Int(i)) => next = i.saturating_add(1),
                _ => return Ok(None),
            }
        }
        Ok(None)
    }
}

fn fold_binary(op: BinaryOp, left: ConstValue, right: ConstValue) -> Option<ConstValue> {
    use ConstValue::{Bool, Int};
    match (left, right) {
        (Int(l), Int(r)) => match op {
            BinaryOp::Add => l.checked_add(r).map(Int),
            BinaryOp::Sub => l.checked_sub(r).map(Int),
            BinaryOp::Mul => l.checked_mul(r).map(Int),
            BinaryOp::Div => l.checked_div(r).map(Int),
            BinaryOp::Rem => l.checked_rem(r).map(Int),
            BinaryOp::Eq => Some(Bool(l == r)),
            BinaryOp::NotEq => Some(Bool(l != r)),
            BinaryOp::Less => Some(Bool(l < r)),
            BinaryOp::LessEq => Some(Bool(l <= r)),
            BinaryOp::Greater => Some(Bool(l > r)),
            BinaryOp::GreaterEq => Some(Bool(l >= r)),
            BinaryOp::And | BinaryOp::Or => None,
        },
        (Bool(l), Bool(r)) => match op {
            BinaryOp::And => Some(Bool(l && r)),
            BinaryOp::Or => Some(Bool(l || r)),
            BinaryOp::Eq => Some(Bool(l == r)),
            BinaryOp::NotEq => Some(Bool(l != r)),
            _ => None,
        },
        _ => None,
    }
}
