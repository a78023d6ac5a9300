//! Per-statement-kind binders.
//!
//! Each binder turns one AST statement into its bound counterpart. Composite
//! statements are opened on the caller's parent stack, filled by binding their
//! children, and attached to the enclosing statement when closed. Everything
//! that needs the symbol table goes through [`StatementBindCallbacks`].

use crate::bound_tree::{BoundExpression, BoundStatement, BoundStatementKind};
use cmc_ast::{NodeArena, NodeIndex, NodeKind};
use cmc_common::{CompileError, CompileResult, Span};

/// Operations the statement binders delegate to the binder state.
pub trait StatementBindCallbacks {
    /// Get access to the node arena for AST traversal.
    fn arena(&self) -> &NodeArena;

    /// Bind an expression in the scope that encloses it.
    fn bind_expression(&mut self, expr: NodeIndex) -> CompileResult<BoundExpression>;

    /// Bind an expression that must be of type `bool`.
    fn bind_condition(&mut self, expr: NodeIndex) -> CompileResult<BoundExpression>;

    fn bind_arguments(&mut self, arguments: &[NodeIndex]) -> CompileResult<Vec<BoundExpression>> {
        arguments
            .iter()
            .map(|&argument| self.bind_expression(argument))
            .collect()
    }

    /// Check a return statement against the current function.
    fn bind_return_statement(
        &mut self,
        expression: NodeIndex,
        span: Span,
    ) -> CompileResult<BoundStatement>;

    /// Declare the local variable of a construction statement and select its
    /// constructor.
    fn bind_construction_statement(&mut self, stmt: NodeIndex) -> CompileResult<BoundStatement>;

    /// Enter the declaration block opened at `node`.
    fn begin_declaration_block(&mut self, node: NodeIndex) -> CompileResult<()>;

    fn end_declaration_block(&mut self) -> CompileResult<()>;

    /// Push an in-progress composite statement.
    fn begin_composite(&mut self, statement: BoundStatement);

    /// Pop the innermost composite statement and attach it to its parent.
    fn end_composite(&mut self) -> CompileResult<()>;

    /// The innermost in-progress composite statement.
    fn current_composite(&mut self) -> CompileResult<&mut BoundStatement>;

    /// Attach a leaf statement to the innermost composite statement.
    fn add_statement(&mut self, statement: BoundStatement) -> CompileResult<()>;

    /// Recursively bind a nested statement.
    fn bind_statement(&mut self, stmt: NodeIndex) -> CompileResult<()>;

    /// Enter a while, do or for statement.
    fn enter_iteration_statement(&mut self);

    fn leave_iteration_statement(&mut self);

    fn enter_switch_statement(&mut self);

    fn leave_switch_statement(&mut self);

    fn iteration_depth(&self) -> u32;

    fn switch_depth(&self) -> u32;
}

/// Binds statements of one kind.
pub trait KindBinder {
    fn bind<S: StatementBindCallbacks>(state: &mut S, stmt: NodeIndex, span: Span) -> CompileResult<()>;
}

fn shape_error(what: &str, stmt: NodeIndex) -> CompileError {
    CompileError::internal(format!("node {} is not a {what} statement", stmt.0))
}

// =============================================================================
// Dispatch
// =============================================================================

/// Dispatches a statement node to the binder for its kind.
pub struct StatementBinder;

impl StatementBinder {
    pub fn bind<S: StatementBindCallbacks>(stmt: NodeIndex, state: &mut S) -> CompileResult<()> {
        let (kind, span) = {
            let arena = state.arena();
            let Some(node) = arena.get(stmt) else {
                return Err(CompileError::internal(format!(
                    "statement node {} not found",
                    stmt.0
                )));
            };
            (node.kind, node.span)
        };
        match kind {
            NodeKind::Compound => CompoundStatementBinder::bind(state, stmt, span),
            NodeKind::Return => ReturnStatementBinder::bind(state, stmt, span),
            NodeKind::If => IfStatementBinder::bind(state, stmt, span),
            NodeKind::While => WhileStatementBinder::bind(state, stmt, span),
            NodeKind::Do => DoStatementBinder::bind(state, stmt, span),
            NodeKind::For => ForStatementBinder::bind(state, stmt, span),
            NodeKind::Switch => SwitchStatementBinder::bind(state, stmt, span),
            NodeKind::Case | NodeKind::Default => Err(CompileError::internal(
                "case clause outside of a switch statement",
            )),
            NodeKind::Break => BreakStatementBinder::bind(state, stmt, span),
            NodeKind::Continue => ContinueStatementBinder::bind(state, stmt, span),
            NodeKind::Construction => ConstructionStatementBinder::bind(state, stmt, span),
            NodeKind::Assignment => AssignmentStatementBinder::bind(state, stmt, span),
            NodeKind::ExpressionStatement => ExpressionStatementBinder::bind(state, stmt, span),
            NodeKind::Throw => ThrowStatementBinder::bind(state, stmt, span),
            NodeKind::Empty => {
                state.add_statement(BoundStatement::new(BoundStatementKind::Empty, span))
            }
            other => Err(CompileError::internal(format!(
                "{other:?} is not a statement"
            ))),
        }
    }
}

// =============================================================================
// Composite statements
// =============================================================================

pub struct CompoundStatementBinder;

impl KindBinder for CompoundStatementBinder {
    fn bind<S: StatementBindCallbacks>(state: &mut S, stmt: NodeIndex, span: Span) -> CompileResult<()> {
        let statements = {
            let arena = state.arena();
            arena
                .get(stmt)
                .and_then(|n| arena.get_block(n))
                .map(|b| b.statements.clone())
                .ok_or_else(|| shape_error("compound", stmt))?
        };
        state.begin_declaration_block(stmt)?;
        state.begin_composite(BoundStatement::compound(span));
        for statement in statements {
            state.bind_statement(statement)?;
        }
        state.end_composite()?;
        state.end_declaration_block()
    }
}

pub struct IfStatementBinder;

impl KindBinder for IfStatementBinder {
    fn bind<S: StatementBindCallbacks>(state: &mut S, stmt: NodeIndex, span: Span) -> CompileResult<()> {
        let (condition, then_statement, else_statement) = {
            let arena = state.arena();
            let data = arena
                .get(stmt)
                .and_then(|n| arena.get_if_statement(n))
                .ok_or_else(|| shape_error("if", stmt))?;
            (data.condition, data.then_statement, data.else_statement)
        };
        let condition = state.bind_condition(condition)?;
        state.begin_composite(BoundStatement::new(
            BoundStatementKind::If {
                condition,
                then_statement: None,
                else_statement: None,
                has_else: else_statement.is_some(),
            },
            span,
        ));
        state.bind_statement(then_statement)?;
        if else_statement.is_some() {
            state.bind_statement(else_statement)?;
        }
        state.end_composite()
    }
}

pub struct WhileStatementBinder;

impl KindBinder for WhileStatementBinder {
    fn bind<S: StatementBindCallbacks>(state: &mut S, stmt: NodeIndex, span: Span) -> CompileResult<()> {
        let (condition, body) = loop_parts(state.arena(), stmt, "while")?;
        let condition = state.bind_condition(condition)?;
        state.begin_composite(BoundStatement::new(
            BoundStatementKind::While {
                condition,
                body: None,
            },
            span,
        ));
        state.enter_iteration_statement();
        let result = state.bind_statement(body);
        state.leave_iteration_statement();
        result?;
        state.end_composite()
    }
}

pub struct DoStatementBinder;

impl KindBinder for DoStatementBinder {
    fn bind<S: StatementBindCallbacks>(state: &mut S, stmt: NodeIndex, span: Span) -> CompileResult<()> {
        let (condition, body) = loop_parts(state.arena(), stmt, "do")?;
        let condition = state.bind_condition(condition)?;
        state.begin_composite(BoundStatement::new(
            BoundStatementKind::Do {
                body: None,
                condition,
            },
            span,
        ));
        state.enter_iteration_statement();
        let result = state.bind_statement(body);
        state.leave_iteration_statement();
        result?;
        state.end_composite()
    }
}

fn loop_parts(arena: &NodeArena, stmt: NodeIndex, what: &str) -> CompileResult<(NodeIndex, NodeIndex)> {
    arena
        .get(stmt)
        .and_then(|n| arena.get_loop(n))
        .map(|data| (data.condition, data.body))
        .ok_or_else(|| shape_error(what, stmt))
}

/// `for (init; condition; increment) body`. The init statement is bound
/// before the condition so that the condition sees the loop variable.
pub struct ForStatementBinder;

impl KindBinder for ForStatementBinder {
    fn bind<S: StatementBindCallbacks>(state: &mut S, stmt: NodeIndex, span: Span) -> CompileResult<()> {
        let (init, condition, increment, body) = {
            let arena = state.arena();
            let data = arena
                .get(stmt)
                .and_then(|n| arena.get_for(n))
                .ok_or_else(|| shape_error("for", stmt))?;
            (data.init, data.condition, data.increment, data.body)
        };
        state.begin_declaration_block(stmt)?;
        state.begin_composite(BoundStatement::new(
            BoundStatementKind::For {
                init: None,
                condition: None,
                increment: None,
                body: None,
                has_init: init.is_some(),
            },
            span,
        ));
        if init.is_some() {
            state.bind_statement(init)?;
        }
        let bound_condition = if condition.is_some() {
            Some(state.bind_condition(condition)?)
        } else {
            None
        };
        let bound_increment = if increment.is_some() {
            Some(state.bind_expression(increment)?)
        } else {
            None
        };
        match &mut state.current_composite()?.kind {
            BoundStatementKind::For {
                condition,
                increment,
                ..
            } => {
                *condition = bound_condition;
                *increment = bound_increment;
            }
            _ => return Err(CompileError::internal("for statement is not the current statement")),
        }
        state.enter_iteration_statement();
        let result = state.bind_statement(body);
        state.leave_iteration_statement();
        result?;
        state.end_composite()?;
        state.end_declaration_block()
    }
}

pub struct SwitchStatementBinder;

impl KindBinder for SwitchStatementBinder {
    fn bind<S: StatementBindCallbacks>(state: &mut S, stmt: NodeIndex, span: Span) -> CompileResult<()> {
        let (condition, cases, default) = {
            let arena = state.arena();
            let data = arena
                .get(stmt)
                .and_then(|n| arena.get_switch(n))
                .ok_or_else(|| shape_error("switch", stmt))?;
            (data.condition, data.cases.clone(), data.default)
        };
        let condition = state.bind_expression(condition)?;
        state.begin_composite(BoundStatement::new(
            BoundStatementKind::Switch {
                condition,
                cases: Vec::new(),
                default: None,
            },
            span,
        ));
        state.enter_switch_statement();
        let result = bind_clauses(state, &cases, default);
        state.leave_switch_statement();
        result?;
        state.end_composite()
    }
}

fn bind_clauses<S: StatementBindCallbacks>(
    state: &mut S,
    cases: &[NodeIndex],
    default: NodeIndex,
) -> CompileResult<()> {
    for &case in cases {
        let span = state.arena().span(case);
        CaseStatementBinder::bind(state, case, span)?;
    }
    if default.is_some() {
        let span = state.arena().span(default);
        DefaultStatementBinder::bind(state, default, span)?;
    }
    Ok(())
}

fn clause_parts(
    arena: &NodeArena,
    stmt: NodeIndex,
    what: &str,
) -> CompileResult<(Vec<NodeIndex>, Vec<NodeIndex>)> {
    arena
        .get(stmt)
        .and_then(|n| arena.get_clause(n))
        .map(|data| (data.values.clone(), data.statements.clone()))
        .ok_or_else(|| shape_error(what, stmt))
}

pub struct CaseStatementBinder;

impl KindBinder for CaseStatementBinder {
    fn bind<S: StatementBindCallbacks>(state: &mut S, stmt: NodeIndex, span: Span) -> CompileResult<()> {
        let (values, statements) = clause_parts(state.arena(), stmt, "case")?;
        let values = state.bind_arguments(&values)?;
        state.begin_composite(BoundStatement::new(
            BoundStatementKind::Case {
                values,
                statements: Vec::new(),
            },
            span,
        ));
        for statement in statements {
            state.bind_statement(statement)?;
        }
        state.end_composite()
    }
}

pub struct DefaultStatementBinder;

impl KindBinder for DefaultStatementBinder {
    fn bind<S: StatementBindCallbacks>(state: &mut S, stmt: NodeIndex, span: Span) -> CompileResult<()> {
        let (_, statements) = clause_parts(state.arena(), stmt, "default")?;
        state.begin_composite(BoundStatement::new(
            BoundStatementKind::Default {
                statements: Vec::new(),
            },
            span,
        ));
        for statement in statements {
            state.bind_statement(statement)?;
        }
        state.end_composite()
    }
}

// =============================================================================
// Leaf statements
// =============================================================================

pub struct ReturnStatementBinder;

impl KindBinder for ReturnStatementBinder {
    fn bind<S: StatementBindCallbacks>(state: &mut S, stmt: NodeIndex, span: Span) -> CompileResult<()> {
        let expression = {
            let arena = state.arena();
            arena
                .get(stmt)
                .and_then(|n| arena.get_return(n))
                .map(|data| data.expression)
                .ok_or_else(|| shape_error("return", stmt))?
        };
        let bound = state.bind_return_statement(expression, span)?;
        state.add_statement(bound)
    }
}

pub struct BreakStatementBinder;

impl KindBinder for BreakStatementBinder {
    fn bind<S: StatementBindCallbacks>(state: &mut S, _stmt: NodeIndex, span: Span) -> CompileResult<()> {
        if state.iteration_depth() == 0 && state.switch_depth() == 0 {
            return Err(CompileError::control_flow(
                "break statement must be enclosed in a while, do, for or switch statement",
                span,
            ));
        }
        state.add_statement(BoundStatement::new(BoundStatementKind::Break, span))
    }
}

pub struct ContinueStatementBinder;

impl KindBinder for ContinueStatementBinder {
    fn bind<S: StatementBindCallbacks>(state: &mut S, _stmt: NodeIndex, span: Span) -> CompileResult<()> {
        if state.iteration_depth() == 0 {
            return Err(CompileError::control_flow(
                "continue statement must be enclosed in a while, do or for statement",
                span,
            ));
        }
        state.add_statement(BoundStatement::new(BoundStatementKind::Continue, span))
    }
}

pub struct ConstructionStatementBinder;

impl KindBinder for ConstructionStatementBinder {
    fn bind<S: StatementBindCallbacks>(state: &mut S, stmt: NodeIndex, _span: Span) -> CompileResult<()> {
        let bound = state.bind_construction_statement(stmt)?;
        state.add_statement(bound)
    }
}

pub struct AssignmentStatementBinder;

impl KindBinder for AssignmentStatementBinder {
    fn bind<S: StatementBindCallbacks>(state: &mut S, stmt: NodeIndex, span: Span) -> CompileResult<()> {
        let (target, source) = {
            let arena = state.arena();
            let data = arena
                .get(stmt)
                .and_then(|n| arena.get_assignment(n))
                .ok_or_else(|| shape_error("assignment", stmt))?;
            (data.target, data.source)
        };
        let target = state.bind_expression(target)?;
        if !target.is_variable() {
            return Err(CompileError::resolution(
                "left side of assignment must be a variable",
                target.span,
            ));
        }
        let source = state.bind_expression(source)?;
        state.add_statement(BoundStatement::new(
            BoundStatementKind::Assignment { target, source },
            span,
        ))
    }
}

fn expression_of(arena: &NodeArena, stmt: NodeIndex, what: &str) -> CompileResult<NodeIndex> {
    arena
        .get(stmt)
        .and_then(|n| arena.get_expression_statement(n))
        .map(|data| data.expression)
        .ok_or_else(|| shape_error(what, stmt))
}

pub struct ExpressionStatementBinder;

impl KindBinder for ExpressionStatementBinder {
    fn bind<S: StatementBindCallbacks>(state: &mut S, stmt: NodeIndex, span: Span) -> CompileResult<()> {
        let expression = expression_of(state.arena(), stmt, "expression")?;
        let expression = state.bind_expression(expression)?;
        state.add_statement(BoundStatement::new(
            BoundStatementKind::Expression(expression),
            span,
        ))
    }
}

pub struct ThrowStatementBinder;

impl KindBinder for ThrowStatementBinder {
    fn bind<S: StatementBindCallbacks>(state: &mut S, stmt: NodeIndex, span: Span) -> CompileResult<()> {
        let expression = expression_of(state.arena(), stmt, "throw")?;
        let expression = state.bind_expression(expression)?;
        state.add_statement(BoundStatement::new(
            BoundStatementKind::Throw(expression),
            span,
        ))
    }
}
