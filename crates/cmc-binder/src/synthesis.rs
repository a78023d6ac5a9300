//! Bodies of compiler-generated and `default` special members.
//!
//! Synthesized bodies are built member by member from the class layout and
//! follow the same statement sequence the binder produces for user-written
//! constructors and destructors.

use crate::bound_tree::{
    BoundExpression, BoundExpressionKind, BoundFunction, BoundStatement, BoundStatementKind,
};
use crate::class_binder::that_type;
use crate::special_members::{explicit_parameter_types, special_member_kind};
use cmc_ast::{BinaryOp, LiteralValue};
use cmc_common::{CompileError, CompileResult, Span};
use cmc_symbols::{
    BasicType, FunctionFlags, SpecialMemberKind, SymbolFlags, SymbolId, SymbolTable, TypeId,
    group_names,
};
use tracing::{debug, instrument};

/// Build the body of the special member `function` of `class`.
#[instrument(level = "debug", skip_all, fields(function = function.0))]
pub fn generate_synthesized_function_implementation(
    table: &SymbolTable,
    class: SymbolId,
    function: SymbolId,
) -> CompileResult<BoundFunction> {
    let Some(kind) = special_member_kind(table, class, function)? else {
        return Err(CompileError::internal(format!(
            "function '{}' is not a special member function",
            table.full_name(function)
        )));
    };
    let span = table.symbol(function)?.span;
    let mut body = BoundStatement::compound(span);
    for &parameter in &table.function_data(function)?.parameters {
        body.add_statement(BoundStatement::new(
            BoundStatementKind::Receive { parameter },
            span,
        ))?;
    }
    let generator = Synthesizer {
        table,
        class,
        function,
        span,
    };
    let statements = match kind {
        SpecialMemberKind::DefaultConstructor => generator.default_constructor()?,
        SpecialMemberKind::CopyConstructor | SpecialMemberKind::MoveConstructor => {
            generator.copy_or_move_constructor(kind)?
        }
        SpecialMemberKind::CopyAssignment | SpecialMemberKind::MoveAssignment => {
            generator.copy_or_move_assignment(kind)?
        }
        SpecialMemberKind::OpEqual => generator.equality()?,
        SpecialMemberKind::Destructor => generator.destructor()?,
        SpecialMemberKind::StaticConstructor => {
            return Err(CompileError::internal("static constructor cannot be synthesized"));
        }
    };
    for statement in statements {
        body.add_statement(statement)?;
    }
    debug!(function = %table.full_name(function), %kind, "synthesized");
    Ok(BoundFunction {
        function,
        body,
        synthesized: true,
    })
}

struct Synthesizer<'a> {
    table: &'a SymbolTable,
    class: SymbolId,
    function: SymbolId,
    span: Span,
}

impl Synthesizer<'_> {
    fn this(&self) -> CompileResult<BoundExpression> {
        this_parameter(self.table, self.function, self.span)
    }

    fn that(&self) -> CompileResult<BoundExpression> {
        let data = self.table.function_data(self.function)?;
        let parameter = data
            .parameters
            .iter()
            .copied()
            .find(|&p| self.table.get(p).is_some_and(|s| s.name != "this"))
            .ok_or_else(|| CompileError::internal("special member has no source parameter"))?;
        let type_id = that_type(self.table, self.function)?.unwrap_or(TypeId::NONE);
        Ok(BoundExpression::new(
            BoundExpressionKind::Parameter(parameter),
            type_id,
            self.span,
        ))
    }

    fn member_of(&self, object: BoundExpression, variable: SymbolId) -> CompileResult<BoundExpression> {
        let type_id = self.table.symbol(variable)?.kind.value_type().unwrap_or(TypeId::NONE);
        Ok(BoundExpression::new(
            BoundExpressionKind::MemberVariable {
                object: Some(Box::new(object)),
                variable,
            },
            type_id,
            self.span,
        ))
    }

    fn statement(&self, kind: BoundStatementKind) -> BoundStatement {
        BoundStatement::new(kind, self.span)
    }

    fn vtable_initialization(&self) -> CompileResult<Option<BoundStatement>> {
        Ok(is_virtual_class(self.table, self.class)?.then(|| {
            self.statement(BoundStatementKind::InitializeVtablePointer { class: self.class })
        }))
    }

    fn default_constructor(&self) -> CompileResult<Vec<BoundStatement>> {
        let mut statements = Vec::new();
        statements.extend(implicit_base_initializer(self.table, self.class, self.span)?);
        statements.extend(self.vtable_initialization()?);
        for variable in instance_member_variables(self.table, self.class)? {
            statements.push(self.statement(BoundStatementKind::InitializeMember {
                variable,
                arguments: Vec::new(),
            }));
        }
        Ok(statements)
    }

    fn copy_or_move_constructor(&self, kind: SpecialMemberKind) -> CompileResult<Vec<BoundStatement>> {
        let mut statements = Vec::new();
        let base = self.table.class_data(self.class)?.base_class;
        if base.is_some()
            && let Some(constructor) = base_special_member(self.table, base, kind)?
        {
            statements.push(self.statement(BoundStatementKind::InitializerCall {
                class: base,
                constructor,
                arguments: vec![self.that()?],
            }));
        }
        statements.extend(self.vtable_initialization()?);
        for variable in instance_member_variables(self.table, self.class)? {
            statements.push(self.statement(BoundStatementKind::InitializeMember {
                variable,
                arguments: vec![self.member_of(self.that()?, variable)?],
            }));
        }
        Ok(statements)
    }

    fn copy_or_move_assignment(&self, kind: SpecialMemberKind) -> CompileResult<Vec<BoundStatement>> {
        let mut statements = Vec::new();
        let base = self.table.class_data(self.class)?.base_class;
        if base.is_some()
            && let Some(assignment) = base_special_member(self.table, base, kind)?
        {
            let void = self.table.types().void_type();
            let call = BoundExpression::new(
                BoundExpressionKind::FunctionCall {
                    function: assignment,
                    object: Some(Box::new(self.this()?)),
                    arguments: vec![self.that()?],
                },
                void,
                self.span,
            );
            statements.push(self.statement(BoundStatementKind::Expression(call)));
        }
        for variable in instance_member_variables(self.table, self.class)? {
            statements.push(self.statement(BoundStatementKind::Assignment {
                target: self.member_of(self.this()?, variable)?,
                source: self.member_of(self.that()?, variable)?,
            }));
        }
        Ok(statements)
    }

    /// `this.m0 == that.m0 && this.m1 == that.m1 && ...`, `true` for a class
    /// without member variables.
    fn equality(&self) -> CompileResult<Vec<BoundStatement>> {
        let bool_type = self.table.types().basic(BasicType::Bool);
        let mut result: Option<BoundExpression> = None;
        for variable in instance_member_variables(self.table, self.class)? {
            let comparison = BoundExpression::new(
                BoundExpressionKind::Binary {
                    op: BinaryOp::Eq,
                    left: Box::new(self.member_of(self.this()?, variable)?),
                    right: Box::new(self.member_of(self.that()?, variable)?),
                },
                bool_type,
                self.span,
            );
            result = Some(match result {
                None => comparison,
                Some(left) => BoundExpression::new(
                    BoundExpressionKind::Binary {
                        op: BinaryOp::And,
                        left: Box::new(left),
                        right: Box::new(comparison),
                    },
                    bool_type,
                    self.span,
                ),
            });
        }
        let expression = result.unwrap_or_else(|| {
            BoundExpression::new(
                BoundExpressionKind::Literal(LiteralValue::Bool(true)),
                bool_type,
                self.span,
            )
        });
        let return_value = self.table.function_data(self.function)?.return_value;
        Ok(vec![self.statement(BoundStatementKind::Return {
            expression: Some(expression),
            return_value,
        })])
    }

    fn destructor(&self) -> CompileResult<Vec<BoundStatement>> {
        let mut statements = Vec::new();
        statements.extend(self.vtable_initialization()?);
        statements.extend(destruction_statements(self.table, self.class, self.span)?);
        Ok(statements)
    }
}

// =============================================================================
// Shared with the statement binder
// =============================================================================

/// The `this` parameter of `function` as an expression.
pub(crate) fn this_parameter(
    table: &SymbolTable,
    function: SymbolId,
    span: Span,
) -> CompileResult<BoundExpression> {
    let data = table.function_data(function)?;
    for &parameter in &data.parameters {
        let symbol = table.symbol(parameter)?;
        if symbol.name == "this" {
            return Ok(BoundExpression::new(
                BoundExpressionKind::This(parameter),
                symbol.kind.value_type().unwrap_or(TypeId::NONE),
                span,
            ));
        }
    }
    Err(CompileError::resolution(
        "'this' can only be used in non-static member functions",
        span,
    ))
}

pub(crate) fn is_virtual_class(table: &SymbolTable, class: SymbolId) -> CompileResult<bool> {
    Ok(table.symbol(class)?.has_flag(SymbolFlags::VIRTUAL)
        || !table.class_data(class)?.vtable.is_empty())
}

/// Non-static member variables in layout order.
pub(crate) fn instance_member_variables(
    table: &SymbolTable,
    class: SymbolId,
) -> CompileResult<Vec<SymbolId>> {
    let mut variables = Vec::new();
    for &variable in &table.class_data(class)?.member_variables {
        if !table.symbol(variable)?.is_static() {
            variables.push(variable);
        }
    }
    Ok(variables)
}

/// The special member of kind `kind` that `class` declares or had
/// generated, unless it is suppressed.
pub(crate) fn base_special_member(
    table: &SymbolTable,
    class: SymbolId,
    kind: SpecialMemberKind,
) -> CompileResult<Option<SymbolId>> {
    for &child in &table.symbol(class)?.children {
        let Some(data) = table.get(child).and_then(|s| s.function_data()) else {
            continue;
        };
        if data.has(FunctionFlags::SUPPRESSED) {
            continue;
        }
        if special_member_kind(table, class, child)? == Some(kind) {
            return Ok(Some(child));
        }
    }
    Ok(None)
}

/// Call of the base class default constructor at the start of a constructor
/// without a base or this initializer.
pub(crate) fn implicit_base_initializer(
    table: &SymbolTable,
    class: SymbolId,
    span: Span,
) -> CompileResult<Option<BoundStatement>> {
    let base = table.class_data(class)?.base_class;
    if base.is_none() {
        return Ok(None);
    }
    let constructors = table.group_functions(base, group_names::CONSTRUCTOR);
    for &constructor in &constructors {
        let suppressed = table.function_data(constructor)?.has(FunctionFlags::SUPPRESSED);
        if !suppressed && explicit_parameter_types(table, constructor)?.is_empty() {
            return Ok(Some(BoundStatement::new(
                BoundStatementKind::InitializerCall {
                    class: base,
                    constructor,
                    arguments: Vec::new(),
                },
                span,
            )));
        }
    }
    if constructors.is_empty() {
        return Ok(None);
    }
    Err(CompileError::resolution(
        format!(
            "base class '{}' of class '{}' has no default constructor",
            table.full_name(base),
            table.full_name(class)
        ),
        span,
    ))
}

/// Member destruction in reverse layout order followed by base destruction.
pub(crate) fn destruction_statements(
    table: &SymbolTable,
    class: SymbolId,
    span: Span,
) -> CompileResult<Vec<BoundStatement>> {
    let mut statements = Vec::new();
    for variable in instance_member_variables(table, class)?.into_iter().rev() {
        statements.push(BoundStatement::new(
            BoundStatementKind::DestroyMember { variable },
            span,
        ));
    }
    let base = table.class_data(class)?.base_class;
    if base.is_some() {
        let destructor = table
            .group_functions(base, group_names::DESTRUCTOR)
            .first()
            .copied()
            .unwrap_or(SymbolId::NONE);
        statements.push(BoundStatement::new(
            BoundStatementKind::DestroyBase {
                class: base,
                destructor,
            },
            span,
        ));
    }
    Ok(statements)
}
