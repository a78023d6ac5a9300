//! The statement binder.
//!
//! A depth-first walk over the declarations of one compile unit that binds
//! the body of every non-template function with a body into the
//! [`BoundCompileUnit`]. Scopes are entered through the symbol table so that
//! local variables land in the container that encloses them. Composite
//! statements are assembled on an explicit parent stack.

use crate::bound_tree::{
    BoundClass, BoundCompileUnit, BoundExpression, BoundExpressionKind, BoundFunction, BoundNode,
    BoundStatement, BoundStatementKind,
};
use crate::return_paths::check_function_return_paths;
use crate::special_members::explicit_parameter_types;
use crate::statement_binders::{StatementBindCallbacks, StatementBinder};
use crate::synthesis::{
    destruction_statements, generate_synthesized_function_implementation,
    implicit_base_initializer, instance_member_variables, is_virtual_class, this_parameter,
};
use cmc_ast::{
    BinaryOp, Derivations, InitializerTarget, LiteralValue, NodeArena, NodeData, NodeIndex,
    NodeKind, RefKind, UnaryOp,
};
use cmc_common::{CompileError, CompileOptions, CompileResult, Span};
use cmc_symbols::{
    BasicType, FunctionFlags, FunctionKind, ScopeId, ScopeLookup, SymbolFlags, SymbolId,
    SymbolKind, SymbolTable, TypeId, TypeResolver, group_names,
};
use tracing::{debug, instrument, trace};

/// Outcome of overload selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Overload {
    Found(SymbolId),
    NoMatch,
    Ambiguous,
}

/// Select among `candidates` by argument count, then by exact parameter
/// base types when several have the right arity. Suppressed functions are
/// never selected.
pub(crate) fn resolve_overload(
    table: &SymbolTable,
    candidates: &[SymbolId],
    arguments: &[BoundExpression],
) -> CompileResult<Overload> {
    let mut viable = Vec::new();
    for &candidate in candidates {
        if table.function_data(candidate)?.has(FunctionFlags::SUPPRESSED) {
            continue;
        }
        let parameters = explicit_parameter_types(table, candidate)?;
        if parameters.len() == arguments.len() {
            viable.push((candidate, parameters));
        }
    }
    match viable.len() {
        0 => return Ok(Overload::NoMatch),
        1 => return Ok(Overload::Found(viable[0].0)),
        _ => {}
    }
    let types = table.types();
    let exact: Vec<SymbolId> = viable
        .iter()
        .filter(|(_, parameters)| {
            parameters
                .iter()
                .zip(arguments)
                .all(|(&p, a)| types.base_type(p) == types.base_type(a.type_id))
        })
        .map(|(candidate, _)| *candidate)
        .collect();
    Ok(match exact[..] {
        [single] => Overload::Found(single),
        _ => Overload::Ambiguous,
    })
}

/// How a member reached through `.` gets its object.
enum Receiver {
    /// `object.member`.
    Object(BoundExpression),
    /// `Namespace.member`, `Class.member`, `Enum.constant`.
    Type,
}

#[derive(Clone, Copy)]
enum Delegation {
    Base,
    This,
}

pub struct Binder<'a> {
    arena: &'a NodeArena,
    table: &'a mut SymbolTable,
    options: &'a CompileOptions,
    unit: BoundCompileUnit,
    /// Classes whose members are being bound, innermost last.
    class_stack: Vec<BoundClass>,
    /// In-progress composite statements, innermost last.
    parent_stack: Vec<BoundStatement>,
    /// Nonzero while inside a class template.
    skip_depth: u32,
    iteration_depth: u32,
    switch_depth: u32,
}

impl<'a> Binder<'a> {
    pub fn new(
        arena: &'a NodeArena,
        table: &'a mut SymbolTable,
        options: &'a CompileOptions,
    ) -> Binder<'a> {
        Binder {
            arena,
            table,
            options,
            unit: BoundCompileUnit::default(),
            class_stack: Vec::new(),
            parent_stack: Vec::new(),
            skip_depth: 0,
            iteration_depth: 0,
            switch_depth: 0,
        }
    }

    /// Bind the compile unit rooted at `root`. The declaration pass and the
    /// declaration binder must have run over it.
    #[instrument(level = "debug", skip_all, fields(root = root.0))]
    pub fn bind(mut self, root: NodeIndex) -> CompileResult<BoundCompileUnit> {
        let arena = self.arena;
        let unit = arena
            .get(root)
            .and_then(|n| arena.get_compile_unit(n))
            .ok_or_else(|| CompileError::internal(format!("node {} is not a compile unit", root.0)))?;
        self.unit = BoundCompileUnit::new(unit.file_name.clone());
        for &member in &unit.members {
            self.visit_member(member)?;
        }
        if !self.parent_stack.is_empty() || !self.class_stack.is_empty() || self.skip_depth != 0 {
            return Err(CompileError::internal(
                "unbalanced binder state at the end of the compile unit",
            ));
        }
        debug!(
            file = %self.unit.file_name,
            functions = self.unit.functions().len(),
            "bound compile unit"
        );
        Ok(self.unit)
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    fn visit_member(&mut self, node: NodeIndex) -> CompileResult<()> {
        if self.skip_depth > 0 {
            return Ok(());
        }
        let arena = self.arena;
        let ast = arena
            .get(node)
            .ok_or_else(|| CompileError::internal(format!("declaration node {} not found", node.0)))?;
        match &ast.data {
            NodeData::Namespace(data) => {
                self.table.begin_namespace_scope(arena, node)?;
                for &member in &data.members {
                    self.visit_member(member)?;
                }
                self.table.end_namespace_scope()
            }
            NodeData::Class(data) => self.visit_class(node, &data.members),
            NodeData::Function(_) => self.visit_function(node),
            _ => Ok(()),
        }
    }

    fn push_skip_content(&mut self) {
        self.skip_depth += 1;
    }

    fn pop_skip_content(&mut self) -> CompileResult<()> {
        self.skip_depth = self
            .skip_depth
            .checked_sub(1)
            .ok_or_else(|| CompileError::internal("skip depth underflow"))?;
        Ok(())
    }

    fn visit_class(&mut self, node: NodeIndex, members: &[NodeIndex]) -> CompileResult<()> {
        let class = self.table.begin_class_scope(self.arena, node)?;
        let template = self.table.class_data(class)?.is_template();
        if template {
            trace!(class = %self.table.full_name(class), "skipping class template");
            self.push_skip_content();
        } else {
            self.class_stack.push(BoundClass::new(class));
        }
        for &member in members {
            self.visit_member(member)?;
        }
        if template {
            self.pop_skip_content()?;
        } else {
            self.bind_synthesized_functions(class)?;
            let bound = self
                .class_stack
                .pop()
                .ok_or_else(|| CompileError::internal("class stack underflow"))?;
            self.add_node(BoundNode::Class(bound));
        }
        self.table.end_class_scope()
    }

    fn add_node(&mut self, node: BoundNode) {
        match self.class_stack.last_mut() {
            Some(class) => class.members.push(node),
            None => self.unit.nodes.push(node),
        }
    }

    /// Compiler-generated members and bodiless `default` members.
    fn bind_synthesized_functions(&mut self, class: SymbolId) -> CompileResult<()> {
        let functions: Vec<SymbolId> = self
            .table
            .symbol(class)?
            .children
            .iter()
            .copied()
            .filter(|&child| self.table.get(child).is_some_and(|s| s.is_function()))
            .collect();
        for function in functions {
            let generated = self.table.symbol(function)?.has_flag(SymbolFlags::COMPILER_GENERATED);
            let data = self.table.function_data(function)?;
            let defaulted = data.has(FunctionFlags::DEFAULT) && !data.has(FunctionFlags::HAS_BODY);
            if !generated && !defaulted {
                continue;
            }
            let bound = generate_synthesized_function_implementation(self.table, class, function)?;
            self.add_node(BoundNode::Function(bound));
        }
        Ok(())
    }

    fn visit_function(&mut self, node: NodeIndex) -> CompileResult<()> {
        let function = self.table.get_function_symbol(node)?;
        let (template, has_body) = {
            let data = self.table.function_data(function)?;
            (
                data.is_function_template() || data.has(FunctionFlags::MEMBER_OF_CLASS_TEMPLATE),
                data.has(FunctionFlags::HAS_BODY),
            )
        };
        if template {
            trace!(function = %self.table.full_name(function), "skipping function template");
            return Ok(());
        }
        if !has_body {
            return Ok(());
        }
        let bound = self.bind_function(node, function)?;
        self.add_node(BoundNode::Function(bound));
        Ok(())
    }

    // =========================================================================
    // Function bodies
    // =========================================================================

    #[instrument(level = "debug", skip_all, fields(function = function.0))]
    fn bind_function(&mut self, node: NodeIndex, function: SymbolId) -> CompileResult<BoundFunction> {
        let arena = self.arena;
        let data = arena
            .get(node)
            .and_then(|n| arena.get_function(n))
            .ok_or_else(|| CompileError::internal(format!("node {} is not a function", node.0)))?;
        let body = arena
            .get(data.body)
            .ok_or_else(|| CompileError::internal("function body not found"))?;
        let statements = arena
            .get_block(body)
            .map(|b| b.statements.as_slice())
            .ok_or_else(|| CompileError::internal("function body is not a compound statement"))?;

        self.table.begin_function_scope(arena, node)?;
        let depth = self.parent_stack.len();
        self.parent_stack.push(BoundStatement::compound(body.span));
        let result = self.bind_function_body(function, &data.initializers, statements, body.span);
        self.table.end_function_scope()?;
        result?;
        let body = self
            .parent_stack
            .pop()
            .ok_or_else(|| CompileError::internal("statement stack underflow"))?;
        if self.parent_stack.len() != depth {
            return Err(CompileError::internal(format!(
                "unbalanced statement nesting in function '{}'",
                self.table.full_name(function)
            )));
        }
        check_function_return_paths(self.table, arena, function)?;
        debug!(function = %self.table.full_name(function), "bound function");
        Ok(BoundFunction {
            function,
            body,
            synthesized: false,
        })
    }

    fn bind_function_body(
        &mut self,
        function: SymbolId,
        initializers: &[NodeIndex],
        statements: &[NodeIndex],
        span: Span,
    ) -> CompileResult<()> {
        let (kind, parameters) = {
            let data = self.table.function_data(function)?;
            (data.kind, data.parameters.clone())
        };
        for parameter in parameters {
            self.add_statement(BoundStatement::new(
                BoundStatementKind::Receive { parameter },
                span,
            ))?;
        }
        let class = self.table.enclosing_class(function);
        let virtual_class = class.is_some() && is_virtual_class(self.table, class)?;
        match kind {
            FunctionKind::Constructor => self.bind_constructor_prologue(function, class, initializers)?,
            FunctionKind::Destructor if virtual_class => {
                self.add_statement(BoundStatement::new(
                    BoundStatementKind::InitializeVtablePointer { class },
                    span,
                ))?;
            }
            _ => {}
        }
        for &statement in statements {
            self.bind_statement(statement)?;
        }
        if kind == FunctionKind::Destructor {
            for statement in destruction_statements(self.table, class, span)? {
                self.add_statement(statement)?;
            }
        }
        Ok(())
    }

    /// Base or delegated constructor call, vtable pointer, then member
    /// initialization in layout order.
    fn bind_constructor_prologue(
        &mut self,
        function: SymbolId,
        class: SymbolId,
        initializers: &[NodeIndex],
    ) -> CompileResult<()> {
        let arena = self.arena;
        let span = self.table.symbol(function)?.span;
        let mut delegation: Option<(Delegation, &[NodeIndex], Span)> = None;
        let mut member_initializers: Vec<(&str, &[NodeIndex], Span)> = Vec::new();
        for &initializer in initializers {
            let node = arena
                .get(initializer)
                .ok_or_else(|| CompileError::internal("initializer node not found"))?;
            let data = arena
                .get_initializer(node)
                .ok_or_else(|| CompileError::internal("node is not an initializer"))?;
            let target = match &data.target {
                InitializerTarget::Member(name) => {
                    member_initializers.push((name, &data.arguments, node.span));
                    continue;
                }
                InitializerTarget::Base => Delegation::Base,
                InitializerTarget::This => Delegation::This,
            };
            if delegation.is_some() {
                return Err(CompileError::declaration(
                    "constructor can have at most one base or this initializer",
                    node.span,
                ));
            }
            delegation = Some((target, &data.arguments, node.span));
        }

        let delegates_to_this = matches!(delegation, Some((Delegation::This, ..)));
        match delegation {
            Some((Delegation::This, arguments, init_span)) => {
                let arguments = self.bind_arguments(arguments)?;
                let constructor = self.select_constructor(class, &arguments, init_span)?;
                if constructor == function {
                    return Err(CompileError::declaration(
                        "constructor cannot delegate to itself",
                        init_span,
                    ));
                }
                self.add_statement(BoundStatement::new(
                    BoundStatementKind::InitializerCall {
                        class,
                        constructor,
                        arguments,
                    },
                    init_span,
                ))?;
            }
            Some((Delegation::Base, arguments, init_span)) => {
                let base = self.table.class_data(class)?.base_class;
                if base.is_none() {
                    return Err(CompileError::resolution(
                        format!("class '{}' has no base class", self.table.full_name(class)),
                        init_span,
                    ));
                }
                let arguments = self.bind_arguments(arguments)?;
                let constructor = self.select_constructor(base, &arguments, init_span)?;
                self.add_statement(BoundStatement::new(
                    BoundStatementKind::InitializerCall {
                        class: base,
                        constructor,
                        arguments,
                    },
                    init_span,
                ))?;
            }
            None => {
                if let Some(call) = implicit_base_initializer(self.table, class, span)? {
                    self.add_statement(call)?;
                }
            }
        }

        if delegates_to_this {
            if let Some(&(_, _, init_span)) = member_initializers.first() {
                return Err(CompileError::declaration(
                    "constructor with a this initializer cannot initialize member variables",
                    init_span,
                ));
            }
            return Ok(());
        }
        if is_virtual_class(self.table, class)? {
            self.add_statement(BoundStatement::new(
                BoundStatementKind::InitializeVtablePointer { class },
                span,
            ))?;
        }

        let variables = instance_member_variables(self.table, class)?;
        for &(name, _, init_span) in &member_initializers {
            let known = variables
                .iter()
                .any(|&v| self.table.get(v).is_some_and(|s| s.name == name));
            if !known {
                return Err(CompileError::resolution(
                    format!(
                        "class '{}' has no member variable '{name}'",
                        self.table.full_name(class)
                    ),
                    init_span,
                ));
            }
        }
        for variable in variables {
            let variable_name = self.table.symbol(variable)?.name.clone();
            let arguments = match member_initializers.iter().find(|(n, ..)| *n == variable_name) {
                Some(&(_, arguments, _)) => self.bind_arguments(arguments)?,
                None => Vec::new(),
            };
            self.add_statement(BoundStatement::new(
                BoundStatementKind::InitializeMember {
                    variable,
                    arguments,
                },
                span,
            ))?;
        }
        Ok(())
    }

    fn select_constructor(
        &self,
        class: SymbolId,
        arguments: &[BoundExpression],
        span: Span,
    ) -> CompileResult<SymbolId> {
        let candidates = self.table.group_functions(class, group_names::CONSTRUCTOR);
        match resolve_overload(self.table, &candidates, arguments)? {
            Overload::Found(constructor) => Ok(constructor),
            Overload::NoMatch => Err(CompileError::resolution(
                format!(
                    "no constructor of class '{}' takes {} arguments",
                    self.table.full_name(class),
                    arguments.len()
                ),
                span,
            )),
            Overload::Ambiguous => Err(CompileError::resolution(
                format!(
                    "constructor call of class '{}' is ambiguous",
                    self.table.full_name(class)
                ),
                span,
            )),
        }
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn scope_of(&self, node: NodeIndex) -> CompileResult<ScopeId> {
        self.table.get_container_scope(self.arena, node)
    }

    fn type_error(&self, what: &str, expected: &str, expr: &BoundExpression) -> CompileError {
        CompileError::resolution(
            format!(
                "{what} must be of type {expected}, not '{}'",
                self.table.type_name(expr.type_id)
            ),
            expr.span,
        )
    }

    fn basic_kind(&self, type_id: TypeId) -> Option<BasicType> {
        let types = self.table.types();
        types.basic_kind(types.base_type(type_id))
    }

    fn require_bool(&self, expr: &BoundExpression, what: &str) -> CompileResult<()> {
        if self.basic_kind(expr.type_id) == Some(BasicType::Bool) {
            return Ok(());
        }
        Err(self.type_error(what, "bool", expr))
    }

    fn require_arithmetic(&self, expr: &BoundExpression, what: &str) -> CompileResult<()> {
        match self.basic_kind(expr.type_id) {
            Some(basic) if basic.is_integral() || matches!(basic, BasicType::Float | BasicType::Double) => {
                Ok(())
            }
            _ => Err(self.type_error(what, "arithmetic type", expr)),
        }
    }

    fn bind_expression_node(&mut self, expr: NodeIndex) -> CompileResult<BoundExpression> {
        let arena = self.arena;
        let node = arena
            .get(expr)
            .ok_or_else(|| CompileError::internal(format!("expression node {} not found", expr.0)))?;
        let span = node.span;
        if node.kind == NodeKind::This {
            return this_parameter(self.table, self.table.current_function(), span);
        }
        match &node.data {
            NodeData::Literal(value) => {
                let type_id = self.literal_type(value);
                Ok(BoundExpression::new(
                    BoundExpressionKind::Literal(value.clone()),
                    type_id,
                    span,
                ))
            }
            NodeData::Identifier(data) => {
                let scope = self.scope_of(expr)?;
                let symbol = self
                    .table
                    .lookup(scope, &data.name, ScopeLookup::ALL, span)?
                    .ok_or_else(|| {
                        CompileError::resolution(format!("symbol '{}' not found", data.name), span)
                    })?;
                self.value_of(symbol, None, span)
            }
            NodeData::Unary(data) => {
                let operand = self.bind_expression(data.operand)?;
                let what = format!("operand of '{}'", data.op.token());
                let type_id = match data.op {
                    UnaryOp::Not => {
                        self.require_bool(&operand, &what)?;
                        operand.type_id
                    }
                    UnaryOp::Neg => {
                        self.require_arithmetic(&operand, &what)?;
                        self.table.types().base_type(operand.type_id)
                    }
                };
                Ok(BoundExpression::new(
                    BoundExpressionKind::Unary {
                        op: data.op,
                        operand: Box::new(operand),
                    },
                    type_id,
                    span,
                ))
            }
            NodeData::Binary(data) => {
                let left = self.bind_expression(data.left)?;
                let right = self.bind_expression(data.right)?;
                let type_id = self.binary_type(data.op, &left, &right)?;
                Ok(BoundExpression::new(
                    BoundExpressionKind::Binary {
                        op: data.op,
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                    type_id,
                    span,
                ))
            }
            NodeData::Invoke(data) => self.bind_invoke(data.callee, &data.arguments, span),
            NodeData::Dot(data) => {
                let (scope, receiver, container) = self.member_container(data.subject)?;
                let symbol = self
                    .table
                    .lookup(scope, &data.member, ScopeLookup::THIS_AND_BASE, span)?
                    .ok_or_else(|| {
                        CompileError::resolution(
                            format!("'{}' is not a member of '{container}'", data.member),
                            span,
                        )
                    })?;
                self.value_of(symbol, Some(receiver), span)
            }
            _ => Err(CompileError::internal(format!(
                "{:?} is not an expression",
                node.kind
            ))),
        }
    }

    fn literal_type(&mut self, value: &LiteralValue) -> TypeId {
        let types = self.table.types_mut();
        match value {
            LiteralValue::Bool(_) => types.basic(BasicType::Bool),
            LiteralValue::Int(_) => types.basic(BasicType::Int),
            LiteralValue::Char(_) => types.basic(BasicType::Char),
            LiteralValue::String(_) => {
                let char_type = types.basic(BasicType::Char);
                types.make_derived(
                    char_type,
                    Derivations {
                        is_const: true,
                        pointers: 1,
                        reference: RefKind::None,
                    },
                )
            }
            LiteralValue::Null => {
                let void = types.void_type();
                types.make_derived(void, Derivations::POINTER)
            }
        }
    }

    fn binary_type(
        &self,
        op: BinaryOp,
        left: &BoundExpression,
        right: &BoundExpression,
    ) -> CompileResult<TypeId> {
        let what = format!("operands of '{}'", op.token());
        let bool_type = self.table.types().basic(BasicType::Bool);
        if op.is_logical() {
            self.require_bool(left, &what)?;
            self.require_bool(right, &what)?;
            return Ok(bool_type);
        }
        if op.is_comparison() {
            return Ok(bool_type);
        }
        self.require_arithmetic(left, &what)?;
        self.require_arithmetic(right, &what)?;
        Ok(self.table.types().base_type(left.type_id))
    }

    /// The value expression for `symbol`. `receiver` is `None` for a plain
    /// identifier, whose member variables are reached through `this`.
    fn value_of(
        &self,
        symbol: SymbolId,
        receiver: Option<Receiver>,
        span: Span,
    ) -> CompileResult<BoundExpression> {
        let sym = self.table.symbol(symbol)?;
        let (kind, type_id) = match &sym.kind {
            SymbolKind::Parameter(data) => (BoundExpressionKind::Parameter(symbol), data.type_id),
            SymbolKind::LocalVariable(data) => {
                (BoundExpressionKind::LocalVariable(symbol), data.type_id)
            }
            SymbolKind::MemberVariable(data) => {
                let object = if sym.is_static() {
                    None
                } else {
                    let object = match receiver {
                        Some(Receiver::Object(object)) => object,
                        Some(Receiver::Type) => {
                            return Err(CompileError::resolution(
                                format!("non-static member variable '{}' requires an object", sym.name),
                                span,
                            ));
                        }
                        None => this_parameter(self.table, self.table.current_function(), span)?,
                    };
                    Some(Box::new(object))
                };
                (
                    BoundExpressionKind::MemberVariable {
                        object,
                        variable: symbol,
                    },
                    data.type_id,
                )
            }
            SymbolKind::Constant(data) => (
                BoundExpressionKind::Constant {
                    constant: symbol,
                    value: data.value,
                },
                data.type_id,
            ),
            SymbolKind::EnumConstant(data) => (
                BoundExpressionKind::EnumConstant {
                    constant: symbol,
                    value: data.value,
                },
                data.type_id,
            ),
            other => {
                return Err(CompileError::resolution(
                    format!("'{}' is a {}, not a value", sym.name, other.name()),
                    span,
                ));
            }
        };
        Ok(BoundExpression::new(kind, type_id, span))
    }

    /// Scope searched for the member named after `subject.`, how the member
    /// gets its object, and the container's name for messages.
    fn member_container(&mut self, subject: NodeIndex) -> CompileResult<(ScopeId, Receiver, String)> {
        let arena = self.arena;
        if let Some(node) = arena.get(subject)
            && let Some(data) = arena.get_identifier(node)
        {
            let scope = self.scope_of(subject)?;
            if let Some(symbol) = self.table.lookup(scope, &data.name, ScopeLookup::ALL, node.span)? {
                let sym = self.table.symbol(symbol)?;
                let is_type_like = matches!(
                    sym.kind,
                    SymbolKind::Namespace
                        | SymbolKind::Class(_)
                        | SymbolKind::Interface(_)
                        | SymbolKind::Enum(_)
                );
                if is_type_like {
                    let scope = self.table.container_scope(symbol)?;
                    return Ok((scope, Receiver::Type, self.table.full_name(symbol)));
                }
            }
        }
        let object = self.bind_expression(subject)?;
        let types = self.table.types();
        let container = types
            .type_symbol(types.base_type(object.type_id))
            .filter(|&s| {
                self.table
                    .get(s)
                    .is_some_and(|s| matches!(s.kind, SymbolKind::Class(_) | SymbolKind::Interface(_)))
            })
            .ok_or_else(|| {
                CompileError::resolution(
                    format!("type '{}' has no members", self.table.type_name(object.type_id)),
                    object.span,
                )
            })?;
        let scope = self.table.container_scope(container)?;
        Ok((scope, Receiver::Object(object), self.table.full_name(container)))
    }

    fn bind_invoke(
        &mut self,
        callee: NodeIndex,
        arguments: &[NodeIndex],
        span: Span,
    ) -> CompileResult<BoundExpression> {
        let arguments = self.bind_arguments(arguments)?;
        let (name, candidates, receiver) = self.bind_callee(callee)?;
        let function = match resolve_overload(self.table, &candidates, &arguments)? {
            Overload::Found(function) => function,
            Overload::NoMatch => {
                return Err(CompileError::resolution(
                    format!("no overload of '{name}' takes {} arguments", arguments.len()),
                    span,
                ));
            }
            Overload::Ambiguous => {
                return Err(CompileError::resolution(
                    format!("call to '{name}' is ambiguous"),
                    span,
                ));
            }
        };
        let (needs_object, return_type) = {
            let symbol = self.table.symbol(function)?;
            let data = self.table.function_data(function)?;
            (
                data.kind.is_member() && !symbol.is_static(),
                data.return_type,
            )
        };
        let object = if needs_object {
            let object = match receiver {
                Some(Receiver::Object(object)) => object,
                Some(Receiver::Type) => {
                    return Err(CompileError::resolution(
                        format!("non-static member function '{name}' requires an object"),
                        span,
                    ));
                }
                None => this_parameter(self.table, self.table.current_function(), span)?,
            };
            Some(Box::new(object))
        } else {
            None
        };
        let type_id = return_type.unwrap_or_else(|| self.table.types().void_type());
        Ok(BoundExpression::new(
            BoundExpressionKind::FunctionCall {
                function,
                object,
                arguments,
            },
            type_id,
            span,
        ))
    }

    /// Candidate functions named by `callee`.
    fn bind_callee(
        &mut self,
        callee: NodeIndex,
    ) -> CompileResult<(String, Vec<SymbolId>, Option<Receiver>)> {
        let arena = self.arena;
        let node = arena
            .get(callee)
            .ok_or_else(|| CompileError::internal("callee node not found"))?;
        let (scope, name, policy, receiver) = match &node.data {
            NodeData::Identifier(data) => {
                (self.scope_of(callee)?, data.name.as_str(), ScopeLookup::ALL, None)
            }
            NodeData::Dot(data) => {
                let (scope, receiver, _) = self.member_container(data.subject)?;
                (scope, data.member.as_str(), ScopeLookup::THIS_AND_BASE, Some(receiver))
            }
            _ => {
                return Err(CompileError::resolution("expression is not callable", node.span));
            }
        };
        let symbol = self
            .table
            .lookup(scope, name, policy, node.span)?
            .ok_or_else(|| CompileError::resolution(format!("function '{name}' not found"), node.span))?;
        match &self.table.symbol(symbol)?.kind {
            SymbolKind::FunctionGroup(group) => {
                Ok((name.to_string(), group.functions.clone(), receiver))
            }
            other => Err(CompileError::resolution(
                format!("'{name}' is a {}, not a function", other.name()),
                node.span,
            )),
        }
    }

    fn select_local_constructor(
        &self,
        type_id: TypeId,
        arguments: &[BoundExpression],
        span: Span,
    ) -> CompileResult<SymbolId> {
        let types = self.table.types();
        if types.derivations(type_id).is_empty()
            && let Some(class) = types.type_symbol(type_id)
            && self.table.symbol(class)?.is_class()
        {
            let has_constructors = !self
                .table
                .group_functions(class, group_names::CONSTRUCTOR)
                .is_empty();
            if !has_constructors && arguments.is_empty() {
                return Ok(SymbolId::NONE);
            }
            return self.select_constructor(class, arguments, span);
        }
        if arguments.len() > 1 {
            return Err(CompileError::resolution(
                format!(
                    "variable of type '{}' takes at most one initializer",
                    self.table.type_name(type_id)
                ),
                span,
            ));
        }
        Ok(SymbolId::NONE)
    }
}

// =============================================================================
// Statement callbacks
// =============================================================================

impl StatementBindCallbacks for Binder<'_> {
    fn arena(&self) -> &NodeArena {
        self.arena
    }

    fn bind_expression(&mut self, expr: NodeIndex) -> CompileResult<BoundExpression> {
        self.bind_expression_node(expr)
    }

    fn bind_condition(&mut self, expr: NodeIndex) -> CompileResult<BoundExpression> {
        let condition = self.bind_expression_node(expr)?;
        self.require_bool(&condition, "condition")?;
        Ok(condition)
    }

    fn bind_return_statement(
        &mut self,
        expression: NodeIndex,
        span: Span,
    ) -> CompileResult<BoundStatement> {
        let function = self.table.current_function();
        let (void, return_value) = {
            let data = self.table.function_data(function)?;
            (data.is_void(), data.return_value)
        };
        let expression = if expression.is_some() {
            if void {
                return Err(CompileError::declaration(
                    "void function cannot return a value",
                    span,
                ));
            }
            Some(self.bind_expression_node(expression)?)
        } else {
            if !void {
                return Err(CompileError::declaration(
                    "return statement in non-void function must return a value",
                    span,
                ));
            }
            None
        };
        Ok(BoundStatement::new(
            BoundStatementKind::Return {
                expression,
                return_value,
            },
            span,
        ))
    }

    fn bind_construction_statement(&mut self, stmt: NodeIndex) -> CompileResult<BoundStatement> {
        let arena = self.arena;
        let node = arena
            .get(stmt)
            .ok_or_else(|| CompileError::internal("construction statement not found"))?;
        let data = arena
            .get_construction(node)
            .ok_or_else(|| CompileError::internal("node is not a construction statement"))?;
        let scope = self.scope_of(stmt)?;
        let type_id = TypeResolver::new(arena).resolve(self.table, scope, data.type_expr)?;
        if self.table.types().is_void(type_id) {
            return Err(CompileError::declaration(
                format!("local variable '{}' cannot be of type void", data.name),
                node.span,
            ));
        }
        let arguments = self.bind_arguments(&data.arguments)?;
        let local = self.table.add_local_variable(arena, stmt, type_id)?;
        let constructor = self.select_local_constructor(type_id, &arguments, node.span)?;
        Ok(BoundStatement::new(
            BoundStatementKind::Construction {
                local,
                constructor,
                arguments,
            },
            node.span,
        ))
    }

    fn begin_declaration_block(&mut self, node: NodeIndex) -> CompileResult<()> {
        self.table.begin_declaration_block(self.arena, node).map(drop)
    }

    fn end_declaration_block(&mut self) -> CompileResult<()> {
        self.table.end_declaration_block()
    }

    fn begin_composite(&mut self, statement: BoundStatement) {
        self.parent_stack.push(statement);
    }

    fn end_composite(&mut self) -> CompileResult<()> {
        let completed = self
            .parent_stack
            .pop()
            .ok_or_else(|| CompileError::internal("statement stack underflow"))?;
        self.add_statement(completed)
    }

    fn current_composite(&mut self) -> CompileResult<&mut BoundStatement> {
        self.parent_stack
            .last_mut()
            .ok_or_else(|| CompileError::internal("no statement is being bound"))
    }

    fn add_statement(&mut self, statement: BoundStatement) -> CompileResult<()> {
        self.current_composite()?.add_statement(statement)
    }

    fn bind_statement(&mut self, stmt: NodeIndex) -> CompileResult<()> {
        if self.options.trace {
            trace!(statement = stmt.0, kind = ?self.arena.kind(stmt), "bind statement");
        }
        StatementBinder::bind(stmt, self)
    }

    fn enter_iteration_statement(&mut self) {
        self.iteration_depth += 1;
    }

    fn leave_iteration_statement(&mut self) {
        self.iteration_depth = self.iteration_depth.saturating_sub(1);
    }

    fn enter_switch_statement(&mut self) {
        self.switch_depth += 1;
    }

    fn leave_switch_statement(&mut self) {
        self.switch_depth = self.switch_depth.saturating_sub(1);
    }

    fn iteration_depth(&self) -> u32 {
        self.iteration_depth
    }

    fn switch_depth(&self) -> u32 {
        self.switch_depth
    }
}
