//! The declaration binder.
//!
//! Turns skeleton symbols created by the declaration pass into complete
//! ones: parameter and return types resolved, specifiers validated and
//! recorded, overload names computed and special members classified on
//! their class. Constants, enumeration constants and delegates of the unit
//! are completed here as well.

use crate::access_levels::check_function_access_levels;
use crate::class_binder::complete_class;
use crate::const_eval::ConstantEvaluator;
use crate::special_members::{classify_function, explicit_parameter_types};
use crate::specifier_rules::apply_specifiers;
use cmc_ast::{NodeArena, NodeData, NodeIndex, Specifiers};
use cmc_common::{CompileError, CompileOptions, CompileResult, Diagnostic, Span};
use cmc_symbols::{
    ClassFlags, FunctionFlags, FunctionKind, ScopeId, SymbolFlags, SymbolId, SymbolKind, SymbolTable,
    TypeId, TypeResolver,
};
use tracing::{debug, instrument, trace};

/// What the specifier rules and the classifier need to know about the
/// declaration being completed.
#[derive(Clone, Copy, Debug)]
pub(crate) struct FunctionContext {
    pub(crate) function: SymbolId,
    pub(crate) kind: FunctionKind,
    pub(crate) specifiers: Specifiers,
    pub(crate) span: Span,
    pub(crate) has_body: bool,
    /// `SymbolId::NONE` for free functions and interface members.
    pub(crate) class: SymbolId,
    pub(crate) class_span: Span,
    pub(crate) static_class: bool,
    pub(crate) abstract_class: bool,
    pub(crate) member_of_template_type: bool,
}

/// Complete the function symbol `function` from its declaration node.
///
/// Binding happens at most once per symbol: a function already marked
/// `BOUND` is left untouched. Members of an unspecialized class template
/// are only marked and validated per instantiation.
#[instrument(level = "debug", skip_all, fields(function = function.0))]
pub fn complete_bind_function(
    table: &mut SymbolTable,
    arena: &NodeArena,
    function: SymbolId,
    options: &CompileOptions,
) -> CompileResult<()> {
    if table.symbol(function)?.is_bound() {
        return Ok(());
    }
    let node = table.node_for_symbol(function);
    let (specifiers, parameter_nodes, return_type_expr, has_body) = {
        let data = arena
            .get(node)
            .and_then(|n| arena.get_function(n))
            .ok_or_else(|| {
                CompileError::internal(format!(
                    "function '{}' has no declaration node",
                    table.full_name(function)
                ))
            })?;
        (
            data.specifiers,
            data.parameters.clone(),
            data.return_type,
            data.has_body(),
        )
    };

    let (span, parent) = {
        let symbol = table.symbol(function)?;
        (symbol.span, symbol.parent)
    };
    let class = if table.symbol(parent)?.is_class() {
        parent
    } else {
        SymbolId::NONE
    };
    let mut ctx = FunctionContext {
        function,
        kind: table.function_data(function)?.kind,
        specifiers,
        span,
        has_body,
        class,
        class_span: Span::DUMMY,
        static_class: false,
        abstract_class: false,
        member_of_template_type: false,
    };
    if class.is_some() {
        let class_symbol = table.symbol(class)?;
        ctx.class_span = class_symbol.span;
        ctx.static_class = class_symbol.is_static();
        ctx.abstract_class = class_symbol.has_flag(SymbolFlags::ABSTRACT);
        let (template, template_instance) = {
            let data = table.class_data(class)?;
            (data.is_template(), data.is_template_instance())
        };
        if template {
            table.function_data_mut(function)?.flags |= FunctionFlags::MEMBER_OF_CLASS_TEMPLATE;
            table.symbol_mut(function)?.flags |= SymbolFlags::BOUND;
            trace!(function = %table.full_name(function), "deferred to instantiation");
            return Ok(());
        }
        ctx.member_of_template_type = template_instance;
    }

    let scope = table.container_scope(function)?;
    let resolver = TypeResolver::new(arena);
    resolve_parameter_types(table, &resolver, scope, function, &parameter_nodes, arena)?;

    apply_specifiers(table, &ctx, options)?;

    if return_type_expr.is_some() {
        let return_type = resolver.resolve(table, scope, return_type_expr)?;
        set_return_type(table, function, return_type)?;
    }

    if ctx.member_of_template_type {
        table.function_data_mut(function)?.flags |= FunctionFlags::MEMBER_OF_TEMPLATE_TYPE;
        table.symbol_mut(function)?.flags |= SymbolFlags::REPLICATED;
    }

    let overload_name = compute_overload_name(table, function)?;
    table.function_data_mut(function)?.overload_name = overload_name;

    classify_function(table, &ctx)?;

    table.symbol_mut(function)?.flags |= SymbolFlags::BOUND;
    debug!(
        function = %table.function_data(function)?.overload_name,
        flags = ?table.function_data(function)?.flags,
        "completed function"
    );
    Ok(())
}

/// Resolve the declared parameter types; the implicit `this` already has
/// its type.
fn resolve_parameter_types(
    table: &mut SymbolTable,
    resolver: &TypeResolver<'_>,
    scope: ScopeId,
    function: SymbolId,
    parameter_nodes: &[NodeIndex],
    arena: &NodeArena,
) -> CompileResult<()> {
    let parameters: Vec<SymbolId> = {
        let data = table.function_data(function)?;
        let mut declared = Vec::with_capacity(data.parameters.len());
        for &parameter in &data.parameters {
            if table.symbol(parameter)?.name != "this" {
                declared.push(parameter);
            }
        }
        declared
    };
    if parameters.len() != parameter_nodes.len() {
        return Err(CompileError::internal(format!(
            "function '{}' declares {} parameters but has {} parameter symbols",
            table.full_name(function),
            parameter_nodes.len(),
            parameters.len()
        )));
    }
    for (&parameter, &node) in parameters.iter().zip(parameter_nodes) {
        let type_expr = arena
            .get(node)
            .and_then(|n| arena.get_parameter(n))
            .map(|p| p.type_expr)
            .ok_or_else(|| CompileError::internal(format!("node {} is not a parameter", node.0)))?;
        let type_id = resolver.resolve(table, scope, type_expr)?;
        if let SymbolKind::Parameter(data) = &mut table.symbol_mut(parameter)?.kind {
            data.type_id = type_id;
        }
    }
    Ok(())
}

fn set_return_type(table: &mut SymbolTable, function: SymbolId, return_type: TypeId) -> CompileResult<()> {
    let return_value = table.function_data(function)?.return_value;
    if table.types().is_void(return_type) {
        let data = table.function_data_mut(function)?;
        data.return_type = None;
        data.return_value = SymbolId::NONE;
        return Ok(());
    }
    table.function_data_mut(function)?.return_type = Some(return_type);
    if return_value.is_some()
        && let SymbolKind::ReturnValue(data) = &mut table.symbol_mut(return_value)?.kind
    {
        data.type_id = return_type;
    }
    Ok(())
}

/// `N.C.f(int, const N.C&)`, followed by the constraint text when present.
/// Conversion functions are named after their target type.
pub(crate) fn compute_overload_name(table: &SymbolTable, function: SymbolId) -> CompileResult<String> {
    let symbol = table.symbol(function)?;
    let data = table.function_data(function)?;
    let group = if data.kind == FunctionKind::ConversionFunction {
        let target = data.return_type.unwrap_or(TypeId::NONE);
        format!("operator {}", table.type_name(target))
    } else {
        data.group_name.clone()
    };
    let parameters: Vec<String> = explicit_parameter_types(table, function)?
        .into_iter()
        .map(|t| table.type_name(t))
        .collect();
    let container = table.full_name(symbol.parent);
    let mut name = if container.is_empty() {
        format!("{group}({})", parameters.join(", "))
    } else {
        format!("{container}.{group}({})", parameters.join(", "))
    };
    if let Some(constraint) = &data.constraint {
        name.push(' ');
        name.push_str(constraint);
    }
    Ok(name)
}

// =============================================================================
// Unit-level walk
// =============================================================================

/// Complete every declaration of the unit rooted at `root`, then every
/// class template instance created along the way. Returns the warnings
/// produced.
#[instrument(level = "debug", skip_all, fields(root = root.0))]
pub fn bind_declarations(
    table: &mut SymbolTable,
    arena: &NodeArena,
    root: NodeIndex,
    options: &CompileOptions,
) -> CompileResult<Vec<Diagnostic>> {
    let mut walker = DeclarationWalker {
        arena,
        options,
        warnings: Vec::new(),
    };
    let members = arena
        .get(root)
        .and_then(|n| arena.get_compile_unit(n))
        .map(|u| u.members.clone())
        .ok_or_else(|| CompileError::internal("compile unit expected"))?;
    for member in members {
        walker.visit(table, member)?;
    }
    walker.complete_template_instances(table)?;
    Ok(walker.warnings)
}

struct DeclarationWalker<'a> {
    arena: &'a NodeArena,
    options: &'a CompileOptions,
    warnings: Vec<Diagnostic>,
}

impl DeclarationWalker<'_> {
    fn visit(&mut self, table: &mut SymbolTable, node: NodeIndex) -> CompileResult<()> {
        let arena = self.arena;
        let Some(ast) = arena.get(node) else {
            return Ok(());
        };
        match &ast.data {
            NodeData::Namespace(data) => {
                for &member in &data.members {
                    self.visit(table, member)?;
                }
                Ok(())
            }
            NodeData::Class(_) => {
                let class = self.symbol_of(table, node)?;
                let warnings = complete_class(table, arena, class, self.options)?;
                self.warnings.extend(warnings);
                Ok(())
            }
            NodeData::Interface(data) => {
                for &member in &data.members {
                    if matches!(arena.get(member).map(|m| &m.data), Some(NodeData::Function(_))) {
                        let function = self.symbol_of(table, member)?;
                        complete_bind_function(table, arena, function, self.options)?;
                    }
                }
                Ok(())
            }
            NodeData::Function(_) => {
                let function = self.symbol_of(table, node)?;
                complete_bind_function(table, arena, function, self.options)?;
                check_function_access_levels(table, function, self.options)
            }
            NodeData::Constant(_) => {
                let constant = self.symbol_of(table, node)?;
                complete_constant(table, arena, constant)
            }
            NodeData::Enum(_) => {
                let enum_symbol = self.symbol_of(table, node)?;
                complete_enum(table, arena, enum_symbol)
            }
            NodeData::Delegate(_) => {
                let delegate = self.symbol_of(table, node)?;
                complete_delegate(table, arena, delegate)
            }
            _ => Ok(()),
        }
    }

    fn symbol_of(&self, table: &SymbolTable, node: NodeIndex) -> CompileResult<SymbolId> {
        table.symbol_for_node(node).ok_or_else(|| {
            CompileError::internal(format!(
                "symbol for node {} not found; declaration pass has not run",
                node.0
            ))
        })
    }

    /// Completing one instance may instantiate further templates, so the
    /// list is re-read until no new instance shows up.
    fn complete_template_instances(&mut self, table: &mut SymbolTable) -> CompileResult<()> {
        let mut next = 0;
        while next < table.template_instances().len() {
            let instance = table.template_instances()[next];
            next += 1;
            if table.is_imported(instance)
                || table.class_data(instance)?.flags.contains(ClassFlags::COMPLETED)
            {
                continue;
            }
            let warnings = complete_class(table, self.arena, instance, self.options)?;
            self.warnings.extend(warnings);
        }
        Ok(())
    }
}

fn declaration_node<'a>(
    table: &SymbolTable,
    arena: &'a NodeArena,
    symbol: SymbolId,
) -> CompileResult<&'a cmc_ast::Node> {
    arena.get(table.node_for_symbol(symbol)).ok_or_else(|| {
        CompileError::internal(format!(
            "'{}' has no declaration node",
            table.full_name(symbol)
        ))
    })
}

/// Resolve the type of a constant and store its value.
pub(crate) fn complete_constant(
    table: &mut SymbolTable,
    arena: &NodeArena,
    constant: SymbolId,
) -> CompileResult<()> {
    let type_expr = declaration_node(table, arena, constant)
        .map(|n| arena.get_constant(n).map(|c| c.type_expr))?
        .ok_or_else(|| CompileError::internal("constant declaration expected"))?;
    let parent = table.symbol(constant)?.parent;
    let scope = table.container_scope(parent)?;
    let type_id = TypeResolver::new(arena).resolve(table, scope, type_expr)?;
    if let SymbolKind::Constant(data) = &mut table.symbol_mut(constant)?.kind {
        data.type_id = type_id;
    }
    let value = ConstantEvaluator::new(arena, table).constant_value(constant)?;
    match value {
        Some(value) => table.set_constant_value(constant, value),
        None => Err(CompileError::declaration(
            format!(
                "value of constant '{}' is not a constant expression",
                table.full_name(constant)
            ),
            table.symbol(constant)?.span,
        )),
    }
}

pub(crate) fn complete_enum(
    table: &mut SymbolTable,
    arena: &NodeArena,
    enum_symbol: SymbolId,
) -> CompileResult<()> {
    let underlying_type = declaration_node(table, arena, enum_symbol)
        .map(|n| arena.get_enum(n).map(|e| e.underlying_type))?
        .unwrap_or(NodeIndex::NONE);
    if underlying_type.is_some() {
        let scope = table.container_scope(enum_symbol)?;
        let type_id = TypeResolver::new(arena).resolve(table, scope, underlying_type)?;
        if let SymbolKind::Enum(data) = &mut table.symbol_mut(enum_symbol)?.kind {
            data.underlying_type = type_id;
        }
    }
    let constants = table.symbol(enum_symbol)?.children.clone();
    for constant in constants {
        let value = ConstantEvaluator::new(arena, table).constant_value(constant)?;
        match value {
            Some(value) => table.set_constant_value(constant, value)?,
            None => {
                return Err(CompileError::declaration(
                    format!(
                        "value of enumeration constant '{}' is not a constant expression",
                        table.full_name(constant)
                    ),
                    table.symbol(constant)?.span,
                ));
            }
        }
    }
    Ok(())
}

pub(crate) fn complete_delegate(
    table: &mut SymbolTable,
    arena: &NodeArena,
    delegate: SymbolId,
) -> CompileResult<()> {
    let (return_type, parameters) = declaration_node(table, arena, delegate)
        .map(|n| arena.get_delegate(n).map(|d| (d.return_type, d.parameters.clone())))?
        .ok_or_else(|| CompileError::internal("delegate declaration expected"))?;
    let scope = table.container_scope(delegate)?;
    let resolver = TypeResolver::new(arena);
    let mut parameter_types = Vec::with_capacity(parameters.len());
    for parameter in parameters {
        let type_expr = arena
            .get(parameter)
            .and_then(|n| arena.get_parameter(n))
            .map(|p| p.type_expr)
            .ok_or_else(|| {
                CompileError::internal(format!("node {} is not a parameter", parameter.0))
            })?;
        parameter_types.push(resolver.resolve(table, scope, type_expr)?);
    }
    let return_type = if return_type.is_some() {
        let resolved = resolver.resolve(table, scope, return_type)?;
        (!table.types().is_void(resolved)).then_some(resolved)
    } else {
        None
    };
    if let SymbolKind::Delegate(data) | SymbolKind::ClassDelegate(data) =
        &mut table.symbol_mut(delegate)?.kind
    {
        data.return_type = return_type;
        data.parameter_types = parameter_types;
    }
    Ok(())
}
