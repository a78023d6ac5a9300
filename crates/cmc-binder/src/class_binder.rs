//! Class completion.
//!
//! A class is complete once its base types are resolved, every member
//! declaration is bound, its implicit special members are planned and its
//! vtable is laid out. Base classes are completed first.

use crate::access_levels::check_function_access_levels;
use crate::declaration_binder::{
    complete_bind_function, complete_constant, complete_delegate, complete_enum,
    compute_overload_name,
};
use cmc_ast::{Derivations, NodeArena, NodeIndex};
use cmc_common::{CompileError, CompileOptions, CompileResult, Diagnostic, Span, limits};
use cmc_symbols::{
    Access, BasicType, ClassFlags, FunctionFlags, FunctionKind, FunctionSymbolData,
    SpecialMemberKind, SymbolFlags, SymbolId, SymbolKind, SymbolTable, TypeId, TypeResolver,
    group_names,
};
use rustc_hash::FxHashSet;
use tracing::{debug, instrument};

/// Complete `class` and, before it, its base class and nested classes.
/// Returns the warnings produced.
#[instrument(level = "debug", skip_all, fields(class = class.0))]
pub fn complete_class(
    table: &mut SymbolTable,
    arena: &NodeArena,
    class: SymbolId,
    options: &CompileOptions,
) -> CompileResult<Vec<Diagnostic>> {
    let mut completer = ClassCompleter {
        arena,
        options,
        in_progress: FxHashSet::default(),
        warnings: Vec::new(),
    };
    completer.complete(table, class)?;
    Ok(completer.warnings)
}

struct ClassCompleter<'a> {
    arena: &'a NodeArena,
    options: &'a CompileOptions,
    in_progress: FxHashSet<SymbolId>,
    warnings: Vec<Diagnostic>,
}

impl ClassCompleter<'_> {
    fn complete(&mut self, table: &mut SymbolTable, class: SymbolId) -> CompileResult<()> {
        let (flags, template) = {
            let data = table.class_data(class)?;
            (data.flags, data.is_template())
        };
        if flags.contains(ClassFlags::COMPLETED)
            || table.is_imported(class)
            || !self.in_progress.insert(class)
        {
            return Ok(());
        }

        if template {
            self.bind_members(table, class)?;
        } else {
            if !flags.contains(ClassFlags::BASES_RESOLVED) {
                self.resolve_base_types(table, class)?;
            }
            let base = table.class_data(class)?.base_class;
            if base.is_some() {
                self.complete(table, base)?;
            }
            self.bind_members(table, class)?;
            if !table.symbol(class)?.is_static() {
                plan_implicit_members(table, class)?;
            }
            table.init_vtable(class)?;
            if self.options.emit_warnings {
                self.check_hiding(table, class)?;
            }
        }

        table.class_data_mut(class)?.flags |= ClassFlags::COMPLETED;
        self.in_progress.remove(&class);
        debug!(class = %table.full_name(class), "completed class");
        Ok(())
    }

    // =========================================================================
    // Base types
    // =========================================================================

    fn resolve_base_types(&mut self, table: &mut SymbolTable, class: SymbolId) -> CompileResult<()> {
        let arena = self.arena;
        let base_types = arena
            .get(table.node_for_symbol(class))
            .and_then(|n| arena.get_class(n))
            .map(|c| c.base_types.clone())
            .unwrap_or_default();
        let class_scope = table.container_scope(class)?;
        let resolver = TypeResolver::new(arena);
        let (class_name, class_span) = (table.full_name(class), table.symbol(class)?.span);

        for type_expr in base_types {
            let span = arena.span(type_expr);
            let type_id = resolver.resolve(table, class_scope, type_expr)?;
            let not_a_base = || {
                CompileError::declaration(
                    format!(
                        "base type '{}' of class '{class_name}' is not a class or an interface",
                        table.type_name(type_id)
                    ),
                    span,
                )
            };
            if table.types().derivations(type_id) != Derivations::NONE {
                return Err(not_a_base());
            }
            let Some(base) = table.types().type_symbol(type_id) else {
                return Err(not_a_base());
            };
            let (is_class, is_interface) = {
                let kind = &table.symbol(base)?.kind;
                (
                    matches!(kind, SymbolKind::Class(_)),
                    matches!(kind, SymbolKind::Interface(_)),
                )
            };
            if is_interface {
                table.class_data_mut(class)?.interfaces.push(base);
                continue;
            }
            if !is_class {
                return Err(not_a_base());
            }
            if base == class {
                return Err(CompileError::declaration(
                    format!("class '{class_name}' cannot derive from itself"),
                    span,
                ));
            }
            if table.class_data(class)?.base_class.is_some() {
                return Err(CompileError::declaration(
                    format!("class '{class_name}' cannot have more than one base class"),
                    span,
                )
                .with_secondary(class_span));
            }
            check_acyclic(table, class, base, span)?;
            table.class_data_mut(class)?.base_class = base;
            let base_scope = table.container_scope(base)?;
            if let Some(scope) = table.scope_mut(class_scope) {
                scope.base = base_scope;
            }
        }
        table.class_data_mut(class)?.flags |= ClassFlags::BASES_RESOLVED;
        Ok(())
    }

    // =========================================================================
    // Members
    // =========================================================================

    fn bind_members(&mut self, table: &mut SymbolTable, class: SymbolId) -> CompileResult<()> {
        let arena = self.arena;
        let template = table.class_data(class)?.is_template();
        let children = table.symbol(class)?.children.clone();
        for child in children {
            match MemberKind::of(&table.symbol(child)?.kind) {
                MemberKind::Function => {
                    complete_bind_function(table, arena, child, self.options)?;
                    check_function_access_levels(table, child, self.options)?;
                }
                MemberKind::Class => self.complete(table, child)?,
                _ if template => {}
                MemberKind::Variable => resolve_member_variable(table, arena, class, child)?,
                MemberKind::Constant => complete_constant(table, arena, child)?,
                MemberKind::Enum => complete_enum(table, arena, child)?,
                MemberKind::Delegate => complete_delegate(table, arena, child)?,
                MemberKind::Other => {}
            }
        }
        Ok(())
    }

    /// Warn about member functions that hide a base class function with the
    /// same signature without saying `new`.
    fn check_hiding(&mut self, table: &SymbolTable, class: SymbolId) -> CompileResult<()> {
        for &child in &table.symbol(class)?.children {
            let symbol = table.symbol(child)?;
            let Some(data) = symbol.function_data() else {
                continue;
            };
            if data.kind != FunctionKind::Member
                || data.vtbl_index >= 0
                || data.has(FunctionFlags::NEW)
                || symbol.has_flag(SymbolFlags::COMPILER_GENERATED)
            {
                continue;
            }
            if let Some(hidden) = hidden_base_function(table, class, child)? {
                self.warnings.push(
                    Diagnostic::warning(
                        symbol.span,
                        format!(
                            "function '{}' hides base class function '{}'; use the 'new' specifier",
                            table.full_name(child),
                            table.full_name(hidden)
                        ),
                    )
                    .with_related(table.symbol(hidden)?.span, "hidden function"),
                );
            }
        }
        Ok(())
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum MemberKind {
    Function,
    Class,
    Variable,
    Constant,
    Enum,
    Delegate,
    Other,
}

impl MemberKind {
    fn of(kind: &SymbolKind) -> MemberKind {
        match kind {
            SymbolKind::Function(_) => MemberKind::Function,
            SymbolKind::Class(_) => MemberKind::Class,
            SymbolKind::MemberVariable(_) => MemberKind::Variable,
            SymbolKind::Constant(_) => MemberKind::Constant,
            SymbolKind::Enum(_) => MemberKind::Enum,
            SymbolKind::Delegate(_) | SymbolKind::ClassDelegate(_) => MemberKind::Delegate,
            _ => MemberKind::Other,
        }
    }
}

fn check_acyclic(table: &SymbolTable, class: SymbolId, base: SymbolId, span: Span) -> CompileResult<()> {
    let mut current = base;
    for _ in 0..limits::MAX_BASE_CLASS_DEPTH {
        if current.is_none() {
            return Ok(());
        }
        if current == class {
            return Err(CompileError::declaration(
                format!("cyclic class hierarchy involving class '{}'", table.full_name(class)),
                span,
            ));
        }
        current = table.class_data(current)?.base_class;
    }
    Err(CompileError::internal(format!(
        "base class chain deeper than {}",
        limits::MAX_BASE_CLASS_DEPTH
    )))
}

fn resolve_member_variable(
    table: &mut SymbolTable,
    arena: &NodeArena,
    class: SymbolId,
    variable: SymbolId,
) -> CompileResult<()> {
    let type_expr = arena
        .get(table.node_for_symbol(variable))
        .and_then(|n| arena.get_member_variable(n))
        .map(|v| v.type_expr)
        .unwrap_or(NodeIndex::NONE);
    if type_expr.is_none() {
        return Err(CompileError::internal(format!(
            "member variable '{}' has no declaration node",
            table.full_name(variable)
        )));
    }
    let scope = table.container_scope(class)?;
    let type_id = TypeResolver::new(arena).resolve(table, scope, type_expr)?;
    if let SymbolKind::MemberVariable(data) = &mut table.symbol_mut(variable)?.kind {
        data.type_id = type_id;
    }
    Ok(())
}

fn hidden_base_function(
    table: &SymbolTable,
    class: SymbolId,
    function: SymbolId,
) -> CompileResult<Option<SymbolId>> {
    let group_name = &table.function_data(function)?.group_name;
    let mut base = table.class_data(class)?.base_class;
    for _ in 0..limits::MAX_BASE_CLASS_DEPTH {
        if base.is_none() {
            return Ok(None);
        }
        let hidden = table
            .group_functions(base, group_name)
            .into_iter()
            .find(|&candidate| table.same_override_signature(function, candidate));
        if hidden.is_some() {
            return Ok(hidden);
        }
        base = table.class_data(base)?.base_class;
    }
    Ok(None)
}

// =============================================================================
// Implicit special members
// =============================================================================

/// Declare the special members the class gets without writing them.
///
/// A default constructor when no constructor is declared; copy operations
/// unless a move operation is declared; move operations unless a copy
/// operation or the destructor is declared; a destructor when absent.
/// Members the base class suppresses are not generated.
fn plan_implicit_members(table: &mut SymbolTable, class: SymbolId) -> CompileResult<()> {
    let (members, base) = {
        let data = table.class_data(class)?;
        (data.special_members.clone(), data.base_class)
    };
    let base_suppresses = |table: &SymbolTable, kind: SpecialMemberKind| -> CompileResult<bool> {
        Ok(base.is_some() && table.class_data(base)?.special_members.has_suppressed(kind))
    };
    let declared = |kind| members.is_declared(kind);
    let move_declared = declared(SpecialMemberKind::MoveConstructor)
        || declared(SpecialMemberKind::MoveAssignment);
    let copy_declared = declared(SpecialMemberKind::CopyConstructor)
        || declared(SpecialMemberKind::CopyAssignment);

    let mut planned = Vec::new();
    if table.group_functions(class, group_names::CONSTRUCTOR).is_empty() {
        planned.push(SpecialMemberKind::DefaultConstructor);
    }
    if !move_declared {
        if !declared(SpecialMemberKind::CopyConstructor) {
            planned.push(SpecialMemberKind::CopyConstructor);
        }
        if !declared(SpecialMemberKind::CopyAssignment) {
            planned.push(SpecialMemberKind::CopyAssignment);
        }
    }
    if !copy_declared && !declared(SpecialMemberKind::Destructor) {
        if !declared(SpecialMemberKind::MoveConstructor) {
            planned.push(SpecialMemberKind::MoveConstructor);
        }
        if !declared(SpecialMemberKind::MoveAssignment) {
            planned.push(SpecialMemberKind::MoveAssignment);
        }
    }
    if !declared(SpecialMemberKind::Destructor) {
        planned.push(SpecialMemberKind::Destructor);
    }

    for kind in planned {
        if base_suppresses(table, kind)? {
            continue;
        }
        declare_implicit_member(table, class, kind)?;
    }
    Ok(())
}

fn declare_implicit_member(
    table: &mut SymbolTable,
    class: SymbolId,
    kind: SpecialMemberKind,
) -> CompileResult<SymbolId> {
    let class_type = table.class_data(class)?.type_id;
    let span = table.symbol(class)?.span;
    let (group_name, function_kind, that) = match kind {
        SpecialMemberKind::DefaultConstructor => {
            (group_names::CONSTRUCTOR, FunctionKind::Constructor, None)
        }
        SpecialMemberKind::CopyConstructor => (
            group_names::CONSTRUCTOR,
            FunctionKind::Constructor,
            Some(Derivations::CONST_REF),
        ),
        SpecialMemberKind::MoveConstructor => (
            group_names::CONSTRUCTOR,
            FunctionKind::Constructor,
            Some(Derivations::RVALUE_REF),
        ),
        SpecialMemberKind::CopyAssignment => (
            group_names::ASSIGNMENT,
            FunctionKind::Member,
            Some(Derivations::CONST_REF),
        ),
        SpecialMemberKind::MoveAssignment => (
            group_names::ASSIGNMENT,
            FunctionKind::Member,
            Some(Derivations::RVALUE_REF),
        ),
        SpecialMemberKind::OpEqual => (
            group_names::EQUAL,
            FunctionKind::Member,
            Some(Derivations::CONST_REF),
        ),
        SpecialMemberKind::Destructor => {
            (group_names::DESTRUCTOR, FunctionKind::Destructor, None)
        }
        SpecialMemberKind::StaticConstructor => {
            return Err(CompileError::internal("static constructor is never implicit"));
        }
    };

    let mut data = FunctionSymbolData::new(group_name, function_kind);
    data.flags |= FunctionFlags::NOTHROW;
    let function = table.add_generated_function(class, data, Access::Public, span)?;
    table.add_this_parameter(function, class)?;
    if let Some(derivations) = that {
        let that_type = table.types_mut().make_derived(class_type, derivations);
        table.add_typed_parameter(function, "that", that_type, span)?;
    }
    if kind == SpecialMemberKind::OpEqual {
        let bool_type = table.types().basic(BasicType::Bool);
        table.function_data_mut(function)?.return_type = Some(bool_type);
    }
    let overload_name = compute_overload_name(table, function)?;
    table.function_data_mut(function)?.overload_name = overload_name;
    table.symbol_mut(function)?.flags |= SymbolFlags::BOUND;
    debug!(function = %table.function_data(function)?.overload_name, "declared implicit member");
    Ok(function)
}

/// Type of the `that` parameter of a copy or move member.
pub(crate) fn that_type(table: &SymbolTable, function: SymbolId) -> CompileResult<Option<TypeId>> {
    let data = table.function_data(function)?;
    for &parameter in &data.parameters {
        let symbol = table.symbol(parameter)?;
        if symbol.name != "this" {
            return Ok(symbol.kind.value_type());
        }
    }
    Ok(None)
}
