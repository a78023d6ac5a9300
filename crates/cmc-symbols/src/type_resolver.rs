//! Resolution of AST type expressions to interned types.

use crate::class::ClassFlags;
use crate::scope::{ScopeId, ScopeLookup};
use crate::symbol::{Access, SymbolId, SymbolKind};
use crate::symbol_table::SymbolTable;
use crate::types::{BasicType, TypeId, TypeKind};
use cmc_ast::{NodeArena, NodeData, NodeIndex};
use cmc_common::{CompileError, CompileResult, Span, limits};
use tracing::trace;

/// Maps type expressions of one compile unit to `TypeId`s.
pub struct TypeResolver<'a> {
    arena: &'a NodeArena,
    policy: ScopeLookup,
}

impl<'a> TypeResolver<'a> {
    pub fn new(arena: &'a NodeArena) -> TypeResolver<'a> {
        TypeResolver {
            arena,
            policy: ScopeLookup::ALL,
        }
    }

    /// Resolve `type_expr` as seen from `scope`.
    pub fn resolve(
        &self,
        table: &mut SymbolTable,
        scope: ScopeId,
        type_expr: NodeIndex,
    ) -> CompileResult<TypeId> {
        self.resolve_at_depth(table, scope, type_expr, 0)
    }

    fn resolve_at_depth(
        &self,
        table: &mut SymbolTable,
        scope: ScopeId,
        type_expr: NodeIndex,
        depth: u32,
    ) -> CompileResult<TypeId> {
        let span = self.arena.span(type_expr);
        if depth > limits::MAX_TYPE_RESOLUTION_DEPTH {
            return Err(CompileError::resolution(
                "type expression nested too deeply or typedef refers to itself",
                span,
            ));
        }
        let node = self.arena.get(type_expr).ok_or_else(|| {
            CompileError::internal(format!("type expression node {} not found", type_expr.0))
        })?;
        match &node.data {
            NodeData::TypeName(data) => {
                if let Some(basic) = BasicType::from_name(&data.name) {
                    return Ok(table.types.basic(basic));
                }
                let name = data.name.clone();
                self.resolve_name(table, scope, &name, span, depth)
            }
            NodeData::DerivedType(data) => {
                let derivations = data.derivations;
                let base = self.resolve_at_depth(table, scope, data.base, depth + 1)?;
                let derived = table.types.make_derived(base, derivations);
                if derived != base && table.is_template_instance_type(base) {
                    table.types.record_exported_derived_type(derived);
                }
                Ok(derived)
            }
            NodeData::TemplateId(data) => {
                let primary_node = data.primary;
                let argument_nodes = data.arguments.clone();
                let primary = self.resolve_template_primary(table, scope, primary_node)?;
                let mut arguments = Vec::with_capacity(argument_nodes.len());
                for argument in argument_nodes {
                    arguments.push(self.resolve_at_depth(table, scope, argument, depth + 1)?);
                }
                let instance = table.instantiate_class_template(self.arena, primary, arguments, span)?;
                Ok(table.class_data(instance)?.type_id)
            }
            _ => Err(CompileError::resolution("type expression expected", span)),
        }
    }

    fn resolve_name(
        &self,
        table: &mut SymbolTable,
        scope: ScopeId,
        name: &str,
        span: Span,
        depth: u32,
    ) -> CompileResult<TypeId> {
        let symbol = table
            .lookup(scope, name, self.policy, span)?
            .ok_or_else(|| CompileError::resolution(format!("type '{name}' not found"), span))?;
        trace!(name, symbol = symbol.0, "resolved type name");
        let resolved = {
            let sym = table.symbol(symbol)?;
            match &sym.kind {
                SymbolKind::Class(data) if data.flags.contains(ClassFlags::TEMPLATE) => {
                    Some(Err(CompileError::resolution(
                        format!("class template '{name}' requires template arguments"),
                        span,
                    )
                    .with_secondary(sym.span)))
                }
                SymbolKind::Typedef(data) if data.type_id.is_some() => Some(Ok(data.type_id)),
                SymbolKind::Typedef(_) => None,
                kind => Some(kind.type_id().ok_or_else(|| {
                    CompileError::resolution(format!("'{name}' does not denote a type"), span)
                        .with_secondary(sym.span)
                })),
            }
        };
        match resolved {
            Some(result) => result,
            None => self.resolve_typedef(table, symbol, depth),
        }
    }

    /// Resolve a typedef's own type expression in its declaring scope and
    /// remember the result.
    fn resolve_typedef(
        &self,
        table: &mut SymbolTable,
        typedef: SymbolId,
        depth: u32,
    ) -> CompileResult<TypeId> {
        let node = table.node_for_symbol(typedef);
        let (parent, span) = {
            let sym = table.symbol(typedef)?;
            (sym.parent, sym.span)
        };
        let type_expr = self
            .arena
            .get(node)
            .and_then(|n| self.arena.get_typedef(n))
            .map(|d| d.type_expr)
            .ok_or_else(|| {
                CompileError::resolution("typedef has no type in this compile unit", span)
            })?;
        let scope = table.container_scope(parent)?;
        let type_id = self.resolve_at_depth(table, scope, type_expr, depth + 1)?;
        if let SymbolKind::Typedef(data) = &mut table.symbol_mut(typedef)?.kind {
            data.type_id = type_id;
        }
        Ok(type_id)
    }

    fn resolve_template_primary(
        &self,
        table: &SymbolTable,
        scope: ScopeId,
        primary: NodeIndex,
    ) -> CompileResult<SymbolId> {
        let span = self.arena.span(primary);
        let name = self
            .arena
            .get(primary)
            .and_then(|n| self.arena.get_type_name(n))
            .map(|t| t.name.as_str())
            .ok_or_else(|| CompileError::resolution("class template name expected", span))?;
        let symbol = table
            .lookup(scope, name, self.policy, span)?
            .ok_or_else(|| CompileError::resolution(format!("class template '{name}' not found"), span))?;
        match table.symbol(symbol)?.class_data() {
            Some(data) if data.is_template() => Ok(symbol),
            _ => Err(CompileError::resolution(
                format!("'{name}' is not a class template"),
                span,
            )),
        }
    }
}

impl SymbolTable {
    /// Effective access of a type: the minimum over its symbol and, for
    /// template instances, its template arguments. Basic types are public.
    pub fn type_access(&self, type_id: TypeId) -> Access {
        let base = self.types.base_type(type_id);
        match self.types.get(base) {
            Some(TypeKind::Symbol(symbol)) => self.symbol_access(*symbol, 0),
            _ => Access::Public,
        }
    }

    fn symbol_access(&self, symbol: SymbolId, depth: u32) -> Access {
        let Some(sym) = self.get(symbol) else {
            return Access::Public;
        };
        if matches!(sym.kind, SymbolKind::TemplateParameter(_)) {
            return Access::Public;
        }
        let mut access = sym.access;
        if let Some(class) = sym.class_data() {
            if class.is_template_instance() && depth < limits::MAX_TYPE_RESOLUTION_DEPTH {
                access = access.min(self.symbol_access(class.primary_template, depth + 1));
                for &argument in &class.template_arguments {
                    let base = self.types.base_type(argument);
                    if let Some(TypeKind::Symbol(arg_symbol)) = self.types.get(base) {
                        access = access.min(self.symbol_access(*arg_symbol, depth + 1));
                    }
                }
            }
        }
        access
    }

    pub fn is_template_instance_type(&self, type_id: TypeId) -> bool {
        match self.types.get(type_id) {
            Some(TypeKind::Symbol(symbol)) => self
                .get(*symbol)
                .and_then(|s| s.class_data())
                .is_some_and(|c| c.is_template_instance()),
            _ => false,
        }
    }
}
