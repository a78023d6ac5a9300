//! Class template instantiation.

use crate::class::{ClassFlags, ClassTypeData};
use crate::declaration_pass::DeclarationVisitor;
use crate::symbol::{SymbolFlags, SymbolId, SymbolKind};
use crate::symbol_table::SymbolTable;
use crate::types::TypeId;
use cmc_ast::{NodeArena, NodeIndex};
use cmc_common::{CompileError, CompileResult, Span, limits};
use tracing::debug;

impl SymbolTable {
    /// The instance of class template `primary` for `arguments`, created on
    /// first use.
    ///
    /// A new instance is an ordinary class symbol flagged `TEMPLATE_INSTANCE`.
    /// Its template parameters are bound to the argument types as typedefs
    /// and the declaration pass re-runs over the template's members into it.
    pub fn instantiate_class_template(
        &mut self,
        arena: &NodeArena,
        primary: SymbolId,
        arguments: Vec<TypeId>,
        span: Span,
    ) -> CompileResult<SymbolId> {
        if let Some(instance) = self.types.lookup_template_instance(primary, &arguments) {
            return Ok(instance);
        }
        let (name, parent, access, symbol_flags, parameters) = {
            let symbol = self.symbol(primary)?;
            let data = self.class_data(primary)?;
            (
                symbol.name.clone(),
                symbol.parent,
                symbol.access,
                symbol.flags & (SymbolFlags::STATIC | SymbolFlags::ABSTRACT),
                data.template_parameters.clone(),
            )
        };
        if parameters.len() != arguments.len() {
            return Err(CompileError::resolution(
                format!(
                    "class template '{name}' takes {} template arguments, {} given",
                    parameters.len(),
                    arguments.len()
                ),
                span,
            ));
        }
        if self.instantiating >= limits::MAX_INSTANTIATION_DEPTH {
            return Err(CompileError::resolution(
                format!("instantiation of class template '{name}' nested too deeply"),
                span,
            ));
        }
        let template_node = self.node_for_symbol(primary);
        let members = arena
            .get(template_node)
            .and_then(|n| arena.get_class(n))
            .map(|c| c.members.clone())
            .ok_or_else(|| {
                CompileError::resolution(
                    format!("class template '{name}' has no declaration in this compile unit"),
                    span,
                )
            })?;

        let instance = self.new_symbol(
            name,
            span,
            SymbolKind::Class(Box::new(ClassTypeData {
                flags: ClassFlags::TEMPLATE_INSTANCE,
                primary_template: primary,
                template_arguments: arguments.clone(),
                ..ClassTypeData::default()
            })),
        );
        let type_id = self.types.symbol_type(instance);
        {
            let symbol = self.symbol_mut(instance)?;
            symbol.parent = parent;
            symbol.access = access;
            symbol.flags |= symbol_flags;
        }
        self.class_data_mut(instance)?.type_id = type_id;
        self.types.add_template_instance(primary, arguments.clone(), instance);
        self.types.record_exported_template_type(instance);
        self.map_symbol_node(instance, template_node);
        let parent_scope = self.container_scope(parent)?;
        let instance_scope = self.container_scope(instance)?;
        if let Some(scope) = self.scope_mut(instance_scope) {
            scope.parent = parent_scope;
        }
        self.assign_cid(instance)?;

        let mark = self.scope_mark();
        self.begin_symbol_scope(instance)?;
        self.instantiating += 1;
        let declared = self.declare_instance_members(arena, &parameters, &arguments, &members);
        self.instantiating -= 1;
        if let Err(error) = declared {
            self.restore_scope_mark(mark);
            return Err(error);
        }
        self.end_symbol_scope()?;
        debug!(instance = %self.class_key(instance), "instantiated class template");
        Ok(instance)
    }

    fn declare_instance_members(
        &mut self,
        arena: &NodeArena,
        parameters: &[SymbolId],
        arguments: &[TypeId],
        members: &[NodeIndex],
    ) -> CompileResult<()> {
        for (&parameter, &argument) in parameters.iter().zip(arguments) {
            let (name, span) = {
                let symbol = self.symbol(parameter)?;
                (symbol.name.clone(), symbol.span)
            };
            self.add_bound_typedef(&name, span, argument)?;
        }
        let visitor = DeclarationVisitor { arena };
        for &member in members {
            visitor.visit_member(self, member)?;
        }
        Ok(())
    }

    /// Template instances created so far, in creation order.
    pub fn template_instances(&self) -> &[SymbolId] {
        self.types.exported_template_types()
    }
}
