//! Member creation.
//!
//! Each `add_*` creates one symbol for one AST declaration node, assigns it a
//! fresh sid, links it under the current container and records the node ↔
//! symbol association.

use crate::class::{ClassFlags, ClassTypeData};
use crate::function::{FunctionFlags, FunctionKind, FunctionSymbolData, group_names};
use crate::symbol::{
    Access, ConceptData, ConstantData, DelegateData, EnumTypeData, FunctionGroupData,
    InterfaceTypeData, MemberVariableData, SymbolFlags, SymbolId, SymbolKind,
    TemplateParameterData, TypedefData, VariableData,
};
use crate::symbol_table::SymbolTable;
use crate::types::TypeId;
use cmc_ast::{Derivations, Node, NodeArena, NodeIndex, NodeKind, Specifiers};
use cmc_common::{CompileError, CompileResult, Span};
use tracing::debug;

fn node_of<'a>(arena: &'a NodeArena, node: NodeIndex, what: &str) -> CompileResult<&'a Node> {
    arena
        .get(node)
        .ok_or_else(|| CompileError::internal(format!("{what} node {} not found", node.0)))
}

fn shape_error(what: &str, node: NodeIndex) -> CompileError {
    CompileError::internal(format!("node {} is not a {what}", node.0))
}

impl SymbolTable {
    /// Access of members declared in the current container when no access
    /// specifier is written.
    pub fn default_member_access(&self) -> Access {
        match self.get(self.current_container).map(|s| &s.kind) {
            Some(SymbolKind::Class(_)) => Access::Private,
            Some(SymbolKind::Interface(_) | SymbolKind::Enum(_)) => Access::Public,
            Some(SymbolKind::Namespace) => Access::Internal,
            _ => Access::Private,
        }
    }

    fn add_to_current(&mut self, node: NodeIndex, symbol: SymbolId) -> CompileResult<SymbolId> {
        self.add_child(self.current_container, symbol)?;
        self.link_node(node, symbol);
        Ok(symbol)
    }

    // =========================================================================
    // Types
    // =========================================================================

    pub fn add_class(&mut self, arena: &NodeArena, node: NodeIndex) -> CompileResult<SymbolId> {
        let ast = node_of(arena, node, "class")?;
        let data = arena.get_class(ast).ok_or_else(|| shape_error("class", node))?;
        let mut class_flags = ClassFlags::empty();
        if !data.template_parameters.is_empty() {
            class_flags |= ClassFlags::TEMPLATE;
        }
        let access = Access::from_specifiers(data.specifiers, self.default_member_access());
        let class = self.new_symbol(
            data.name.clone(),
            ast.span,
            SymbolKind::Class(Box::new(ClassTypeData {
                flags: class_flags,
                ..ClassTypeData::default()
            })),
        );
        let type_id = self.types.symbol_type(class);
        {
            let symbol = self.symbol_mut(class)?;
            symbol.access = access;
            if data.specifiers.contains(Specifiers::STATIC) {
                symbol.flags |= SymbolFlags::STATIC;
            }
            if data.specifiers.contains(Specifiers::ABSTRACT) {
                symbol.flags |= SymbolFlags::ABSTRACT;
            }
        }
        self.class_data_mut(class)?.type_id = type_id;
        self.add_to_current(node, class)?;
        if !class_flags.contains(ClassFlags::TEMPLATE) {
            self.assign_cid(class)?;
        }
        debug!(class = %data.name, "declared class");
        Ok(class)
    }

    pub fn add_interface(&mut self, arena: &NodeArena, node: NodeIndex) -> CompileResult<SymbolId> {
        let ast = node_of(arena, node, "interface")?;
        let data = arena
            .get_interface(ast)
            .ok_or_else(|| shape_error("interface", node))?;
        let access = Access::from_specifiers(data.specifiers, self.default_member_access());
        let interface = self.new_symbol(
            data.name.clone(),
            ast.span,
            SymbolKind::Interface(InterfaceTypeData::default()),
        );
        let type_id = self.types.symbol_type(interface);
        let symbol = self.symbol_mut(interface)?;
        symbol.access = access;
        if let SymbolKind::Interface(data) = &mut symbol.kind {
            data.type_id = type_id;
        }
        self.add_to_current(node, interface)
    }

    pub fn add_enum(&mut self, arena: &NodeArena, node: NodeIndex) -> CompileResult<SymbolId> {
        let ast = node_of(arena, node, "enumerated type")?;
        let data = arena
            .get_enum(ast)
            .ok_or_else(|| shape_error("enumerated type", node))?;
        let access = Access::from_specifiers(data.specifiers, self.default_member_access());
        let int_type = self.types.basic(crate::types::BasicType::Int);
        let enum_symbol = self.new_symbol(
            data.name.clone(),
            ast.span,
            SymbolKind::Enum(EnumTypeData {
                type_id: TypeId::NONE,
                underlying_type: int_type,
            }),
        );
        let type_id = self.types.symbol_type(enum_symbol);
        let symbol = self.symbol_mut(enum_symbol)?;
        symbol.access = access;
        if let SymbolKind::Enum(data) = &mut symbol.kind {
            data.type_id = type_id;
        }
        self.add_to_current(node, enum_symbol)
    }

    pub fn add_enum_constant(&mut self, arena: &NodeArena, node: NodeIndex) -> CompileResult<SymbolId> {
        let ast = node_of(arena, node, "enumeration constant")?;
        let data = arena
            .get_enum_constant(ast)
            .ok_or_else(|| shape_error("enumeration constant", node))?;
        let enum_type = match self.get(self.current_container).map(|s| &s.kind) {
            Some(SymbolKind::Enum(data)) => data.type_id,
            _ => {
                return Err(CompileError::internal(
                    "enumeration constant outside of an enumerated type",
                ));
            }
        };
        let constant = self.new_symbol(
            data.name.clone(),
            ast.span,
            SymbolKind::EnumConstant(ConstantData {
                type_id: enum_type,
                value: None,
            }),
        );
        self.symbol_mut(constant)?.access = Access::Public;
        self.add_to_current(node, constant)
    }

    pub fn add_constant(&mut self, arena: &NodeArena, node: NodeIndex) -> CompileResult<SymbolId> {
        let ast = node_of(arena, node, "constant")?;
        let data = arena
            .get_constant(ast)
            .ok_or_else(|| shape_error("constant", node))?;
        let access = Access::from_specifiers(data.specifiers, self.default_member_access());
        let constant = self.new_symbol(
            data.name.clone(),
            ast.span,
            SymbolKind::Constant(ConstantData::default()),
        );
        self.symbol_mut(constant)?.access = access;
        self.add_to_current(node, constant)
    }

    pub fn add_typedef(&mut self, arena: &NodeArena, node: NodeIndex) -> CompileResult<SymbolId> {
        let ast = node_of(arena, node, "typedef")?;
        let data = arena
            .get_typedef(ast)
            .ok_or_else(|| shape_error("typedef", node))?;
        let access = Access::from_specifiers(data.specifiers, self.default_member_access());
        let typedef = self.new_symbol(
            data.name.clone(),
            ast.span,
            SymbolKind::Typedef(TypedefData::default()),
        );
        self.symbol_mut(typedef)?.access = access;
        self.add_to_current(node, typedef)
    }

    /// Typedef bound directly to a resolved type; used for template
    /// arguments of class template instances.
    pub fn add_bound_typedef(&mut self, name: &str, span: Span, type_id: TypeId) -> CompileResult<SymbolId> {
        let typedef = self.new_symbol(
            name.to_string(),
            span,
            SymbolKind::Typedef(TypedefData { type_id }),
        );
        self.symbol_mut(typedef)?.access = Access::Public;
        self.add_child(self.current_container, typedef)?;
        Ok(typedef)
    }

    pub fn add_delegate(&mut self, arena: &NodeArena, node: NodeIndex) -> CompileResult<SymbolId> {
        self.add_delegate_like(arena, node, false)
    }

    pub fn add_class_delegate(&mut self, arena: &NodeArena, node: NodeIndex) -> CompileResult<SymbolId> {
        self.add_delegate_like(arena, node, true)
    }

    fn add_delegate_like(
        &mut self,
        arena: &NodeArena,
        node: NodeIndex,
        class_delegate: bool,
    ) -> CompileResult<SymbolId> {
        let ast = node_of(arena, node, "delegate")?;
        let data = arena
            .get_delegate(ast)
            .ok_or_else(|| shape_error("delegate", node))?;
        let access = Access::from_specifiers(data.specifiers, self.default_member_access());
        let kind = if class_delegate {
            SymbolKind::ClassDelegate(DelegateData::default())
        } else {
            SymbolKind::Delegate(DelegateData::default())
        };
        let delegate = self.new_symbol(data.name.clone(), ast.span, kind);
        let type_id = self.types.symbol_type(delegate);
        let symbol = self.symbol_mut(delegate)?;
        symbol.access = access;
        if let SymbolKind::Delegate(d) | SymbolKind::ClassDelegate(d) = &mut symbol.kind {
            d.type_id = type_id;
        }
        self.add_to_current(node, delegate)
    }

    pub fn add_concept(&mut self, arena: &NodeArena, node: NodeIndex) -> CompileResult<SymbolId> {
        let ast = node_of(arena, node, "concept")?;
        let data = arena
            .get_concept(ast)
            .ok_or_else(|| shape_error("concept", node))?;
        let access = Access::from_specifiers(data.specifiers, self.default_member_access());
        let concept = self.new_symbol(
            data.name.clone(),
            ast.span,
            SymbolKind::Concept(ConceptData {
                type_parameters: data.type_parameters.clone(),
            }),
        );
        self.symbol_mut(concept)?.access = access;
        self.add_to_current(node, concept)
    }

    /// Template parameter of the current class or function.
    pub fn add_template_parameter(&mut self, arena: &NodeArena, node: NodeIndex) -> CompileResult<SymbolId> {
        let ast = node_of(arena, node, "template parameter")?;
        let data = arena
            .get_template_parameter(ast)
            .ok_or_else(|| shape_error("template parameter", node))?;
        let parameter = self.new_symbol(
            data.name.clone(),
            ast.span,
            SymbolKind::TemplateParameter(TemplateParameterData::default()),
        );
        let type_id = self.types.symbol_type(parameter);
        {
            let symbol = self.symbol_mut(parameter)?;
            symbol.access = Access::Public;
            if let SymbolKind::TemplateParameter(d) = &mut symbol.kind {
                d.type_id = type_id;
            }
        }
        let container = self.current_container;
        match &mut self.symbol_mut(container)?.kind {
            SymbolKind::Class(class) => class.template_parameters.push(parameter),
            SymbolKind::Function(function) => function.template_parameters.push(parameter),
            _ => {
                return Err(CompileError::internal(
                    "template parameter outside of a class or function",
                ));
            }
        }
        self.add_to_current(node, parameter)
    }

    // =========================================================================
    // Functions
    // =========================================================================

    /// Create the function symbol for a function-like node and enter it into
    /// its overload group in the current container.
    pub fn add_function(&mut self, arena: &NodeArena, node: NodeIndex) -> CompileResult<SymbolId> {
        let ast = node_of(arena, node, "function")?;
        let data = arena
            .get_function(ast)
            .ok_or_else(|| shape_error("function", node))?;
        let in_type = matches!(
            self.get(self.current_container).map(|s| &s.kind),
            Some(SymbolKind::Class(_) | SymbolKind::Interface(_))
        );
        let is_static = data.specifiers.contains(Specifiers::STATIC);
        let (kind, group_name) = match ast.kind {
            NodeKind::Constructor if is_static => (
                FunctionKind::StaticConstructor,
                group_names::STATIC_CONSTRUCTOR.to_string(),
            ),
            NodeKind::Constructor => (FunctionKind::Constructor, group_names::CONSTRUCTOR.to_string()),
            NodeKind::Destructor => (FunctionKind::Destructor, group_names::DESTRUCTOR.to_string()),
            NodeKind::ConversionFunction => (
                FunctionKind::ConversionFunction,
                group_names::CONVERSION.to_string(),
            ),
            _ if in_type => (FunctionKind::Member, data.name.clone()),
            _ => (FunctionKind::Free, data.name.clone()),
        };

        let mut function_data = FunctionSymbolData::new(group_name.clone(), kind);
        if data.has_body() {
            function_data.flags |= FunctionFlags::HAS_BODY;
        }
        function_data.constraint = data.constraint.clone();
        let access = Access::from_specifiers(data.specifiers, self.default_member_access());
        let function = self.new_symbol(
            group_name.clone(),
            ast.span,
            SymbolKind::Function(Box::new(function_data)),
        );
        self.symbol_mut(function)?.access = access;

        let group = self.function_group(self.current_container, &group_name, ast.span)?;
        if let SymbolKind::FunctionGroup(g) = &mut self.symbol_mut(group)?.kind {
            g.functions.push(function);
        }
        self.add_to_current(node, function)?;
        debug!(group = %group_name, ?kind, "declared function");
        Ok(function)
    }

    /// The overload group named `name` in `container`, created on first use.
    pub(crate) fn function_group(&mut self, container: SymbolId, name: &str, span: Span) -> CompileResult<SymbolId> {
        let scope = self.container_scope(container)?;
        if let Some(existing) = self.scope(scope).and_then(|s| s.lookup_local(name)) {
            let symbol = self.symbol(existing)?;
            if matches!(symbol.kind, SymbolKind::FunctionGroup(_)) {
                return Ok(existing);
            }
            return Err(CompileError::declaration(
                format!("symbol '{name}' already defined"),
                span,
            )
            .with_secondary(symbol.span));
        }
        let group = self.new_symbol(
            name.to_string(),
            span,
            SymbolKind::FunctionGroup(FunctionGroupData::default()),
        );
        {
            let symbol = self.symbol_mut(group)?;
            symbol.parent = container;
            symbol.access = Access::Public;
        }
        if let Some(s) = self.scope_mut(scope) {
            s.install(name, group).map_err(|_| {
                CompileError::internal(format!("function group '{name}' installed twice"))
            })?;
        }
        Ok(group)
    }

    /// Functions of the overload group `name` visible directly in `container`.
    pub fn group_functions(&self, container: SymbolId, name: &str) -> Vec<SymbolId> {
        let Ok(scope) = self.container_scope(container) else {
            return Vec::new();
        };
        match self
            .scope(scope)
            .and_then(|s| s.lookup_local(name))
            .and_then(|g| self.get(g))
            .map(|s| &s.kind)
        {
            Some(SymbolKind::FunctionGroup(group)) => group.functions.clone(),
            _ => Vec::new(),
        }
    }

    /// Add a function symbol not backed by an AST node: compiler-generated
    /// special members and imported functions.
    pub fn add_generated_function(
        &mut self,
        container: SymbolId,
        data: FunctionSymbolData,
        access: Access,
        span: Span,
    ) -> CompileResult<SymbolId> {
        let group_name = data.group_name.clone();
        let function = self.new_symbol(
            group_name.clone(),
            span,
            SymbolKind::Function(Box::new(data)),
        );
        {
            let symbol = self.symbol_mut(function)?;
            symbol.access = access;
            symbol.flags |= SymbolFlags::COMPILER_GENERATED;
        }
        let group = self.function_group(container, &group_name, span)?;
        if let SymbolKind::FunctionGroup(g) = &mut self.symbol_mut(group)?.kind {
            g.functions.push(function);
        }
        self.add_child(container, function)?;
        Ok(function)
    }

    /// Parameter of the current function; its type is resolved later by
    /// the declaration binder.
    pub fn add_parameter(&mut self, arena: &NodeArena, node: NodeIndex) -> CompileResult<SymbolId> {
        let ast = node_of(arena, node, "parameter")?;
        let data = arena
            .get_parameter(ast)
            .ok_or_else(|| shape_error("parameter", node))?;
        let name = data.name.clone().unwrap_or_default();
        let parameter = self.new_symbol(
            name,
            ast.span,
            SymbolKind::Parameter(VariableData::default()),
        );
        self.push_parameter(parameter)?;
        self.add_to_current(node, parameter)
    }

    /// Parameter with an already known type, not backed by an AST node.
    pub fn add_typed_parameter(
        &mut self,
        function: SymbolId,
        name: &str,
        type_id: TypeId,
        span: Span,
    ) -> CompileResult<SymbolId> {
        let parameter = self.new_symbol(
            name.to_string(),
            span,
            SymbolKind::Parameter(VariableData { type_id }),
        );
        self.function_data_mut(function)?.parameters.push(parameter);
        self.add_child(function, parameter)?;
        Ok(parameter)
    }

    fn push_parameter(&mut self, parameter: SymbolId) -> CompileResult<()> {
        let function = self.current_function;
        self.function_data_mut(function)
            .map_err(|_| CompileError::internal("parameter outside of a function"))?
            .parameters
            .push(parameter);
        Ok(())
    }

    /// The implicit `this` parameter of a non-static member function: a
    /// pointer to the owning class, always the first parameter.
    pub fn add_this_parameter(&mut self, function: SymbolId, class: SymbolId) -> CompileResult<SymbolId> {
        let class_type = self.class_data(class)?.type_id;
        let this_type = self.types.make_derived(class_type, Derivations::POINTER);
        let span = self.symbol(function)?.span;
        let this = self.new_symbol(
            "this".to_string(),
            span,
            SymbolKind::Parameter(VariableData { type_id: this_type }),
        );
        self.function_data_mut(function)?.parameters.insert(0, this);
        self.add_child(function, this)?;
        Ok(this)
    }

    /// Return-value symbol of a function with a return-type expression.
    pub fn add_return_value(&mut self, function: SymbolId) -> CompileResult<SymbolId> {
        let span = self.symbol(function)?.span;
        let value = self.new_symbol(
            "@return".to_string(),
            span,
            SymbolKind::ReturnValue(VariableData::default()),
        );
        self.symbol_mut(value)?.parent = function;
        self.function_data_mut(function)?.return_value = value;
        Ok(value)
    }

    // =========================================================================
    // Variables and blocks
    // =========================================================================

    pub fn add_member_variable(&mut self, arena: &NodeArena, node: NodeIndex) -> CompileResult<SymbolId> {
        let ast = node_of(arena, node, "member variable")?;
        let data = arena
            .get_member_variable(ast)
            .ok_or_else(|| shape_error("member variable", node))?;
        let access = Access::from_specifiers(data.specifiers, self.default_member_access());
        let class = self.current_container;
        let layout_index = self.class_data(class)?.member_variables.len();
        let variable = self.new_symbol(
            data.name.clone(),
            ast.span,
            SymbolKind::MemberVariable(MemberVariableData {
                type_id: TypeId::NONE,
                layout_index,
            }),
        );
        {
            let symbol = self.symbol_mut(variable)?;
            symbol.access = access;
            if data.specifiers.contains(Specifiers::STATIC) {
                symbol.flags |= SymbolFlags::STATIC;
            }
        }
        self.class_data_mut(class)?.member_variables.push(variable);
        self.add_to_current(node, variable)
    }

    /// Local variable declared by a construction statement.
    pub fn add_local_variable(
        &mut self,
        arena: &NodeArena,
        node: NodeIndex,
        type_id: TypeId,
    ) -> CompileResult<SymbolId> {
        let ast = node_of(arena, node, "construction statement")?;
        let data = arena
            .get_construction(ast)
            .ok_or_else(|| shape_error("construction statement", node))?;
        let local = self.new_symbol(
            data.name.clone(),
            ast.span,
            SymbolKind::LocalVariable(VariableData { type_id }),
        );
        self.add_to_current(node, local)
    }

    pub fn add_declaration_block(&mut self, arena: &NodeArena, node: NodeIndex) -> CompileResult<SymbolId> {
        let span = arena.span(node);
        let block = self.new_symbol(String::new(), span, SymbolKind::DeclarationBlock);
        self.add_to_current(node, block)
    }

    /// Record the constant value of a constant or enumeration constant.
    pub fn set_constant_value(&mut self, constant: SymbolId, value: crate::symbol::ConstValue) -> CompileResult<()> {
        match &mut self.symbol_mut(constant)?.kind {
            SymbolKind::Constant(data) | SymbolKind::EnumConstant(data) => {
                data.value = Some(value);
                Ok(())
            }
            _ => Err(CompileError::internal("constant value set on a non-constant")),
        }
    }
}
