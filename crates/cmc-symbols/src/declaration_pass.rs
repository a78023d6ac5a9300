//! The declaration pass.
//!
//! First traversal of a compile unit: creates one skeleton symbol per
//! declaration node and links it into the scope tree. Types, specifiers and
//! bodies are handled later by the declaration binder and the statement
//! binder, both of which find their symbols and scopes through the node maps
//! recorded here.

use crate::symbol::SymbolId;
use crate::symbol_table::SymbolTable;
use cmc_ast::{NodeArena, NodeData, NodeIndex, NodeKind, Specifiers};
use cmc_common::{CompileError, CompileResult};
use tracing::{debug, instrument};

/// Run the declaration pass over the compile unit rooted at `root`.
#[instrument(level = "debug", skip_all, fields(root = root.0))]
pub fn declare_compile_unit(
    table: &mut SymbolTable,
    arena: &NodeArena,
    root: NodeIndex,
) -> CompileResult<()> {
    let node = arena
        .get(root)
        .ok_or_else(|| CompileError::internal(format!("compile unit node {} not found", root.0)))?;
    let unit = arena
        .get_compile_unit(node)
        .ok_or_else(|| CompileError::internal("compile unit expected"))?;
    let global = table.global_namespace();
    table.map_node(root, global);
    let scope = table.container_scope(global)?;
    table.map_node_scope(root, scope);

    let visitor = DeclarationVisitor { arena };
    for &member in &unit.members {
        visitor.visit_member(table, member)?;
    }
    debug!(file = %unit.file_name, symbols = table.symbols().len(), "declaration pass done");
    Ok(())
}

/// Walks declaration nodes and creates their symbols.
pub(crate) struct DeclarationVisitor<'a> {
    pub(crate) arena: &'a NodeArena,
}

/// Which Begin/End pair brackets a container.
#[derive(Clone, Copy)]
enum Bracket {
    Class,
    Interface,
    Enum,
    Function,
    Delegate,
    ClassDelegate,
    Block,
}

impl<'a> DeclarationVisitor<'a> {
    pub(crate) fn visit_member(&self, table: &mut SymbolTable, node: NodeIndex) -> CompileResult<()> {
        let arena = self.arena;
        let ast = arena
            .get(node)
            .ok_or_else(|| CompileError::internal(format!("declaration node {} not found", node.0)))?;
        match &ast.data {
            NodeData::Namespace(data) => {
                table.begin_namespace_scope(arena, node)?;
                for &member in &data.members {
                    self.visit_member(table, member)?;
                }
                table.end_namespace_scope()
            }
            NodeData::UsingNamespace(data) => {
                table.add_using_namespace(&data.namespace, ast.span);
                Ok(())
            }
            NodeData::Class(data) => {
                let class = table.add_class(arena, node)?;
                self.enter(table, node, class, Bracket::Class)?;
                for &parameter in &data.template_parameters {
                    table.add_template_parameter(arena, parameter)?;
                }
                for &member in &data.members {
                    self.visit_member(table, member)?;
                }
                self.leave(table, Bracket::Class)
            }
            NodeData::Interface(data) => {
                let interface = table.add_interface(arena, node)?;
                self.enter(table, node, interface, Bracket::Interface)?;
                for &member in &data.members {
                    self.visit_member(table, member)?;
                }
                self.leave(table, Bracket::Interface)
            }
            NodeData::Enum(data) => {
                let enum_symbol = table.add_enum(arena, node)?;
                self.enter(table, node, enum_symbol, Bracket::Enum)?;
                for &constant in &data.constants {
                    table.add_enum_constant(arena, constant)?;
                }
                self.leave(table, Bracket::Enum)
            }
            NodeData::Constant(_) => table.add_constant(arena, node).map(drop),
            NodeData::Typedef(_) => table.add_typedef(arena, node).map(drop),
            NodeData::Concept(_) => table.add_concept(arena, node).map(drop),
            NodeData::MemberVariable(_) => table.add_member_variable(arena, node).map(drop),
            NodeData::Delegate(_) => {
                let bracket = if ast.kind == NodeKind::ClassDelegate {
                    Bracket::ClassDelegate
                } else {
                    Bracket::Delegate
                };
                let delegate = if ast.kind == NodeKind::ClassDelegate {
                    table.add_class_delegate(arena, node)?
                } else {
                    table.add_delegate(arena, node)?
                };
                self.enter(table, node, delegate, bracket)?;
                self.leave(table, bracket)
            }
            NodeData::Function(_) => self.declare_function(table, node),
            _ => Err(CompileError::declaration(
                format!("{:?} is not a declaration", ast.kind),
                ast.span,
            )),
        }
    }

    fn declare_function(&self, table: &mut SymbolTable, node: NodeIndex) -> CompileResult<()> {
        let arena = self.arena;
        let ast = arena
            .get(node)
            .ok_or_else(|| CompileError::internal(format!("function node {} not found", node.0)))?;
        let data = arena
            .get_function(ast)
            .ok_or_else(|| CompileError::internal(format!("node {} is not a function", node.0)))?;
        let container = table.current_container();
        let in_class = table.symbol(container)?.is_class();

        let function = table.add_function(arena, node)?;
        self.enter(table, node, function, Bracket::Function)?;
        for &parameter in &data.template_parameters {
            table.add_template_parameter(arena, parameter)?;
        }
        if in_class && !data.specifiers.contains(Specifiers::STATIC) {
            table.add_this_parameter(function, container)?;
        }
        for &parameter in &data.parameters {
            table.add_parameter(arena, parameter)?;
        }
        if data.return_type.is_some() {
            table.add_return_value(function)?;
        }
        // Instance bodies are bound per instantiation by code generation.
        if table.instantiating == 0
            && let Some(body) = arena.get(data.body).and_then(|b| arena.get_block(b))
        {
            for &statement in &body.statements {
                self.visit_statement(table, statement)?;
            }
        }
        self.leave(table, Bracket::Function)
    }

    /// Nested compound and `for` statements open declaration blocks; every other
    /// statement is searched for nested compounds.
    fn visit_statement(&self, table: &mut SymbolTable, node: NodeIndex) -> CompileResult<()> {
        let arena = self.arena;
        let Some(ast) = arena.get(node) else {
            return Ok(());
        };
        match &ast.data {
            NodeData::Block(block) => {
                let symbol = table.add_declaration_block(arena, node)?;
                self.enter(table, node, symbol, Bracket::Block)?;
                for &statement in &block.statements {
                    self.visit_statement(table, statement)?;
                }
                self.leave(table, Bracket::Block)
            }
            NodeData::If(data) => {
                self.visit_statement(table, data.then_statement)?;
                self.visit_statement(table, data.else_statement)
            }
            NodeData::Loop(data) => self.visit_statement(table, data.body),
            // The init statement's local lives in a block of its own.
            NodeData::For(data) => {
                let symbol = table.add_declaration_block(arena, node)?;
                self.enter(table, node, symbol, Bracket::Block)?;
                self.visit_statement(table, data.init)?;
                self.visit_statement(table, data.body)?;
                self.leave(table, Bracket::Block)
            }
            NodeData::Switch(data) => {
                for &case in &data.cases {
                    self.visit_statement(table, case)?;
                }
                self.visit_statement(table, data.default)
            }
            NodeData::Clause(data) => {
                for &statement in &data.statements {
                    self.visit_statement(table, statement)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Open the scope of a freshly declared container. Members of a template
    /// instance have no node → symbol link, so they are entered by symbol.
    fn enter(
        &self,
        table: &mut SymbolTable,
        node: NodeIndex,
        symbol: SymbolId,
        bracket: Bracket,
    ) -> CompileResult<()> {
        if table.instantiating > 0 {
            return table.begin_symbol_scope(symbol);
        }
        let arena = self.arena;
        match bracket {
            Bracket::Class => table.begin_class_scope(arena, node).map(drop),
            Bracket::Interface => table.begin_interface_scope(arena, node).map(drop),
            Bracket::Enum => table.begin_enum_scope(arena, node).map(drop),
            Bracket::Function => table.begin_function_scope(arena, node).map(drop),
            Bracket::Delegate => table.begin_delegate_scope(arena, node).map(drop),
            Bracket::ClassDelegate => table.begin_class_delegate_scope(arena, node).map(drop),
            Bracket::Block => table.begin_declaration_block(arena, node).map(drop),
        }
    }

    fn leave(&self, table: &mut SymbolTable, bracket: Bracket) -> CompileResult<()> {
        if table.instantiating > 0 {
            return table.end_symbol_scope();
        }
        match bracket {
            Bracket::Class => table.end_class_scope(),
            Bracket::Interface => table.end_interface_scope(),
            Bracket::Enum => table.end_enum_scope(),
            Bracket::Function => table.end_function_scope(),
            Bracket::Delegate => table.end_delegate_scope(),
            Bracket::ClassDelegate => table.end_class_delegate_scope(),
            Bracket::Block => table.end_declaration_block(),
        }
    }
}
