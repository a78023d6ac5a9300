//! Scope bracketing.
//!
//! `begin_*_scope` / `end_*_scope` pairs maintain the container stack while a
//! pass walks the AST. Every Begin must be matched by exactly one End in LIFO
//! order; an End without a Begin is an internal error.

use crate::scope::ScopeId;
use crate::symbol::{Access, SymbolId, SymbolKind};
use crate::symbol_table::SymbolTable;
use cmc_ast::{NodeArena, NodeIndex};
use cmc_common::{CompileError, CompileResult, limits};
use tracing::trace;

#[derive(Clone, Copy, Debug)]
pub(crate) struct ScopeMark {
    containers: usize,
    classes: usize,
    functions: usize,
    container: SymbolId,
    class: SymbolId,
    function: SymbolId,
}

impl SymbolTable {
    // =========================================================================
    // Namespaces
    // =========================================================================

    /// Enter the namespace declared at `node`, creating every component of a
    /// dotted name that does not exist yet.
    pub fn begin_namespace_scope(&mut self, arena: &NodeArena, node: NodeIndex) -> CompileResult<SymbolId> {
        let ast = arena
            .get(node)
            .ok_or_else(|| CompileError::internal(format!("namespace node {} not found", node.0)))?;
        let name = arena
            .get_namespace(ast)
            .map(|ns| ns.name.clone())
            .ok_or_else(|| CompileError::internal(format!("node {} is not a namespace", node.0)))?;
        let span = ast.span;

        let mut container = self.current_container;
        for component in name.split('.').filter(|c| !c.is_empty()) {
            let scope = self.container_scope(container)?;
            let existing = self.scope(scope).and_then(|s| s.lookup_local(component));
            container = match existing {
                Some(found) => {
                    let symbol = self.symbol(found)?;
                    if !symbol.is_namespace() {
                        return Err(CompileError::declaration(
                            format!("'{component}' is not a namespace"),
                            span,
                        )
                        .with_secondary(symbol.span));
                    }
                    found
                }
                None => {
                    let ns = self.new_symbol(component.to_string(), span, SymbolKind::Namespace);
                    self.symbol_mut(ns)?.access = Access::Public;
                    self.add_child(container, ns)?;
                    let ns_scope = self.container_scope(ns)?;
                    if let Some(s) = self.scope_mut(ns_scope) {
                        s.parent = scope;
                    }
                    ns
                }
            };
        }

        if self.symbol(container)?.span.is_dummy() {
            self.symbol_mut(container)?.span = span;
        }
        self.map_node(node, container);
        let scope = self.container_scope(container)?;
        self.map_node_scope(node, scope);
        self.container_stack.push(self.current_container);
        self.current_container = container;
        trace!(namespace = %name, "begin namespace scope");
        Ok(container)
    }

    pub fn end_namespace_scope(&mut self) -> CompileResult<()> {
        self.end_container_scope("namespace")
    }

    // =========================================================================
    // Skeleton containers
    // =========================================================================

    pub fn begin_class_scope(&mut self, arena: &NodeArena, node: NodeIndex) -> CompileResult<SymbolId> {
        let class = self.begin_container_scope(arena, node, "class", |k| {
            matches!(k, SymbolKind::Class(_))
        })?;
        self.class_stack.push(self.current_class);
        self.current_class = class;
        Ok(class)
    }

    pub fn end_class_scope(&mut self) -> CompileResult<()> {
        let previous = self
            .class_stack
            .pop()
            .ok_or_else(|| CompileError::internal("class stack underflow"))?;
        self.current_class = previous;
        self.end_container_scope("class")
    }

    pub fn begin_interface_scope(&mut self, arena: &NodeArena, node: NodeIndex) -> CompileResult<SymbolId> {
        self.begin_container_scope(arena, node, "interface", |k| {
            matches!(k, SymbolKind::Interface(_))
        })
    }

    pub fn end_interface_scope(&mut self) -> CompileResult<()> {
        self.end_container_scope("interface")
    }

    pub fn begin_enum_scope(&mut self, arena: &NodeArena, node: NodeIndex) -> CompileResult<SymbolId> {
        self.begin_container_scope(arena, node, "enumerated type", |k| {
            matches!(k, SymbolKind::Enum(_))
        })
    }

    pub fn end_enum_scope(&mut self) -> CompileResult<()> {
        self.end_container_scope("enumerated type")
    }

    pub fn begin_function_scope(&mut self, arena: &NodeArena, node: NodeIndex) -> CompileResult<SymbolId> {
        let function = self.begin_container_scope(arena, node, "function", |k| {
            matches!(k, SymbolKind::Function(_))
        })?;
        self.function_stack.push(self.current_function);
        self.current_function = function;
        Ok(function)
    }

    pub fn end_function_scope(&mut self) -> CompileResult<()> {
        let previous = self
            .function_stack
            .pop()
            .ok_or_else(|| CompileError::internal("function stack underflow"))?;
        self.current_function = previous;
        self.end_container_scope("function")
    }

    pub fn begin_delegate_scope(&mut self, arena: &NodeArena, node: NodeIndex) -> CompileResult<SymbolId> {
        self.begin_container_scope(arena, node, "delegate", |k| {
            matches!(k, SymbolKind::Delegate(_))
        })
    }

    pub fn end_delegate_scope(&mut self) -> CompileResult<()> {
        self.end_container_scope("delegate")
    }

    pub fn begin_class_delegate_scope(
        &mut self,
        arena: &NodeArena,
        node: NodeIndex,
    ) -> CompileResult<SymbolId> {
        self.begin_container_scope(arena, node, "class delegate", |k| {
            matches!(k, SymbolKind::ClassDelegate(_))
        })
    }

    pub fn end_class_delegate_scope(&mut self) -> CompileResult<()> {
        self.end_container_scope("class delegate")
    }

    pub fn begin_concept_scope(&mut self, arena: &NodeArena, node: NodeIndex) -> CompileResult<SymbolId> {
        self.begin_container_scope(arena, node, "concept", |k| {
            matches!(k, SymbolKind::Concept(_))
        })
    }

    pub fn end_concept_scope(&mut self) -> CompileResult<()> {
        self.end_container_scope("concept")
    }

    pub fn begin_declaration_block(&mut self, arena: &NodeArena, node: NodeIndex) -> CompileResult<SymbolId> {
        self.begin_container_scope(arena, node, "declaration block", |k| {
            matches!(k, SymbolKind::DeclarationBlock)
        })
    }

    pub fn end_declaration_block(&mut self) -> CompileResult<()> {
        self.end_container_scope("declaration block")
    }

    /// Enter a container symbol directly, without an AST node. Used when
    /// declaring the members of template instances and when binding
    /// compiler-generated functions. An already linked scope keeps its
    /// parent.
    pub fn begin_symbol_scope(&mut self, symbol: SymbolId) -> CompileResult<()> {
        let scope = self.container_scope(symbol)?;
        let parent_scope = self.container_scope(self.current_container)?;
        if let Some(s) = self.scope_mut(scope)
            && s.parent.is_none()
        {
            s.parent = parent_scope;
        }
        self.container_stack.push(self.current_container);
        self.current_container = symbol;
        let (is_class, is_function) = {
            let sym = self.symbol(symbol)?;
            (sym.is_class(), sym.is_function())
        };
        if is_class {
            self.class_stack.push(self.current_class);
            self.current_class = symbol;
        } else if is_function {
            self.function_stack.push(self.current_function);
            self.current_function = symbol;
        }
        Ok(())
    }

    pub fn end_symbol_scope(&mut self) -> CompileResult<()> {
        let (is_class, is_function) = {
            let sym = self.symbol(self.current_container)?;
            (sym.is_class(), sym.is_function())
        };
        if is_class {
            self.current_class = self
                .class_stack
                .pop()
                .ok_or_else(|| CompileError::internal("class stack underflow"))?;
        } else if is_function {
            self.current_function = self
                .function_stack
                .pop()
                .ok_or_else(|| CompileError::internal("function stack underflow"))?;
        }
        self.end_container_scope("symbol")
    }

    fn begin_container_scope(
        &mut self,
        arena: &NodeArena,
        node: NodeIndex,
        what: &str,
        accept: fn(&SymbolKind) -> bool,
    ) -> CompileResult<SymbolId> {
        let symbol = self.symbol_for_node(node).ok_or_else(|| {
            CompileError::internal(format!(
                "{what} symbol for node {} not found; declaration pass has not run",
                node.0
            ))
        })?;
        if !accept(&self.symbol(symbol)?.kind) {
            return Err(CompileError::internal(format!(
                "symbol for node {} is not a {what}",
                node.0
            )));
        }
        if self.symbol(symbol)?.span.is_dummy() {
            let span = arena.span(node);
            self.symbol_mut(symbol)?.span = span;
        }
        let scope = self.container_scope(symbol)?;
        let parent_scope = self.container_scope(self.current_container)?;
        if let Some(s) = self.scope_mut(scope) {
            s.parent = parent_scope;
        }
        self.map_node_scope(node, scope);
        self.container_stack.push(self.current_container);
        self.current_container = symbol;
        trace!(what, node = node.0, "begin scope");
        Ok(symbol)
    }

    fn end_container_scope(&mut self, what: &str) -> CompileResult<()> {
        let previous = self.container_stack.pop().ok_or_else(|| {
            CompileError::internal(format!("end of {what} scope without matching begin"))
        })?;
        self.current_container = previous;
        Ok(())
    }

    /// Snapshot of the bracketing state, for unwinding after a failed
    /// nested pass.
    pub(crate) fn scope_mark(&self) -> ScopeMark {
        ScopeMark {
            containers: self.container_stack.len(),
            classes: self.class_stack.len(),
            functions: self.function_stack.len(),
            container: self.current_container,
            class: self.current_class,
            function: self.current_function,
        }
    }

    pub(crate) fn restore_scope_mark(&mut self, mark: ScopeMark) {
        self.container_stack.truncate(mark.containers);
        self.class_stack.truncate(mark.classes);
        self.function_stack.truncate(mark.functions);
        self.current_container = mark.container;
        self.current_class = mark.class;
        self.current_function = mark.function;
    }

    // =========================================================================
    // Node lookups
    // =========================================================================

    /// The function symbol created for a function-like node by the
    /// declaration pass.
    pub fn get_function_symbol(&self, node: NodeIndex) -> CompileResult<SymbolId> {
        match self.symbol_for_node(node) {
            Some(symbol) if self.symbol(symbol)?.is_function() => Ok(symbol),
            _ => Err(CompileError::internal(format!(
                "function symbol for node {} not found",
                node.0
            ))),
        }
    }

    /// The scope that opens at `node`, or at its nearest ancestor that opens
    /// one.
    pub fn get_container_scope(&self, arena: &NodeArena, node: NodeIndex) -> CompileResult<ScopeId> {
        let mut current = node;
        for _ in 0..limits::MAX_NODE_PARENT_WALK {
            if current.is_none() {
                break;
            }
            if let Some(scope) = self.scope_for_node(current) {
                return Ok(scope);
            }
            current = arena.parent(current);
        }
        Err(CompileError::internal(format!(
            "container scope for node {} not found",
            node.0
        )))
    }
}
