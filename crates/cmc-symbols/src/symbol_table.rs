//! The symbol table.
//!
//! Owns the symbol arena, the container scopes and the type repository,
//! assigns stable ids, and keeps the AST-node ↔ symbol indices for the
//! compile unit currently being bound. Scope bracketing, member creation,
//! lookup, templates, vtables and module images are split across the
//! `table_*.rs`, `templates.rs`, `vtable.rs` and `module_image.rs` files.

use crate::class::ClassTypeData;
use crate::class_ids::ClassIdMap;
use crate::function::FunctionSymbolData;
use crate::scope::{ContainerScope, ScopeId};
use crate::symbol::{
    Access, Cid, Sid, Symbol, SymbolArena, SymbolFlags, SymbolId, SymbolKind,
};
use crate::types::{TypeId, TypeKind, TypeRepository};
use cmc_ast::{NodeIndex, RefKind};
use cmc_common::{CompileError, CompileResult, FileId, Span};
use rustc_hash::FxHashMap;
use std::fmt;
use tracing::debug;

pub struct SymbolTable {
    pub(crate) symbols: SymbolArena,
    pub(crate) scopes: Vec<ContainerScope>,
    pub(crate) types: TypeRepository,
    pub(crate) global_namespace: SymbolId,

    next_sid: u32,
    sid_index: FxHashMap<Sid, SymbolId>,

    // Class ids
    next_cid: u64,
    /// Persisted name → cid map consulted before allocating.
    persisted_class_ids: ClassIdMap,
    /// Every cid assigned in this table, by class full name.
    assigned_class_ids: ClassIdMap,
    classes_by_cid: FxHashMap<Cid, SymbolId>,

    // Per-unit AST indices
    pub(crate) current_file: FileId,
    pub(crate) node_symbols: FxHashMap<NodeIndex, SymbolId>,
    pub(crate) symbol_nodes: FxHashMap<SymbolId, NodeIndex>,
    pub(crate) node_scopes: FxHashMap<NodeIndex, ScopeId>,
    pub(crate) using_namespaces: Vec<(String, Span)>,

    // Scope bracketing state
    pub(crate) container_stack: Vec<SymbolId>,
    pub(crate) current_container: SymbolId,
    pub(crate) class_stack: Vec<SymbolId>,
    pub(crate) current_class: SymbolId,
    pub(crate) function_stack: Vec<SymbolId>,
    pub(crate) current_function: SymbolId,
    /// Nonzero while declaring the members of a template instance.
    pub(crate) instantiating: u32,
}

impl fmt::Debug for SymbolTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymbolTable")
            .field("symbols", &self.symbols.len())
            .field("scopes", &self.scopes.len())
            .field("next_sid", &self.next_sid)
            .field("next_cid", &self.next_cid)
            .field("current_file", &self.current_file)
            .finish_non_exhaustive()
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> SymbolTable {
        Self::with_sid_base(1)
    }

    /// Start sid allocation at `base`, so that separately compiled modules
    /// can occupy disjoint sid ranges.
    pub fn with_sid_base(base: u32) -> SymbolTable {
        let mut table = SymbolTable {
            symbols: SymbolArena::new(),
            scopes: Vec::new(),
            types: TypeRepository::new(),
            global_namespace: SymbolId::NONE,
            next_sid: base,
            sid_index: FxHashMap::default(),
            next_cid: 1,
            persisted_class_ids: ClassIdMap::new(),
            assigned_class_ids: ClassIdMap::new(),
            classes_by_cid: FxHashMap::default(),
            current_file: FileId::default(),
            node_symbols: FxHashMap::default(),
            symbol_nodes: FxHashMap::default(),
            node_scopes: FxHashMap::default(),
            using_namespaces: Vec::new(),
            container_stack: Vec::new(),
            current_container: SymbolId::NONE,
            class_stack: Vec::new(),
            current_class: SymbolId::NONE,
            function_stack: Vec::new(),
            current_function: SymbolId::NONE,
            instantiating: 0,
        };
        let global = table.new_symbol(String::new(), Span::DUMMY, SymbolKind::Namespace);
        if let Some(symbol) = table.symbols.get_mut(global) {
            symbol.access = Access::Public;
        }
        table.global_namespace = global;
        table.current_container = global;
        table
    }

    #[inline]
    pub fn global_namespace(&self) -> SymbolId {
        self.global_namespace
    }

    #[inline]
    pub fn symbols(&self) -> &SymbolArena {
        &self.symbols
    }

    #[inline]
    pub fn types(&self) -> &TypeRepository {
        &self.types
    }

    #[inline]
    pub fn types_mut(&mut self) -> &mut TypeRepository {
        &mut self.types
    }

    #[inline]
    pub fn get(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(id)
    }

    #[inline]
    pub fn get_mut(&mut self, id: SymbolId) -> Option<&mut Symbol> {
        self.symbols.get_mut(id)
    }

    /// Like `get`, but a miss is an internal error.
    pub fn symbol(&self, id: SymbolId) -> CompileResult<&Symbol> {
        self.symbols
            .get(id)
            .ok_or_else(|| CompileError::internal(format!("symbol {} not found", id.0)))
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> CompileResult<&mut Symbol> {
        self.symbols
            .get_mut(id)
            .ok_or_else(|| CompileError::internal(format!("symbol {} not found", id.0)))
    }

    pub fn class_data(&self, id: SymbolId) -> CompileResult<&ClassTypeData> {
        self.symbol(id)?
            .class_data()
            .ok_or_else(|| CompileError::internal(format!("symbol {} is not a class", id.0)))
    }

    pub fn class_data_mut(&mut self, id: SymbolId) -> CompileResult<&mut ClassTypeData> {
        self.symbol_mut(id)?
            .class_data_mut()
            .ok_or_else(|| CompileError::internal(format!("symbol {} is not a class", id.0)))
    }

    pub fn function_data(&self, id: SymbolId) -> CompileResult<&FunctionSymbolData> {
        self.symbol(id)?
            .function_data()
            .ok_or_else(|| CompileError::internal(format!("symbol {} is not a function", id.0)))
    }

    pub fn function_data_mut(&mut self, id: SymbolId) -> CompileResult<&mut FunctionSymbolData> {
        self.symbol_mut(id)?
            .function_data_mut()
            .ok_or_else(|| CompileError::internal(format!("symbol {} is not a function", id.0)))
    }

    #[inline]
    pub fn scope(&self, id: ScopeId) -> Option<&ContainerScope> {
        if id.is_none() {
            None
        } else {
            self.scopes.get(id.0 as usize)
        }
    }

    #[inline]
    pub fn scope_mut(&mut self, id: ScopeId) -> Option<&mut ContainerScope> {
        if id.is_none() {
            None
        } else {
            self.scopes.get_mut(id.0 as usize)
        }
    }

    /// The scope owned by a container symbol.
    pub fn container_scope(&self, id: SymbolId) -> CompileResult<ScopeId> {
        let symbol = self.symbol(id)?;
        if symbol.scope.is_none() {
            return Err(CompileError::internal(format!(
                "{} '{}' has no container scope",
                symbol.kind, symbol.name
            )));
        }
        Ok(symbol.scope)
    }

    // =========================================================================
    // Symbol creation
    // =========================================================================

    /// Allocate a symbol with a fresh sid. Containers get a scope; the symbol
    /// is not yet linked to any parent.
    pub fn new_symbol(&mut self, name: String, span: Span, kind: SymbolKind) -> SymbolId {
        let sid = self.allocate_sid();
        self.new_symbol_with_sid(sid, name, span, kind)
    }

    pub(crate) fn new_symbol_with_sid(
        &mut self,
        sid: Sid,
        name: String,
        span: Span,
        kind: SymbolKind,
    ) -> SymbolId {
        let is_container = kind.is_container();
        let id = self.symbols.alloc(sid, name, span, kind);
        self.sid_index.insert(sid, id);
        if is_container {
            let scope = ScopeId(self.scopes.len() as u32);
            self.scopes.push(ContainerScope::new(id));
            if let Some(symbol) = self.symbols.get_mut(id) {
                symbol.scope = scope;
            }
        }
        id
    }

    fn allocate_sid(&mut self) -> Sid {
        while self.sid_index.contains_key(&Sid(self.next_sid)) {
            self.next_sid += 1;
        }
        let sid = Sid(self.next_sid);
        self.next_sid += 1;
        sid
    }

    /// Make sure fresh sids are allocated past `sid`.
    pub(crate) fn ensure_sid_above(&mut self, sid: Sid) {
        if self.next_sid <= sid.0 {
            self.next_sid = sid.0 + 1;
        }
    }

    pub fn symbol_by_sid(&self, sid: Sid) -> Option<SymbolId> {
        self.sid_index.get(&sid).copied()
    }

    /// Link `child` under `parent` and install it in the parent's scope.
    ///
    /// Functions are installed through their overload group by `add_function`
    /// and only become children here. A name clash with an existing symbol is
    /// a declaration error citing both spans.
    pub fn add_child(&mut self, parent: SymbolId, child: SymbolId) -> CompileResult<()> {
        let (name, span, is_function, is_unnamed) = {
            let symbol = self.symbol(child)?;
            (
                symbol.name.clone(),
                symbol.span,
                symbol.is_function(),
                symbol.name.is_empty() || matches!(symbol.kind, SymbolKind::DeclarationBlock),
            )
        };
        if !is_function && !is_unnamed {
            let scope = self.container_scope(parent)?;
            let installed = self
                .scope_mut(scope)
                .map(|s| s.install(&name, child))
                .unwrap_or(Ok(()));
            if let Err(existing) = installed {
                let previous = self.symbol(existing)?.span;
                return Err(CompileError::declaration(
                    format!("symbol '{name}' already defined"),
                    span,
                )
                .with_secondary(previous));
            }
        }
        self.symbol_mut(child)?.parent = parent;
        self.symbol_mut(parent)?.children.push(child);
        Ok(())
    }

    // =========================================================================
    // Names
    // =========================================================================

    /// Dotted name from the global namespace, e.g. `N.Foo.Bar`.
    pub fn full_name(&self, id: SymbolId) -> String {
        let mut parts = Vec::new();
        let mut current = id;
        let mut steps = 0usize;
        while let Some(symbol) = self.symbols.get(current) {
            if !symbol.name.is_empty() && !matches!(symbol.kind, SymbolKind::DeclarationBlock) {
                parts.push(symbol.name.as_str());
            }
            current = symbol.parent;
            steps += 1;
            if steps > cmc_common::limits::MAX_SCOPE_WALK_ITERATIONS {
                break;
            }
        }
        parts.reverse();
        parts.join(".")
    }

    /// Source-like rendering of a type, e.g. `const N.Foo&`.
    pub fn type_name(&self, id: TypeId) -> String {
        match self.types.get(id) {
            None => "void".to_string(),
            Some(TypeKind::Basic(basic)) => basic.name().to_string(),
            Some(TypeKind::Symbol(symbol)) => self.symbol_type_name(*symbol),
            Some(TypeKind::Derived { base, derivations }) => {
                let mut out = String::new();
                if derivations.is_const {
                    out.push_str("const ");
                }
                out.push_str(&self.type_name(*base));
                for _ in 0..derivations.pointers {
                    out.push('*');
                }
                match derivations.reference {
                    RefKind::None => {}
                    RefKind::LValue => out.push('&'),
                    RefKind::RValue => out.push_str("&&"),
                }
                out
            }
        }
    }

    fn symbol_type_name(&self, symbol: SymbolId) -> String {
        let Some(sym) = self.symbols.get(symbol) else {
            return "<unknown>".to_string();
        };
        match &sym.kind {
            SymbolKind::Class(data) if data.is_template_instance() => {
                let primary = self.full_name(data.primary_template);
                let args: Vec<String> = data
                    .template_arguments
                    .iter()
                    .map(|&a| self.type_name(a))
                    .collect();
                format!("{primary}<{}>", args.join(", "))
            }
            SymbolKind::TemplateParameter(_) => sym.name.clone(),
            _ => self.full_name(symbol),
        }
    }

    // =========================================================================
    // Class ids
    // =========================================================================

    /// Install the persisted name → cid map consulted by `assign_cid`.
    pub fn set_class_id_map(&mut self, map: ClassIdMap) {
        if let Some(max) = map.max_cid() {
            self.next_cid = self.next_cid.max(max.0 + 1);
        }
        self.persisted_class_ids = map;
    }

    /// Add entries to the persisted map; existing names keep their cid.
    pub fn merge_class_id_map(&mut self, map: &ClassIdMap) {
        if let Some(max) = map.max_cid() {
            self.next_cid = self.next_cid.max(max.0 + 1);
        }
        self.persisted_class_ids.merge(map);
    }

    /// Every cid assigned in this table, keyed by class full name.
    pub fn class_id_map(&self) -> &ClassIdMap {
        &self.assigned_class_ids
    }

    /// Assign a cid to `class`: the persisted one if its full name is in the
    /// map, otherwise a fresh one.
    ///
    /// A persisted cid already held by another class is a serialization
    /// error; the existing assignment is left untouched.
    pub fn assign_cid(&mut self, class: SymbolId) -> CompileResult<Cid> {
        if let Some(cid) = self.class_data(class)?.cid {
            return Ok(cid);
        }
        let full_name = self.class_key(class);
        let cid = match self.persisted_class_ids.get(&full_name) {
            Some(cid) => {
                if let Some(&holder) = self.classes_by_cid.get(&cid)
                    && holder != class
                {
                    return Err(CompileError::serialization(format!(
                        "class id {} of '{full_name}' is already assigned to '{}'",
                        cid.0,
                        self.class_key(holder)
                    )));
                }
                cid
            }
            None => {
                while self.classes_by_cid.contains_key(&Cid(self.next_cid))
                    || self.persisted_class_ids.contains_cid(Cid(self.next_cid))
                {
                    self.next_cid += 1;
                }
                let cid = Cid(self.next_cid);
                self.next_cid += 1;
                cid
            }
        };
        self.class_data_mut(class)?.cid = Some(cid);
        self.classes_by_cid.insert(cid, class);
        self.assigned_class_ids.insert(full_name.clone(), cid);
        debug!(class = %full_name, cid = cid.0, "assigned class id");
        Ok(cid)
    }

    /// Name under which a class's cid is persisted: the full name, with
    /// template arguments for instances.
    pub fn class_key(&self, class: SymbolId) -> String {
        match self.class_data(class) {
            Ok(data) if data.is_template_instance() => self.symbol_type_name(class),
            _ => self.full_name(class),
        }
    }

    pub fn class_by_cid(&self, cid: Cid) -> Option<SymbolId> {
        self.classes_by_cid.get(&cid).copied()
    }

    // =========================================================================
    // Per-unit AST indices
    // =========================================================================

    /// Start a new compile unit: the AST-node indices and `using` list of
    /// the previous unit are dropped. Symbols persist.
    pub fn begin_compile_unit(&mut self, file: FileId) {
        self.current_file = file;
        self.node_symbols.clear();
        self.symbol_nodes.clear();
        self.node_scopes.clear();
        self.using_namespaces.clear();
        self.container_stack.clear();
        self.class_stack.clear();
        self.function_stack.clear();
        self.current_container = self.global_namespace;
        self.current_class = SymbolId::NONE;
        self.current_function = SymbolId::NONE;
    }

    #[inline]
    pub fn current_file(&self) -> FileId {
        self.current_file
    }

    pub fn map_node(&mut self, node: NodeIndex, symbol: SymbolId) {
        self.node_symbols.insert(node, symbol);
        self.symbol_nodes.insert(symbol, node);
    }

    /// Record only the symbol → node direction; used for template instance
    /// members, whose nodes stay mapped to the template's own symbols.
    pub fn map_symbol_node(&mut self, symbol: SymbolId, node: NodeIndex) {
        self.symbol_nodes.insert(symbol, node);
    }

    /// Associate a declaration node with the symbol created for it. While a
    /// template is being instantiated only the symbol → node direction is
    /// recorded.
    pub(crate) fn link_node(&mut self, node: NodeIndex, symbol: SymbolId) {
        if self.instantiating == 0 {
            self.map_node(node, symbol);
        } else {
            self.map_symbol_node(symbol, node);
        }
    }

    pub fn map_node_scope(&mut self, node: NodeIndex, scope: ScopeId) {
        self.node_scopes.insert(node, scope);
    }

    pub fn symbol_for_node(&self, node: NodeIndex) -> Option<SymbolId> {
        self.node_symbols.get(&node).copied()
    }

    pub fn node_for_symbol(&self, symbol: SymbolId) -> NodeIndex {
        self.symbol_nodes
            .get(&symbol)
            .copied()
            .unwrap_or(NodeIndex::NONE)
    }

    pub fn scope_for_node(&self, node: NodeIndex) -> Option<ScopeId> {
        self.node_scopes.get(&node).copied()
    }

    pub fn add_using_namespace(&mut self, namespace: &str, span: Span) {
        self.using_namespaces.push((namespace.to_string(), span));
    }

    // =========================================================================
    // Bracketing state
    // =========================================================================

    #[inline]
    pub fn current_container(&self) -> SymbolId {
        self.current_container
    }

    #[inline]
    pub fn current_class(&self) -> SymbolId {
        self.current_class
    }

    #[inline]
    pub fn current_function(&self) -> SymbolId {
        self.current_function
    }

    /// Nearest enclosing class of `symbol`, including itself.
    pub fn enclosing_class(&self, symbol: SymbolId) -> SymbolId {
        let mut current = symbol;
        let mut steps = 0usize;
        while let Some(sym) = self.symbols.get(current) {
            if sym.is_class() {
                return current;
            }
            current = sym.parent;
            steps += 1;
            if steps > cmc_common::limits::MAX_SCOPE_WALK_ITERATIONS {
                break;
            }
        }
        SymbolId::NONE
    }

    /// Has the symbol been created by Import?
    pub fn is_imported(&self, symbol: SymbolId) -> bool {
        self.symbols
            .get(symbol)
            .is_some_and(|s| s.flags.contains(SymbolFlags::IMPORTED))
    }
}
