//! Name lookup through container scopes.

use crate::scope::{ScopeId, ScopeLookup};
use crate::symbol::{SymbolId, SymbolKind};
use crate::symbol_table::SymbolTable;
use cmc_common::{CompileError, CompileResult, Span, limits};
use smallvec::SmallVec;
use tracing::{Level, span};

impl SymbolTable {
    /// Resolve `name` starting at `scope`.
    ///
    /// A dotted name resolves its first component with `policy` and each
    /// following component in the scope of the container found so far.
    /// A component that is not found yields `Ok(None)`; descending into a
    /// symbol that has no scope is a resolution error.
    pub fn lookup(
        &self,
        scope: ScopeId,
        name: &str,
        policy: ScopeLookup,
        span: Span,
    ) -> CompileResult<Option<SymbolId>> {
        let _span = span!(Level::TRACE, "lookup", name).entered();
        let mut components = name.split('.');
        let Some(first) = components.next() else {
            return Ok(None);
        };
        let Some(mut found) = self.lookup_simple(scope, first, policy, span)? else {
            return Ok(None);
        };
        for component in components {
            let Some(symbol) = self.get(found) else {
                return Ok(None);
            };
            if symbol.scope.is_none() {
                return Err(CompileError::resolution(
                    format!("'{}' is not a container", symbol.name),
                    span,
                ));
            }
            match self.lookup_local_or_base(symbol.scope, component)? {
                Some(next) => found = next,
                None => return Ok(None),
            }
        }
        Ok(Some(found))
    }

    /// Resolve an unqualified name according to `policy`.
    pub fn lookup_simple(
        &self,
        scope: ScopeId,
        name: &str,
        policy: ScopeLookup,
        span: Span,
    ) -> CompileResult<Option<SymbolId>> {
        let mut current = scope;
        let mut iterations = 0usize;
        while current.is_some() {
            iterations += 1;
            if iterations > limits::MAX_SCOPE_WALK_ITERATIONS {
                return Err(CompileError::internal(format!(
                    "scope walk for '{name}' exceeded {} iterations",
                    limits::MAX_SCOPE_WALK_ITERATIONS
                )));
            }
            let Some(container) = self.scope(current) else {
                break;
            };
            if policy.contains(ScopeLookup::THIS) {
                if let Some(found) = container.lookup_local(name) {
                    return Ok(Some(found));
                }
            }
            if policy.contains(ScopeLookup::BASE) {
                if let Some(found) = self.lookup_in_bases(current, name)? {
                    return Ok(Some(found));
                }
            }
            if !policy.contains(ScopeLookup::PARENT) {
                break;
            }
            current = container.parent;
        }
        if policy.contains(ScopeLookup::FILE) {
            return self.lookup_in_using_namespaces(name, span);
        }
        Ok(None)
    }

    /// Local lookup followed by the base-class chain.
    fn lookup_local_or_base(&self, scope: ScopeId, name: &str) -> CompileResult<Option<SymbolId>> {
        if let Some(found) = self.scope(scope).and_then(|s| s.lookup_local(name)) {
            return Ok(Some(found));
        }
        self.lookup_in_bases(scope, name)
    }

    fn lookup_in_bases(&self, scope: ScopeId, name: &str) -> CompileResult<Option<SymbolId>> {
        let mut base = self.scope(scope).map_or(ScopeId::NONE, |s| s.base);
        let mut depth = 0usize;
        while let Some(base_scope) = self.scope(base) {
            depth += 1;
            if depth > limits::MAX_BASE_CLASS_DEPTH {
                return Err(CompileError::internal(format!(
                    "base class chain deeper than {}",
                    limits::MAX_BASE_CLASS_DEPTH
                )));
            }
            if let Some(found) = base_scope.lookup_local(name) {
                return Ok(Some(found));
            }
            base = base_scope.base;
        }
        Ok(None)
    }

    fn lookup_in_using_namespaces(&self, name: &str, span: Span) -> CompileResult<Option<SymbolId>> {
        let global_scope = self.container_scope(self.global_namespace)?;
        let mut matches: SmallVec<[SymbolId; 2]> = SmallVec::new();
        for (namespace, using_span) in &self.using_namespaces {
            let ns = self.lookup(global_scope, namespace, ScopeLookup::THIS, *using_span)?;
            let Some(ns) = ns else {
                return Err(CompileError::resolution(
                    format!("namespace '{namespace}' not found"),
                    *using_span,
                ));
            };
            let ns_symbol = self.symbol(ns)?;
            if !ns_symbol.is_namespace() {
                return Err(CompileError::resolution(
                    format!("'{namespace}' is not a namespace"),
                    *using_span,
                ));
            }
            if let Some(found) = self.scope(ns_symbol.scope).and_then(|s| s.lookup_local(name)) {
                if !matches.contains(&found) {
                    matches.push(found);
                }
            }
        }
        match matches.len() {
            0 => Ok(None),
            1 => Ok(Some(matches[0])),
            _ => {
                let candidates: Vec<String> = matches.iter().map(|&m| self.full_name(m)).collect();
                Err(CompileError::resolution(
                    format!(
                        "reference to '{name}' is ambiguous: {}",
                        candidates.join(" or ")
                    ),
                    span,
                ))
            }
        }
    }

    /// Resolve a fully qualified name from the global namespace.
    pub fn lookup_global(&self, full_name: &str) -> CompileResult<Option<SymbolId>> {
        let global_scope = self.container_scope(self.global_namespace)?;
        self.lookup(global_scope, full_name, ScopeLookup::THIS, Span::DUMMY)
    }

    /// One representative function of the overload group named by a fully
    /// qualified group name such as `System.Runtime.Alloc`.
    pub fn get_overload(&self, full_group_name: &str) -> Option<SymbolId> {
        let (container, group) = match full_group_name.rsplit_once('.') {
            Some((path, group)) => (self.lookup_global(path).ok().flatten()?, group),
            None => (self.global_namespace, full_group_name),
        };
        let scope = self.get(container)?.scope;
        let group = self.scope(scope)?.lookup_local(group)?;
        match &self.get(group)?.kind {
            SymbolKind::FunctionGroup(data) => data.functions.first().copied(),
            _ => None,
        }
    }
}
