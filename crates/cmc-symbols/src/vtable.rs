//! Virtual table layout.
//!
//! A class's vtable starts as a copy of its base class's table. Each
//! virtual, abstract or overriding member (and the destructor of a virtual
//! class) either replaces the base slot with the same group name and
//! parameter types or is appended as a new slot.

use crate::class::ClassFlags;
use crate::function::{FunctionFlags, FunctionKind};
use crate::symbol::{SymbolFlags, SymbolId, SymbolKind};
use crate::symbol_table::SymbolTable;
use cmc_common::{CompileError, CompileResult, limits};
use tracing::{debug, trace};

impl SymbolTable {
    /// Lay out the vtable of `class`, initialising its base class first.
    pub fn init_vtable(&mut self, class: SymbolId) -> CompileResult<()> {
        self.init_vtable_at_depth(class, 0)
    }

    fn init_vtable_at_depth(&mut self, class: SymbolId, depth: usize) -> CompileResult<()> {
        if depth > limits::MAX_BASE_CLASS_DEPTH {
            return Err(CompileError::internal(format!(
                "base class chain deeper than {}",
                limits::MAX_BASE_CLASS_DEPTH
            )));
        }
        let base = {
            let data = self.class_data(class)?;
            if data.flags.contains(ClassFlags::VTABLE_INITIALIZED) {
                return Ok(());
            }
            data.base_class
        };
        self.class_data_mut(class)?.flags |= ClassFlags::VTABLE_INITIALIZED;

        let mut vtable = Vec::new();
        let mut virtual_class = self.symbol(class)?.has_flag(SymbolFlags::VIRTUAL);
        if base.is_some() {
            self.init_vtable_at_depth(base, depth + 1)?;
            vtable = self.class_data(base)?.vtable.clone();
            virtual_class |= self.symbol(base)?.has_flag(SymbolFlags::VIRTUAL);
        }

        let candidates = self.vtable_candidates(class, virtual_class)?;
        for function in candidates {
            let slot = vtable
                .iter()
                .position(|&existing| self.same_override_signature(existing, function));
            match slot {
                Some(index) => {
                    let overridden = vtable[index];
                    self.check_override(function, overridden)?;
                    vtable[index] = function;
                    self.link_override(function, overridden, index)?;
                }
                None => {
                    let data = self.function_data(function)?;
                    if data.has(FunctionFlags::OVERRIDE) {
                        return Err(CompileError::specifier(
                            format!(
                                "no suitable function to override found for '{}'",
                                self.full_name(function)
                            ),
                            self.symbol(function)?.span,
                        ));
                    }
                    self.function_data_mut(function)?.vtbl_index = vtable.len() as i32;
                    vtable.push(function);
                }
            }
        }

        if !vtable.is_empty() {
            virtual_class = true;
        }
        if virtual_class {
            self.symbol_mut(class)?.flags |= SymbolFlags::VIRTUAL;
        }
        debug!(class = %self.full_name(class), slots = vtable.len(), "initialized vtable");
        self.class_data_mut(class)?.vtable = vtable;
        Ok(())
    }

    /// Member functions of `class` that occupy a vtable slot, in declaration
    /// order.
    fn vtable_candidates(&self, class: SymbolId, virtual_class: bool) -> CompileResult<Vec<SymbolId>> {
        let mut candidates = Vec::new();
        for &child in &self.symbol(class)?.children {
            let symbol = self.symbol(child)?;
            let SymbolKind::Function(data) = &symbol.kind else {
                continue;
            };
            if symbol.is_static() {
                continue;
            }
            let takes_slot = data.is_virtual_abstract_or_override()
                || (data.kind == FunctionKind::Destructor && virtual_class);
            if takes_slot {
                candidates.push(child);
            }
        }
        Ok(candidates)
    }

    /// Same group name and the same parameter types after `this`.
    pub fn same_override_signature(&self, left: SymbolId, right: SymbolId) -> bool {
        let (Some(l), Some(r)) = (
            self.get(left).and_then(|s| s.function_data()),
            self.get(right).and_then(|s| s.function_data()),
        ) else {
            return false;
        };
        if l.group_name != r.group_name || l.parameters.len() != r.parameters.len() {
            return false;
        }
        let parameter_type = |p: SymbolId| self.get(p).and_then(|s| s.kind.value_type());
        l.parameters
            .iter()
            .zip(&r.parameters)
            .skip(1)
            .all(|(&a, &b)| parameter_type(a) == parameter_type(b))
    }

    fn check_override(&self, function: SymbolId, overridden: SymbolId) -> CompileResult<()> {
        let data = self.function_data(function)?;
        if data.kind == FunctionKind::Destructor {
            return Ok(());
        }
        if data.has(FunctionFlags::VIRTUAL) {
            return Err(CompileError::specifier(
                format!(
                    "function '{}' overrides base class function '{}'; use the 'override' specifier",
                    self.full_name(function),
                    self.full_name(overridden)
                ),
                self.symbol(function)?.span,
            )
            .with_secondary(self.symbol(overridden)?.span));
        }
        Ok(())
    }

    /// Record that `function` overrides `overridden` in slot `index` and add
    /// it to the override set of every function up the overridden chain.
    fn link_override(&mut self, function: SymbolId, overridden: SymbolId, index: usize) -> CompileResult<()> {
        {
            let data = self.function_data_mut(function)?;
            data.vtbl_index = index as i32;
            data.overridden = overridden;
        }
        let mut current = overridden;
        let mut steps = 0usize;
        while current.is_some() {
            steps += 1;
            if steps > limits::MAX_BASE_CLASS_DEPTH {
                return Err(CompileError::internal("override chain deeper than the base class chain"));
            }
            let data = self.function_data_mut(current)?;
            if !data.override_set.contains(&function) {
                data.override_set.push(function);
            }
            current = data.overridden;
        }
        trace!(function = function.0, overridden = overridden.0, index, "linked override");
        Ok(())
    }
}
