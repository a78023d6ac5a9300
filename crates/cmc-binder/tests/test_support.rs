//! Shared fixtures for the binder tests.

use crate::{BoundCompileUnit, BoundFunction, Binder, bind_declarations};
use cmc_ast::{FunctionData, NodeArena, NodeIndex, NodeKind, Specifiers};
use cmc_common::{CompileOptions, CompileResult, Diagnostic};
use cmc_symbols::{SymbolId, SymbolTable, declare_compile_unit};

/// Run the declaration pass over `root`.
pub(crate) fn declare(arena: &NodeArena, root: NodeIndex) -> CompileResult<SymbolTable> {
    let mut table = SymbolTable::new();
    table.begin_compile_unit(arena.file());
    declare_compile_unit(&mut table, arena, root)?;
    Ok(table)
}

/// Declaration pass plus declaration binder.
pub(crate) fn complete_with(
    arena: &NodeArena,
    root: NodeIndex,
    options: &CompileOptions,
) -> CompileResult<(SymbolTable, Vec<Diagnostic>)> {
    let mut table = declare(arena, root)?;
    let warnings = bind_declarations(&mut table, arena, root, options)?;
    Ok((table, warnings))
}

pub(crate) fn complete(arena: &NodeArena, root: NodeIndex) -> CompileResult<SymbolTable> {
    complete_with(arena, root, &CompileOptions::default()).map(|(table, _)| table)
}

/// Every pass up to and including the statement binder.
pub(crate) fn bind(arena: &NodeArena, root: NodeIndex) -> CompileResult<(SymbolTable, BoundCompileUnit)> {
    let options = CompileOptions::default();
    let (mut table, _) = complete_with(arena, root, &options)?;
    let unit = Binder::new(arena, &mut table, &options).bind(root)?;
    Ok((table, unit))
}

pub(crate) fn function(
    arena: &mut NodeArena,
    name: &str,
    specifiers: Specifiers,
    return_type: Option<&str>,
    body: Vec<NodeIndex>,
) -> NodeIndex {
    let mut data = FunctionData::new(name).specifiers(specifiers);
    if let Some(return_type) = return_type {
        let ty = arena.add_type_name(return_type);
        data = data.returns(ty);
    }
    let body = arena.add_block(body);
    arena.add_function(NodeKind::Function, data.body(body))
}

pub(crate) fn int_parameter(arena: &mut NodeArena, name: &str) -> NodeIndex {
    let ty = arena.add_type_name("int");
    arena.add_parameter(name, ty)
}

pub(crate) fn member_variable(arena: &mut NodeArena, name: &str, type_name: &str) -> NodeIndex {
    let ty = arena.add_type_name(type_name);
    arena.add_member_variable(name, Specifiers::PUBLIC, ty)
}

pub(crate) fn symbol(table: &SymbolTable, full_name: &str) -> SymbolId {
    table
        .lookup_global(full_name)
        .expect("lookup")
        .unwrap_or_else(|| panic!("{full_name} not declared"))
}

/// Names of the top-level statements of a bound body.
pub(crate) fn statement_names(function: &BoundFunction) -> Vec<&'static str> {
    function.statements().iter().map(|s| s.name()).collect()
}
