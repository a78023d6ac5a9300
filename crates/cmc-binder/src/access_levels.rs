//! Accessibility of function signatures.

use cmc_common::{CompileError, CompileOptions, CompileResult, Span, limits};
use cmc_symbols::{Access, FunctionFlags, SymbolId, SymbolKind, SymbolTable, TypeId};

/// Fail when the return type or a parameter type of `function` is less
/// accessible than the function itself. When optimizing, parameter types of
/// inline functions must be public.
///
/// Members of class templates and function template specializations are
/// checked per instantiation instead.
pub fn check_function_access_levels(
    table: &SymbolTable,
    function: SymbolId,
    options: &CompileOptions,
) -> CompileResult<()> {
    let data = table.function_data(function)?;
    if data.has(FunctionFlags::MEMBER_OF_CLASS_TEMPLATE)
        || data.has(FunctionFlags::TEMPLATE_SPECIALIZATION)
    {
        return Ok(());
    }
    let symbol = table.symbol(function)?;
    let access = effective_access(table, function)?;
    let name = table.full_name(function);

    if let Some(return_type) = data.return_type
        && table.type_access(return_type) < access
    {
        return Err(CompileError::accessibility(
            format!(
                "return type '{}' of function '{name}' is less accessible than the function",
                table.type_name(return_type)
            ),
            symbol.span,
        ));
    }

    let inline_when_optimizing = options.optimize && data.has(FunctionFlags::INLINE);
    for &parameter in &data.parameters {
        let param = table.symbol(parameter)?;
        if param.name == "this" {
            continue;
        }
        let Some(type_id) = param.kind.value_type() else {
            continue;
        };
        let type_access = table.type_access(type_id);
        if type_access < access {
            return Err(CompileError::accessibility(
                format!(
                    "parameter type '{}' of function '{name}' is less accessible than the function",
                    table.type_name(type_id)
                ),
                param.span,
            )
            .with_secondary(symbol.span));
        }
        if inline_when_optimizing && type_access != Access::Public {
            return Err(inline_parameter_error(table, &name, type_id, symbol.span));
        }
    }
    Ok(())
}

pub(crate) fn inline_parameter_error(
    table: &SymbolTable,
    function_name: &str,
    type_id: TypeId,
    span: Span,
) -> CompileError {
    CompileError::accessibility(
        format!(
            "parameter type '{}' of inline function '{function_name}' must be public when optimizing",
            table.type_name(type_id)
        ),
        span,
    )
}

/// Access of a symbol as seen from outside: the minimum over the symbol and
/// its enclosing types.
pub fn effective_access(table: &SymbolTable, symbol: SymbolId) -> CompileResult<Access> {
    let mut access = table.symbol(symbol)?.access;
    let mut current = table.symbol(symbol)?.parent;
    for _ in 0..limits::MAX_SCOPE_WALK_ITERATIONS {
        let Some(container) = table.get(current) else {
            return Ok(access);
        };
        if matches!(
            container.kind,
            SymbolKind::Class(_) | SymbolKind::Interface(_)
        ) {
            access = access.min(container.access);
        }
        current = container.parent;
    }
    Err(CompileError::internal("symbol parent chain does not end"))
}
