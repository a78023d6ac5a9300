//! Special member classification.
//!
//! Special members are recognized by shape: function kind, group name and
//! the types of the parameters after `this`. The first matching category
//! wins. Each class records one state per kind, so a second declaration of
//! the same special member is rejected.

use crate::declaration_binder::FunctionContext;
use cmc_ast::Derivations;
use cmc_common::{CompileError, CompileResult};
use cmc_symbols::{
    FunctionFlags, FunctionKind, SpecialMemberKind, SpecialMemberState, SymbolId, SymbolTable,
    TypeId, group_names,
};
use tracing::debug;

/// Parameter types of `function` after `this`.
pub(crate) fn explicit_parameter_types(
    table: &SymbolTable,
    function: SymbolId,
) -> CompileResult<Vec<TypeId>> {
    let data = table.function_data(function)?;
    let mut types = Vec::with_capacity(data.parameters.len());
    for &parameter in &data.parameters {
        let symbol = table.symbol(parameter)?;
        if symbol.name == "this" {
            continue;
        }
        types.push(symbol.kind.value_type().unwrap_or(TypeId::NONE));
    }
    Ok(types)
}

fn is_reference_to(table: &SymbolTable, type_id: TypeId, class_type: TypeId, derivations: Derivations) -> bool {
    let types = table.types();
    types.base_type(type_id) == class_type && types.derivations(type_id) == derivations
}

/// The special member `function` is for `class`, judged by shape alone.
pub fn special_member_kind(
    table: &SymbolTable,
    class: SymbolId,
    function: SymbolId,
) -> CompileResult<Option<SpecialMemberKind>> {
    let class_type = table.class_data(class)?.type_id;
    let data = table.function_data(function)?;
    let parameters = explicit_parameter_types(table, function)?;
    let single_reference = |derivations| {
        parameters.len() == 1 && is_reference_to(table, parameters[0], class_type, derivations)
    };
    let kind = match data.kind {
        FunctionKind::Constructor if parameters.is_empty() => {
            Some(SpecialMemberKind::DefaultConstructor)
        }
        FunctionKind::Constructor if single_reference(Derivations::CONST_REF) => {
            Some(SpecialMemberKind::CopyConstructor)
        }
        FunctionKind::Constructor if single_reference(Derivations::RVALUE_REF) => {
            Some(SpecialMemberKind::MoveConstructor)
        }
        FunctionKind::StaticConstructor => Some(SpecialMemberKind::StaticConstructor),
        FunctionKind::Member if data.group_name == group_names::ASSIGNMENT => {
            if single_reference(Derivations::CONST_REF) {
                Some(SpecialMemberKind::CopyAssignment)
            } else if single_reference(Derivations::RVALUE_REF) {
                Some(SpecialMemberKind::MoveAssignment)
            } else {
                None
            }
        }
        FunctionKind::Member
            if data.group_name == group_names::EQUAL && single_reference(Derivations::CONST_REF) =>
        {
            Some(SpecialMemberKind::OpEqual)
        }
        FunctionKind::Destructor => Some(SpecialMemberKind::Destructor),
        _ => None,
    };
    Ok(kind)
}

fn state_of(flags: FunctionFlags) -> SpecialMemberState {
    if flags.contains(FunctionFlags::SUPPRESSED) {
        SpecialMemberState::Suppressed
    } else if flags.contains(FunctionFlags::DEFAULT) {
        SpecialMemberState::Generate
    } else {
        SpecialMemberState::UserDefined
    }
}

/// Record the special-member role of a completed member function on its
/// class, and the equality role of a free `operator==` on the class of its
/// operands.
pub(crate) fn classify_function(table: &mut SymbolTable, ctx: &FunctionContext) -> CompileResult<()> {
    if ctx.class.is_none() {
        return classify_free_equality(table, ctx);
    }
    let (kind, flags) = {
        let data = table.function_data(ctx.function)?;
        (data.kind, data.flags)
    };
    let state = state_of(flags);
    let parameter_count = explicit_parameter_types(table, ctx.function)?.len();

    let special = special_member_kind(table, ctx.class, ctx.function)?;
    if ctx.static_class {
        let what = match special {
            Some(SpecialMemberKind::StaticConstructor) => None,
            Some(special) => Some(special.name()),
            None if kind == FunctionKind::Constructor => Some("constructor"),
            None => None,
        };
        if let Some(what) = what {
            return Err(CompileError::special_member(
                format!("static class cannot contain a user-defined {what}"),
                ctx.span,
            )
            .with_secondary(ctx.class_span));
        }
    }

    match special {
        Some(SpecialMemberKind::StaticConstructor) => {
            if state == SpecialMemberState::Suppressed {
                return Err(CompileError::special_member(
                    "static constructor cannot be suppressed",
                    ctx.span,
                ));
            }
            if parameter_count > 0 {
                return Err(CompileError::special_member(
                    "static constructor cannot have parameters",
                    ctx.span,
                ));
            }
            record(table, ctx, SpecialMemberKind::StaticConstructor, SpecialMemberState::UserDefined)
        }
        Some(SpecialMemberKind::Destructor) => {
            if state == SpecialMemberState::Suppressed {
                return Err(CompileError::special_member(
                    "destructor cannot be suppressed",
                    ctx.span,
                ));
            }
            record(table, ctx, SpecialMemberKind::Destructor, state)
        }
        Some(special) => {
            record(table, ctx, special, state)?;
            if kind == FunctionKind::Constructor && state == SpecialMemberState::UserDefined {
                table
                    .class_data_mut(ctx.class)?
                    .special_members
                    .has_user_defined_constructor = true;
            }
            Ok(())
        }
        None if kind == FunctionKind::Constructor => {
            if state != SpecialMemberState::UserDefined {
                return Err(not_special(table, ctx, state));
            }
            let converting = parameter_count == 1
                && !flags.contains(FunctionFlags::EXPLICIT)
                && !table.symbol(ctx.function)?.is_static();
            if converting {
                table.function_data_mut(ctx.function)?.flags |=
                    FunctionFlags::CONVERTING_CONSTRUCTOR;
                table.class_data_mut(ctx.class)?.conversions.push(ctx.function);
            }
            table
                .class_data_mut(ctx.class)?
                .special_members
                .has_user_defined_constructor = true;
            Ok(())
        }
        None if kind == FunctionKind::ConversionFunction => {
            table.function_data_mut(ctx.function)?.flags |= FunctionFlags::CONVERSION;
            table.class_data_mut(ctx.class)?.conversions.push(ctx.function);
            let name = crate::declaration_binder::compute_overload_name(table, ctx.function)?;
            table.function_data_mut(ctx.function)?.overload_name = name;
            Ok(())
        }
        None if state != SpecialMemberState::UserDefined => Err(not_special(table, ctx, state)),
        None => Ok(()),
    }
}

fn not_special(table: &SymbolTable, ctx: &FunctionContext, state: SpecialMemberState) -> CompileError {
    let word = if state == SpecialMemberState::Suppressed {
        "suppressed"
    } else {
        "default"
    };
    CompileError::specifier(
        format!(
            "function '{}' is not a special member function and cannot be {word}",
            table.full_name(ctx.function)
        ),
        ctx.span,
    )
}

fn record(
    table: &mut SymbolTable,
    ctx: &FunctionContext,
    kind: SpecialMemberKind,
    state: SpecialMemberState,
) -> CompileResult<()> {
    record_on_class(table, ctx.class, ctx.function, kind, state)
}

fn record_on_class(
    table: &mut SymbolTable,
    class: SymbolId,
    function: SymbolId,
    kind: SpecialMemberKind,
    state: SpecialMemberState,
) -> CompileResult<()> {
    let previous = table
        .class_data_mut(class)?
        .special_members
        .set(kind, state, function);
    if let Err(previous) = previous {
        let span = table.symbol(function)?.span;
        let previous_span = table.symbol(previous)?.span;
        return Err(CompileError::declaration(
            format!("{kind} of class '{}' already declared", table.full_name(class)),
            span,
        )
        .with_secondary(previous_span));
    }
    debug!(class = %table.full_name(class), %kind, ?state, "classified special member");
    Ok(())
}

/// `operator==(C, C)` outside the class counts as the user-defined equality
/// of `C`.
fn classify_free_equality(table: &mut SymbolTable, ctx: &FunctionContext) -> CompileResult<()> {
    let group_name = table.function_data(ctx.function)?.group_name.clone();
    if group_name != group_names::EQUAL {
        return Ok(());
    }
    let parameters = explicit_parameter_types(table, ctx.function)?;
    let [left, right] = parameters[..] else {
        return Ok(());
    };
    let types = table.types();
    let left_base = types.base_type(left);
    if left_base != types.base_type(right) {
        return Ok(());
    }
    let Some(class) = types.type_symbol(left_base) else {
        return Ok(());
    };
    if !table.symbol(class)?.is_class() {
        return Ok(());
    }
    record_on_class(
        table,
        class,
        ctx.function,
        SpecialMemberKind::OpEqual,
        SpecialMemberState::UserDefined,
    )
}
