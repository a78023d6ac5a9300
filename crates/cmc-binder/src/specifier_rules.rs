//! Per-specifier validation of function declarations.
//!
//! Each specifier written on a function is checked against the shape of the
//! function and its class, then recorded on the symbol. Violations abort the
//! binding of that declaration.

use crate::access_levels::inline_parameter_error;
use crate::declaration_binder::FunctionContext;
use cmc_ast::Specifiers;
use cmc_common::{CompileError, CompileOptions, CompileResult};
use cmc_symbols::{Access, FunctionFlags, FunctionKind, SymbolFlags, SymbolTable};

/// Apply every specifier of the declaration, then check the combinations.
pub(crate) fn apply_specifiers(
    table: &mut SymbolTable,
    ctx: &FunctionContext,
    options: &CompileOptions,
) -> CompileResult<()> {
    let specifiers = ctx.specifiers;
    let rules = SpecifierRules { ctx };

    if specifiers.contains(Specifiers::STATIC) {
        rules.check_static()?;
        table.symbol_mut(ctx.function)?.flags |= SymbolFlags::STATIC;
    }
    if specifiers.contains(Specifiers::EXPLICIT) {
        rules.check_explicit()?;
        set_flag(table, ctx, FunctionFlags::EXPLICIT)?;
    }
    if specifiers.contains(Specifiers::EXTERNAL) {
        rules.check_external()?;
        table.symbol_mut(ctx.function)?.flags |= SymbolFlags::EXTERNAL;
    }
    if specifiers.contains(Specifiers::SUPPRESS) {
        rules.check_suppress()?;
        set_flag(table, ctx, FunctionFlags::SUPPRESSED)?;
    }
    if specifiers.contains(Specifiers::DEFAULT) {
        rules.check_default()?;
        set_flag(table, ctx, FunctionFlags::DEFAULT)?;
        if !specifiers.contains(Specifiers::THROW) {
            set_flag(table, ctx, FunctionFlags::NOTHROW)?;
        }
    }
    if specifiers.contains(Specifiers::INLINE) {
        rules.check_inline()?;
        set_flag(table, ctx, FunctionFlags::INLINE)?;
        if options.optimize {
            check_public_parameters(table, ctx)?;
            table.symbol_mut(ctx.function)?.flags |= SymbolFlags::REPLICATED;
        }
    }
    if specifiers.contains(Specifiers::CONSTEXPR) {
        rules.require_free("constexpr")?;
        set_flag(table, ctx, FunctionFlags::CONSTEXPR)?;
    }
    if specifiers.contains(Specifiers::CDECL) {
        rules.require_free("cdecl")?;
        set_flag(table, ctx, FunctionFlags::CDECL)?;
    }
    if specifiers.contains(Specifiers::NOTHROW) {
        set_flag(table, ctx, FunctionFlags::NOTHROW)?;
    }
    if specifiers.contains(Specifiers::THROW) {
        table.function_data_mut(ctx.function)?.flags -= FunctionFlags::NOTHROW;
    }
    if specifiers.contains(Specifiers::ABSTRACT) {
        rules.check_abstract()?;
        set_flag(table, ctx, FunctionFlags::ABSTRACT)?;
        set_class_virtual(table, ctx)?;
    }
    if specifiers.contains(Specifiers::VIRTUAL) {
        rules.check_virtual_like("virtual", "virtual")?;
        set_flag(table, ctx, FunctionFlags::VIRTUAL)?;
        set_class_virtual(table, ctx)?;
    }
    if specifiers.contains(Specifiers::OVERRIDE) {
        rules.check_virtual_like("declared override", "override")?;
        set_flag(table, ctx, FunctionFlags::OVERRIDE)?;
        set_class_virtual(table, ctx)?;
    }
    if specifiers.contains(Specifiers::NEW) {
        rules.check_new()?;
        set_flag(table, ctx, FunctionFlags::NEW)?;
    }
    rules.check_combinations()
}

fn set_flag(table: &mut SymbolTable, ctx: &FunctionContext, flag: FunctionFlags) -> CompileResult<()> {
    table.function_data_mut(ctx.function)?.flags |= flag;
    Ok(())
}

fn set_class_virtual(table: &mut SymbolTable, ctx: &FunctionContext) -> CompileResult<()> {
    if ctx.class.is_some() {
        table.symbol_mut(ctx.class)?.flags |= SymbolFlags::VIRTUAL;
    }
    Ok(())
}

/// Non-`this` parameter types of an inline function must be public when
/// optimizing, since its body may be replicated into other units.
fn check_public_parameters(table: &SymbolTable, ctx: &FunctionContext) -> CompileResult<()> {
    let name = table.full_name(ctx.function);
    for &parameter in &table.function_data(ctx.function)?.parameters {
        let symbol = table.symbol(parameter)?;
        if symbol.name == "this" {
            continue;
        }
        if let Some(type_id) = symbol.kind.value_type()
            && table.type_access(type_id) != Access::Public
        {
            return Err(inline_parameter_error(table, &name, type_id, ctx.span));
        }
    }
    Ok(())
}

struct SpecifierRules<'c> {
    ctx: &'c FunctionContext,
}

impl SpecifierRules<'_> {
    fn fail(&self, message: impl Into<String>) -> CompileResult<()> {
        Err(CompileError::specifier(message, self.ctx.span))
    }

    /// Violations that involve the class carry its span as well.
    fn fail_in_class(&self, message: impl Into<String>) -> CompileResult<()> {
        Err(CompileError::specifier(message, self.ctx.span).with_secondary(self.ctx.class_span))
    }

    fn is_member(&self) -> bool {
        self.ctx.kind.is_member()
    }

    fn check_static(&self) -> CompileResult<()> {
        if !self.is_member() {
            return self.fail("free functions cannot be static");
        }
        if self.ctx.kind == FunctionKind::Destructor {
            return self.fail("destructor cannot be static");
        }
        if !self.ctx.has_body {
            return self.fail("static functions must have body");
        }
        Ok(())
    }

    fn check_explicit(&self) -> CompileResult<()> {
        if self.ctx.kind != FunctionKind::Constructor {
            return self.fail("only constructors can be explicit");
        }
        if !self.ctx.member_of_template_type && !self.ctx.has_body {
            return self.fail("explicit constructors must have body");
        }
        if self.ctx.static_class {
            return self.fail_in_class("static classes cannot contain explicit constructors");
        }
        Ok(())
    }

    fn check_external(&self) -> CompileResult<()> {
        if self.is_member() {
            return self.fail("member functions cannot be external");
        }
        if self.ctx.has_body {
            return self.fail("external functions cannot have body");
        }
        Ok(())
    }

    fn check_suppress(&self) -> CompileResult<()> {
        if !self.is_member() {
            return self.fail("free functions cannot be suppressed");
        }
        match self.ctx.kind {
            FunctionKind::Destructor => {
                return Err(CompileError::special_member(
                    "destructor cannot be suppressed",
                    self.ctx.span,
                ));
            }
            FunctionKind::StaticConstructor => {
                return Err(CompileError::special_member(
                    "static constructor cannot be suppressed",
                    self.ctx.span,
                ));
            }
            _ => {}
        }
        if self.ctx.has_body {
            return self.fail("suppressed functions cannot have body");
        }
        if self.ctx.static_class {
            return self.fail_in_class("static classes cannot contain suppressed functions");
        }
        Ok(())
    }

    fn check_default(&self) -> CompileResult<()> {
        if !self.is_member() {
            return self.fail("free functions cannot be default");
        }
        if self.ctx.has_body {
            return self.fail("default functions cannot have body");
        }
        if self.ctx.kind == FunctionKind::StaticConstructor {
            return self.fail("static constructor cannot be default");
        }
        if self.ctx.static_class {
            return self.fail_in_class("static classes cannot contain default functions");
        }
        Ok(())
    }

    fn check_inline(&self) -> CompileResult<()> {
        if !self.ctx.member_of_template_type && !self.ctx.has_body {
            return self.fail("inline functions must have body");
        }
        Ok(())
    }

    fn require_free(&self, specifier: &str) -> CompileResult<()> {
        if self.is_member() {
            return self.fail(format!("member functions cannot be {specifier}"));
        }
        Ok(())
    }

    fn check_abstract(&self) -> CompileResult<()> {
        if !self.is_member() {
            return self.fail("free functions cannot be abstract");
        }
        match self.ctx.kind {
            FunctionKind::Constructor => return self.fail("constructor cannot be abstract"),
            FunctionKind::StaticConstructor => {
                return self.fail("static constructor cannot be abstract");
            }
            FunctionKind::Destructor => return self.fail("destructor cannot be abstract"),
            _ => {}
        }
        if self.ctx.static_class {
            return self.fail_in_class("static classes cannot contain abstract member functions");
        }
        if self.ctx.has_body {
            return self.fail("abstract functions cannot have body");
        }
        if self.ctx.class.is_some() && !self.ctx.abstract_class {
            return self
                .fail_in_class("class containing abstract member functions must be declared abstract");
        }
        Ok(())
    }

    /// `virtual` and `override`.
    fn check_virtual_like(&self, phrase: &str, word: &str) -> CompileResult<()> {
        if !self.is_member() {
            return self.fail(format!("free functions cannot be {phrase}"));
        }
        match self.ctx.kind {
            FunctionKind::Constructor => return self.fail(format!("constructor cannot be {phrase}")),
            FunctionKind::StaticConstructor => {
                return self.fail(format!("static constructor cannot be {phrase}"));
            }
            _ => {}
        }
        if self.ctx.static_class {
            return self.fail_in_class(format!("static classes cannot contain {word} member functions"));
        }
        Ok(())
    }

    fn check_new(&self) -> CompileResult<()> {
        if !self.is_member() {
            return self.fail("free functions cannot be declared new");
        }
        match self.ctx.kind {
            FunctionKind::Constructor => return self.fail("constructor cannot be declared new"),
            FunctionKind::StaticConstructor => {
                return self.fail("static constructor cannot be declared new");
            }
            FunctionKind::Destructor => return self.fail("destructor cannot be declared new"),
            _ => {}
        }
        if self.ctx.static_class {
            return self.fail_in_class("static classes cannot contain new member functions");
        }
        Ok(())
    }

    fn check_combinations(&self) -> CompileResult<()> {
        let specifiers = self.ctx.specifiers;
        let exclusive = [
            (Specifiers::ABSTRACT, Specifiers::VIRTUAL, "abstract", "virtual"),
            (Specifiers::ABSTRACT, Specifiers::OVERRIDE, "abstract", "override"),
            (Specifiers::VIRTUAL, Specifiers::OVERRIDE, "virtual", "override"),
            (Specifiers::NEW, Specifiers::ABSTRACT, "new", "abstract"),
            (Specifiers::NEW, Specifiers::VIRTUAL, "new", "virtual"),
            (Specifiers::NEW, Specifiers::OVERRIDE, "new", "override"),
        ];
        for (first, second, first_name, second_name) in exclusive {
            if specifiers.contains(first | second) {
                return self.fail(format!(
                    "function cannot be at the same time {first_name} and {second_name}"
                ));
            }
        }
        Ok(())
    }
}
