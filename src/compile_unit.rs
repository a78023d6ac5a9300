//! Compile-unit driver.
//!
//! Sequences the passes over one unit (declaration pass, declaration
//! binder, statement binder) and applies the reporting policy over a whole
//! program: batch builds stop at the first error, IDE builds keep going and
//! collect everything into one [`DiagnosticReport`].

use cmc_ast::{NodeArena, NodeIndex};
use cmc_binder::{Binder, BoundCompileUnit, bind_declarations};
use cmc_common::{CompileOptions, CompileResult, Diagnostic, DiagnosticReport};
use cmc_symbols::{SymbolTable, declare_compile_unit};
use tracing::{debug, instrument, warn};

/// Output of binding a single compile unit.
#[derive(Debug)]
pub struct BoundUnit {
    pub unit: BoundCompileUnit,
    pub warnings: Vec<Diagnostic>,
}

/// One parsed compile unit handed to [`bind_program`].
#[derive(Clone, Copy, Debug)]
pub struct SourceUnit<'a> {
    pub arena: &'a NodeArena,
    pub root: NodeIndex,
}

impl<'a> SourceUnit<'a> {
    pub fn new(arena: &'a NodeArena, root: NodeIndex) -> SourceUnit<'a> {
        SourceUnit { arena, root }
    }
}

#[derive(Debug, Default)]
pub struct ProgramOutput {
    /// Units that bound without error, in input order.
    pub units: Vec<BoundCompileUnit>,
    pub report: DiagnosticReport,
}

#[instrument(level = "debug", skip_all, fields(file = arena.file().0))]
pub fn bind_compile_unit(
    arena: &NodeArena,
    root: NodeIndex,
    table: &mut SymbolTable,
    options: &CompileOptions,
) -> CompileResult<BoundUnit> {
    table.begin_compile_unit(arena.file());
    declare_compile_unit(table, arena, root)?;
    let warnings = bind_declarations(table, arena, root, options)?;
    let unit = Binder::new(arena, table, options).bind(root)?;
    debug!(
        file = %unit.file_name,
        nodes = unit.nodes.len(),
        warnings = warnings.len(),
        "bound compile unit"
    );
    Ok(BoundUnit { unit, warnings })
}

/// Bind `units` in order against one symbol table.
///
/// Without `options.ide` the first failing unit aborts the program and its
/// error is returned. In IDE mode a failing unit is recorded in the report
/// and binding continues with the next unit.
#[instrument(level = "debug", skip_all, fields(units = units.len(), ide = options.ide))]
pub fn bind_program(
    table: &mut SymbolTable,
    units: &[SourceUnit<'_>],
    options: &CompileOptions,
) -> CompileResult<ProgramOutput> {
    let mut output = ProgramOutput::default();
    for source in units {
        match bind_compile_unit(source.arena, source.root, table, options) {
            Ok(bound) => {
                for warning in bound.warnings {
                    output.report.add_warning(warning);
                }
                output.units.push(bound.unit);
            }
            Err(error) if options.ide => {
                if error.is_internal() {
                    warn!(message = %error.message, "internal error while binding unit");
                }
                output.report.add_error(&error);
            }
            Err(error) => return Err(error),
        }
    }
    Ok(output)
}
