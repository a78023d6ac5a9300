//! cmc: the binder core of a Cmajor-style compiler.
//!
//! The work is split across the workspace crates, re-exported here:
//!
//! - [`common`]: spans, the error taxonomy, diagnostics and options
//! - [`ast`]: the node arena the binder consumes
//! - [`symbols`]: symbol table, scopes, types and module images
//! - [`binder`]: declaration binder, checks and the statement binder
//!
//! [`bind_compile_unit`] and [`bind_program`] run the passes in order.

pub use cmc_ast as ast;
pub use cmc_binder as binder;
pub use cmc_common as common;
pub use cmc_symbols as symbols;

pub mod compile_unit;
pub use compile_unit::{BoundUnit, ProgramOutput, SourceUnit, bind_compile_unit, bind_program};

pub mod tracing_config;

pub use cmc_binder::{BoundCompileUnit, BoundFunction, BoundStatement, BoundStatementKind};
pub use cmc_common::{CompileError, CompileOptions, CompileResult, Diagnostic, DiagnosticReport, ErrorKind};
pub use cmc_symbols::SymbolTable;
