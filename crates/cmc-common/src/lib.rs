//! Common types and utilities for the cmc binder.
//!
//! This crate provides foundational types used across all cmc crates:
//! - Source spans (`Span`, `FileId`)
//! - The compile error taxonomy (`CompileError`, `ErrorKind`)
//! - Diagnostics and the per-invocation report
//! - Compilation options (`CompileOptions`)
//! - Binder limits and thresholds

// Span - Source location tracking (byte offsets)
pub mod span;
pub use span::{FileId, Span};

// Error taxonomy shared by every pass
pub mod error;
pub use error::{CompileError, CompileResult, ErrorKind};

pub mod diagnostics;
pub use diagnostics::{
    Diagnostic, DiagnosticCategory, DiagnosticRelatedInformation, DiagnosticReport,
};

// Explicit configuration replacing process-wide flags
pub mod options;
pub use options::CompileOptions;

// Centralized limits and thresholds
pub mod limits;

#[cfg(test)]
#[path = "../tests/common_tests.rs"]
mod common_tests;
