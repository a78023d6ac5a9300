//! The compile error taxonomy.
//!
//! Every failure raised by the binder core is a `CompileError`: a kind, a
//! human-readable message and one or two source spans. The core never formats
//! or prints errors; the driver turns them into `Diagnostic`s.

use crate::span::Span;
use std::fmt;
use thiserror::Error;

/// What went wrong, independent of the message text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A specifier was applied to a declaration shape that cannot carry it.
    Specifier,
    /// A structurally-detected special member was given a nonsensical modifier.
    SpecialMemberShape,
    /// A non-void function body does not provably terminate on every path.
    ControlFlow,
    /// A type is less accessible than the declaration that exposes it.
    Accessibility,
    /// Conflicting or duplicate declarations.
    Declaration,
    /// A name or type could not be resolved.
    Resolution,
    /// A module image could not be written or read back.
    Serialization,
    /// A pass-ordering or stack-balance bug in the compiler itself.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Specifier => "specifier error",
            ErrorKind::SpecialMemberShape => "special member error",
            ErrorKind::ControlFlow => "control flow error",
            ErrorKind::Accessibility => "accessibility error",
            ErrorKind::Declaration => "declaration error",
            ErrorKind::Resolution => "resolution error",
            ErrorKind::Serialization => "serialization error",
            ErrorKind::Internal => "internal compiler error",
        };
        f.write_str(name)
    }
}

/// A binder failure with its message and source spans.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct CompileError {
    pub kind: ErrorKind,
    pub message: String,
    /// The declaration or statement the error is reported at.
    pub primary: Span,
    /// A second location, e.g. the enclosing class or a previous declaration.
    pub secondary: Option<Span>,
}

pub type CompileResult<T> = Result<T, CompileError>;

impl CompileError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>, primary: Span) -> Self {
        CompileError {
            kind,
            message: message.into(),
            primary,
            secondary: None,
        }
    }

    #[must_use]
    pub fn with_secondary(mut self, span: Span) -> Self {
        self.secondary = Some(span);
        self
    }

    #[must_use]
    pub fn specifier(message: impl Into<String>, primary: Span) -> Self {
        Self::new(ErrorKind::Specifier, message, primary)
    }

    #[must_use]
    pub fn special_member(message: impl Into<String>, primary: Span) -> Self {
        Self::new(ErrorKind::SpecialMemberShape, message, primary)
    }

    #[must_use]
    pub fn control_flow(message: impl Into<String>, primary: Span) -> Self {
        Self::new(ErrorKind::ControlFlow, message, primary)
    }

    #[must_use]
    pub fn accessibility(message: impl Into<String>, primary: Span) -> Self {
        Self::new(ErrorKind::Accessibility, message, primary)
    }

    #[must_use]
    pub fn declaration(message: impl Into<String>, primary: Span) -> Self {
        Self::new(ErrorKind::Declaration, message, primary)
    }

    #[must_use]
    pub fn resolution(message: impl Into<String>, primary: Span) -> Self {
        Self::new(ErrorKind::Resolution, message, primary)
    }

    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Serialization, message, Span::DUMMY)
    }

    /// A "should never happen" failure: a prior pass did not produce what
    /// this one expects, or a begin/end pair was unbalanced.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message, Span::DUMMY)
    }

    #[inline]
    #[must_use]
    pub fn is_internal(&self) -> bool {
        self.kind == ErrorKind::Internal
    }
}
