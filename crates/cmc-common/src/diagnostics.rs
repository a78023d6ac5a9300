//! Diagnostic types and the per-invocation report.
//!
//! The binder core raises `CompileError`s and collects warnings; the driver
//! converts both into `Diagnostic`s. In IDE mode all of them end up in one
//! `DiagnosticReport` that serialises to JSON.

use crate::error::CompileError;
use crate::span::Span;
use serde::Serialize;

/// Diagnostic category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum DiagnosticCategory {
    Warning = 0,
    Error = 1,
    Suggestion = 2,
    Message = 3,
}

/// Related information for a diagnostic (e.g., the enclosing class).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DiagnosticRelatedInformation {
    pub span: Span,
    pub message_text: String,
    pub category: DiagnosticCategory,
}

/// A binder diagnostic with optional related information.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub span: Span,
    pub message_text: String,
    pub category: DiagnosticCategory,
    /// Related information spans (e.g., where a class was declared)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub related_information: Vec<DiagnosticRelatedInformation>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    #[must_use]
    pub fn error(span: Span, message: impl Into<String>) -> Self {
        Diagnostic {
            span,
            message_text: message.into(),
            category: DiagnosticCategory::Error,
            related_information: Vec::new(),
        }
    }

    /// Create a new warning diagnostic.
    #[must_use]
    pub fn warning(span: Span, message: impl Into<String>) -> Self {
        Diagnostic {
            span,
            message_text: message.into(),
            category: DiagnosticCategory::Warning,
            related_information: Vec::new(),
        }
    }

    /// Add related information to this diagnostic.
    #[must_use]
    pub fn with_related(mut self, span: Span, message: impl Into<String>) -> Self {
        self.related_information.push(DiagnosticRelatedInformation {
            span,
            message_text: message.into(),
            category: DiagnosticCategory::Message,
        });
        self
    }
}

impl From<&CompileError> for Diagnostic {
    fn from(error: &CompileError) -> Self {
        let diagnostic = Diagnostic::error(error.primary, error.to_string());
        match error.secondary {
            Some(span) => diagnostic.with_related(span, "see reference"),
            None => diagnostic,
        }
    }
}

/// Every error and warning produced by one binder invocation.
#[derive(Clone, Debug, Default, Serialize)]
pub struct DiagnosticReport {
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}

impl DiagnosticReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, error: &CompileError) {
        self.errors.push(Diagnostic::from(error));
    }

    pub fn add_warning(&mut self, warning: Diagnostic) {
        self.warnings.push(warning);
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Structured form handed to IDE clients.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
