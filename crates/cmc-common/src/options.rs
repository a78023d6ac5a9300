//! Compilation options.
//!
//! Constructed once by the driver and passed by reference into every binder
//! entry point. Several specifier rules branch on `optimize`; Export writes
//! the nested template-type class-id table only under `full_config`.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompileOptions {
    /// Whole-program optimization: inline functions are replicated into
    /// other units, so their parameter types must be public.
    pub optimize: bool,
    /// "Full" build configuration.
    pub full_config: bool,
    pub quiet: bool,
    /// Emit a trace event per bound statement.
    pub trace: bool,
    /// IDE mode: keep going after errors and collect one report.
    pub ide: bool,
    pub emit_warnings: bool,
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from a JSON document such as `{"optimize": true}`.
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    #[must_use]
    pub fn with_optimize(mut self, optimize: bool) -> Self {
        self.optimize = optimize;
        self
    }

    #[must_use]
    pub fn with_full_config(mut self, full_config: bool) -> Self {
        self.full_config = full_config;
        self
    }

    #[must_use]
    pub fn with_ide(mut self, ide: bool) -> Self {
        self.ide = ide;
        self
    }

    #[must_use]
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    #[must_use]
    pub fn with_warnings(mut self, emit_warnings: bool) -> Self {
        self.emit_warnings = emit_warnings;
        self
    }
}
