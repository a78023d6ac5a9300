//! Tests for spans, errors, diagnostics and options.

use super::*;

#[test]
fn test_span_merge_and_dummy() {
    let a = Span::new(FileId(1), 10, 20);
    let b = Span::new(FileId(1), 15, 40);
    assert_eq!(a.merge(b), Span::new(FileId(1), 10, 40));
    assert_eq!(Span::DUMMY.merge(a), a);
    assert!(Span::DUMMY.is_dummy());
    assert_eq!(a.len(), 10);

    let other_file = Span::new(FileId(2), 0, 5);
    assert_eq!(a.merge(other_file), a);
}

#[test]
fn test_compile_error_display_and_kind() {
    let error = CompileError::specifier("free functions cannot be static", Span::new(FileId(0), 3, 9));
    assert_eq!(error.kind, ErrorKind::Specifier);
    assert!(!error.is_internal());
    assert_eq!(
        error.to_string(),
        "specifier error: free functions cannot be static"
    );

    let internal = CompileError::internal("scope stack underflow");
    assert!(internal.is_internal());
    assert!(internal.primary.is_dummy());
}

#[test]
fn test_error_converts_to_diagnostic_with_related_span() {
    let class_span = Span::new(FileId(0), 0, 50);
    let error = CompileError::specifier("abstract", Span::new(FileId(0), 10, 20))
        .with_secondary(class_span);
    let diagnostic = Diagnostic::from(&error);
    assert_eq!(diagnostic.category, DiagnosticCategory::Error);
    assert_eq!(diagnostic.related_information.len(), 1);
    assert_eq!(diagnostic.related_information[0].span, class_span);
}

#[test]
fn test_report_serializes_errors_and_warnings() {
    let mut report = DiagnosticReport::new();
    assert!(!report.has_errors());
    report.add_error(&CompileError::control_flow("missing return", Span::DUMMY));
    report.add_warning(Diagnostic::warning(Span::DUMMY, "hides base class function"));
    assert!(report.has_errors());

    let json = report.to_json().expect("report serializes");
    let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
    assert_eq!(value["errors"].as_array().map(Vec::len), Some(1));
    assert_eq!(value["warnings"][0]["category"], "Warning");
    assert!(value["errors"][0].get("related_information").is_none());
}

#[test]
fn test_options_from_json_uses_defaults_for_missing_fields() {
    let options = CompileOptions::from_json_str(r#"{"optimize": true, "fullConfig": true}"#)
        .expect("options parse");
    assert!(options.optimize);
    assert!(options.full_config);
    assert!(!options.ide);

    let built = CompileOptions::new().with_optimize(true).with_full_config(true);
    assert_eq!(options, built);
    assert!(CompileOptions::from_json_str("{\"optimize\": 3}").is_err());
}
