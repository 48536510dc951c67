use devvm_ir::DataValueKind;
use pretty_assertions::assert_eq;

use super::*;

#[test]
fn internal_errors_are_prefixed() {
    let err = CompileError::internal("Unresolved branch targets", 12);
    assert_eq!(
        err.to_string(),
        "Internal compiler error: Unresolved branch targets"
    );
    assert_eq!(CompileError::syntax("Expected ';'", 0).to_string(), "Expected ';'");
}

#[test]
fn line_col_is_one_based() {
    let source = "int a;\nint b c;\n";
    let err = CompileError::syntax("Expected ';'", 13);
    assert_eq!(err.line_col(source), (2, 7));
}

#[test]
fn host_error_offset_overrides_fallback() {
    let value = DataValue::new(DataValueKind::Int(7), 40);
    let err = HostError::for_value("Value out of range", &value).into_compile_error(3);
    assert_eq!(err.offset, 40);
    assert_eq!(err.kind, ErrorKind::Semantic);

    let err = HostError::new("Unknown event").into_compile_error(3);
    assert_eq!(err.offset, 3);
}
