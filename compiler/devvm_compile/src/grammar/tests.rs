use std::rc::Rc;

use devvm_diagnostic::ErrorKind;
use devvm_ir::{ConditionalMask, FunctionId, Span, ValueType};
use pretty_assertions::assert_eq;

use super::{Body, Parser};
use crate::emit::Emitter;
use crate::symbols::Locals;
use crate::Compiler;

fn with_body<R>(source: &str, f: impl FnOnce(&mut Body<'_, '_, '_>) -> R) -> R {
    let mut c = Compiler::new();
    let source: Rc<str> = Rc::from(source);
    let mut parser = Parser::new(&mut c, &source, Span::from_range(0..source.len()));
    let mut body = Body {
        p: &mut parser,
        id: FunctionId(0),
        return_type: ValueType::Void,
        conditional: ConditionalMask::empty(),
        emit: Emitter::new(),
        methods: Vec::new(),
        locals: Locals::default(),
    };
    f(&mut body)
}

#[test]
fn operand_overflow_points_at_current_token() {
    with_body("int   x;", |body| {
        body.next().unwrap();
        body.next().unwrap();

        assert_eq!(body.slot_operand(255).unwrap(), 255);
        let err = body.slot_operand(256).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Internal);
        assert_eq!(err.offset, 6);

        let err = body.const_operand(u32::MAX).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Internal);
        assert_eq!(err.offset, 6);
    });
}

#[test]
fn unloaded_values_load_once() {
    with_body("", |body| {
        let ty = body.load(devvm_ir::TypeInfo::int_const(7)).unwrap();
        assert_eq!(ty, devvm_ir::TypeInfo::INT);
        let len = body.emit.offset();
        assert_eq!(body.load(ty).unwrap(), ty);
        assert_eq!(body.emit.offset(), len);
    });
}
