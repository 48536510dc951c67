#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Suspension modes across the call graph.

use devvm_compile::{CompileError, Compiler};
use devvm_ir::{
    ConditionalMask, ExternalMethod, FunctionId, HostObject, MethodFlags, NativeEntry,
    ObjectClass, SuspendMask, ValueType,
};
use pretty_assertions::assert_eq;

static PORT: ObjectClass = ObjectClass {
    name: "Port",
    methods: &[
        ExternalMethod {
            name: "wait",
            return_type: ValueType::Void,
            args: &[],
            flags: MethodFlags::empty(),
            suspends: SuspendMask::ASYNC,
            entry: NativeEntry(1),
        },
        ExternalMethod {
            name: "transfer",
            return_type: ValueType::Int,
            args: &[ValueType::Int],
            flags: MethodFlags::empty(),
            suspends: SuspendMask::ASYNC_SIO,
            entry: NativeEntry(2),
        },
        ExternalMethod {
            name: "read",
            return_type: ValueType::Int,
            args: &[],
            flags: MethodFlags::empty(),
            suspends: SuspendMask::empty(),
            entry: NativeEntry(3),
        },
    ],
};

/// Event scripts become void functions that may suspend in `allowed`.
fn compiler(allowed: SuspendMask) -> Compiler {
    let mut c = Compiler::new();
    c.define_object_variable("port", HostObject { class: &PORT, id: 0 })
        .unwrap();
    c.set_event_handler(move |c, _, fragment| {
        c.defer_compile(
            ValueType::Void,
            fragment.clone(),
            allowed,
            ConditionalMask::empty(),
        );
        Ok(())
    });
    c
}

fn compile(allowed: SuspendMask, source: &str) -> Result<Compiler, CompileError> {
    let mut c = compiler(allowed);
    c.compile_file(source)?;
    c.compile_deferred()?;
    Ok(c)
}

fn id(c: &Compiler, name: &str) -> FunctionId {
    c.domain().function_named(name).map(|(id, _)| id).unwrap()
}

#[test]
fn indirect_suspension_conflict_names_both_functions() {
    let err = compile(
        SuspendMask::empty(),
        "function void b();\n\
         function void a() { b(); }\n\
         function void b() { port.wait(); }\n\
         event \"x\": function { a(); };",
    )
    .err()
    .unwrap();
    assert_eq!(
        err.message,
        "Function a() can suspend in a mode not allowed by calling function <anonymous function 1>()"
    );
}

#[test]
fn call_to_suspending_function_is_rejected_at_the_call() {
    let source = "function void a() { port.wait(); }\nevent \"x\": function { a(); };";
    let mut c = compiler(SuspendMask::empty());
    c.compile_file(source).unwrap();
    let err = c.compile_deferred().unwrap_err();
    assert_eq!(
        err.message,
        "Cannot call 'a' as it can suspend, which is not supported by the current context"
    );
    assert_eq!(c.error_line_col(), Some((2, 25)));
}

#[test]
fn direct_method_calls_are_checked_against_the_context() {
    let err = compile(
        SuspendMask::empty(),
        "event \"x\": function { port.wait(); };",
    )
    .err()
    .unwrap();
    assert_eq!(
        err.message,
        "Cannot call 'wait' as it can suspend, which is not supported by the current context"
    );

    let err = compile(
        SuspendMask::ASYNC,
        "event \"x\": function { port.transfer(1); };",
    )
    .err()
    .unwrap();
    assert_eq!(
        err.message,
        "Cannot call 'transfer' as it can suspend in a mode not supported by the current context"
    );
}

#[test]
fn required_modes_flow_up_the_call_chain() {
    let c = compile(
        SuspendMask::ASYNC | SuspendMask::ASYNC_SIO,
        "function void c();\n\
         function void b() { c(); }\n\
         function void a() { b(); port.read(); }\n\
         function void c() { port.wait(); port.transfer(2); }\n\
         event \"x\": function { a(); };",
    )
    .unwrap();

    let both = SuspendMask::ASYNC | SuspendMask::ASYNC_SIO;
    assert_eq!(c.required_suspend_modes(id(&c, "c")), both);
    assert_eq!(c.required_suspend_modes(id(&c, "b")), both);
    assert_eq!(c.required_suspend_modes(id(&c, "a")), both);
    assert_eq!(
        c.required_suspend_modes(id(&c, "<anonymous function 1>")),
        both
    );
}

#[test]
fn allowed_modes_narrow_down_the_call_chain() {
    let c = compile(
        SuspendMask::ASYNC,
        "function void b() { port.read(); }\n\
         function void a() { b(); }\n\
         event \"x\": function { a(); };",
    )
    .unwrap();

    assert_eq!(c.allowed_suspend_modes(id(&c, "a")), SuspendMask::ASYNC);
    assert_eq!(c.allowed_suspend_modes(id(&c, "b")), SuspendMask::ASYNC);
    assert_eq!(c.required_suspend_modes(id(&c, "b")), SuspendMask::empty());
}

#[test]
fn uncalled_functions_keep_every_mode() {
    let c = compile(SuspendMask::empty(), "function void idle() { port.wait(); }").unwrap();
    let idle = id(&c, "idle");
    assert_eq!(c.required_suspend_modes(idle), SuspendMask::ASYNC);
    assert_eq!(c.allowed_suspend_modes(idle), SuspendMask::all());
}

#[test]
fn recursion_settles() {
    let c = compile(
        SuspendMask::ASYNC,
        "function void ping();\n\
         function void pong() { ping(); }\n\
         function void ping() { pong(); port.wait(); }\n\
         event \"x\": function { ping(); };",
    )
    .unwrap();
    assert_eq!(c.required_suspend_modes(id(&c, "pong")), SuspendMask::ASYNC);
    assert_eq!(c.allowed_suspend_modes(id(&c, "pong")), SuspendMask::ASYNC);
}

#[test]
fn inline_function_literals_may_suspend() {
    let c = compile(
        SuspendMask::empty(),
        "function void f() { function { port.wait(); }; }",
    )
    .unwrap();
    let inline = id(&c, "<anonymous function 1>");
    assert_eq!(c.required_suspend_modes(inline), SuspendMask::ASYNC);
    assert_eq!(c.required_suspend_modes(id(&c, "f")), SuspendMask::empty());
}
