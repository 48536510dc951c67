use super::*;

fn graph(allowed: &[SuspendMask]) -> Effects {
    let mut effects = Effects::default();
    for (i, &mask) in allowed.iter().enumerate() {
        effects.add_function(FunctionId(u32::try_from(i).unwrap()), mask);
    }
    effects
}

#[test]
fn requirements_flow_up_a_call_chain() {
    let all = SuspendMask::all();
    let mut effects = graph(&[all, all, all]);
    let (a, b, c) = (FunctionId(0), FunctionId(1), FunctionId(2));
    effects.add_call(a, b);
    effects.add_call(b, c);
    effects.require(c, SuspendMask::ASYNC);

    assert!(effects.propagate().is_ok());
    assert_eq!(effects.required(a), SuspendMask::ASYNC);
    assert_eq!(effects.required(b), SuspendMask::ASYNC);
}

#[test]
fn edges_declared_in_reverse_order_still_settle() {
    let all = SuspendMask::all();
    let mut effects = graph(&[all, all, all]);
    let (a, b, c) = (FunctionId(0), FunctionId(1), FunctionId(2));
    effects.add_call(b, c);
    effects.add_call(a, b);
    effects.require(c, SuspendMask::ASYNC_SIO);

    let rounds = effects.propagate().unwrap();
    assert!(rounds >= 1);
    assert_eq!(effects.required(a), SuspendMask::ASYNC_SIO);
}

#[test]
fn forbidden_mode_names_caller_and_callee() {
    let mut effects = graph(&[SuspendMask::empty(), SuspendMask::all()]);
    let (handler, helper) = (FunctionId(0), FunctionId(1));
    effects.add_call(handler, helper);
    effects.require(helper, SuspendMask::ASYNC);

    assert_eq!(
        effects.propagate(),
        Err(EffectConflict {
            caller: handler,
            callee: helper,
            modes: SuspendMask::ASYNC,
        })
    );
}

#[test]
fn restrictions_flow_down() {
    let mut effects = graph(&[SuspendMask::ASYNC, SuspendMask::all()]);
    effects.add_call(FunctionId(0), FunctionId(1));

    assert!(effects.propagate().is_ok());
    assert_eq!(effects.allowed(FunctionId(1)), SuspendMask::ASYNC);
}

#[test]
fn recursion_terminates() {
    let all = SuspendMask::all();
    let mut effects = graph(&[all, all]);
    effects.add_call(FunctionId(0), FunctionId(1));
    effects.add_call(FunctionId(1), FunctionId(0));
    effects.add_call(FunctionId(0), FunctionId(0));
    effects.require(FunctionId(1), SuspendMask::ASYNC_RAW_SIO);

    assert!(effects.propagate().is_ok());
    assert_eq!(effects.required(FunctionId(0)), SuspendMask::ASYNC_RAW_SIO);
}

#[test]
fn duplicate_calls_record_one_edge() {
    let mut effects = graph(&[SuspendMask::all(), SuspendMask::all()]);
    effects.add_call(FunctionId(0), FunctionId(1));
    effects.add_call(FunctionId(0), FunctionId(1));
    assert_eq!(effects.edge_count(), 1);
}
