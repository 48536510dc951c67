//! The `check` and `dump` commands: compile a script without a host.
//!
//! Event bindings are queued as void functions; options are accepted and
//! logged. No host classes are registered, so the script can only use
//! integers, strings and its own functions.

use devvm_compile::{CompileOptions, Compiler};
use devvm_ir::disasm::disassemble;
use devvm_ir::{ConditionalMask, Domain, SuspendMask, ValueType};
use tracing::info;

use super::read_file;

#[derive(Copy, Clone, Debug, Default)]
pub struct CheckOptions {
    /// Print metadata and disassembly of every function.
    pub dump: bool,
    pub debug: bool,
    /// Event scripts may suspend in any mode.
    pub allow_async: bool,
}

pub fn check_file(path: &str, options: &CheckOptions) {
    let content = read_file(path);

    let mut compiler = Compiler::with_options(CompileOptions {
        debug: options.debug,
    });
    let allowed = if options.allow_async {
        SuspendMask::all()
    } else {
        SuspendMask::empty()
    };
    compiler.set_event_handler(move |c, name, fragment| {
        let id = c.defer_compile(
            ValueType::Void,
            fragment.clone(),
            allowed,
            ConditionalMask::empty(),
        );
        info!(event = name, function = %id, "event bound");
        Ok(())
    });
    compiler.set_option_handler(|_, name, value| {
        info!(option = name, kind = value.kind_name(), "option ignored");
        Ok(())
    });

    let result = compiler
        .compile_file(&content)
        .and_then(|()| compiler.compile_deferred());
    if let Err(err) = result {
        let (line, col) = compiler.error_line_col().unwrap_or((1, 1));
        eprintln!("{path}:{line}:{col}: error: {err}");
        std::process::exit(1);
    }

    let domain = compiler.domain();
    if options.dump {
        dump_domain(&compiler, domain);
    }
    println!(
        "OK: {path} ({} functions, {} globals)",
        domain.functions.len(),
        domain.globals.len()
    );
}

fn dump_domain(compiler: &Compiler, domain: &Domain) {
    for (index, function) in domain.functions.iter().enumerate() {
        let Some(body) = &function.body else {
            continue;
        };
        let id = devvm_ir::FunctionId(u32::try_from(index).unwrap_or(u32::MAX));
        println!(
            "function {} {}() {id}: {} bytes, stack {}, locals {}, calls {}, suspends {}",
            type_name(function.return_type),
            function.name,
            body.bytecode.len(),
            body.stack_slots,
            body.local_slots,
            body.method_table.len(),
            compiler.required_suspend_modes(id).describe(),
        );
        for line in disassemble(&body.bytecode).lines() {
            println!("    {line}");
        }
        println!();
    }
}

fn type_name(ty: ValueType) -> &'static str {
    match ty {
        ValueType::Void => "void",
        ValueType::Int => "int",
        ValueType::String => "string",
        ValueType::FunctionPointer => "function",
        ValueType::Object(class) => class.name,
    }
}
