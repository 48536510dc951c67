//! Device-script compiler CLI.

mod commands;

use std::sync::Once;

use commands::{check_file, lex_file, CheckOptions};

static TRACING_INIT: Once = Once::new();

/// Install a subscriber when `RUST_LOG` is set, e.g.
/// `RUST_LOG=devvm_compile=debug`.
fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(EnvFilter::from_default_env())
                .init();
        }
    });
}

fn main() {
    init_tracing();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    let command = &args[1];

    match command.as_str() {
        "check" | "dump" => {
            let mut options = CheckOptions {
                dump: command == "dump",
                ..CheckOptions::default()
            };
            let mut file_path = None;

            for arg in args.iter().skip(2) {
                if arg == "--debug" {
                    options.debug = true;
                } else if arg == "--allow-async" {
                    options.allow_async = true;
                } else if !arg.starts_with('-') && file_path.is_none() {
                    file_path = Some(arg.as_str());
                } else {
                    eprintln!("error: unexpected argument '{arg}'");
                    std::process::exit(1);
                }
            }

            let Some(path) = file_path else {
                eprintln!("error: missing file path");
                eprintln!("Usage: devvmc {command} <file> [--debug] [--allow-async]");
                std::process::exit(1);
            };
            check_file(path, &options);
        }
        "lex" => {
            if args.len() < 3 {
                eprintln!("Usage: devvmc lex <file>");
                std::process::exit(1);
            }
            lex_file(&args[2]);
        }
        "help" | "--help" | "-h" => {
            print_usage();
        }
        "version" | "--version" | "-V" => {
            println!("devvmc {}", env!("CARGO_PKG_VERSION"));
        }
        _ => {
            eprintln!("Unknown command: {command}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    println!("Device-script compiler");
    println!();
    println!("Usage: devvmc <command> [options]");
    println!();
    println!("Commands:");
    println!("  check <file>    Compile a script and report the first error");
    println!("  dump <file>     Compile and print every function's bytecode");
    println!("  lex <file>      Tokenize and display tokens");
    println!("  help            Show this help message");
    println!("  version         Show version information");
    println!();
    println!("Check/dump options:");
    println!("  --debug         Compile [debug] statements instead of [!debug] ones");
    println!("  --allow-async   Let event scripts call suspending functions");
    println!();
    println!("Set RUST_LOG (e.g. RUST_LOG=devvm_compile=debug) for compiler tracing.");
}
