//! The `lex` command: print the token stream of a script.

use devvm_diagnostic::span_utils::LineOffsetTable;
use devvm_lexer::{Lexer, TokenKind};

use super::read_file;

pub fn lex_file(path: &str) {
    let content = read_file(path);
    let lines = LineOffsetTable::build(&content);
    let mut lexer = Lexer::new(&content);

    let mut count = 0usize;
    loop {
        let tok = match lexer.next() {
            Ok(tok) => tok,
            Err(err) => {
                let (line, col) = lines.offset_to_line_col(&content, err.offset);
                eprintln!("{path}:{line}:{col}: error: {err}");
                std::process::exit(1);
            }
        };
        if tok.is(TokenKind::End) {
            break;
        }
        count += 1;
        let (line, col) = lines.offset_to_line_col(&content, tok.span.start);
        println!(
            "  {line:>4}:{col:<3} {:<16} {}",
            format!("{:?}", tok.kind),
            lexer.slice(tok.span)
        );
    }
    println!("{count} tokens");
}
