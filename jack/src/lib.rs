//! Jack compiler: one class per source file, lowered to VM commands.

pub mod ast;
mod codegen;
mod error;
mod parser;
mod symbols;

use lexer::{Dialect, TokenKind, Tokenizer};
use log::debug;
use vmtranslator::Command;

pub use codegen::Generator;
pub use error::{Error, Result};
pub use parser::{parse, Parser};
pub use symbols::{Symbol, SymbolKind, SymbolTable};

/// Compiles the class in `source` into VM commands.
pub fn compile(source: &str) -> Result<Vec<Command>> {
    let class = parse(source).map_err(|diagnostics| Error::Syntax { diagnostics })?;
    let mut gen = Generator::new();
    gen.gen_class(&class)?;
    let instrs = gen.into_instructions();
    debug!("compiled {} into {} vm commands", class.name, instrs.len());
    Ok(instrs)
}

fn category(kind: TokenKind) -> &'static str {
    match kind {
        TokenKind::Keyword(_) => "keyword",
        TokenKind::Comment(_) => "comment",
        TokenKind::Ident
        | TokenKind::IntConst
        | TokenKind::StringConst
        | TokenKind::Newline
        | TokenKind::Eof
        | TokenKind::Unknown
        | TokenKind::Illegal => kind.as_str(),
        _ => "symbol",
    }
}

/// Every token of `source`, comments and newlines included, one per line as
/// `line:col kind text`. The text is escaped so that each token stays on
/// one line.
pub fn dump_tokens(source: &str) -> String {
    let mut out = String::new();
    for tok in Tokenizer::new(source, Dialect::Jack) {
        out.push_str(&format!(
            "{}:{} {} {}\n",
            tok.line,
            tok.col,
            category(tok.kind),
            tok.literal.escape_debug()
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_compile_deterministic() {
        let first = compile(parser::tests::LIST_CODE).unwrap();
        let second = compile(parser::tests::LIST_CODE).unwrap();
        assert_eq!(
            vmtranslator::render_vm(&first),
            vmtranslator::render_vm(&second)
        );
        assert_eq!(first[0], Command::Function("List.new".into(), 0));
    }

    #[test]
    fn test_compile_syntax_error() {
        let err = compile("class C { function void f() { return } }").unwrap_err();
        assert!(matches!(err, Error::Syntax { ref diagnostics } if diagnostics.len() == 1));
        assert_eq!(
            err.to_string(),
            "parsing error (line 1, col 38): expected an expression, got '}' instead"
        );
    }

    #[test]
    fn test_dump_tokens() {
        let dump = dump_tokens("class C { // c\n  field int x; /* a\nb */ }");
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines[0], "1:1 keyword class");
        assert_eq!(lines[1], "1:7 identifier C");
        assert_eq!(lines[2], "1:9 symbol {");
        assert_eq!(lines[3], "1:11 comment // c");
        assert_eq!(lines[4], "1:15 newline \\n");
        assert_eq!(lines[5], "2:3 keyword field");
        assert_eq!(lines[9], "2:16 comment /* a\\nb */");
        assert_eq!(lines[lines.len() - 1], "3:7 end of file ");
    }

    proptest! {
        #[test]
        fn compile_terminates(src in "class [A-Z] \\{ (function void f\\(\\) \\{ [a-z;=()0-9 ]{0,20} \\} )?\\}") {
            let _ = compile(&src);
        }
    }
}
