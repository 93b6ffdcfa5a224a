use lexer::Diagnostic;
use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("{}", lexer::join(diagnostics)))]
    Syntax { diagnostics: Vec<Diagnostic> },

    /// A name no scope declares. The parser does not resolve names, so this
    /// surfaces at code generation.
    #[snafu(display(
        "internal compiler error ({class} - line {line}, col {col}): unresolved symbol '{name}'"
    ))]
    UnresolvedSymbol {
        class: String,
        name: String,
        line: usize,
        col: usize,
    },
}
