use lexer::Diagnostic;
use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("{}", lexer::join(diagnostics)))]
    Parse { diagnostics: Vec<Diagnostic> },

    #[snafu(display("line {line}: label '{label}' is already defined"))]
    DuplicateLabel { label: String, line: usize },

    #[snafu(display(
        "program has {count} instructions, instruction memory holds {}",
        crate::MAX_PROGRAM_SIZE
    ))]
    ProgramTooLarge { count: usize },
}
