use lexer::Diagnostic;
use snafu::Snafu;

use crate::command::Segment;

/// A translation problem, located by the function (or file) it occurred in
/// and its source line.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("{name}: {}", lexer::join(diagnostics)))]
    Parse {
        name: String,
        diagnostics: Vec<Diagnostic>,
    },

    #[snafu(display(
        "translation error ({context} - line {line}): invalid index '{index}' for segment '{segment}' (must be {expected})"
    ))]
    InvalidIndex {
        context: String,
        line: usize,
        segment: Segment,
        index: u16,
        expected: &'static str,
    },

    #[snafu(display(
        "translation error ({context} - line {line}): cannot pop from the 'constant' segment"
    ))]
    PopConstant { context: String, line: usize },

    #[snafu(display(
        "translation error ({context} - line {line}): label '{label}' is already defined"
    ))]
    DuplicateLabel {
        context: String,
        line: usize,
        label: String,
    },

    #[snafu(display(
        "translation error ({context} - line {line}): label '{label}' is never defined"
    ))]
    UndefinedLabel {
        context: String,
        line: usize,
        label: String,
    },

    #[snafu(display(
        "translation error ({context} - line {line}): call passes {count} arguments (at most {})",
        crate::translator::MAX_CALL_ARGS
    ))]
    TooManyArguments {
        context: String,
        line: usize,
        count: u16,
    },
}
