//! VM translator: stack machine commands to Hack assembly.

mod command;
mod error;
mod parser;
mod translator;

use lexer::Spanned;
use log::debug;

pub use command::{render_vm, ArithmeticOp, Command, Segment};
pub use error::Error;
pub use parser::parse;

use translator::Translator;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Options {
    /// Initialise the stack and call `Sys.init` before any translated code.
    pub bootstrap: bool,
    /// Precede every command's assembly with a comment naming it.
    pub annotate: bool,
}

/// The commands of one VM file. `name` is the file's base name; it
/// namespaces the file's statics.
#[derive(Clone, Debug)]
pub struct Unit {
    pub name: String,
    pub commands: Vec<Spanned<Command>>,
}

impl Unit {
    pub fn new(name: impl Into<String>, commands: Vec<Spanned<Command>>) -> Self {
        Self {
            name: name.into(),
            commands,
        }
    }

    pub fn parse(name: &str, source: &str) -> Result<Self, Error> {
        let commands = parse(source).map_err(|diagnostics| Error::Parse {
            name: name.to_string(),
            diagnostics,
        })?;
        Ok(Self::new(name, commands))
    }

    /// Wraps commands that have no source text of their own, such as
    /// compiler output; each is located at its 1-based position.
    pub fn from_commands(name: impl Into<String>, commands: Vec<Command>) -> Self {
        let commands = commands
            .into_iter()
            .enumerate()
            .map(|(i, command)| Spanned::new(command, i + 1))
            .collect();
        Self::new(name, commands)
    }
}

/// Translates the units of a program, in order, into one assembly listing.
pub fn translate(
    units: &[Unit],
    options: &Options,
) -> Result<Vec<assembler::Instruction>, Vec<Error>> {
    let mut instrs = Vec::new();
    let mut translator = Translator::new(options.annotate, |instr| instrs.push(instr));
    if options.bootstrap {
        translator.bootstrap();
    }
    for unit in units {
        translator.set_file(&unit.name);
        for command in &unit.commands {
            translator.translate(command);
        }
    }
    let errors = translator.finish();
    if !errors.is_empty() {
        return Err(errors);
    }
    debug!(
        "translated {} units into {} assembly lines",
        units.len(),
        instrs.len()
    );
    Ok(instrs)
}

/// Parses then translates `(name, source)` pairs. Parse errors of every
/// file are reported before anything is translated.
pub fn translate_sources<'a>(
    sources: impl IntoIterator<Item = (&'a str, &'a str)>,
    options: &Options,
) -> Result<Vec<assembler::Instruction>, Vec<Error>> {
    let mut units = Vec::new();
    let mut errors = Vec::new();
    for (name, source) in sources {
        match Unit::parse(name, source) {
            Ok(unit) => units.push(unit),
            Err(err) => errors.push(err),
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }
    translate(&units, options)
}
