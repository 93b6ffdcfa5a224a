//! The whole toolchain as one function: Jack, VM and assembly sources in,
//! `.vm`, `.asm` and `.hack` texts out.

use std::fmt;

use log::{debug, info};
use rayon::prelude::*;
use vmtranslator::Unit;

/// Source language, as told by the file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Language {
    Jack,
    Vm,
    Asm,
}

impl Language {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "jack" => Some(Language::Jack),
            "vm" => Some(Language::Vm),
            "asm" => Some(Language::Asm),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Language::Jack => "jack",
            Language::Vm => "vm",
            Language::Asm => "asm",
        }
    }
}

/// How far lowering proceeds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, clap::ValueEnum)]
pub enum Target {
    Vm,
    Asm,
    #[default]
    Hack,
}

impl Target {
    pub fn extension(&self) -> &'static str {
        match self {
            Target::Vm => "vm",
            Target::Asm => "asm",
            Target::Hack => "hack",
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Options {
    pub target: Target,
    /// `None` bootstraps when the program has more than one VM unit.
    pub bootstrap: Option<bool>,
    pub annotate: bool,
    /// Base name of the linked `.asm`/`.hack` artifacts of a VM program;
    /// empty means the name of its first unit.
    pub program_name: String,
}

/// One input file. `name` is its base name; it names the artifacts and
/// namespaces the file's statics.
#[derive(Clone, Debug)]
pub struct Source {
    pub name: String,
    pub language: Language,
    pub text: String,
}

impl Source {
    pub fn new(name: impl Into<String>, language: Language, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            language,
            text: text.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    pub name: String,
    pub kind: Target,
    pub text: String,
}

impl Artifact {
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.name, self.kind.extension())
    }
}

#[derive(Clone, Debug, Default)]
pub struct Report {
    pub artifacts: Vec<Artifact>,
    pub diagnostics: Vec<String>,
}

impl Report {
    pub fn is_ok(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn artifact(&self, file_name: &str) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.file_name() == file_name)
    }

    fn emit(&mut self, name: &str, kind: Target, text: String) {
        self.artifacts.push(Artifact {
            name: name.to_string(),
            kind,
            text,
        });
    }

    fn report(&mut self, file: &str, err: impl fmt::Display) {
        for line in err.to_string().lines() {
            self.diagnostics.push(format!("{}: {}", file, line));
        }
    }
}

fn link(report: &mut Report, units: &[Unit], options: &Options) {
    let vm_options = vmtranslator::Options {
        bootstrap: options.bootstrap.unwrap_or(units.len() > 1),
        annotate: options.annotate,
    };
    let program = match (options.program_name.as_str(), units.first()) {
        ("", Some(unit)) => unit.name.as_str(),
        (name, _) => name,
    };
    let instrs = match vmtranslator::translate(units, &vm_options) {
        Ok(instrs) => instrs,
        Err(errors) => {
            for err in errors {
                report.report(program, err);
            }
            return;
        }
    };
    report.emit(program, Target::Asm, assembler::render_asm(&instrs));
    if options.target == Target::Hack {
        match assembler::assemble_instructions(&instrs) {
            Ok(words) => report.emit(program, Target::Hack, assembler::render_binary(&words)),
            Err(err) => report.report(program, err),
        }
    }
}

/// Runs every source as far as `options.target`.
///
/// Jack classes compile independently and in parallel, each into its own
/// `.vm` artifact. Compiled classes and VM sources then link into one
/// program, which only happens when every one of them got through; a file
/// that fails never blocks the artifacts of its siblings. Assembly sources
/// assemble one by one.
pub fn build(sources: &[Source], options: &Options) -> Report {
    let mut report = Report::default();

    let compiled: Vec<_> = sources
        .par_iter()
        .filter(|s| s.language == Language::Jack)
        .map(|s| (s, jack::compile(&s.text)))
        .collect();

    let mut units = Vec::new();
    let mut complete = true;
    for (source, result) in compiled {
        let file = format!("{}.jack", source.name);
        match result {
            Ok(commands) => {
                report.emit(&source.name, Target::Vm, vmtranslator::render_vm(&commands));
                units.push(Unit::from_commands(&source.name, commands));
            }
            Err(err) => {
                report.report(&file, err);
                complete = false;
            }
        }
    }
    for source in sources.iter().filter(|s| s.language == Language::Vm) {
        match Unit::parse(&source.name, &source.text) {
            Ok(unit) => units.push(unit),
            Err(vmtranslator::Error::Parse { diagnostics, .. }) => {
                report.report(&format!("{}.vm", source.name), lexer::join(&diagnostics));
                complete = false;
            }
            Err(err) => {
                report.report(&format!("{}.vm", source.name), err);
                complete = false;
            }
        }
    }
    if options.target > Target::Vm && !units.is_empty() {
        if complete {
            link(&mut report, &units, options);
        } else {
            info!("not linking {}: some units failed", options.program_name);
        }
    }

    for source in sources.iter().filter(|s| s.language == Language::Asm) {
        if options.target != Target::Hack {
            continue;
        }
        match assembler::assemble(&source.text) {
            Ok(words) => report.emit(&source.name, Target::Hack, assembler::render_binary(&words)),
            Err(err) => report.report(&format!("{}.asm", source.name), err),
        }
    }

    debug!(
        "built {} artifacts from {} sources, {} diagnostics",
        report.artifacts.len(),
        sources.len(),
        report.diagnostics.len()
    );
    report
}
