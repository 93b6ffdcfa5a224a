use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, LevelFilter};
use vmtranslator::{Options, Unit};

/// Translate VM code into Hack assembly.
///
/// A directory is translated as one program into `<dir>/<dir>.asm`, with
/// bootstrap code; a single file is translated into `<file>.asm` without it.
#[derive(Parser)]
#[command(version)]
struct Cli {
    /// A `.vm` file or a directory of them
    input: PathBuf,
    /// Output path
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Annotate the assembly with the VM commands it came from
    #[arg(short, long)]
    annotate: bool,
    /// Emit bootstrap code even for a single file
    #[arg(long, overrides_with = "no_bootstrap")]
    bootstrap: bool,
    /// Never emit bootstrap code
    #[arg(long)]
    no_bootstrap: bool,
    /// Raise log verbosity, repeatable
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn vm_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let path = entry?.path();
        if path.extension().map_or(false, |ext| ext == "vm") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn stem(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .with_context(|| format!("no file name in {}", path.display()))
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        })
        .parse_default_env()
        .init();

    let is_dir = cli.input.is_dir();
    let (files, default_output) = if is_dir {
        let name = stem(&cli.input)?;
        (vm_files(&cli.input)?, cli.input.join(name).with_extension("asm"))
    } else {
        (vec![cli.input.clone()], cli.input.with_extension("asm"))
    };
    anyhow::ensure!(!files.is_empty(), "no .vm files in {}", cli.input.display());

    let mut units = Vec::new();
    let mut failed = false;
    for file in &files {
        let source =
            fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
        match Unit::parse(&stem(file)?, &source) {
            Ok(unit) => units.push(unit),
            Err(err) => {
                error!("{}", err);
                failed = true;
            }
        }
    }
    if failed {
        return Ok(ExitCode::FAILURE);
    }

    let options = Options {
        bootstrap: (is_dir || cli.bootstrap) && !cli.no_bootstrap,
        annotate: cli.annotate,
    };
    let instrs = match vmtranslator::translate(&units, &options) {
        Ok(instrs) => instrs,
        Err(errors) => {
            for err in errors {
                error!("{}", err);
            }
            return Ok(ExitCode::FAILURE);
        }
    };

    let output = cli.output.unwrap_or(default_output);
    fs::write(&output, assembler::render_asm(&instrs))
        .with_context(|| format!("writing {}", output.display()))?;
    info!("wrote {}", output.display());
    Ok(ExitCode::SUCCESS)
}
