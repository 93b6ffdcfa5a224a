use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn, LevelFilter};
use n2t::{Language, Options, Source, Target};

/// Build Jack, VM or Hack assembly sources down to VM code, assembly or
/// Hack binary.
///
/// A directory is built from the files of its highest-priority language
/// (`.jack`, then `.vm`, then `.asm`) as one program named after the
/// directory, with bootstrap code.
#[derive(Parser)]
#[command(version)]
struct Cli {
    /// A source file or a directory of them
    input: PathBuf,
    /// Output directory; defaults to the input directory
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// How far to lower the sources
    #[arg(short, long, value_enum, default_value_t)]
    target: Target,
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

fn stem(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .with_context(|| format!("no file name in {}", path.display()))
}

fn language(path: &Path) -> Option<Language> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(Language::from_extension)
}

/// The files to build: the input itself, or the directory's files of its
/// highest-priority language.
fn resolve_inputs(input: &Path) -> Result<Vec<(PathBuf, Language)>> {
    if !input.is_dir() {
        let lang = language(input)
            .with_context(|| format!("{}: not a .jack, .vm or .asm file", input.display()))?;
        return Ok(vec![(input.to_path_buf(), lang)]);
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(input).with_context(|| format!("reading {}", input.display()))? {
        let path = entry?.path();
        if let Some(lang) = language(&path) {
            files.push((path, lang));
        }
    }
    let lang = files
        .iter()
        .map(|(_, lang)| *lang)
        .min()
        .with_context(|| format!("no .jack, .vm or .asm files in {}", input.display()))?;
    files.retain(|(_, l)| *l == lang);
    files.sort();
    Ok(files)
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
    let files = resolve_inputs(&cli.input)?;
    let mut sources = Vec::new();
    for (path, lang) in &files {
        let text =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        sources.push(Source::new(stem(path)?, *lang, text));
    }

    let options = Options {
        target: cli.target,
        bootstrap: if cli.no_bootstrap {
            Some(false)
        } else if cli.bootstrap || is_dir {
            Some(true)
        } else {
            None
        },
        annotate: cli.annotate,
        program_name: stem(&cli.input)?,
    };
    let report = n2t::build(&sources, &options);

    let out_dir = match (&cli.output, is_dir) {
        (Some(dir), _) => dir.clone(),
        (None, true) => cli.input.clone(),
        (None, false) => cli
            .input
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
    };
    fs::create_dir_all(&out_dir).with_context(|| format!("creating {}", out_dir.display()))?;
    for artifact in &report.artifacts {
        let path = out_dir.join(artifact.file_name());
        fs::write(&path, &artifact.text).with_context(|| format!("writing {}", path.display()))?;
        info!("wrote {}", path.display());
    }
    if report.artifacts.is_empty() && report.is_ok() {
        warn!("nothing to build for target {:?}", cli.target);
    }

    for diagnostic in &report.diagnostics {
        error!("{}", diagnostic);
    }
    Ok(if report.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
