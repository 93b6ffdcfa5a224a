use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, LevelFilter};

/// Compile Jack classes into VM code, one `.vm` file per `.jack` file.
#[derive(Parser)]
#[command(version)]
struct Cli {
    /// A `.jack` file or a directory of them
    input: PathBuf,
    /// Directory for the `.vm` files; defaults to next to each source
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Print the token stream of each file instead of compiling it
    #[arg(long)]
    tokens: bool,
    /// Raise log verbosity, repeatable
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn jack_files(input: &Path) -> Result<Vec<PathBuf>> {
    if !input.is_dir() {
        return Ok(vec![input.to_path_buf()]);
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(input).with_context(|| format!("reading {}", input.display()))? {
        let path = entry?.path();
        if path.extension().map_or(false, |ext| ext == "jack") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn compile_file(input: &Path, output_dir: Option<&Path>) -> Result<()> {
    let source =
        fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))?;
    let commands = jack::compile(&source).with_context(|| format!("{}", input.display()))?;
    let output = match output_dir {
        Some(dir) => dir.join(input.file_name().unwrap_or_default()).with_extension("vm"),
        None => input.with_extension("vm"),
    };
    fs::write(&output, vmtranslator::render_vm(&commands))
        .with_context(|| format!("writing {}", output.display()))?;
    info!("{} -> {}", input.display(), output.display());
    Ok(())
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

    let files = jack_files(&cli.input)?;
    anyhow::ensure!(!files.is_empty(), "no .jack files in {}", cli.input.display());
    if let Some(dir) = &cli.output {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }

    let mut failed = false;
    for file in &files {
        let result = if cli.tokens {
            fs::read_to_string(file)
                .with_context(|| format!("reading {}", file.display()))
                .map(|source| print!("{}", jack::dump_tokens(&source)))
        } else {
            compile_file(file, cli.output.as_deref())
        };
        if let Err(err) = result {
            error!("{:#}", err);
            failed = true;
        }
    }
    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
