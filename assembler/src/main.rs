use std::{fs, path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, LevelFilter};

/// Assemble Hack assembly into `.hack` binary text.
#[derive(Parser)]
#[command(version)]
struct Cli {
    /// `.asm` source files
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
    /// Output path (single input only); defaults to the input with a `.hack` extension
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Raise log verbosity, repeatable
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn assemble_file(input: &PathBuf, output: &PathBuf) -> Result<()> {
    let source =
        fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))?;
    let words = assembler::assemble(&source).with_context(|| format!("{}", input.display()))?;
    fs::write(output, assembler::render_binary(&words))
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

    anyhow::ensure!(
        cli.output.is_none() || cli.inputs.len() == 1,
        "--output needs exactly one input"
    );

    let mut failed = false;
    for input in &cli.inputs {
        let output = cli
            .output
            .clone()
            .unwrap_or_else(|| input.with_extension("hack"));
        if let Err(err) = assemble_file(input, &output) {
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
