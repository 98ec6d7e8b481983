use std::{io::Write, path::PathBuf, process::ExitCode};

use clap::Parser;

use nilguard::{AnalysisOptions, Config, run_root};

/// Flags unguarded uses of nilable function parameters in a Go source tree.
#[derive(Debug, Parser)]
#[command(name = "nilguard", version, about)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Root directory of the source tree to analyze.
    #[arg(default_value = ".")]
    root: PathBuf,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run(&Cli::parse()) {
        Ok(violations) if violations > 0 => ExitCode::from(1),
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("nilguard: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<usize> {
    let config = cli.config.as_deref().map(Config::load).transpose()?;
    let options = AnalysisOptions {
        config,
        test_mode: false,
    };

    let outcome = run_root(&cli.root, &options)?;
    for err in &outcome.syntax_errors {
        eprintln!("nilguard: skipped unit: {err}");
    }
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(outcome.report.as_bytes())?;
    Ok(outcome.violations)
}
