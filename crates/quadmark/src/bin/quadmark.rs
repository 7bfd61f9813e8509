//! quadmark CLI: detect square fiducial markers in an image and print a JSON report.

use clap::{ArgAction, Parser};
use quadmark::detect::{run_config, QuadmarkError};
use quadmark::DetectConfig;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "quadmark")]
#[command(about = "Detect square fiducial markers and estimate their pose")]
#[command(version)]
struct Cli {
    /// Input image; overrides `image_path` from the config.
    image: Option<PathBuf>,

    /// JSON config with `camera`, `params`, `image_path` and `output_path`.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where to write the JSON report (stdout when omitted).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Edge length of the printed marker; overrides the config.
    #[arg(long)]
    marker_length: Option<f64>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Emit tracing spans as JSON lines instead of plain logs.
    #[cfg(feature = "tracing")]
    #[arg(long)]
    trace_json: bool,
}

fn init_logging(cli: &Cli) {
    #[cfg(feature = "tracing")]
    {
        quadmark::core::init_tracing(cli.trace_json);
    }
    #[cfg(not(feature = "tracing"))]
    {
        let level = quadmark::core::level_from_verbosity(cli.verbose);
        if let Err(err) = quadmark::core::init_with_level(level) {
            eprintln!("logger already installed: {err}");
        }
    }
}

fn run(cli: &Cli) -> Result<(), QuadmarkError> {
    let mut cfg = match &cli.config {
        Some(path) => DetectConfig::load_json(path)?,
        None => DetectConfig::default(),
    };
    if let Some(len) = cli.marker_length {
        cfg.params.marker_length = len;
    }

    let image_path = cli
        .image
        .clone()
        .or_else(|| cfg.image_path.as_ref().map(PathBuf::from))
        .ok_or(QuadmarkError::MissingImage)?;
    let output = cli.output.clone().or_else(|| cfg.output_path());

    let report = run_config(&cfg, &image_path)?;
    match output {
        Some(path) => {
            report.write_json(&path)?;
            log::info!("report written to {}", path.display());
        }
        None => {
            let json = serde_json::to_string_pretty(&report).map_err(quadmark::detector::IoError::from)?;
            println!("{json}");
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
