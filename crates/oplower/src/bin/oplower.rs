use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use oplower::ir::OperatorGraph;
use oplower::logger::init_log;
use oplower::{Error, LoweringConfig, OpBuilderRegistrations, TargetFormat, compile};

/// Lower an operator graph description into a target program.
#[derive(Parser, Debug)]
#[command(name = "oplower", version, about, long_about = None)]
struct Args {
    /// Graph description (JSON)
    graph: PathBuf,

    /// Lowering configuration (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Target format, overriding the configuration
    #[arg(long)]
    format: Option<TargetFormat>,

    /// Write the program to this file instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,

    /// Print the program as text instead of JSON
    #[arg(long)]
    text: bool,

    /// Log every registration and lowered node
    #[arg(short, long)]
    verbose: bool,
}

fn run(args: Args) -> Result<(), Error> {
    let mut config = match &args.config {
        Some(path) => LoweringConfig::load(path)?,
        None => LoweringConfig::default(),
    };
    if let Some(format) = args.format {
        config = config.with_format(format);
    }

    let graph = OperatorGraph::load(&args.graph)?;
    let registrations = OpBuilderRegistrations::new();
    let program = compile(&graph, &registrations, &config)?;

    let rendered = if args.text {
        program.to_string()
    } else {
        serde_json::to_string_pretty(&program)?
    };

    match &args.out {
        Some(path) => {
            std::fs::write(path, rendered)?;
            log::info!("Wrote {} operations to {}", program.operations.len(), path.display());
        }
        None => println!("{rendered}"),
    }

    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_log(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}
