//! Sldl's binary.

use std::{path::PathBuf, process::ExitCode};

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sldl::{
    conf::{Mapping, TransformConfig},
    prelude::*,
    simulink::Model,
};

#[derive(Parser)]
#[command(name = "sldl")]
#[command(about = "Translates Simulink block graphs into differential dynamic logic")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate a model to a dL problem
    Transform {
        /// Input model (JSON)
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Block-type mapping file, overrides the configuration's mapping
        #[arg(short, long, value_name = "FILE")]
        mapping: Option<PathBuf>,

        /// Configuration file (JSON)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Output file, stdout if absent
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Break conjunctive tests and domains on several lines
        #[arg(long)]
        multi_line: bool,
    },

    /// Check the consistency of a model
    Check {
        /// Input model (JSON)
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Print the execution order of the blocks of a model
    Schedule {
        /// Input model (JSON)
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Configuration file (JSON), for the stateful block types
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli.command) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            for cause in e.iter().skip(1) {
                eprintln!("  caused by: {}", cause);
            }
            ExitCode::FAILURE
        }
    }
}

/// Initializes logging, `RUST_LOG` overrides the default filter.
fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("sldl={}", level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(path: Option<PathBuf>, log: &mut Log) -> Res<TransformConfig> {
    match path {
        Some(path) => {
            tracing::info!("loading configuration from {:?}", path);
            TransformConfig::from_file(&path, log)
        }
        None => Ok(TransformConfig::default()),
    }
}

fn run(command: Commands) -> Res<ExitCode> {
    let mut log = Log::new();
    match command {
        Commands::Transform {
            input,
            mapping,
            config,
            output,
            multi_line,
        } => {
            let mut conf = load_config(config, &mut log)?;
            if let Some(path) = mapping {
                conf.mapping = Mapping::load(path, &mut log)?;
            }
            if multi_line {
                conf.multi_line_tests = true;
                conf.multi_line_domains = true;
            }
            let graph = Model::load(&input)?;
            let outcome = pipeline::transform(&graph, conf)?;
            let text = outcome.render();
            match output {
                Some(path) => std::fs::write(&path, text)
                    .chain_err(|| format!("while writing `{}`", path.display()))?,
                None => print!("{}", text),
            }
            if outcome.is_complete() {
                Ok(ExitCode::SUCCESS)
            } else {
                for name in &outcome.failed {
                    eprintln!("failed to translate block `{}`", name);
                }
                for reason in outcome.model.incomplete() {
                    eprintln!("incomplete: {}", reason);
                }
                Ok(ExitCode::from(2))
            }
        }

        Commands::Check { input } => {
            let graph = Model::load(&input)?;
            let consistency = simulink::check::check(&graph, &mut log);
            if consistency.is_consistent() {
                println!(
                    "model `{}` is consistent ({} unconnected output(s))",
                    graph.name,
                    consistency.unconnected_outputs.len()
                );
                Ok(ExitCode::SUCCESS)
            } else {
                for issue in &consistency.issues {
                    println!("{}", issue);
                }
                bail!(ErrorKind::Inconsistent(consistency.issues.len()))
            }
        }

        Commands::Schedule { input, config } => {
            let conf = load_config(config, &mut log)?;
            let graph = Model::load(&input)?;
            let schedule = schedule::schedule(&graph, &conf.stateful);
            for (idx, name) in schedule.names(&graph).into_iter().enumerate() {
                println!("{:>3} {}", idx + 1, name);
            }
            for id in &schedule.unresolved {
                println!("unresolved: {}", graph.block(*id).name);
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
