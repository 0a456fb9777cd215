//! # `shape-map`
//!
//! Builds the mapper graph for a source and target shape, prints its address table and
//! optionally converts one JSON value.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use error_stack::Report;
use shape_mapper::support::TracingLevel;
use shape_mapper::{CompiledMapper, Error, MapperConfig, MappingEngine, Result, TypePair};

#[derive(Parser)]
#[command(name = "shape-map")]
#[command(about = "Build and run shape-to-shape mappers", long_about = None)]
struct Cli {
    /// JSON configuration file with shape declarations
    #[arg(long)]
    config: Option<PathBuf>,

    /// Source shape, e.g. `Seq<i64>`
    #[arg(long)]
    source: String,

    /// Target shape, e.g. `Vec<String>`
    #[arg(long)]
    target: String,

    /// JSON value of the source shape to convert
    #[arg(long)]
    value: Option<String>,

    /// Print the mapper table even when converting a value
    #[arg(long)]
    plan: bool,

    /// Log level written to stderr
    #[arg(long, default_value = "warn")]
    log_level: TracingLevel,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    TracingLevel::init_stderr_tracing(cli.log_level);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(report) => {
            eprintln!("{report:?}");
            ExitCode::FAILURE
        },
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => MapperConfig::load(path)?,
        None => MapperConfig::default(),
    };
    let engine = MappingEngine::new(&config)?;
    let compiled = engine.mapper(&TypePair::new(&cli.source, &cli.target))?;

    if cli.plan || cli.value.is_none() {
        print_plan(&compiled);
    }

    if let Some(value) = &cli.value {
        let json: serde_json::Value = serde_json::from_str(value)
            .map_err(|e| Report::new(Error::invalid("input value", e)))?;
        let converted = compiled.convert_json(&json)?;
        let rendered = serde_json::to_string_pretty(&converted)
            .map_err(|e| Report::new(Error::Serialization(e.to_string())))?;
        println!("{rendered}");
    }

    Ok(())
}

fn print_plan(compiled: &CompiledMapper) {
    for (address, mapper) in compiled.mappers().iter() {
        let marker = if address == compiled.root() { "*" } else { " " };
        println!(
            "{marker}{:<4} {:<32} {}",
            address.to_string(),
            mapper.type_pair().to_string(),
            mapper.name()
        );
    }
}
