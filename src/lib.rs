pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod file_type;
pub mod header;
mod import;
pub mod io_utils;
pub mod matcher;
pub mod pipeline;
mod preview;
pub mod reader;
pub mod sanitize;
pub mod schema;
pub mod table;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::{LevelFilter, info};

use crate::{
    cli::{Cli, Commands},
    file_type::FileType,
};

pub use crate::{
    config::ImportConfig,
    data::{CellValue, RawTable},
    error::{FormatError, MatchValidationError, OverrideError},
    pipeline::{ImportPipeline, ImportReport, ParsedFile, build_keyed_row},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("tabular_intake", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Detect(args) => handle_detect(&args),
        Commands::Preview(args) => preview::execute(&args),
        Commands::Match(args) => import::execute_match(&args),
        Commands::Import(args) => import::execute(&args),
    }
}

fn handle_detect(args: &cli::DetectArgs) -> Result<()> {
    let mut unsupported = 0usize;
    for input in &args.inputs {
        let name = io_utils::upload_name(input);
        match FileType::detect(&name) {
            Some(file_type) => println!("{}\t{file_type}", input.display()),
            None => {
                unsupported += 1;
                println!("{}\tunsupported", input.display());
            }
        }
    }
    info!(
        "Classified {} file(s), {unsupported} unsupported",
        args.inputs.len()
    );
    Ok(())
}
