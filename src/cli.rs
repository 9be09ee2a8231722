use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Import spreadsheet, CSV, and JSON files into a typed schema",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Report the detected format of one or more files from their extensions
    Detect(DetectArgs),
    /// Show the decoded grid of a file and the suggested header row
    Preview(PreviewArgs),
    /// Propose schema column mappings for the headers of a file
    Match(MatchArgs),
    /// Sanitize every data row against a schema and emit a JSON report
    Import(ImportArgs),
}

#[derive(Debug, Args)]
pub struct DetectArgs {
    /// Files to classify
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    /// File to preview (.xlsx, .xls, .csv, .json)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Number of data rows to display
    #[arg(short = 'n', long = "rows", default_value_t = 10)]
    pub rows: usize,
    /// Use this 0-based row as the header instead of the detected one
    #[arg(long = "header-row")]
    pub header_row: Option<usize>,
    /// Show the raw grid with row numbers instead of headers and data rows
    #[arg(long)]
    pub raw: bool,
    /// YAML file overriding the import heuristics
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct MatchArgs {
    /// File whose headers should be matched
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Schema definition (YAML or JSON)
    #[arg(short = 's', long = "schema")]
    pub schema: PathBuf,
    /// Use this 0-based row as the header instead of the detected one
    #[arg(long = "header-row")]
    pub header_row: Option<usize>,
    /// Also list every qualifying schema column per file column
    #[arg(long)]
    pub candidates: bool,
    /// YAML file overriding the import heuristics
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// File to import
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Schema definition (YAML or JSON)
    #[arg(short = 's', long = "schema")]
    pub schema: PathBuf,
    /// Use this 0-based row as the header instead of the detected one
    #[arg(long = "header-row")]
    pub header_row: Option<usize>,
    /// Map a file column to a schema column id, e.g. `--map "On Hand=c2"`
    #[arg(long = "map", value_parser = parse_mapping, action = clap::ArgAction::Append)]
    pub map: Vec<(String, String)>,
    /// Ignore a file column even if it matched automatically
    #[arg(long = "skip", action = clap::ArgAction::Append)]
    pub skip: Vec<String>,
    /// Output JSON report (stdout if omitted or `-`)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// YAML file overriding the import heuristics
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
}

/// Parses `File Header=column_id`. The header may itself contain `=`; the last
/// one separates the id.
pub fn parse_mapping(value: &str) -> Result<(String, String), String> {
    let (header, id) = value
        .rsplit_once('=')
        .ok_or_else(|| format!("Mapping '{value}' must look like 'Header=column_id'"))?;
    let header = header.trim();
    let id = id.trim();
    if header.is_empty() {
        return Err(format!("Mapping '{value}' is missing the file column"));
    }
    if id.is_empty() {
        return Err(format!("Mapping '{value}' is missing the schema column id"));
    }
    Ok((header.to_string(), id.to_string()))
}
