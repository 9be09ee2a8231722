//! File plumbing shared by the command handlers.
//!
//! Library code never touches the filesystem; uploads arrive as bytes plus a
//! file name. These helpers bridge the CLI's paths to that contract and route
//! JSON output to a file or stdout (`-` or no path).

use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::Path,
};

use anyhow::{Context, Result};
use log::debug;
use serde::Serialize;

use crate::pipeline::{ImportPipeline, ParsedFile};

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

/// Name used for format detection: the final path component.
pub fn upload_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Reads `path` and runs it through detection, decoding, and header
/// detection. Format errors are returned as-is so their message reaches the
/// user unchanged.
pub fn load_upload(pipeline: &ImportPipeline, path: &Path) -> Result<ParsedFile> {
    let bytes = fs::read(path).with_context(|| format!("Opening input file {path:?}"))?;
    debug!("Read {} byte(s) from {path:?}", bytes.len());
    Ok(pipeline.parse_file(&upload_name(path), &bytes)?)
}

pub fn open_output_writer(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(p) if !is_dash(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        )),
        _ => Box::new(io::stdout()),
    })
}

pub fn write_json<T: Serialize>(path: Option<&Path>, value: &T) -> Result<()> {
    let mut writer = open_output_writer(path)?;
    serde_json::to_writer_pretty(&mut writer, value).context("Serializing JSON output")?;
    writeln!(writer)?;
    writer.flush().context("Flushing output")?;
    Ok(())
}
