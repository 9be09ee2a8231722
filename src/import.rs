use std::path::Path;

use anyhow::{Result, ensure};
use log::{info, warn};

use crate::{
    cli::{ImportArgs, MatchArgs},
    config::ImportConfig,
    error::OverrideError,
    io_utils,
    matcher::{ColumnMapping, OverrideTarget, apply_override, validate_mappings},
    pipeline::{ImportPipeline, ParsedFile},
    schema::{ColumnDefinition, Schema},
    table,
};

/// Everything the match and import commands share: a decoded file, its
/// chosen header row, and the schema columns in display order.
struct Prepared {
    pipeline: ImportPipeline,
    parsed: ParsedFile,
    header_row: usize,
    headers: Vec<String>,
    columns: Vec<ColumnDefinition>,
}

fn prepare(
    input: &Path,
    schema: &Path,
    header_row: Option<usize>,
    config: Option<&Path>,
) -> Result<Prepared> {
    let config = ImportConfig::load_or_default(config)?;
    let schema = Schema::load(schema)?;
    let pipeline = ImportPipeline::new(&config);
    let parsed = io_utils::load_upload(&pipeline, input)?;
    let header_row = header_row.unwrap_or(parsed.suggested_header_row);
    let headers = parsed.headers(header_row);
    ensure!(
        !headers.is_empty(),
        "Header row {header_row} is outside the {} row(s) of {input:?}",
        parsed.data.len()
    );
    info!(
        "Using row {header_row} of {:?} as header ({} column(s))",
        input,
        headers.len()
    );
    let columns = schema.ordered_columns().into_iter().cloned().collect();
    Ok(Prepared {
        pipeline,
        parsed,
        header_row,
        headers,
        columns,
    })
}

pub fn execute_match(args: &MatchArgs) -> Result<()> {
    let prepared = prepare(
        &args.input,
        &args.schema,
        args.header_row,
        args.config.as_deref(),
    )?;
    let mappings = prepared
        .pipeline
        .auto_match(&prepared.headers, &prepared.columns);

    let headers = ["#", "File column", "Schema column", "Match", "Confidence"]
        .map(String::from)
        .to_vec();
    let rows: Vec<Vec<String>> = mappings
        .iter()
        .map(|mapping| {
            vec![
                mapping.file_column_index.to_string(),
                mapping.file_column_name.clone(),
                describe_target(mapping, &prepared.columns),
                mapping.match_type.as_str().to_string(),
                format!("{:.2}", mapping.confidence),
            ]
        })
        .collect();
    table::print_table(&headers, &rows);

    if args.candidates {
        let matcher = prepared.pipeline.matcher();
        println!(
            "Candidates (fuzzy matches need similarity above {:.2}):",
            matcher.fuzzy_threshold()
        );
        for header in &prepared.headers {
            let candidates = matcher.get_all_matches(header, &prepared.columns);
            if candidates.is_empty() {
                continue;
            }
            let listed = candidates
                .iter()
                .map(|c| format!("{} {} {:.2}", c.schema_column_id, c.match_type.as_str(), c.confidence))
                .collect::<Vec<_>>()
                .join(", ");
            println!("{header}: {listed}");
        }
    }

    let validation = validate_mappings(&mappings, &prepared.columns);
    if validation.valid {
        info!("All required columns are mapped");
    } else {
        warn!(
            "Required columns are not mapped: {}",
            validation.missing_columns.join(", ")
        );
    }
    Ok(())
}

pub fn execute(args: &ImportArgs) -> Result<()> {
    let prepared = prepare(
        &args.input,
        &args.schema,
        args.header_row,
        args.config.as_deref(),
    )?;
    let mut mappings = prepared
        .pipeline
        .auto_match(&prepared.headers, &prepared.columns);

    for (header, id) in &args.map {
        let index = file_column_index(&mappings, header)?;
        apply_override(
            &mut mappings,
            index,
            OverrideTarget::Column(id.clone()),
            &prepared.columns,
        )?;
    }
    for header in &args.skip {
        let index = file_column_index(&mappings, header)?;
        apply_override(&mut mappings, index, OverrideTarget::Skip, &prepared.columns)?;
    }

    let report = prepared.pipeline.sanitize(
        prepared.parsed.data_rows(prepared.header_row),
        &mappings,
        &prepared.columns,
    )?;
    io_utils::write_json(args.output.as_deref(), &report)?;

    info!(
        "Sanitized {} row(s) from {:?}: {} warning(s) in {} row(s)",
        report.rows.len(),
        args.input,
        report.total_warnings,
        report.rows_with_warnings
    );
    for (warning_type, count) in &report.warnings_by_type {
        info!("  {}: {count}", warning_type.as_str());
    }
    Ok(())
}

fn describe_target(mapping: &ColumnMapping, columns: &[ColumnDefinition]) -> String {
    match mapping.target() {
        Some(id) => columns
            .iter()
            .find(|column| column.id == id)
            .map_or_else(|| id.to_string(), |column| format!("{} ({id})", column.name)),
        None => "-".to_string(),
    }
}

fn file_column_index(mappings: &[ColumnMapping], header: &str) -> Result<usize, OverrideError> {
    mappings
        .iter()
        .find(|mapping| mapping.file_column_name.trim().eq_ignore_ascii_case(header.trim()))
        .map(|mapping| mapping.file_column_index)
        .ok_or_else(|| OverrideError::UnknownFileColumnName(header.to_string()))
}
