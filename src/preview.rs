use anyhow::{Result, ensure};
use log::info;

use crate::{
    cli::PreviewArgs, config::ImportConfig, data::CellValue, io_utils, pipeline::ImportPipeline,
    table,
};

pub fn execute(args: &PreviewArgs) -> Result<()> {
    let config = ImportConfig::load_or_default(args.config.as_deref())?;
    let pipeline = ImportPipeline::new(&config);
    let parsed = io_utils::load_upload(&pipeline, &args.input)?;

    println!(
        "{} ({}): {} row(s), suggested header row {}",
        parsed.file_name,
        parsed.file_type,
        parsed.data.len(),
        parsed.suggested_header_row
    );

    if args.raw {
        let width = parsed.data.width();
        let mut headers = vec!["row".to_string()];
        headers.extend((1..=width).map(|n| format!("Column {n}")));
        let rows: Vec<Vec<String>> = parsed
            .data
            .rows
            .iter()
            .take(args.rows)
            .enumerate()
            .map(|(index, row)| {
                let marker = if index == parsed.suggested_header_row {
                    format!("{index}*")
                } else {
                    index.to_string()
                };
                std::iter::once(marker).chain(display_cells(row)).collect()
            })
            .collect();
        table::print_table(&headers, &rows);
        return Ok(());
    }

    let header_row = args.header_row.unwrap_or(parsed.suggested_header_row);
    let headers = parsed.headers(header_row);
    ensure!(
        !headers.is_empty(),
        "Header row {header_row} is outside the {} row(s) of {:?}",
        parsed.data.len(),
        args.input
    );
    let rows: Vec<Vec<String>> = parsed
        .data_rows(header_row)
        .iter()
        .take(args.rows)
        .map(|row| display_cells(row).collect())
        .collect();
    table::print_table(&headers, &rows);
    info!("Displayed {} row(s) from {:?}", rows.len(), args.input);
    Ok(())
}

fn display_cells(row: &[CellValue]) -> impl Iterator<Item = String> + '_ {
    row.iter().map(CellValue::as_display)
}
