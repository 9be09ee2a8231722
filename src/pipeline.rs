//! End-to-end import of one uploaded file.
//!
//! ```text
//! file name ─▶ FileType ─▶ TabularReader ─▶ RawTable ─▶ header row
//!                                                     ─▶ headers + data rows
//!                                                     ─▶ ColumnMapping[]
//!                                                     ─▶ SanitizeRowResult[]
//! ```
//!
//! Every step is a pure function of its inputs. The mappings returned by
//! [`ImportPipeline::auto_match`] are a proposal; callers may edit them with
//! [`apply_override`](crate::matcher::apply_override) before sanitizing.

use std::collections::{BTreeMap, HashMap};

use log::{debug, info};
use serde::Serialize;

use crate::{
    config::ImportConfig,
    data::{CellValue, RawTable},
    error::{FormatError, MatchValidationError},
    file_type::FileType,
    header::{HeaderRowDetector, get_data_rows, get_headers},
    matcher::{ColumnMapping, ColumnMatcher, validate_mappings},
    reader::TabularReader,
    sanitize::{SanitizeRowResult, WarningType, sanitize_row},
    schema::ColumnDefinition,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedFile {
    pub file_type: FileType,
    pub file_name: String,
    pub data: RawTable,
    pub suggested_header_row: usize,
}

impl ParsedFile {
    pub fn headers(&self, header_row: usize) -> Vec<String> {
        get_headers(&self.data, header_row)
    }

    pub fn data_rows(&self, header_row: usize) -> &[Vec<CellValue>] {
        get_data_rows(&self.data, header_row)
    }
}

/// Batch-level summary returned once every data row has been sanitized.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub rows: Vec<SanitizeRowResult>,
    pub total_warnings: usize,
    pub warnings_by_type: BTreeMap<WarningType, usize>,
    pub rows_with_warnings: usize,
}

impl ImportReport {
    fn push(&mut self, row: SanitizeRowResult) {
        if row.has_warnings() {
            self.rows_with_warnings += 1;
        }
        self.total_warnings += row.warning_count;
        for warning in row.warnings.values() {
            *self.warnings_by_type.entry(warning.warning_type).or_default() += 1;
        }
        self.rows.push(row);
    }
}

pub struct ImportPipeline {
    reader: TabularReader,
    detector: HeaderRowDetector,
    matcher: ColumnMatcher,
}

impl Default for ImportPipeline {
    fn default() -> Self {
        Self::new(&ImportConfig::default())
    }
}

impl ImportPipeline {
    pub fn new(config: &ImportConfig) -> Self {
        Self {
            reader: TabularReader::new(config.reader.clone()),
            detector: HeaderRowDetector::new(&config.header),
            matcher: ColumnMatcher::new(&config.matching),
        }
    }

    /// Replaces the reader, typically to inject fake decoders.
    pub fn with_reader(mut self, reader: TabularReader) -> Self {
        self.reader = reader;
        self
    }

    pub fn matcher(&self) -> &ColumnMatcher {
        &self.matcher
    }

    /// Classifies, decodes, and suggests a header row for one upload.
    pub fn parse_file(&self, file_name: &str, bytes: &[u8]) -> Result<ParsedFile, FormatError> {
        let file_type = FileType::detect(file_name)
            .ok_or_else(|| FormatError::UnsupportedFileType(file_name.to_string()))?;
        let data = self.reader.read(bytes, file_type)?;
        let suggested_header_row = self.detector.detect(&data);
        info!(
            "Parsed {file_name:?} as {file_type}: {} row(s), header suggested at row {}",
            data.len(),
            suggested_header_row
        );
        Ok(ParsedFile {
            file_type,
            file_name: file_name.to_string(),
            data,
            suggested_header_row,
        })
    }

    pub fn auto_match(&self, headers: &[String], columns: &[ColumnDefinition]) -> Vec<ColumnMapping> {
        self.matcher.auto_match_columns(headers, columns)
    }

    /// Validates the mappings once, then sanitizes every data row.
    pub fn sanitize(
        &self,
        rows: &[Vec<CellValue>],
        mappings: &[ColumnMapping],
        columns: &[ColumnDefinition],
    ) -> Result<ImportReport, MatchValidationError> {
        validate_mappings(mappings, columns).into_result()?;
        let mut report = ImportReport::default();
        for row in rows {
            report.push(sanitize_row(&build_keyed_row(row, mappings), columns));
        }
        debug!(
            "Sanitized {} row(s); {} warning(s) across {} row(s)",
            report.rows.len(),
            report.total_warnings,
            report.rows_with_warnings
        );
        Ok(report)
    }
}

/// Turns a positional data row into the id-keyed record [`sanitize_row`]
/// consumes. Skipped and unmapped file columns are dropped; a mapping past the
/// end of a short row contributes an empty cell.
pub fn build_keyed_row(row: &[CellValue], mappings: &[ColumnMapping]) -> HashMap<String, CellValue> {
    mappings
        .iter()
        .filter_map(|mapping| {
            let id = mapping.target()?;
            let value = row
                .get(mapping.file_column_index)
                .cloned()
                .unwrap_or(CellValue::Empty);
            Some((id.to_string(), value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::{OverrideTarget, apply_override};
    use crate::schema::{ColumnRole, ColumnType};

    fn schema() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("c1", "Name", ColumnType::Text).required(),
            ColumnDefinition::new("c2", "Quantity", ColumnType::Number)
                .with_role(ColumnRole::Quantity),
            ColumnDefinition::new("c3", "Price", ColumnType::Currency).with_role(ColumnRole::Price),
        ]
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let err = ImportPipeline::default()
            .parse_file("notes.txt", b"hello")
            .unwrap_err();
        assert!(matches!(err, FormatError::UnsupportedFileType(name) if name == "notes.txt"));
    }

    #[test]
    fn keyed_row_drops_skipped_columns() {
        let pipeline = ImportPipeline::default();
        let headers = vec!["name".to_string(), "misc".to_string(), "qty".to_string()];
        let mappings = pipeline.auto_match(&headers, &schema());
        let row = vec![CellValue::text("Widget"), CellValue::text("x")];
        let keyed = build_keyed_row(&row, &mappings);
        assert_eq!(keyed.len(), 2);
        assert_eq!(keyed["c1"], CellValue::text("Widget"));
        assert_eq!(keyed["c2"], CellValue::Empty);
    }

    #[test]
    fn sanitize_aggregates_warnings() {
        let pipeline = ImportPipeline::default();
        let parsed = pipeline
            .parse_file(
                "stock.csv",
                b"name,qty,price\nWidget, 10 ,$19.99\nGadget,about 5,\"1.234,56 EUR\"\n",
            )
            .unwrap();
        assert_eq!(parsed.suggested_header_row, 0);
        let headers = parsed.headers(0);
        let mappings = pipeline.auto_match(&headers, &schema());
        let report = pipeline
            .sanitize(parsed.data_rows(0), &mappings, &schema())
            .unwrap();

        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows[0].warning_count, 0);
        assert_eq!(report.rows_with_warnings, 1);
        assert_eq!(report.total_warnings, 2);
        assert_eq!(report.warnings_by_type[&WarningType::NumberExtraction], 1);
        assert_eq!(report.warnings_by_type[&WarningType::CurrencyParsing], 1);
        assert_eq!(
            report.rows[1].data["c3"],
            Some(crate::sanitize::SanitizedValue::Number(1234.56))
        );
    }

    #[test]
    fn sanitize_refuses_invalid_mappings() {
        let pipeline = ImportPipeline::default();
        let headers = vec!["name".to_string()];
        let mut mappings = pipeline.auto_match(&headers, &schema());
        apply_override(&mut mappings, 0, OverrideTarget::Skip, &schema()).unwrap();
        let err = pipeline.sanitize(&[], &mappings, &schema()).unwrap_err();
        assert_eq!(err.missing_columns, vec!["Name"]);
    }
}
