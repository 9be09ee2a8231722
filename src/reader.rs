//! Decoding of uploaded bytes into a [`RawTable`].
//!
//! Workbook and CSV decoding sit behind the [`SheetDecoder`] trait so the
//! pipeline can be driven by fakes or golden fixtures. Whatever decoder is
//! installed, [`TabularReader::read`] enforces the same contract on its output:
//! blank rows are dropped, short rows are padded with empty cells, and a table
//! with no rows left is reported as an empty file.

use std::{borrow::Cow, collections::HashSet, io::Cursor, sync::LazyLock};

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use log::debug;
use regex::Regex;
use serde_json::Value as JsonValue;

use crate::{
    config::ReaderConfig,
    data::{CellValue, RawTable},
    error::FormatError,
    file_type::FileType,
};

/// Days between the Excel 1900 epoch (as serialised) and the Unix epoch.
const EXCEL_UNIX_EPOCH_DAYS: f64 = 25_569.0;
const MILLIS_PER_DAY: f64 = 86_400_000.0;

static PLAIN_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?$").expect("valid number pattern")
});

/// Turns raw file bytes into a grid. Implementations must be stateless.
pub trait SheetDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<RawTable, FormatError>;
}

/// First-sheet workbook decoding for `.xlsx` and `.xls` via calamine.
#[derive(Debug, Default, Clone, Copy)]
pub struct WorkbookDecoder;

impl SheetDecoder for WorkbookDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<RawTable, FormatError> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
        let sheet_names = workbook.sheet_names();
        let Some(first_sheet) = sheet_names.first() else {
            return Err(FormatError::NoSheets);
        };
        debug!(
            "Workbook has {} sheet(s); reading '{}'",
            sheet_names.len(),
            first_sheet
        );
        let range = workbook
            .worksheet_range_at(0)
            .ok_or(FormatError::NoSheets)??;

        // calamine trims the used range; restore leading empty columns so
        // positions line up with what the user sees in the sheet.
        let column_offset = range.start().map_or(0, |(_, col)| col as usize);
        let rows = range
            .rows()
            .map(|row| {
                std::iter::repeat_n(CellValue::Empty, column_offset)
                    .chain(row.iter().map(workbook_cell))
                    .collect()
            })
            .collect();
        Ok(RawTable::new(rows))
    }
}

fn workbook_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) if s.is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Boolean(*b),
        Data::DateTime(dt) => {
            CellValue::Timestamp((dt.as_f64() - EXCEL_UNIX_EPOCH_DAYS) * MILLIS_PER_DAY)
        }
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(err) => CellValue::Text(err.to_string()),
    }
}

/// Delimited-text decoding with delimiter sniffing and encoding fallback.
#[derive(Debug, Default, Clone, Copy)]
pub struct CsvDecoder;

impl SheetDecoder for CsvDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<RawTable, FormatError> {
        let text = decode_text(bytes);
        let delimiter = sniff_delimiter(&text);
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(delimiter)
            .double_quote(true)
            .from_reader(text.as_bytes());

        let mut rows = Vec::new();
        for (idx, record) in reader.records().enumerate() {
            let record = record.map_err(|err| {
                FormatError::Decode(format!("CSV parse error at line {}: {err}", idx + 1))
            })?;
            rows.push(record.iter().map(csv_cell).collect());
        }
        Ok(RawTable::new(rows))
    }
}

fn csv_cell(field: &str) -> CellValue {
    if field.is_empty() {
        return CellValue::Empty;
    }
    if field.eq_ignore_ascii_case("true") {
        return CellValue::Boolean(true);
    }
    if field.eq_ignore_ascii_case("false") {
        return CellValue::Boolean(false);
    }
    if PLAIN_NUMBER.is_match(field)
        && !has_significant_leading_zero(field)
        && let Ok(parsed) = field.parse::<f64>()
        && parsed.is_finite()
    {
        return CellValue::Number(parsed);
    }
    CellValue::Text(field.to_string())
}

/// Codes such as `00123` must survive as text.
fn has_significant_leading_zero(field: &str) -> bool {
    let digits = field.strip_prefix('-').unwrap_or(field);
    let mut chars = digits.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some('0'), Some(c)) if c.is_ascii_digit()
    )
}

fn sniff_delimiter(text: &str) -> u8 {
    let first_line = text.lines().find(|line| !line.trim().is_empty()).unwrap_or("");
    let mut in_quotes = false;
    let mut counts = [(b',', 0usize), (b';', 0), (b'\t', 0), (b'|', 0)];
    for ch in first_line.chars() {
        if ch == '"' {
            in_quotes = !in_quotes;
            continue;
        }
        if in_quotes {
            continue;
        }
        for (delim, count) in counts.iter_mut() {
            if ch == *delim as char {
                *count += 1;
            }
        }
    }
    // Comma wins ties, including the no-delimiter case.
    counts
        .iter()
        .fold((b',', 0usize), |best, &(delim, count)| {
            if count > best.1 { (delim, count) } else { best }
        })
        .0
}

/// BOM-aware decode; bytes that are not valid UTF-8 are read as Windows-1252,
/// which is what spreadsheet tools on Windows export by default.
pub(crate) fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return text;
    }
    if let Some(text) = UTF_8.decode_without_bom_handling_and_without_replacement(bytes) {
        return text;
    }
    debug!("Input is not valid UTF-8; decoding as {}", WINDOWS_1252.name());
    let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
    text
}

/// Decodes a classified upload into a grid, applying the size ceiling first.
pub struct TabularReader {
    config: ReaderConfig,
    workbook_decoder: Box<dyn SheetDecoder>,
    csv_decoder: Box<dyn SheetDecoder>,
}

impl TabularReader {
    pub fn new(config: ReaderConfig) -> Self {
        Self {
            config,
            workbook_decoder: Box::new(WorkbookDecoder),
            csv_decoder: Box::new(CsvDecoder),
        }
    }

    pub fn with_workbook_decoder(mut self, decoder: impl SheetDecoder + 'static) -> Self {
        self.workbook_decoder = Box::new(decoder);
        self
    }

    pub fn with_csv_decoder(mut self, decoder: impl SheetDecoder + 'static) -> Self {
        self.csv_decoder = Box::new(decoder);
        self
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    pub fn read(&self, bytes: &[u8], file_type: FileType) -> Result<RawTable, FormatError> {
        if bytes.len() > self.config.max_file_size_bytes {
            return Err(FormatError::FileTooLarge {
                limit_bytes: self.config.max_file_size_bytes,
            });
        }

        let table = match file_type {
            FileType::Xlsx | FileType::Xls => self.workbook_decoder.decode(bytes)?.compact(),
            FileType::Csv => self.csv_decoder.decode(bytes)?.compact(),
            FileType::Json => read_json(bytes, &self.config)?,
        };

        if table.is_empty() {
            return Err(FormatError::EmptyFile);
        }
        debug!(
            "Decoded {} file into {} row(s) x {} column(s)",
            file_type,
            table.len(),
            table.width()
        );
        Ok(table)
    }
}

impl Default for TabularReader {
    fn default() -> Self {
        Self::new(ReaderConfig::default())
    }
}

fn read_json(bytes: &[u8], config: &ReaderConfig) -> Result<RawTable, FormatError> {
    let text = decode_text(bytes);
    let parsed: JsonValue = serde_json::from_str(&text)?;
    let JsonValue::Array(items) = parsed else {
        return Err(FormatError::InvalidJson);
    };
    if items.is_empty() {
        return Err(FormatError::InvalidJson);
    }

    if config.json_arrays_as_rows && items.iter().all(JsonValue::is_array) {
        let rows = items
            .iter()
            .filter_map(JsonValue::as_array)
            .map(|row| row.iter().map(json_cell).collect())
            .collect();
        return Ok(RawTable::new(rows).compact());
    }

    let mut keys: Vec<String> = Vec::new();
    let mut seen = HashSet::new();
    for item in &items {
        let item_keys: Vec<String> = match item {
            JsonValue::Object(map) => map.keys().cloned().collect(),
            JsonValue::Array(values) => (0..values.len()).map(|idx| idx.to_string()).collect(),
            _ => return Err(FormatError::InvalidJson),
        };
        for key in item_keys {
            if seen.insert(key.clone()) {
                keys.push(key);
            }
        }
    }

    let mut rows = Vec::with_capacity(items.len() + 1);
    rows.push(keys.iter().map(|key| CellValue::text(key.as_str())).collect());
    for item in &items {
        let row = keys
            .iter()
            .map(|key| lookup_json(item, key).map_or(CellValue::Empty, json_cell))
            .collect();
        rows.push(row);
    }
    Ok(RawTable::new(rows))
}

fn lookup_json<'a>(item: &'a JsonValue, key: &str) -> Option<&'a JsonValue> {
    match item {
        JsonValue::Object(map) => map.get(key),
        JsonValue::Array(values) => key.parse::<usize>().ok().and_then(|idx| values.get(idx)),
        _ => None,
    }
}

fn json_cell(value: &JsonValue) -> CellValue {
    match value {
        JsonValue::Null => CellValue::Empty,
        JsonValue::Bool(b) => CellValue::Boolean(*b),
        JsonValue::Number(n) => n.as_f64().map_or(CellValue::Empty, CellValue::Number),
        JsonValue::String(s) if s.is_empty() => CellValue::Empty,
        JsonValue::String(s) => CellValue::Text(s.clone()),
        nested => CellValue::Text(nested.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_row(values: &[&str]) -> Vec<CellValue> {
        values.iter().map(|v| CellValue::text(*v)).collect()
    }

    #[test]
    fn csv_cells_keep_numeric_and_boolean_types() {
        assert_eq!(csv_cell("10"), CellValue::Number(10.0));
        assert_eq!(csv_cell("-2.5"), CellValue::Number(-2.5));
        assert_eq!(csv_cell("TRUE"), CellValue::Boolean(true));
        assert_eq!(csv_cell("00123"), CellValue::text("00123"));
        assert_eq!(csv_cell("0.5"), CellValue::Number(0.5));
        assert_eq!(csv_cell(" 10 "), CellValue::text(" 10 "));
        assert_eq!(csv_cell("$19.99"), CellValue::text("$19.99"));
        assert_eq!(csv_cell(""), CellValue::Empty);
    }

    #[test]
    fn sniffs_semicolon_and_tab_delimiters() {
        assert_eq!(sniff_delimiter("a;b;c\n1;2;3"), b';');
        assert_eq!(sniff_delimiter("a\tb\n1\t2"), b'\t');
        assert_eq!(sniff_delimiter("\"a;b\",c\n"), b',');
        assert_eq!(sniff_delimiter("single"), b',');
    }

    #[test]
    fn decode_text_falls_back_to_windows_1252() {
        let bytes = b"Caf\xe9,1\n";
        assert_eq!(decode_text(bytes), "Café,1\n");
        let with_bom = b"\xef\xbb\xbfname\n";
        assert_eq!(decode_text(with_bom), "name\n");
    }

    #[test]
    fn csv_decoder_handles_quotes_and_ragged_rows() {
        let table = CsvDecoder
            .decode(b"name,notes\n\"Widget, large\",\"said \"\"hi\"\"\"\nBolt\n")
            .unwrap()
            .compact();
        assert_eq!(table.len(), 3);
        assert_eq!(table.rows[1], text_row(&["Widget, large", "said \"hi\""]));
        assert_eq!(table.rows[2], vec![CellValue::text("Bolt"), CellValue::Empty]);
    }

    #[test]
    fn json_objects_union_keys_in_first_seen_order() {
        let table = read_json(
            br#"[{"name":"Widget","qty":3},{"sku":"W-1","name":"Bolt","qty":null}]"#,
            &ReaderConfig::default(),
        )
        .unwrap();
        assert_eq!(table.rows[0], text_row(&["name", "qty", "sku"]));
        assert_eq!(
            table.rows[1],
            vec![CellValue::text("Widget"), CellValue::Number(3.0), CellValue::Empty]
        );
        assert_eq!(
            table.rows[2],
            vec![CellValue::text("Bolt"), CellValue::Empty, CellValue::text("W-1")]
        );
    }

    #[test]
    fn json_array_of_arrays_gains_positional_header_row() {
        let table = read_json(br#"[["name","qty"],["Widget",3]]"#, &ReaderConfig::default())
            .unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.rows[0], text_row(&["0", "1"]));
        assert_eq!(table.rows[1], text_row(&["name", "qty"]));
    }

    #[test]
    fn json_array_of_arrays_can_be_read_as_rows() {
        let config = ReaderConfig {
            json_arrays_as_rows: true,
            ..ReaderConfig::default()
        };
        let table = read_json(br#"[["name","qty"],["Widget",3]]"#, &config).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0], text_row(&["name", "qty"]));
    }

    #[test]
    fn json_rejects_non_tabular_shapes() {
        let config = ReaderConfig::default();
        for payload in [&b"{}"[..], b"[]", b"[1,2,3]", b"\"text\"", b"[{\"a\":1}, 5]"] {
            assert_eq!(read_json(payload, &config), Err(FormatError::InvalidJson));
        }
    }
}
