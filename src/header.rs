//! Locating the header row of a raw table.
//!
//! Uploaded spreadsheets often start with report titles, blank spacer rows, or
//! export metadata before the real column labels. Each row in the scan window
//! is scored on two signals:
//!
//! * cells whose normalized text matches the header keyword dictionary, worth
//!   two points each;
//! * columns where this row holds label-like text and the following row holds
//!   data-like values (numbers, dates, booleans), worth one point each.
//!
//! Rows that are empty, or that carry far fewer cells than the widest row in the
//! window (a lone title cell, say), are never candidates. The highest score wins
//! and the lowest index wins ties. Without any signal the first row is assumed.

use log::debug;

use crate::{
    config::HeaderConfig,
    data::{CellValue, RawTable},
    matcher::normalize_column_name,
    sanitize::{parse_date_text, sanitize_number},
};

const KEYWORD_WEIGHT: usize = 2;
const TYPE_CONTRAST_WEIGHT: usize = 1;
/// Keywords at least this long also match as a substring ("productname").
const KEYWORD_CONTAINS_MIN_LEN: usize = 4;

#[derive(Debug, Clone)]
pub struct HeaderRowDetector {
    scan_rows: usize,
    keywords: Vec<String>,
}

impl Default for HeaderRowDetector {
    fn default() -> Self {
        Self::new(&HeaderConfig::default())
    }
}

impl HeaderRowDetector {
    pub fn new(config: &HeaderConfig) -> Self {
        let mut keywords: Vec<String> = config
            .keywords
            .iter()
            .map(|keyword| normalize_column_name(keyword))
            .filter(|keyword| !keyword.is_empty())
            .collect();
        keywords.sort();
        keywords.dedup();
        Self {
            scan_rows: config.scan_rows,
            keywords,
        }
    }

    /// Index of the most header-like row among the first `scan_rows` rows.
    pub fn detect(&self, table: &RawTable) -> usize {
        let window = &table.rows[..table.len().min(self.scan_rows)];
        let widest = window.iter().map(|row| non_empty_count(row)).max().unwrap_or(0);

        let mut best: Option<(usize, usize)> = None;
        for (index, row) in window.iter().enumerate() {
            if self.is_disqualified(row, widest) {
                continue;
            }
            let next = window.get(index + 1).map(Vec::as_slice);
            let score = self.score_row(row, next);
            debug!("Header candidate row {index} scored {score}");
            if best.is_none_or(|(_, best_score)| score > best_score) {
                best = Some((index, score));
            }
        }

        match best {
            Some((index, score)) if score > 0 => index,
            _ => 0,
        }
    }

    fn is_disqualified(&self, row: &[CellValue], widest: usize) -> bool {
        let filled = non_empty_count(row);
        filled == 0 || (filled == 1 && widest > 1) || filled * 2 < widest
    }

    fn score_row(&self, row: &[CellValue], next: Option<&[CellValue]>) -> usize {
        let keyword_hits = row.iter().filter(|cell| self.is_keyword(cell)).count();
        let contrast = next.map_or(0, |next| {
            row.iter()
                .zip(next)
                .filter(|(label, value)| value_is_header_like(label) && value_is_data_like(value))
                .count()
        });
        keyword_hits * KEYWORD_WEIGHT + contrast * TYPE_CONTRAST_WEIGHT
    }

    fn is_keyword(&self, cell: &CellValue) -> bool {
        let CellValue::Text(text) = cell else {
            return false;
        };
        let normalized = normalize_column_name(text);
        if normalized.is_empty() {
            return false;
        }
        self.keywords.iter().any(|keyword| {
            normalized == *keyword
                || (keyword.len() >= KEYWORD_CONTAINS_MIN_LEN && normalized.contains(keyword.as_str()))
        })
    }
}

/// Header row index using the default keyword dictionary and scan window.
pub fn detect_header_row(table: &RawTable) -> usize {
    HeaderRowDetector::default().detect(table)
}

/// Trimmed labels of the header row. Blank labels become `Column N` (1-based).
/// An index past the end of the table yields no headers.
pub fn get_headers(table: &RawTable, header_index: usize) -> Vec<String> {
    let Some(row) = table.row(header_index) else {
        return Vec::new();
    };
    row.iter()
        .enumerate()
        .map(|(position, cell)| {
            let label = cell.as_display();
            let label = label.trim();
            if label.is_empty() {
                format!("Column {}", position + 1)
            } else {
                label.to_string()
            }
        })
        .collect()
}

/// Every row strictly after the header.
pub fn get_data_rows(table: &RawTable, header_index: usize) -> &[Vec<CellValue>] {
    table.rows.get(header_index.saturating_add(1)..).unwrap_or(&[])
}

fn non_empty_count(row: &[CellValue]) -> usize {
    row.iter().filter(|cell| !cell.is_blank()).count()
}

fn value_is_data_like(cell: &CellValue) -> bool {
    match cell {
        CellValue::Number(_) | CellValue::Boolean(_) | CellValue::Timestamp(_) => true,
        CellValue::Empty => false,
        CellValue::Text(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return false;
            }
            let lowered = trimmed.to_ascii_lowercase();
            if matches!(lowered.as_str(), "true" | "false" | "yes" | "no") {
                return true;
            }
            let number = sanitize_number(cell);
            (number.value.is_some() && !number.warning) || parse_date_text(trimmed).is_some()
        }
    }
}

fn value_is_header_like(cell: &CellValue) -> bool {
    match cell {
        CellValue::Text(text) => {
            !value_is_data_like(cell) && text.chars().any(|c| c.is_alphabetic())
        }
        _ => false,
    }
}
