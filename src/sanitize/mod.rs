//! Per-cell and per-row coercion of raw values into canonical typed values.
//!
//! Sanitizers never fail. A cell that cannot be interpreted comes back with
//! `value: None` and `warning: true`; a cell that was empty comes back with
//! `value: None` and `warning: false`. Anything in between (a number pulled out
//! of surrounding text, whitespace that had to be collapsed) keeps its best-effort
//! value and carries a warning for the user to review.

mod date;
mod number;
mod row;
mod text;

use serde::{Deserialize, Serialize};

use crate::{
    data::CellValue,
    schema::{ColumnDefinition, ColumnType},
};

pub use date::{parse_date_text, sanitize_date};
pub use number::{sanitize_currency, sanitize_number};
pub use row::{CellWarning, SanitizeRowResult, sanitize_row};
pub use text::{sanitize_select, sanitize_text};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningType {
    Whitespace,
    NumberExtraction,
    CurrencyParsing,
    DateParsing,
    Other,
}

impl WarningType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningType::Whitespace => "whitespace",
            WarningType::NumberExtraction => "number_extraction",
            WarningType::CurrencyParsing => "currency_parsing",
            WarningType::DateParsing => "date_parsing",
            WarningType::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SanitizeResult<T> {
    pub value: Option<T>,
    pub warning: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning_type: Option<WarningType>,
}

impl<T> SanitizeResult<T> {
    pub fn clean(value: T) -> Self {
        Self {
            value: Some(value),
            warning: false,
            warning_message: None,
            warning_type: None,
        }
    }

    /// The input was empty. Never used for invalid input.
    pub fn empty() -> Self {
        Self {
            value: None,
            warning: false,
            warning_message: None,
            warning_type: None,
        }
    }

    pub fn warned(value: Option<T>, warning_type: WarningType, message: impl Into<String>) -> Self {
        Self {
            value,
            warning: true,
            warning_message: Some(message.into()),
            warning_type: Some(warning_type),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> SanitizeResult<U> {
        SanitizeResult {
            value: self.value.map(f),
            warning: self.warning,
            warning_message: self.warning_message,
            warning_type: self.warning_type,
        }
    }

    /// Replaces the warning category of a result that already carries one.
    pub fn relabel(mut self, warning_type: WarningType) -> Self {
        if self.warning_type.is_some() {
            self.warning_type = Some(warning_type);
        }
        self
    }
}

/// Canonical value of one sanitized cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SanitizedValue {
    Text(String),
    Number(f64),
    /// ISO 8601 date or date-time.
    Date(String),
}

/// Sanitizes one raw value according to the column's declared type.
pub fn sanitize_cell(value: &CellValue, column: &ColumnDefinition) -> SanitizeResult<SanitizedValue> {
    match column.column_type {
        ColumnType::Text => sanitize_text(value).map(SanitizedValue::Text),
        ColumnType::Number => sanitize_number(value).map(SanitizedValue::Number),
        ColumnType::Currency => sanitize_currency(value).map(SanitizedValue::Number),
        ColumnType::Date => sanitize_date(value).map(SanitizedValue::Date),
        ColumnType::Select => sanitize_select(value).map(SanitizedValue::Text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relabel_only_touches_warned_results() {
        let clean = SanitizeResult::clean(1.0).relabel(WarningType::CurrencyParsing);
        assert_eq!(clean.warning_type, None);

        let warned = SanitizeResult::warned(Some(1.0), WarningType::NumberExtraction, "x")
            .relabel(WarningType::CurrencyParsing);
        assert_eq!(warned.warning_type, Some(WarningType::CurrencyParsing));
        assert!(warned.warning);
    }

    #[test]
    fn sanitize_cell_dispatches_on_column_type() {
        let currency = ColumnDefinition::new("c3", "Price", ColumnType::Currency);
        let result = sanitize_cell(&CellValue::text("USD 12.50"), &currency);
        assert_eq!(result.value, Some(SanitizedValue::Number(12.5)));
        assert_eq!(result.warning_type, Some(WarningType::CurrencyParsing));

        let date = ColumnDefinition::new("c4", "Received", ColumnType::Date);
        let result = sanitize_cell(&CellValue::text("2024/03/09"), &date);
        assert_eq!(result.value, Some(SanitizedValue::Date("2024-03-09".to_string())));
    }

    #[test]
    fn result_serializes_with_camel_case_and_skips_absent_warning() {
        let json = serde_json::to_string(&SanitizeResult::clean(3.5)).unwrap();
        assert_eq!(json, r#"{"value":3.5,"warning":false}"#);
        let json = serde_json::to_string(&SanitizeResult::<f64>::warned(
            None,
            WarningType::DateParsing,
            "bad",
        ))
        .unwrap();
        assert_eq!(
            json,
            r#"{"value":null,"warning":true,"warningMessage":"bad","warningType":"date_parsing"}"#
        );
    }
}
