use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use super::{SanitizedValue, WarningType, sanitize_cell};
use crate::{data::CellValue, schema::ColumnDefinition};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellWarning {
    pub message: String,
    #[serde(rename = "type")]
    pub warning_type: WarningType,
}

/// One record keyed by schema column id.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SanitizeRowResult {
    pub data: BTreeMap<String, Option<SanitizedValue>>,
    pub warning_count: usize,
    pub warnings: BTreeMap<String, CellWarning>,
}

impl SanitizeRowResult {
    pub fn has_warnings(&self) -> bool {
        self.warning_count > 0
    }
}

/// Sanitizes every schema column of `row`. Columns missing from the row are
/// treated as empty; keys that are not schema column ids are ignored.
pub fn sanitize_row(
    row: &HashMap<String, CellValue>,
    columns: &[ColumnDefinition],
) -> SanitizeRowResult {
    let mut result = SanitizeRowResult::default();
    for column in columns {
        let value = row.get(&column.id).unwrap_or(&CellValue::Empty);
        let sanitized = sanitize_cell(value, column);
        if sanitized.warning {
            result.warnings.insert(
                column.id.clone(),
                CellWarning {
                    message: sanitized
                        .warning_message
                        .unwrap_or_else(|| format!("Value in '{}' needs review", column.name)),
                    warning_type: sanitized.warning_type.unwrap_or(WarningType::Other),
                },
            );
        }
        result.data.insert(column.id.clone(), sanitized.value);
    }
    result.warning_count = result.warnings.len();
    result
}
