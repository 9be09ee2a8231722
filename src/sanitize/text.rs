use std::sync::LazyLock;

use regex::Regex;

use super::{SanitizeResult, WarningType};
use crate::data::CellValue;

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\r\n]+").expect("valid whitespace pattern"));

/// Stringifies and normalises whitespace. Empty input becomes an empty string.
pub fn sanitize_text(value: &CellValue) -> SanitizeResult<String> {
    match value {
        CellValue::Empty => SanitizeResult::clean(String::new()),
        other => collapse_whitespace(&other.as_display()),
    }
}

/// Like [`sanitize_text`], but blank input is reported as no value.
pub fn sanitize_select(value: &CellValue) -> SanitizeResult<String> {
    if value.is_blank() {
        return SanitizeResult::empty();
    }
    collapse_whitespace(&value.as_display())
}

/// Collapses internal whitespace runs to one space and trims. Only a collapse
/// that changed more than the trim would have counts as a warning.
fn collapse_whitespace(raw: &str) -> SanitizeResult<String> {
    let trimmed = raw.trim();
    let collapsed = WHITESPACE_RUN.replace_all(raw, " ");
    let collapsed = collapsed.trim();
    if collapsed == trimmed {
        SanitizeResult::clean(trimmed.to_string())
    } else {
        SanitizeResult::warned(
            Some(collapsed.to_string()),
            WarningType::Whitespace,
            "Extra whitespace was collapsed",
        )
    }
}
