//! Number and currency coercion.
//!
//! Clean input (a plain numeric literal, or a conventionally formatted amount
//! such as `$1,234.56` or `(45.00)`) is accepted without comment. Anything else
//! goes through a fixed sequence of extraction attempts; the first that yields a
//! number wins and the result is flagged for review.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::{SanitizeResult, WarningType};
use crate::data::{CellValue, format_number};

static CLEAN_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)$").expect("valid clean number pattern")
});

static CLEAN_CURRENCY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<open>\()?\s*(?P<sign>[-+])?\s*(?P<symbol>[$€£¥])?\s*(?P<inner_sign>-)?(?P<amount>\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)\s*(?P<close>\))?$",
    )
    .expect("valid clean currency pattern")
});

static SCIENTIFIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[+-]?(?:\d+\.?\d*|\.\d+)[eE][+-]?\d+").expect("valid scientific pattern")
});

static CURRENCY_LIKE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\(?\s*[-+]?\s*(?:[$€£¥₹]|[A-Za-z]{3}\s)?\s*-?\s*\d[\d.,'\s]*?\s*(?:[$€£¥₹]|\s?[A-Za-z]{3})?\s*\)?$",
    )
    .expect("valid currency-like pattern")
});

static NEGATIVE_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^0-9A-Za-z])-\s?(\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)")
        .expect("valid negative pattern")
});

static FIRST_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?").expect("valid embedded number pattern")
});

pub fn sanitize_number(value: &CellValue) -> SanitizeResult<f64> {
    match value {
        CellValue::Empty => SanitizeResult::empty(),
        CellValue::Number(n) if n.is_finite() => SanitizeResult::clean(*n),
        CellValue::Number(n) => SanitizeResult::warned(
            None,
            WarningType::NumberExtraction,
            format!("'{n}' is not a finite number"),
        ),
        CellValue::Text(s) => sanitize_number_text(s),
        other => sanitize_number_text(&other.as_display()),
    }
}

/// Number sanitization with any warning reported as a currency problem.
pub fn sanitize_currency(value: &CellValue) -> SanitizeResult<f64> {
    sanitize_number(value).relabel(WarningType::CurrencyParsing)
}

fn sanitize_number_text(raw: &str) -> SanitizeResult<f64> {
    let text = raw.trim();
    if text.is_empty() {
        return SanitizeResult::empty();
    }
    if CLEAN_NUMBER.is_match(text)
        && let Ok(parsed) = text.parse::<f64>()
        && parsed.is_finite()
    {
        return SanitizeResult::clean(parsed);
    }
    if let Some(parsed) = parse_clean_currency(text) {
        return SanitizeResult::clean(parsed);
    }

    let extracted = extract_scientific(text)
        .or_else(|| extract_currency(text))
        .or_else(|| extract_negative(text))
        .or_else(|| extract_first_number(text));

    match extracted {
        Some(parsed) => SanitizeResult::warned(
            Some(parsed),
            WarningType::NumberExtraction,
            format!("Extracted {} from '{text}'", format_number(parsed)),
        ),
        None => SanitizeResult::warned(
            None,
            WarningType::NumberExtraction,
            format!("Could not parse '{text}' as a number"),
        ),
    }
}

fn parse_clean_currency(text: &str) -> Option<f64> {
    let caps = CLEAN_CURRENCY.captures(text)?;
    let parenthesised = caps.name("open").is_some();
    if parenthesised != caps.name("close").is_some() {
        return None;
    }
    let signs = [caps.name("sign"), caps.name("inner_sign")]
        .into_iter()
        .flatten()
        .count();
    if signs > 1 || (parenthesised && signs > 0) {
        return None;
    }
    let amount = caps
        .name("amount")?
        .as_str()
        .replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())?;
    Some(if parenthesised || is_negative_sign(&caps) {
        -amount
    } else {
        amount
    })
}

fn is_negative_sign(caps: &Captures<'_>) -> bool {
    caps.name("sign").is_some_and(|m| m.as_str() == "-") || caps.name("inner_sign").is_some()
}

fn extract_scientific(text: &str) -> Option<f64> {
    let found = SCIENTIFIC.find(text)?;
    found.as_str().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Amounts written with symbols, codes, or locale-specific separators such as
/// `1.234,56 €` or `USD 1 299.00`.
fn extract_currency(text: &str) -> Option<f64> {
    if !CURRENCY_LIKE.is_match(text) {
        return None;
    }
    let negative = text.starts_with('(') || text.contains('-');
    let digits: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.'))
        .collect();
    let amount = parse_with_separators(&digits)?;
    Some(if negative { -amount } else { amount })
}

/// Decides which of `,` and `.` is the decimal separator. The one appearing
/// last wins; a lone comma followed by exactly three digits is a thousands
/// separator.
fn parse_with_separators(digits: &str) -> Option<f64> {
    let normalized = match (digits.rfind(','), digits.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => digits.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => digits.replace(',', ""),
        (Some(comma), None) => {
            let decimals = digits.len() - comma - 1;
            if digits.matches(',').count() == 1 && decimals != 3 {
                digits.replace(',', ".")
            } else {
                digits.replace(',', "")
            }
        }
        (None, Some(_)) if digits.matches('.').count() > 1 => digits.replace('.', ""),
        _ => digits.to_string(),
    };
    normalized.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn extract_negative(text: &str) -> Option<f64> {
    let caps = NEGATIVE_NUMBER.captures(text)?;
    let magnitude = caps
        .get(1)?
        .as_str()
        .replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())?;
    Some(-magnitude)
}

fn extract_first_number(text: &str) -> Option<f64> {
    let found = FIRST_NUMBER.find(text)?;
    found.as_str().replace(',', "").parse::<f64>().ok().filter(|n| n.is_finite())
}
