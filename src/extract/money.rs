// src/extract/money.rs
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

// --- Compiled Patterns ---

// Accounting-style negative: an opening paren followed by a currency code,
// e.g. "(AED 15.00)".
static PAREN_CURRENCY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(\s*[A-Za-z]").expect("valid paren-currency pattern"));

// First numeric token, used when the cleaned string as a whole will not parse.
static NUM_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("valid numeric token pattern"));

/// Parses a dashboard amount like "AED 1,234.56" or "-AED 15.00" into a
/// `Decimal`.
///
/// The dashboard renders amounts with a currency token, thousands separators
/// and occasional stray text, so this is deliberately forgiving: anything
/// that is not a digit, dot, comma or minus is stripped, commas go next, and
/// if the remainder still does not parse the first numeric token wins.
/// Unparseable input yields zero rather than an error; a missing amount must
/// not sink a whole extraction run.
///
/// A minus anywhere in the raw text, or a parenthesized currency marker,
/// forces the result negative.
pub fn parse(text: &str) -> Decimal {
    if text.trim().is_empty() {
        return Decimal::ZERO;
    }

    let negative = text.contains('-') || PAREN_CURRENCY.is_match(text);

    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();
    let cleaned = cleaned.replace(',', "");

    let value = Decimal::from_str(&cleaned).ok().unwrap_or_else(|| {
        NUM_TOKEN
            .find(&cleaned)
            .and_then(|m| Decimal::from_str(m.as_str()).ok())
            .unwrap_or(Decimal::ZERO)
    });

    if negative {
        -value.abs()
    } else {
        value
    }
}

/// Strict variant for already-isolated numerics like the distance capture:
/// thousands separators are allowed, anything else is `None`.
pub fn parse_plain(text: &str) -> Option<Decimal> {
    Decimal::from_str(&text.replace(',', "")).ok()
}
