//! Lenient parsing of scraped nutrition amounts.

use once_cell::sync::Lazy;
use regex::Regex;

static NON_NUMERIC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^0-9.]").expect("valid non-numeric regex"));

/// Parses amounts like `"12,5 г"` or `"340 kcal"` into a number.
///
/// Commas become decimal points and every other non-digit is dropped.
/// Anything still unparsable yields `0.0`.
pub fn parse_amount(text: &str) -> f64 {
    let normalized = text.replace(',', ".");
    let digits = NON_NUMERIC_RE.replace_all(&normalized, "");
    digits.parse::<f64>().unwrap_or(0.0)
}
