use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref DECIMAL: Regex = Regex::new(r"^\d+(\.\d+)?$").unwrap();
    static ref INTEGER: Regex = Regex::new(r"^\d+$").unwrap();
}

/// Parses a non-negative decimal such as `"36.5"`. Signs, exponents and
/// separators are rejected before parsing.
pub fn parse_decimal(raw: &str) -> Result<f64, String> {
    if !DECIMAL.is_match(raw) {
        return Err(format!("'{}' is not a decimal number", raw));
    }
    raw.parse::<f64>()
        .map_err(|_| format!("'{}' is not a decimal number", raw))
}

/// Parses a non-negative integer such as `"120"`.
pub fn parse_integer(raw: &str) -> Result<i64, String> {
    if !INTEGER.is_match(raw) {
        return Err(format!("'{}' is not a whole number", raw));
    }
    raw.parse::<i64>()
        .map_err(|_| format!("'{}' is out of range", raw))
}
