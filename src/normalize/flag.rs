use serde_json::Value;

/// Reads a boolean flag from any of the representations clients and storage
/// backends use: JSON booleans, `0`/`1`, or their textual forms.
pub fn normalize_flag(value: &Value) -> Result<bool, String> {
    match value {
        Value::Null => Ok(false),
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(format!("expected 0 or 1, got {}", n)),
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "1" | "y" | "yes" => Ok(true),
            "false" | "f" | "0" | "n" | "no" | "" => Ok(false),
            other => Err(format!("'{}' is not a boolean", other)),
        },
        _ => Err("expected a boolean".to_string()),
    }
}
