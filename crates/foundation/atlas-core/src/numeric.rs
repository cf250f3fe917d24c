//! Lenient numeric parsing for wire values

use serde_json::Value;

/// Read a JSON value as a finite number.
///
/// Accepts numbers and numeric strings. `null`, missing values, `"NaN"`,
/// empty strings, infinities and anything else come back as `None`.
pub fn loose_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                trimmed.parse::<f64>().ok()
            }
        }
        _ => None,
    }?;

    number.is_finite().then_some(number)
}

/// Same as [`loose_number`] but truncated to an integer
pub fn loose_integer(value: &Value) -> Option<i64> {
    loose_number(value).map(|n| n.trunc() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numbers_and_numeric_strings() {
        assert_eq!(loose_number(&json!(450000)), Some(450000.0));
        assert_eq!(loose_number(&json!(12.5)), Some(12.5));
        assert_eq!(loose_number(&json!(" 380000 ")), Some(380000.0));
    }

    #[test]
    fn test_invalid_markers() {
        assert_eq!(loose_number(&Value::Null), None);
        assert_eq!(loose_number(&json!("NaN")), None);
        assert_eq!(loose_number(&json!("")), None);
        assert_eq!(loose_number(&json!("n/a")), None);
        assert_eq!(loose_number(&json!("inf")), None);
        assert_eq!(loose_number(&json!([1])), None);
        assert_eq!(loose_number(&json!(true)), None);
    }

    #[test]
    fn test_loose_integer() {
        assert_eq!(loose_integer(&json!("1985")), Some(1985));
        assert_eq!(loose_integer(&json!(1985.0)), Some(1985));
        assert_eq!(loose_integer(&json!("x")), None);
    }
}
