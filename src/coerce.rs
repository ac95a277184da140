// Best-effort scalar parsing for scraped CSV cells.
//
// Source files mix empty cells, "-" placeholders, and numeric text freely;
// a malformed cell must never abort an import, so every function here
// returns a value and nothing returns a Result.

/// Placeholder token stats.nba.com emits for absent values.
const PLACEHOLDER: &str = "-";

/// Tokens accepted as `true` for boolean columns, case-insensitive.
/// The scraped files carry a mix of English and Spanish truthy spellings.
const TRUE_TOKENS: &[&str] = &["true", "1", "yes", "sí", "si"];

/// Parse `raw` as an integer, falling back to `default` for empty cells,
/// the `-` placeholder, or unparsable text. Accepts decimal-point input
/// (`"12.0"` → 12) because some exports write integer columns as floats.
pub fn coerce_int(raw: &str, default: i64) -> i64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == PLACEHOLDER {
        return default;
    }
    if let Ok(n) = trimmed.parse::<i64>() {
        return n;
    }
    match trimmed.parse::<f64>() {
        Ok(f) if f.is_finite() => f.trunc() as i64,
        _ => default,
    }
}

/// Parse `raw` as a float, falling back to `default` for empty cells, the
/// `-` placeholder, unparsable text, or non-finite values.
pub fn coerce_float(raw: &str, default: f64) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == PLACEHOLDER {
        return default;
    }
    match trimmed.parse::<f64>() {
        Ok(f) if f.is_finite() => f,
        _ => default,
    }
}

/// Parse `raw` as a boolean via the truthy-token set. Anything not in the
/// set (including empty input) is `false`.
pub fn parse_bool(raw: &str) -> bool {
    let lowered = raw.trim().to_lowercase();
    TRUE_TOKENS.contains(&lowered.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- coerce_int --

    #[test]
    fn int_valid_text() {
        assert_eq!(coerce_int("12", 0), 12);
        assert_eq!(coerce_int(" -7 ", 0), -7);
        assert_eq!(coerce_int("0", 99), 0);
    }

    #[test]
    fn int_decimal_point_truncated() {
        assert_eq!(coerce_int("12.0", 0), 12);
        assert_eq!(coerce_int("3.9", 0), 3);
        assert_eq!(coerce_int("-2.5", 0), -2);
    }

    #[test]
    fn int_malformed_returns_default() {
        assert_eq!(coerce_int("", 0), 0);
        assert_eq!(coerce_int("   ", 5), 5);
        assert_eq!(coerce_int("-", 3), 3);
        assert_eq!(coerce_int("abc", -1), -1);
        assert_eq!(coerce_int("NaN", 7), 7);
    }

    // -- coerce_float --

    #[test]
    fn float_valid_text() {
        assert!((coerce_float("3.5", 0.0) - 3.5).abs() < f64::EPSILON);
        assert!((coerce_float("12", 0.0) - 12.0).abs() < f64::EPSILON);
        assert!((coerce_float(" 0.482 ", 0.0) - 0.482).abs() < f64::EPSILON);
    }

    #[test]
    fn float_malformed_returns_default() {
        assert!((coerce_float("", 0.0)).abs() < f64::EPSILON);
        assert!((coerce_float("-", 1.5) - 1.5).abs() < f64::EPSILON);
        assert!((coerce_float("abc", 2.0) - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn float_non_finite_returns_default() {
        assert!((coerce_float("inf", 0.0)).abs() < f64::EPSILON);
        assert!((coerce_float("NaN", 4.0) - 4.0).abs() < f64::EPSILON);
    }

    // -- parse_bool --

    #[test]
    fn bool_truthy_tokens() {
        assert!(parse_bool("true"));
        assert!(parse_bool("TRUE"));
        assert!(parse_bool("1"));
        assert!(parse_bool("yes"));
        assert!(parse_bool("sí"));
        assert!(parse_bool(" si "));
    }

    #[test]
    fn bool_everything_else_false() {
        assert!(!parse_bool("false"));
        assert!(!parse_bool("0"));
        assert!(!parse_bool(""));
        assert!(!parse_bool("no"));
        assert!(!parse_bool("-"));
    }
}
