//! Lenient number parsing and display formatting
//!
//! Cell contents are text. Numeric contexts read them with a permissive prefix
//! parser: leading whitespace is skipped and the longest numeric prefix wins, so
//! `"12abc"` reads as `12` and `"abc"` reads as nothing.

use lazy_regex::regex_is_match;

/// Parse the longest numeric prefix of `text`.
///
/// Accepts an optional sign, digits with an optional fraction, an optional
/// exponent, and `Infinity`. Returns `None` if no digits are found.
pub fn parse_number_prefix(text: &str) -> Option<f64> {
    let s = text.trim_start();
    let bytes = s.as_bytes();
    let len = bytes.len();
    let mut end = 0;

    let negative = match bytes.first() {
        Some(b'-') => {
            end = 1;
            true
        }
        Some(b'+') => {
            end = 1;
            false
        }
        _ => false,
    };

    if s[end..].starts_with("Infinity") {
        return Some(if negative {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        });
    }

    let int_start = end;
    while end < len && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let int_digits = end - int_start;

    let mut frac_digits = 0;
    if end < len && bytes[end] == b'.' {
        let mut j = end + 1;
        while j < len && bytes[j].is_ascii_digit() {
            j += 1;
        }
        frac_digits = j - end - 1;
        if int_digits + frac_digits > 0 {
            end = j;
        }
    }

    if int_digits + frac_digits == 0 {
        return None;
    }

    if end < len && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut j = end + 1;
        if j < len && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        let exp_start = j;
        while j < len && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            end = j;
        }
    }

    let mut literal = String::with_capacity(end + 1);
    if negative {
        literal.push('-');
    }
    if int_digits == 0 {
        literal.push('0');
    }
    literal.push_str(&s[int_start..end]);
    literal.parse().ok()
}

/// Parse text that is entirely a decimal number, ignoring surrounding whitespace.
///
/// Unlike [`parse_number_prefix`], trailing junk rejects the whole text.
pub fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if !regex_is_match!(r"^[+-]?([0-9]+\.?[0-9]*|\.[0-9]+)([eE][+-]?[0-9]+)?$", trimmed) {
        return None;
    }
    trimmed.parse().ok()
}

/// Read text as a number, treating anything unparseable as `0`.
pub fn lenient_number(text: &str) -> f64 {
    parse_number_prefix(text).unwrap_or(0.0)
}

/// Format a number for display.
///
/// Integers print without a fractional part, other values in shortest
/// round-trip form; very large and very small magnitudes switch to exponent
/// notation (`1e+21`, `1e-7`). Negative zero prints as `0`.
pub fn format_number(n: f64) -> String {
    if n == 0.0 {
        return "0".to_string();
    }
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }

    let magnitude = n.abs();
    if magnitude >= 1e21 || magnitude < 1e-6 {
        let formatted = format!("{:e}", n);
        return match formatted.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
            _ => formatted,
        };
    }

    format!("{}", n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number_prefix() {
        assert_eq!(parse_number_prefix("42"), Some(42.0));
        assert_eq!(parse_number_prefix("  -3.5"), Some(-3.5));
        assert_eq!(parse_number_prefix("+7"), Some(7.0));
        assert_eq!(parse_number_prefix(".5"), Some(0.5));
        assert_eq!(parse_number_prefix("-.5"), Some(-0.5));
        assert_eq!(parse_number_prefix("1."), Some(1.0));
        assert_eq!(parse_number_prefix("1e3"), Some(1000.0));
        assert_eq!(parse_number_prefix("2E-2x"), Some(0.02));
        assert_eq!(parse_number_prefix("Infinity"), Some(f64::INFINITY));
    }

    #[test]
    fn test_parse_number_prefix_stops_at_junk() {
        assert_eq!(parse_number_prefix("12abc"), Some(12.0));
        assert_eq!(parse_number_prefix("3.14.15"), Some(3.14));
        assert_eq!(parse_number_prefix("5e"), Some(5.0));
        assert_eq!(parse_number_prefix("5e+"), Some(5.0));
        assert_eq!(parse_number_prefix("1,000"), Some(1.0));
    }

    #[test]
    fn test_parse_number_prefix_rejects() {
        assert_eq!(parse_number_prefix(""), None);
        assert_eq!(parse_number_prefix("   "), None);
        assert_eq!(parse_number_prefix("x"), None);
        assert_eq!(parse_number_prefix("-"), None);
        assert_eq!(parse_number_prefix("."), None);
        assert_eq!(parse_number_prefix("Bob"), None);
        assert_eq!(parse_number_prefix("#N/A"), None);
    }

    #[test]
    fn test_parse_number_is_strict() {
        assert_eq!(parse_number(" 42 "), Some(42.0));
        assert_eq!(parse_number("-1.5e3"), Some(-1500.0));
        assert_eq!(parse_number(".5"), Some(0.5));
        assert_eq!(parse_number("12abc"), None);
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn test_lenient_number() {
        assert_eq!(lenient_number("x"), 0.0);
        assert_eq!(lenient_number(""), 0.0);
        assert_eq!(lenient_number("10"), 10.0);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(8.0), "8");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(1e21), "1e+21");
        assert_eq!(format_number(1.5e-7), "1.5e-7");
        assert_eq!(format_number(123456789.0), "123456789");
    }
}
