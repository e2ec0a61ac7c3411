//! SQL literal text: quoting, the tagged binary literal, and value parsing
//! for text read back from the engine.

use base64::{engine::general_purpose::STANDARD, Engine};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use crate::core::Value;

/// Prefix marking a string literal that carries base64 encoded bytes.
pub const BYTES_LITERAL_PREFIX: &str = "__FGDB_BYTES_B64__:";

/// Wraps text in single quotes, doubling embedded quotes.
pub fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

static NUMBER_TEXT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d+(?:\.\d+)?$").expect("valid number regex"));

/// Tagged text for a byte payload, unquoted.
pub fn encode_bytes(bytes: &[u8]) -> String {
    format!("{BYTES_LITERAL_PREFIX}{}", STANDARD.encode(bytes))
}

/// Decodes a tagged binary literal; `None` for any other text.
pub fn decode_bytes(text: &str) -> Option<Vec<u8>> {
    let payload = text.strip_prefix(BYTES_LITERAL_PREFIX)?;
    STANDARD.decode(payload.trim()).ok()
}

/// Number literal: integers become Int or Long by range, fractions Decimal,
/// exponent forms Double.
pub fn parse_number(text: &str) -> Option<Value> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(n) = text.parse::<i64>() {
        return Some(match i32::try_from(n) {
            Ok(i) => Value::Int(i),
            Err(_) => Value::Long(n),
        });
    }
    if text.contains(['e', 'E']) {
        return text.parse::<f64>().ok().map(Value::Double);
    }
    if text.contains('.') {
        if let Ok(d) = Decimal::from_str(text) {
            return Some(Value::Decimal(d));
        }
        return text.parse::<f64>().ok().map(Value::Double);
    }
    None
}

/// Interprets text read back from the engine.
///
/// Tagged binary literals decode to bytes, UUID-shaped text is kept as text,
/// numeric text becomes a number; everything else stays text.
pub fn parse_value(text: &str) -> Value {
    if let Some(bytes) = decode_bytes(text) {
        return Value::Bytes(bytes);
    }
    let trimmed = text.trim();
    // Hyphenated or braced GUIDs stay text even when every digit is decimal
    if trimmed.contains('-') && Uuid::parse_str(trimmed).is_ok() {
        return Value::Text(text.to_string());
    }
    if NUMBER_TEXT_RE.is_match(trimmed) {
        if let Some(v) = parse_number(trimmed) {
            return v;
        }
    }
    Value::Text(text.to_string())
}

/// Interprets one SQL literal token: `NULL`, a quoted string (with `''`
/// escapes and the binary tag), or a bare number.
pub fn parse_sql_literal(token: &str) -> Value {
    let token = token.trim();
    if token.eq_ignore_ascii_case("NULL") {
        return Value::Null;
    }
    if token.len() >= 2 && token.starts_with('\'') && token.ends_with('\'') {
        let inner = token[1..token.len() - 1].replace("''", "'");
        return decode_bytes(&inner).map_or(Value::Text(inner), Value::Bytes);
    }
    parse_value(token)
}

/// Byte ranges of `sql` that lie outside single-quoted literals.
///
/// Doubled quotes inside a literal are part of the literal.
pub fn outside_literals(sql: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut in_literal = false;
    let mut start = 0;
    let bytes = sql.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\'' {
            if in_literal {
                if bytes.get(i + 1) == Some(&b'\'') {
                    i += 2;
                    continue;
                }
                in_literal = false;
                start = i + 1;
            } else {
                if start < i {
                    spans.push((start, i));
                }
                in_literal = true;
            }
        }
        i += 1;
    }
    if !in_literal && start < bytes.len() {
        spans.push((start, bytes.len()));
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_literal_round_trip() {
        let text = encode_bytes(&[0, 1, 2, 255]);
        assert!(text.starts_with(BYTES_LITERAL_PREFIX));
        assert_eq!(decode_bytes(&text), Some(vec![0, 1, 2, 255]));
        assert_eq!(decode_bytes("plain"), None);
    }

    #[test]
    fn test_parse_value_numbers() {
        assert_eq!(parse_value("42"), Value::Int(42));
        assert_eq!(parse_value("-7"), Value::Int(-7));
        assert_eq!(parse_value("3000000000"), Value::Long(3_000_000_000));
        assert_eq!(parse_value("2.50"), Value::Decimal(Decimal::from_str("2.50").unwrap()));
        assert_eq!(parse_value("abc"), Value::Text("abc".into()));
        for loose in ["+5", "5.", ".5", "1.2.3", "-", "1e5"] {
            assert_eq!(parse_value(loose), Value::Text(loose.into()), "{loose}");
        }
    }

    #[test]
    fn test_parse_value_keeps_uuid_text() {
        let uuid = "{70737809-852C-4A03-9E22-2CECEA5B9BFA}";
        assert_eq!(parse_value(uuid), Value::Text(uuid.into()));
    }

    #[test]
    fn test_parse_sql_literal() {
        assert_eq!(parse_sql_literal("NULL"), Value::Null);
        assert_eq!(parse_sql_literal("'it''s'"), Value::Text("it's".into()));
        assert_eq!(parse_sql_literal("12"), Value::Int(12));
        let tagged = quote(&encode_bytes(b"xy"));
        assert_eq!(parse_sql_literal(&tagged), Value::Bytes(b"xy".to_vec()));
    }

    #[test]
    fn test_outside_literals_skips_quoted_text() {
        let sql = "a = 'x ''y'' z' AND b";
        let spans = outside_literals(sql);
        let outside: Vec<&str> = spans.iter().map(|(s, e)| &sql[*s..*e]).collect();
        assert_eq!(outside, vec!["a = ", " AND b"]);
    }
}
