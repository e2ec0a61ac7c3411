use crate::core::Value;
use super::literal::parse_number;
use super::statement::ColumnRef;
use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, tag_no_case, take_while},
    character::complete::{char, digit1, multispace0, one_of, satisfy},
    combinator::{map, map_opt, not, opt, recognize, value as constant, verify},
    multi::{fold_many0, separated_list1},
    sequence::{delimited, pair, terminated, tuple},
    IResult,
};

pub fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

const fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

const fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// Words that end an expression and can never be bare identifiers.
const RESERVED: &[&str] = &[
    "SELECT", "FROM", "WHERE", "AND", "OR", "NOT", "JOIN", "INNER", "LEFT", "RIGHT", "FULL", "OUTER",
    "CROSS", "ON", "ORDER", "BY", "ASC", "DESC", "AS", "IS", "NULL", "LIKE", "IN", "BETWEEN", "UNION",
    "LIMIT", "OFFSET", "SET", "VALUES",
];

fn is_reserved(word: &str) -> bool {
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(word))
}

/// Case-insensitive keyword that is not the prefix of a longer word.
pub fn keyword<'a>(kw: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(tag_no_case(kw), not(satisfy(is_ident_char)))
}

fn bare_identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(satisfy(is_ident_start), take_while(is_ident_char)))(input)
}

fn quoted_identifier(input: &str) -> IResult<&str, String> {
    map(delimited(char('"'), is_not("\""), char('"')), str::to_string)(input)
}

/// Bare identifier (not a reserved word) or double-quoted identifier.
pub fn identifier(input: &str) -> IResult<&str, String> {
    alt((
        quoted_identifier,
        map(verify(bare_identifier, |s: &str| !is_reserved(s)), str::to_string),
    ))(input)
}

/// Possibly dotted object name, e.g. `main.parcels`.
pub fn object_name(input: &str) -> IResult<&str, String> {
    map(separated_list1(char('.'), identifier), |parts| parts.join("."))(input)
}

/// `col`, `t.col` or `schema.t.col`; the last two parts are kept.
pub fn column_ref(input: &str) -> IResult<&str, ColumnRef> {
    map(separated_list1(char('.'), identifier), |mut parts| {
        let name = parts.pop().unwrap_or_default();
        match parts.pop() {
            Some(qualifier) => ColumnRef::qualified(qualifier, name),
            None => ColumnRef::bare(name),
        }
    })(input)
}

/// Single-quoted string with `''` escapes.
pub fn string_literal(input: &str) -> IResult<&str, String> {
    delimited(
        char('\''),
        fold_many0(
            alt((is_not("'"), constant("'", tag("''")))),
            String::new,
            |mut acc: String, part: &str| {
                acc.push_str(part);
                acc
            },
        ),
        char('\''),
    )(input)
}

pub fn number(input: &str) -> IResult<&str, Value> {
    map_opt(
        recognize(tuple((
            opt(one_of("+-")),
            digit1,
            opt(pair(char('.'), digit1)),
            opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
        ))),
        parse_number,
    )(input)
}

pub fn value(input: &str) -> IResult<&str, Value> {
    alt((
        map(keyword("NULL"), |_| Value::Null),
        map(keyword("TRUE"), |_| Value::Bool(true)),
        map(keyword("FALSE"), |_| Value::Bool(false)),
        map(string_literal, Value::Text),
        number,
    ))(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_requires_word_boundary() {
        assert!(keyword("AND")("AND x").is_ok());
        assert!(keyword("AND")("ANDROID").is_err());
    }

    #[test]
    fn test_identifier_rejects_reserved_words() {
        assert!(identifier("from").is_err());
        assert_eq!(identifier("\"from\"").unwrap().1, "from");
        assert_eq!(identifier("T_Id rest").unwrap(), (" rest", "T_Id".to_string()));
    }

    #[test]
    fn test_column_ref_keeps_last_two_parts() {
        let (_, col) = column_ref("s.\"Parcel\".name").unwrap();
        assert_eq!(col, ColumnRef::qualified("Parcel", "name"));
    }

    #[test]
    fn test_string_literal_unescapes_quotes() {
        assert_eq!(string_literal("'O''Brien'").unwrap().1, "O'Brien");
        assert_eq!(string_literal("''").unwrap().1, "");
    }

    #[test]
    fn test_value_literals() {
        assert_eq!(value("NULL").unwrap().1, Value::Null);
        assert_eq!(value("-12").unwrap().1, Value::Int(-12));
        assert_eq!(value("1e3").unwrap().1, Value::Double(1000.0));
    }
}
