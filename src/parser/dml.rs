use super::common::{identifier, keyword, object_name, value, ws};
use super::queries::where_clause;
use super::statement::Statement;
use nom::{
    character::complete::char,
    combinator::opt,
    multi::separated_list1,
    sequence::{delimited, pair, tuple},
    IResult,
};

pub fn insert(input: &str) -> IResult<&str, Statement> {
    let (input, _) = pair(ws(keyword("INSERT")), ws(keyword("INTO")))(input)?;
    let (input, table) = ws(object_name)(input)?;
    let (input, columns) = opt(delimited(
        ws(char('(')),
        separated_list1(ws(char(',')), ws(identifier)),
        ws(char(')')),
    ))(input)?;
    let (input, _) = ws(keyword("VALUES"))(input)?;
    let (input, rows) = separated_list1(
        ws(char(',')),
        delimited(ws(char('(')), separated_list1(ws(char(',')), ws(value)), ws(char(')'))),
    )(input)?;

    Ok((input, Statement::Insert { table, columns, rows }))
}

pub fn update(input: &str) -> IResult<&str, Statement> {
    let (input, _) = ws(keyword("UPDATE"))(input)?;
    let (input, table) = ws(object_name)(input)?;
    let (input, _) = ws(keyword("SET"))(input)?;
    let (input, assignments) = separated_list1(
        ws(char(',')),
        tuple((ws(identifier), ws(char('=')), ws(value))),
    )(input)?;
    let assignments = assignments
        .into_iter()
        .map(|(col, _, val)| (col, val))
        .collect();
    let (input, filter) = where_clause(input)?;

    Ok((
        input,
        Statement::Update {
            table,
            assignments,
            filter,
        },
    ))
}

pub fn delete(input: &str) -> IResult<&str, Statement> {
    let (input, _) = pair(ws(keyword("DELETE")), ws(keyword("FROM")))(input)?;
    let (input, from) = ws(object_name)(input)?;
    let (input, filter) = where_clause(input)?;

    Ok((input, Statement::Delete { from, filter }))
}
