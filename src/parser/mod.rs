// Module declarations
mod common;
mod ddl;
mod dml;
pub mod literal;
mod queries;
mod statement;

pub use statement::{
    ColumnDef, ColumnRef, Condition, CountTarget, FromClause, JoinClause, JoinType, Operand, OrderItem,
    SelectItem, SelectStatement, SortOrder, Statement, TableRef,
};

use nom::branch::alt;
use nom::IResult;

/// Runs `parser` over the whole of `input`; leftover text is an error.
fn parse_all<'a, O>(mut parser: impl FnMut(&'a str) -> IResult<&'a str, O>, input: &'a str, what: &str) -> Result<O, String> {
    match parser(input.trim()) {
        Ok((remaining, out)) if remaining.trim().is_empty() => Ok(out),
        Ok((remaining, _)) => Err(format!("Unexpected input after {what}: {remaining}")),
        Err(e) => Err(format!("Parse error: {e:?}")),
    }
}

pub fn parse_statement(input: &str) -> Result<Statement, String> {
    let input = input.trim();
    let input = input.trim_end_matches(';');

    let result = alt((
        ddl::create_table,
        ddl::drop_table,
        dml::insert,
        queries::select,
        dml::update,
        dml::delete,
    ))(input);

    match result {
        Ok((remaining, stmt)) => {
            if remaining.trim().is_empty() {
                Ok(stmt)
            } else {
                Err(format!("Unexpected input after statement: {remaining}"))
            }
        }
        Err(e) => Err(format!("Parse error: {e:?}")),
    }
}

/// Parses a bare filter expression as passed to a table scan.
pub fn parse_condition(input: &str) -> Result<Condition, String> {
    parse_all(queries::condition, input, "condition")
}

/// Parses a projection list such as `a, t.b AS x, 'lit', *`.
pub fn parse_select_list(input: &str) -> Result<Vec<SelectItem>, String> {
    parse_all(queries::select_list, input, "select list")
}

/// Parses the sort keys of an ORDER BY clause.
pub fn parse_order_list(input: &str) -> Result<Vec<OrderItem>, String> {
    parse_all(queries::order_list, input, "ORDER BY")
}

/// Parses a full SELECT statement.
pub fn parse_select(input: &str) -> Result<SelectStatement, String> {
    parse_all(queries::select_statement, input.trim().trim_end_matches(';'), "SELECT")
}
