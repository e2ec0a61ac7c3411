use super::common::{column_ref, identifier, keyword, object_name, string_literal, value, ws};
use super::statement::{
    ColumnRef, Condition, CountTarget, FromClause, JoinClause, JoinType, Operand, OrderItem, SelectItem,
    SelectStatement, SortOrder, Statement, TableRef,
};
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::char,
    combinator::{map, opt},
    multi::{many0, separated_list1},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

fn operand(input: &str) -> IResult<&str, Operand> {
    alt((map(value, Operand::Literal), map(column_ref, Operand::Column)))(input)
}

// Parse a simple condition (column = value, column = other.column, etc.)
fn condition_term(input: &str) -> IResult<&str, Condition> {
    alt((
        delimited(ws(char('(')), condition, ws(char(')'))),
        map(
            tuple((ws(column_ref), ws(keyword("IS")), ws(keyword("NOT")), ws(keyword("NULL")))),
            |(col, _, _, _)| Condition::IsNotNull(col),
        ),
        map(
            tuple((ws(column_ref), ws(keyword("IS")), ws(keyword("NULL")))),
            |(col, _, _)| Condition::IsNull(col),
        ),
        map(
            tuple((ws(column_ref), ws(keyword("BETWEEN")), ws(value), ws(keyword("AND")), ws(value))),
            |(col, _, low, _, high)| Condition::Between(col, low, high),
        ),
        map(
            tuple((ws(column_ref), ws(keyword("LIKE")), ws(string_literal))),
            |(col, _, pattern)| Condition::Like(col, pattern),
        ),
        map(
            tuple((
                ws(column_ref),
                ws(keyword("IN")),
                delimited(ws(char('(')), separated_list1(ws(char(',')), ws(value)), ws(char(')'))),
            )),
            |(col, _, values)| Condition::In(col, values),
        ),
        map(
            tuple((
                ws(column_ref),
                ws(alt((tag(">="), tag("<="), tag("!="), tag("<>"), tag("="), tag(">"), tag("<")))),
                ws(operand),
            )),
            |(column, op, rhs)| match op {
                "!=" | "<>" => Condition::NotEquals(column, rhs),
                ">" => Condition::GreaterThan(column, rhs),
                "<" => Condition::LessThan(column, rhs),
                ">=" => Condition::GreaterThanOrEqual(column, rhs),
                "<=" => Condition::LessThanOrEqual(column, rhs),
                _ => Condition::Equals(column, rhs),
            },
        ),
    ))(input)
}

// Parse AND conditions (higher priority than OR)
fn condition_and(input: &str) -> IResult<&str, Condition> {
    let (input, first) = condition_term(input)?;
    let (input, rest) = opt(preceded(ws(keyword("AND")), condition_and))(input)?;

    match rest {
        Some(right) => Ok((input, Condition::And(Box::new(first), Box::new(right)))),
        None => Ok((input, first)),
    }
}

// Parse OR conditions (lower priority than AND)
pub fn condition(input: &str) -> IResult<&str, Condition> {
    let (input, first) = condition_and(input)?;
    let (input, rest) = opt(preceded(ws(keyword("OR")), condition))(input)?;

    match rest {
        Some(right) => Ok((input, Condition::Or(Box::new(first), Box::new(right)))),
        None => Ok((input, first)),
    }
}

fn alias(input: &str) -> IResult<&str, String> {
    preceded(opt(ws(keyword("AS"))), ws(identifier))(input)
}

fn count_item(input: &str) -> IResult<&str, SelectItem> {
    map(
        pair(
            preceded(
                ws(keyword("COUNT")),
                delimited(
                    ws(char('(')),
                    alt((
                        map(ws(char('*')), |_| CountTarget::All),
                        map(ws(char('1')), |_| CountTarget::All),
                        map(ws(column_ref), CountTarget::Column),
                    )),
                    ws(char(')')),
                ),
            ),
            opt(alias),
        ),
        |(target, alias)| SelectItem::Count { target, alias },
    )(input)
}

fn select_item(input: &str) -> IResult<&str, SelectItem> {
    alt((
        map(ws(char('*')), |_| SelectItem::Wildcard),
        map(terminated(ws(identifier), tuple((char('.'), char('*')))), SelectItem::QualifiedWildcard),
        count_item,
        map(pair(ws(value), opt(alias)), |(value, alias)| SelectItem::Literal { value, alias }),
        map(pair(ws(column_ref), opt(alias)), |(column, alias)| SelectItem::Column { column, alias }),
    ))(input)
}

/// Comma separated projection list, as between SELECT and FROM.
pub fn select_list(input: &str) -> IResult<&str, Vec<SelectItem>> {
    separated_list1(ws(char(',')), select_item)(input)
}

fn table_ref(input: &str) -> IResult<&str, TableRef> {
    map(pair(ws(object_name), opt(alias)), |(name, alias)| TableRef { name, alias })(input)
}

fn join_type(input: &str) -> IResult<&str, JoinType> {
    terminated(
        alt((
            map(ws(keyword("INNER")), |_| JoinType::Inner),
            map(pair(ws(keyword("LEFT")), opt(ws(keyword("OUTER")))), |_| JoinType::Left),
            map(pair(ws(keyword("RIGHT")), opt(ws(keyword("OUTER")))), |_| JoinType::Right),
            map(pair(ws(keyword("FULL")), opt(ws(keyword("OUTER")))), |_| JoinType::Full),
            map(ws(keyword("CROSS")), |_| JoinType::Cross),
        )),
        ws(keyword("JOIN")),
    )(input)
}

// Parse JOIN clause: [INNER|LEFT|RIGHT|FULL|CROSS] JOIN table [alias] [ON conditions]
pub fn join_clause(input: &str) -> IResult<&str, JoinClause> {
    let (input, join_type) = alt((join_type, map(ws(keyword("JOIN")), |_| JoinType::Inner)))(input)?;
    let (input, table) = table_ref(input)?;
    let (input, on) = opt(preceded(ws(keyword("ON")), condition))(input)?;

    Ok((input, JoinClause { join_type, table, on }))
}

// Parse optional WHERE clause
pub fn where_clause(input: &str) -> IResult<&str, Option<Condition>> {
    opt(preceded(ws(keyword("WHERE")), condition))(input)
}

fn order_item(input: &str) -> IResult<&str, OrderItem> {
    map(
        pair(
            ws(column_ref),
            opt(alt((
                map(ws(keyword("ASC")), |_| SortOrder::Asc),
                map(ws(keyword("DESC")), |_| SortOrder::Desc),
            ))),
        ),
        |(column, order): (ColumnRef, Option<SortOrder>)| OrderItem {
            column,
            order: order.unwrap_or(SortOrder::Asc),
        },
    )(input)
}

/// Sort keys without the ORDER BY keywords.
pub fn order_list(input: &str) -> IResult<&str, Vec<OrderItem>> {
    separated_list1(ws(char(',')), order_item)(input)
}

// Parse optional ORDER BY clause
pub fn order_by(input: &str) -> IResult<&str, Vec<OrderItem>> {
    map(
        opt(preceded(
            pair(ws(keyword("ORDER")), ws(keyword("BY"))),
            order_list,
        )),
        Option::unwrap_or_default,
    )(input)
}

fn from_clause(input: &str) -> IResult<&str, FromClause> {
    alt((
        map(
            pair(delimited(ws(char('(')), select_statement, ws(char(')'))), opt(alias)),
            |(select, alias)| FromClause::SubSelect {
                select: Box::new(select),
                alias,
            },
        ),
        map(table_ref, FromClause::Table),
    ))(input)
}

pub fn select_statement(input: &str) -> IResult<&str, SelectStatement> {
    let (input, _) = ws(keyword("SELECT"))(input)?;
    let (input, items) = select_list(input)?;
    let (input, _) = ws(keyword("FROM"))(input)?;
    let (input, from) = from_clause(input)?;

    // Parse optional JOIN clauses
    let (input, joins) = many0(join_clause)(input)?;

    let (input, filter) = where_clause(input)?;
    let (input, order_by) = order_by(input)?;

    Ok((
        input,
        SelectStatement {
            items,
            from,
            joins,
            filter,
            order_by,
        },
    ))
}

pub fn select(input: &str) -> IResult<&str, Statement> {
    map(select_statement, Statement::Select)(input)
}
