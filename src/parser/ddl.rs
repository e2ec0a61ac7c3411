use crate::core::SqlType;
use super::common::{identifier, keyword, object_name, ws};
use super::statement::{ColumnDef, Statement};
use nom::{
    branch::alt,
    character::complete::{char, digit1},
    combinator::{map, map_res, opt},
    multi::separated_list1,
    sequence::{delimited, pair, preceded},
    IResult,
};

/// Declared column type: SQL type, optional length, geometry marker.
type TypeSpec = (SqlType, Option<u32>, bool);

fn length(input: &str) -> IResult<&str, u32> {
    map_res(
        delimited(
            ws(char('(')),
            pair(ws(digit1), opt(preceded(ws(char(',')), ws(digit1)))),
            ws(char(')')),
        ),
        |(len, _): (&str, Option<&str>)| len.parse::<u32>(),
    )(input)
}

fn sized<'a>(kw: &'static str, sql_type: SqlType) -> impl FnMut(&'a str) -> IResult<&'a str, TypeSpec> {
    map(pair(keyword(kw), opt(length)), move |(_, len)| (sql_type, len, false))
}

fn plain<'a>(kw: &'static str, sql_type: SqlType) -> impl FnMut(&'a str) -> IResult<&'a str, TypeSpec> {
    map(keyword(kw), move |_| (sql_type, None, false))
}

fn geometry(input: &str) -> IResult<&str, TypeSpec> {
    map(keyword("GEOMETRY"), |_| (SqlType::VarBinary, None, true))(input)
}

pub fn data_type(input: &str) -> IResult<&str, TypeSpec> {
    alt((
        alt((
            plain("SMALLINT", SqlType::SmallInt),
            plain("INTEGER", SqlType::Integer),
            plain("INT", SqlType::Integer),
            plain("BIGINT", SqlType::BigInt),
            plain("REAL", SqlType::Real),
            plain("FLOAT", SqlType::Real),
            map(pair(keyword("DOUBLE"), opt(ws(keyword("PRECISION")))), |_| (SqlType::Double, None, false)),
            sized("DECIMAL", SqlType::Decimal),
            sized("NUMERIC", SqlType::Decimal),
            plain("BOOLEAN", SqlType::Boolean),
            plain("BOOL", SqlType::Boolean),
        )),
        alt((
            plain("DATE", SqlType::Date),
            plain("TIMESTAMP", SqlType::Timestamp),
            plain("TIME", SqlType::Time),
            sized("VARCHAR", SqlType::Varchar),
            sized("NVARCHAR", SqlType::Varchar),
            sized("CHAR", SqlType::Varchar),
            sized("TEXT", SqlType::Varchar),
            sized("STRING", SqlType::Varchar),
            plain("BLOB", SqlType::Blob),
            sized("VARBINARY", SqlType::VarBinary),
            geometry,
        )),
    ))(input)
}

fn column_def(input: &str) -> IResult<&str, ColumnDef> {
    let (input, name) = ws(identifier)(input)?;
    let (input, (data_type, length, geometry)) = ws(data_type)(input)?;
    let (input, primary_key) = opt(pair(ws(keyword("PRIMARY")), ws(keyword("KEY"))))(input)?;
    let (input, not_null) = opt(pair(ws(keyword("NOT")), ws(keyword("NULL"))))(input)?;
    let (input, _) = opt(ws(keyword("NULL")))(input)?;

    Ok((
        input,
        ColumnDef {
            name,
            data_type,
            length,
            nullable: not_null.is_none() && primary_key.is_none(),
            primary_key: primary_key.is_some(),
            geometry,
        },
    ))
}

pub fn create_table(input: &str) -> IResult<&str, Statement> {
    let (input, _) = pair(ws(keyword("CREATE")), ws(keyword("TABLE")))(input)?;
    let (input, name) = ws(object_name)(input)?;
    let (input, columns) = delimited(
        ws(char('(')),
        separated_list1(ws(char(',')), column_def),
        ws(char(')')),
    )(input)?;

    Ok((input, Statement::CreateTable { name, columns }))
}

pub fn drop_table(input: &str) -> IResult<&str, Statement> {
    let (input, _) = pair(ws(keyword("DROP")), ws(keyword("TABLE")))(input)?;
    let (input, name) = ws(object_name)(input)?;

    Ok((input, Statement::DropTable { name }))
}
