//! Raw SQL format text parser using nom.
//!
//! Raw-SQL fragments carry composite-format placeholders:
//!
//! ```text
//! SELECT * FROM Orders WHERE CustomerId = {0} AND Total > {1}
//!                                         ─┬─             ─┬─
//!                                          │               └── argument 1
//!                                          └── argument 0
//! ```
//!
//! `{{` and `}}` stand for literal braces.

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{is_not, tag},
    character::complete::{char, digit1},
    combinator::{map, map_res, value},
    multi::many0,
    sequence::delimited,
};

use crate::error::{QueryError, QueryResult};

/// One piece of raw SQL format text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatSegment<'a> {
    Text(&'a str),
    Placeholder(usize),
    OpenBrace,
    CloseBrace,
}

/// Split raw SQL format text into literal text and argument placeholders.
pub fn parse_format_sql(input: &str) -> QueryResult<Vec<FormatSegment<'_>>> {
    match many0(parse_segment)(input) {
        Ok(("", segments)) => Ok(segments),
        Ok((remaining, _)) => Err(QueryError::parse(
            input.len() - remaining.len(),
            format!("Unbalanced brace in raw SQL: '{}'", remaining),
        )),
        Err(e) => Err(QueryError::parse(0, format!("Parse failed: {:?}", e))),
    }
}

/// Number of arguments the format text refers to (highest index + 1).
pub fn placeholder_count(input: &str) -> QueryResult<usize> {
    let segments = parse_format_sql(input)?;
    Ok(segments
        .iter()
        .filter_map(|s| match s {
            FormatSegment::Placeholder(i) => Some(i + 1),
            _ => None,
        })
        .max()
        .unwrap_or(0))
}

fn parse_segment(input: &str) -> IResult<&str, FormatSegment<'_>> {
    alt((
        value(FormatSegment::OpenBrace, tag("{{")),
        value(FormatSegment::CloseBrace, tag("}}")),
        map(parse_placeholder, FormatSegment::Placeholder),
        map(is_not("{}"), FormatSegment::Text),
    ))(input)
}

fn parse_placeholder(input: &str) -> IResult<&str, usize> {
    delimited(char('{'), map_res(digit1, str::parse::<usize>), char('}'))(input)
}
