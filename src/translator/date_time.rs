//! SQL Server translations for dates: `DateTime` members, `DATEDIFF` stubs
//! and `ISDATE`.

use super::traits::*;
use crate::ast::*;
use crate::error::QueryResult;
use crate::factory::SqlExpressionFactory;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DatePart {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

impl DatePart {
    fn keyword(self) -> &'static str {
        match self {
            DatePart::Year => "year",
            DatePart::Month => "month",
            DatePart::Day => "day",
            DatePart::Hour => "hour",
            DatePart::Minute => "minute",
            DatePart::Second => "second",
        }
    }

    /// Parse the unit suffix of `AddDays`, `DateDiffMonth`, ...
    fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "Year" | "Years" => Some(DatePart::Year),
            "Month" | "Months" => Some(DatePart::Month),
            "Day" | "Days" => Some(DatePart::Day),
            "Hour" | "Hours" => Some(DatePart::Hour),
            "Minute" | "Minutes" => Some(DatePart::Minute),
            "Second" | "Seconds" => Some(DatePart::Second),
            _ => None,
        }
    }
}

/// `DateTime.AddDays(n)` and friends, plus `DateTime.Now` / `UtcNow`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateTimeTranslator;

enum DateTimeMember {
    Add(DatePart),
    Now,
    UtcNow,
}

impl DateTimeMember {
    fn recognize(method: &MethodInfo) -> Option<Self> {
        if method.declaring_type != DeclaringType::DateTime {
            return None;
        }
        match (method.name.as_str(), method.is_static) {
            ("Now", true) => Some(DateTimeMember::Now),
            ("UtcNow", true) => Some(DateTimeMember::UtcNow),
            (name, false) => name
                .strip_prefix("Add")
                .and_then(DatePart::from_suffix)
                .map(DateTimeMember::Add),
            _ => None,
        }
    }
}

impl MethodCallTranslator for DateTimeTranslator {
    fn id(&self) -> &'static str {
        "date_time"
    }

    fn translate(
        &self,
        instance: Option<&SqlExpr>,
        method: &MethodInfo,
        arguments: &[SqlExpr],
        factory: &SqlExpressionFactory,
    ) -> QueryResult<Option<SqlExpr>> {
        let Some(member) = DateTimeMember::recognize(method) else {
            return Ok(None);
        };
        let date_mapping = Some(factory.find_mapping(StoreKind::DateTime));

        let sql = match member {
            DateTimeMember::Now => {
                expect_arity(method, arguments, 0)?;
                factory.function("GETDATE", Vec::new(), false, date_mapping)
            }
            DateTimeMember::UtcNow => {
                expect_arity(method, arguments, 0)?;
                factory.function("GETUTCDATE", Vec::new(), false, date_mapping)
            }
            DateTimeMember::Add(part) => {
                expect_arity(method, arguments, 1)?;
                let date = expect_instance(method, instance)?;
                factory.function(
                    "DATEADD",
                    vec![factory.fragment(part.keyword()), arguments[0].clone(), date.clone()],
                    true,
                    date.type_mapping().cloned().or(date_mapping),
                )
            }
        };
        Ok(Some(sql))
    }
}

/// `DbFunctions.DateDiffDay(start, end)` and the other units.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateDiffTranslator;

impl MethodCallTranslator for DateDiffTranslator {
    fn id(&self) -> &'static str {
        "date_diff"
    }

    fn translate(
        &self,
        _instance: Option<&SqlExpr>,
        method: &MethodInfo,
        arguments: &[SqlExpr],
        factory: &SqlExpressionFactory,
    ) -> QueryResult<Option<SqlExpr>> {
        if method.declaring_type != DeclaringType::DbFunctions {
            return Ok(None);
        }
        let Some(part) = method
            .name
            .strip_prefix("DateDiff")
            .and_then(DatePart::from_suffix)
        else {
            return Ok(None);
        };

        expect_arity(method, arguments, 2)?;
        Ok(Some(factory.function(
            "DATEDIFF",
            vec![factory.fragment(part.keyword()), arguments[0].clone(), arguments[1].clone()],
            true,
            Some(factory.find_mapping(StoreKind::Integer)),
        )))
    }
}

/// `DbFunctions.IsDate(s)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct IsDateTranslator;

impl MethodCallTranslator for IsDateTranslator {
    fn id(&self) -> &'static str {
        "is_date"
    }

    fn translate(
        &self,
        _instance: Option<&SqlExpr>,
        method: &MethodInfo,
        arguments: &[SqlExpr],
        factory: &SqlExpressionFactory,
    ) -> QueryResult<Option<SqlExpr>> {
        if method.declaring_type != DeclaringType::DbFunctions || method.name != "IsDate" {
            return Ok(None);
        }
        expect_arity(method, arguments, 1)?;

        let int_mapping = Some(factory.find_mapping(StoreKind::Integer));
        let is_date = factory.function("ISDATE", vec![arguments[0].clone()], false, int_mapping);
        let bool_mapping = factory.find_mapping(StoreKind::Bool);
        Ok(Some(factory.function(
            "CONVERT",
            vec![factory.fragment(bool_mapping.store_type.clone()), is_date],
            false,
            Some(bool_mapping),
        )))
    }
}
