//! SQL Server translations for `string` members.

use super::traits::*;
use crate::ast::*;
use crate::error::QueryResult;
use crate::factory::SqlExpressionFactory;

#[derive(Debug, Clone, Copy, Default)]
pub struct StringMethodTranslator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StringMethod {
    ToUpper,
    ToLower,
    Trim,
    TrimStart,
    TrimEnd,
    Contains,
    StartsWith,
    EndsWith,
    Replace,
    Substring,
    IsNullOrEmpty,
}

impl StringMethod {
    fn recognize(method: &MethodInfo) -> Option<Self> {
        if method.declaring_type != DeclaringType::String {
            return None;
        }
        let shape = match (method.name.as_str(), method.is_static) {
            ("ToUpper", false) => StringMethod::ToUpper,
            ("ToLower", false) => StringMethod::ToLower,
            ("Trim", false) => StringMethod::Trim,
            ("TrimStart", false) => StringMethod::TrimStart,
            ("TrimEnd", false) => StringMethod::TrimEnd,
            ("Contains", false) => StringMethod::Contains,
            ("StartsWith", false) => StringMethod::StartsWith,
            ("EndsWith", false) => StringMethod::EndsWith,
            ("Replace", false) => StringMethod::Replace,
            ("Substring", false) => StringMethod::Substring,
            ("IsNullOrEmpty", true) => StringMethod::IsNullOrEmpty,
            _ => return None,
        };
        Some(shape)
    }
}

fn is_empty_string(expr: &SqlExpr) -> bool {
    matches!(
        expr.as_ref(),
        SqlExpression::Constant(SqlConstant { value: Value::String(s), .. }) if s.is_empty()
    )
}

fn string_mapping(expr: &SqlExpr, factory: &SqlExpressionFactory) -> TypeMapping {
    expr.type_mapping()
        .cloned()
        .unwrap_or_else(|| factory.find_mapping(StoreKind::String))
}

impl MethodCallTranslator for StringMethodTranslator {
    fn id(&self) -> &'static str {
        "string"
    }

    fn translate(
        &self,
        instance: Option<&SqlExpr>,
        method: &MethodInfo,
        arguments: &[SqlExpr],
        factory: &SqlExpressionFactory,
    ) -> QueryResult<Option<SqlExpr>> {
        let Some(shape) = StringMethod::recognize(method) else {
            return Ok(None);
        };
        let f = factory;

        if shape == StringMethod::IsNullOrEmpty {
            expect_arity(method, arguments, 1)?;
            let s = &arguments[0];
            return Ok(Some(f.or_else(
                f.is_null(s.clone()),
                f.equal(s.clone(), f.constant_with_mapping(Value::from(""), s.type_mapping().cloned())),
            )));
        }

        let x = expect_instance(method, instance)?;
        let mapping = string_mapping(x, f);
        let unary = |name: &str| f.function(name, vec![x.clone()], true, Some(mapping.clone()));

        let sql = match shape {
            StringMethod::ToUpper => {
                expect_arity(method, arguments, 0)?;
                unary("UPPER")
            }
            StringMethod::ToLower => {
                expect_arity(method, arguments, 0)?;
                unary("LOWER")
            }
            // trimming specific characters has no SQL Server equivalent
            StringMethod::Trim | StringMethod::TrimStart | StringMethod::TrimEnd if !arguments.is_empty() => {
                return Ok(None);
            }
            StringMethod::Trim => f.function(
                "LTRIM",
                vec![unary("RTRIM")],
                true,
                Some(mapping.clone()),
            ),
            StringMethod::TrimStart => unary("LTRIM"),
            StringMethod::TrimEnd => unary("RTRIM"),
            StringMethod::Contains => {
                expect_arity(method, arguments, 1)?;
                let pattern = &arguments[0];
                if is_empty_string(pattern) {
                    f.bool_constant(true)
                } else {
                    let found = f.greater_than(
                        f.function(
                            "CHARINDEX",
                            vec![pattern.clone(), x.clone()],
                            true,
                            Some(f.find_mapping(StoreKind::Integer)),
                        ),
                        f.constant(0),
                    );
                    if matches!(pattern.as_ref(), SqlExpression::Constant(_)) {
                        found
                    } else {
                        // CHARINDEX of an empty pattern is 0
                        let empty = f.constant_with_mapping(Value::from(""), Some(mapping.clone()));
                        f.or_else(f.equal(pattern.clone(), empty), found)
                    }
                }
            }
            StringMethod::StartsWith | StringMethod::EndsWith => {
                expect_arity(method, arguments, 1)?;
                let prefix = &arguments[0];
                if is_empty_string(prefix) {
                    f.bool_constant(true)
                } else {
                    let name = if shape == StringMethod::StartsWith { "LEFT" } else { "RIGHT" };
                    let length = f.function(
                        "LEN",
                        vec![prefix.clone()],
                        true,
                        Some(f.find_mapping(StoreKind::Integer)),
                    );
                    f.equal(
                        f.function(name, vec![x.clone(), length], true, Some(mapping.clone())),
                        prefix.clone(),
                    )
                }
            }
            StringMethod::Replace => {
                expect_arity(method, arguments, 2)?;
                f.function(
                    "REPLACE",
                    vec![x.clone(), arguments[0].clone(), arguments[1].clone()],
                    true,
                    Some(mapping.clone()),
                )
            }
            // Substring(start) has no direct translation
            StringMethod::Substring if arguments.len() == 1 => return Ok(None),
            StringMethod::Substring => {
                expect_arity(method, arguments, 2)?;
                // SUBSTRING is 1-based
                let start = f.add(arguments[0].clone(), f.constant(1));
                f.function(
                    "SUBSTRING",
                    vec![x.clone(), start, arguments[1].clone()],
                    true,
                    Some(mapping.clone()),
                )
            }
            StringMethod::IsNullOrEmpty => return Ok(None),
        };
        Ok(Some(sql))
    }
}
