//! SQL Server translations for `Math` functions.

use super::traits::*;
use crate::ast::*;
use crate::error::QueryResult;
use crate::factory::SqlExpressionFactory;

#[derive(Debug, Clone, Copy, Default)]
pub struct MathTranslator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MathFunction {
    Abs,
    Ceiling,
    Floor,
    Round,
    Power,
    Sqrt,
    Sign,
    Exp,
    Log10,
}

impl MathFunction {
    fn recognize(method: &MethodInfo) -> Option<Self> {
        if method.declaring_type != DeclaringType::Math || !method.is_static {
            return None;
        }
        let function = match method.name.as_str() {
            "Abs" => MathFunction::Abs,
            "Ceiling" => MathFunction::Ceiling,
            "Floor" => MathFunction::Floor,
            "Round" => MathFunction::Round,
            "Pow" | "Power" => MathFunction::Power,
            "Sqrt" => MathFunction::Sqrt,
            "Sign" => MathFunction::Sign,
            "Exp" => MathFunction::Exp,
            "Log10" => MathFunction::Log10,
            _ => return None,
        };
        Some(function)
    }

    fn sql_name(self) -> &'static str {
        match self {
            MathFunction::Abs => "ABS",
            MathFunction::Ceiling => "CEILING",
            MathFunction::Floor => "FLOOR",
            MathFunction::Round => "ROUND",
            MathFunction::Power => "POWER",
            MathFunction::Sqrt => "SQRT",
            MathFunction::Sign => "SIGN",
            MathFunction::Exp => "EXP",
            MathFunction::Log10 => "LOG10",
        }
    }
}

impl MethodCallTranslator for MathTranslator {
    fn id(&self) -> &'static str {
        "math"
    }

    fn translate(
        &self,
        _instance: Option<&SqlExpr>,
        method: &MethodInfo,
        arguments: &[SqlExpr],
        factory: &SqlExpressionFactory,
    ) -> QueryResult<Option<SqlExpr>> {
        let Some(function) = MathFunction::recognize(method) else {
            return Ok(None);
        };

        let arguments = match function {
            // Round(x) rounds to zero decimals
            MathFunction::Round if arguments.len() == 1 => vec![arguments[0].clone(), factory.constant(0)],
            // midpoint rounding modes have no SQL Server equivalent
            MathFunction::Round if arguments.len() == 3 => return Ok(None),
            MathFunction::Round | MathFunction::Power => {
                expect_arity(method, arguments, 2)?;
                arguments.to_vec()
            }
            _ => {
                expect_arity(method, arguments, 1)?;
                arguments.to_vec()
            }
        };

        let type_mapping = match function {
            MathFunction::Sqrt | MathFunction::Exp | MathFunction::Log10 | MathFunction::Power => {
                Some(factory.find_mapping(StoreKind::Float))
            }
            MathFunction::Sign => Some(factory.find_mapping(StoreKind::Integer)),
            _ => arguments[0].type_mapping().cloned(),
        };

        Ok(Some(factory.function(function.sql_name(), arguments, true, type_mapping)))
    }
}
