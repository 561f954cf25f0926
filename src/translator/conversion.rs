//! SQL Server `CONVERT` translations: `Convert.ToXxx(x)` and `x.ToString()`.

use super::traits::*;
use crate::ast::*;
use crate::error::QueryResult;
use crate::factory::SqlExpressionFactory;

fn convert(factory: &SqlExpressionFactory, store_type: &str, kind: StoreKind, operand: SqlExpr) -> SqlExpr {
    factory.function(
        "CONVERT",
        vec![factory.fragment(store_type), operand],
        true,
        Some(TypeMapping::new(store_type, kind)),
    )
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConvertTranslator;

impl ConvertTranslator {
    fn target(name: &str) -> Option<(&'static str, StoreKind)> {
        let target = match name {
            "ToBoolean" => ("bit", StoreKind::Bool),
            "ToByte" => ("tinyint", StoreKind::Integer),
            "ToInt16" => ("smallint", StoreKind::Integer),
            "ToInt32" => ("int", StoreKind::Integer),
            "ToInt64" => ("bigint", StoreKind::Integer),
            "ToDecimal" => ("decimal(18, 2)", StoreKind::Decimal),
            "ToDouble" => ("float", StoreKind::Float),
            "ToString" => ("nvarchar(max)", StoreKind::String),
            _ => return None,
        };
        Some(target)
    }
}

impl MethodCallTranslator for ConvertTranslator {
    fn id(&self) -> &'static str {
        "convert"
    }

    fn translate(
        &self,
        _instance: Option<&SqlExpr>,
        method: &MethodInfo,
        arguments: &[SqlExpr],
        factory: &SqlExpressionFactory,
    ) -> QueryResult<Option<SqlExpr>> {
        if method.declaring_type != DeclaringType::Convert || !method.is_static {
            return Ok(None);
        }
        let Some((store_type, kind)) = Self::target(&method.name) else {
            return Ok(None);
        };
        expect_arity(method, arguments, 1)?;
        Ok(Some(convert(factory, store_type, kind, arguments[0].clone())))
    }
}

/// `x.ToString()` on a value whose store type is known.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectToStringTranslator;

impl ObjectToStringTranslator {
    /// Widest text form of each store kind.
    fn target(kind: StoreKind) -> Option<&'static str> {
        match kind {
            StoreKind::Integer => Some("nvarchar(20)"),
            StoreKind::Float | StoreKind::Decimal | StoreKind::DateTime => Some("nvarchar(100)"),
            StoreKind::Guid => Some("nvarchar(36)"),
            StoreKind::String => Some("nvarchar(max)"),
            StoreKind::Bool | StoreKind::Binary => None,
        }
    }
}

impl MethodCallTranslator for ObjectToStringTranslator {
    fn id(&self) -> &'static str {
        "object_to_string"
    }

    fn translate(
        &self,
        instance: Option<&SqlExpr>,
        method: &MethodInfo,
        arguments: &[SqlExpr],
        factory: &SqlExpressionFactory,
    ) -> QueryResult<Option<SqlExpr>> {
        // ToString(format) overloads are left to the client
        if method.name != "ToString" || method.is_static || !arguments.is_empty() {
            return Ok(None);
        }
        let Some(operand) = instance else {
            return Ok(None);
        };
        let Some(store_type) = operand
            .type_mapping()
            .and_then(|mapping| Self::target(mapping.kind))
        else {
            return Ok(None);
        };
        Ok(Some(convert(factory, store_type, StoreKind::String, operand.clone())))
    }
}
