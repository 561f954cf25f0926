//! `Contains` over an in-memory collection, translated to `IN`.

use super::traits::*;
use crate::ast::SqlExpr;
use crate::error::QueryResult;
use crate::factory::SqlExpressionFactory;

/// Provider-neutral `Contains` translator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContainsTranslator;

/// The call shapes this translator recognizes.
enum ContainsShape<'a> {
    /// `Enumerable.Contains<T>(values, item)`
    Enumerable { values: &'a SqlExpr, item: &'a SqlExpr },
    /// `collection.Contains(item)` on a list or generic collection
    Collection { values: &'a SqlExpr, item: &'a SqlExpr },
}

impl<'a> ContainsShape<'a> {
    fn recognize(instance: Option<&'a SqlExpr>, method: &MethodInfo, arguments: &'a [SqlExpr]) -> Option<Self> {
        if method.name != "Contains" {
            return None;
        }
        match (&method.declaring_type, instance, arguments) {
            (DeclaringType::Enumerable, None, [values, item]) if method.is_static && method.is_generic() => {
                values
                    .is_constant_or_parameter()
                    .then_some(ContainsShape::Enumerable { values, item })
            }
            (DeclaringType::Collection(collection), Some(values), [item])
                if !method.is_static
                    && (collection.implements_list || collection.implements_generic_collection) =>
            {
                values
                    .is_constant_or_parameter()
                    .then_some(ContainsShape::Collection { values, item })
            }
            _ => None,
        }
    }
}

impl MethodCallTranslator for ContainsTranslator {
    fn id(&self) -> &'static str {
        "contains"
    }

    fn translate(
        &self,
        instance: Option<&SqlExpr>,
        method: &MethodInfo,
        arguments: &[SqlExpr],
        factory: &SqlExpressionFactory,
    ) -> QueryResult<Option<SqlExpr>> {
        let sql = match ContainsShape::recognize(instance, method, arguments) {
            Some(ContainsShape::Enumerable { values, item }) | Some(ContainsShape::Collection { values, item }) => {
                Some(factory.in_values(item.clone(), values.clone(), false))
            }
            None => None,
        };
        Ok(sql)
    }
}
