//! `byte[].Contains(b)` on SQL Server.

use super::traits::*;
use crate::ast::*;
use crate::error::QueryResult;
use crate::factory::SqlExpressionFactory;

#[derive(Debug, Clone, Copy, Default)]
pub struct ByteArrayTranslator;

impl MethodCallTranslator for ByteArrayTranslator {
    fn id(&self) -> &'static str {
        "byte_array"
    }

    fn translate(
        &self,
        instance: Option<&SqlExpr>,
        method: &MethodInfo,
        arguments: &[SqlExpr],
        factory: &SqlExpressionFactory,
    ) -> QueryResult<Option<SqlExpr>> {
        if method.declaring_type != DeclaringType::ByteArray || method.name != "Contains" || method.is_static {
            return Ok(None);
        }
        expect_arity(method, arguments, 1)?;
        let source = expect_instance(method, instance)?;

        let value = &arguments[0];
        let pattern = match value.type_mapping() {
            Some(mapping) if mapping.kind == StoreKind::Binary => value.clone(),
            _ => factory.function(
                "CONVERT",
                vec![factory.fragment("varbinary(1)"), value.clone()],
                true,
                Some(TypeMapping::new("varbinary(1)", StoreKind::Binary)),
            ),
        };
        let index = factory.function(
            "CHARINDEX",
            vec![pattern, source.clone()],
            true,
            Some(factory.find_mapping(StoreKind::Integer)),
        );
        Ok(Some(factory.greater_than(index, factory.constant(0))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transpiler::ToSql;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_byte_contains() {
        let f = SqlExpressionFactory::default();
        let data = f.typed_column("b", "Data", false, StoreKind::Binary);
        let method = MethodInfo::instance(DeclaringType::ByteArray, "Contains");
        let sql = ByteArrayTranslator
            .translate(Some(&data), &method, &[f.parameter("b")], &f)
            .unwrap()
            .unwrap();
        assert_eq!(sql.to_sql(), "CHARINDEX(CONVERT(varbinary(1), @b), [b].[Data]) > 0");
    }

    #[test]
    fn test_other_types_ignored() {
        let f = SqlExpressionFactory::default();
        let method = MethodInfo::instance(DeclaringType::String, "Contains");
        assert!(ByteArrayTranslator
            .translate(Some(&f.column("c", "Name", true)), &method, &[f.constant("a")], &f)
            .unwrap()
            .is_none());
    }
}
