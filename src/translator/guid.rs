//! `Guid.NewGuid()` on SQL Server.

use super::traits::*;
use crate::ast::*;
use crate::error::QueryResult;
use crate::factory::SqlExpressionFactory;

#[derive(Debug, Clone, Copy, Default)]
pub struct NewGuidTranslator;

impl MethodCallTranslator for NewGuidTranslator {
    fn id(&self) -> &'static str {
        "new_guid"
    }

    fn translate(
        &self,
        _instance: Option<&SqlExpr>,
        method: &MethodInfo,
        arguments: &[SqlExpr],
        factory: &SqlExpressionFactory,
    ) -> QueryResult<Option<SqlExpr>> {
        if method.declaring_type != DeclaringType::Guid || method.name != "NewGuid" || !method.is_static {
            return Ok(None);
        }
        expect_arity(method, arguments, 0)?;
        Ok(Some(factory.function(
            "NEWID",
            Vec::new(),
            false,
            Some(factory.find_mapping(StoreKind::Guid)),
        )))
    }
}
