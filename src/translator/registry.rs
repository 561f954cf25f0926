//! Ordered registry of method-call translators

use super::traits::*;
use super::*;
use crate::ast::SqlExpr;
use crate::error::QueryResult;
use crate::factory::SqlExpressionFactory;
use tracing::{debug, trace};

/// Translators in registration order. The first one that recognizes a call
/// wins; later ones are not consulted.
pub struct MethodCallTranslatorRegistry {
    factory: SqlExpressionFactory,
    translators: Vec<Box<dyn MethodCallTranslator>>,
}

impl Default for MethodCallTranslatorRegistry {
    fn default() -> Self {
        Self::relational()
    }
}

impl std::fmt::Debug for MethodCallTranslatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodCallTranslatorRegistry")
            .field("translators", &self.translator_ids())
            .finish()
    }
}

impl MethodCallTranslatorRegistry {
    /// An empty registry.
    pub fn new(factory: SqlExpressionFactory) -> Self {
        Self {
            factory,
            translators: Vec::new(),
        }
    }

    /// Provider-neutral translators only.
    pub fn relational() -> Self {
        let mut registry = Self::new(SqlExpressionFactory::default());
        registry.register(Box::new(ContainsTranslator));
        registry
    }

    /// Relational translators followed by the SQL Server set.
    pub fn sql_server() -> Self {
        let mut registry = Self::relational();
        registry.register(Box::new(ByteArrayTranslator));
        registry.register(Box::new(ConvertTranslator));
        registry.register(Box::new(DateDiffTranslator));
        registry.register(Box::new(DateTimeTranslator));
        registry.register(Box::new(IsDateTranslator));
        registry.register(Box::new(MathTranslator));
        registry.register(Box::new(NewGuidTranslator));
        registry.register(Box::new(ObjectToStringTranslator));
        registry.register(Box::new(StringMethodTranslator));
        registry
    }

    /// Append a translator; it is tried after all earlier ones.
    pub fn register(&mut self, translator: Box<dyn MethodCallTranslator>) {
        self.translators.push(translator);
    }

    pub fn factory(&self) -> &SqlExpressionFactory {
        &self.factory
    }

    pub fn translator_ids(&self) -> Vec<&'static str> {
        self.translators.iter().map(|t| t.id()).collect()
    }

    pub fn translate(
        &self,
        instance: Option<&SqlExpr>,
        method: &MethodInfo,
        arguments: &[SqlExpr],
    ) -> QueryResult<Option<SqlExpr>> {
        for translator in &self.translators {
            if let Some(sql) = translator.translate(instance, method, arguments, &self.factory)? {
                debug!(translator = translator.id(), method = %method.qualified_name(), "translated method call");
                return Ok(Some(sql));
            }
        }
        trace!(method = %method.qualified_name(), "no translator matched");
        Ok(None)
    }

    pub fn translate_call(&self, call: &MethodCall) -> QueryResult<Option<SqlExpr>> {
        self.translate(call.instance.as_ref(), &call.method, &call.arguments)
    }
}
