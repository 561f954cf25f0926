//! Parameter-based postprocessing of translated query trees.
//!
//! Runs once per execution, after translation and before rendering:
//!
//! 1. [`NullSemanticsRewriter`] makes comparisons two-valued and may
//!    specialize on NULL parameter values.
//! 2. [`SqlExpressionOptimizer`] folds constants and simplifies booleans.
//! 3. [`FromSqlParameterApplier`] binds raw-SQL arguments.
//!
//! The result carries a verdict on whether the finalized tree can be reused
//! for other values bound to the same parameter names.

pub mod from_sql;
pub mod null_semantics;
pub mod optimizer;

pub use from_sql::{ApplyState, FromSqlParameterApplier, ParameterNameGenerator};
pub use null_semantics::NullSemanticsRewriter;
pub use optimizer::SqlExpressionOptimizer;

use crate::ast::{ParameterValues, SelectExpression};
use crate::error::QueryResult;
use crate::factory::SqlExpressionFactory;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostprocessorOptions {
    /// Emit comparisons as plain SQL operators, accepting three-valued results.
    pub use_relational_nulls: bool,
    /// Prefix for generated raw-SQL parameter names.
    pub parameter_prefix: String,
}

impl Default for PostprocessorOptions {
    fn default() -> Self {
        Self {
            use_relational_nulls: false,
            parameter_prefix: "p".to_string(),
        }
    }
}

/// Runs the postprocessing stages in order.
///
/// Holds no per-run state, so one instance can serve concurrent callers.
#[derive(Debug, Default)]
pub struct ParameterBasedPostprocessor {
    factory: SqlExpressionFactory,
    options: PostprocessorOptions,
}

impl ParameterBasedPostprocessor {
    pub fn new(factory: SqlExpressionFactory, options: PostprocessorOptions) -> Self {
        Self { factory, options }
    }

    pub fn factory(&self) -> &SqlExpressionFactory {
        &self.factory
    }

    pub fn options(&self) -> &PostprocessorOptions {
        &self.options
    }

    /// Returns the finalized tree and whether it may be cached.
    pub fn optimize(
        &self,
        select: &Arc<SelectExpression>,
        parameter_values: &ParameterValues,
    ) -> QueryResult<(Arc<SelectExpression>, bool)> {
        let mut null_rewriter =
            NullSemanticsRewriter::new(&self.factory, parameter_values, self.options.use_relational_nulls);
        let rewritten = null_rewriter.rewrite(select);
        let mut can_cache = null_rewriter.can_cache();
        debug!(
            changed = !Arc::ptr_eq(select, &rewritten),
            can_cache, "null semantics stage"
        );

        let optimized = SqlExpressionOptimizer::new(&self.factory).optimize_select(&rewritten);
        debug!(changed = !Arc::ptr_eq(&rewritten, &optimized), "optimizer stage");

        let mut state = ApplyState::new(ParameterNameGenerator::new(self.options.parameter_prefix.clone()));
        let applied = FromSqlParameterApplier::new(&self.factory, parameter_values).apply(&optimized, &mut state)?;
        let raw_sql_resolved = !Arc::ptr_eq(&optimized, &applied);
        can_cache &= !raw_sql_resolved;
        debug!(
            fragments = state.resolved_count(),
            can_cache, "raw SQL stage"
        );

        Ok((applied, can_cache))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::*;
    use crate::transpiler::ToSql;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_plain_query_is_cacheable_and_unchanged() {
        let post = ParameterBasedPostprocessor::default();
        let f = post.factory();
        let select = SelectExpression::from_source(TableSource::table("Orders", "o"))
            .filter(f.greater_than(f.column("o", "Total", false), f.typed_parameter("min", false, StoreKind::Float)))
            .build();

        let (result, can_cache) = post.optimize(&select, &ParameterValues::new()).unwrap();
        assert!(can_cache);
        assert!(Arc::ptr_eq(&select, &result));
    }

    #[test]
    fn test_stages_compose() {
        let post = ParameterBasedPostprocessor::default();
        let f = post.factory();
        let mut values = ParameterValues::new();
        values.insert("name".to_string(), Value::Null);
        let select = SelectExpression::from_source(TableSource::table("Customers", "c"))
            .filter(f.and_also(
                f.bool_constant(true),
                f.equal(f.column("c", "Name", true), f.parameter("name")),
            ))
            .build();

        let (result, can_cache) = post.optimize(&select, &values).unwrap();
        assert!(!can_cache);
        assert_eq!(
            result.to_sql(),
            "SELECT * FROM [Customers] AS [c] WHERE [c].[Name] IS NULL"
        );
    }

    #[test]
    fn test_custom_prefix() {
        let options = PostprocessorOptions {
            parameter_prefix: "arg".to_string(),
            ..Default::default()
        };
        let post = ParameterBasedPostprocessor::new(SqlExpressionFactory::default(), options);
        let mut values = ParameterValues::new();
        values.insert("ids".to_string(), Value::from(vec![1]));
        let select = SelectExpression::from_source(TableSource::FromSql(Arc::new(FromSqlExpression::new(
            "SELECT * FROM T WHERE id = {0}",
            FromSqlArguments::Parameter("ids".to_string()),
            "t",
        ))))
        .build();

        let (result, can_cache) = post.optimize(&select, &values).unwrap();
        assert!(!can_cache);
        assert_eq!(result.to_sql(), "SELECT * FROM (SELECT * FROM T WHERE id = @arg0) AS [t]");
    }
}
