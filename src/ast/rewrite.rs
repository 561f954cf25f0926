//! Tree traversal shared by the postprocessing rewriters.

use crate::ast::{
    FromSqlExpression, JoinExpression, OrderingExpression, ProjectionExpression, SelectExpression,
    SqlExpr, TableSource,
};
use std::sync::Arc;

/// A rewrite over every expression slot and raw-SQL source of a select tree.
///
/// Implementations return the input `Arc` when a node is unchanged so that
/// untouched subtrees stay shared.
pub trait SqlTreeRewriter {
    type Error;

    fn rewrite_expression(&mut self, expr: &SqlExpr) -> Result<SqlExpr, Self::Error>;

    fn rewrite_from_sql(
        &mut self,
        from_sql: &Arc<FromSqlExpression>,
    ) -> Result<Arc<FromSqlExpression>, Self::Error> {
        Ok(Arc::clone(from_sql))
    }
}

/// Rewrite a select, returning the same `Arc` if nothing underneath changed.
pub fn rewrite_select<R: SqlTreeRewriter + ?Sized>(
    select: &Arc<SelectExpression>,
    rewriter: &mut R,
) -> Result<Arc<SelectExpression>, R::Error> {
    let mut changed = false;

    let mut tables = Vec::with_capacity(select.tables.len());
    for source in &select.tables {
        let (source, source_changed) = rewrite_table(source, rewriter)?;
        changed |= source_changed;
        tables.push(source);
    }

    let mut projection = Vec::with_capacity(select.projection.len());
    for item in &select.projection {
        let expression = rewrite_tracked(&item.expression, rewriter, &mut changed)?;
        projection.push(ProjectionExpression {
            alias: item.alias.clone(),
            expression,
        });
    }

    let predicate = rewrite_optional(&select.predicate, rewriter, &mut changed)?;

    let mut orderings = Vec::with_capacity(select.orderings.len());
    for ordering in &select.orderings {
        let expression = rewrite_tracked(&ordering.expression, rewriter, &mut changed)?;
        orderings.push(OrderingExpression {
            expression,
            ascending: ordering.ascending,
        });
    }

    let limit = rewrite_optional(&select.limit, rewriter, &mut changed)?;
    let offset = rewrite_optional(&select.offset, rewriter, &mut changed)?;

    if !changed {
        return Ok(Arc::clone(select));
    }

    Ok(Arc::new(SelectExpression {
        projection,
        tables,
        predicate,
        orderings,
        limit,
        offset,
        distinct: select.distinct,
    }))
}

fn rewrite_table<R: SqlTreeRewriter + ?Sized>(
    source: &TableSource,
    rewriter: &mut R,
) -> Result<(TableSource, bool), R::Error> {
    match source {
        TableSource::Table(_) => Ok((source.clone(), false)),
        TableSource::FromSql(from_sql) => {
            let rewritten = rewriter.rewrite_from_sql(from_sql)?;
            let changed = !Arc::ptr_eq(&rewritten, from_sql);
            Ok((TableSource::FromSql(rewritten), changed))
        }
        TableSource::Join(join) => {
            let (table, mut changed) = rewrite_table(&join.table, rewriter)?;
            let predicate = rewrite_optional(&join.predicate, rewriter, &mut changed)?;
            if !changed {
                return Ok((source.clone(), false));
            }
            let join = JoinExpression {
                kind: join.kind,
                table,
                predicate,
            };
            Ok((TableSource::Join(Arc::new(join)), true))
        }
        TableSource::Subquery { select, alias } => {
            let rewritten = rewrite_select(select, rewriter)?;
            let changed = !Arc::ptr_eq(&rewritten, select);
            Ok((
                TableSource::Subquery {
                    select: rewritten,
                    alias: alias.clone(),
                },
                changed,
            ))
        }
    }
}

fn rewrite_tracked<R: SqlTreeRewriter + ?Sized>(
    expr: &SqlExpr,
    rewriter: &mut R,
    changed: &mut bool,
) -> Result<SqlExpr, R::Error> {
    let rewritten = rewriter.rewrite_expression(expr)?;
    *changed |= !Arc::ptr_eq(&rewritten, expr);
    Ok(rewritten)
}

fn rewrite_optional<R: SqlTreeRewriter + ?Sized>(
    expr: &Option<SqlExpr>,
    rewriter: &mut R,
    changed: &mut bool,
) -> Result<Option<SqlExpr>, R::Error> {
    expr.as_ref()
        .map(|e| rewrite_tracked(e, rewriter, changed))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{SqlExpression, TableSource};
    use crate::factory::SqlExpressionFactory;
    use std::convert::Infallible;

    struct Identity;

    impl SqlTreeRewriter for Identity {
        type Error = Infallible;

        fn rewrite_expression(&mut self, expr: &SqlExpr) -> Result<SqlExpr, Infallible> {
            Ok(Arc::clone(expr))
        }
    }

    struct ReplaceParameters;

    impl SqlTreeRewriter for ReplaceParameters {
        type Error = Infallible;

        fn rewrite_expression(&mut self, expr: &SqlExpr) -> Result<SqlExpr, Infallible> {
            match expr.as_ref() {
                SqlExpression::Parameter(_) => Ok(SqlExpressionFactory::default().constant(1)),
                _ => Ok(Arc::clone(expr)),
            }
        }
    }

    fn sample() -> Arc<SelectExpression> {
        let f = SqlExpressionFactory::default();
        let inner = SelectExpression::from_source(TableSource::table("Orders", "o"))
            .filter(f.equal(f.column("o", "Id", false), f.parameter("id")))
            .build();
        SelectExpression::from_source(TableSource::table("Customers", "c"))
            .join(TableSource::Subquery {
                select: inner,
                alias: "t".to_string(),
            })
            .project("Name", f.column("c", "Name", true))
            .build()
    }

    #[test]
    fn test_identity_rewrite_keeps_root() {
        let select = sample();
        let Ok(rewritten) = rewrite_select(&select, &mut Identity);
        assert!(Arc::ptr_eq(&select, &rewritten));
    }

    #[test]
    fn test_nested_change_replaces_root() {
        let select = sample();
        let Ok(rewritten) = rewrite_select(&select, &mut ReplaceParameters);
        assert!(!Arc::ptr_eq(&select, &rewritten));
        // the untouched projection is shared with the input
        assert!(Arc::ptr_eq(
            &select.projection[0].expression,
            &rewritten.projection[0].expression
        ));
    }
}
