//! Raw-SQL parameter application.
//!
//! A `FromSqlExpression` arrives with its arguments either as the name of an
//! array-valued parameter or as a literal array. Both are resolved here into
//! bindable parameters, so that the renderer can substitute `{n}` placeholders.

use crate::ast::*;
use crate::error::{QueryError, QueryResult};
use crate::factory::SqlExpressionFactory;
use crate::parser::placeholder_count;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Yields `p0`, `p1`, ... for one postprocessing run.
#[derive(Debug, Clone)]
pub struct ParameterNameGenerator {
    prefix: String,
    count: usize,
}

impl ParameterNameGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            count: 0,
        }
    }

    pub fn generate_next(&mut self) -> String {
        let name = format!("{}{}", self.prefix, self.count);
        self.count += 1;
        name
    }
}

impl Default for ParameterNameGenerator {
    fn default() -> Self {
        Self::new("p")
    }
}

/// Per-run accumulator for the applier.
///
/// `visited` is keyed by the address of the original fragment. The original
/// `Arc` is held next to its replacement so the address cannot be reused
/// while the run is in progress.
#[derive(Debug, Default)]
pub struct ApplyState {
    visited: HashMap<usize, (Arc<FromSqlExpression>, Arc<FromSqlExpression>)>,
    names: ParameterNameGenerator,
}

impl ApplyState {
    pub fn new(names: ParameterNameGenerator) -> Self {
        Self {
            visited: HashMap::new(),
            names,
        }
    }

    /// Number of distinct fragments resolved so far.
    pub fn resolved_count(&self) -> usize {
        self.visited.len()
    }
}

pub struct FromSqlParameterApplier<'a> {
    factory: &'a SqlExpressionFactory,
    parameter_values: &'a ParameterValues,
}

impl<'a> FromSqlParameterApplier<'a> {
    pub fn new(factory: &'a SqlExpressionFactory, parameter_values: &'a ParameterValues) -> Self {
        Self {
            factory,
            parameter_values,
        }
    }

    /// Resolve every raw-SQL source in `select`. Returns the same `Arc` when
    /// there was nothing to resolve.
    pub fn apply(
        &self,
        select: &Arc<SelectExpression>,
        state: &mut ApplyState,
    ) -> QueryResult<Arc<SelectExpression>> {
        rewrite_select(
            select,
            &mut ApplyingRewriter {
                applier: self,
                state,
            },
        )
    }

    fn resolve(
        &self,
        from_sql: &FromSqlExpression,
        state: &mut ApplyState,
    ) -> QueryResult<FromSqlArguments> {
        match &from_sql.arguments {
            FromSqlArguments::Parameter(name) => {
                let value = self
                    .parameter_values
                    .get(name)
                    .ok_or_else(|| QueryError::MissingParameter(name.clone()))?;
                let Value::Array(items) = value else {
                    return Err(QueryError::InvalidParameterValue {
                        name: name.clone(),
                        expected: "an array of values",
                    });
                };

                self.check_arity(from_sql, items.len());
                let parameters = items
                    .iter()
                    .map(|item| self.bind(item, &mut state.names))
                    .collect();
                debug!(parameter = %name, elements = items.len(), "resolved raw SQL parameter array");

                Ok(FromSqlArguments::Composite(RelationalParameter::Composite {
                    invariant_name: name.clone(),
                    parameters,
                }))
            }
            FromSqlArguments::Constant(values) => {
                self.check_arity(from_sql, values.len());
                let arguments = values
                    .iter()
                    .map(|value| match value {
                        Value::DbParameter(p) => {
                            FromSqlArgument::Parameter(raw_parameter(p, &mut state.names))
                        }
                        other => FromSqlArgument::Constant(SqlConstant {
                            value: other.clone(),
                            type_mapping: self.factory.type_mapping_for_value(other),
                        }),
                    })
                    .collect();
                debug!(elements = values.len(), "resolved raw SQL constant arguments");
                Ok(FromSqlArguments::Resolved(arguments))
            }
            resolved => Ok(resolved.clone()),
        }
    }

    fn bind(&self, value: &Value, names: &mut ParameterNameGenerator) -> RelationalParameter {
        match value {
            Value::DbParameter(p) => raw_parameter(p, names),
            other => {
                let name = names.generate_next();
                RelationalParameter::TypeMapped {
                    invariant_name: name.clone(),
                    name,
                    type_mapping: self.factory.type_mapping_for_value(other),
                    nullable: other.is_nullable_type(),
                }
            }
        }
    }

    fn check_arity(&self, from_sql: &FromSqlExpression, supplied: usize) {
        match placeholder_count(&from_sql.sql) {
            Ok(expected) if supplied < expected => {
                warn!(
                    alias = %from_sql.alias,
                    expected,
                    supplied,
                    "raw SQL references more arguments than were supplied"
                );
            }
            Ok(_) => {}
            Err(e) => warn!(alias = %from_sql.alias, error = %e, "raw SQL text is not a valid format string"),
        }
    }
}

fn raw_parameter(parameter: &Arc<DbParameter>, names: &mut ParameterNameGenerator) -> RelationalParameter {
    let name = parameter.name_or_assign(|| names.generate_next()).to_string();
    RelationalParameter::Raw {
        name,
        parameter: Arc::clone(parameter),
    }
}

struct ApplyingRewriter<'r, 'a> {
    applier: &'r FromSqlParameterApplier<'a>,
    state: &'r mut ApplyState,
}

impl SqlTreeRewriter for ApplyingRewriter<'_, '_> {
    type Error = QueryError;

    fn rewrite_expression(&mut self, expr: &SqlExpr) -> QueryResult<SqlExpr> {
        Ok(Arc::clone(expr))
    }

    fn rewrite_from_sql(&mut self, from_sql: &Arc<FromSqlExpression>) -> QueryResult<Arc<FromSqlExpression>> {
        if !from_sql.is_unresolved() {
            return Ok(Arc::clone(from_sql));
        }

        let key = Arc::as_ptr(from_sql) as usize;
        if let Some((_, replacement)) = self.state.visited.get(&key) {
            return Ok(Arc::clone(replacement));
        }

        let arguments = self.applier.resolve(from_sql, self.state)?;
        let replacement = Arc::new(FromSqlExpression {
            sql: from_sql.sql.clone(),
            arguments,
            alias: from_sql.alias.clone(),
        });
        self.state
            .visited
            .insert(key, (Arc::clone(from_sql), Arc::clone(&replacement)));
        Ok(replacement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transpiler::ToSql;
    use pretty_assertions::assert_eq;

    fn select_from(source: Arc<FromSqlExpression>) -> Arc<SelectExpression> {
        SelectExpression::from_source(TableSource::FromSql(source)).build()
    }

    #[test]
    fn test_name_generator_sequence() {
        let mut names = ParameterNameGenerator::new("p");
        assert_eq!(names.generate_next(), "p0");
        assert_eq!(names.generate_next(), "p1");
        assert_eq!(names.generate_next(), "p2");
    }

    #[test]
    fn test_parameter_array_becomes_composite() {
        let f = SqlExpressionFactory::default();
        let mut values = ParameterValues::new();
        values.insert("ids".to_string(), Value::from(vec![7, 8]));
        let source = Arc::new(FromSqlExpression::new(
            "SELECT * FROM T WHERE id IN ({0}, {1})",
            FromSqlArguments::Parameter("ids".to_string()),
            "t",
        ));

        let mut state = ApplyState::default();
        let result = FromSqlParameterApplier::new(&f, &values)
            .apply(&select_from(source), &mut state)
            .unwrap();

        let TableSource::FromSql(resolved) = &result.tables[0] else {
            panic!("expected a raw SQL source");
        };
        let FromSqlArguments::Composite(composite) = &resolved.arguments else {
            panic!("expected a composite parameter");
        };
        assert_eq!(composite.invariant_name(), "ids");
        assert_eq!(composite.leaf_names(), vec!["p0", "p1"]);
        assert_eq!(
            result.to_sql(),
            "SELECT * FROM (SELECT * FROM T WHERE id IN (@p0, @p1)) AS [t]"
        );
    }

    #[test]
    fn test_db_parameter_name_preserved() {
        let f = SqlExpressionFactory::default();
        let named = Arc::new(DbParameter::named("city", "London"));
        let unnamed = Arc::new(DbParameter::new(3));
        let source = Arc::new(FromSqlExpression::new(
            "SELECT * FROM C WHERE City = {0} AND Rank > {1} AND Id <> {2}",
            FromSqlArguments::Constant(vec![
                Value::DbParameter(Arc::clone(&named)),
                Value::DbParameter(Arc::clone(&unnamed)),
                Value::Int(42),
            ]),
            "c",
        ));

        let mut state = ApplyState::default();
        let result = FromSqlParameterApplier::new(&f, &ParameterValues::new())
            .apply(&select_from(source), &mut state)
            .unwrap();

        assert_eq!(named.name(), Some("city"));
        assert_eq!(unnamed.name(), Some("p0"));
        assert_eq!(
            result.to_sql(),
            "SELECT * FROM (SELECT * FROM C WHERE City = @city AND Rank > @p0 AND Id <> 42) AS [c]"
        );
    }

    #[test]
    fn test_shared_fragment_resolved_once() {
        let f = SqlExpressionFactory::default();
        let mut values = ParameterValues::new();
        values.insert("ids".to_string(), Value::from(vec![1, 2]));
        let shared = Arc::new(FromSqlExpression::new(
            "SELECT * FROM T WHERE id IN ({0}, {1})",
            FromSqlArguments::Parameter("ids".to_string()),
            "t",
        ));
        let subquery = TableSource::Subquery {
            select: select_from(Arc::clone(&shared)),
            alias: "s".to_string(),
        };
        let select = SelectExpression::from_source(TableSource::FromSql(shared))
            .join(subquery)
            .build();

        let mut state = ApplyState::default();
        let result = FromSqlParameterApplier::new(&f, &values)
            .apply(&select, &mut state)
            .unwrap();

        assert_eq!(state.resolved_count(), 1);
        let TableSource::FromSql(outer) = &result.tables[0] else {
            panic!("expected a raw SQL source");
        };
        let TableSource::Subquery { select: inner, .. } = &result.tables[1] else {
            panic!("expected a subquery");
        };
        let TableSource::FromSql(inner) = &inner.tables[0] else {
            panic!("expected a raw SQL source");
        };
        assert!(Arc::ptr_eq(outer, inner));
        // one name sequence for the shared fragment
        assert_eq!(state.names.generate_next(), "p2");
    }

    #[test]
    fn test_names_unique_across_fragments() {
        let f = SqlExpressionFactory::default();
        let mut values = ParameterValues::new();
        values.insert("a".to_string(), Value::from(vec![1, 2]));
        values.insert("b".to_string(), Value::from(vec![3]));
        let first = Arc::new(FromSqlExpression::new(
            "SELECT * FROM A WHERE x IN ({0}, {1})",
            FromSqlArguments::Parameter("a".to_string()),
            "a",
        ));
        let second = Arc::new(FromSqlExpression::new(
            "SELECT * FROM B WHERE y = {0}",
            FromSqlArguments::Parameter("b".to_string()),
            "b",
        ));
        let select = SelectExpression::from_source(TableSource::FromSql(first))
            .join(TableSource::FromSql(second))
            .build();

        let mut state = ApplyState::default();
        let result = FromSqlParameterApplier::new(&f, &values)
            .apply(&select, &mut state)
            .unwrap();

        let mut names = Vec::new();
        for table in &result.tables {
            if let TableSource::FromSql(from_sql) = table {
                if let FromSqlArguments::Composite(p) = &from_sql.arguments {
                    names.extend(p.leaf_names().into_iter().map(str::to_string));
                }
            }
        }
        assert_eq!(names, vec!["p0", "p1", "p2"]);
    }

    #[test]
    fn test_missing_parameter() {
        let f = SqlExpressionFactory::default();
        let source = Arc::new(FromSqlExpression::new(
            "SELECT * FROM T WHERE id = {0}",
            FromSqlArguments::Parameter("ids".to_string()),
            "t",
        ));
        let err = FromSqlParameterApplier::new(&f, &ParameterValues::new())
            .apply(&select_from(source), &mut ApplyState::default())
            .unwrap_err();
        assert!(matches!(err, QueryError::MissingParameter(name) if name == "ids"));
    }

    #[test]
    fn test_non_array_parameter() {
        let f = SqlExpressionFactory::default();
        let mut values = ParameterValues::new();
        values.insert("ids".to_string(), Value::Int(1));
        let source = Arc::new(FromSqlExpression::new(
            "SELECT * FROM T WHERE id = {0}",
            FromSqlArguments::Parameter("ids".to_string()),
            "t",
        ));
        let err = FromSqlParameterApplier::new(&f, &values)
            .apply(&select_from(source), &mut ApplyState::default())
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidParameterValue { .. }));
    }

    #[test]
    fn test_no_raw_sql_keeps_tree() {
        let f = SqlExpressionFactory::default();
        let select = SelectExpression::from_source(TableSource::table("Customers", "c"))
            .filter(f.equal(f.column("c", "Id", false), f.parameter("id")))
            .build();
        let result = FromSqlParameterApplier::new(&f, &ParameterValues::new())
            .apply(&select, &mut ApplyState::default())
            .unwrap();
        assert!(Arc::ptr_eq(&select, &result));
    }
}
