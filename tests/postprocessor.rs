//! End-to-end postprocessing: translated trees in, finalized SQL out.

use pretty_assertions::assert_eq;
use relq::prelude::*;
use std::sync::Arc;

fn raw_sql(sql: &str, arguments: FromSqlArguments, alias: &str) -> Arc<FromSqlExpression> {
    Arc::new(FromSqlExpression::new(sql, arguments, alias))
}

#[test]
fn test_raw_sql_scenario() {
    let mut values = ParameterValues::new();
    values.insert("ids".to_string(), Value::from(vec![7, 8]));
    let select = SelectExpression::from_source(TableSource::FromSql(raw_sql(
        "SELECT * FROM T WHERE id IN ({0}, {1})",
        FromSqlArguments::Parameter("ids".to_string()),
        "t",
    )))
    .build();

    let (finalized, can_cache) = relq::optimize(&select, &values).unwrap();

    assert!(!can_cache);
    let TableSource::FromSql(from_sql) = &finalized.tables[0] else {
        panic!("expected a raw SQL source");
    };
    match &from_sql.arguments {
        FromSqlArguments::Composite(RelationalParameter::Composite {
            invariant_name,
            parameters,
        }) => {
            assert_eq!(invariant_name, "ids");
            assert_eq!(parameters.len(), 2);
            assert!(matches!(
                &parameters[0],
                RelationalParameter::TypeMapped { name, type_mapping: Some(m), .. }
                    if name == "p0" && m.kind == StoreKind::Integer
            ));
            assert!(matches!(&parameters[1], RelationalParameter::TypeMapped { name, .. } if name == "p1"));
        }
        other => panic!("expected a composite parameter, got {:?}", other),
    }
    assert_eq!(
        finalized.to_sql(),
        "SELECT * FROM (SELECT * FROM T WHERE id IN (@p0, @p1)) AS [t]"
    );
}

#[test]
fn test_shared_fragment_named_once() {
    let mut values = ParameterValues::new();
    values.insert("ids".to_string(), Value::from(vec![1, 2, 3]));
    let shared = raw_sql(
        "SELECT Id FROM T WHERE id IN ({0}, {1}, {2})",
        FromSqlArguments::Parameter("ids".to_string()),
        "t",
    );
    let inner = SelectExpression::from_source(TableSource::FromSql(Arc::clone(&shared))).build();
    let select = SelectExpression::from_source(TableSource::FromSql(shared))
        .join(TableSource::Subquery {
            select: inner,
            alias: "s".to_string(),
        })
        .build();

    let (finalized, _) = relq::optimize(&select, &values).unwrap();
    let sql = finalized.to_sql();

    // both occurrences bind the same three names
    assert_eq!(sql.matches("@p0, @p1, @p2").count(), 2);
    assert!(!sql.contains("@p3"));
}

#[test]
fn test_names_unique_across_fragments() {
    let mut values = ParameterValues::new();
    values.insert("a".to_string(), Value::from(vec![1, 2]));
    let select = SelectExpression::from_source(TableSource::FromSql(raw_sql(
        "SELECT * FROM A WHERE x IN ({0}, {1})",
        FromSqlArguments::Parameter("a".to_string()),
        "a",
    )))
    .join(TableSource::FromSql(raw_sql(
        "SELECT * FROM B WHERE y = {0} AND z = {1}",
        FromSqlArguments::Constant(vec![
            Value::DbParameter(Arc::new(DbParameter::new(5))),
            Value::from("x"),
        ]),
        "b",
    )))
    .build();

    let (finalized, can_cache) = relq::optimize(&select, &values).unwrap();
    assert!(!can_cache);
    assert_eq!(
        finalized.to_sql(),
        "SELECT * FROM (SELECT * FROM A WHERE x IN (@p0, @p1)) AS [a], \
         (SELECT * FROM B WHERE y = @p2 AND z = N'x') AS [b]"
    );
}

#[test]
fn test_cacheability_is_a_conjunction() {
    let post = ParameterBasedPostprocessor::default();
    let f = post.factory();
    let filtered = |from: TableSource| {
        SelectExpression::from_source(from)
            .filter(f.equal(f.column("c", "Region", true), f.parameter("region")))
            .build()
    };
    let table = || TableSource::table("Customers", "c");
    let fragment = || {
        TableSource::FromSql(raw_sql(
            "SELECT * FROM Customers WHERE Id > {0}",
            FromSqlArguments::Constant(vec![Value::Int(10)]),
            "c",
        ))
    };

    let mut non_null = ParameterValues::new();
    non_null.insert("region".to_string(), Value::from("WA"));
    let mut null = ParameterValues::new();
    null.insert("region".to_string(), Value::Null);

    let cases = [
        (table(), &non_null, true),
        (table(), &null, false),
        (fragment(), &non_null, false),
        (fragment(), &null, false),
    ];
    for (source, values, cacheable) in cases {
        let (_, can_cache) = post.optimize(&filtered(source), values).unwrap();
        assert_eq!(can_cache, cacheable);
    }
}

#[test]
fn test_finalized_tree_is_a_fixed_point() {
    use relq::postprocessor::{ApplyState, FromSqlParameterApplier, SqlExpressionOptimizer};

    let post = ParameterBasedPostprocessor::default();
    let f = post.factory();
    let mut values = ParameterValues::new();
    values.insert("ids".to_string(), Value::from(vec![1, 2]));
    values.insert("name".to_string(), Value::from("Bob"));
    let select = SelectExpression::from_source(TableSource::FromSql(raw_sql(
        "SELECT * FROM T WHERE id IN ({0}, {1})",
        FromSqlArguments::Parameter("ids".to_string()),
        "t",
    )))
    .filter(f.and_also(
        f.not(f.not(f.equal(f.column("t", "Name", true), f.parameter("name")))),
        f.bool_constant(true),
    ))
    .build();

    let (finalized, _) = post.optimize(&select, &values).unwrap();

    let reoptimized = SqlExpressionOptimizer::new(f).optimize_select(&finalized);
    assert!(Arc::ptr_eq(&finalized, &reoptimized));

    let reapplied = FromSqlParameterApplier::new(f, &values)
        .apply(&finalized, &mut ApplyState::default())
        .unwrap();
    assert!(Arc::ptr_eq(&finalized, &reapplied));
}

#[test]
fn test_missing_raw_sql_parameter() {
    let select = SelectExpression::from_source(TableSource::FromSql(raw_sql(
        "SELECT * FROM T WHERE id = {0}",
        FromSqlArguments::Parameter("ids".to_string()),
        "t",
    )))
    .build();

    let err = relq::optimize(&select, &ParameterValues::new()).unwrap_err();
    assert!(matches!(err, QueryError::MissingParameter(ref name) if name == "ids"));
    assert_eq!(
        err.to_string(),
        "Missing parameter: 'ids' is not present in the parameter values"
    );
}

#[test]
fn test_translate_then_postprocess() {
    let registry = MethodCallTranslatorRegistry::sql_server();
    let f = registry.factory();
    let contains = MethodInfo::static_method(DeclaringType::Enumerable, "Contains").with_generic_arguments(["Int32"]);
    let predicate = registry
        .translate(None, &contains, &[f.parameter("ids"), f.column("o", "CustomerId", true)])
        .unwrap()
        .unwrap();
    let select = SelectExpression::from_source(TableSource::table("Orders", "o"))
        .filter(predicate)
        .build();

    let mut values = ParameterValues::new();
    values.insert("ids".to_string(), Value::from(vec![Some(3), None, Some(5)]));

    let (finalized, can_cache) = relq::optimize(&select, &values).unwrap();
    assert!(!can_cache);
    assert_eq!(
        finalized.to_sql(),
        "SELECT * FROM [Orders] AS [o] WHERE [o].[CustomerId] IN (3, 5) OR [o].[CustomerId] IS NULL"
    );
}
