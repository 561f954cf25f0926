//! Default-mode null semantics checked against a three-valued evaluator.
//!
//! Every rewritten predicate must evaluate (under SQL's three-valued logic)
//! to the same answer as two-valued equality, and must never be NULL.

use relq::prelude::*;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Val {
    Int(i64),
    Bool(bool),
}

type Row = HashMap<&'static str, Option<i64>>;

fn eval_bool(expr: &SqlExpr, row: &Row) -> Option<bool> {
    match eval(expr, row) {
        Some(Val::Bool(b)) => Some(b),
        None => None,
        Some(other) => panic!("expected a boolean, got {:?}", other),
    }
}

/// SQL three-valued evaluation; `None` is NULL.
fn eval(expr: &SqlExpr, row: &Row) -> Option<Val> {
    match expr.as_ref() {
        SqlExpression::Constant(c) => match &c.value {
            Value::Null => None,
            Value::Int(n) => Some(Val::Int(*n)),
            Value::Bool(b) => Some(Val::Bool(*b)),
            other => panic!("unexpected constant {:?}", other),
        },
        SqlExpression::Parameter(p) => row[p.name.as_str()].map(Val::Int),
        SqlExpression::Column(c) => row[c.name.as_str()].map(Val::Int),
        SqlExpression::Unary(u) => match u.op {
            SqlUnaryOp::Not => eval_bool(&u.operand, row).map(|b| Val::Bool(!b)),
            SqlUnaryOp::IsNull => Some(Val::Bool(eval(&u.operand, row).is_none())),
            SqlUnaryOp::IsNotNull => Some(Val::Bool(eval(&u.operand, row).is_some())),
            SqlUnaryOp::Negate => match eval(&u.operand, row) {
                Some(Val::Int(n)) => Some(Val::Int(-n)),
                _ => None,
            },
        },
        SqlExpression::Binary(b) => match b.op {
            SqlBinaryOp::AndAlso => {
                match (eval_bool(&b.left, row), eval_bool(&b.right, row)) {
                    (Some(false), _) | (_, Some(false)) => Some(Val::Bool(false)),
                    (Some(true), Some(true)) => Some(Val::Bool(true)),
                    _ => None,
                }
            }
            SqlBinaryOp::OrElse => {
                match (eval_bool(&b.left, row), eval_bool(&b.right, row)) {
                    (Some(true), _) | (_, Some(true)) => Some(Val::Bool(true)),
                    (Some(false), Some(false)) => Some(Val::Bool(false)),
                    _ => None,
                }
            }
            op => {
                let (Some(Val::Int(l)), Some(Val::Int(r))) = (eval(&b.left, row), eval(&b.right, row)) else {
                    return None;
                };
                let result = match op {
                    SqlBinaryOp::Equal => l == r,
                    SqlBinaryOp::NotEqual => l != r,
                    SqlBinaryOp::LessThan => l < r,
                    SqlBinaryOp::LessThanOrEqual => l <= r,
                    SqlBinaryOp::GreaterThan => l > r,
                    SqlBinaryOp::GreaterThanOrEqual => l >= r,
                    other => panic!("unexpected operator {:?}", other),
                };
                Some(Val::Bool(result))
            }
        },
        other => panic!("unexpected node {:?}", other),
    }
}

/// Two-valued reference: nulls are equal to each other and unordered.
fn expected(op: SqlBinaryOp, a: Option<i64>, b: Option<i64>) -> bool {
    match op {
        SqlBinaryOp::Equal => a == b,
        SqlBinaryOp::NotEqual => a != b,
        _ => match (a, b) {
            (Some(a), Some(b)) => match op {
                SqlBinaryOp::LessThan => a < b,
                SqlBinaryOp::LessThanOrEqual => a <= b,
                SqlBinaryOp::GreaterThan => a > b,
                _ => a >= b,
            },
            _ => false,
        },
    }
}

const OPERATORS: [SqlBinaryOp; 6] = [
    SqlBinaryOp::Equal,
    SqlBinaryOp::NotEqual,
    SqlBinaryOp::LessThan,
    SqlBinaryOp::LessThanOrEqual,
    SqlBinaryOp::GreaterThan,
    SqlBinaryOp::GreaterThanOrEqual,
];

const VALUES: [Option<i64>; 3] = [None, Some(1), Some(2)];

/// Finalize `predicate` with `p` bound to `b`, then evaluate it with `A = a`
/// and `B = b`.
fn finalized_result(
    post: &ParameterBasedPostprocessor,
    predicate: SqlExpr,
    a: Option<i64>,
    b: Option<i64>,
) -> Option<bool> {
    let select = SelectExpression::from_source(TableSource::table("T", "t"))
        .filter(predicate)
        .build();
    let mut values = ParameterValues::new();
    values.insert("p".to_string(), Value::from(b));

    let (finalized, _) = post.optimize(&select, &values).unwrap();
    let row: Row = HashMap::from([("A", a), ("B", b), ("p", b)]);
    match &finalized.predicate {
        Some(predicate) => eval_bool(predicate, &row),
        None => Some(true),
    }
}

#[test]
fn test_column_against_parameter_is_two_valued() {
    let post = ParameterBasedPostprocessor::default();
    let f = post.factory();
    for op in OPERATORS {
        for a in VALUES {
            for b in VALUES {
                let predicate = f.binary(op, f.column("t", "A", true), f.parameter("p"));
                let result = finalized_result(&post, predicate, a, b);
                assert_eq!(result, Some(expected(op, a, b)), "{:?} with A={:?}, p={:?}", op, a, b);
            }
        }
    }
}

#[test]
fn test_column_against_column_is_two_valued() {
    let post = ParameterBasedPostprocessor::default();
    let f = post.factory();
    for op in OPERATORS {
        for a in VALUES {
            for b in VALUES {
                let predicate = f.binary(op, f.column("t", "A", true), f.column("t", "B", true));
                let result = finalized_result(&post, predicate, a, b);
                assert_eq!(result, Some(expected(op, a, b)), "{:?} with A={:?}, B={:?}", op, a, b);
            }
        }
    }
}

#[test]
fn test_negated_comparison_is_two_valued() {
    let post = ParameterBasedPostprocessor::default();
    let f = post.factory();
    for op in OPERATORS {
        for a in VALUES {
            for b in VALUES {
                let predicate = f.not(f.binary(op, f.column("t", "A", true), f.column("t", "B", true)));
                let result = finalized_result(&post, predicate, a, b);
                assert_eq!(result, Some(!expected(op, a, b)), "NOT {:?} with A={:?}, B={:?}", op, a, b);
            }
        }
    }
}

#[test]
fn test_negated_comparison_with_parameter_is_two_valued() {
    let post = ParameterBasedPostprocessor::default();
    let f = post.factory();
    for op in OPERATORS {
        for a in VALUES {
            for b in VALUES {
                let predicate = f.not(f.binary(op, f.column("t", "A", true), f.parameter("p")));
                let result = finalized_result(&post, predicate, a, b);
                assert_eq!(result, Some(!expected(op, a, b)), "NOT {:?} with A={:?}, p={:?}", op, a, b);
            }
        }
    }
}

#[test]
fn test_negated_comparison_with_constant_is_two_valued() {
    let post = ParameterBasedPostprocessor::default();
    let f = post.factory();
    for op in OPERATORS {
        for a in VALUES {
            let predicate = f.not(f.binary(op, f.column("t", "A", true), f.constant(1)));
            let result = finalized_result(&post, predicate, a, None);
            assert_eq!(result, Some(!expected(op, a, Some(1))), "NOT {:?} with A={:?}", op, a);
        }
    }
}

#[test]
fn test_relational_nulls_keep_three_valued_result() {
    let options = PostprocessorOptions {
        use_relational_nulls: true,
        ..Default::default()
    };
    let post = ParameterBasedPostprocessor::new(SqlExpressionFactory::default(), options);
    let f = post.factory();

    let predicate = f.equal(f.column("t", "A", true), f.parameter("p"));
    assert_eq!(finalized_result(&post, predicate.clone(), None, None), None);
    assert_eq!(finalized_result(&post, predicate, Some(1), Some(1)), Some(true));
}
