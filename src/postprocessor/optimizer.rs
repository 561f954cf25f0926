//! Constant and boolean simplification.
//!
//! Runs after null-semantics rewriting. Every simplification looks only at
//! tree shape, constants and declared nullability, never at parameter values,
//! so it cannot make a tree value-dependent.

use crate::ast::*;
use crate::factory::SqlExpressionFactory;
use std::cmp::Ordering;
use std::convert::Infallible;
use std::sync::Arc;

/// Bottom-up simplifier. Each node is rebuilt through the simplifying
/// constructors below, so the output is a fixed point.
pub struct SqlExpressionOptimizer<'a> {
    factory: &'a SqlExpressionFactory,
}

impl<'a> SqlExpressionOptimizer<'a> {
    pub fn new(factory: &'a SqlExpressionFactory) -> Self {
        Self { factory }
    }

    pub fn optimize_select(&self, select: &Arc<SelectExpression>) -> Arc<SelectExpression> {
        let Ok(optimized) = rewrite_select(select, &mut OptimizingRewriter(self));
        optimized
    }

    pub fn optimize(&self, expr: &SqlExpr) -> SqlExpr {
        match expr.as_ref() {
            SqlExpression::Binary(b) => {
                let left = self.optimize(&b.left);
                let right = self.optimize(&b.right);
                self.simplify_binary(expr, b, left, right)
            }
            SqlExpression::Unary(u) => {
                let operand = self.optimize(&u.operand);
                self.simplify_unary(expr, u.op, operand, u.type_mapping.as_ref())
            }
            SqlExpression::Function(func) => {
                let arguments: Vec<SqlExpr> = func.arguments.iter().map(|a| self.optimize(a)).collect();
                if arguments.iter().zip(&func.arguments).all(|(n, o)| Arc::ptr_eq(n, o)) {
                    Arc::clone(expr)
                } else {
                    Arc::new(SqlExpression::Function(SqlFunction {
                        arguments,
                        ..func.clone()
                    }))
                }
            }
            SqlExpression::In(i) => {
                let item = self.optimize(&i.item);
                if let SqlExpression::Constant(SqlConstant {
                    value: Value::Array(values),
                    ..
                }) = i.values.as_ref()
                {
                    if values.is_empty() {
                        return self.factory.bool_constant(i.negated);
                    }
                }
                if Arc::ptr_eq(&item, &i.item) {
                    Arc::clone(expr)
                } else {
                    Arc::new(SqlExpression::In(InExpression { item, ..i.clone() }))
                }
            }
            _ => Arc::clone(expr),
        }
    }

    fn simplify_binary(&self, original: &SqlExpr, b: &SqlBinary, left: SqlExpr, right: SqlExpr) -> SqlExpr {
        let f = self.factory;
        match b.op {
            SqlBinaryOp::AndAlso => {
                match (left.as_bool_constant(), right.as_bool_constant()) {
                    (Some(false), _) | (_, Some(false)) => return f.bool_constant(false),
                    (Some(true), _) => return right,
                    (_, Some(true)) => return left,
                    _ => {}
                }
            }
            SqlBinaryOp::OrElse => {
                match (left.as_bool_constant(), right.as_bool_constant()) {
                    (Some(true), _) | (_, Some(true)) => return f.bool_constant(true),
                    (Some(false), _) => return right,
                    (_, Some(false)) => return left,
                    _ => {}
                }
            }
            SqlBinaryOp::Equal | SqlBinaryOp::NotEqual => {
                let is_equal = b.op == SqlBinaryOp::Equal;
                if right.is_null_constant() {
                    return self.simplify_null_check(left, is_equal);
                }
                if left.is_null_constant() {
                    return self.simplify_null_check(right, is_equal);
                }
                // (predicate) = TRUE -> predicate, (predicate) = FALSE -> NOT predicate
                if let Some(flag) = right.as_bool_constant() {
                    if left.is_predicate() {
                        return self.keep_or_negate(left, flag == is_equal);
                    }
                }
                if let Some(flag) = left.as_bool_constant() {
                    if right.is_predicate() {
                        return self.keep_or_negate(right, flag == is_equal);
                    }
                }
                if let Some(ordering) = compare_constants(&left, &right) {
                    return f.bool_constant((ordering == Ordering::Equal) == is_equal);
                }
            }
            SqlBinaryOp::LessThan
            | SqlBinaryOp::LessThanOrEqual
            | SqlBinaryOp::GreaterThan
            | SqlBinaryOp::GreaterThanOrEqual => {
                if let Some(ordering) = compare_constants(&left, &right) {
                    let result = match b.op {
                        SqlBinaryOp::LessThan => ordering == Ordering::Less,
                        SqlBinaryOp::LessThanOrEqual => ordering != Ordering::Greater,
                        SqlBinaryOp::GreaterThan => ordering == Ordering::Greater,
                        _ => ordering != Ordering::Less,
                    };
                    return f.bool_constant(result);
                }
            }
            op => {
                if let Some(value) = fold_arithmetic(op, &left, &right) {
                    return f.constant_with_mapping(value, b.type_mapping.clone());
                }
            }
        }

        if Arc::ptr_eq(&left, &b.left) && Arc::ptr_eq(&right, &b.right) {
            Arc::clone(original)
        } else {
            Arc::new(SqlExpression::Binary(SqlBinary {
                op: b.op,
                left,
                right,
                type_mapping: b.type_mapping.clone(),
            }))
        }
    }

    fn keep_or_negate(&self, predicate: SqlExpr, keep: bool) -> SqlExpr {
        if keep {
            predicate
        } else {
            self.simplify_not(predicate, self.factory.find_mapping(StoreKind::Bool))
        }
    }

    fn simplify_null_check(&self, operand: SqlExpr, is_null: bool) -> SqlExpr {
        let op = if is_null { SqlUnaryOp::IsNull } else { SqlUnaryOp::IsNotNull };
        let original = self.factory.unary(op, Arc::clone(&operand));
        self.simplify_unary(&original, op, operand, None)
    }

    fn simplify_unary(
        &self,
        original: &SqlExpr,
        op: SqlUnaryOp,
        operand: SqlExpr,
        type_mapping: Option<&TypeMapping>,
    ) -> SqlExpr {
        let f = self.factory;
        let unchanged = match original.as_ref() {
            SqlExpression::Unary(u) => u.op == op && Arc::ptr_eq(&u.operand, &operand),
            _ => false,
        };

        match op {
            SqlUnaryOp::Not => {
                let mapping = type_mapping
                    .cloned()
                    .unwrap_or_else(|| f.find_mapping(StoreKind::Bool));
                match self.simplify_not_shape(&operand) {
                    Some(simplified) => simplified,
                    None if unchanged => Arc::clone(original),
                    None => self.simplify_not(operand, mapping),
                }
            }
            SqlUnaryOp::IsNull | SqlUnaryOp::IsNotNull => {
                let known_null = match operand.as_ref() {
                    SqlExpression::Constant(c) => Some(c.value.is_null()),
                    SqlExpression::Column(c) if !c.nullable => Some(false),
                    SqlExpression::Parameter(p) if !p.nullable => Some(false),
                    _ => None,
                };
                match known_null {
                    Some(is_null) => f.bool_constant(is_null == (op == SqlUnaryOp::IsNull)),
                    None if unchanged => Arc::clone(original),
                    None => f.unary(op, operand),
                }
            }
            SqlUnaryOp::Negate => {
                let folded = match operand.as_ref() {
                    SqlExpression::Constant(SqlConstant {
                        value: Value::Int(n),
                        type_mapping,
                    }) => n.checked_neg().map(|v| (Value::Int(v), type_mapping.clone())),
                    SqlExpression::Constant(SqlConstant {
                        value: Value::Float(n),
                        type_mapping,
                    }) => Some((Value::Float(-n), type_mapping.clone())),
                    _ => None,
                };
                match folded {
                    Some((value, mapping)) => f.constant_with_mapping(value, mapping),
                    None if unchanged => Arc::clone(original),
                    None => f.unary(op, operand),
                }
            }
        }
    }

    fn simplify_not(&self, operand: SqlExpr, mapping: TypeMapping) -> SqlExpr {
        self.simplify_not_shape(&operand).unwrap_or_else(|| {
            Arc::new(SqlExpression::Unary(SqlUnary {
                op: SqlUnaryOp::Not,
                operand,
                type_mapping: Some(mapping),
            }))
        })
    }

    /// `NOT` folded into its operand, when the operand has a negated form.
    fn simplify_not_shape(&self, operand: &SqlExpr) -> Option<SqlExpr> {
        let f = self.factory;
        match operand.as_ref() {
            SqlExpression::Constant(SqlConstant {
                value: Value::Bool(b),
                type_mapping,
            }) => Some(f.constant_with_mapping(Value::Bool(!b), type_mapping.clone())),
            SqlExpression::Unary(SqlUnary {
                op: SqlUnaryOp::Not,
                operand: inner,
                ..
            }) => Some(Arc::clone(inner)),
            SqlExpression::Unary(SqlUnary {
                op: SqlUnaryOp::IsNull,
                operand: inner,
                type_mapping,
            }) => Some(Arc::new(SqlExpression::Unary(SqlUnary {
                op: SqlUnaryOp::IsNotNull,
                operand: Arc::clone(inner),
                type_mapping: type_mapping.clone(),
            }))),
            SqlExpression::Unary(SqlUnary {
                op: SqlUnaryOp::IsNotNull,
                operand: inner,
                type_mapping,
            }) => Some(Arc::new(SqlExpression::Unary(SqlUnary {
                op: SqlUnaryOp::IsNull,
                operand: Arc::clone(inner),
                type_mapping: type_mapping.clone(),
            }))),
            SqlExpression::Binary(b) => b.op.negate().map(|op| {
                Arc::new(SqlExpression::Binary(SqlBinary {
                    op,
                    ..b.clone()
                }))
            }),
            SqlExpression::In(i) => Some(Arc::new(SqlExpression::In(InExpression {
                negated: !i.negated,
                ..i.clone()
            }))),
            _ => None,
        }
    }
}

struct OptimizingRewriter<'o, 'a>(&'o SqlExpressionOptimizer<'a>);

impl SqlTreeRewriter for OptimizingRewriter<'_, '_> {
    type Error = Infallible;

    fn rewrite_expression(&mut self, expr: &SqlExpr) -> Result<SqlExpr, Infallible> {
        Ok(self.0.optimize(expr))
    }
}

/// Order two non-null scalar constants of the same kind.
fn compare_constants(left: &SqlExpr, right: &SqlExpr) -> Option<Ordering> {
    let (SqlExpression::Constant(l), SqlExpression::Constant(r)) = (left.as_ref(), right.as_ref()) else {
        return None;
    };
    match (&l.value, &r.value) {
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
        (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
        (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
        // string ordering and equality follow the database collation
        (Value::String(a), Value::String(b)) if a == b => Some(Ordering::Equal),
        (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn fold_arithmetic(op: SqlBinaryOp, left: &SqlExpr, right: &SqlExpr) -> Option<Value> {
    let (SqlExpression::Constant(l), SqlExpression::Constant(r)) = (left.as_ref(), right.as_ref()) else {
        return None;
    };
    match (&l.value, &r.value) {
        (Value::Int(a), Value::Int(b)) => {
            let folded = match op {
                SqlBinaryOp::Add => a.checked_add(*b),
                SqlBinaryOp::Subtract => a.checked_sub(*b),
                SqlBinaryOp::Multiply => a.checked_mul(*b),
                SqlBinaryOp::Divide => a.checked_div(*b),
                SqlBinaryOp::Modulo => a.checked_rem(*b),
                _ => None,
            };
            folded.map(Value::Int)
        }
        (Value::Float(a), Value::Float(b)) => {
            let folded = match op {
                SqlBinaryOp::Add => a + b,
                SqlBinaryOp::Subtract => a - b,
                SqlBinaryOp::Multiply => a * b,
                SqlBinaryOp::Divide if *b != 0.0 => a / b,
                _ => return None,
            };
            folded.is_finite().then_some(Value::Float(folded))
        }
        _ => None,
    }
}
