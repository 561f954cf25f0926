//! Null-semantics rewriting.
//!
//! SQL comparisons are three-valued: `a = b` is NULL when either side is NULL.
//! Source-language equality is two-valued, so in the default mode every
//! comparison with a nullable operand is expanded into a form that tests
//! operand nullability explicitly and never yields NULL.

use crate::ast::*;
use crate::factory::SqlExpressionFactory;
use std::convert::Infallible;
use std::sync::Arc;

/// Rewrites comparisons to two-valued semantics for one postprocessing run.
pub struct NullSemanticsRewriter<'a> {
    factory: &'a SqlExpressionFactory,
    parameter_values: &'a ParameterValues,
    use_relational_nulls: bool,
    can_cache: bool,
}

impl<'a> NullSemanticsRewriter<'a> {
    pub fn new(
        factory: &'a SqlExpressionFactory,
        parameter_values: &'a ParameterValues,
        use_relational_nulls: bool,
    ) -> Self {
        Self {
            factory,
            parameter_values,
            use_relational_nulls,
            can_cache: true,
        }
    }

    /// False once any rewrite depended on a specific parameter value.
    pub fn can_cache(&self) -> bool {
        self.can_cache
    }

    pub fn rewrite(&mut self, select: &Arc<SelectExpression>) -> Arc<SelectExpression> {
        let Ok(rewritten) = rewrite_select(select, self);
        rewritten
    }

    /// Rewrite one expression, returning it together with its nullability.
    pub fn visit(&mut self, expr: &SqlExpr) -> (SqlExpr, bool) {
        match expr.as_ref() {
            SqlExpression::Constant(c) => (Arc::clone(expr), c.value.is_null()),
            SqlExpression::Parameter(p) => (Arc::clone(expr), p.nullable),
            SqlExpression::Column(c) => (Arc::clone(expr), c.nullable),
            SqlExpression::Fragment(_) => (Arc::clone(expr), false),
            SqlExpression::Binary(b) if b.op.is_comparison() => {
                self.visit_comparison(expr, b.op, &b.left, &b.right, false)
            }
            SqlExpression::Binary(b) => {
                let (left, left_nullable) = self.visit(&b.left);
                let (right, right_nullable) = self.visit(&b.right);
                let rewritten = if Arc::ptr_eq(&left, &b.left) && Arc::ptr_eq(&right, &b.right) {
                    Arc::clone(expr)
                } else {
                    Arc::new(SqlExpression::Binary(SqlBinary {
                        op: b.op,
                        left,
                        right,
                        type_mapping: b.type_mapping.clone(),
                    }))
                };
                (rewritten, left_nullable || right_nullable)
            }
            SqlExpression::Unary(u) => self.visit_unary(expr, u),
            SqlExpression::Function(f) => {
                let mut changed = false;
                let arguments: Vec<SqlExpr> = f
                    .arguments
                    .iter()
                    .map(|arg| {
                        let (rewritten, _) = self.visit(arg);
                        changed |= !Arc::ptr_eq(&rewritten, arg);
                        rewritten
                    })
                    .collect();
                let rewritten = if changed {
                    Arc::new(SqlExpression::Function(SqlFunction {
                        arguments,
                        ..f.clone()
                    }))
                } else {
                    Arc::clone(expr)
                };
                (rewritten, f.nullable)
            }
            SqlExpression::In(i) => self.visit_in(expr, i),
        }
    }

    fn visit_unary(&mut self, expr: &SqlExpr, unary: &SqlUnary) -> (SqlExpr, bool) {
        if unary.op == SqlUnaryOp::Not && !self.use_relational_nulls {
            // Negate inside the operator so the guarded expansion covers the negated form.
            match unary.operand.as_ref() {
                SqlExpression::Binary(b) if b.op.is_comparison() => {
                    if let Some(negated) = b.op.negate() {
                        // a negated ordering holds when an operand is null
                        let negated_ordering = !matches!(b.op, SqlBinaryOp::Equal | SqlBinaryOp::NotEqual);
                        return self.visit_comparison(expr, negated, &b.left, &b.right, negated_ordering);
                    }
                }
                SqlExpression::In(i) => {
                    let flipped = InExpression {
                        negated: !i.negated,
                        ..i.clone()
                    };
                    let flipped_expr = Arc::new(SqlExpression::In(flipped.clone()));
                    return self.visit_in(&flipped_expr, &flipped);
                }
                _ => {}
            }
        }

        let (operand, operand_nullable) = self.visit(&unary.operand);
        let rewritten = if Arc::ptr_eq(&operand, &unary.operand) {
            Arc::clone(expr)
        } else {
            Arc::new(SqlExpression::Unary(SqlUnary {
                op: unary.op,
                operand,
                type_mapping: unary.type_mapping.clone(),
            }))
        };
        let nullable = match unary.op {
            SqlUnaryOp::IsNull | SqlUnaryOp::IsNotNull => false,
            SqlUnaryOp::Not | SqlUnaryOp::Negate => operand_nullable,
        };
        (rewritten, nullable)
    }

    /// A parameter bound to NULL in this run is treated as a NULL literal.
    fn specialize_null_parameter(&mut self, operand: SqlExpr) -> SqlExpr {
        if self.use_relational_nulls {
            return operand;
        }
        if let SqlExpression::Parameter(p) = operand.as_ref() {
            if matches!(self.parameter_values.get(&p.name), Some(Value::Null)) {
                tracing::trace!(parameter = %p.name, "specializing null-valued parameter");
                self.can_cache = false;
                return self
                    .factory
                    .constant_with_mapping(Value::Null, p.type_mapping.clone());
            }
        }
        operand
    }

    /// `negated_ordering` marks `op` as the flipped form of `NOT (a < b)` and
    /// friends, which is true rather than false when an operand is null.
    fn visit_comparison(
        &mut self,
        expr: &SqlExpr,
        op: SqlBinaryOp,
        left: &SqlExpr,
        right: &SqlExpr,
        negated_ordering: bool,
    ) -> (SqlExpr, bool) {
        let (visited_left, left_nullable) = self.visit(left);
        let (visited_right, right_nullable) = self.visit(right);
        let new_left = self.specialize_null_parameter(visited_left);
        let new_right = self.specialize_null_parameter(visited_right);

        let f = self.factory;
        let unchanged = || match expr.as_ref() {
            SqlExpression::Binary(b) => {
                b.op == op && Arc::ptr_eq(&new_left, left) && Arc::ptr_eq(&new_right, right)
            }
            _ => false,
        };

        if self.use_relational_nulls {
            let rewritten = if unchanged() {
                Arc::clone(expr)
            } else {
                f.binary(op, new_left, new_right)
            };
            return (rewritten, left_nullable || right_nullable);
        }

        let left_null = new_left.is_null_constant();
        let right_null = new_right.is_null_constant();
        let (a, b) = (new_left.clone(), new_right.clone());

        let rewritten = match (left_null, right_null) {
            (true, true) => f.bool_constant(op == SqlBinaryOp::Equal || negated_ordering),
            (true, false) | (false, true) => {
                let other = if left_null { b } else { a };
                match op {
                    SqlBinaryOp::Equal => f.is_null(other),
                    SqlBinaryOp::NotEqual => f.is_not_null(other),
                    _ => f.bool_constant(negated_ordering),
                }
            }
            (false, false) => match (op, left_nullable, right_nullable) {
                (_, false, false) => {
                    if unchanged() {
                        Arc::clone(expr)
                    } else {
                        f.binary(op, a, b)
                    }
                }
                // (a = b AND a IS NOT NULL AND b IS NOT NULL) OR (a IS NULL AND b IS NULL)
                (SqlBinaryOp::Equal, true, true) => f.or_else(
                    f.and_also(
                        f.and_also(f.equal(a.clone(), b.clone()), f.is_not_null(a.clone())),
                        f.is_not_null(b.clone()),
                    ),
                    f.and_also(f.is_null(a), f.is_null(b)),
                ),
                // (a <> b OR a IS NULL OR b IS NULL) AND (a IS NOT NULL OR b IS NOT NULL)
                (SqlBinaryOp::NotEqual, true, true) => f.and_also(
                    f.or_else(
                        f.or_else(f.not_equal(a.clone(), b.clone()), f.is_null(a.clone())),
                        f.is_null(b.clone()),
                    ),
                    f.or_else(f.is_not_null(a), f.is_not_null(b)),
                ),
                (SqlBinaryOp::Equal, _, _) => {
                    let nullable = if left_nullable { a.clone() } else { b.clone() };
                    f.and_also(f.equal(a, b), f.is_not_null(nullable))
                }
                (SqlBinaryOp::NotEqual, _, _) => {
                    let nullable = if left_nullable { a.clone() } else { b.clone() };
                    f.or_else(f.not_equal(a, b), f.is_null(nullable))
                }
                // NOT (a < b) -> a >= b OR a IS NULL OR b IS NULL
                (_, _, _) if negated_ordering => {
                    let mut guarded = f.binary(op, a.clone(), b.clone());
                    if left_nullable {
                        guarded = f.or_else(guarded, f.is_null(a));
                    }
                    if right_nullable {
                        guarded = f.or_else(guarded, f.is_null(b));
                    }
                    guarded
                }
                // ordering comparisons are false whenever an operand is null
                (_, _, _) => {
                    let mut guarded = f.binary(op, a.clone(), b.clone());
                    if left_nullable {
                        guarded = f.and_also(guarded, f.is_not_null(a));
                    }
                    if right_nullable {
                        guarded = f.and_also(guarded, f.is_not_null(b));
                    }
                    guarded
                }
            },
        };

        (rewritten, false)
    }

    fn visit_in(&mut self, expr: &SqlExpr, in_expr: &InExpression) -> (SqlExpr, bool) {
        let (item, item_nullable) = self.visit(&in_expr.item);

        let (values, from_parameter) = match in_expr.values.as_ref() {
            SqlExpression::Constant(SqlConstant {
                value: Value::Array(values),
                ..
            }) => (values.clone(), false),
            SqlExpression::Parameter(p) => match self.parameter_values.get(&p.name) {
                Some(Value::Array(values)) => (values.clone(), true),
                Some(Value::Null) => (Vec::new(), true),
                _ => return (self.rebuild_in(expr, in_expr, item), item_nullable),
            },
            _ => return (self.rebuild_in(expr, in_expr, item), item_nullable),
        };

        if from_parameter {
            tracing::trace!(count = values.len(), "expanding parameter list into IN constants");
            self.can_cache = false;
        }

        let f = self.factory;
        let list_mapping = in_expr
            .values
            .type_mapping()
            .or_else(|| item.type_mapping())
            .cloned();

        if self.use_relational_nulls {
            if !from_parameter {
                return (self.rebuild_in(expr, in_expr, item), item_nullable);
            }
            let list = f.constant_with_mapping(Value::Array(values), list_mapping);
            return (f.in_values(item, list, in_expr.negated), item_nullable);
        }

        let has_null = values.iter().any(Value::is_null);
        if !has_null && !from_parameter && !(in_expr.negated && item_nullable) && !values.is_empty() {
            return (self.rebuild_in(expr, in_expr, item), item_nullable);
        }

        let non_null: Vec<Value> = values.into_iter().filter(|v| !v.is_null()).collect();
        let core = if non_null.is_empty() {
            None
        } else {
            let list = f.constant_with_mapping(Value::Array(non_null), list_mapping);
            Some(f.in_values(item.clone(), list, in_expr.negated))
        };

        let rewritten = match (in_expr.negated, has_null, core) {
            (false, true, Some(core)) => f.or_else(core, f.is_null(item)),
            (false, true, None) => f.is_null(item),
            (false, false, Some(core)) => return (core, item_nullable),
            (false, false, None) => f.bool_constant(false),
            (true, true, Some(core)) => f.and_also(core, f.is_not_null(item)),
            (true, true, None) => f.is_not_null(item),
            (true, false, Some(core)) if item_nullable => f.or_else(core, f.is_null(item)),
            (true, false, Some(core)) => core,
            (true, false, None) => f.bool_constant(true),
        };
        (rewritten, false)
    }

    fn rebuild_in(&self, expr: &SqlExpr, in_expr: &InExpression, item: SqlExpr) -> SqlExpr {
        if Arc::ptr_eq(&item, &in_expr.item) {
            Arc::clone(expr)
        } else {
            Arc::new(SqlExpression::In(InExpression {
                item,
                ..in_expr.clone()
            }))
        }
    }
}

impl SqlTreeRewriter for NullSemanticsRewriter<'_> {
    type Error = Infallible;

    fn rewrite_expression(&mut self, expr: &SqlExpr) -> Result<SqlExpr, Infallible> {
        Ok(self.visit(expr).0)
    }
}
