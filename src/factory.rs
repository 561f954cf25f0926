//! Construction of typed SQL expression nodes.

use crate::ast::*;
use std::sync::Arc;

/// Builds SQL nodes and assigns their type mappings.
///
/// Predicates get the provider's boolean mapping, constants get the mapping
/// inferred from their value, and operators inherit a mapping from an operand.
pub struct SqlExpressionFactory {
    type_mappings: Box<dyn TypeMappingSource>,
}

impl Default for SqlExpressionFactory {
    fn default() -> Self {
        Self::new(Box::new(SqlServerTypeMappingSource))
    }
}

impl std::fmt::Debug for SqlExpressionFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlExpressionFactory").finish_non_exhaustive()
    }
}

impl SqlExpressionFactory {
    pub fn new(type_mappings: Box<dyn TypeMappingSource>) -> Self {
        Self { type_mappings }
    }

    pub fn find_mapping(&self, kind: StoreKind) -> TypeMapping {
        self.type_mappings.find_mapping(kind)
    }

    pub fn type_mapping_for_value(&self, value: &Value) -> Option<TypeMapping> {
        self.type_mappings.mapping_for_value(value)
    }

    fn bool_mapping(&self) -> Option<TypeMapping> {
        Some(self.find_mapping(StoreKind::Bool))
    }

    pub fn constant(&self, value: impl Into<Value>) -> SqlExpr {
        let value = value.into();
        let type_mapping = match &value {
            Value::Array(items) => items.iter().find_map(|v| self.type_mapping_for_value(v)),
            v => self.type_mapping_for_value(v),
        };
        self.constant_with_mapping(value, type_mapping)
    }

    pub fn constant_with_mapping(&self, value: Value, type_mapping: Option<TypeMapping>) -> SqlExpr {
        Arc::new(SqlExpression::Constant(SqlConstant {
            value,
            type_mapping,
        }))
    }

    pub fn bool_constant(&self, value: bool) -> SqlExpr {
        self.constant_with_mapping(Value::Bool(value), self.bool_mapping())
    }

    pub fn null(&self) -> SqlExpr {
        self.constant_with_mapping(Value::Null, None)
    }

    /// A nullable parameter without a known store type.
    pub fn parameter(&self, name: impl Into<String>) -> SqlExpr {
        Arc::new(SqlExpression::Parameter(SqlParameter {
            name: name.into(),
            nullable: true,
            type_mapping: None,
        }))
    }

    pub fn typed_parameter(&self, name: impl Into<String>, nullable: bool, kind: StoreKind) -> SqlExpr {
        Arc::new(SqlExpression::Parameter(SqlParameter {
            name: name.into(),
            nullable,
            type_mapping: Some(self.find_mapping(kind)),
        }))
    }

    pub fn column(&self, table: impl Into<String>, name: impl Into<String>, nullable: bool) -> SqlExpr {
        Arc::new(SqlExpression::Column(ColumnExpression {
            table: table.into(),
            name: name.into(),
            nullable,
            type_mapping: None,
        }))
    }

    pub fn typed_column(
        &self,
        table: impl Into<String>,
        name: impl Into<String>,
        nullable: bool,
        kind: StoreKind,
    ) -> SqlExpr {
        Arc::new(SqlExpression::Column(ColumnExpression {
            table: table.into(),
            name: name.into(),
            nullable,
            type_mapping: Some(self.find_mapping(kind)),
        }))
    }

    pub fn binary(&self, op: SqlBinaryOp, left: SqlExpr, right: SqlExpr) -> SqlExpr {
        let type_mapping = if op.is_arithmetic() {
            left.type_mapping()
                .or_else(|| right.type_mapping())
                .cloned()
        } else {
            self.bool_mapping()
        };
        Arc::new(SqlExpression::Binary(SqlBinary {
            op,
            left,
            right,
            type_mapping,
        }))
    }

    pub fn equal(&self, left: SqlExpr, right: SqlExpr) -> SqlExpr {
        self.binary(SqlBinaryOp::Equal, left, right)
    }

    pub fn not_equal(&self, left: SqlExpr, right: SqlExpr) -> SqlExpr {
        self.binary(SqlBinaryOp::NotEqual, left, right)
    }

    pub fn greater_than(&self, left: SqlExpr, right: SqlExpr) -> SqlExpr {
        self.binary(SqlBinaryOp::GreaterThan, left, right)
    }

    pub fn less_than(&self, left: SqlExpr, right: SqlExpr) -> SqlExpr {
        self.binary(SqlBinaryOp::LessThan, left, right)
    }

    pub fn and_also(&self, left: SqlExpr, right: SqlExpr) -> SqlExpr {
        self.binary(SqlBinaryOp::AndAlso, left, right)
    }

    pub fn or_else(&self, left: SqlExpr, right: SqlExpr) -> SqlExpr {
        self.binary(SqlBinaryOp::OrElse, left, right)
    }

    pub fn add(&self, left: SqlExpr, right: SqlExpr) -> SqlExpr {
        self.binary(SqlBinaryOp::Add, left, right)
    }

    pub fn unary(&self, op: SqlUnaryOp, operand: SqlExpr) -> SqlExpr {
        let type_mapping = match op {
            SqlUnaryOp::Negate => operand.type_mapping().cloned(),
            _ => self.bool_mapping(),
        };
        Arc::new(SqlExpression::Unary(SqlUnary {
            op,
            operand,
            type_mapping,
        }))
    }

    pub fn not(&self, operand: SqlExpr) -> SqlExpr {
        self.unary(SqlUnaryOp::Not, operand)
    }

    pub fn is_null(&self, operand: SqlExpr) -> SqlExpr {
        self.unary(SqlUnaryOp::IsNull, operand)
    }

    pub fn is_not_null(&self, operand: SqlExpr) -> SqlExpr {
        self.unary(SqlUnaryOp::IsNotNull, operand)
    }

    /// `item [NOT] IN (values)`. An untyped constant list takes the item's mapping.
    pub fn in_values(&self, item: SqlExpr, values: SqlExpr, negated: bool) -> SqlExpr {
        let values = match values.as_ref() {
            SqlExpression::Constant(c) if c.type_mapping.is_none() && item.type_mapping().is_some() => {
                self.constant_with_mapping(c.value.clone(), item.type_mapping().cloned())
            }
            _ => values,
        };
        Arc::new(SqlExpression::In(InExpression {
            item,
            values,
            negated,
            type_mapping: self.bool_mapping(),
        }))
    }

    pub fn function(
        &self,
        name: impl Into<String>,
        arguments: Vec<SqlExpr>,
        nullable: bool,
        type_mapping: Option<TypeMapping>,
    ) -> SqlExpr {
        Arc::new(SqlExpression::Function(SqlFunction {
            schema: None,
            name: name.into(),
            arguments,
            niladic: false,
            nullable,
            type_mapping,
        }))
    }

    pub fn niladic_function(&self, name: impl Into<String>, type_mapping: Option<TypeMapping>) -> SqlExpr {
        Arc::new(SqlExpression::Function(SqlFunction {
            schema: None,
            name: name.into(),
            arguments: Vec::new(),
            niladic: true,
            nullable: false,
            type_mapping,
        }))
    }

    pub fn fragment(&self, sql: impl Into<String>) -> SqlExpr {
        Arc::new(SqlExpression::Fragment(sql.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comparison_gets_bool_mapping() {
        let f = SqlExpressionFactory::default();
        let expr = f.equal(f.column("c", "Id", false), f.constant(1));
        assert_eq!(expr.type_mapping().map(|m| m.kind), Some(StoreKind::Bool));
    }

    #[test]
    fn test_arithmetic_inherits_operand_mapping() {
        let f = SqlExpressionFactory::default();
        let expr = f.add(f.column("c", "Age", false), f.constant(1));
        assert_eq!(expr.type_mapping().map(|m| m.kind), Some(StoreKind::Integer));
    }

    #[test]
    fn test_in_values_applies_item_mapping() {
        let f = SqlExpressionFactory::default();
        let item = f.typed_column("c", "Name", true, StoreKind::String);
        let values = f.constant_with_mapping(Value::Array(vec![]), None);
        let expr = f.in_values(item, values, false);
        let SqlExpression::In(in_expr) = expr.as_ref() else {
            panic!("expected IN");
        };
        assert_eq!(
            in_expr.values.type_mapping().map(|m| m.kind),
            Some(StoreKind::String)
        );
    }
}
