use crate::ast::{TypeMapping, Value};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared handle to an immutable SQL expression node.
///
/// Rewrites build new nodes and share untouched subtrees, so `Arc::ptr_eq`
/// tells whether a rewrite changed anything.
pub type SqlExpr = Arc<SqlExpression>;

/// A node of the provider-level SQL expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SqlExpression {
    Constant(SqlConstant),
    Parameter(SqlParameter),
    Column(ColumnExpression),
    Binary(SqlBinary),
    Unary(SqlUnary),
    Function(SqlFunction),
    In(InExpression),
    /// Verbatim SQL such as a `DATEADD` date part or a `CONVERT` target type
    Fragment(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlConstant {
    pub value: Value,
    #[serde(default)]
    pub type_mapping: Option<TypeMapping>,
}

/// A named placeholder bound at execution time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlParameter {
    pub name: String,
    /// Whether the front end allows null bindings for this parameter.
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default)]
    pub type_mapping: Option<TypeMapping>,
}

fn default_nullable() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnExpression {
    /// Alias of the table source the column belongs to
    pub table: String,
    pub name: String,
    pub nullable: bool,
    #[serde(default)]
    pub type_mapping: Option<TypeMapping>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SqlBinaryOp {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    AndAlso,
    OrElse,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl SqlBinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            SqlBinaryOp::Equal
                | SqlBinaryOp::NotEqual
                | SqlBinaryOp::LessThan
                | SqlBinaryOp::LessThanOrEqual
                | SqlBinaryOp::GreaterThan
                | SqlBinaryOp::GreaterThanOrEqual
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, SqlBinaryOp::AndAlso | SqlBinaryOp::OrElse)
    }

    pub fn is_arithmetic(self) -> bool {
        !self.is_comparison() && !self.is_logical()
    }

    /// The comparison that holds exactly when this one does not.
    /// Valid under three-valued logic: both sides are NULL for the same inputs.
    pub fn negate(self) -> Option<SqlBinaryOp> {
        match self {
            SqlBinaryOp::Equal => Some(SqlBinaryOp::NotEqual),
            SqlBinaryOp::NotEqual => Some(SqlBinaryOp::Equal),
            SqlBinaryOp::LessThan => Some(SqlBinaryOp::GreaterThanOrEqual),
            SqlBinaryOp::LessThanOrEqual => Some(SqlBinaryOp::GreaterThan),
            SqlBinaryOp::GreaterThan => Some(SqlBinaryOp::LessThanOrEqual),
            SqlBinaryOp::GreaterThanOrEqual => Some(SqlBinaryOp::LessThan),
            _ => None,
        }
    }

    /// Binding strength, higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            SqlBinaryOp::Multiply | SqlBinaryOp::Divide | SqlBinaryOp::Modulo => 4,
            SqlBinaryOp::Add | SqlBinaryOp::Subtract => 3,
            SqlBinaryOp::OrElse => 0,
            SqlBinaryOp::AndAlso => 1,
            _ => 2,
        }
    }

    pub fn is_associative(self) -> bool {
        matches!(
            self,
            SqlBinaryOp::AndAlso | SqlBinaryOp::OrElse | SqlBinaryOp::Add | SqlBinaryOp::Multiply
        )
    }
}

impl std::fmt::Display for SqlBinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlBinaryOp::Equal => write!(f, "="),
            SqlBinaryOp::NotEqual => write!(f, "<>"),
            SqlBinaryOp::LessThan => write!(f, "<"),
            SqlBinaryOp::LessThanOrEqual => write!(f, "<="),
            SqlBinaryOp::GreaterThan => write!(f, ">"),
            SqlBinaryOp::GreaterThanOrEqual => write!(f, ">="),
            SqlBinaryOp::AndAlso => write!(f, "AND"),
            SqlBinaryOp::OrElse => write!(f, "OR"),
            SqlBinaryOp::Add => write!(f, "+"),
            SqlBinaryOp::Subtract => write!(f, "-"),
            SqlBinaryOp::Multiply => write!(f, "*"),
            SqlBinaryOp::Divide => write!(f, "/"),
            SqlBinaryOp::Modulo => write!(f, "%"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlBinary {
    pub op: SqlBinaryOp,
    pub left: SqlExpr,
    pub right: SqlExpr,
    #[serde(default)]
    pub type_mapping: Option<TypeMapping>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SqlUnaryOp {
    Not,
    Negate,
    IsNull,
    IsNotNull,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlUnary {
    pub op: SqlUnaryOp,
    pub operand: SqlExpr,
    #[serde(default)]
    pub type_mapping: Option<TypeMapping>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlFunction {
    #[serde(default)]
    pub schema: Option<String>,
    pub name: String,
    #[serde(default)]
    pub arguments: Vec<SqlExpr>,
    /// Rendered without parentheses, e.g. `CURRENT_TIMESTAMP`
    #[serde(default)]
    pub niladic: bool,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default)]
    pub type_mapping: Option<TypeMapping>,
}

/// `item [NOT] IN (values)`, where `values` is a constant array or an
/// array-valued parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InExpression {
    pub item: SqlExpr,
    pub values: SqlExpr,
    #[serde(default)]
    pub negated: bool,
    #[serde(default)]
    pub type_mapping: Option<TypeMapping>,
}

impl SqlExpression {
    pub fn type_mapping(&self) -> Option<&TypeMapping> {
        match self {
            SqlExpression::Constant(c) => c.type_mapping.as_ref(),
            SqlExpression::Parameter(p) => p.type_mapping.as_ref(),
            SqlExpression::Column(c) => c.type_mapping.as_ref(),
            SqlExpression::Binary(b) => b.type_mapping.as_ref(),
            SqlExpression::Unary(u) => u.type_mapping.as_ref(),
            SqlExpression::Function(f) => f.type_mapping.as_ref(),
            SqlExpression::In(i) => i.type_mapping.as_ref(),
            SqlExpression::Fragment(_) => None,
        }
    }

    /// Constants and parameters can back an `IN` list.
    pub fn is_constant_or_parameter(&self) -> bool {
        matches!(self, SqlExpression::Constant(_) | SqlExpression::Parameter(_))
    }

    pub fn is_null_constant(&self) -> bool {
        matches!(self, SqlExpression::Constant(c) if c.value.is_null())
    }

    pub fn as_bool_constant(&self) -> Option<bool> {
        match self {
            SqlExpression::Constant(SqlConstant {
                value: Value::Bool(b),
                ..
            }) => Some(*b),
            _ => None,
        }
    }

    /// Whether the node is a boolean condition rather than a boolean value.
    pub fn is_predicate(&self) -> bool {
        match self {
            SqlExpression::Binary(b) => b.op.is_comparison() || b.op.is_logical(),
            SqlExpression::Unary(u) => u.op != SqlUnaryOp::Negate,
            SqlExpression::In(_) => true,
            _ => false,
        }
    }
}
