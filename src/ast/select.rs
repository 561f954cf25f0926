use crate::ast::{DbParameter, SqlConstant, SqlExpr, TypeMapping, Value};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The top-level query shape.
///
/// Rewriters never mutate a select in place: they return a new `Arc` when
/// anything underneath changed and the original `Arc` otherwise.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SelectExpression {
    #[serde(default)]
    pub projection: Vec<ProjectionExpression>,
    #[serde(default)]
    pub tables: Vec<TableSource>,
    #[serde(default)]
    pub predicate: Option<SqlExpr>,
    #[serde(default)]
    pub orderings: Vec<OrderingExpression>,
    #[serde(default)]
    pub limit: Option<SqlExpr>,
    #[serde(default)]
    pub offset: Option<SqlExpr>,
    #[serde(default)]
    pub distinct: bool,
}

impl SelectExpression {
    /// A `SELECT *` over one table source.
    pub fn from_source(source: TableSource) -> Self {
        Self {
            tables: vec![source],
            ..Default::default()
        }
    }

    pub fn project(mut self, alias: impl Into<String>, expression: SqlExpr) -> Self {
        self.projection.push(ProjectionExpression {
            alias: alias.into(),
            expression,
        });
        self
    }

    pub fn join(mut self, source: TableSource) -> Self {
        self.tables.push(source);
        self
    }

    pub fn filter(mut self, predicate: SqlExpr) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub fn order_by(mut self, expression: SqlExpr, ascending: bool) -> Self {
        self.orderings.push(OrderingExpression {
            expression,
            ascending,
        });
        self
    }

    pub fn limit(mut self, limit: SqlExpr) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: SqlExpr) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn build(self) -> Arc<SelectExpression> {
        Arc::new(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionExpression {
    pub alias: String,
    pub expression: SqlExpr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderingExpression {
    pub expression: SqlExpr,
    pub ascending: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TableSource {
    Table(TableExpression),
    FromSql(Arc<FromSqlExpression>),
    Join(Arc<JoinExpression>),
    Subquery {
        select: Arc<SelectExpression>,
        alias: String,
    },
}

impl TableSource {
    pub fn table(name: impl Into<String>, alias: impl Into<String>) -> Self {
        TableSource::Table(TableExpression {
            schema: None,
            name: name.into(),
            alias: alias.into(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableExpression {
    #[serde(default)]
    pub schema: Option<String>,
    pub name: String,
    pub alias: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinKind {
    Inner,
    LeftOuter,
    Cross,
    CrossApply,
    OuterApply,
}

impl std::fmt::Display for JoinKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JoinKind::Inner => write!(f, "INNER JOIN"),
            JoinKind::LeftOuter => write!(f, "LEFT JOIN"),
            JoinKind::Cross => write!(f, "CROSS JOIN"),
            JoinKind::CrossApply => write!(f, "CROSS APPLY"),
            JoinKind::OuterApply => write!(f, "OUTER APPLY"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinExpression {
    pub kind: JoinKind,
    pub table: TableSource,
    #[serde(default)]
    pub predicate: Option<SqlExpr>,
}

/// A raw SQL fragment used as a table source.
///
/// `{0}`, `{1}`, ... in `sql` refer to positions in the argument array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FromSqlExpression {
    pub sql: String,
    pub arguments: FromSqlArguments,
    pub alias: String,
}

impl FromSqlExpression {
    pub fn new(sql: impl Into<String>, arguments: FromSqlArguments, alias: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            arguments,
            alias: alias.into(),
        }
    }

    /// Whether the arguments still need resolving against parameter values.
    pub fn is_unresolved(&self) -> bool {
        matches!(
            self.arguments,
            FromSqlArguments::Parameter(_) | FromSqlArguments::Constant(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FromSqlArguments {
    /// Name of an array-valued entry in the parameter values
    Parameter(String),
    /// Literal argument array
    Constant(Vec<Value>),
    /// Resolved from a named array: one composite parameter
    Composite(RelationalParameter),
    /// Resolved from a literal array: bind parameters and inlined constants
    Resolved(Vec<FromSqlArgument>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FromSqlArgument {
    Parameter(RelationalParameter),
    Constant(SqlConstant),
}

/// A parameter as it will be bound on the database command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RelationalParameter {
    /// A caller-supplied driver parameter passed through as is
    Raw {
        name: String,
        parameter: Arc<DbParameter>,
    },
    /// A plain value bound under a generated name
    TypeMapped {
        invariant_name: String,
        name: String,
        type_mapping: Option<TypeMapping>,
        nullable: Option<bool>,
    },
    /// An ordered group of parameters bound under one invariant name
    Composite {
        invariant_name: String,
        parameters: Vec<RelationalParameter>,
    },
}

impl RelationalParameter {
    pub fn invariant_name(&self) -> &str {
        match self {
            RelationalParameter::Raw { name, .. } => name,
            RelationalParameter::TypeMapped { invariant_name, .. } => invariant_name,
            RelationalParameter::Composite { invariant_name, .. } => invariant_name,
        }
    }

    /// Names of the leaf parameters, in binding order.
    pub fn leaf_names(&self) -> Vec<&str> {
        match self {
            RelationalParameter::Raw { name, .. } => vec![name.as_str()],
            RelationalParameter::TypeMapped { name, .. } => vec![name.as_str()],
            RelationalParameter::Composite { parameters, .. } => {
                parameters.iter().flat_map(|p| p.leaf_names()).collect()
            }
        }
    }
}
