//! SQL renderer for finalized expression trees.
//!
//! Writes SQL Server flavoured text: `[bracketed]` identifiers, `@name`
//! parameters and `N'...'` string literals.

use crate::ast::*;
use crate::parser::{FormatSegment, parse_format_sql};

/// Trait for converting tree nodes to SQL.
pub trait ToSql {
    /// Convert this node to a SQL string.
    fn to_sql(&self) -> String;
}

/// Quote an identifier, doubling any closing bracket.
pub fn quote_identifier(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

/// Render a literal value for the given mapping.
pub fn literal(value: &Value, type_mapping: Option<&TypeMapping>) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => format!("CAST({} AS bit)", if *b { 1 } else { 0 }),
        Value::Int(n) => n.to_string(),
        Value::Float(n) => {
            let text = n.to_string();
            if text.contains(['.', 'e', 'E']) || !n.is_finite() {
                text
            } else {
                format!("{}E0", text)
            }
        }
        Value::String(s) => {
            let escaped = s.replace('\'', "''");
            match type_mapping {
                Some(m) if m.store_type.starts_with("varchar") || m.store_type.starts_with("char") => {
                    format!("'{}'", escaped)
                }
                _ => format!("N'{}'", escaped),
            }
        }
        Value::Bytes(_) | Value::DateTime(_) | Value::Guid(_) => value.to_string(),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(|v| literal(v, type_mapping)).collect();
            format!("({})", parts.join(", "))
        }
        Value::DbParameter(p) => match p.name() {
            Some(name) => format!("@{}", name),
            None => literal(&p.value, type_mapping),
        },
    }
}

impl ToSql for SqlExpression {
    fn to_sql(&self) -> String {
        match self {
            SqlExpression::Constant(c) => literal(&c.value, c.type_mapping.as_ref()),
            SqlExpression::Parameter(p) => format!("@{}", p.name),
            SqlExpression::Column(c) => {
                format!("{}.{}", quote_identifier(&c.table), quote_identifier(&c.name))
            }
            SqlExpression::Binary(b) => format!(
                "{} {} {}",
                operand_sql(&b.left, b.op, false),
                b.op,
                operand_sql(&b.right, b.op, true)
            ),
            SqlExpression::Unary(u) => match u.op {
                SqlUnaryOp::Not => format!("NOT ({})", u.operand.to_sql()),
                SqlUnaryOp::Negate => format!("-{}", wrapped_sql(&u.operand)),
                SqlUnaryOp::IsNull => format!("{} IS NULL", wrapped_sql(&u.operand)),
                SqlUnaryOp::IsNotNull => format!("{} IS NOT NULL", wrapped_sql(&u.operand)),
            },
            SqlExpression::Function(f) => {
                let mut sql = String::new();
                if let Some(schema) = &f.schema {
                    sql.push_str(&quote_identifier(schema));
                    sql.push('.');
                }
                sql.push_str(&f.name);
                if !f.niladic {
                    let args: Vec<String> = f.arguments.iter().map(|a| a.to_sql()).collect();
                    sql.push('(');
                    sql.push_str(&args.join(", "));
                    sql.push(')');
                }
                sql
            }
            SqlExpression::In(i) => {
                let values = match i.values.as_ref() {
                    SqlExpression::Constant(c) => literal(&c.value, c.type_mapping.as_ref()),
                    other => format!("({})", other.to_sql()),
                };
                let keyword = if i.negated { "NOT IN" } else { "IN" };
                format!("{} {} {}", wrapped_sql(&i.item), keyword, values)
            }
            SqlExpression::Fragment(sql) => sql.clone(),
        }
    }
}

/// Render a binary operand, parenthesizing it when it binds looser than its parent.
fn operand_sql(operand: &SqlExpr, parent: SqlBinaryOp, is_right: bool) -> String {
    let needs_parens = match operand.as_ref() {
        SqlExpression::Binary(child) => {
            if child.op.is_logical() && parent.is_logical() {
                child.op != parent
            } else if parent.is_comparison() {
                !child.op.is_arithmetic()
            } else {
                let (cp, pp) = (child.op.precedence(), parent.precedence());
                cp < pp || (cp == pp && (child.op != parent || (is_right && !parent.is_associative())))
            }
        }
        SqlExpression::In(_) => parent.is_comparison(),
        SqlExpression::Unary(u) => u.op != SqlUnaryOp::Not && parent.is_comparison(),
        _ => false,
    };
    if needs_parens {
        format!("({})", operand.to_sql())
    } else {
        operand.to_sql()
    }
}

fn wrapped_sql(operand: &SqlExpr) -> String {
    match operand.as_ref() {
        SqlExpression::Binary(_) | SqlExpression::In(_) | SqlExpression::Unary(_) => {
            format!("({})", operand.to_sql())
        }
        _ => operand.to_sql(),
    }
}

impl ToSql for SelectExpression {
    fn to_sql(&self) -> String {
        let mut sql = String::from("SELECT ");

        if self.distinct {
            sql.push_str("DISTINCT ");
        }

        // TOP only when there is no OFFSET; otherwise OFFSET/FETCH below
        if let (Some(limit), None) = (&self.limit, &self.offset) {
            sql.push_str(&format!("TOP({}) ", limit.to_sql()));
        }

        if self.projection.is_empty() {
            sql.push('*');
        } else {
            let cols: Vec<String> = self
                .projection
                .iter()
                .map(|p| format!("{} AS {}", p.expression.to_sql(), quote_identifier(&p.alias)))
                .collect();
            sql.push_str(&cols.join(", "));
        }

        if !self.tables.is_empty() {
            sql.push_str(" FROM ");
            for (i, source) in self.tables.iter().enumerate() {
                match source {
                    TableSource::Join(_) => sql.push(' '),
                    _ if i > 0 => sql.push_str(", "),
                    _ => {}
                }
                sql.push_str(&source.to_sql());
            }
        }

        if let Some(predicate) = &self.predicate {
            sql.push_str(" WHERE ");
            sql.push_str(&predicate.to_sql());
        }

        if !self.orderings.is_empty() {
            let orderings: Vec<String> = self
                .orderings
                .iter()
                .map(|o| {
                    let dir = if o.ascending { "" } else { " DESC" };
                    format!("{}{}", o.expression.to_sql(), dir)
                })
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&orderings.join(", "));
        }

        if let Some(offset) = &self.offset {
            if self.orderings.is_empty() {
                sql.push_str(" ORDER BY (SELECT 1)");
            }
            sql.push_str(&format!(" OFFSET {} ROWS", offset.to_sql()));
            if let Some(limit) = &self.limit {
                sql.push_str(&format!(" FETCH NEXT {} ROWS ONLY", limit.to_sql()));
            }
        }

        sql
    }
}

impl ToSql for TableSource {
    fn to_sql(&self) -> String {
        match self {
            TableSource::Table(t) => {
                let name = match &t.schema {
                    Some(schema) => format!("{}.{}", quote_identifier(schema), quote_identifier(&t.name)),
                    None => quote_identifier(&t.name),
                };
                format!("{} AS {}", name, quote_identifier(&t.alias))
            }
            TableSource::FromSql(f) => f.to_sql(),
            TableSource::Join(j) => {
                let mut sql = format!("{} {}", j.kind, j.table.to_sql());
                if let Some(predicate) = &j.predicate {
                    sql.push_str(" ON ");
                    sql.push_str(&predicate.to_sql());
                }
                sql
            }
            TableSource::Subquery { select, alias } => {
                format!("({}) AS {}", select.to_sql(), quote_identifier(alias))
            }
        }
    }
}

impl ToSql for FromSqlExpression {
    fn to_sql(&self) -> String {
        format!("({}) AS {}", substitute_arguments(self), quote_identifier(&self.alias))
    }
}

/// Replace `{n}` placeholders with the n-th argument. Unparseable text and
/// out-of-range placeholders are left as written.
fn substitute_arguments(from_sql: &FromSqlExpression) -> String {
    let Ok(segments) = parse_format_sql(&from_sql.sql) else {
        return from_sql.sql.clone();
    };

    let mut sql = String::with_capacity(from_sql.sql.len());
    for segment in segments {
        match segment {
            FormatSegment::Text(text) => sql.push_str(text),
            FormatSegment::OpenBrace => sql.push('{'),
            FormatSegment::CloseBrace => sql.push('}'),
            FormatSegment::Placeholder(index) => match argument_sql(&from_sql.arguments, index) {
                Some(arg) => sql.push_str(&arg),
                None => sql.push_str(&format!("{{{}}}", index)),
            },
        }
    }
    sql
}

fn argument_sql(arguments: &FromSqlArguments, index: usize) -> Option<String> {
    match arguments {
        FromSqlArguments::Parameter(_) => None,
        FromSqlArguments::Constant(values) => values.get(index).map(|v| literal(v, None)),
        FromSqlArguments::Composite(RelationalParameter::Composite { parameters, .. }) => {
            parameters.get(index).map(parameter_sql)
        }
        FromSqlArguments::Composite(single) if index == 0 => Some(parameter_sql(single)),
        FromSqlArguments::Composite(_) => None,
        FromSqlArguments::Resolved(args) => args.get(index).map(|arg| match arg {
            FromSqlArgument::Parameter(p) => parameter_sql(p),
            FromSqlArgument::Constant(c) => literal(&c.value, c.type_mapping.as_ref()),
        }),
    }
}

fn parameter_sql(parameter: &RelationalParameter) -> String {
    let names: Vec<String> = parameter
        .leaf_names()
        .iter()
        .map(|n| format!("@{}", n))
        .collect();
    names.join(", ")
}
