//! Core traits for method-call translation

use crate::ast::SqlExpr;
use crate::error::QueryResult;
use crate::factory::SqlExpressionFactory;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The type that declares a translated method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeclaringType {
    Enumerable,
    String,
    Math,
    Convert,
    DateTime,
    Guid,
    ByteArray,
    Object,
    /// Provider function stubs such as `DateDiffDay`
    DbFunctions,
    Collection(CollectionType),
    Other(String),
}

impl fmt::Display for DeclaringType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclaringType::Enumerable => write!(f, "Enumerable"),
            DeclaringType::String => write!(f, "String"),
            DeclaringType::Math => write!(f, "Math"),
            DeclaringType::Convert => write!(f, "Convert"),
            DeclaringType::DateTime => write!(f, "DateTime"),
            DeclaringType::Guid => write!(f, "Guid"),
            DeclaringType::ByteArray => write!(f, "Byte[]"),
            DeclaringType::Object => write!(f, "Object"),
            DeclaringType::DbFunctions => write!(f, "DbFunctions"),
            DeclaringType::Collection(c) => write!(f, "{}", c.name),
            DeclaringType::Other(name) => write!(f, "{}", name),
        }
    }
}

/// A collection type, described by the interfaces that matter for `Contains`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionType {
    pub name: String,
    #[serde(default)]
    pub implements_list: bool,
    #[serde(default)]
    pub implements_generic_collection: bool,
}

impl CollectionType {
    /// `List<T>` and friends: both a list and a generic collection.
    pub fn list(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            implements_list: true,
            implements_generic_collection: true,
        }
    }
}

/// The method being called.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodInfo {
    pub declaring_type: DeclaringType,
    pub name: String,
    #[serde(default)]
    pub generic_arguments: Vec<String>,
    #[serde(default)]
    pub is_static: bool,
}

impl MethodInfo {
    pub fn instance(declaring_type: DeclaringType, name: impl Into<String>) -> Self {
        Self {
            declaring_type,
            name: name.into(),
            generic_arguments: Vec::new(),
            is_static: false,
        }
    }

    pub fn static_method(declaring_type: DeclaringType, name: impl Into<String>) -> Self {
        Self {
            is_static: true,
            ..Self::instance(declaring_type, name)
        }
    }

    pub fn with_generic_arguments<I, S>(mut self, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.generic_arguments = arguments.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_generic(&self) -> bool {
        !self.generic_arguments.is_empty()
    }

    /// `Type.Method`, used in logs and errors.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.declaring_type, self.name)
    }
}

/// A method call whose instance and arguments are already translated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    #[serde(default)]
    pub instance: Option<SqlExpr>,
    pub method: MethodInfo,
    #[serde(default)]
    pub arguments: Vec<SqlExpr>,
}

/// Translates one family of method calls into SQL.
///
/// `Ok(None)` means the call is not one this translator handles; the
/// registry then asks the next one.
pub trait MethodCallTranslator: Send + Sync {
    /// Short identifier used in logs and listings
    fn id(&self) -> &'static str;

    fn translate(
        &self,
        instance: Option<&SqlExpr>,
        method: &MethodInfo,
        arguments: &[SqlExpr],
        factory: &SqlExpressionFactory,
    ) -> QueryResult<Option<SqlExpr>>;
}

/// Fail a recognized call whose argument count is wrong.
pub(crate) fn expect_arity(method: &MethodInfo, arguments: &[SqlExpr], expected: usize) -> QueryResult<()> {
    if arguments.len() == expected {
        Ok(())
    } else {
        Err(crate::error::QueryError::translation(
            method.qualified_name(),
            format!("expected {} argument(s), got {}", expected, arguments.len()),
        ))
    }
}

/// Fail a recognized instance call that has no receiver.
pub(crate) fn expect_instance<'a>(method: &MethodInfo, instance: Option<&'a SqlExpr>) -> QueryResult<&'a SqlExpr> {
    instance.ok_or_else(|| crate::error::QueryError::translation(method.qualified_name(), "missing instance"))
}
