use crate::ast::StoreKind;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};

/// A runtime or literal value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// Binary data (varbinary)
    Bytes(Vec<u8>),
    DateTime(NaiveDateTime),
    /// GUID in its canonical string form
    Guid(String),
    Array(Vec<Value>),
    /// A driver-level parameter object supplied by the caller
    DbParameter(Arc<DbParameter>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The store kind a value of this shape maps to, if any.
    pub fn store_kind(&self) -> Option<StoreKind> {
        match self {
            Value::Null | Value::Array(_) => None,
            Value::Bool(_) => Some(StoreKind::Bool),
            Value::Int(_) => Some(StoreKind::Integer),
            Value::Float(_) => Some(StoreKind::Float),
            Value::String(_) => Some(StoreKind::String),
            Value::Bytes(_) => Some(StoreKind::Binary),
            Value::DateTime(_) => Some(StoreKind::DateTime),
            Value::Guid(_) => Some(StoreKind::Guid),
            Value::DbParameter(p) => p.value.store_kind(),
        }
    }

    /// Whether the value's type admits null. `None` for a null value, whose type is unknown.
    pub fn is_nullable_type(&self) -> Option<bool> {
        match self {
            Value::Null => None,
            Value::String(_) | Value::Bytes(_) | Value::Array(_) | Value::DbParameter(_) => {
                Some(true)
            }
            _ => Some(false),
        }
    }

    /// Convert a plain JSON value. Objects with a `value` key become driver parameters,
    /// named by their optional `name` key.
    pub fn from_json(json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(mut map) => {
                let value = map.remove("value").map(Value::from_json).unwrap_or(Value::Null);
                let parameter = match map.get("name").and_then(|n| n.as_str()) {
                    Some(name) => DbParameter::named(name, value),
                    None => DbParameter::new(value),
                };
                Value::DbParameter(Arc::new(parameter))
            }
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "'{}'", s),
            Value::Bytes(bytes) => {
                write!(f, "0x")?;
                for byte in bytes {
                    write!(f, "{:02X}", byte)?;
                }
                Ok(())
            }
            Value::DateTime(dt) => write!(f, "'{}'", dt.format("%Y-%m-%dT%H:%M:%S%.3f")),
            Value::Guid(g) => write!(f, "'{}'", g),
            Value::Array(arr) => {
                write!(f, "(")?;
                for (i, v) in arr.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, ")")
            }
            Value::DbParameter(p) => match p.name() {
                Some(name) => write!(f, "@{}", name),
                None => write!(f, "@?"),
            },
        }
    }
}

/// A driver-level parameter object.
///
/// The name can be assigned at most once: a caller-provided name is always
/// preserved, and an unnamed parameter takes the first name offered to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "DbParameterDef", into = "DbParameterDef")]
pub struct DbParameter {
    name: OnceLock<String>,
    pub value: Value,
    pub db_type: Option<String>,
}

impl DbParameter {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            name: OnceLock::new(),
            value: value.into(),
            db_type: None,
        }
    }

    /// An empty name is treated as unset.
    pub fn named(name: &str, value: impl Into<Value>) -> Self {
        let parameter = Self::new(value);
        if !name.is_empty() {
            let _ = parameter.name.set(name.to_string());
        }
        parameter
    }

    pub fn with_db_type(mut self, db_type: impl Into<String>) -> Self {
        self.db_type = Some(db_type.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.get().map(String::as_str)
    }

    /// Returns the existing name, or assigns the one produced by `fresh`.
    pub fn name_or_assign(&self, fresh: impl FnOnce() -> String) -> &str {
        self.name.get_or_init(fresh)
    }
}

#[derive(Clone, Serialize, Deserialize)]
struct DbParameterDef {
    #[serde(default)]
    name: Option<String>,
    value: Value,
    #[serde(default)]
    db_type: Option<String>,
}

impl From<DbParameterDef> for DbParameter {
    fn from(def: DbParameterDef) -> Self {
        let parameter = DbParameter::named(def.name.as_deref().unwrap_or_default(), def.value);
        DbParameter {
            db_type: def.db_type,
            ..parameter
        }
    }
}

impl From<DbParameter> for DbParameterDef {
    fn from(parameter: DbParameter) -> Self {
        DbParameterDef {
            name: parameter.name().map(str::to_string),
            value: parameter.value,
            db_type: parameter.db_type,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Value::DateTime(dt)
    }
}

impl From<DbParameter> for Value {
    fn from(p: DbParameter) -> Self {
        Value::DbParameter(Arc::new(p))
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_parameter_keeps_existing_name() {
        let p = DbParameter::named("userId", 7);
        assert_eq!(p.name_or_assign(|| "p0".to_string()), "userId");
    }

    #[test]
    fn test_db_parameter_assigns_once() {
        let p = DbParameter::new(7);
        assert_eq!(p.name(), None);
        assert_eq!(p.name_or_assign(|| "p0".to_string()), "p0");
        assert_eq!(p.name_or_assign(|| "p1".to_string()), "p0");
    }

    #[test]
    fn test_empty_name_is_unset() {
        let p = DbParameter::named("", 1);
        assert_eq!(p.name(), None);
    }

    #[test]
    fn test_from_json() {
        let json = serde_json::json!([7, 8.5, null, "x", {"name": "p", "value": true}]);
        let Value::Array(items) = Value::from_json(json) else {
            panic!("expected array");
        };
        assert_eq!(items[0], Value::Int(7));
        assert_eq!(items[1], Value::Float(8.5));
        assert_eq!(items[2], Value::Null);
        assert_eq!(items[3], Value::String("x".to_string()));
        match &items[4] {
            Value::DbParameter(p) => {
                assert_eq!(p.name(), Some("p"));
                assert_eq!(p.value, Value::Bool(true));
            }
            other => panic!("expected parameter, got {:?}", other),
        }
    }

    #[test]
    fn test_db_parameter_serde() {
        let p = DbParameter::named("a", 1).with_db_type("int");
        let json = serde_json::to_string(&p).unwrap();
        let back: DbParameter = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name(), Some("a"));
        assert_eq!(back.db_type.as_deref(), Some("int"));
    }
}
