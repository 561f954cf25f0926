//! Store type mappings.
//!
//! A mapping tells the renderer how to write a literal and tells the driver
//! how to bind a parameter.

use crate::ast::Value;
use serde::{Deserialize, Serialize};

/// The broad category of a store type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoreKind {
    Bool,
    Integer,
    Float,
    Decimal,
    String,
    Binary,
    DateTime,
    Guid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeMapping {
    /// Provider store type, e.g. `nvarchar(max)`
    pub store_type: String,
    pub kind: StoreKind,
}

impl TypeMapping {
    pub fn new(store_type: impl Into<String>, kind: StoreKind) -> Self {
        Self {
            store_type: store_type.into(),
            kind,
        }
    }
}

impl std::fmt::Display for TypeMapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.store_type)
    }
}

/// Resolves provider type mappings.
pub trait TypeMappingSource: Send + Sync {
    /// The default mapping for a store kind.
    fn find_mapping(&self, kind: StoreKind) -> TypeMapping;

    /// The mapping to bind or inline a runtime value with.
    fn mapping_for_value(&self, value: &Value) -> Option<TypeMapping> {
        value.store_kind().map(|kind| self.find_mapping(kind))
    }
}

/// SQL Server store types.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServerTypeMappingSource;

impl TypeMappingSource for SqlServerTypeMappingSource {
    fn find_mapping(&self, kind: StoreKind) -> TypeMapping {
        let store_type = match kind {
            StoreKind::Bool => "bit",
            StoreKind::Integer => "int",
            StoreKind::Float => "float",
            StoreKind::Decimal => "decimal(18,2)",
            StoreKind::String => "nvarchar(max)",
            StoreKind::Binary => "varbinary(max)",
            StoreKind::DateTime => "datetime2",
            StoreKind::Guid => "uniqueidentifier",
        };
        TypeMapping::new(store_type, kind)
    }
}
