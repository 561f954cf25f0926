//! # relq — relational query translation
//!
//! Translates method calls into SQL expression nodes and postprocesses
//! translated query trees against the parameter values of one execution.
//!
//! ## Quick Example
//!
//! ```rust
//! use relq::prelude::*;
//!
//! let post = ParameterBasedPostprocessor::default();
//! let f = post.factory();
//! let select = SelectExpression::from_source(TableSource::table("Customers", "c"))
//!     .filter(f.equal(f.column("c", "Region", true), f.parameter("region")))
//!     .build();
//!
//! let mut values = ParameterValues::new();
//! values.insert("region".to_string(), Value::Null);
//!
//! let (finalized, can_cache) = post.optimize(&select, &values).unwrap();
//! assert_eq!(
//!     finalized.to_sql(),
//!     "SELECT * FROM [Customers] AS [c] WHERE [c].[Region] IS NULL"
//! );
//! assert!(!can_cache);
//! ```
//!
//! ## Pipeline
//!
//! | Stage          | Module                          | Cache effect                 |
//! |----------------|---------------------------------|------------------------------|
//! | Null semantics | `postprocessor::null_semantics` | NULL parameter, `IN @array`  |
//! | Optimizer      | `postprocessor::optimizer`      | none                         |
//! | Raw SQL        | `postprocessor::from_sql`       | any raw-SQL argument bound   |

pub mod ast;
pub mod cache;
pub mod config;
pub mod error;
pub mod factory;
pub mod parser;
pub mod postprocessor;
pub mod translator;
pub mod transpiler;

pub mod prelude {
    pub use crate::ast::*;
    pub use crate::cache::{CacheConfig, CompiledQueryCache};
    pub use crate::config::RelqConfig;
    pub use crate::error::*;
    pub use crate::factory::SqlExpressionFactory;
    pub use crate::postprocessor::{ParameterBasedPostprocessor, PostprocessorOptions};
    pub use crate::translator::{
        CollectionType, DeclaringType, MethodCall, MethodCallTranslator, MethodCallTranslatorRegistry,
        MethodInfo,
    };
    pub use crate::transpiler::ToSql;
}

/// Postprocess `select` with default options.
///
/// Returns the finalized tree and whether it may be cached.
pub fn optimize(
    select: &std::sync::Arc<ast::SelectExpression>,
    parameter_values: &ast::ParameterValues,
) -> error::QueryResult<(std::sync::Arc<ast::SelectExpression>, bool)> {
    postprocessor::ParameterBasedPostprocessor::default().optimize(select, parameter_values)
}
