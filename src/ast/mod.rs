//! SQL expression tree.
//!
//! The front end hands over a [`SelectExpression`] built from these nodes; the
//! postprocessor rewrites it and the renderer turns it into text.

pub mod expr;
pub mod rewrite;
pub mod select;
pub mod type_mapping;
pub mod values;

pub use expr::*;
pub use rewrite::{SqlTreeRewriter, rewrite_select};
pub use select::*;
pub use type_mapping::*;
pub use values::*;

use std::collections::HashMap;

/// Runtime parameter values for one query execution, keyed by parameter name.
pub type ParameterValues = HashMap<String, Value>;
