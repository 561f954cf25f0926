//! Method-call translation.
//!
//! Front ends hand each method call (with its receiver and arguments already
//! translated) to a [`MethodCallTranslatorRegistry`], which asks its
//! translators in order until one recognizes the call.

pub mod byte_array;
pub mod contains;
pub mod conversion;
pub mod date_time;
pub mod guid;
pub mod math;
pub mod registry;
pub mod string;
pub mod traits;

pub use byte_array::ByteArrayTranslator;
pub use contains::ContainsTranslator;
pub use conversion::{ConvertTranslator, ObjectToStringTranslator};
pub use date_time::{DateDiffTranslator, DateTimeTranslator, IsDateTranslator};
pub use guid::NewGuidTranslator;
pub use math::MathTranslator;
pub use registry::MethodCallTranslatorRegistry;
pub use string::StringMethodTranslator;
pub use traits::{CollectionType, DeclaringType, MethodCall, MethodCallTranslator, MethodInfo};
